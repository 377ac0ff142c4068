//! Background capture.
//!
//! Fetching both lists and writing the snapshot can take a while, so the
//! presentation layer runs it on its own thread and keeps drawing. The worker
//! opens its own [`Storage`], reports coarse progress on one channel and
//! sends exactly one typed result on another. The store itself stays
//! synchronous and knows nothing about threads.

use crate::error::{PettyError, Result};
use crate::logging::OperationGuard;
use crate::model::CaptureSummary;
use crate::source::AccountSource;
use crate::storage::Storage;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

/// Progress reported by a running capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStage {
    FetchingFollowers,
    FetchingFollowing,
    Saving,
}

impl CaptureStage {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::FetchingFollowers => "Fetching followers...",
            Self::FetchingFollowing => "Fetching following...",
            Self::Saving => "Saving snapshot to database...",
        }
    }
}

/// What [`CaptureHandle::poll`] observed.
#[derive(Debug)]
pub enum CapturePoll {
    Stage(CaptureStage),
    Done(Result<CaptureSummary>),
    Pending,
}

/// Handle to a capture running on a background thread.
pub struct CaptureHandle {
    stages: Receiver<CaptureStage>,
    result: Receiver<Result<CaptureSummary>>,
    finished: Option<Result<CaptureSummary>>,
    thread: Option<JoinHandle<()>>,
}

/// Start a capture from `source` into the database at `db_path`.
///
/// # Errors
///
/// Returns an error if the worker thread cannot be spawned.
pub fn spawn_capture<S>(db_path: impl Into<PathBuf>, source: S) -> Result<CaptureHandle>
where
    S: AccountSource + Send + 'static,
{
    let db_path = db_path.into();
    let (stage_tx, stage_rx) = crossbeam_channel::unbounded();
    let (result_tx, result_rx) = crossbeam_channel::bounded(1);

    let thread = std::thread::Builder::new()
        .name("petty-capture".to_string())
        .spawn(move || {
            let result = run_capture(&db_path, &source, &stage_tx);
            // The receiver may already be gone if the caller gave up.
            let _ = result_tx.send(result);
        })?;

    Ok(CaptureHandle {
        stages: stage_rx,
        result: result_rx,
        finished: None,
        thread: Some(thread),
    })
}

impl CaptureHandle {
    /// Check for progress or completion, waiting at most `timeout`.
    ///
    /// Pending stage updates are returned before the final result. Once
    /// `Done` has been returned the handle should be dropped.
    pub fn poll(&mut self, timeout: Duration) -> CapturePoll {
        if let Ok(stage) = self.stages.try_recv() {
            return CapturePoll::Stage(stage);
        }
        if let Some(result) = self.finished.take() {
            return CapturePoll::Done(result);
        }

        match self.result.recv_timeout(timeout) {
            Ok(result) => {
                self.join();
                // Every stage is sent before the result; drain those first.
                if let Ok(stage) = self.stages.try_recv() {
                    self.finished = Some(result);
                    return CapturePoll::Stage(stage);
                }
                CapturePoll::Done(result)
            }
            Err(RecvTimeoutError::Timeout) => CapturePoll::Pending,
            Err(RecvTimeoutError::Disconnected) => CapturePoll::Done(Err(self.join_failure())),
        }
    }

    /// Block until the capture finishes.
    ///
    /// # Errors
    ///
    /// Returns the capture's own error, or [`PettyError::TaskFailed`] if the
    /// worker died without reporting.
    pub fn wait(mut self) -> Result<CaptureSummary> {
        if let Some(result) = self.finished.take() {
            return result;
        }
        match self.result.recv() {
            Ok(result) => {
                self.join();
                result
            }
            Err(_) => Err(self.join_failure()),
        }
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    fn join_failure(&mut self) -> PettyError {
        let reason = match self.thread.take().map(JoinHandle::join) {
            Some(Err(panic)) => panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "capture worker panicked".to_string()),
            _ => "capture worker exited without a result".to_string(),
        };
        PettyError::TaskFailed { reason }
    }
}

fn run_capture<S: AccountSource>(
    db_path: &Path,
    source: &S,
    stages: &Sender<CaptureStage>,
) -> Result<CaptureSummary> {
    let guard = OperationGuard::new("capture");
    let result = capture(db_path, source, stages);
    match &result {
        Ok(_) => guard.complete(),
        Err(e) => guard.fail(e),
    }
    result
}

fn capture<S: AccountSource>(
    db_path: &Path,
    source: &S,
    stages: &Sender<CaptureStage>,
) -> Result<CaptureSummary> {
    let report = |stage: CaptureStage| {
        debug!(?stage, "Capture progress");
        let _ = stages.send(stage);
    };

    report(CaptureStage::FetchingFollowers);
    let followers = source.fetch_followers()?;

    report(CaptureStage::FetchingFollowing);
    let following = source.fetch_following()?;

    report(CaptureStage::Saving);
    let mut storage = Storage::open(db_path)?;
    let snapshot_id = storage.create_snapshot(&followers, &following)?;
    let snapshot = storage.get_snapshot(snapshot_id)?;

    Ok(CaptureSummary {
        snapshot_id,
        followers_count: followers.len(),
        following_count: following.len(),
        account_count: snapshot.account_count,
    })
}
