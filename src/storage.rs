//! `SQLite` storage for relationship snapshots.
//!
//! Two tables: `snapshots` holds one row per capture, `snapshot_accounts` one
//! row per (snapshot, account). Rows are written in a single transaction with
//! their snapshot and removed with it through `ON DELETE CASCADE`.

use crate::diff::diff_followers;
use crate::error::{PettyError, Result};
use crate::merge::{merge_relationships, validate_capture};
use crate::model::{
    Account, RelationshipCounts, RelationshipRow, Snapshot, SnapshotDiff, SnapshotId,
};
use crate::query::{RelationshipFilter, filter_rows};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use tracing::{debug, info};

const SCHEMA_VERSION: i32 = 1;

const SNAPSHOT_COLUMNS: &str = r"
    SELECT s.id, s.created_at, COUNT(DISTINCT sa.account_id) AS account_count
    FROM snapshots s
    LEFT JOIN snapshot_accounts sa ON sa.snapshot_id = s.id
";

/// `SQLite` storage manager
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open or create the database at the given path.
    ///
    /// The parent directory is created if needed and the schema is migrated
    /// once, here.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database
    /// cannot be opened or initialized.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PettyError::DatabaseDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path).map_err(|source| PettyError::DatabaseOpen {
            path: path.to_path_buf(),
            source,
        })?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )?;

        let storage = Self { conn };
        storage.migrate()?;
        debug!(path = %path.display(), "Opened snapshot database");
        Ok(storage)
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be initialized.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            ",
        )?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let current_version = self.get_schema_version();

        if current_version > SCHEMA_VERSION {
            return Err(PettyError::SchemaMismatch {
                expected: SCHEMA_VERSION,
                found: current_version,
            });
        }

        if current_version < SCHEMA_VERSION {
            info!(
                "Migrating database from version {} to {}",
                current_version, SCHEMA_VERSION
            );
            self.create_schema()?;
            self.set_schema_version(SCHEMA_VERSION)?;
        }

        Ok(())
    }

    fn get_schema_version(&self) -> i32 {
        let result: rusqlite::Result<i32> = self.conn.query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| {
                let value: String = row.get(0)?;
                Ok(value.parse().unwrap_or(0))
            },
        );

        // Treat missing meta table as version 0.
        result.unwrap_or_default()
    }

    fn set_schema_version(&self, version: i32) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', ?)",
            params![version.to_string()],
        )?;
        Ok(())
    }

    fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- AUTOINCREMENT keeps ids monotonic even after deletions.
            CREATE TABLE IF NOT EXISTS snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_snapshots_created_at ON snapshots(created_at);

            CREATE TABLE IF NOT EXISTS snapshot_accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                snapshot_id INTEGER NOT NULL
                    REFERENCES snapshots(id) ON DELETE CASCADE,
                account_id TEXT NOT NULL CHECK (account_id <> ''),
                username TEXT NOT NULL CHECK (username <> ''),
                display_name TEXT NOT NULL,
                url TEXT NOT NULL,
                is_follower INTEGER NOT NULL CHECK (is_follower IN (0, 1)),
                is_following INTEGER NOT NULL CHECK (is_following IN (0, 1))
            );
            CREATE INDEX IF NOT EXISTS idx_snapshot_accounts_snapshot_id
                ON snapshot_accounts(snapshot_id);
            CREATE INDEX IF NOT EXISTS idx_snapshot_accounts_account_id
                ON snapshot_accounts(account_id);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_snapshot_accounts_unique
                ON snapshot_accounts(snapshot_id, account_id);
            ",
        )?;

        Ok(())
    }

    /// Merge the two lists and persist them as a new snapshot.
    ///
    /// Every record is validated before the write transaction opens; a
    /// rejected batch leaves the database untouched.
    ///
    /// # Errors
    ///
    /// Returns [`PettyError::Validation`] for an incomplete record, or a store
    /// error if the write fails (in which case nothing is persisted).
    pub fn create_snapshot(
        &mut self,
        followers: &[Account],
        following: &[Account],
    ) -> Result<SnapshotId> {
        validate_capture(followers, following)?;
        let rows = merge_relationships(followers, following);
        let id = self.write_snapshot(&rows, Utc::now())?;

        info!(
            snapshot_id = %id,
            followers = followers.len(),
            following = following.len(),
            accounts = rows.len(),
            "Created snapshot"
        );
        Ok(id)
    }

    /// Insert a snapshot and its rows in one transaction.
    fn write_snapshot(
        &mut self,
        rows: &[RelationshipRow],
        now: DateTime<Utc>,
    ) -> Result<SnapshotId> {
        let tx = self.conn.transaction()?;

        // Never stamp a snapshot earlier than the newest one, so creation
        // order and timestamp order agree even if the clock steps back.
        let latest: Option<String> =
            tx.query_row("SELECT MAX(created_at) FROM snapshots", [], |row| row.get(0))?;
        let mut created_at = format_timestamp(now);
        if let Some(latest) = latest {
            if latest > created_at {
                created_at = latest;
            }
        }

        tx.execute(
            "INSERT INTO snapshots (created_at) VALUES (?)",
            params![created_at],
        )?;
        let snapshot_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare_cached(
                r"
                INSERT INTO snapshot_accounts
                (snapshot_id, account_id, username, display_name, url, is_follower, is_following)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ",
            )?;

            for row in rows {
                stmt.execute(params![
                    snapshot_id,
                    row.account.account_id,
                    row.account.username,
                    row.account.display_name,
                    row.account.url,
                    row.is_follower,
                    row.is_following,
                ])?;
            }
        }

        tx.commit()?;
        Ok(SnapshotId(snapshot_id))
    }

    /// List all snapshots, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        let sql = format!("{SNAPSHOT_COLUMNS} GROUP BY s.id ORDER BY s.created_at DESC, s.id DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let snapshots = stmt
            .query_map([], snapshot_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(snapshots)
    }

    /// Get one snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PettyError::NotFound`] if no snapshot has this id.
    pub fn get_snapshot(&self, id: SnapshotId) -> Result<Snapshot> {
        query_snapshot(&self.conn, id)
    }

    /// The most recently created snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn latest_snapshot(&self) -> Result<Option<Snapshot>> {
        let sql = format!(
            "{SNAPSHOT_COLUMNS} GROUP BY s.id ORDER BY s.created_at DESC, s.id DESC LIMIT 1"
        );
        Ok(self
            .conn
            .query_row(&sql, [], snapshot_from_row)
            .optional()?)
    }

    /// The snapshot captured immediately before `id`, or `None` if `id` is the
    /// oldest one.
    ///
    /// # Errors
    ///
    /// Returns [`PettyError::NotFound`] if `id` does not exist.
    pub fn previous_snapshot(&self, id: SnapshotId) -> Result<Option<Snapshot>> {
        let tx = self.conn.unchecked_transaction()?;
        query_snapshot(&tx, id)?;

        let sql = format!(
            "{SNAPSHOT_COLUMNS}
            WHERE s.created_at < (SELECT created_at FROM snapshots WHERE id = ?1)
               OR (s.created_at = (SELECT created_at FROM snapshots WHERE id = ?1) AND s.id < ?1)
            GROUP BY s.id
            ORDER BY s.created_at DESC, s.id DESC
            LIMIT 1"
        );
        let previous = tx
            .query_row(&sql, params![id.0], snapshot_from_row)
            .optional()?;
        Ok(previous)
    }

    /// Rows of a snapshot matching `filter`, sorted by username.
    ///
    /// # Errors
    ///
    /// Returns [`PettyError::NotFound`] if the snapshot does not exist.
    pub fn get_relationship_rows(
        &self,
        id: SnapshotId,
        filter: RelationshipFilter,
    ) -> Result<Vec<RelationshipRow>> {
        let tx = self.conn.unchecked_transaction()?;
        query_snapshot(&tx, id)?;
        let rows = load_rows(&tx, id, false)?;

        let selected = filter_rows(rows, filter);
        debug!(snapshot_id = %id, %filter, rows = selected.len(), "Loaded relationship rows");
        Ok(selected)
    }

    /// Category counts for one snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PettyError::NotFound`] if the snapshot does not exist.
    pub fn relationship_counts(&self, id: SnapshotId) -> Result<RelationshipCounts> {
        let rows = self.get_relationship_rows(id, RelationshipFilter::All)?;
        Ok(RelationshipCounts::from_rows(&rows))
    }

    /// Follower changes from `previous` to `current`.
    ///
    /// # Errors
    ///
    /// Returns [`PettyError::NotFound`] if either snapshot does not exist.
    pub fn diff(&self, current: SnapshotId, previous: SnapshotId) -> Result<SnapshotDiff> {
        let tx = self.conn.unchecked_transaction()?;
        query_snapshot(&tx, current)?;
        query_snapshot(&tx, previous)?;

        let current_rows = load_rows(&tx, current, true)?;
        let previous_rows = load_rows(&tx, previous, true)?;

        let diff = diff_followers(current, &current_rows, previous, &previous_rows);
        debug!(
            %current,
            %previous,
            new_followers = diff.new_followers.len(),
            unfollowers = diff.unfollowers.len(),
            "Computed snapshot diff"
        );
        Ok(diff)
    }

    /// Delete a snapshot together with all of its rows.
    ///
    /// Returns the number of relationship rows removed.
    ///
    /// # Errors
    ///
    /// Returns [`PettyError::NotFound`] if the snapshot does not exist.
    pub fn delete_snapshot(&mut self, id: SnapshotId) -> Result<usize> {
        let tx = self.conn.transaction()?;

        let row_count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM snapshot_accounts WHERE snapshot_id = ?",
            params![id.0],
            |row| row.get(0),
        )?;
        let deleted = tx.execute("DELETE FROM snapshots WHERE id = ?", params![id.0])?;
        if deleted == 0 {
            return Err(PettyError::snapshot_not_found(id));
        }

        tx.commit()?;
        info!(snapshot_id = %id, rows = row_count, "Deleted snapshot");
        Ok(usize::try_from(row_count).unwrap_or(0))
    }
}

fn query_snapshot(conn: &Connection, id: SnapshotId) -> Result<Snapshot> {
    let sql = format!("{SNAPSHOT_COLUMNS} WHERE s.id = ? GROUP BY s.id");
    conn.query_row(&sql, params![id.0], snapshot_from_row)
        .optional()?
        .ok_or_else(|| PettyError::snapshot_not_found(id))
}

fn load_rows(
    conn: &Connection,
    id: SnapshotId,
    followers_only: bool,
) -> Result<Vec<RelationshipRow>> {
    let sql = if followers_only {
        r"
        SELECT account_id, username, display_name, url, is_follower, is_following
        FROM snapshot_accounts
        WHERE snapshot_id = ? AND is_follower = 1
        "
    } else {
        r"
        SELECT account_id, username, display_name, url, is_follower, is_following
        FROM snapshot_accounts
        WHERE snapshot_id = ?
        "
    };

    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt
        .query_map(params![id.0], |row| {
            Ok(RelationshipRow {
                account: Account {
                    account_id: row.get(0)?,
                    username: row.get(1)?,
                    display_name: row.get(2)?,
                    url: row.get(3)?,
                },
                is_follower: row.get(4)?,
                is_following: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<Snapshot> {
    let created_at: String = row.get(1)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    let account_count: i64 = row.get(2)?;

    Ok(Snapshot {
        id: SnapshotId(row.get(0)?),
        created_at,
        account_count: usize::try_from(account_count).unwrap_or(0),
    })
}

/// Fixed-width RFC 3339 so text order equals time order.
fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}
