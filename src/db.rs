//! Database module for `SQLite` storage of the watch-list

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use crate::models::{Thread, WatchedThread};
use crate::paths;

/// Schema version written to `PRAGMA user_version`
pub const SCHEMA_VERSION: i32 = 1;

/// Watch-list storage failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database file could not be opened
    #[error("Failed to open database at {path}: {source}")]
    Open {
        /// Database file
        path: PathBuf,
        /// Underlying error
        source: rusqlite::Error,
    },
    /// Creating or migrating the schema failed
    #[error("Failed to initialize schema: {0}")]
    Schema(#[source] rusqlite::Error),
    /// The file was written by a newer version
    #[error("Database schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version found on disk
        found: i32,
        /// Highest version this build understands
        supported: i32,
    },
    /// A query failed
    #[error("Database query failed: {0}")]
    Query(#[from] rusqlite::Error),
    /// A stored row could not be turned back into a watched thread
    #[error("Invalid watched thread /{board}/{thread_id}: {reason}")]
    Decode {
        /// Board of the bad row
        board: String,
        /// Thread number of the bad row
        thread_id: i64,
        /// What was wrong
        reason: String,
    },
}

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

/// A `watched_threads` row before validation
struct StoredRow {
    board: String,
    thread_id: i64,
    subject: Option<String>,
    content: Option<String>,
    author: String,
    created_at: String,
    last_post_id: i64,
    current_last_post_id: i64,
    total_new_posts: i64,
    now_archived: bool,
    now_deleted: bool,
}

impl Database {
    /// Open or create the database at the default location
    pub fn open() -> anyhow::Result<Self> {
        let path = Self::default_path()?;
        Ok(Self::open_path(&path)?)
    }

    /// Open or create the database at a specific path
    pub fn open_path(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let db = Self { conn };
        db.init()?;

        Ok(db)
    }

    /// Get the default database path
    pub fn default_path() -> anyhow::Result<PathBuf> {
        paths::database_path()
    }

    /// Create the schema, or check that the existing one is readable
    fn init(&self) -> Result<(), StoreError> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(StoreError::Schema)?;

        if version > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: version,
                supported: SCHEMA_VERSION,
            });
        }

        if version < SCHEMA_VERSION {
            tracing::debug!("Migrating database schema {version} -> {SCHEMA_VERSION}");
            self.conn
                .execute_batch(&format!(
                    r"
                    CREATE TABLE IF NOT EXISTS watched_threads (
                        board TEXT NOT NULL,
                        thread_id INTEGER NOT NULL,
                        position INTEGER NOT NULL,
                        subject TEXT,
                        content TEXT,
                        author TEXT NOT NULL,
                        created_at TEXT NOT NULL,
                        last_post_id INTEGER NOT NULL,
                        current_last_post_id INTEGER NOT NULL,
                        total_new_posts INTEGER NOT NULL DEFAULT 0,
                        now_archived INTEGER NOT NULL DEFAULT 0,
                        now_deleted INTEGER NOT NULL DEFAULT 0,
                        PRIMARY KEY (board, thread_id)
                    );

                    PRAGMA user_version = {SCHEMA_VERSION};
                    "
                ))
                .map_err(StoreError::Schema)?;
        }

        Ok(())
    }

    /// Replace the stored watch-list with `threads`, keeping their order
    pub fn save_watch_list(&mut self, threads: &[WatchedThread]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM watched_threads", [])?;

        {
            let mut stmt = tx.prepare(
                r"INSERT INTO watched_threads (board, thread_id, position, subject, content, author,
                    created_at, last_post_id, current_last_post_id, total_new_posts, now_archived, now_deleted)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;

            for (position, watched) in threads.iter().enumerate() {
                let thread = &watched.thread;
                stmt.execute(params![
                    thread.board,
                    thread.id as i64,
                    position as i64,
                    thread.subject,
                    thread.content,
                    thread.author,
                    thread.created_at.to_rfc3339(),
                    watched.last_post_id as i64,
                    watched.current_last_post_id as i64,
                    watched.total_new_posts as i64,
                    watched.now_archived,
                    watched.now_deleted,
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!("Saved {} watched threads", threads.len());
        Ok(())
    }

    /// Load the stored watch-list in its saved order
    pub fn load_watch_list(&self) -> Result<Vec<WatchedThread>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT board, thread_id, subject, content, author, created_at, last_post_id,
                    current_last_post_id, total_new_posts, now_archived, now_deleted
             FROM watched_threads ORDER BY position ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(StoredRow {
                board: row.get(0)?,
                thread_id: row.get(1)?,
                subject: row.get(2)?,
                content: row.get(3)?,
                author: row.get(4)?,
                created_at: row.get(5)?,
                last_post_id: row.get(6)?,
                current_last_post_id: row.get(7)?,
                total_new_posts: row.get(8)?,
                now_archived: row.get(9)?,
                now_deleted: row.get(10)?,
            })
        })?;

        rows.map(|row| Self::row_to_watched(row?)).collect()
    }

    /// Validate a stored row; statistics and transient flags come back defaulted
    fn row_to_watched(row: StoredRow) -> Result<WatchedThread, StoreError> {
        let invalid = |reason: String| StoreError::Decode {
            board: row.board.clone(),
            thread_id: row.thread_id,
            reason,
        };
        let unsigned = |value: i64, column: &str| {
            u64::try_from(value).map_err(|_| invalid(format!("negative {column}: {value}")))
        };

        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| invalid(format!("bad created_at: {e}")))?
            .with_timezone(&Utc);

        let mut thread = Thread::new(&row.board, unsigned(row.thread_id, "thread_id")?);
        thread.subject = row.subject.clone();
        thread.content = row.content.clone();
        thread.author = row.author.clone();
        thread.created_at = created_at;

        Ok(WatchedThread {
            thread,
            last_post_id: unsigned(row.last_post_id, "last_post_id")?,
            current_last_post_id: unsigned(row.current_last_post_id, "current_last_post_id")?,
            total_new_posts: usize::try_from(unsigned(row.total_new_posts, "total_new_posts")?)
                .map_err(|e| invalid(e.to_string()))?,
            now_archived: row.now_archived,
            now_deleted: row.now_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ThreadStats;
    use tempfile::tempdir;

    fn watched(board: &str, id: u64) -> WatchedThread {
        let mut thread = Thread::new(board, id);
        thread.subject = Some(format!("Thread {id}"));
        thread.content = Some("first<br>post".to_string());
        thread.author = "Anonymous".to_string();
        thread.created_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        thread.sticky = true;
        thread.stats = ThreadStats {
            replies: 40,
            images: 3,
            ..ThreadStats::default()
        };

        let mut watched = WatchedThread::new(thread, id + 5);
        watched.current_last_post_id = id + 9;
        watched.total_new_posts = 4;
        watched
    }

    #[test]
    fn test_database_init() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.sqlite");
        let db = Database::open_path(&path).unwrap();
        assert!(db.load_watch_list().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_watch_list() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.sqlite");

        let mut archived = watched("v", 7);
        archived.now_archived = true;
        let threads = vec![watched("g", 300), archived, watched("g", 100)];

        let mut db = Database::open_path(&path).unwrap();
        db.save_watch_list(&threads).unwrap();
        drop(db);

        let loaded = Database::open_path(&path).unwrap().load_watch_list().unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].thread_id(), 300);
        assert_eq!(loaded[2].thread_id(), 100);
        assert!(loaded[1].now_archived);

        let first = &loaded[0];
        assert_eq!(first.last_post_id, 305);
        assert_eq!(first.current_last_post_id, 309);
        assert_eq!(first.total_new_posts, 4);
        assert_eq!(first.thread.subject.as_deref(), Some("Thread 300"));
        assert_eq!(first.thread.created_at, threads[0].thread.created_at);

        // Not persisted
        assert!(!first.thread.sticky);
        assert_eq!(first.thread.stats, ThreadStats::default());
    }

    #[test]
    fn test_save_replaces_previous_list() {
        let dir = tempdir().unwrap();
        let mut db = Database::open_path(&dir.path().join("test.sqlite")).unwrap();

        db.save_watch_list(&[watched("g", 1), watched("g", 2)]).unwrap();
        db.save_watch_list(&[watched("g", 2)]).unwrap();

        let loaded = db.load_watch_list().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].thread_id(), 2);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.sqlite");
        Connection::open(&path)
            .unwrap()
            .execute_batch("PRAGMA user_version = 99;")
            .unwrap();

        assert!(matches!(
            Database::open_path(&path),
            Err(StoreError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_bad_row_is_decode_error() {
        let dir = tempdir().unwrap();
        let mut db = Database::open_path(&dir.path().join("test.sqlite")).unwrap();
        db.save_watch_list(&[watched("g", 1)]).unwrap();
        db.conn
            .execute("UPDATE watched_threads SET created_at = 'yesterday'", [])
            .unwrap();

        assert!(matches!(
            db.load_watch_list(),
            Err(StoreError::Decode { thread_id: 1, .. })
        ));
    }
}
