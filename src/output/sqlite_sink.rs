//! SQLite record sink
//!
//! Each seed is stored as one row of `runs`; posts and edges are inserted as
//! they arrive with `INSERT OR IGNORE`, so an interrupted or cancelled run
//! keeps everything it emitted and a rerun never duplicates rows.

use crate::output::schema::initialize_schema;
use crate::output::traits::{OutputResult, RecordSink, RunStatus};
use crate::record::{Edge, Post, Record};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

/// SQLite record sink for one seed
pub struct SqliteSink {
    conn: Connection,
    run_id: i64,
    written: u64,
}

impl SqliteSink {
    /// Opens (or creates) the database and starts a run
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `seed` - Seed label stored with the run
    /// * `seed_kind` - Seed kind stored with the run
    /// * `config_hash` - Hash of the configuration that produced the run
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteSink)` - Database opened and run row created
    /// * `Err(OutputError)` - Failed to open or initialize the database
    pub fn open(path: &Path, seed: &str, seed_kind: &str, config_hash: &str) -> OutputResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        Self::start(conn, seed, seed_kind, config_hash)
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory(seed: &str, seed_kind: &str) -> OutputResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::start(conn, seed, seed_kind, "test")
    }

    fn start(conn: Connection, seed: &str, seed_kind: &str, config_hash: &str) -> OutputResult<Self> {
        initialize_schema(&conn)?;

        conn.execute(
            "INSERT INTO runs (seed, seed_kind, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                seed,
                seed_kind,
                Utc::now().to_rfc3339(),
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        let run_id = conn.last_insert_rowid();
        tracing::debug!("Started output run {} for {}", run_id, seed);

        Ok(Self {
            conn,
            run_id,
            written: 0,
        })
    }

    /// ID of this sink's row in `runs`
    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Borrows the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn insert_post(&self, post: &Post) -> OutputResult<()> {
        let e = &post.engagement;
        self.conn.execute(
            "INSERT OR IGNORE INTO posts (
                id, run_id, author_handle, author_name, text, published_at,
                replies, retweets, likes, bookmarks, views, hashtags,
                image_url, video_url, video_preview_url, permalink, target
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                post.id,
                self.run_id,
                post.author_handle,
                post.author_name,
                post.text,
                post.published_at_iso(),
                e.replies.map(|v| v as i64),
                e.retweets.map(|v| v as i64),
                e.likes.map(|v| v as i64),
                e.bookmarks.map(|v| v as i64),
                e.views.map(|v| v as i64),
                post.hashtags.join(" "),
                post.image_url,
                post.video_url,
                post.video_preview_url,
                post.permalink,
                post.target,
            ],
        )?;
        Ok(())
    }

    fn insert_edge(&self, edge: &Edge) -> OutputResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO edges (run_id, source, target, kind) VALUES (?1, ?2, ?3, ?4)",
            params![self.run_id, edge.source, edge.target, edge.kind.path_segment()],
        )?;
        Ok(())
    }
}

impl RecordSink for SqliteSink {
    fn write_record(&mut self, record: &Record) -> OutputResult<()> {
        match record {
            Record::Post(post) => self.insert_post(post)?,
            Record::Edge(edge) => self.insert_edge(edge)?,
        }
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self, status: RunStatus) -> OutputResult<()> {
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, records = ?3 WHERE id = ?4",
            params![
                status.to_db_string(),
                Utc::now().to_rfc3339(),
                self.written as i64,
                self.run_id
            ],
        )?;
        Ok(())
    }
}
