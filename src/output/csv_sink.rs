//! CSV record sink
//!
//! Posts and edges have different column sets, so one CSV file holds one
//! kind of record; the header is written when the first record arrives.

use crate::output::traits::{OutputError, OutputResult, RecordSink, RunStatus};
use crate::record::{Edge, Post, Record};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Columns of a post CSV file
pub const POST_COLUMNS: [&str; 16] = [
    "id",
    "text",
    "username",
    "fullname",
    "url",
    "publication_date",
    "photo_url",
    "video_url",
    "video_preview_image_url",
    "replies",
    "retweets",
    "likes",
    "bookmarks",
    "hashtags",
    "views",
    "target",
];

/// Columns of an edge CSV file
pub const EDGE_COLUMNS: [&str; 3] = ["target_username", "other_username", "type"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Posts,
    Edges,
}

/// Writes records as CSV rows
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    layout: Option<Layout>,
    written: u64,
}

impl CsvSink<File> {
    /// Creates (or truncates) a CSV file
    pub fn create(path: &Path) -> OutputResult<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
            layout: None,
            written: 0,
        }
    }

    /// Number of records written
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes and returns the underlying writer
    pub fn into_inner(self) -> OutputResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| OutputError::Write(e.to_string()))
    }

    fn ensure_layout(&mut self, layout: Layout) -> OutputResult<()> {
        match self.layout {
            Some(current) if current == layout => Ok(()),
            Some(_) => Err(OutputError::Write(
                "Posts and edges cannot share one CSV file".to_string(),
            )),
            None => {
                match layout {
                    Layout::Posts => self.writer.write_record(POST_COLUMNS)?,
                    Layout::Edges => self.writer.write_record(EDGE_COLUMNS)?,
                }
                self.layout = Some(layout);
                Ok(())
            }
        }
    }

    fn write_post(&mut self, post: &Post) -> OutputResult<()> {
        self.ensure_layout(Layout::Posts)?;

        let count = |value: Option<u64>| value.map(|v| v.to_string()).unwrap_or_default();
        let engagement = &post.engagement;

        self.writer.write_record([
            post.id.clone(),
            post.text.clone(),
            post.author_handle.clone(),
            post.author_name.clone(),
            post.permalink.clone(),
            post.published_at_iso().unwrap_or_default(),
            post.image_url.clone().unwrap_or_default(),
            post.video_url.clone().unwrap_or_default(),
            post.video_preview_url.clone().unwrap_or_default(),
            count(engagement.replies),
            count(engagement.retweets),
            count(engagement.likes),
            count(engagement.bookmarks),
            post.hashtags.join(" "),
            count(engagement.views),
            post.target.clone(),
        ])?;
        Ok(())
    }

    fn write_edge(&mut self, edge: &Edge) -> OutputResult<()> {
        self.ensure_layout(Layout::Edges)?;
        self.writer
            .write_record([edge.source.as_str(), edge.target.as_str(), edge.kind.path_segment()])?;
        Ok(())
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn write_record(&mut self, record: &Record) -> OutputResult<()> {
        match record {
            Record::Post(post) => self.write_post(post)?,
            Record::Edge(edge) => self.write_edge(edge)?,
        }
        self.written += 1;

        // Partial runs must stay readable.
        if self.written % 10 == 0 {
            self.writer.flush()?;
        }
        Ok(())
    }

    fn finish(&mut self, status: RunStatus) -> OutputResult<()> {
        tracing::debug!(
            "Closing CSV output after {} records ({})",
            self.written,
            status.to_db_string()
        );
        self.writer.flush()?;
        Ok(())
    }
}
