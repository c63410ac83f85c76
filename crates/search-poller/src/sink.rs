//! Record sinks
//!
//! A sink receives every valid record, one at a time, in upstream order. The
//! poller awaits each publish before moving on, so a slow sink throttles the
//! polling rate. Sinks decide what shape they write: the queue sink publishes
//! the normalized envelope, the file sink keeps the raw record.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::info;

use crate::error::Result;
use crate::record::FetchedRecord;

/// Boxed future returned by sink methods.
pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Destination for relayed records.
///
/// Uses `Pin<Box<dyn Future>>` return types so sinks can be held as
/// `Box<dyn RecordSink>`.
pub trait RecordSink: Send {
    /// Identifier for logging (e.g. "kafka", "json-lines")
    fn name(&self) -> &str;

    /// Deliver one record. An error aborts the run.
    fn publish<'a>(&'a mut self, record: &'a FetchedRecord) -> SinkFuture<'a>;

    /// Flush anything buffered. Called once when the run ends.
    fn flush(&mut self) -> SinkFuture<'_>;
}

/// Append-only newline-delimited JSON file of raw records.
pub struct JsonLinesSink {
    path: PathBuf,
    writer: BufWriter<tokio::fs::File>,
    written: u64,
}

impl JsonLinesSink {
    /// Open (or create) the file in append mode. Opened once per run.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        info!(path = %path.display(), "writing raw records to JSON lines file");
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines written by this sink so far.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl RecordSink for JsonLinesSink {
    fn name(&self) -> &str {
        "json-lines"
    }

    fn publish<'a>(&'a mut self, record: &'a FetchedRecord) -> SinkFuture<'a> {
        Box::pin(async move {
            let mut line = serde_json::to_vec(&record.raw)?;
            line.push(b'\n');
            self.writer.write_all(&line).await?;
            self.written += 1;
            Ok(())
        })
    }

    fn flush(&mut self) -> SinkFuture<'_> {
        Box::pin(async move {
            self.writer.flush().await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: u64) -> FetchedRecord {
        FetchedRecord::from_value(json!({
            "id": id,
            "id_str": id.to_string(),
            "created_at": "Wed Oct 10 20:19:24 +0000 2018",
            "user": {"screen_name": "alice"}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn writes_one_raw_record_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tweets.jsonl");

        let mut sink = JsonLinesSink::open(&path).await.unwrap();
        sink.publish(&record(2)).await.unwrap();
        sink.publish(&record(1)).await.unwrap();
        sink.flush().await.unwrap();
        assert_eq!(sink.written(), 2);

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, record(2).raw);
        assert!(contents.ends_with('\n'));
    }

    #[tokio::test]
    async fn appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tweets.jsonl");
        tokio::fs::write(&path, "{\"id\":0}\n").await.unwrap();

        let mut sink = JsonLinesSink::open(&path).await.unwrap();
        sink.publish(&record(9)).await.unwrap();
        sink.flush().await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.starts_with("{\"id\":0}\n"));
    }

    #[tokio::test]
    async fn open_fails_for_missing_directory() {
        let result = JsonLinesSink::open("/nonexistent/dir/tweets.jsonl").await;
        assert!(result.is_err());
    }
}
