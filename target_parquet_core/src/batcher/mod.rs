use std::{collections::HashMap, num::NonZeroUsize, path::PathBuf, sync::Arc};

use snafu::ResultExt;
use target_parquet_schema::{FlatRecord, FlatSchema};
use target_parquet_writer::FileWriter;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    error::{PipelineFailure, Result, WriteSnafu},
    types::PipelineEvent,
};

use self::buffer::StreamBuffer;

mod buffer;

/// Groups records by stream and flushes each group as one file.
///
/// A stream's buffer is flushed when a record for a different stream
/// arrives, when it reaches a multiple of the file size threshold, and at end
/// of input. A stream that reappears after another stream therefore gets one
/// file per contiguous run of records.
pub struct Batcher {
    writer: Arc<dyn FileWriter>,
    file_size: Option<NonZeroUsize>,
    buffers: HashMap<String, StreamBuffer>,
    current_stream: Option<String>,
    schemas: HashMap<String, FlatSchema>,
    files: Vec<PathBuf>,
}

impl Batcher {
    pub fn new(writer: Arc<dyn FileWriter>, file_size: Option<NonZeroUsize>) -> Self {
        Self {
            writer,
            file_size,
            buffers: HashMap::new(),
            current_stream: None,
            schemas: HashMap::new(),
            files: Vec::new(),
        }
    }

    /// Consumes events until [`PipelineEvent::End`] and returns the paths of
    /// every file written, in write order.
    ///
    /// Stops at the first write failure. The failure lists the files written
    /// before it.
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<PipelineEvent>,
    ) -> std::result::Result<Vec<PathBuf>, PipelineFailure> {
        loop {
            let result = match rx.recv().await {
                Some(PipelineEvent::Record { stream, record }) => {
                    self.write_record(stream, record).await
                }
                Some(PipelineEvent::Schema { stream, fields }) => {
                    debug!(%stream, num_fields = fields.len(), "registered schema");
                    self.schemas.insert(stream, fields);
                    Ok(())
                }
                Some(PipelineEvent::End) => break,
                None => {
                    warn!("event channel closed without an end of input marker");
                    break;
                }
            };

            if let Err(source) = result {
                return Err(PipelineFailure {
                    source,
                    files: self.files,
                });
            }
        }

        // Drop the receiver so the ingestor never blocks on a batcher that
        // stopped listening.
        drop(rx);

        if let Err(source) = self.finish().await {
            return Err(PipelineFailure {
                source,
                files: self.files,
            });
        }

        info!("Wrote {} files", self.files.len());
        debug!(files = ?self.files, "files written");

        Ok(self.files)
    }

    async fn write_record(&mut self, stream: String, record: FlatRecord) -> Result<()> {
        if self.current_stream.as_deref() != Some(stream.as_str()) {
            if let Some(previous) = self.current_stream.replace(stream.clone()) {
                self.flush_stream(&previous).await?;
            }
        }

        let buffered = match self.buffers.get_mut(&stream) {
            Some(buffer) => {
                buffer.push(record);
                buffer.len()
            }
            None => {
                self.buffers
                    .insert(stream.clone(), StreamBuffer::new(record));
                1
            }
        };

        let rotate = self
            .file_size
            .is_some_and(|size| buffered % size.get() == 0);
        if rotate {
            self.flush_stream(&stream).await?;
        }

        Ok(())
    }

    /// Flushes the buffer of the active stream.
    ///
    /// Every other stream was flushed when the active stream took over.
    async fn finish(&mut self) -> Result<()> {
        if let Some(current) = self.current_stream.take() {
            self.flush_stream(&current).await?;
        }

        debug_assert!(
            self.buffers.is_empty(),
            "inactive streams still hold buffered records"
        );

        Ok(())
    }

    async fn flush_stream(&mut self, stream: &str) -> Result<()> {
        let Some(buffer) = self.buffers.remove(stream) else {
            return Ok(());
        };

        if buffer.is_empty() {
            return Ok(());
        }

        let num_records = buffer.len();
        debug!(%stream, num_records, "flushing stream buffer");

        let path = self
            .writer
            .write(stream, buffer.into_records())
            .await
            .context(WriteSnafu { stream })?;

        self.files.push(path);

        Ok(())
    }

    /// The flattened schema last announced for `stream`.
    pub fn schema(&self, stream: &str) -> Option<&FlatSchema> {
        self.schemas.get(stream)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use target_parquet_writer::InMemoryFileWriter;

    use super::*;

    fn record(id: u64) -> FlatRecord {
        let mut record = FlatRecord::new();
        record.insert("id".to_string(), json!(id));
        record
    }

    fn record_event(stream: &str, id: u64) -> PipelineEvent {
        PipelineEvent::Record {
            stream: stream.to_string(),
            record: record(id),
        }
    }

    async fn run_batcher(
        events: Vec<PipelineEvent>,
        file_size: Option<usize>,
    ) -> (Vec<PathBuf>, Arc<InMemoryFileWriter>) {
        let writer = Arc::new(InMemoryFileWriter::new());
        let batcher = Batcher::new(writer.clone(), file_size.and_then(NonZeroUsize::new));
        let (tx, rx) = mpsc::channel(events.len() + 1);
        for event in events {
            tx.send(event).await.unwrap();
        }
        drop(tx);

        let files = batcher.run(rx).await.expect("batcher run");
        (files, writer)
    }

    fn ids(records: &[FlatRecord]) -> Vec<u64> {
        records
            .iter()
            .map(|r| r["id"].as_u64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_single_stream_single_file() {
        let (files, writer) = run_batcher(
            vec![record_event("s", 1), record_event("s", 2), PipelineEvent::End],
            None,
        )
        .await;

        assert_eq!(files.len(), 1);
        let written = writer.files();
        assert_eq!(written[0].path, files[0]);
        assert_eq!(ids(&written[0].records), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_stream_switch_flushes_previous_stream() {
        let (files, writer) = run_batcher(
            vec![
                record_event("a", 1),
                record_event("a", 2),
                record_event("b", 3),
                record_event("a", 4),
                PipelineEvent::End,
            ],
            None,
        )
        .await;

        assert_eq!(files.len(), 3);
        let written = writer.files();
        let summary = written
            .iter()
            .map(|f| (f.stream.as_str(), ids(&f.records)))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![("a", vec![1, 2]), ("b", vec![3]), ("a", vec![4])]
        );
    }

    #[tokio::test]
    async fn test_rotation_at_threshold() {
        let mut events = (0..7).map(|i| record_event("s", i)).collect::<Vec<_>>();
        events.push(PipelineEvent::End);

        let (files, writer) = run_batcher(events, Some(3)).await;

        assert_eq!(files.len(), 3);
        let sizes = writer
            .files()
            .iter()
            .map(|f| f.records.len())
            .collect::<Vec<_>>();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[tokio::test]
    async fn test_rotation_evenly_divisible() {
        let mut events = (0..6).map(|i| record_event("s", i)).collect::<Vec<_>>();
        events.push(PipelineEvent::End);

        let (files, writer) = run_batcher(events, Some(3)).await;

        assert_eq!(files.len(), 2);
        let written = writer.files();
        assert_eq!(ids(&written[0].records), vec![0, 1, 2]);
        assert_eq!(ids(&written[1].records), vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn test_switch_after_rotation_has_nothing_to_flush() {
        let (files, writer) = run_batcher(
            vec![
                record_event("a", 1),
                record_event("a", 2),
                record_event("b", 3),
                PipelineEvent::End,
            ],
            Some(2),
        )
        .await;

        assert_eq!(files.len(), 2);
        let streams = writer
            .files()
            .into_iter()
            .map(|f| f.stream)
            .collect::<Vec<_>>();
        assert_eq!(streams, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_end_without_records() {
        let schema = PipelineEvent::Schema {
            stream: "s".to_string(),
            fields: FlatSchema::new(),
        };
        let (files, writer) = run_batcher(vec![schema, PipelineEvent::End], None).await;

        assert!(files.is_empty());
        assert!(writer.files().is_empty());
    }

    #[tokio::test]
    async fn test_closed_channel_flushes_like_end() {
        let (files, writer) = run_batcher(vec![record_event("s", 1)], None).await;

        assert_eq!(files.len(), 1);
        assert_eq!(writer.files_for("s").len(), 1);
    }

    #[tokio::test]
    async fn test_events_after_end_are_ignored() {
        let (files, _) = run_batcher(
            vec![record_event("s", 1), PipelineEvent::End, record_event("s", 2)],
            None,
        )
        .await;

        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_schema_is_tracked() {
        let writer = Arc::new(InMemoryFileWriter::new());
        let mut batcher = Batcher::new(writer, None);
        let mut fields = FlatSchema::new();
        fields.insert("id".to_string(), json!("integer"));

        batcher.schemas.insert("s".to_string(), fields.clone());
        assert_eq!(batcher.schema("s"), Some(&fields));
        assert_eq!(batcher.schema("t"), None);
    }
}
