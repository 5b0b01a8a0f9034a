use std::{num::NonZeroUsize, path::PathBuf, sync::Arc};

use serde_json::Value;
use target_parquet_writer::FileWriter;
use tokio::{io::AsyncBufRead, sync::mpsc};
use tracing::debug;

use crate::{
    batcher::Batcher,
    error::{PipelineFailure, SinkError},
    ingestor::Ingestor,
};

pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Number of records after which a stream's buffer is rotated into a
    /// new file. `None` never rotates.
    pub file_size: Option<NonZeroUsize>,
    /// Capacity of the channel between the ingestor and the batcher.
    pub queue_capacity: usize,
}

/// The result of a successful run.
#[derive(Debug)]
pub struct PipelineOutput {
    /// The checkpoint to emit, if one is pending.
    pub state: Option<Value>,
    /// Every file written, in write order.
    pub files: Vec<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            file_size: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl PipelineOptions {
    /// Interprets a configured file size, where zero or a negative value is
    /// unbounded.
    pub fn with_file_size(mut self, file_size: i64) -> Self {
        self.file_size = usize::try_from(file_size)
            .ok()
            .and_then(NonZeroUsize::new);
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }
}

/// Runs the ingestor on the current task and the batcher on a spawned task,
/// connected by a bounded channel.
///
/// Always waits for the batcher to finish before returning, so every file
/// reported (on success or failure) is completely written. When both sides
/// fail, the batcher's error is reported because the ingestor only fails as
/// a consequence of it.
pub async fn run_pipeline<R>(
    input: R,
    writer: Arc<dyn FileWriter>,
    options: PipelineOptions,
) -> Result<PipelineOutput, PipelineFailure>
where
    R: AsyncBufRead + Unpin,
{
    let (tx, rx) = mpsc::channel(options.queue_capacity.max(1));

    let batcher = Batcher::new(writer, options.file_size);
    let batcher_task = tokio::spawn(batcher.run(rx));

    let ingested = Ingestor::new().run(input, tx).await;
    debug!(success = ingested.is_ok(), "ingestion finished, waiting for batcher");

    let batched = match batcher_task.await {
        Ok(batched) => batched,
        Err(err) => {
            return Err(PipelineFailure {
                source: SinkError::BatcherTask { source: err },
                files: Vec::new(),
            });
        }
    };

    match (ingested, batched) {
        (_, Err(failure)) => Err(failure),
        (Err(source), Ok(files)) => Err(PipelineFailure { source, files }),
        (Ok(state), Ok(files)) => Ok(PipelineOutput { state, files }),
    }
}
