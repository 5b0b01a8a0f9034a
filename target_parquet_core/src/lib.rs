pub mod batcher;
pub mod error;
pub mod ingestor;
pub mod message;
pub mod pipeline;
pub mod types;

pub use batcher::Batcher;
pub use error::{PipelineFailure, Result, SinkError};
pub use ingestor::Ingestor;
pub use message::Message;
pub use pipeline::{DEFAULT_QUEUE_CAPACITY, PipelineOptions, PipelineOutput, run_pipeline};
pub use types::PipelineEvent;
