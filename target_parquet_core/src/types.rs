use target_parquet_schema::{FlatRecord, FlatSchema};

/// An event sent from the ingestor to the batcher.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A schema was declared, or replaced, for a stream.
    Schema { stream: String, fields: FlatSchema },
    /// A validated, flattened record.
    Record { stream: String, record: FlatRecord },
    /// No more events follow. Sent exactly once, always last.
    End,
}
