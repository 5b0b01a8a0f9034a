use std::collections::HashMap;

use serde_json::Value;
use snafu::ResultExt;
use target_parquet_schema::{FlatSchema, StreamValidator, flatten, flatten_schema};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc,
};
use tracing::{debug, trace, warn};

use crate::{
    error::{BatcherClosedSnafu, InputSnafu, Result, SinkError, UnknownStreamSnafu},
    message::Message,
    types::PipelineEvent,
};

/// Reads messages, validates and flattens records, and forwards them to the
/// batcher.
///
/// The ingestor owns the schema of every stream. It also tracks the pending
/// checkpoint: the last state value received after the last record.
#[derive(Debug, Default)]
pub struct Ingestor {
    streams: HashMap<String, StreamState>,
    state: Option<Value>,
}

#[derive(Debug)]
struct StreamState {
    validator: StreamValidator,
    fields: FlatSchema,
    key_properties: Vec<String>,
}

impl Ingestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes `input` until it is exhausted or a fatal error occurs.
    ///
    /// [`PipelineEvent::End`] is sent on every path, including errors, before
    /// returning. On success returns the pending checkpoint, if any.
    pub async fn run<R>(mut self, input: R, tx: mpsc::Sender<PipelineEvent>) -> Result<Option<Value>>
    where
        R: AsyncBufRead + Unpin,
    {
        let result = self.consume(input, &tx).await;

        if tx.send(PipelineEvent::End).await.is_err() {
            debug!("batcher stopped before the end of input was signalled");
        }

        result.map(|_| self.state)
    }

    async fn consume<R>(&mut self, input: R, tx: &mpsc::Sender<PipelineEvent>) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();

        while let Some(line) = lines.next_line().await.context(InputSnafu {})? {
            trace!(%line, "received message");

            let message = match Message::parse(&line) {
                Ok(message) => message,
                Err(SinkError::UnknownMessageType { message_type }) => {
                    warn!(%message_type, %line, "skipping message with unknown type");
                    continue;
                }
                Err(err) => return Err(err),
            };

            self.handle_message(message, tx).await?;
        }

        Ok(())
    }

    async fn handle_message(
        &mut self,
        message: Message,
        tx: &mpsc::Sender<PipelineEvent>,
    ) -> Result<()> {
        match message {
            Message::Schema {
                stream,
                schema,
                key_properties,
            } => {
                let validator = StreamValidator::compile(stream.as_str(), &schema)?;
                let fields = schema
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(flatten_schema)
                    .unwrap_or_default();
                debug!(%stream, ?fields, ?key_properties, "received schema");

                self.streams.insert(
                    stream.clone(),
                    StreamState {
                        validator,
                        fields: fields.clone(),
                        key_properties,
                    },
                );

                send(tx, PipelineEvent::Schema { stream, fields }).await
            }
            Message::Record { stream, record } => {
                let Some(state) = self.streams.get(&stream) else {
                    return UnknownStreamSnafu { stream }.fail();
                };

                state.validator.validate(&record)?;
                let record = flatten(record);
                self.state = None;

                send(tx, PipelineEvent::Record { stream, record }).await
            }
            Message::State { value } => {
                debug!(%value, "setting state");
                self.state = (!value.is_null()).then_some(value);
                Ok(())
            }
        }
    }

    /// The flattened schema last declared for `stream`.
    pub fn schema(&self, stream: &str) -> Option<&FlatSchema> {
        self.streams.get(stream).map(|state| &state.fields)
    }

    pub fn key_properties(&self, stream: &str) -> Option<&[String]> {
        self.streams
            .get(stream)
            .map(|state| state.key_properties.as_slice())
    }

    /// The checkpoint that would be emitted if input ended now.
    pub fn pending_state(&self) -> Option<&Value> {
        self.state.as_ref()
    }
}

async fn send(tx: &mpsc::Sender<PipelineEvent>, event: PipelineEvent) -> Result<()> {
    tx.send(event)
        .await
        .or_else(|_| BatcherClosedSnafu {}.fail())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const USERS_SCHEMA: &str = r#"{"type":"SCHEMA","stream":"users","schema":{"type":"object","properties":{"id":{"type":"integer"},"address":{"type":"object","properties":{"city":{"type":"string"}}}}},"key_properties":["id"]}"#;

    fn input(lines: &[&str]) -> Vec<u8> {
        let mut buffer = lines.join("\n");
        buffer.push('\n');
        buffer.into_bytes()
    }

    async fn ingest(lines: &[&str]) -> (Result<Option<Value>>, Vec<PipelineEvent>) {
        let (tx, mut rx) = mpsc::channel(64);
        let data = input(lines);
        let result = Ingestor::new().run(data.as_slice(), tx).await;

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        (result, events)
    }

    #[tokio::test]
    async fn test_records_are_flattened_and_forwarded() {
        let (result, events) = ingest(&[
            USERS_SCHEMA,
            r#"{"type":"RECORD","stream":"users","record":{"id":1,"address":{"city":"Porto"}}}"#,
        ])
        .await;

        assert_eq!(result.unwrap(), None);
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], PipelineEvent::Schema { stream, fields }
            if stream == "users" && fields.contains_key("address__city")));

        let PipelineEvent::Record { stream, record } = &events[1] else {
            panic!("expected a record event");
        };
        assert_eq!(stream, "users");
        assert_eq!(record["address__city"], json!("Porto"));
        assert_eq!(events[2], PipelineEvent::End);
    }

    #[tokio::test]
    async fn test_record_before_schema_fails_and_ends() {
        let (result, events) =
            ingest(&[r#"{"type":"RECORD","stream":"ghost","record":{"id":1}}"#]).await;

        let err = result.unwrap_err();
        assert!(matches!(err, SinkError::UnknownStream { ref stream } if stream == "ghost"));
        assert_eq!(events, vec![PipelineEvent::End]);
    }

    #[tokio::test]
    async fn test_invalid_record_fails_and_ends() {
        let (result, events) = ingest(&[
            USERS_SCHEMA,
            r#"{"type":"RECORD","stream":"users","record":{"id":"one"}}"#,
            r#"{"type":"RECORD","stream":"users","record":{"id":2}}"#,
        ])
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, SinkError::Schema { .. }));
        assert!(err.to_string().contains("users"));
        assert_eq!(events.len(), 2);
        assert_eq!(events.last(), Some(&PipelineEvent::End));
    }

    #[tokio::test]
    async fn test_parse_error_is_fatal() {
        let (result, events) = ingest(&[USERS_SCHEMA, "this is not json"]).await;

        assert!(matches!(result.unwrap_err(), SinkError::Parse { .. }));
        assert_eq!(events.last(), Some(&PipelineEvent::End));
    }

    #[tokio::test]
    async fn test_unknown_message_types_are_skipped() {
        let (result, events) = ingest(&[
            r#"{"type":"ACTIVATE_VERSION","stream":"users","version":1}"#,
            USERS_SCHEMA,
            r#"{"type":"RECORD","stream":"users","record":{"id":1}}"#,
        ])
        .await;

        assert!(result.is_ok());
        assert_eq!(events.len(), 3);
    }

    #[tokio::test]
    async fn test_record_clears_pending_state() {
        let (result, _) = ingest(&[
            USERS_SCHEMA,
            r#"{"type":"STATE","value":{"offset":1}}"#,
            r#"{"type":"RECORD","stream":"users","record":{"id":1}}"#,
        ])
        .await;

        assert_eq!(result.unwrap(), None);
    }

    #[tokio::test]
    async fn test_last_state_after_records_wins() {
        let (result, _) = ingest(&[
            r#"{"type":"STATE","value":"v1"}"#,
            USERS_SCHEMA,
            r#"{"type":"RECORD","stream":"users","record":{"id":1}}"#,
            r#"{"type":"STATE","value":"v2"}"#,
            r#"{"type":"STATE","value":"v3"}"#,
        ])
        .await;

        assert_eq!(result.unwrap(), Some(json!("v3")));
    }

    #[tokio::test]
    async fn test_null_state_clears_pending_state() {
        let (result, _) = ingest(&[
            r#"{"type":"STATE","value":"v1"}"#,
            r#"{"type":"STATE","value":null}"#,
        ])
        .await;

        assert_eq!(result.unwrap(), None);
    }

    #[tokio::test]
    async fn test_schema_is_replaced() {
        let (tx, mut rx) = mpsc::channel(64);
        let mut ingestor = Ingestor::new();

        for line in [
            USERS_SCHEMA,
            r#"{"type":"SCHEMA","stream":"users","schema":{"properties":{"email":{"type":"string"}}},"key_properties":[]}"#,
        ] {
            let message = Message::parse(line).unwrap();
            ingestor.handle_message(message, &tx).await.unwrap();
        }

        let schema = ingestor.schema("users").unwrap();
        assert_eq!(schema.keys().collect::<Vec<_>>(), vec!["email"]);
        assert_eq!(ingestor.key_properties("users"), Some(&[][..]));

        // The old schema no longer applies: ids may now be anything.
        let record = Message::parse(r#"{"type":"RECORD","stream":"users","record":{"id":"x"}}"#).unwrap();
        ingestor.handle_message(record, &tx).await.unwrap();

        drop(tx);
        let mut count = 0;
        while rx.recv().await.is_some() {
            count += 1;
        }
        assert_eq!(count, 3);
        assert_eq!(ingestor.pending_state(), None);
    }

    #[tokio::test]
    async fn test_closed_batcher_stops_ingestion() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let data = input(&[USERS_SCHEMA]);

        let err = Ingestor::new().run(data.as_slice(), tx).await.unwrap_err();
        assert!(matches!(err, SinkError::BatcherClosed));
    }
}
