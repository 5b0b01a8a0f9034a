//! Singer protocol messages.
//!
//! Every input line holds one JSON object whose `type` member selects the
//! message kind.
use serde::Deserialize;
use serde_json::{Map, Value};
use snafu::{OptionExt, ResultExt};

use crate::error::{MissingMessageTypeSnafu, ParseSnafu, Result, UnknownMessageTypeSnafu};

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A data record. `record` is always a JSON object.
    Record { stream: String, record: Value },
    /// A checkpoint value; `null` clears any pending checkpoint.
    State { value: Value },
    /// The JSON schema of a stream's records.
    Schema {
        stream: String,
        schema: Value,
        key_properties: Vec<String>,
    },
}

#[derive(Deserialize)]
struct RecordMessage {
    stream: String,
    record: Map<String, Value>,
}

#[derive(Deserialize)]
struct StateMessage {
    #[serde(default)]
    value: Value,
}

#[derive(Deserialize)]
struct SchemaMessage {
    stream: String,
    schema: Map<String, Value>,
    #[serde(default)]
    key_properties: Vec<String>,
}

impl Message {
    /// Decodes one line of input.
    pub fn parse(line: &str) -> Result<Self> {
        let envelope: Value = serde_json::from_str(line).context(ParseSnafu { line })?;
        let message_type = envelope
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .context(MissingMessageTypeSnafu { line })?;

        match message_type.as_str() {
            "RECORD" => {
                let message: RecordMessage =
                    serde_json::from_value(envelope).context(ParseSnafu { line })?;
                Ok(Self::Record {
                    stream: message.stream,
                    record: Value::Object(message.record),
                })
            }
            "STATE" => {
                let message: StateMessage =
                    serde_json::from_value(envelope).context(ParseSnafu { line })?;
                Ok(Self::State {
                    value: message.value,
                })
            }
            "SCHEMA" => {
                let message: SchemaMessage =
                    serde_json::from_value(envelope).context(ParseSnafu { line })?;
                Ok(Self::Schema {
                    stream: message.stream,
                    schema: Value::Object(message.schema),
                    key_properties: message.key_properties,
                })
            }
            other => UnknownMessageTypeSnafu {
                message_type: other,
            }
            .fail(),
        }
    }

    pub fn message_type(&self) -> &'static str {
        match self {
            Self::Record { .. } => "RECORD",
            Self::State { .. } => "STATE",
            Self::Schema { .. } => "SCHEMA",
        }
    }
}
