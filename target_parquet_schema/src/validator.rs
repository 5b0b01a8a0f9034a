use std::fmt::Debug;

use serde_json::Value;

use crate::error::{InvalidSchemaSnafu, Result, ValidationSnafu};

/// A stream's JSON schema compiled for draft 4 validation.
pub struct StreamValidator {
    stream: String,
    validator: jsonschema::Validator,
}

impl StreamValidator {
    /// Compiles the schema declared for `stream`.
    pub fn compile(stream: impl Into<String>, schema: &Value) -> Result<Self> {
        let stream = stream.into();
        let validator = match jsonschema::draft4::new(schema) {
            Ok(validator) => validator,
            Err(err) => {
                return InvalidSchemaSnafu {
                    stream,
                    message: err.to_string(),
                }
                .fail();
            }
        };

        Ok(Self { stream, validator })
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Checks a raw record, reporting the first violation found.
    pub fn validate(&self, record: &Value) -> Result<()> {
        let Some(error) = self.validator.iter_errors(record).next() else {
            return Ok(());
        };

        ValidationSnafu {
            stream: self.stream.as_str(),
            path: error.instance_path.to_string(),
            reason: error.to_string(),
        }
        .fail()
    }
}

impl Debug for StreamValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamValidator")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}
