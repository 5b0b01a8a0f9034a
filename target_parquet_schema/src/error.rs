use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SchemaError {
    /// The stream's schema is not a valid draft 4 JSON schema.
    #[snafu(display("invalid schema for stream {stream}: {message}"))]
    InvalidSchema { stream: String, message: String },
    /// A record does not conform to its stream's schema.
    #[snafu(display("record for stream {stream} failed validation at '{path}': {reason}"))]
    Validation {
        stream: String,
        path: String,
        reason: String,
    },
}

pub type Result<T, E = SchemaError> = std::result::Result<T, E>;
