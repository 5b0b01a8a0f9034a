//! Record and schema reshaping for Singer streams.
//!
//! Records arrive as nested JSON objects and leave as flat, single-level
//! mappings that can be laid out as columns. Each stream's JSON schema is
//! compiled once into a [`StreamValidator`] that checks raw records before
//! they are flattened.
pub mod error;
pub mod flatten;
pub mod validator;

pub use error::{Result, SchemaError};
pub use flatten::{FlatRecord, FlatSchema, SEPARATOR, flatten, flatten_schema};
pub use validator::StreamValidator;
