//! Error types for the document sink.

use basket_types::RecordKind;
use thiserror::Error;

/// JSON to BSON conversion failures. Conversion never drops a field silently.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Malformed JSON document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Expected a JSON object at the top level, found {0}")]
    NotAnObject(&'static str),

    #[error("Number {value} at '{path}' has no exact BSON representation")]
    UnrepresentableNumber { path: String, value: String },
}

/// Errors from writing to the document store.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("MongoDB error: {0}")]
    MongoDB(#[from] mongodb::error::Error),

    #[error("Failed to convert {kind} document: {source}")]
    Convert {
        kind: RecordKind,
        #[source]
        source: ConvertError,
    },

    #[error("Batch buffer of {capacity} pairs is already full")]
    BatchOverflow { capacity: usize },
}
