//! Error types for basket-types crate.

use thiserror::Error;

/// Errors raised while loading or validating the seed catalog.
#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Failed to read seed file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed seed document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Seed catalog has no {0}")]
    Empty(&'static str),
}

/// Errors raised while encoding a record to protobuf.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Protobuf encoding error in {message}: {source}")]
    Protobuf {
        message: &'static str,
        #[source]
        source: protobuf::Error,
    },
}
