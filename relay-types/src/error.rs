//! Error types for txrelay wire types.

use thiserror::Error;

/// A text-safe encoded field could not be decoded.
///
/// Carries the field name and the offending value so the caller can be told
/// exactly which part of the request was malformed.
#[derive(Debug, Clone, Error)]
#[error("unable to decode {field}: {value}, error: {source}")]
pub struct DecodeError {
    /// Name of the request field.
    pub field: &'static str,
    /// The value as received.
    pub value: String,
    /// Underlying base64 failure.
    #[source]
    pub source: base64::DecodeError,
}
