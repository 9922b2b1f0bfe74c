//! Transcoding between the wire form and internal bytes.
//!
//! Every binary field carried in JSON uses standard, padded base64. Decoding
//! only checks that the text is valid encoded data; length and emptiness are
//! the collaborators' business.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::{DecodeError, Identity, Key};

/// Decode a text-safe encoded request field.
pub fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD.decode(value).map_err(|source| DecodeError {
        field,
        value: value.to_string(),
        source,
    })
}

/// Decode an identity field into its internal hex form.
pub fn decode_identity(field: &'static str, value: &str) -> Result<Identity, DecodeError> {
    decode_field(field, value).map(|bytes| Identity::from_bytes(&bytes))
}

/// Decode a key field.
pub fn decode_key(field: &'static str, value: &str) -> Result<Key, DecodeError> {
    decode_field(field, value).map(Key::from_bytes)
}

/// Encode bytes for an outbound response.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
