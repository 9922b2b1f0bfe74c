//! Error types for txrelay collaborators.

use thiserror::Error;

/// Errors returned by an [`Enclave`](crate::Enclave).
///
/// The `Display` text is embedded verbatim in the relay's client-error
/// responses, so it must never contain payload bytes.
#[derive(Error, Debug)]
pub enum EnclaveError {
    /// No payload stored under this key.
    #[error("payload not found: {key}")]
    NotFound {
        /// Encoded key.
        key: String,
    },

    /// The identity is neither sender nor recipient of the payload.
    #[error("identity {identity} is not entitled to payload {key}")]
    NotEntitled {
        /// Encoded key.
        key: String,
        /// Hex identity.
        identity: String,
    },

    /// The party directory has no location for this identity.
    #[error("no known node for recipient {identity}")]
    UnknownRecipient {
        /// Hex identity.
        identity: String,
    },

    /// Pushing a payload to a peer node failed.
    #[error("push to peer failed: {0}")]
    Push(#[from] PeerError),

    /// Encoding a payload envelope failed.
    #[error("envelope encoding failed: {0}")]
    Encoding(#[from] rmp_serde::encode::Error),
}

/// Errors returned by a [`PartyDirectory`](crate::PartyDirectory).
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The update could not be decoded.
    #[error("malformed party info: {0}")]
    Malformed(#[from] rmp_serde::decode::Error),

    /// The snapshot could not be encoded.
    #[error("party info serialization failed: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
}

/// Errors talking to another relay node.
#[derive(Error, Debug)]
pub enum PeerError {
    /// HTTP request failed
    #[error("http error: {0}")]
    Http(String),

    /// Connection to the peer failed
    #[error("connection to peer failed: {0}")]
    ConnectionFailed(String),

    /// The peer answered with a non-success status
    #[error("peer {url} rejected request with status {status}: {body}")]
    Rejected {
        /// Target URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },
}

impl From<reqwest::Error> for PeerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            PeerError::ConnectionFailed(e.to_string())
        } else {
            PeerError::Http(e.to_string())
        }
    }
}
