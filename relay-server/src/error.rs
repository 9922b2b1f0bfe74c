//! Error types for txrelay-server.
//!
//! [`RelayError`] covers listener failures and is fatal. [`ApiError`]
//! covers a single request and is turned into a plain-text HTTP response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use relay_enclave::{DirectoryError, EnclaveError};
use relay_types::DecodeError;

/// Main error type for txrelay-server operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A listener could not be bound.
    #[error("failed to bind {listener} listener on {address}: {source}")]
    Bind {
        /// Which listener ("network" or "local").
        listener: &'static str,
        /// The address or socket path.
        address: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A listener stopped with an error.
    #[error("{listener} listener failed: {source}")]
    Serve {
        /// Which listener ("network" or "local").
        listener: &'static str,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// A request that could not be served.
///
/// Every variant renders as a human-readable, plain-text body; there is no
/// structured error envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body could not be fully read.
    #[error("Unable to read request body, error: {reason}")]
    BodyRead {
        /// Why reading failed.
        reason: String,
    },

    /// Unparsable JSON, or a rejection reported through the same shape.
    #[error("Invalid request: {uri}, error: {cause}")]
    InvalidBody {
        /// Request URI.
        uri: String,
        /// Underlying failure.
        cause: String,
    },

    /// A text-safe encoded field did not decode.
    #[error("Invalid request: {uri}, {source}")]
    Decode {
        /// Request URI.
        uri: String,
        /// Field, value and cause.
        source: DecodeError,
    },

    /// A field required by this request variant is absent.
    #[error("Invalid request: {uri}, missing field: {field}")]
    MissingField {
        /// Request URI.
        uri: String,
        /// Field name.
        field: &'static str,
    },

    /// The enclave refused to store a payload.
    #[error("Unable to store payload: {payload}, error: {source}")]
    StoreRejected {
        /// Payload as reported back (encoded, or its length only).
        payload: String,
        /// Enclave error.
        source: EnclaveError,
    },

    /// The enclave refused to return a payload.
    #[error("Unable to retrieve payload for key: {key}, error: {source}")]
    RetrieveRejected {
        /// Encoded key.
        key: String,
        /// Enclave error.
        source: EnclaveError,
    },

    /// The enclave refused to delete a payload.
    #[error("Unable to delete key: {key}, error: {source}")]
    DeleteRejected {
        /// Encoded key.
        key: String,
        /// Enclave error.
        source: EnclaveError,
    },

    /// The enclave refused a raw blob.
    #[error("Unable to store payload, error: {source}")]
    PushRejected {
        /// Enclave error.
        source: EnclaveError,
    },

    /// The party directory refused an update.
    #[error("Unable to update party info, error: {source}")]
    PartyInfoRejected {
        /// Directory error.
        source: DirectoryError,
    },

    /// The party directory could not produce a snapshot.
    #[error("Unable to serialize party info, error: {source}")]
    Snapshot {
        /// Directory error.
        source: DirectoryError,
    },
}

impl ApiError {
    /// Wrap a decode failure for the request at `uri`.
    pub fn decode(uri: &axum::http::Uri, source: DecodeError) -> Self {
        ApiError::Decode {
            uri: uri.to_string(),
            source,
        }
    }

    /// Report a failure with the malformed-body message shape.
    pub fn invalid_body(uri: &axum::http::Uri, cause: impl std::fmt::Display) -> Self {
        ApiError::InvalidBody {
            uri: uri.to_string(),
            cause: cause.to_string(),
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BodyRead { .. } | ApiError::Snapshot { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Short label for logging; never includes request content.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BodyRead { .. } => "body_read",
            ApiError::InvalidBody { .. } => "invalid_body",
            ApiError::Decode { .. } => "decode",
            ApiError::MissingField { .. } => "missing_field",
            ApiError::StoreRejected { .. } => "store_rejected",
            ApiError::RetrieveRejected { .. } => "retrieve_rejected",
            ApiError::DeleteRejected { .. } => "delete_rejected",
            ApiError::PushRejected { .. } => "push_rejected",
            ApiError::PartyInfoRejected { .. } => "party_info_rejected",
            ApiError::Snapshot { .. } => "snapshot",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!("Request failed: kind={} status={}", self.kind(), status);
        (status, format!("{self}\n")).into_response()
    }
}
