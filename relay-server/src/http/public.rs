//! Public relay API: upcheck, push, resend, partyinfo.
//!
//! Served only on the network listener. Callers are untrusted peers; what
//! makes unauthenticated `push` safe is that the address of a raw blob is a
//! function of its bytes, so a peer can only create or confirm a blob it
//! already holds.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use relay_types::transcode::{decode_identity, decode_key};
use relay_types::{ResendRequest, ResendType};

use super::{parse_json, read_body, UPCHECK_RESPONSE};
use crate::error::ApiError;
use crate::server::TransactionManager;

const OCTET_STREAM: &str = "application/octet-stream";

/// Liveness check.
pub(super) async fn upcheck() -> &'static str {
    UPCHECK_RESPONSE
}

/// Store a raw blob and return its encoded digest as text.
pub(super) async fn push(
    Extension(manager): Extension<Arc<TransactionManager>>,
    body: Body,
) -> Result<String, ApiError> {
    let blob = read_body(body, manager.limits()).await?;

    let digest = manager
        .enclave()
        .store_raw_blob(&blob)
        .await
        .map_err(|source| ApiError::PushRejected { source })?;

    tracing::debug!("push: stored {} bytes as {:?}", blob.len(), digest);
    Ok(digest.to_string())
}

/// Reconciliation: bulk re-push or inline return of one payload.
pub(super) async fn resend(
    Extension(manager): Extension<Arc<TransactionManager>>,
    uri: Uri,
    body: Body,
) -> Result<Response, ApiError> {
    let bytes = read_body(body, manager.limits()).await?;
    let req: ResendRequest = parse_json(&uri, &bytes)?;

    let public_key =
        decode_identity("publicKey", &req.public_key).map_err(|e| ApiError::decode(&uri, e))?;

    match req.resend_type {
        ResendType::All => {
            manager
                .enclave()
                .resend_all_for(&public_key)
                .await
                .map_err(|e| ApiError::invalid_body(&uri, e))?;

            tracing::info!("resend all: triggered for {:?}", public_key);
            Ok(StatusCode::OK.into_response())
        }
        ResendType::Individual => {
            let encoded_key = req.key.as_deref().ok_or_else(|| ApiError::MissingField {
                uri: uri.to_string(),
                field: "key",
            })?;
            let key = decode_key("key", encoded_key).map_err(|e| ApiError::decode(&uri, e))?;

            let payload = manager
                .enclave()
                .resend_one_for(&key, &public_key)
                .await
                .map_err(|e| ApiError::invalid_body(&uri, e))?;

            tracing::debug!("resend individual: {:?} for {:?}", key, public_key);
            Ok(([(CONTENT_TYPE, OCTET_STREAM)], payload).into_response())
        }
        ResendType::Other(other) => {
            // Unrecognized modes are accepted and do nothing, for compatibility
            tracing::warn!("resend: ignoring unknown type {:?}", other);
            Ok(StatusCode::OK.into_response())
        }
    }
}

/// Directory gossip: merge the caller's view, return ours.
pub(super) async fn party_info(
    Extension(manager): Extension<Arc<TransactionManager>>,
    body: Body,
) -> Result<Response, ApiError> {
    let update = read_body(body, manager.limits()).await?;

    let directory = manager.directory();
    directory
        .merge_update(&update)
        .await
        .map_err(|source| ApiError::PartyInfoRejected { source })?;

    let snapshot = directory
        .serialize_snapshot()
        .await
        .map_err(|source| ApiError::Snapshot { source })?;

    Ok(([(CONTENT_TYPE, OCTET_STREAM)], snapshot).into_response())
}
