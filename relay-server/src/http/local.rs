//! Local submission API: send, receive, delete.
//!
//! Served only on the IPC socket. Callers are trusted local applications, so
//! collaborator error text is returned to them as-is.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{StatusCode, Uri};
use axum::{Extension, Json};
use relay_types::transcode::{decode_field, decode_identity, decode_key, encode};
use relay_types::{
    DeleteRequest, Identity, ReceiveRequest, ReceiveResponse, SendRequest, SendResponse,
};

use super::{parse_json, read_body};
use crate::error::ApiError;
use crate::server::TransactionManager;

/// Store a payload for a set of recipients and return its key.
pub(super) async fn send(
    Extension(manager): Extension<Arc<TransactionManager>>,
    uri: Uri,
    body: Body,
) -> Result<Json<SendResponse>, ApiError> {
    let bytes = read_body(body, manager.limits()).await?;
    let req: SendRequest = parse_json(&uri, &bytes)?;

    let payload = decode_field("payload", &req.payload).map_err(|e| ApiError::decode(&uri, e))?;
    let sender = decode_identity("from", &req.from).map_err(|e| ApiError::decode(&uri, e))?;
    let recipients = req
        .to
        .iter()
        .map(|value| decode_identity("to", value))
        .collect::<Result<BTreeSet<Identity>, _>>()
        .map_err(|e| ApiError::decode(&uri, e))?;

    let key = manager
        .enclave()
        .store(&payload, &sender, &recipients)
        .await
        .map_err(|source| ApiError::StoreRejected {
            payload: if manager.echo_payload_in_errors() {
                encode(&payload)
            } else {
                format!("<{} bytes>", payload.len())
            },
            source,
        })?;

    tracing::debug!(
        "send: stored {:?} from {:?} for {} recipient(s)",
        key,
        sender,
        recipients.len()
    );

    Ok(Json(SendResponse {
        key: encode(key.as_bytes()),
    }))
}

/// Fetch a payload on behalf of the requester named in `to`.
///
/// Entitlement is decided by the enclave.
pub(super) async fn receive(
    Extension(manager): Extension<Arc<TransactionManager>>,
    uri: Uri,
    body: Body,
) -> Result<Json<ReceiveResponse>, ApiError> {
    let bytes = read_body(body, manager.limits()).await?;
    let req: ReceiveRequest = parse_json(&uri, &bytes)?;

    let key = decode_key("key", &req.key).map_err(|e| ApiError::decode(&uri, e))?;
    let to = decode_identity("to", &req.to).map_err(|e| ApiError::decode(&uri, e))?;

    let payload = manager
        .enclave()
        .retrieve(&key, &to)
        .await
        .map_err(|source| ApiError::RetrieveRejected {
            key: req.key.clone(),
            source,
        })?;

    tracing::debug!("receive: {:?} for {:?}", key, to);

    Ok(Json(ReceiveResponse {
        payload: encode(&payload),
    }))
}

/// Request removal of a payload.
pub(super) async fn delete(
    Extension(manager): Extension<Arc<TransactionManager>>,
    uri: Uri,
    body: Body,
) -> Result<StatusCode, ApiError> {
    let bytes = read_body(body, manager.limits()).await?;
    let req: DeleteRequest = parse_json(&uri, &bytes)?;

    let key = decode_key("key", &req.key).map_err(|e| ApiError::decode(&uri, e))?;

    manager
        .enclave()
        .delete(&key)
        .await
        .map_err(|source| ApiError::DeleteRejected {
            key: req.key.clone(),
            source,
        })?;

    tracing::debug!("delete: {:?}", key);
    Ok(StatusCode::OK)
}
