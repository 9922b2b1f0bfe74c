//! HTTP routers for txrelay.
//!
//! Two routers, never merged: [`build_public_router`] for peer nodes and
//! [`build_local_router`] for the local application. Handlers read their own
//! bodies so size and time limits apply uniformly.

mod local;
mod public;

use crate::error::ApiError;
use crate::server::{BodyLimits, TransactionManager};
use axum::body::{Body, Bytes};
use axum::http::Uri;
use axum::routing::{any, post};
use axum::{Extension, Router};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Fixed liveness confirmation returned by `/upcheck`.
pub const UPCHECK_RESPONSE: &str = "I'm up!";

/// Build the router served on the network listener.
pub fn build_public_router(manager: Arc<TransactionManager>) -> Router {
    Router::new()
        .route("/upcheck", any(public::upcheck))
        .route("/push", post(public::push))
        .route("/resend", post(public::resend))
        .route("/partyinfo", post(public::party_info))
        .layer(Extension(manager))
}

/// Build the router served on the local IPC socket.
pub fn build_local_router(manager: Arc<TransactionManager>) -> Router {
    Router::new()
        .route("/send", post(local::send))
        .route("/receive", post(local::receive))
        .route("/delete", post(local::delete))
        .layer(Extension(manager))
}

/// Read a full request body within the configured limits.
async fn read_body(body: Body, limits: BodyLimits) -> Result<Bytes, ApiError> {
    let read = axum::body::to_bytes(body, limits.max_size);
    match tokio::time::timeout(limits.read_timeout, read).await {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(ApiError::BodyRead {
            reason: e.to_string(),
        }),
        Err(_) => Err(ApiError::BodyRead {
            reason: format!("timed out after {:?}", limits.read_timeout),
        }),
    }
}

/// Parse a JSON request body.
fn parse_json<T: DeserializeOwned>(uri: &Uri, bytes: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(bytes).map_err(|e| ApiError::invalid_body(uri, e))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixtures for router tests.

    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use axum::http::{Request, StatusCode};
    use relay_enclave::{
        Enclave, EnclaveError, MemoryEnclave, MemoryPartyDirectory, PeerClient, PeerError,
    };
    use relay_types::{DigestHash, Identity, Key};
    use std::collections::BTreeSet;
    use std::sync::Mutex;
    use tower::util::ServiceExt;

    /// Records pushes and answers party info exchanges with an empty body.
    #[derive(Default)]
    pub struct RecordingPeers {
        pub pushes: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl PeerClient for RecordingPeers {
        async fn push(&self, url: &str, blob: &[u8]) -> Result<String, PeerError> {
            self.pushes
                .lock()
                .unwrap()
                .push((url.to_string(), blob.to_vec()));
            Ok(String::new())
        }

        async fn exchange_party_info(
            &self,
            _url: &str,
            _snapshot: &[u8],
        ) -> Result<Vec<u8>, PeerError> {
            Ok(Vec::new())
        }
    }

    /// Enclave that refuses everything.
    pub struct RejectingEnclave;

    fn refused() -> EnclaveError {
        EnclaveError::NotFound {
            key: "refused".to_string(),
        }
    }

    #[async_trait]
    impl Enclave for RejectingEnclave {
        async fn store(
            &self,
            _payload: &[u8],
            _sender: &Identity,
            _recipients: &BTreeSet<Identity>,
        ) -> Result<Key, EnclaveError> {
            Err(refused())
        }

        async fn retrieve(
            &self,
            _key: &Key,
            _requester: &Identity,
        ) -> Result<Vec<u8>, EnclaveError> {
            Err(refused())
        }

        async fn delete(&self, _key: &Key) -> Result<(), EnclaveError> {
            Err(refused())
        }

        async fn store_raw_blob(&self, _blob: &[u8]) -> Result<DigestHash, EnclaveError> {
            Err(refused())
        }

        async fn resend_all_for(&self, _identity: &Identity) -> Result<(), EnclaveError> {
            Err(refused())
        }

        async fn resend_one_for(
            &self,
            _key: &Key,
            _identity: &Identity,
        ) -> Result<Vec<u8>, EnclaveError> {
            Err(refused())
        }
    }

    /// Everything a router test needs to reach behind the API.
    pub struct Fixture {
        pub manager: Arc<TransactionManager>,
        pub enclave: Arc<MemoryEnclave>,
        pub directory: Arc<MemoryPartyDirectory>,
        pub peers: Arc<RecordingPeers>,
    }

    pub fn fixture_with(config: &Config) -> Fixture {
        let directory = Arc::new(MemoryPartyDirectory::new("http://self:9000/", Vec::new()));
        let peers = Arc::new(RecordingPeers::default());
        let enclave = Arc::new(MemoryEnclave::new(directory.clone(), peers.clone()));
        let manager = Arc::new(TransactionManager::new(
            enclave.clone(),
            directory.clone(),
            config,
        ));
        Fixture {
            manager,
            enclave,
            directory,
            peers,
        }
    }

    pub fn fixture() -> Fixture {
        fixture_with(&Config::default())
    }

    pub fn test_manager() -> Arc<TransactionManager> {
        fixture().manager
    }

    pub fn rejecting_manager(config: &Config) -> Arc<TransactionManager> {
        let directory = Arc::new(MemoryPartyDirectory::new("http://self:9000/", Vec::new()));
        Arc::new(TransactionManager::new(
            Arc::new(RejectingEnclave),
            directory,
            config,
        ))
    }

    /// POST `body` to `uri` and collect status and body.
    pub async fn post(app: Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .body(body.into())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    /// POST a JSON value.
    pub async fn post_json(
        app: Router,
        uri: &str,
        value: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        post(app, uri, value.to_string()).await
    }
}
