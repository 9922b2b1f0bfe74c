//! HTTP client for talking to other relay nodes' public API.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::PeerError;

/// Outbound calls a node makes against another node's public listener.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// POST raw bytes to `{url}/push`, returning the peer's encoded digest.
    async fn push(&self, url: &str, blob: &[u8]) -> Result<String, PeerError>;

    /// POST our directory snapshot to `{url}/partyinfo`, returning theirs.
    async fn exchange_party_info(&self, url: &str, snapshot: &[u8]) -> Result<Vec<u8>, PeerError>;
}

/// [`PeerClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    http: reqwest::Client,
}

impl HttpPeerClient {
    /// Create a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Build the URL for a route on a peer.
    ///
    /// Directory URLs conventionally end in `/`; both forms are accepted.
    pub fn route_url(base: &str, route: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), route)
    }

    async fn post(&self, url: String, body: &[u8]) -> Result<reqwest::Response, PeerError> {
        let response = self.http.post(&url).body(body.to_vec()).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PeerError::Rejected { url, status, body });
        }

        Ok(response)
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn push(&self, url: &str, blob: &[u8]) -> Result<String, PeerError> {
        let response = self.post(Self::route_url(url, "push"), blob).await?;
        Ok(response.text().await?)
    }

    async fn exchange_party_info(&self, url: &str, snapshot: &[u8]) -> Result<Vec<u8>, PeerError> {
        let response = self
            .post(Self::route_url(url, "partyinfo"), snapshot)
            .await?;
        Ok(response.bytes().await?.to_vec())
    }
}
