//! Party directory: which peer nodes exist and where each identity lives.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use relay_types::Identity;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::DirectoryError;

/// Trait for party directory backends.
///
/// A `partyinfo` exchange is a merge followed by a snapshot: the caller's view
/// is folded in and the resulting view is returned, so repeated exchanges
/// among connected nodes converge.
#[async_trait]
pub trait PartyDirectory: Send + Sync {
    /// Merge a serialized peer-list update into the directory.
    async fn merge_update(&self, update: &[u8]) -> Result<(), DirectoryError>;

    /// Serialize the current directory state.
    async fn serialize_snapshot(&self) -> Result<Vec<u8>, DirectoryError>;

    /// Look up the node URL serving an identity.
    async fn resolve(&self, identity: &Identity) -> Option<String>;

    /// URLs of every known party other than this node.
    async fn party_urls(&self) -> Vec<String>;
}

/// Serialized form of a directory, exchanged on `/partyinfo`.
///
/// Ordered collections keep the encoding byte-identical for equal state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyInfo {
    /// URL of the node that produced this snapshot.
    pub url: String,
    /// Identity to node URL.
    pub recipients: BTreeMap<Identity, String>,
    /// Every party URL the node knows about.
    pub parties: BTreeSet<String>,
}

impl PartyInfo {
    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DirectoryError> {
        rmp_serde::to_vec(self).map_err(DirectoryError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DirectoryError> {
        rmp_serde::from_slice(bytes).map_err(DirectoryError::Malformed)
    }
}

/// In-memory party directory.
///
/// Merges are unions: entries are added or overwritten, never removed.
#[derive(Debug)]
pub struct MemoryPartyDirectory {
    state: RwLock<PartyInfo>,
}

impl MemoryPartyDirectory {
    /// Create a directory for the node reachable at `url`, seeded with `peers`.
    pub fn new(url: impl Into<String>, peers: impl IntoIterator<Item = String>) -> Self {
        let url = url.into();
        let mut parties: BTreeSet<String> = peers.into_iter().collect();
        parties.insert(url.clone());
        Self {
            state: RwLock::new(PartyInfo {
                url,
                recipients: BTreeMap::new(),
                parties,
            }),
        }
    }

    /// Register an identity as served by `url`.
    pub async fn register(&self, identity: Identity, url: impl Into<String>) {
        let url = url.into();
        let mut state = self.state.write().await;
        state.parties.insert(url.clone());
        state.recipients.insert(identity, url);
    }
}

#[async_trait]
impl PartyDirectory for MemoryPartyDirectory {
    async fn merge_update(&self, update: &[u8]) -> Result<(), DirectoryError> {
        // Decode before taking the lock so a bad update never blocks readers
        let incoming = PartyInfo::from_bytes(update)?;

        let mut state = self.state.write().await;
        if !incoming.url.is_empty() {
            state.parties.insert(incoming.url);
        }
        state.parties.extend(incoming.parties);
        state.recipients.extend(incoming.recipients);

        tracing::debug!(
            "Merged party info: {} parties, {} recipients",
            state.parties.len(),
            state.recipients.len()
        );
        Ok(())
    }

    async fn serialize_snapshot(&self) -> Result<Vec<u8>, DirectoryError> {
        self.state.read().await.to_bytes()
    }

    async fn resolve(&self, identity: &Identity) -> Option<String> {
        self.state.read().await.recipients.get(identity).cloned()
    }

    async fn party_urls(&self) -> Vec<String> {
        let state = self.state.read().await;
        state
            .parties
            .iter()
            .filter(|url| **url != state.url)
            .cloned()
            .collect()
    }
}
