//! Enclave contract and the in-memory reference enclave.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use relay_types::{DigestHash, Identity, Key};
use serde::{Deserialize, Serialize};

use crate::directory::PartyDirectory;
use crate::error::EnclaveError;
use crate::peer::PeerClient;

/// Domain separation context for payload key derivation.
const KEY_CONTEXT: &str = "txrelay 2026-01-01 payload key v1";

/// Trait for enclave backends.
///
/// Keys are chosen here, never by the relay: the same payload, sender and
/// recipient set always map to the same key, and a stored payload is never
/// mutated, only created or deleted.
#[async_trait]
pub trait Enclave: Send + Sync {
    /// Store a payload addressed from `sender` to `recipients`.
    async fn store(
        &self,
        payload: &[u8],
        sender: &Identity,
        recipients: &BTreeSet<Identity>,
    ) -> Result<Key, EnclaveError>;

    /// Retrieve a payload on behalf of `requester`.
    ///
    /// Only the sender or a recipient may read it.
    async fn retrieve(&self, key: &Key, requester: &Identity) -> Result<Vec<u8>, EnclaveError>;

    /// Delete a stored payload.
    async fn delete(&self, key: &Key) -> Result<(), EnclaveError>;

    /// Store an opaque blob addressed purely by its content.
    ///
    /// Storing equal bytes twice returns the same digest.
    async fn store_raw_blob(&self, blob: &[u8]) -> Result<DigestHash, EnclaveError>;

    /// Re-push every payload `identity` is entitled to, to the node serving it.
    async fn resend_all_for(&self, identity: &Identity) -> Result<(), EnclaveError>;

    /// Return the encoded form of one payload for `identity`.
    async fn resend_one_for(
        &self,
        key: &Key,
        identity: &Identity,
    ) -> Result<Vec<u8>, EnclaveError>;
}

/// A payload as handed to another node during resend.
///
/// Carries the full addressing so the receiving enclave derives the same
/// [`Key`] the payload had on the sending node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendEnvelope {
    /// Submitting party.
    pub sender: Identity,
    /// Every recipient of the payload.
    pub recipients: BTreeSet<Identity>,
    /// Payload bytes.
    pub payload: Vec<u8>,
}

impl ResendEnvelope {
    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnclaveError> {
        Ok(rmp_serde::to_vec(self)?)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }
}

#[derive(Debug, Clone)]
struct StoredPayload {
    payload: Vec<u8>,
    sender: Identity,
    recipients: BTreeSet<Identity>,
}

impl StoredPayload {
    fn is_entitled(&self, identity: &Identity) -> bool {
        self.sender == *identity || self.recipients.contains(identity)
    }

    fn to_envelope(&self) -> ResendEnvelope {
        ResendEnvelope {
            sender: self.sender.clone(),
            recipients: self.recipients.clone(),
            payload: self.payload.clone(),
        }
    }
}

/// In-memory enclave.
///
/// Holds payloads in plaintext; meant for development nodes and tests, not
/// for deployments that need confidentiality at rest.
pub struct MemoryEnclave {
    payloads: DashMap<Key, StoredPayload>,
    blobs: DashMap<DigestHash, Vec<u8>>,
    directory: Arc<dyn PartyDirectory>,
    peers: Arc<dyn PeerClient>,
}

impl std::fmt::Debug for MemoryEnclave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEnclave")
            .field("payloads", &self.payloads.len())
            .field("blobs", &self.blobs.len())
            .finish_non_exhaustive()
    }
}

impl MemoryEnclave {
    /// Create an enclave that resolves and pushes through the given handles.
    pub fn new(directory: Arc<dyn PartyDirectory>, peers: Arc<dyn PeerClient>) -> Self {
        Self {
            payloads: DashMap::new(),
            blobs: DashMap::new(),
            directory,
            peers,
        }
    }

    /// Number of stored payloads.
    pub fn payload_count(&self) -> usize {
        self.payloads.len()
    }

    /// Get a raw blob by digest.
    pub fn raw_blob(&self, digest: &DigestHash) -> Option<Vec<u8>> {
        self.blobs.get(digest).map(|b| b.value().clone())
    }

    /// Store a payload under its derived key and return the key.
    fn insert_payload(&self, stored: StoredPayload) -> Key {
        let key = Self::derive_key(&stored.payload, &stored.sender, &stored.recipients);
        // Equal keys imply equal content, so re-storing changes nothing
        self.payloads.entry(key.clone()).or_insert(stored);
        key
    }

    fn derive_key(payload: &[u8], sender: &Identity, recipients: &BTreeSet<Identity>) -> Key {
        let mut hasher = blake3::Hasher::new_derive_key(KEY_CONTEXT);
        hasher.update(&(payload.len() as u64).to_le_bytes());
        hasher.update(payload);
        hasher.update(sender.as_hex().as_bytes());
        for recipient in recipients {
            hasher.update(b"\0");
            hasher.update(recipient.as_hex().as_bytes());
        }
        Key::from_bytes(hasher.finalize().as_bytes().to_vec())
    }

    fn entitled_payload(
        &self,
        key: &Key,
        identity: &Identity,
    ) -> Result<StoredPayload, EnclaveError> {
        let stored = self
            .payloads
            .get(key)
            .map(|p| p.value().clone())
            .ok_or_else(|| EnclaveError::NotFound {
                key: key.to_string(),
            })?;

        if !stored.is_entitled(identity) {
            return Err(EnclaveError::NotEntitled {
                key: key.to_string(),
                identity: identity.to_string(),
            });
        }

        Ok(stored)
    }
}

#[async_trait]
impl Enclave for MemoryEnclave {
    async fn store(
        &self,
        payload: &[u8],
        sender: &Identity,
        recipients: &BTreeSet<Identity>,
    ) -> Result<Key, EnclaveError> {
        let key = self.insert_payload(StoredPayload {
            payload: payload.to_vec(),
            sender: sender.clone(),
            recipients: recipients.clone(),
        });

        tracing::debug!(
            "Stored payload {:?} from {:?} for {} recipient(s)",
            key,
            sender,
            recipients.len()
        );
        Ok(key)
    }

    async fn retrieve(&self, key: &Key, requester: &Identity) -> Result<Vec<u8>, EnclaveError> {
        self.entitled_payload(key, requester).map(|p| p.payload)
    }

    async fn delete(&self, key: &Key) -> Result<(), EnclaveError> {
        self.payloads
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| EnclaveError::NotFound {
                key: key.to_string(),
            })
    }

    async fn store_raw_blob(&self, blob: &[u8]) -> Result<DigestHash, EnclaveError> {
        let digest = DigestHash::from_bytes(blake3::hash(blob).as_bytes().to_vec());
        self.blobs
            .entry(digest.clone())
            .or_insert_with(|| blob.to_vec());

        // Payloads resent by another node become receivable here
        if let Ok(envelope) = ResendEnvelope::from_bytes(blob) {
            let key = self.insert_payload(StoredPayload {
                payload: envelope.payload,
                sender: envelope.sender,
                recipients: envelope.recipients,
            });
            tracing::debug!("Indexed resent payload {:?} from blob {:?}", key, digest);
        }

        Ok(digest)
    }

    async fn resend_all_for(&self, identity: &Identity) -> Result<(), EnclaveError> {
        let url = self
            .directory
            .resolve(identity)
            .await
            .ok_or_else(|| EnclaveError::UnknownRecipient {
                identity: identity.to_string(),
            })?;

        // Collect first: map guards must not be held across the pushes
        let envelopes: Vec<ResendEnvelope> = self
            .payloads
            .iter()
            .filter(|entry| entry.value().is_entitled(identity))
            .map(|entry| entry.value().to_envelope())
            .collect();

        tracing::info!(
            "Resending {} payload(s) for {:?} to {}",
            envelopes.len(),
            identity,
            url
        );

        for envelope in &envelopes {
            let bytes = envelope.to_bytes()?;
            self.peers.push(&url, &bytes).await?;
        }

        Ok(())
    }

    async fn resend_one_for(
        &self,
        key: &Key,
        identity: &Identity,
    ) -> Result<Vec<u8>, EnclaveError> {
        self.entitled_payload(key, identity)?.to_envelope().to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryPartyDirectory;
    use crate::error::PeerError;
    use std::sync::Mutex;

    /// Records pushes instead of sending them.
    #[derive(Default)]
    struct RecordingPeers {
        pushes: Mutex<Vec<(String, Vec<u8>)>>,
        fail: bool,
    }

    #[async_trait]
    impl PeerClient for RecordingPeers {
        async fn push(&self, url: &str, blob: &[u8]) -> Result<String, PeerError> {
            if self.fail {
                return Err(PeerError::ConnectionFailed("refused".to_string()));
            }
            self.pushes
                .lock()
                .unwrap()
                .push((url.to_string(), blob.to_vec()));
            Ok("digest".to_string())
        }

        async fn exchange_party_info(
            &self,
            _url: &str,
            _snapshot: &[u8],
        ) -> Result<Vec<u8>, PeerError> {
            Ok(Vec::new())
        }
    }

    /// Delivers pushes straight into another node's enclave.
    struct ForwardingPeers {
        target: Arc<MemoryEnclave>,
    }

    #[async_trait]
    impl PeerClient for ForwardingPeers {
        async fn push(&self, _url: &str, blob: &[u8]) -> Result<String, PeerError> {
            let digest = self
                .target
                .store_raw_blob(blob)
                .await
                .map_err(|e| PeerError::Http(e.to_string()))?;
            Ok(digest.to_string())
        }

        async fn exchange_party_info(
            &self,
            _url: &str,
            _snapshot: &[u8],
        ) -> Result<Vec<u8>, PeerError> {
            Ok(Vec::new())
        }
    }

    fn identity(byte: u8) -> Identity {
        Identity::from_bytes(&[byte; 32])
    }

    fn recipients(bytes: &[u8]) -> BTreeSet<Identity> {
        bytes.iter().map(|b| identity(*b)).collect()
    }

    fn enclave_with(peers: Arc<RecordingPeers>) -> (MemoryEnclave, Arc<MemoryPartyDirectory>) {
        let directory = Arc::new(MemoryPartyDirectory::new("http://self:9000/", Vec::new()));
        let enclave = MemoryEnclave::new(directory.clone(), peers);
        (enclave, directory)
    }

    fn enclave() -> MemoryEnclave {
        enclave_with(Arc::new(RecordingPeers::default())).0
    }

    #[tokio::test]
    async fn store_then_retrieve_by_recipient() {
        let enclave = enclave();
        let key = enclave
            .store(b"hello", &identity(1), &recipients(&[2]))
            .await
            .unwrap();

        let payload = enclave.retrieve(&key, &identity(2)).await.unwrap();
        assert_eq!(payload, b"hello");
    }

    #[tokio::test]
    async fn sender_may_retrieve() {
        let enclave = enclave();
        let key = enclave
            .store(b"hello", &identity(1), &recipients(&[2]))
            .await
            .unwrap();

        assert!(enclave.retrieve(&key, &identity(1)).await.is_ok());
    }

    #[tokio::test]
    async fn outsider_is_not_entitled() {
        let enclave = enclave();
        let key = enclave
            .store(b"hello", &identity(1), &recipients(&[2]))
            .await
            .unwrap();

        let result = enclave.retrieve(&key, &identity(9)).await;
        assert!(matches!(result, Err(EnclaveError::NotEntitled { .. })));
    }

    #[tokio::test]
    async fn key_is_content_derived() {
        let enclave = enclave();
        let a = enclave
            .store(b"hello", &identity(1), &recipients(&[2, 3]))
            .await
            .unwrap();
        let b = enclave
            .store(b"hello", &identity(1), &recipients(&[3, 2]))
            .await
            .unwrap();
        let c = enclave
            .store(b"hello", &identity(1), &recipients(&[2]))
            .await
            .unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(enclave.payload_count(), 2);
    }

    #[tokio::test]
    async fn delete_then_retrieve_fails() {
        let enclave = enclave();
        let key = enclave
            .store(b"hello", &identity(1), &recipients(&[2]))
            .await
            .unwrap();

        enclave.delete(&key).await.unwrap();

        let result = enclave.retrieve(&key, &identity(2)).await;
        assert!(matches!(result, Err(EnclaveError::NotFound { .. })));
    }

    #[tokio::test]
    async fn delete_unknown_key_is_not_found() {
        let enclave = enclave();
        let result = enclave.delete(&Key::from_bytes(vec![0u8; 32])).await;
        assert!(matches!(result, Err(EnclaveError::NotFound { .. })));
    }

    #[tokio::test]
    async fn raw_blob_store_is_idempotent() {
        let enclave = enclave();
        let first = enclave.store_raw_blob(b"ciphertext").await.unwrap();
        let second = enclave.store_raw_blob(b"ciphertext").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.as_bytes(), blake3::hash(b"ciphertext").as_bytes());
        assert_eq!(enclave.raw_blob(&first).unwrap(), b"ciphertext");
    }

    #[tokio::test]
    async fn resend_one_returns_envelope_for_recipient() {
        let enclave = enclave();
        let key = enclave
            .store(b"hello", &identity(1), &recipients(&[2, 3]))
            .await
            .unwrap();

        let bytes = enclave.resend_one_for(&key, &identity(3)).await.unwrap();
        let envelope = ResendEnvelope::from_bytes(&bytes).unwrap();

        assert_eq!(envelope.sender, identity(1));
        assert_eq!(envelope.recipients, recipients(&[2, 3]));
        assert_eq!(envelope.payload, b"hello");
    }

    #[tokio::test]
    async fn resend_one_rejects_unentitled_identity() {
        let enclave = enclave();
        let key = enclave
            .store(b"hello", &identity(1), &recipients(&[2]))
            .await
            .unwrap();

        let result = enclave.resend_one_for(&key, &identity(5)).await;
        assert!(matches!(result, Err(EnclaveError::NotEntitled { .. })));
    }

    #[tokio::test]
    async fn resend_all_pushes_entitled_payloads_to_resolved_node() {
        let peers = Arc::new(RecordingPeers::default());
        let (enclave, directory) = enclave_with(peers.clone());
        directory.register(identity(2), "http://node-b:9000/").await;

        enclave
            .store(b"one", &identity(1), &recipients(&[2]))
            .await
            .unwrap();
        enclave
            .store(b"two", &identity(1), &recipients(&[2, 3]))
            .await
            .unwrap();
        enclave
            .store(b"other", &identity(1), &recipients(&[3]))
            .await
            .unwrap();

        enclave.resend_all_for(&identity(2)).await.unwrap();

        let pushes = peers.pushes.lock().unwrap();
        assert_eq!(pushes.len(), 2);
        assert!(pushes.iter().all(|(url, _)| url == "http://node-b:9000/"));

        let mut payloads: Vec<Vec<u8>> = pushes
            .iter()
            .map(|(_, bytes)| ResendEnvelope::from_bytes(bytes).unwrap().payload)
            .collect();
        payloads.sort();
        assert_eq!(payloads, vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[tokio::test]
    async fn resend_all_for_unknown_identity_fails() {
        let enclave = enclave();
        let result = enclave.resend_all_for(&identity(2)).await;
        assert!(matches!(result, Err(EnclaveError::UnknownRecipient { .. })));
    }

    #[tokio::test]
    async fn resend_all_surfaces_push_failure() {
        let peers = Arc::new(RecordingPeers {
            fail: true,
            ..Default::default()
        });
        let (enclave, directory) = enclave_with(peers);
        directory.register(identity(2), "http://node-b:9000/").await;
        enclave
            .store(b"one", &identity(1), &recipients(&[2]))
            .await
            .unwrap();

        let result = enclave.resend_all_for(&identity(2)).await;
        assert!(matches!(result, Err(EnclaveError::Push(_))));
    }

    #[tokio::test]
    async fn resent_payloads_are_receivable_on_target_node() {
        let node_b = Arc::new(enclave());
        let directory = Arc::new(MemoryPartyDirectory::new("http://node-a:9000/", Vec::new()));
        directory.register(identity(2), "http://node-b:9000/").await;
        let node_a = MemoryEnclave::new(
            directory,
            Arc::new(ForwardingPeers {
                target: node_b.clone(),
            }),
        );

        let key = node_a
            .store(b"recover me", &identity(1), &recipients(&[2, 3]))
            .await
            .unwrap();
        assert!(matches!(
            node_b.retrieve(&key, &identity(2)).await,
            Err(EnclaveError::NotFound { .. })
        ));

        node_a.resend_all_for(&identity(2)).await.unwrap();

        assert_eq!(node_b.retrieve(&key, &identity(2)).await.unwrap(), b"recover me");
        assert_eq!(node_b.retrieve(&key, &identity(3)).await.unwrap(), b"recover me");
        assert!(matches!(
            node_b.retrieve(&key, &identity(9)).await,
            Err(EnclaveError::NotEntitled { .. })
        ));
    }

    #[tokio::test]
    async fn opaque_blob_is_not_indexed_as_payload() {
        let enclave = enclave();
        enclave.store_raw_blob(b"opaque ciphertext").await.unwrap();
        assert_eq!(enclave.payload_count(), 0);
    }
}
