//! # relay-enclave
//!
//! Collaborator contracts consumed by the txrelay relay layer.
//!
//! The relay never encrypts, stores or merges anything itself. It calls:
//! - [`Enclave`] - content store and cryptography for payloads and raw blobs
//! - [`PartyDirectory`] - the set of known peers and which identity lives where
//!
//! Both are `Send + Sync` handles shared by every concurrent request handler;
//! implementations own their internal synchronization.
//!
//! This crate also ships in-process reference backends ([`MemoryEnclave`],
//! [`MemoryPartyDirectory`]) used by the `txrelay` binary for local
//! development and by the test suites, plus the [`PeerClient`] the reference
//! enclave uses to push payloads to other nodes.
//!
//! ## Content addressing
//!
//! ```text
//! store(payload, sender, recipients) ──► Key        = BLAKE3(tag ‖ payload ‖ sender ‖ recipients)
//! store_raw_blob(bytes)              ──► DigestHash = BLAKE3(bytes)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod directory;
mod enclave;
mod error;
mod peer;

pub use directory::{MemoryPartyDirectory, PartyDirectory, PartyInfo};
pub use enclave::{Enclave, MemoryEnclave, ResendEnvelope};
pub use error::{DirectoryError, EnclaveError, PeerError};
pub use peer::{HttpPeerClient, PeerClient};
