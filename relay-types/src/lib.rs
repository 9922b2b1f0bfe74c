//! # relay-types
//!
//! Wire format types for the txrelay transaction relay.
//!
//! This crate provides the foundational types shared by the relay and its
//! collaborators:
//! - [`Identity`], [`Key`], [`DigestHash`] - Party identities and content addresses
//! - [`SendRequest`], [`ReceiveRequest`], [`ResendRequest`], ... - JSON bodies
//! - [`transcode`] - Text-safe encoding used for every binary field on the wire
//! - [`DecodeError`] - Error type for undecodable fields

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod messages;
pub mod transcode;

pub use error::DecodeError;
pub use ids::{DigestHash, Identity, Key};
pub use messages::{
    DeleteRequest, ReceiveRequest, ReceiveResponse, ResendRequest, ResendType, SendRequest,
    SendResponse,
};
