//! # relay-server
//!
//! Network relay and local submission server for txrelay.
//!
//! This crate exposes two HTTP APIs on two separate listeners:
//! - A public relay API on a TCP address, reachable by any peer node
//! - A local submission API on a Unix domain socket, reachable only from
//!   this host
//!
//! No route is registered on both. The listener a request arrives on is its
//! only credential; there is no per-request authentication.
//!
//! ## Architecture
//!
//! ```text
//!   peer nodes                              local application
//!       │ TCP                                     │ Unix socket
//!  ┌────┴──────────────────────┐   ┌──────────────┴───────────┐
//!  │ /upcheck /push            │   │ /send /receive /delete   │
//!  │ /resend  /partyinfo       │   │                          │
//!  └────┬──────────────────────┘   └──────────────┬───────────┘
//!       └──────────────┬──────────────────────────┘
//!              TransactionManager
//!          ┌───────────┴────────────┐
//!       Enclave               PartyDirectory
//! ```
//!
//! The relay owns no mutable state of its own; every stored payload and the
//! peer directory live behind the collaborator handles.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod gossip;
pub mod http;
pub mod ipc;
pub mod server;
