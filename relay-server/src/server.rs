//! Transaction manager state and the two-listener dispatcher.
//!
//! [`TransactionManager`] holds the collaborator handles shared by every
//! request handler. [`Dispatcher`] binds the public TCP listener and the
//! local Unix socket, each with its own router, and serves both until
//! shutdown or until either fails.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use relay_enclave::{Enclave, PartyDirectory};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::Config;
use crate::error::RelayError;
use crate::http::{build_local_router, build_public_router};
use crate::ipc::{create_ipc_socket, IpcSocket};

/// Limits applied when reading request bodies.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimits {
    /// Maximum body size in bytes.
    pub max_size: usize,
    /// Time allowed to read the full body.
    pub read_timeout: Duration,
}

/// Shared state for both APIs.
///
/// Read-only after construction; all mutable state lives behind the
/// enclave and directory handles.
pub struct TransactionManager {
    enclave: Arc<dyn Enclave>,
    directory: Arc<dyn PartyDirectory>,
    limits: BodyLimits,
    echo_payload_in_errors: bool,
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("limits", &self.limits)
            .field("echo_payload_in_errors", &self.echo_payload_in_errors)
            .finish_non_exhaustive()
    }
}

impl TransactionManager {
    /// Create a transaction manager over the given collaborators.
    pub fn new(
        enclave: Arc<dyn Enclave>,
        directory: Arc<dyn PartyDirectory>,
        config: &Config,
    ) -> Self {
        Self {
            enclave,
            directory,
            limits: BodyLimits {
                max_size: config.http.max_body_size,
                read_timeout: Duration::from_secs(config.http.body_read_timeout_secs),
            },
            echo_payload_in_errors: config.local.echo_payload_in_errors,
        }
    }

    /// The enclave handle.
    pub fn enclave(&self) -> &dyn Enclave {
        self.enclave.as_ref()
    }

    /// The party directory handle.
    pub fn directory(&self) -> &dyn PartyDirectory {
        self.directory.as_ref()
    }

    /// Body read limits.
    pub fn limits(&self) -> BodyLimits {
        self.limits
    }

    /// Whether `send` errors echo the submitted payload.
    pub fn echo_payload_in_errors(&self) -> bool {
        self.echo_payload_in_errors
    }
}

/// Both listeners, bound and ready to serve.
#[derive(Debug)]
pub struct Dispatcher {
    manager: Arc<TransactionManager>,
    network: TcpListener,
    local: IpcSocket,
}

impl Dispatcher {
    /// Bind the public TCP listener and the local IPC socket.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Bind`] if either cannot be bound. Nothing is
    /// served unless both are.
    pub async fn bind(
        config: &Config,
        manager: Arc<TransactionManager>,
    ) -> Result<Self, RelayError> {
        let address = &config.network.bind_address;
        let network = TcpListener::bind(address)
            .await
            .map_err(|source| RelayError::Bind {
                listener: "network",
                address: address.clone(),
                source,
            })?;

        let local = create_ipc_socket(&config.local.socket_path)?;

        tracing::info!(
            "Listeners bound: network={} local={}",
            network
                .local_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| address.clone()),
            config.local.socket_path.display()
        );

        Ok(Self {
            manager,
            network,
            local,
        })
    }

    /// Address the public listener is bound to.
    pub fn network_addr(&self) -> std::io::Result<SocketAddr> {
        self.network.local_addr()
    }

    /// Path of the local socket.
    pub fn socket_path(&self) -> &Path {
        self.local.file.path()
    }

    /// Serve both listeners until `shutdown` flips to `true`.
    ///
    /// # Errors
    ///
    /// The first listener failure ends both and is returned; it is meant to
    /// be fatal for the process.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), RelayError> {
        let public = build_public_router(self.manager.clone());
        let local = build_local_router(self.manager);
        let IpcSocket {
            listener: ipc_listener,
            file: _socket_file,
        } = self.local;

        let network = axum::serve(self.network, public)
            .with_graceful_shutdown(wait_for_shutdown(shutdown.clone()));
        let ipc = axum::serve(ipc_listener, local)
            .with_graceful_shutdown(wait_for_shutdown(shutdown));

        let result = tokio::try_join!(
            async {
                network.await.map_err(|source| {
                    tracing::error!("Network listener failed: {}", source);
                    RelayError::Serve {
                        listener: "network",
                        source,
                    }
                })
            },
            async {
                ipc.await.map_err(|source| {
                    tracing::error!("Local listener failed: {}", source);
                    RelayError::Serve {
                        listener: "local",
                        source,
                    }
                })
            },
        );

        tracing::info!("Listeners stopped");
        result.map(|_| ())
    }
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    // A dropped sender also ends serving
    let _ = shutdown.wait_for(|stop| *stop).await;
}
