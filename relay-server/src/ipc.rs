//! Unix domain socket for the local submission listener.
//!
//! The socket file is the local API's only access control: it is created
//! with owner-only permissions and is not reachable over the network.

use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tokio::net::UnixListener;

use crate::error::RelayError;

/// A bound IPC socket plus the guard that removes its file.
#[derive(Debug)]
pub struct IpcSocket {
    /// The bound listener.
    pub listener: UnixListener,
    /// Removes the socket file when dropped.
    pub file: SocketFile,
}

/// Owns a socket file path and unlinks it on drop.
#[derive(Debug)]
pub struct SocketFile {
    path: PathBuf,
}

impl SocketFile {
    /// Path of the socket file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SocketFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove socket {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Create the IPC socket at `path`.
///
/// A leftover socket file from a previous run is removed first. A socket
/// that still has a live server behind it, or a path occupied by something
/// that is not a socket, is a bind failure.
pub fn create_ipc_socket(path: &Path) -> Result<IpcSocket, RelayError> {
    let bind_error = |source: std::io::Error| RelayError::Bind {
        listener: "local",
        address: path.display().to_string(),
        source,
    };

    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            if std::os::unix::net::UnixStream::connect(path).is_ok() {
                return Err(bind_error(std::io::Error::from(
                    std::io::ErrorKind::AddrInUse,
                )));
            }
            tracing::info!("Removing stale socket {}", path.display());
            std::fs::remove_file(path).map_err(bind_error)?;
        }
        Ok(_) => {
            return Err(bind_error(std::io::Error::from(
                std::io::ErrorKind::AlreadyExists,
            )));
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(bind_error(e)),
    }

    // Bind inside an owner-only directory and move the socket into place
    // once it is 0600, so it is never reachable with umask permissions.
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let staging = tempfile::Builder::new()
        .prefix(".txrelay-")
        .tempdir_in(parent)
        .map_err(bind_error)?;
    let staged = staging.path().join("s");

    let listener = UnixListener::bind(&staged).map_err(bind_error)?;
    std::fs::set_permissions(&staged, std::fs::Permissions::from_mode(0o600))
        .map_err(bind_error)?;
    std::fs::rename(&staged, path).map_err(bind_error)?;

    let file = SocketFile {
        path: path.to_path_buf(),
    };

    Ok(IpcSocket { listener, file })
}
