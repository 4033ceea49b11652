//! Single-instance coordination over a Unix socket
//!
//! The first launch binds the socket and becomes the primary. Later launches
//! connect, write the `SHOW` token and exit. The primary's listener is
//! non-blocking so it can be polled from the window event loop.

use anyhow::{Context, Result};
use std::io::{ErrorKind, Read, Write};
use std::net::Shutdown;
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tracing::{debug, info, warn};

use crate::constants::singleton::{MAX_PAYLOAD, PROBE_TIMEOUT, SHOW_TOKEN, SOCKET_DIR, SOCKET_FILE};

/// Get default socket path (XDG_RUNTIME_DIR with fallback to cache)
pub fn default_socket_path() -> Result<PathBuf> {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return Ok(PathBuf::from(runtime_dir).join(SOCKET_DIR).join(SOCKET_FILE));
    }

    let cache = dirs::cache_dir()
        .context("Failed to determine cache directory (no XDG_RUNTIME_DIR or HOME)")?;
    Ok(cache.join(SOCKET_DIR).join(SOCKET_FILE))
}

/// Role of this process, decided once at startup
#[derive(Debug)]
pub enum Role {
    /// Owns the window and listens for later launches
    Primary(SingletonServer),
    /// Another instance was signalled; this process should exit
    Secondary,
}

/// Probe for a running primary at `path`; signal it or become the primary.
///
/// Two launches racing through the probe can both end up binding; the later
/// bind replaces the earlier socket. That window is accepted.
pub fn acquire(path: &Path) -> Result<Role> {
    match probe(path) {
        Ok(stream) => {
            info!(socket = %path.display(), "Another instance is running, asking it to show");
            signal_primary(stream);
            Ok(Role::Secondary)
        }
        Err(e) => {
            debug!(socket = %path.display(), error = %e, "No running instance, becoming primary");
            SingletonServer::bind_to(path.to_path_buf()).map(Role::Primary)
        }
    }
}

/// Connect with an upper bound on how long the attempt may block
fn probe(path: &Path) -> Result<UnixStream> {
    let (tx, rx) = mpsc::channel();
    let target = path.to_path_buf();
    std::thread::spawn(move || {
        let _ = tx.send(UnixStream::connect(&target));
    });

    rx.recv_timeout(PROBE_TIMEOUT)
        .context("Timed out connecting to singleton socket")?
        .context(format!("Failed to connect to {}", path.display()))
}

/// Write the token and disconnect. A failed write after a successful connect
/// is only logged: the caller still exits as a secondary.
fn signal_primary(mut stream: UnixStream) {
    match write_show(&mut stream) {
        Ok(()) => debug!("Show command sent"),
        Err(e) => warn!(error = ?e, "Failed to signal running instance"),
    }
    let _ = stream.shutdown(Shutdown::Both);
}

fn write_show(stream: &mut UnixStream) -> Result<()> {
    stream
        .set_write_timeout(Some(PROBE_TIMEOUT))
        .context("Failed to set write timeout")?;
    stream
        .write_all(SHOW_TOKEN)
        .context("Failed to write show command")?;
    stream.flush().context("Failed to flush stream")?;
    Ok(())
}

/// Connection accepted by the primary, waiting for its payload
#[derive(Debug)]
struct PendingClient {
    stream: UnixStream,
    payload: Vec<u8>,
}

impl PendingClient {
    /// Read what's available. Returns true once the message is complete.
    fn read_available(&mut self) -> Result<bool> {
        let mut chunk = [0u8; MAX_PAYLOAD];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => return Ok(true),
                Ok(n) => {
                    self.payload.extend_from_slice(&chunk[..n]);
                    if self.is_show() || self.payload.len() >= MAX_PAYLOAD {
                        return Ok(true);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(false),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("Failed to read from singleton client"),
            }
        }
    }

    fn is_show(&self) -> bool {
        self.payload.trim_ascii() == SHOW_TOKEN
    }
}

/// Listening side of the singleton channel (primary only)
#[derive(Debug)]
pub struct SingletonServer {
    listener: UnixListener,
    socket_path: PathBuf,
    pending: Vec<PendingClient>,
}

impl SingletonServer {
    /// Bind to `socket_path`, replacing any stale socket left by a crashed primary
    pub fn bind_to(socket_path: PathBuf) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create socket directory: {}", parent.display()))?;
        }

        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .context(format!("Failed to remove stale socket: {}", socket_path.display()))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .context(format!("Failed to bind socket at {}", socket_path.display()))?;

        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o700))
                .context("Failed to set socket permissions")?;
        }

        listener
            .set_nonblocking(true)
            .context("Failed to make singleton listener non-blocking")?;

        info!(socket = %socket_path.display(), "Singleton listener bound");
        Ok(Self {
            listener,
            socket_path,
            pending: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.socket_path
    }

    /// Descriptors to poll for readability: the listener and every pending client
    pub fn fds(&self) -> impl Iterator<Item = BorrowedFd<'_>> {
        std::iter::once(self.listener.as_fd())
            .chain(self.pending.iter().map(|client| client.stream.as_fd()))
    }

    /// Accept new connections and read pending ones without blocking.
    /// Returns how many complete `SHOW` commands arrived.
    pub fn process(&mut self) -> usize {
        self.accept_all();

        let mut shows = 0;
        self.pending.retain_mut(|client| match client.read_available() {
            Ok(false) => true,
            Ok(true) => {
                if client.is_show() {
                    shows += 1;
                } else {
                    warn!(payload = %String::from_utf8_lossy(&client.payload), "Ignoring unrecognized singleton command");
                }
                false
            }
            Err(e) => {
                warn!(error = ?e, "Dropping singleton client");
                false
            }
        });
        shows
    }

    fn accept_all(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    if let Err(e) = stream.set_nonblocking(true) {
                        warn!(error = %e, "Failed to make singleton client non-blocking, dropping it");
                        continue;
                    }
                    debug!("Accepted singleton connection");
                    self.pending.push(PendingClient {
                        stream,
                        payload: Vec::new(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "Failed to accept singleton connection");
                    break;
                }
            }
        }
    }
}

impl Drop for SingletonServer {
    fn drop(&mut self) {
        // Clean up socket file
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn socket_in(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("run/clipfloat.sock")
    }

    fn expect_primary(role: Role) -> SingletonServer {
        match role {
            Role::Primary(server) => server,
            Role::Secondary => panic!("expected primary role"),
        }
    }

    #[test]
    fn test_first_launch_becomes_primary() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_in(&dir);

        let server = expect_primary(acquire(&path).unwrap());
        assert_eq!(server.path(), path);
        assert!(path.exists());
    }

    #[test]
    fn test_second_launch_signals_primary_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_in(&dir);
        let mut server = expect_primary(acquire(&path).unwrap());

        assert!(matches!(acquire(&path).unwrap(), Role::Secondary));
        assert_eq!(server.process(), 1);
        assert_eq!(server.process(), 0);
    }

    #[test]
    fn test_each_launch_raises_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_in(&dir);
        let mut server = expect_primary(acquire(&path).unwrap());

        for _ in 0..3 {
            assert!(matches!(acquire(&path).unwrap(), Role::Secondary));
        }
        assert_eq!(server.process(), 3);
    }

    #[test]
    fn test_unrecognized_payload_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_in(&dir);
        let mut server = expect_primary(acquire(&path).unwrap());

        let mut client = UnixStream::connect(&path).unwrap();
        client.write_all(b"HIDE").unwrap();
        client.shutdown(Shutdown::Write).unwrap();

        assert_eq!(server.process(), 0);
        assert_eq!(server.fds().count(), 1);
    }

    #[test]
    fn test_stale_socket_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_in(&dir);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        drop(UnixListener::bind(&path).unwrap());
        assert!(path.exists());

        let mut server = expect_primary(acquire(&path).unwrap());
        assert!(matches!(acquire(&path).unwrap(), Role::Secondary));
        assert_eq!(server.process(), 1);
    }

    #[test]
    fn test_bind_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        assert!(acquire(&blocker.join("clipfloat.sock")).is_err());
    }

    #[test]
    fn test_socket_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_in(&dir);
        let server = expect_primary(acquire(&path).unwrap());

        drop(server);
        assert!(!path.exists());
    }
}
