use super::{ChannelBackend, Liveness};
use crate::codec::MAX_CONNECTION_BYTES;
use crate::config::PipeConfig;

use std::io::{Error as IoError, ErrorKind};
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::windows::named_pipe::{ClientOptions, NamedPipeServer, ServerOptions};
use tokio::runtime::{Builder, Runtime};
use tokio::time::timeout;

const ERROR_ACCESS_DENIED: i32 = 5;
const ERROR_PIPE_BUSY: i32 = 231;
const READ_CHUNK_SIZE: usize = 4096;

/// Named pipe server. Serves one client connection at a time; a client that
/// has not finished writing when the poll window ends is carried to the next poll.
pub struct NamedPipeListener {
    runtime: Runtime,
    server: Option<NamedPipeServer>,
    pending: Option<PendingClient>,
    path: String,
    write_timeout: Duration,
    pending_ttl: Duration,
    closed: bool,
}

struct PendingClient {
    server: NamedPipeServer,
    received: Vec<u8>,
    accepted_at: Instant,
}

enum ReadState {
    Open,
    Finished,
}

/// `first_pipe_instance` already makes the claim exclusive.
pub struct ClaimLock;

pub fn lock_for_claim(_path: &str) -> Result<ClaimLock, IoError> {
    Ok(ClaimLock)
}

pub struct NamedPipeConnector {
    runtime: Runtime,
    path: String,
    write_timeout: Duration,
}

fn runtime() -> Result<Runtime, IoError> {
    Builder::new_current_thread().enable_io().enable_time().build()
}

/// Map "pipe already exists" onto the kind the collision manager expects.
fn claim_error(error: IoError) -> IoError {
    match error.raw_os_error() {
        Some(ERROR_ACCESS_DENIED) | Some(ERROR_PIPE_BUSY) => {
            IoError::new(ErrorKind::AddrInUse, error)
        }
        _ => error,
    }
}

/// Create the first instance of the named pipe at `path`.
///
/// # Errors
///
/// Fails with [`ErrorKind::AddrInUse`] if another process already owns it.
pub fn open_as_listener(path: &str, config: &PipeConfig) -> Result<Box<dyn ChannelBackend>, IoError> {
    let runtime = runtime()?;
    let server = {
        let _guard = runtime.enter();
        ServerOptions::new()
            .first_pipe_instance(true)
            .create(path)
            .map_err(claim_error)?
    };
    debug!("Listening on {path}");

    Ok(Box::new(NamedPipeListener {
        runtime,
        server: Some(server),
        pending: None,
        path: path.to_string(),
        write_timeout: config.write_timeout(),
        pending_ttl: config.pending_connection_ttl(),
        closed: false,
    }))
}

pub fn open_as_connector(path: &str, config: &PipeConfig) -> Result<Box<dyn ChannelBackend>, IoError> {
    Ok(Box::new(NamedPipeConnector {
        runtime: runtime()?,
        path: path.to_string(),
        write_timeout: config.write_timeout(),
    }))
}

/// Named pipes disappear with their owner, so an existing pipe is always live.
pub fn probe(path: &str) -> Liveness {
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(e) => return Liveness::Unknown(e.kind()),
    };
    let _guard = runtime.enter();

    match ClientOptions::new().open(path) {
        Ok(_) => Liveness::Live,
        Err(e) if e.raw_os_error() == Some(ERROR_PIPE_BUSY) => Liveness::Live,
        Err(e) if e.kind() == ErrorKind::NotFound => Liveness::Absent,
        Err(e) => {
            debug!("Probe of {path} failed: {e}");
            Liveness::Unknown(e.kind())
        }
    }
}

/// Nothing to remove: the OS drops a named pipe with its last handle.
pub fn reclaim(_path: &str) -> Result<(), IoError> {
    Ok(())
}

fn send_frame(runtime: &Runtime, path: &str, frame: &[u8], write_timeout: Duration) -> bool {
    runtime.block_on(async {
        let mut client = match ClientOptions::new().open(path) {
            Ok(client) => client,
            Err(e) => {
                trace!("No pipe instance available on {path}: {e}");
                return false;
            }
        };

        match timeout(write_timeout, client.write_all(frame)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!("Write to {path} did not complete: {e}");
                false
            }
            Err(_) => {
                debug!("Write to {path} timed out");
                false
            }
        }
    })
}

/// Read from `client` until it closes its end or `deadline` passes.
async fn read_until(client: &mut PendingClient, deadline: Instant) -> Result<ReadState, IoError> {
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let read = match timeout(remaining, client.server.read(&mut chunk)).await {
            Err(_) => return Ok(ReadState::Open),
            Ok(read) => read,
        };

        match read {
            Ok(0) => return Ok(ReadState::Finished),
            Ok(read) => {
                client.received.extend_from_slice(&chunk[..read]);
                if client.received.len() > MAX_CONNECTION_BYTES {
                    return Err(IoError::new(
                        ErrorKind::InvalidData,
                        format!("connection sent more than {MAX_CONNECTION_BYTES} bytes"),
                    ));
                }
            }
            Err(e) if e.kind() == ErrorKind::BrokenPipe => return Ok(ReadState::Finished),
            Err(e) => return Err(e),
        }
    }
}

impl ChannelBackend for NamedPipeConnector {
    fn path(&self) -> &str {
        &self.path
    }

    fn send(&self, frame: &[u8]) -> bool {
        send_frame(&self.runtime, &self.path, frame, self.write_timeout)
    }

    fn receive(&mut self, _window: Duration) -> Vec<Vec<u8>> {
        Vec::new()
    }

    fn close(&mut self) {}
}

impl NamedPipeListener {
    /// Wait until `deadline` for a client; on success it becomes the pending
    /// client and a fresh instance takes its place.
    fn accept_client(&mut self, deadline: Instant) -> bool {
        if self.server.is_none() {
            self.server = self.next_instance();
        }
        let Some(server) = self.server.as_ref() else {
            return false;
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        let connected = self
            .runtime
            .block_on(async { timeout(remaining, server.connect()).await });

        match connected {
            Err(_) => false,
            Ok(Err(e)) => {
                debug!("Client connection on {} failed: {e}", self.path);
                self.server = self.next_instance();
                false
            }
            Ok(Ok(())) => {
                let next = self.next_instance();
                if let Some(server) = std::mem::replace(&mut self.server, next) {
                    self.pending = Some(PendingClient {
                        server,
                        received: Vec::new(),
                        accepted_at: Instant::now(),
                    });
                }
                true
            }
        }
    }

    fn next_instance(&self) -> Option<NamedPipeServer> {
        let _guard = self.runtime.enter();
        match ServerOptions::new().create(&self.path) {
            Ok(server) => Some(server),
            Err(e) => {
                warn!("Failed to create next instance of {}: {e}", self.path);
                None
            }
        }
    }
}

impl ChannelBackend for NamedPipeListener {
    fn path(&self) -> &str {
        &self.path
    }

    fn send(&self, frame: &[u8]) -> bool {
        send_frame(&self.runtime, &self.path, frame, self.write_timeout)
    }

    fn receive(&mut self, window: Duration) -> Vec<Vec<u8>> {
        if self.closed {
            return Vec::new();
        }
        let deadline = Instant::now() + window;

        if self.pending.is_none() && !self.accept_client(deadline) {
            return Vec::new();
        }
        let Some(mut client) = self.pending.take() else {
            return Vec::new();
        };

        let state = self.runtime.block_on(read_until(&mut client, deadline));
        let mut completed = Vec::new();

        match state {
            Ok(ReadState::Open) if client.accepted_at.elapsed() < self.pending_ttl => {
                self.pending = Some(client);
                return completed;
            }
            Ok(ReadState::Open) => {
                warn!("Dropped a connection on {} that never finished writing", self.path);
            }
            Ok(ReadState::Finished) => {
                if !client.received.is_empty() {
                    completed.push(std::mem::take(&mut client.received));
                }
            }
            Err(e) => debug!("Dropping connection on {}: {e}", self.path),
        }

        if let Err(e) = client.server.disconnect() {
            trace!("Disconnect on {} failed: {e}", self.path);
        }
        completed
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(client) = self.pending.take()
            && let Err(e) = client.server.disconnect()
        {
            trace!("Disconnect of pending client on {} failed: {e}", self.path);
        }
        if let Some(server) = self.server.take()
            && let Err(e) = server.disconnect()
        {
            trace!("Disconnect on {} during close failed: {e}", self.path);
        }
        debug!("Closed pipe {}", self.path);
    }
}

impl Drop for NamedPipeListener {
    fn drop(&mut self) {
        self.close();
    }
}
