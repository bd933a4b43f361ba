use super::{ChannelBackend, Liveness};
use crate::codec::MAX_CONNECTION_BYTES;
use crate::config::PipeConfig;

use std::fs::{self, File, OpenOptions};
use std::io::{Error as IoError, ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::thread::sleep;
use std::time::{Duration, Instant};

use log::{debug, error, trace, warn};
use socket2::{Domain, SockAddr, Socket, Type};

const POLL_SLEEP: Duration = Duration::from_millis(1);
const READ_CHUNK_SIZE: usize = 4096;
const CLAIM_LOCK_SUFFIX: &str = ".lock";

/// Identifies the socket file this process created (device, inode).
type FileId = (u64, u64);

/// Socket file owner. Accepts short-lived connections, one message each.
pub struct SocketListener {
    listener: Option<UnixListener>,
    path: String,
    file_id: FileId,
    pending: Vec<PendingConnection>,
    pending_ttl: Duration,
    write_timeout: Duration,
    unexpected_removal: bool,
}

/// Sending side. Holds no descriptor between sends.
pub struct SocketConnector {
    path: String,
    write_timeout: Duration,
}

/// Exclusive `flock` on `{path}.lock`.
///
/// Every bind, stale unlink and owner unlink of a socket path happens under
/// this lock, so a socket between `bind` and `listen` is never mistaken for
/// a stale one by another process. Released when dropped.
pub struct ClaimLock {
    _file: File,
}

struct PendingConnection {
    stream: UnixStream,
    received: Vec<u8>,
    accepted_at: Instant,
}

enum ReadState {
    Open,
    Finished,
}

/// Bind the socket file at `path`.
///
/// # Errors
///
/// Fails with [`ErrorKind::AddrInUse`] if anything already exists at `path`.
pub fn open_as_listener(path: &str, config: &PipeConfig) -> Result<Box<dyn ChannelBackend>, IoError> {
    let (listener, file_id) = bind(path)?;
    debug!("Listening on {path}");

    Ok(Box::new(SocketListener {
        listener: Some(listener),
        path: path.to_string(),
        file_id,
        pending: Vec::new(),
        pending_ttl: config.pending_connection_ttl(),
        write_timeout: config.write_timeout(),
        unexpected_removal: false,
    }))
}

pub fn open_as_connector(
    path: &str,
    config: &PipeConfig,
) -> Result<Box<dyn ChannelBackend>, IoError> {
    Ok(Box::new(SocketConnector {
        path: path.to_string(),
        write_timeout: config.write_timeout(),
    }))
}

/// Take the claim lock for `path`, waiting for the current holder.
pub fn lock_for_claim(path: &str) -> Result<ClaimLock, IoError> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .mode(0o600)
        .open(format!("{path}{CLAIM_LOCK_SUFFIX}"))?;

    loop {
        // SAFETY: the descriptor is owned by `file`, which outlives the call.
        if unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) } == 0 {
            return Ok(ClaimLock { _file: file });
        }

        let error = IoError::last_os_error();
        if error.kind() != ErrorKind::Interrupted {
            return Err(error);
        }
    }
}

/// Connect to `path` to find out whether a listener is behind it.
///
/// A listener with a full accept backlog still counts as live.
pub fn probe(path: &str) -> Liveness {
    match connect(path) {
        Ok(_) => Liveness::Live,
        Err(e) if is_busy(&e) => Liveness::Live,
        Err(e) if e.kind() == ErrorKind::ConnectionRefused => Liveness::Stale,
        Err(e) if e.kind() == ErrorKind::NotFound => Liveness::Absent,
        Err(e) => {
            debug!("Probe of {path} failed: {e}");
            Liveness::Unknown(e.kind())
        }
    }
}

/// Remove a stale socket file. A file that is already gone is not an error.
pub fn reclaim(path: &str) -> Result<(), IoError> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn bind(path: &str) -> Result<(UnixListener, FileId), IoError> {
    let listener = UnixListener::bind(path)?;

    let configured = listener
        .set_nonblocking(true)
        .and_then(|()| fs::metadata(path));

    match configured {
        Ok(meta) => Ok((listener, (meta.dev(), meta.ino()))),
        Err(e) => {
            drop(listener);
            let _ = fs::remove_file(path);
            Err(e)
        }
    }
}

/// Non-blocking connect. Fails with `WouldBlock` when the backlog is full
/// instead of waiting for the listener to accept.
fn connect(path: &str) -> Result<UnixStream, IoError> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    socket.set_nonblocking(true)?;
    socket.connect(&SockAddr::unix(path)?)?;
    Ok(UnixStream::from(std::os::fd::OwnedFd::from(socket)))
}

fn is_busy(error: &IoError) -> bool {
    error.kind() == ErrorKind::WouldBlock || error.raw_os_error() == Some(libc::EINPROGRESS)
}

/// Deliver `frame` over a fresh connection.
///
/// Connecting never blocks. Once connected the frame is written in full,
/// waiting on the listener to drain the socket for at most `write_timeout`.
fn send_frame(path: &str, frame: &[u8], write_timeout: Duration) -> bool {
    let mut stream = match connect(path) {
        Ok(stream) => stream,
        Err(e) => {
            trace!("No listener accepted a connection on {path}: {e}");
            return false;
        }
    };

    if let Err(e) = stream.set_nonblocking(false) {
        debug!("Failed to configure connection to {path}: {e}");
        return false;
    }

    match write_before(&mut stream, frame, Instant::now() + write_timeout) {
        Ok(()) => true,
        Err(e) => {
            debug!("Write to {path} did not complete: {e}");
            false
        }
    }
}

fn write_before(stream: &mut UnixStream, mut frame: &[u8], deadline: Instant) -> Result<(), IoError> {
    while !frame.is_empty() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(IoError::new(ErrorKind::TimedOut, "write timeout elapsed"));
        }
        stream.set_write_timeout(Some(remaining))?;

        match stream.write(frame) {
            Ok(0) => return Err(IoError::from(ErrorKind::WriteZero)),
            Ok(written) => frame = &frame[written..],
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

impl ChannelBackend for SocketConnector {
    fn path(&self) -> &str {
        &self.path
    }

    fn send(&self, frame: &[u8]) -> bool {
        send_frame(&self.path, frame, self.write_timeout)
    }

    fn receive(&mut self, _window: Duration) -> Vec<Vec<u8>> {
        Vec::new()
    }

    fn close(&mut self) {}
}

impl SocketListener {
    fn accept_pending(&mut self) {
        let Some(listener) = self.listener.as_ref() else {
            return;
        };

        loop {
            match listener.accept() {
                Ok((stream, _)) => {
                    if let Err(e) = stream.set_nonblocking(true) {
                        warn!("Dropping connection on {}: {e}", self.path);
                        continue;
                    }
                    self.pending.push(PendingConnection {
                        stream,
                        received: Vec::new(),
                        accepted_at: Instant::now(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("Accept on {} failed: {e}", self.path);
                    break;
                }
            }
        }
    }

    fn drain_pending(&mut self, completed: &mut Vec<Vec<u8>>) {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let path = &self.path;

        self.pending
            .retain_mut(|connection| match connection.read_available(&mut chunk) {
                Ok(ReadState::Open) => true,
                Ok(ReadState::Finished) => {
                    if !connection.received.is_empty() {
                        completed.push(std::mem::take(&mut connection.received));
                    }
                    false
                }
                Err(e) => {
                    debug!("Dropping connection on {path}: {e}");
                    false
                }
            });
    }

    fn expire_pending(&mut self) {
        let ttl = self.pending_ttl;
        let before = self.pending.len();
        self.pending
            .retain(|connection| connection.accepted_at.elapsed() < ttl);

        let expired = before - self.pending.len();
        if expired > 0 {
            warn!(
                "Dropped {expired} connection(s) on {} that never finished writing",
                self.path
            );
        }
    }

    /// Recreate the socket file if something deleted it under us.
    fn check_socket_file(&mut self) {
        match fs::metadata(&self.path) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                error!("Pipe file {} was removed, recreating it", self.path);
                self.unexpected_removal = true;
                let _lock = lock_for_claim(&self.path)
                    .inspect_err(|e| warn!("Recreating {} without claim lock: {e}", self.path));
                match bind(&self.path) {
                    Ok((listener, file_id)) => {
                        self.listener = Some(listener);
                        self.file_id = file_id;
                    }
                    Err(e) => error!("Failed to recreate pipe file {}: {e}", self.path),
                }
            }
            Err(e) => trace!("Cannot stat pipe file {}: {e}", self.path),
        }
    }
}

impl PendingConnection {
    fn read_available(&mut self, chunk: &mut [u8]) -> Result<ReadState, IoError> {
        loop {
            match self.stream.read(chunk) {
                Ok(0) => return Ok(ReadState::Finished),
                Ok(read) => {
                    self.received.extend_from_slice(&chunk[..read]);
                    if self.received.len() > MAX_CONNECTION_BYTES {
                        return Err(IoError::new(
                            ErrorKind::InvalidData,
                            format!("connection sent more than {MAX_CONNECTION_BYTES} bytes"),
                        ));
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(ReadState::Open),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl ChannelBackend for SocketListener {
    fn path(&self) -> &str {
        &self.path
    }

    fn send(&self, frame: &[u8]) -> bool {
        send_frame(&self.path, frame, self.write_timeout)
    }

    fn receive(&mut self, window: Duration) -> Vec<Vec<u8>> {
        if self.listener.is_none() {
            return Vec::new();
        }

        self.check_socket_file();

        let deadline = Instant::now() + window;
        let mut completed = Vec::new();

        loop {
            self.accept_pending();
            self.drain_pending(&mut completed);

            if !completed.is_empty() || Instant::now() >= deadline {
                break;
            }
            sleep(POLL_SLEEP);
        }

        self.expire_pending();
        completed
    }

    fn unexpected_removal(&self) -> bool {
        self.unexpected_removal
    }

    fn close(&mut self) {
        if self.listener.take().is_none() {
            return;
        }
        self.pending.clear();

        let _lock = lock_for_claim(&self.path)
            .inspect_err(|e| warn!("Removing {} without claim lock: {e}", self.path));
        match fs::metadata(&self.path) {
            Ok(meta) if (meta.dev(), meta.ino()) == self.file_id => {
                match fs::remove_file(&self.path) {
                    Ok(()) => debug!("Removed pipe file {}", self.path),
                    Err(e) => warn!("Failed to remove pipe file {}: {e}", self.path),
                }
            }
            Ok(_) => debug!(
                "Pipe file {} belongs to another listener now, leaving it",
                self.path
            ),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Cannot stat pipe file {} on close: {e}", self.path),
        }
    }
}

impl Drop for SocketListener {
    fn drop(&mut self) {
        self.close();
    }
}
