//! TCP control client for the radio.
//!
//! [`RadioClient`] owns the command channel (port 4992 by default): it
//! establishes the connection, assigns sequence numbers to outgoing
//! commands, correlates replies by sequence number, and demultiplexes
//! unsolicited status records to an installed handler from a background
//! read loop.
//!
//! This is a pure protocol client -- it knows nothing about slices,
//! panadapters, or session state. That orchestration lives in
//! [`RadioSession`](crate::session::RadioSession).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, oneshot};

use flexctl_core::{Error, Result};

use crate::codec::{self, CommandReply, RadioMessage, SEQUENCE_MODULUS, StatusMessage};

/// Default TCP connect timeout (5 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default per-command reply timeout (5 seconds).
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Options for configuring the control connection.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Maximum time to wait for the TCP connection to be established.
    pub connect_timeout: Duration,
    /// Maximum time to wait for each command's reply.
    pub command_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

/// Handler invoked for every parsed status record.
type StatusHandler = Box<dyn Fn(StatusMessage) + Send + Sync>;

/// TCP control client.
///
/// Any number of commands may be in flight concurrently from different
/// tasks; each caller suspends only on its own reply, and replies are
/// routed by sequence number alone, so arrival order does not matter.
/// The client is safe to share across tasks.
pub struct RadioClient {
    /// Write half of the TCP stream, `None` once disconnected.
    writer: Arc<Mutex<Option<tokio::io::WriteHalf<TcpStream>>>>,

    /// Last assigned sequence number. The next command takes
    /// `(last + 1) % SEQUENCE_MODULUS`, so a fresh session starts at 1.
    last_seq: Arc<Mutex<u32>>,

    /// Pending replies: sequence number -> oneshot sender.
    ///
    /// At most one entry per sequence number. With more than
    /// `SEQUENCE_MODULUS` commands concurrently outstanding the counter
    /// would collide with a live entry; that is out of contract.
    pending: Arc<Mutex<HashMap<u32, oneshot::Sender<CommandReply>>>>,

    /// Handler for unsolicited status records, invoked from the read loop.
    status_handler: Arc<Mutex<Option<StatusHandler>>>,

    /// Background read task handle.
    read_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,

    /// Connection state flag (atomic for lock-free reads).
    connected: Arc<AtomicBool>,

    /// Per-command reply timeout.
    command_timeout: Duration,
}

impl std::fmt::Debug for RadioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioClient")
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .field("command_timeout", &self.command_timeout)
            .finish_non_exhaustive()
    }
}

impl RadioClient {
    /// Connect to the radio's TCP command port.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        Self::connect_with_options(host, port, ClientOptions::default()).await
    }

    /// Connect with custom options.
    ///
    /// On success the background read loop is already running; commands
    /// may be sent immediately.
    pub async fn connect_with_options(
        host: &str,
        port: u16,
        options: ClientOptions,
    ) -> Result<Self> {
        let addr = format!("{host}:{port}");
        tracing::debug!(addr = %addr, "connecting to radio");

        let stream = tokio::time::timeout(options.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| Error::Connect {
                host: host.to_string(),
                port,
                source: std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
            })?
            .map_err(|e| Error::Connect {
                host: host.to_string(),
                port,
                source: e,
            })?;

        // Disable Nagle for low-latency command/reply turnaround.
        let _ = stream.set_nodelay(true);

        let (read_half, write_half) = tokio::io::split(stream);
        let reader = BufReader::new(read_half);

        let pending: Arc<Mutex<HashMap<u32, oneshot::Sender<CommandReply>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let status_handler: Arc<Mutex<Option<StatusHandler>>> = Arc::new(Mutex::new(None));
        let connected = Arc::new(AtomicBool::new(true));

        let read_handle = {
            let pending = Arc::clone(&pending);
            let status_handler = Arc::clone(&status_handler);
            let connected = Arc::clone(&connected);
            tokio::spawn(async move {
                read_loop(reader, pending, status_handler, connected).await;
            })
        };

        tracing::debug!(addr = %addr, "radio connected");

        Ok(RadioClient {
            writer: Arc::new(Mutex::new(Some(write_half))),
            last_seq: Arc::new(Mutex::new(0)),
            pending,
            status_handler,
            read_handle: Mutex::new(Some(read_handle)),
            connected,
            command_timeout: options.command_timeout,
        })
    }

    /// Send a command and await its reply.
    ///
    /// Returns the reply body on success. Fails with
    /// [`Error::Protocol`] when the radio reports a non-zero error code,
    /// [`Error::Timeout`] when no reply arrives within the deadline, and
    /// [`Error::ConnectionLost`] when the connection drops while the
    /// command is outstanding (or was already gone).
    pub async fn send_command(&self, command: &str) -> Result<String> {
        let reply = self.send_correlated(command).await?;
        if reply.is_success() {
            Ok(reply.message)
        } else {
            Err(Error::Protocol {
                code: reply.error_code,
                message: reply.message,
            })
        }
    }

    /// Send a command without waiting for its reply (fire-and-forget).
    ///
    /// A sequence number is still assigned so the radio accepts the
    /// frame; any reply will be discarded by the read loop.
    pub async fn send_command_no_wait(&self, command: &str) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(Error::ConnectionLost);
        }
        let seq = self.next_sequence().await;
        tracing::trace!(seq, command = %command, "sending command (no-wait)");
        self.write_frame(seq, command).await
    }

    async fn send_correlated(&self, command: &str) -> Result<CommandReply> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(Error::ConnectionLost);
        }

        let seq = self.next_sequence().await;

        // Register before writing so a reply racing the write cannot find
        // the entry missing.
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(seq, tx);
        }

        tracing::trace!(seq, command = %command, "sending command");
        if let Err(e) = self.write_frame(seq, command).await {
            let mut pending = self.pending.lock().await;
            pending.remove(&seq);
            return Err(e);
        }

        match tokio::time::timeout(self.command_timeout, rx).await {
            Ok(Ok(reply)) => {
                tracing::trace!(
                    seq,
                    error_code = %reply.error_code,
                    message = %reply.message,
                    "reply received"
                );
                Ok(reply)
            }
            Ok(Err(_)) => {
                // Sender dropped: the read loop exited.
                let mut pending = self.pending.lock().await;
                pending.remove(&seq);
                Err(Error::ConnectionLost)
            }
            Err(_) => {
                // Deadline elapsed. Remove the entry so a late reply for
                // this sequence number is discarded, not misdelivered.
                let mut pending = self.pending.lock().await;
                pending.remove(&seq);
                Err(Error::Timeout {
                    command: command.to_string(),
                })
            }
        }
    }

    /// Allocate the next sequence number, wrapping modulo
    /// [`SEQUENCE_MODULUS`].
    async fn next_sequence(&self) -> u32 {
        let mut last = self.last_seq.lock().await;
        *last = (*last + 1) % SEQUENCE_MODULUS;
        *last
    }

    #[cfg(test)]
    pub(crate) async fn force_last_sequence(&self, value: u32) {
        let mut last = self.last_seq.lock().await;
        *last = value;
    }

    async fn write_frame(&self, seq: u32, command: &str) -> Result<()> {
        let encoded = codec::encode_command(seq, command);
        let mut writer = self.writer.lock().await;
        let w = writer.as_mut().ok_or(Error::ConnectionLost)?;
        if let Err(e) = w.write_all(&encoded).await {
            tracing::debug!(error = %e, "command write failed");
            self.connected.store(false, Ordering::SeqCst);
            return Err(Error::ConnectionLost);
        }
        if let Err(e) = w.flush().await {
            tracing::debug!(error = %e, "command flush failed");
            self.connected.store(false, Ordering::SeqCst);
            return Err(Error::ConnectionLost);
        }
        Ok(())
    }

    /// Install the handler invoked (synchronously, from the read loop)
    /// for every parsed status record. Replaces any previous handler.
    pub async fn set_status_handler<F>(&self, handler: F)
    where
        F: Fn(StatusMessage) + Send + Sync + 'static,
    {
        let mut slot = self.status_handler.lock().await;
        *slot = Some(Box::new(handler));
    }

    /// Whether the client is currently connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Disconnect and clean up the background read task.
    ///
    /// Idempotent. Every command still awaiting a reply fails with
    /// [`Error::ConnectionLost`], exactly once each.
    pub async fn disconnect(&self) {
        let was_connected = self.connected.swap(false, Ordering::SeqCst);
        if was_connected {
            tracing::debug!("disconnecting radio client");
        }

        {
            let mut writer = self.writer.lock().await;
            if let Some(mut w) = writer.take() {
                let _ = w.shutdown().await;
            }
        }
        {
            let mut handle = self.read_handle.lock().await;
            if let Some(h) = handle.take() {
                h.abort();
            }
        }
        // Drop pending senders so waiters observe ConnectionLost.
        {
            let mut pending = self.pending.lock().await;
            pending.clear();
        }
    }
}

// ---------------------------------------------------------------------------
// Read loop
// ---------------------------------------------------------------------------

/// Background task that drains the TCP stream and dispatches each line.
///
/// Runs until end-of-stream or a read error, then marks the connection
/// lost and drops every pending sender. Malformed lines never escape
/// this loop; they are logged and dropped.
async fn read_loop(
    mut reader: BufReader<tokio::io::ReadHalf<TcpStream>>,
    pending: Arc<Mutex<HashMap<u32, oneshot::Sender<CommandReply>>>>,
    status_handler: Arc<Mutex<Option<StatusHandler>>>,
    connected: Arc<AtomicBool>,
) {
    let mut line_buf = String::new();

    loop {
        line_buf.clear();
        match reader.read_line(&mut line_buf).await {
            Ok(0) => {
                tracing::debug!("connection closed by radio");
                break;
            }
            Ok(_) => {
                let trimmed = line_buf.trim_end_matches('\n').trim_end_matches('\r');
                if trimmed.is_empty() {
                    continue;
                }

                match codec::parse_line(trimmed) {
                    Ok(RadioMessage::Heartbeat) => {
                        // Reserved liveness hook; no state change.
                        tracing::trace!("heartbeat");
                    }
                    Ok(RadioMessage::Reply(reply)) => {
                        let mut p = pending.lock().await;
                        if let Some(sender) = p.remove(&reply.sequence) {
                            let _ = sender.send(reply);
                        } else {
                            tracing::trace!(
                                seq = reply.sequence,
                                "reply for unknown or expired sequence"
                            );
                        }
                    }
                    Ok(RadioMessage::Status(status)) => {
                        let handler = status_handler.lock().await;
                        if let Some(h) = handler.as_ref() {
                            h(status);
                        } else {
                            tracing::trace!(
                                object = %status.object,
                                "status with no handler installed"
                            );
                        }
                    }
                    Err(e) => {
                        tracing::trace!(error = %e, line = %trimmed, "dropping unparsable line");
                    }
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "read error");
                break;
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
    // Drop all pending senders so waiters fail with ConnectionLost.
    let mut p = pending.lock().await;
    p.clear();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
