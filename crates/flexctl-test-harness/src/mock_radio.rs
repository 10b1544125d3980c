//! Scripted mock radio server.
//!
//! [`MockRadio`] listens on a random localhost port, accepts a single
//! client connection, and processes command frames against a pre-loaded
//! script: for each incoming `C<seq>|<text>` line it pops the next
//! expectation, checks the command text, and replies
//! `R<seq>|<errno>|<message>` using the sequence number actually
//! received. Unsolicited status and heartbeat lines can be injected at
//! any time through the [`MockRadioHandle`].
//!
//! # Example
//!
//! ```no_run
//! use flexctl_test_harness::MockRadio;
//!
//! # async fn example() -> flexctl_core::Result<()> {
//! let mut radio = MockRadio::bind().await?;
//! radio.expect_ok("client udpport 4991", "");
//! radio.expect_ok("slice create 0 usb", "0");
//! let handle = radio.start();
//!
//! // ... connect a client to radio.addr() and drive it ...
//!
//! handle.inject("Sslice|0|frequency=14250000").await;
//! // handle.finish().await verifies the whole script was consumed.
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use flexctl_core::{Error, Result};

/// How the mock answers one expected command.
#[derive(Debug, Clone)]
enum Reply {
    /// Reply `R<seq>|0|<body>`.
    Ok(String),
    /// Reply `R<seq>|<code>|<message>`.
    Err { code: String, message: String },
    /// Swallow the command and never reply (for timeout tests).
    None,
}

/// A pre-loaded command/reply pair.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact command text (without the `C<seq>|` prefix) the client
    /// is expected to send.
    command: String,
    reply: Reply,
}

/// A scripted mock radio, not yet serving.
///
/// Load expectations in the order the client will send them, then call
/// [`start`](MockRadio::start). Any command that does not match the
/// script fails the server task, which [`MockRadioHandle::finish`]
/// reports.
pub struct MockRadio {
    listener: TcpListener,
    addr: String,
    script: VecDeque<Expectation>,
}

impl MockRadio {
    /// Bind a mock radio to a random localhost port.
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr().map_err(Error::Io)?.to_string();
        Ok(Self {
            listener,
            addr,
            script: VecDeque::new(),
        })
    }

    /// The `host:port` address the mock is listening on.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Expect `command` and answer it successfully with `body`.
    pub fn expect_ok(&mut self, command: &str, body: &str) {
        self.script.push_back(Expectation {
            command: command.to_string(),
            reply: Reply::Ok(body.to_string()),
        });
    }

    /// Expect `command` and answer it with a non-zero error code.
    pub fn expect_err(&mut self, command: &str, code: &str, message: &str) {
        self.script.push_back(Expectation {
            command: command.to_string(),
            reply: Reply::Err {
                code: code.to_string(),
                message: message.to_string(),
            },
        });
    }

    /// Expect `command` but never reply to it (for timeout tests).
    pub fn expect_no_reply(&mut self, command: &str) {
        self.script.push_back(Expectation {
            command: command.to_string(),
            reply: Reply::None,
        });
    }

    /// Start serving: accept one connection and run the script until the
    /// client disconnects.
    pub fn start(self) -> MockRadioHandle {
        let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
        let task = tokio::spawn(serve(self.listener, self.script, out_rx, out_tx.clone()));
        MockRadioHandle { out_tx, task }
    }
}

/// Handle to a running [`MockRadio`].
pub struct MockRadioHandle {
    out_tx: mpsc::UnboundedSender<String>,
    task: JoinHandle<std::result::Result<(), String>>,
}

impl MockRadioHandle {
    /// Inject a raw line (status, heartbeat, or anything else) into the
    /// stream towards the client. The newline is appended here.
    ///
    /// Injected lines and scripted replies share one ordered queue, so
    /// an injection enqueued after a reply is written after it.
    pub async fn inject(&self, line: &str) {
        let _ = self.out_tx.send(line.to_string());
    }

    /// Wait for the client to hang up and verify the script was fully
    /// consumed.
    ///
    /// Returns an error describing the first mismatched or unexpected
    /// command, or any leftover expectations.
    pub async fn finish(self) -> std::result::Result<(), String> {
        drop(self.out_tx);
        self.task
            .await
            .map_err(|e| format!("mock radio task panicked: {e}"))?
    }
}

/// Accept one client and run the script.
async fn serve(
    listener: TcpListener,
    mut script: VecDeque<Expectation>,
    out_rx: mpsc::UnboundedReceiver<String>,
    out_tx: mpsc::UnboundedSender<String>,
) -> std::result::Result<(), String> {
    let (stream, _) = listener
        .accept()
        .await
        .map_err(|e| format!("accept failed: {e}"))?;

    let (read_half, mut write_half) = stream.into_split();

    // A dedicated writer drains one ordered queue fed by both the
    // command handler (replies) and the test (injected lines), so
    // nothing interleaves mid-line.
    let writer = tokio::spawn(async move {
        let mut out_rx = out_rx;
        while let Some(line) = out_rx.recv().await {
            if write_half
                .write_all(format!("{line}\n").as_bytes())
                .await
                .is_err()
            {
                break;
            }
            if write_half.flush().await.is_err() {
                break;
            }
        }
    });

    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    let result = loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                // Client hung up; the whole script should be consumed.
                if script.is_empty() {
                    break Ok(());
                }
                break Err(format!(
                    "client disconnected with {} expectation(s) left, next: {:?}",
                    script.len(),
                    script.front().map(|e| e.command.clone())
                ));
            }
            Ok(_) => {
                let trimmed = line.trim_end_matches('\n').trim_end_matches('\r');
                if trimmed.is_empty() {
                    continue;
                }

                let Some((seq, text)) = split_command(trimmed) else {
                    break Err(format!("client sent a non-command line: {trimmed}"));
                };

                let Some(expectation) = script.pop_front() else {
                    break Err(format!("unexpected command: {text}"));
                };
                if text != expectation.command {
                    break Err(format!(
                        "command mismatch: expected {:?}, got {:?}",
                        expectation.command, text
                    ));
                }

                let reply = match &expectation.reply {
                    Reply::Ok(body) => Some(format!("R{seq}|0|{body}")),
                    Reply::Err { code, message } => Some(format!("R{seq}|{code}|{message}")),
                    Reply::None => None,
                };
                if let Some(reply) = reply {
                    if out_tx.send(reply).is_err() {
                        break Err("writer queue closed".to_string());
                    }
                }
            }
            Err(e) => break Err(format!("read failed: {e}")),
        }
    };

    drop(out_tx);
    let _ = writer.await;
    result
}

/// Split a `C<seq>|<text>` frame into its sequence digits and command
/// text. Returns `None` for anything that is not a command frame.
fn split_command(line: &str) -> Option<(&str, &str)> {
    let body = line.strip_prefix('C')?;
    let (seq, text) = body.split_once('|')?;
    if seq.is_empty() || !seq.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((seq, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;

    async fn read_reply(stream: &mut TcpStream) -> String {
        let mut buf = [0u8; 256];
        let n = stream.read(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf[..n]).trim_end().to_string()
    }

    #[tokio::test]
    async fn replies_echo_the_received_sequence_number() {
        let mut radio = MockRadio::bind().await.unwrap();
        radio.expect_ok("slice create 0 usb", "0");
        radio.expect_err("slice remove 9", "50000015", "invalid slice");
        let addr = radio.addr().to_string();
        let handle = radio.start();

        let mut stream = TcpStream::connect(&addr).await.unwrap();
        stream.write_all(b"C41|slice create 0 usb\n").await.unwrap();
        assert_eq!(read_reply(&mut stream).await, "R41|0|0");

        stream.write_all(b"C42|slice remove 9\n").await.unwrap();
        assert_eq!(read_reply(&mut stream).await, "R42|50000015|invalid slice");

        drop(stream);
        handle.finish().await.unwrap();
    }

    #[tokio::test]
    async fn injected_lines_reach_the_client() {
        let radio = MockRadio::bind().await.unwrap();
        let addr = radio.addr().to_string();
        let handle = radio.start();

        let mut stream = TcpStream::connect(&addr).await.unwrap();
        handle.inject("Sslice|0|frequency=7150000").await;
        handle.inject("H1").await;

        let mut reader = BufReader::new(&mut stream);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "Sslice|0|frequency=7150000\n");
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line, "H1\n");

        drop(stream);
        handle.finish().await.unwrap();
    }

    #[tokio::test]
    async fn no_reply_expectation_stays_silent() {
        let mut radio = MockRadio::bind().await.unwrap();
        radio.expect_no_reply("info");
        radio.expect_ok("info", "ok");
        let addr = radio.addr().to_string();
        let handle = radio.start();

        let mut stream = TcpStream::connect(&addr).await.unwrap();
        stream.write_all(b"C1|info\n").await.unwrap();
        stream.write_all(b"C2|info\n").await.unwrap();
        // Only the second command is answered.
        assert_eq!(read_reply(&mut stream).await, "R2|0|ok");

        drop(stream);
        handle.finish().await.unwrap();
    }

    #[tokio::test]
    async fn unexpected_command_fails_the_script() {
        let radio = MockRadio::bind().await.unwrap();
        let addr = radio.addr().to_string();
        let handle = radio.start();

        let mut stream = TcpStream::connect(&addr).await.unwrap();
        stream.write_all(b"C1|surprise\n").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        drop(stream);

        let result = handle.finish().await;
        assert!(result.is_err(), "expected script failure");
        assert!(result.unwrap_err().contains("unexpected command"));
    }

    #[tokio::test]
    async fn leftover_expectations_fail_the_script() {
        let mut radio = MockRadio::bind().await.unwrap();
        radio.expect_ok("never sent", "");
        let addr = radio.addr().to_string();
        let handle = radio.start();

        let stream = TcpStream::connect(&addr).await.unwrap();
        drop(stream);

        let result = handle.finish().await;
        assert!(result.is_err(), "expected script failure");
        assert!(result.unwrap_err().contains("expectation"));
    }
}
