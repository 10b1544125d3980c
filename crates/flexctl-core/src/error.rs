//! Error types for flexctl.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer, protocol-layer, and
//! session-layer errors are all captured here.

/// The error type for all flexctl operations.
///
/// Variants cover the full range of failure modes encountered when
/// talking to the radio: connection establishment failures, command
/// timeouts, radio-reported command errors, and lost connections.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The TCP connection to the radio could not be established.
    ///
    /// Carries the target host and port so a misconfigured address or a
    /// radio in a different network segment can be diagnosed from the
    /// error alone.
    #[error("connect to {host}:{port} failed: {source}")]
    Connect {
        /// Host the connection was attempted against.
        host: String,
        /// TCP command port.
        port: u16,
        /// The underlying socket error.
        source: std::io::Error,
    },

    /// No reply arrived for a command within the deadline.
    ///
    /// This typically indicates the radio is powered off or has stopped
    /// processing commands; the connection itself may still be alive.
    #[error("timeout waiting for reply to \"{command}\"")]
    Timeout {
        /// The command text that went unanswered.
        command: String,
    },

    /// The radio answered a command with a non-zero error code.
    ///
    /// The code and message are carried verbatim from the reply line.
    #[error("radio error {code}: {message}")]
    Protocol {
        /// Error code string from the reply (anything other than `"0"`).
        code: String,
        /// Human-readable message from the reply, may be empty.
        message: String,
    },

    /// The connection to the radio was lost, or an operation required a
    /// connection that is already gone.
    #[error("connection lost")]
    ConnectionLost,

    /// An inbound line did not match any known record shape.
    ///
    /// The read loop logs and drops these; they are never surfaced to a
    /// command caller.
    #[error("malformed record: {0}")]
    Malformed(String),

    /// An underlying I/O error on an established connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_connect() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let e = Error::Connect {
            host: "192.168.1.100".into(),
            port: 4992,
            source: io,
        };
        let text = e.to_string();
        assert!(text.contains("192.168.1.100:4992"), "got: {text}");
        assert!(text.contains("refused"), "got: {text}");
    }

    #[test]
    fn error_display_timeout_names_command() {
        let e = Error::Timeout {
            command: "slice create 0 usb".into(),
        };
        assert_eq!(
            e.to_string(),
            "timeout waiting for reply to \"slice create 0 usb\""
        );
    }

    #[test]
    fn error_display_protocol_carries_code_and_message() {
        let e = Error::Protocol {
            code: "50000015".into(),
            message: "invalid slice".into(),
        };
        assert_eq!(e.to_string(), "radio error 50000015: invalid slice");
    }

    #[test]
    fn error_display_connection_lost() {
        assert_eq!(Error::ConnectionLost.to_string(), "connection lost");
    }

    #[test]
    fn error_display_malformed() {
        let e = Error::Malformed("Xjunk".into());
        assert_eq!(e.to_string(), "malformed record: Xjunk");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<Error>();
    }
}
