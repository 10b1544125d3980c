//! Command/response/status encoding and decoding for the radio's TCP
//! control protocol.
//!
//! The protocol uses newline-terminated ASCII lines. Commands flow from
//! client to radio; replies, status updates, and heartbeats flow from
//! radio to client.
//!
//! # Line formats
//!
//! ```text
//! Command:   C<seq>|<command_text>\n
//! Reply:     R<seq>|<errno>|<message>\n
//! Status:    S<type>|<field>|<field>=<value>|...\n
//! Heartbeat: H...\n
//! ```
//!
//! All encoding/decoding in this module is pure parsing -- no I/O is
//! performed.

use flexctl_core::{Error, Mode, Result};

/// Number of distinct command sequence numbers; sequences wrap modulo this.
pub const SEQUENCE_MODULUS: u32 = 1000;

// ---------------------------------------------------------------------------
// Command encoding
// ---------------------------------------------------------------------------

/// Encode a command frame with the given sequence number.
///
/// Format: `C<seq>|<command>\n`
pub fn encode_command(seq: u32, command: &str) -> Vec<u8> {
    format!("C{seq}|{command}\n").into_bytes()
}

// ---------------------------------------------------------------------------
// Command builders
//
// Each builder returns the command string WITHOUT the `C<seq>|` prefix.
// The prefix is added by the client layer when it assigns a sequence number.
// ---------------------------------------------------------------------------

/// Build the UDP-port handshake command sent right after connecting.
///
/// Example output: `"client udpport 4991"`
pub fn cmd_udp_port(port: u16) -> String {
    format!("client udpport {port}")
}

/// Build a slice create command.
///
/// Example output: `"slice create 0 usb"`
pub fn cmd_slice_create(mode: Mode) -> String {
    format!("slice create 0 {mode}")
}

/// Build a slice remove command.
///
/// Example output: `"slice remove 0"`
pub fn cmd_slice_remove(slice_id: &str) -> String {
    format!("slice remove {slice_id}")
}

/// Build a slice frequency set command.
///
/// Example output: `"slice set 0 frequency=14250000"`
pub fn cmd_slice_set_frequency(slice_id: &str, hz: u64) -> String {
    format!("slice set {slice_id} frequency={hz}")
}

/// Build a slice mode set command.
///
/// Example output: `"slice set 0 mode=usb"`
pub fn cmd_slice_set_mode(slice_id: &str, mode: Mode) -> String {
    format!("slice set {slice_id} mode={mode}")
}

/// Build a slice RF gain set command.
///
/// The radio calls this parameter `rfpower`.
///
/// Example output: `"slice set 0 rfpower=50"`
pub fn cmd_slice_set_rf_gain(slice_id: &str, level: u8) -> String {
    format!("slice set {slice_id} rfpower={level}")
}

/// Build a slice AF gain set command.
///
/// Example output: `"slice set 0 af_gain=50"`
pub fn cmd_slice_set_af_gain(slice_id: &str, level: u8) -> String {
    format!("slice set {slice_id} af_gain={level}")
}

/// Build the command that keys the transmitter on the given slice.
///
/// Example output: `"xmit 0"`
pub fn cmd_xmit_on(slice_id: &str) -> String {
    format!("xmit {slice_id}")
}

/// Build the command that unkeys the transmitter.
///
/// Example output: `"xmit off"`
pub fn cmd_xmit_off() -> String {
    "xmit off".to_string()
}

/// Build a subscribe-to-all-events command scoped to a slice.
///
/// Example output: `"sub slice 0 all"`
pub fn cmd_sub_slice(slice_id: &str) -> String {
    format!("sub slice {slice_id} all")
}

/// Build a panadapter create command.
///
/// Example output: `"display pan create 1024 14250000"`
pub fn cmd_pan_create(width: u32, center_hz: u64) -> String {
    format!("display pan create {width} {center_hz}")
}

/// Build a panadapter remove command.
///
/// Example output: `"display pan remove 0x40000000"`
pub fn cmd_pan_remove(pan_id: &str) -> String {
    format!("display pan remove {pan_id}")
}

/// Build an RX audio stream registration command.
///
/// Example output: `"audio client create rx 48000"`
pub fn cmd_audio_create_rx(sample_rate: u32) -> String {
    format!("audio client create rx {sample_rate}")
}

/// Build a TX audio stream registration command.
///
/// Example output: `"audio client create tx 48000"`
pub fn cmd_audio_create_tx(sample_rate: u32) -> String {
    format!("audio client create tx {sample_rate}")
}

/// Build the command that removes all audio stream registrations.
///
/// Example output: `"audio client remove all"`
pub fn cmd_audio_remove_all() -> String {
    "audio client remove all".to_string()
}

// ---------------------------------------------------------------------------
// Inbound record types
// ---------------------------------------------------------------------------

/// A decoded reply to a previously-sent command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    /// Sequence number correlating this reply to the originating command.
    pub sequence: u32,
    /// Error code string. `"0"` means success; anything else is a
    /// radio-reported failure, surfaced verbatim.
    pub error_code: String,
    /// Reply body (may be empty). For `slice create`, the new slice
    /// identifier is its last whitespace-separated token.
    pub message: String,
}

impl CommandReply {
    /// Whether the radio accepted the command.
    pub fn is_success(&self) -> bool {
        self.error_code == "0"
    }
}

/// A decoded unsolicited status record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    /// The message type (e.g. `"slice"`).
    pub object: String,
    /// The ordered pipe-separated fields after the type. For `slice`
    /// records the first field is the slice identifier and the rest are
    /// `key=value` pairs.
    pub args: Vec<String>,
}

/// Kinds of lines received from the radio's TCP stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioMessage {
    /// Liveness heartbeat: `H...`. Carries no state.
    Heartbeat,
    /// Reply to a command: `R<seq>|<errno>|<message>`
    Reply(CommandReply),
    /// Unsolicited status update: `S<type>|<field>|...`
    Status(StatusMessage),
}

// ---------------------------------------------------------------------------
// Line parsing
// ---------------------------------------------------------------------------

/// Parse a single line received from the radio.
///
/// The line should NOT include the trailing `\n`. Leading/trailing
/// whitespace is stripped for robustness. Lines that match none of the
/// three record shapes return [`Error::Malformed`]; the read loop logs
/// and drops those without disturbing anything else.
pub fn parse_line(line: &str) -> Result<RadioMessage> {
    let line = line.trim();
    if line.is_empty() {
        return Err(Error::Malformed("empty line".into()));
    }

    match line.as_bytes()[0] {
        b'H' => Ok(RadioMessage::Heartbeat),
        b'R' => parse_reply(line),
        b'S' => parse_status(line),
        _ => Err(Error::Malformed(format!("unknown record shape: {line}"))),
    }
}

/// Parse a reply line: `R<seq>|<errno>|<message>`
fn parse_reply(line: &str) -> Result<RadioMessage> {
    let body = &line[1..]; // skip 'R'
    let parts: Vec<&str> = body.splitn(3, '|').collect();
    if parts.len() < 2 {
        return Err(Error::Malformed(format!(
            "reply needs at least seq|errno: {line}"
        )));
    }

    let sequence = parts[0]
        .parse::<u32>()
        .map_err(|_| Error::Malformed(format!("invalid reply sequence number: {}", parts[0])))?;

    let error_code = parts[1].to_string();
    let message = parts.get(2).map(|s| s.to_string()).unwrap_or_default();

    Ok(RadioMessage::Reply(CommandReply {
        sequence,
        error_code,
        message,
    }))
}

/// Parse a status line: `S<type>|<field>|<field>=<value>|...`
fn parse_status(line: &str) -> Result<RadioMessage> {
    let body = &line[1..]; // skip 'S'
    let mut parts = body.split('|');

    let object = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Malformed(format!("status line missing type: {line}")))?
        .to_string();

    let args: Vec<String> = parts.map(|s| s.to_string()).collect();

    Ok(RadioMessage::Status(StatusMessage { object, args }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- Command encoding ---------------------------------------------------

    #[test]
    fn encode_command_seq1() {
        let bytes = encode_command(1, "slice create 0 usb");
        assert_eq!(bytes, b"C1|slice create 0 usb\n");
    }

    #[test]
    fn encode_command_seq_zero() {
        let bytes = encode_command(0, "xmit off");
        assert_eq!(bytes, b"C0|xmit off\n");
    }

    #[test]
    fn encode_command_max_seq() {
        let bytes = encode_command(999, "info");
        assert_eq!(bytes, b"C999|info\n");
    }

    // -- Command builders ---------------------------------------------------

    #[test]
    fn cmd_udp_port_default() {
        assert_eq!(cmd_udp_port(4991), "client udpport 4991");
    }

    #[test]
    fn cmd_slice_create_usb() {
        assert_eq!(cmd_slice_create(Mode::Usb), "slice create 0 usb");
    }

    #[test]
    fn cmd_slice_create_digu() {
        assert_eq!(cmd_slice_create(Mode::Digu), "slice create 0 digu");
    }

    #[test]
    fn cmd_slice_remove_basic() {
        assert_eq!(cmd_slice_remove("0"), "slice remove 0");
    }

    #[test]
    fn cmd_slice_set_frequency_20m() {
        assert_eq!(
            cmd_slice_set_frequency("0", 14_250_000),
            "slice set 0 frequency=14250000"
        );
    }

    #[test]
    fn cmd_slice_set_mode_lsb() {
        assert_eq!(cmd_slice_set_mode("0", Mode::Lsb), "slice set 0 mode=lsb");
    }

    #[test]
    fn cmd_slice_set_rf_gain_uses_rfpower_key() {
        assert_eq!(cmd_slice_set_rf_gain("0", 75), "slice set 0 rfpower=75");
    }

    #[test]
    fn cmd_slice_set_af_gain_basic() {
        assert_eq!(cmd_slice_set_af_gain("2", 30), "slice set 2 af_gain=30");
    }

    #[test]
    fn cmd_xmit_on_names_slice() {
        assert_eq!(cmd_xmit_on("0"), "xmit 0");
    }

    #[test]
    fn cmd_xmit_off_basic() {
        assert_eq!(cmd_xmit_off(), "xmit off");
    }

    #[test]
    fn cmd_sub_slice_basic() {
        assert_eq!(cmd_sub_slice("0"), "sub slice 0 all");
    }

    #[test]
    fn cmd_pan_create_basic() {
        assert_eq!(
            cmd_pan_create(1024, 14_250_000),
            "display pan create 1024 14250000"
        );
    }

    #[test]
    fn cmd_pan_remove_basic() {
        assert_eq!(cmd_pan_remove("0x40000000"), "display pan remove 0x40000000");
    }

    #[test]
    fn cmd_audio_builders() {
        assert_eq!(cmd_audio_create_rx(48_000), "audio client create rx 48000");
        assert_eq!(cmd_audio_create_tx(48_000), "audio client create tx 48000");
        assert_eq!(cmd_audio_remove_all(), "audio client remove all");
    }

    // -- Reply parsing ------------------------------------------------------

    #[test]
    fn parse_reply_success_with_body() {
        let msg = parse_line("R7|0|0").unwrap();
        assert_eq!(
            msg,
            RadioMessage::Reply(CommandReply {
                sequence: 7,
                error_code: "0".into(),
                message: "0".into(),
            })
        );
    }

    #[test]
    fn parse_reply_success_empty_body() {
        let msg = parse_line("R2|0|").unwrap();
        match msg {
            RadioMessage::Reply(r) => {
                assert_eq!(r.sequence, 2);
                assert!(r.is_success());
                assert!(r.message.is_empty());
            }
            other => panic!("expected Reply, got {other:?}"),
        }
    }

    #[test]
    fn parse_reply_no_body_field() {
        // Only seq and errno, no third pipe-delimited field.
        let msg = parse_line("R5|0").unwrap();
        match msg {
            RadioMessage::Reply(r) => {
                assert_eq!(r.sequence, 5);
                assert!(r.message.is_empty());
            }
            other => panic!("expected Reply, got {other:?}"),
        }
    }

    #[test]
    fn parse_reply_error_code_verbatim() {
        let msg = parse_line("R3|50000015|invalid slice").unwrap();
        match msg {
            RadioMessage::Reply(r) => {
                assert!(!r.is_success());
                assert_eq!(r.error_code, "50000015");
                assert_eq!(r.message, "invalid slice");
            }
            other => panic!("expected Reply, got {other:?}"),
        }
    }

    #[test]
    fn parse_reply_body_may_contain_pipes() {
        let msg = parse_line("R4|0|a|b|c").unwrap();
        match msg {
            RadioMessage::Reply(r) => assert_eq!(r.message, "a|b|c"),
            other => panic!("expected Reply, got {other:?}"),
        }
    }

    #[test]
    fn parse_reply_malformed_no_pipe() {
        assert!(parse_line("R1").is_err());
    }

    #[test]
    fn parse_reply_invalid_sequence() {
        assert!(parse_line("Rabc|0|").is_err());
    }

    // -- Status parsing -----------------------------------------------------

    #[test]
    fn parse_status_slice_full() {
        let msg = parse_line("Sslice|0|frequency=7150000|mode=usb").unwrap();
        match msg {
            RadioMessage::Status(s) => {
                assert_eq!(s.object, "slice");
                assert_eq!(s.args, vec!["0", "frequency=7150000", "mode=usb"]);
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[test]
    fn parse_status_other_object() {
        let msg = parse_line("Sradio|model=6400").unwrap();
        match msg {
            RadioMessage::Status(s) => {
                assert_eq!(s.object, "radio");
                assert_eq!(s.args, vec!["model=6400"]);
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[test]
    fn parse_status_no_fields() {
        let msg = parse_line("Sinterlock").unwrap();
        match msg {
            RadioMessage::Status(s) => {
                assert_eq!(s.object, "interlock");
                assert!(s.args.is_empty());
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[test]
    fn parse_status_empty_type_is_malformed() {
        assert!(parse_line("S").is_err());
        assert!(parse_line("S|0|frequency=1").is_err());
    }

    // -- Heartbeat and edge cases -------------------------------------------

    #[test]
    fn parse_heartbeat() {
        assert_eq!(parse_line("H1").unwrap(), RadioMessage::Heartbeat);
        assert_eq!(parse_line("H").unwrap(), RadioMessage::Heartbeat);
    }

    #[test]
    fn parse_unknown_shape_is_malformed() {
        assert!(parse_line("X something unexpected").is_err());
        assert!(parse_line("42").is_err());
    }

    #[test]
    fn parse_empty_line_is_malformed() {
        assert!(parse_line("").is_err());
        assert!(parse_line("   ").is_err());
    }

    #[test]
    fn parse_line_with_surrounding_whitespace() {
        let msg = parse_line("  R1|0|ok  ").unwrap();
        match msg {
            RadioMessage::Reply(r) => assert_eq!(r.message, "ok"),
            other => panic!("expected Reply, got {other:?}"),
        }
    }
}
