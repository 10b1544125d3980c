//! Mirrored slice state.
//!
//! The radio pushes state changes continuously once the session has
//! subscribed to its slice, so getters can return mirrored values with
//! zero latency. The mirror is updated from two directions: optimistic
//! writes when the radio confirms a `slice set` command, and unsolicited
//! status records. Either way the latest accepted value wins; fields a
//! status record does not name keep their prior value.

use flexctl_core::Mode;

/// Mirrored operating parameters of the controlled slice.
///
/// This is a plain value type; observers receive copies of it on every
/// accepted status update, so no subscriber can mutate the session's
/// authoritative mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceState {
    /// Receive/transmit frequency in Hz.
    pub frequency: u64,
    /// Operating mode.
    pub mode: Mode,
    /// RF power level, 0-100. The radio calls this `rfpower`.
    pub rf_gain: u8,
    /// AF gain level, 0-100.
    pub af_gain: u8,
    /// Whether the transmitter is keyed.
    pub ptt: bool,
}

impl Default for SliceState {
    fn default() -> Self {
        Self {
            frequency: 7_150_000,
            mode: Mode::Usb,
            rf_gain: 50,
            af_gain: 50,
            ptt: false,
        }
    }
}

impl SliceState {
    /// Apply `key=value` fields from a slice status record.
    ///
    /// Recognized keys: `frequency`, `mode`, `rfpower` (RF gain),
    /// `af_gain`. Unknown keys are ignored so newer firmware cannot break
    /// the client; a field whose value fails to parse is ignored without
    /// affecting the remaining fields.
    pub fn apply_fields<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>) {
        for field in fields {
            let Some((key, value)) = field.split_once('=') else {
                continue;
            };
            match key {
                "frequency" => {
                    if let Ok(hz) = value.parse::<u64>() {
                        self.frequency = hz;
                    }
                }
                "mode" => {
                    if let Ok(mode) = value.parse::<Mode>() {
                        self.mode = mode;
                    }
                }
                "rfpower" => {
                    if let Ok(level) = value.parse::<u8>() {
                        self.rf_gain = level;
                    }
                }
                "af_gain" => {
                    if let Ok(level) = value.parse::<u8>() {
                        self.af_gain = level;
                    }
                }
                _ => {}
            }
        }
    }
}
