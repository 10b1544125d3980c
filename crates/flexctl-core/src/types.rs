//! Shared value types for flexctl.
//!
//! The radio speaks lowercase ASCII mode tokens (`"usb"`, `"lsb"`, ...) in
//! commands and status fields. [`Mode`] maps between those tokens and a
//! typed enum so applications never pass free-form strings around.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Operating mode of a slice receiver.
///
/// The wire token for each variant is the lowercase variant name; see
/// [`Mode::as_token`]. Tokens are matched case-sensitively (the radio
/// always sends lowercase).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Mode {
    /// Upper sideband.
    Usb,
    /// Lower sideband.
    Lsb,
    /// Continuous wave (Morse).
    Cw,
    /// Amplitude modulation.
    Am,
    /// Frequency modulation.
    Fm,
    /// Digital, upper sideband.
    Digu,
    /// Digital, lower sideband.
    Digl,
}

impl Mode {
    /// The wire token for this mode, as used in `slice set ... mode=` and
    /// status fields.
    pub fn as_token(&self) -> &'static str {
        match self {
            Mode::Usb => "usb",
            Mode::Lsb => "lsb",
            Mode::Cw => "cw",
            Mode::Am => "am",
            Mode::Fm => "fm",
            Mode::Digu => "digu",
            Mode::Digl => "digl",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "usb" => Ok(Mode::Usb),
            "lsb" => Ok(Mode::Lsb),
            "cw" => Ok(Mode::Cw),
            "am" => Ok(Mode::Am),
            "fm" => Ok(Mode::Fm),
            "digu" => Ok(Mode::Digu),
            "digl" => Ok(Mode::Digl),
            _ => Err(Error::Malformed(format!("unknown mode: {s}"))),
        }
    }
}
