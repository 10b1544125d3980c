//! Radio control protocol client and session state layer.
//!
//! This crate implements the TCP control protocol used by the radio:
//! newline-terminated ASCII records carrying sequence-numbered commands,
//! correlated replies, unsolicited status updates, and heartbeats. It
//! provides:
//!
//! - **Wire codec** ([`codec`]) -- pure parsing and encoding of the
//!   `C`/`R`/`S`/`H` record shapes, plus command builders.
//! - **Protocol client** ([`client`]) -- TCP connection with
//!   sequence-number correlation, per-command timeouts, and a background
//!   read loop that demultiplexes replies and status records.
//! - **Session** ([`session`]) -- the high-level façade: slice and
//!   panadapter lifecycle, parameter setters, PTT, audio registrations,
//!   and state-change notifications for display collaborators.
//! - **State mirror** ([`state`]) -- the session-local copy of the
//!   slice's operating parameters, updated from confirmed commands and
//!   pushed status records.
//! - **Audio hooks** ([`audio`]) -- the narrow interface through which
//!   the session informs the audio subsystem of RX/TX transitions.
//!
//! # Architecture
//!
//! One background task drains the transport and feeds the demultiplexer;
//! all other operations run in caller context and suspend only on their
//! own pending reply. Replies may arrive in any order -- correlation is
//! by sequence number alone.
//!
//! # Example
//!
//! ```no_run
//! use flexctl_client::{Mode, RadioSession};
//!
//! # async fn example() -> flexctl_core::Result<()> {
//! let session = RadioSession::connect("192.168.1.100", 4992).await?;
//! session.create_slice(Mode::Usb).await?;
//! session.set_frequency(14_250_000).await?;
//!
//! session.subscribe(|state| {
//!     println!("{} Hz {}", state.frequency, state.mode);
//! });
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod client;
pub mod codec;
pub mod session;
pub mod state;

pub use audio::AudioHooks;
pub use client::{ClientOptions, RadioClient};
pub use flexctl_core::{Error, Mode, Result};
pub use session::{
    DEFAULT_AUDIO_RATE, DEFAULT_PAN_WIDTH, DEFAULT_TCP_PORT, DEFAULT_UDP_PORT, RadioSession,
    SessionOptions, SessionPhase, SubscriptionToken,
};
pub use state::SliceState;
