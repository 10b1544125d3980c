//! flexctl-test-harness: deterministic test doubles for the radio.
//!
//! [`MockRadio`] is a scripted TCP server speaking the radio's line
//! protocol, enabling protocol-level tests of the client and session
//! layers without real hardware or network infrastructure.

pub mod mock_radio;

pub use mock_radio::{MockRadio, MockRadioHandle};
