//! Memory channels.
//!
//! A bounded bank of named frequency/mode/gain presets. The bank is an
//! ordinary caller of the session: recalling a channel drives the same
//! `set_*` operations any other collaborator would use.

use serde::{Deserialize, Serialize};

use flexctl_client::RadioSession;
use flexctl_core::{Mode, Result};

use crate::config::MemoryConfig;

/// One stored preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryChannel {
    pub name: String,
    /// Frequency in Hz.
    pub frequency: u64,
    pub mode: Mode,
    #[serde(default = "default_gain")]
    pub rf_gain: u8,
    #[serde(default = "default_gain")]
    pub af_gain: u8,
}

fn default_gain() -> u8 {
    50
}

/// A bounded, ordered bank of memory channels.
#[derive(Debug, Clone)]
pub struct MemoryBank {
    max_channels: usize,
    channels: Vec<MemoryChannel>,
}

impl MemoryBank {
    /// Build a bank from configuration, dropping channels beyond the
    /// configured maximum.
    pub fn from_config(config: &MemoryConfig) -> Self {
        let mut channels = config.channels.clone();
        channels.truncate(config.max_channels);
        Self {
            max_channels: config.max_channels,
            channels,
        }
    }

    /// Append a channel. Returns `false` when the bank is full.
    pub fn add(&mut self, channel: MemoryChannel) -> bool {
        if self.channels.len() >= self.max_channels {
            return false;
        }
        self.channels.push(channel);
        true
    }

    /// Replace the channel at `index`. Returns `false` when out of range.
    pub fn update(&mut self, index: usize, channel: MemoryChannel) -> bool {
        match self.channels.get_mut(index) {
            Some(slot) => {
                *slot = channel;
                true
            }
            None => false,
        }
    }

    /// Delete the channel at `index`. Returns `false` when out of range.
    pub fn delete(&mut self, index: usize) -> bool {
        if index < self.channels.len() {
            self.channels.remove(index);
            true
        } else {
            false
        }
    }

    /// The channel at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&MemoryChannel> {
        self.channels.get(index)
    }

    /// All channels, in bank order.
    pub fn channels(&self) -> &[MemoryChannel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Apply the channel at `index` to the session.
    ///
    /// Returns `Ok(false)` when the index names no channel. Requires an
    /// active slice; without one the setters are no-ops.
    pub async fn recall(&self, session: &RadioSession, index: usize) -> Result<bool> {
        let Some(channel) = self.get(index) else {
            return Ok(false);
        };
        tracing::info!(name = %channel.name, frequency = channel.frequency, "recalling memory channel");
        session.set_frequency(channel.frequency).await?;
        session.set_mode(channel.mode).await?;
        session.set_rf_gain(channel.rf_gain).await?;
        session.set_af_gain(channel.af_gain).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexctl_test_harness::MockRadio;

    fn channel(name: &str, hz: u64) -> MemoryChannel {
        MemoryChannel {
            name: name.to_string(),
            frequency: hz,
            mode: Mode::Usb,
            rf_gain: 50,
            af_gain: 50,
        }
    }

    fn empty_bank(max_channels: usize) -> MemoryBank {
        MemoryBank::from_config(&MemoryConfig {
            max_channels,
            channels: Vec::new(),
        })
    }

    #[test]
    fn add_respects_capacity() {
        let mut bank = empty_bank(2);
        assert!(bank.add(channel("a", 7_000_000)));
        assert!(bank.add(channel("b", 7_100_000)));
        assert!(!bank.add(channel("c", 7_200_000)));
        assert_eq!(bank.len(), 2);
    }

    #[test]
    fn update_and_delete_check_bounds() {
        let mut bank = empty_bank(4);
        bank.add(channel("a", 7_000_000));

        assert!(bank.update(0, channel("a2", 7_050_000)));
        assert_eq!(bank.get(0).unwrap().frequency, 7_050_000);
        assert!(!bank.update(1, channel("x", 1)));

        assert!(!bank.delete(5));
        assert!(bank.delete(0));
        assert!(bank.is_empty());
    }

    #[test]
    fn from_config_truncates_to_maximum() {
        let config = MemoryConfig {
            max_channels: 1,
            channels: vec![channel("a", 7_000_000), channel("b", 7_100_000)],
        };
        let bank = MemoryBank::from_config(&config);
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.get(0).unwrap().name, "a");
    }

    #[tokio::test]
    async fn recall_drives_the_session_setters() {
        let mut radio = MockRadio::bind().await.unwrap();
        radio.expect_ok("client udpport 4991", "");
        radio.expect_ok("slice create 0 usb", "0");
        radio.expect_ok("sub slice 0 all", "");
        radio.expect_ok("slice set 0 frequency=14250000", "");
        radio.expect_ok("slice set 0 mode=lsb", "");
        radio.expect_ok("slice set 0 rfpower=60", "");
        radio.expect_ok("slice set 0 af_gain=40", "");
        radio.expect_ok("slice remove 0", "");

        let (host, port) = radio
            .addr()
            .rsplit_once(':')
            .map(|(h, p)| (h.to_string(), p.parse::<u16>().unwrap()))
            .unwrap();
        let handle = radio.start();

        let session = RadioSession::connect(&host, port).await.unwrap();
        session.create_slice(Mode::Usb).await.unwrap();

        let mut bank = empty_bank(4);
        bank.add(MemoryChannel {
            name: "20m DX".to_string(),
            frequency: 14_250_000,
            mode: Mode::Lsb,
            rf_gain: 60,
            af_gain: 40,
        });

        assert!(bank.recall(&session, 0).await.unwrap());
        assert!(!bank.recall(&session, 9).await.unwrap());

        let state = session.state();
        assert_eq!(state.frequency, 14_250_000);
        assert_eq!(state.mode, Mode::Lsb);
        assert_eq!(state.rf_gain, 60);
        assert_eq!(state.af_gain, 40);

        session.disconnect().await;
        handle.finish().await.unwrap();
    }
}
