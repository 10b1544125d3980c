//! Radio session orchestration.
//!
//! [`RadioSession`] composes the protocol client with session-local
//! state: it owns the slice and panadapter identifiers the radio assigns,
//! mirrors the slice's operating parameters, routes unsolicited status
//! records to that mirror, and publishes state-change notifications to
//! registered observers.
//!
//! One session controls at most one slice and one panadapter. Status
//! records for slices owned by other clients are discarded, so several
//! sessions can share a radio without cross-talk.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use flexctl_core::{Error, Mode, Result};

use crate::audio::AudioHooks;
use crate::client::{ClientOptions, RadioClient};
use crate::codec::{self, StatusMessage};
use crate::state::SliceState;

/// Default TCP command port.
pub const DEFAULT_TCP_PORT: u16 = 4992;

/// Default UDP port announced to the radio in the connect handshake.
pub const DEFAULT_UDP_PORT: u16 = 4991;

/// Default panadapter width in bins.
pub const DEFAULT_PAN_WIDTH: u32 = 1024;

/// Default audio stream sample rate in Hz.
pub const DEFAULT_AUDIO_RATE: u32 = 48_000;

/// Options for establishing a session.
#[derive(Clone)]
pub struct SessionOptions {
    /// Connection options for the underlying protocol client.
    pub client: ClientOptions,
    /// UDP port announced in the connect handshake.
    pub udp_port: u16,
    /// Audio collaborator, informed of RX/TX stream transitions. The
    /// session works fine without one.
    pub audio_hooks: Option<Arc<dyn AudioHooks>>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            client: ClientOptions::default(),
            udp_port: DEFAULT_UDP_PORT,
            audio_hooks: None,
        }
    }
}

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No transport.
    Disconnected,
    /// Transport and handshake in flight. Only ever observable from
    /// inside [`RadioSession::connect`]; by the time a session value
    /// exists the handshake has completed.
    Connecting,
    /// Connected, no slice.
    Connected,
    /// Connected with a slice present.
    Active,
    /// Graceful teardown in progress.
    Disconnecting,
}

/// Opaque handle identifying a state observer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

/// Observer invoked with a state copy after each accepted update.
type StateObserver = Arc<dyn Fn(SliceState) + Send + Sync>;

/// State shared between the session and the status router closure that
/// runs on the client's read loop.
#[derive(Default)]
struct Shared {
    /// The radio-assigned slice identifier, if a slice exists.
    slice_id: Mutex<Option<String>>,
    /// Authoritative mirror of the slice's operating parameters.
    state: Mutex<SliceState>,
    /// Registered observers, in registration order.
    observers: Mutex<Vec<(u64, StateObserver)>>,
}

/// High-level session over one radio control connection.
pub struct RadioSession {
    client: RadioClient,
    shared: Arc<Shared>,
    pan_id: Mutex<Option<String>>,
    disconnecting: AtomicBool,
    next_token: AtomicU64,
    audio_hooks: Option<Arc<dyn AudioHooks>>,
}

impl std::fmt::Debug for RadioSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioSession")
            .field("client", &self.client)
            .field("disconnecting", &self.disconnecting.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl RadioSession {
    /// Connect to the radio and perform the UDP-port handshake.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        Self::connect_with_options(host, port, SessionOptions::default()).await
    }

    /// Connect with custom options.
    ///
    /// A failure at any step (TCP connect, handshake command) leaves
    /// nothing behind: the transport is closed and the error is returned.
    /// Retrying is the caller's decision.
    pub async fn connect_with_options(
        host: &str,
        port: u16,
        options: SessionOptions,
    ) -> Result<Self> {
        let SessionOptions {
            client: client_options,
            udp_port,
            audio_hooks,
        } = options;

        let client = RadioClient::connect_with_options(host, port, client_options).await?;

        let shared = Arc::new(Shared::default());
        let router_shared = Arc::clone(&shared);
        client
            .set_status_handler(move |status| route_status(&router_shared, status))
            .await;

        if let Err(e) = client.send_command(&codec::cmd_udp_port(udp_port)).await {
            tracing::error!(host = %host, port, error = %e, "session handshake failed");
            client.disconnect().await;
            return Err(e);
        }
        tracing::debug!(udp_port, "udp port registered");

        if let Some(hooks) = &audio_hooks {
            if let Err(e) = hooks.start_rx().await {
                tracing::warn!(error = %e, "rx audio hook failed to start");
            }
        }

        Ok(RadioSession {
            client,
            shared,
            pan_id: Mutex::new(None),
            disconnecting: AtomicBool::new(false),
            next_token: AtomicU64::new(1),
            audio_hooks,
        })
    }

    /// Current lifecycle phase, derived from live state.
    pub fn phase(&self) -> SessionPhase {
        if !self.client.is_connected() {
            return SessionPhase::Disconnected;
        }
        if self.disconnecting.load(Ordering::SeqCst) {
            return SessionPhase::Disconnecting;
        }
        if self.shared.slice_id.lock().is_some() {
            SessionPhase::Active
        } else {
            SessionPhase::Connected
        }
    }

    /// Whether the underlying transport is connected.
    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// The radio-assigned slice identifier, if a slice exists.
    pub fn slice_id(&self) -> Option<String> {
        self.shared.slice_id.lock().clone()
    }

    /// The radio-assigned panadapter identifier, if one is enabled.
    pub fn pan_id(&self) -> Option<String> {
        self.pan_id.lock().clone()
    }

    /// A copy of the mirrored slice state.
    pub fn state(&self) -> SliceState {
        *self.shared.state.lock()
    }

    // -- Observers ----------------------------------------------------------

    /// Register a state observer.
    ///
    /// Observers run synchronously, in registration order, with a copy
    /// of the updated state each time an accepted status record is
    /// applied. They are invoked from the session's read loop, so they
    /// must return quickly and must not block.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionToken
    where
        F: Fn(SliceState) + Send + Sync + 'static,
    {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.shared.observers.lock().push((token, Arc::new(handler)));
        SubscriptionToken(token)
    }

    /// Remove a previously registered observer.
    ///
    /// Returns whether the token was still registered.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut observers = self.shared.observers.lock();
        let before = observers.len();
        observers.retain(|(id, _)| *id != token.0);
        observers.len() != before
    }

    // -- Slice lifecycle ----------------------------------------------------

    /// Create the session's slice and subscribe to its events.
    ///
    /// The radio assigns the slice identifier; it is the last
    /// whitespace-separated token of the reply body. On success the
    /// session is `Active`. Failure leaves no slice registered.
    pub async fn create_slice(&self, mode: Mode) -> Result<String> {
        let reply = self
            .client
            .send_command(&codec::cmd_slice_create(mode))
            .await?;
        let slice_id = match reply.split_whitespace().last() {
            Some(id) => id.to_string(),
            None => {
                return Err(Error::Malformed(
                    "slice create reply carried no identifier".into(),
                ));
            }
        };

        *self.shared.slice_id.lock() = Some(slice_id.clone());
        tracing::info!(slice_id = %slice_id, "slice created");

        // Subscription is best-effort: the slice is usable without it,
        // just without push updates.
        if let Err(e) = self
            .client
            .send_command(&codec::cmd_sub_slice(&slice_id))
            .await
        {
            tracing::warn!(slice_id = %slice_id, error = %e, "slice event subscription failed");
        }

        Ok(slice_id)
    }

    /// Remove the current slice. Safe to call when no slice exists.
    ///
    /// On success the identifier is cleared and the state mirror returns
    /// to its defaults.
    pub async fn remove_slice(&self) -> Result<()> {
        let Some(slice_id) = self.slice_id() else {
            return Ok(());
        };
        self.client
            .send_command(&codec::cmd_slice_remove(&slice_id))
            .await?;
        {
            let mut id = self.shared.slice_id.lock();
            if id.as_deref() == Some(slice_id.as_str()) {
                *id = None;
            }
        }
        *self.shared.state.lock() = SliceState::default();
        tracing::info!(slice_id = %slice_id, "slice removed");
        Ok(())
    }

    // -- Slice parameters ---------------------------------------------------

    /// Tune the slice. No-op (no network write) when no slice exists.
    pub async fn set_frequency(&self, hz: u64) -> Result<()> {
        let Some(slice_id) = self.slice_id() else {
            return Ok(());
        };
        self.client
            .send_command(&codec::cmd_slice_set_frequency(&slice_id, hz))
            .await?;
        self.shared.state.lock().frequency = hz;
        Ok(())
    }

    /// Change the slice's operating mode. No-op when no slice exists.
    pub async fn set_mode(&self, mode: Mode) -> Result<()> {
        let Some(slice_id) = self.slice_id() else {
            return Ok(());
        };
        self.client
            .send_command(&codec::cmd_slice_set_mode(&slice_id, mode))
            .await?;
        self.shared.state.lock().mode = mode;
        Ok(())
    }

    /// Set the RF power level (0-100). No-op when no slice exists.
    pub async fn set_rf_gain(&self, level: u8) -> Result<()> {
        let Some(slice_id) = self.slice_id() else {
            return Ok(());
        };
        self.client
            .send_command(&codec::cmd_slice_set_rf_gain(&slice_id, level))
            .await?;
        self.shared.state.lock().rf_gain = level;
        Ok(())
    }

    /// Set the AF gain level (0-100). No-op when no slice exists.
    pub async fn set_af_gain(&self, level: u8) -> Result<()> {
        let Some(slice_id) = self.slice_id() else {
            return Ok(());
        };
        self.client
            .send_command(&codec::cmd_slice_set_af_gain(&slice_id, level))
            .await?;
        self.shared.state.lock().af_gain = level;
        Ok(())
    }

    /// Key or unkey the transmitter. No-op when no slice exists.
    ///
    /// TX audio starts only after the radio confirms the key-down, and
    /// stops before the unkey command goes out, so no samples flow while
    /// the transmitter is unkeyed.
    pub async fn set_ptt(&self, on: bool) -> Result<()> {
        let Some(slice_id) = self.slice_id() else {
            return Ok(());
        };

        if on {
            self.client
                .send_command(&codec::cmd_xmit_on(&slice_id))
                .await?;
            self.shared.state.lock().ptt = true;
            if let Some(hooks) = &self.audio_hooks {
                if let Err(e) = hooks.start_tx().await {
                    tracing::warn!(error = %e, "tx audio hook failed to start");
                }
            }
        } else {
            if let Some(hooks) = &self.audio_hooks {
                if let Err(e) = hooks.stop_tx().await {
                    tracing::warn!(error = %e, "tx audio hook failed to stop");
                }
            }
            self.client.send_command(&codec::cmd_xmit_off()).await?;
            self.shared.state.lock().ptt = false;
        }
        Ok(())
    }

    // -- Panadapter ---------------------------------------------------------

    /// Create the panadapter display feed.
    ///
    /// `center_hz` defaults to the mirrored slice frequency. A session
    /// holds at most one panadapter; if one is already enabled its
    /// identifier is returned unchanged without touching the radio.
    pub async fn enable_panadapter(&self, width: u32, center_hz: Option<u64>) -> Result<String> {
        let existing = self.pan_id.lock().clone();
        if let Some(pan_id) = existing {
            return Ok(pan_id);
        }

        let center = center_hz.unwrap_or_else(|| self.shared.state.lock().frequency);
        let reply = self
            .client
            .send_command(&codec::cmd_pan_create(width, center))
            .await?;
        let pan_id = match reply.split_whitespace().last() {
            Some(id) => id.to_string(),
            None => {
                return Err(Error::Malformed(
                    "pan create reply carried no identifier".into(),
                ));
            }
        };

        *self.pan_id.lock() = Some(pan_id.clone());
        tracing::info!(pan_id = %pan_id, width, center, "panadapter enabled");
        Ok(pan_id)
    }

    /// Remove the panadapter feed. Safe to call when none exists.
    pub async fn disable_panadapter(&self) -> Result<()> {
        let Some(pan_id) = self.pan_id.lock().clone() else {
            return Ok(());
        };
        self.client
            .send_command(&codec::cmd_pan_remove(&pan_id))
            .await?;
        *self.pan_id.lock() = None;
        tracing::info!(pan_id = %pan_id, "panadapter disabled");
        Ok(())
    }

    // -- Audio stream registrations -----------------------------------------

    /// Register a receive audio stream on the radio side.
    pub async fn enable_rx_audio(&self, sample_rate: u32) -> Result<()> {
        let reply = self
            .client
            .send_command(&codec::cmd_audio_create_rx(sample_rate))
            .await?;
        tracing::debug!(sample_rate, reply = %reply, "rx audio stream registered");
        Ok(())
    }

    /// Register a transmit audio stream on the radio side.
    pub async fn enable_tx_audio(&self, sample_rate: u32) -> Result<()> {
        let reply = self
            .client
            .send_command(&codec::cmd_audio_create_tx(sample_rate))
            .await?;
        tracing::debug!(sample_rate, reply = %reply, "tx audio stream registered");
        Ok(())
    }

    /// Remove all audio stream registrations on the radio side.
    pub async fn disable_audio(&self) -> Result<()> {
        self.client
            .send_command(&codec::cmd_audio_remove_all())
            .await?;
        tracing::debug!("audio streams removed");
        Ok(())
    }

    // -- Teardown -----------------------------------------------------------

    /// Graceful teardown: remove the slice, then the panadapter, then
    /// stop audio hooks and close the transport.
    ///
    /// Individual step failures are logged and do not abort the rest of
    /// the sequence, so the transport always ends up closed.
    pub async fn disconnect(&self) {
        self.disconnecting.store(true, Ordering::SeqCst);

        if let Err(e) = self.remove_slice().await {
            tracing::warn!(error = %e, "failed to remove slice during teardown");
        }
        if let Err(e) = self.disable_panadapter().await {
            tracing::warn!(error = %e, "failed to disable panadapter during teardown");
        }

        if let Some(hooks) = &self.audio_hooks {
            let ptt_active = self.shared.state.lock().ptt;
            if ptt_active {
                if let Err(e) = hooks.stop_tx().await {
                    tracing::warn!(error = %e, "tx audio hook failed to stop");
                }
            }
            if let Err(e) = hooks.stop_rx().await {
                tracing::warn!(error = %e, "rx audio hook failed to stop");
            }
        }

        self.client.disconnect().await;
        self.disconnecting.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Status routing
// ---------------------------------------------------------------------------

/// Route one status record: apply slice updates for the session's own
/// slice and notify observers; drop everything else.
///
/// Runs synchronously on the client's read loop.
fn route_status(shared: &Shared, status: StatusMessage) {
    if status.object != "slice" {
        tracing::trace!(object = %status.object, "ignoring status for unhandled object");
        return;
    }
    let Some((id, fields)) = status.args.split_first() else {
        return;
    };
    if fields.is_empty() {
        return;
    }

    {
        let slice_id = shared.slice_id.lock();
        if slice_id.as_deref() != Some(id.as_str()) {
            tracing::trace!(slice_id = %id, "status for a slice this session does not own");
            return;
        }
    }

    let snapshot = {
        let mut state = shared.state.lock();
        state.apply_fields(fields.iter().map(String::as_str));
        *state
    };

    // Snapshot the handler list so observers may subscribe or
    // unsubscribe from inside a notification without deadlocking the
    // router.
    let observers: Vec<StateObserver> = shared
        .observers
        .lock()
        .iter()
        .map(|(_, handler)| Arc::clone(handler))
        .collect();
    for observer in &observers {
        observer(snapshot);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
