//! A session shared between tasks.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::debug;

use thingy_types::{LedColor, LedCommand, Tone};

use crate::error::{Error, Result};
use crate::events::{EventKind, EventReceiver, Subscription, ThingyEvent};
use crate::session::{LinkEvents, Session, SessionState};
use crate::transport::{Central, DeviceIdentity};

/// Cloneable handle to a [`Session`] used from several tasks.
///
/// `open`, `scan` and `disconnect` are rejected with
/// [`Error::SessionBusy`] while another of them is in flight. Commands
/// wait for their turn. One task should drive [`SharedSession::pump`] so
/// that notifications are delivered.
pub struct SharedSession<C: Central> {
    inner: Arc<Mutex<Session<C>>>,
    lifecycle: Arc<Mutex<()>>,
    state: watch::Receiver<SessionState>,
    events: Arc<Mutex<Option<LinkEvents>>>,
}

impl<C: Central> Clone for SharedSession<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            lifecycle: Arc::clone(&self.lifecycle),
            state: self.state.clone(),
            events: Arc::clone(&self.events),
        }
    }
}

impl<C: Central> std::fmt::Debug for SharedSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSession").finish_non_exhaustive()
    }
}

impl<C: Central> SharedSession<C> {
    /// Take ownership of `session`.
    pub fn new(mut session: Session<C>) -> Self {
        let events = session.take_link_events();
        let state = session.watch_state();
        Self {
            inner: Arc::new(Mutex::new(session)),
            lifecycle: Arc::new(Mutex::new(())),
            state,
            events: Arc::new(Mutex::new(events)),
        }
    }

    fn try_claim(&self) -> Result<MutexGuard<'_, ()>> {
        self.lifecycle.try_lock().map_err(|_| {
            let state = *self.state.borrow();
            debug!(%state, "Rejecting overlapping lifecycle call");
            Error::SessionBusy { state }
        })
    }

    /// Lock the session for direct access.
    pub async fn lock(&self) -> MutexGuard<'_, Session<C>> {
        self.inner.lock().await
    }

    /// See [`Session::scan`].
    pub async fn scan(&self) -> Result<DeviceIdentity> {
        let _claim = self.try_claim()?;
        self.inner.lock().await.scan().await
    }

    /// See [`Session::open`].
    pub async fn open(&self, device: DeviceIdentity) -> Result<()> {
        let _claim = self.try_claim()?;
        self.inner.lock().await.open(device).await
    }

    /// See [`Session::disconnect`].
    pub async fn disconnect(&self) -> Result<()> {
        let _claim = self.try_claim()?;
        self.inner.lock().await.disconnect().await
    }

    /// Latest state, without waiting for in-flight calls.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// See [`Session::on`].
    pub async fn on<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: FnMut(&ThingyEvent) + Send + Sync + 'static,
    {
        self.inner.lock().await.on(kind, handler)
    }

    /// See [`Session::off`].
    pub async fn off(&self, subscription: Subscription) -> bool {
        self.inner.lock().await.off(subscription)
    }

    /// See [`Session::subscribe`].
    pub async fn subscribe(&self) -> EventReceiver {
        self.inner.lock().await.subscribe()
    }

    /// See [`Session::set_led`].
    pub async fn set_led(&self, r: u8, g: u8, b: u8) -> Result<()> {
        self.inner.lock().await.set_led(r, g, b).await
    }

    /// See [`Session::set_led_breathe`].
    pub async fn set_led_breathe(&self, color: LedColor, intensity: u8, delay_ms: u16) -> Result<()> {
        self.inner
            .lock()
            .await
            .set_led_breathe(color, intensity, delay_ms)
            .await
    }

    /// See [`Session::set_led_flash_once`].
    pub async fn set_led_flash_once(
        &self,
        color: LedColor,
        intensity: u8,
        delay: Option<u8>,
    ) -> Result<()> {
        self.inner
            .lock()
            .await
            .set_led_flash_once(color, intensity, delay)
            .await
    }

    /// See [`Session::set_led_off`].
    pub async fn set_led_off(&self) -> Result<()> {
        self.inner.lock().await.set_led_off().await
    }

    /// See [`Session::write_led`].
    pub async fn write_led(&self, command: LedCommand) -> Result<()> {
        self.inner.lock().await.write_led(command).await
    }

    /// See [`Session::beep`].
    pub async fn beep(&self, frequency_hz: u16, duration_ms: u16, volume: u8) -> Result<()> {
        self.inner
            .lock()
            .await
            .beep(frequency_hz, duration_ms, volume)
            .await
    }

    /// See [`Session::play_tone`].
    pub async fn play_tone(&self, tone: Tone) -> Result<()> {
        self.inner.lock().await.play_tone(tone).await
    }

    /// Wait for the next transport event and dispatch it.
    ///
    /// The session is only locked while the event is handled, so commands
    /// and lifecycle calls can proceed while waiting. The queue stays open
    /// for as long as the session lives, so this waits across disconnects
    /// and reconnects. Returns `false` only when the wrapped session had
    /// already given its queue away.
    pub async fn pump(&self) -> bool {
        let next = {
            let mut events = self.events.lock().await;
            match events.as_mut() {
                Some(rx) => rx.recv().await,
                None => None,
            }
        };
        match next {
            Some((generation, event)) => {
                self.inner.lock().await.deliver(generation, event).await;
                true
            }
            None => false,
        }
    }
}
