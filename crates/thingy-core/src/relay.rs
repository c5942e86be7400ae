//! Re-publishes session events to an outer consumer.
//!
//! An [`EventRelay`] registers a handler for every event kind and forwards
//! events unchanged into a channel. Accelerometer events are rate limited to
//! one per window; occurrences inside the window are dropped, not queued.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::trace;

use crate::events::{EventKind, Subscription, ThingyEvent};
use crate::session::Session;
use crate::transport::Central;

/// Default accelerometer window.
pub const DEFAULT_THROTTLE_WINDOW: Duration = Duration::from_millis(500);

/// Admits at most one occurrence per window.
#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    last: Option<Instant>,
}

impl Throttle {
    /// Create a throttle. A zero window admits everything.
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether an occurrence at `now` may pass. The first one always does.
    pub fn admit(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.window => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE_WINDOW)
    }
}

/// Receiving side of a relay.
pub type RelayReceiver = mpsc::UnboundedReceiver<ThingyEvent>;

/// Attaches relays to a session.
#[derive(Debug)]
pub struct EventRelay;

impl EventRelay {
    /// Forward every event of `session` into a new channel, throttling
    /// accelerometer events to one per `window`.
    pub fn attach<C: Central>(
        session: &mut Session<C>,
        window: Duration,
    ) -> (RelayHandle, RelayReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscriptions = Vec::with_capacity(EventKind::ALL.len());

        for kind in EventKind::ALL {
            let tx = tx.clone();
            let subscription = if kind == EventKind::Accelerometer {
                let mut throttle = Throttle::new(window);
                session.on(kind, move |event| {
                    if throttle.admit(Instant::now()) {
                        let _ = tx.send(event.clone());
                    } else {
                        trace!("Throttled accelerometer event");
                    }
                })
            } else {
                session.on(kind, move |event| {
                    let _ = tx.send(event.clone());
                })
            };
            subscriptions.push(subscription);
        }

        (RelayHandle { subscriptions }, rx)
    }
}

/// Registration of a relay; detach it to stop forwarding.
#[derive(Debug)]
pub struct RelayHandle {
    subscriptions: Vec<Subscription>,
}

impl RelayHandle {
    /// Unregister every handler the relay added.
    pub fn detach<C: Central>(self, session: &mut Session<C>) {
        for subscription in self.subscriptions {
            session.off(subscription);
        }
    }
}
