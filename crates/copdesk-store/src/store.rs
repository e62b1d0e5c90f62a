use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::event::Event;
use crate::reducer::reduce;
use crate::state::AppState;

/// Synchronous store: state plus the reducer.
///
/// Useful directly in tests; applications normally run it behind the event
/// loop started by [`spawn`].
#[derive(Debug, Default)]
pub struct Store {
    state: AppState,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event. Synchronous and atomic with respect to readers of
    /// the same `Store`.
    pub fn apply(&mut self, event: Event) {
        reduce(&mut self.state, event);
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Handle to a running store loop: an event sender plus snapshot access.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    tx: mpsc::UnboundedSender<Event>,
    state_rx: watch::Receiver<Arc<AppState>>,
}

impl StoreHandle {
    /// Sends one event to the reducer loop.
    ///
    /// Dropped silently (with a warning) if the loop has shut down; senders
    /// outliving the store are expected during teardown.
    pub fn dispatch(&self, event: Event) {
        if self.tx.send(event).is_err() {
            warn!("store loop closed; event dropped");
        }
    }

    /// A sender for wiring producers (dispatcher, status forwarder).
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// The most recently published state snapshot.
    pub fn snapshot(&self) -> Arc<AppState> {
        self.state_rx.borrow().clone()
    }

    /// Waits until a newer snapshot than the last seen one is published.
    /// Returns `false` once the loop has shut down.
    pub async fn changed(&mut self) -> bool {
        self.state_rx.changed().await.is_ok()
    }
}

/// Starts the single-consumer reducer loop.
///
/// Every mutation of the shared state goes through the returned handle's
/// events; readers only ever observe complete transitions via snapshots.
pub fn spawn() -> (StoreHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let (state_tx, state_rx) = watch::channel(Arc::new(AppState::default()));

    let join = tokio::spawn(async move {
        let mut current = Arc::new(AppState::default());
        while let Some(event) = rx.recv().await {
            reduce(Arc::make_mut(&mut current), event);
            if state_tx.send(current.clone()).is_err() {
                debug!("no snapshot receivers");
            }
        }
        debug!("store loop finished");
    });

    (StoreHandle { tx, state_rx }, join)
}
