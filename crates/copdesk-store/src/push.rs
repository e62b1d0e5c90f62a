//! Push-driven status updates.
//!
//! The backend delivers `StatusUpdate` batches over some transport (IPC,
//! WebSocket, SSE); the store only consumes them. [`StatusSource`] abstracts
//! the transport as a stream of batches, and [`spawn_status_forwarder`]
//! pumps it into the store as [`TasksEvent::StatusBatch`] events.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use copdesk_core::model::StatusUpdate;

use crate::event::{Event, TasksEvent};

/// A transport-independent source of status batches.
#[async_trait]
pub trait StatusSource: Send {
    /// Next batch, or `None` once the source has closed.
    async fn next_batch(&mut self) -> Option<Vec<StatusUpdate>>;
}

#[async_trait]
impl StatusSource for mpsc::UnboundedReceiver<Vec<StatusUpdate>> {
    async fn next_batch(&mut self) -> Option<Vec<StatusUpdate>> {
        self.recv().await
    }
}

/// Forwards status batches into the store until the source or the store
/// closes.
pub fn spawn_status_forwarder<S>(mut source: S, tx: mpsc::UnboundedSender<Event>) -> JoinHandle<()>
where
    S: StatusSource + 'static,
{
    tokio::spawn(async move {
        while let Some(batch) = source.next_batch().await {
            if tx.send(Event::Tasks(TasksEvent::StatusBatch(batch))).is_err() {
                break;
            }
        }
        debug!("status feed closed");
    })
}
