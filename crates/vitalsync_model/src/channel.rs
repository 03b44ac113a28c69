//! Replay-one status broadcasting.

use tokio::sync::watch;

/// Receiver half of a [`StatusChannel`].
pub type StatusReceiver<T> = watch::Receiver<T>;

/// A single-writer broadcast channel that replays the latest value to
/// late subscribers.
///
/// The orchestrator publishes `SyncStatus` through one of these; the
/// workflow registry keeps one per live workflow. Subscribers observe the
/// current value immediately and are woken on every publish. When the
/// channel is dropped, receivers see the stream close.
#[derive(Debug)]
pub struct StatusChannel<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone + Send + Sync + 'static> StatusChannel<T> {
    /// Creates a channel seeded with an initial value.
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Publishes a new value, waking all subscribers.
    ///
    /// Succeeds even when no subscriber is currently attached; the value
    /// is retained for replay.
    pub fn publish(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Mutates the current value in place and publishes the result.
    pub fn update(&self, mutate: impl FnOnce(&mut T)) {
        self.tx.send_modify(mutate);
    }

    /// Returns a clone of the latest published value.
    pub fn latest(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Attaches a new subscriber; it observes the latest value at once.
    pub fn subscribe(&self) -> StatusReceiver<T> {
        self.tx.subscribe()
    }

    /// Number of currently attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
