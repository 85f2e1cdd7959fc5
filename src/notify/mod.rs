//! Registry change notification.
//!
//! Publishes the canonical domain key after every registry mutation so a
//! rendering collaborator can react without the core ever calling into UI
//! code. Notifications carry only the key; subscribers pull current state via
//! `DomainRegistry::snapshot` or a point lookup, which avoids stale-payload
//! bugs. Delivery is at-least-once per subscriber while it keeps up; a lagged
//! subscriber misses intermediate keys and should re-sync from a snapshot.

use tokio::sync::broadcast;

/// Handle for publishing and subscribing to per-domain change events.
#[derive(Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<String>,
}

impl ChangeNotifier {
    /// Creates a notifier whose subscribers buffer up to `capacity` keys.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        ChangeNotifier { tx }
    }

    /// Announces that the observation for `domain` changed.
    ///
    /// Having no subscribers is normal (headless runs) and not an error.
    pub fn publish(&self, domain: &str) {
        let _ = self.tx.send(domain.to_string());
    }

    /// Subscribes to change events from this point onward.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}
