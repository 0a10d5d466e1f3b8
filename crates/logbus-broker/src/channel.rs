use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::error::DeliveryError;

/// Delivery callback registered per connected client.
///
/// Callbacks must be cheap and non-blocking (the gateway's push into a
/// bounded queue, in practice); publish runs them inline on the listener
/// task. A callback signals failure by returning `Err`; it must not panic.
pub type DeliverFn = Box<dyn Fn(&str) -> std::result::Result<(), DeliveryError> + Send + Sync>;

/// Opaque handle identifying one subscription for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fan-out point between the single notification listener and all connected
/// client sessions.
///
/// Membership is guarded by a `RwLock`: publish iterates under the read
/// lock, subscribe/unsubscribe take the write lock. Because `unsubscribe`
/// cannot acquire the write lock while a publish holds the read lock, a
/// callback is never invoked again once `unsubscribe` has returned.
pub struct Broadcast {
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<SubscriberId, DeliverFn>>,
}

impl Broadcast {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a delivery callback, returning its handle.
    pub fn subscribe(&self, deliver: DeliverFn) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap()
            .insert(id, deliver);
        debug!(subscriber = %id, "subscriber registered");
        id
    }

    /// Remove a subscription. Returns false if the handle was not registered.
    ///
    /// Blocks until any in-flight publish has finished with the callback.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self
            .subscribers
            .write()
            .unwrap()
            .remove(&id)
            .is_some();
        if removed {
            debug!(subscriber = %id, "subscriber removed");
        }
        removed
    }

    /// Deliver `payload` to every currently registered subscriber.
    ///
    /// A failing callback is logged and skipped; it never aborts delivery to
    /// the rest or unwinds into the publishing task. Successive publishes
    /// reach each subscriber in publish order (the callbacks run inline, one
    /// payload at a time).
    pub fn publish(&self, payload: &str) {
        let subscribers = self.subscribers.read().unwrap();
        for (id, deliver) in subscribers.iter() {
            if let Err(e) = deliver(payload) {
                warn!(subscriber = %id, error = %e, "delivery callback failed; notification dropped for this subscriber");
            }
        }
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap()
            .len()
    }
}

impl Default for Broadcast {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_callback(log: Arc<Mutex<Vec<String>>>) -> DeliverFn {
        Box::new(move |payload| {
            log.lock().unwrap().push(payload.to_string());
            Ok(())
        })
    }

    #[test]
    fn publish_reaches_all_subscribers() {
        let bus = Broadcast::new();
        let a = Arc::new(Mutex::new(Vec::new()));
        let b = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(recording_callback(a.clone()));
        bus.subscribe(recording_callback(b.clone()));

        bus.publish("7");

        assert_eq!(*a.lock().unwrap(), vec!["7"]);
        assert_eq!(*b.lock().unwrap(), vec!["7"]);
    }

    #[test]
    fn unsubscribed_callback_is_never_invoked_again() {
        let bus = Broadcast::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let id = bus.subscribe(recording_callback(seen.clone()));

        bus.publish("1");
        assert!(bus.unsubscribe(id));
        bus.publish("2");

        assert_eq!(*seen.lock().unwrap(), vec!["1"]);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_unknown_handle_is_false() {
        let bus = Broadcast::new();
        let id = bus.subscribe(Box::new(|_| Ok(())));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn failing_callback_does_not_block_others() {
        let bus = Broadcast::new();
        let ok = Arc::new(Mutex::new(Vec::new()));
        // Register the failing subscriber first so iteration order cannot
        // save us by accident on either side.
        bus.subscribe(Box::new(|_| Err(DeliveryError::QueueFull)));
        bus.subscribe(recording_callback(ok.clone()));
        bus.subscribe(Box::new(|_| Err(DeliveryError::Disconnected)));

        bus.publish("42");

        assert_eq!(*ok.lock().unwrap(), vec!["42"]);
    }

    #[test]
    fn successive_publishes_arrive_in_order() {
        let bus = Broadcast::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(recording_callback(seen.clone()));

        for n in 0..10 {
            bus.publish(&n.to_string());
        }

        let got = seen.lock().unwrap();
        let want: Vec<String> = (0..10).map(|n| n.to_string()).collect();
        assert_eq!(*got, want);
    }

    #[test]
    fn concurrent_subscribe_and_publish_do_not_lose_registrations() {
        let bus = Arc::new(Broadcast::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let bus = Arc::clone(&bus);
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    let id = bus.subscribe(Box::new(|_| Ok(())));
                    bus.publish("x");
                    bus.unsubscribe(id);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(bus.subscriber_count(), 0);
    }
}
