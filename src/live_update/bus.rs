//! In-process change event bus.

use parking_lot::Mutex;
use std::sync::mpsc::{Receiver, Sender, channel};

/// Process-local event bus between the cache writer and socket
/// connection threads.
///
/// `publish` is synchronous fan-out with no backpressure: each
/// subscriber gets one unit per change event. A subscriber whose
/// receiving end is gone is pruned during publish; its failure never
/// affects the other subscribers.
#[derive(Debug, Default)]
pub struct ChangeBus {
    subscribers: Mutex<Vec<Sender<()>>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and return its receiving end.
    pub fn subscribe(&self) -> Receiver<()> {
        let (tx, rx) = channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Broadcast one change event to every live subscriber.
    pub fn publish(&self) {
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(()).is_ok());
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
