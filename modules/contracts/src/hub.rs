//! Contract update broadcasting
//!
//! Every subscriber gets its own bounded queue. Publishing never blocks: a
//! subscriber whose queue is full misses that update, other subscribers are
//! unaffected. Updates published before a subscriber registered are never
//! replayed to it.

use lac_core::Contract;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// Registry of contract subscribers
pub struct ContractHub {
    subscribers: Mutex<HashMap<u64, mpsc::Sender<Contract>>>,
    next_id: AtomicU64,
    capacity: usize,
    dropped: AtomicU64,
}

impl ContractHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            capacity: capacity.max(1),
            dropped: AtomicU64::new(0),
        }
    }

    /// Register a new subscriber; it is unregistered when the subscription drops
    pub fn subscribe(self: &Arc<Self>) -> ContractSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers.lock().insert(id, tx);

        debug!("Contract subscriber {} registered", id);

        ContractSubscription {
            id,
            receiver: rx,
            hub: Arc::downgrade(self),
        }
    }

    /// Hand a contract to every subscriber with room in its queue.
    ///
    /// Returns the number of subscribers the update was queued for.
    pub fn publish(&self, contract: &Contract) -> usize {
        let mut subscribers = self.subscribers.lock();
        let mut delivered = 0;
        let mut closed = Vec::new();

        for (id, tx) in subscribers.iter() {
            match tx.try_send(contract.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    debug!("Subscriber {} is full, dropped update for contract {}", id, contract.id);
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        for id in closed {
            subscribers.remove(&id);
        }

        delivered
    }

    fn unregister(&self, id: u64) {
        if self.subscribers.lock().remove(&id).is_some() {
            debug!("Contract subscriber {} unregistered", id);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Total number of updates dropped because a subscriber queue was full
    pub fn dropped_updates(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Live feed of contract updates
pub struct ContractSubscription {
    id: u64,
    receiver: mpsc::Receiver<Contract>,
    hub: Weak<ContractHub>,
}

impl ContractSubscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next update; `None` once the hub is gone
    pub async fn recv(&mut self) -> Option<Contract> {
        self.receiver.recv().await
    }

    /// Next queued update, if any
    pub fn try_recv(&mut self) -> Option<Contract> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for ContractSubscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unregister(self.id);
        }
    }
}
