use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::{self, CacheBackend};

/// Domain events emitted after a transaction commits. Side effects
/// (notification counters) ride on these; nothing inside a transaction ever
/// depends on an event being delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    StoreCreated {
        store_id: Uuid,
    },
    DistributionCreated {
        batch_id: Uuid,
        store_id: Uuid,
        items: usize,
    },
    DistributionAccepted {
        batch_id: Uuid,
        store_id: Uuid,
        affected: u64,
    },
    DistributionRejected {
        batch_id: Uuid,
        store_id: Uuid,
        affected: u64,
    },
    DistributionItemAccepted {
        distribution_id: Uuid,
        store_id: Uuid,
    },
    DistributionItemRejected {
        distribution_id: Uuid,
        store_id: Uuid,
    },
    ReturnRequested {
        return_id: Uuid,
        store_id: Uuid,
    },
    ReturnApproved {
        return_id: Uuid,
        store_id: Uuid,
    },
    ReturnRejected {
        return_id: Uuid,
        store_id: Uuid,
    },
    PaymentRecorded {
        receivable_id: Uuid,
        store_id: Uuid,
        amount: i64,
    },
}

impl Event {
    /// Store whose dashboard should be notified of this event, if any.
    pub fn store_id(&self) -> Option<Uuid> {
        match *self {
            Event::StoreCreated { .. } => None,
            Event::DistributionCreated { store_id, .. }
            | Event::DistributionAccepted { store_id, .. }
            | Event::DistributionRejected { store_id, .. }
            | Event::DistributionItemAccepted { store_id, .. }
            | Event::DistributionItemRejected { store_id, .. }
            | Event::ReturnRequested { store_id, .. }
            | Event::ReturnApproved { store_id, .. }
            | Event::ReturnRejected { store_id, .. }
            | Event::PaymentRecorded { store_id, .. } => Some(store_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event. Delivery is best-effort: a full or closed channel is
    /// logged and otherwise ignored so the triggering request still succeeds.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!(error = %e, "failed to deliver domain event");
        }
    }
}

pub fn unread_count_key(store_id: Uuid) -> String {
    format!("notifications:unread:{}", store_id)
}

/// Consumes events and bumps the per-store unread-notification counter in the
/// cache. Spawned once at startup.
pub async fn process_events(
    mut receiver: mpsc::Receiver<Event>,
    cache: Arc<dyn CacheBackend>,
    counter_ttl: Duration,
) {
    while let Some(event) = receiver.recv().await {
        debug!(?event, "processing domain event");
        if let Some(store_id) = event.store_id() {
            if let Err(e) = cache.incr(&unread_count_key(store_id), counter_ttl).await {
                warn!(%store_id, error = %e, "failed to bump notification counter");
            }
        }
    }
    debug!("event channel closed; notification worker exiting");
}

/// Reads the unread counter for a store; cache failures read as zero.
pub async fn unread_count(cache: &dyn CacheBackend, store_id: Uuid) -> i64 {
    cache::get_or_default(cache, &unread_count_key(store_id))
        .await
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;

    #[tokio::test]
    async fn worker_bumps_unread_counter_per_store() {
        let cache: Arc<dyn CacheBackend> = Arc::new(InMemoryCache::new());
        let (tx, rx) = mpsc::channel(16);
        let sender = EventSender::new(tx);

        let store = Uuid::new_v4();
        let other = Uuid::new_v4();

        let worker = tokio::spawn(process_events(
            rx,
            cache.clone(),
            Duration::from_secs(60),
        ));

        sender
            .send(Event::DistributionCreated {
                batch_id: Uuid::new_v4(),
                store_id: store,
                items: 2,
            })
            .await;
        sender
            .send(Event::ReturnApproved {
                return_id: Uuid::new_v4(),
                store_id: store,
            })
            .await;
        drop(sender);

        worker.await.unwrap();

        assert_eq!(unread_count(cache.as_ref(), store).await, 2);
        assert_eq!(unread_count(cache.as_ref(), other).await, 0);
    }
}
