//! Per-delivery publish/subscribe.
//!
//! `publish` only enqueues on an ordered outbox, so callers never wait on
//! observers. A single dispatcher task drains the outbox and hands every event
//! to each subscriber's bounded channel with `try_send`: a full buffer drops
//! that event for that subscriber only, a closed receiver is unregistered.
//! Delivery is at most once and never retried.

use std::sync::{
    Arc, Weak,
    atomic::{AtomicU64, Ordering},
};

use fxhash::FxHashMap;
use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::{
    events::TrackingEvent,
    ids::{DeliveryId, SubscriberId},
};

struct Envelope {
    delivery_id: DeliveryId,
    event: Arc<TrackingEvent>,
}

struct Registration {
    token: u64,
    sender: mpsc::Sender<Arc<TrackingEvent>>,
}

#[derive(Default)]
struct SubscriberRegistry {
    channels: RwLock<FxHashMap<DeliveryId, FxHashMap<SubscriberId, Registration>>>,
    next_token: AtomicU64,
}

impl SubscriberRegistry {
    fn register(
        &self,
        delivery_id: &DeliveryId,
        subscriber_id: &SubscriberId,
        sender: mpsc::Sender<Arc<TrackingEvent>>,
    ) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let replaced = self
            .channels
            .write()
            .entry(delivery_id.clone())
            .or_default()
            .insert(subscriber_id.clone(), Registration { token, sender });

        if replaced.is_some() {
            debug!(%delivery_id, %subscriber_id, "Subscription replaced");
        }

        token
    }

    /// Removes a registration. With a token, only that exact registration is
    /// removed, so a stale handle never evicts a newer subscription.
    fn remove(
        &self,
        delivery_id: &DeliveryId,
        subscriber_id: &SubscriberId,
        token: Option<u64>,
    ) -> bool {
        let mut channels = self.channels.write();
        let Some(subscribers) = channels.get_mut(delivery_id) else {
            return false;
        };

        let matches = subscribers
            .get(subscriber_id)
            .is_some_and(|registration| token.is_none_or(|token| registration.token == token));
        if matches {
            subscribers.remove(subscriber_id);
        }

        if subscribers.is_empty() {
            channels.remove(delivery_id);
        }

        matches
    }

    fn fan_out(&self, envelope: Envelope) {
        let mut closed = vec![];

        {
            let channels = self.channels.read();
            let Some(subscribers) = channels.get(&envelope.delivery_id) else {
                return;
            };

            for (subscriber_id, registration) in subscribers {
                match registration.sender.try_send(Arc::clone(&envelope.event)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!(
                            delivery_id = %envelope.delivery_id,
                            %subscriber_id,
                            kind = envelope.event.kind(),
                            "Subscriber buffer full, event dropped"
                        );
                    }
                    Err(TrySendError::Closed(_)) => {
                        closed.push((subscriber_id.clone(), registration.token));
                    }
                }
            }
        }

        for (subscriber_id, token) in closed {
            debug!(delivery_id = %envelope.delivery_id, %subscriber_id, "Pruning closed subscriber");
            self.remove(&envelope.delivery_id, &subscriber_id, Some(token));
        }
    }

    fn count(&self, delivery_id: &DeliveryId) -> usize {
        self.channels
            .read()
            .get(delivery_id)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }
}

async fn dispatch(
    registry: Arc<SubscriberRegistry>,
    mut outbox: mpsc::UnboundedReceiver<Envelope>,
) {
    while let Some(envelope) = outbox.recv().await {
        registry.fan_out(envelope);
    }

    debug!("Broadcaster outbox closed");
}

pub struct Broadcaster {
    registry: Arc<SubscriberRegistry>,
    outbox: mpsc::UnboundedSender<Envelope>,
    buffer: usize,
}

impl Broadcaster {
    /// Spawns the dispatcher, so this must run inside a Tokio runtime. The
    /// dispatcher stops once the broadcaster is dropped.
    pub fn new(buffer: usize) -> Self {
        let registry = Arc::new(SubscriberRegistry::default());
        let (outbox, receiver) = mpsc::unbounded_channel();

        tokio::spawn(dispatch(Arc::clone(&registry), receiver));

        Broadcaster {
            registry,
            outbox,
            buffer: buffer.max(1),
        }
    }

    /// Registers `subscriber_id` on the channel of `delivery_id`. Authorization
    /// is the caller's responsibility.
    pub fn subscribe(&self, delivery_id: &DeliveryId, subscriber_id: &SubscriberId) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let token = self.registry.register(delivery_id, subscriber_id, sender);

        debug!(%delivery_id, %subscriber_id, "Subscriber registered");

        Subscription {
            delivery_id: delivery_id.clone(),
            subscriber_id: subscriber_id.clone(),
            token,
            receiver,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Removes a subscriber. Unknown pairs are ignored; returns whether
    /// anything was removed.
    pub fn unsubscribe(&self, delivery_id: &DeliveryId, subscriber_id: &SubscriberId) -> bool {
        let removed = self.registry.remove(delivery_id, subscriber_id, None);
        if removed {
            debug!(%delivery_id, %subscriber_id, "Subscriber removed");
        }
        removed
    }

    pub fn publish(&self, delivery_id: &DeliveryId, event: TrackingEvent) {
        let envelope = Envelope {
            delivery_id: delivery_id.clone(),
            event: Arc::new(event),
        };

        if self.outbox.send(envelope).is_err() {
            warn!(%delivery_id, "Broadcaster dispatcher is gone, event dropped");
        }
    }

    pub fn subscriber_count(&self, delivery_id: &DeliveryId) -> usize {
        self.registry.count(delivery_id)
    }
}

/// The receiving end of one subscriber's channel. Dropping it unregisters the
/// subscriber right away.
pub struct Subscription {
    delivery_id: DeliveryId,
    subscriber_id: SubscriberId,
    token: u64,
    receiver: mpsc::Receiver<Arc<TrackingEvent>>,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    pub fn delivery_id(&self) -> &DeliveryId {
        &self.delivery_id
    }

    pub fn subscriber_id(&self) -> &SubscriberId {
        &self.subscriber_id
    }

    /// Next event, or `None` once the subscription was removed or replaced
    /// and its buffer is drained.
    pub async fn recv(&mut self) -> Option<Arc<TrackingEvent>> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Arc<TrackingEvent>> {
        self.receiver.try_recv().ok()
    }

    /// Removes this exact registration. Returns `false` when it was already
    /// gone or replaced by a newer subscription of the same subscriber.
    pub fn unsubscribe(self) -> bool {
        self.registry.upgrade().is_some_and(|registry| {
            registry.remove(&self.delivery_id, &self.subscriber_id, Some(self.token))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.delivery_id, &self.subscriber_id, Some(self.token));
        }
    }
}
