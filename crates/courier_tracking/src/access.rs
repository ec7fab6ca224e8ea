use crate::ids::{DeliveryId, SubscriberId};

/// Answers whether a subscriber may observe a delivery. Backed by the identity
/// service in production; consulted once per subscription.
pub trait SubscriptionAuthorizer: Send + Sync {
    fn may_observe(&self, subscriber: &SubscriberId, delivery: &DeliveryId) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl SubscriptionAuthorizer for AllowAll {
    fn may_observe(&self, _subscriber: &SubscriberId, _delivery: &DeliveryId) -> bool {
        true
    }
}

impl<F> SubscriptionAuthorizer for F
where
    F: Fn(&SubscriberId, &DeliveryId) -> bool + Send + Sync,
{
    fn may_observe(&self, subscriber: &SubscriberId, delivery: &DeliveryId) -> bool {
        self(subscriber, delivery)
    }
}
