use std::sync::Arc;

use fxhash::FxHashMap;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::ids::DeliveryId;

type LockTable = Mutex<FxHashMap<DeliveryId, Arc<AsyncMutex<()>>>>;

/// One exclusive execution context per delivery. Entries only live while some
/// task holds or waits for them.
#[derive(Default)]
pub(crate) struct DeliveryLocks {
    table: Arc<LockTable>,
}

impl DeliveryLocks {
    pub(crate) fn new() -> Self {
        DeliveryLocks::default()
    }

    pub(crate) async fn lock(&self, delivery_id: &DeliveryId) -> DeliveryGuard {
        let lock = Arc::clone(
            self.table
                .lock()
                .entry(delivery_id.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        );

        let guard = lock.lock_owned().await;

        DeliveryGuard {
            guard: Some(guard),
            delivery_id: delivery_id.clone(),
            table: Arc::clone(&self.table),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table.lock().len()
    }
}

pub(crate) struct DeliveryGuard {
    guard: Option<OwnedMutexGuard<()>>,
    delivery_id: DeliveryId,
    table: Arc<LockTable>,
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        let mut table = self.table.lock();

        // Release first so a waiter's reference is the only other one left.
        drop(self.guard.take());

        if let Some(lock) = table.get(&self.delivery_id)
            && Arc::strong_count(lock) == 1
        {
            table.remove(&self.delivery_id);
        }
    }
}
