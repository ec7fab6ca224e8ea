//! Append-only fix log partitioned by delivery.
//!
//! Each partition is ordered by capture timestamp; fixes sharing a timestamp
//! keep their arrival order. The store also caches the most recently accepted
//! fix of every delivery, which is what the session aggregator pairs new fixes
//! against.

use std::sync::Arc;

use fxhash::FxHashMap;
use jiff::Timestamp;
use parking_lot::RwLock;
use tracing::debug;

use crate::{
    error::{TrackingError, TrackingResult},
    ids::DeliveryId,
    location_fix::LocationFix,
};

/// Half-open `[from, to)` interval over capture timestamps. Either end may be
/// left open.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeRange {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

impl TimeRange {
    pub fn new(from: Option<Timestamp>, to: Option<Timestamp>) -> Self {
        TimeRange { from, to }
    }

    pub fn all() -> Self {
        TimeRange::default()
    }

    pub fn contains(&self, timestamp: Timestamp) -> bool {
        self.from.is_none_or(|from| timestamp >= from) && self.to.is_none_or(|to| timestamp < to)
    }
}

/// Snapshot of the fixes matching a history query, in ascending timestamp
/// order. Iterating does not touch the store and can be repeated.
#[derive(Debug, Clone, Default)]
pub struct FixHistory {
    fixes: Arc<[Arc<LocationFix>]>,
}

impl FixHistory {
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<LocationFix>> {
        self.fixes.iter()
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    /// At most `limit` fixes starting at `offset`.
    pub fn page(&self, offset: usize, limit: usize) -> &[Arc<LocationFix>] {
        let start = offset.min(self.fixes.len());
        let end = start.saturating_add(limit).min(self.fixes.len());
        &self.fixes[start..end]
    }
}

impl<'a> IntoIterator for &'a FixHistory {
    type Item = &'a Arc<LocationFix>;
    type IntoIter = std::slice::Iter<'a, Arc<LocationFix>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct FixPage {
    pub fixes: Vec<Arc<LocationFix>>,
    pub total: usize,
}

#[derive(Default)]
struct Partition {
    fixes: Vec<Arc<LocationFix>>,
    latest: Option<Arc<LocationFix>>,
}

impl Partition {
    fn insert(&mut self, fix: Arc<LocationFix>) {
        let timestamp = fix.timestamp();
        let position = if self
            .fixes
            .last()
            .is_none_or(|last| last.timestamp() <= timestamp)
        {
            self.fixes.len()
        } else {
            self.fixes
                .partition_point(|existing| existing.timestamp() <= timestamp)
        };

        self.fixes.insert(position, Arc::clone(&fix));
        self.latest = Some(fix);
    }

    fn range(&self, range: &TimeRange) -> &[Arc<LocationFix>] {
        let start = match range.from {
            Some(from) => self.fixes.partition_point(|fix| fix.timestamp() < from),
            None => 0,
        };
        let end = match range.to {
            Some(to) => self.fixes.partition_point(|fix| fix.timestamp() < to),
            None => self.fixes.len(),
        };

        if start >= end {
            &[]
        } else {
            &self.fixes[start..end]
        }
    }
}

#[derive(Default)]
pub struct LocationStore {
    partitions: RwLock<FxHashMap<DeliveryId, Arc<RwLock<Partition>>>>,
}

impl LocationStore {
    pub fn new() -> Self {
        LocationStore::default()
    }

    fn partition(&self, delivery_id: &DeliveryId) -> Option<Arc<RwLock<Partition>>> {
        self.partitions.read().get(delivery_id).cloned()
    }

    fn partition_or_create(&self, delivery_id: &DeliveryId) -> Arc<RwLock<Partition>> {
        if let Some(partition) = self.partition(delivery_id) {
            return partition;
        }

        Arc::clone(
            self.partitions
                .write()
                .entry(delivery_id.clone())
                .or_default(),
        )
    }

    /// Stores an accepted fix and makes it the latest one of its delivery.
    pub fn append(&self, fix: LocationFix) -> TrackingResult<Arc<LocationFix>> {
        fix.validate()?;

        let fix = Arc::new(fix);
        let partition = self.partition_or_create(fix.delivery_id());
        partition.write().insert(Arc::clone(&fix));

        debug!(
            delivery_id = %fix.delivery_id(),
            timestamp = %fix.timestamp(),
            "Stored location fix"
        );

        Ok(fix)
    }

    pub fn latest(&self, delivery_id: &DeliveryId) -> TrackingResult<Arc<LocationFix>> {
        self.partition(delivery_id)
            .and_then(|partition| partition.read().latest.clone())
            .ok_or_else(|| TrackingError::NotFound(format!("location of delivery {delivery_id}")))
    }

    pub fn history(&self, delivery_id: &DeliveryId, range: TimeRange) -> FixHistory {
        match self.partition(delivery_id) {
            Some(partition) => FixHistory {
                fixes: Arc::from(partition.read().range(&range)),
            },
            None => FixHistory::default(),
        }
    }

    pub fn history_page(
        &self,
        delivery_id: &DeliveryId,
        range: TimeRange,
        offset: usize,
        limit: usize,
    ) -> FixPage {
        let Some(partition) = self.partition(delivery_id) else {
            return FixPage {
                fixes: vec![],
                total: 0,
            };
        };

        let partition = partition.read();
        let matching = partition.range(&range);

        FixPage {
            fixes: matching.iter().skip(offset).take(limit).cloned().collect(),
            total: matching.len(),
        }
    }

    pub fn fix_count(&self, delivery_id: &DeliveryId) -> usize {
        self.partition(delivery_id)
            .map(|partition| partition.read().fixes.len())
            .unwrap_or(0)
    }

    pub fn deliveries(&self) -> Vec<DeliveryId> {
        self.partitions.read().keys().cloned().collect()
    }
}
