//! Fixed-capacity ring buffer of published snapshots.
//!
//! [`SnapshotRing`] stores `Arc<T>` slots with single-producer push and
//! multi-consumer read. Each slot has its own `Mutex`, held only
//! for an `Arc` clone or swap, so readers never wait on a running substep.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A tagged slot: the `u64` is the monotonic write position when this
/// snapshot was stored, so consumers can detect overwrites.
type Slot<T> = Option<(u64, Arc<T>)>;

/// A fixed-capacity ring buffer of `Arc<T>` snapshots.
///
/// Single-producer: only the engine writer calls [`push`](Self::push).
/// Multi-consumer: any thread can call [`latest`](Self::latest) or
/// [`get_by_pos`](Self::get_by_pos).
///
/// The write position increases monotonically and never wraps; the slot
/// index is `pos % capacity`.
pub struct SnapshotRing<T> {
    slots: Vec<Mutex<Slot<T>>>,
    write_pos: AtomicU64,
    capacity: usize,
}

// Compile-time assertion: SnapshotRing must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<SnapshotRing<cumulus_field::OwnedSnapshot>>();
};

/// Slots hold plain data, so a panic while one was locked cannot leave it
/// half-written.
fn lock<T>(slot: &Mutex<Slot<T>>) -> MutexGuard<'_, Slot<T>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> SnapshotRing<T> {
    /// Create a new ring buffer with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2`. Engine configuration validates this first.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "SnapshotRing capacity must be >= 2, got {capacity}");
        let slots = (0..capacity).map(|_| Mutex::new(None)).collect();
        Self {
            slots,
            write_pos: AtomicU64::new(0),
            capacity,
        }
    }

    /// Push a new snapshot. Single-producer only.
    ///
    /// Returns the evicted snapshot, if any, so the caller can recycle its
    /// allocation once no reader holds it.
    pub fn push(&self, snapshot: Arc<T>) -> Option<Arc<T>> {
        let pos = self.write_pos.load(Ordering::Relaxed);
        let slot_idx = (pos as usize) % self.capacity;

        let evicted = {
            let mut slot = lock(&self.slots[slot_idx]);
            let prev = slot.take().map(|(_tag, arc)| arc);
            *slot = Some((pos, snapshot));
            prev
        };

        // Release-store makes the slot contents visible before consumers
        // observe the new position.
        self.write_pos.store(pos + 1, Ordering::Release);
        evicted
    }

    /// The most recently pushed snapshot, or `None` if nothing was pushed.
    pub fn latest(&self) -> Option<Arc<T>> {
        let pos = self.write_pos.load(Ordering::Acquire);
        if pos == 0 {
            return None;
        }
        self.get_by_pos(pos - 1)
    }

    /// The latest snapshot together with the one pushed just before it.
    ///
    /// Both are read against the same write position, so the pair is
    /// always adjacent even while the producer keeps pushing. The previous
    /// snapshot is `None` after the first push or if it was overwritten.
    pub fn latest_pair(&self) -> Option<(Option<Arc<T>>, Arc<T>)> {
        let pos = self.write_pos.load(Ordering::Acquire);
        let latest = self.get_by_pos(pos.checked_sub(1)?)?;
        let previous = pos.checked_sub(2).and_then(|p| self.get_by_pos(p));
        Some((previous, latest))
    }

    /// A snapshot by its monotonic write position.
    ///
    /// Returns `None` if the position was evicted or not written yet.
    pub fn get_by_pos(&self, pos: u64) -> Option<Arc<T>> {
        let current = self.write_pos.load(Ordering::Acquire);
        if pos >= current || current - pos > self.capacity as u64 {
            return None;
        }
        let slot = lock(&self.slots[(pos as usize) % self.capacity]);
        match slot.as_ref() {
            Some((tag, arc)) if *tag == pos => Some(Arc::clone(arc)),
            // Overwritten between the bounds check and the lock.
            _ => None,
        }
    }

    /// Number of snapshots currently stored (up to `capacity`).
    pub fn len(&self) -> usize {
        let pos = self.write_pos.load(Ordering::Acquire) as usize;
        pos.min(self.capacity)
    }

    /// Whether nothing has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.write_pos.load(Ordering::Acquire) == 0
    }

    /// The ring buffer capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The current monotonic write position.
    pub fn write_pos(&self) -> u64 {
        self.write_pos.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cumulus_core::{SnapshotAccess, TickId, WorldGenerationId};
    use cumulus_field::{FieldGrid, OwnedSnapshot};
    use cumulus_space::{EdgeBehavior, Grid3};

    fn make_snapshot(tick: u64) -> Arc<OwnedSnapshot> {
        let grid = Grid3::new(4, 1, 1, EdgeBehavior::Absorb).unwrap();
        let mut fg = FieldGrid::with_standard_fields(grid).unwrap();
        {
            let guard = fg.begin_substep();
            guard
                .writes
                .field_mut(cumulus_field::MOISTURE)
                .unwrap()
                .fill(tick as f32);
        }
        fg.publish(TickId(tick)).unwrap();
        Arc::new(fg.owned_snapshot(WorldGenerationId(tick)))
    }

    #[test]
    fn new_ring_is_empty() {
        let ring = SnapshotRing::<OwnedSnapshot>::new(4);
        assert!(ring.is_empty());
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.capacity(), 4);
        assert!(ring.latest().is_none());
        assert!(ring.latest_pair().is_none());
    }

    #[test]
    fn latest_pair_is_adjacent() {
        let ring = SnapshotRing::new(4);
        ring.push(make_snapshot(1));
        let (prev, latest) = ring.latest_pair().unwrap();
        assert!(prev.is_none());
        assert_eq!(latest.tick_id(), TickId(1));
        ring.push(make_snapshot(2));
        let (prev, latest) = ring.latest_pair().unwrap();
        assert_eq!(prev.unwrap().tick_id(), TickId(1));
        assert_eq!(latest.tick_id(), TickId(2));
    }

    #[test]
    fn eviction_returns_oldest() {
        let ring = SnapshotRing::new(3);
        for i in 1..=3 {
            assert!(ring.push(make_snapshot(i)).is_none());
        }
        let evicted = ring.push(make_snapshot(4)).unwrap();
        assert_eq!(evicted.tick_id(), TickId(1));
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn evicted_positions_are_gone() {
        let ring = SnapshotRing::new(4);
        for i in 1..=8 {
            ring.push(make_snapshot(i));
        }
        assert!(ring.get_by_pos(3).is_none());
        assert_eq!(ring.get_by_pos(4).unwrap().tick_id(), TickId(5));
        assert_eq!(ring.get_by_pos(7).unwrap().tick_id(), TickId(8));
        assert!(ring.get_by_pos(8).is_none());
    }

    #[test]
    fn evicted_snapshot_is_unique_when_unread() {
        let ring = SnapshotRing::new(2);
        ring.push(make_snapshot(1));
        ring.push(make_snapshot(2));
        let evicted = ring.push(make_snapshot(3)).unwrap();
        assert!(Arc::try_unwrap(evicted).is_ok());

        let held = ring.latest().unwrap();
        ring.push(make_snapshot(4));
        let evicted = ring.push(make_snapshot(5)).unwrap();
        assert!(Arc::ptr_eq(&held, &evicted));
        assert!(Arc::try_unwrap(evicted).is_err());
    }

    #[test]
    #[should_panic(expected = "capacity must be >= 2")]
    fn capacity_below_two_panics() {
        SnapshotRing::<OwnedSnapshot>::new(1);
    }

    #[test]
    fn producer_consumer_cross_thread() {
        use std::sync::atomic::AtomicBool;

        let ring = Arc::new(SnapshotRing::<OwnedSnapshot>::new(4));
        let done = Arc::new(AtomicBool::new(false));
        let reader = {
            let ring = Arc::clone(&ring);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                let mut last = 0;
                while !done.load(Ordering::Acquire) {
                    if let Some(snap) = ring.latest() {
                        let t = snap.tick_id().0;
                        assert!(t >= last, "ticks go backwards: {t} < {last}");
                        let m = snap.read_field(cumulus_field::MOISTURE).unwrap();
                        assert!(m.iter().all(|&v| v == t as f32), "torn snapshot");
                        last = t;
                    }
                }
            })
        };
        for i in 1..=200 {
            ring.push(make_snapshot(i));
        }
        done.store(true, Ordering::Release);
        reader.join().unwrap();
    }
}
