//! The per-device delay-slot manager (spec.md §4.7): a small arena of
//! fusion-filter state snapshots, indexed by id, reference-counted by the
//! in-flight exposure records that point at them.
//!
//! Grounded in `rift-tracker.c`'s `find_free_delay_slot` /
//! `get_matching_delay_slot` / `rift_tracked_device_update_exposure` /
//! `rift_tracked_device_exposure_claim` /
//! `rift_tracked_device_exposure_release_locked`.

use crate::config::NUM_DELAY_SLOTS;
use crate::ext::FusionFilter;
use crate::pose::Pose;
use nalgebra::Vector3;

/// Index of a delay slot, `0..K`. Exposure records carry this (or the
/// sentinel `-1` for "no slot") as a plain `i32` — see
/// [`crate::exposure::NO_SLOT`].
pub type SlotId = usize;

#[derive(Debug, Clone, Copy)]
struct Slot {
    valid: bool,
    use_count: u32,
    device_time_ns: u64,
}

impl Slot {
    const fn empty() -> Self {
        Slot { valid: false, use_count: 0, device_time_ns: 0 }
    }
}

/// A fixed ring of [`crate::config::NUM_DELAY_SLOTS`] filter-state
/// snapshots for one device.
#[derive(Debug)]
pub struct DelaySlotRing {
    slots: [Slot; NUM_DELAY_SLOTS],
    round_robin: usize,
}

impl Default for DelaySlotRing {
    fn default() -> Self {
        DelaySlotRing { slots: [Slot::empty(); NUM_DELAY_SLOTS], round_robin: 0 }
    }
}

impl DelaySlotRing {
    /// Creates an empty ring (all slots free).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans round-robin from the slot after the last one returned,
    /// looking for the first with `use_count == 0`. Advances the
    /// round-robin index regardless of outcome, biasing future scans
    /// toward the oldest free slot.
    fn find_free(&mut self) -> Option<SlotId> {
        for step in 0..NUM_DELAY_SLOTS {
            let idx = (self.round_robin + step) % NUM_DELAY_SLOTS;
            if self.slots[idx].use_count == 0 {
                self.round_robin = (idx + 1) % NUM_DELAY_SLOTS;
                return Some(idx);
            }
        }
        None
    }

    /// Allocates a slot for a new exposure at `device_time_ns`, asking the
    /// filter to snapshot its state into it. Returns `None` if no slot is
    /// free — callers record `fusion_slot = -1` and skip fusion for that
    /// exposure record.
    pub fn update_exposure(
        &mut self,
        filter: &mut dyn FusionFilter,
        device_time_ns: u64,
    ) -> Option<SlotId> {
        let slot_id = self.find_free()?;
        filter.prepare_delay_slot(device_time_ns, slot_id);
        self.slots[slot_id] = Slot { valid: true, use_count: 0, device_time_ns };
        Some(slot_id)
    }

    /// Looks up the slot referenced by an exposure record. Returns `Some`
    /// (incrementing `use_count`) only if the slot is still valid and its
    /// device-time matches; otherwise the caller should treat the
    /// exposure's slot as lost (set `fusion_slot = -1`).
    pub fn claim(&mut self, slot_id: SlotId, device_time_ns: u64) -> bool {
        match self.slots.get_mut(slot_id) {
            Some(slot) if slot.valid && slot.device_time_ns == device_time_ns => {
                slot.use_count += 1;
                true
            }
            _ => false,
        }
    }

    /// Releases one reference to `slot_id`. When the count returns to
    /// zero, tells the filter to discard the snapshot and marks the slot
    /// invalid (free for [`Self::find_free`]).
    pub fn release(&mut self, filter: &mut dyn FusionFilter, slot_id: SlotId) {
        let Some(slot) = self.slots.get_mut(slot_id) else { return };
        if slot.use_count == 0 {
            return;
        }
        slot.use_count -= 1;
        if slot.use_count == 0 {
            slot.valid = false;
            filter.release_delay_slot(slot_id);
        }
    }

    /// Current reference count of `slot_id` (test/invariant-checking only).
    #[must_use]
    pub fn use_count(&self, slot_id: SlotId) -> u32 {
        self.slots.get(slot_id).map_or(0, |s| s.use_count)
    }

    /// Whether `slot_id` currently holds a snapshot.
    #[must_use]
    pub fn is_valid(&self, slot_id: SlotId) -> bool {
        self.slots.get(slot_id).is_some_and(|s| s.valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopFilter;
    impl FusionFilter for NoopFilter {
        fn imu_update(&mut self, _: u64, _: Vector3<f64>, _: Vector3<f64>) {}
        fn pose_update(&mut self, _: u64, _: &Pose, _: SlotId) {}
        fn position_update(&mut self, _: u64, _: &Vector3<f64>, _: SlotId) {}
        fn prepare_delay_slot(&mut self, _: u64, _: SlotId) {}
        fn release_delay_slot(&mut self, _: SlotId) {}
        fn get_pose_at(&self, _: u64) -> crate::ext::FilterEstimate {
            crate::ext::FilterEstimate {
                pose: Pose::identity(),
                linear_velocity: Vector3::zeros(),
                linear_acceleration: Vector3::zeros(),
                pos_error: Vector3::zeros(),
                rot_error: Vector3::zeros(),
            }
        }
    }

    #[test]
    fn claim_claim_release_release_returns_to_free() {
        let mut ring = DelaySlotRing::new();
        let mut filter = NoopFilter;
        let slot = ring.update_exposure(&mut filter, 100).expect("slot available");

        assert!(ring.claim(slot, 100));
        assert!(ring.claim(slot, 100));
        assert_eq!(ring.use_count(slot), 2);

        ring.release(&mut filter, slot);
        assert!(ring.is_valid(slot));
        ring.release(&mut filter, slot);
        assert_eq!(ring.use_count(slot), 0);
        assert!(!ring.is_valid(slot));
    }

    #[test]
    fn claim_rejects_stale_device_time() {
        let mut ring = DelaySlotRing::new();
        let mut filter = NoopFilter;
        let slot = ring.update_exposure(&mut filter, 100).unwrap();
        assert!(!ring.claim(slot, 200));
    }

    #[test]
    fn find_free_exhausts_all_slots_before_failing() {
        let mut ring = DelaySlotRing::new();
        let mut filter = NoopFilter;
        let mut slots = vec![];
        for t in 0..NUM_DELAY_SLOTS as u64 {
            slots.push(ring.update_exposure(&mut filter, t).expect("slot available"));
        }
        assert!(ring.update_exposure(&mut filter, 999).is_none());

        ring.claim(slots[0], 0);
        ring.release(&mut filter, slots[0]);
        assert!(ring.update_exposure(&mut filter, 1000).is_some());
    }
}
