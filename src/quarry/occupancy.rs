//! Worker roster and capacity for one quarry

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::WorkerId;

/// Admits workers up to the quarry's effective capacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyController {
    /// Admission order, oldest first
    roster: Vec<WorkerId>,
    configured_max: u32,
    /// Hard cap from settings
    max_limit: u32,
    interior_cells: u32,
}

impl OccupancyController {
    pub fn new(configured_max: u32, max_limit: u32, interior_cells: u32) -> Self {
        Self {
            roster: Vec::new(),
            configured_max: configured_max.min(max_limit),
            max_limit,
            interior_cells,
        }
    }

    /// min(configured maximum, workable interior cells)
    pub fn capacity(&self) -> u32 {
        self.configured_max.min(self.interior_cells)
    }

    pub fn configured_max(&self) -> u32 {
        self.configured_max
    }

    pub fn max_limit(&self) -> u32 {
        self.max_limit
    }

    pub fn interior_cells(&self) -> u32 {
        self.interior_cells
    }

    /// Zero capacity means mining is switched off here
    pub fn is_disabled(&self) -> bool {
        self.capacity() == 0
    }

    pub fn occupants(&self) -> &[WorkerId] {
        &self.roster
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.roster.len() as u32 >= self.capacity()
    }

    pub fn contains(&self, worker: WorkerId) -> bool {
        self.roster.contains(&worker)
    }

    /// Add a worker if there is room and it isn't already here
    pub fn try_admit(&mut self, worker: WorkerId) -> bool {
        if self.contains(worker) || self.is_full() {
            return false;
        }
        self.roster.push(worker);
        true
    }

    /// Remove a worker. Releasing someone absent is a no-op.
    pub fn release(&mut self, worker: WorkerId) -> bool {
        match self.roster.iter().position(|w| *w == worker) {
            Some(index) => {
                self.roster.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drop every occupant, returning them in admission order
    pub fn clear(&mut self) -> Vec<WorkerId> {
        std::mem::take(&mut self.roster)
    }

    /// Change the configured maximum (clamped to the hard cap).
    ///
    /// Workers beyond the new capacity are evicted, newest first, and
    /// returned so their tasks can be interrupted.
    pub fn set_max_workers(&mut self, max: u32) -> Vec<WorkerId> {
        self.configured_max = max.min(self.max_limit);
        let capacity = self.capacity() as usize;
        let mut evicted = Vec::new();
        while self.roster.len() > capacity {
            if let Some(worker) = self.roster.pop() {
                evicted.push(worker);
            }
        }
        if !evicted.is_empty() {
            debug!(count = evicted.len(), capacity, "Evicted workers after capacity change");
        }
        evicted
    }

    pub fn increment_max(&mut self) -> Vec<WorkerId> {
        self.set_max_workers(self.configured_max.saturating_add(1))
    }

    pub fn decrement_max(&mut self) -> Vec<WorkerId> {
        self.set_max_workers(self.configured_max.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_min_of_config_and_interior() {
        let occ = OccupancyController::new(32, 32, 25);
        assert_eq!(occ.capacity(), 25);

        let occ = OccupancyController::new(4, 32, 25);
        assert_eq!(occ.capacity(), 4);

        // Configured value never exceeds the hard cap
        let occ = OccupancyController::new(100, 32, 200);
        assert_eq!(occ.capacity(), 32);
    }

    #[test]
    fn test_clear_empties_roster() {
        let mut occ = OccupancyController::new(2, 32, 25);
        let a = WorkerId::new();
        let b = WorkerId::new();
        assert!(occ.try_admit(a));
        assert!(occ.try_admit(b));

        assert_eq!(occ.clear(), vec![a, b]);
        assert!(occ.is_empty());
        // Cleared workers can come back
        assert!(occ.try_admit(a));
    }

    #[test]
    fn test_admit_until_full() {
        let mut occ = OccupancyController::new(2, 32, 25);
        let a = WorkerId::new();
        let b = WorkerId::new();
        let c = WorkerId::new();

        assert!(occ.try_admit(a));
        assert!(!occ.try_admit(a), "Duplicate admission must fail");
        assert!(occ.try_admit(b));
        assert!(!occ.try_admit(c), "Full roster must refuse");
        assert_eq!(occ.len(), 2);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut occ = OccupancyController::new(2, 32, 25);
        let a = WorkerId::new();
        occ.try_admit(a);

        assert!(occ.release(a));
        assert!(!occ.release(a));
        assert!(occ.is_empty());
    }

    #[test]
    fn test_zero_capacity_refuses_everyone() {
        let mut occ = OccupancyController::new(0, 32, 25);
        assert!(occ.is_disabled());
        assert!(!occ.try_admit(WorkerId::new()));
    }

    #[test]
    fn test_lowering_capacity_evicts_newest() {
        let mut occ = OccupancyController::new(3, 32, 25);
        let workers: Vec<_> = (0..3).map(|_| WorkerId::new()).collect();
        for w in &workers {
            assert!(occ.try_admit(*w));
        }

        let evicted = occ.set_max_workers(1);
        assert_eq!(evicted, vec![workers[2], workers[1]]);
        assert_eq!(occ.occupants(), &[workers[0]]);
        assert!(occ.len() as u32 <= occ.capacity());
    }

    #[test]
    fn test_increment_decrement() {
        let mut occ = OccupancyController::new(1, 2, 25);
        occ.increment_max();
        occ.increment_max();
        assert_eq!(occ.configured_max(), 2);
        occ.decrement_max();
        occ.decrement_max();
        occ.decrement_max();
        assert_eq!(occ.configured_max(), 0);
    }
}
