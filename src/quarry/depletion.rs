//! Depletion tracking - health, completed jobs and hazard eligibility
//!
//! Health only ever goes down. A depleted quarry stays on the map until the
//! host removes it but accepts no new mining tasks.

use serde::{Deserialize, Serialize};

use crate::quarry::variant::QuarryVariant;

/// Mining eligibility derived from health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepletionState {
    Healthy,
    Depleted,
}

/// Per-structure health and job counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepletionTracker {
    /// Remaining health, 1.0 = untouched, 0.0 = depleted
    health_fraction: f64,
    jobs_completed: u64,
    /// `None` when the quarry never depletes
    max_health: Option<u32>,
    damage_multiplier: u32,
    hazard_interval: u32,
}

impl DepletionTracker {
    pub fn new(max_health: Option<u32>, variant: QuarryVariant) -> Self {
        Self {
            health_fraction: 1.0,
            jobs_completed: 0,
            max_health,
            damage_multiplier: variant.damage_multiplier(),
            hazard_interval: variant.hazard_interval(),
        }
    }

    /// Restore persisted progress
    pub fn restore(mut self, health_fraction: f64, jobs_completed: u64) -> Self {
        self.health_fraction = health_fraction.clamp(0.0, 1.0);
        self.jobs_completed = jobs_completed;
        self
    }

    pub fn health_fraction(&self) -> f64 {
        self.health_fraction
    }

    /// Remaining health for display, always 100 for inexhaustible quarries
    pub fn percent(&self) -> f64 {
        if self.is_inexhaustible() {
            100.0
        } else {
            self.health_fraction * 100.0
        }
    }

    pub fn jobs_completed(&self) -> u64 {
        self.jobs_completed
    }

    pub fn max_health(&self) -> Option<u32> {
        self.max_health
    }

    pub fn damage_multiplier(&self) -> u32 {
        self.damage_multiplier
    }

    pub fn hazard_interval(&self) -> u32 {
        self.hazard_interval
    }

    pub fn is_inexhaustible(&self) -> bool {
        self.max_health.is_none()
    }

    /// Settings changed. The remaining fraction carries over.
    pub fn set_max_health(&mut self, max_health: Option<u32>) {
        self.max_health = max_health;
    }

    pub fn state(&self) -> DepletionState {
        if !self.is_inexhaustible() && self.health_fraction <= 0.0 {
            DepletionState::Depleted
        } else {
            DepletionState::Healthy
        }
    }

    pub fn is_depleted(&self) -> bool {
        self.state() == DepletionState::Depleted
    }

    /// Count one completed mining action, returning the new total
    pub fn record_job(&mut self) -> u64 {
        self.jobs_completed += 1;
        self.jobs_completed
    }

    /// Whether the job just recorded lands on a hazard check
    pub fn hazard_check_due(&self) -> bool {
        self.hazard_interval > 0
            && self.jobs_completed > 0
            && self.jobs_completed % self.hazard_interval as u64 == 0
    }

    /// Remove `units * damage_multiplier` health points.
    ///
    /// Health is rounded to whole points before subtracting, so exactly
    /// `max_health` unit hits land on 0.0. Returns true if this call
    /// depleted the quarry.
    pub fn apply_damage(&mut self, units: u32) -> bool {
        let Some(max) = self.max_health.filter(|&m| m > 0) else {
            return false;
        };
        let was_depleted = self.is_depleted();

        let current = (self.health_fraction * max as f64).round() as i64;
        let damage = units as i64 * self.damage_multiplier as i64;
        let remaining = (current - damage).max(0);
        self.health_fraction = remaining as f64 / max as f64;

        !was_depleted && self.is_depleted()
    }
}
