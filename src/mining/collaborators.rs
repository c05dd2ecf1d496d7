//! Host-side services the mining task consults
//!
//! The host game owns movement, storage and permissions. These traits are
//! the only view the task machine has of them.

use ahash::AHashMap;

use crate::core::config::QuarryConfig;
use crate::core::types::{Cell, StructureId, Tick, WorkerId};
use crate::materials::catalog::{MaterialCatalog, MaterialKind};
use crate::materials::dispenser::ResourceDispenser;
use crate::materials::table::ResourceTable;

/// Worker statistics relevant to mining
pub trait WorkerStats {
    /// Mining speed multiplier, 1.0 is average
    fn mining_speed(&self, worker: WorkerId) -> f32;

    /// Mining skill level, 0 to 20
    fn mining_skill(&self, worker: WorkerId) -> f32;

    fn is_player_controlled(&self, _worker: WorkerId) -> bool {
        true
    }
}

/// Storage lookups for mined output
pub trait StorageRouter {
    /// Free cell on a storage surface attached to the quarry itself
    fn connected_storage_cell(
        &self,
        structure: StructureId,
        kind: MaterialKind,
        quantity: u32,
    ) -> Option<Cell>;

    /// Best general storage cell for output lying at the quarry
    fn best_storage_cell(
        &self,
        structure: StructureId,
        kind: MaterialKind,
        quantity: u32,
    ) -> Option<Cell>;
}

/// Whether workers may use a structure
pub trait AccessPolicy {
    fn is_forbidden(&self, structure: StructureId) -> bool;
}

/// Everything a task needs from outside the registry for one tick
pub struct MiningContext<'a> {
    pub catalog: &'a dyn MaterialCatalog,
    pub table: &'a ResourceTable,
    pub dispenser: &'a ResourceDispenser,
    pub config: &'a QuarryConfig,
    pub workers: &'a dyn WorkerStats,
    pub storage: &'a dyn StorageRouter,
    pub access: &'a dyn AccessPolicy,
    /// Host difficulty scalar, 50 makes due hazard checks certain
    pub difficulty: f32,
    pub tick: Tick,
}

// ============================================================================
// Simple in-memory hosts, used by the bundled driver and tests
// ============================================================================

/// Same stats for every worker, with per-worker overrides
#[derive(Debug, Clone)]
pub struct FixedWorkerStats {
    pub speed: f32,
    pub skill: f32,
    pub player_controlled: bool,
    overrides: AHashMap<WorkerId, (f32, f32)>,
}

impl FixedWorkerStats {
    pub fn new(speed: f32, skill: f32) -> Self {
        Self {
            speed,
            skill,
            player_controlled: true,
            overrides: AHashMap::new(),
        }
    }

    /// Give one worker its own (speed, skill)
    pub fn set(&mut self, worker: WorkerId, speed: f32, skill: f32) {
        self.overrides.insert(worker, (speed, skill));
    }
}

impl WorkerStats for FixedWorkerStats {
    fn mining_speed(&self, worker: WorkerId) -> f32 {
        self.overrides.get(&worker).map_or(self.speed, |s| s.0)
    }

    fn mining_skill(&self, worker: WorkerId) -> f32 {
        self.overrides.get(&worker).map_or(self.skill, |s| s.1)
    }

    fn is_player_controlled(&self, _worker: WorkerId) -> bool {
        self.player_controlled
    }
}

/// Storage with optional fixed destinations
#[derive(Debug, Clone, Default)]
pub struct FixedStorage {
    pub connected: Option<Cell>,
    pub general: Option<Cell>,
}

impl StorageRouter for FixedStorage {
    fn connected_storage_cell(&self, _: StructureId, _: MaterialKind, _: u32) -> Option<Cell> {
        self.connected
    }

    fn best_storage_cell(&self, _: StructureId, _: MaterialKind, _: u32) -> Option<Cell> {
        self.general
    }
}

/// Explicit set of forbidden structures
#[derive(Debug, Clone, Default)]
pub struct ForbiddenSet {
    forbidden: Vec<StructureId>,
}

impl ForbiddenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forbid(&mut self, structure: StructureId) {
        if !self.forbidden.contains(&structure) {
            self.forbidden.push(structure);
        }
    }

    pub fn allow(&mut self, structure: StructureId) {
        self.forbidden.retain(|s| *s != structure);
    }
}

impl AccessPolicy for ForbiddenSet {
    fn is_forbidden(&self, structure: StructureId) -> bool {
        self.forbidden.contains(&structure)
    }
}
