//! Simulation context - owns every piece of quarry state and drives ticks
//!
//! One tick advances every active mining task by one step. Travel is
//! modelled as a fixed number of ticks before `arrive` is signalled.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::config::QuarryConfig;
use crate::core::error::Result;
use crate::core::rng::{seeded, SimRng};
use crate::core::types::{Cell, CellRect, StructureId, Tick, WorkerId};
use crate::materials::catalog::Catalog;
use crate::materials::dispenser::ResourceDispenser;
use crate::materials::table::ResourceTable;
use crate::mining::collaborators::{FixedStorage, FixedWorkerStats, ForbiddenSet, MiningContext};
use crate::mining::events::{EventLog, QuarryEvent};
use crate::mining::task::{MiningTask, TaskOutcome, TaskPhase};
use crate::quarry::registry::{quadrant_positions, Removal, StructureRegistry};
use crate::quarry::state::{QuarryState, TerrainSource, YieldTracker};
use crate::quarry::variant::QuarryVariant;

/// Default ticks a worker spends walking to the quarry
pub const DEFAULT_TRAVEL_TICKS: u32 = 20;

#[derive(Debug, Clone)]
struct ActiveTask {
    task: MiningTask,
    travel_remaining: u32,
}

/// Persistent part of the simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedQuarries {
    pub tick: Tick,
    pub registry: StructureRegistry,
    pub table: ResourceTable,
}

/// Totals for one run of the driver
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub ticks: Tick,
    pub jobs_completed: u64,
    pub health_percent: f64,
    pub depleted: bool,
    pub yields: YieldTracker,
    pub hazards: usize,
    pub large_veins: usize,
    pub hauls: usize,
    pub left_on_ground: usize,
    pub discarded: usize,
    pub failed: usize,
}

pub struct SimulationContext {
    pub config: QuarryConfig,
    pub catalog: Catalog,
    pub table: ResourceTable,
    pub registry: StructureRegistry,
    pub events: EventLog,
    pub workers: FixedWorkerStats,
    pub storage: FixedStorage,
    pub access: ForbiddenSet,
    /// Host difficulty, 50 makes every due hazard check fire
    pub difficulty: f32,
    pub travel_ticks: u32,
    dispenser: ResourceDispenser,
    rng: SimRng,
    tick: Tick,
    tasks: Vec<ActiveTask>,
    finished: Vec<MiningTask>,
}

impl SimulationContext {
    /// Build a context. The config is validated and the resource table is
    /// built from the catalog.
    pub fn new(config: QuarryConfig, catalog: Catalog) -> Result<Self> {
        config.validate()?;
        let table = ResourceTable::build(&catalog, &config.component_material);
        let dispenser = ResourceDispenser::new(&config, &catalog);
        let rng = seeded(config.seed);
        info!(entries = table.len(), total_weight = table.total_weight(), "Simulation ready");
        Ok(Self {
            config,
            catalog,
            table,
            registry: StructureRegistry::new(),
            events: EventLog::new(),
            workers: FixedWorkerStats::new(1.0, 10.0),
            storage: FixedStorage::default(),
            access: ForbiddenSet::new(),
            difficulty: 0.0,
            travel_ticks: DEFAULT_TRAVEL_TICKS,
            dispenser,
            rng,
            tick: 0,
            tasks: Vec::new(),
            finished: Vec::new(),
        })
    }

    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    // ========================================================================
    // Structures
    // ========================================================================

    /// Place a standalone quarry with its footprint starting at `origin`
    pub fn spawn_quarry(
        &mut self,
        variant: QuarryVariant,
        origin: Cell,
        terrain: &dyn TerrainSource,
    ) -> Result<StructureId> {
        let (w, h) = variant.size();
        let state = QuarryState::spawn(
            StructureId::new(),
            variant,
            CellRect::new(origin, w, h),
            terrain,
            &self.catalog,
            &self.config,
        );
        self.registry.register(state)
    }

    /// Place a composite quarry: four mini quadrants around `center`.
    /// Returns the id of the composite base.
    pub fn spawn_composite(&mut self, center: Cell, terrain: &dyn TerrainSource) -> Result<StructureId> {
        let base = StructureId::new();
        let (w, h) = QuarryVariant::Mini.size();
        let parts = quadrant_positions(center)
            .into_iter()
            .map(|pos| {
                let origin = pos.offset(-(w as i32) / 2, -(h as i32) / 2);
                QuarryState::spawn(
                    StructureId::new(),
                    QuarryVariant::Mini,
                    CellRect::new(origin, w, h),
                    terrain,
                    &self.catalog,
                    &self.config,
                )
            })
            .collect();
        self.registry.register_composite(base, parts)?;
        Ok(base)
    }

    /// Remove a structure (or a whole composite), cancelling tasks on it
    pub fn remove_structure(&mut self, id: StructureId) -> Result<Removal> {
        let removal = self.registry.deregister(id)?;
        for active in self.tasks.iter_mut() {
            if removal.removed.contains(&active.task.structure()) {
                active.task.cancel(&mut self.registry, self.tick, &mut self.events);
            }
        }
        if removal.first_removal {
            self.events.push(self.tick, QuarryEvent::FirstQuarryRemoved { structure: id });
        }
        self.collect_finished();
        Ok(removal)
    }

    /// Change a quarry's worker limit, cancelling the tasks of evicted workers
    pub fn set_max_workers(&mut self, structure: StructureId, max: u32) -> Vec<WorkerId> {
        let Some(state) = self.registry.get_mut(structure) else {
            return Vec::new();
        };
        let evicted = state.occupancy.set_max_workers(max);
        for active in self.tasks.iter_mut() {
            if active.task.structure() == structure && evicted.contains(&active.task.worker()) {
                active.task.cancel(&mut self.registry, self.tick, &mut self.events);
            }
        }
        self.collect_finished();
        evicted
    }

    /// Apply a new max health setting to every live quarry
    pub fn set_max_health(&mut self, max_health: u32) {
        self.config.max_health = max_health;
        let effective = self.config.effective_max_health();
        let ids = self.registry.ids();
        for id in ids {
            if let Some(state) = self.registry.get_mut(id) {
                state.depletion.set_max_health(effective);
            }
        }
    }

    // ========================================================================
    // Resource table
    // ========================================================================

    /// Rebuild the table from the catalog, dropping every override
    pub fn reset_table(&mut self) {
        self.table.reset(&self.catalog, &self.config.component_material);
    }

    /// Merge `[[weights]]` overrides. Returns how many were applied.
    pub fn merge_weight_overrides(&mut self, toml: &str) -> Result<usize> {
        self.table.merge_from_toml(toml, &self.catalog)
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    pub fn is_busy(&self, worker: WorkerId) -> bool {
        self.tasks.iter().any(|a| a.task.worker() == worker)
    }

    pub fn active_tasks(&self) -> impl Iterator<Item = &MiningTask> {
        self.tasks.iter().map(|a| &a.task)
    }

    /// Hand a worker a mining job. Returns false if it was not admitted.
    pub fn assign(&mut self, worker: WorkerId, structure: StructureId) -> bool {
        if self.is_busy(worker) {
            return false;
        }
        let task = MiningTask::begin(worker, structure, &mut self.registry, &self.access);
        if task.is_finished() {
            return false;
        }
        self.tasks.push(ActiveTask { task, travel_remaining: self.travel_ticks });
        true
    }

    /// Cancel a worker's current task, if any
    pub fn cancel(&mut self, worker: WorkerId) {
        for active in self.tasks.iter_mut().filter(|a| a.task.worker() == worker) {
            active.task.cancel(&mut self.registry, self.tick, &mut self.events);
        }
        self.collect_finished();
    }

    /// Advance every active task one step. Returns tasks that finished.
    pub fn tick(&mut self) -> Vec<MiningTask> {
        self.tick += 1;

        let ctx = MiningContext {
            catalog: &self.catalog,
            table: &self.table,
            dispenser: &self.dispenser,
            config: &self.config,
            workers: &self.workers,
            storage: &self.storage,
            access: &self.access,
            difficulty: self.difficulty,
            tick: self.tick,
        };

        for active in self.tasks.iter_mut() {
            if active.task.phase() == TaskPhase::Traveling {
                if active.travel_remaining == 0 {
                    active.task.arrive();
                } else {
                    active.travel_remaining -= 1;
                }
            }
            active.task.tick(&mut self.registry, &ctx, &mut self.rng, &mut self.events);
        }

        self.collect_finished();
        std::mem::take(&mut self.finished)
    }

    /// Keep `workers` mining `structure` until it depletes, is removed, or
    /// `max_ticks` pass. Idle workers are re-assigned every tick.
    pub fn run(&mut self, structure: StructureId, workers: &[WorkerId], max_ticks: Tick) -> RunSummary {
        let start = self.tick;
        let mut finished = Vec::new();

        while self.tick - start < max_ticks {
            let open = self.registry.get(structure).is_some_and(|s| !s.is_depleted());
            if !open && self.tasks.is_empty() {
                break;
            }
            if open {
                for worker in workers {
                    let full = self
                        .registry
                        .get(structure)
                        .map_or(true, |s| s.occupancy.is_full());
                    if full {
                        break;
                    }
                    self.assign(*worker, structure);
                }
            }
            finished.extend(self.tick());
        }

        debug!(ticks = self.tick - start, tasks = finished.len(), "Run finished");
        self.summarize(structure, self.tick - start, &finished)
    }

    fn collect_finished(&mut self) {
        let (done, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|a| a.task.is_finished());
        self.tasks = running;
        self.finished.extend(done.into_iter().map(|a| a.task));
    }

    fn summarize(&self, structure: StructureId, ticks: Tick, finished: &[MiningTask]) -> RunSummary {
        let state = self.registry.get(structure);
        let count_outcome = |pred: fn(&TaskOutcome) -> bool| {
            finished
                .iter()
                .filter(|t| t.outcome().is_some_and(pred))
                .count()
        };

        RunSummary {
            ticks,
            jobs_completed: state.map_or(0, |s| s.depletion.jobs_completed()),
            health_percent: state.map_or(0.0, |s| s.depletion.percent()),
            depleted: state.map_or(false, |s| s.is_depleted()),
            yields: state.map(|s| s.yields.clone()).unwrap_or_default(),
            hazards: count_outcome(|o| matches!(o, TaskOutcome::HazardInterrupted { .. })),
            large_veins: self
                .events
                .for_structure(structure)
                .filter(|e| matches!(e.event, QuarryEvent::LargeVein { .. }))
                .count(),
            hauls: count_outcome(|o| matches!(o, TaskOutcome::Hauling(_))),
            left_on_ground: count_outcome(|o| matches!(o, TaskOutcome::LeftOnGround(_))),
            discarded: count_outcome(|o| matches!(o, TaskOutcome::Discarded { .. })),
            failed: count_outcome(|o| matches!(o, TaskOutcome::Failed(_))),
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn save(&self) -> SavedQuarries {
        SavedQuarries {
            tick: self.tick,
            registry: self.registry.clone(),
            table: self.table.clone(),
        }
    }

    /// Restore saved quarries. In-flight tasks are dropped and their roster
    /// slots freed; workers are re-assigned by the host.
    pub fn load(&mut self, saved: SavedQuarries) {
        self.tick = saved.tick;
        self.registry = saved.registry;
        self.table = saved.table;
        self.tasks.clear();
        let ids = self.registry.ids();
        for id in ids {
            if let Some(state) = self.registry.get_mut(id) {
                let released = state.occupancy.clear();
                if !released.is_empty() {
                    debug!(structure = ?id, count = released.len(), "Freed roster slots of dropped tasks");
                }
                state.ensure_materials(&self.catalog);
            }
        }
    }

    pub fn save_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.save())?)
    }

    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let saved: SavedQuarries = serde_json::from_str(json)?;
        self.load(saved);
        Ok(())
    }
}
