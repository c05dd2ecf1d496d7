//! Mining task - the per-worker state machine
//!
//! A task walks `Admitted -> Traveling -> Mining -> Dispensing -> Routing`
//! and ends in `Done` or `Failed`. Each call to `tick` advances at most one
//! step. Travel completion is signalled by the host through `arrive`.
//!
//! Every exit path releases the worker's roster slot on the quarry.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::rng::lerp;
use crate::core::types::{Cell, StructureId, WorkerId};
use crate::materials::catalog::{MaterialCategory, MaterialKind};
use crate::mining::collaborators::{AccessPolicy, MiningContext};
use crate::mining::events::{EventLog, QuarryEvent};
use crate::quarry::registry::StructureRegistry;
use crate::quarry::state::QuarryState;

/// Skill level at which mining reaches its fastest duration
const MAX_SKILL_LEVEL: f32 = 20.0;

/// Minimum mining speed, for workers not under player control
const MIN_NPC_SPEED: f32 = 0.5;

/// Minimum mining speed for anyone
const MIN_SPEED: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskPhase {
    Admitted,
    Traveling,
    Mining,
    Dispensing,
    Routing,
    Done,
    Failed,
}

impl TaskPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskPhase::Done | TaskPhase::Failed)
    }
}

/// Why a task ended in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailReason {
    /// Roster full or worker already present
    NotAdmitted,
    Depleted,
    Forbidden,
    StructureGone,
    Cancelled,
}

/// A placed stack of mined material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinedOutput {
    pub kind: MaterialKind,
    pub quantity: u32,
    /// Fraction of max hit points, for materials that track condition
    pub condition: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    /// Storage surface attached to the quarry
    ConnectedStorage,
    /// Best general storage on the map
    GeneralStorage,
}

/// Hauling handed off to the host once the task finishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HaulPlan {
    pub output: MinedOutput,
    pub destination: Cell,
    pub route: Route,
}

/// How a task ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskOutcome {
    /// Output should be carried to `destination`
    Hauling(HaulPlan),
    /// Output stays where it was mined
    LeftOnGround(MinedOutput),
    /// Rubble or nothing at all, never hauled
    Discarded { kind: Option<MaterialKind> },
    /// A sinkhole ended the job. The output stays on the ground.
    HazardInterrupted { output: MinedOutput },
    Failed(FailReason),
}

/// Mining duration in ticks for a skill level
pub fn mining_duration(base_ticks: u32, skill: f32) -> u32 {
    let factor = lerp(1.5, 0.5, skill / MAX_SKILL_LEVEL);
    ((base_ticks as f32 * factor).round() as u32).max(1)
}

/// Ticks between pick hits for a mining speed
pub fn pick_hit_interval(base_ticks: u32, speed: f32, player_controlled: bool) -> u32 {
    let mut speed = speed.max(MIN_SPEED);
    if !player_controlled {
        speed = speed.max(MIN_NPC_SPEED);
    }
    ((base_ticks as f32 / speed).round() as u32).max(1)
}

/// One worker's attempt to mine one unit of output from one quarry
#[derive(Debug, Clone)]
pub struct MiningTask {
    worker: WorkerId,
    structure: StructureId,
    phase: TaskPhase,
    /// Set on the first mining tick
    ticks_remaining: Option<u32>,
    pick_hit_countdown: Option<u32>,
    experience: f32,
    pending_output: Option<MinedOutput>,
    outcome: Option<TaskOutcome>,
}

impl MiningTask {
    /// Try to start mining. Returns a `Failed` task if the worker cannot be
    /// admitted; nothing else changes in that case.
    pub fn begin(
        worker: WorkerId,
        structure: StructureId,
        registry: &mut StructureRegistry,
        access: &dyn AccessPolicy,
    ) -> Self {
        let mut task = Self {
            worker,
            structure,
            phase: TaskPhase::Admitted,
            ticks_remaining: None,
            pick_hit_countdown: None,
            experience: 0.0,
            pending_output: None,
            outcome: None,
        };

        let reason = match registry.get_mut(structure) {
            None => Some(FailReason::StructureGone),
            Some(_) if access.is_forbidden(structure) => Some(FailReason::Forbidden),
            Some(state) if state.is_depleted() => Some(FailReason::Depleted),
            Some(state) => (!state.occupancy.try_admit(worker)).then_some(FailReason::NotAdmitted),
        };

        if let Some(reason) = reason {
            debug!(worker = ?worker, structure = ?structure, ?reason, "Mining task rejected");
            task.phase = TaskPhase::Failed;
            task.outcome = Some(TaskOutcome::Failed(reason));
        }
        task
    }

    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    pub fn structure(&self) -> StructureId {
        self.structure
    }

    pub fn phase(&self) -> TaskPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn outcome(&self) -> Option<&TaskOutcome> {
        self.outcome.as_ref()
    }

    pub fn ticks_remaining(&self) -> Option<u32> {
        self.ticks_remaining
    }

    pub fn pending_output(&self) -> Option<&MinedOutput> {
        self.pending_output.as_ref()
    }

    /// The worker reached the quarry
    pub fn arrive(&mut self) {
        if self.phase == TaskPhase::Traveling {
            self.phase = TaskPhase::Mining;
        }
    }

    /// Abort at any phase. Side effects already applied to the quarry stay.
    pub fn cancel(&mut self, registry: &mut StructureRegistry, tick: u64, events: &mut EventLog) {
        if self.is_finished() {
            return;
        }
        self.finish(registry, TaskOutcome::Failed(FailReason::Cancelled), tick, events);
    }

    /// Advance one step
    pub fn tick<R: Rng>(
        &mut self,
        registry: &mut StructureRegistry,
        ctx: &MiningContext<'_>,
        rng: &mut R,
        events: &mut EventLog,
    ) -> TaskPhase {
        if self.is_finished() {
            return self.phase;
        }

        if matches!(
            self.phase,
            TaskPhase::Admitted | TaskPhase::Traveling | TaskPhase::Mining
        ) {
            if let Some(reason) = self.fail_condition(registry, ctx) {
                self.finish(registry, TaskOutcome::Failed(reason), ctx.tick, events);
                return self.phase;
            }
        }

        match self.phase {
            TaskPhase::Admitted => self.phase = TaskPhase::Traveling,
            TaskPhase::Traveling => {}
            TaskPhase::Mining => self.mine(ctx, events),
            TaskPhase::Dispensing => {
                let terminal = match registry.get_mut(self.structure) {
                    Some(state) => self.dispense(state, ctx, rng, events),
                    None => Some(TaskOutcome::Failed(FailReason::StructureGone)),
                };
                match terminal {
                    Some(outcome) => self.finish(registry, outcome, ctx.tick, events),
                    None => self.phase = TaskPhase::Routing,
                }
            }
            TaskPhase::Routing => {
                let outcome = self.route(registry, ctx);
                self.finish(registry, outcome, ctx.tick, events);
            }
            TaskPhase::Done | TaskPhase::Failed => {}
        }
        self.phase
    }

    fn fail_condition(
        &self,
        registry: &StructureRegistry,
        ctx: &MiningContext<'_>,
    ) -> Option<FailReason> {
        match registry.get(self.structure) {
            None => Some(FailReason::StructureGone),
            Some(_) if ctx.access.is_forbidden(self.structure) => Some(FailReason::Forbidden),
            Some(state) if state.is_depleted() => Some(FailReason::Depleted),
            Some(_) => None,
        }
    }

    fn mine(&mut self, ctx: &MiningContext<'_>, events: &mut EventLog) {
        let remaining = self.ticks_remaining.get_or_insert_with(|| {
            mining_duration(
                ctx.config.base_mining_ticks,
                ctx.workers.mining_skill(self.worker),
            )
        });

        self.experience += ctx.config.mining_experience_per_tick;

        let countdown = self.pick_hit_countdown.get_or_insert_with(|| {
            pick_hit_interval(
                ctx.config.base_ticks_between_pick_hits,
                ctx.workers.mining_speed(self.worker),
                ctx.workers.is_player_controlled(self.worker),
            )
        });
        *countdown = countdown.saturating_sub(1);
        if *countdown == 0 {
            events.push(
                ctx.tick,
                QuarryEvent::PickHit { structure: self.structure, worker: self.worker },
            );
            self.pick_hit_countdown = None;
        }

        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            events.push(
                ctx.tick,
                QuarryEvent::SkillExperience { worker: self.worker, amount: self.experience },
            );
            self.phase = TaskPhase::Dispensing;
        }
    }

    /// Produce and finish the output. Returns the outcome if the task ends here.
    fn dispense<R: Rng>(
        &mut self,
        state: &mut QuarryState,
        ctx: &MiningContext<'_>,
        rng: &mut R,
        events: &mut EventLog,
    ) -> Option<TaskOutcome> {
        let request = state.mode;
        let result = ctx
            .dispenser
            .dispense(request, state, ctx.table, ctx.catalog, ctx.difficulty, rng);

        if result.depleted_now {
            info!(structure = ?self.structure, "Quarry depleted");
            events.push(ctx.tick, QuarryEvent::Depleted { structure: self.structure });
        }

        let (kind, mut quantity) = match result.kind {
            Some(kind) => (kind, result.quantity),
            None => {
                if ctx.table.is_empty() {
                    events.push(ctx.tick, QuarryEvent::TableEmpty);
                }
                let substitute = ctx.catalog.find_material(&ctx.config.slag_material);
                warn!(
                    structure = ?self.structure,
                    ?request,
                    slag = %ctx.config.slag_material,
                    "Dispense produced no material, substituting slag"
                );
                events.push(
                    ctx.tick,
                    QuarryEvent::DispenseFallback {
                        structure: self.structure,
                        worker: self.worker,
                        substitute,
                    },
                );
                match substitute {
                    Some(slag) => (slag, 1),
                    None => return Some(TaskOutcome::Discarded { kind: None }),
                }
            }
        };

        let Some(def) = ctx.catalog.material(kind) else {
            warn!(?kind, "Dispensed material missing from catalog");
            return Some(TaskOutcome::Discarded { kind: Some(kind) });
        };

        if def.category == MaterialCategory::Component {
            quantity += rng.gen_range(0..=1);
        }

        let condition = (def.uses_hit_points
            && !matches!(def.category, MaterialCategory::StoneChunk | MaterialCategory::Component))
        .then(|| rng.gen_range(0.25..=1.0));

        let output = MinedOutput { kind, quantity, condition };

        if quantity >= ctx.config.large_vein_threshold {
            events.push(
                ctx.tick,
                QuarryEvent::LargeVein {
                    structure: self.structure,
                    worker: self.worker,
                    kind,
                    quantity,
                },
            );
        } else if result.is_failure_junk {
            events.push(
                ctx.tick,
                QuarryEvent::MiningFailed { structure: self.structure, worker: self.worker },
            );
        }

        if let Some(hazard) = result.hazard {
            warn!(worker = ?self.worker, structure = ?self.structure, "Sinkhole caught a worker");
            events.push(
                ctx.tick,
                QuarryEvent::HazardTriggered {
                    structure: self.structure,
                    worker: self.worker,
                    worker_damage: ctx.config.hazard_worker_damage,
                    extra_depletion: hazard.extra_damage * state.depletion.damage_multiplier(),
                },
            );
            return Some(TaskOutcome::HazardInterrupted { output });
        }

        if def.category == MaterialCategory::Filler {
            return Some(TaskOutcome::Discarded { kind: Some(kind) });
        }

        if state.auto_haul && def.designate_haulable {
            events.push(
                ctx.tick,
                QuarryEvent::HaulDesignated { structure: self.structure, kind },
            );
        }

        self.pending_output = Some(output);
        None
    }

    fn route(&mut self, registry: &StructureRegistry, ctx: &MiningContext<'_>) -> TaskOutcome {
        let Some(output) = self.pending_output.take() else {
            return TaskOutcome::Discarded { kind: None };
        };

        let auto_haul = registry.get(self.structure).is_some_and(|s| s.auto_haul);
        if !auto_haul {
            return TaskOutcome::LeftOnGround(output);
        }

        // Chunks never go onto the quarry's own storage surface
        let is_chunk = ctx.catalog.category_of(output.kind) == Some(MaterialCategory::StoneChunk);
        let connected = if is_chunk {
            None
        } else {
            ctx.storage
                .connected_storage_cell(self.structure, output.kind, output.quantity)
                .map(|cell| (cell, Route::ConnectedStorage))
        };
        let found = connected.or_else(|| {
            ctx.storage
                .best_storage_cell(self.structure, output.kind, output.quantity)
                .map(|cell| (cell, Route::GeneralStorage))
        });

        match found {
            Some((destination, route)) => TaskOutcome::Hauling(HaulPlan { output, destination, route }),
            None => TaskOutcome::LeftOnGround(output),
        }
    }

    fn finish(
        &mut self,
        registry: &mut StructureRegistry,
        outcome: TaskOutcome,
        tick: u64,
        events: &mut EventLog,
    ) {
        if let Some(state) = registry.get_mut(self.structure) {
            state.occupancy.release(self.worker);
        }
        self.phase = match outcome {
            TaskOutcome::Failed(_) => TaskPhase::Failed,
            _ => TaskPhase::Done,
        };
        self.pending_output = None;
        events.push(
            tick,
            QuarryEvent::TaskFinished {
                worker: self.worker,
                structure: self.structure,
                outcome: outcome.clone(),
            },
        );
        self.outcome = Some(outcome);
    }
}
