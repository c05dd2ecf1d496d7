//! Resource dispensing - decides what one finished mining action produces
//!
//! Every call counts one completed job against the quarry, applies depletion
//! damage and possibly a sinkhole, then rolls junk / chunk / resource / block.

use std::ops::RangeInclusive;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::config::QuarryConfig;
use crate::materials::catalog::{MaterialCatalog, MaterialCategory, MaterialDef, MaterialKind};
use crate::materials::table::ResourceTable;
use crate::quarry::state::QuarryState;

/// What a quarry is currently asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    Resources,
    Blocks,
    /// Mining still runs but only rubble comes out
    Disabled,
}

/// A sinkhole opened during this dispense
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HazardOutcome {
    /// Extra health points removed from the quarry
    pub extra_damage: u32,
}

/// Outcome of one dispense
#[derive(Debug, Clone, PartialEq)]
pub struct DispenseResult {
    /// `None` when nothing usable came out (empty table, unresolvable rock)
    pub kind: Option<MaterialKind>,
    pub quantity: u32,
    /// Output that only ever exists as a single item
    pub single_unit: bool,
    /// Rubble produced by a failed action
    pub is_failure_junk: bool,
    pub hazard: Option<HazardOutcome>,
    /// This dispense took the quarry from healthy to depleted
    pub depleted_now: bool,
}

impl DispenseResult {
    fn single(kind: Option<MaterialKind>, is_failure_junk: bool) -> Self {
        Self {
            kind,
            quantity: 1,
            single_unit: true,
            is_failure_junk,
            hazard: None,
            depleted_now: false,
        }
    }
}

/// Probability of a sinkhole on a due check, for a difficulty scale where
/// 50 is certain. A non-finite difficulty never triggers one.
pub fn hazard_chance(difficulty: f32) -> f64 {
    if !difficulty.is_finite() {
        return 0.0;
    }
    (difficulty as f64 / 50.0).clamp(0.0, 1.0)
}

/// Stack size for a drawn resource. Valuable materials come in smaller stacks.
pub fn resource_stack_size<R: Rng>(def: &MaterialDef, rng: &mut R) -> u32 {
    let sub = ((def.market_value / 2.0) as i32).clamp(0, 10);
    let roll = rng.gen_range((15 - sub)..=(40 - 2 * sub)) as u32;
    1 + roll.min(def.stack_limit.saturating_sub(1))
}

/// Rolls mining output from quarry state and the weighted table
#[derive(Debug, Clone)]
pub struct ResourceDispenser {
    junk_probability: f64,
    chunk_probability: f64,
    block_yield: RangeInclusive<u32>,
    hazard_extra_damage: RangeInclusive<u32>,
    rubble: Option<MaterialKind>,
}

impl ResourceDispenser {
    pub fn new(config: &QuarryConfig, catalog: &dyn MaterialCatalog) -> Self {
        let rubble = catalog.find_material(&config.rubble_material);
        if rubble.is_none() {
            warn!(material = %config.rubble_material, "Rubble material missing from catalog");
        }
        Self {
            junk_probability: config.junk_probability(),
            chunk_probability: config.chunk_probability(),
            block_yield: config.block_yield_min..=config.block_yield_max,
            hazard_extra_damage: config.hazard_extra_damage_min..=config.hazard_extra_damage_max,
            rubble,
        }
    }

    pub fn rubble(&self) -> Option<MaterialKind> {
        self.rubble
    }

    /// Produce the output of one completed mining action on `state`.
    ///
    /// Always counts the job and applies depletion, even when the result is
    /// junk. `difficulty` scales the sinkhole chance on due checks.
    pub fn dispense<R: Rng>(
        &self,
        request: RequestKind,
        state: &mut QuarryState,
        table: &ResourceTable,
        catalog: &dyn MaterialCatalog,
        difficulty: f32,
        rng: &mut R,
    ) -> DispenseResult {
        state.ensure_materials(catalog);

        state.depletion.record_job();
        let mut depleted_now = state.depletion.apply_damage(1);

        let mut hazard = None;
        if state.depletion.hazard_check_due() && rng.gen_bool(hazard_chance(difficulty)) {
            let extra = rng.gen_range(self.hazard_extra_damage.clone());
            depleted_now |= state.depletion.apply_damage(extra);
            debug!(structure = ?state.id, extra, "Sinkhole opened");
            hazard = Some(HazardOutcome { extra_damage: extra });
        }

        let mut result = self.roll_output(request, state, table, catalog, rng);
        result.hazard = hazard;
        result.depleted_now = depleted_now;

        if let Some(kind) = result.kind {
            if let Some(category) = catalog.category_of(kind) {
                state.yields.record(category, result.quantity);
            }
        }
        result
    }

    fn roll_output<R: Rng>(
        &self,
        request: RequestKind,
        state: &QuarryState,
        table: &ResourceTable,
        catalog: &dyn MaterialCatalog,
        rng: &mut R,
    ) -> DispenseResult {
        let junk = rng.gen_bool(self.junk_probability);

        match (request, junk) {
            (RequestKind::Blocks, true) => DispenseResult::single(self.rubble, true),
            (_, true) => {
                if rng.gen_bool(self.chunk_probability) {
                    let chunk = state.chunks_under().choose(rng).copied();
                    if chunk.is_none() {
                        warn!(structure = ?state.id, "Quarry has no chunk materials");
                    }
                    DispenseResult::single(chunk, false)
                } else {
                    DispenseResult::single(self.rubble, true)
                }
            }
            (RequestKind::Blocks, false) => {
                let block = state.blocks_under().choose(rng).copied();
                if block.is_none() {
                    warn!(structure = ?state.id, "Quarry has no block materials");
                }
                DispenseResult {
                    kind: block,
                    quantity: rng.gen_range(self.block_yield.clone()),
                    single_unit: false,
                    is_failure_junk: false,
                    hazard: None,
                    depleted_now: false,
                }
            }
            (RequestKind::Resources, false) => {
                let Some(kind) = table.take_one(rng) else {
                    return DispenseResult::single(None, false);
                };
                let Some(def) = catalog.material(kind) else {
                    return DispenseResult::single(None, false);
                };
                if def.category == MaterialCategory::Component || def.is_single_unit() {
                    return DispenseResult::single(Some(kind), false);
                }
                DispenseResult {
                    kind: Some(kind),
                    quantity: resource_stack_size(def, rng),
                    single_unit: false,
                    is_failure_junk: false,
                    hazard: None,
                    depleted_now: false,
                }
            }
            (RequestKind::Disabled, false) => DispenseResult::single(self.rubble, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::seeded;
    use crate::core::types::{Cell, CellRect, StructureId};
    use crate::materials::catalog::Catalog;
    use crate::quarry::variant::QuarryVariant;

    fn setup(config: &QuarryConfig) -> (Catalog, ResourceTable, QuarryState) {
        let catalog = Catalog::with_defaults();
        let table = ResourceTable::build(&catalog, &config.component_material);
        let mut state = QuarryState::new(
            StructureId::new(),
            QuarryVariant::Standard,
            CellRect::new(Cell::new(0, 0), 9, 9),
            vec!["Granite".into()],
            config,
        );
        state.ensure_materials(&catalog);
        (catalog, table, state)
    }

    #[test]
    fn test_hazard_chance_scale() {
        assert_eq!(hazard_chance(0.0), 0.0);
        assert_eq!(hazard_chance(25.0), 0.5);
        assert_eq!(hazard_chance(50.0), 1.0);
        assert_eq!(hazard_chance(80.0), 1.0);
        assert_eq!(hazard_chance(-5.0), 0.0);
        assert_eq!(hazard_chance(f32::NAN), 0.0);
        assert_eq!(hazard_chance(f32::INFINITY), 0.0);
    }

    #[test]
    fn test_nan_difficulty_skips_hazard() {
        let config = QuarryConfig::default();
        let (catalog, table, mut state) = setup(&config);
        let dispenser = ResourceDispenser::new(&config, &catalog);
        let mut rng = seeded(8);

        // Job 100 is a due check; a NaN difficulty must not reach gen_bool
        for _ in 0..100 {
            let result =
                dispenser.dispense(RequestKind::Resources, &mut state, &table, &catalog, f32::NAN, &mut rng);
            assert!(result.hazard.is_none());
        }
        assert_eq!(state.depletion.jobs_completed(), 100);
    }

    #[test]
    fn test_all_junk_blocks_request_gives_rubble() {
        let config = QuarryConfig { junk_chance: 100, ..QuarryConfig::default() };
        let (catalog, table, mut state) = setup(&config);
        let dispenser = ResourceDispenser::new(&config, &catalog);
        let mut rng = seeded(1);

        for _ in 0..50 {
            let result =
                dispenser.dispense(RequestKind::Blocks, &mut state, &table, &catalog, 0.0, &mut rng);
            assert_eq!(result.kind, catalog.find_material("RockRubble"));
            assert!(result.is_failure_junk);
            assert!(result.single_unit);
        }
    }

    #[test]
    fn test_junk_with_certain_chunk_gives_rock_chunk() {
        let config = QuarryConfig { junk_chance: 100, chunk_chance: 100, ..QuarryConfig::default() };
        let (catalog, table, mut state) = setup(&config);
        let dispenser = ResourceDispenser::new(&config, &catalog);
        let mut rng = seeded(2);

        let result =
            dispenser.dispense(RequestKind::Resources, &mut state, &table, &catalog, 0.0, &mut rng);
        assert_eq!(result.kind, catalog.find_material("ChunkGranite"));
        assert!(!result.is_failure_junk);
        assert_eq!(state.yields.chunks_mined, 1);
    }

    #[test]
    fn test_block_cut_quantity_in_range() {
        let config = QuarryConfig { junk_chance: 0, ..QuarryConfig::default() };
        let (catalog, table, mut state) = setup(&config);
        let dispenser = ResourceDispenser::new(&config, &catalog);
        let mut rng = seeded(3);

        let mut total = 0;
        for _ in 0..100 {
            let result =
                dispenser.dispense(RequestKind::Blocks, &mut state, &table, &catalog, 0.0, &mut rng);
            assert_eq!(result.kind, catalog.find_material("BlocksGranite"));
            assert!((5..=10).contains(&result.quantity), "Got {}", result.quantity);
            assert!(!result.single_unit);
            total += result.quantity as u64;
        }
        assert_eq!(state.yields.blocks_mined, total);
    }

    #[test]
    fn test_resource_stack_bounds() {
        let config = QuarryConfig { junk_chance: 0, ..QuarryConfig::default() };
        let (catalog, table, mut state) = setup(&config);
        let dispenser = ResourceDispenser::new(&config, &catalog);
        let mut rng = seeded(4);

        for _ in 0..500 {
            let result =
                dispenser.dispense(RequestKind::Resources, &mut state, &table, &catalog, 0.0, &mut rng);
            let kind = result.kind.expect("resource table is populated");
            let def = catalog.material(kind).unwrap();
            assert!(result.quantity >= 1);
            assert!(result.quantity <= def.stack_limit.max(1));
            if def.category == MaterialCategory::Component {
                assert_eq!(result.quantity, 1);
                assert!(result.single_unit);
            }
        }
        assert_eq!(state.yields.resources_mined, 500);
    }

    #[test]
    fn test_stack_size_formula() {
        let mut rng = seeded(5);
        // Cheap material: 1 + [15, 40]
        let cheap = MaterialDef::new("Cheap", MaterialCategory::Resource).with_stack_limit(500);
        // Value 20 caps the reduction at 10: 1 + [5, 20]
        let dear = MaterialDef::new("Dear", MaterialCategory::Resource)
            .with_value(20.0)
            .with_stack_limit(500);
        // Stack limit 10 caps the quantity at 10
        let small = MaterialDef::new("Small", MaterialCategory::Resource).with_stack_limit(10);

        for _ in 0..200 {
            let q = resource_stack_size(&cheap, &mut rng);
            assert!((16..=41).contains(&q));
            let q = resource_stack_size(&dear, &mut rng);
            assert!((6..=21).contains(&q));
            assert_eq!(resource_stack_size(&small, &mut rng), 10);
        }
    }

    #[test]
    fn test_disabled_gives_plain_rubble() {
        let config = QuarryConfig { junk_chance: 0, ..QuarryConfig::default() };
        let (catalog, table, mut state) = setup(&config);
        let dispenser = ResourceDispenser::new(&config, &catalog);
        let mut rng = seeded(6);

        let result =
            dispenser.dispense(RequestKind::Disabled, &mut state, &table, &catalog, 0.0, &mut rng);
        assert_eq!(result.kind, dispenser.rubble());
        assert!(result.single_unit);
        assert!(!result.is_failure_junk);
    }

    #[test]
    fn test_empty_table_gives_nothing() {
        let config = QuarryConfig { junk_chance: 0, ..QuarryConfig::default() };
        let (catalog, _, mut state) = setup(&config);
        let table = ResourceTable::new();
        let dispenser = ResourceDispenser::new(&config, &catalog);
        let mut rng = seeded(7);

        let result =
            dispenser.dispense(RequestKind::Resources, &mut state, &table, &catalog, 0.0, &mut rng);
        assert_eq!(result.kind, None);
        // The job still counts and still wears the quarry
        assert_eq!(state.depletion.jobs_completed(), 1);
        assert!(state.depletion.health_fraction() < 1.0);
    }

    #[test]
    fn test_forced_hazard_on_interval() {
        let config = QuarryConfig::default();
        let (catalog, table, mut state) = setup(&config);
        let dispenser = ResourceDispenser::new(&config, &catalog);
        let mut rng = seeded(8);

        for job in 1..=100u64 {
            let result =
                dispenser.dispense(RequestKind::Resources, &mut state, &table, &catalog, 50.0, &mut rng);
            if job == 100 {
                let hazard = result.hazard.expect("difficulty 50 makes the check certain");
                assert!((1..=3).contains(&hazard.extra_damage));
                // 100 regular hits plus the sinkhole damage
                let expected = (2000 - 100 - hazard.extra_damage) as f64 / 2000.0;
                assert!((state.depletion.health_fraction() - expected).abs() < 1e-9);
            } else {
                assert!(result.hazard.is_none(), "No check before job 100");
            }
        }
    }

    #[test]
    fn test_depleted_now_reported_once() {
        let config = QuarryConfig { max_health: 10, ..QuarryConfig::default() };
        let (catalog, table, mut state) = setup(&config);
        let dispenser = ResourceDispenser::new(&config, &catalog);
        let mut rng = seeded(9);

        let flags: Vec<bool> = (0..12)
            .map(|_| {
                dispenser
                    .dispense(RequestKind::Resources, &mut state, &table, &catalog, 0.0, &mut rng)
                    .depleted_now
            })
            .collect();
        assert_eq!(flags.iter().filter(|f| **f).count(), 1);
        assert!(flags[9]);
    }
}
