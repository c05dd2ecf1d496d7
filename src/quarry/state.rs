//! Per-structure quarry state and spawning from terrain

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::config::QuarryConfig;
use crate::core::types::{Cell, CellRect, StructureId};
use crate::materials::catalog::{
    blocks_for_family, chunk_for_family, is_valid_rock_family, MaterialCatalog, MaterialCategory,
    MaterialKind,
};
use crate::materials::dispenser::RequestKind;
use crate::quarry::depletion::DepletionTracker;
use crate::quarry::occupancy::OccupancyController;
use crate::quarry::variant::QuarryVariant;

/// Terrain lookups needed to decide what rock a quarry sits on
pub trait TerrainSource {
    /// Rock family of quarry-eligible terrain at `cell`, or `None`
    fn rock_family_at(&self, cell: Cell) -> Option<String>;

    /// Rock families occurring naturally anywhere on the map
    fn natural_rock_families(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Running counts of what a quarry has produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldTracker {
    pub chunks_mined: u64,
    pub resources_mined: u64,
    pub blocks_mined: u64,
}

impl YieldTracker {
    /// Chunks and resources count one per yield, blocks count per unit
    pub fn record(&mut self, category: MaterialCategory, quantity: u32) {
        match category {
            MaterialCategory::StoneChunk => self.chunks_mined += 1,
            MaterialCategory::Resource | MaterialCategory::Component => self.resources_mined += 1,
            MaterialCategory::Block => self.blocks_mined += quantity as u64,
            MaterialCategory::Filler => {}
        }
    }
}

/// Everything the simulation knows about one live quarry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarryState {
    pub id: StructureId,
    pub variant: QuarryVariant,
    pub footprint: CellRect,
    pub mode: RequestKind,
    /// Raise haul designations on haulable output
    pub auto_haul: bool,
    pub depletion: DepletionTracker,
    pub occupancy: OccupancyController,
    /// One entry per footprint cell of valid rock, so families weight by area
    pub rock_families: Vec<String>,
    pub yields: YieldTracker,

    // Derived from rock_families against the loaded catalog
    #[serde(skip)]
    chunks_under: Vec<MaterialKind>,
    #[serde(skip)]
    blocks_under: Vec<MaterialKind>,
}

impl QuarryState {
    /// Create state with explicit rock families
    pub fn new(
        id: StructureId,
        variant: QuarryVariant,
        footprint: CellRect,
        rock_families: Vec<String>,
        config: &QuarryConfig,
    ) -> Self {
        let interior = footprint.contracted_by(variant.wall_thickness());
        Self {
            id,
            variant,
            footprint,
            mode: RequestKind::Resources,
            auto_haul: true,
            depletion: DepletionTracker::new(config.effective_max_health(), variant),
            occupancy: OccupancyController::new(
                config.default_max_workers,
                config.max_workers_limit,
                interior.area(),
            ),
            rock_families,
            yields: YieldTracker::default(),
            chunks_under: Vec::new(),
            blocks_under: Vec::new(),
        }
    }

    /// Spawn a quarry on `footprint`, recording the rock it was dug into.
    ///
    /// Falls back to the map's natural rock, then to the configured default
    /// families, when the footprint itself has no valid rock.
    pub fn spawn(
        id: StructureId,
        variant: QuarryVariant,
        footprint: CellRect,
        terrain: &dyn TerrainSource,
        catalog: &dyn MaterialCatalog,
        config: &QuarryConfig,
    ) -> Self {
        let mut families: Vec<String> = footprint
            .cells()
            .filter_map(|cell| terrain.rock_family_at(cell))
            .filter(|family| is_valid_rock_family(catalog, family))
            .collect();

        if families.is_empty() {
            let mut natural: Vec<String> = terrain
                .natural_rock_families()
                .into_iter()
                .filter(|family| is_valid_rock_family(catalog, family))
                .collect();
            natural.sort();
            natural.dedup();
            families = natural;
        }

        if families.is_empty() {
            warn!("No valid rock families found on the map, using fallback families");
            families = config.fallback_rock_families.clone();
        }

        debug!(structure = ?id, families = families.len(), "Spawned quarry");

        let mut state = Self::new(id, variant, footprint, families, config);
        state.ensure_materials(catalog);
        state
    }

    /// Workable pit floor inside the walls
    pub fn interior(&self) -> CellRect {
        self.footprint.contracted_by(self.variant.wall_thickness())
    }

    /// Resolve chunk and block materials from the rock families if not done yet
    pub fn ensure_materials(&mut self, catalog: &dyn MaterialCatalog) {
        if self.chunks_under.is_empty() {
            self.chunks_under = self
                .rock_families
                .iter()
                .filter_map(|family| chunk_for_family(catalog, family))
                .collect();
        }
        if self.blocks_under.is_empty() {
            self.blocks_under = self
                .rock_families
                .iter()
                .filter_map(|family| blocks_for_family(catalog, family))
                .collect();
        }
    }

    pub fn chunks_under(&self) -> &[MaterialKind] {
        &self.chunks_under
    }

    pub fn blocks_under(&self) -> &[MaterialKind] {
        &self.blocks_under
    }

    pub fn is_depleted(&self) -> bool {
        self.depletion.is_depleted()
    }

    /// Switch between resources and blocks. A disabled quarry stays disabled.
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            RequestKind::Resources => RequestKind::Blocks,
            RequestKind::Blocks => RequestKind::Resources,
            RequestKind::Disabled => RequestKind::Disabled,
        };
    }

    pub fn toggle_auto_haul(&mut self) {
        self.auto_haul = !self.auto_haul;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::catalog::Catalog;

    struct FlatTerrain(Option<&'static str>, Vec<String>);

    impl TerrainSource for FlatTerrain {
        fn rock_family_at(&self, _cell: Cell) -> Option<String> {
            self.0.map(|s| s.to_string())
        }

        fn natural_rock_families(&self) -> Vec<String> {
            self.1.clone()
        }
    }

    fn footprint() -> CellRect {
        CellRect::new(Cell::new(0, 0), 9, 9)
    }

    #[test]
    fn test_spawn_records_one_family_per_cell() {
        let catalog = Catalog::with_defaults();
        let config = QuarryConfig::default();
        let terrain = FlatTerrain(Some("Granite"), vec![]);

        let state = QuarryState::spawn(
            StructureId::new(),
            QuarryVariant::Standard,
            footprint(),
            &terrain,
            &catalog,
            &config,
        );

        assert_eq!(state.rock_families.len(), 81);
        assert_eq!(state.chunks_under().len(), 81);
        assert_eq!(catalog.name_of(state.chunks_under()[0]), "ChunkGranite");
        assert_eq!(catalog.name_of(state.blocks_under()[0]), "BlocksGranite");
    }

    #[test]
    fn test_spawn_falls_back_to_natural_rock() {
        let catalog = Catalog::with_defaults();
        let config = QuarryConfig::default();
        let terrain = FlatTerrain(
            None,
            vec!["Marble".into(), "Marble".into(), "Obsidian".into()],
        );

        let state = QuarryState::spawn(
            StructureId::new(),
            QuarryVariant::Standard,
            footprint(),
            &terrain,
            &catalog,
            &config,
        );

        // Obsidian has no chunk or block material, duplicates collapse
        assert_eq!(state.rock_families, vec!["Marble".to_string()]);
    }

    #[test]
    fn test_spawn_falls_back_to_config() {
        let catalog = Catalog::with_defaults();
        let config = QuarryConfig::default();
        let terrain = FlatTerrain(Some("Obsidian"), vec![]);

        let state = QuarryState::spawn(
            StructureId::new(),
            QuarryVariant::Mini,
            CellRect::new(Cell::new(0, 0), 5, 5),
            &terrain,
            &catalog,
            &config,
        );

        assert_eq!(state.rock_families, config.fallback_rock_families);
        assert_eq!(state.chunks_under().len(), 5);
    }

    #[test]
    fn test_capacity_bounded_by_interior() {
        let config = QuarryConfig::default();
        let state = QuarryState::new(
            StructureId::new(),
            QuarryVariant::Mini,
            CellRect::new(Cell::new(0, 0), 5, 5),
            vec!["Granite".into()],
            &config,
        );
        assert_eq!(state.interior().area(), 9);
        assert_eq!(state.occupancy.capacity(), 9);
    }

    #[test]
    fn test_toggle_mode() {
        let config = QuarryConfig::default();
        let mut state = QuarryState::new(
            StructureId::new(),
            QuarryVariant::Standard,
            footprint(),
            vec![],
            &config,
        );
        assert_eq!(state.mode, RequestKind::Resources);
        state.toggle_mode();
        assert_eq!(state.mode, RequestKind::Blocks);
        state.toggle_mode();
        assert_eq!(state.mode, RequestKind::Resources);

        state.mode = RequestKind::Disabled;
        state.toggle_mode();
        assert_eq!(state.mode, RequestKind::Disabled);

        assert!(state.auto_haul, "New quarries haul by default");
        state.toggle_auto_haul();
        assert!(!state.auto_haul);
    }

    #[test]
    fn test_materials_rebuilt_after_deserialize() {
        let catalog = Catalog::with_defaults();
        let config = QuarryConfig::default();
        let state = QuarryState::new(
            StructureId::new(),
            QuarryVariant::Standard,
            footprint(),
            vec!["Slate".into(), "Limestone".into()],
            &config,
        );

        let json = serde_json::to_string(&state).unwrap();
        let mut restored: QuarryState = serde_json::from_str(&json).unwrap();
        assert!(restored.chunks_under().is_empty());

        restored.ensure_materials(&catalog);
        assert_eq!(restored.chunks_under().len(), 2);
        assert_eq!(restored.blocks_under().len(), 2);
        assert_eq!(restored.depletion, state.depletion);
    }

    #[test]
    fn test_yield_tracker_counts() {
        let mut yields = YieldTracker::default();
        yields.record(MaterialCategory::StoneChunk, 1);
        yields.record(MaterialCategory::Resource, 40);
        yields.record(MaterialCategory::Block, 7);
        yields.record(MaterialCategory::Filler, 1);
        assert_eq!(yields.chunks_mined, 1);
        assert_eq!(yields.resources_mined, 1);
        assert_eq!(yields.blocks_mined, 7);
    }
}
