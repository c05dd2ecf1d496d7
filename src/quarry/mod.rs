//! Quarry structures: variants, per-structure state, depletion, occupancy
//! and the registry of live structures

pub mod depletion;
pub mod occupancy;
pub mod registry;
pub mod state;
pub mod variant;

pub use depletion::{DepletionState, DepletionTracker};
pub use occupancy::OccupancyController;
pub use registry::{CompositeQuarry, Removal, StructureRegistry};
pub use state::{QuarryState, TerrainSource, YieldTracker};
pub use variant::QuarryVariant;
