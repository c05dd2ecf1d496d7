//! Quarry Sim - mining core for a colony simulation
//!
//! Weighted resource yields, quarry depletion and sinkhole hazards, worker
//! admission and the per-worker mining task machine.

pub mod core;
pub mod materials;
pub mod mining;
pub mod quarry;
pub mod simulation;

pub use crate::core::{QuarryConfig, QuarryError, Result};
pub use materials::{Catalog, MaterialCatalog, ResourceDispenser, ResourceTable};
pub use mining::{EventLog, MiningTask, QuarryEvent, TaskOutcome, TaskPhase};
pub use quarry::{QuarryState, QuarryVariant, StructureRegistry};
pub use simulation::SimulationContext;
