//! Materials: catalog lookups, weighted resource table and output rolls

pub mod catalog;
pub mod dispenser;
pub mod table;

pub use catalog::{Catalog, MaterialCatalog, MaterialCategory, MaterialDef, MaterialKind, MineableSource};
pub use dispenser::{DispenseResult, HazardOutcome, RequestKind, ResourceDispenser};
pub use table::{ResourceTable, WeightEntry};
