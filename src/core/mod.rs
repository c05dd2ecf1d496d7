pub mod config;
pub mod error;
pub mod rng;
pub mod types;

pub use config::QuarryConfig;
pub use error::{QuarryError, Result};
pub use types::{Cell, CellRect, StructureId, Tick, WorkerId};
