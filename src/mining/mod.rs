//! Mining: host collaborators, quarry events and the per-worker task machine

pub mod collaborators;
pub mod events;
pub mod task;

pub use collaborators::{
    AccessPolicy, FixedStorage, FixedWorkerStats, ForbiddenSet, MiningContext, StorageRouter,
    WorkerStats,
};
pub use events::{EventLog, LoggedEvent, QuarryEvent};
pub use task::{FailReason, HaulPlan, MinedOutput, MiningTask, Route, TaskOutcome, TaskPhase};
