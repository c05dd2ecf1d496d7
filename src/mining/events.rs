//! Quarry events for an external notification layer

use serde::Serialize;

use crate::core::types::{StructureId, Tick, WorkerId};
use crate::materials::catalog::MaterialKind;
use crate::mining::task::TaskOutcome;

/// Something the host may want to show or log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QuarryEvent {
    /// A sinkhole opened under a worker
    HazardTriggered {
        structure: StructureId,
        worker: WorkerId,
        /// Crush damage the host should apply to the worker
        worker_damage: f32,
        /// Health points the quarry lost on top of the normal wear
        extra_depletion: u32,
    },
    /// The quarry has no health left
    Depleted { structure: StructureId },
    /// Dispense produced nothing usable and a substitute was placed
    DispenseFallback {
        structure: StructureId,
        worker: WorkerId,
        substitute: Option<MaterialKind>,
    },
    /// A stack at or above the large vein threshold
    LargeVein {
        structure: StructureId,
        worker: WorkerId,
        kind: MaterialKind,
        quantity: u32,
    },
    /// Mining produced failure rubble
    MiningFailed { structure: StructureId, worker: WorkerId },
    /// Output was marked for hauling
    HaulDesignated { structure: StructureId, kind: MaterialKind },
    /// Pick strike effect
    PickHit { structure: StructureId, worker: WorkerId },
    /// Mining experience earned during one mining phase
    SkillExperience { worker: WorkerId, amount: f32 },
    TaskFinished {
        worker: WorkerId,
        structure: StructureId,
        outcome: TaskOutcome,
    },
    /// One-time notice for the first quarry ever removed
    FirstQuarryRemoved { structure: StructureId },
    /// A resource draw was attempted on an empty table
    TableEmpty,
}

impl QuarryEvent {
    /// Structure the event concerns, if any
    pub fn structure(&self) -> Option<StructureId> {
        match self {
            QuarryEvent::HazardTriggered { structure, .. }
            | QuarryEvent::Depleted { structure }
            | QuarryEvent::DispenseFallback { structure, .. }
            | QuarryEvent::LargeVein { structure, .. }
            | QuarryEvent::MiningFailed { structure, .. }
            | QuarryEvent::HaulDesignated { structure, .. }
            | QuarryEvent::PickHit { structure, .. }
            | QuarryEvent::TaskFinished { structure, .. }
            | QuarryEvent::FirstQuarryRemoved { structure } => Some(*structure),
            QuarryEvent::SkillExperience { .. } | QuarryEvent::TableEmpty => None,
        }
    }
}

/// An event with the tick it happened on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedEvent {
    pub tick: Tick,
    pub event: QuarryEvent,
}

/// Append-only event sink, drained by the host
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<LoggedEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tick: Tick, event: QuarryEvent) {
        self.events.push(LoggedEvent { tick, event });
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoggedEvent> {
        self.events.iter()
    }

    pub fn for_structure(&self, structure: StructureId) -> impl Iterator<Item = &LoggedEvent> {
        self.events
            .iter()
            .filter(move |e| e.event.structure() == Some(structure))
    }

    /// Number of events matching a predicate
    pub fn count(&self, pred: impl Fn(&QuarryEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(&e.event)).count()
    }

    pub fn drain(&mut self) -> Vec<LoggedEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_by_structure() {
        let mut log = EventLog::new();
        let a = StructureId::new();
        let b = StructureId::new();
        log.push(1, QuarryEvent::Depleted { structure: a });
        log.push(2, QuarryEvent::Depleted { structure: b });
        log.push(3, QuarryEvent::TableEmpty);

        let for_a: Vec<_> = log.for_structure(a).collect();
        assert_eq!(for_a.len(), 1);
        assert_eq!(for_a[0].tick, 1);
    }

    #[test]
    fn test_drain_empties_log() {
        let mut log = EventLog::new();
        log.push(5, QuarryEvent::TableEmpty);
        let drained = log.drain();
        assert_eq!(drained.len(), 1);
        assert!(log.is_empty());
    }

    #[test]
    fn test_count_matching() {
        let mut log = EventLog::new();
        let s = StructureId::new();
        log.push(1, QuarryEvent::PickHit { structure: s, worker: WorkerId::new() });
        log.push(2, QuarryEvent::PickHit { structure: s, worker: WorkerId::new() });
        log.push(3, QuarryEvent::TableEmpty);
        assert_eq!(log.count(|e| matches!(e, QuarryEvent::PickHit { .. })), 2);
    }
}
