//! Registry of live quarry structures owned by the simulation context
//!
//! Standalone quarries register one state each. A composite quarry is one
//! logical structure made of a base and four quadrant parts; its parts are
//! registered and removed together.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::error::{QuarryError, Result};
use crate::core::types::{Cell, StructureId};
use crate::quarry::state::QuarryState;

/// Offsets of the four quadrant parts relative to the composite base
pub const QUADRANT_OFFSETS: [(i32, i32); 4] = [(-3, 3), (3, 3), (-3, -3), (3, -3)];

/// Quadrant positions around a composite base
pub fn quadrant_positions(base: Cell) -> [Cell; 4] {
    QUADRANT_OFFSETS.map(|(dx, dz)| base.offset(dx, dz))
}

/// One logical quarry made of several placed parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeQuarry {
    pub base: StructureId,
    pub parts: Vec<StructureId>,
}

impl CompositeQuarry {
    pub fn includes(&self, id: StructureId) -> bool {
        self.base == id || self.parts.contains(&id)
    }
}

/// Result of removing a structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// Every state that left the registry
    pub removed: Vec<StructureId>,
    /// First quarry removal ever seen by this registry
    pub first_removal: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructureRegistry {
    structures: AHashMap<StructureId, QuarryState>,
    composite: Option<CompositeQuarry>,
    removal_notice_sent: bool,
}

impl StructureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a standalone quarry
    pub fn register(&mut self, state: QuarryState) -> Result<StructureId> {
        let id = state.id;
        if self.structures.contains_key(&id) || self.composite_includes(id) {
            return Err(QuarryError::DuplicateStructure(id));
        }
        self.structures.insert(id, state);
        Ok(id)
    }

    /// Register a composite quarry and all its parts in one step.
    ///
    /// Nothing is inserted unless every part is new and no composite exists.
    pub fn register_composite(&mut self, base: StructureId, parts: Vec<QuarryState>) -> Result<()> {
        if let Some(existing) = &self.composite {
            return Err(QuarryError::QuarryAlreadyPresent(existing.base));
        }
        if self.structures.contains_key(&base) {
            return Err(QuarryError::DuplicateStructure(base));
        }
        for (i, part) in parts.iter().enumerate() {
            let clashes_earlier = parts[..i].iter().any(|p| p.id == part.id);
            if part.id == base || clashes_earlier || self.structures.contains_key(&part.id) {
                return Err(QuarryError::DuplicateStructure(part.id));
            }
        }

        let ids = parts.iter().map(|p| p.id).collect();
        for part in parts {
            self.structures.insert(part.id, part);
        }
        self.composite = Some(CompositeQuarry { base, parts: ids });
        info!(base = ?base, "Registered composite quarry");
        Ok(())
    }

    /// Remove a structure. Removing any member of the composite removes
    /// the whole composite.
    pub fn deregister(&mut self, id: StructureId) -> Result<Removal> {
        let removed = if self.composite_includes(id) {
            let composite = self.composite.take().map(|c| c.parts).unwrap_or_default();
            for part in &composite {
                if self.structures.remove(part).is_none() {
                    warn!(part = ?part, "Composite part was already gone");
                }
            }
            composite
        } else if self.structures.remove(&id).is_some() {
            vec![id]
        } else {
            return Err(QuarryError::UnknownStructure(id));
        };

        let first_removal = !self.removal_notice_sent;
        self.removal_notice_sent = true;
        Ok(Removal { removed, first_removal })
    }

    pub fn is_live(&self, id: StructureId) -> bool {
        self.structures.contains_key(&id)
    }

    pub fn get(&self, id: StructureId) -> Option<&QuarryState> {
        self.structures.get(&id)
    }

    pub fn get_mut(&mut self, id: StructureId) -> Option<&mut QuarryState> {
        self.structures.get_mut(&id)
    }

    pub fn composite(&self) -> Option<&CompositeQuarry> {
        self.composite.as_ref()
    }

    /// Composite base a part belongs to
    pub fn parent_of(&self, id: StructureId) -> Option<StructureId> {
        self.composite
            .as_ref()
            .filter(|c| c.parts.contains(&id))
            .map(|c| c.base)
    }

    pub fn removal_notice_sent(&self) -> bool {
        self.removal_notice_sent
    }

    /// Live structure ids in a stable order
    pub fn ids(&self) -> Vec<StructureId> {
        let mut ids: Vec<_> = self.structures.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StructureId, &QuarryState)> {
        self.structures.iter()
    }

    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    fn composite_includes(&self, id: StructureId) -> bool {
        self.composite.as_ref().is_some_and(|c| c.includes(id))
    }
}
