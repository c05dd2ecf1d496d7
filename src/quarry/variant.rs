//! Quarry structure variants

use serde::{Deserialize, Serialize};

/// Size class of a quarry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuarryVariant {
    Standard,
    Mini,
}

impl QuarryVariant {
    /// Health damage dealt per mining action. Small pits wear out faster.
    pub fn damage_multiplier(&self) -> u32 {
        match self {
            QuarryVariant::Standard => 1,
            QuarryVariant::Mini => 3,
        }
    }

    /// Completed jobs between sinkhole checks
    pub fn hazard_interval(&self) -> u32 {
        match self {
            QuarryVariant::Standard => 100,
            QuarryVariant::Mini => 75,
        }
    }

    /// Rim cells that are wall rather than workable pit floor
    pub fn wall_thickness(&self) -> u32 {
        match self {
            QuarryVariant::Standard => 2,
            QuarryVariant::Mini => 1,
        }
    }

    /// Footprint (width, height) in cells
    pub fn size(&self) -> (u32, u32) {
        match self {
            QuarryVariant::Standard => (9, 9),
            QuarryVariant::Mini => (5, 5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mini_wears_faster() {
        assert!(QuarryVariant::Mini.damage_multiplier() > QuarryVariant::Standard.damage_multiplier());
        assert!(QuarryVariant::Mini.hazard_interval() < QuarryVariant::Standard.hazard_interval());
    }

    #[test]
    fn test_interior_is_non_empty() {
        for variant in [QuarryVariant::Standard, QuarryVariant::Mini] {
            let (w, h) = variant.size();
            let t = variant.wall_thickness();
            assert!(w > 2 * t && h > 2 * t, "{:?} has no pit floor", variant);
        }
    }
}
