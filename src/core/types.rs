//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for workers (pawns)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub Uuid);

impl WorkerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorkerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for placed quarry structures and their parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructureId(pub Uuid);

impl StructureId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StructureId {
    fn default() -> Self {
        Self::new()
    }
}

/// Game tick counter (simulation time unit)
pub type Tick = u64;

/// A map cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub z: i32,
}

impl Cell {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self { x: self.x + dx, z: self.z + dz }
    }
}

impl std::ops::Add for Cell {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, z: self.z + rhs.z }
    }
}

/// Axis-aligned rectangle of cells, inclusive of `min` and exclusive of `min + size`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRect {
    pub min: Cell,
    pub width: u32,
    pub height: u32,
}

impl CellRect {
    pub fn new(min: Cell, width: u32, height: u32) -> Self {
        Self { min, width, height }
    }

    pub fn area(&self) -> u32 {
        self.width * self.height
    }

    pub fn contains(&self, c: Cell) -> bool {
        c.x >= self.min.x
            && c.z >= self.min.z
            && c.x < self.min.x + self.width as i32
            && c.z < self.min.z + self.height as i32
    }

    /// Shrink the rect by `by` cells on every side. Collapses to zero size
    /// rather than inverting.
    pub fn contracted_by(&self, by: u32) -> Self {
        Self {
            min: self.min.offset(by as i32, by as i32),
            width: self.width.saturating_sub(by * 2),
            height: self.height.saturating_sub(by * 2),
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let min = self.min;
        (0..self.height as i32)
            .flat_map(move |dz| (0..self.width as i32).map(move |dx| min.offset(dx, dz)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_id_equality() {
        let a = WorkerId::new();
        let b = a;
        assert_eq!(a, b);
        assert_ne!(a, WorkerId::new());
    }

    #[test]
    fn test_cell_rect_contains() {
        let rect = CellRect::new(Cell::new(0, 0), 3, 2);
        assert!(rect.contains(Cell::new(0, 0)));
        assert!(rect.contains(Cell::new(2, 1)));
        assert!(!rect.contains(Cell::new(3, 1)));
        assert!(!rect.contains(Cell::new(0, 2)));
        assert!(!rect.contains(Cell::new(-1, 0)));
    }

    #[test]
    fn test_cell_rect_cells_count() {
        let rect = CellRect::new(Cell::new(5, 5), 4, 3);
        assert_eq!(rect.cells().count(), 12);
        assert!(rect.cells().all(|c| rect.contains(c)));
    }

    #[test]
    fn test_contracted_by() {
        // 9x9 standard quarry with wall thickness 2 leaves a 5x5 pit
        let rect = CellRect::new(Cell::new(0, 0), 9, 9);
        let inner = rect.contracted_by(2);
        assert_eq!(inner.min, Cell::new(2, 2));
        assert_eq!(inner.area(), 25);

        // Over-contraction collapses instead of wrapping
        let tiny = CellRect::new(Cell::new(0, 0), 3, 3).contracted_by(2);
        assert_eq!(tiny.area(), 0);
        assert_eq!(tiny.cells().count(), 0);
    }
}
