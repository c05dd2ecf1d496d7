//! Weighted resource table - which material a resource-mining action yields
//!
//! The table is built from the catalog's resource rocks. Each ore gets a
//! weight from three inputs:
//! - deep-deposit commonality, clamped so one ore cannot dominate
//! - surface scatter commonality, run through a falling response curve so
//!   rocks that are scattered everywhere count for less than their raw value
//! - market value, inversely (expensive ores are rarer)
//!
//! A synthesized component entry is appended at 1.5x the rarest ore weight.
//! Hosts may then merge extra weights from a settings file, and players may
//! add, remove or re-weight entries at any time between draws.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::{QuarryError, Result};
use crate::materials::catalog::{MaterialCatalog, MaterialCategory, MaterialKind, MineableSource};

/// Starting point when searching for the rarest ore weight
pub const MAX_WEIGHT: u32 = 1000;

/// Deep commonality above this is ignored
const DEEP_COMMONALITY_CAP: f32 = 1.5;

/// Scatter commonality response: (commonality, multiplier)
const SCATTER_CURVE: [(f32, f32); 6] = [
    (0.0, 10.0),
    (0.02, 9.0),
    (0.04, 8.0),
    (0.06, 6.0),
    (0.08, 3.0),
    (f32::MAX, 1.0),
];

/// Piecewise-linear evaluation, clamped to the first and last points
fn evaluate_curve(points: &[(f32, f32)], x: f32) -> f32 {
    let (first_x, first_y) = points[0];
    if x <= first_x {
        return first_y;
    }
    for pair in points.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x <= x1 {
            let t = (x - x0) / (x1 - x0);
            return y0 + (y1 - y0) * t;
        }
    }
    points[points.len() - 1].1
}

/// Scatter commonality weighted by its own response
pub fn scatter_response(scatter_commonality: f32) -> f32 {
    scatter_commonality * evaluate_curve(&SCATTER_CURVE, scatter_commonality)
}

/// One weighted material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub kind: MaterialKind,
    pub weight: u32,
}

/// Weighted list of materials with a cached total
///
/// Serializes as a plain list of entries; the total and draw order are
/// rebuilt on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<WeightEntry>", into = "Vec<WeightEntry>")]
pub struct ResourceTable {
    entries: Vec<WeightEntry>,
    total_weight: u64,
    /// Entry indices sorted ascending by weight (stable)
    draw_order: Vec<usize>,
}

impl From<Vec<WeightEntry>> for ResourceTable {
    fn from(entries: Vec<WeightEntry>) -> Self {
        let mut table = Self::new();
        for entry in entries {
            table.insert_additive(entry.kind, entry.weight);
        }
        table.refresh();
        table
    }
}

impl From<ResourceTable> for Vec<WeightEntry> {
    fn from(table: ResourceTable) -> Self {
        table.entries
    }
}

/// Weight of one resource rock, or `None` if it is not a usable ore source
pub fn natural_weight(catalog: &dyn MaterialCatalog, source: &MineableSource) -> Option<(MaterialKind, u32)> {
    if !source.is_resource_rock {
        tracing::debug!("Skipping {}: not a resource rock", source.name);
        return None;
    }
    let Some(yield_name) = source.yields.as_deref() else {
        tracing::warn!("Unable to process {} as a mineable resource rock: it yields nothing", source.name);
        return None;
    };
    let Some(kind) = catalog.find_material(yield_name) else {
        tracing::warn!(
            "Unable to process {} as a mineable resource rock: unknown material {}",
            source.name,
            yield_name
        );
        return None;
    };
    let def = catalog.material(kind)?;
    if def.category == MaterialCategory::Component {
        tracing::debug!("Skipping {}: components get a synthesized entry", source.name);
        return None;
    }

    let deep = def.deep_commonality.clamp(0.0, DEEP_COMMONALITY_CAP);
    let scatter = scatter_response(source.scatter_commonality);
    let market = (def.market_value / 5.0).max(2.0);

    let weight = ((deep * scatter * 50.0) / market).floor().max(0.0) as u32;
    Some((kind, weight))
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from every resource rock in the catalog, then append
    /// the component entry
    pub fn build(catalog: &dyn MaterialCatalog, component_material: &str) -> Self {
        let mut table = Self::new();

        for source in catalog.mineable_sources() {
            if let Some((kind, weight)) = natural_weight(catalog, source) {
                table.insert_additive(kind, weight);
            }
        }

        if table.entries.is_empty() {
            tracing::warn!("No mineable resources found in the catalog; resource table is empty");
            table.refresh();
            return table;
        }

        let rarest = table
            .entries
            .iter()
            .map(|e| e.weight)
            .fold(MAX_WEIGHT, u32::min);
        let component_weight = (rarest + rarest / 2).max(1);

        match catalog.find_material(component_material) {
            Some(kind) => table.insert_additive(kind, component_weight),
            None => tracing::warn!(
                "Component material {} is not in the catalog; no component entry added",
                component_material
            ),
        }

        table.refresh();
        tracing::debug!(
            "Built resource table: {} entries, total weight {}",
            table.entries.len(),
            table.total_weight
        );
        table
    }

    /// Discard all edits and rebuild from the catalog
    pub fn reset(&mut self, catalog: &dyn MaterialCatalog, component_material: &str) {
        *self = Self::build(catalog, component_material);
    }

    pub fn entries(&self) -> &[WeightEntry] {
        &self.entries
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn weight_of(&self, kind: MaterialKind) -> Option<u32> {
        self.entries.iter().find(|e| e.kind == kind).map(|e| e.weight)
    }

    pub fn contains(&self, kind: MaterialKind) -> bool {
        self.weight_of(kind).is_some()
    }

    /// Add weight to a material, creating its entry if needed
    pub fn add(&mut self, kind: MaterialKind, weight: u32) {
        self.insert_additive(kind, weight);
        self.refresh();
    }

    /// Merge several (kind, weight) pairs additively
    pub fn merge<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (MaterialKind, u32)>,
    {
        for (kind, weight) in pairs {
            self.insert_additive(kind, weight);
        }
        self.refresh();
    }

    /// Overwrite a material's weight, creating the entry if needed.
    /// Returns the previous weight.
    pub fn set_weight(&mut self, kind: MaterialKind, weight: u32) -> Option<u32> {
        let previous = match self.entries.iter_mut().find(|e| e.kind == kind) {
            Some(entry) => Some(std::mem::replace(&mut entry.weight, weight)),
            None => {
                self.entries.push(WeightEntry { kind, weight });
                None
            }
        };
        self.refresh();
        previous
    }

    /// Remove a material's entry, returning its weight. The last entry can
    /// never be removed.
    pub fn remove(&mut self, kind: MaterialKind) -> Result<u32> {
        let Some(index) = self.entries.iter().position(|e| e.kind == kind) else {
            return Err(QuarryError::MissingEntry(format!("{:?}", kind)));
        };
        if self.entries.len() < 2 {
            return Err(QuarryError::LastEntry);
        }
        let removed = self.entries.remove(index);
        self.refresh();
        Ok(removed.weight)
    }

    /// Merge weights from a TOML overrides file:
    ///
    /// ```toml
    /// [[weights]]
    /// material = "Gold"
    /// weight = 40
    /// ```
    ///
    /// Unknown materials are skipped. Returns how many entries were merged.
    pub fn merge_from_toml(&mut self, content: &str, catalog: &dyn MaterialCatalog) -> Result<usize> {
        let data: TomlWeights = toml::from_str(content)?;
        let mut merged = 0;
        for entry in data.weights {
            match catalog.find_material(&entry.material) {
                Some(kind) => {
                    self.insert_additive(kind, entry.weight);
                    merged += 1;
                }
                None => tracing::warn!("Ignoring weight override for unknown material {}", entry.material),
            }
        }
        self.refresh();
        Ok(merged)
    }

    /// Weighted random draw
    ///
    /// Walks entries in ascending weight order. Returns `None` only when the
    /// table has no weight at all.
    pub fn take_one(&self, rng: &mut impl Rng) -> Option<MaterialKind> {
        if self.total_weight == 0 {
            tracing::warn!("Tried to draw from an empty resource table");
            return None;
        }

        let mut roll = rng.gen_range(0..self.total_weight);
        let fallback = self.draw_order.last().map(|&i| self.entries[i].kind);

        for &i in &self.draw_order {
            let weight = self.entries[i].weight as u64;
            if roll < weight {
                return Some(self.entries[i].kind);
            }
            roll -= weight;
        }

        fallback
    }

    /// Share of the total weight held by `kind`, in percent. Display only.
    pub fn percentage_of(&self, kind: MaterialKind) -> f32 {
        if self.total_weight == 0 {
            return 0.0;
        }
        let weight = self.weight_of(kind).unwrap_or(0);
        100.0 * weight as f32 / self.total_weight as f32
    }

    fn insert_additive(&mut self, kind: MaterialKind, weight: u32) {
        match self.entries.iter_mut().find(|e| e.kind == kind) {
            Some(entry) => entry.weight = entry.weight.saturating_add(weight),
            None => self.entries.push(WeightEntry { kind, weight }),
        }
    }

    /// Recompute the total and draw order. Every mutation ends here.
    fn refresh(&mut self) {
        self.total_weight = self.entries.iter().map(|e| e.weight as u64).sum();
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by_key(|&i| self.entries[i].weight);
        self.draw_order = order;
    }
}

/// TOML representation of a weight overrides file
#[derive(Debug, Deserialize)]
struct TomlWeights {
    #[serde(default)]
    weights: Vec<TomlWeight>,
}

#[derive(Debug, Deserialize)]
struct TomlWeight {
    material: String,
    weight: u32,
}
