//! Material catalog - the externally defined set of spawnable materials
//!
//! The quarry core never invents materials. It resolves names through a
//! `MaterialCatalog` supplied by the host and only ever holds `MaterialKind`
//! handles. `Catalog` is an in-memory implementation with TOML loading, used
//! by the simulation binary and the tests.

use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;

/// Opaque handle for a catalog material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialKind(pub u32);

/// Broad classification of a material, used by dispense and routing rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialCategory {
    /// Ores and other valuables produced by resource mining
    Resource,
    /// Raw stone chunks, cut into blocks elsewhere
    StoneChunk,
    /// Cut stone blocks
    Block,
    /// Worthless output such as rubble
    Filler,
    /// High-value manufactured parts
    Component,
}

/// Catalog entry for a spawnable material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDef {
    pub name: String,
    pub category: MaterialCategory,
    #[serde(default)]
    pub market_value: f32,
    #[serde(default = "default_stack_limit")]
    pub stack_limit: u32,
    /// How common this material is in deep deposits (only meaningful for ores)
    #[serde(default)]
    pub deep_commonality: f32,
    #[serde(default)]
    pub uses_hit_points: bool,
    /// Whether hauling should be requested automatically when this is mined
    #[serde(default)]
    pub designate_haulable: bool,
}

fn default_stack_limit() -> u32 {
    1
}

impl MaterialDef {
    pub fn new(name: impl Into<String>, category: MaterialCategory) -> Self {
        Self {
            name: name.into(),
            category,
            market_value: 0.0,
            stack_limit: 1,
            deep_commonality: 0.0,
            uses_hit_points: false,
            designate_haulable: false,
        }
    }

    pub fn with_value(mut self, market_value: f32) -> Self {
        self.market_value = market_value;
        self
    }

    pub fn with_stack_limit(mut self, stack_limit: u32) -> Self {
        self.stack_limit = stack_limit;
        self
    }

    pub fn with_deep_commonality(mut self, deep_commonality: f32) -> Self {
        self.deep_commonality = deep_commonality;
        self
    }

    pub fn with_hit_points(mut self) -> Self {
        self.uses_hit_points = true;
        self
    }

    pub fn haulable(mut self) -> Self {
        self.designate_haulable = true;
        self
    }

    /// Materials that only ever spawn one at a time
    pub fn is_single_unit(&self) -> bool {
        self.stack_limit <= 1
    }
}

/// A minable rock formation that may yield a material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MineableSource {
    pub name: String,
    #[serde(default)]
    pub is_resource_rock: bool,
    /// Name of the material this rock yields when mined
    #[serde(default)]
    pub yields: Option<String>,
    /// How often this rock is scattered on the map surface
    #[serde(default)]
    pub scatter_commonality: f32,
}

impl MineableSource {
    pub fn resource_rock(name: impl Into<String>, yields: impl Into<String>, scatter: f32) -> Self {
        Self {
            name: name.into(),
            is_resource_rock: true,
            yields: Some(yields.into()),
            scatter_commonality: scatter,
        }
    }
}

/// Material lookups the quarry core consumes from its host
pub trait MaterialCatalog {
    fn find_material(&self, name: &str) -> Option<MaterialKind>;

    fn material(&self, kind: MaterialKind) -> Option<&MaterialDef>;

    /// Every minable rock the host knows about, valid or not
    fn mineable_sources(&self) -> &[MineableSource];

    fn name_of(&self, kind: MaterialKind) -> &str {
        self.material(kind).map(|d| d.name.as_str()).unwrap_or("<unknown>")
    }

    fn category_of(&self, kind: MaterialKind) -> Option<MaterialCategory> {
        self.material(kind).map(|d| d.category)
    }
}

/// Chunk material for a rock family, following the `Chunk<Family>` naming convention
pub fn chunk_for_family(catalog: &dyn MaterialCatalog, family: &str) -> Option<MaterialKind> {
    catalog.find_material(&format!("Chunk{}", family))
}

/// Block material for a rock family, following the `Blocks<Family>` naming convention
pub fn blocks_for_family(catalog: &dyn MaterialCatalog, family: &str) -> Option<MaterialKind> {
    catalog.find_material(&format!("Blocks{}", family))
}

/// A rock family is quarryable only if both its chunk and its blocks exist
pub fn is_valid_rock_family(catalog: &dyn MaterialCatalog, family: &str) -> bool {
    chunk_for_family(catalog, family).is_some() && blocks_for_family(catalog, family).is_some()
}

/// In-memory material catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    materials: Vec<MaterialDef>,
    index: AHashMap<String, MaterialKind>,
    sources: Vec<MineableSource>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a material, or replace the definition of an existing one while
    /// keeping its handle stable
    pub fn add_material(&mut self, def: MaterialDef) -> MaterialKind {
        if let Some(&kind) = self.index.get(&def.name) {
            self.materials[kind.0 as usize] = def;
            return kind;
        }
        let kind = MaterialKind(self.materials.len() as u32);
        self.index.insert(def.name.clone(), kind);
        self.materials.push(def);
        kind
    }

    pub fn add_source(&mut self, source: MineableSource) {
        self.sources.push(source);
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialKind, &MaterialDef)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(i, def)| (MaterialKind(i as u32), def))
    }

    /// A small stock catalog: five stone families, common ores, rubble, slag
    /// and components
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();

        for family in ["Sandstone", "Granite", "Limestone", "Slate", "Marble"] {
            catalog.add_material(
                MaterialDef::new(format!("Chunk{}", family), MaterialCategory::StoneChunk)
                    .with_stack_limit(1)
                    .haulable(),
            );
            catalog.add_material(
                MaterialDef::new(format!("Blocks{}", family), MaterialCategory::Block)
                    .with_value(1.0)
                    .with_stack_limit(75)
                    .with_hit_points(),
            );
            // Plain rock is minable but not a resource rock
            catalog.add_source(MineableSource {
                name: family.to_string(),
                is_resource_rock: false,
                yields: Some(format!("Chunk{}", family)),
                scatter_commonality: 0.0,
            });
        }

        catalog.add_material(MaterialDef::new("RockRubble", MaterialCategory::Filler));
        catalog.add_material(
            MaterialDef::new("ChunkSlagSteel", MaterialCategory::Resource)
                .with_value(2.0)
                .haulable(),
        );
        catalog.add_material(
            MaterialDef::new("ComponentIndustrial", MaterialCategory::Component)
                .with_value(32.0)
                .with_stack_limit(50)
                .with_hit_points(),
        );

        let ores = [
            // name, market value, stack limit, deep commonality, scatter commonality
            ("Steel", 1.9, 75, 4.0, 1.0),
            ("Silver", 1.0, 500, 2.0, 0.05),
            ("Gold", 10.0, 500, 1.0, 0.2),
            ("Plasteel", 9.0, 75, 0.5, 0.05),
            ("Uranium", 6.0, 75, 0.5, 0.1),
            ("Jade", 5.0, 75, 0.5, 0.1),
        ];
        for (name, value, stack, deep, scatter) in ores {
            catalog.add_material(
                MaterialDef::new(name, MaterialCategory::Resource)
                    .with_value(value)
                    .with_stack_limit(stack)
                    .with_deep_commonality(deep)
                    .with_hit_points(),
            );
            catalog.add_source(MineableSource::resource_rock(
                format!("Mineable{}", name),
                name,
                scatter,
            ));
        }

        // Component rocks exist but are handled by the synthesized table entry
        catalog.add_source(MineableSource::resource_rock(
            "MineableComponentsIndustrial",
            "ComponentIndustrial",
            1.0,
        ));

        catalog
    }

    /// Load a catalog from a TOML file
    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse a catalog from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self> {
        let data: TomlCatalog = toml::from_str(content)?;
        let mut catalog = Self::new();
        for def in data.materials {
            catalog.add_material(def);
        }
        for source in data.sources {
            catalog.add_source(source);
        }
        Ok(catalog)
    }
}

impl MaterialCatalog for Catalog {
    fn find_material(&self, name: &str) -> Option<MaterialKind> {
        self.index.get(name).copied()
    }

    fn material(&self, kind: MaterialKind) -> Option<&MaterialDef> {
        self.materials.get(kind.0 as usize)
    }

    fn mineable_sources(&self) -> &[MineableSource] {
        &self.sources
    }
}

/// TOML representation of a catalog file
#[derive(Debug, Deserialize)]
struct TomlCatalog {
    #[serde(default)]
    materials: Vec<MaterialDef>,
    #[serde(default)]
    sources: Vec<MineableSource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_lookup() {
        let catalog = Catalog::with_defaults();
        let steel = catalog.find_material("Steel").unwrap();
        assert_eq!(catalog.name_of(steel), "Steel");
        assert_eq!(catalog.category_of(steel), Some(MaterialCategory::Resource));
        assert!(catalog.find_material("Unobtainium").is_none());
    }

    #[test]
    fn test_add_material_keeps_handle_stable() {
        let mut catalog = Catalog::new();
        let a = catalog.add_material(MaterialDef::new("Gold", MaterialCategory::Resource));
        let b = catalog.add_material(
            MaterialDef::new("Gold", MaterialCategory::Resource).with_value(10.0),
        );
        assert_eq!(a, b);
        assert_eq!(catalog.len(), 1);
        assert!((catalog.material(a).unwrap().market_value - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_rock_family_validity() {
        let mut catalog = Catalog::with_defaults();
        assert!(is_valid_rock_family(&catalog, "Granite"));
        assert!(!is_valid_rock_family(&catalog, "Obsidian"));

        // A chunk without blocks is not enough
        catalog.add_material(MaterialDef::new("ChunkObsidian", MaterialCategory::StoneChunk));
        assert!(!is_valid_rock_family(&catalog, "Obsidian"));
        catalog.add_material(MaterialDef::new("BlocksObsidian", MaterialCategory::Block));
        assert!(is_valid_rock_family(&catalog, "Obsidian"));
    }

    #[test]
    fn test_parse_toml_catalog() {
        let toml = r#"
            [[materials]]
            name = "Steel"
            category = "resource"
            market_value = 1.9
            stack_limit = 75
            deep_commonality = 4.0

            [[materials]]
            name = "ChunkGranite"
            category = "stone_chunk"
            designate_haulable = true

            [[sources]]
            name = "MineableSteel"
            is_resource_rock = true
            yields = "Steel"
            scatter_commonality = 1.0
        "#;
        let catalog = Catalog::parse_toml(toml).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.mineable_sources().len(), 1);

        let chunk = catalog.find_material("ChunkGranite").unwrap();
        let def = catalog.material(chunk).unwrap();
        assert_eq!(def.category, MaterialCategory::StoneChunk);
        assert_eq!(def.stack_limit, 1);
        assert!(def.designate_haulable);
    }

    #[test]
    fn test_parse_toml_rejects_unknown_category() {
        let toml = r#"
            [[materials]]
            name = "Cheese"
            category = "dairy"
        "#;
        assert!(Catalog::parse_toml(toml).is_err());
    }
}
