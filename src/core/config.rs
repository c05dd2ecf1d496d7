//! Quarry configuration with documented constants
//!
//! All tunable numbers are collected here with explanations of their purpose
//! and how they interact with each other. The config is passed explicitly to
//! the components that need it; there is no process-wide instance.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{QuarryError, Result};

/// Health values above this are treated as "never depletes"
pub const INEXHAUSTIBLE_HEALTH_THRESHOLD: u32 = 10_000;

/// Configuration for quarry mining
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarryConfig {
    // === DEPLETION ===
    /// Health points of a freshly dug quarry
    ///
    /// Every completed mining action removes `damage_multiplier` points
    /// (see `QuarryVariant`). At the default of 2000 a standard quarry
    /// survives 2000 jobs, a mini quarry about 666.
    /// Anything above 10000 makes quarries inexhaustible.
    pub max_health: u32,

    // === DISPENSE ROLLS ===
    /// Percent chance (0-100) a mining action produces junk instead of a
    /// resource or block
    pub junk_chance: u32,

    /// Percent chance (0-100) that junk is a usable stone chunk rather than
    /// rubble. Only rolled when mining resources.
    pub chunk_chance: u32,

    /// Inclusive range of blocks produced by a successful block cut
    pub block_yield_min: u32,
    pub block_yield_max: u32,

    // === MINING TIMING ===
    /// Ticks an unskilled-to-average worker spends on one mining action
    ///
    /// Scaled by skill: level 0 takes 1.5x, level 20 takes 0.5x.
    pub base_mining_ticks: u32,

    /// Ticks between pick hits at mining speed 1.0
    pub base_ticks_between_pick_hits: u32,

    /// Mining experience granted per tick spent in the mining phase
    pub mining_experience_per_tick: f32,

    // === HAZARDS ===
    /// Crush damage dealt to a worker caught by a sinkhole
    pub hazard_worker_damage: f32,

    /// Inclusive range of extra health damage a sinkhole deals to the quarry
    pub hazard_extra_damage_min: u32,
    pub hazard_extra_damage_max: u32,

    // === OUTPUT ===
    /// Stack size at or above which a yield is announced as a large vein
    pub large_vein_threshold: u32,

    /// Material produced by failed mining actions
    pub rubble_material: String,

    /// Material substituted when a dispense produces nothing usable
    pub slag_material: String,

    /// Synthesized rare entry added after the natural ores
    pub component_material: String,

    /// Rock families used when neither the footprint nor the map provides any
    pub fallback_rock_families: Vec<String>,

    // === OCCUPANCY ===
    /// Hard upper bound for the per-quarry worker limit
    pub max_workers_limit: u32,

    /// Worker limit a freshly spawned quarry starts with
    pub default_max_workers: u32,

    // === DETERMINISM ===
    /// Seed for the simulation random source
    pub seed: u64,
}

impl Default for QuarryConfig {
    fn default() -> Self {
        Self {
            max_health: 2000,

            junk_chance: 60,
            chunk_chance: 50,
            block_yield_min: 5,
            block_yield_max: 10,

            base_mining_ticks: 3000,
            base_ticks_between_pick_hits: 120,
            mining_experience_per_tick: 0.11,

            hazard_worker_damage: 9.0,
            hazard_extra_damage_min: 1,
            hazard_extra_damage_max: 3,

            large_vein_threshold: 30,
            rubble_material: "RockRubble".into(),
            slag_material: "ChunkSlagSteel".into(),
            component_material: "ComponentIndustrial".into(),
            fallback_rock_families: ["Sandstone", "Limestone", "Granite", "Marble", "Slate"]
                .iter()
                .map(|s| s.to_string())
                .collect(),

            max_workers_limit: 32,
            default_max_workers: 32,

            seed: 12345,
        }
    }
}

impl QuarryConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective max health, `None` when quarries never deplete
    pub fn effective_max_health(&self) -> Option<u32> {
        if self.max_health > INEXHAUSTIBLE_HEALTH_THRESHOLD {
            None
        } else {
            Some(self.max_health)
        }
    }

    pub fn junk_probability(&self) -> f64 {
        self.junk_chance.min(100) as f64 / 100.0
    }

    pub fn chunk_probability(&self) -> f64 {
        self.chunk_chance.min(100) as f64 / 100.0
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_health == 0 {
            return Err(QuarryError::InvalidConfig("max_health must be positive".into()));
        }

        if self.junk_chance > 100 || self.chunk_chance > 100 {
            return Err(QuarryError::InvalidConfig(format!(
                "junk_chance ({}) and chunk_chance ({}) are percentages and must be <= 100",
                self.junk_chance, self.chunk_chance
            )));
        }

        if self.block_yield_min == 0 || self.block_yield_min > self.block_yield_max {
            return Err(QuarryError::InvalidConfig(format!(
                "block yield range {}..={} is empty or starts at zero",
                self.block_yield_min, self.block_yield_max
            )));
        }

        if self.hazard_extra_damage_min > self.hazard_extra_damage_max {
            return Err(QuarryError::InvalidConfig(format!(
                "hazard extra damage range {}..={} is empty",
                self.hazard_extra_damage_min, self.hazard_extra_damage_max
            )));
        }

        if self.base_ticks_between_pick_hits == 0 {
            return Err(QuarryError::InvalidConfig(
                "base_ticks_between_pick_hits must be positive".into(),
            ));
        }

        if self.default_max_workers > self.max_workers_limit {
            return Err(QuarryError::InvalidConfig(format!(
                "default_max_workers ({}) exceeds max_workers_limit ({})",
                self.default_max_workers, self.max_workers_limit
            )));
        }

        if self.fallback_rock_families.is_empty() {
            return Err(QuarryError::InvalidConfig(
                "fallback_rock_families must name at least one rock".into(),
            ));
        }

        Ok(())
    }

    /// Parse and validate a config from a TOML string. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: QuarryConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
