//! Run-wide settings for a simulation.

use serde::{Deserialize, Serialize};

use crate::{ItemCategory, ItemKind, maze::MazeError};

/// Represents errors found while validating a [`SimulationConfig`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Maze(#[from] MazeError),
    #[error("max_energy must be positive")]
    NoEnergy,
    #[error("patrol_leg_cap must be positive")]
    NoPatrolLeg,
    #[error("survival chances must lie in [0, 1], got base {base} and cap {cap}")]
    SurvivalChance { base: f64, cap: f64 },
}

/// Magnitudes for every item tier, one list per category.
///
/// Consumable magnitudes are energy restored; weapon and armor magnitudes are
/// survival percentage points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemTable {
    pub consumables: Vec<u32>,
    pub weapons: Vec<u32>,
    pub armor: Vec<u32>,
}

impl Default for ItemTable {
    fn default() -> Self {
        ItemTable {
            consumables: vec![10, 25, 50],
            weapons: vec![10, 25, 50],
            armor: vec![10, 50],
        }
    }
}

impl ItemTable {
    fn tiers(&self, category: ItemCategory) -> &[u32] {
        match category {
            ItemCategory::Consumable => &self.consumables,
            ItemCategory::Weapon => &self.weapons,
            ItemCategory::Armor => &self.armor,
        }
    }

    /// Returns the magnitude of `kind`, or 0 for a tier the table does not list.
    pub fn magnitude(&self, kind: ItemKind) -> u32 {
        self.tiers(kind.category)
            .get(kind.tier)
            .copied()
            .unwrap_or(0)
    }

    /// Every kind in the table: consumables, then weapons, then armor.
    pub fn kinds(&self) -> Vec<ItemKind> {
        [
            ItemCategory::Consumable,
            ItemCategory::Weapon,
            ItemCategory::Armor,
        ]
        .into_iter()
        .flat_map(|category| {
            (0..self.tiers(category).len()).map(move |tier| ItemKind::new(category, tier))
        })
        .collect()
    }
}

/// Configuration of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub width: usize,
    pub height: usize,
    /// Graph distance (in edges) at which the guardian notices the explorer.
    pub perception_radius: usize,
    /// Starting and maximum explorer energy.
    pub max_energy: i64,
    pub items_enabled: bool,
    pub items: ItemTable,
    /// Number of items the scatterer tries to place.
    pub item_count: usize,
    pub patrol_leg_cap: usize,
    pub patrol_memory: usize,
    pub base_survival_chance: f64,
    pub max_survival_chance: f64,
    /// Fixed RNG seed; `None` draws one from the operating system.
    pub seed: Option<u64>,
    /// Stop with an incomplete status after this many rounds.
    pub max_rounds: Option<u32>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            width: 31,
            height: 31,
            perception_radius: 5,
            max_energy: 500,
            items_enabled: true,
            items: ItemTable::default(),
            item_count: 30,
            patrol_leg_cap: 15,
            patrol_memory: 20,
            base_survival_chance: 0.01,
            max_survival_chance: 0.99,
            seed: None,
            max_rounds: None,
        }
    }
}

impl SimulationConfig {
    /// Checks the settings that would otherwise make setup fail or the run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        crate::maze::check_dimensions(self.width, self.height)?;
        if self.max_energy <= 0 {
            return Err(ConfigError::NoEnergy);
        }
        if self.patrol_leg_cap == 0 {
            return Err(ConfigError::NoPatrolLeg);
        }
        let unit = 0.0..=1.0;
        if !unit.contains(&self.base_survival_chance) || !unit.contains(&self.max_survival_chance)
        {
            return Err(ConfigError::SurvivalChance {
                base: self.base_survival_chance,
                cap: self.max_survival_chance,
            });
        }
        Ok(())
    }
}
