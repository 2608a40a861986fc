//! Guardian/explorer encounters.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Position, config::SimulationConfig, map::Grid, maze::CellType, pathfinding::distance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncounterOutcome {
    Survived,
    Killed,
}

/// Whether the guardian is on or next to the explorer.
pub fn in_combat(grid: &Grid<CellType>, guardian: Position, explorer: Position) -> bool {
    guardian == explorer || distance(grid, guardian, explorer) == Some(1)
}

/// Rolls the explorer's survival: a base chance plus equipment bonus, capped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncounterResolver {
    base: f64,
    cap: f64,
}

impl EncounterResolver {
    pub fn new(base: f64, cap: f64) -> Self {
        Self { base, cap }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.base_survival_chance, config.max_survival_chance)
    }

    pub fn survival_chance(&self, combat_bonus: f64) -> f64 {
        (self.base + combat_bonus).min(self.cap)
    }

    pub fn resolve<R: Rng + ?Sized>(&self, combat_bonus: f64, rng: &mut R) -> EncounterOutcome {
        if rng.random::<f64>() < self.survival_chance(combat_bonus) {
            EncounterOutcome::Survived
        } else {
            EncounterOutcome::Killed
        }
    }
}

impl Default for EncounterResolver {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}
