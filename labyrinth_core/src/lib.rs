use std::fmt;

use serde::{Deserialize, Serialize};

pub mod agent;
pub mod config;
pub mod encounter;
pub mod environment;
pub mod map;
pub mod maze;
pub mod pathfinding;

/// Represents a 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Returns the manhattan distance between two positions.
    pub fn manhattan(&self, other: &Position) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The three families of collectible items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemCategory {
    /// Restores energy when picked up.
    Consumable,
    /// Raises the survival chance in an encounter.
    Weapon,
    /// Raises the survival chance in an encounter.
    Armor,
}

/// A collectible item: a category plus a zero-based tier index into the
/// matching column of the [`config::ItemTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKind {
    pub category: ItemCategory,
    pub tier: usize,
}

impl ItemKind {
    pub const fn new(category: ItemCategory, tier: usize) -> Self {
        ItemKind { category, tier }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.category {
            ItemCategory::Consumable => "consumable",
            ItemCategory::Weapon => "weapon",
            ItemCategory::Armor => "armor",
        };
        write!(f, "{}-tier{}", name, self.tier + 1)
    }
}
