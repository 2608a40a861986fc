use std::collections::{HashSet, VecDeque};

use rand::{
    Rng,
    seq::{IndexedRandom, SliceRandom},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    ItemCategory, ItemKind, Position,
    config::ItemTable,
    map::Grid,
    maze::CellType,
    pathfinding::{distance, shortest_path},
};

/// Random destination picks that may fail before the guardian heads home.
const MAX_DESTINATION_ATTEMPTS: usize = 10;

/// Result of a single explorer step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorerStep {
    pub position: Position,
    pub reached_exit: bool,
    pub starved: bool,
}

/// Depth-first explorer.
///
/// Advances to a random unvisited neighbor when it can and otherwise walks
/// back along its trail (a LIFO of the cells it left), one cell per step.
#[derive(Debug, Clone)]
pub struct Explorer {
    position: Position,
    exit: Position,
    visited: HashSet<Position>,
    trail: Vec<Position>,
    energy: i64,
    max_energy: i64,
    weapon: Option<ItemKind>,
    armor: Option<ItemKind>,
    trajectory: Vec<Position>,
    dead: bool,
    items: Option<ItemTable>,
}

impl Explorer {
    /// Creates an explorer at `start` with full energy and item tracking off.
    pub fn new(start: Position, exit: Position, max_energy: i64) -> Self {
        Self {
            position: start,
            exit,
            visited: HashSet::from([start]),
            trail: Vec::new(),
            energy: max_energy,
            max_energy,
            weapon: None,
            armor: None,
            trajectory: vec![start],
            dead: false,
            items: None,
        }
    }

    /// Turns on item pickup, valuing items with `table`.
    pub fn with_items(mut self, table: ItemTable) -> Self {
        self.items = Some(table);
        self
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn energy(&self) -> i64 {
        self.energy
    }

    pub fn max_energy(&self) -> i64 {
        self.max_energy
    }

    pub fn weapon(&self) -> Option<ItemKind> {
        self.weapon
    }

    pub fn armor(&self) -> Option<ItemKind> {
        self.armor
    }

    pub fn items_enabled(&self) -> bool {
        self.items.is_some()
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Marks the explorer as killed; later steps do nothing.
    pub fn kill(&mut self) {
        self.dead = true;
    }

    /// Every cell occupied so far, backtracking included.
    pub fn trajectory(&self) -> &[Position] {
        &self.trajectory
    }

    pub fn visited(&self) -> &HashSet<Position> {
        &self.visited
    }

    /// The kind of cell the explorer is standing on.
    pub fn occupied_cell(&self, grid: &Grid<CellType>) -> CellType {
        grid.get(self.position).copied().unwrap_or_default()
    }

    /// Survival bonus from held equipment, in `[0, 1]` for the default table.
    pub fn combat_bonus(&self) -> f64 {
        let Some(table) = &self.items else {
            return 0.0;
        };
        let points: u32 = [self.weapon, self.armor]
            .into_iter()
            .flatten()
            .map(|kind| table.magnitude(kind))
            .sum();
        f64::from(points) / 100.0
    }

    /// Takes one step of the depth-first walk.
    pub fn step<R: Rng + ?Sized>(&mut self, grid: &mut Grid<CellType>, rng: &mut R) -> ExplorerStep {
        if self.energy <= 0 {
            return self.report(false, true);
        }
        if self.dead {
            return self.report(false, false);
        }

        self.energy -= 1;

        if self.position == self.exit {
            return self.report(true, false);
        }

        let view: &Grid<CellType> = grid;
        let mut neighbors: Vec<Position> = view
            .neighbors(self.position)
            .filter(|n| view[*n].is_open())
            .collect();
        neighbors.shuffle(rng);

        if let Some(next) = neighbors.into_iter().find(|n| !self.visited.contains(n)) {
            self.trail.push(self.position);
            self.position = next;
            self.visited.insert(next);
            self.trajectory.push(next);
            self.collect(grid);
        } else if let Some(previous) = self.trail.pop() {
            self.position = previous;
            self.trajectory.push(previous);
        }

        self.report(self.position == self.exit, false)
    }

    fn report(&self, reached_exit: bool, starved: bool) -> ExplorerStep {
        ExplorerStep {
            position: self.position,
            reached_exit,
            starved,
        }
    }

    fn collect(&mut self, grid: &mut Grid<CellType>) {
        let Some(table) = &self.items else {
            return;
        };
        let CellType::Item(kind) = grid[self.position] else {
            return;
        };

        match kind.category {
            ItemCategory::Consumable => {
                let gain = i64::from(table.magnitude(kind));
                self.energy = self.energy.saturating_add(gain).min(self.max_energy);
            }
            ItemCategory::Weapon => self.weapon = Some(kind),
            ItemCategory::Armor => self.armor = Some(kind),
        }
        debug!(%kind, position = %self.position, energy = self.energy, "explorer picked up item");
        grid[self.position] = CellType::Path;
    }
}

/// Behaviour the guardian is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardianMode {
    Patrol,
    Chase,
    /// Withdrawn for good after an encounter.
    Hidden,
}

/// Guardian that patrols around its spawn point and chases the explorer
/// whenever it comes within perception range.
#[derive(Debug, Clone)]
pub struct Guardian {
    position: Position,
    center: Position,
    chasing: bool,
    destination: Option<Position>,
    patrol_steps: usize,
    patrol_leg_cap: usize,
    memory: VecDeque<Position>,
    memory_capacity: usize,
    returning: bool,
    detected_at: Option<u32>,
    encountered_at: Option<u32>,
    chase_path: Vec<Position>,
    last_chase_position: Position,
    hidden: bool,
}

impl Guardian {
    pub fn new(spawn: Position, patrol_leg_cap: usize, memory_capacity: usize) -> Self {
        Self {
            position: spawn,
            center: spawn,
            chasing: false,
            destination: None,
            patrol_steps: 0,
            patrol_leg_cap,
            memory: VecDeque::with_capacity(memory_capacity),
            memory_capacity,
            returning: false,
            detected_at: None,
            encountered_at: None,
            chase_path: Vec::new(),
            last_chase_position: spawn,
            hidden: false,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn center(&self) -> Position {
        self.center
    }

    pub fn destination(&self) -> Option<Position> {
        self.destination
    }

    pub fn is_chasing(&self) -> bool {
        self.chasing
    }

    /// Whether the next destination pick goes straight back to the centre.
    pub fn is_returning(&self) -> bool {
        self.returning
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn mode(&self) -> GuardianMode {
        if self.hidden {
            GuardianMode::Hidden
        } else if self.chasing {
            GuardianMode::Chase
        } else {
            GuardianMode::Patrol
        }
    }

    /// Round in which the explorer was first noticed.
    pub fn detected_at(&self) -> Option<u32> {
        self.detected_at
    }

    /// Round of the first encounter with the explorer.
    pub fn encountered_at(&self) -> Option<u32> {
        self.encountered_at
    }

    /// Cells entered while chasing, without consecutive repeats.
    pub fn chase_path(&self) -> &[Position] {
        &self.chase_path
    }

    /// Most recent patrol positions, oldest first.
    pub fn recent_positions(&self) -> impl Iterator<Item = &Position> {
        self.memory.iter()
    }

    /// Records the first encounter round; later calls keep the first one.
    pub fn record_encounter(&mut self, round: u32) {
        self.encountered_at.get_or_insert(round);
    }

    /// Withdraws the guardian permanently.
    pub fn hide(&mut self) {
        self.hidden = true;
    }

    /// Moves the guardian for one round and returns its new position.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        target: Position,
        grid: &Grid<CellType>,
        perception_radius: usize,
        round: u32,
        rng: &mut R,
    ) -> Position {
        if self.hidden {
            return self.position;
        }

        let dist = distance(grid, self.position, target);
        let was_chasing = self.chasing;
        self.chasing = dist.is_some_and(|d| d <= perception_radius);

        if self.chasing && !was_chasing && dist != Some(0) && self.detected_at.is_none() {
            self.detected_at = Some(round);
            debug!(round, position = %self.position, %target, "guardian detected explorer");
        }

        match dist {
            Some(d) if self.chasing && d > 0 => self.chase(target, grid),
            _ => self.patrol(grid, rng),
        }

        self.position
    }

    fn chase(&mut self, target: Position, grid: &Grid<CellType>) {
        let path = shortest_path(grid, self.position, target);
        let next = match path.len() {
            0 | 1 => return,
            2 => path[1],
            _ => path[2],
        };

        self.position = next;
        if self.last_chase_position != next {
            self.chase_path.push(next);
            self.last_chase_position = next;
        }
    }

    fn patrol<R: Rng + ?Sized>(&mut self, grid: &Grid<CellType>, rng: &mut R) {
        if self.destination.is_none_or(|d| d == self.position) {
            let destination = self.pick_destination(grid, rng);
            debug!(%destination, returning = self.returning, "guardian picked patrol destination");
            self.destination = Some(destination);
        }

        if let Some(destination) = self.destination {
            let path = shortest_path(grid, self.position, destination);
            if let Some(&next) = path.get(1) {
                self.position = next;
                self.patrol_steps += 1;
                self.memory.push_back(next);
                while self.memory.len() > self.memory_capacity {
                    self.memory.pop_front();
                }
            }
        }

        if self.patrol_steps >= self.patrol_leg_cap {
            self.patrol_steps = 0;
            self.destination = None;
        }
    }

    /// Chooses the next patrol destination.
    ///
    /// Returns the centre when the previous pick asked to head home, or when no
    /// other open cell exists. Random picks the guardian cannot reach are
    /// retried; too many failures send it home now and raise the returning flag.
    fn pick_destination<R: Rng + ?Sized>(&mut self, grid: &Grid<CellType>, rng: &mut R) -> Position {
        if self.returning {
            self.returning = false;
            return self.center;
        }

        let candidates: Vec<Position> = grid
            .enumerate()
            .filter(|(cell, state)| {
                state.is_open() && *cell != self.position && *cell != self.center
            })
            .map(|(cell, _)| cell)
            .collect();

        let mut attempts = 0;
        while let Some(&candidate) = candidates.choose(rng) {
            attempts += 1;
            if !shortest_path(grid, self.position, candidate).is_empty() {
                return candidate;
            }
            if attempts > MAX_DESTINATION_ATTEMPTS {
                self.returning = true;
                break;
            }
        }

        self.center
    }
}
