//! Maze carving and item placement.
//!
//! The generator is a randomized Prim variant over a lattice of node cells at
//! odd coordinates, separated by connector cells that get carved when two
//! nodes are joined. Afterwards a circular clearing is forced open around the
//! centre and the exit cell is guaranteed to be open.

use std::f64::consts::PI;

use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    ItemKind, Position,
    config::ItemTable,
    map::{Grid, GridError},
};

/// Represents the state of a single maze cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    #[default]
    Wall,
    Path,
    Entrance,
    Exit,
    Item(ItemKind),
}

impl CellType {
    /// Anything but a wall can be walked on.
    #[inline]
    pub fn is_open(&self) -> bool {
        !matches!(self, CellType::Wall)
    }
}

/// Represents errors caused by unusable maze dimensions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MazeError {
    #[error("Maze dimensions must be odd, got {width}x{height}")]
    EvenDimension { width: usize, height: usize },
    #[error("Maze dimensions must be at least 3x3, got {width}x{height}")]
    TooSmall { width: usize, height: usize },
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// A single step of the carving, reported to the hook of [`generate_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationEvent {
    /// A frontier node was picked.
    Processing(Position),
    /// `node` was joined to the maze through `connector`.
    Carved { connector: Position, node: Position },
}

/// Offsets from a node to the four nodes two cells away.
const NODE_STEPS: [(isize, isize); 4] = [(-2, 0), (2, 0), (0, -2), (0, 2)];

/// The start node of the carving, which is also the entrance.
pub const ENTRANCE: Position = Position::new(1, 1);

/// Returns the exit cell of a maze of the given size: one cell in from the far corner.
pub fn exit_position(width: usize, height: usize) -> Position {
    Position::new(width - 2, height - 2)
}

/// Radius of the forced-open clearing: the disc covers about 5% of the grid.
pub fn clearing_radius(width: usize, height: usize) -> usize {
    let area = ((width * height) as f64 * 0.05).ceil();
    (area / PI).sqrt().floor() as usize
}

pub(crate) fn check_dimensions(width: usize, height: usize) -> Result<(), MazeError> {
    if width < 3 || height < 3 {
        return Err(MazeError::TooSmall { width, height });
    }
    if width % 2 == 0 || height % 2 == 0 {
        return Err(MazeError::EvenDimension { width, height });
    }
    Ok(())
}

/// Generates a fully connected maze with an entrance at (1, 1) and an exit at
/// `(width - 2, height - 2)`.
pub fn generate<R: Rng + ?Sized>(
    width: usize,
    height: usize,
    rng: &mut R,
) -> Result<Grid<CellType>, MazeError> {
    generate_with(width, height, rng, |_| {})
}

/// Same as [`generate`], calling `on_event` for every frontier pick and every
/// carve. The hook never touches `rng`, so a seed yields the same maze either way.
pub fn generate_with<R, F>(
    width: usize,
    height: usize,
    rng: &mut R,
    mut on_event: F,
) -> Result<Grid<CellType>, MazeError>
where
    R: Rng + ?Sized,
    F: FnMut(GenerationEvent),
{
    check_dimensions(width, height)?;

    let mut grid = Grid::filled(width, height, CellType::Wall);
    let mut visited = Grid::filled(width, height, false);
    let mut queued = Grid::filled(width, height, false);

    grid[ENTRANCE] = CellType::Path;
    visited[ENTRANCE] = true;

    let mut frontier: Vec<Position> = Vec::new();
    for node in node_neighbors(&grid, ENTRANCE) {
        frontier.push(node);
        queued[node] = true;
    }

    while !frontier.is_empty() {
        let idx = rng.random_range(0..frontier.len());
        let node = frontier[idx];
        on_event(GenerationEvent::Processing(node));

        let connected: Vec<Position> = node_neighbors(&grid, node)
            .filter(|n| visited[*n])
            .collect();

        if let Some(&joined) = connected.choose(rng) {
            let connector = Position::new((node.x + joined.x) / 2, (node.y + joined.y) / 2);
            grid[connector] = CellType::Path;
            grid[node] = CellType::Path;
            visited[node] = true;
            on_event(GenerationEvent::Carved { connector, node });

            let fresh: Vec<Position> = node_neighbors(&grid, node)
                .filter(|n| !visited[*n] && !queued[*n])
                .collect();
            for next in fresh {
                queued[next] = true;
                frontier.push(next);
            }
        }

        // Dropped whether or not it was joined.
        frontier.swap_remove(idx);
        queued[node] = false;
    }

    open_clearing(&mut grid);

    let exit = exit_position(width, height);
    grid.set(exit, CellType::Path)?;
    grid.set(ENTRANCE, CellType::Entrance)?;
    grid.set(exit, CellType::Exit)?;

    info!(
        width,
        height,
        open = grid.iter().filter(|c| c.is_open()).count(),
        "maze generated"
    );
    Ok(grid)
}

fn node_neighbors(grid: &Grid<CellType>, node: Position) -> impl Iterator<Item = Position> + '_ {
    NODE_STEPS
        .iter()
        .filter_map(move |&(dx, dy)| grid.offset(node, dx, dy))
}

fn open_clearing(grid: &mut Grid<CellType>) {
    let center = grid.center();
    let radius = clearing_radius(grid.width(), grid.height());
    let limit = radius * radius;

    for y in center.y.saturating_sub(radius)..=center.y + radius {
        for x in center.x.saturating_sub(radius)..=center.x + radius {
            let cell = Position::new(x, y);
            if !grid.contains(cell) {
                continue;
            }
            let dx = x.abs_diff(center.x);
            let dy = y.abs_diff(center.y);
            if dx * dx + dy * dy <= limit {
                grid[cell] = CellType::Path;
            }
        }
    }
}

/// Places up to `count` random items from `table` on plain path cells.
///
/// Gives up after `10 * count` samples, or as soon as no plain path cell is
/// left; returns how many items were placed.
pub fn scatter_items<R: Rng + ?Sized>(
    grid: &mut Grid<CellType>,
    count: usize,
    table: &ItemTable,
    rng: &mut R,
) -> usize {
    let kinds = table.kinds();
    if kinds.is_empty() {
        return 0;
    }

    let (width, height) = (grid.width(), grid.height());
    let budget = count.saturating_mul(10);
    let mut free = grid.iter().filter(|c| **c == CellType::Path).count();
    let mut placed = 0;
    let mut attempts = 0;
    while placed < count && free > 0 && attempts < budget {
        attempts += 1;
        let cell = Position::new(
            rng.random_range(1..=width - 2),
            rng.random_range(1..=height - 2),
        );
        if grid[cell] == CellType::Path {
            if let Some(&kind) = kinds.choose(rng) {
                grid[cell] = CellType::Item(kind);
                placed += 1;
                free -= 1;
            }
        }
    }

    if placed < count {
        debug!(placed, count, attempts, "item scatter under-filled");
    }
    placed
}
