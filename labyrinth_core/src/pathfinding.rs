use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet, VecDeque},
};

use crate::{Position, map::Grid, maze::CellType};

fn is_open(grid: &Grid<CellType>, position: Position) -> bool {
    grid.get(position).is_some_and(CellType::is_open)
}

/// Breadth-first shortest path between two cells, both ends included.
///
/// Neighbors are expanded in [`crate::map::DIRECTIONS`] order and the first
/// discovery of a cell fixes its parent, so ties resolve by discovery order.
/// Returns `[from]` when `from == to` and an empty path when `to` cannot be
/// reached (including when either end is a wall).
pub fn shortest_path(grid: &Grid<CellType>, from: Position, to: Position) -> Vec<Position> {
    if from == to {
        return vec![from];
    }
    if !is_open(grid, from) || !is_open(grid, to) {
        return Vec::new();
    }

    let mut frontier = VecDeque::from([from]);
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut seen = HashSet::from([from]);

    while let Some(current) = frontier.pop_front() {
        for neighbor in grid.neighbors(current) {
            if !grid[neighbor].is_open() || !seen.insert(neighbor) {
                continue;
            }
            came_from.insert(neighbor, current);
            if neighbor == to {
                return reconstruct(&came_from, from, to);
            }
            frontier.push_back(neighbor);
        }
    }

    Vec::new()
}

fn reconstruct(came_from: &HashMap<Position, Position>, start: Position, goal: Position) -> Vec<Position> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(&previous) => current = previous,
            None => return Vec::new(),
        }
        path.push(current);
    }
    path.reverse();
    path
}

/// Number of edges on the shortest path, `None` when unreachable.
pub fn distance(grid: &Grid<CellType>, from: Position, to: Position) -> Option<usize> {
    let path = shortest_path(grid, from, to);
    path.len().checked_sub(1)
}

/// Every open cell connected to `start`, `start` included when it is open.
pub fn reachable_from(grid: &Grid<CellType>, start: Position) -> HashSet<Position> {
    let mut seen = HashSet::new();
    if !is_open(grid, start) {
        return seen;
    }
    seen.insert(start);
    let mut frontier = VecDeque::from([start]);
    while let Some(current) = frontier.pop_front() {
        for neighbor in grid.neighbors(current) {
            if grid[neighbor].is_open() && seen.insert(neighbor) {
                frontier.push_back(neighbor);
            }
        }
    }
    seen
}

/// Finds the open cell closest to `origin` by manhattan distance.
///
/// The search walks through walls, expanding cells in order of their distance
/// to `origin` (ties by position), and stops at the first open one.
pub fn nearest_open_cell(grid: &Grid<CellType>, origin: Position) -> Option<Position> {
    // For priority queue
    #[derive(Clone, Eq, PartialEq)]
    struct PrioritizedItem {
        priority: usize,
        position: Position,
    }

    impl Ord for PrioritizedItem {
        fn cmp(&self, other: &Self) -> Ordering {
            // Reverse ordering for min-heap behavior
            other
                .priority
                .cmp(&self.priority)
                .then_with(|| other.position.cmp(&self.position))
        }
    }

    impl PartialOrd for PrioritizedItem {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }

    if !grid.contains(origin) {
        return None;
    }

    let mut frontier = BinaryHeap::from([PrioritizedItem {
        priority: 0,
        position: origin,
    }]);
    let mut seen = HashSet::new();

    while let Some(PrioritizedItem { position, .. }) = frontier.pop() {
        if !seen.insert(position) {
            continue;
        }
        if grid[position].is_open() {
            return Some(position);
        }
        for neighbor in grid.neighbors(position) {
            if !seen.contains(&neighbor) {
                frontier.push(PrioritizedItem {
                    priority: neighbor.manhattan(&origin),
                    position: neighbor,
                });
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::{self, ENTRANCE};
    use rand::{SeedableRng, rngs::StdRng};

    /// Builds a grid from rows of `#` (wall) and `.` (path).
    fn parse(rows: &[&str]) -> Grid<CellType> {
        let height = rows.len();
        let width = rows[0].len();
        Grid::from_generator(width, height, |x, y| match rows[y].as_bytes()[x] {
            b'#' => CellType::Wall,
            _ => CellType::Path,
        })
    }

    #[test]
    fn path_to_self_is_single_cell() {
        let grid = parse(&["###", "#.#", "###"]);
        let p = Position::new(1, 1);
        assert_eq!(shortest_path(&grid, p, p), vec![p]);
        assert_eq!(distance(&grid, p, p), Some(0));
    }

    #[test]
    fn path_goes_around_walls() {
        let grid = parse(&[
            "#####", //
            "#...#", //
            "#.#.#", //
            "#.#.#", //
            "#####",
        ]);
        let path = shortest_path(&grid, Position::new(1, 3), Position::new(3, 3));
        assert_eq!(path.len(), 7);
        assert_eq!(path.first(), Some(&Position::new(1, 3)));
        assert_eq!(path.last(), Some(&Position::new(3, 3)));
        for pair in path.windows(2) {
            assert_eq!(pair[0].manhattan(&pair[1]), 1);
        }
    }

    #[test]
    fn walled_pocket_is_unreachable() {
        let grid = parse(&[
            "#####", //
            "#.#.#", //
            "#####",
        ]);
        let (a, b) = (Position::new(1, 1), Position::new(3, 1));
        assert!(shortest_path(&grid, a, b).is_empty());
        assert_eq!(distance(&grid, a, b), None);
        assert_eq!(distance(&grid, a, Position::new(2, 1)), None);
        assert_eq!(distance(&grid, a, Position::new(9, 9)), None);
    }

    #[test]
    fn distance_is_symmetric_and_additive() {
        let mut rng = StdRng::seed_from_u64(11);
        let grid = maze::generate(21, 21, &mut rng).unwrap();
        let exit = maze::exit_position(21, 21);
        let path = shortest_path(&grid, ENTRANCE, exit);
        assert!(!path.is_empty());

        let whole = distance(&grid, ENTRANCE, exit).unwrap();
        assert_eq!(distance(&grid, exit, ENTRANCE), Some(whole));

        // Any cell on a shortest path splits it exactly.
        let middle = path[path.len() / 2];
        let left = distance(&grid, ENTRANCE, middle).unwrap();
        let right = distance(&grid, middle, exit).unwrap();
        assert_eq!(left + right, whole);
    }

    #[test]
    fn nearest_open_cell_prefers_closest() {
        let grid = parse(&[
            "#####", //
            "#####", //
            "####.", //
            "#####",
        ]);
        assert_eq!(
            nearest_open_cell(&grid, Position::new(2, 1)),
            Some(Position::new(4, 2))
        );
        let open = parse(&["...", "..."]);
        assert_eq!(
            nearest_open_cell(&open, Position::new(1, 1)),
            Some(Position::new(1, 1))
        );
        let closed = parse(&["###"]);
        assert_eq!(nearest_open_cell(&closed, Position::new(0, 0)), None);
    }
}
