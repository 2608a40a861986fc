//! Step-by-step playback of the maze carving.

use std::collections::VecDeque;

use labyrinth_core::{
    Position,
    map::Grid,
    maze::{CellType, ENTRANCE, GenerationEvent},
};

/// Replays recorded [`GenerationEvent`]s onto an all-wall grid, one per tick.
pub struct GenerationReplay {
    grid: Grid<CellType>,
    events: VecDeque<GenerationEvent>,
    processing: Option<Position>,
    recent: Vec<Position>,
}

impl GenerationReplay {
    pub fn new(width: usize, height: usize, events: Vec<GenerationEvent>) -> Self {
        let mut grid = Grid::filled(width, height, CellType::Wall);
        grid[ENTRANCE] = CellType::Path;
        GenerationReplay {
            grid,
            events: events.into(),
            processing: None,
            recent: Vec::new(),
        }
    }

    pub fn grid(&self) -> &Grid<CellType> {
        &self.grid
    }

    /// Frontier node picked by the last step, if any.
    pub fn processing(&self) -> Option<Position> {
        self.processing
    }

    /// Cells opened by the last step.
    pub fn recent(&self) -> &[Position] {
        &self.recent
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }

    /// Applies the next event; returns `false` once the recording is exhausted.
    pub fn advance(&mut self) -> bool {
        let Some(event) = self.events.pop_front() else {
            self.processing = None;
            self.recent.clear();
            return false;
        };
        match event {
            GenerationEvent::Processing(node) => {
                self.processing = Some(node);
                self.recent.clear();
            }
            GenerationEvent::Carved { connector, node } => {
                self.processing = None;
                for cell in [connector, node] {
                    if self.grid.contains(cell) {
                        self.grid[cell] = CellType::Path;
                    }
                }
                self.recent = vec![connector, node];
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labyrinth_core::maze::generate_with;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn replay_highlights_then_carves() {
        let events = vec![
            GenerationEvent::Processing(Position::new(3, 1)),
            GenerationEvent::Carved {
                connector: Position::new(2, 1),
                node: Position::new(3, 1),
            },
        ];
        let mut replay = GenerationReplay::new(5, 3, events);
        assert_eq!(replay.grid()[Position::new(3, 1)], CellType::Wall);

        assert!(replay.advance());
        assert_eq!(replay.processing(), Some(Position::new(3, 1)));
        assert!(replay.recent().is_empty());

        assert!(replay.advance());
        assert_eq!(replay.processing(), None);
        assert_eq!(replay.recent(), &[Position::new(2, 1), Position::new(3, 1)]);
        assert_eq!(replay.grid()[Position::new(2, 1)], CellType::Path);

        assert!(!replay.advance());
        assert!(replay.recent().is_empty());
        assert_eq!(replay.remaining(), 0);
    }

    #[test]
    fn replay_opens_every_carved_cell() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut events = Vec::new();
        let maze = generate_with(11, 11, &mut rng, |event| events.push(event)).unwrap();

        let mut replay = GenerationReplay::new(11, 11, events);
        while replay.advance() {}
        for (cell, state) in replay.grid().enumerate() {
            if state.is_open() {
                assert!(maze[cell].is_open(), "{cell} open in replay only");
            }
        }
    }
}
