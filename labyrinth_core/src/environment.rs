use std::fmt;

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    ItemKind, Position,
    agent::{Explorer, Guardian},
    config::{ConfigError, SimulationConfig},
    encounter::{self, EncounterOutcome, EncounterResolver},
    map::Grid,
    maze::{self, CellType, ENTRANCE, GenerationEvent},
    pathfinding::nearest_open_cell,
};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Escaped,
    Starved,
    Killed,
    /// Stopped before any terminal condition.
    Incomplete,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStatus::Escaped => "ESCAPED",
            RunStatus::Starved => "STARVED",
            RunStatus::Killed => "KILLED",
            RunStatus::Incomplete => "INCOMPLETE",
        };
        f.write_str(label)
    }
}

/// Represents the outcome of processing one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnResult {
    Continue,
    Finished(RunStatus),
}

/// Equipment carried at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub weapon: Option<ItemKind>,
    pub armor: Option<ItemKind>,
}

/// Plain data describing a finished (or abandoned) run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub final_round: u32,
    pub remaining_energy: i64,
    /// `None` when item tracking is disabled.
    pub equipment: Option<Equipment>,
    pub trajectory: Vec<Position>,
    pub detected_at: Option<u32>,
    pub encountered_at: Option<u32>,
    pub chase_path: Vec<Position>,
}

/// Owns the maze, both agents and the random source of a single run.
pub struct Environment {
    config: SimulationConfig,
    grid: Grid<CellType>,
    explorer: Explorer,
    guardian: Guardian,
    resolver: EncounterResolver,
    rng: StdRng,
    round: u32,
    status: Option<RunStatus>,
}

impl Environment {
    /// Builds a run from `config`, seeding from `config.seed` or the OS.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        Self::with_generation_hook(config, |_| {})
    }

    /// Like [`Environment::new`], passing every carving step to `on_event`.
    pub fn with_generation_hook<F>(config: SimulationConfig, on_event: F) -> Result<Self, ConfigError>
    where
        F: FnMut(GenerationEvent),
    {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::build(config, rng, on_event)
    }

    /// Generates the maze and scatters items with the given random source.
    pub fn with_rng(config: SimulationConfig, rng: StdRng) -> Result<Self, ConfigError> {
        Self::build(config, rng, |_| {})
    }

    fn build<F>(config: SimulationConfig, mut rng: StdRng, on_event: F) -> Result<Self, ConfigError>
    where
        F: FnMut(GenerationEvent),
    {
        config.validate()?;
        let mut grid = maze::generate_with(config.width, config.height, &mut rng, on_event)?;
        if config.items_enabled {
            let placed = maze::scatter_items(&mut grid, config.item_count, &config.items, &mut rng);
            debug!(placed, "items scattered");
        }
        Self::from_grid(config, grid, rng)
    }

    /// Starts a run on an existing grid.
    ///
    /// The explorer enters at (1, 1) and looks for the exit one cell in from
    /// the far corner; the guardian spawns on the open cell nearest the centre.
    pub fn from_grid(
        config: SimulationConfig,
        grid: Grid<CellType>,
        rng: StdRng,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let exit = maze::exit_position(grid.width(), grid.height());

        let mut explorer = Explorer::new(ENTRANCE, exit, config.max_energy);
        if config.items_enabled {
            explorer = explorer.with_items(config.items.clone());
        }

        let spawn = nearest_open_cell(&grid, grid.center()).unwrap_or(exit);
        let guardian = Guardian::new(spawn, config.patrol_leg_cap, config.patrol_memory);

        info!(
            width = grid.width(),
            height = grid.height(),
            %exit,
            guardian = %spawn,
            "run set up"
        );

        Ok(Environment {
            resolver: EncounterResolver::from_config(&config),
            config,
            grid,
            explorer,
            guardian,
            rng,
            round: 0,
            status: None,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid<CellType> {
        &self.grid
    }

    pub fn explorer(&self) -> &Explorer {
        &self.explorer
    }

    pub fn guardian(&self) -> &Guardian {
        &self.guardian
    }

    /// Number of rounds processed so far.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Terminal status, once the run has ended.
    pub fn status(&self) -> Option<RunStatus> {
        self.status
    }

    /// Processes one round: guardian, encounter, explorer, terminal checks.
    pub fn process_turn(&mut self) -> TurnResult {
        if let Some(status) = self.status {
            return TurnResult::Finished(status);
        }

        self.round += 1;
        let round = self.round;

        let guardian_position = self.guardian.step(
            self.explorer.position(),
            &self.grid,
            self.config.perception_radius,
            round,
            &mut self.rng,
        );

        // Only the first encounter counts; a hidden guardian is out of the game.
        if !self.guardian.is_hidden()
            && encounter::in_combat(&self.grid, guardian_position, self.explorer.position())
        {
            self.guardian.record_encounter(round);
            let bonus = self.explorer.combat_bonus();
            let outcome = self.resolver.resolve(bonus, &mut self.rng);
            self.guardian.hide();
            info!(
                round,
                ?outcome,
                chance = self.resolver.survival_chance(bonus),
                "encounter resolved"
            );
            if outcome == EncounterOutcome::Killed {
                self.explorer.kill();
                return self.finish(RunStatus::Killed);
            }
        }

        let step = self.explorer.step(&mut self.grid, &mut self.rng);
        if step.starved {
            return self.finish(RunStatus::Starved);
        }
        if step.reached_exit {
            return self.finish(RunStatus::Escaped);
        }
        if self.config.max_rounds.is_some_and(|limit| round >= limit) {
            return self.finish(RunStatus::Incomplete);
        }

        TurnResult::Continue
    }

    /// Runs rounds until the run ends.
    pub fn run(&mut self) -> RunStatus {
        loop {
            if let TurnResult::Finished(status) = self.process_turn() {
                return status;
            }
        }
    }

    /// Ends the run as incomplete unless it has already ended.
    pub fn abandon(&mut self) -> RunStatus {
        match self.status {
            Some(status) => status,
            None => {
                self.finish(RunStatus::Incomplete);
                RunStatus::Incomplete
            }
        }
    }

    fn finish(&mut self, status: RunStatus) -> TurnResult {
        info!(%status, round = self.round, energy = self.explorer.energy(), "run finished");
        self.status = Some(status);
        TurnResult::Finished(status)
    }

    /// Collects the end-of-run data; an unfinished run reports as incomplete.
    pub fn report(&self) -> RunReport {
        let explorer = &self.explorer;
        RunReport {
            status: self.status.unwrap_or(RunStatus::Incomplete),
            final_round: self.round,
            remaining_energy: explorer.energy(),
            equipment: explorer.items_enabled().then(|| Equipment {
                weapon: explorer.weapon(),
                armor: explorer.armor(),
            }),
            trajectory: explorer.trajectory().to_vec(),
            detected_at: self.guardian.detected_at(),
            encountered_at: self.guardian.encountered_at(),
            chase_path: self.guardian.chase_path().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor(width: usize) -> Grid<CellType> {
        Grid::from_generator(width, 3, |x, y| {
            if y != 1 || x == 0 || x == width - 1 {
                CellType::Wall
            } else if x == 1 {
                CellType::Entrance
            } else if x == width - 2 {
                CellType::Exit
            } else {
                CellType::Path
            }
        })
    }

    fn config(survival: f64) -> SimulationConfig {
        SimulationConfig {
            items_enabled: false,
            base_survival_chance: survival,
            max_survival_chance: survival,
            ..SimulationConfig::default()
        }
    }

    fn p(x: usize, y: usize) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn surviving_an_encounter_hides_the_guardian_for_good() {
        let rng = StdRng::seed_from_u64(1);
        let mut env = Environment::from_grid(config(1.0), corridor(7), rng).unwrap();
        assert_eq!(env.guardian().position(), p(3, 1));

        assert_eq!(env.process_turn(), TurnResult::Continue);
        assert!(env.guardian().is_hidden());
        assert_eq!(env.guardian().encountered_at(), Some(1));
        assert_eq!(env.guardian().detected_at(), Some(1));
        let hidden_at = env.guardian().position();

        // The explorer walks right past the hidden guardian.
        assert_eq!(env.run(), RunStatus::Escaped);
        assert_eq!(env.round(), 4);
        assert_eq!(env.guardian().position(), hidden_at);
        assert_eq!(env.guardian().encountered_at(), Some(1));

        let report = env.report();
        assert_eq!(report.status, RunStatus::Escaped);
        assert_eq!(report.trajectory, vec![p(1, 1), p(2, 1), p(3, 1), p(4, 1), p(5, 1)]);
        assert_eq!(report.equipment, None);
        assert_eq!(report.remaining_energy, 496);
    }

    #[test]
    fn losing_an_encounter_ends_the_run() {
        let rng = StdRng::seed_from_u64(2);
        let mut env = Environment::from_grid(config(0.0), corridor(7), rng).unwrap();
        assert_eq!(env.process_turn(), TurnResult::Finished(RunStatus::Killed));
        assert!(env.explorer().is_dead());
        assert_eq!(env.explorer().trajectory(), &[p(1, 1)]);
        // Further turns change nothing.
        assert_eq!(env.process_turn(), TurnResult::Finished(RunStatus::Killed));
        assert_eq!(env.round(), 1);
    }

    #[test]
    fn explorer_starves_in_a_long_corridor() {
        let rng = StdRng::seed_from_u64(3);
        let settings = SimulationConfig {
            max_energy: 3,
            ..config(1.0)
        };
        let mut env = Environment::from_grid(settings, corridor(15), rng).unwrap();
        assert_eq!(env.run(), RunStatus::Starved);
        assert_eq!(env.round(), 4);
        assert_eq!(env.report().remaining_energy, 0);
        assert_eq!(env.explorer().trajectory().len(), 4);
    }

    #[test]
    fn round_limit_reports_incomplete() {
        let settings = SimulationConfig {
            seed: Some(4),
            max_rounds: Some(3),
            ..config(1.0)
        };
        let mut env = Environment::new(settings).unwrap();
        assert_eq!(env.run(), RunStatus::Incomplete);
        assert_eq!(env.round(), 3);
    }

    #[test]
    fn abandoning_keeps_a_terminal_status() {
        let rng = StdRng::seed_from_u64(5);
        let mut env = Environment::from_grid(config(0.0), corridor(7), rng).unwrap();
        assert_eq!(env.report().status, RunStatus::Incomplete);
        env.run();
        assert_eq!(env.abandon(), RunStatus::Killed);
    }

    #[test]
    fn generation_hook_keeps_the_seeded_maze() {
        let settings = SimulationConfig {
            seed: Some(6),
            ..SimulationConfig::default()
        };
        let mut carves = 0;
        let hooked = Environment::with_generation_hook(settings.clone(), |event| {
            if let GenerationEvent::Carved { .. } = event {
                carves += 1;
            }
        })
        .unwrap();
        let plain = Environment::new(settings).unwrap();
        assert_eq!(hooked.grid(), plain.grid());
        assert_eq!(carves, 15 * 15 - 1);
    }

    #[test]
    fn status_labels() {
        assert_eq!(RunStatus::Escaped.to_string(), "ESCAPED");
        assert_eq!(RunStatus::Incomplete.to_string(), "INCOMPLETE");
    }
}
