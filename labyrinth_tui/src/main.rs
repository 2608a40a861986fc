mod replay;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use labyrinth_core::{
    ItemCategory, ItemKind, Position,
    agent::GuardianMode,
    config::SimulationConfig,
    environment::{Environment, TurnResult},
    maze::CellType,
};
use replay::GenerationReplay;
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    fs::{self, File},
    io::{self, Stdout},
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Explorer vs. guardian in a generated labyrinth", long_about = None)]
struct Args {
    /// TOML file with simulation settings; flags below override it
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Maze width (odd, at least 3)
    #[arg(long)]
    width: Option<usize>,

    /// Maze height (odd, at least 3)
    #[arg(long)]
    height: Option<usize>,

    /// Distance at which the guardian notices the explorer
    #[arg(short, long)]
    perception: Option<usize>,

    /// Starting and maximum explorer energy
    #[arg(short, long)]
    energy: Option<i64>,

    /// Number of items to scatter
    #[arg(long)]
    items: Option<usize>,

    /// Disable item scattering and pickup
    #[arg(long)]
    no_items: bool,

    /// Seed for a reproducible run
    #[arg(short, long)]
    seed: Option<u64>,

    /// Stop after this many rounds
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Milliseconds between rounds
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,

    /// Where to write the end-of-run report
    #[arg(short, long, default_value = "report.txt")]
    report: PathBuf,

    /// Run to completion without drawing the maze
    #[arg(long)]
    headless: bool,

    /// Animate the maze carving, one step per tick, before the run starts
    #[arg(long)]
    show_generation: bool,

    /// Write logs to this file (logs go to stderr in headless mode otherwise)
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

impl Args {
    /// Loads the config file, if any, and applies the command-line overrides.
    fn simulation_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                toml::from_str(&text)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => SimulationConfig::default(),
        };

        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(radius) = self.perception {
            config.perception_radius = radius;
        }
        if let Some(energy) = self.energy {
            config.max_energy = energy;
        }
        if let Some(count) = self.items {
            config.item_count = count;
        }
        if self.no_items {
            config.items_enabled = false;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.max_rounds.is_some() {
            config.max_rounds = self.max_rounds;
        }

        config.validate()?;
        Ok(config)
    }
}

struct App {
    /// The core simulation environment.
    environment: Environment,
    /// Carving playback shown before the first round.
    generation: Option<GenerationReplay>,
    /// Flag to control the main loop.
    should_quit: bool,
    /// Flag to control if the game is over.
    game_over: bool,
}

impl App {
    fn new(config: SimulationConfig, show_generation: bool) -> Result<Self> {
        let (width, height) = (config.width, config.height);
        let mut events = Vec::new();
        let environment = if show_generation {
            Environment::with_generation_hook(config, |event| events.push(event))
        } else {
            Environment::new(config)
        }
        .context("Failed to set up the labyrinth")?;
        let generation =
            show_generation.then(|| GenerationReplay::new(width, height, events));
        Ok(App {
            environment,
            generation,
            should_quit: false,
            game_over: false,
        })
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) {
        if let Some(replay) = &mut self.generation {
            if !replay.advance() {
                self.generation = None;
            }
            return;
        }
        if self.game_over {
            return;
        }
        if let TurnResult::Finished(_) = self.environment.process_turn() {
            self.game_over = true;
        }
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_tracing(args.log_file.as_deref(), args.headless)?;

    let config = args.simulation_config()?;
    // Nothing is drawn in headless mode, so there is no carving to show.
    let mut app = App::new(config, args.show_generation && !args.headless)?;

    if args.headless {
        let status = app.environment.run();
        println!(
            "Run finished: {} in round {}",
            status,
            app.environment.round()
        );
    } else {
        let mut terminal = setup_terminal()?;
        let tick_rate = Duration::from_millis(args.tick_ms);
        let outcome = run_app(&mut terminal, &mut app, tick_rate);
        restore_terminal(&mut terminal)?;
        outcome?;
    }

    // Quitting mid-run leaves the status incomplete.
    app.environment.abandon();
    report::write(&args.report, &app.environment.report())?;
    println!("Report saved to {}", args.report.display());

    Ok(())
}

/// Installs the log subscriber; without a log file the TUI stays silent.
fn init_tracing(log_file: Option<&Path>, headless: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None if headless => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
        None => {}
    }
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // Area for the maze
            Constraint::Length(5), // Area for agent status
            Constraint::Length(2), // Area for help
        ])
        .split(frame.area());

    if let Some(replay) = &app.generation {
        render_generation(frame, main_layout[0], replay);
    } else {
        render_map(frame, main_layout[0], &app.environment);
    }
    render_status(frame, main_layout[1], &app.environment);

    let help = if app.generation.is_some() {
        "Carving the maze. Press 'q' or 'Esc' to quit."
    } else if app.game_over {
        "Run over. Press 'q' or 'Esc' to quit and write the report."
    } else {
        "Press 'q' or 'Esc' to quit."
    };
    let help_text = Paragraph::new(help)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

fn tier_color(kind: ItemKind) -> Color {
    const CONSUMABLE: [Color; 3] = [Color::Red, Color::LightRed, Color::Magenta];
    const WEAPON: [Color; 3] = [Color::Yellow, Color::LightYellow, Color::LightMagenta];
    const ARMOR: [Color; 2] = [Color::Blue, Color::LightBlue];
    let palette: &[Color] = match kind.category {
        ItemCategory::Consumable => &CONSUMABLE,
        ItemCategory::Weapon => &WEAPON,
        ItemCategory::Armor => &ARMOR,
    };
    palette.get(kind.tier).copied().unwrap_or(Color::White)
}

fn cell_span(cell: CellType) -> Span<'static> {
    match cell {
        CellType::Wall => Span::styled("#", Style::default().fg(Color::DarkGray)),
        CellType::Path => Span::raw(" "),
        CellType::Entrance => Span::styled("E", Style::default().fg(Color::Green).bold()),
        CellType::Exit => Span::styled("X", Style::default().fg(Color::Green).bold()),
        CellType::Item(kind) => {
            let symbol = match kind.category {
                ItemCategory::Consumable => "%",
                ItemCategory::Weapon => "/",
                ItemCategory::Armor => "]",
            };
            Span::styled(symbol, Style::default().fg(tier_color(kind)))
        }
    }
}

/// Renders the maze with both agents onto the frame.
fn render_map(frame: &mut Frame, area: Rect, environment: &Environment) {
    let grid = environment.grid();
    let explorer = environment.explorer();
    let guardian = environment.guardian();

    let mut lines: Vec<Line> = Vec::with_capacity(grid.height());
    for y in 0..grid.height() {
        let mut spans: Vec<Span> = Vec::with_capacity(grid.width());
        for x in 0..grid.width() {
            let cell = Position::new(x, y);
            let span = if cell == explorer.position() {
                if explorer.is_dead() {
                    Span::styled("*", Style::default().fg(Color::Red).bold())
                } else {
                    Span::styled("@", Style::default().fg(Color::Cyan).bold())
                }
            } else if cell == guardian.position() && !guardian.is_hidden() {
                Span::styled("M", Style::default().fg(Color::Red).bold())
            } else {
                cell_span(grid[cell])
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }

    let title = format!("Labyrinth | round {}", environment.round());
    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title(title).borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

/// Renders the maze as carved so far, highlighting the latest step.
fn render_generation(frame: &mut Frame, area: Rect, replay: &GenerationReplay) {
    let grid = replay.grid();
    let mut lines: Vec<Line> = Vec::with_capacity(grid.height());
    for y in 0..grid.height() {
        let mut spans: Vec<Span> = Vec::with_capacity(grid.width());
        for x in 0..grid.width() {
            let cell = Position::new(x, y);
            let span = if replay.processing() == Some(cell) {
                Span::styled("?", Style::default().fg(Color::Black).bg(Color::Yellow))
            } else if replay.recent().contains(&cell) {
                Span::styled(" ", Style::default().bg(Color::Blue))
            } else {
                cell_span(grid[cell])
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }

    let title = format!("Labyrinth | carving, {} steps left", replay.remaining());
    let paragraph = Paragraph::new(lines)
        .block(Block::default().title(title).borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

/// Renders the guardian state and the explorer's energy and equipment.
fn render_status(frame: &mut Frame, area: Rect, environment: &Environment) {
    let guardian = environment.guardian();
    let explorer = environment.explorer();

    let guardian_state = match guardian.mode() {
        GuardianMode::Chase => Span::styled("CHASING", Style::default().fg(Color::Red).bold()),
        GuardianMode::Patrol => Span::raw(match guardian.destination() {
            Some(destination) => format!("patrolling to {destination}"),
            None => "patrolling".to_string(),
        }),
        GuardianMode::Hidden => Span::styled("withdrawn", Style::default().fg(Color::DarkGray)),
    };
    let guardian_line = Line::from(vec![
        Span::raw("Guardian: "),
        guardian_state,
        Span::raw(format!(
            " | perception: {}",
            environment.config().perception_radius
        )),
    ]);

    let mut explorer_text = format!(
        "Explorer: energy {}/{}",
        explorer.energy(),
        explorer.max_energy()
    );
    if explorer.items_enabled() {
        let show = |item: Option<ItemKind>| item.map_or("none".to_string(), |k| k.to_string());
        explorer_text.push_str(&format!(
            " | weapon: {} | armor: {}",
            show(explorer.weapon()),
            show(explorer.armor())
        ));
    } else {
        explorer_text.push_str(" | items disabled");
    }
    let mut lines = vec![guardian_line, Line::from(explorer_text)];
    if let Some(status) = environment.status() {
        lines.push(Line::from(Span::styled(
            format!("Game over: {status}"),
            Style::default().bold(),
        )));
    }

    let status_widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(status_widget, area);
}
