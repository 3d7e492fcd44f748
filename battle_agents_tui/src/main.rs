use anyhow::{Context, Result};
use battle_agents_core::{
    AgentIdentity, Offset, Position,
    action::Action,
    agent::{Agent, AgentKind, Perception},
    config::AgentConfig,
    observation::{ALLY_CHANNEL, OBSTACLE_CHANNEL, Observation, load_observation_from_string},
    observer::{DecisionObserver, DecisionReason, TracingObserver},
};
use clap::{Parser, ValueEnum};
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
    io::{self, Stdout},
    path::PathBuf,
    sync::mpsc::{self, Receiver, Sender},
    time::Duration,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Lines kept in the decision log panel.
const LOG_CAPACITY: usize = 200;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Inspect battle agent decisions on a saved observation",
    long_about = None
)]
struct Args {
    /// Observation file to load
    #[arg(short, long, value_name = "OBSERVATION_FILE")]
    observation: Option<PathBuf>,

    /// Agent names, e.g. redmelee_0 or blueranged_3
    #[arg(short, long = "agent", value_name = "NAME")]
    agents: Vec<String>,

    /// Policy driving every agent
    #[arg(short, long, value_enum, default_value_t = Policy::Greedy)]
    policy: Policy,

    /// The observation carries a minimap layer (enemies on channel 4)
    #[arg(long)]
    minimap_mode: bool,

    /// Column of the acting agent inside the observation
    #[arg(long, default_value_t = 6)]
    reference_x: usize,

    /// Row of the acting agent inside the observation
    #[arg(long, default_value_t = 6)]
    reference_y: usize,

    /// Seed for random agents
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Decide once, log through tracing and exit
    #[arg(long)]
    headless: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Policy {
    Random,
    DoNothing,
    Greedy,
}

impl From<Policy> for AgentKind {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Random => AgentKind::Random,
            Policy::DoNothing => AgentKind::DoNothing,
            Policy::Greedy => AgentKind::Greedy,
        }
    }
}

/// Forwards decisions to the log panel as text lines.
struct ChannelObserver {
    log_tx: Sender<String>,
}

impl ChannelObserver {
    fn send(&self, line: String) {
        // the app owns the receiver for its whole lifetime
        let _ = self.log_tx.send(line);
    }
}

impl DecisionObserver for ChannelObserver {
    fn on_enemies_located(&mut self, agent: &AgentIdentity, enemies: &[Position]) {
        if enemies.is_empty() {
            self.send(format!("[{agent}] no enemies in view"));
        } else {
            self.send(format!("[{agent}] {} enemies in view", enemies.len()));
        }
    }

    fn on_target_selected(
        &mut self,
        agent: &AgentIdentity,
        target: Position,
        offset: Offset,
        distance: f64,
    ) {
        self.send(format!(
            "[{agent}] target {target}, offset {offset}, distance {distance:.2}"
        ));
    }

    fn on_action_selected(
        &mut self,
        agent: &AgentIdentity,
        action: Action,
        reason: DecisionReason,
    ) {
        self.send(format!(
            "[{agent}] {action} ({}) {reason:?}",
            action.index()
        ));
    }

    fn on_unit_done(&mut self, agent: &AgentIdentity) {
        self.send(format!("[{agent}] done, no action"));
    }
}

/// Outcome of one agent's last decision, ready for display.
struct Decision {
    name: String,
    outcome: String,
}

struct App {
    observation: Observation,
    config: AgentConfig,
    agents: Vec<Box<dyn Agent>>,
    decisions: Vec<Decision>,
    log: Vec<String>,
    log_rx: Receiver<String>,
    tick: u64,
    /// Deliver `done` to every agent, as if all units had died.
    units_done: bool,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(observation: Observation, config: AgentConfig, mut agents: Vec<Box<dyn Agent>>) -> Self {
        let (log_tx, log_rx) = mpsc::channel();
        for agent in &mut agents {
            agent.attach_observer(Box::new(ChannelObserver {
                log_tx: log_tx.clone(),
            }));
        }

        App {
            observation,
            config,
            agents,
            decisions: Vec::new(),
            log: Vec::new(),
            log_rx,
            tick: 0,
            units_done: false,
            should_quit: false,
        }
    }

    /// Runs one see/action round for every agent.
    fn tick(&mut self) {
        self.tick += 1;
        self.log.push(format!("-- tick {} --", self.tick));
        self.decisions = decide_all(&mut self.agents, &self.observation, self.units_done);
        self.log.extend(self.log_rx.try_iter());
        if self.log.len() > LOG_CAPACITY {
            let excess = self.log.len() - LOG_CAPACITY;
            self.log.drain(..excess);
        }
    }

    fn toggle_done(&mut self) {
        self.units_done = !self.units_done;
        self.tick();
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn decide_all(
    agents: &mut [Box<dyn Agent>],
    observation: &Observation,
    done: bool,
) -> Vec<Decision> {
    agents
        .iter_mut()
        .map(|agent| {
            agent.see(Perception::new(observation.clone(), 0.0, done));
            let outcome = match agent.action() {
                Ok(Some(action)) => format!("{action} ({})", action.index()),
                Ok(None) => "no action".to_string(),
                Err(err) => format!("error: {err}"),
            };
            Decision {
                name: agent.identity().to_string(),
                outcome,
            }
        })
        .collect()
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("battle_agents_core=debug,info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    // If no observation file is provided, use the bundled skirmish
    let observation_file = args
        .observation
        .unwrap_or(PathBuf::from("observations/skirmish.txt"));
    let config = AgentConfig {
        minimap_mode: args.minimap_mode,
        reference_position: Position::new(args.reference_x, args.reference_y),
    };

    let text = std::fs::read_to_string(&observation_file).with_context(|| {
        format!(
            "Failed to read observation file {}",
            observation_file.display()
        )
    })?;
    let observation = load_observation_from_string(&text, &config)?;

    let names = if args.agents.is_empty() {
        ["redmelee_0", "redranged_1", "bluemele_0", "blueranged_1"]
            .map(String::from)
            .to_vec()
    } else {
        args.agents
    };
    let kind = AgentKind::from(args.policy);
    let mut agents = names
        .iter()
        .enumerate()
        .map(|(i, name)| kind.build(name, &config, args.seed.wrapping_add(i as u64)))
        .collect::<Result<Vec<_>, _>>()?;

    if args.headless {
        init_logging();
        for agent in &mut agents {
            agent.attach_observer(Box::new(TracingObserver));
        }
        for decision in decide_all(&mut agents, &observation, false) {
            tracing::info!(agent = %decision.name, "{}", decision.outcome);
        }
        return Ok(());
    }

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Create the application state
    let mut app = App::new(observation, config, agents);
    app.tick();

    // Run the main application loop
    let result = run_app(&mut terminal, &mut app);

    // Restore the terminal state
    restore_terminal(&mut terminal)?;

    result
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
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let poll_rate = Duration::from_millis(250);

    loop {
        terminal.draw(|f| ui(f, app))?;

        if crossterm::event::poll(poll_rate)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char(' ') | KeyCode::Enter => app.tick(),
                    KeyCode::Char('d') => app.toggle_done(),
                    _ => {}
                }
            }
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
            Constraint::Percentage(60), // observation and decisions
            Constraint::Percentage(35), // decision log
            Constraint::Percentage(5),  // help
        ])
        .split(frame.area());

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(main_layout[0]);

    render_observation(frame, top[0], &app.observation, &app.config);
    render_decisions(frame, top[1], app);
    render_log(frame, main_layout[1], &app.log);

    let help_text = Paragraph::new("space: next tick  d: toggle done  q/Esc: quit")
        .alignment(Alignment::Center);
    frame.render_widget(help_text, main_layout[2]);
}

/// Renders the chosen action of every agent.
fn render_decisions(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .decisions
        .iter()
        .map(|decision| {
            let style = if decision.outcome.starts_with("error") {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            ListItem::from(Line::from(vec![
                Span::styled(format!("{:<16}", decision.name), Style::default().bold()),
                Span::styled(decision.outcome.clone(), style),
            ]))
        })
        .collect();

    let title = format!(
        "Decisions (tick {}{})",
        app.tick,
        if app.units_done { ", done" } else { "" }
    );
    let widget = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(widget, area);
}

/// Renders the most recent log lines that fit the panel.
fn render_log(frame: &mut Frame, area: Rect, log: &[String]) {
    let visible = area.height.saturating_sub(2) as usize;
    let start = log.len().saturating_sub(visible);
    let lines: Vec<Line> = log[start..].iter().map(|l| Line::from(l.as_str())).collect();
    let widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Decision log"));
    frame.render_widget(widget, area);
}

/// Renders the observation: enemies, allies, obstacles and the acting cell.
fn render_observation(
    frame: &mut Frame,
    area: Rect,
    observation: &Observation,
    config: &AgentConfig,
) {
    let enemies = observation.channel(config.enemy_channel());
    let allies = observation.channel(ALLY_CHANNEL);
    let obstacles = observation.channel(OBSTACLE_CHANNEL);
    let is_set = |layer: Option<&battle_agents_core::map::Grid<f32>>, x, y| {
        layer.and_then(|grid| grid.get(x, y)).is_some_and(|v| *v == 1.0)
    };

    let mut lines: Vec<Line> = Vec::with_capacity(observation.height());
    for y in 0..observation.height() {
        let mut spans: Vec<Span> = Vec::with_capacity(observation.width());
        for x in 0..observation.width() {
            let span = if Position::new(x, y) == config.reference_position {
                Span::styled("@ ", Style::default().fg(Color::Yellow).bold())
            } else if is_set(enemies, x, y) {
                Span::styled("E ", Style::default().fg(Color::Red).bold())
            } else if is_set(allies, x, y) {
                Span::styled("A ", Style::default().fg(Color::Blue))
            } else if is_set(obstacles, x, y) {
                Span::styled("# ", Style::default().fg(Color::DarkGray))
            } else {
                Span::raw(". ")
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }

    let paragraph = Paragraph::new(lines)
        .block(Block::default().title("Observation").borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}
