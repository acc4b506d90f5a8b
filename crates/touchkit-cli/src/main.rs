//! CLI for replaying touch automation commands against a UI tree dump.
//!
//! Commands are resolved against a JSON accessibility hierarchy and the
//! synthesized touch events are written to stdout as JSON lines, followed by
//! the command result.
//!
//! # Usage
//!
//! ```bash
//! # Drag across the screen over one second
//! touchkit drag 0 0 100 0 --duration 1.0
//!
//! # Drag at 800 points per second
//! touchkit drag 200 600 200 100 --velocity 800
//!
//! # Tap at coordinates
//! touchkit --app com.example.app tap-coordinate 50 50
//!
//! # Tap the one button labelled "Submit"
//! touchkit --tree screen.json --app com.example.app find-and-tap NAME Submit --button
//!
//! # Replay JSON-lines commands from a file (or stdin)
//! touchkit --tree screen.json run session.jsonl
//!
//! # Inspect or change the saved configuration
//! touchkit config show
//! touchkit config set-frame-interval 0.008
//! ```

mod sink;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use touchkit_core::application::Application;
use touchkit_core::command::{Command as TouchCommand, CommandLog};
use touchkit_core::config::TouchkitConfig;
use touchkit_core::dispatcher::{CommandDispatcher, DispatcherConfig};
use touchkit_core::geometry::Point;
use touchkit_core::injector::{ScheduledInjector, TouchInjector};
use touchkit_core::provider::TreeProvider;
use touchkit_core::query::QueryKind;
use touchkit_core::resolver::Narrowing;

use crate::sink::{ImmediateInjector, StdoutSink};

/// CLI for replaying touch automation commands against a UI tree dump.
#[derive(Parser)]
#[command(name = "touchkit")]
#[command(about = "Synthesize touch gestures for UI automation commands")]
#[command(version)]
struct Cli {
    /// Accessibility hierarchy dump (JSON object or array of roots)
    #[arg(short, long, env = "TOUCHKIT_TREE")]
    tree: Option<PathBuf>,

    /// Target application bundle ID
    #[arg(short, long, env = "TOUCHKIT_APP")]
    app: Option<String>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Config file (defaults to ~/.touchkit/config.json)
    #[arg(short, long, env = "TOUCHKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Emit events immediately instead of pacing them by timestamp
    #[arg(long)]
    instant: bool,

    /// Abort injection after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Suppress touch event output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Drag from one point to another
    #[command(allow_negative_numbers = true)]
    Drag {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        /// Gesture duration in seconds
        #[arg(short, long, default_value = "0")]
        duration: f64,
        /// Speed in points per second (overrides --duration)
        #[arg(short, long, default_value = "0")]
        velocity: f64,
    },

    /// Tap at screen coordinates
    #[command(allow_negative_numbers = true)]
    TapCoordinate {
        /// X coordinate
        x: f64,
        /// Y coordinate
        y: f64,
    },

    /// Resolve an element query and tap its centre
    FindAndTap {
        /// Query kind: ID, NAME, CLASS, VALUE or PREDICATE
        kind: QueryKind,
        /// Query value (glob for ID, NAME and VALUE)
        value: String,
        /// Narrow several matches to button-like elements
        #[arg(short, long)]
        button: bool,
        /// Filter by element type (e.g., Button, TextField)
        #[arg(short = 'T', long = "type")]
        element_type: Option<String>,
    },

    /// Execute JSON-lines commands from a file (reads from stdin if omitted)
    Run {
        file: Option<PathBuf>,
    },

    /// Show or change the saved configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Set the spacing between drag samples, in seconds
    SetFrameInterval { seconds: f64 },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

#[derive(Debug)]
enum CliError {
    /// A command ran and did not succeed.
    CommandFailed(String),
    /// Bad arguments, unreadable files, malformed input.
    Input(String),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::CommandFailed(_) => ExitCode::from(1),
            CliError::Input(_) => ExitCode::from(2),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::CommandFailed(msg) => write!(f, "Command failed: {}", msg),
            CliError::Input(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.clone().unwrap_or_else(TouchkitConfig::path);
    let config = TouchkitConfig::load_from(&config_path);

    if let Command::Config { ref action } = cli.command {
        return run_config(action, config, &config_path, cli.format);
    }

    let session = Session::open(&cli, &config)?;

    let outcome = match cli.command {
        Command::Drag { x1, y1, x2, y2, duration, velocity } => {
            session
                .execute(TouchCommand::Drag {
                    start: Point::new(x1, y1),
                    end: Point::new(x2, y2),
                    duration,
                    velocity,
                    application: cli.app.clone().map(Application::new),
                })
                .await
        }
        Command::TapCoordinate { x, y } => {
            let application = session.require_application()?;
            session
                .execute(TouchCommand::TapCoordinate { application, tap_point: Point::new(x, y) })
                .await
        }
        Command::FindAndTap { kind, ref value, button, ref element_type } => {
            let application = session.require_application()?;
            let narrowing = if button { Narrowing::ButtonLike } else { config.default_narrowing };
            session
                .execute(TouchCommand::FindAndTap {
                    application,
                    element_type: element_type.clone(),
                    query: kind,
                    query_value: value.clone(),
                    use_button_tap: narrowing == Narrowing::ButtonLike,
                })
                .await
        }
        Command::Run { ref file } => match file {
            Some(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|e| CliError::Input(format!("Failed to open {}: {}", path.display(), e)))?;
                session.run_lines(file).await
            }
            None => session.run_lines(tokio::io::stdin()).await,
        },
        Command::Config { .. } => unreachable!("handled above"),
    };

    debug!(events = session.sink.delivered(), "session finished");
    outcome
}

fn run_config(
    action: &ConfigAction,
    mut config: TouchkitConfig,
    path: &std::path::Path,
    format: OutputFormat,
) -> Result<(), CliError> {
    match action {
        ConfigAction::Show => {
            let json = serde_json::to_string_pretty(&config)
                .map_err(|e| CliError::Input(e.to_string()))?;
            if format == OutputFormat::Text {
                println!("# {}", path.display());
            }
            println!("{}", json);
        }
        ConfigAction::SetFrameInterval { seconds } => {
            if !(seconds.is_finite() && *seconds > 0.0) {
                return Err(CliError::Input(format!(
                    "frame interval must be a positive number of seconds, got {}",
                    seconds
                )));
            }
            config.frame_interval_secs = *seconds;
            config
                .save_to(path)
                .map_err(|e| CliError::Input(format!("Failed to save {}: {}", path.display(), e)))?;
            eprintln!("Frame interval set to {}s", seconds);
        }
    }
    Ok(())
}

/// A dispatcher wired to the tree dump and stdout.
struct Session {
    dispatcher: CommandDispatcher,
    sink: Arc<StdoutSink>,
    application: Option<Application>,
    format: OutputFormat,
}

impl Session {
    fn open(cli: &Cli, config: &TouchkitConfig) -> Result<Self, CliError> {
        let provider = match &cli.tree {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .map_err(|e| CliError::Input(format!("Failed to read {}: {}", path.display(), e)))?;
                TreeProvider::from_json(&json)
                    .map_err(|e| CliError::Input(format!("Failed to parse {}: {}", path.display(), e)))?
            }
            None => TreeProvider::new(Vec::new()),
        };

        let application = cli
            .app
            .clone()
            .or_else(|| config.default_application.clone())
            .map(Application::new);

        let sink = Arc::new(StdoutSink::new(cli.quiet));
        let injector: Arc<dyn TouchInjector> = if cli.instant {
            Arc::new(ImmediateInjector::new(sink.clone()))
        } else {
            Arc::new(ScheduledInjector::new(sink.clone()))
        };

        let mut dispatcher_config = DispatcherConfig::from(config);
        if let Some(ms) = cli.timeout_ms {
            dispatcher_config.injection_timeout = Some(Duration::from_millis(ms));
        }

        // Target of drags that name no application.
        let active = application.clone().unwrap_or_else(|| Application::new("default"));
        let dispatcher =
            CommandDispatcher::new(Arc::new(provider), injector, active).with_config(dispatcher_config);

        Ok(Self { dispatcher, sink, application, format: cli.format })
    }

    fn require_application(&self) -> Result<Application, CliError> {
        self.application.clone().ok_or_else(|| {
            CliError::Input("no target application; pass --app or set default_application".to_string())
        })
    }

    /// Executes one command and reports its log.
    async fn execute(&self, command: TouchCommand) -> Result<(), CliError> {
        let log = self.dispatcher.execute(command).await;
        self.report(&log).await?;
        if log.result.is_ok() {
            Ok(())
        } else {
            Err(CliError::CommandFailed(log.result.message))
        }
    }

    /// Executes JSON-lines commands in order, continuing past failures.
    ///
    /// A line that does not parse stops the run.
    async fn run_lines<R: AsyncRead + Unpin>(&self, reader: R) -> Result<(), CliError> {
        let mut lines = BufReader::new(reader).lines();
        let mut failed = 0usize;
        let mut line_no = 0usize;

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| CliError::Input(format!("Failed to read commands: {}", e)))?
        {
            line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let command: TouchCommand = serde_json::from_str(line)
                .map_err(|e| CliError::Input(format!("line {}: {}", line_no, e)))?;
            let log = self.dispatcher.execute(command).await;
            self.report(&log).await?;
            if !log.result.is_ok() {
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(CliError::CommandFailed(format!("{} command(s) failed", failed)));
        }
        Ok(())
    }

    async fn report(&self, log: &CommandLog) -> Result<(), CliError> {
        let line = match self.format {
            OutputFormat::Json => {
                serde_json::to_string(log).map_err(|e| CliError::Input(e.to_string()))?
            }
            OutputFormat::Text => {
                let status = serde_json::to_value(log.result.status)
                    .ok()
                    .and_then(|v| v.as_str().map(String::from))
                    .unwrap_or_default();
                format!(
                    "|{}|{}|{}|{}|{}ms|",
                    log.timestamp.format("%Y-%m-%d %H:%M:%S%.3fZ"),
                    log.command.name(),
                    status,
                    log.result.message,
                    log.elapsed_ms
                )
            }
        };
        self.sink
            .write_line(&line)
            .await
            .map_err(|e| CliError::Input(format!("Failed to write output: {}", e)))
    }
}
