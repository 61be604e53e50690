use std::fs;
use std::io::{self, BufRead, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

use cadence::keyboard::find_first_unsupported_char;
use cadence::store::{JsonFileStore, SnapshotStore};
use cadence::surface::{open_locator, SurfaceBackend};
use cadence::{
    DeliveryStrategy, EngineConfig, Notification, Response, SessionState, SessionStatus,
    TypingController,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    Auto,
    X11,
    Stdout,
}

impl BackendArg {
    fn to_library(self) -> SurfaceBackend {
        match self {
            BackendArg::Auto => SurfaceBackend::Auto,
            BackendArg::X11 => SurfaceBackend::X11,
            BackendArg::Stdout => SurfaceBackend::Stdout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// One text-insertion command per character.
    Command,
    /// Synthetic key down/press/up events with Shift bracketing.
    KeySequence,
}

impl StrategyArg {
    fn to_library(self) -> DeliveryStrategy {
        match self {
            StrategyArg::Command => DeliveryStrategy::Command,
            StrategyArg::KeySequence => DeliveryStrategy::KeySequence,
        }
    }
}

#[derive(Debug, Args, Clone)]
struct SessionArgs {
    /// Surface backend.
    ///
    /// - auto: choose a backend based on the runtime environment
    /// - x11: type into the focused X11 window (XTEST)
    /// - stdout: dry run, print the characters
    #[arg(long, value_enum, default_value_t = BackendArg::Auto)]
    backend: BackendArg,

    /// Delivery strategy (overrides the config file). X11 needs key-sequence.
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Countdown seconds before typing starts
    #[arg(long, default_value_t = 5)]
    countdown: u64,

    /// Engine config file (JSON)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Optional RNG seed (for reproducible timing)
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Parser)]
#[command(name = "cadence")]
#[command(about = "Type a text block into an editor at a human cadence", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Type a text file into the target surface
    Run {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Target duration for the whole text, in minutes
        #[arg(long, default_value_t = 5.0)]
        minutes: f64,

        /// Character offset to start from
        #[arg(long, default_value_t = 0)]
        start_index: usize,

        /// Session snapshot file, rewritten on every state change
        #[arg(long, value_name = "PATH")]
        state: Option<PathBuf>,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Continue an interrupted run from its snapshot
    Resume {
        /// Session snapshot file written by a previous run
        #[arg(long, value_name = "PATH")]
        state: PathBuf,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Print the status stored in a snapshot file
    Status {
        #[arg(long, value_name = "PATH")]
        state: PathBuf,
    },
}

fn read_input(path: &Path) -> Result<String> {
    let text = if path.as_os_str() == std::ffi::OsStr::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };

    Ok(text.replace("\r\n", "\n"))
}

fn build_config(args: &SessionArgs, state: Option<PathBuf>) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    if let Some(strategy) = args.strategy {
        config.strategy = strategy.to_library();
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if state.is_some() {
        config.state_file = state;
    }

    Ok(config)
}

async fn countdown(secs: u64, stop: &AtomicBool) -> Result<()> {
    if secs == 0 {
        return Ok(());
    }

    eprintln!("Focus the target editor window. Starting in {secs}s...");
    for remaining in (1..=secs).rev() {
        if stop.load(Ordering::SeqCst) {
            return Err(anyhow!("aborted"));
        }
        eprintln!("{remaining}...");
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    if stop.load(Ordering::SeqCst) {
        return Err(anyhow!("aborted"));
    }
    Ok(())
}

async fn print_notifications(mut rx: UnboundedReceiver<Notification>, words_total: usize) {
    let mut last_percent = None;

    while let Some(notification) = rx.recv().await {
        match notification {
            Notification::Progress {
                progress,
                current_index,
                words_typed,
            } => {
                let percent = (progress * 100.0).floor() as u32;
                if last_percent != Some(percent) {
                    last_percent = Some(percent);
                    eprintln!(
                        "{percent:>3}%  {current_index} chars, {words_typed}/{words_total} words"
                    );
                }
            }
            Notification::Paused { current_index } => {
                eprintln!("Paused at character {current_index} (r to resume)");
            }
            Notification::Resumed { current_index } => {
                eprintln!("Resumed at character {current_index}");
            }
            Notification::Completed => eprintln!("Completed."),
            Notification::Stopped => eprintln!("Stopped."),
        }
    }
}

fn print_status(status: &SessionStatus) -> Result<()> {
    let json = serde_json::to_string_pretty(status).context("failed to serialize status")?;
    println!("{json}");
    Ok(())
}

/// Line-based control: p(ause), r(esume), s(top), ? (status).
fn control_from_stdin(controller: TypingController) {
    for line in io::stdin().lock().lines() {
        let Ok(line) = line else {
            return;
        };

        let response = match line.trim() {
            "p" | "pause" => controller.pause(),
            "r" | "resume" => controller.resume(),
            "s" | "stop" => controller.stop(),
            "?" | "status" => {
                if let Err(err) = print_status(&controller.status()) {
                    eprintln!("{err:#}");
                }
                continue;
            }
            "" => continue,
            other => {
                eprintln!("Unknown command {other:?} (p = pause, r = resume, s = stop, ? = status)");
                continue;
            }
        };

        if let Response::Ignored { .. } = response {
            eprintln!("Nothing to do in the current state.");
        }
    }
}

async fn type_text(
    text: String,
    total: Duration,
    start_index: usize,
    config: EngineConfig,
    backend: SurfaceBackend,
    countdown_secs: u64,
) -> Result<()> {
    if config.strategy == DeliveryStrategy::KeySequence {
        if let Some((idx, c)) = find_first_unsupported_char(&text) {
            eprintln!(
                "Warning: {c:?} at character {idx} has no key on a US layout; such characters are skipped."
            );
        }
    }

    let locator = open_locator(backend, config.strategy)?;

    let mut builder = TypingController::builder(locator).config(config.clone());
    if let Some(path) = &config.state_file {
        builder = builder.store(Box::new(JsonFileStore::new(path)));
    }
    let controller = builder.build();

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        let controller = controller.clone();
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::SeqCst);
            controller.stop();
        })
        .context("failed to install Ctrl+C handler")?;
    }

    countdown(countdown_secs, stop.as_ref()).await?;

    let words_total = cadence::session::count_words(&text);
    let printer = tokio::spawn(print_notifications(controller.observe(), words_total));

    match controller.start(&text, total, start_index) {
        Response::Started { current_index } => {
            eprintln!(
                "Typing {} characters from {current_index} over ~{:.1} min. Controls: p, r, s, ? + Enter.",
                text.chars().count(),
                total.as_secs_f64() / 60.0
            );
        }
        other => return Err(anyhow!("session did not start: {other:?}")),
    }

    {
        let controller = controller.clone();
        std::thread::spawn(move || control_from_stdin(controller));
    }

    let state = controller.settled().await;
    controller.detach();
    printer.await.context("notification printer panicked")?;

    match state {
        SessionState::Completed => Ok(()),
        _ => Err(anyhow!(
            "typing stopped at character {}",
            controller.status().current_index
        )),
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cadence=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            input,
            minutes,
            start_index,
            state,
            session,
        } => {
            let text = read_input(&input)?;
            let total_ms = cadence::config::minutes_to_ms(minutes)?;
            let config = build_config(&session, state)?;

            type_text(
                text,
                Duration::from_millis(total_ms),
                start_index,
                config,
                session.backend.to_library(),
                session.countdown,
            )
            .await?;
        }
        Command::Resume { state, session } => {
            let store = JsonFileStore::new(&state);
            let snapshot = store
                .load()?
                .ok_or_else(|| anyhow!("no snapshot at {}", store.path().display()))?;

            if snapshot.status.state == SessionState::Completed {
                return Err(anyhow!("the saved session already completed"));
            }

            let config = build_config(&session, Some(state))?;
            type_text(
                snapshot.text,
                Duration::from_millis(snapshot.status.total_duration_ms),
                snapshot.status.current_index,
                config,
                session.backend.to_library(),
                session.countdown,
            )
            .await?;
        }
        Command::Status { state } => {
            let status = JsonFileStore::new(&state)
                .load()?
                .map(|snapshot| snapshot.status)
                .unwrap_or_default();
            print_status(&status)?;
        }
    }

    Ok(())
}
