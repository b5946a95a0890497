use anyhow::{Context, Result};
use clap::Parser;
use rlog_replay::{
    FileSegmentLoader, FrameSink, LogSink, MessageSink, MockSegmentLoader, Replay, ReplayConfig, Route,
    SegmentFiles, SegmentLoader,
};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Log time of the first synthetic segment
const DEMO_START: u64 = 1_000_000_000_000;
const DEMO_HZ: u64 = 20;

#[derive(Parser)]
#[command(name = "rlog-replay", version)]
#[command(about = "Replay a recorded route at recorded pace", long_about = None)]
struct Cli {
    /// Route name, e.g. "a2a0ccea32023010|2023-07-27--13-01-19"
    route: String,

    /// Directory holding the route's segment folders
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Services to publish (comma separated)
    #[arg(long, value_delimiter = ',')]
    allow: Vec<String>,

    /// Services never published (comma separated)
    #[arg(long, value_delimiter = ',')]
    block: Vec<String>,

    /// Seconds into the route to start at
    #[arg(long)]
    start: Option<f64>,

    /// Playback speed, 0.1 to 10
    #[arg(long)]
    speed: Option<f64>,

    /// Replay synthetic data with this many segments
    #[arg(long, value_name = "SEGMENTS")]
    demo: Option<usize>,

    /// Persist the effective settings
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut ReplayConfig) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if !self.allow.is_empty() {
            config.allow = self.allow.clone();
        }
        if !self.block.is_empty() {
            config.block = self.block.clone();
        }
        if let Some(start) = self.start {
            config.start_seconds = start;
        }
        if let Some(speed) = self.speed {
            config.speed = speed;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    TogglePause,
    Seek(f64),
    Forward(f64),
    Back(f64),
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next()?;
    let arg = parts.next().and_then(|s| s.parse::<f64>().ok());

    match (cmd, arg) {
        ("p", _) => Some(Command::TogglePause),
        ("q", _) => Some(Command::Quit),
        ("s", Some(secs)) => Some(Command::Seek(secs)),
        ("f", Some(secs)) => Some(Command::Forward(secs)),
        ("b", Some(secs)) => Some(Command::Back(secs)),
        _ => None,
    }
}

/// Handle stdin commands until `q` or end of input
fn read_commands(replay: Arc<Replay>, quit: mpsc::UnboundedSender<()>) {
    for line in io::stdin().lock().lines() {
        let Ok(line) = line else {
            break;
        };
        match parse_command(&line) {
            Some(Command::TogglePause) => replay.pause(!replay.is_paused()),
            Some(Command::Seek(secs)) => replay.seek_to(secs, false),
            Some(Command::Forward(secs)) => replay.seek_to(secs, true),
            Some(Command::Back(secs)) => replay.seek_to(-secs, true),
            Some(Command::Quit) => {
                let _ = quit.send(());
                return;
            }
            None if line.trim().is_empty() => {}
            None => warn!("unknown command {:?} (p, s N, f N, b N, q)", line.trim()),
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ReplayConfig::load();
    cli.apply(&mut config);
    if cli.save_config {
        let path = config.save()?;
        info!("saved settings to {}", path.display());
    }

    // Create tokio runtime for segment loading
    let rt = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;

    let (route, loader): (Route, Arc<dyn SegmentLoader>) = match cli.demo {
        Some(segments) => (
            Route::from_segments(&cli.route, (0..segments).map(SegmentFiles::new).collect())?,
            Arc::new(MockSegmentLoader::new(DEMO_START, DEMO_HZ)),
        ),
        None => (
            Route::new(&cli.route, &config.data_dir)?,
            Arc::new(FileSegmentLoader::new()),
        ),
    };

    let sink = Arc::new(LogSink::new(io::stdout()));
    let message_sink: Arc<dyn MessageSink> = sink.clone();
    let frame_sink: Arc<dyn FrameSink> = sink.clone();

    let replay = Arc::new(
        Replay::new(route, config, loader, message_sink, rt.handle().clone()).with_frame_sink(frame_sink),
    );
    replay
        .start()
        .with_context(|| format!("failed to start replay of {}", cli.route))?;

    let (quit_tx, mut quit_rx) = mpsc::unbounded_channel();
    let commands = Arc::clone(&replay);
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || read_commands(commands, quit_tx))
        .context("failed to spawn command reader")?;

    rt.block_on(async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            Some(()) = quit_rx.recv() => {}
        }
    });

    replay.stop();
    info!(
        "published {} messages and {} frames",
        sink.message_count(),
        sink.frame_count()
    );
    Ok(())
}
