mod commands;
mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use gpsreplay_logic::{AdvanceMode, CourseMode, ReplaySettings, prelude::*};
use log::LevelFilter;

#[derive(Parser)]
#[command(
    name = "gpsreplay",
    version,
    about = "Replay a recorded GPX route as a stream of simulated GPS fixes"
)]
struct Cli {
    /// Log more, pass twice for trace output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CourseValue {
    TowardNext,
    Legacy,
}

impl From<CourseValue> for CourseMode {
    fn from(value: CourseValue) -> Self {
        match value {
            CourseValue::TowardNext => CourseMode::TowardNextWaypoint,
            CourseValue::Legacy => CourseMode::LegacySelfBearing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum AdvanceValue {
    Single,
    CatchUp,
}

impl From<AdvanceValue> for AdvanceMode {
    fn from(value: AdvanceValue) -> Self {
        match value {
            AdvanceValue::Single => AdvanceMode::SingleBoundary,
            AdvanceValue::CatchUp => AdvanceMode::CatchUp,
        }
    }
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// GPX file holding the route
    file: PathBuf,

    /// JSON file with replay settings, missing fields use the defaults
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Milliseconds between fixes
    #[arg(long)]
    interval_ms: Option<u64>,

    /// What to report as the course of each fix
    #[arg(long, value_enum)]
    course: Option<CourseValue>,

    /// What to do when a tick lands past the next waypoint
    #[arg(long, value_enum)]
    advance: Option<AdvanceValue>,
}

impl ReplayArgs {
    /// Settings from the settings file (or defaults) with command line overrides applied
    fn load_settings(&self) -> Result<ReplaySettings> {
        let mut settings = if let Some(path) = &self.settings {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse settings in {}", path.display()))?
        } else {
            ReplaySettings::default()
        };

        if let Some(interval_ms) = self.interval_ms {
            settings.tick_interval_ms = interval_ms;
        }
        if let Some(course) = self.course {
            settings.course = course.into();
        }
        if let Some(advance) = self.advance {
            settings.advance = advance.into();
        }

        settings.validate().context("Invalid replay settings")?;

        Ok(settings)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a route in real time, printing one JSON fix per line
    Play {
        #[command(flatten)]
        replay: ReplayArgs,

        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Print the waypoints and segments of a route
    Inspect {
        /// GPX file holding the route
        file: PathBuf,
    },
    /// Fast-forward a replay from the first waypoint's timestamp, printing every fix
    Simulate {
        #[command(flatten)]
        replay: ReplayArgs,

        /// Simulated seconds to run for
        #[arg(long)]
        seconds: u64,
    },
}

fn init_logging(verbose: u8) {
    let mut builder = colog::default_builder();
    builder.filter_level(match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    });
    builder.parse_default_env();
    builder.init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Play {
            replay,
            duration_secs,
        } => commands::play(&replay, duration_secs).await,
        Commands::Inspect { file } => commands::inspect(&file),
        Commands::Simulate { replay, seconds } => commands::simulate(&replay, seconds),
    }
}
