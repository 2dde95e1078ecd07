//! groutgw command line
//!
//! - `run`: scan on schedule until SIGINT/SIGTERM
//! - `scan-once`: one pass right now
//! - `convert`: convert a single file, no archiving
//! - `config`: print the resolved settings

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use groutgw::{
    CancellationToken, DirectoryScanner, Progress, ProgressSink, ScanEngine, ScanEvent,
    ScanEventKind, ScanSettings, Scheduler, SchedulerConfig, SettingsFile, TracingSink,
    DEFAULT_SETTINGS_FILE,
};
use groutgw_logging::{init_logging, ActivityLog, LogConfig};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const INTERRUPT_REASON: &str = "Interrupted by signal";

#[derive(Parser, Debug)]
#[command(
    name = "groutgw",
    version,
    about = "Convert GroutIt exports into GW measurement files"
)]
struct Cli {
    /// Settings file (default: groutgw.toml in the working directory, if present)
    #[arg(short, long, global = true, env = "GROUTGW_CONFIG")]
    config: Option<PathBuf>,

    /// Mirror info logs on stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Command-line overrides, applied on top of the settings file.
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Directory watched for exports
    #[arg(long, global = true, value_name = "DIR")]
    input: Option<PathBuf>,

    /// Directory receiving converted files
    #[arg(long = "output-dir", global = true, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Archive for converted sources
    #[arg(long, global = true, value_name = "DIR")]
    processed: Option<PathBuf>,

    /// Archive for rejected sources
    #[arg(long, global = true, value_name = "DIR")]
    error: Option<PathBuf>,

    /// Scan interval in seconds, within (1, 3600]
    #[arg(long, global = true, value_name = "SECS", allow_negative_numbers = true)]
    interval: Option<i64>,

    /// Expected spacing of export rows in minutes
    #[arg(long = "output-interval", global = true, value_name = "MINUTES")]
    output_interval: Option<u32>,
}

impl Overrides {
    fn to_settings_file(&self) -> SettingsFile {
        SettingsFile {
            input_dir: self.input.clone(),
            output_dir: self.output_dir.clone(),
            processed_dir: self.processed.clone(),
            error_dir: self.error.clone(),
            scan_interval_secs: self.interval,
            output_interval_minutes: self.output_interval,
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan the input directory on schedule until interrupted
    Run {
        /// Create missing directories before starting
        #[arg(long)]
        create_dirs: bool,
    },

    /// Run one scan pass immediately
    ScanOnce {
        /// Create missing directories before scanning
        #[arg(long)]
        create_dirs: bool,
    },

    /// Convert one export without moving it
    Convert {
        /// GroutIt export to convert
        file: PathBuf,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the resolved settings as TOML
    Config,
}

/// Prints progress lines to stdout in the activity log format.
struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn notify(&self, event: &ScanEvent) {
        println!("{} : {}", event.at.format("%Y-%m-%d %H:%M:%S"), event.message());
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(LogConfig {
        app_name: "groutgw",
        verbose: cli.verbose,
        log_dir: None,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    match run_command(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:?}", err);
            ExitCode::from(1)
        }
    }
}

fn run_command(cli: Cli) -> Result<ExitCode> {
    let settings = load_settings(&cli)?;
    match cli.command {
        Commands::Run { create_dirs } => cmd_run(settings, create_dirs),
        Commands::ScanOnce { create_dirs } => cmd_scan_once(settings, create_dirs),
        Commands::Convert { file, output } => cmd_convert(&settings, &file, output.as_deref()),
        Commands::Config => {
            let text = toml::to_string_pretty(&settings).context("Failed to serialize settings")?;
            print!("{}", text);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_settings(cli: &Cli) -> Result<ScanSettings> {
    let mut settings = match &cli.config {
        Some(path) => ScanSettings::load(path)?,
        None => ScanSettings::load_or_default(Path::new(DEFAULT_SETTINGS_FILE))?,
    };
    settings.apply(cli.overrides.to_settings_file());
    Ok(settings)
}

fn progress_for(settings: &ScanSettings) -> Progress {
    Progress::new()
        .with_sink(ConsoleSink)
        .with_sink(ActivityLog::new(settings.activity_log.clone()))
        .with_sink(TracingSink)
}

fn prepare_directories(settings: &ScanSettings, create: bool) -> Result<()> {
    if create {
        for dir in settings
            .ensure_directories()
            .context("Failed to create directories")?
        {
            println!("Created {}", dir.display());
        }
    }
    Ok(())
}

fn cmd_run(settings: ScanSettings, create_dirs: bool) -> Result<ExitCode> {
    prepare_directories(&settings, create_dirs)?;
    let settings = Arc::new(settings);

    let engine = Arc::new(DirectoryScanner::new(Arc::clone(&settings)));
    let scheduler = Scheduler::new(
        SchedulerConfig::from_settings(&settings),
        engine,
        progress_for(&settings),
    );

    let shutdown = install_signal_handlers()?;
    info!(
        input = %settings.input_dir.display(),
        interval_secs = settings.scan_interval_secs(),
        "Starting scheduler"
    );
    if !scheduler.start() {
        bail!("Failed to start the scan loop");
    }

    while !shutdown.load(Ordering::SeqCst) && scheduler.is_alive() {
        std::thread::sleep(Duration::from_millis(100));
    }
    scheduler.stop(Some(INTERRUPT_REASON));
    scheduler.wait();

    let stats = scheduler.stats();
    println!();
    println!("Passes run:        {}", stats.passes);
    println!("Passes aborted:    {}", stats.passes_aborted);
    println!("Files converted:   {}", stats.files_converted);
    println!("Files failed:      {}", stats.files_failed);
    println!("Errors this run:   {}", stats.errors());
    Ok(ExitCode::SUCCESS)
}

fn cmd_scan_once(settings: ScanSettings, create_dirs: bool) -> Result<ExitCode> {
    prepare_directories(&settings, create_dirs)?;
    let settings = Arc::new(settings);
    let progress = progress_for(&settings);
    let scanner = DirectoryScanner::new(Arc::clone(&settings));

    match scanner.run_pass(&progress, &CancellationToken::new()) {
        Ok(summary) => {
            println!(
                "{} file(s) found, {} converted, {} failed",
                summary.files_found, summary.converted, summary.failed
            );
            if summary.unarchived > 0 {
                println!(
                    "{} failed file(s) left in {}",
                    summary.unarchived,
                    settings.input_dir.display()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            progress.emit(ScanEventKind::PassAborted {
                error: err.to_string(),
            });
            Ok(ExitCode::from(1))
        }
    }
}

fn cmd_convert(settings: &ScanSettings, file: &Path, output: Option<&Path>) -> Result<ExitCode> {
    let content = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Not a file path: {}", file.display()))?;

    let rows = groutgw_convert::convert(&name, &content, &settings.parse_options())
        .with_context(|| format!("Failed to convert {}", file.display()))?;
    let text = groutgw_convert::render(&rows);

    match output {
        Some(path) => {
            fs::write(path, &text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {} rows to {}", rows.len(), path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn install_signal_handlers() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handler = Arc::clone(&shutdown);

    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals =
            Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handlers")?;
        std::thread::spawn(move || {
            if let Some(sig) = signals.forever().next() {
                info!("Received signal {}, stopping...", sig);
                shutdown_handler.store(true, Ordering::SeqCst);
            }
        });
    }

    #[cfg(windows)]
    {
        ctrlc::set_handler(move || {
            info!("Received Ctrl+C, stopping...");
            shutdown_handler.store(true, Ordering::SeqCst);
        })
        .context("Failed to install Ctrl+C handler")?;
    }

    Ok(shutdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_overrides() {
        let cli = Cli::try_parse_from([
            "groutgw",
            "scan-once",
            "--input",
            "/in",
            "--interval",
            "30",
            "--output-interval",
            "2",
        ])
        .unwrap();

        let mut settings = ScanSettings::default();
        settings.apply(cli.overrides.to_settings_file());
        assert_eq!(settings.input_dir, PathBuf::from("/in"));
        assert_eq!(settings.scan_interval_secs(), 30);
        assert_eq!(settings.output_interval_minutes, 2);
        assert_eq!(settings.output_dir, PathBuf::from("output"));
        assert!(matches!(cli.command, Commands::ScanOnce { create_dirs: false }));
    }

    #[test]
    fn test_cli_convert_output_is_distinct_from_output_dir() {
        let cli = Cli::try_parse_from([
            "groutgw",
            "convert",
            "a.csv",
            "--output",
            "a.txt",
            "--output-dir",
            "/out",
        ])
        .unwrap();

        match cli.command {
            Commands::Convert { file, output } => {
                assert_eq!(file, PathBuf::from("a.csv"));
                assert_eq!(output, Some(PathBuf::from("a.txt")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.overrides.output_dir, Some(PathBuf::from("/out")));
    }

    #[test]
    fn test_invalid_interval_override_keeps_file_value() {
        let cli = Cli::try_parse_from(["groutgw", "config", "--interval", "-4"]).unwrap();
        let mut settings = ScanSettings::default();
        settings.apply(cli.overrides.to_settings_file());
        assert_eq!(settings.scan_interval_secs(), 10);
    }
}
