//! CLI entry point for watchrun.
//!
//! Watches directories for changes and runs the configured commands after a
//! quiet period.
//!
//! # Usage
//!
//! ```bash
//! watchrun [OPTIONS] <COMMAND>
//!
//! # Watch using ./watchrun.yaml
//! watchrun run
//!
//! # Watch a directory and run one shell command
//! watchrun run --path ./src --cmd "cargo test" --debounce 500ms
//!
//! # Write a starter configuration for the current project
//! watchrun init
//!
//! # Check a configuration file
//! watchrun test-config --config watchrun.yaml
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wr_core::{
    write_example_ignore, write_template, Config, ExecutionMode, CONFIG_FILE_NAME,
    DEFAULT_DEBOUNCE, DEFAULT_MAX_CONCURRENCY, IGNORE_FILE_NAME,
};
use wr_runner::{Orchestrator, TracingReporter};
use wr_watcher::WatchManager;

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Watch files and run commands when they change.
#[derive(Parser)]
#[command(name = "watchrun", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Watch for changes and run commands.
    Run(RunArgs),

    /// Detect the project type and write a starter configuration.
    Init,

    /// Load and validate a configuration file, then print it.
    TestConfig {
        /// Configuration file to check.
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        config: Utf8PathBuf,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },
}

/// Options for `watchrun run`.
#[derive(Args, Debug)]
struct RunArgs {
    /// Configuration file (defaults to `watchrun.yaml`).
    #[arg(short, long, env = "WATCHRUN_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Directory to watch recursively.
    #[arg(short, long)]
    path: Option<Utf8PathBuf>,

    /// Shell command to run on change.
    #[arg(long)]
    cmd: Option<String>,

    /// Quiet period before commands run.
    #[arg(short, long, default_value = DEFAULT_DEBOUNCE)]
    debounce: String,

    /// Log commands instead of running them.
    #[arg(long)]
    dry_run: bool,

    /// Run commands one at a time, stopping at the first failure.
    #[arg(long)]
    sequential: bool,

    /// Per-command timeout.
    #[arg(long, default_value = "60s")]
    timeout: String,

    /// Maximum commands running at once in parallel mode.
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    max_concurrency: usize,
}

/// Output format for `test-config`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// YAML format.
    Yaml,
    /// JSON format.
    Json,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
/// `notify` and `mio` are filtered to `warn` level.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},mio=warn,notify=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var_os("NO_COLOR").is_none();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Cancels `cancel` on Ctrl-C, or SIGTERM on Unix.
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Shutdown signal received, stopping");
        cancel.cancel();
    });
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(error) => {
                warn!(error = %error, "Cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Builds the session [`Config`] from `run` arguments.
///
/// A config file is loaded when `--config` is given or when neither `--path`
/// nor `--cmd` is. Otherwise the configuration comes from flags and `--cmd` is
/// required.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded, `--cmd` is missing, or the
/// resulting configuration is invalid.
fn build_config(args: &RunArgs) -> color_eyre::Result<Config> {
    if args.config.is_some() || (args.path.is_none() && args.cmd.is_none()) {
        let path = args
            .config
            .clone()
            .unwrap_or_else(|| Utf8PathBuf::from(CONFIG_FILE_NAME));
        info!(path = %path, "Loading configuration");
        return Config::load(&path)
            .map_err(|e| color_eyre::eyre::eyre!("Failed to load {path}: {e}"));
    }

    let Some(cmd) = args.cmd.as_deref() else {
        return Err(color_eyre::eyre::eyre!(
            "--cmd is required when no config file is used"
        ));
    };
    let path = args.path.clone().unwrap_or_else(|| Utf8PathBuf::from("."));

    let config = Config::from_command_line(
        path,
        cmd,
        args.debounce.as_str(),
        args.timeout.as_str(),
        args.max_concurrency,
    );
    config.validate()?;
    Ok(config)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Watches until a shutdown signal and runs the commands for every change.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or watching cannot start.
async fn run_watch(args: &RunArgs) -> color_eyre::Result<()> {
    let config = build_config(args)?;
    print_config_summary(&config, args.sequential, args.dry_run);

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let mut manager = WatchManager::from_config(&config)?;
    let mut events = manager.start(&cancel)?;
    let orchestrator =
        Orchestrator::from_config(&config, args.sequential, args.dry_run, Arc::new(TracingReporter));

    info!("Watching for changes, press Ctrl-C to stop");

    let mut processed = 0usize;
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = events.recv() => {
                let Some(event) = event else { break };
                processed += 1;
                orchestrator.run(&event, &cancel).await;
            }
        }
    }

    manager.stop();
    info!(events = processed, "Stopped after processing {processed} change events");
    Ok(())
}

/// Writes `watchrun.yaml` and `.watchrunignore` in the current directory.
///
/// Files that already exist are left untouched.
///
/// # Errors
///
/// Returns an error if the current directory is not valid UTF-8 or a file
/// cannot be written.
fn run_init() -> color_eyre::Result<()> {
    let cwd = Utf8PathBuf::try_from(std::env::current_dir()?)
        .map_err(|e| color_eyre::eyre::eyre!("Current directory is not valid UTF-8: {e}"))?;
    init_in(&cwd)
}

fn init_in(dir: &Utf8Path) -> color_eyre::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        writeln!(handle, "{CONFIG_FILE_NAME} already exists, skipping")?;
    } else {
        let (kind, path) = write_template(dir)?;
        writeln!(handle, "Detected {kind} project")?;
        writeln!(handle, "Created {path}")?;
    }

    let ignore_path = dir.join(IGNORE_FILE_NAME);
    if ignore_path.exists() {
        writeln!(handle, "{IGNORE_FILE_NAME} already exists, skipping")?;
    } else {
        write_example_ignore(&ignore_path)?;
        writeln!(handle, "Created {ignore_path}")?;
    }

    Ok(())
}

/// Loads, validates and prints a configuration file.
///
/// # Errors
///
/// Returns an error if the file is invalid or cannot be serialized.
fn run_test_config(path: &Utf8Path, format: OutputFormat) -> color_eyre::Result<()> {
    let config = Config::load(path)?;
    let rendered = render_config(&config, format)?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "Configuration {path} is valid")?;
    writeln!(handle)?;
    write!(handle, "{rendered}")?;
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn render_config(config: &Config, format: OutputFormat) -> color_eyre::Result<String> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(config)
            .map_err(|e| color_eyre::eyre::eyre!("Failed to serialize YAML: {}", e)),
        OutputFormat::Json => serde_json::to_string_pretty(config)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| color_eyre::eyre::eyre!("Failed to serialize JSON: {}", e)),
    }
}

/// Prints what the session will watch and run.
fn print_config_summary(config: &Config, sequential: bool, dry_run: bool) {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let mode = if sequential {
        ExecutionMode::Sequential
    } else {
        ExecutionMode::Parallel
    };

    let _ = writeln!(handle);
    let _ = writeln!(handle, "watchrun configuration");
    let _ = writeln!(handle, "======================");
    let _ = writeln!(handle, "Watch roots:");
    for root in &config.watch {
        let recursive = if root.recursive { " (recursive)" } else { "" };
        let _ = writeln!(handle, "  {}{recursive}", root.path);
        if !root.ignore.is_empty() {
            let _ = writeln!(handle, "    ignore: {}", root.ignore.join(", "));
        }
    }
    if !config.ignore.is_empty() {
        let _ = writeln!(handle, "Global ignore: {}", config.ignore.join(", "));
    }
    let _ = writeln!(handle, "Commands:");
    for (index, command) in config.on_change.commands.iter().enumerate() {
        let _ = write!(handle, "  {}. {}", index + 1, command.display());
        if let Some(run) = command.run {
            let _ = write!(handle, " [{}]", run.as_str());
        }
        if let Some(timeout) = &command.timeout {
            let _ = write!(handle, " (timeout {timeout})");
        }
        let _ = writeln!(handle);
    }
    let _ = writeln!(handle, "Debounce:        {}", config.debounce);
    let _ = writeln!(handle, "Mode:            {}", mode.as_str());
    if !sequential {
        let _ = writeln!(handle, "Max concurrency: {}", config.max_concurrency);
    }
    if dry_run {
        let _ = writeln!(handle, "Dry run:         commands are logged, not executed");
    }
    let _ = writeln!(handle);
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Route to appropriate command
    match &cli.command {
        Commands::Run(args) => run_watch(args).await,
        Commands::Init => run_init(),
        Commands::TestConfig { config, format } => run_test_config(config, *format),
    }
}
