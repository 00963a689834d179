use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use chromium_ferry::config::{Config, Mode};
use chromium_ferry::pipeline::driver::{Action, Pipeline};
use chromium_ferry::pipeline::runner::SystemRunner;
use chromium_ferry::version::registries::VersionHistoryRegistry;
use chromium_ferry::version::types::{DownloadTarget, Version};

#[derive(Parser)]
#[command(name = "chromium-ferry")]
#[command(
    version,
    about = "Fetch, build and archive Chromium for Android releases across a USB bridge"
)]
struct Cli {
    /// JSON config file overriding the host defaults
    #[arg(long, env = "CHROMIUM_FERRY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured mode
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    #[command(flatten)]
    action: ActionArgs,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Args)]
#[group(multiple = false)]
struct ActionArgs {
    /// Sync artifacts between the tiers and exit
    #[arg(long)]
    sync: bool,

    /// Delete versions outside the retention policy and exit
    #[arg(long)]
    clean: bool,

    /// Download a version (or stable|beta|dev|canary) and exit (online only)
    #[arg(long, value_name = "VERSION")]
    download: Option<DownloadTarget>,

    /// Build a version and exit (offline only)
    #[arg(long, value_name = "VERSION")]
    build: Option<Version>,
}

impl ActionArgs {
    fn into_action(self) -> Action {
        if self.sync {
            Action::Sync
        } else if self.clean {
            Action::Clean
        } else if let Some(target) = self.download {
            Action::Download(target)
        } else if let Some(version) = self.build {
            Action::Build(version)
        } else {
            Action::Cycle
        }
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<Option<WorkerGuard>> {
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("chromium_ferry={level}").into())
    };

    let stderr_layer = if cli.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter())
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(filter())
            .boxed()
    };

    let (file_layer, guard) = match &cli.log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file path {:?}", path))?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter())
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(&cli)?;

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    info!("Running in {:?} mode", config.mode);

    let registry = Arc::new(VersionHistoryRegistry::new(&config.version_history_url));
    let pipeline = Pipeline::new(config, registry, Arc::new(SystemRunner));
    let action = cli.action.into_action();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(pipeline.execute(&action))?;

    Ok(())
}
