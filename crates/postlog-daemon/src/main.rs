//! postlog binary.
//!
//! Reads `/etc/postlog/postlog.toml` (or the path given with `--config`),
//! tails the mail log and reports every finished mail thread with its spam
//! score.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{ArgAction, Parser};
use postlog_daemon::{Settings, settings::DEFAULT_CONFIG_PATH};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Correlate postfix, spamd and amavis log lines")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short = 'C', long, default_value = DEFAULT_CONFIG_PATH)]
  config: PathBuf,

  /// Mail log to read instead of `tail.file`; `-` reads stdin.
  #[arg(short, long)]
  file: Option<PathBuf>,

  /// Read the log once from the start and exit instead of following it.
  #[arg(long)]
  replay: bool,

  /// Raise log verbosity (-v info, -vv debug, -vvv trace).
  #[arg(short, long, action = ArgAction::Count)]
  verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  // Load configuration.
  let mut settings = Settings::load(&cli.config).with_context(|| {
    format!("failed to load configuration from {}", cli.config.display())
  })?;
  if let Some(file) = cli.file {
    settings.tail.file = file;
  }
  if cli.replay {
    settings.tail.follow = false;
  }

  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(env_filter(cli.verbose, settings.log.level.as_deref())?)
    .init();

  tracing::info!(version = env!("CARGO_PKG_VERSION"), "postlog starting");

  let stats = postlog_daemon::run(settings, async {
    if tokio::signal::ctrl_c().await.is_err() {
      std::future::pending::<()>().await;
    }
  })
  .await
  .context("postlog stopped")?;

  tracing::debug!(?stats, "run totals");
  Ok(())
}

/// `-v` wins over `log.level`, which wins over `RUST_LOG`.
fn env_filter(verbose: u8, level: Option<&str>) -> anyhow::Result<EnvFilter> {
  let directive = match verbose {
    0 => None,
    1 => Some(LevelFilter::INFO),
    2 => Some(LevelFilter::DEBUG),
    _ => Some(LevelFilter::TRACE),
  };

  if let Some(directive) = directive {
    return Ok(EnvFilter::new(directive.to_string()));
  }
  if let Some(level) = level {
    return EnvFilter::try_new(level)
      .with_context(|| format!("invalid log.level {level:?}"));
  }
  Ok(
    EnvFilter::builder()
      .with_default_directive(LevelFilter::INFO.into())
      .from_env_lossy(),
  )
}
