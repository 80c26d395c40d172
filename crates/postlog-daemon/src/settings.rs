//! Runtime configuration.
//!
//! Read from a TOML file layered under `POSTLOG_*` environment variables;
//! nested keys use a double underscore (`POSTLOG_TAIL__FILE`).

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use postlog_core::ThreadRecord;
use postlog_store_sqlite::DEFAULT_QUERY;
use serde::Deserialize;

use crate::Result;

/// Where the daemon looks for its config file when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/postlog/postlog.toml";

// ─── Settings ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub tail: TailSettings,
  pub sink: SinkSettings,
  pub log:  LogSettings,
}

impl Settings {
  /// Load `path` (optional) and the environment on top of the defaults.
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path.as_ref().to_path_buf()).required(false))
      .add_source(
        config::Environment::with_prefix("POSTLOG")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?;

    Ok(settings.try_deserialize()?)
  }
}

// ─── Tail ────────────────────────────────────────────────────────────────────

/// The log file to read and how to follow it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TailSettings {
  /// Mail log to read; `-` reads standard input.
  pub file:             PathBuf,
  /// Keep polling for new lines at EOF. When off, the file is read once
  /// from the start.
  pub follow:           bool,
  /// When following, start at the beginning instead of the current end.
  pub from_start:       bool,
  pub poll_interval_ms: u64,
}

impl Default for TailSettings {
  fn default() -> Self {
    Self {
      file:             PathBuf::from("/var/log/mail.log"),
      follow:           true,
      from_start:       false,
      poll_interval_ms: 250,
    }
  }
}

impl TailSettings {
  pub fn reads_stdin(&self) -> bool { self.file.as_os_str() == "-" }

  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms.max(1))
  }
}

// ─── Sink ────────────────────────────────────────────────────────────────────

/// What happens to a completed thread.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkSettings {
  /// SQLite file to write to. No database writes when unset.
  pub database:  Option<PathBuf>,
  /// Output query template, see [`postlog_store_sqlite::QueryTemplate`].
  pub query:     String,
  /// Persist only threads with a non-zero spam score.
  pub only_spam: bool,
  /// Also print every completed thread to stdout as one JSON line.
  pub json:      bool,
}

impl Default for SinkSettings {
  fn default() -> Self {
    Self {
      database:  None,
      query:     DEFAULT_QUERY.to_owned(),
      only_spam: true,
      json:      false,
    }
  }
}

impl SinkSettings {
  pub fn should_persist(&self, thread: &ThreadRecord) -> bool {
    !self.only_spam || thread.spam_score > 0
  }
}

// ─── Log ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogSettings {
  /// A `tracing` filter directive such as `info` or `postlog_core=debug`.
  pub level: Option<String>,
}
