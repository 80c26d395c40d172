//! Error type for `postlog-daemon`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  #[error("sink error: {0}")]
  Sink(#[from] postlog_store_sqlite::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
