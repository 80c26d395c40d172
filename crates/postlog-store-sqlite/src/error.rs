//! Error type for `postlog-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// The output template contains no SQL at all.
  #[error("output query template is empty")]
  EmptyTemplate,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
