//! Error types for the postlog line parser.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
  /// The line (or payload) does not have the shape this extractor reads.
  #[error("line format is not recognized")]
  FormatNotRecognized,

  /// A spam-scanner result line whose message identity is a placeholder
  /// such as `< >` or `(unknown)`.
  #[error("scanner result without usable message id: {0}")]
  MalformedScannerResult(String),

  #[error(transparent)]
  Core(#[from] postlog_core::Error),
}

impl Error {
  /// True for every condition that means "this line is not for this
  /// extractor" rather than a real fault.
  pub fn is_not_recognized(&self) -> bool {
    matches!(
      self,
      Self::FormatNotRecognized
        | Self::MalformedScannerResult(_)
        | Self::Core(postlog_core::Error::EmptyIdentity)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
