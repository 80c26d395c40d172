//! SQLite sink for completed postlog threads.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. What gets written is driven by a
//! [`QueryTemplate`]: an SQL statement with `?i`/`?m`/`?f`/`?c`/`?t`/`?s`
//! placeholders bound from the finished [`postlog_core::ThreadRecord`].

mod schema;
mod store;
mod template;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteSink;
pub use template::{Column, DEFAULT_QUERY, QueryTemplate};

#[cfg(test)]
mod tests;
