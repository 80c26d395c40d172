//! [`SqliteSink`]: writes completed threads through an output template.

use std::path::Path;

use postlog_core::ThreadRecord;
use tracing::debug;

use crate::{Result, schema::SCHEMA, template::QueryTemplate};

// ─── Sink ────────────────────────────────────────────────────────────────────

/// Persists completed threads to a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteSink {
  pub(crate) conn:     tokio_rusqlite::Connection,
  pub(crate) template: QueryTemplate,
}

impl SqliteSink {
  /// Open (or create) a database at `path`, run schema initialisation and
  /// prepare the output statement.
  pub async fn open(
    path: impl AsRef<Path>,
    template: QueryTemplate,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let sink = Self { conn, template };
    sink.init().await?;
    Ok(sink)
  }

  /// Open an in-memory database, mainly for tests.
  pub async fn open_in_memory(template: QueryTemplate) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let sink = Self { conn, template };
    sink.init().await?;
    Ok(sink)
  }

  /// Create the schema, then prepare the output statement so a template
  /// that does not fit the database fails here rather than per thread.
  async fn init(&self) -> Result<()> {
    let sql = self.template.sql().to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(SCHEMA)?;
        conn.prepare_cached(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run the output query for `thread`. Returns the number of rows the
  /// statement changed.
  pub async fn record(&self, thread: &ThreadRecord) -> Result<usize> {
    let sql = self.template.sql().to_owned();
    let values = self.template.bind(thread);
    let id = thread.id.clone();

    let changed = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(&sql)?;
        let changed = stmt.execute(rusqlite::params_from_iter(values))?;
        Ok(changed)
      })
      .await?;

    debug!(%id, changed, "thread recorded");
    Ok(changed)
  }
}
