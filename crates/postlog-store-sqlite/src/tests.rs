//! Integration tests for `SqliteSink` against in-memory and file databases.

use chrono::NaiveDate;
use postlog_core::{ClientIdentity, ThreadRecord};
use tempfile::tempdir;

use crate::{Error, QueryTemplate, SqliteSink};

async fn sink() -> SqliteSink {
  SqliteSink::open_in_memory(QueryTemplate::default())
    .await
    .expect("in-memory sink")
}

type Row = (String, String, String, String, Option<String>, i64);

async fn rows(sink: &SqliteSink) -> Vec<Row> {
  sink
    .conn
    .call(|conn| {
      let mut stmt = conn.prepare(
        "SELECT queue_id, message_id, sender, client_ip, accepted_at, \
         spam_score FROM threads ORDER BY row_id",
      )?;
      let rows = stmt
        .query_map([], |r| {
          Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?))
        })?
        .collect::<rusqlite::Result<Vec<Row>>>()?;
      Ok(rows)
    })
    .await
    .expect("select threads")
}

fn spam_thread() -> ThreadRecord {
  let mut t = ThreadRecord::new("5247C4562029").unwrap();
  t.message_id = Some("659691365ACB@ip-1-7-1-1.bb.net.net".into());
  t.from = Some("simonova@yahoo.com".into());
  t.client = Some(ClientIdentity {
    name:        "unknown".into(),
    ip:          "1.7.1.1".into(),
    accepted_at: NaiveDate::from_ymd_opt(2015, 12, 4)
      .and_then(|d| d.and_hms_opt(10, 33, 24)),
  });
  t.spam_score = 3;
  t
}

// ─── Default template ────────────────────────────────────────────────────────

#[tokio::test]
async fn record_inserts_one_row() {
  let s = sink().await;

  let changed = s.record(&spam_thread()).await.unwrap();
  assert_eq!(changed, 1);

  assert_eq!(rows(&s).await, vec![(
    "5247C4562029".to_owned(),
    "659691365ACB@ip-1-7-1-1.bb.net.net".to_owned(),
    "simonova@yahoo.com".to_owned(),
    "1.7.1.1".to_owned(),
    Some("2015-12-04 10:33:24".to_owned()),
    3,
  )]);
}

#[tokio::test]
async fn sparse_thread_records_zero_values() {
  let s = sink().await;

  s.record(&ThreadRecord::new("C93CEB08A046").unwrap())
    .await
    .unwrap();

  let rows = rows(&s).await;
  assert_eq!(rows.len(), 1);
  let (id, mid, from, ip, at, score) = &rows[0];
  assert_eq!(id, "C93CEB08A046");
  assert!(mid.is_empty());
  assert!(from.is_empty());
  assert!(ip.is_empty());
  assert!(at.is_none());
  assert_eq!(*score, 0);
}

#[tokio::test]
async fn recorded_at_is_filled_by_database() {
  let s = sink().await;
  s.record(&spam_thread()).await.unwrap();

  let recorded_at: String = s
    .conn
    .call(|conn| {
      let at = conn.query_row("SELECT recorded_at FROM threads", [], |r| {
        r.get(0)
      })?;
      Ok(at)
    })
    .await
    .unwrap();
  assert!(!recorded_at.is_empty());
}

// ─── Custom templates ────────────────────────────────────────────────────────

#[tokio::test]
async fn custom_template_targets_own_table() {
  let s = sink().await;
  s.conn
    .call(|conn| {
      conn.execute_batch(
        "CREATE TABLE spam (ip TEXT NOT NULL, score INTEGER NOT NULL);",
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let template =
    QueryTemplate::parse("INSERT INTO spam (ip, score) VALUES (?c, ?s)")
      .unwrap();
  let s = SqliteSink { template, ..s };

  s.record(&spam_thread()).await.unwrap();

  let (ip, score): (String, i64) = s
    .conn
    .call(|conn| {
      let row = conn.query_row("SELECT ip, score FROM spam", [], |r| {
        Ok((r.get(0)?, r.get(1)?))
      })?;
      Ok(row)
    })
    .await
    .unwrap();
  assert_eq!(ip, "1.7.1.1");
  assert_eq!(score, 3);
  assert!(rows(&s).await.is_empty());
}

#[tokio::test]
async fn broken_query_fails_at_open() {
  let template =
    QueryTemplate::parse("INSERT INTO missing_table VALUES (?i)").unwrap();
  let err = SqliteSink::open_in_memory(template).await.err();
  assert!(matches!(err, Some(Error::Database(_))));
}

#[tokio::test]
async fn query_against_dropped_table_surfaces_database_error() {
  let s = sink().await;
  s.conn
    .call(|conn| {
      conn.execute_batch("DROP TABLE threads;")?;
      Ok(())
    })
    .await
    .unwrap();

  let err = s.record(&spam_thread()).await.unwrap_err();
  assert!(matches!(err, Error::Database(_)));
}

#[tokio::test]
async fn reopening_file_keeps_rows() {
  let dir = tempdir().unwrap();
  let path = dir.path().join("threads.db");

  let s = SqliteSink::open(&path, QueryTemplate::default())
    .await
    .unwrap();
  s.record(&spam_thread()).await.unwrap();
  drop(s);

  let s = SqliteSink::open(&path, QueryTemplate::default())
    .await
    .unwrap();
  s.record(&spam_thread()).await.unwrap();
  assert_eq!(rows(&s).await.len(), 2);
}

#[tokio::test]
async fn template_for_own_table_opens_once_table_exists() {
  let dir = tempdir().unwrap();
  let path = dir.path().join("spam.db");
  let template =
    QueryTemplate::parse("INSERT INTO spam (ip, score) VALUES (?c, ?s)")
      .unwrap();

  assert!(SqliteSink::open(&path, template.clone()).await.is_err());

  let setup = SqliteSink::open(&path, QueryTemplate::default())
    .await
    .unwrap();
  setup
    .conn
    .call(|conn| {
      conn.execute_batch(
        "CREATE TABLE spam (ip TEXT NOT NULL, score INTEGER NOT NULL);",
      )?;
      Ok(())
    })
    .await
    .unwrap();
  drop(setup);

  let s = SqliteSink::open(&path, template).await.unwrap();
  assert_eq!(s.record(&spam_thread()).await.unwrap(), 1);
}
