//! The tailer in replay and follow mode, and a full `run` over a log file.

use std::{io::Write as _, path::PathBuf, time::Duration};

use postlog_daemon::{
  Settings, run,
  settings::{SinkSettings, TailSettings},
  tail::tail_lines,
};
use tempfile::{TempDir, tempdir};
use tokio::{sync::mpsc, task::JoinHandle};

const LOG: &str = "\
Nov 22 03:47:02 mx postfix/smtpd[9032]: D549FB08A08B: client=unknown[89.135.152.48]
Nov 22 03:47:04 mx postfix/cleanup[9076]: D549FB08A08B: message-id=<4ea6228aa481371f55ed30bb51408481@mail.ru>
Nov 22 03:47:04 mx postfix/qmgr[8015]: D549FB08A08B: from=<cvetkova09055@mail.ru>, size=1755, nrcpt=1 (queue active)
Nov 22 03:47:13 mx spamd[1279]: spamd: result: Y 8 - FREEMAIL_FROM scantime=9.8,size=1801,user=spamd,uid=1003,required_score=5.0,rhost=localhost,raddr=127.0.0.1,rport=38559,mid=<4ea6228aa481371f55ed30bb51408481@mail.ru>,autolearn=disabled,shortcircuit=no
Nov 22 03:47:13 mx postfix/qmgr[8015]: D549FB08A08B: removed
Nov 22 03:48:00 mx postfix/qmgr[8015]: 8D7AAB08A049: from=<ham@example.org>, size=1200, nrcpt=1 (queue active)
Nov 22 03:48:01 mx postfix/qmgr[8015]: 8D7AAB08A049: removed
Nov 22 03:49:00 mx postfix/qmgr[8015]: 0A1B2C3D4E5F: from=<open@example.org>, size=1200, nrcpt=1 (queue active)
";

fn replay(file: PathBuf) -> TailSettings {
  TailSettings { file, follow: false, ..Default::default() }
}

fn follow(file: PathBuf) -> TailSettings {
  TailSettings {
    file,
    follow: true,
    from_start: false,
    poll_interval_ms: 10,
  }
}

/// A temp dir holding `mail.log` with `body`.
fn log_file(body: &str) -> (TempDir, PathBuf) {
  let dir = tempdir().unwrap();
  let path = dir.path().join("mail.log");
  std::fs::write(&path, body).unwrap();
  (dir, path)
}

fn append(path: &std::path::Path, text: &str) {
  let mut f = std::fs::OpenOptions::new().append(true).open(path).unwrap();
  f.write_all(text.as_bytes()).unwrap();
}

async fn next_line(rx: &mut mpsc::Receiver<String>) -> Option<String> {
  tokio::time::timeout(Duration::from_secs(5), rx.recv())
    .await
    .unwrap()
}

/// Drop the receiver and wait for the tailer to notice.
async fn stop(
  rx: mpsc::Receiver<String>,
  tailer: JoinHandle<postlog_daemon::Result<()>>,
) {
  drop(rx);
  tokio::time::timeout(Duration::from_secs(5), tailer)
    .await
    .unwrap()
    .unwrap()
    .unwrap();
}

#[tokio::test]
async fn replay_reads_every_line_once() {
  // No trailing newline on the last line.
  let (_dir, path) = log_file("one\r\ntwo\nthree");

  let (tx, mut rx) = mpsc::channel(16);
  tail_lines(replay(path), tx).await.unwrap();

  let mut lines = Vec::new();
  while let Some(line) = rx.recv().await {
    lines.push(line);
  }

  assert_eq!(lines, ["one", "two", "three"]);
}

#[tokio::test]
async fn missing_file_is_an_error() {
  let dir = tempdir().unwrap();
  let (tx, _rx) = mpsc::channel(1);
  let err = tail_lines(replay(dir.path().join("does-not-exist.log")), tx).await;
  assert!(matches!(err, Err(postlog_daemon::Error::Io(_))));
}

#[tokio::test]
async fn follow_picks_up_appended_lines() {
  let (_dir, path) = log_file("old line\n");

  let (tx, mut rx) = mpsc::channel(16);
  let tailer = tokio::spawn(tail_lines(follow(path.clone()), tx));

  tokio::time::sleep(Duration::from_millis(100)).await;
  append(&path, "new line\n");

  assert_eq!(next_line(&mut rx).await.as_deref(), Some("new line"));
  stop(rx, tailer).await;
}

#[tokio::test]
async fn follow_rereads_truncated_file_from_start() {
  let (_dir, path) = log_file("old line one\nold line two\n");

  let (tx, mut rx) = mpsc::channel(16);
  let tailer = tokio::spawn(tail_lines(follow(path.clone()), tx));

  tokio::time::sleep(Duration::from_millis(100)).await;
  std::fs::File::create(&path).unwrap();
  tokio::time::sleep(Duration::from_millis(100)).await;
  append(&path, "fresh\n");

  assert_eq!(next_line(&mut rx).await.as_deref(), Some("fresh"));
  stop(rx, tailer).await;
}

#[cfg(unix)]
#[tokio::test]
async fn follow_reopens_rotated_file() {
  let (dir, path) = log_file("before rotation\n");

  let (tx, mut rx) = mpsc::channel(16);
  let tailer = tokio::spawn(tail_lines(follow(path.clone()), tx));

  tokio::time::sleep(Duration::from_millis(100)).await;
  // Longer than the old file, so only the inode change reveals the rotation.
  let rotated = dir.path().join("mail.log.new");
  std::fs::write(&rotated, "first after rotation\nsecond after rotation\n")
    .unwrap();
  std::fs::rename(&rotated, &path).unwrap();

  assert_eq!(
    next_line(&mut rx).await.as_deref(),
    Some("first after rotation")
  );
  assert_eq!(
    next_line(&mut rx).await.as_deref(),
    Some("second after rotation")
  );
  stop(rx, tailer).await;
}

#[tokio::test]
async fn run_replays_log_into_database() {
  let (dir, log) = log_file(LOG);
  let db = dir.path().join("threads.db");

  let settings = Settings {
    tail: replay(log),
    sink: SinkSettings { database: Some(db), ..Default::default() },
    ..Default::default()
  };

  let stats = run(settings, std::future::pending()).await.unwrap();

  assert_eq!(stats.lines, 8);
  assert_eq!(stats.open, 1);
  assert_eq!(stats.reports.completed, 2);
  assert_eq!(stats.reports.spam, 1);
  assert_eq!(stats.reports.persisted, 1);
}

#[tokio::test]
async fn broken_output_query_fails_run_at_startup() {
  let (dir, log) = log_file(LOG);

  let settings = Settings {
    tail: replay(log),
    sink: SinkSettings {
      database: Some(dir.path().join("threads.db")),
      query: "INSERT INTO nowhere VALUES (?i)".into(),
      ..Default::default()
    },
    ..Default::default()
  };

  let err = run(settings, std::future::pending()).await.err();
  assert!(matches!(err, Some(postlog_daemon::Error::Sink(_))));
}
