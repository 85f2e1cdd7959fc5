//! Raw capture event intake.
//!
//! The capture transport itself (packet sniffer, resolver hook, query log
//! tail) is a collaborator; the core only requires a source that yields "a
//! DNS query occurred for name N at time T". That feed is a bounded mpsc
//! channel of [`RawQuery`] values. Duplicate events for the same domain are
//! expected and handled by the registry's upsert.
//!
//! Two helpers live here for collaborators:
//! - [`wire::extract_query_name`] pulls the query name out of a raw DNS
//!   message for packet-level sources.
//! - [`feed_query_log`] replays a newline-delimited query log (or stdin),
//!   which is what the CLI binary uses.

pub mod wire;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// One raw observation event from the capture source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawQuery {
    /// Query name exactly as captured (case and trailing dot preserved).
    pub name: String,
    /// Capture timestamp, epoch milliseconds.
    pub timestamp_millis: i64,
}

impl RawQuery {
    /// Convenience constructor stamping the event with the current time.
    pub fn now(name: impl Into<String>) -> Self {
        RawQuery {
            name: name.into(),
            timestamp_millis: Utc::now().timestamp_millis(),
        }
    }
}

/// Creates the bounded intake channel between a capture source and the
/// pipeline.
pub fn channel(capacity: usize) -> (mpsc::Sender<RawQuery>, mpsc::Receiver<RawQuery>) {
    mpsc::channel(capacity)
}

/// Replays a query log into the intake channel, one query name per line.
///
/// `-` reads from stdin. Empty lines and `#` comments are skipped. Each line
/// is stamped with the wall-clock time at send. Returns once the input is
/// exhausted or the pipeline has stopped accepting events.
pub async fn feed_query_log(path: &Path, tx: mpsc::Sender<RawQuery>) -> Result<()> {
    if path.as_os_str() == "-" {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
            if !send_line(&tx, &line).await {
                return Ok(());
            }
        }
    } else {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open query log {}", path.display()))?;
        let mut lines = BufReader::new(file).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .context("Failed to read from query log")?
        {
            if !send_line(&tx, &line).await {
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Sends one trimmed line as a raw event. Returns false once the receiver is
/// gone, which means the pipeline shut down and replay should stop.
async fn send_line(tx: &mpsc::Sender<RawQuery>, line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return true;
    }
    tx.send(RawQuery::now(trimmed)).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_feed_query_log_skips_comments_and_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# query log").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "example.com").unwrap();
        writeln!(file, "  news.bbc.co.uk  ").unwrap();

        let (tx, mut rx) = channel(16);
        feed_query_log(file.path(), tx).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().name, "example.com");
        assert_eq!(rx.recv().await.unwrap().name, "news.bbc.co.uk");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_feed_query_log_stops_when_receiver_dropped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..100 {
            writeln!(file, "domain{}.com", i).unwrap();
        }

        let (tx, rx) = channel(1);
        drop(rx);
        // Must not error or hang once the pipeline is gone.
        feed_query_log(file.path(), tx).await.unwrap();
    }
}
