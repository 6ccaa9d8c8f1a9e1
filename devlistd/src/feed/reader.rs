use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use anyhow::{Context, Result};
use shared::types::{CommunicationPath, Device};

/// One decoded line of the device event feed
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum FeedEvent {
    Announce { device: Device },
    Vanish { path: CommunicationPath },
}

/// Parse a feed line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<FeedEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let event = serde_json::from_str(line).context("Malformed feed event")?;
    Ok(Some(event))
}

async fn open_source(source: &str) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    if source == "-" {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(source)
        .await
        .with_context(|| format!("Failed to open feed {}", source))?;
    Ok(Box::new(file))
}

pub async fn run_feed(
    source: String,
    tx: mpsc::Sender<FeedEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    tracing::info!("Reading device events from {}", source);

    let reader = open_source(&source).await?;
    forward_events(reader, tx, cancel).await
}

/// Forwards every event read from `reader` until end of input, then idles until cancelled.
pub async fn forward_events<R: AsyncRead + Unpin>(
    reader: R,
    tx: mpsc::Sender<FeedEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut lines = BufReader::new(reader).lines();
    let mut line_no = 0usize;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read feed")? {
                    Some(line) => {
                        line_no += 1;
                        match parse_line(&line) {
                            Ok(Some(event)) => {
                                if tx.send(event).await.is_err() {
                                    tracing::warn!("Store manager gone, stopping feed");
                                    return Ok(());
                                }
                            }
                            Ok(None) => {}
                            Err(e) => {
                                tracing::warn!("Skipping feed line {}: {:#}", line_no, e);
                            }
                        }
                    }
                    None => {
                        tracing::info!("Feed exhausted after {} lines", line_no);
                        cancel.cancelled().await;
                        break;
                    }
                }
            }

            _ = cancel.cancelled() => {
                tracing::info!("Feed shutting down");
                break;
            }
        }
    }

    Ok(())
}
