//! Wire format
//!
//! One JSON object per line. The codec is deliberately tiny: the protocol
//! has a single substantive call, and delivery failure carries no more
//! information than a lost binding does.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::KeepAliveConfig;

use super::BindingError;

/// Upper bound on a single message delivery. A stalled write is treated the
/// same as a lost binding so the event loop never hangs on a dying peer.
pub const WAKEUP_TIMEOUT: Duration = Duration::from_secs(1);

/// Messages exchanged between the two peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerMessage {
    /// Adopt the carried record as authoritative and refresh the foreground
    /// presentation to match it.
    Wakeup { config: KeepAliveConfig },

    /// Tear down without re-entering recovery.
    Shutdown,
}

/// Write one message and flush.
pub async fn write_message<W>(writer: &mut W, message: &PeerMessage) -> Result<(), BindingError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read the next message. `Ok(None)` means the counterpart closed the
/// connection cleanly.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<PeerMessage>, BindingError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        return Ok(Some(serde_json::from_str(trimmed)?));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotificationSpec;
    use tokio::io::BufReader;

    fn wakeup(title: &str) -> PeerMessage {
        PeerMessage::Wakeup {
            config: KeepAliveConfig {
                notification: NotificationSpec {
                    title: title.to_string(),
                    ..NotificationSpec::default()
                },
                ..KeepAliveConfig::default()
            },
        }
    }

    #[tokio::test]
    async fn messages_are_single_lines() {
        let mut buf = Vec::new();
        write_message(&mut buf, &wakeup("T")).await.unwrap();
        write_message(&mut buf, &PeerMessage::Shutdown).await.unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with('\n'));
    }

    #[tokio::test]
    async fn wakeup_round_trips() {
        let mut buf = Vec::new();
        write_message(&mut buf, &wakeup("T")).await.unwrap();

        let mut reader = BufReader::new(buf.as_slice());
        match read_message(&mut reader).await.unwrap() {
            Some(PeerMessage::Wakeup { config }) => {
                assert_eq!(config.notification.title, "T");
            }
            other => panic!("Unexpected message: {:?}", other),
        }

        // Clean EOF after the single message
        assert!(read_message(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let input = b"\n\n{\"type\":\"shutdown\"}\n";
        let mut reader = BufReader::new(input.as_slice());

        assert!(matches!(
            read_message(&mut reader).await.unwrap(),
            Some(PeerMessage::Shutdown)
        ));
    }

    #[tokio::test]
    async fn garbage_is_an_error_not_a_hang() {
        let input = b"not json\n";
        let mut reader = BufReader::new(input.as_slice());
        assert!(read_message(&mut reader).await.is_err());
    }
}
