//! Length-Prefixed Frame Encoding
//!
//! Message boundaries for the binary-RPC transport. Used directly over TCP and
//! over the upgraded connection of the HTTP-RPC bridge.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum frame size (16 MB) to prevent memory exhaustion
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Frame too large: {size} bytes (max {max} bytes)")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("End of stream")]
    EndOfStream,
}

/// Write a message with length prefix and flush.
///
/// Frame format:
/// ```text
/// +----------------+------------------+
/// | length (4 LE)  | bincode payload  |
/// +----------------+------------------+
/// ```
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes =
        bincode::serialize(message).map_err(|e| FrameError::Serialization(e.to_string()))?;

    let len = bytes.len();
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }

    writer.write_all(&(len as u32).to_le_bytes()).await?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;

    Ok(())
}

/// Read a message with length prefix.
///
/// A clean close before the first prefix byte is reported as
/// [`FrameError::EndOfStream`]; a close inside the prefix is an I/O error.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    if reader.read(&mut len_buf[..1]).await? == 0 {
        return Err(FrameError::EndOfStream);
    }
    reader.read_exact(&mut len_buf[1..]).await?;

    let len = u32::from_le_bytes(len_buf) as usize;

    if len > MAX_FRAME_SIZE {
        return Err(FrameError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }

    if len == 0 {
        return Err(FrameError::InvalidFrame("zero-length frame".to_string()));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;

    bincode::deserialize(&buf).map_err(|e| FrameError::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Cursor;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestMessage {
        value: u64,
        text: String,
    }

    #[tokio::test]
    async fn test_multiple_messages() {
        let messages = vec![
            TestMessage {
                value: 1,
                text: "first".to_string(),
            },
            TestMessage {
                value: 2,
                text: "second".to_string(),
            },
        ];

        let mut buffer = Vec::new();
        for msg in &messages {
            write_frame(&mut buffer, msg).await.unwrap();
        }

        let mut reader = Cursor::new(buffer);
        for expected in &messages {
            let decoded: TestMessage = read_frame(&mut reader).await.unwrap();
            assert_eq!(expected, &decoded);
        }
        let result: Result<TestMessage, _> = read_frame(&mut reader).await;
        assert!(matches!(result, Err(FrameError::EndOfStream)));
    }

    #[tokio::test]
    async fn test_truncated_length_prefix_is_io_error() {
        let mut reader = Cursor::new(vec![5u8, 0]);
        let result: Result<TestMessage, _> = read_frame(&mut reader).await;
        match result {
            Err(FrameError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("expected an I/O error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_length_prefix_is_little_endian() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &7u32).await.unwrap();
        assert_eq!(&buffer[..4], &[4, 0, 0, 0]);
        assert_eq!(&buffer[4..], &[7, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_rejects_oversized_prefix() {
        let prefix = ((MAX_FRAME_SIZE + 1) as u32).to_le_bytes();
        let mut reader = Cursor::new(prefix.to_vec());
        let result: Result<TestMessage, _> = read_frame(&mut reader).await;
        assert!(matches!(result, Err(FrameError::FrameTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_rejects_zero_length_frame() {
        let mut reader = Cursor::new(vec![0u8; 4]);
        let result: Result<TestMessage, _> = read_frame(&mut reader).await;
        assert!(matches!(result, Err(FrameError::InvalidFrame(_))));
    }

    #[tokio::test]
    async fn test_truncated_payload_is_io_error() {
        let mut reader = Cursor::new(vec![8, 0, 0, 0, 1, 2]);
        let result: Result<TestMessage, _> = read_frame(&mut reader).await;
        assert!(matches!(result, Err(FrameError::Io(_))));
    }
}
