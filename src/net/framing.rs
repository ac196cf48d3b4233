//! Message framing for the length-prefixed wire protocol.
//!
//! Every RPC and stream in the gateway rides the same duplex-stream framing:
//! a 4-byte little-endian length prefix followed by a bincode-encoded payload.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload accepted on a framed stream. A `WorldState` snapshot for a
/// full arena of bots and bullets comfortably fits well under this.
pub const MAX_MESSAGE_SIZE: usize = 1 << 20; // 1 MiB

#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("message too large: {0} bytes (max {1})")]
    MessageTooLarge(usize, usize),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Read a length-prefixed message from a stream.
///
/// Format: `[4 bytes little-endian length][payload]`.
pub async fn read_message<R: AsyncRead + Unpin>(stream: &mut R) -> Result<Vec<u8>, FramingError> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(FramingError::ConnectionClosed);
        }
        Err(e) => return Err(FramingError::Io(e)),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(FramingError::MessageTooLarge(len, MAX_MESSAGE_SIZE));
    }
    if len == 0 {
        return Ok(Vec::new());
    }

    let mut buf = vec![0u8; len];
    match stream.read_exact(&mut buf).await {
        Ok(_) => Ok(buf),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(FramingError::ConnectionClosed),
        Err(e) => Err(FramingError::Io(e)),
    }
}

/// Write a length-prefixed message to a stream.
pub async fn write_message<W: AsyncWrite + Unpin>(
    stream: &mut W,
    data: &[u8],
) -> Result<(), FramingError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(FramingError::MessageTooLarge(data.len(), MAX_MESSAGE_SIZE));
    }

    let len_bytes = (data.len() as u32).to_le_bytes();
    stream.write_all(&len_bytes).await?;
    stream.write_all(data).await?;
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_read_write_message() {
        let data = b"Hello, arena!";
        let mut buffer = Vec::new();
        write_message(&mut buffer, data).await.unwrap();

        let mut cursor = Cursor::new(buffer);
        let result = read_message(&mut cursor).await.unwrap();
        assert_eq!(result, data);
    }

    #[tokio::test]
    async fn test_empty_message() {
        let mut buffer = Vec::new();
        write_message(&mut buffer, b"").await.unwrap();

        let mut cursor = Cursor::new(buffer);
        let result = read_message(&mut cursor).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_message_too_large() {
        let large_data = vec![0u8; MAX_MESSAGE_SIZE + 1];
        let mut buffer = Vec::new();
        let result = write_message(&mut buffer, &large_data).await;
        assert!(matches!(result, Err(FramingError::MessageTooLarge(_, _))));
    }

    #[tokio::test]
    async fn test_read_truncated_length() {
        let data = vec![0u8; 2];
        let mut cursor = Cursor::new(data);
        let result = read_message(&mut cursor).await;
        assert!(matches!(result, Err(FramingError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_read_truncated_payload() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&10u32.to_le_bytes());
        buffer.extend_from_slice(&[1, 2, 3]);

        let mut cursor = Cursor::new(buffer);
        let result = read_message(&mut cursor).await;
        assert!(matches!(result, Err(FramingError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_multiple_messages() {
        let messages = vec![
            b"First message".to_vec(),
            b"Second".to_vec(),
            b"Third message here".to_vec(),
        ];

        let mut buffer = Vec::new();
        for msg in &messages {
            write_message(&mut buffer, msg).await.unwrap();
        }

        let mut cursor = Cursor::new(buffer);
        for expected in &messages {
            let result = read_message(&mut cursor).await.unwrap();
            assert_eq!(&result, expected);
        }
    }
}
