//! Length-prefixed JSON framing used on both sides of the native-messaging
//! stdio pipe: `u32 LE length || UTF-8 JSON payload`.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::TransportError;

/// Reads one frame from `reader`. Returns `Ok(None)` on a clean EOF before
/// any bytes of the next frame are read (the extension disconnected).
pub async fn read_message<R: tokio::io::AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Option<Vec<u8>>, TransportError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(TransportError::Io(e)),
    }
    let len = u32::from_le_bytes(len_buf);

    let mut payload = vec![0u8; len as usize];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|_| TransportError::LengthMismatch {
            declared: len,
            actual: 0,
        })?;
    Ok(Some(payload))
}

/// Writes one frame to `writer`.
pub async fn write_message<W: tokio::io::AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), TransportError> {
    let len = payload.len() as u32;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_frame() {
        let mut buffer: Vec<u8> = Vec::new();
        write_message(&mut buffer, br#"{"type":"PONG"}"#).await.unwrap();

        let mut reader: &[u8] = buffer.as_slice();
        let message = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(message, br#"{"type":"PONG"}"#);
    }

    #[tokio::test]
    async fn clean_eof_before_a_frame_returns_none() {
        let empty: Vec<u8> = Vec::new();
        let mut reader: &[u8] = empty.as_slice();
        assert!(read_message(&mut reader).await.unwrap().is_none());
    }
}
