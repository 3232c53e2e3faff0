//! Length-prefixed framing for TCP streams.
//!
//! Every message on the wire is a length-prefixed frame:
//!
//! ```text
//! +-------------------+--------------------+
//! | length (4 bytes)  |   payload          |
//! | u32 little-endian |   (length bytes)   |
//! +-------------------+--------------------+
//! ```
//!
//! The length does **not** include the 4 prefix bytes themselves. A length of
//! 0 never carries an envelope; the reader treats it as end-of-stream.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Configuration for the framing layer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum allowed payload size in bytes. Default: 1 MB.
    pub max_payload_size: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: 1_048_576,
        }
    }
}

/// Errors that can occur during framing operations.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload size exceeds the configured maximum.
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge {
        /// The actual payload size.
        size: u64,
        /// The configured maximum.
        max: u32,
    },

    /// Empty payloads would read as end-of-stream on the other side.
    #[error("refusing to write an empty frame")]
    EmptyPayload,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read a single length-prefixed frame from the stream.
///
/// `read_exact` keeps reading until each phase is satisfied, so the transport
/// may hand over any number of bytes per read call.
///
/// Returns `Ok(None)` at end-of-stream: the peer closed during either phase,
/// or sent a zero length prefix.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    config: &FrameConfig,
) -> Result<Option<Vec<u8>>, FrameError> {
    let mut len_buf = [0u8; LENGTH_PREFIX_SIZE];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(FrameError::Io(e)),
    }

    let payload_len = u32::from_le_bytes(len_buf);
    if payload_len == 0 {
        return Ok(None);
    }

    if payload_len > config.max_payload_size {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len as u64,
            max: config.max_payload_size,
        });
    }

    let mut payload = vec![0u8; payload_len as usize];
    match reader.read_exact(&mut payload).await {
        Ok(_) => Ok(Some(payload)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            tracing::warn!(expected = payload_len, "peer closed mid-frame, discarding partial body");
            Ok(None)
        }
        Err(e) => Err(FrameError::Io(e)),
    }
}

/// Write a single length-prefixed frame to the stream and flush it.
///
/// Empty and oversized payloads are rejected before any byte is written.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
    config: &FrameConfig,
) -> Result<(), FrameError> {
    if payload.is_empty() {
        return Err(FrameError::EmptyPayload);
    }
    let len = payload.len() as u64;
    if len > config.max_payload_size as u64 {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: config.max_payload_size,
        });
    }

    writer.write_all(&(len as u32).to_le_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;

    Ok(())
}
