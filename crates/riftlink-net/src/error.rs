//! Error taxonomy for the transport connection.

use crate::framing::FrameError;
use crate::messages::CodecError;

/// Errors surfaced by [`crate::NetClient`] and the receive loop.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The TCP connection could not be established.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// The address that was dialled.
        addr: String,
        /// The underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing a frame on an established connection failed.
    #[error("transport error: {0}")]
    Transport(#[from] FrameError),

    /// A frame body could not be decoded into an envelope.
    #[error("malformed message: {0}")]
    Malformed(#[from] CodecError),

    /// A send was attempted while the connection was not `Connected`.
    #[error("not connected")]
    NotConnected,

    /// Caller-triggered reconnection gave up.
    #[error("reconnection gave up after {attempts} attempts")]
    ReconnectExhausted {
        /// Number of attempts made.
        attempts: u32,
    },
}

impl NetError {
    /// Whether this error came from a frame body that failed to decode.
    pub fn is_malformed(&self) -> bool {
        matches!(self, NetError::Malformed(_))
    }
}

impl From<std::io::Error> for NetError {
    fn from(e: std::io::Error) -> Self {
        NetError::Transport(FrameError::Io(e))
    }
}
