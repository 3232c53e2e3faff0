//! Game server networking: wire codec, framing, connection lifecycle, and
//! dispatch of received messages to game logic.
//!
//! The receive task runs on the tokio runtime and feeds an [`InboundQueue`];
//! the game's per-frame update drains it through a [`MessageRouter`]. Sends
//! go through [`NetClient::send`], usually via the typed [`Outbound`] helpers.

pub mod error;
pub mod framing;
pub mod inbound;
pub mod messages;
pub mod outbound;
pub mod reconnection;
pub mod routing;
pub mod tcp_client;


pub use error::NetError;
pub use framing::{FrameConfig, FrameError, read_frame, write_frame};
pub use inbound::{InboundClosed, InboundQueue, InboundSender, inbound_queue};
pub use messages::{CodecError, Envelope, MessageKind, Vector3, decode, encode};
pub use outbound::Outbound;
pub use reconnection::{ReconnectConfig, ReconnectState};
pub use routing::{AnimatorValue, DamageTarget, GameEvents, MessageRouter};
pub use tcp_client::{
    ConnectionConfig, ConnectionState, ConnectionStateWatch, DEFAULT_SERVER_ADDR, NetClient,
    receive_loop,
};
