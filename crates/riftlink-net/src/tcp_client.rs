//! TCP client connection to the game server.
//!
//! [`NetClient`] owns one logical connection at a time: connecting, the
//! background receive task, framed sends, close, and reconnection. State
//! changes are broadcast via a [`watch`] channel so any number of consumers
//! can react without polling.
//!
//! Each successful connect starts a new session generation. The receive task
//! remembers the generation it was spawned for and only touches shared state
//! while that generation is still current, so a stale task from an earlier
//! session can never tear down a newer one.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, watch};

use crate::error::NetError;
use crate::framing::{FrameConfig, FrameError, read_frame, write_frame};
use crate::inbound::InboundSender;
use crate::messages::{CodecError, Envelope, decode, encode};
use crate::reconnection::{ReconnectConfig, ReconnectState};

/// Default server endpoint.
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:9090";

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection. Initial state, and the state after a clean close or
    /// end-of-stream.
    Disconnected,
    /// Attempting to establish a TCP connection.
    Connecting,
    /// TCP connection established, ready for communication.
    Connected,
    /// The connect attempt or an established connection failed.
    Failed,
}

/// Observable connection state backed by a [`watch`] channel.
///
/// Multiple subscribers can observe state transitions without polling.
#[derive(Debug)]
pub struct ConnectionStateWatch {
    tx: watch::Sender<ConnectionState>,
    rx: watch::Receiver<ConnectionState>,
}

impl Default for ConnectionStateWatch {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStateWatch {
    /// Create a new watch initialized to [`ConnectionState::Disconnected`].
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(ConnectionState::Disconnected);
        Self { tx, rx }
    }

    /// Set the current connection state, notifying all subscribers.
    pub fn set(&self, state: ConnectionState) {
        let _ = self.tx.send(state);
    }

    /// Return a new subscriber receiver.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.rx.clone()
    }

    /// Return the current state without blocking.
    pub fn current(&self) -> ConnectionState {
        *self.rx.borrow()
    }
}

/// Settings for a [`NetClient`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// `host:port` of the game server.
    pub addr: String,
    /// Upper bound on a single TCP connect. Default: 5 s.
    pub connect_timeout: Duration,
    pub frame: FrameConfig,
    pub reconnect: ReconnectConfig,
    /// Whether a send while not connected may start a reconnect attempt.
    pub implicit_reconnect: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_SERVER_ADDR.to_string(),
            connect_timeout: Duration::from_secs(5),
            frame: FrameConfig::default(),
            reconnect: ReconnectConfig::default(),
            implicit_reconnect: true,
        }
    }
}

/// State shared with the background receive task.
#[derive(Debug)]
struct Shared {
    state: ConnectionStateWatch,
    /// Write half of the current session. `Some` exactly while `Connected`;
    /// holding this lock is the single-writer discipline for frames.
    writer: Mutex<Option<OwnedWriteHalf>>,
    generation: AtomicU64,
    last_error: std::sync::Mutex<Option<Arc<NetError>>>,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn record_failure(&self, error: NetError) {
        *self
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(error));
        self.state.set(ConnectionState::Failed);
    }
}

#[derive(Debug)]
struct Session {
    generation: u64,
    /// Sending `true` (or dropping the sender) stops the receive task.
    shutdown_tx: watch::Sender<bool>,
}

/// Handle to the game server connection.
///
/// Cheap operations (`state`, `is_connected`) never block. `send` serializes
/// on the writer lock, so concurrent callers never interleave frames.
#[derive(Debug)]
pub struct NetClient {
    config: ConnectionConfig,
    shared: Arc<Shared>,
    inbound: InboundSender,
    session: std::sync::Mutex<Option<Session>>,
    reconnect: std::sync::Mutex<ReconnectState>,
    /// Set by [`NetClient::close`]; disables implicit reconnect.
    closed: AtomicBool,
    connect_lock: Mutex<()>,
}

impl NetClient {
    /// Create a disconnected client. Decoded envelopes will be pushed to
    /// `inbound`.
    pub fn new(config: ConnectionConfig, inbound: InboundSender) -> Self {
        let reconnect = ReconnectState::new(config.reconnect.clone());
        Self {
            config,
            shared: Arc::new(Shared {
                state: ConnectionStateWatch::new(),
                writer: Mutex::new(None),
                generation: AtomicU64::new(0),
                last_error: std::sync::Mutex::new(None),
            }),
            inbound,
            session: std::sync::Mutex::new(None),
            reconnect: std::sync::Mutex::new(reconnect),
            closed: AtomicBool::new(false),
            connect_lock: Mutex::new(()),
        }
    }

    /// Server address this client dials.
    pub fn addr(&self) -> &str {
        &self.config.addr
    }

    /// Return the connection state watch.
    pub fn state(&self) -> &ConnectionStateWatch {
        &self.shared.state
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state.current() == ConnectionState::Connected
    }

    /// The error that most recently moved the connection to `Failed`.
    pub fn last_error(&self) -> Option<Arc<NetError>> {
        self.shared
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Open the TCP connection and start the receive task.
    ///
    /// A no-op when already connected. Valid from `Disconnected` and
    /// `Failed`, which makes it the caller-triggered reconnect as well.
    pub async fn connect(&self) -> Result<(), NetError> {
        let _guard = self.connect_lock.lock().await;
        if self.is_connected() {
            return Ok(());
        }

        self.closed.store(false, Ordering::SeqCst);
        self.stop_session();
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.state.set(ConnectionState::Connecting);
        tracing::debug!(addr = %self.config.addr, generation, "connecting");

        let connecting = TcpStream::connect(self.config.addr.as_str());
        let stream = match tokio::time::timeout(self.config.connect_timeout, connecting).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(self.fail_connect(generation, source)),
            Err(_) => {
                let source = io::Error::new(io::ErrorKind::TimedOut, "connect timed out");
                return Err(self.fail_connect(generation, source));
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(error = %e, "failed to set TCP_NODELAY");
        }

        let (reader, writer) = stream.into_split();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        {
            let mut slot = self.shared.writer.lock().await;
            if !self.shared.is_current(generation) {
                // Closed while the handshake was in flight.
                return Err(NetError::NotConnected);
            }
            *slot = Some(writer);
            *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(Session {
                generation,
                shutdown_tx,
            });
            self.shared
                .last_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            self.shared.state.set(ConnectionState::Connected);
        }
        self.reconnect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
        tracing::info!(addr = %self.config.addr, generation, "connected");

        tokio::spawn(run_session(
            Arc::clone(&self.shared),
            reader,
            self.inbound.clone(),
            self.config.frame.clone(),
            generation,
            shutdown_rx,
        ));
        Ok(())
    }

    /// Encode `envelope` and write it as one frame.
    ///
    /// Completes once the frame has been flushed to the socket. When not
    /// connected this fails with [`NetError::NotConnected`] without writing
    /// anything, and may start one rate-limited reconnect attempt.
    pub async fn send(&self, envelope: &Envelope) -> Result<(), NetError> {
        let payload = encode(envelope)?;
        {
            let mut slot = self.shared.writer.lock().await;
            if let Some(writer) = slot.as_mut() {
                return match write_frame(writer, &payload, &self.config.frame).await {
                    Ok(()) => {
                        tracing::trace!(kind = ?envelope.kind(), len = payload.len(), "sent");
                        Ok(())
                    }
                    Err(FrameError::Io(source)) => {
                        slot.take();
                        self.shared.generation.fetch_add(1, Ordering::SeqCst);
                        self.stop_session();
                        tracing::warn!(error = %source, kind = ?envelope.kind(), "write failed");
                        self.shared
                            .record_failure(NetError::Transport(FrameError::Io(copy_io_error(&source))));
                        Err(NetError::Transport(FrameError::Io(source)))
                    }
                    // Rejected before anything was written; the stream is intact.
                    Err(e) => Err(e.into()),
                };
            }
        }

        tracing::warn!(kind = ?envelope.kind(), state = ?self.shared.state.current(), "send while not connected");
        self.try_implicit_reconnect().await;
        Err(NetError::NotConnected)
    }

    /// Close the connection.
    ///
    /// Idempotent and safe to call from any task. The receive task is stopped
    /// as if the stream had ended, the write half is shut down, and implicit
    /// reconnect stays disabled until the next explicit [`Self::connect`].
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.stop_session();

        let writer = self.shared.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!(error = %e, "shutdown of write half failed");
            }
            tracing::info!(addr = %self.config.addr, "connection closed");
        }
        self.shared.state.set(ConnectionState::Disconnected);
    }

    /// Disable implicit reconnect until the next explicit [`Self::connect`],
    /// without touching the current connection.
    pub(crate) fn suppress_reconnect(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Reconnect with exponential backoff until connected or the configured
    /// attempts are exhausted.
    ///
    /// Returns immediately if already connected. The attempt counter is reset
    /// when this gives up, so a later call starts a fresh sequence.
    pub async fn reconnect_with_backoff(&self) -> Result<(), NetError> {
        loop {
            if self.is_connected() {
                return Ok(());
            }

            let (delay, attempt) = {
                let mut reconnect = self.reconnect.lock().unwrap_or_else(PoisonError::into_inner);
                let delay = reconnect.next_delay();
                let attempts = reconnect.attempts();
                if delay.is_none() {
                    reconnect.reset();
                }
                (delay, attempts)
            };
            let Some(delay) = delay else {
                tracing::error!(attempts = attempt, "giving up on reconnection");
                return Err(NetError::ReconnectExhausted { attempts: attempt });
            };

            tracing::info!("Reconnection attempt {} in {:?}", attempt, delay);
            tokio::time::sleep(delay).await;

            match self.connect().await {
                Ok(()) => {
                    tracing::info!("Reconnected after {} attempts", attempt);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Reconnection attempt {} failed: {}", attempt, e);
                }
            }
        }
    }

    async fn try_implicit_reconnect(&self) {
        if !self.config.implicit_reconnect || self.closed.load(Ordering::SeqCst) {
            return;
        }
        let admitted = self
            .reconnect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_begin(Instant::now());
        if !admitted {
            tracing::debug!("implicit reconnect suppressed until the backoff window elapses");
            return;
        }
        match self.connect().await {
            Ok(()) => tracing::info!("implicit reconnect succeeded"),
            Err(e) => tracing::warn!(error = %e, "implicit reconnect failed"),
        }
    }

    fn fail_connect(&self, generation: u64, source: io::Error) -> NetError {
        tracing::warn!(addr = %self.config.addr, error = %source, "connect failed");
        if self.shared.is_current(generation) {
            self.shared.record_failure(NetError::Connect {
                addr: self.config.addr.clone(),
                source: copy_io_error(&source),
            });
        }
        NetError::Connect {
            addr: self.config.addr.clone(),
            source,
        }
    }

    fn stop_session(&self) {
        let session = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(session) = session {
            tracing::trace!(generation = session.generation, "stopping receive task");
            let _ = session.shutdown_tx.send(true);
        }
    }
}

impl Drop for NetClient {
    fn drop(&mut self) {
        self.stop_session();
    }
}

/// Read frames from `reader`, decode them, and push them to `inbound`.
///
/// Returns `Ok(())` at end-of-stream (or when the consumer went away). Frames
/// whose kind is newer than this client are logged and skipped; any other
/// decode failure ends the loop with [`NetError::Malformed`] because the
/// stream can no longer be trusted.
pub async fn receive_loop<R: AsyncRead + Unpin>(
    reader: &mut R,
    inbound: &InboundSender,
    frame: &FrameConfig,
) -> Result<(), NetError> {
    loop {
        let Some(body) = read_frame(reader, frame).await? else {
            tracing::debug!("end of stream");
            return Ok(());
        };

        match decode(&body) {
            Ok(envelope) => {
                tracing::trace!(kind = ?envelope.kind(), len = body.len(), "received");
                if inbound.push(envelope).is_err() {
                    tracing::warn!("inbound queue closed, stopping receive loop");
                    return Ok(());
                }
            }
            Err(CodecError::UnknownKind(tag)) => {
                tracing::debug!(tag, len = body.len(), "skipping frame with unknown message kind");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

async fn run_session(
    shared: Arc<Shared>,
    mut reader: OwnedReadHalf,
    inbound: InboundSender,
    frame: FrameConfig,
    generation: u64,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let outcome = tokio::select! {
        result = receive_loop(&mut reader, &inbound, &frame) => Some(result),
        () = stopped(&mut shutdown_rx) => None,
    };
    let Some(result) = outcome else {
        tracing::trace!(generation, "receive task stopped");
        return;
    };

    let mut slot = shared.writer.lock().await;
    if !shared.is_current(generation) {
        return;
    }
    if let Some(mut writer) = slot.take() {
        let _ = writer.shutdown().await;
    }
    match result {
        Ok(()) => {
            tracing::info!(generation, "server closed the connection");
            shared.state.set(ConnectionState::Disconnected);
        }
        Err(e) => {
            tracing::error!(generation, error = %e, "connection failed");
            shared.record_failure(e);
        }
    }
}

/// Resolves once `close` (or a newer connect) asks the task to stop, or the
/// session handle is dropped.
async fn stopped(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

fn copy_io_error(e: &io::Error) -> io::Error {
    io::Error::new(e.kind(), e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::inbound_queue;
    use crate::messages::{Login, sample_envelopes};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};
    use tokio::net::TcpListener;

    fn config_for(addr: std::net::SocketAddr) -> ConnectionConfig {
        ConnectionConfig {
            addr: addr.to_string(),
            connect_timeout: Duration::from_secs(2),
            ..Default::default()
        }
    }

    /// Accept one connection and hold it open, returning its bytes once the
    /// client closes.
    async fn sink_server() -> (std::net::SocketAddr, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let _ = stream.read_to_end(&mut received).await;
            received
        });
        (addr, handle)
    }

    async fn refused_addr() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    #[tokio::test]
    async fn test_connection_state_starts_disconnected() {
        let watch = ConnectionStateWatch::new();
        assert_eq!(watch.current(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connection_state_transitions() {
        let watch = ConnectionStateWatch::new();
        for state in [
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Failed,
            ConnectionState::Disconnected,
        ] {
            watch.set(state);
            assert_eq!(watch.current(), state);
        }
    }

    #[tokio::test]
    async fn test_client_connects_to_server() {
        let (addr, _server) = sink_server().await;
        let (tx, _queue) = inbound_queue();
        let client = NetClient::new(config_for(addr), tx);

        client.connect().await.unwrap();
        assert_eq!(client.state().current(), ConnectionState::Connected);
        assert!(client.last_error().is_none());

        // Connecting again is a no-op.
        client.connect().await.unwrap();
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_connect_refused_moves_to_failed() {
        let addr = refused_addr().await;
        let (tx, _queue) = inbound_queue();
        let client = NetClient::new(config_for(addr), tx);

        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, NetError::Connect { .. }));
        assert_eq!(client.state().current(), ConnectionState::Failed);
        assert!(matches!(
            client.last_error().as_deref(),
            Some(NetError::Connect { .. })
        ));
    }

    #[tokio::test]
    async fn test_successful_connect_clears_last_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, _queue) = inbound_queue();
        let client = NetClient::new(config_for(addr), tx);

        client.connect().await.unwrap();
        let (mut stream, _) = listener.accept().await.unwrap();
        // Login tag with a string length that overruns the body.
        let body = [0u8, 9, b'p'];
        stream.write_all(&(body.len() as u32).to_le_bytes()).await.unwrap();
        stream.write_all(&body).await.unwrap();

        let mut rx = client.state().subscribe();
        rx.wait_for(|s| *s == ConnectionState::Failed).await.unwrap();
        assert!(client.last_error().is_some_and(|e| e.is_malformed()));

        let accept = tokio::spawn(async move { listener.accept().await.map(|_| ()) });
        client.connect().await.unwrap();
        accept.await.unwrap().unwrap();
        assert!(client.is_connected());
        assert!(client.last_error().is_none());
    }

    #[tokio::test]
    async fn test_sent_frames_reach_server_in_order() {
        let (addr, server) = sink_server().await;
        let (tx, _queue) = inbound_queue();
        let client = NetClient::new(config_for(addr), tx);
        client.connect().await.unwrap();

        let envelopes = sample_envelopes();
        for envelope in &envelopes {
            client.send(envelope).await.unwrap();
        }
        client.close().await;

        let bytes = server.await.unwrap();
        let mut cursor = &bytes[..];
        let mut decoded = Vec::new();
        while let Some(body) = read_frame(&mut cursor, &FrameConfig::default()).await.unwrap() {
            decoded.push(decode(&body).unwrap());
        }
        assert_eq!(decoded, envelopes);
    }

    #[tokio::test]
    async fn test_concurrent_sends_do_not_interleave() {
        let (addr, server) = sink_server().await;
        let (tx, _queue) = inbound_queue();
        let client = Arc::new(NetClient::new(config_for(addr), tx));
        client.connect().await.unwrap();

        let mut tasks = Vec::new();
        for task in 0..8 {
            let client = Arc::clone(&client);
            tasks.push(tokio::spawn(async move {
                for n in 0..25 {
                    let envelope = Envelope::Login(Login {
                        player_id: format!("player-{task}-{n}-{}", "x".repeat(200)),
                    });
                    client.send(&envelope).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        client.close().await;

        let bytes = server.await.unwrap();
        let mut cursor = &bytes[..];
        let mut count = 0;
        while let Some(body) = read_frame(&mut cursor, &FrameConfig::default()).await.unwrap() {
            assert!(matches!(decode(&body).unwrap(), Envelope::Login(_)));
            count += 1;
        }
        assert_eq!(count, 200);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_blocks_sends() {
        let (addr, _server) = sink_server().await;
        let (tx, _queue) = inbound_queue();
        let client = NetClient::new(config_for(addr), tx);
        client.connect().await.unwrap();

        client.close().await;
        client.close().await;
        assert_eq!(client.state().current(), ConnectionState::Disconnected);

        let result = client
            .send(&Envelope::Login(Login { player_id: "p1".into() }))
            .await;
        assert!(matches!(result, Err(NetError::NotConnected)));
        // No implicit reconnect after an explicit close.
        assert_eq!(client.state().current(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_close_before_connect() {
        let (tx, _queue) = inbound_queue();
        let client = NetClient::new(ConnectionConfig::default(), tx);
        client.close().await;
        assert_eq!(client.state().current(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_oversized_send_keeps_connection() {
        let (addr, _server) = sink_server().await;
        let (tx, _queue) = inbound_queue();
        let client = NetClient::new(
            ConnectionConfig {
                frame: FrameConfig { max_payload_size: 8 },
                ..config_for(addr)
            },
            tx,
        );
        client.connect().await.unwrap();

        let result = client
            .send(&Envelope::Login(Login {
                player_id: "a-rather-long-player-id".into(),
            }))
            .await;
        assert!(matches!(
            result,
            Err(NetError::Transport(FrameError::PayloadTooLarge { .. }))
        ));
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_implicit_reconnect_is_rate_limited() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, _queue) = inbound_queue();
        let client = NetClient::new(
            ConnectionConfig {
                reconnect: ReconnectConfig {
                    initial_delay: Duration::from_secs(60),
                    jitter: 0.0,
                    ..Default::default()
                },
                ..config_for(addr)
            },
            tx,
        );

        let login = Envelope::Login(Login { player_id: "p1".into() });
        for _ in 0..5 {
            assert!(matches!(client.send(&login).await, Err(NetError::NotConnected)));
        }
        // One attempt, then the 60 s window suppresses the rest.
        assert_eq!(client.reconnect.lock().unwrap().attempts(), 1);
        assert_eq!(client.state().current(), ConnectionState::Failed);
    }

    #[tokio::test]
    async fn test_reconnect_with_backoff_gives_up() {
        let addr = refused_addr().await;
        let (tx, _queue) = inbound_queue();
        let client = NetClient::new(
            ConnectionConfig {
                reconnect: ReconnectConfig {
                    initial_delay: Duration::from_millis(5),
                    max_attempts: 3,
                    jitter: 0.0,
                    ..Default::default()
                },
                ..config_for(addr)
            },
            tx,
        );

        let err = client.reconnect_with_backoff().await.unwrap_err();
        assert!(matches!(err, NetError::ReconnectExhausted { attempts: 3 }));
    }

    #[tokio::test]
    async fn test_reconnect_with_backoff_after_server_restart() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, _queue) = inbound_queue();
        let client = NetClient::new(
            ConnectionConfig {
                reconnect: ReconnectConfig {
                    initial_delay: Duration::from_millis(5),
                    jitter: 0.0,
                    ..Default::default()
                },
                ..config_for(addr)
            },
            tx,
        );

        client.connect().await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);

        let mut rx = client.state().subscribe();
        rx.wait_for(|s| *s == ConnectionState::Disconnected).await.unwrap();

        let accept = tokio::spawn(async move { listener.accept().await.map(|_| ()) });
        client.reconnect_with_backoff().await.unwrap();
        assert!(client.is_connected());
        accept.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_receive_loop_tolerates_arbitrary_chunking() {
        let envelopes = sample_envelopes();
        let mut stream = Vec::new();
        for envelope in &envelopes {
            let body = encode(envelope).unwrap();
            stream.extend_from_slice(&(body.len() as u32).to_le_bytes());
            stream.extend_from_slice(&body);
        }

        for chunk in [1, 3, 7, 64, stream.len()] {
            let (mut writer, mut reader) = duplex(chunk.max(1));
            let bytes = stream.clone();
            let feed = tokio::spawn(async move {
                for piece in bytes.chunks(chunk) {
                    writer.write_all(piece).await.unwrap();
                }
            });

            let (tx, mut queue) = inbound_queue();
            receive_loop(&mut reader, &tx, &FrameConfig::default())
                .await
                .unwrap();
            feed.await.unwrap();
            assert_eq!(queue.drain_all(), envelopes, "chunk size {chunk}");
        }
    }

    #[tokio::test]
    async fn test_receive_loop_skips_unknown_kind() {
        let (mut writer, mut reader) = duplex(1024);
        let login = encode(&Envelope::Login(Login { player_id: "p1".into() })).unwrap();
        let unknown = [42u8, 1, 2, 3];
        for body in [&unknown[..], &login[..]] {
            writer.write_all(&(body.len() as u32).to_le_bytes()).await.unwrap();
            writer.write_all(body).await.unwrap();
        }
        drop(writer);

        let (tx, mut queue) = inbound_queue();
        receive_loop(&mut reader, &tx, &FrameConfig::default())
            .await
            .unwrap();
        assert_eq!(
            queue.drain_all(),
            vec![Envelope::Login(Login { player_id: "p1".into() })]
        );
    }

    #[tokio::test]
    async fn test_receive_loop_fails_on_malformed_body() {
        let (mut writer, mut reader) = duplex(1024);
        // Login tag with a string length that overruns the body.
        let body = [0u8, 9, b'p'];
        writer.write_all(&(body.len() as u32).to_le_bytes()).await.unwrap();
        writer.write_all(&body).await.unwrap();

        let (tx, mut queue) = inbound_queue();
        let err = receive_loop(&mut reader, &tx, &FrameConfig::default())
            .await
            .unwrap_err();
        assert!(err.is_malformed());
        assert!(queue.drain_all().is_empty());
    }
}
