//! The client's run loop: connect, log in, tick, recover, shut down.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use riftlink_config::{Config, NetworkConfig};
use riftlink_net::{
    ConnectionConfig, ConnectionState, FrameConfig, MessageRouter, NetClient, NetError, Outbound,
    ReconnectConfig, inbound_queue,
};
use tokio::time::MissedTickBehavior;

use crate::world::HeadlessWorld;

/// Translate persisted network settings into connection settings.
pub fn connection_config(network: &NetworkConfig) -> ConnectionConfig {
    let reconnect = &network.reconnect;
    ConnectionConfig {
        addr: network.endpoint(),
        connect_timeout: network.connect_timeout(),
        frame: FrameConfig {
            max_payload_size: network.max_frame_bytes,
        },
        reconnect: ReconnectConfig {
            initial_delay: reconnect.initial_delay(),
            backoff_multiplier: reconnect.backoff_multiplier,
            max_delay: reconnect.max_delay(),
            max_attempts: reconnect.max_attempts,
            jitter: reconnect.jitter.clamp(0.0, 1.0),
        },
        implicit_reconnect: true,
    }
}

/// One client session: connection, router, and the world it feeds.
pub struct ClientSession {
    client: Arc<NetClient>,
    outbound: Outbound,
    router: MessageRouter,
    world: HeadlessWorld,
    player_id: String,
    tick_interval: Duration,
}

impl ClientSession {
    pub fn new(config: &Config) -> Self {
        let (inbound_tx, inbound_rx) = inbound_queue();
        let client = Arc::new(NetClient::new(connection_config(&config.network), inbound_tx));
        Self {
            outbound: Outbound::new(Arc::clone(&client)),
            client,
            router: MessageRouter::new(inbound_rx, config.player.player_id.clone()),
            world: HeadlessWorld::new(),
            player_id: config.player.player_id.clone(),
            tick_interval: config.client.tick_interval(),
        }
    }

    pub fn client(&self) -> &Arc<NetClient> {
        &self.client
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    pub fn world(&self) -> &HeadlessWorld {
        &self.world
    }

    /// Connect and announce the local player.
    pub async fn start(&self) -> Result<(), NetError> {
        self.client.connect().await?;
        self.outbound.login(&self.player_id).await?;
        tracing::info!(player_id = %self.player_id, addr = %self.client.addr(), "logged in");
        Ok(())
    }

    /// Dispatch pending messages once. Returns how many were dispatched.
    pub fn tick(&mut self) -> usize {
        self.router.tick(&mut self.world)
    }

    /// Tick until `shutdown` resolves, reconnecting whenever the connection
    /// drops. Always ends with the shutdown hook (logout, then close).
    ///
    /// Returns an error only if reconnection gives up.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<(), NetError>
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                () = &mut shutdown => break Ok(()),
                _ = interval.tick() => {}
            }

            let dispatched = self.tick();
            if dispatched > 0 {
                tracing::trace!(dispatched, "tick");
            }

            if matches!(
                self.client.state().current(),
                ConnectionState::Disconnected | ConnectionState::Failed
            ) {
                tokio::select! {
                    () = &mut shutdown => break Ok(()),
                    recovered = self.recover() => {
                        if let Err(e) = recovered {
                            break Err(e);
                        }
                    }
                }
            }
        };

        // Deliver whatever arrived before the connection goes away.
        self.tick();
        self.outbound.shutdown(&self.player_id).await;
        tracing::info!("session ended");
        result
    }

    async fn recover(&self) -> Result<(), NetError> {
        match self.client.last_error() {
            Some(e) => tracing::warn!(error = %e, "connection lost, reconnecting"),
            None => tracing::warn!("connection closed by server, reconnecting"),
        }
        self.client.reconnect_with_backoff().await?;
        if let Err(e) = self.outbound.login(&self.player_id).await {
            tracing::warn!(error = %e, "login after reconnect failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riftlink_net::messages::{Envelope, Logout, SpawnOtherPlayer};
    use riftlink_net::{MessageKind, decode, encode, read_frame, write_frame};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    fn test_config(port: u16) -> Config {
        let mut config = Config::default();
        config.network.server_port = port;
        config.network.reconnect.initial_delay_ms = 10;
        config.network.reconnect.jitter = 0.0;
        config.player.player_id = "me".into();
        config.client.tick_rate_hz = 200;
        config
    }

    #[test]
    fn test_connection_config_mapping() {
        let mut network = NetworkConfig::default();
        network.server_address = "10.1.2.3".into();
        network.reconnect.jitter = 4.0;

        let cfg = connection_config(&network);
        assert_eq!(cfg.addr, "10.1.2.3:9090");
        assert_eq!(cfg.connect_timeout, Duration::from_secs(5));
        assert_eq!(cfg.frame.max_payload_size, 1_048_576);
        assert_eq!(cfg.reconnect.max_attempts, 20);
        assert_eq!(cfg.reconnect.jitter, 1.0);
    }

    #[tokio::test]
    async fn test_session_logs_in_dispatches_and_logs_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let frame = FrameConfig::default();
            let login = read_frame(&mut stream, &frame).await.unwrap().unwrap();
            assert_eq!(decode(&login).unwrap().kind(), MessageKind::Login);

            let spawn = Envelope::SpawnOtherPlayer(SpawnOtherPlayer {
                player_id: "p2".into(),
                player_template: 1,
                x: 1.0,
                y: 0.0,
                z: 2.0,
                rotation_y: 0.0,
            });
            write_frame(&mut stream, &encode(&spawn).unwrap(), &frame)
                .await
                .unwrap();
            // Give the client a few ticks, then ask it to stop.
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = stop_tx.send(());

            let logout = read_frame(&mut stream, &frame).await.unwrap().unwrap();
            decode(&logout).unwrap()
        });

        let mut session = ClientSession::new(&test_config(port));
        session.start().await.unwrap();
        session
            .run_until(async {
                let _ = stop_rx.await;
            })
            .await
            .unwrap();

        assert_eq!(session.world().player_count(), 1);
        assert!(session.world().player("p2").is_some());
        assert_eq!(
            server.await.unwrap(),
            Envelope::Logout(Logout {
                player_id: "me".into()
            })
        );
        assert_eq!(
            session.client().state().current(),
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_session_reconnects_and_logs_in_again() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            let frame = FrameConfig::default();
            let (mut first, _) = listener.accept().await.unwrap();
            read_frame(&mut first, &frame).await.unwrap().unwrap();
            drop(first);

            let (mut second, _) = listener.accept().await.unwrap();
            let login = read_frame(&mut second, &frame).await.unwrap().unwrap();
            let _ = stop_tx.send(());
            // Hold the socket until the client's logout arrives.
            let _ = read_frame(&mut second, &frame).await;
            decode(&login).unwrap().kind()
        });

        let mut session = ClientSession::new(&test_config(port));
        session.start().await.unwrap();
        session
            .run_until(async {
                let _ = stop_rx.await;
            })
            .await
            .unwrap();

        assert_eq!(server.await.unwrap(), MessageKind::Login);
    }

    #[tokio::test]
    async fn test_run_until_gives_up_when_server_is_gone() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut config = test_config(port);
        config.network.reconnect.max_attempts = 2;

        let mut session = ClientSession::new(&config);
        assert!(session.start().await.is_err());

        let result = session.run_until(std::future::pending()).await;
        assert!(matches!(result, Err(NetError::ReconnectExhausted { attempts: 2 })));
    }
}
