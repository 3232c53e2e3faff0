//! Typed send helpers, one per client-originated message kind.
//!
//! Each helper builds an [`Envelope`] and hands it to [`NetClient::send`].
//! Field values are not validated beyond what the codec enforces.

use std::sync::Arc;

use crate::error::NetError;
use crate::messages::{
    Chat, Envelope, Login, Logout, MonsterDamage, PlayerDamage, PlayerPosition, SpawnMonster,
    Vector3,
};
use crate::tcp_client::NetClient;

/// Monster id requested by [`Outbound::spawn_default_monster`].
pub const DEFAULT_MONSTER_ID: i32 = 1;

/// Outbound API over a shared connection handle.
#[derive(Debug, Clone)]
pub struct Outbound {
    client: Arc<NetClient>,
}

impl Outbound {
    pub fn new(client: Arc<NetClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<NetClient> {
        &self.client
    }

    pub async fn login(&self, player_id: &str) -> Result<(), NetError> {
        self.send_raw(&Envelope::Login(Login {
            player_id: player_id.to_string(),
        }))
        .await
    }

    pub async fn logout(&self, player_id: &str) -> Result<(), NetError> {
        self.send_raw(&Envelope::Logout(Logout {
            player_id: player_id.to_string(),
        }))
        .await
    }

    pub async fn chat(&self, sender: &str, content: &str) -> Result<(), NetError> {
        self.send_raw(&Envelope::Chat(Chat {
            sender: sender.to_string(),
            content: content.to_string(),
        }))
        .await
    }

    /// Report the local player's transform.
    pub async fn player_position(
        &self,
        player_id: &str,
        position: Vector3,
        facing: Vector3,
        speed: f32,
        rotation_y: f32,
    ) -> Result<(), NetError> {
        self.send_raw(&Envelope::PlayerPosition(PlayerPosition {
            player_id: player_id.to_string(),
            x: position.x,
            y: position.y,
            z: position.z,
            fx: facing.x,
            fy: facing.y,
            fz: facing.z,
            speed,
            rotation_y,
        }))
        .await
    }

    pub async fn player_damage(
        &self,
        player_id: &str,
        damage: f32,
        attack_type: i32,
        hit_point: Vector3,
    ) -> Result<(), NetError> {
        self.send_raw(&Envelope::PlayerDamage(PlayerDamage {
            player_id: player_id.to_string(),
            damage,
            attack_type,
            hit_point_x: hit_point.x,
            hit_point_y: hit_point.y,
            hit_point_z: hit_point.z,
        }))
        .await
    }

    pub async fn monster_damage(
        &self,
        monster_id: i32,
        damage: f32,
        current_hp: i32,
    ) -> Result<(), NetError> {
        self.send_raw(&Envelope::MonsterDamage(MonsterDamage {
            monster_id,
            damage,
            current_hp,
        }))
        .await
    }

    pub async fn spawn_monster(
        &self,
        monster_id: i32,
        x: f32,
        z: f32,
        rotation_y: f32,
    ) -> Result<(), NetError> {
        self.send_raw(&Envelope::SpawnMonster(SpawnMonster {
            monster_id,
            x,
            z,
            rotation_y,
        }))
        .await
    }

    /// Ask the server for monster 1 at the origin.
    pub async fn spawn_default_monster(&self) -> Result<(), NetError> {
        self.spawn_monster(DEFAULT_MONSTER_ID, 0.0, 0.0, 0.0).await
    }

    /// Send an already-built envelope, e.g. animator or ability messages.
    pub async fn send_raw(&self, envelope: &Envelope) -> Result<(), NetError> {
        self.client.send(envelope).await
    }

    /// Shutdown hook: announce the logout, then close the connection.
    ///
    /// The connection is closed even if the logout could not be sent. Never
    /// dials the server: when not connected the logout is skipped.
    pub async fn shutdown(&self, player_id: &str) {
        self.client.suppress_reconnect();
        if !self.client.is_connected() {
            tracing::debug!(player_id, "not connected, skipping logout");
        } else if let Err(e) = self.logout(player_id).await {
            tracing::warn!(error = %e, player_id, "failed to send logout during shutdown");
        }
        self.client.close().await;
    }
}
