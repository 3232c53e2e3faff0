//! In-memory stand-in for the game scene.
//!
//! [`HeadlessWorld`] receives router callbacks, keeps just enough state to
//! answer "who and what is in the world", and logs everything else.

use std::collections::HashMap;

use riftlink_net::messages::{MeteorStrike, PlayerPosition};
use riftlink_net::{AnimatorValue, DamageTarget, GameEvents, Vector3};

/// The player controlled by this client.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalPlayer {
    pub template: i32,
    pub position: Vector3,
    /// Total damage taken since spawning.
    pub damage_taken: f32,
}

/// Another connected player.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlayer {
    pub template: i32,
    pub position: Vector3,
    pub facing: Vector3,
    pub rotation_y: f32,
    pub root_motion: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Monster {
    pub x: f32,
    pub z: f32,
    pub rotation_y: f32,
    /// Last health reported by the server, if any damage was seen.
    pub hp: Option<i32>,
    pub target: Option<String>,
}

/// Headless collaborator for [`riftlink_net::MessageRouter`].
#[derive(Debug, Default)]
pub struct HeadlessWorld {
    local: Option<LocalPlayer>,
    players: HashMap<String, RemotePlayer>,
    monsters: HashMap<i32, Monster>,
    path: Vec<Vector3>,
    chat_lines: usize,
}

impl HeadlessWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn local_player(&self) -> Option<&LocalPlayer> {
        self.local.as_ref()
    }

    pub fn player(&self, player_id: &str) -> Option<&RemotePlayer> {
        self.players.get(player_id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn monster(&self, monster_id: i32) -> Option<&Monster> {
        self.monsters.get(&monster_id)
    }

    pub fn monster_count(&self) -> usize {
        self.monsters.len()
    }

    /// Currently visualized path; empty when cleared.
    pub fn path(&self) -> &[Vector3] {
        &self.path
    }

    pub fn chat_lines(&self) -> usize {
        self.chat_lines
    }
}

impl GameEvents for HeadlessWorld {
    fn on_remote_player_position(&mut self, position: &PlayerPosition) {
        match self.players.get_mut(&position.player_id) {
            Some(player) => {
                player.position = position.position();
                player.facing = position.facing();
                player.rotation_y = position.rotation_y;
            }
            None => {
                tracing::debug!(player_id = %position.player_id, "position for unknown player ignored");
            }
        }
    }

    fn on_spawn_local_player(&mut self, template: i32, position: Vector3) {
        tracing::info!(template, ?position, "local player spawned");
        self.local = Some(LocalPlayer {
            template,
            position,
            damage_taken: 0.0,
        });
    }

    fn on_spawn_remote_player(
        &mut self,
        player_id: &str,
        template: i32,
        position: Vector3,
        rotation_y: f32,
    ) {
        tracing::info!(player_id, template, ?position, "remote player spawned");
        self.players.insert(
            player_id.to_string(),
            RemotePlayer {
                template,
                position,
                facing: Vector3::ZERO,
                rotation_y,
                root_motion: false,
            },
        );
    }

    fn on_remote_player_logout(&mut self, player_id: &str) {
        if self.players.remove(player_id).is_some() {
            tracing::info!(player_id, "remote player left");
        }
    }

    fn on_chat_message(&mut self, sender: &str, content: &str) {
        self.chat_lines += 1;
        tracing::info!(target: "riftlink_client::chat", sender, "{content}");
    }

    fn on_monster_spawned(&mut self, monster_id: i32, x: f32, z: f32, rotation_y: f32) {
        tracing::info!(monster_id, x, z, "monster spawned");
        self.monsters.insert(
            monster_id,
            Monster {
                x,
                z,
                rotation_y,
                hp: None,
                target: None,
            },
        );
    }

    fn on_monster_moved(&mut self, monster_id: i32, x: f32, z: f32) {
        if let Some(monster) = self.monsters.get_mut(&monster_id) {
            monster.x = x;
            monster.z = z;
        }
    }

    fn on_monster_targeted(&mut self, monster_id: i32, target_player_id: &str, has_target: bool) {
        if let Some(monster) = self.monsters.get_mut(&monster_id) {
            monster.target = has_target.then(|| target_player_id.to_string());
        }
    }

    fn on_monster_attacked(
        &mut self,
        monster_id: i32,
        target_player_id: &str,
        attack_type: i32,
        damage: f32,
    ) {
        tracing::debug!(monster_id, target_player_id, attack_type, damage, "monster attack");
    }

    fn on_monster_damaged(&mut self, monster_id: i32, damage: f32, current_hp: i32) {
        if let Some(monster) = self.monsters.get_mut(&monster_id) {
            monster.hp = Some(current_hp);
        }
        tracing::debug!(monster_id, damage, current_hp, "monster damaged");
        if current_hp <= 0 {
            tracing::info!(monster_id, "monster defeated");
        }
    }

    fn on_monster_rotated(&mut self, monster_id: i32, rotation: f32, duration: f32) {
        if let Some(monster) = self.monsters.get_mut(&monster_id) {
            monster.rotation_y = rotation;
        }
        tracing::trace!(monster_id, rotation, duration, "monster rotate");
    }

    fn on_monster_hit_effect(
        &mut self,
        monster_id: i32,
        hit_point: Vector3,
        _hit_normal: Vector3,
        effect_type: i32,
    ) {
        tracing::trace!(monster_id, ?hit_point, effect_type, "hit effect");
    }

    fn on_monster_meteor_strike(&mut self, strike: &MeteorStrike) {
        tracing::info!(
            monster_id = strike.monster_id,
            target_player = %strike.target_player_id,
            radius = strike.radius,
            "meteor strike"
        );
    }

    fn on_player_damaged(
        &mut self,
        target: DamageTarget<'_>,
        damage: f32,
        attack_type: i32,
        hit_point: Vector3,
    ) {
        match target {
            DamageTarget::Local => {
                if let Some(local) = self.local.as_mut() {
                    local.damage_taken += damage;
                }
                tracing::info!(damage, attack_type, ?hit_point, "local player hit");
            }
            DamageTarget::Remote(player_id) => {
                tracing::debug!(player_id, damage, attack_type, "remote player hit");
            }
        }
    }

    fn on_animator_parameter_set(&mut self, player_id: &str, anim_id: i32, value: AnimatorValue) {
        tracing::trace!(player_id, anim_id, ?value, "animator parameter");
    }

    fn on_root_motion_toggled(&mut self, player_id: &str, enabled: bool) {
        if let Some(player) = self.players.get_mut(player_id) {
            player.root_motion = enabled;
        }
    }

    fn on_path_visualization_update(&mut self, points: &[Vector3]) {
        self.path = points.to_vec();
    }
}
