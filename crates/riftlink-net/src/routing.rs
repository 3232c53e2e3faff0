//! Message routing: dispatch received envelopes to game-side collaborators.
//!
//! The [`MessageRouter`] owns the consumer end of the inbound queue. Once per
//! game tick, [`MessageRouter::tick`] drains every pending envelope and hands
//! each to exactly one [`GameEvents`] method, in arrival order. Dispatch is an
//! exhaustive match over [`Envelope`], so adding a message kind fails to
//! compile until it is routed.

use crate::inbound::InboundQueue;
use crate::messages::{Envelope, MeteorStrike, PlayerPosition, Vector3};

/// Who a [`crate::messages::PlayerDamage`] is aimed at, resolved against the
/// locally known player id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageTarget<'a> {
    /// The player controlled by this client.
    Local,
    /// Another connected player.
    Remote(&'a str),
}

/// Value carried by one of the animator parameter messages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimatorValue {
    Integer(i32),
    Float(f32),
    Bool(bool),
    Trigger,
}

/// Collaborator interface consumed by the router.
///
/// Every method defaults to a no-op so implementors only override what they
/// present. Calls happen on the consumer tick and must not block.
#[allow(unused_variables)]
pub trait GameEvents {
    fn on_remote_player_position(&mut self, position: &PlayerPosition) {}

    fn on_spawn_local_player(&mut self, template: i32, position: Vector3) {}

    fn on_spawn_remote_player(
        &mut self,
        player_id: &str,
        template: i32,
        position: Vector3,
        rotation_y: f32,
    ) {
    }

    fn on_remote_player_logout(&mut self, player_id: &str) {}

    fn on_chat_message(&mut self, sender: &str, content: &str) {}

    fn on_monster_spawned(&mut self, monster_id: i32, x: f32, z: f32, rotation_y: f32) {}

    fn on_monster_moved(&mut self, monster_id: i32, x: f32, z: f32) {}

    /// `has_target == false` means the monster dropped `target_player_id`.
    fn on_monster_targeted(&mut self, monster_id: i32, target_player_id: &str, has_target: bool) {}

    fn on_monster_attacked(
        &mut self,
        monster_id: i32,
        target_player_id: &str,
        attack_type: i32,
        damage: f32,
    ) {
    }

    fn on_monster_damaged(&mut self, monster_id: i32, damage: f32, current_hp: i32) {}

    fn on_monster_rotated(&mut self, monster_id: i32, rotation: f32, duration: f32) {}

    fn on_monster_hit_effect(
        &mut self,
        monster_id: i32,
        hit_point: Vector3,
        hit_normal: Vector3,
        effect_type: i32,
    ) {
    }

    fn on_monster_meteor_strike(&mut self, strike: &MeteorStrike) {}

    fn on_player_damaged(
        &mut self,
        target: DamageTarget<'_>,
        damage: f32,
        attack_type: i32,
        hit_point: Vector3,
    ) {
    }

    fn on_animator_parameter_set(&mut self, player_id: &str, anim_id: i32, value: AnimatorValue) {}

    fn on_root_motion_toggled(&mut self, player_id: &str, enabled: bool) {}

    /// An empty slice clears the visualized path.
    fn on_path_visualization_update(&mut self, points: &[Vector3]) {}
}

/// Drains the inbound queue and dispatches by message kind.
pub struct MessageRouter {
    queue: InboundQueue,
    local_player_id: String,
}

impl MessageRouter {
    /// Create a router over `queue`. `local_player_id` is the identity this
    /// client logged in with.
    pub fn new(queue: InboundQueue, local_player_id: impl Into<String>) -> Self {
        Self {
            queue,
            local_player_id: local_player_id.into(),
        }
    }

    pub fn local_player_id(&self) -> &str {
        &self.local_player_id
    }

    pub fn set_local_player_id(&mut self, player_id: impl Into<String>) {
        self.local_player_id = player_id.into();
    }

    /// Dispatch everything received since the previous tick.
    ///
    /// Returns the number of envelopes dispatched. Never blocks.
    pub fn tick<E: GameEvents + ?Sized>(&mut self, events: &mut E) -> usize {
        let pending = self.queue.drain_all();
        let count = pending.len();
        for envelope in pending {
            self.dispatch(envelope, events);
        }
        count
    }

    /// Route a single envelope to its collaborator method.
    pub fn dispatch<E: GameEvents + ?Sized>(&self, envelope: Envelope, events: &mut E) {
        match envelope {
            Envelope::PlayerPosition(msg) => events.on_remote_player_position(&msg),
            Envelope::SpawnMyPlayer(msg) => {
                events.on_spawn_local_player(msg.player_template, Vector3::new(msg.x, msg.y, msg.z))
            }
            Envelope::SpawnOtherPlayer(msg) => events.on_spawn_remote_player(
                &msg.player_id,
                msg.player_template,
                Vector3::new(msg.x, msg.y, msg.z),
                msg.rotation_y,
            ),
            Envelope::Logout(msg) => events.on_remote_player_logout(&msg.player_id),
            Envelope::Chat(msg) => events.on_chat_message(&msg.sender, &msg.content),
            Envelope::SpawnMonster(msg) => {
                events.on_monster_spawned(msg.monster_id, msg.x, msg.z, msg.rotation_y)
            }
            Envelope::MoveMonster(msg) => events.on_monster_moved(msg.monster_id, msg.x, msg.z),
            Envelope::MonsterTarget(msg) => {
                events.on_monster_targeted(msg.monster_id, &msg.target_player_id, msg.has_target)
            }
            Envelope::MonsterAttack(msg) => events.on_monster_attacked(
                msg.monster_id,
                &msg.target_player_id,
                msg.attack_type,
                msg.damage,
            ),
            Envelope::MonsterDamage(msg) => {
                events.on_monster_damaged(msg.monster_id, msg.damage, msg.current_hp)
            }
            Envelope::MonsterRotate(msg) => {
                events.on_monster_rotated(msg.monster_id, msg.rotation, msg.duration)
            }
            Envelope::MonsterHitEffect(msg) => events.on_monster_hit_effect(
                msg.monster_id,
                msg.hit_point,
                msg.hit_normal,
                msg.hit_effect_type,
            ),
            Envelope::MeteorStrike(msg) => events.on_monster_meteor_strike(&msg),
            Envelope::PlayerDamage(msg) => {
                let target = if msg.player_id == self.local_player_id {
                    DamageTarget::Local
                } else {
                    DamageTarget::Remote(&msg.player_id)
                };
                events.on_player_damaged(target, msg.damage, msg.attack_type, msg.hit_point());
            }
            Envelope::AnimatorSetInteger(msg) => events.on_animator_parameter_set(
                &msg.player_id,
                msg.anim_id,
                AnimatorValue::Integer(msg.condition),
            ),
            Envelope::AnimatorSetFloat(msg) => events.on_animator_parameter_set(
                &msg.player_id,
                msg.anim_id,
                AnimatorValue::Float(msg.condition),
            ),
            Envelope::AnimatorSetBool(msg) => events.on_animator_parameter_set(
                &msg.player_id,
                msg.anim_id,
                AnimatorValue::Bool(msg.condition),
            ),
            Envelope::AnimatorSetTrigger(msg) => {
                events.on_animator_parameter_set(&msg.player_id, msg.anim_id, AnimatorValue::Trigger)
            }
            Envelope::ApplyRootMotion(msg) => {
                events.on_root_motion_toggled(&msg.player_id, msg.root_motion)
            }
            Envelope::PathTest(msg) => events.on_path_visualization_update(&msg.paths),
            Envelope::Login(msg) => {
                tracing::trace!(player_id = %msg.player_id, "ignoring inbound login");
            }
        }
    }
}
