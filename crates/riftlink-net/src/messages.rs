//! Network message types and the envelope codec.
//!
//! Every frame body is exactly one [`Envelope`] serialized with [`postcard`].
//! The variant index is written first as a varint and acts as the wire tag,
//! so variants must only ever be appended, never reordered.
//!
//! ```text
//! Login { player_id: "p1" }  =>  00 02 70 31
//!                                 |  |  \___/
//!                                tag len  "p1"
//! ```
//!
//! This encoding is not Protocol Buffers compatible; a protobuf
//! `GameMessage` server cannot read these frames.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level enum
// ---------------------------------------------------------------------------

/// Top-level network message. The enum discriminant is the wire tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Envelope {
    // --- Session ---
    /// A player joined the game.
    Login(Login),
    /// A player left the game.
    Logout(Logout),
    /// Chat line.
    Chat(Chat),

    // --- Players ---
    /// Position and facing of a player.
    PlayerPosition(PlayerPosition),
    /// Server tells this client where to spawn its own player.
    SpawnMyPlayer(SpawnMyPlayer),
    /// Server tells this client to spawn a remote player.
    SpawnOtherPlayer(SpawnOtherPlayer),

    // --- Monsters ---
    /// Monster spawn (either direction).
    SpawnMonster(SpawnMonster),
    /// Monster moved on the ground plane.
    MoveMonster(MoveMonster),
    /// Monster acquired or lost a target.
    MonsterTarget(MonsterTarget),
    /// Monster started an attack.
    MonsterAttack(MonsterAttack),
    /// Monster took damage.
    MonsterDamage(MonsterDamage),
    /// Monster turns towards a heading over a duration.
    MonsterRotate(MonsterRotate),
    /// Hit effect on a monster surface.
    MonsterHitEffect(MonsterHitEffect),

    // --- Combat / animation ---
    /// A player took damage.
    PlayerDamage(PlayerDamage),
    /// Integer animator parameter.
    AnimatorSetInteger(AnimatorSetInteger),
    /// Float animator parameter.
    AnimatorSetFloat(AnimatorSetFloat),
    /// Bool animator parameter.
    AnimatorSetBool(AnimatorSetBool),
    /// Animator trigger.
    AnimatorSetTrigger(AnimatorSetTrigger),
    /// Root motion toggle.
    ApplyRootMotion(ApplyRootMotion),

    // --- Debug ---
    /// Navigation path to visualize. An empty path clears the visualization.
    PathTest(PathTest),

    // --- Appended ---
    /// Area attack cast by a monster.
    MeteorStrike(MeteorStrike),
}

// ---------------------------------------------------------------------------
// Payload structs
// ---------------------------------------------------------------------------

/// A point or direction in world space.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    /// The origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Login notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Login {
    /// Player that is logging in.
    pub player_id: String,
}

/// Logout notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Logout {
    /// Player that is logging out.
    pub player_id: String,
}

/// Chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    /// Display name of the sender.
    pub sender: String,
    /// Text content.
    pub content: String,
}

/// Player transform update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerPosition {
    pub player_id: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Facing vector X.
    pub fx: f32,
    /// Facing vector Y.
    pub fy: f32,
    /// Facing vector Z.
    pub fz: f32,
    /// Movement speed, drives locomotion blending on the receiving side.
    pub speed: f32,
    /// Yaw in degrees.
    pub rotation_y: f32,
}

impl PlayerPosition {
    /// Position as a vector.
    pub fn position(&self) -> Vector3 {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Facing direction as a vector.
    pub fn facing(&self) -> Vector3 {
        Vector3::new(self.fx, self.fy, self.fz)
    }
}

/// Spawn instruction for the local player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpawnMyPlayer {
    /// Character template to instantiate.
    pub player_template: i32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Spawn instruction for a remote player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpawnOtherPlayer {
    pub player_id: String,
    /// Character template to instantiate.
    pub player_template: i32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rotation_y: f32,
}

/// Monster spawn. Monsters live on the ground plane, so only X/Z are sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpawnMonster {
    pub monster_id: i32,
    pub x: f32,
    pub z: f32,
    /// Yaw in radians.
    pub rotation_y: f32,
}

/// Monster movement on the ground plane.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoveMonster {
    pub monster_id: i32,
    pub x: f32,
    pub z: f32,
}

/// Monster target change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonsterTarget {
    pub monster_id: i32,
    pub target_player_id: String,
    /// `false` means the monster dropped its target.
    pub has_target: bool,
}

/// Monster attack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonsterAttack {
    pub monster_id: i32,
    pub target_player_id: String,
    pub attack_type: i32,
    pub damage: f32,
}

/// Damage dealt to a monster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonsterDamage {
    pub monster_id: i32,
    pub damage: f32,
    /// Health after the damage was applied.
    pub current_hp: i32,
}

/// Timed monster rotation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonsterRotate {
    pub monster_id: i32,
    pub rotation: f32,
    /// Seconds over which the rotation is applied.
    pub duration: f32,
}

/// Hit effect on a monster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonsterHitEffect {
    pub monster_id: i32,
    pub hit_point: Vector3,
    pub hit_normal: Vector3,
    pub hit_effect_type: i32,
}

/// Damage dealt to a player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerDamage {
    pub player_id: String,
    pub damage: f32,
    pub attack_type: i32,
    pub hit_point_x: f32,
    pub hit_point_y: f32,
    pub hit_point_z: f32,
}

impl PlayerDamage {
    /// Hit point as a vector.
    pub fn hit_point(&self) -> Vector3 {
        Vector3::new(self.hit_point_x, self.hit_point_y, self.hit_point_z)
    }
}

/// Integer animator parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimatorSetInteger {
    pub player_id: String,
    /// Animator parameter hash.
    pub anim_id: i32,
    pub condition: i32,
}

/// Float animator parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimatorSetFloat {
    pub player_id: String,
    /// Animator parameter hash.
    pub anim_id: i32,
    pub condition: f32,
}

/// Bool animator parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimatorSetBool {
    pub player_id: String,
    /// Animator parameter hash.
    pub anim_id: i32,
    pub condition: bool,
}

/// Animator trigger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimatorSetTrigger {
    pub player_id: String,
    /// Animator parameter hash.
    pub anim_id: i32,
}

/// Root motion toggle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplyRootMotion {
    pub player_id: String,
    pub root_motion: bool,
}

/// Path points for navigation debugging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathTest {
    pub paths: Vec<Vector3>,
}

/// Meteor area attack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeteorStrike {
    pub monster_id: i32,
    pub target_player_id: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Impact radius in meters.
    pub radius: f32,
}

// ---------------------------------------------------------------------------
// MessageKind
// ---------------------------------------------------------------------------

/// Fieldless mirror of [`Envelope`], used for logging and tag checks.
///
/// The discriminant of each kind equals its wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Login,
    Logout,
    Chat,
    PlayerPosition,
    SpawnMyPlayer,
    SpawnOtherPlayer,
    SpawnMonster,
    MoveMonster,
    MonsterTarget,
    MonsterAttack,
    MonsterDamage,
    MonsterRotate,
    MonsterHitEffect,
    PlayerDamage,
    AnimatorSetInteger,
    AnimatorSetFloat,
    AnimatorSetBool,
    AnimatorSetTrigger,
    ApplyRootMotion,
    PathTest,
    MeteorStrike,
}

impl MessageKind {
    /// Number of kinds this build understands. Tags at or above this value
    /// come from a newer protocol revision.
    pub const COUNT: u32 = MessageKind::MeteorStrike as u32 + 1;

    /// Wire tag of this kind.
    pub fn tag(self) -> u32 {
        self as u32
    }
}

impl Envelope {
    /// Extract the kind of a message without consuming it.
    pub fn kind(&self) -> MessageKind {
        match self {
            Envelope::Login(_) => MessageKind::Login,
            Envelope::Logout(_) => MessageKind::Logout,
            Envelope::Chat(_) => MessageKind::Chat,
            Envelope::PlayerPosition(_) => MessageKind::PlayerPosition,
            Envelope::SpawnMyPlayer(_) => MessageKind::SpawnMyPlayer,
            Envelope::SpawnOtherPlayer(_) => MessageKind::SpawnOtherPlayer,
            Envelope::SpawnMonster(_) => MessageKind::SpawnMonster,
            Envelope::MoveMonster(_) => MessageKind::MoveMonster,
            Envelope::MonsterTarget(_) => MessageKind::MonsterTarget,
            Envelope::MonsterAttack(_) => MessageKind::MonsterAttack,
            Envelope::MonsterDamage(_) => MessageKind::MonsterDamage,
            Envelope::MonsterRotate(_) => MessageKind::MonsterRotate,
            Envelope::MonsterHitEffect(_) => MessageKind::MonsterHitEffect,
            Envelope::PlayerDamage(_) => MessageKind::PlayerDamage,
            Envelope::AnimatorSetInteger(_) => MessageKind::AnimatorSetInteger,
            Envelope::AnimatorSetFloat(_) => MessageKind::AnimatorSetFloat,
            Envelope::AnimatorSetBool(_) => MessageKind::AnimatorSetBool,
            Envelope::AnimatorSetTrigger(_) => MessageKind::AnimatorSetTrigger,
            Envelope::ApplyRootMotion(_) => MessageKind::ApplyRootMotion,
            Envelope::PathTest(_) => MessageKind::PathTest,
            Envelope::MeteorStrike(_) => MessageKind::MeteorStrike,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while encoding or decoding an envelope.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame body was empty.
    #[error("empty payload")]
    EmptyPayload,

    /// The tag belongs to a kind this build does not know.
    #[error("unknown message kind tag {0}")]
    UnknownKind(u32),

    /// A complete envelope was decoded but bytes were left over.
    #[error("{0} trailing bytes after envelope")]
    TrailingBytes(usize),

    /// Postcard (de)serialization failed, usually a truncated body.
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Serialize an [`Envelope`] into a frame body.
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
    Ok(postcard::to_allocvec(envelope)?)
}

/// Deserialize a frame body into an [`Envelope`].
///
/// A body must hold exactly one envelope. Tags from a newer protocol revision
/// are reported as [`CodecError::UnknownKind`] so callers can skip the frame.
pub fn decode(data: &[u8]) -> Result<Envelope, CodecError> {
    if data.is_empty() {
        return Err(CodecError::EmptyPayload);
    }

    let (tag, _) = postcard::take_from_bytes::<u32>(data)?;
    if tag >= MessageKind::COUNT {
        return Err(CodecError::UnknownKind(tag));
    }

    let (envelope, rest) = postcard::take_from_bytes::<Envelope>(data)?;
    if !rest.is_empty() {
        return Err(CodecError::TrailingBytes(rest.len()));
    }
    Ok(envelope)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// One representative envelope per kind, in tag order.
#[cfg(test)]
pub(crate) fn sample_envelopes() -> Vec<Envelope> {
    vec![
        Envelope::Login(Login {
            player_id: "p1".into(),
        }),
        Envelope::Logout(Logout {
            player_id: "p2".into(),
        }),
        Envelope::Chat(Chat {
            sender: "p1".into(),
            content: "héllo world".into(),
        }),
        Envelope::PlayerPosition(PlayerPosition {
            player_id: "p2".into(),
            x: 1.0,
            y: 0.0,
            z: 3.0,
            fx: 0.0,
            fy: 0.0,
            fz: 1.0,
            speed: 4.5,
            rotation_y: 90.0,
        }),
        Envelope::SpawnMyPlayer(SpawnMyPlayer {
            player_template: 2,
            x: 10.0,
            y: 0.5,
            z: -4.0,
        }),
        Envelope::SpawnOtherPlayer(SpawnOtherPlayer {
            player_id: "p3".into(),
            player_template: 1,
            x: -1.0,
            y: 0.0,
            z: 2.0,
            rotation_y: 180.0,
        }),
        Envelope::SpawnMonster(SpawnMonster {
            monster_id: 1,
            x: 0.0,
            z: 0.0,
            rotation_y: 1.57,
        }),
        Envelope::MoveMonster(MoveMonster {
            monster_id: 1,
            x: 5.5,
            z: -2.25,
        }),
        Envelope::MonsterTarget(MonsterTarget {
            monster_id: 1,
            target_player_id: "p1".into(),
            has_target: true,
        }),
        Envelope::MonsterAttack(MonsterAttack {
            monster_id: 1,
            target_player_id: "p1".into(),
            attack_type: 2,
            damage: 10.0,
        }),
        Envelope::MonsterDamage(MonsterDamage {
            monster_id: 1,
            damage: 12.5,
            current_hp: 87,
        }),
        Envelope::MonsterRotate(MonsterRotate {
            monster_id: 1,
            rotation: -0.5,
            duration: 0.25,
        }),
        Envelope::MonsterHitEffect(MonsterHitEffect {
            monster_id: 1,
            hit_point: Vector3::new(1.0, 2.0, 3.0),
            hit_normal: Vector3::new(0.0, 1.0, 0.0),
            hit_effect_type: 3,
        }),
        Envelope::PlayerDamage(PlayerDamage {
            player_id: "p1".into(),
            damage: 8.0,
            attack_type: 1,
            hit_point_x: 0.5,
            hit_point_y: 1.5,
            hit_point_z: -0.5,
        }),
        Envelope::AnimatorSetInteger(AnimatorSetInteger {
            player_id: "p2".into(),
            anim_id: -1_523_004_211,
            condition: 3,
        }),
        Envelope::AnimatorSetFloat(AnimatorSetFloat {
            player_id: "p2".into(),
            anim_id: 77,
            condition: 0.75,
        }),
        Envelope::AnimatorSetBool(AnimatorSetBool {
            player_id: "p2".into(),
            anim_id: 78,
            condition: true,
        }),
        Envelope::AnimatorSetTrigger(AnimatorSetTrigger {
            player_id: "p2".into(),
            anim_id: 79,
        }),
        Envelope::ApplyRootMotion(ApplyRootMotion {
            player_id: "p2".into(),
            root_motion: false,
        }),
        Envelope::PathTest(PathTest {
            paths: vec![Vector3::ZERO, Vector3::new(1.0, 0.0, 1.0)],
        }),
        Envelope::MeteorStrike(MeteorStrike {
            monster_id: 1,
            target_player_id: "p1".into(),
            x: 3.0,
            y: 0.0,
            z: 4.0,
            radius: 6.0,
        }),
    ]
}
