//! Wire types at the simulation boundary
//!
//! Inbound: JSON `{ "t": type, "d": payload }` input messages. Outbound:
//! per-recipient [`Snapshot`]s, encoded with bincode in serde mode.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::game::entity::{Entity, EntityId, EntityKind, Header, OreCounts, Player, Projectile, Sentinel};
use crate::game::events::VisualEffect;
use crate::game::input::InputCommand;
use crate::game::spatial::Rect;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed input message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("Decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

// ============================================================================
// Inbound
// ============================================================================

/// Raw client input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMessage {
    /// Message type, e.g. `MOVE_START`
    pub t: String,
    /// Payload; absent means empty
    #[serde(default)]
    pub d: Option<String>,
}

impl InputMessage {
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Typed command, or `None` for unknown types and bad payloads
    pub fn into_command(self) -> Option<InputCommand> {
        let payload = self.d.as_deref().unwrap_or("");
        let command = InputCommand::parse(&self.t, payload);
        if command.is_none() {
            debug!("Ignoring input '{}' with payload '{}'", self.t, payload);
        }
        command
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// Combat state shared by players and sentinels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub hp: f64,
    pub max_hp: f64,
    pub shield: f64,
    pub max_shield: f64,
    pub vx: f64,
    pub vy: f64,
}

/// Player-only progression fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PilotView {
    pub score: u64,
    pub level: u32,
    pub experience: u64,
    pub ores: OreCounts,
    pub weapon: String,
    pub scanner: bool,
}

/// One visible object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityKind,
    pub x: f64,
    pub y: f64,
    pub size: u32,
    pub symbol: String,
    pub color: String,
    pub name: String,
    pub vitals: Option<Vitals>,
    pub pilot: Option<PilotView>,
}

impl EntityView {
    fn base(kind: EntityKind, header: &Header) -> Self {
        Self {
            id: header.id,
            kind,
            x: header.position.x,
            y: header.position.y,
            size: header.size,
            symbol: header.symbol.clone(),
            color: header.color.clone(),
            name: header.name.clone(),
            vitals: None,
            pilot: None,
        }
    }

    pub fn from_player(p: &Player) -> Self {
        Self {
            vitals: Some(Vitals {
                hp: p.hp,
                max_hp: p.max_hp,
                shield: p.shield,
                max_shield: p.max_shield as f64,
                vx: p.velocity.x,
                vy: p.velocity.y,
            }),
            pilot: Some(PilotView {
                score: p.score,
                level: p.level,
                experience: p.experience,
                ores: p.ores,
                weapon: p.weapon.name.to_string(),
                scanner: p.scanner,
            }),
            ..Self::base(EntityKind::Player, &p.header)
        }
    }

    pub fn from_sentinel(s: &Sentinel) -> Self {
        Self {
            vitals: Some(Vitals {
                hp: s.hp,
                max_hp: s.max_hp,
                shield: s.shield,
                max_shield: s.max_shield,
                vx: s.velocity.x,
                vy: s.velocity.y,
            }),
            ..Self::base(EntityKind::Sentinel, &s.header)
        }
    }

    pub fn from_projectile(p: &Projectile) -> Self {
        Self::base(EntityKind::Projectile, &p.header)
    }

    pub fn from_entity(entity: &Entity) -> Self {
        Self::base(entity.kind(), entity.header())
    }
}

/// Entity counts shown with the debug overlay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugCounts {
    /// Objects in this snapshot
    pub objects: usize,
    pub sentinels: usize,
    pub projectiles: usize,
    pub players: usize,
    pub statics: usize,
}

/// Index partitions and counters for players with `!debug` on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugOverlay {
    pub dynamic_boundaries: Vec<Rect>,
    pub static_boundaries: Vec<Rect>,
    pub tick: u64,
    pub counts: DebugCounts,
}

/// Everything one recipient receives for one broadcast cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub objects: Vec<EntityView>,
    pub events: Vec<String>,
    pub effects: Vec<VisualEffect>,
    pub debug: Option<DebugOverlay>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Encode an outbound message with bincode
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(bincode::serde::encode_to_vec(message, bincode::config::legacy())?)
}

/// Decode a message produced by [`encode`]
pub fn decode<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    let (value, _) = bincode::serde::decode_from_slice(data, bincode::config::legacy())?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::{Direction, Meteorite, OreTier};
    use crate::game::events::EffectKind;
    use crate::util::vec2::Vec2;
    use uuid::Uuid;

    #[test]
    fn test_input_from_json() {
        let msg = InputMessage::from_json(r#"{"t":"MOVE_START","d":"LEFT"}"#).unwrap();
        assert_eq!(msg.into_command(), Some(InputCommand::MoveStart(Direction::Left)));

        let msg = InputMessage::from_json(r#"{"t":"SHOOT"}"#).unwrap();
        assert_eq!(msg.into_command(), Some(InputCommand::Shoot(None)));

        let msg = InputMessage::from_json(r#"{"t":"TELEPORT","d":"1,1"}"#).unwrap();
        assert_eq!(msg.into_command(), None);

        assert!(matches!(InputMessage::from_json("{not json"), Err(ProtocolError::Json(_))));
    }

    #[test]
    fn test_views_carry_kind_fields() {
        let mut player = Player::new(Uuid::new_v4(), "neo", "[P]", "#58a6ff", Vec2::new(3.5, 4.5));
        player.ores.gold = 2;
        let view = EntityView::from_player(&player);
        assert_eq!(view.kind, EntityKind::Player);
        assert_eq!(view.pilot.as_ref().map(|p| p.ores.gold), Some(2));
        assert_eq!(view.pilot.as_ref().map(|p| p.weapon.as_str()), Some("BASIC_BLASTER"));

        let rock = Entity::Meteorite(Meteorite::new(Uuid::from_u64_pair(0, 9), Vec2::new(1.5, 1.5), Some(OreTier::Silver)));
        let view = EntityView::from_entity(&rock);
        assert_eq!(view.kind, EntityKind::Meteorite);
        assert_eq!(view.name, "SILVER_METEORITE");
        assert!(view.vitals.is_none() && view.pilot.is_none());
    }

    #[test]
    fn test_snapshot_binary_and_json() {
        let player = Player::new(Uuid::new_v4(), "neo", "[P]", "#58a6ff", Vec2::new(3.5, 4.5));
        let snapshot = Snapshot {
            objects: vec![EntityView::from_player(&player)],
            events: vec!["[#58a6ff]Agent neo uplink established.".into()],
            effects: vec![VisualEffect::new(EffectKind::Hit, Vec2::new(1.0, 2.0), "#ffffff").with_size(2)],
            debug: None,
        };

        let bytes = encode(&snapshot).unwrap();
        let decoded: Snapshot = decode(&bytes).unwrap();
        assert_eq!(decoded, snapshot);

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"kind\":\"PLAYER\""));
        assert!(json.contains("\"kind\":\"HIT\""));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(decode::<Snapshot>(&[0xff, 0x01]), Err(ProtocolError::Decode(_))));
    }
}
