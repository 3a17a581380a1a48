//! Entity model
//!
//! Every simulated object is one variant of the closed [`Entity`] enum. All
//! variants share a [`Header`] (id, position, size, presentation), and
//! consumers dispatch on the variant with `match` rather than through traits.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::constants::{player as player_consts, sentinel as sentinel_consts};
use crate::game::weapon::Weapon;
use crate::util::vec2::Vec2;

/// Stable entity identifier
pub type EntityId = Uuid;

// ============================================================================
// Kinds, tiers and directions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Player,
    Sentinel,
    Projectile,
    Meteorite,
    Ore,
    DataNode,
    SpaceStation,
    Wormhole,
}

impl EntityKind {
    /// Indexed in the per-tick dynamic quadtree
    pub fn is_dynamic(self) -> bool {
        matches!(self, Self::Player | Self::Sentinel | Self::Projectile)
    }

    /// Blocks movement and projectiles
    pub fn is_solid(self) -> bool {
        matches!(self, Self::Meteorite)
    }
}

/// Resource tier carried by meteorites and ore pickups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OreTier {
    Copper,
    Silver,
    Gold,
}

impl OreTier {
    pub const ALL: [OreTier; 3] = [OreTier::Copper, OreTier::Silver, OreTier::Gold];

    /// Score awarded on pickup; experience is half of it
    pub fn value(self) -> u64 {
        match self {
            Self::Copper => 50,
            Self::Silver => 150,
            Self::Gold => 500,
        }
    }

    /// Hit points restored on pickup
    pub fn heal(self) -> f64 {
        match self {
            Self::Copper => 1.0,
            Self::Silver => 2.0,
            Self::Gold => 3.0,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Copper => "#b87333",
            Self::Silver => "#c0c0c0",
            Self::Gold => "#ffd700",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Copper => "COPPER",
            Self::Silver => "SILVER",
            Self::Gold => "GOLD",
        }
    }

    pub fn from_token(token: &str) -> Option<OreTier> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.label().eq_ignore_ascii_case(token))
    }
}

/// One of the four movement directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    pub fn from_token(token: &str) -> Option<Direction> {
        match token.trim().to_ascii_uppercase().as_str() {
            "UP" => Some(Self::Up),
            "DOWN" => Some(Self::Down),
            "LEFT" => Some(Self::Left),
            "RIGHT" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn unit(self) -> Vec2 {
        match self {
            Self::Up => Vec2::UP,
            Self::Down => Vec2::DOWN,
            Self::Left => Vec2::LEFT,
            Self::Right => Vec2::RIGHT,
        }
    }

    pub fn flag(self) -> DirectionSet {
        match self {
            Self::Up => DirectionSet::UP,
            Self::Down => DirectionSet::DOWN,
            Self::Left => DirectionSet::LEFT,
            Self::Right => DirectionSet::RIGHT,
        }
    }
}

bitflags! {
    /// Movement directions currently held by a player
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DirectionSet: u8 {
        const UP = 1 << 0;
        const DOWN = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
    }
}

impl DirectionSet {
    /// Held directions in fixed UP, DOWN, LEFT, RIGHT order
    pub fn directions(self) -> impl Iterator<Item = Direction> {
        Direction::ALL
            .into_iter()
            .filter(move |d| self.contains(d.flag()))
    }
}

// ============================================================================
// Shared header
// ============================================================================

/// Fields every entity carries
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub id: EntityId,
    pub position: Vec2,
    /// Square footprint edge length; half of it is the collision half-extent
    pub size: u32,
    pub symbol: String,
    pub color: String,
    pub name: String,
}

impl Header {
    pub fn new(id: EntityId, position: Vec2, size: u32, symbol: &str, color: &str, name: &str) -> Self {
        Self {
            id,
            position,
            size,
            symbol: symbol.to_string(),
            color: color.to_string(),
            name: name.to_string(),
        }
    }

    pub fn half_size(&self) -> f64 {
        self.size as f64 / 2.0
    }
}

// ============================================================================
// Variants
// ============================================================================

/// Per-tier ore counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OreCounts {
    pub copper: u32,
    pub silver: u32,
    pub gold: u32,
}

impl OreCounts {
    pub fn get(&self, tier: OreTier) -> u32 {
        match tier {
            OreTier::Copper => self.copper,
            OreTier::Silver => self.silver,
            OreTier::Gold => self.gold,
        }
    }

    pub fn get_mut(&mut self, tier: OreTier) -> &mut u32 {
        match tier {
            OreTier::Copper => &mut self.copper,
            OreTier::Silver => &mut self.silver,
            OreTier::Gold => &mut self.gold,
        }
    }

    pub fn total(&self) -> u32 {
        self.copper + self.silver + self.gold
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub header: Header,
    pub score: u64,
    pub hp: f64,
    pub max_hp: f64,
    pub shield: f64,
    pub max_shield: u32,
    pub ores: OreCounts,
    pub level: u32,
    pub experience: u64,
    pub weapon: Weapon,
    pub velocity: Vec2,
    pub last_shot_ms: u64,
    pub last_direction: Direction,
    /// 0 while alive, otherwise the time at which the player re-enters play
    pub respawn_at_ms: u64,
    pub held: DirectionSet,
    pub scanner: bool,
    pub debug_overlay: bool,
}

impl Player {
    pub fn new(id: EntityId, name: &str, symbol: &str, color: &str, position: Vec2) -> Self {
        Self {
            header: Header::new(id, position, 1, symbol, color, name),
            score: 0,
            hp: player_consts::MAX_HP,
            max_hp: player_consts::MAX_HP,
            shield: 0.0,
            max_shield: 0,
            ores: OreCounts::default(),
            level: 1,
            experience: 0,
            weapon: Weapon::BASIC,
            velocity: Vec2::ZERO,
            last_shot_ms: 0,
            last_direction: Direction::Up,
            respawn_at_ms: 0,
            held: DirectionSet::empty(),
            scanner: false,
            debug_overlay: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.respawn_at_ms == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SentinelKind {
    Regular,
    /// Mid-tier boss
    Null,
    /// Top-tier boss
    FireWall,
}

impl SentinelKind {
    pub fn is_boss(self) -> bool {
        !matches!(self, Self::Regular)
    }

    pub fn detection_radius(self) -> f64 {
        match self {
            Self::Regular => sentinel_consts::REGULAR_DETECTION,
            Self::Null => sentinel_consts::NULL_DETECTION,
            Self::FireWall => sentinel_consts::FIRE_WALL_DETECTION,
        }
    }

    pub fn jitter_speed(self) -> f64 {
        match self {
            Self::FireWall => sentinel_consts::FIRE_WALL_JITTER_SPEED,
            _ => sentinel_consts::JITTER_SPEED,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sentinel {
    pub header: Header,
    pub kind: SentinelKind,
    pub hp: f64,
    pub max_hp: f64,
    pub shield: f64,
    pub max_shield: f64,
    pub velocity: Vec2,
    pub weapon: Weapon,
    pub last_shot_ms: u64,
}

impl Sentinel {
    pub fn new(id: EntityId, kind: SentinelKind, position: Vec2) -> Self {
        let (symbol, color, name, size, hp, shield, weapon, velocity) = match kind {
            SentinelKind::Regular => ("§", "#f85149", "SENTINEL", 1, 3.0, 0.0, Weapon::BASIC, Vec2::ZERO),
            SentinelKind::Null => ("Ω", "#ff4500", "NULL", 3, 50.0, 10.0, Weapon::LASER, Vec2::ZERO),
            SentinelKind::FireWall => (
                "█",
                "#ff3300",
                "FIRE_WALL",
                8,
                1000.0,
                300.0,
                Weapon::MISSILE,
                Vec2::new(0.005, 0.005),
            ),
        };
        Self {
            header: Header::new(id, position, size, symbol, color, name),
            kind,
            hp,
            max_hp: hp,
            shield,
            max_shield: shield,
            velocity,
            weapon,
            last_shot_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub header: Header,
    pub velocity: Vec2,
    pub speed: f64,
    pub distance: f64,
    pub max_range: f64,
    pub damage: f64,
    pub explosive: bool,
    /// Weak reference; the shooter may be gone
    pub owner: EntityId,
}

impl Projectile {
    pub fn new(id: EntityId, owner: EntityId, position: Vec2, velocity: Vec2, weapon: &Weapon, color: &str) -> Self {
        Self {
            header: Header::new(id, position, 1, weapon.glyph, color, "PROJECTILE"),
            velocity,
            speed: velocity.length(),
            distance: 0.0,
            max_range: weapon.range,
            damage: weapon.damage,
            explosive: weapon.is_explosive(),
            owner,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Meteorite {
    pub header: Header,
    pub health: f64,
    pub resource: Option<OreTier>,
}

impl Meteorite {
    /// Cluster meteorite of size 1, resource-bearing ones are tougher
    pub fn new(id: EntityId, position: Vec2, resource: Option<OreTier>) -> Self {
        let (color, name, health) = match resource {
            Some(tier) => (tier.color(), format!("{}_METEORITE", tier.label()), 3.0),
            None => ("#484f58", "METEORITE".to_string(), 1.0),
        };
        Self {
            header: Header::new(id, position, 1, "#", color, &name),
            health,
            resource,
        }
    }

    /// Standalone large meteorite without resources
    pub fn large(id: EntityId, position: Vec2, size: u32, health: f64) -> Self {
        Self {
            header: Header::new(id, position, size, "#", "#484f58", "LARGE_METEORITE"),
            health,
            resource: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ore {
    pub header: Header,
    pub tier: OreTier,
}

impl Ore {
    pub fn new(id: EntityId, position: Vec2, tier: OreTier) -> Self {
        Self {
            header: Header::new(id, position, 1, "◈", tier.color(), &format!("{}_ORE", tier.label())),
            tier,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataNode {
    pub header: Header,
}

impl DataNode {
    pub fn new(id: EntityId, position: Vec2) -> Self {
        Self {
            header: Header::new(id, position, 1, "◈", "#79c0ff", "DATA_NODE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpaceStation {
    pub header: Header,
}

impl SpaceStation {
    pub fn new(id: EntityId, position: Vec2) -> Self {
        Self {
            header: Header::new(id, position, 4, "⧈", "#00FFFF", "OUTPOST"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wormhole {
    pub header: Header,
    /// Non-owning link to the paired wormhole
    pub linked_id: Option<EntityId>,
    pub spawn_time_ms: u64,
}

impl Wormhole {
    pub fn new(id: EntityId, position: Vec2, linked_id: Option<EntityId>, spawn_time_ms: u64) -> Self {
        Self {
            header: Header::new(id, position, 5, "(@)", "#00ff00", "WORMHOLE"),
            linked_id,
            spawn_time_ms,
        }
    }
}

// ============================================================================
// Entity enum
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Player(Player),
    Sentinel(Sentinel),
    Projectile(Projectile),
    Meteorite(Meteorite),
    Ore(Ore),
    DataNode(DataNode),
    SpaceStation(SpaceStation),
    Wormhole(Wormhole),
}

impl Entity {
    pub fn header(&self) -> &Header {
        match self {
            Entity::Player(e) => &e.header,
            Entity::Sentinel(e) => &e.header,
            Entity::Projectile(e) => &e.header,
            Entity::Meteorite(e) => &e.header,
            Entity::Ore(e) => &e.header,
            Entity::DataNode(e) => &e.header,
            Entity::SpaceStation(e) => &e.header,
            Entity::Wormhole(e) => &e.header,
        }
    }

    pub fn header_mut(&mut self) -> &mut Header {
        match self {
            Entity::Player(e) => &mut e.header,
            Entity::Sentinel(e) => &mut e.header,
            Entity::Projectile(e) => &mut e.header,
            Entity::Meteorite(e) => &mut e.header,
            Entity::Ore(e) => &mut e.header,
            Entity::DataNode(e) => &mut e.header,
            Entity::SpaceStation(e) => &mut e.header,
            Entity::Wormhole(e) => &mut e.header,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Player(_) => EntityKind::Player,
            Entity::Sentinel(_) => EntityKind::Sentinel,
            Entity::Projectile(_) => EntityKind::Projectile,
            Entity::Meteorite(_) => EntityKind::Meteorite,
            Entity::Ore(_) => EntityKind::Ore,
            Entity::DataNode(_) => EntityKind::DataNode,
            Entity::SpaceStation(_) => EntityKind::SpaceStation,
            Entity::Wormhole(_) => EntityKind::Wormhole,
        }
    }

    #[inline]
    pub fn id(&self) -> EntityId {
        self.header().id
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.header().position
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.header().size
    }
}
