//! Weapon presets and the level unlock table

use serde::{Deserialize, Serialize};

/// How a weapon turns one trigger pull into projectiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FirePattern {
    Single,
    /// Five pellets fanned around the aim direction
    Spread,
    /// Explosive round
    Missile,
    Laser,
}

/// Immutable weapon configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Weapon {
    pub name: &'static str,
    pub range: f64,
    pub damage: f64,
    pub cooldown_ms: u64,
    /// Full-width random angular jitter in radians
    pub spread: f64,
    pub pattern: FirePattern,
    pub projectile_speed: f64,
    pub glyph: &'static str,
}

impl Weapon {
    pub const BASIC: Weapon = Weapon {
        name: "BASIC_BLASTER",
        range: 12.0,
        damage: 1.0,
        cooldown_ms: 400,
        spread: 0.12,
        pattern: FirePattern::Single,
        projectile_speed: 0.3,
        glyph: "•",
    };

    pub const SHOTGUN: Weapon = Weapon {
        name: "STREET_SWEEPER",
        range: 8.0,
        damage: 0.4,
        cooldown_ms: 800,
        spread: 0.55,
        pattern: FirePattern::Spread,
        projectile_speed: 0.25,
        glyph: "·",
    };

    pub const LASER: Weapon = Weapon {
        name: "PULSE_LASER",
        range: 15.0,
        damage: 1.0,
        cooldown_ms: 150,
        spread: 0.06,
        pattern: FirePattern::Laser,
        projectile_speed: 0.5,
        glyph: "-",
    };

    pub const MISSILE: Weapon = Weapon {
        name: "HELLFIRE_MISSILE",
        range: 20.0,
        damage: 3.0,
        cooldown_ms: 1200,
        spread: 0.1,
        pattern: FirePattern::Missile,
        projectile_speed: 0.18,
        glyph: "▲",
    };

    /// All presets in catalog order
    pub const CATALOG: [(&'static str, Weapon); 4] = [
        ("basic", Weapon::BASIC),
        ("shotgun", Weapon::SHOTGUN),
        ("laser", Weapon::LASER),
        ("missile", Weapon::MISSILE),
    ];

    /// Look up a preset by its short token (case-insensitive)
    pub fn from_token(token: &str) -> Option<Weapon> {
        Self::CATALOG
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(token))
            .map(|(_, weapon)| *weapon)
    }

    pub fn is_explosive(&self) -> bool {
        self.pattern == FirePattern::Missile
    }
}

impl Default for Weapon {
    fn default() -> Self {
        Weapon::BASIC
    }
}

/// Weapon granted on reaching a level, in level order
pub const UNLOCKS: [(u32, Weapon); 3] = [
    (2, Weapon::SHOTGUN),
    (4, Weapon::LASER),
    (6, Weapon::MISSILE),
];

/// The weapon unlocked at exactly `level`, if any
pub fn unlock_for_level(level: u32) -> Option<Weapon> {
    UNLOCKS
        .iter()
        .find(|(at, _)| *at == level)
        .map(|(_, weapon)| *weapon)
}
