/// World geometry and tick cadence
pub mod world {
    /// Map width in cells
    pub const WIDTH: f64 = 500.0;
    /// Map height in cells
    pub const HEIGHT: f64 = 500.0;
    /// Server tick period in milliseconds
    pub const TICK_MS: u64 = 17;
    /// Keeps clamped coordinates strictly below the upper bound
    pub const EDGE_EPSILON: f64 = 1e-6;
}

/// Player movement constants - FRICTION = 1.0 is intentional, only zero-snap decays velocity
pub mod movement {
    /// Velocity added per held direction per tick
    pub const ACCEL: f64 = 0.012;
    /// Velocity multiplier applied after integration
    pub const FRICTION: f64 = 1.0;
    /// Maximum velocity magnitude (uniform rescale)
    pub const MAX_SPEED: f64 = 0.08;
    /// Factor applied to both ACCEL and MAX_SPEED while the scanner is on
    pub const SCANNER_FACTOR: f64 = 0.5;
    /// Velocity components below this snap to exactly zero
    pub const ZERO_SNAP: f64 = 0.01;
}

/// Environmental (impact) damage bands
pub mod impact {
    /// Minimum pre-collision speed that hurts
    pub const MIN_SPEED: f64 = 0.05;
    /// Above this speed impacts deal MEDIUM_DAMAGE
    pub const MEDIUM_SPEED: f64 = 0.08;
    /// Above this speed impacts deal HEAVY_DAMAGE
    pub const HEAVY_SPEED: f64 = 0.12;
    pub const LIGHT_DAMAGE: f64 = 1.0;
    pub const MEDIUM_DAMAGE: f64 = 2.0;
    pub const HEAVY_DAMAGE: f64 = 3.0;
}

/// Player stats and lifecycle
pub mod player {
    pub const MAX_HP: f64 = 5.0;
    /// Hard cap on max shield earned through levelling
    pub const MAX_SHIELD_CAP: u32 = 3;
    /// Respawn delay after death
    pub const RESPAWN_DELAY_MS: u64 = 3000;
    /// Score lost on death (floored at zero)
    pub const DEATH_PENALTY: u64 = 200;
    /// Experience needed per level: max(1, level) * EXP_PER_LEVEL
    pub const EXP_PER_LEVEL: u64 = 500;
    /// Per-tick chance (1 in N) that every player regenerates one shield point
    pub const SHIELD_REGEN_ONE_IN: u32 = 300;
    /// Scatter applied to dropped ore, full width
    pub const DROP_SCATTER: f64 = 1.5;
    /// Maximum chat message length after trimming
    pub const MAX_CHAT_LEN: usize = 100;
    /// Maximum display name length
    pub const MAX_NAME_LEN: usize = 16;

    pub const SYMBOLS: [&str; 6] = ["[P]", "{X}", "(O)", "<V>", "/A\\", "0x1"];
    pub const COLORS: [&str; 6] = ["#58a6ff", "#3fb950", "#d29922", "#f85149", "#bc8cff", "#ffffff"];
}

/// Kill and pickup rewards
pub mod rewards {
    pub const PLAYER_KILL_SCORE: u64 = 500;
    pub const PLAYER_KILL_EXP: u64 = 100;
    pub const SENTINEL_KILL_SCORE: u64 = 300;
    pub const SENTINEL_KILL_EXP: u64 = 150;
    pub const BOSS_KILL_SCORE: u64 = 5000;
    pub const BOSS_KILL_EXP: u64 = 1000;
    pub const DATA_NODE_SCORE: u64 = 100;
    pub const DATA_NODE_EXP: u64 = 25;
    /// Gold ore dropped by a FireWall
    pub const FIRE_WALL_GOLD: u32 = 20;
    /// Gold and silver ore dropped by a Null
    pub const NULL_GOLD: u32 = 5;
    pub const NULL_SILVER: u32 = 10;
}

/// Sentinel population and AI
pub mod sentinel {
    /// Regular sentinels targeted per connected player
    pub const PER_PLAYER: usize = 10;
    /// Population control runs every N ticks
    pub const POPULATION_EVERY_TICKS: u64 = 30;
    /// Regular sentinels sleep unless a player is this close
    pub const WAKE_RADIUS: f64 = 100.0;
    /// Per-tick chance (1 in N) of picking a new wander velocity
    pub const JITTER_ONE_IN: u32 = 60;
    /// Wander velocity range per axis, full width
    pub const JITTER_SPEED: f64 = 0.05;
    pub const FIRE_WALL_JITTER_SPEED: f64 = 0.01;

    pub const REGULAR_DETECTION: f64 = 8.0;
    pub const NULL_DETECTION: f64 = 25.0;
    pub const FIRE_WALL_DETECTION: f64 = 40.0;

    /// Boss spawn intervals (only counted while players are connected)
    pub const NULL_INTERVAL_MS: u64 = 300_000;
    pub const FIRE_WALL_INTERVAL_MS: u64 = 600_000;

    /// Contact damage when a player touches a sentinel
    pub const CONTACT_DAMAGE_TO_PLAYER: f64 = 0.2;
    pub const CONTACT_DAMAGE_TO_SENTINEL: f64 = 0.1;
}

/// Projectile integration and blast constants
pub mod projectile {
    /// Speed above which hit detection uses two sub-steps
    pub const SUBSTEP_SPEED: f64 = 0.4;
    /// Radius searched for targets at each sub-step
    pub const HIT_QUERY_RADIUS: f64 = 2.0;
    /// Added to target half-size for the hit box
    pub const HIT_PADDING: f64 = 0.4;
    /// Radius searched for a meteorite when a projectile hits terrain
    pub const TERRAIN_QUERY_RADIUS: f64 = 10.0;
    /// Added to meteorite half-size when matching terrain hits
    pub const TERRAIN_PADDING: f64 = 0.5;
    /// Area damage radius for explosive rounds
    pub const BLAST_RADIUS: f64 = 2.5;
    /// Size of the explosion effect
    pub const BLAST_EFFECT_SIZE: u32 = 2;
    /// Angular step between pellets of a spread shot
    pub const SPREAD_STEP: f64 = 0.15;
    /// Pellets fired either side of centre by a spread shot
    pub const SPREAD_HALF_COUNT: i32 = 2;
}

/// Pickup and contact radii
pub mod pickup {
    /// Radius queried around a player for pickups and contacts
    pub const QUERY_RADIUS: f64 = 2.0;
    /// Per-axis reach for collecting data nodes and ore
    pub const COLLECT_REACH: f64 = 0.8;
}

/// Spatial index tuning
pub mod spatial {
    /// Leaf capacity of the per-tick dynamic index
    pub const DYNAMIC_CAPACITY: usize = 10;
    /// Leaf capacity of the lazily rebuilt static index
    pub const STATIC_CAPACITY: usize = 20;
    /// Margin added to "nearby" query radii so large entities are still found
    pub const QUERY_MARGIN: f64 = 4.0;
}

/// Per-recipient snapshot ranges
pub mod view {
    /// Radius of the ordinary view
    pub const RADIUS: f64 = 40.0;
    /// Half-extent of the data-node radar box
    pub const DATA_NODE_RADIUS: f64 = 100.0;
}

/// World generation defaults
pub mod generation {
    pub const DISPERSED_CLUSTERS: usize = 400;
    pub const DISPERSED_MIN_SIZE: usize = 8;
    /// Exclusive upper bound on extra meteorites per dispersed cluster
    pub const DISPERSED_EXTRA_SIZE: usize = 12;
    pub const DISPERSED_SIGMA: f64 = 1.5;
    pub const DISPERSED_RESOURCE_CHANCE: f64 = 0.15;

    pub const RING_CLUSTERS: usize = 150;
    pub const RING_MIN_RADIUS: i32 = 2;
    /// Exclusive upper bound on extra ring radius
    pub const RING_EXTRA_RADIUS: i32 = 2;
    pub const RING_INTERIOR_RESOURCE_CHANCE: f64 = 0.4;
    /// Cells closer than radius - RING_INTERIOR_INSET count as interior
    pub const RING_INTERIOR_INSET: f64 = 0.8;

    pub const DATA_NODES: usize = 1000;
    pub const LARGE_METEORITES: usize = 50;
    pub const HUGE_METEORITES: usize = 20;
    /// Standalone meteorite health = size * this
    pub const STANDALONE_HEALTH_PER_SIZE: f64 = 5.0;
    pub const SPACE_STATIONS: usize = 4;
    pub const WORMHOLE_PAIRS: usize = 2;

    /// Bounded placement retries before accepting the last candidate
    pub const PLACEMENT_ATTEMPTS: usize = 100;
    /// Extra clearance around the footprint for occupancy checks
    pub const OCCUPANCY_CLEARANCE: f64 = 8.0;

    /// Tier roll thresholds out of 100: below COPPER is copper, below SILVER silver, else gold
    pub const TIER_COPPER_BELOW: u32 = 60;
    pub const TIER_SILVER_BELOW: u32 = 90;
}

/// Chat colors used in log lines
pub mod palette {
    pub const INFO: &str = "#58a6ff";
    pub const ERROR: &str = "#f85149";
    pub const TEXT: &str = "#c9d1d9";
    pub const SUCCESS: &str = "#3fb950";
    pub const WARNING: &str = "#d29922";
    pub const PRIVATE: &str = "#bc8cff";
    pub const BOSS: &str = "#ff4500";
}
