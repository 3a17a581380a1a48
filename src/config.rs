use std::str::FromStr;

use thiserror::Error;

use crate::game::constants::{generation, sentinel, world};

/// Configuration rejected by [`SimConfig::validate`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tick_ms must be at least 1")]
    ZeroTick,
    #[error("{0} interval must be at least 1 ms")]
    ZeroInterval(&'static str),
    #[error("metrics port cannot be 0")]
    ZeroPort,
}

/// Object counts used by world generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub dispersed_clusters: usize,
    pub ring_clusters: usize,
    pub data_nodes: usize,
    pub large_meteorites: usize,
    pub huge_meteorites: usize,
    pub space_stations: usize,
    pub wormhole_pairs: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            dispersed_clusters: generation::DISPERSED_CLUSTERS,
            ring_clusters: generation::RING_CLUSTERS,
            data_nodes: generation::DATA_NODES,
            large_meteorites: generation::LARGE_METEORITES,
            huge_meteorites: generation::HUGE_METEORITES,
            space_stations: generation::SPACE_STATIONS,
            wormhole_pairs: generation::WORMHOLE_PAIRS,
        }
    }
}

impl GenerationConfig {
    /// Generate nothing; tests place what they need by hand
    pub fn empty() -> Self {
        Self {
            dispersed_clusters: 0,
            ring_clusters: 0,
            data_nodes: 0,
            large_meteorites: 0,
            huge_meteorites: 0,
            space_stations: 0,
            wormhole_pairs: 0,
        }
    }
}

/// Simulation configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Seed for world generation and the tick RNG
    pub seed: u64,
    /// Tick period in milliseconds
    pub tick_ms: u64,
    /// Regular sentinels per connected player
    pub sentinels_per_player: usize,
    pub null_interval_ms: u64,
    pub fire_wall_interval_ms: u64,
    /// Port of the metrics endpoint
    pub metrics_port: u16,
    pub generation: GenerationConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            tick_ms: world::TICK_MS,
            sentinels_per_player: sentinel::PER_PLAYER,
            null_interval_ms: sentinel::NULL_INTERVAL_MS,
            fire_wall_interval_ms: sentinel::FIRE_WALL_INTERVAL_MS,
            metrics_port: 9090,
            generation: GenerationConfig::default(),
        }
    }
}

/// Parse `key` from the environment into `target`, keeping the default on failure
fn env_override<T: FromStr>(key: &str, target: &mut T, accept: impl Fn(&T) -> bool) {
    let Ok(raw) = std::env::var(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(parsed) if accept(&parsed) => *target = parsed,
        Ok(_) => tracing::warn!("{} '{}' out of range, using default", key, raw),
        Err(_) => tracing::warn!("Invalid {} '{}', using default", key, raw),
    }
}

impl SimConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        env_override("SIM_SEED", &mut config.seed, |_| true);

        // TICK_RATE is in Hz; TICK_MS wins when both are set
        let mut rate: u64 = 0;
        env_override("TICK_RATE", &mut rate, |r| (1..=1000).contains(r));
        if rate > 0 {
            config.tick_ms = (1000 / rate).max(1);
        }
        env_override("TICK_MS", &mut config.tick_ms, |ms| *ms > 0);

        env_override("SENTINELS_PER_PLAYER", &mut config.sentinels_per_player, |n| *n <= 1000);
        env_override("NULL_SPAWN_INTERVAL_MS", &mut config.null_interval_ms, |ms| *ms > 0);
        env_override("FIRE_WALL_SPAWN_INTERVAL_MS", &mut config.fire_wall_interval_ms, |ms| *ms > 0);
        env_override("METRICS_PORT", &mut config.metrics_port, |p| *p > 0);

        let generation = &mut config.generation;
        env_override("GEN_DISPERSED_CLUSTERS", &mut generation.dispersed_clusters, |_| true);
        env_override("GEN_RING_CLUSTERS", &mut generation.ring_clusters, |_| true);
        env_override("GEN_DATA_NODES", &mut generation.data_nodes, |_| true);
        env_override("GEN_LARGE_METEORITES", &mut generation.large_meteorites, |_| true);
        env_override("GEN_HUGE_METEORITES", &mut generation.huge_meteorites, |_| true);
        env_override("GEN_SPACE_STATIONS", &mut generation.space_stations, |_| true);
        env_override("GEN_WORMHOLE_PAIRS", &mut generation.wormhole_pairs, |_| true);

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_ms == 0 {
            return Err(ConfigError::ZeroTick);
        }
        if self.null_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("NULL"));
        }
        if self.fire_wall_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("FIRE_WALL"));
        }
        if self.metrics_port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        Ok(())
    }
}
