//! Netrunner Server Library
//!
//! Tick-driven simulation core of a multiplayer space-combat server:
//! spatial indexing, the concurrent entity registry, world generation, the
//! per-tick pipeline and per-player snapshots.
//!
//! # Features
//!
//! - `metrics_server` - Prometheus/JSON endpoint in the headless driver (enabled by default)
//! - `minimal` - Build without optional features for testing/debugging

pub mod config;
pub mod game;
pub mod metrics;
pub mod net;
pub mod util;
