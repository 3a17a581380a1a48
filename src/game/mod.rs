pub mod combat;
pub mod commands;
pub mod constants;
pub mod engine;
pub mod entity;
pub mod events;
pub mod input;
pub mod performance;
pub mod placement;
pub mod registry;
pub mod spatial;
pub mod systems;
pub mod weapon;
pub mod worldgen;

#[cfg(test)]
pub mod testing;
