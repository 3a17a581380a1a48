pub mod ai;
pub mod physics;
pub mod pickup;
pub mod projectile;
