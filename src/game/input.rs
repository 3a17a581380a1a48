//! Player input handling
//!
//! Runs on connection threads. Every mutation goes through a single
//! `players.update` so it cannot interleave with the tick's writes to the
//! same player.

use tracing::debug;

use crate::game::constants::{palette, player as player_consts};
use crate::game::engine::{sanitize_name, World};
use crate::game::entity::{Direction, EntityId};
use crate::game::systems::projectile::fire_weapon;
use crate::util::vec2::Vec2;

/// One decoded client input
#[derive(Debug, Clone, PartialEq)]
pub enum InputCommand {
    MoveStart(Direction),
    MoveStop(Direction),
    /// Aim point, or `None` to fire along the last movement direction
    Shoot(Option<Vec2>),
    ChangeName(String),
    ChangeColor,
    /// `None` toggles
    Scanner(Option<bool>),
    Chat(String),
}

impl InputCommand {
    /// Decode a `(type, payload)` pair; unknown types and bad directions yield `None`
    pub fn parse(kind: &str, payload: &str) -> Option<Self> {
        match kind.trim().to_ascii_uppercase().as_str() {
            "MOVE_START" => Direction::from_token(payload).map(Self::MoveStart),
            "MOVE_STOP" => Direction::from_token(payload).map(Self::MoveStop),
            "SHOOT" => Some(Self::Shoot(parse_aim(payload))),
            "CHANGE_NAME" => Some(Self::ChangeName(payload.to_string())),
            "CHANGE_COLOR" => Some(Self::ChangeColor),
            "SCANNER_STATE" => match payload.trim().to_ascii_lowercase().as_str() {
                "" => Some(Self::Scanner(None)),
                "true" => Some(Self::Scanner(Some(true))),
                "false" => Some(Self::Scanner(Some(false))),
                _ => None,
            },
            "CHAT" => Some(Self::Chat(payload.to_string())),
            _ => None,
        }
    }
}

/// `"x,y"` as an aim point; anything else is a directional shot
fn parse_aim(payload: &str) -> Option<Vec2> {
    let (x, y) = payload.split_once(',')?;
    let x = x.trim().parse::<f64>().ok()?;
    let y = y.trim().parse::<f64>().ok()?;
    (x.is_finite() && y.is_finite()).then(|| Vec2::new(x, y))
}

impl World {
    /// Apply one input from `id`; a missing or dead player is a no-op
    pub fn process_input(&self, id: &EntityId, command: InputCommand) {
        let alive = self.registry.players.read(id, |p| p.is_alive()).unwrap_or(false);
        if !alive {
            return;
        }

        match command {
            InputCommand::MoveStart(direction) => {
                self.registry.players.update(id, |p| {
                    p.held |= direction.flag();
                    p.last_direction = direction;
                });
            }
            InputCommand::MoveStop(direction) => {
                self.registry.players.update(id, |p| p.held.remove(direction.flag()));
            }
            InputCommand::Shoot(aim) => self.shoot(id, aim),
            InputCommand::ChangeName(name) => self.rename(id, &name),
            InputCommand::ChangeColor => self.cycle_color(id),
            InputCommand::Scanner(state) => {
                self.registry.players.update(id, |p| p.scanner = state.unwrap_or(!p.scanner));
            }
            InputCommand::Chat(message) => self.chat(id, &message),
        }
    }

    fn shoot(&self, id: &EntityId, aim: Option<Vec2>) {
        let now = self.now_ms();
        let shot = self
            .registry
            .players
            .update(id, |p| {
                if p.scanner || !p.is_alive() {
                    return None;
                }
                if now.saturating_sub(p.last_shot_ms) < p.weapon.cooldown_ms {
                    return None;
                }
                p.last_shot_ms = now;
                let origin = p.header.position;
                let target = aim.unwrap_or(origin + p.last_direction.unit());
                Some((origin, p.header.color.clone(), p.weapon, target))
            })
            .flatten();

        if let Some((origin, color, weapon, target)) = shot {
            self.with_rng(|rng| fire_weapon(self, rng, *id, origin, &color, &weapon, target));
        }
    }

    fn rename(&self, id: &EntityId, requested: &str) {
        if requested.trim().is_empty() {
            return;
        }
        let base = sanitize_name(requested);
        let name = self.unique_name(&base, Some(id));
        let Some(old) = self
            .registry
            .players
            .update(id, |p| std::mem::replace(&mut p.header.name, name.clone()))
        else {
            return;
        };
        debug!("Player {} renamed '{}' -> '{}'", id, old, name);
        self.events
            .global(format!("[{}]Agent {old} re-identified as {name}", palette::INFO));
    }

    fn cycle_color(&self, id: &EntityId) {
        let colors = player_consts::COLORS;
        let changed = self.registry.players.update(id, |p| {
            let next = colors
                .iter()
                .position(|c| c.eq_ignore_ascii_case(&p.header.color))
                .map_or(0, |i| (i + 1) % colors.len());
            p.header.color = colors[next].to_string();
            (p.header.name.clone(), p.header.color.clone())
        });
        if let Some((name, color)) = changed {
            self.events
                .global(format!("[{color}]Agent {name} updated signature color."));
        }
    }

    fn chat(&self, id: &EntityId, raw: &str) {
        let message = raw.trim();
        if message.is_empty() {
            return;
        }
        if message.starts_with('!') {
            self.run_command(id, message);
            return;
        }

        let Some((name, color)) = self
            .registry
            .players
            .read(id, |p| (p.header.name.clone(), p.header.color.clone()))
        else {
            return;
        };
        let text: String = message.chars().take(player_consts::MAX_CHAT_LEN).collect();
        self.events
            .global(format!("[{color}]{name}: [{}]{text}", palette::TEXT));
    }
}
