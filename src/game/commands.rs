//! `!` chat commands
//!
//! Parsing resolves target names through a lookup closure so error precedence
//! stays fixed: a bad target is reported before missing arguments. Nothing is
//! mutated unless parsing succeeds.

use thiserror::Error;

use crate::game::constants::palette;
use crate::game::engine::World;
use crate::game::entity::{EntityId, OreTier};
use crate::game::weapon::Weapon;

/// Rejected command; `Display` is the text shown to the sender
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command '{0}' not recognized. Use !help.")]
    Unknown(String),
    #[error("Agent '{0}' not found.")]
    AgentNotFound(String),
    #[error("Correct usage: !whisp <playerName> <message>")]
    WhisperUsage,
    #[error("Correct usage: !give [target] <type> <value>")]
    GiveUsage,
    #[error("Missing arguments.")]
    MissingArguments,
    #[error("Unknown weapon.")]
    UnknownWeapon,
    #[error("Invalid shield amount.")]
    InvalidShield,
    #[error("Use !give [target] ore <type> <amount>")]
    OreUsage,
    #[error("Invalid ore amount.")]
    InvalidOreAmount,
    #[error("Unknown ore type.")]
    UnknownOre,
    #[error("Unknown gift type.")]
    UnknownGift,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gift {
    Weapon(Weapon),
    Shield(u32),
    Ore(OreTier, u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    Help,
    Debug,
    Whisper { to: EntityId, message: String },
    Weapons,
    Ores,
    /// `target: None` means the sender
    Give { target: Option<EntityId>, gift: Gift },
}

const GIFT_KINDS: [&str; 4] = ["weapon", "arma", "ore", "shield"];

impl ChatCommand {
    /// Parse a trimmed `!`-prefixed line; `lookup` resolves agent names
    pub fn parse(line: &str, lookup: impl Fn(&str) -> Option<EntityId>) -> Result<Self, CommandError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(head) = parts.first() else {
            return Err(CommandError::Unknown(String::new()));
        };

        match head.to_lowercase().as_str() {
            "!help" => Ok(Self::Help),
            "!debug" => Ok(Self::Debug),
            "!weapons" | "!weapon" => Ok(Self::Weapons),
            "!ore" => Ok(Self::Ores),
            "!whisp" => {
                if parts.len() < 3 {
                    return Err(CommandError::WhisperUsage);
                }
                let to = lookup(parts[1]).ok_or_else(|| CommandError::AgentNotFound(parts[1].to_string()))?;
                Ok(Self::Whisper {
                    to,
                    message: parts[2..].join(" "),
                })
            }
            "!give" => parse_give(&parts, lookup),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_give(parts: &[&str], lookup: impl Fn(&str) -> Option<EntityId>) -> Result<ChatCommand, CommandError> {
    if parts.len() < 3 {
        return Err(CommandError::GiveUsage);
    }

    let first = parts[1].to_lowercase();
    let (target, offset) = if GIFT_KINDS.contains(&first.as_str()) {
        (None, 0)
    } else {
        let id = lookup(parts[1]).ok_or_else(|| CommandError::AgentNotFound(parts[1].to_string()))?;
        (Some(id), 1)
    };

    if parts.len() < 3 + offset {
        return Err(CommandError::MissingArguments);
    }
    let kind = parts[1 + offset].to_lowercase();
    let value = parts[2 + offset];

    let gift = match kind.as_str() {
        "weapon" | "arma" => Gift::Weapon(Weapon::from_token(value).ok_or(CommandError::UnknownWeapon)?),
        "shield" => Gift::Shield(value.parse().map_err(|_| CommandError::InvalidShield)?),
        "ore" => {
            let amount = parts.get(3 + offset).ok_or(CommandError::OreUsage)?;
            let amount: u32 = amount.parse().map_err(|_| CommandError::InvalidOreAmount)?;
            let tier = OreTier::from_token(value).ok_or(CommandError::UnknownOre)?;
            Gift::Ore(tier, amount)
        }
        _ => return Err(CommandError::UnknownGift),
    };
    Ok(ChatCommand::Give { target, gift })
}

impl World {
    /// Run a `!` command for `sender`; every reply is private
    pub(crate) fn run_command(&self, sender: &EntityId, line: &str) {
        let parsed = ChatCommand::parse(line, |name| self.registry.find_player_by_name(name));
        let result = parsed.and_then(|command| self.execute(sender, command));
        if let Err(err) = result {
            self.events
                .private(sender, format!("[{}]ERROR: {err}", palette::ERROR));
        }
    }

    fn execute(&self, sender: &EntityId, command: ChatCommand) -> Result<(), CommandError> {
        let reply = |line: String| self.events.private(sender, line);
        let warn = palette::WARNING;

        match command {
            ChatCommand::Help => {
                for line in [
                    ">>> COMMAND SYSTEM <<<",
                    "!help -> Show this help message.",
                    "!whisp <name> <msg> -> Send a private message.",
                    "!weapons -> List available weapon types.",
                    "!ore -> List available ore types.",
                    "!give [target] <weapon|ore|shield> <value> -> Grant equipment or resources.",
                    "   Ex: !give shield 10 | !give John ore gold 500",
                    "!debug -> Toggle debug visualization.",
                ] {
                    reply(format!("[{warn}]{line}"));
                }
            }
            ChatCommand::Debug => {
                let enabled = self
                    .registry
                    .players
                    .update(sender, |p| {
                        p.debug_overlay = !p.debug_overlay;
                        p.debug_overlay
                    })
                    .unwrap_or(false);
                let state = if enabled { "ENABLED" } else { "DISABLED" };
                reply(format!("[{}]DEBUG_MODE: {state}", palette::SUCCESS));
            }
            ChatCommand::Weapons => {
                reply(format!("[{warn}]>>> AVAILABLE WEAPONS <<<"));
                for (token, weapon) in Weapon::CATALOG {
                    reply(format!("[{warn}]- {token}: {}", weapon.name));
                }
            }
            ChatCommand::Ores => {
                reply(format!("[{warn}]>>> AVAILABLE ORE TYPES <<<"));
                for tier in OreTier::ALL {
                    reply(format!("[{warn}]- {}", tier.label().to_lowercase()));
                }
            }
            ChatCommand::Whisper { to, message } => {
                let from = self.name_of(sender).unwrap_or_default();
                let to_name = self.name_of(&to).ok_or_else(|| CommandError::AgentNotFound(String::new()))?;
                let private = palette::PRIVATE;
                self.events
                    .private(&to, format!("[{private}][WHISPER] {from}: {message}"));
                reply(format!("[{private}][TO {to_name}]: {message}"));
            }
            ChatCommand::Give { target, gift } => {
                let target = target.unwrap_or(*sender);
                let name = self
                    .registry
                    .players
                    .update(&target, |p| {
                        match gift {
                            Gift::Weapon(weapon) => p.weapon = weapon,
                            Gift::Shield(amount) => p.shield = amount as f64,
                            Gift::Ore(tier, amount) => {
                                let count = p.ores.get_mut(tier);
                                *count = count.saturating_add(amount);
                            }
                        }
                        p.header.name.clone()
                    })
                    .ok_or_else(|| CommandError::AgentNotFound(String::new()))?;

                let ok = palette::SUCCESS;
                reply(match gift {
                    Gift::Weapon(weapon) => format!("[{ok}]SUCCESS: {name}'s weapon updated to {}", weapon.name),
                    Gift::Shield(amount) => format!("[{ok}]SUCCESS: {name}'s shields adjusted to {amount}"),
                    Gift::Ore(..) => format!("[{ok}]SUCCESS: Resources added to {name}"),
                });
            }
        }
        Ok(())
    }

    fn name_of(&self, id: &EntityId) -> Option<String> {
        self.registry.players.read(id, |p| p.header.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::clock::ManualClock;
    use std::sync::Arc;
    use uuid::Uuid;

    fn world() -> World {
        World::new(9, Arc::new(ManualClock::new(1_000)))
    }

    fn join(world: &World, name: &str) -> EntityId {
        let id = Uuid::new_v4();
        world.add_player(id, name);
        world.registry.players.update(&id, |p| p.respawn_at_ms = 0);
        world.events.drain_global();
        id
    }

    fn nobody(_: &str) -> Option<EntityId> {
        None
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(ChatCommand::parse("!HELP", nobody), Ok(ChatCommand::Help));
        assert_eq!(ChatCommand::parse("!weapon", nobody), Ok(ChatCommand::Weapons));
        assert_eq!(ChatCommand::parse("!ore", nobody), Ok(ChatCommand::Ores));
        assert_eq!(
            ChatCommand::parse("!Dance now", nobody),
            Err(CommandError::Unknown("!dance".into()))
        );
    }

    #[test]
    fn test_parse_give_error_order() {
        assert_eq!(ChatCommand::parse("!give shield", nobody), Err(CommandError::GiveUsage));
        assert_eq!(
            ChatCommand::parse("!give john weapon", nobody),
            Err(CommandError::AgentNotFound("john".into()))
        );

        let john = Uuid::new_v4();
        let find = |name: &str| name.eq_ignore_ascii_case("john").then_some(john);
        assert_eq!(ChatCommand::parse("!give john weapon", find), Err(CommandError::MissingArguments));
        assert_eq!(ChatCommand::parse("!give weapon rocket", find), Err(CommandError::UnknownWeapon));
        assert_eq!(ChatCommand::parse("!give shield lots", find), Err(CommandError::InvalidShield));
        assert_eq!(ChatCommand::parse("!give ore gold", find), Err(CommandError::OreUsage));
        assert_eq!(ChatCommand::parse("!give ore mithril x", find), Err(CommandError::InvalidOreAmount));
        assert_eq!(ChatCommand::parse("!give ore mithril 5", find), Err(CommandError::UnknownOre));
        assert_eq!(ChatCommand::parse("!give john hugs 3", find), Err(CommandError::UnknownGift));
        assert_eq!(
            ChatCommand::parse("!give JOHN ore GOLD 500", find),
            Ok(ChatCommand::Give {
                target: Some(john),
                gift: Gift::Ore(OreTier::Gold, 500)
            })
        );
    }

    #[test]
    fn test_help_lists_eight_lines() {
        let world = world();
        let id = join(&world, "neo");
        world.run_command(&id, "!help");
        let lines = world.events.drain_private(&id);
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "[#d29922]>>> COMMAND SYSTEM <<<");
        assert_eq!(lines[7], "[#d29922]!debug -> Toggle debug visualization.");
    }

    #[test]
    fn test_weapon_and_ore_listings() {
        let world = world();
        let id = join(&world, "neo");
        world.run_command(&id, "!weapons");
        let lines = world.events.drain_private(&id);
        assert_eq!(lines[0], "[#d29922]>>> AVAILABLE WEAPONS <<<");
        assert_eq!(lines[1], "[#d29922]- basic: BASIC_BLASTER");
        assert_eq!(lines[4], "[#d29922]- missile: HELLFIRE_MISSILE");

        world.run_command(&id, "!ore");
        let lines = world.events.drain_private(&id);
        assert_eq!(lines, vec![
            "[#d29922]>>> AVAILABLE ORE TYPES <<<",
            "[#d29922]- copper",
            "[#d29922]- silver",
            "[#d29922]- gold",
        ]);
    }

    #[test]
    fn test_debug_toggles() {
        let world = world();
        let id = join(&world, "neo");
        world.run_command(&id, "!debug");
        assert!(world.registry.players.read(&id, |p| p.debug_overlay).unwrap());
        world.run_command(&id, "!debug");
        assert_eq!(
            world.events.drain_private(&id),
            vec!["[#3fb950]DEBUG_MODE: ENABLED", "[#3fb950]DEBUG_MODE: DISABLED"]
        );
    }

    #[test]
    fn test_whisper_reaches_both_sides() {
        let world = world();
        let neo = join(&world, "neo");
        let trin = join(&world, "trinity");
        world.run_command(&neo, "!whisp TRINITY  follow   the rabbit");
        assert_eq!(world.events.drain_private(&trin), vec!["[#bc8cff][WHISPER] neo: follow the rabbit"]);
        assert_eq!(world.events.drain_private(&neo), vec!["[#bc8cff][TO trinity]: follow the rabbit"]);
        assert!(world.events.drain_global().is_empty());

        world.run_command(&neo, "!whisp smith hi");
        assert_eq!(world.events.drain_private(&neo), vec!["[#f85149]ERROR: Agent 'smith' not found."]);
    }

    #[test]
    fn test_give_applies_to_target() {
        let world = world();
        let neo = join(&world, "neo");
        let trin = join(&world, "trinity");

        world.run_command(&neo, "!give shield 10");
        world.run_command(&neo, "!give trinity weapon laser");
        world.run_command(&neo, "!give trinity ore silver 7");

        let p = world.registry.players.get(&neo).unwrap();
        assert_eq!(p.shield, 10.0);
        let t = world.registry.players.get(&trin).unwrap();
        assert_eq!(t.weapon, Weapon::LASER);
        assert_eq!(t.ores.silver, 7);

        assert_eq!(
            world.events.drain_private(&neo),
            vec![
                "[#3fb950]SUCCESS: neo's shields adjusted to 10",
                "[#3fb950]SUCCESS: trinity's weapon updated to PULSE_LASER",
                "[#3fb950]SUCCESS: Resources added to trinity",
            ]
        );
    }

    #[test]
    fn test_failed_give_changes_nothing() {
        let world = world();
        let neo = join(&world, "neo");
        let before = world.registry.players.get(&neo).unwrap();
        world.run_command(&neo, "!give ore gold many");
        assert_eq!(world.registry.players.get(&neo).unwrap(), before);
        assert_eq!(world.events.drain_private(&neo), vec!["[#f85149]ERROR: Invalid ore amount."]);
    }

    #[test]
    fn test_unknown_command_routed_from_chat() {
        let world = world();
        let neo = join(&world, "neo");
        world.process_input(&neo, crate::game::input::InputCommand::Chat("  !FLY high ".into()));
        assert_eq!(
            world.events.drain_private(&neo),
            vec!["[#f85149]ERROR: Command '!fly' not recognized. Use !help."]
        );
        assert!(world.events.drain_global().is_empty());
    }
}
