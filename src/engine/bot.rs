//! Bot identity, class tuning, and per-tick combat/kinematic state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::vec2::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BotClass {
    Tank,
    Scout,
    Sniper,
}

/// Special ability a bot can activate on a tick, paid for out of `energy`.
///
/// Keyed by enum rather than by the original's free-form string so an invalid
/// power name is a compile error for in-process callers and a structured
/// deserialization error for wire callers, instead of a silently ignored typo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PowerKind {
    #[default]
    None,
    Shield,
    Overclock,
    Stealth,
}

/// Cooldown bucket tracked per bot. Using an enum key (rather than the
/// original's string key) avoids typo-driven cooldown lookups that silently
/// miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cooldown {
    Shield,
    Overclock,
    Stealth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotState {
    pub id: Uuid,
    pub name: String,
    pub class: BotClass,

    pub position: Vec2,
    pub heading_degrees: f32,
    pub gun_heading_degrees: f32,
    pub radar_heading_degrees: f32,
    pub velocity: f32,

    pub hull: f32,
    pub max_hull: f32,
    pub energy: f32,
    pub shield_hp: f32,
    pub heat: f32,
    pub is_stealthed: bool,
    pub is_alive: bool,

    /// Ticks remaining until the effect granted by a power wears off
    /// (e.g. overclock duration, stealth duration). Absent entries mean
    /// "not currently active".
    pub active_effect_ticks: HashMap<Cooldown, u32>,
    /// Ticks remaining before a power can be reactivated.
    pub cooldowns: HashMap<Cooldown, u32>,

    pub kills: u32,
    pub deaths: u32,
}

impl BotState {
    pub const DEFAULT_MAX_HULL: f32 = 100.0;

    pub fn new(id: Uuid, name: impl Into<String>, class: BotClass, position: Vec2) -> Self {
        let tuning = class.tuning();
        Self {
            id,
            name: name.into(),
            class,
            position,
            heading_degrees: 0.0,
            gun_heading_degrees: 0.0,
            radar_heading_degrees: 0.0,
            velocity: 0.0,
            hull: Self::DEFAULT_MAX_HULL,
            max_hull: Self::DEFAULT_MAX_HULL,
            energy: tuning.max_energy,
            shield_hp: 0.0,
            heat: 0.0,
            is_stealthed: false,
            is_alive: true,
            active_effect_ticks: HashMap::new(),
            cooldowns: HashMap::new(),
            kills: 0,
            deaths: 0,
        }
    }

    pub fn is_power_ready(&self, cooldown: Cooldown) -> bool {
        self.cooldowns.get(&cooldown).copied().unwrap_or(0) == 0
    }

    pub fn is_effect_active(&self, cooldown: Cooldown) -> bool {
        self.active_effect_ticks
            .get(&cooldown)
            .copied()
            .unwrap_or(0)
            > 0
    }

    /// Decrement all cooldown and active-effect counters by one tick, floored at zero.
    pub fn tick_timers(&mut self) {
        for v in self.cooldowns.values_mut() {
            *v = v.saturating_sub(1);
        }
        for v in self.active_effect_ticks.values_mut() {
            *v = v.saturating_sub(1);
        }
        if !self.is_effect_active(Cooldown::Stealth) {
            self.is_stealthed = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_bot_starts_full_health_and_no_cooldowns() {
        let bot = BotState::new(Uuid::new_v4(), "alpha", BotClass::Scout, Vec2::ZERO);
        assert_eq!(bot.hull, BotState::DEFAULT_MAX_HULL);
        assert_eq!(bot.energy, BotClass::Scout.tuning().max_energy);
        assert!(bot.is_alive);
        assert!(bot.is_power_ready(Cooldown::Shield));
        assert!(!bot.is_effect_active(Cooldown::Stealth));
    }

    #[test]
    fn tick_timers_floor_at_zero_and_clear_stealth() {
        let mut bot = BotState::new(Uuid::new_v4(), "alpha", BotClass::Tank, Vec2::ZERO);
        bot.cooldowns.insert(Cooldown::Shield, 1);
        bot.active_effect_ticks.insert(Cooldown::Stealth, 1);
        bot.is_stealthed = true;

        bot.tick_timers();
        assert_eq!(bot.cooldowns[&Cooldown::Shield], 0);
        assert!(!bot.is_stealthed);

        bot.tick_timers();
        assert_eq!(bot.cooldowns[&Cooldown::Shield], 0);
    }
}
