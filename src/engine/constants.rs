//! Physics constants shared by the simulation engine.
//!
//! Values are pulled directly from the per-class tuning table; they are not
//! meant to be configurable at runtime (unlike arena size or tick rate).

use crate::engine::bot::BotClass;

pub struct ClassTuning {
    pub max_velocity: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    pub max_shield: f32,
    pub max_energy: f32,
    pub radar_fov_degrees: f32,
    pub energy_regen_per_tick: f32,
}

impl BotClass {
    pub fn tuning(self) -> ClassTuning {
        match self {
            BotClass::Tank => ClassTuning {
                max_velocity: 6.0,
                acceleration: 0.5,
                deceleration: 1.0,
                max_shield: 50.0,
                max_energy: 150.0,
                radar_fov_degrees: 60.0,
                energy_regen_per_tick: 0.2,
            },
            BotClass::Scout => ClassTuning {
                max_velocity: 12.0,
                acceleration: 2.0,
                deceleration: 3.0,
                max_shield: 20.0,
                max_energy: 80.0,
                radar_fov_degrees: 120.0,
                energy_regen_per_tick: 0.5,
            },
            BotClass::Sniper => ClassTuning {
                max_velocity: 8.0,
                acceleration: 1.0,
                deceleration: 2.0,
                max_shield: 30.0,
                max_energy: 100.0,
                radar_fov_degrees: 30.0,
                energy_regen_per_tick: 0.3,
            },
        }
    }
}

/// Maximum sensor range, independent of class.
pub const RADAR_RANGE: f32 = 800.0;
/// Collision / hit-test radius for a bot, independent of class.
pub const ROBOT_RADIUS: f32 = 20.0;
/// How close another bot must be to spot a stealthed opponent, versus the
/// full `RADAR_RANGE` for a non-stealthed one.
pub const STEALTH_VISIBILITY_RANGE: f32 = RADAR_RANGE * 0.4;

pub const SHIELD_COST: f32 = 30.0;
pub const SHIELD_COOLDOWN_TICKS: u32 = 200;

pub const OVERCLOCK_COST: f32 = 40.0;
pub const OVERCLOCK_DURATION_TICKS: u32 = 100;
pub const OVERCLOCK_COOLDOWN_TICKS: u32 = 300;

pub const STEALTH_COST: f32 = 50.0;
pub const STEALTH_DURATION_TICKS: u32 = 150;
pub const STEALTH_COOLDOWN_TICKS: u32 = 400;

pub const BULLET_VELOCITY: f32 = 20.0;
pub const HEAT_DECAY_PER_TICK: f32 = 0.1;

/// Gun heat generated for a shot fired at the given power.
pub fn fire_heat(fire_power: f32) -> f32 {
    1.0 + fire_power / 5.0
}

pub const ZONE_SHRINK_PER_TICK: f32 = 0.05;
pub const ZONE_MIN_RADIUS: f32 = 50.0;
pub const ZONE_DAMAGE_PER_TICK: f32 = 0.5;

pub const COLLISION_DAMAGE: f32 = 0.6;

/// Minimum separation enforced between two bot centers after collision response.
pub const MIN_BOT_SEPARATION: f32 = ROBOT_RADIUS * 2.0;

/// A match only transitions to `Finished` once every bot is dead AND the
/// tick count has passed this floor — an all-dead arena in the first few
/// ticks (e.g. every bot starting inside a pre-shrunk zone) does not end
/// the match early.
pub const MATCH_FINISH_TICK_THRESHOLD: u64 = 1000;
