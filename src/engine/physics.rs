//! The deterministic per-tick physics evaluator.
//!
//! `apply_tick` is a pure function: given a snapshot, the arena bounds and
//! the intents submitted for this tick, it produces the next snapshot. It
//! never reads wall-clock time or external state, which is what makes replay
//! and unit testing exact.
//!
//! Step order is fixed and must not change: zone update, per-bot update,
//! bullet integration and hit detection, bot-bot collision, radar scan.
//! Bots are iterated in sorted-by-id order at every step so floating point
//! accumulation is independent of hashmap iteration order.

use std::collections::HashMap;

use uuid::Uuid;

use crate::engine::arena::Arena;
use crate::engine::bot::{BotState, Cooldown, PowerKind};
use crate::engine::bullet::BulletState;
use crate::engine::constants::{
    self, COLLISION_DAMAGE, HEAT_DECAY_PER_TICK, MATCH_FINISH_TICK_THRESHOLD, MIN_BOT_SEPARATION,
    OVERCLOCK_COOLDOWN_TICKS, OVERCLOCK_DURATION_TICKS, ROBOT_RADIUS, SHIELD_COOLDOWN_TICKS,
    STEALTH_COOLDOWN_TICKS, STEALTH_DURATION_TICKS, ZONE_DAMAGE_PER_TICK,
};
use crate::engine::events::SimulationEvent;
use crate::engine::intent::BotIntent;
use crate::engine::world::{MatchStatus, WorldState};
use crate::engine::zone::ZoneState;
use crate::util::vec2::Vec2;

pub type IntentMap = HashMap<Uuid, BotIntent>;

/// Advance `state` by exactly one tick. `state.tick` is the tick number
/// being produced (the caller is expected to have already incremented it).
pub fn apply_tick(state: &WorldState, arena: &Arena, intents: &IntentMap) -> WorldState {
    let tick = state.tick;
    let mut bots: Vec<BotState> = state.bots.clone();
    bots.sort_by_key(|b| b.id);
    // If exactly one bot is alive going into this tick, it is the candidate
    // winner should the match end this tick (it may die in the same tick it
    // crosses the finish threshold, e.g. to zone damage, and still wins).
    let sole_survivor_before: Option<Uuid> = {
        let mut alive = bots.iter().filter(|b| b.is_alive).map(|b| b.id);
        match (alive.next(), alive.next()) {
            (Some(id), None) => Some(id),
            _ => None,
        }
    };
    let mut bullets: Vec<BulletState> = state.bullets.clone();
    let mut zone = state.zone.clone();
    let mut events = Vec::new();

    // 1. Zone update: the ring shrinks before anyone's position is checked
    // against it this tick.
    if let Some(z) = zone.as_mut() {
        z.shrink();
    }

    // 2. Per-bot update: cooldown decrement, regen, power activation, passive
    // effects, rotation, movement, wall clamp, zone damage, firing, heat
    // decay, all in that fixed order inside `update_bot`.
    let mut spawned_bullets = Vec::new();
    for bot in bots.iter_mut().filter(|b| b.is_alive) {
        let intent = intents.get(&bot.id).copied().unwrap_or_default();
        update_bot(bot, arena, zone.as_ref(), &intent, tick, &mut spawned_bullets, &mut events);
    }
    bullets.extend(spawned_bullets);

    // 3. Bullet integration and hit detection.
    let mut surviving_bullets = Vec::with_capacity(bullets.len());
    for mut bullet in bullets {
        bullet.integrate();
        if bullet.is_out_of_bounds(arena.width, arena.height) {
            continue;
        }
        let hit_id = bots
            .iter()
            .find(|b| {
                b.is_alive
                    && b.id != bullet.owner_id
                    && b.position.distance_to(bullet.position) <= ROBOT_RADIUS
            })
            .map(|b| b.id);

        if let Some(target_id) = hit_id {
            apply_bullet_hit(&mut bots, target_id, &bullet, tick, &mut events);
        } else {
            surviving_bullets.push(bullet);
        }
    }
    let bullets = surviving_bullets;

    // 4. Bot-bot collision: push apart and apply collision damage.
    apply_bot_collisions(&mut bots, arena, tick, &mut events);

    // 5. Radar scan: purely a heading update, already applied in step 2.
    // No additional state changes; a future sensor-output channel would read
    // from here without touching steps 1-4.

    // Build the surviving/updated bot list exactly once per bot (the original
    // engine pushed each surviving bot into the output twice; that is not
    // reproduced here). A dead bot never carries forward into the next
    // snapshot.
    bots.retain(|b| b.is_alive);

    let status = if state.status == MatchStatus::Running
        && bots.is_empty()
        && tick > MATCH_FINISH_TICK_THRESHOLD
    {
        events.push(SimulationEvent::MatchFinished {
            tick,
            winner_id: sole_survivor_before,
        });
        MatchStatus::Finished
    } else {
        state.status
    };

    WorldState {
        tick,
        status,
        bots,
        bullets,
        zone,
        events,
    }
}

fn update_bot(
    bot: &mut BotState,
    arena: &Arena,
    zone: Option<&ZoneState>,
    intent: &BotIntent,
    tick: u64,
    spawned: &mut Vec<BulletState>,
    events: &mut Vec<SimulationEvent>,
) {
    // 1. Cooldowns and active-effect durations decrement first, so every
    // other check this tick sees this tick's counters, not last tick's.
    bot.tick_timers();

    // 2. Energy regen.
    let mut tuning = bot.class.tuning();
    bot.energy = (bot.energy + tuning.energy_regen_per_tick).min(tuning.max_energy);

    // 3. Power activation.
    try_activate_power(bot, intent.use_power);

    // 4. Passive effects: overclock boosts speed and acceleration for every
    // tick it remains active.
    if bot.is_effect_active(Cooldown::Overclock) {
        tuning.max_velocity *= 1.5;
        tuning.acceleration *= 2.0;
    }

    // 5. Rotation.
    bot.heading_degrees = crate::util::vec2::normalize_degrees(bot.heading_degrees + intent.turn_degrees);
    bot.gun_heading_degrees =
        crate::util::vec2::normalize_degrees(bot.gun_heading_degrees + intent.gun_turn_degrees);
    bot.radar_heading_degrees =
        crate::util::vec2::normalize_degrees(bot.radar_heading_degrees + intent.radar_turn_degrees);

    // 6. Velocity step.
    let requested = intent.move_distance.clamp(-tuning.max_velocity, tuning.max_velocity);
    if requested.abs() > bot.velocity.abs() {
        let accel = if requested > bot.velocity {
            tuning.acceleration
        } else {
            -tuning.acceleration
        };
        bot.velocity = (bot.velocity + accel).clamp(-tuning.max_velocity, tuning.max_velocity);
    } else {
        let decel = if bot.velocity > 0.0 {
            -tuning.deceleration
        } else {
            tuning.deceleration
        };
        bot.velocity += decel;
        if bot.velocity.signum() != requested.signum() && requested != 0.0 {
            bot.velocity = requested;
        }
    }
    bot.velocity = bot.velocity.clamp(-tuning.max_velocity, tuning.max_velocity);

    // 7. Position, then wall clamp.
    let dir = Vec2::from_heading_degrees(bot.heading_degrees);
    let next = bot.position + Vec2::new(dir.x * bot.velocity, dir.y * bot.velocity);
    let (cx, cy) = arena.clamp_position(next.x, next.y, ROBOT_RADIUS);
    bot.position = Vec2::new(cx, cy);

    // 8. Zone damage, checked against the position this tick just moved to.
    if let Some(zone) = zone {
        if zone.is_outside(bot.position) {
            damage_bot(bot, ZONE_DAMAGE_PER_TICK, None, tick, events);
        }
    }

    // 9. Firing: requires heat to have drained and enough energy to pay for it.
    if bot.is_alive && intent.fire_power > 0.0 && bot.heat <= 0.0 && bot.energy >= intent.fire_power {
        let heading = bot.gun_heading_degrees;
        let muzzle = bot.position;
        spawned.push(BulletState::spawn(bot.id, muzzle, heading, intent.fire_power));
        bot.heat += constants::fire_heat(intent.fire_power);
        bot.energy -= intent.fire_power;
    }

    // 10. Heat decay, unconditional.
    bot.heat = (bot.heat - HEAT_DECAY_PER_TICK).max(0.0);
}

fn try_activate_power(bot: &mut BotState, power: PowerKind) {
    let (cooldown, cost, duration, recharge) = match power {
        PowerKind::None => return,
        PowerKind::Shield => (Cooldown::Shield, constants::SHIELD_COST, 0, SHIELD_COOLDOWN_TICKS),
        PowerKind::Overclock => (
            Cooldown::Overclock,
            constants::OVERCLOCK_COST,
            OVERCLOCK_DURATION_TICKS,
            OVERCLOCK_COOLDOWN_TICKS,
        ),
        PowerKind::Stealth => (
            Cooldown::Stealth,
            constants::STEALTH_COST,
            STEALTH_DURATION_TICKS,
            STEALTH_COOLDOWN_TICKS,
        ),
    };

    if !bot.is_power_ready(cooldown) || bot.energy < cost {
        return;
    }

    bot.energy -= cost;
    bot.cooldowns.insert(cooldown, recharge);
    match power {
        PowerKind::Shield => {
            let max_shield = bot.class.tuning().max_shield;
            bot.shield_hp = max_shield;
        }
        PowerKind::Overclock => {
            bot.active_effect_ticks.insert(Cooldown::Overclock, duration);
        }
        PowerKind::Stealth => {
            bot.active_effect_ticks.insert(Cooldown::Stealth, duration);
            bot.is_stealthed = true;
        }
        PowerKind::None => {}
    }
}

fn apply_bullet_hit(
    bots: &mut [BotState],
    target_id: Uuid,
    bullet: &BulletState,
    tick: u64,
    events: &mut Vec<SimulationEvent>,
) {
    let damage = bullet.power;
    events.push(SimulationEvent::HitByBullet {
        tick,
        bullet_id: bullet.id,
        target_id,
        shooter_id: bullet.owner_id,
        damage,
    });

    let died = if let Some(target) = bots.iter_mut().find(|b| b.id == target_id) {
        damage_bot(target, damage, Some(bullet.owner_id), tick, events)
    } else {
        false
    };

    if died {
        if let Some(shooter) = bots.iter_mut().find(|b| b.id == bullet.owner_id) {
            shooter.kills += 1;
        }
    }
}

/// Apply damage to a bot, spending shield first, and emit a `Death` event if
/// this reduces hull to zero or below. Returns whether this call killed it.
fn damage_bot(
    bot: &mut BotState,
    amount: f32,
    killer_id: Option<Uuid>,
    tick: u64,
    events: &mut Vec<SimulationEvent>,
) -> bool {
    let mut remaining = amount;
    if bot.shield_hp > 0.0 {
        let absorbed = remaining.min(bot.shield_hp);
        bot.shield_hp -= absorbed;
        remaining -= absorbed;
    }
    bot.hull -= remaining;

    if bot.hull <= 0.0 && bot.is_alive {
        bot.is_alive = false;
        bot.hull = 0.0;
        bot.deaths += 1;
        events.push(SimulationEvent::Death {
            tick,
            bot_id: bot.id,
            killer_id,
        });
        return true;
    }
    false
}

fn apply_bot_collisions(bots: &mut [BotState], arena: &Arena, tick: u64, events: &mut Vec<SimulationEvent>) {
    let ids: Vec<Uuid> = bots.iter().filter(|b| b.is_alive).map(|b| b.id).collect();
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            let (a_idx, b_idx) = (
                bots.iter().position(|b| b.id == ids[i]).unwrap(),
                bots.iter().position(|b| b.id == ids[j]).unwrap(),
            );
            let (pos_a, pos_b) = (bots[a_idx].position, bots[b_idx].position);
            let dist = pos_a.distance_to(pos_b);
            if dist >= MIN_BOT_SEPARATION {
                continue;
            }

            // Exactly coincident bots have no well-defined separation axis;
            // pick positive-x rather than leaving them stuck together.
            let dir = if dist <= f32::EPSILON {
                Vec2::new(1.0, 0.0)
            } else {
                Vec2::new((pos_b.x - pos_a.x) / dist, (pos_b.y - pos_a.y) / dist)
            };
            let overlap = MIN_BOT_SEPARATION - dist;
            let push = overlap / 2.0;

            let new_a = pos_a - Vec2::new(dir.x * push, dir.y * push);
            let new_b = pos_b + Vec2::new(dir.x * push, dir.y * push);
            let (ax, ay) = arena.clamp_position(new_a.x, new_a.y, ROBOT_RADIUS);
            let (bx, by) = arena.clamp_position(new_b.x, new_b.y, ROBOT_RADIUS);
            bots[a_idx].position = Vec2::new(ax, ay);
            bots[b_idx].position = Vec2::new(bx, by);
            bots[a_idx].velocity = 0.0;
            bots[b_idx].velocity = 0.0;

            damage_bot(&mut bots[a_idx], COLLISION_DAMAGE, None, tick, events);
            damage_bot(&mut bots[b_idx], COLLISION_DAMAGE, None, tick, events);
        }
    }
}
