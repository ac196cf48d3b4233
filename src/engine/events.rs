//! Simulation events emitted during a tick, persisted to the event log and
//! fanned out to spectators.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SimulationEvent {
    HitByBullet {
        tick: u64,
        bullet_id: Uuid,
        target_id: Uuid,
        shooter_id: Uuid,
        damage: f32,
    },
    Death {
        tick: u64,
        bot_id: Uuid,
        /// The bot that fired the killing shot, when attributable. `None` for
        /// zone-damage or collision deaths, where no single bot caused it.
        killer_id: Option<Uuid>,
    },
    MatchFinished {
        tick: u64,
        winner_id: Option<Uuid>,
    },
}

impl SimulationEvent {
    pub fn tick(&self) -> u64 {
        match self {
            SimulationEvent::HitByBullet { tick, .. } => *tick,
            SimulationEvent::Death { tick, .. } => *tick,
            SimulationEvent::MatchFinished { tick, .. } => *tick,
        }
    }

    /// Stable type tag matching the original event-type strings
    /// (`fmt.Sprintf("%T", ev.Event)`), preserved so highlight filtering over
    /// previously persisted event logs keeps working unchanged.
    pub fn type_tag(&self) -> &'static str {
        match self {
            SimulationEvent::HitByBullet { .. } => "*pb.SimulationEvent_HitByBullet",
            SimulationEvent::Death { .. } => "*pb.SimulationEvent_Death",
            SimulationEvent::MatchFinished { .. } => "*pb.SimulationEvent_MatchFinished",
        }
    }

    /// Human-readable highlight description, used by `GetMatchHighlights`.
    pub fn describe(&self, name_of: impl Fn(Uuid) -> String) -> String {
        match self {
            SimulationEvent::HitByBullet {
                target_id, damage, ..
            } => format!("{} took {:.1} damage", name_of(*target_id), damage),
            SimulationEvent::Death {
                bot_id,
                killer_id: Some(killer_id),
                ..
            } => format!("{} was destroyed by {}", name_of(*bot_id), name_of(*killer_id)),
            SimulationEvent::Death { bot_id, .. } => format!("{} was destroyed", name_of(*bot_id)),
            SimulationEvent::MatchFinished {
                winner_id: Some(winner_id),
                ..
            } => format!("{} wins the match", name_of(*winner_id)),
            SimulationEvent::MatchFinished { .. } => "the match ended with no survivors".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tags_are_stable() {
        let ev = SimulationEvent::Death {
            tick: 1,
            bot_id: Uuid::nil(),
            killer_id: None,
        };
        assert_eq!(ev.type_tag(), "*pb.SimulationEvent_Death");
    }

    #[test]
    fn describe_attributes_killer_when_present() {
        let shooter = Uuid::new_v4();
        let victim = Uuid::new_v4();
        let ev = SimulationEvent::Death {
            tick: 5,
            bot_id: victim,
            killer_id: Some(shooter),
        };
        let text = ev.describe(|id| if id == shooter { "raider".into() } else { "target".into() });
        assert_eq!(text, "target was destroyed by raider");
    }
}
