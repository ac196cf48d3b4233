//! The shrinking hazard zone that pressures bots toward the arena center.

use serde::{Deserialize, Serialize};

use crate::engine::constants::{ZONE_MIN_RADIUS, ZONE_SHRINK_PER_TICK};
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneState {
    pub center: Vec2,
    pub radius: f32,
}

impl ZoneState {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn shrink(&mut self) {
        self.radius = (self.radius - ZONE_SHRINK_PER_TICK).max(ZONE_MIN_RADIUS);
    }

    pub fn is_outside(&self, position: Vec2) -> bool {
        self.center.distance_to(position) > self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shrink_stops_at_floor() {
        let mut zone = ZoneState::new(Vec2::new(400.0, 300.0), ZONE_MIN_RADIUS + 0.03);
        zone.shrink();
        zone.shrink();
        assert_eq!(zone.radius, ZONE_MIN_RADIUS);
    }

    #[test]
    fn outside_detection() {
        let zone = ZoneState::new(Vec2::ZERO, 100.0);
        assert!(!zone.is_outside(Vec2::new(50.0, 0.0)));
        assert!(zone.is_outside(Vec2::new(150.0, 0.0)));
    }
}
