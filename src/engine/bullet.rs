//! In-flight projectile state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::constants::BULLET_VELOCITY;
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletState {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub position: Vec2,
    pub heading_degrees: f32,
    pub velocity: f32,
    pub power: f32,
}

impl BulletState {
    pub fn spawn(owner_id: Uuid, position: Vec2, heading_degrees: f32, power: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            position,
            heading_degrees,
            velocity: BULLET_VELOCITY,
            power,
        }
    }

    /// Advance the bullet one tick along its heading.
    pub fn integrate(&mut self) {
        let dir = Vec2::from_heading_degrees(self.heading_degrees);
        self.position += Vec2::new(dir.x * self.velocity, dir.y * self.velocity);
    }

    pub fn is_out_of_bounds(&self, arena_width: f32, arena_height: f32) -> bool {
        self.position.x < 0.0
            || self.position.y < 0.0
            || self.position.x > arena_width
            || self.position.y > arena_height
    }
}
