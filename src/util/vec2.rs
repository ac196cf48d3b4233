//! 2D vector type used for bot and bullet positions.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub, SubAssign};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector for a heading in degrees, using the arena convention where
    /// 0 degrees points north (toward decreasing y) and angles increase clockwise.
    #[inline]
    pub fn from_heading_degrees(heading: f32) -> Self {
        let rad = heading.to_radians();
        Self {
            x: rad.sin(),
            y: -rad.cos(),
        }
    }

    #[inline]
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    #[inline]
    pub fn length_sq(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    #[inline]
    pub fn distance_to(&self, other: Vec2) -> f32 {
        (*self - other).length()
    }

    /// Bearing from this point to `other`, in the same degree convention as headings
    /// (0 = north, clockwise positive), normalized to [0, 360).
    pub fn bearing_to(&self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let deg = dx.atan2(-dy).to_degrees();
        normalize_degrees(deg)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    #[inline]
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

/// Normalize a degree value into [0, 360).
pub fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle % 360.0;
    if wrapped < 0.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// Smallest absolute difference between two headings, in [0, 180].
pub fn angular_diff(a: f32, b: f32) -> f32 {
    let diff = (a - b).abs() % 360.0;
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_zero_points_north() {
        let v = Vec2::from_heading_degrees(0.0);
        assert!((v.x).abs() < 1e-5);
        assert!((v.y + 1.0).abs() < 1e-5);
    }

    #[test]
    fn heading_ninety_points_east() {
        let v = Vec2::from_heading_degrees(90.0);
        assert!((v.x - 1.0).abs() < 1e-5);
        assert!((v.y).abs() < 1e-5);
    }

    #[test]
    fn normalize_wraps_negative_and_overflow() {
        assert!((normalize_degrees(-10.0) - 350.0).abs() < 1e-5);
        assert!((normalize_degrees(370.0) - 10.0).abs() < 1e-5);
        assert!((normalize_degrees(10.0) - 10.0).abs() < 1e-5);
    }

    #[test]
    fn angular_diff_handles_wraparound() {
        assert!((angular_diff(350.0, 10.0) - 20.0).abs() < 1e-5);
        assert!((angular_diff(10.0, 350.0) - 20.0).abs() < 1e-5);
        assert!((angular_diff(0.0, 180.0) - 180.0).abs() < 1e-5);
    }

    #[test]
    fn bearing_to_north() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(0.0, -10.0);
        assert!((a.bearing_to(b)).abs() < 1e-3);
    }
}
