use std::f32::consts::PI;

use poppingball_engine::coords::Vec3;
use poppingball_engine::render::SceneObject;

use crate::rng::XorShift32;

const DENSITY: f32 = 1.0;

/// Half-extent of the square the balls live in (clip space).
const BOUND: f32 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    pub location: Vec3,
    pub velocity: Vec3,
    pub radius: f32,
    pub mass: f32,
    pub color: Vec3,
}

impl Ball {
    pub fn new(location: Vec3, velocity: Vec3, radius: f32, color: Vec3) -> Self {
        Self {
            location,
            velocity,
            radius,
            mass: radius * radius * PI * DENSITY,
            color,
        }
    }

    /// Distance between centers in the XY plane.
    pub fn distance(&self, other: &Ball) -> f32 {
        let d = self.location - other.location;
        (d.x * d.x + d.y * d.y).sqrt()
    }

    /// Touching counts as intersecting.
    pub fn intersects(&self, other: &Ball) -> bool {
        self.distance(other) <= self.radius + other.radius
    }

    /// Moves by `velocity * dt`, wrapping to the opposite edge of the square.
    pub fn advance(&mut self, dt: f32) {
        self.location = self.location + self.velocity * dt;
        self.location.x = wrap(self.location.x);
        self.location.y = wrap(self.location.y);
    }
}

fn wrap(v: f32) -> f32 {
    if v > BOUND {
        v - 2.0 * BOUND
    } else if v < -BOUND {
        v + 2.0 * BOUND
    } else {
        v
    }
}

impl SceneObject for Ball {
    fn offset(&self) -> Vec3 {
        self.location
    }

    fn scale(&self) -> f32 {
        self.radius
    }

    fn color(&self) -> Vec3 {
        self.color
    }
}

/// The set of balls on screen.
#[derive(Debug)]
pub struct BallManager {
    balls: Vec<Ball>,
    rng: XorShift32,
}

impl BallManager {
    pub fn new(rng: XorShift32) -> Self {
        Self {
            balls: Vec::new(),
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.balls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ball> {
        self.balls.iter()
    }

    /// Location in [-1, 1), velocity in [-0.1, 0.1) per axis, radius in
    /// [0.10, 0.20), all on a 0.01 grid.
    pub fn add_ball(&mut self) -> &Ball {
        let rng = &mut self.rng;
        let location = Vec3::new(
            rng.stepped(-1.0, 0.01, 200),
            rng.stepped(-1.0, 0.01, 200),
            0.0,
        );
        let velocity = Vec3::new(
            rng.stepped(-0.1, 0.01, 20),
            rng.stepped(-0.1, 0.01, 20),
            0.0,
        );
        let radius = rng.stepped(0.10, 0.01, 10);
        let color = Vec3::new(
            rng.stepped(0.3, 0.01, 70),
            rng.stepped(0.3, 0.01, 70),
            rng.stepped(0.3, 0.01, 70),
        );

        self.balls.push(Ball::new(location, velocity, radius, color));
        log::debug!("ball added ({} total)", self.balls.len());
        &self.balls[self.balls.len() - 1]
    }

    /// Removes a ball at random. `None` when there are none left.
    pub fn remove_ball(&mut self) -> Option<Ball> {
        if self.balls.is_empty() {
            return None;
        }
        let index = self.rng.below(self.balls.len() as u32) as usize;
        let ball = self.balls.swap_remove(index);
        log::debug!("ball removed ({} left)", self.balls.len());
        Some(ball)
    }

    pub fn step(&mut self, dt: f32) {
        for ball in &mut self.balls {
            ball.advance(dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball_at(x: f32, y: f32, radius: f32) -> Ball {
        Ball::new(Vec3::new(x, y, 0.0), Vec3::zero(), radius, Vec3::splat(1.0))
    }

    #[test]
    fn mass_is_area_at_unit_density() {
        let ball = ball_at(0.0, 0.0, 0.5);
        assert!((ball.mass - 0.25 * PI).abs() < 1e-6);
    }

    #[test]
    fn intersects_when_touching() {
        let a = ball_at(0.0, 0.0, 0.1);
        let b = ball_at(0.3, 0.4, 0.4);
        assert!((a.distance(&b) - 0.5).abs() < 1e-6);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&ball_at(0.3, 0.4, 0.3)));
    }

    #[test]
    fn motion_wraps_around() {
        let mut ball = ball_at(0.95, -0.95, 0.1);
        ball.velocity = Vec3::new(0.1, -0.1, 0.0);
        ball.advance(1.0);
        assert!((ball.location.x - (-0.95)).abs() < 1e-5);
        assert!((ball.location.y - 0.95).abs() < 1e-5);
    }

    #[test]
    fn added_balls_respect_ranges() {
        let mut manager = BallManager::new(XorShift32::new(1234));
        for _ in 0..200 {
            let ball = manager.add_ball().clone();
            assert!((-1.0..1.0).contains(&ball.location.x));
            assert!((-1.0..1.0).contains(&ball.location.y));
            assert!((-0.1..0.1).contains(&ball.velocity.x));
            assert!((0.1..0.2).contains(&ball.radius));
        }
        assert_eq!(manager.len(), 200);
    }

    #[test]
    fn remove_until_empty() {
        let mut manager = BallManager::new(XorShift32::new(5));
        manager.add_ball();
        manager.add_ball();

        assert!(manager.remove_ball().is_some());
        assert!(manager.remove_ball().is_some());
        assert!(manager.remove_ball().is_none());
        assert!(manager.is_empty());
    }
}
