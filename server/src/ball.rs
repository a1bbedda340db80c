use crate::config::PhysicsConfig;
use crate::world::Course;
use minigolf_shared::protocol::{round4, BallWire};
use minigolf_shared::vec2::Vec2;

/// Upper bound on sub-steps per tick; a fast ball is split into moves no
/// longer than its radius so it cannot jump over a thin wall.
const MAX_SUBSTEPS: f64 = 8.0;

/// One player's ball.
///
/// A ball is either stationary (velocity length exactly 0) or moving.
/// Only a stationary ball can be struck.
#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    pub id: String,
    pub position: Vec2,
    pub velocity: Vec2,
    pub tries: u32,
    origin: Vec2,
}

impl Ball {
    pub fn new(id: impl Into<String>, origin: Vec2) -> Self {
        Self {
            id: id.into(),
            position: origin,
            velocity: Vec2::ZERO,
            tries: 0,
            origin,
        }
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn is_stationary(&self) -> bool {
        self.velocity.is_zero()
    }

    /// Strike the ball. Returns false, leaving the ball untouched, if it is
    /// still moving or the impulse is zero or not finite.
    pub fn hit(&mut self, impulse: Vec2) -> bool {
        if !self.is_stationary() || !impulse.is_finite() || impulse.is_zero() {
            return false;
        }
        self.velocity = impulse;
        self.tries += 1;
        true
    }

    /// Back to the spawn point, at rest. `tries` is kept.
    pub fn reset_to_origin(&mut self) {
        self.position = self.origin;
        self.stop();
    }

    fn stop(&mut self) {
        // Keeps the heading, only the length drops to zero.
        self.velocity.set_length(0.0);
    }

    /// Resting on a target.
    pub fn on_target(&self, course: &Course, physics: &PhysicsConfig) -> bool {
        self.is_stationary()
            && course
                .targets()
                .iter()
                .any(|t| t.overlaps(self.position, physics.ball_radius))
    }

    /// Advance by `dt` seconds. Returns the number of wall reflections.
    ///
    /// Each wall is reflected off at most once per call and the total is
    /// capped by `max_reflections`, so a ball wedged in a corner cannot spin
    /// the loop.
    pub fn update(&mut self, dt: f64, course: &Course, physics: &PhysicsConfig) -> usize {
        if self.is_stationary() || !dt.is_finite() || dt <= 0.0 {
            return 0;
        }

        let travel = self.velocity.length() * dt;
        let substeps = (travel / physics.ball_radius).ceil().clamp(1.0, MAX_SUBSTEPS);
        let sub_dt = dt / substeps;

        let mut collided: Vec<usize> = Vec::new();
        for _ in 0..substeps as usize {
            self.advance(sub_dt, course, physics, &mut collided);
        }

        let slowed = self.velocity.length() * physics.friction_factor;
        if slowed < physics.stop_epsilon {
            self.stop();
        } else {
            self.velocity.set_length(slowed);
        }

        if !self.is_stationary()
            && self.velocity.length() < physics.capture_speed
            && course
                .targets()
                .iter()
                .any(|t| t.overlaps(self.position, physics.ball_radius))
        {
            tracing::debug!(ball = %self.id, "ball captured by target");
            self.stop();
        }

        if self.out_of_bounds(physics) {
            tracing::debug!(ball = %self.id, "ball left the course, resetting");
            self.reset_to_origin();
        }

        collided.len()
    }

    /// Move once: tentative displacement, then for every wall touched roll
    /// back, reflect and re-apply.
    fn advance(
        &mut self,
        dt: f64,
        course: &Course,
        physics: &PhysicsConfig,
        collided: &mut Vec<usize>,
    ) {
        let start = self.position;
        self.position = start + self.velocity * dt;

        while collided.len() < physics.max_reflections {
            let Some(hit) = course.collide(
                start,
                self.position,
                self.velocity,
                physics.ball_radius,
                collided,
            ) else {
                break;
            };
            self.position = start;
            self.velocity.reflect(&hit.axis);
            self.position = start + self.velocity * dt;
            collided.push(hit.index);
        }
    }

    fn out_of_bounds(&self, physics: &PhysicsConfig) -> bool {
        let (x, y) = self.position.xy();
        !(x.is_finite() && y.is_finite())
            || x < 0.0
            || x > physics.world_width
            || y < 0.0
            || y > physics.world_height
    }

    /// Wire form. `x` is divided by `x_scale` so clients see [0, 1] on both axes.
    pub fn to_wire(&self, course: &Course, physics: &PhysicsConfig) -> BallWire {
        BallWire {
            id: self.id.clone(),
            x: round4(self.position.x() / physics.x_scale),
            y: round4(self.position.y()),
            vel: [round4(self.velocity.x()), round4(self.velocity.y())],
            tries: self.tries,
            on_target: self.on_target(course, physics),
        }
    }
}
