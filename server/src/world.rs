use crate::ball::Ball;
use crate::config::PhysicsConfig;
use crate::error::DispatchError;
use crate::geometry::{Hit, Obstacle, Target};
use minigolf_shared::protocol::SnapshotMsg;
use minigolf_shared::vec2::Vec2;
use std::collections::HashMap;

/// Immutable geometry of the loaded map.
#[derive(Debug, Clone)]
pub struct Course {
    obstacles: Vec<Obstacle>,
    targets: Vec<Target>,
    spawn: Vec2,
}

impl Course {
    pub fn new(obstacles: Vec<Obstacle>, targets: Vec<Target>, spawn: Vec2) -> Self {
        Self {
            obstacles,
            targets,
            spawn,
        }
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn spawn(&self) -> Vec2 {
        self.spawn
    }

    /// First obstacle, not in `exclude`, that a ball at `position` touches
    /// while still heading towards it. `start` is where the ball was before
    /// the current move; a ball already moving away from the impact point
    /// is not a hit.
    pub fn collide(
        &self,
        start: Vec2,
        position: Vec2,
        velocity: Vec2,
        radius: f64,
        exclude: &[usize],
    ) -> Option<Hit> {
        self.obstacles
            .iter()
            .enumerate()
            .filter(|(index, _)| !exclude.contains(index))
            .find_map(|(index, obstacle)| {
                let impact = obstacle.collide(position, radius)?;
                if velocity.dot(&(start - impact)) > 0.0 {
                    return None;
                }
                let axis = obstacle.collision_vector(impact)?;
                Some(Hit {
                    index,
                    impact,
                    axis,
                })
            })
    }
}

/// Live balls plus the course they roll on.
///
/// Owned by the game loop task alone; sessions never touch it directly.
pub struct World {
    course: Course,
    balls: HashMap<String, Ball>,
    physics: PhysicsConfig,
}

impl World {
    pub fn new(course: Course, physics: PhysicsConfig) -> Self {
        Self {
            course,
            balls: HashMap::new(),
            physics,
        }
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn physics(&self) -> &PhysicsConfig {
        &self.physics
    }

    pub fn add_ball(&mut self, origin: Vec2, id: &str) -> Result<(), DispatchError> {
        if self.balls.contains_key(id) {
            return Err(DispatchError::DuplicateBall(id.to_string()));
        }
        self.balls.insert(id.to_string(), Ball::new(id, origin));
        Ok(())
    }

    pub fn remove_ball(&mut self, id: &str) -> Option<Ball> {
        self.balls.remove(id)
    }

    pub fn get_ball(&self, id: &str) -> Option<&Ball> {
        self.balls.get(id)
    }

    pub fn get_ball_mut(&mut self, id: &str) -> Option<&mut Ball> {
        self.balls.get_mut(id)
    }

    pub fn ball_count(&self) -> usize {
        self.balls.len()
    }

    pub fn balls(&self) -> impl Iterator<Item = &Ball> {
        self.balls.values()
    }

    /// Step every ball. Returns the total number of wall reflections.
    pub fn update_all(&mut self, dt: f64) -> usize {
        let course = &self.course;
        let physics = &self.physics;
        self.balls
            .values_mut()
            .map(|ball| ball.update(dt, course, physics))
            .sum()
    }

    /// Every ball in wire form, ordered by id.
    pub fn snapshot(&self) -> SnapshotMsg {
        let mut balls: Vec<_> = self
            .balls
            .values()
            .map(|b| b.to_wire(&self.course, &self.physics))
            .collect();
        balls.sort_by(|a, b| a.id.cmp(&b.id));
        SnapshotMsg { balls }
    }
}
