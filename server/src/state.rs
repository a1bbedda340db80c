use crate::config::PhysicsConfig;
use crate::dispatch;
use crate::error::ServerError;
use crate::event::EventQueue;
use crate::map::build_course;
use crate::world::World;
use minigolf_shared::map::MapData;
use minigolf_shared::protocol::{ServerMsg, SnapshotMsg};
use std::sync::Arc;

/// Central game state owned by the game loop task.
///
/// This is everything the host process sees of the simulation: start it from
/// map data, feed it time with `tick`, let it consume queued events with
/// `poll_events`, and read `snapshot` for broadcast.
pub struct GameState {
    world: World,
    map: MapData,
    events: Arc<EventQueue>,
    ticks: u64,
}

impl GameState {
    pub fn start(
        map: MapData,
        physics: PhysicsConfig,
        events: Arc<EventQueue>,
    ) -> Result<Self, ServerError> {
        physics.validate().map_err(ServerError::Config)?;
        let course = build_course(&map, &physics)?;
        tracing::info!(
            obstacles = course.obstacles().len(),
            targets = course.targets().len(),
            "Game state started"
        );
        Ok(Self {
            world: World::new(course, physics),
            map,
            events,
            ticks: 0,
        })
    }

    /// Step the simulation. Non-finite or negative `dt` is ignored.
    pub fn tick(&mut self, dt: f64) -> usize {
        if !dt.is_finite() || dt < 0.0 {
            tracing::warn!(dt, "Ignoring invalid tick delta");
            return 0;
        }
        self.ticks += 1;
        let reflections = self.world.update_all(dt);
        if reflections > 0 {
            tracing::trace!(tick = self.ticks, reflections, "Wall reflections");
        }
        reflections
    }

    /// Drain the event queue into the world. Returns how many events applied.
    pub fn poll_events(&mut self) -> usize {
        let events = self.events.drain();
        if events.is_empty() {
            return 0;
        }
        dispatch::apply_all(&mut self.world, &events)
    }

    pub fn snapshot(&self) -> SnapshotMsg {
        self.world.snapshot()
    }

    /// The `map` message sent to every new connection.
    pub fn map_msg(&self) -> ServerMsg {
        ServerMsg::Map(self.map.clone())
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn events(&self) -> &Arc<EventQueue> {
        &self.events
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, EventKind};
    use minigolf_shared::vec2::Vec2;

    fn start() -> GameState {
        GameState::start(
            MapData::default_course(),
            PhysicsConfig::default(),
            Arc::new(EventQueue::new()),
        )
        .unwrap()
    }

    #[test]
    fn join_shoot_leave_through_the_queue() {
        let mut state = start();
        let queue = Arc::clone(state.events());

        queue.push(Event::new("user_000", EventKind::UserAdd)).unwrap();
        assert_eq!(state.poll_events(), 1);
        let snap = state.snapshot();
        assert_eq!(snap.balls.len(), 1);
        assert_eq!(snap.balls[0].tries, 0);
        assert!(!snap.balls[0].on_target);

        queue
            .push(Event::new(
                "user_000",
                EventKind::UserShoot {
                    vector: Vec2::from_cartesian(0.1, 0.0),
                },
            ))
            .unwrap();
        state.poll_events();
        state.tick(1.0 / 60.0);
        let first = state.snapshot().balls[0].vel[0];
        assert!(first > 0.0);

        for _ in 0..30 {
            state.tick(1.0 / 60.0);
        }
        let later = state.snapshot().balls[0].vel[0];
        assert!(later > 0.0 && later < first);

        queue.push(Event::new("user_000", EventKind::UserRem)).unwrap();
        state.poll_events();
        assert!(state.snapshot().balls.is_empty());
    }

    #[test]
    fn invalid_dt_is_ignored() {
        let mut state = start();
        assert_eq!(state.tick(f64::NAN), 0);
        assert_eq!(state.tick(-1.0), 0);
        assert_eq!(state.ticks(), 0);
        state.tick(1.0 / 60.0);
        assert_eq!(state.ticks(), 1);
    }

    #[test]
    fn snapshot_x_is_normalized() {
        let mut state = start();
        state
            .events()
            .push(Event::new("user_000", EventKind::UserAdd))
            .unwrap();
        state.poll_events();
        let ball = &state.snapshot().balls[0];
        // Built-in spawn is (0.2, 0.5) in map space.
        assert_eq!(ball.x, 0.2);
        assert_eq!(ball.y, 0.5);
    }

    #[test]
    fn bad_physics_refuses_to_start() {
        let physics = PhysicsConfig {
            ball_radius: -1.0,
            ..Default::default()
        };
        let result = GameState::start(
            MapData::default_course(),
            physics,
            Arc::new(EventQueue::new()),
        );
        assert!(matches!(result, Err(ServerError::Config(_))));
    }
}
