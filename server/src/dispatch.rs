use crate::error::DispatchError;
use crate::event::{Event, EventKind};
use crate::world::World;

/// Apply one queued event to the world.
pub fn apply(world: &mut World, event: &Event) -> Result<(), DispatchError> {
    let id = event.session.as_str();
    match &event.kind {
        EventKind::UserAdd => {
            let spawn = world.course().spawn();
            world.add_ball(spawn, id)?;
            tracing::info!(session = %id, "Ball added");
        }
        EventKind::UserRem => {
            world
                .remove_ball(id)
                .ok_or_else(|| DispatchError::UnknownBall(id.to_string()))?;
            tracing::info!(session = %id, "Ball removed");
        }
        EventKind::UserShoot { vector } => {
            let max_speed = world.physics().max_speed;
            let ball = world
                .get_ball_mut(id)
                .ok_or_else(|| DispatchError::UnknownBall(id.to_string()))?;
            if !ball.is_stationary() {
                return Err(DispatchError::BallMoving(id.to_string()));
            }
            if !ball.hit(*vector * max_speed) {
                return Err(DispatchError::InvalidImpulse(id.to_string()));
            }
            tracing::debug!(session = %id, tries = ball.tries, "Ball struck");
        }
        EventKind::UserRespawn => {
            world
                .get_ball_mut(id)
                .ok_or_else(|| DispatchError::UnknownBall(id.to_string()))?
                .reset_to_origin();
            tracing::debug!(session = %id, "Ball respawned");
        }
        EventKind::Unknown(kind) => {
            return Err(DispatchError::UnknownEvent {
                session: id.to_string(),
                kind: kind.clone(),
            });
        }
    }
    Ok(())
}

/// Apply events in order. A failing event is logged and skipped; the rest
/// still run. Returns how many were applied.
pub fn apply_all(world: &mut World, events: &[Event]) -> usize {
    let mut applied = 0;
    for event in events {
        match apply(world, event) {
            Ok(()) => applied += 1,
            Err(e @ DispatchError::UnknownEvent { .. }) => {
                tracing::error!(session = %event.session, "{}", e);
            }
            Err(e) => {
                tracing::warn!(session = %event.session, event = event.kind.name(), "{}", e);
            }
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use crate::world::Course;
    use minigolf_shared::vec2::Vec2;

    fn world() -> World {
        let course = Course::new(Vec::new(), Vec::new(), Vec2::from_cartesian(0.4, 0.5));
        World::new(course, PhysicsConfig::default())
    }

    fn shoot(id: &str, x: f64, y: f64) -> Event {
        Event::new(
            id,
            EventKind::UserShoot {
                vector: Vec2::from_cartesian(x, y),
            },
        )
    }

    #[test]
    fn user_add_spawns_at_map_spawn() {
        let mut world = world();
        apply(&mut world, &Event::new("user_000", EventKind::UserAdd)).unwrap();
        let ball = world.get_ball("user_000").unwrap();
        assert_eq!(ball.position, Vec2::from_cartesian(0.4, 0.5));
        assert_eq!(ball.tries, 0);
    }

    #[test]
    fn shoot_scales_by_max_speed() {
        let mut world = world();
        apply(&mut world, &Event::new("user_000", EventKind::UserAdd)).unwrap();
        apply(&mut world, &shoot("user_000", 0.5, 0.0)).unwrap();

        let ball = world.get_ball("user_000").unwrap();
        assert!((ball.velocity.x() - 0.8).abs() < 1e-12);
        assert_eq!(ball.tries, 1);
    }

    #[test]
    fn shoot_while_moving_is_rejected() {
        let mut world = world();
        apply(&mut world, &Event::new("user_000", EventKind::UserAdd)).unwrap();
        apply(&mut world, &shoot("user_000", 0.5, 0.0)).unwrap();
        assert_eq!(
            apply(&mut world, &shoot("user_000", -0.5, 0.0)),
            Err(DispatchError::BallMoving("user_000".to_string()))
        );
        assert_eq!(world.get_ball("user_000").unwrap().tries, 1);
    }

    #[test]
    fn zero_shoot_is_rejected() {
        let mut world = world();
        apply(&mut world, &Event::new("user_000", EventKind::UserAdd)).unwrap();
        assert_eq!(
            apply(&mut world, &shoot("user_000", 0.0, 0.0)),
            Err(DispatchError::InvalidImpulse("user_000".to_string()))
        );
    }

    #[test]
    fn events_for_unknown_ball_fail() {
        let mut world = world();
        assert_eq!(
            apply(&mut world, &shoot("ghost", 0.1, 0.0)),
            Err(DispatchError::UnknownBall("ghost".to_string()))
        );
        assert_eq!(
            apply(&mut world, &Event::new("ghost", EventKind::UserRespawn)),
            Err(DispatchError::UnknownBall("ghost".to_string()))
        );
        assert_eq!(
            apply(&mut world, &Event::new("ghost", EventKind::UserRem)),
            Err(DispatchError::UnknownBall("ghost".to_string()))
        );
    }

    #[test]
    fn respawn_returns_to_origin_keeping_tries() {
        let mut world = world();
        apply(&mut world, &Event::new("user_000", EventKind::UserAdd)).unwrap();
        apply(&mut world, &shoot("user_000", 0.5, 0.2)).unwrap();
        world.update_all(1.0 / 60.0);

        apply(&mut world, &Event::new("user_000", EventKind::UserRespawn)).unwrap();
        let ball = world.get_ball("user_000").unwrap();
        assert_eq!(ball.position, ball.origin());
        assert!(ball.is_stationary());
        assert_eq!(ball.tries, 1);
    }

    #[test]
    fn unknown_event_fails_alone() {
        let mut world = world();
        let events = vec![
            Event::new("user_000", EventKind::UserAdd),
            Event::new("user_000", EventKind::Unknown("teleport".to_string())),
            shoot("user_000", 0.3, 0.0),
        ];
        assert_eq!(apply_all(&mut world, &events), 2);
        assert!(!world.get_ball("user_000").unwrap().is_stationary());
    }

    #[test]
    fn user_rem_removes_ball() {
        let mut world = world();
        let events = vec![
            Event::new("user_000", EventKind::UserAdd),
            Event::new("user_001", EventKind::UserAdd),
            Event::new("user_000", EventKind::UserRem),
        ];
        assert_eq!(apply_all(&mut world, &events), 3);
        assert!(world.get_ball("user_000").is_none());
        assert_eq!(world.ball_count(), 1);
    }
}
