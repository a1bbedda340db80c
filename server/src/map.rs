use crate::config::PhysicsConfig;
use crate::error::ServerError;
use crate::geometry::{EllipseWall, Obstacle, Target, Wall};
use crate::world::Course;
use minigolf_shared::map::MapData;
use minigolf_shared::vec2::Vec2;
use std::path::Path;

/// Read a map file, or the built-in course when `path` is `None`.
pub fn load_map(path: Option<&Path>) -> Result<MapData, ServerError> {
    let Some(path) = path else {
        tracing::info!("No map configured, using built-in course");
        return Ok(MapData::default_course());
    };

    let text = std::fs::read_to_string(path).map_err(|source| ServerError::MapLoad {
        path: path.to_path_buf(),
        source,
    })?;
    let map = MapData::from_json(&text).map_err(|e| ServerError::MapFormat(e.to_string()))?;
    tracing::info!(
        path = %path.display(),
        walls = map.segments.len(),
        ellipses = map.ellipses.len(),
        "Loaded map"
    );
    Ok(map)
}

/// Turn normalized map data into world geometry. Every x coordinate (and
/// ellipse width) is multiplied by `x_scale`.
pub fn build_course(map: &MapData, physics: &PhysicsConfig) -> Result<Course, ServerError> {
    let sx = physics.x_scale;
    let point = |x: f64, y: f64| Vec2::from_cartesian(x * sx, y);

    let mut obstacles = Vec::with_capacity(map.segments.len() + map.ellipses.len());
    for seg in &map.segments {
        let wall = Wall::new(
            point(seg.p1_x, seg.p1_y),
            point(seg.p2_x, seg.p2_y),
            physics.wall_thickness,
        );
        if wall.is_degenerate() {
            tracing::warn!(?seg, "Zero-length wall in map, it will never collide");
        }
        obstacles.push(Obstacle::Segment(wall));
    }
    for e in &map.ellipses {
        obstacles.push(Obstacle::Ellipse(EllipseWall::new(
            e.x * sx,
            e.y,
            e.width * sx,
            e.height,
            physics.wall_thickness,
        )));
    }

    let target = Target::new(point(map.target[0], map.target[1]), physics.target_radius);
    let spawn = point(map.spawn_pos[0], map.spawn_pos[1]);

    let inside = |p: Vec2| {
        (0.0..=physics.world_width).contains(&p.x()) && (0.0..=physics.world_height).contains(&p.y())
    };
    if !inside(spawn) {
        return Err(ServerError::MapFormat(format!(
            "spawn_pos {:?} is outside the world",
            map.spawn_pos
        )));
    }

    Ok(Course::new(obstacles, vec![target], spawn))
}
