/// Physics tuning shared by the server simulation and any client-side
/// prediction. Distances are world units: y spans [0, 1] and x spans
/// [0, world_width] after the map's x coordinates are multiplied by `x_scale`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicsConfig {
    pub ball_radius: f64,
    pub target_radius: f64,
    pub wall_thickness: f64,
    /// Multiplicative speed decay applied once per tick
    pub friction_factor: f64,
    /// Speed below which a moving ball snaps to rest
    pub stop_epsilon: f64,
    /// A ball slower than this stops dead when it overlaps a target
    pub capture_speed: f64,
    /// Scale applied to a client's normalized shot vector
    pub max_speed: f64,
    /// Upper bound on wall reflections resolved within one tick
    pub max_reflections: usize,
    pub world_width: f64,
    pub world_height: f64,
    /// Widescreen stretch applied to map x coordinates
    pub x_scale: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            ball_radius: 0.012,
            target_radius: 0.015,
            wall_thickness: 0.004,
            friction_factor: 0.99,
            stop_epsilon: 0.02,
            capture_speed: 0.35,
            max_speed: 1.6,
            max_reflections: 4,
            world_width: 2.0,
            world_height: 1.0,
            x_scale: 2.0,
        }
    }
}

impl PhysicsConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.ball_radius.is_finite() || self.ball_radius <= 0.0 {
            return Err("ball_radius must be finite and > 0".to_string());
        }
        if !self.target_radius.is_finite() || self.target_radius <= 0.0 {
            return Err("target_radius must be finite and > 0".to_string());
        }
        if !self.wall_thickness.is_finite() || self.wall_thickness < 0.0 {
            return Err("wall_thickness must be finite and >= 0".to_string());
        }
        if !(self.friction_factor > 0.0 && self.friction_factor <= 1.0) {
            return Err("friction_factor must be in (0, 1]".to_string());
        }
        if !self.stop_epsilon.is_finite() || self.stop_epsilon < 0.0 {
            return Err("stop_epsilon must be finite and >= 0".to_string());
        }
        if !self.capture_speed.is_finite() || self.capture_speed < 0.0 {
            return Err("capture_speed must be finite and >= 0".to_string());
        }
        if !self.max_speed.is_finite() || self.max_speed <= 0.0 {
            return Err("max_speed must be finite and > 0".to_string());
        }
        if self.max_reflections == 0 {
            return Err("max_reflections must be >= 1".to_string());
        }
        if !self.world_width.is_finite() || self.world_width <= 0.0 {
            return Err("world_width must be finite and > 0".to_string());
        }
        if !self.world_height.is_finite() || self.world_height <= 0.0 {
            return Err("world_height must be finite and > 0".to_string());
        }
        if !self.x_scale.is_finite() || self.x_scale <= 0.0 {
            return Err("x_scale must be finite and > 0".to_string());
        }
        Ok(())
    }
}
