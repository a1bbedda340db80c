pub use minigolf_shared::config::PhysicsConfig;

use minigolf_shared::framing::DEFAULT_MAX_FRAME_LEN;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub tick_rate_hz: u32,
    /// Must not exceed `tick_rate_hz`; snapshots go out every N ticks.
    pub broadcast_rate_hz: u32,
    /// `None` loads the built-in course.
    pub map_path: Option<PathBuf>,
    /// Per-connection read timeout; bounds how long a session takes to notice shutdown.
    pub read_timeout_ms: u64,
    pub max_frame_len: usize,
    pub physics: PhysicsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8888".to_string(),
            tick_rate_hz: 60,
            broadcast_rate_hz: 30,
            map_path: None,
            read_timeout_ms: 200,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            physics: PhysicsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `MINIGOLF_ADDR`, `MINIGOLF_MAP`,
    /// `MINIGOLF_TICK_HZ` and `MINIGOLF_BROADCAST_HZ`.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();
        if let Some(addr) = lookup("MINIGOLF_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(path) = lookup("MINIGOLF_MAP") {
            config.map_path = Some(PathBuf::from(path));
        }
        if let Some(hz) = lookup("MINIGOLF_TICK_HZ") {
            config.tick_rate_hz = hz
                .parse()
                .map_err(|_| format!("MINIGOLF_TICK_HZ is not a number: {hz}"))?;
        }
        if let Some(hz) = lookup("MINIGOLF_BROADCAST_HZ") {
            config.broadcast_rate_hz = hz
                .parse()
                .map_err(|_| format!("MINIGOLF_BROADCAST_HZ is not a number: {hz}"))?;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tick_rate_hz == 0 {
            return Err("tick_rate_hz must be > 0".to_string());
        }
        if self.broadcast_rate_hz == 0 {
            return Err("broadcast_rate_hz must be > 0".to_string());
        }
        if self.broadcast_rate_hz > self.tick_rate_hz {
            return Err(format!(
                "broadcast_rate_hz ({}) must be <= tick_rate_hz ({})",
                self.broadcast_rate_hz, self.tick_rate_hz
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err("read_timeout_ms must be > 0".to_string());
        }
        if self.max_frame_len == 0 {
            return Err("max_frame_len must be > 0".to_string());
        }
        self.physics.validate()
    }

    pub fn tick_dt(&self) -> f64 {
        1.0 / self.tick_rate_hz as f64
    }

    pub fn broadcast_every_n_ticks(&self) -> u64 {
        (self.tick_rate_hz / self.broadcast_rate_hz).max(1) as u64
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
