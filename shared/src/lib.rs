pub mod client;
pub mod config;
pub mod framing;
pub mod map;
pub mod protocol;
pub mod vec2;
