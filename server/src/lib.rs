//! Authoritative minigolf server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod ball;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod game_loop;
pub mod geometry;
pub mod map;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod state;
pub mod world;
