use crate::config::ServerConfig;
use crate::session::{ConnectionRegistry, Frame};
use crate::shutdown::Shutdown;
use crate::state::GameState;
use minigolf_shared::protocol::ServerMsg;
use std::sync::Arc;
use std::time::Duration;

/// Run the main game loop. Owns all game state.
///
/// Every tick drains the event queue, then steps the world with a fixed
/// `dt`. Every `tick_rate_hz / broadcast_rate_hz` ticks a snapshot goes to
/// all open connections. Returns the state once shutdown is requested.
pub async fn run_game_loop(
    mut state: GameState,
    registry: Arc<ConnectionRegistry>,
    config: ServerConfig,
    mut shutdown: Shutdown,
) -> GameState {
    let dt = config.tick_dt();
    let broadcast_every_n = config.broadcast_every_n_ticks();
    let mut tick_count: u64 = 0;

    let mut tick_interval = tokio::time::interval(Duration::from_secs_f64(dt));
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                state.poll_events();
                state.tick(dt);

                // Broadcast snapshot at lower rate
                tick_count += 1;
                if tick_count % broadcast_every_n == 0 {
                    broadcast_snapshot(&state, &registry);
                }
            }
            _ = shutdown.wait() => break,
        }
    }

    tracing::info!(ticks = tick_count, "Game loop ended");
    state
}

fn broadcast_snapshot(state: &GameState, registry: &ConnectionRegistry) {
    if registry.is_empty() {
        return;
    }
    match ServerMsg::Snapshot(state.snapshot()).to_frame() {
        Ok(frame) => {
            let frame = Frame::from(frame);
            let delivered = registry.broadcast(&frame);
            tracing::trace!(delivered, "Snapshot broadcast");
        }
        Err(e) => tracing::error!("Failed to encode snapshot: {}", e),
    }
}
