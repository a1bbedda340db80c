use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::event::EventQueue;
use crate::game_loop::run_game_loop;
use crate::map::load_map;
use crate::session::{run_accept_loop, ConnectionRegistry, Frame, SessionContext, SessionIds};
use crate::shutdown::Shutdown;
use crate::state::GameState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// A started but not yet running server: map loaded, listener bound.
pub struct Server {
    listener: TcpListener,
    state: GameState,
    ctx: SessionContext,
    config: ServerConfig,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate().map_err(ServerError::Config)?;

        let map = load_map(config.map_path.as_deref())?;
        let events = Arc::new(EventQueue::new());
        let state = GameState::start(map, config.physics, Arc::clone(&events))?;
        let map_frame = state
            .map_msg()
            .to_frame()
            .map_err(|e| ServerError::MapFormat(e.to_string()))?;

        let listener = TcpListener::bind(&config.listen_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.listen_addr.clone(),
                source,
            })?;

        let ctx = SessionContext {
            events,
            registry: Arc::new(ConnectionRegistry::new()),
            ids: Arc::new(SessionIds::default()),
            map_frame: Frame::from(map_frame),
            read_timeout: config.read_timeout(),
            max_frame_len: config.max_frame_len,
        };

        Ok(Self {
            listener,
            state,
            ctx,
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run until `shutdown` fires. Sessions notice within one read timeout.
    pub async fn run(self, shutdown: Shutdown) -> Result<(), ServerError> {
        let addr = self.local_addr()?;
        tracing::info!(
            %addr,
            tick_hz = self.config.tick_rate_hz,
            broadcast_hz = self.config.broadcast_rate_hz,
            "Minigolf server listening"
        );

        let game = tokio::spawn(run_game_loop(
            self.state,
            Arc::clone(&self.ctx.registry),
            self.config.clone(),
            shutdown.clone(),
        ));

        run_accept_loop(self.listener, self.ctx, shutdown).await;

        if let Err(e) = game.await {
            tracing::error!("Game loop task failed: {}", e);
        }
        Ok(())
    }
}
