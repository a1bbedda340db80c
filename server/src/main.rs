use minigolf_server::config::ServerConfig;
use minigolf_server::server::Server;
use minigolf_server::shutdown;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid server configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Validate, load the map and bind before serving anything
    let server = match Server::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start: {}", e);
            std::process::exit(1);
        }
    };

    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            return;
        }
        tracing::info!("Shutdown requested");
        trigger.shutdown();
    });

    if let Err(e) = server.run(shutdown).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
