use store_server::{Config, Server, ServerState, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Environment (dotenv, working directory, logging)
    setup_environment()?;

    tracing::info!("Store server starting...");

    // 2. Configuration
    let config = Config::from_env();

    // 3. Server state (database, payment gateway, notifier)
    let state = ServerState::initialize(config.clone()).await?;

    // 4. HTTP server (spawns the expiry sweeper internally)
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
