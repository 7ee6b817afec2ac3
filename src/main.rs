/// roomflow: workflow automation for Matrix rooms
///
/// Main entry point. Loads configuration from the environment and starts the
/// HTTP server with workflow management, triggers and execution.

use roomflow::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Workflow management API at /api/workflows/*
/// - Bot records at /api/bots
/// - Inbound chat commands at /api/commands
/// - Webhook triggers at /webhook/{path}
/// - Health check at /healthz
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (defaults to 0.0.0.0:3004 and a local SQLite file)
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
