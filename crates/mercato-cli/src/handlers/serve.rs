use anyhow::Result;
use mercato_axum::{ServerConfig, start_server};

/// Run the HTTP API until Ctrl-C.
pub async fn execute(mut config: ServerConfig, port: Option<u16>) -> Result<()> {
    if let Some(port) = port {
        config = config.with_port(port);
    }

    println!();
    println!("  mercato API starting...");
    println!();
    println!("  Database: {}", config.database_path.display());
    println!("  API:      http://localhost:{}/api", config.port);
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    start_server(config).await
}
