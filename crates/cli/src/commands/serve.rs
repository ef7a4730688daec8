//! `supportdesk serve` — Start the HTTP API server.

use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    host_override: Option<String>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;

    if let Some(host) = host_override {
        config.gateway.host = host;
    }
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("🛎️  supportdesk gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "   Model:     {} via {}",
        config.provider.default_model, config.provider.default_provider
    );
    println!("   Database:  {}", config.database.url);

    supportdesk_gateway::start(config).await?;

    Ok(())
}
