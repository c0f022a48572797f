//! `ragchat serve` — Start the HTTP gateway.

use ragchat_chat::Services;
use ragchat_config::AppConfig;

pub async fn run(mut config: AppConfig, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let services = Services::from_config(&config)
        .await
        .map_err(|e| format!("Startup failed: {e}"))?;

    println!("ragchat gateway");
    println!("   Listening:  {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:      {} ({})", config.model, config.provider);
    println!("   Retrieval:  {}", if services.retrieval_enabled() { "enabled" } else { "disabled" });
    println!("   Tools:      {}", if services.tools_enabled() { "enabled" } else { "disabled" });

    ragchat_gateway::start(services).await?;

    Ok(())
}
