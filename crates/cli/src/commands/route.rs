//! `ragchat route <text>` — Show what the tool router does with a message.

use ragchat_config::AppConfig;
use ragchat_tools::ToolRouter;

pub async fn run(config: AppConfig, text: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !config.tools.enabled {
        println!("Tool routing is disabled ([tools] enabled = false).");
        return Ok(());
    }

    let router = ToolRouter::from_config(&config.tools);
    let outcome = router.route(text).await;

    match (&outcome.tool, outcome.used) {
        (Some(tool), true) => println!("tool:    {tool}"),
        (Some(tool), false) => println!("tool:    {tool} (failed, message passed through)"),
        (None, _) => println!("tool:    none"),
    }
    println!("content: {}", outcome.content);
    Ok(())
}
