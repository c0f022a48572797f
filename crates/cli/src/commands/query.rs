//! `ragchat query <text>` — Show retrieved chunks for a question.

use ragchat_config::AppConfig;
use ragchat_rag::Retriever;

pub async fn run(config: AppConfig, text: &str, top_k: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let (embedder, index) = super::rag_clients(&config).await?;
    let retriever = Retriever::from_config(embedder, index, &config.rag);

    let hits = retriever.retrieve(text, top_k).await?;
    if hits.is_empty() {
        println!("No matching chunks.");
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "#{} score={:.4} source={} id={}",
            rank + 1,
            hit.score,
            hit.source().unwrap_or("?"),
            hit.id
        );
        println!("{}\n", hit.content.trim());
    }
    Ok(())
}
