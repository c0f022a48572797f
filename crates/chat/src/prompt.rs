//! User-message assembly: routed content plus retrieved references.

use ragchat_config::Placement;
use ragchat_core::document::RetrievedChunk;

const REFERENCE_HEADER: &str = "[Retrieved Knowledge]";

/// Render hits as a reference block, one `[Source: id]` line per hit.
/// Returns `None` for no hits.
pub fn reference_block(hits: &[RetrievedChunk]) -> Option<String> {
    if hits.is_empty() {
        return None;
    }
    let mut block = String::from(REFERENCE_HEADER);
    block.push('\n');
    for hit in hits {
        let source = hit.source().unwrap_or(hit.id.as_str());
        block.push_str(&format!("[Source: {source}] {}\n", hit.content.trim()));
    }
    Some(block)
}

/// The final user message.
pub fn user_content(content: &str, hits: &[RetrievedChunk], placement: Placement) -> String {
    match reference_block(hits) {
        None => content.to_string(),
        Some(block) => match placement {
            Placement::Prepend => format!("{block}\n{content}"),
            Placement::Append => format!("{content}\n\n{block}"),
        },
    }
}
