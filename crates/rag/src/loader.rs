//! Reading documents from disk.
//!
//! The document id is the file's base name, so a file uploaded or ingested
//! twice under the same name replaces its earlier chunks.

use ragchat_core::document::Document;
use ragchat_core::error::{IngestError, IngestErrorKind};
use std::path::Path;

/// Load a single file. Invalid UTF-8 is replaced, not rejected.
pub async fn load_file(path: &Path) -> Result<Document, IngestError> {
    let id = document_id(path);
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| IngestError::new(&id, IngestErrorKind::Load(e.to_string())))?;
    Ok(Document::new(id, String::from_utf8_lossy(&bytes).into_owned()))
}

/// Load every regular file directly inside `dir`, sorted by name.
/// Subdirectories are not descended into.
pub async fn load_dir(dir: &Path) -> Result<Vec<Document>, IngestError> {
    let dir_error = |e: std::io::Error| {
        IngestError::new(dir.display().to_string(), IngestErrorKind::Load(e.to_string()))
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(dir_error)?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(dir_error)? {
        let file_type = entry.file_type().await.map_err(dir_error)?;
        if file_type.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        documents.push(load_file(&path).await?);
    }
    Ok(documents)
}

/// The base name of `path`, or the whole path when it has none.
pub fn document_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
