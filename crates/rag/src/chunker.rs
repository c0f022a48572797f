//! Document chunking.
//!
//! Windows are measured in characters (Unicode scalar values), never bytes,
//! so multi-byte text such as CJK is never cut mid-character. Offsets in
//! chunk ids and metadata are character offsets into the original document.
//!
//! Two strategies:
//! - **Fixed**: windows of `size` chars advancing by `size - overlap`. The
//!   last window is truncated at the end of the document, never dropped.
//! - **Markdown**: the document is first cut at `#`, `##` and `###`
//!   headings (outside code fences); each section is then windowed like
//!   Fixed. Active headings are recorded as `h1`/`h2`/`h3` metadata.

use ragchat_config::{ChunkStrategy, RagConfig};
use ragchat_core::document::{chunk_id, Chunk, Document, META_CHUNK_INDEX, META_OFFSET, META_SOURCE};
use ragchat_core::error::ChunkError;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
    strategy: ChunkStrategy,
}

impl Chunker {
    pub fn new(size: usize, overlap: usize, strategy: ChunkStrategy) -> Result<Self, ChunkError> {
        if size == 0 {
            return Err(ChunkError::InvalidConfig("chunk size must be > 0".into()));
        }
        if overlap >= size {
            return Err(ChunkError::InvalidConfig(format!(
                "overlap ({overlap}) must be smaller than chunk size ({size})"
            )));
        }
        Ok(Self { size, overlap, strategy })
    }

    pub fn fixed(size: usize, overlap: usize) -> Result<Self, ChunkError> {
        Self::new(size, overlap, ChunkStrategy::Fixed)
    }

    pub fn markdown(size: usize, overlap: usize) -> Result<Self, ChunkError> {
        Self::new(size, overlap, ChunkStrategy::Markdown)
    }

    pub fn from_config(config: &RagConfig) -> Result<Self, ChunkError> {
        Self::new(config.chunk_size, config.chunk_overlap, config.strategy)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split a document into chunks. An empty document yields no chunks.
    pub fn split(&self, document: &Document) -> Result<Vec<Chunk>, ChunkError> {
        if document.id.trim().is_empty() {
            return Err(ChunkError::EmptyDocumentId);
        }
        if document.content.is_empty() {
            return Ok(Vec::new());
        }

        let text = CharText::new(&document.content);
        let pieces = match self.strategy {
            ChunkStrategy::Fixed => self
                .windows(0, text.len())
                .into_iter()
                .map(|(start, end)| Piece { start, end, headings: Headings::default() })
                .collect(),
            ChunkStrategy::Markdown => self.markdown_pieces(&text),
        };

        Ok(pieces
            .into_iter()
            .enumerate()
            .map(|(index, piece)| {
                let mut metadata = BTreeMap::new();
                metadata.insert(META_SOURCE.to_string(), document.id.clone());
                metadata.insert(META_OFFSET.to_string(), piece.start.to_string());
                metadata.insert(META_CHUNK_INDEX.to_string(), index.to_string());
                piece.headings.write_to(&mut metadata);

                Chunk {
                    id: chunk_id(&document.id, piece.start),
                    content: text.slice(piece.start, piece.end).to_string(),
                    metadata,
                }
            })
            .collect())
    }

    /// Window `[start, end)` (char offsets) into `(start, end)` pairs.
    fn windows(&self, start: usize, end: usize) -> Vec<(usize, usize)> {
        let step = self.size - self.overlap;
        let mut out = Vec::new();
        let mut pos = start;
        while pos < end {
            let stop = (pos + self.size).min(end);
            out.push((pos, stop));
            if stop == end {
                break;
            }
            pos += step;
        }
        out
    }

    fn markdown_pieces(&self, text: &CharText<'_>) -> Vec<Piece> {
        let mut pieces = Vec::new();
        for section in markdown_sections(text) {
            if text.slice(section.start, section.end).trim().is_empty() {
                continue;
            }
            for (start, end) in self.windows(section.start, section.end) {
                pieces.push(Piece {
                    start,
                    end,
                    headings: section.headings.clone(),
                });
            }
        }
        pieces
    }
}

struct Piece {
    start: usize,
    end: usize,
    headings: Headings,
}

#[derive(Debug, Clone, Default)]
struct Headings {
    h1: Option<String>,
    h2: Option<String>,
    h3: Option<String>,
}

impl Headings {
    fn enter(&mut self, level: usize, title: &str) {
        let title = Some(title.to_string());
        match level {
            1 => {
                self.h1 = title;
                self.h2 = None;
                self.h3 = None;
            }
            2 => {
                self.h2 = title;
                self.h3 = None;
            }
            _ => self.h3 = title,
        }
    }

    fn write_to(&self, metadata: &mut BTreeMap<String, String>) {
        for (key, value) in [("h1", &self.h1), ("h2", &self.h2), ("h3", &self.h3)] {
            if let Some(v) = value {
                metadata.insert(key.to_string(), v.clone());
            }
        }
    }
}

struct Section {
    start: usize,
    end: usize,
    headings: Headings,
}

/// Cut the text at heading lines. Each section starts at its heading line
/// and runs to the next one; text before the first heading is its own section.
fn markdown_sections(text: &CharText<'_>) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut headings = Headings::default();
    let mut section_start = 0;
    let mut section_headings = Headings::default();
    let mut in_fence = false;

    let mut line_start = 0;
    for line in text.source.split_inclusive('\n') {
        let line_chars = line.chars().count();
        let trimmed = line.trim_end();

        if trimmed.trim_start().starts_with("```") {
            in_fence = !in_fence;
        } else if !in_fence {
            if let Some((level, title)) = parse_heading(trimmed) {
                if line_start > section_start {
                    sections.push(Section {
                        start: section_start,
                        end: line_start,
                        headings: section_headings.clone(),
                    });
                }
                headings.enter(level, title);
                section_start = line_start;
                section_headings = headings.clone();
            }
        }

        line_start += line_chars;
    }

    if text.len() > section_start {
        sections.push(Section {
            start: section_start,
            end: text.len(),
            headings: section_headings,
        });
    }
    sections
}

/// `# Title` → `(1, "Title")`. Only levels 1–3 split sections.
fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if !(1..=3).contains(&level) {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let title = rest.trim();
    (!title.is_empty()).then_some((level, title))
}

/// A string with a char-offset → byte-offset table.
struct CharText<'a> {
    source: &'a str,
    boundaries: Vec<usize>,
}

impl<'a> CharText<'a> {
    fn new(source: &'a str) -> Self {
        let boundaries = source
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(source.len()))
            .collect();
        Self { source, boundaries }
    }

    /// Number of chars.
    fn len(&self) -> usize {
        self.boundaries.len() - 1
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.source[self.boundaries[start]..self.boundaries[end]]
    }
}
