//! Content chunking.
//!
//! Splits item content into retrievable pieces:
//! - Short content becomes a single chunk titled after the item
//! - Longer content is split at markdown headings into sections
//! - Oversized sections are split at blank-line paragraph boundaries
//! - Oversized paragraphs are sliced with an overlapping sliding window
//!
//! Sizes are measured in characters, positions are byte offsets into the original content.

use std::ops::Range;

use kb_config::ChunkSettings;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use thiserror::Error;
use tracing::warn;

/// Largest overlap ratio accepted; larger values are clamped to it.
const MAX_OVERLAP_RATIO: f32 = 0.99;

/// A chunk produced by the chunker, before it is assigned to an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDraft {
    /// Nearest enclosing section title, the item title for single-chunk items, or empty.
    pub heading: String,
    /// Trimmed chunk text.
    pub content: String,
    /// Byte offset where the chunk starts in the content.
    pub start: usize,
    /// Byte offset where the chunk ends in the content.
    pub end: usize,
}

/// Internal chunking failure. Never escapes [`Chunker::chunk`].
#[derive(Debug, Error)]
enum ChunkError {
    /// A computed span did not fall on character boundaries inside the content.
    #[error("invalid span {start}..{end} in content of {len} bytes")]
    InvalidSpan {
        /// Span start.
        start: usize,
        /// Span end.
        end: usize,
        /// Content length in bytes.
        len: usize,
    },
}

/// A markdown heading located in the content.
#[derive(Debug, Clone)]
struct Heading {
    /// Heading text.
    text: String,
    /// Byte offset where the heading starts.
    start: usize,
}

/// A span of content with the heading it belongs to.
#[derive(Debug, Clone)]
struct Piece {
    /// Section heading, possibly empty.
    heading: String,
    /// Byte range into the content.
    span: Range<usize>,
}

/// Splits content into chunks according to [`ChunkSettings`].
#[derive(Debug, Clone)]
pub struct Chunker {
    /// Content shorter than twice this many characters is not split.
    min_chunk_size: usize,
    /// Maximum characters per chunk.
    max_chunk_size: usize,
    /// Fraction of each window shared with the next one.
    overlap_ratio: f32,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(&ChunkSettings::default())
    }
}

impl Chunker {
    /// Creates a chunker, clamping the overlap ratio into `[0, 1)`.
    pub fn new(settings: &ChunkSettings) -> Self {
        let overlap_ratio = if settings.overlap_ratio.is_nan() {
            0.0
        } else {
            settings.overlap_ratio.clamp(0.0, MAX_OVERLAP_RATIO)
        };
        Self {
            min_chunk_size: settings.min_chunk_size,
            max_chunk_size: settings.max_chunk_size.max(1),
            overlap_ratio,
        }
    }

    /// Maximum characters per chunk.
    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Number of characters a sliding window advances by.
    pub fn stride(&self) -> usize {
        // f32 ratios like 0.2 are not exact; round before flooring so 1500 * 0.8 stays 1200.
        let overlap = (f64::from(self.overlap_ratio) * 1e6).round() / 1e6;
        let stride = (self.max_chunk_size as f64 * (1.0 - overlap) + 1e-9).floor();
        (stride as usize).max(1)
    }

    /// Chunks `content`. Never fails: internal errors degrade to a single whole-content chunk.
    pub fn chunk(&self, content: &str, title: &str) -> Vec<ChunkDraft> {
        match self.try_chunk(content, title) {
            Ok(drafts) => drafts,
            Err(e) => {
                warn!(error = %e, "chunking failed, keeping content as a single chunk");
                whole_content(content, title).into_iter().collect()
            }
        }
    }

    /// Chunks `content`, reporting internal failures.
    fn try_chunk(&self, content: &str, title: &str) -> Result<Vec<ChunkDraft>, ChunkError> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        if content.chars().count() < self.min_chunk_size.saturating_mul(2) {
            return Ok(whole_content(content, title).into_iter().collect());
        }

        let mut pieces = Vec::new();
        for section in sections(content) {
            self.split_section(content, section, &mut pieces)?;
        }

        let mut drafts = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let text = slice(content, piece.span.clone())?;
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            let start = piece.span.start + (text.len() - text.trim_start().len());
            drafts.push(ChunkDraft {
                heading: piece.heading,
                content: trimmed.to_string(),
                start,
                end: start + trimmed.len(),
            });
        }

        if drafts.is_empty() {
            return Ok(whole_content(content, title).into_iter().collect());
        }
        Ok(drafts)
    }

    /// Splits one section into pieces no longer than `max_chunk_size` characters.
    ///
    /// An oversized section yields one piece per paragraph; oversized paragraphs are windowed.
    fn split_section(
        &self,
        content: &str,
        section: Piece,
        out: &mut Vec<Piece>,
    ) -> Result<(), ChunkError> {
        let text = slice(content, section.span.clone())?;
        if text.chars().count() <= self.max_chunk_size {
            out.push(section);
            return Ok(());
        }

        let base = section.span.start;
        for paragraph in paragraphs(text) {
            let paragraph = base + paragraph.start..base + paragraph.end;
            if slice(content, paragraph.clone())?.chars().count() <= self.max_chunk_size {
                out.push(piece(&section.heading, paragraph));
                continue;
            }
            for window in self.windows(content, paragraph)? {
                out.push(piece(&section.heading, window));
            }
        }
        Ok(())
    }

    /// Slices a paragraph into overlapping windows, as byte ranges into the content.
    fn windows(&self, content: &str, paragraph: Range<usize>) -> Result<Vec<Range<usize>>, ChunkError> {
        let text = slice(content, paragraph.clone())?;
        let mut boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| paragraph.start + i)
            .collect();
        boundaries.push(paragraph.end);
        let char_count = boundaries.len() - 1;

        Ok(window_spans(char_count, self.max_chunk_size, self.stride())
            .into_iter()
            .map(|w| boundaries[w.start]..boundaries[w.end])
            .collect())
    }
}

/// Computes sliding windows over `len` characters as character-index ranges.
///
/// Every window is at most `window` long, consecutive windows start `stride` apart, and the
/// last window ends exactly at `len`.
pub(crate) fn window_spans(len: usize, window: usize, stride: usize) -> Vec<Range<usize>> {
    let window = window.max(1);
    let stride = stride.max(1);
    let mut spans = Vec::new();
    if len == 0 {
        return spans;
    }
    let mut start = 0;
    loop {
        let end = (start + window).min(len);
        spans.push(start..end);
        if end == len {
            break;
        }
        start += stride;
    }
    spans
}

/// Builds a piece.
fn piece(heading: &str, span: Range<usize>) -> Piece {
    Piece {
        heading: heading.to_string(),
        span,
    }
}

/// Returns the checked slice `content[span]`.
fn slice(content: &str, span: Range<usize>) -> Result<&str, ChunkError> {
    let (start, end) = (span.start, span.end);
    content.get(span).ok_or(ChunkError::InvalidSpan {
        start,
        end,
        len: content.len(),
    })
}

/// The whole trimmed content as a single chunk headed by the title.
fn whole_content(content: &str, title: &str) -> Option<ChunkDraft> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }
    let start = content.len() - content.trim_start().len();
    Some(ChunkDraft {
        heading: title.to_string(),
        content: trimmed.to_string(),
        start,
        end: start + trimmed.len(),
    })
}

/// Splits content into sections at markdown headings.
fn sections(content: &str) -> Vec<Piece> {
    let headings = extract_headings(content);
    let Some(first) = headings.first() else {
        return vec![piece("", 0..content.len())];
    };

    let mut sections = Vec::with_capacity(headings.len() + 1);
    if content
        .get(..first.start)
        .is_some_and(|lead| !lead.trim().is_empty())
    {
        sections.push(piece("", 0..first.start));
    }
    for (i, heading) in headings.iter().enumerate() {
        let end = headings
            .get(i + 1)
            .map(|h| h.start)
            .unwrap_or(content.len());
        sections.push(piece(&heading.text, heading.start..end));
    }
    sections
}

/// Extracts markdown headings with their start offsets. Headings in code blocks are ignored.
fn extract_headings(content: &str) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut current: Option<(usize, String)> = None;

    for (event, range) in Parser::new(content).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                current = Some((range.start, String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, ref mut heading_text)) = current {
                    heading_text.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((start, text)) = current.take() {
                    headings.push(Heading {
                        text: text.trim().to_string(),
                        start,
                    });
                }
            }
            _ => {}
        }
    }

    headings
}

/// Returns the text of the first markdown heading, if any.
pub(crate) fn first_heading(content: &str) -> Option<String> {
    extract_headings(content)
        .into_iter()
        .map(|h| h.text)
        .find(|text| !text.is_empty())
}

/// Splits text on blank-line (`\n\n`) boundaries into byte ranges relative to `text`.
fn paragraphs(text: &str) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, sep) in text.match_indices("\n\n") {
        if i > start {
            out.push(start..i);
        }
        start = i + sep.len();
    }
    if start < text.len() {
        out.push(start..text.len());
    }
    out
}
