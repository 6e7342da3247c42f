//! Knowledge items, chunking, and extraction for kb.
//!
//! This crate holds the data model shared by the index and search crates:
//! - [`KnowledgeItem`] and [`KnowledgeChunk`], with validation and partial updates
//! - The [`Chunker`], which splits content at headings, paragraphs and sliding windows
//! - [`Extractor`]s that turn markdown and text files into items

#![warn(missing_docs)]

mod chunker;
mod error;
mod extract;
mod frontmatter;
mod item;

pub use chunker::{ChunkDraft, Chunker};
pub use error::DocumentError;
pub use extract::{
    Extracted, Extractor, MarkdownExtractor, TextExtractor, extractor_for, load_item,
};
pub use frontmatter::{Frontmatter, parse_frontmatter};
pub use item::{ItemPatch, KnowledgeChunk, KnowledgeItem, SourceType};

/// Chunks an item with `chunker` and assigns the chunks to it.
pub fn chunk_item(chunker: &Chunker, item: &KnowledgeItem) -> Vec<KnowledgeChunk> {
    KnowledgeChunk::from_drafts(&item.id, chunker.chunk(&item.content, &item.title))
}
