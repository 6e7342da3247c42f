//! Sparse semantic search for kb.
//!
//! Documents and chunks are embedded as TF-IDF vectors and compared with cosine similarity.
//! There are no dense embeddings: the "semantic" layer rewards shared vocabulary weighted by
//! how distinctive it is across the corpus.

#![warn(missing_docs)]

mod chunk;
mod index;
mod stopwords;
mod vectorizer;

pub use chunk::ChunkSemanticIndex;
pub use index::{SemanticEntity, SemanticIndex};
pub use stopwords::Stopwords;
pub use vectorizer::{
    FittedCorpus, SparseVector, TfIdfModel, TfIdfVectorizer, VectorizerSettings, cosine,
};

/// Document-granularity semantic index.
pub type DocumentSemanticIndex = SemanticIndex<kb_document::KnowledgeItem>;
