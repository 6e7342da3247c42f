//! Schema shared by the document and chunk indexes.
//!
//! - `id`: item or chunk id (string, stored)
//! - `owner`: owning item id, equal to `id` for documents (string)
//! - `title`: item title or chunk heading (text, boosted 2.0x)
//! - `content`: body text (text)
//! - `vocabulary`: unstemmed words of title and content, for suggestions (text)
//! - `payload`: the entity serialized as JSON (stored only)

use tantivy::schema::{
    Field, IndexRecordOption, STORED, STRING, Schema, TextFieldIndexing, TextOptions,
};

use crate::analyzer::{KB_TOKENIZER, VOCABULARY_TOKENIZER};

/// Field boost weights for keyword ranking.
pub mod boost {
    /// Title or heading field boost (2.0x).
    pub const TITLE: f32 = 2.0;
    /// Content field boost (1.0x).
    pub const CONTENT: f32 = 1.0;
}

/// Handles to all fields in the keyword schema.
#[derive(Debug, Clone)]
pub struct KeywordSchema {
    /// The underlying Tantivy schema.
    schema: Schema,
    /// Entity id.
    pub id: Field,
    /// Owning item id.
    pub owner: Field,
    /// Item title or chunk heading.
    pub title: Field,
    /// Body text.
    pub content: Field,
    /// Unstemmed vocabulary.
    pub vocabulary: Field,
    /// JSON-serialized entity.
    pub payload: Field,
}

impl KeywordSchema {
    /// Creates the schema with all fields configured.
    pub fn new() -> Self {
        let mut builder = Schema::builder();

        let id = builder.add_text_field("id", STRING | STORED);
        let owner = builder.add_text_field("owner", STRING);

        let text_options = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(KB_TOKENIZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );
        let title = builder.add_text_field("title", text_options.clone());
        let content = builder.add_text_field("content", text_options);

        let vocabulary_options = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(VOCABULARY_TOKENIZER)
                .set_index_option(IndexRecordOption::Basic),
        );
        let vocabulary = builder.add_text_field("vocabulary", vocabulary_options);

        let payload = builder.add_text_field("payload", STORED);

        Self {
            schema: builder.build(),
            id,
            owner,
            title,
            content,
            vocabulary,
            payload,
        }
    }

    /// Returns a reference to the underlying Tantivy schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl Default for KeywordSchema {
    fn default() -> Self {
        Self::new()
    }
}
