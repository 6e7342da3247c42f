//! Knowledge items and their chunks.

use std::{fmt, path::Path, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{ChunkDraft, DocumentError};

/// Kind of source an item was ingested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Markdown document.
    Markdown,
    /// Plain text.
    #[default]
    Text,
    /// PDF document.
    Pdf,
    /// Word document.
    Word,
    /// Source code.
    Code,
    /// Web page.
    Web,
    /// Anything else.
    Other,
}

impl SourceType {
    /// All source types, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Markdown,
        Self::Text,
        Self::Pdf,
        Self::Word,
        Self::Code,
        Self::Web,
        Self::Other,
    ];

    /// Returns the lowercase tag used in storage and filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Text => "text",
            Self::Pdf => "pdf",
            Self::Word => "word",
            Self::Code => "code",
            Self::Web => "web",
            Self::Other => "other",
        }
    }

    /// Guesses the source type from a file extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("md" | "markdown" | "mdx") => Self::Markdown,
            Some("txt" | "text" | "rst" | "org") => Self::Text,
            Some("pdf") => Self::Pdf,
            Some("doc" | "docx" | "odt") => Self::Word,
            Some("html" | "htm") => Self::Web,
            Some("rs" | "py" | "js" | "ts" | "go" | "java" | "c" | "h" | "cpp" | "rb") => {
                Self::Code
            }
            _ => Self::Other,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown source type: {s}"))
    }
}

/// A document-level unit of knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    /// Immutable identity.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Full text.
    pub content: String,
    /// Kind of source the item came from.
    pub source_type: SourceType,
    /// Where the item came from (file path, URL, ...).
    #[serde(default)]
    pub source_path: String,
    /// Category ids.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Tag ids.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Optional dense embedding. Not used by search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl KnowledgeItem {
    /// Creates an item with a freshly generated id.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        source_type: SourceType,
    ) -> Result<Self, DocumentError> {
        Self::with_id(Uuid::new_v4().to_string(), title, content, source_type)
    }

    /// Creates an item with a caller-supplied id.
    pub fn with_id(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        source_type: SourceType,
    ) -> Result<Self, DocumentError> {
        let now = Utc::now();
        let item = Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            source_type,
            source_path: String::new(),
            categories: Vec::new(),
            tags: Vec::new(),
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
            embedding: None,
        };
        item.validate()?;
        Ok(item)
    }

    /// Sets the source path.
    pub fn with_source_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = path.into();
        self
    }

    /// Sets the categories.
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = dedup_ids(categories);
        self
    }

    /// Sets the tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = dedup_ids(tags);
        self
    }

    /// Checks that `id`, `title` and `content` are non-empty.
    pub fn validate(&self) -> Result<(), DocumentError> {
        for (field, value) in [
            ("id", &self.id),
            ("title", &self.title),
            ("content", &self.content),
        ] {
            if value.trim().is_empty() {
                return Err(DocumentError::EmptyField { field });
            }
        }
        Ok(())
    }

    /// Applies a partial update in place and refreshes `updated_at`.
    ///
    /// Returns whether the content changed, in which case chunks must be rebuilt. The item is
    /// left untouched if the patch would violate the non-empty invariants.
    pub fn apply_patch(&mut self, patch: ItemPatch) -> Result<bool, DocumentError> {
        let mut updated = self.clone();
        let mut content_changed = false;

        if let Some(title) = patch.title {
            updated.title = title;
        }
        if let Some(content) = patch.content {
            content_changed = content != updated.content;
            updated.content = content;
        }
        if let Some(categories) = patch.categories {
            updated.categories = dedup_ids(categories);
        }
        if let Some(tags) = patch.tags {
            updated.tags = dedup_ids(tags);
        }

        updated.validate()?;
        updated.updated_at = Utc::now();
        *self = updated;
        Ok(content_changed)
    }

    /// Text used for keyword and semantic indexing: title followed by content.
    pub fn index_text(&self) -> String {
        format!("{}\n{}", self.title, self.content)
    }
}

/// A partial update to a [`KnowledgeItem`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    /// New title.
    pub title: Option<String>,
    /// New content.
    pub content: Option<String>,
    /// Replacement categories.
    pub categories: Option<Vec<String>>,
    /// Replacement tags.
    pub tags: Option<Vec<String>>,
}

impl ItemPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.categories.is_none()
            && self.tags.is_none()
    }
}

/// A contiguous piece of an item's content, the unit of fine-grained retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Globally unique id: `{item_id}#{chunk_index}`.
    pub id: String,
    /// Owning item.
    pub item_id: String,
    /// Position within the item, dense from 0.
    pub chunk_index: usize,
    /// Chunk text.
    pub content: String,
    /// Nearest enclosing section title; may be empty.
    #[serde(default)]
    pub heading: String,
    /// Byte offset of the chunk start in the item content.
    pub start_position: usize,
    /// Byte offset of the chunk end in the item content.
    pub end_position: usize,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl KnowledgeChunk {
    /// Formats the id of the chunk at `chunk_index` in `item_id`.
    pub fn chunk_id(item_id: &str, chunk_index: usize) -> String {
        format!("{item_id}#{chunk_index}")
    }

    /// Turns chunker output into chunks owned by `item_id`, indexed `0..N`.
    pub fn from_drafts(item_id: &str, drafts: Vec<ChunkDraft>) -> Vec<Self> {
        drafts
            .into_iter()
            .enumerate()
            .map(|(chunk_index, draft)| Self {
                id: Self::chunk_id(item_id, chunk_index),
                item_id: item_id.to_string(),
                chunk_index,
                content: draft.content,
                heading: draft.heading,
                start_position: draft.start,
                end_position: draft.end,
                metadata: Map::new(),
            })
            .collect()
    }

    /// Text used for keyword and semantic indexing: heading followed by content.
    pub fn index_text(&self) -> String {
        if self.heading.is_empty() {
            self.content.clone()
        } else {
            format!("{}\n{}", self.heading, self.content)
        }
    }
}

/// Removes empty and duplicate ids, preserving first-seen order.
fn dedup_ids<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for id in ids {
        let id = id.into();
        if !id.is_empty() && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn item() -> KnowledgeItem {
        KnowledgeItem::with_id("doc-1", "Title", "Some content", SourceType::Markdown).unwrap()
    }

    #[test]
    fn rejects_empty_fields() {
        let err = KnowledgeItem::new("  ", "content", SourceType::Text).unwrap_err();
        assert!(matches!(err, DocumentError::EmptyField { field: "title" }));

        let err = KnowledgeItem::with_id("", "t", "c", SourceType::Text).unwrap_err();
        assert!(matches!(err, DocumentError::EmptyField { field: "id" }));

        let err = KnowledgeItem::new("t", "", SourceType::Text).unwrap_err();
        assert!(matches!(err, DocumentError::EmptyField { field: "content" }));
    }

    #[test]
    fn new_generates_unique_ids() {
        let a = KnowledgeItem::new("a", "b", SourceType::Text).unwrap();
        let b = KnowledgeItem::new("a", "b", SourceType::Text).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn tags_and_categories_are_deduplicated() {
        let item = item()
            .with_tags(["rust", "search", "rust", ""])
            .with_categories(["notes"]);
        assert_eq!(item.tags, vec!["rust", "search"]);
        assert_eq!(item.categories, vec!["notes"]);
    }

    #[test]
    fn apply_patch_reports_content_change() {
        let mut item = item();
        let before = item.updated_at;

        let changed = item
            .apply_patch(ItemPatch {
                title: Some("New".into()),
                ..Default::default()
            })
            .unwrap();
        assert!(!changed);
        assert_eq!(item.title, "New");
        assert!(item.updated_at >= before);

        let changed = item
            .apply_patch(ItemPatch {
                content: Some("Different".into()),
                ..Default::default()
            })
            .unwrap();
        assert!(changed);
    }

    #[test]
    fn apply_patch_rejects_empty_content_without_mutating() {
        let mut item = item();
        let err = item
            .apply_patch(ItemPatch {
                title: Some("Changed".into()),
                content: Some(String::new()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, DocumentError::EmptyField { field: "content" }));
        assert_eq!(item.title, "Title");
    }

    #[test]
    fn chunks_from_drafts_are_dense() {
        let drafts = vec![
            ChunkDraft {
                heading: "A".into(),
                content: "one".into(),
                start: 0,
                end: 3,
            },
            ChunkDraft {
                heading: String::new(),
                content: "two".into(),
                start: 5,
                end: 8,
            },
        ];
        let chunks = KnowledgeChunk::from_drafts("doc-1", drafts);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "doc-1#0");
        assert_eq!(chunks[1].chunk_index, 1);
        assert_eq!(chunks[1].item_id, "doc-1");
        assert_eq!(chunks[1].index_text(), "two");
        assert_eq!(chunks[0].index_text(), "A\none");
    }

    #[test]
    fn source_type_parsing() {
        assert_eq!(
            SourceType::from_path(Path::new("notes/a.MD")),
            SourceType::Markdown
        );
        assert_eq!(SourceType::from_path(Path::new("a.txt")), SourceType::Text);
        assert_eq!(SourceType::from_path(Path::new("a")), SourceType::Other);
        assert_eq!("PDF".parse::<SourceType>().unwrap(), SourceType::Pdf);
        assert!("spreadsheet".parse::<SourceType>().is_err());
    }

    #[test]
    fn item_serializes_source_type_lowercase() {
        let json = serde_json::to_value(item()).unwrap();
        assert_eq!(json["source_type"], "markdown");
        assert!(json.get("embedding").is_none());
    }
}
