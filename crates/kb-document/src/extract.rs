//! Content extraction from files.
//!
//! Each supported [`SourceType`] has an [`Extractor`]; [`extractor_for`] picks one and
//! [`load_item`] runs the whole read, validate, extract sequence for a file.

use std::{fs, path::Path};

use serde_json::{Map, Value};

use crate::{DocumentError, KnowledgeItem, SourceType, chunker::first_heading, parse_frontmatter};

/// Text and metadata pulled out of a source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    /// Title, if the source names one.
    pub title: Option<String>,
    /// Body text.
    pub content: String,
    /// Tag ids found in the source.
    pub tags: Vec<String>,
    /// Category ids found in the source.
    pub categories: Vec<String>,
}

/// Turns raw file text into item content for one [`SourceType`].
pub trait Extractor: Send + Sync {
    /// The source type this extractor handles.
    fn source_type(&self) -> SourceType;

    /// Checks that `path` can be handled by this extractor.
    fn validate(&self, path: &Path) -> Result<(), DocumentError> {
        if SourceType::from_path(path) == self.source_type() {
            Ok(())
        } else {
            Err(DocumentError::UnsupportedFileType {
                path: path.to_path_buf(),
            })
        }
    }

    /// Extracts title, body and classification from raw text.
    fn extract(&self, raw: &str) -> Extracted;

    /// Derives descriptive metadata from raw text.
    fn metadata(&self, raw: &str) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("word_count".into(), raw.split_whitespace().count().into());
        metadata.insert("line_count".into(), raw.lines().count().into());
        metadata
    }
}

/// Markdown files, with optional YAML frontmatter.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownExtractor;

impl Extractor for MarkdownExtractor {
    fn source_type(&self) -> SourceType {
        SourceType::Markdown
    }

    fn extract(&self, raw: &str) -> Extracted {
        let (frontmatter, body) = parse_frontmatter(raw);
        let frontmatter = frontmatter.unwrap_or_default();
        let title = frontmatter
            .title
            .filter(|t| !t.trim().is_empty())
            .or_else(|| first_heading(body));
        Extracted {
            title,
            content: body.to_string(),
            tags: frontmatter.tags,
            categories: frontmatter.categories,
        }
    }

    fn metadata(&self, raw: &str) -> Map<String, Value> {
        let (frontmatter, body) = parse_frontmatter(raw);
        let mut metadata = Map::new();
        metadata.insert("word_count".into(), body.split_whitespace().count().into());
        metadata.insert("line_count".into(), body.lines().count().into());
        metadata.insert("has_frontmatter".into(), frontmatter.is_some().into());
        metadata
    }
}

/// Plain text files, taken verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextExtractor;

impl Extractor for TextExtractor {
    fn source_type(&self) -> SourceType {
        SourceType::Text
    }

    fn extract(&self, raw: &str) -> Extracted {
        Extracted {
            content: raw.trim_start_matches('\u{feff}').to_string(),
            ..Default::default()
        }
    }
}

/// Returns the extractor for a source type, if one exists.
pub fn extractor_for(source_type: SourceType) -> Option<Box<dyn Extractor>> {
    match source_type {
        SourceType::Markdown => Some(Box::new(MarkdownExtractor)),
        SourceType::Text => Some(Box::new(TextExtractor)),
        SourceType::Pdf
        | SourceType::Word
        | SourceType::Code
        | SourceType::Web
        | SourceType::Other => None,
    }
}

/// Reads a file and builds a [`KnowledgeItem`] from it.
///
/// The title comes from frontmatter, then the first heading, then the file stem.
pub fn load_item(path: &Path) -> Result<KnowledgeItem, DocumentError> {
    let source_type = SourceType::from_path(path);
    let extractor = extractor_for(source_type).ok_or_else(|| DocumentError::UnsupportedFileType {
        path: path.to_path_buf(),
    })?;
    extractor.validate(path)?;

    let raw = fs::read_to_string(path).map_err(|source| DocumentError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let extracted = extractor.extract(&raw);
    let title = extracted.title.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    });

    let mut item = KnowledgeItem::new(title, extracted.content, source_type)?
        .with_source_path(path.display().to_string())
        .with_tags(extracted.tags)
        .with_categories(extracted.categories);
    item.metadata = extractor.metadata(&raw);
    Ok(item)
}

#[cfg(test)]
mod test {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn markdown_title_from_frontmatter() {
        let extracted = MarkdownExtractor.extract("---\ntitle: FM Title\ntags: [a]\n---\n# Heading\n\nBody");
        assert_eq!(extracted.title.as_deref(), Some("FM Title"));
        assert_eq!(extracted.tags, vec!["a"]);
        assert_eq!(extracted.content, "# Heading\n\nBody");
    }

    #[test]
    fn markdown_title_from_first_heading() {
        let extracted = MarkdownExtractor.extract("Intro\n\n## Setup Guide\n\nBody\n\n# Later");
        assert_eq!(extracted.title.as_deref(), Some("Setup Guide"));
    }

    #[test]
    fn text_has_no_title() {
        let extracted = TextExtractor.extract("# not markdown");
        assert!(extracted.title.is_none());
        assert_eq!(extracted.content, "# not markdown");
    }

    #[test]
    fn extractor_selection() {
        assert!(extractor_for(SourceType::Markdown).is_some());
        assert!(extractor_for(SourceType::Text).is_some());
        assert!(extractor_for(SourceType::Pdf).is_none());
    }

    #[test]
    fn validate_rejects_wrong_extension() {
        let err = TextExtractor.validate(Path::new("notes.md")).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedFileType { .. }));
        assert!(MarkdownExtractor.validate(Path::new("notes.md")).is_ok());
    }

    #[test]
    fn load_item_uses_file_stem_fallback() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meeting-notes.txt");
        fs::write(&path, "Discussed the roadmap.").unwrap();

        let item = load_item(&path).unwrap();
        assert_eq!(item.title, "meeting-notes");
        assert_eq!(item.source_type, SourceType::Text);
        assert_eq!(item.content, "Discussed the roadmap.");
        assert_eq!(item.metadata["word_count"], 3);
        assert!(item.source_path.ends_with("meeting-notes.txt"));
    }

    #[test]
    fn load_item_reads_markdown_classification() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ml.md");
        fs::write(
            &path,
            "---\ntags: [ml]\ncategories: [research]\n---\n# Machine Learning\n\nNotes.",
        )
        .unwrap();

        let item = load_item(&path).unwrap();
        assert_eq!(item.title, "Machine Learning");
        assert_eq!(item.tags, vec!["ml"]);
        assert_eq!(item.categories, vec!["research"]);
        assert_eq!(item.metadata["has_frontmatter"], true);
    }

    #[test]
    fn load_item_errors() {
        let dir = TempDir::new().unwrap();

        let pdf = dir.path().join("paper.pdf");
        fs::write(&pdf, "%PDF").unwrap();
        assert!(matches!(
            load_item(&pdf).unwrap_err(),
            DocumentError::UnsupportedFileType { .. }
        ));

        let missing = dir.path().join("missing.md");
        assert!(matches!(
            load_item(&missing).unwrap_err(),
            DocumentError::ReadFile { .. }
        ));

        let empty = dir.path().join("empty.txt");
        fs::write(&empty, "  ").unwrap();
        assert!(matches!(
            load_item(&empty).unwrap_err(),
            DocumentError::EmptyField { field: "content" }
        ));
    }
}
