//! Shared Tantivy core of the document and chunk indexes.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
    str,
    sync::Arc,
};

use parking_lot::Mutex;
use tantivy::{
    Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, TantivyError, Term,
    collector::TopDocs,
    directory::MmapDirectory,
    query::{BooleanQuery, BoostQuery, Occur, Query, QueryParser, RegexQuery, TermQuery},
    schema::{Field, IndexRecordOption, Value},
    tokenizer::TextAnalyzer,
};
use tracing::{debug, info, warn};

use crate::{
    IndexError, Segmenter,
    analyzer::{
        KB_TOKENIZER, VOCABULARY_TOKENIZER, analyze, build_analyzer_from_name,
        build_vocabulary_analyzer,
    },
    query_terms,
    schema::{KeywordSchema, boost},
};

/// Heap size for the index writer (50 MB).
const DEFAULT_HEAP_SIZE: usize = 50_000_000;

/// A row to be written to a keyword index.
#[derive(Debug, Clone)]
pub(crate) struct IndexEntry {
    /// Entity id.
    pub id: String,
    /// Owning item id.
    pub owner: String,
    /// Title or heading.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Whether to fill the vocabulary field.
    pub vocabulary: bool,
    /// JSON-serialized entity.
    pub payload: String,
}

/// A staged change inside one commit.
#[derive(Debug)]
pub(crate) enum Change<'a> {
    /// Delete the entity with this id.
    DeleteId(&'a str),
    /// Delete every entity owned by this item.
    DeleteOwner(&'a str),
    /// Delete everything.
    DeleteAll,
    /// Add an entry.
    Add(IndexEntry),
}

/// A Tantivy index with one serialized writer and a manually reloaded reader.
pub(crate) struct KeywordIndex {
    /// Index directory.
    path: PathBuf,
    /// The Tantivy index.
    index: Index,
    /// Reader, reloaded after each commit.
    reader: IndexReader,
    /// The single writer; the lock makes every change set one atomic commit.
    writer: Mutex<IndexWriter>,
    /// Schema with field handles.
    schema: KeywordSchema,
    /// Stemming analyzer used to turn query terms into index tokens.
    analyzer: TextAnalyzer,
    /// Optional CJK segmenter.
    segmenter: Option<Arc<dyn Segmenter>>,
}

impl KeywordIndex {
    /// Opens or creates an index at `path`.
    pub fn open(path: &Path, language: &str) -> Result<Self, IndexError> {
        let schema = KeywordSchema::new();
        fs::create_dir_all(path)?;

        let dir = MmapDirectory::open(path).map_err(|e| {
            let err: TantivyError = e.into();
            IndexError::open_index(path.to_path_buf(), &err)
        })?;
        let index = Index::open_or_create(dir, schema.schema().clone())
            .map_err(|e| IndexError::open_index(path.to_path_buf(), &e))?;

        let analyzer = build_analyzer_from_name(language)?;
        index.tokenizers().register(KB_TOKENIZER, analyzer.clone());
        index
            .tokenizers()
            .register(VOCABULARY_TOKENIZER, build_vocabulary_analyzer());

        let writer = index
            .writer_with_num_threads(1, DEFAULT_HEAP_SIZE)
            .map_err(|e| IndexError::open_index(path.to_path_buf(), &e))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| IndexError::open_index(path.to_path_buf(), &e))?;

        info!(path = %path.display(), "opened keyword index");
        Ok(Self {
            path: path.to_path_buf(),
            index,
            reader,
            writer: Mutex::new(writer),
            schema,
            analyzer,
            segmenter: None,
        })
    }

    /// Sets the CJK segmenter used for query term extraction.
    pub fn set_segmenter(&mut self, segmenter: Arc<dyn Segmenter>) {
        self.segmenter = Some(segmenter);
    }

    /// Index directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `changes` as a single commit, rolling back on any failure.
    pub fn apply(&self, changes: Vec<Change<'_>>) -> Result<(), IndexError> {
        let mut writer = self.writer.lock();
        let staged = changes
            .into_iter()
            .try_for_each(|change| self.stage(&writer, change));

        let result = staged.and_then(|()| {
            writer
                .commit()
                .map(|_| ())
                .map_err(|e| IndexError::commit(&e))
        });
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "index write failed, rolling back");
            if let Err(rollback) = writer.rollback() {
                warn!(error = %rollback, "index rollback failed");
            }
            return Err(e);
        }

        self.reader.reload().map_err(|e| IndexError::read(&e))?;
        Ok(())
    }

    /// Stages one change on the writer.
    fn stage(&self, writer: &IndexWriter, change: Change<'_>) -> Result<(), IndexError> {
        match change {
            Change::DeleteId(id) => {
                writer.delete_term(Term::from_field_text(self.schema.id, id));
            }
            Change::DeleteOwner(owner) => {
                writer.delete_term(Term::from_field_text(self.schema.owner, owner));
            }
            Change::DeleteAll => {
                writer
                    .delete_all_documents()
                    .map_err(|e| IndexError::write(&e))?;
            }
            Change::Add(entry) => {
                writer
                    .add_document(self.document(&entry))
                    .map_err(|e| IndexError::write(&e))?;
            }
        }
        Ok(())
    }

    /// Converts an entry to a Tantivy document.
    fn document(&self, entry: &IndexEntry) -> TantivyDocument {
        let mut doc = TantivyDocument::new();
        doc.add_text(self.schema.id, &entry.id);
        doc.add_text(self.schema.owner, &entry.owner);
        doc.add_text(self.schema.title, &entry.title);
        doc.add_text(self.schema.content, &entry.content);
        if entry.vocabulary {
            doc.add_text(self.schema.vocabulary, &entry.title);
            doc.add_text(self.schema.vocabulary, &entry.content);
        }
        doc.add_text(self.schema.payload, &entry.payload);
        doc
    }

    /// Runs a keyword query and returns stored payloads with raw scores.
    ///
    /// Failures are logged and yield no hits.
    pub fn search(&self, query: &str, limit: usize) -> Vec<(String, f32)> {
        if limit == 0 {
            return Vec::new();
        }
        let Some(query) = self.build_query(query) else {
            return Vec::new();
        };

        let searcher = self.reader.searcher();
        let top_docs = match searcher.search(&query, &TopDocs::with_limit(limit)) {
            Ok(top_docs) => top_docs,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "keyword search failed");
                return Vec::new();
            }
        };

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            match searcher.doc::<TantivyDocument>(address) {
                Ok(doc) => {
                    if let Some(payload) = doc.get_first(self.schema.payload).and_then(|v| v.as_str()) {
                        hits.push((payload.to_string(), score));
                    }
                }
                Err(e) => warn!(error = %e, "failed to fetch indexed document"),
            }
        }
        hits
    }

    /// Builds the OR query over title and content for `query`.
    ///
    /// Each token matches exactly or as a substring of an indexed token. Falls back to
    /// Tantivy's query parser when no token survives analysis or a pattern fails to build.
    fn build_query(&self, query: &str) -> Option<Box<dyn Query>> {
        let terms = query_terms(query, self.segmenter.as_deref());
        if terms.is_empty() {
            return None;
        }

        let mut analyzer = self.analyzer.clone();
        let mut tokens: Vec<String> = Vec::new();
        for term in &terms {
            for token in analyze(&mut analyzer, term) {
                if !tokens.contains(&token) {
                    tokens.push(token);
                }
            }
        }

        match self.expanded_query(&tokens) {
            Ok(Some(query)) => Some(query),
            Ok(None) => self.parsed_query(query),
            Err(e) => {
                debug!(error = %e, "substring expansion failed, using query parser");
                self.parsed_query(query)
            }
        }
    }

    /// Builds `Should(TermQuery, RegexQuery)` clauses per token and field.
    fn expanded_query(&self, tokens: &[String]) -> Result<Option<Box<dyn Query>>, TantivyError> {
        let fields = [
            (self.schema.title, boost::TITLE),
            (self.schema.content, boost::CONTENT),
        ];
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for token in tokens {
            for (field, weight) in fields {
                clauses.push((Occur::Should, boosted(term_query(field, token), weight)));
                // Analyzed tokens are alphanumeric, so they need no regex escaping.
                let pattern = format!(".*{token}.*");
                let regex = RegexQuery::from_pattern(&pattern, field)?;
                clauses.push((Occur::Should, boosted(Box::new(regex), weight)));
            }
        }
        if clauses.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(BooleanQuery::new(clauses))))
    }

    /// Parses the raw query with Tantivy's lenient query parser.
    fn parsed_query(&self, query: &str) -> Option<Box<dyn Query>> {
        let mut parser =
            QueryParser::for_index(&self.index, vec![self.schema.title, self.schema.content]);
        parser.set_field_boost(self.schema.title, boost::TITLE);
        let (query, errors) = parser.parse_query_lenient(query);
        if !errors.is_empty() {
            debug!(errors = errors.len(), "query parser recovered from errors");
        }
        Some(query)
    }

    /// Vocabulary terms starting with `prefix`, in lexicographic order.
    pub fn vocabulary_prefix(&self, prefix: &str, limit: usize) -> Vec<String> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() || limit == 0 {
            return Vec::new();
        }

        let searcher = self.reader.searcher();
        let mut found = BTreeSet::new();
        for segment_reader in searcher.segment_readers() {
            let inverted_index = match segment_reader.inverted_index(self.schema.vocabulary) {
                Ok(inverted_index) => inverted_index,
                Err(e) => {
                    warn!(error = %e, "failed to read vocabulary");
                    continue;
                }
            };
            let mut stream = match inverted_index
                .terms()
                .range()
                .ge(prefix.as_bytes())
                .into_stream()
            {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(error = %e, "failed to stream vocabulary");
                    continue;
                }
            };
            let mut taken = 0;
            while taken < limit && stream.advance() {
                let Ok(term) = str::from_utf8(stream.key()) else {
                    continue;
                };
                if !term.starts_with(&prefix) {
                    break;
                }
                found.insert(term.to_string());
                taken += 1;
            }
        }
        found.into_iter().take(limit).collect()
    }

    /// Number of committed, live documents.
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}

/// An exact term query on `field`.
fn term_query(field: Field, token: &str) -> Box<dyn Query> {
    Box::new(TermQuery::new(
        Term::from_field_text(field, token),
        IndexRecordOption::WithFreqs,
    ))
}

/// Wraps a query in a boost unless the weight is neutral.
fn boosted(query: Box<dyn Query>, weight: f32) -> Box<dyn Query> {
    if (weight - 1.0).abs() < f32::EPSILON {
        query
    } else {
        Box::new(BoostQuery::new(query, weight))
    }
}

#[cfg(test)]
mod test {
    use tempfile::TempDir;

    use super::*;

    fn entry(id: &str, owner: &str, title: &str, content: &str) -> IndexEntry {
        IndexEntry {
            id: id.into(),
            owner: owner.into(),
            title: title.into(),
            content: content.into(),
            vocabulary: true,
            payload: id.into(),
        }
    }

    fn index_with(entries: Vec<IndexEntry>) -> (TempDir, KeywordIndex) {
        let temp = TempDir::new().unwrap();
        let index = KeywordIndex::open(temp.path(), "english").unwrap();
        index
            .apply(entries.into_iter().map(Change::Add).collect())
            .unwrap();
        (temp, index)
    }

    fn ids(hits: &[(String, f32)]) -> Vec<&str> {
        hits.iter().map(|(p, _)| p.as_str()).collect()
    }

    #[test]
    fn search_is_case_insensitive_and_stemmed() {
        let (_temp, index) = index_with(vec![
            entry("a", "a", "Machine Learning", "Models learn from data."),
            entry("b", "b", "Cooking", "Boil the pasta."),
        ]);
        assert_eq!(ids(&index.search("MACHINE", 10)), vec!["a"]);
        assert_eq!(ids(&index.search("learned", 10)), vec!["a"]);
        assert!(index.search("quantum", 10).is_empty());
    }

    #[test]
    fn search_matches_substrings() {
        let (_temp, index) = index_with(vec![entry("a", "a", "Notes", "tensorflow tutorial")]);
        assert_eq!(ids(&index.search("flow", 10)), vec!["a"]);
    }

    #[test]
    fn search_is_or_across_tokens() {
        let (_temp, index) = index_with(vec![
            entry("a", "a", "Rust", "ownership"),
            entry("b", "b", "Python", "indentation"),
        ]);
        let hits = index.search("rust python", 10);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn title_matches_rank_higher() {
        let (_temp, index) = index_with(vec![
            entry("body", "body", "Other", "gradient descent"),
            entry("title", "title", "Gradient", "other text"),
        ]);
        let hits = index.search("gradient", 10);
        assert_eq!(ids(&hits)[0], "title");
    }

    #[test]
    fn cjk_queries_match_without_spaces() {
        let (_temp, index) = index_with(vec![entry("zh", "zh", "笔记", "机器学习的基础知识")]);
        assert_eq!(ids(&index.search("机器学习", 10)), vec!["zh"]);
    }

    #[test]
    fn punctuation_only_query_falls_back() {
        let (_temp, index) = index_with(vec![entry("a", "a", "Title", "content")]);
        assert!(index.search("!!!", 10).is_empty());
        assert!(index.search("", 10).is_empty());
    }

    #[test]
    fn deletes_by_id_and_owner() {
        let (_temp, index) = index_with(vec![
            entry("x#0", "x", "", "alpha"),
            entry("x#1", "x", "", "alpha"),
            entry("y#0", "y", "", "alpha"),
        ]);
        assert_eq!(index.num_docs(), 3);

        index.apply(vec![Change::DeleteId("y#0")]).unwrap();
        assert_eq!(index.num_docs(), 2);

        index.apply(vec![Change::DeleteOwner("x")]).unwrap();
        assert_eq!(index.num_docs(), 0);
    }

    #[test]
    fn delete_all_then_add_in_one_commit() {
        let (_temp, index) = index_with(vec![entry("a", "a", "A", "alpha")]);
        index
            .apply(vec![Change::DeleteAll, Change::Add(entry("b", "b", "B", "beta"))])
            .unwrap();
        assert_eq!(index.num_docs(), 1);
        assert_eq!(ids(&index.search("beta", 10)), vec!["b"]);
    }

    #[test]
    fn vocabulary_prefix_is_unstemmed() {
        let (_temp, index) = index_with(vec![
            entry("a", "a", "Machine Learning", "machinery and machines"),
            entry("b", "b", "Macros", "learning rust"),
        ]);
        assert_eq!(
            index.vocabulary_prefix("mach", 10),
            vec!["machine", "machinery", "machines"]
        );
        assert_eq!(index.vocabulary_prefix("MAC", 2), vec!["machine", "machinery"]);
        assert!(index.vocabulary_prefix("zz", 10).is_empty());
    }

    #[test]
    fn reopen_sees_committed_documents() {
        let temp = TempDir::new().unwrap();
        {
            let index = KeywordIndex::open(temp.path(), "english").unwrap();
            index
                .apply(vec![Change::Add(entry("a", "a", "Persisted", "text"))])
                .unwrap();
        }
        let index = KeywordIndex::open(temp.path(), "english").unwrap();
        assert_eq!(index.num_docs(), 1);
    }

    #[test]
    fn invalid_language_fails_to_open() {
        let temp = TempDir::new().unwrap();
        let err = KeywordIndex::open(temp.path(), "klingon").err().unwrap();
        assert!(matches!(err, IndexError::InvalidLanguage(_)));
    }
}
