//! Semantic index over a corpus of entities.
//!
//! Writers mutate the corpus under a mutex and mark it dirty; a refit builds a complete new
//! table of vectors which replaces the published one in a single swap. Searches clone the
//! published `Arc` and never observe a partially built table.

use std::{cmp::Ordering, collections::BTreeMap, sync::Arc};

use kb_document::{KnowledgeChunk, KnowledgeItem};
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::{SparseVector, TfIdfModel, TfIdfVectorizer, cosine};

/// Something the semantic index can hold.
pub trait SemanticEntity: Clone + Send + Sync {
    /// Unique key of the entity.
    fn key(&self) -> &str;

    /// Text the entity is vectorized from.
    fn text(&self) -> String;
}

impl SemanticEntity for KnowledgeItem {
    fn key(&self) -> &str {
        &self.id
    }

    fn text(&self) -> String {
        self.index_text()
    }
}

impl SemanticEntity for KnowledgeChunk {
    fn key(&self) -> &str {
        &self.id
    }

    fn text(&self) -> String {
        self.index_text()
    }
}

/// Entities to index, keyed for deterministic ordering.
#[derive(Debug)]
struct Corpus<E> {
    /// Entities by key.
    entities: BTreeMap<String, E>,
    /// Set when the corpus changed since the last fit.
    dirty: bool,
}

/// A published, immutable fit.
#[derive(Debug)]
struct Fitted<E> {
    /// Learned vocabulary and IDF.
    model: TfIdfModel,
    /// Fitted entities, parallel to `vectors`.
    entities: Vec<E>,
    /// Normalized vectors.
    vectors: Vec<SparseVector>,
    /// Position of each key in `entities`.
    positions: BTreeMap<String, usize>,
    /// Total weight of each vocabulary term across the corpus.
    term_weights: Vec<f32>,
}

/// TF-IDF + cosine similarity index over entities of type `E`.
#[derive(Debug)]
pub struct SemanticIndex<E> {
    /// Vectorizer shared by fitting and queries.
    vectorizer: TfIdfVectorizer,
    /// Current corpus; the lock serializes writers.
    corpus: Mutex<Corpus<E>>,
    /// Published fit, `None` when the corpus cannot be fitted.
    fitted: RwLock<Option<Arc<Fitted<E>>>>,
}

impl<E: SemanticEntity> Default for SemanticIndex<E> {
    fn default() -> Self {
        Self::new(TfIdfVectorizer::default())
    }
}

impl<E: SemanticEntity> SemanticIndex<E> {
    /// Creates an empty, unfitted index.
    pub fn new(vectorizer: TfIdfVectorizer) -> Self {
        Self {
            vectorizer,
            corpus: Mutex::new(Corpus {
                entities: BTreeMap::new(),
                dirty: false,
            }),
            fitted: RwLock::new(None),
        }
    }

    /// Replaces the corpus with `entities` and refits.
    pub fn fit(&self, entities: impl IntoIterator<Item = E>) {
        let mut corpus = self.corpus.lock();
        corpus.entities = entities
            .into_iter()
            .map(|e| (e.key().to_string(), e))
            .collect();
        self.refit_locked(&mut corpus);
    }

    /// Returns true if a fitted table is published.
    pub fn is_fitted(&self) -> bool {
        self.fitted.read().is_some()
    }

    /// Number of entities in the corpus.
    pub fn len(&self) -> usize {
        self.corpus.lock().entities.len()
    }

    /// Returns true if the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of terms in the fitted vocabulary.
    pub fn vocabulary_size(&self) -> usize {
        self.snapshot().map_or(0, |f| f.model.len())
    }

    /// Finds entities similar to `query`, best first.
    ///
    /// Only hits with a positive similarity of at least `min_similarity` are returned.
    pub fn search(&self, query: &str, top_k: usize, min_similarity: f32) -> Vec<(E, f32)> {
        let Some(fitted) = self.snapshot() else {
            return Vec::new();
        };
        let query = self.vectorizer.transform(&fitted.model, query);
        if query.is_empty() {
            return Vec::new();
        }
        rank(&fitted, &query, None, top_k, min_similarity)
    }

    /// Finds entities similar to `entity`, excluding the entity itself.
    ///
    /// Uses the fitted vector when the entity is part of the fit, otherwise vectorizes its text.
    pub fn find_similar(&self, entity: &E, top_k: usize, min_similarity: f32) -> Vec<(E, f32)> {
        let Some(fitted) = self.snapshot() else {
            return Vec::new();
        };
        let vector = match fitted.positions.get(entity.key()) {
            Some(&i) => fitted.vectors[i].clone(),
            None => self.vectorizer.transform(&fitted.model, &entity.text()),
        };
        if vector.is_empty() {
            return Vec::new();
        }
        rank(&fitted, &vector, Some(entity.key()), top_k, min_similarity)
    }

    /// Vocabulary terms containing `partial`, ranked by corpus weight.
    pub fn related_terms(&self, partial: &str, limit: usize) -> Vec<String> {
        let partial = partial.trim().to_lowercase();
        if partial.is_empty() {
            return Vec::new();
        }
        let Some(fitted) = self.snapshot() else {
            return Vec::new();
        };
        let mut matches: Vec<(&String, f32)> = fitted
            .model
            .terms()
            .iter()
            .zip(&fitted.term_weights)
            .filter(|(term, _)| term.contains(&partial))
            .map(|(term, &weight)| (term, weight))
            .collect();
        matches.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        matches
            .into_iter()
            .take(limit)
            .map(|(term, _)| term.clone())
            .collect()
    }

    /// Inserts or replaces an entity and refits.
    pub fn update(&self, entity: E) {
        self.update_many([entity]);
    }

    /// Removes an entity by key and refits.
    pub fn remove(&self, key: &str) {
        self.remove_many([key]);
    }

    /// Inserts or replaces several entities with a single refit.
    pub fn update_many(&self, entities: impl IntoIterator<Item = E>) {
        let mut corpus = self.corpus.lock();
        stage_updates(&mut corpus, entities);
        self.refit_locked(&mut corpus);
    }

    /// Removes several entities with a single refit.
    pub fn remove_many<'a>(&self, keys: impl IntoIterator<Item = &'a str>) {
        let mut corpus = self.corpus.lock();
        stage_removals(&mut corpus, keys);
        self.refit_locked(&mut corpus);
    }

    /// Inserts or replaces an entity without refitting.
    pub fn stage_update(&self, entity: E) {
        stage_updates(&mut self.corpus.lock(), [entity]);
    }

    /// Removes an entity without refitting.
    pub fn stage_remove(&self, key: &str) {
        stage_removals(&mut self.corpus.lock(), [key]);
    }

    /// Removes every entity matching `predicate` and refits. Returns the number removed.
    pub(crate) fn remove_where(&self, predicate: impl Fn(&E) -> bool) -> usize {
        let mut corpus = self.corpus.lock();
        let before = corpus.entities.len();
        corpus.entities.retain(|_, e| !predicate(&*e));
        let removed = before - corpus.entities.len();
        corpus.dirty |= removed > 0;
        self.refit_locked(&mut corpus);
        removed
    }

    /// Replaces every entity matching `predicate` with `entities` under one refit.
    pub(crate) fn replace_where(
        &self,
        predicate: impl Fn(&E) -> bool,
        entities: impl IntoIterator<Item = E>,
    ) {
        let mut corpus = self.corpus.lock();
        corpus.entities.retain(|_, e| !predicate(&*e));
        corpus.dirty = true;
        stage_updates(&mut corpus, entities);
        self.refit_locked(&mut corpus);
    }

    /// Refits if the corpus changed since the last fit. Returns whether a refit happened.
    pub fn refit_if_dirty(&self) -> bool {
        let mut corpus = self.corpus.lock();
        if !corpus.dirty {
            return false;
        }
        self.refit_locked(&mut corpus);
        true
    }

    /// Returns the published fit, if any.
    fn snapshot(&self) -> Option<Arc<Fitted<E>>> {
        self.fitted.read().clone()
    }

    /// Fits the locked corpus and publishes the result.
    fn refit_locked(&self, corpus: &mut Corpus<E>) {
        let entities: Vec<E> = corpus.entities.values().cloned().collect();
        let texts: Vec<String> = entities.iter().map(SemanticEntity::text).collect();

        let fitted = self.vectorizer.fit(&texts).map(|fit| {
            let mut term_weights = vec![0.0; fit.model.len()];
            for vector in &fit.vectors {
                for &(i, w) in vector {
                    term_weights[i] += w;
                }
            }
            let positions = entities
                .iter()
                .enumerate()
                .map(|(i, e)| (e.key().to_string(), i))
                .collect();
            Arc::new(Fitted {
                model: fit.model,
                entities,
                vectors: fit.vectors,
                positions,
                term_weights,
            })
        });

        debug!(
            documents = texts.len(),
            terms = fitted.as_ref().map_or(0, |f| f.model.len()),
            "semantic index refit"
        );
        *self.fitted.write() = fitted;
        corpus.dirty = false;
    }
}

/// Inserts entities into the corpus and marks it dirty.
fn stage_updates<E: SemanticEntity>(corpus: &mut Corpus<E>, entities: impl IntoIterator<Item = E>) {
    for entity in entities {
        corpus.entities.insert(entity.key().to_string(), entity);
        corpus.dirty = true;
    }
}

/// Removes keys from the corpus, marking it dirty if anything was removed.
fn stage_removals<'a, E>(corpus: &mut Corpus<E>, keys: impl IntoIterator<Item = &'a str>) {
    for key in keys {
        if corpus.entities.remove(key).is_some() {
            corpus.dirty = true;
        }
    }
}

/// Scores every fitted vector against `query`, best first.
fn rank<E: SemanticEntity>(
    fitted: &Fitted<E>,
    query: &[(usize, f32)],
    exclude: Option<&str>,
    top_k: usize,
    min_similarity: f32,
) -> Vec<(E, f32)> {
    let mut hits: Vec<(usize, f32)> = fitted
        .vectors
        .iter()
        .enumerate()
        .filter(|(i, _)| exclude != Some(fitted.entities[*i].key()))
        .map(|(i, v)| (i, cosine(query, v)))
        .filter(|&(_, s)| s > 0.0 && s >= min_similarity)
        .collect();
    hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    hits.truncate(top_k);
    hits.into_iter()
        .map(|(i, s)| (fitted.entities[i].clone(), s.min(1.0)))
        .collect()
}
