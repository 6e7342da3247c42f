//! Sparse TF-IDF vectorization.
//!
//! Text is lowercased and split into runs of two or more word characters. Stopwords are removed,
//! then unigrams and bigrams are counted. The vocabulary keeps terms that appear in at least
//! `min_df` documents and at most `max_df` of them, capped at the `max_features` most frequent
//! terms. Weights are raw counts times a smoothed IDF, L2-normalized per document.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
};

use crate::Stopwords;

/// A sparse vector: `(term index, weight)` pairs sorted by term index.
pub type SparseVector = Vec<(usize, f32)>;

/// Vectorizer parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorizerSettings {
    /// Maximum vocabulary size.
    pub max_features: usize,
    /// Minimum number of documents a term must appear in.
    pub min_df: usize,
    /// Maximum fraction of documents a term may appear in.
    pub max_df: f32,
}

impl Default for VectorizerSettings {
    fn default() -> Self {
        Self {
            max_features: 1000,
            min_df: 2,
            max_df: 0.8,
        }
    }
}

/// Vocabulary and IDF weights learned from a corpus.
#[derive(Debug, Clone)]
pub struct TfIdfModel {
    /// Term to column index; indices follow alphabetical term order.
    vocabulary: HashMap<String, usize>,
    /// Terms by column index.
    terms: Vec<String>,
    /// IDF weight per column.
    idf: Vec<f32>,
}

impl TfIdfModel {
    /// Number of terms in the vocabulary.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns true if the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms by column index.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Returns the IDF of a term, if it is in the vocabulary.
    pub fn idf(&self, term: &str) -> Option<f32> {
        self.vocabulary.get(term).map(|&i| self.idf[i])
    }
}

/// A fitted model together with the vectors of the documents it was fitted on.
#[derive(Debug, Clone)]
pub struct FittedCorpus {
    /// The learned model.
    pub model: TfIdfModel,
    /// One normalized vector per input document, in input order.
    pub vectors: Vec<SparseVector>,
}

/// TF-IDF vectorizer with English stopwords and unigram + bigram features.
#[derive(Debug, Clone, Default)]
pub struct TfIdfVectorizer {
    /// Fitting parameters.
    settings: VectorizerSettings,
    /// Stopwords removed before n-grams are formed.
    stopwords: Stopwords,
}

impl TfIdfVectorizer {
    /// Creates a vectorizer with the given settings.
    pub fn new(settings: VectorizerSettings) -> Self {
        Self {
            settings,
            stopwords: Stopwords::new(),
        }
    }

    /// Splits text into unigram and bigram features.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let tokens: Vec<String> = tokenize(text)
            .filter(|t| !self.stopwords.contains(t))
            .collect();
        let mut features = tokens.clone();
        features.extend(tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
        features
    }

    /// Learns a vocabulary from `texts` and vectorizes them.
    ///
    /// Returns `None` when the corpus cannot support a vocabulary: it is empty, too small for the
    /// document-frequency bounds, or no term survives pruning.
    pub fn fit<S: AsRef<str>>(&self, texts: &[S]) -> Option<FittedCorpus> {
        let n_docs = texts.len();
        if n_docs == 0 {
            return None;
        }
        let max_doc_count = f64::from(self.settings.max_df) * n_docs as f64;
        if max_doc_count < self.settings.min_df as f64 {
            return None;
        }

        let counts: Vec<HashMap<String, u32>> =
            texts.iter().map(|t| self.term_counts(t.as_ref())).collect();

        let mut stats: BTreeMap<&str, (usize, u64)> = BTreeMap::new();
        for doc in &counts {
            for (term, &count) in doc {
                let entry = stats.entry(term.as_str()).or_default();
                entry.0 += 1;
                entry.1 += u64::from(count);
            }
        }

        let mut kept: Vec<(&str, usize, u64)> = stats
            .into_iter()
            .filter(|&(_, (df, _))| df >= self.settings.min_df && df as f64 <= max_doc_count)
            .map(|(term, (df, total))| (term, df, total))
            .collect();
        if kept.is_empty() {
            return None;
        }
        if kept.len() > self.settings.max_features {
            // Most frequent first; the BTreeMap order breaks ties alphabetically.
            kept.sort_by(|a, b| b.2.cmp(&a.2));
            kept.truncate(self.settings.max_features);
            kept.sort_by(|a, b| a.0.cmp(b.0));
        }

        let terms: Vec<String> = kept.iter().map(|(t, _, _)| (*t).to_string()).collect();
        let vocabulary = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        let idf = kept
            .iter()
            .map(|&(_, df, _)| smoothed_idf(n_docs, df))
            .collect();
        let model = TfIdfModel {
            vocabulary,
            terms,
            idf,
        };

        let vectors = counts.iter().map(|doc| weigh(&model, doc)).collect();
        Some(FittedCorpus { model, vectors })
    }

    /// Vectorizes `text` against a fitted model. Unknown terms are ignored.
    pub fn transform(&self, model: &TfIdfModel, text: &str) -> SparseVector {
        weigh(model, &self.term_counts(text))
    }

    /// Counts features in one text.
    fn term_counts(&self, text: &str) -> HashMap<String, u32> {
        let mut counts = HashMap::new();
        for feature in self.analyze(text) {
            *counts.entry(feature).or_insert(0) += 1;
        }
        counts
    }
}

/// Cosine similarity of two L2-normalized sparse vectors.
pub fn cosine(a: &[(usize, f32)], b: &[(usize, f32)]) -> f32 {
    let (mut i, mut j, mut dot) = (0, 0, 0.0f32);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    dot
}

/// Lowercases text and yields runs of two or more word characters.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().nth(1).is_some())
        .map(str::to_lowercase)
}

/// `ln((1 + n) / (1 + df)) + 1`.
fn smoothed_idf(n_docs: usize, df: usize) -> f32 {
    (((1 + n_docs) as f64 / (1 + df) as f64).ln() + 1.0) as f32
}

/// Converts feature counts to an L2-normalized TF-IDF vector.
fn weigh(model: &TfIdfModel, counts: &HashMap<String, u32>) -> SparseVector {
    let mut vector: SparseVector = counts
        .iter()
        .filter_map(|(term, &count)| {
            let i = *model.vocabulary.get(term)?;
            Some((i, count as f32 * model.idf[i]))
        })
        .collect();
    vector.sort_unstable_by_key(|&(i, _)| i);

    let norm = vector.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
    if norm > 0.0 {
        for (_, w) in &mut vector {
            *w /= norm;
        }
    }
    vector
}
