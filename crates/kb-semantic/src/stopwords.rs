//! English stopword filtering for the vectorizer.

use std::collections::HashSet;

use stop_words::LANGUAGE;

/// English stopwords from the `stop-words` crate, stored lowercase.
#[derive(Debug, Clone)]
pub struct Stopwords {
    /// Lowercased stopwords.
    words: HashSet<String>,
}

impl Default for Stopwords {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwords {
    /// Creates the English stopword list.
    pub fn new() -> Self {
        let words = stop_words::get(LANGUAGE::English)
            .iter()
            .map(|w| w.to_lowercase())
            .collect();
        Self { words }
    }

    /// Checks if a lowercase token is a stopword.
    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    /// Returns the number of stopwords.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns true if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn contains_english_stopwords() {
        let sw = Stopwords::new();
        for word in ["the", "and", "is", "of", "to"] {
            assert!(sw.contains(word), "{word}");
        }
    }

    #[test]
    fn domain_terms_are_not_stopwords() {
        let sw = Stopwords::new();
        for word in ["learning", "machine", "neural", "database"] {
            assert!(!sw.contains(word), "{word}");
        }
        assert!(sw.len() > 100);
    }
}
