//! Query term extraction.
//!
//! A query is expanded into the raw query, its whitespace tokens and, for tokens containing
//! CJK characters, sub-word segments. CJK text has no spaces, so without segments a query like
//! `机器学习` could only match documents containing exactly that run of characters.

/// Splits CJK text into words.
pub trait Segmenter: Send + Sync {
    /// Segments `text` into words.
    fn segment(&self, text: &str) -> Vec<String>;
}

/// Expands a query into search terms, deduplicated in first-seen order.
///
/// Without a segmenter, CJK tokens are expanded into character bigrams and trigrams.
pub fn query_terms(query: &str, segmenter: Option<&dyn Segmenter>) -> Vec<String> {
    let raw = query.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let mut terms = Vec::new();
    push_unique(&mut terms, raw.to_string());
    for token in raw.split_whitespace() {
        push_unique(&mut terms, token.to_string());
        if token.chars().any(is_cjk) {
            let segments = match segmenter {
                Some(segmenter) => segmenter.segment(token),
                None => char_ngrams(token),
            };
            for segment in segments {
                if !segment.trim().is_empty() {
                    push_unique(&mut terms, segment);
                }
            }
        }
    }
    terms
}

/// Returns true for characters in the CJK ideograph, kana and hangul blocks.
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}')
}

/// Character bigrams followed by character trigrams.
fn char_ngrams(token: &str) -> Vec<String> {
    let chars: Vec<char> = token.chars().collect();
    let mut grams = Vec::new();
    for n in [2, 3] {
        grams.extend(chars.windows(n).map(|w| w.iter().collect::<String>()));
    }
    grams
}

/// Appends `term` unless already present.
fn push_unique(terms: &mut Vec<String>, term: String) {
    if !terms.contains(&term) {
        terms.push(term);
    }
}
