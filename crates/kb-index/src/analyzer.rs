//! Text analysis for the keyword indexes.
//!
//! Searchable text goes through a four-stage pipeline:
//! 1. `SimpleTokenizer` - splits on whitespace and punctuation
//! 2. `LowerCaser` - converts tokens to lowercase
//! 3. `RemoveLongFilter` - removes tokens longer than 120 bytes
//! 4. `Stemmer` - applies language-specific stemming
//!
//! The vocabulary field used for suggestions skips the stemmer so that suggested terms are real
//! words.

use tantivy::tokenizer::{
    Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, TextAnalyzer, TokenStream,
};

use crate::IndexError;

/// Name of the stemming tokenizer registered with Tantivy.
pub const KB_TOKENIZER: &str = "kb_text";

/// Name of the unstemmed tokenizer used by the vocabulary field.
pub const VOCABULARY_TOKENIZER: &str = "kb_vocabulary";

/// Maximum token length in bytes before filtering.
///
/// CJK text has no word separators, so a whole run of ideographs is one token; 120 bytes keeps
/// runs of up to 40 characters searchable.
const MAX_TOKEN_LENGTH: usize = 120;

/// Parses a stemmer language string into a Tantivy `Language`.
pub fn parse_language(name: &str) -> Result<Language, IndexError> {
    match name.to_lowercase().as_str() {
        "arabic" => Ok(Language::Arabic),
        "danish" => Ok(Language::Danish),
        "dutch" => Ok(Language::Dutch),
        "english" => Ok(Language::English),
        "finnish" => Ok(Language::Finnish),
        "french" => Ok(Language::French),
        "german" => Ok(Language::German),
        "greek" => Ok(Language::Greek),
        "hungarian" => Ok(Language::Hungarian),
        "italian" => Ok(Language::Italian),
        "norwegian" => Ok(Language::Norwegian),
        "portuguese" => Ok(Language::Portuguese),
        "romanian" => Ok(Language::Romanian),
        "russian" => Ok(Language::Russian),
        "spanish" => Ok(Language::Spanish),
        "swedish" => Ok(Language::Swedish),
        "tamil" => Ok(Language::Tamil),
        "turkish" => Ok(Language::Turkish),
        other => Err(IndexError::InvalidLanguage(other.to_string())),
    }
}

/// Builds the stemming analyzer for `language`.
pub fn build_analyzer(language: Language) -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LENGTH))
        .filter(Stemmer::new(language))
        .build()
}

/// Builds the stemming analyzer from a language name.
pub fn build_analyzer_from_name(language_name: &str) -> Result<TextAnalyzer, IndexError> {
    let language = parse_language(language_name)?;
    Ok(build_analyzer(language))
}

/// Builds the unstemmed analyzer for the vocabulary field.
pub fn build_vocabulary_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LENGTH))
        .build()
}

/// Runs `text` through `analyzer` and collects the token texts.
pub(crate) fn analyze(analyzer: &mut TextAnalyzer, text: &str) -> Vec<String> {
    let mut stream = analyzer.token_stream(text);
    let mut tokens = Vec::new();
    while let Some(token) = stream.next() {
        tokens.push(token.text.clone());
    }
    tokens
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_case_insensitive() {
        assert_eq!(parse_language("English").unwrap(), Language::English);
        assert_eq!(parse_language("FRENCH").unwrap(), Language::French);
    }

    #[test]
    fn parse_invalid_language() {
        let err = parse_language("klingon").unwrap_err();
        assert!(err.to_string().contains("klingon"));
    }

    #[test]
    fn analyzer_lowercases_and_stems() {
        let mut analyzer = build_analyzer(Language::English);
        assert_eq!(
            analyze(&mut analyzer, "Machine LEARNING, handling"),
            vec!["machin", "learn", "handl"]
        );
    }

    #[test]
    fn analyzer_removes_long_tokens() {
        let mut analyzer = build_analyzer_from_name("english").unwrap();
        let text = format!("short {} word", "a".repeat(150));
        assert_eq!(analyze(&mut analyzer, &text), vec!["short", "word"]);
    }

    #[test]
    fn vocabulary_analyzer_does_not_stem() {
        let mut analyzer = build_vocabulary_analyzer();
        assert_eq!(
            analyze(&mut analyzer, "Machine Learning"),
            vec!["machine", "learning"]
        );
    }

    #[test]
    fn cjk_runs_are_single_tokens() {
        let mut analyzer = build_vocabulary_analyzer();
        assert_eq!(analyze(&mut analyzer, "机器学习 ai"), vec!["机器学习", "ai"]);
    }
}
