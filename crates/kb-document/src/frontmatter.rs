//! YAML frontmatter for markdown items.
//!
//! Frontmatter is an optional `---` delimited YAML block at the very start of a file:
//!
//! ```markdown
//! ---
//! title: Gradient Descent
//! tags: [ml, optimization]
//! categories: [notes]
//! ---
//!
//! # Content starts here
//! ```

use serde::Deserialize;

/// Metadata read from a frontmatter block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Frontmatter {
    /// Item title.
    pub title: Option<String>,
    /// Tag ids.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Category ids.
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Splits frontmatter off the start of `content`.
///
/// Returns the parsed frontmatter and the body after it. Missing, unterminated, or malformed
/// frontmatter yields `None` and the original content (minus a leading BOM).
pub fn parse_frontmatter(content: &str) -> (Option<Frontmatter>, &str) {
    let content = content.trim_start_matches('\u{feff}');
    let Some(after_opening) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return (None, content);
    };

    let Some((yaml_len, body_start)) = find_closing_delimiter(after_opening) else {
        return (None, content);
    };
    let yaml = &after_opening[..yaml_len];
    let body = after_opening[body_start..].trim_start_matches(['\r', '\n']);

    match serde_yaml::from_str::<Option<Frontmatter>>(yaml) {
        Ok(fm) => (Some(fm.unwrap_or_default()), body),
        Err(_) => (None, content),
    }
}

/// Finds the closing `---` line.
///
/// Returns the byte length of the YAML before it and the offset just past the delimiter line.
fn find_closing_delimiter(content: &str) -> Option<(usize, usize)> {
    let mut pos = 0;
    for line in content.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            return Some((pos, pos + line.len()));
        }
        pos += line.len();
    }
    None
}
