//! Content loading: markdown files with YAML frontmatter.
//!
//! Each content file carries a `---`-delimited metadata block followed by a
//! markdown body. The body is split on `## ` headings into a primary section
//! and named subsections; section headers are normalized so downstream code
//! can look them up by stable keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors from parsing a single content file.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No frontmatter block found")]
    MissingFrontmatter,

    #[error("Malformed frontmatter: {0}")]
    MalformedFrontmatter(#[from] serde_yaml::Error),

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),
}

/// One parsed content item.
///
/// The identity is the source filename relative to the content directory with
/// the `.md` extension stripped; it names every generated artifact for this
/// item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    /// Stable identity derived from the source path.
    pub content_id: String,

    /// Title of the piece.
    pub title: String,

    /// Who wrote or made it.
    pub author: String,

    /// Kind of content (quote, essay, ...).
    #[serde(rename = "type")]
    pub content_type: String,

    /// Primary body text (everything before the first `## ` heading).
    pub body: String,

    /// The "why I like it" section, empty when absent.
    pub why_i_like_it: String,

    /// Requested style category, `"random"` when unspecified.
    ///
    /// Kept as the raw frontmatter string so unknown values survive to
    /// selection time, where they trigger a warning and a fallback draw.
    pub style_category: String,

    /// Requested style name within the category, `"random"` when unspecified.
    pub style_specific: String,

    /// Link back to where the content came from.
    pub source: Option<String>,

    /// Publication status, defaults to `"active"`.
    pub status: String,

    /// Freeform tags.
    pub tags: Vec<String>,

    /// Optional vibe words feeding the prompt.
    pub vibe: Vec<String>,

    /// All named subsections under their normalized header names.
    pub sections: BTreeMap<String, String>,
}

impl ContentItem {
    /// Parse a content file body into an item with the given identity.
    pub fn parse(content_id: impl Into<String>, raw: &str) -> Result<Self, ContentError> {
        let (yaml, body) = split_frontmatter(raw)?;
        let frontmatter: Frontmatter = serde_yaml::from_str(yaml)?;

        let title = frontmatter.title.ok_or(ContentError::MissingField("title"))?;
        let author = frontmatter
            .author
            .ok_or(ContentError::MissingField("author"))?;
        let content_type = frontmatter
            .content_type
            .ok_or(ContentError::MissingField("type"))?;

        let (body, sections) = split_sections(body);
        let why_i_like_it = sections
            .get("why_i_like_it")
            .cloned()
            .unwrap_or_default();

        Ok(Self {
            content_id: content_id.into(),
            title,
            author,
            content_type,
            body,
            why_i_like_it,
            style_category: frontmatter.style_category,
            style_specific: frontmatter.style_specific,
            source: frontmatter.source,
            status: frontmatter.status,
            tags: frontmatter.tags,
            vibe: frontmatter.vibe,
            sections,
        })
    }

    /// Look up a named subsection by its normalized header.
    pub fn section(&self, name: &str) -> Option<&str> {
        self.sections.get(name).map(String::as_str)
    }
}

/// Derive a content identity from a source path.
pub fn content_id_from_path(content_dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(content_dir).unwrap_or(path);
    relative
        .with_extension("")
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "_")
}

/// A content file that failed to parse.
#[derive(Debug)]
pub struct LoadFailure {
    /// Source filename.
    pub file: String,

    /// Why it failed.
    pub error: ContentError,
}

/// Result of loading a content directory: the batch continues past
/// individual failures and reports them at the end.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Successfully parsed items, sorted by identity.
    pub items: Vec<ContentItem>,

    /// Files that failed validation or parsing.
    pub failures: Vec<LoadFailure>,
}

/// Load every `*.md` file in the content directory, skipping templates.
pub async fn load_content_dir(content_dir: impl AsRef<Path>) -> Result<LoadOutcome, ContentError> {
    let content_dir = content_dir.as_ref();
    let mut outcome = LoadOutcome::default();
    let mut entries = fs::read_dir(content_dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map(|e| e == "md") != Some(true) {
            continue;
        }
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if file.to_lowercase().contains("template") {
            continue;
        }

        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) => {
                outcome.failures.push(LoadFailure {
                    file,
                    error: e.into(),
                });
                continue;
            }
        };

        let content_id = content_id_from_path(content_dir, &path);
        match ContentItem::parse(content_id, &raw) {
            Ok(item) => outcome.items.push(item),
            Err(error) => {
                tracing::warn!("Error parsing {}: {}", file, error);
                outcome.failures.push(LoadFailure { file, error });
            }
        }
    }

    outcome.items.sort_by(|a, b| a.content_id.cmp(&b.content_id));
    Ok(outcome)
}

/// Split a raw file into its frontmatter YAML and the remaining body.
fn split_frontmatter(raw: &str) -> Result<(&str, &str), ContentError> {
    let raw = raw.trim_start_matches('\u{feff}');
    let rest = raw
        .strip_prefix("---")
        .ok_or(ContentError::MissingFrontmatter)?;
    let rest = rest.strip_prefix('\n').unwrap_or(rest);

    // Closing delimiter must sit on its own line.
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            if yaml.trim().is_empty() {
                return Err(ContentError::MissingFrontmatter);
            }
            return Ok((yaml, body));
        }
        offset += line.len();
    }
    Err(ContentError::MissingFrontmatter)
}

/// Split markdown into the primary section and `## `-headed subsections.
fn split_sections(markdown: &str) -> (String, BTreeMap<String, String>) {
    let mut sections = BTreeMap::new();
    let mut main = String::new();
    let mut current: Option<(String, String)> = None;

    for line in markdown.lines() {
        if let Some(header) = line.strip_prefix("## ") {
            if let Some((name, text)) = current.take() {
                sections.insert(name, text.trim().to_string());
            }
            current = Some((normalize_header(header), String::new()));
        } else {
            match &mut current {
                Some((_, text)) => {
                    text.push_str(line);
                    text.push('\n');
                }
                None => {
                    main.push_str(line);
                    main.push('\n');
                }
            }
        }
    }
    if let Some((name, text)) = current {
        sections.insert(name, text.trim().to_string());
    }

    (main.trim().to_string(), sections)
}

fn normalize_header(header: &str) -> String {
    let lower = header.trim().to_lowercase();
    if lower.contains("why i like it") {
        return "why_i_like_it".to_string();
    }
    lower.replace(' ', "_")
}

#[derive(Debug, Deserialize)]
struct Frontmatter {
    title: Option<String>,
    author: Option<String>,
    #[serde(rename = "type")]
    content_type: Option<String>,
    #[serde(default = "random_string")]
    style_category: String,
    #[serde(default = "random_string")]
    style_specific: String,
    source: Option<String>,
    #[serde(default = "active_string")]
    status: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    vibe: Vec<String>,
}

fn random_string() -> String {
    "random".to_string()
}

fn active_string() -> String {
    "active".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const SAMPLE: &str = "---\n\
title: Make Something\n\
author: Paul Graham\n\
type: quote\n\
style_category: painting_technique\n\
style_specific: impasto\n\
source: https://example.org/essay\n\
tags:\n  - making\n  - craft\n\
---\n\
Make something people want.\n\
\n\
## Why I Like It\n\
It cuts through everything else.\n\
\n\
## What I See In It\n\
A workbench at dawn.\n\
\n\
## Scribbles\n\
unparsed leftovers\n";

    #[test]
    fn test_parse_full_document() {
        let item = ContentItem::parse("graham_make_something", SAMPLE).expect("parse");

        assert_eq!(item.content_id, "graham_make_something");
        assert_eq!(item.title, "Make Something");
        assert_eq!(item.author, "Paul Graham");
        assert_eq!(item.content_type, "quote");
        assert_eq!(item.body, "Make something people want.");
        assert_eq!(item.why_i_like_it, "It cuts through everything else.");
        assert_eq!(item.style_category, "painting_technique");
        assert_eq!(item.style_specific, "impasto");
        assert_eq!(item.status, "active");
        assert_eq!(item.tags, vec!["making", "craft"]);
    }

    #[test]
    fn test_unrecognized_sections_preserved() {
        let item = ContentItem::parse("x", SAMPLE).expect("parse");
        assert_eq!(item.section("scribbles"), Some("unparsed leftovers"));
        assert_eq!(item.section("what_i_see_in_it"), Some("A workbench at dawn."));
        assert_eq!(item.section("nope"), None);
    }

    #[test]
    fn test_style_defaults_to_random() {
        let raw = "---\ntitle: T\nauthor: A\ntype: quote\n---\nbody\n";
        let item = ContentItem::parse("x", raw).expect("parse");
        assert_eq!(item.style_category, "random");
        assert_eq!(item.style_specific, "random");
    }

    #[test]
    fn test_missing_required_field() {
        let raw = "---\ntitle: T\ntype: quote\n---\nbody\n";
        let err = ContentItem::parse("x", raw).unwrap_err();
        assert!(matches!(err, ContentError::MissingField("author")));
    }

    #[test]
    fn test_missing_frontmatter() {
        let err = ContentItem::parse("x", "# Just markdown\n").unwrap_err();
        assert!(matches!(err, ContentError::MissingFrontmatter));

        let err = ContentItem::parse("x", "---\n---\nbody").unwrap_err();
        assert!(matches!(err, ContentError::MissingFrontmatter));
    }

    #[test]
    fn test_malformed_frontmatter() {
        let raw = "---\ntitle: [unclosed\n---\nbody\n";
        let err = ContentItem::parse("x", raw).unwrap_err();
        assert!(matches!(err, ContentError::MalformedFrontmatter(_)));
    }

    #[test]
    fn test_content_id_from_path() {
        let dir = PathBuf::from("content/inspiration");
        let path = dir.join("graham_make_something.md");
        assert_eq!(
            content_id_from_path(&dir, &path),
            "graham_make_something"
        );
        // Unrelated prefix falls back to the bare path.
        assert_eq!(
            content_id_from_path(&dir, Path::new("other.md")),
            "other"
        );
    }

    #[tokio::test]
    async fn test_load_dir_skips_templates_and_collects_failures() {
        use tempfile::TempDir;

        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("good.md"), SAMPLE).expect("write");
        std::fs::write(dir.path().join("bad.md"), "no frontmatter here").expect("write");
        std::fs::write(dir.path().join("TEMPLATE_example.md"), SAMPLE).expect("write");
        std::fs::write(dir.path().join("notes.txt"), "ignored").expect("write");

        let outcome = load_content_dir(dir.path()).await.expect("load");

        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].content_id, "good");
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].file, "bad.md");
    }
}
