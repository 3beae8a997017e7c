//! Visual style catalog and selection.
//!
//! The catalog is external JSON with two collections of named styles. The
//! pipeline cannot run without it, so loading is fatal on a missing or
//! unparsable file — but selection itself never fails: unknown categories
//! and names degrade to warned random draws, and an empty style set falls
//! back to a fixed style name.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors from loading the style catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Style library not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed style library: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Style drawn when a category has nothing to offer.
pub const FALLBACK_STYLE: &str = "essence-of-desire";

/// A resolved style category.
///
/// Frontmatter requests stay raw strings (they may be `"random"` or
/// unknown); a resolved assignment is always one of these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleCategory {
    PaintingTechnique,
    VisualStorytelling,
}

impl StyleCategory {
    /// Category used when a request names an unknown category.
    pub const DEFAULT: StyleCategory = StyleCategory::PaintingTechnique;

    /// Parse a frontmatter category string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "painting_technique" => Some(StyleCategory::PaintingTechnique),
            "visual_storytelling" => Some(StyleCategory::VisualStorytelling),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleCategory::PaintingTechnique => "painting_technique",
            StyleCategory::VisualStorytelling => "visual_storytelling",
        }
    }
}

impl fmt::Display for StyleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One style record from the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleEntry {
    /// Prompt text this style starts from.
    #[serde(default)]
    pub base_prompt: String,

    /// Mood words woven into the prompt.
    #[serde(default)]
    pub mood_elements: Vec<String>,

    /// Palette words woven into the prompt.
    #[serde(default)]
    pub color_palette: Vec<String>,

    /// Composition guidance appended to the prompt.
    #[serde(default)]
    pub composition: Option<String>,
}

/// A (style name, category) pair bound to a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleAssignment {
    pub name: String,
    pub category: StyleCategory,
}

/// The external style library.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StyleCatalog {
    #[serde(rename = "painting_technique_styles", default)]
    painting_technique: BTreeMap<String, StyleEntry>,

    #[serde(rename = "visual_storytelling_techniques", default)]
    visual_storytelling: BTreeMap<String, StyleEntry>,
}

impl StyleCatalog {
    /// Load the catalog from disk. Fatal on a missing or unparsable file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogError::NotFound(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_json(&raw)
    }

    /// Parse a catalog from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// The style set for a category.
    pub fn styles_in(&self, category: StyleCategory) -> &BTreeMap<String, StyleEntry> {
        match category {
            StyleCategory::PaintingTechnique => &self.painting_technique,
            StyleCategory::VisualStorytelling => &self.visual_storytelling,
        }
    }

    /// Look up the record behind an assignment, if the catalog still has it.
    pub fn entry(&self, assignment: &StyleAssignment) -> Option<&StyleEntry> {
        self.styles_in(assignment.category).get(&assignment.name)
    }

    /// Resolve a frontmatter (category, specific) request to an assignment.
    ///
    /// Never fails: unknown inputs warn and fall back to random draws, and
    /// an empty style set yields [`FALLBACK_STYLE`].
    pub fn select<R: Rng>(
        &self,
        category: &str,
        specific: &str,
        rng: &mut R,
    ) -> StyleAssignment {
        if category == "random" {
            return self.draw_any(rng);
        }
        match StyleCategory::parse(category) {
            Some(resolved) => {
                if specific == "random" {
                    self.draw_from(resolved, rng)
                } else if self.styles_in(resolved).contains_key(specific) {
                    StyleAssignment {
                        name: specific.to_string(),
                        category: resolved,
                    }
                } else {
                    tracing::warn!(
                        "Style '{}' not found in category '{}', drawing a random one",
                        specific,
                        resolved
                    );
                    self.draw_from(resolved, rng)
                }
            }
            None => {
                tracing::warn!(
                    "Unknown style category '{}', drawing from '{}'",
                    category,
                    StyleCategory::DEFAULT
                );
                self.draw_from(StyleCategory::DEFAULT, rng)
            }
        }
    }

    /// Uniform draw over the union of both collections.
    fn draw_any<R: Rng>(&self, rng: &mut R) -> StyleAssignment {
        let pool: Vec<StyleAssignment> = self
            .painting_technique
            .keys()
            .map(|name| StyleAssignment {
                name: name.clone(),
                category: StyleCategory::PaintingTechnique,
            })
            .chain(self.visual_storytelling.keys().map(|name| StyleAssignment {
                name: name.clone(),
                category: StyleCategory::VisualStorytelling,
            }))
            .collect();

        if pool.is_empty() {
            tracing::warn!("Style catalog is empty, using fallback style");
            return StyleAssignment {
                name: FALLBACK_STYLE.to_string(),
                category: StyleCategory::DEFAULT,
            };
        }
        pool[rng.gen_range(0..pool.len())].clone()
    }

    /// Uniform draw within one category.
    fn draw_from<R: Rng>(&self, category: StyleCategory, rng: &mut R) -> StyleAssignment {
        let names: Vec<&String> = self.styles_in(category).keys().collect();
        if names.is_empty() {
            tracing::warn!("No styles available in '{}', using fallback style", category);
            return StyleAssignment {
                name: FALLBACK_STYLE.to_string(),
                category,
            };
        }
        StyleAssignment {
            name: names[rng.gen_range(0..names.len())].clone(),
            category,
        }
    }
}
