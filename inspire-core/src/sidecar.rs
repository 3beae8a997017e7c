//! Generated-artifact naming and sidecar metadata persistence.
//!
//! Every image variation gets a sidecar JSON record next to it capturing the
//! content text, the style assignment, and the generation context used to
//! produce it. The variation-1 sidecar is the durable source of truth the
//! reconciler reads on the next run.

use crate::styles::{StyleAssignment, StyleCategory};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors from sidecar persistence.
#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Image filename for one variation of a content identity.
pub fn artifact_filename(content_id: &str, variation: u32) -> String {
    format!("{content_id}_v{variation}.png")
}

/// Sidecar filename for one variation of a content identity.
pub fn sidecar_filename(content_id: &str, variation: u32) -> String {
    format!("{content_id}_v{variation}_metadata.json")
}

/// Parse `{base}_v{n}.png` back into identity and variation index.
///
/// Returns `None` for names that cannot belong to any expected slot.
pub fn parse_artifact_filename(filename: &str) -> Option<(&str, u32)> {
    let stem = filename.strip_suffix(".png")?;
    let (base, index) = stem.rsplit_once("_v")?;
    if base.is_empty() {
        return None;
    }
    Some((base, index.parse().ok()?))
}

/// Parse `{base}_v{n}_metadata.json` back into identity and variation index.
pub fn parse_sidecar_filename(filename: &str) -> Option<(&str, u32)> {
    let stem = filename.strip_suffix("_metadata.json")?;
    let (base, index) = stem.rsplit_once("_v")?;
    if base.is_empty() {
        return None;
    }
    Some((base, index.parse().ok()?))
}

/// Sidecar record stored next to each generated artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidecarMetadata {
    /// Content as it was at generation time.
    pub content: ContentSnapshot,

    /// Style assignment used for this artifact.
    pub style: StyleSnapshot,

    /// How, when, and at what cost the artifact was produced.
    pub generation: GenerationRecord,
}

/// Snapshot of the content at generation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSnapshot {
    pub title: String,
    pub author: String,
    #[serde(rename = "type")]
    pub content_type: String,

    /// Raw body text. Compared verbatim against the current body on the
    /// next run to detect content changes.
    pub body: String,

    /// Content identity at generation time.
    pub source_id: String,
}

/// Snapshot of the style assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleSnapshot {
    pub name: String,
    pub category: StyleCategory,

    /// Per-variation composition descriptor woven into the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation: Option<String>,
}

/// Generation context for one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// ISO-8601 timestamp of the generation attempt.
    pub timestamp: String,

    /// Model identifier the request was sent to.
    pub model: String,

    /// Full prompt text sent.
    pub prompt: String,
    pub prompt_length: usize,

    /// Cost attributed to this attempt, in dollars.
    pub cost: f64,

    pub image_filename: String,
    pub image_path: String,

    /// Whether an image was actually produced and saved.
    pub success: bool,

    /// Error text, when the API call failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Note for attempts that returned no image without failing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Image dimensions, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
}

impl SidecarMetadata {
    /// The style assignment this sidecar records.
    pub fn assignment(&self) -> StyleAssignment {
        StyleAssignment {
            name: self.style.name.clone(),
            category: self.style.category,
        }
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), SidecarError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, SidecarError> {
        let content = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load the sidecar for a specific variation, `None` when absent.
    pub async fn load_for(
        metadata_dir: impl AsRef<Path>,
        content_id: &str,
        variation: u32,
    ) -> Result<Option<Self>, SidecarError> {
        let path = metadata_dir
            .as_ref()
            .join(sidecar_filename(content_id, variation));
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
