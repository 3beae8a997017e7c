//! Pipeline configuration.
//!
//! All directory paths and generation tunables live in an explicitly
//! constructed [`SiteConfig`] anchored at a project root. Every stage
//! receives the config as an argument; nothing reads the ambient working
//! directory.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed config file: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Default number of image variations generated per content item.
pub const DEFAULT_VARIATIONS: u32 = 3;

/// Default cost of one generated 1024x1024 image, in dollars.
pub const DEFAULT_COST_PER_IMAGE: f64 = 0.039;

/// Default model identifier for image generation.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Default courtesy pause between successive generation requests, in seconds.
pub const DEFAULT_REQUEST_DELAY_SECS: u64 = 2;

/// Pipeline configuration: directory layout plus generation tunables.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Project root all other paths are anchored at.
    pub root: PathBuf,

    /// Directory of markdown content files.
    pub content_dir: PathBuf,

    /// Path to the JSON style catalog.
    pub styles_file: PathBuf,

    /// Directory of generated artwork.
    pub images_dir: PathBuf,

    /// Directory of sidecar metadata records.
    pub metadata_dir: PathBuf,

    /// Directory the static site bundle is written to.
    pub output_dir: PathBuf,

    /// Directory orphaned files are archived into before deletion.
    pub archive_dir: PathBuf,

    /// Path the generation run summary is written to.
    pub summary_file: PathBuf,

    /// Image variations generated per content item.
    pub variations_per_content: u32,

    /// Cost of one generated image, in dollars.
    pub cost_per_image: f64,

    /// Model identifier for image generation.
    pub model: String,

    /// Pause between successive generation requests, in seconds.
    pub request_delay_secs: u64,
}

impl SiteConfig {
    /// Build a config with the default layout under the given root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            content_dir: root.join("content/inspiration"),
            styles_file: root.join("content/styles/styles.json"),
            images_dir: root.join("generated/images"),
            metadata_dir: root.join("generated/metadata"),
            output_dir: root.join("output"),
            archive_dir: root.join("generated/archive"),
            summary_file: root.join("generated/generation_summary.json"),
            variations_per_content: DEFAULT_VARIATIONS,
            cost_per_image: DEFAULT_COST_PER_IMAGE,
            model: DEFAULT_MODEL.to_string(),
            request_delay_secs: DEFAULT_REQUEST_DELAY_SECS,
            root,
        }
    }

    /// Load `config.json` under the root, falling back to defaults when the
    /// file is absent. A present but malformed file is an error.
    pub async fn load(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let root = root.as_ref();
        let mut config = Self::new(root);

        let config_path = root.join("config.json");
        let raw = match fs::read_to_string(&config_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(config),
            Err(e) => return Err(e.into()),
        };

        let file: ConfigFile = serde_json::from_str(&raw)?;
        let section = file.image_generation;
        config.variations_per_content = section.variations_per_content;
        config.cost_per_image = section.cost_per_image;
        config.model = section.model;
        config.request_delay_secs = section.request_delay_secs;
        Ok(config)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    image_generation: ImageGenerationSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ImageGenerationSection {
    variations_per_content: u32,
    cost_per_image: f64,
    model: String,
    request_delay_secs: u64,
}

impl Default for ImageGenerationSection {
    fn default() -> Self {
        Self {
            variations_per_content: DEFAULT_VARIATIONS,
            cost_per_image: DEFAULT_COST_PER_IMAGE,
            model: DEFAULT_MODEL.to_string(),
            request_delay_secs: DEFAULT_REQUEST_DELAY_SECS,
        }
    }
}
