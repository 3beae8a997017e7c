//! Static site bundle assembly.
//!
//! A build copies the generated artifacts into the output directory,
//! analyzes each one for overlay contrast, and writes the content API
//! (`content.json`), the static shell, and a build summary. Builds read
//! only what exists on disk; they never trigger generation.

use crate::brightness::{self, BrightnessAnalysis};
use crate::config::SiteConfig;
use crate::inventory::DirectorySnapshot;
use crate::reconcile::ReconciledItem;
use crate::sidecar::{artifact_filename, GenerationRecord, SidecarError, SidecarMetadata, StyleSnapshot};
use crate::templates;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::fs;

/// Errors that abort a site build.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Task error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// One image bundled for a content entry.
#[derive(Debug, Serialize)]
pub struct ImageDescriptor {
    /// Path relative to the output directory, as the page references it.
    pub path: String,

    pub filename: String,
    pub brightness_analysis: BrightnessAnalysis,

    /// Generation context carried over from the sidecar, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationRecord>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleSnapshot>,
}

/// One entry in the content API.
#[derive(Debug, Serialize)]
pub struct ContentEntry {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub body: String,
    pub why_i_like_it: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub tags: Vec<String>,
    pub style_name: String,
    pub style_category: String,
    pub content_changed: bool,
    pub images: Vec<ImageDescriptor>,

    /// Contrast colors for the entry, taken from its first image.
    pub brightness_analysis: BrightnessAnalysis,
}

#[derive(Debug, Serialize)]
struct BuildSummary {
    build_timestamp: String,
    content_count: usize,
    images_included: usize,
    content_items: Vec<BuildSummaryItem>,
}

#[derive(Debug, Serialize)]
struct BuildSummaryItem {
    title: String,
    author: String,
    style: String,
    image_count: usize,
    brightness: f64,
}

/// Result of a site build.
#[derive(Debug)]
pub struct BuildReport {
    pub content_count: usize,
    pub images_included: usize,
}

/// Assembles the output directory from generated artifacts.
pub struct SiteBuilder {
    config: SiteConfig,
}

impl SiteBuilder {
    pub fn new(config: SiteConfig) -> Self {
        Self { config }
    }

    /// Build the full bundle: images, content API, shell, build summary.
    pub async fn build(
        &self,
        items: &[ReconciledItem],
        snapshot: &DirectorySnapshot,
    ) -> Result<BuildReport, SiteError> {
        let images_out = self.config.output_dir.join("images");
        fs::create_dir_all(&images_out).await?;

        let mut entries = Vec::new();
        let mut images_included = 0;

        for entry in items {
            let images = self.bundle_images(entry, snapshot, &images_out).await?;
            images_included += images.len();

            let brightness_analysis = images
                .first()
                .map(|image| image.brightness_analysis.clone())
                .unwrap_or_else(BrightnessAnalysis::dark_default);

            let item = &entry.item;
            entries.push(ContentEntry {
                id: item.content_id.clone(),
                title: item.title.clone(),
                author: item.author.clone(),
                content_type: item.content_type.clone(),
                body: item.body.clone(),
                why_i_like_it: item.why_i_like_it.clone(),
                source: item.source.clone(),
                tags: item.tags.clone(),
                style_name: entry.reconciled.assignment.name.clone(),
                style_category: entry.reconciled.assignment.category.as_str().to_string(),
                content_changed: entry.reconciled.content_changed,
                images,
                brightness_analysis,
            });
        }

        fs::write(
            self.config.output_dir.join("content.json"),
            serde_json::to_string_pretty(&entries)?,
        )
        .await?;
        fs::write(
            self.config.output_dir.join("index.html"),
            templates::INDEX_HTML,
        )
        .await?;
        fs::write(self.config.output_dir.join("style.css"), templates::STYLE_CSS).await?;
        fs::write(self.config.output_dir.join("script.js"), templates::SCRIPT_JS).await?;

        let summary = BuildSummary {
            build_timestamp: Utc::now().to_rfc3339(),
            content_count: entries.len(),
            images_included,
            content_items: entries
                .iter()
                .map(|entry| BuildSummaryItem {
                    title: entry.title.clone(),
                    author: entry.author.clone(),
                    style: entry.style_name.clone(),
                    image_count: entry.images.len(),
                    brightness: entry.brightness_analysis.brightness,
                })
                .collect(),
        };
        fs::write(
            self.config.output_dir.join("build_summary.json"),
            serde_json::to_string_pretty(&summary)?,
        )
        .await?;

        tracing::info!(
            "Site built: {} entries, {} images",
            entries.len(),
            images_included
        );
        Ok(BuildReport {
            content_count: entries.len(),
            images_included,
        })
    }

    /// Copy and analyze every existing variation for one item.
    async fn bundle_images(
        &self,
        entry: &ReconciledItem,
        snapshot: &DirectorySnapshot,
        images_out: &std::path::Path,
    ) -> Result<Vec<ImageDescriptor>, SiteError> {
        let item = &entry.item;
        let mut images = Vec::new();

        for variation in 1..=self.config.variations_per_content {
            let filename = artifact_filename(&item.content_id, variation);
            if !snapshot.has_image(&filename) {
                continue;
            }

            let source = self.config.images_dir.join(&filename);
            fs::copy(&source, images_out.join(&filename)).await?;

            // Image decoding is CPU-bound; keep it off the async executor.
            let brightness_analysis =
                tokio::task::spawn_blocking(move || brightness::analyze(source)).await?;

            let sidecar =
                SidecarMetadata::load_for(&self.config.metadata_dir, &item.content_id, variation)
                    .await?;

            images.push(ImageDescriptor {
                path: format!("images/{filename}"),
                brightness_analysis,
                generation: sidecar.as_ref().map(|s| s.generation.clone()),
                style: sidecar.map(|s| s.style),
                filename,
            });
        }

        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentItem;
    use crate::reconcile::Reconciled;
    use crate::styles::{StyleAssignment, StyleCategory};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn reconciled_item(content_id: &str) -> ReconciledItem {
        ReconciledItem {
            item: ContentItem {
                content_id: content_id.to_string(),
                title: "Make Something".to_string(),
                author: "Paul Graham".to_string(),
                content_type: "quote".to_string(),
                body: "Make something people want.".to_string(),
                why_i_like_it: "It cuts through everything else.".to_string(),
                style_category: "random".to_string(),
                style_specific: "random".to_string(),
                source: Some("https://example.org".to_string()),
                status: "active".to_string(),
                tags: vec!["making".to_string()],
                vibe: vec![],
                sections: BTreeMap::new(),
            },
            reconciled: Reconciled {
                assignment: StyleAssignment {
                    name: "impasto".to_string(),
                    category: StyleCategory::PaintingTechnique,
                },
                content_changed: false,
                previous_style: Some("impasto".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn test_build_bundle() {
        let dir = TempDir::new().expect("temp dir");
        let mut config = SiteConfig::new(dir.path());
        config.variations_per_content = 2;
        std::fs::create_dir_all(&config.images_dir).expect("mkdir");
        std::fs::create_dir_all(&config.metadata_dir).expect("mkdir");

        // Only variation 1 exists on disk.
        image::RgbImage::from_pixel(2, 2, image::Rgb([255, 255, 255]))
            .save(config.images_dir.join("graham_v1.png"))
            .expect("save");

        let snapshot = DirectorySnapshot::capture(&config.images_dir, &config.metadata_dir)
            .await
            .expect("snapshot");
        let items = vec![reconciled_item("graham")];

        let report = SiteBuilder::new(config.clone())
            .build(&items, &snapshot)
            .await
            .expect("build");
        assert_eq!(report.content_count, 1);
        assert_eq!(report.images_included, 1);

        assert!(config.output_dir.join("index.html").exists());
        assert!(config.output_dir.join("style.css").exists());
        assert!(config.output_dir.join("script.js").exists());
        assert!(config.output_dir.join("images/graham_v1.png").exists());
        assert!(config.output_dir.join("build_summary.json").exists());

        let raw =
            std::fs::read_to_string(config.output_dir.join("content.json")).expect("content.json");
        let parsed: serde_json::Value = serde_json::from_str(&raw).expect("json");
        let entry = &parsed[0];
        assert_eq!(entry["id"], "graham");
        assert_eq!(entry["style_name"], "impasto");
        assert_eq!(entry["images"].as_array().map(Vec::len), Some(1));
        assert_eq!(entry["images"][0]["path"], "images/graham_v1.png");
        // White source image: classified light.
        assert_eq!(entry["brightness_analysis"]["is_light"], true);
    }

    #[tokio::test]
    async fn test_entry_with_no_images_uses_dark_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let config = SiteConfig::new(dir.path());

        let report = SiteBuilder::new(config.clone())
            .build(&[reconciled_item("ghost")], &DirectorySnapshot::default())
            .await
            .expect("build");
        assert_eq!(report.content_count, 1);
        assert_eq!(report.images_included, 0);

        let raw =
            std::fs::read_to_string(config.output_dir.join("content.json")).expect("content.json");
        let parsed: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(parsed[0]["brightness_analysis"]["is_light"], false);
        assert_eq!(parsed[0]["images"].as_array().map(Vec::len), Some(0));
    }
}
