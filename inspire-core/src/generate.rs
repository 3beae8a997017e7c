//! Image generation: prompt assembly and the sequential API loop.
//!
//! Generation is deliberately sequential with a courtesy pause between
//! requests. Every attempt, successful or not, writes a sidecar record so
//! the next run can see what happened without re-calling the API.

use crate::config::SiteConfig;
use crate::content::ContentItem;
use crate::inventory::GenerationNeed;
use crate::reconcile::ReconciledItem;
use crate::sidecar::{
    artifact_filename, sidecar_filename, ContentSnapshot, GenerationRecord, SidecarError,
    SidecarMetadata, StyleSnapshot,
};
use crate::styles::{StyleCatalog, StyleEntry};
use chrono::Utc;
use gemini::Gemini;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;

/// Errors that abort a generation run outright.
///
/// Per-attempt API failures are not among them; those are recorded in the
/// attempt's sidecar and the loop moves on.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-variation composition descriptors, cycled by variation index.
const VARIATION_DESCRIPTORS: [&str; 5] = [
    "balanced centered composition",
    "dynamic diagonal flow",
    "minimalist with generous negative space",
    "rich layered textures",
    "dramatic contrast between light and shadow",
];

/// The composition descriptor for a 1-based variation index.
pub fn variation_descriptor(variation: u32) -> &'static str {
    let index = (variation.max(1) - 1) as usize % VARIATION_DESCRIPTORS.len();
    VARIATION_DESCRIPTORS[index]
}

/// Assemble the prompt for one variation of one item.
///
/// Order: style base prompt, the item's vibe words, the style's moods and
/// palette, composition guidance, the item's visual notes, the
/// per-variation descriptor, and the square-format suffix.
pub fn build_prompt(item: &ContentItem, entry: &StyleEntry, variation: u32) -> String {
    let mut parts = Vec::new();

    if !entry.base_prompt.is_empty() {
        parts.push(entry.base_prompt.clone());
    }
    if !item.vibe.is_empty() {
        parts.push(format!(
            "Inspired by the feeling of: {}",
            item.vibe.join(", ")
        ));
    }
    if !entry.mood_elements.is_empty() {
        parts.push(format!("Mood: {}", entry.mood_elements.join(", ")));
    }
    if !entry.color_palette.is_empty() {
        parts.push(format!("Color palette: {}", entry.color_palette.join(", ")));
    }
    if let Some(composition) = &entry.composition {
        parts.push(composition.clone());
    }
    if let Some(notes) = item.section("visual_notes") {
        parts.push(notes.to_string());
    }
    parts.push(variation_descriptor(variation).to_string());
    parts.push("square composition, centered focus, 1:1 aspect ratio".to_string());

    parts.join(". ")
}

/// Summary of one generation run, persisted next to the artifacts.
#[derive(Debug, Serialize)]
pub struct GenerationSummary {
    pub timestamp: String,
    pub attempted: u32,
    pub succeeded: u32,
    pub no_image: u32,
    pub failed: u32,
    pub total_cost: f64,
}

/// Drives the sequential generation loop.
pub struct Generator {
    client: Gemini,
    config: SiteConfig,
}

impl Generator {
    pub fn new(client: Gemini, config: SiteConfig) -> Self {
        Self { client, config }
    }

    /// Generate every variation for every item in the plan, in order.
    ///
    /// Items are matched to needs by identity; a need whose item vanished
    /// since planning is skipped with a warning.
    pub async fn run(
        &self,
        catalog: &StyleCatalog,
        needs: &[GenerationNeed],
        items: &[ReconciledItem],
    ) -> Result<GenerationSummary, GenerateError> {
        fs::create_dir_all(&self.config.images_dir).await?;
        fs::create_dir_all(&self.config.metadata_dir).await?;

        let by_id: BTreeMap<&str, &ReconciledItem> = items
            .iter()
            .map(|entry| (entry.item.content_id.as_str(), entry))
            .collect();

        let mut summary = GenerationSummary {
            timestamp: Utc::now().to_rfc3339(),
            attempted: 0,
            succeeded: 0,
            no_image: 0,
            failed: 0,
            total_cost: 0.0,
        };

        let mut first = true;
        for need in needs {
            let Some(entry) = by_id.get(need.content_id.as_str()).copied() else {
                tracing::warn!(
                    "Planned item '{}' no longer present, skipping",
                    need.content_id
                );
                continue;
            };
            let item = &entry.item;
            let assignment = &entry.reconciled.assignment;
            let style = catalog.entry(assignment).cloned().unwrap_or_default();

            tracing::info!(
                "Generating {} variations for '{}' in style '{}' ({})",
                self.config.variations_per_content,
                item.content_id,
                assignment.name,
                need.reason.label()
            );

            for variation in 1..=self.config.variations_per_content {
                if !first {
                    tokio::time::sleep(Duration::from_secs(self.config.request_delay_secs)).await;
                }
                first = false;

                summary.attempted += 1;
                let outcome = self.generate_one(item, entry, &style, variation).await?;
                match outcome {
                    AttemptOutcome::Saved => {
                        summary.succeeded += 1;
                        summary.total_cost += self.config.cost_per_image;
                    }
                    AttemptOutcome::NoImage => summary.no_image += 1,
                    AttemptOutcome::Failed => summary.failed += 1,
                }
            }
        }

        if let Some(parent) = self.config.summary_file.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(
            &self.config.summary_file,
            serde_json::to_string_pretty(&summary)?,
        )
        .await?;

        Ok(summary)
    }

    /// One API attempt. Writes the artifact (when an image came back) and
    /// always writes the sidecar record.
    async fn generate_one(
        &self,
        item: &ContentItem,
        reconciled: &ReconciledItem,
        style: &StyleEntry,
        variation: u32,
    ) -> Result<AttemptOutcome, GenerateError> {
        let prompt = format!(
            "Create a 1024x1024 abstract artwork: {}",
            build_prompt(item, style, variation)
        );
        let image_filename = artifact_filename(&item.content_id, variation);
        let image_path = self.config.images_dir.join(&image_filename);

        let mut record = GenerationRecord {
            timestamp: Utc::now().to_rfc3339(),
            model: self.config.model.clone(),
            prompt_length: prompt.len(),
            prompt,
            cost: 0.0,
            image_filename: image_filename.clone(),
            image_path: image_path.display().to_string(),
            success: false,
            error: None,
            note: None,
            dimensions: None,
        };

        let outcome = match self.client.generate_image(&record.prompt).await {
            Ok(response) => match response.image {
                Some(image) => {
                    fs::write(&image_path, &image.bytes).await?;
                    record.success = true;
                    record.cost = self.config.cost_per_image;
                    record.dimensions = Some("1024x1024".to_string());
                    AttemptOutcome::Saved
                }
                None => {
                    tracing::warn!(
                        "No image in response for {} (candidates: {}, parts: {})",
                        image_filename,
                        response.candidate_count,
                        response.part_count
                    );
                    record.note = Some(format!(
                        "Response contained no image ({} candidates, {} parts)",
                        response.candidate_count, response.part_count
                    ));
                    AttemptOutcome::NoImage
                }
            },
            Err(e) => {
                tracing::warn!("Generation failed for {}: {}", image_filename, e);
                record.error = Some(e.to_string());
                AttemptOutcome::Failed
            }
        };

        let sidecar = SidecarMetadata {
            content: ContentSnapshot {
                title: item.title.clone(),
                author: item.author.clone(),
                content_type: item.content_type.clone(),
                body: item.body.clone(),
                source_id: item.content_id.clone(),
            },
            style: StyleSnapshot {
                name: reconciled.reconciled.assignment.name.clone(),
                category: reconciled.reconciled.assignment.category,
                variation: Some(variation_descriptor(variation).to_string()),
            },
            generation: record,
        };
        sidecar
            .save_json(
                self.config
                    .metadata_dir
                    .join(sidecar_filename(&item.content_id, variation)),
            )
            .await?;

        Ok(outcome)
    }
}

enum AttemptOutcome {
    Saved,
    NoImage,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn item() -> ContentItem {
        ContentItem {
            content_id: "graham_make_something".to_string(),
            title: "Make Something".to_string(),
            author: "Paul Graham".to_string(),
            content_type: "quote".to_string(),
            body: "Make something people want.".to_string(),
            why_i_like_it: String::new(),
            style_category: "random".to_string(),
            style_specific: "random".to_string(),
            source: None,
            status: "active".to_string(),
            tags: vec![],
            vibe: vec!["quiet determination".to_string(), "first light".to_string()],
            sections: BTreeMap::new(),
        }
    }

    fn entry() -> StyleEntry {
        StyleEntry {
            base_prompt: "thick strokes of oil paint".to_string(),
            mood_elements: vec!["contemplative".to_string(), "warm".to_string()],
            color_palette: vec!["ochre".to_string(), "deep teal".to_string()],
            composition: Some("strong horizon line".to_string()),
        }
    }

    #[test]
    fn test_prompt_assembly_order() {
        let mut item = item();
        item.sections
            .insert("visual_notes".to_string(), "a workbench at dawn".to_string());
        let prompt = build_prompt(&item, &entry(), 1);
        assert_eq!(
            prompt,
            "thick strokes of oil paint. \
             Inspired by the feeling of: quiet determination, first light. \
             Mood: contemplative, warm. \
             Color palette: ochre, deep teal. \
             strong horizon line. \
             a workbench at dawn. \
             balanced centered composition. \
             square composition, centered focus, 1:1 aspect ratio"
        );
    }

    #[test]
    fn test_prompt_skips_empty_fields() {
        let mut sparse = item();
        sparse.vibe.clear();
        let prompt = build_prompt(&sparse, &StyleEntry::default(), 2);
        assert_eq!(
            prompt,
            "dynamic diagonal flow. square composition, centered focus, 1:1 aspect ratio"
        );
    }

    #[test]
    fn test_variation_descriptors_cycle() {
        assert_eq!(variation_descriptor(1), VARIATION_DESCRIPTORS[0]);
        assert_eq!(variation_descriptor(5), VARIATION_DESCRIPTORS[4]);
        assert_eq!(variation_descriptor(6), VARIATION_DESCRIPTORS[0]);
        // Degenerate zero index maps to the first descriptor.
        assert_eq!(variation_descriptor(0), VARIATION_DESCRIPTORS[0]);
    }
}
