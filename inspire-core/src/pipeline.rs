//! End-to-end pipeline orchestration.
//!
//! A [`Pipeline`] owns the loaded configuration and style catalog and wires
//! the stages together: load content, reconcile styles against recorded
//! state, diff the inventory, then generate, build, or clean up from the
//! resulting plan. Planning reads a single directory snapshot, so every
//! stage of one run sees the same filesystem state.

use crate::config::{ConfigError, SiteConfig};
use crate::content::{self, ContentError, LoadOutcome};
use crate::generate::{GenerateError, GenerationSummary, Generator};
use crate::inventory::{
    self, CleanupReport, CostPreview, DirectorySnapshot, GenerationNeed, InventoryDiff,
    InventoryError, NeedKind, NeedReason,
};
use crate::reconcile::{ReconciledItem, StyleReconciler};
use crate::sidecar::SidecarError;
use crate::site::{BuildReport, SiteBuilder, SiteError};
use crate::styles::{CatalogError, StyleCatalog};
use gemini::Gemini;
use rand::Rng;
use std::path::Path;
use thiserror::Error;

/// Errors from any pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Site(#[from] SiteError),
}

/// Everything one run decided before touching the API or the output.
#[derive(Debug)]
pub struct RunPlan {
    /// Items with their reconciled style assignments, in identity order.
    pub reconciled: Vec<ReconciledItem>,

    /// The filesystem state this plan was computed against.
    pub snapshot: DirectorySnapshot,

    pub diff: InventoryDiff,
    pub preview: CostPreview,
}

/// The loaded pipeline: configuration plus style catalog.
pub struct Pipeline {
    config: SiteConfig,
    catalog: StyleCatalog,
}

impl Pipeline {
    /// Load configuration and the style catalog under a project root.
    ///
    /// A missing or unparsable catalog is fatal; nothing downstream can
    /// run without it.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let config = SiteConfig::load(root).await?;
        let catalog = StyleCatalog::load(&config.styles_file).await?;
        Ok(Self { config, catalog })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Load and parse the content directory.
    pub async fn load_content(&self) -> Result<LoadOutcome, PipelineError> {
        Ok(content::load_content_dir(&self.config.content_dir).await?)
    }

    /// Reconcile styles and diff the inventory into a run plan.
    ///
    /// With `force`, every item is planned for regeneration regardless of
    /// what exists on disk; orphan detection is unaffected.
    pub async fn plan<R: Rng>(
        &self,
        items: &[crate::content::ContentItem],
        rng: &mut R,
        force: bool,
    ) -> Result<RunPlan, PipelineError> {
        let snapshot =
            DirectorySnapshot::capture(&self.config.images_dir, &self.config.metadata_dir).await?;

        let reconciler = StyleReconciler::new(&self.catalog);
        let mut reconciled = Vec::with_capacity(items.len());
        for item in items {
            let outcome = reconciler
                .reconcile_from_disk(&self.config.metadata_dir, item, rng)
                .await?;
            reconciled.push(ReconciledItem {
                item: item.clone(),
                reconciled: outcome,
            });
        }

        let mut diff = inventory::diff(
            &reconciled,
            &snapshot,
            self.config.variations_per_content,
        );
        if force {
            diff.needs_generation = reconciled
                .iter()
                .map(|entry| GenerationNeed {
                    content_id: entry.item.content_id.clone(),
                    title: entry.item.title.clone(),
                    kind: if snapshot
                        .has_image(&crate::sidecar::artifact_filename(&entry.item.content_id, 1))
                    {
                        NeedKind::Update
                    } else {
                        NeedKind::New
                    },
                    reason: NeedReason::Forced,
                })
                .collect();
        }

        let preview = inventory::cost_preview(
            &diff,
            self.config.variations_per_content,
            self.config.cost_per_image,
        );

        Ok(RunPlan {
            reconciled,
            snapshot,
            diff,
            preview,
        })
    }

    /// Run the generation loop over a plan.
    pub async fn generate(
        &self,
        plan: &RunPlan,
        client: Gemini,
    ) -> Result<GenerationSummary, PipelineError> {
        let generator = Generator::new(client, self.config.clone());
        Ok(generator
            .run(&self.catalog, &plan.diff.needs_generation, &plan.reconciled)
            .await?)
    }

    /// Build the static site bundle from what exists on disk.
    ///
    /// Builds re-snapshot the directories so artifacts written after
    /// planning (a generate in the same invocation) are picked up.
    pub async fn build_site(&self, plan: &RunPlan) -> Result<BuildReport, PipelineError> {
        let snapshot =
            DirectorySnapshot::capture(&self.config.images_dir, &self.config.metadata_dir).await?;
        Ok(SiteBuilder::new(self.config.clone())
            .build(&plan.reconciled, &snapshot)
            .await?)
    }

    /// Remove (or preview removing) the plan's orphaned files.
    pub async fn cleanup(
        &self,
        plan: &RunPlan,
        dry_run: bool,
        archive: bool,
    ) -> Result<CleanupReport, PipelineError> {
        Ok(inventory::cleanup(
            &plan.diff.orphans,
            &self.config.images_dir,
            &self.config.metadata_dir,
            &self.config.archive_dir,
            &plan.snapshot,
            dry_run,
            archive,
        )
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    const STYLES: &str = r#"{
        "painting_technique_styles": {
            "impasto": {"base_prompt": "thick strokes of oil paint"}
        },
        "visual_storytelling_techniques": {}
    }"#;

    const CONTENT: &str = "---\n\
title: Make Something\n\
author: Paul Graham\n\
type: quote\n\
---\n\
Make something people want.\n";

    fn scaffold(dir: &TempDir) -> std::path::PathBuf {
        let root = dir.path().to_path_buf();
        std::fs::create_dir_all(root.join("content/inspiration")).expect("mkdir");
        std::fs::create_dir_all(root.join("content/styles")).expect("mkdir");
        std::fs::write(root.join("content/styles/styles.json"), STYLES).expect("write");
        std::fs::write(
            root.join("content/inspiration/graham_make_something.md"),
            CONTENT,
        )
        .expect("write");
        root
    }

    #[tokio::test]
    async fn test_open_without_catalog_is_fatal() {
        let dir = TempDir::new().expect("temp dir");
        let result = Pipeline::open(dir.path()).await;
        assert!(matches!(
            result,
            Err(PipelineError::Catalog(CatalogError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_plan_for_fresh_project() {
        let dir = TempDir::new().expect("temp dir");
        let root = scaffold(&dir);

        let pipeline = Pipeline::open(&root).await.expect("open");
        let outcome = pipeline.load_content().await.expect("load");
        assert_eq!(outcome.items.len(), 1);

        let mut rng = StdRng::seed_from_u64(1);
        let plan = pipeline
            .plan(&outcome.items, &mut rng, false)
            .await
            .expect("plan");

        assert_eq!(plan.diff.needs_generation.len(), 1);
        assert_eq!(plan.diff.needs_generation[0].kind, NeedKind::New);
        assert_eq!(plan.preview.image_count, 3);
        assert!((plan.preview.estimated_cost - 0.117).abs() < 1e-9);
        assert!(plan.diff.orphans.is_empty());
        assert_eq!(plan.reconciled[0].reconciled.assignment.name, "impasto");
    }

    #[tokio::test]
    async fn test_force_plan_regenerates_complete_items() {
        let dir = TempDir::new().expect("temp dir");
        let root = scaffold(&dir);
        let config = SiteConfig::new(&root);
        std::fs::create_dir_all(&config.images_dir).expect("mkdir");
        for v in 1..=3 {
            std::fs::write(
                config.images_dir.join(format!("graham_make_something_v{v}.png")),
                b"png",
            )
            .expect("write");
        }

        let pipeline = Pipeline::open(&root).await.expect("open");
        let outcome = pipeline.load_content().await.expect("load");
        let mut rng = StdRng::seed_from_u64(2);

        let plan = pipeline
            .plan(&outcome.items, &mut rng, false)
            .await
            .expect("plan");
        assert!(plan.diff.needs_generation.is_empty());

        let forced = pipeline
            .plan(&outcome.items, &mut rng, true)
            .await
            .expect("plan");
        assert_eq!(forced.diff.needs_generation.len(), 1);
        assert_eq!(forced.diff.needs_generation[0].kind, NeedKind::Update);
        assert_eq!(forced.diff.needs_generation[0].reason, NeedReason::Forced);
    }

    #[tokio::test]
    async fn test_edited_pin_triggers_style_change() {
        use crate::sidecar::{
            sidecar_filename, ContentSnapshot, GenerationRecord, SidecarMetadata, StyleSnapshot,
        };
        use crate::styles::StyleCategory;

        let dir = TempDir::new().expect("temp dir");
        let root = scaffold(&dir);
        std::fs::write(
            root.join("content/styles/styles.json"),
            r#"{
                "painting_technique_styles": {
                    "impasto": {"base_prompt": "thick strokes of oil paint"},
                    "watercolor-wash": {"base_prompt": "translucent watercolor washes"}
                },
                "visual_storytelling_techniques": {}
            }"#,
        )
        .expect("write");
        std::fs::write(
            root.join("content/inspiration/graham_make_something.md"),
            "---\n\
title: Make Something\n\
author: Paul Graham\n\
type: quote\n\
style_category: painting_technique\n\
style_specific: watercolor-wash\n\
---\n\
Make something people want.\n",
        )
        .expect("write");

        // Full coverage on disk, generated under the previously drawn style.
        let config = SiteConfig::new(&root);
        std::fs::create_dir_all(&config.images_dir).expect("mkdir");
        std::fs::create_dir_all(&config.metadata_dir).expect("mkdir");
        for v in 1..=3 {
            std::fs::write(
                config.images_dir.join(format!("graham_make_something_v{v}.png")),
                b"png",
            )
            .expect("write");
        }
        let sidecar = SidecarMetadata {
            content: ContentSnapshot {
                title: "Make Something".to_string(),
                author: "Paul Graham".to_string(),
                content_type: "quote".to_string(),
                body: "Make something people want.".to_string(),
                source_id: "graham_make_something".to_string(),
            },
            style: StyleSnapshot {
                name: "impasto".to_string(),
                category: StyleCategory::PaintingTechnique,
                variation: None,
            },
            generation: GenerationRecord {
                timestamp: "2025-09-08T00:00:00Z".to_string(),
                model: "gemini-2.5-flash-image-preview".to_string(),
                prompt: String::new(),
                prompt_length: 0,
                cost: 0.039,
                image_filename: "graham_make_something_v1.png".to_string(),
                image_path: String::new(),
                success: true,
                error: None,
                note: None,
                dimensions: None,
            },
        };
        sidecar
            .save_json(
                config
                    .metadata_dir
                    .join(sidecar_filename("graham_make_something", 1)),
            )
            .await
            .expect("save");

        let pipeline = Pipeline::open(&root).await.expect("open");
        let outcome = pipeline.load_content().await.expect("load");
        let mut rng = StdRng::seed_from_u64(4);
        let plan = pipeline
            .plan(&outcome.items, &mut rng, false)
            .await
            .expect("plan");

        assert_eq!(
            plan.reconciled[0].reconciled.assignment.name,
            "watercolor-wash"
        );
        assert_eq!(plan.diff.needs_generation.len(), 1);
        assert_eq!(plan.diff.needs_generation[0].kind, NeedKind::Update);
        assert_eq!(
            plan.diff.needs_generation[0].reason,
            NeedReason::StyleChange {
                previous: "impasto".to_string(),
                current: "watercolor-wash".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_build_site_from_plan() {
        let dir = TempDir::new().expect("temp dir");
        let root = scaffold(&dir);

        let pipeline = Pipeline::open(&root).await.expect("open");
        let outcome = pipeline.load_content().await.expect("load");
        let mut rng = StdRng::seed_from_u64(3);
        let plan = pipeline
            .plan(&outcome.items, &mut rng, false)
            .await
            .expect("plan");

        let report = pipeline.build_site(&plan).await.expect("build");
        assert_eq!(report.content_count, 1);
        assert_eq!(report.images_included, 0);
        assert!(root.join("output/content.json").exists());
    }
}
