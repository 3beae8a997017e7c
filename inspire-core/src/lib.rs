//! Content pipeline for an AI-illustrated inspiration site.
//!
//! This crate provides:
//! - Markdown + YAML frontmatter content loading
//! - A visual style catalog with stable, change-aware style assignment
//! - Inventory reconciliation between expected and existing artifacts
//! - Sequential image generation against the Gemini API
//! - Static site bundling with build-time brightness analysis
//!
//! # Quick Start
//!
//! ```ignore
//! use inspire_core::Pipeline;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::open(".").await?;
//!     let content = pipeline.load_content().await?;
//!
//!     let mut rng = StdRng::from_entropy();
//!     let plan = pipeline.plan(&content.items, &mut rng, false).await?;
//!     println!(
//!         "{} items need generation (~${:.3})",
//!         plan.diff.needs_generation.len(),
//!         plan.preview.estimated_cost
//!     );
//!
//!     pipeline.build_site(&plan).await?;
//!     Ok(())
//! }
//! ```

pub mod brightness;
pub mod config;
pub mod content;
pub mod generate;
pub mod inventory;
pub mod pipeline;
pub mod reconcile;
pub mod sidecar;
pub mod site;
pub mod styles;

mod templates;

// Primary public API
pub use config::SiteConfig;
pub use content::{ContentItem, LoadOutcome};
pub use inventory::{CleanupReport, CostPreview, InventoryDiff, NeedKind, NeedReason};
pub use pipeline::{Pipeline, PipelineError, RunPlan};
pub use reconcile::{Reconciled, ReconciledItem, StyleReconciler};
pub use styles::{StyleAssignment, StyleCatalog, StyleCategory};
