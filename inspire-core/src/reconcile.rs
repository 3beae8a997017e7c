//! Stable style assignment across pipeline runs.
//!
//! The central invariant: as long as a content item's body text is unchanged
//! since the last generation, re-running the pipeline any number of times
//! returns the same assignment. Frontmatter that explicitly pins an existing
//! style resolves to that pin on every run, so editing the pin surfaces as a
//! style change against the recorded state. For `random` requests the
//! recorded assignment is returned untouched; a fresh draw happens exactly
//! when no prior record exists or the recorded body text differs from the
//! current one.
//!
//! Change detection is raw string equality on the body text, matching the
//! recorded snapshot byte for byte.

use crate::content::ContentItem;
use crate::sidecar::{SidecarError, SidecarMetadata};
use crate::styles::{StyleAssignment, StyleCatalog, StyleCategory};
use rand::Rng;
use std::path::Path;

/// Outcome of reconciling one content item against its recorded state.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// The style assignment to use for this run.
    pub assignment: StyleAssignment,

    /// True when a prior record exists and its body text differs.
    pub content_changed: bool,

    /// Style name recorded by the prior generation, if any.
    pub previous_style: Option<String>,
}

/// A content item paired with its reconciled assignment for this run.
#[derive(Debug, Clone)]
pub struct ReconciledItem {
    pub item: ContentItem,
    pub reconciled: Reconciled,
}

/// Decides whether an item keeps its recorded style or draws a new one.
pub struct StyleReconciler<'a> {
    catalog: &'a StyleCatalog,
}

impl<'a> StyleReconciler<'a> {
    pub fn new(catalog: &'a StyleCatalog) -> Self {
        Self { catalog }
    }

    /// Pure reconciliation core; the sidecar lookup is the caller's concern.
    pub fn reconcile<R: Rng>(
        &self,
        prior: Option<&SidecarMetadata>,
        item: &ContentItem,
        rng: &mut R,
    ) -> Reconciled {
        let previous_style = prior.map(|record| record.style.name.clone());
        let content_changed = match prior {
            Some(record) if record.content.body != item.body => {
                tracing::info!("Content changed for '{}'", item.content_id);
                true
            }
            _ => false,
        };

        // An explicit, valid pin wins on every run; stability only governs
        // what random draws return between runs.
        if let Some(pin) = self.pinned(item) {
            return Reconciled {
                assignment: pin,
                content_changed,
                previous_style,
            };
        }

        let assignment = match prior {
            Some(record) if !content_changed => record.assignment(),
            _ => self.draw(item, rng),
        };
        Reconciled {
            assignment,
            content_changed,
            previous_style,
        }
    }

    /// The frontmatter's explicit style request, when it names an existing
    /// style in a known category.
    fn pinned(&self, item: &ContentItem) -> Option<StyleAssignment> {
        if item.style_specific == "random" {
            return None;
        }
        let category = StyleCategory::parse(&item.style_category)?;
        self.catalog
            .styles_in(category)
            .contains_key(&item.style_specific)
            .then(|| StyleAssignment {
                name: item.style_specific.clone(),
                category,
            })
    }

    /// Reconcile against the variation-1 sidecar on disk.
    pub async fn reconcile_from_disk<R: Rng>(
        &self,
        metadata_dir: impl AsRef<Path>,
        item: &ContentItem,
        rng: &mut R,
    ) -> Result<Reconciled, SidecarError> {
        let prior = SidecarMetadata::load_for(metadata_dir, &item.content_id, 1).await?;
        Ok(self.reconcile(prior.as_ref(), item, rng))
    }

    fn draw<R: Rng>(&self, item: &ContentItem, rng: &mut R) -> StyleAssignment {
        self.catalog
            .select(&item.style_category, &item.style_specific, rng)
    }
}
