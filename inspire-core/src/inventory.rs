//! Inventory reconciliation between expected and existing artifacts.
//!
//! Expected filenames are derived deterministically from content identity and
//! the configured variation count. The differ classifies every item as
//! current, new, or needing an update, and every stray file as an orphan.
//! Classification runs against a single directory snapshot taken once per
//! run, so mid-run filesystem changes cannot produce inconsistent reads.

use crate::reconcile::ReconciledItem;
use crate::sidecar::{artifact_filename, parse_artifact_filename, parse_sidecar_filename};
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Errors from snapshotting or cleanup.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A one-shot listing of the artifact and metadata directories.
///
/// Filenames map to their sizes in bytes. Missing directories read as empty.
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    pub images: BTreeMap<String, u64>,
    pub sidecars: BTreeMap<String, u64>,
}

impl DirectorySnapshot {
    /// Capture both directories in one pass.
    pub async fn capture(
        images_dir: impl AsRef<Path>,
        metadata_dir: impl AsRef<Path>,
    ) -> Result<Self, InventoryError> {
        Ok(Self {
            images: list_files(images_dir.as_ref()).await?,
            sidecars: list_files(metadata_dir.as_ref()).await?,
        })
    }

    pub fn has_image(&self, filename: &str) -> bool {
        self.images.contains_key(filename)
    }
}

async fn list_files(dir: &Path) -> Result<BTreeMap<String, u64>, InventoryError> {
    let mut files = BTreeMap::new();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if metadata.is_file() {
            files.insert(entry.file_name().to_string_lossy().to_string(), metadata.len());
        }
    }
    Ok(files)
}

/// Whether an item has never been generated or needs regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedKind {
    New,
    Update,
}

/// Why an item needs generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum NeedReason {
    NoImages,
    ContentChange,
    StyleChange { previous: String, current: String },
    Forced,
}

impl NeedReason {
    pub fn label(&self) -> &'static str {
        match self {
            NeedReason::NoImages => "no_images",
            NeedReason::ContentChange => "content_change",
            NeedReason::StyleChange { .. } => "style_change",
            NeedReason::Forced => "forced",
        }
    }
}

/// One entry in the generation plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationNeed {
    pub content_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: NeedKind,
    #[serde(flatten)]
    pub reason: NeedReason,
}

/// Files on disk with no corresponding expected-output slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrphanSet {
    /// Artifacts that cannot belong to any expected slot: the base identity
    /// matches no current content item, the name cannot be parsed, or the
    /// variation index is zero.
    pub missing_content: Vec<String>,

    /// Artifacts whose identity is current but whose variation index
    /// exceeds the configured count.
    pub excess_variation: Vec<String>,

    /// Sidecar files with no matching artifact on disk.
    pub orphaned_sidecars: Vec<String>,
}

impl OrphanSet {
    pub fn is_empty(&self) -> bool {
        self.missing_content.is_empty()
            && self.excess_variation.is_empty()
            && self.orphaned_sidecars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.missing_content.len() + self.excess_variation.len() + self.orphaned_sidecars.len()
    }
}

/// Result of diffing expected against existing artifacts.
#[derive(Debug, Default)]
pub struct InventoryDiff {
    pub needs_generation: Vec<GenerationNeed>,
    pub orphans: OrphanSet,
}

/// Classify every item and every stray file.
pub fn diff(
    items: &[ReconciledItem],
    snapshot: &DirectorySnapshot,
    variations: u32,
) -> InventoryDiff {
    let mut result = InventoryDiff::default();

    for entry in items {
        let item = &entry.item;
        let existing = (1..=variations)
            .filter(|v| snapshot.has_image(&artifact_filename(&item.content_id, *v)))
            .count();

        let need = if existing == 0 {
            Some((NeedKind::New, NeedReason::NoImages))
        } else if entry.reconciled.content_changed {
            Some((NeedKind::Update, NeedReason::ContentChange))
        } else {
            match &entry.reconciled.previous_style {
                Some(previous) if *previous != entry.reconciled.assignment.name => Some((
                    NeedKind::Update,
                    NeedReason::StyleChange {
                        previous: previous.clone(),
                        current: entry.reconciled.assignment.name.clone(),
                    },
                )),
                _ => None,
            }
        };

        if let Some((kind, reason)) = need {
            result.needs_generation.push(GenerationNeed {
                content_id: item.content_id.clone(),
                title: item.title.clone(),
                kind,
                reason,
            });
        }
    }

    let ids: BTreeSet<&str> = items.iter().map(|e| e.item.content_id.as_str()).collect();

    for filename in snapshot.images.keys() {
        match parse_artifact_filename(filename) {
            // Variation indices start at 1; a _v0 file can never be an
            // expected slot, so it files with the unmatchable names.
            Some((base, index)) if index >= 1 && ids.contains(base) => {
                if index > variations {
                    result.orphans.excess_variation.push(filename.clone());
                }
            }
            _ => result.orphans.missing_content.push(filename.clone()),
        }
    }

    for filename in snapshot.sidecars.keys() {
        match parse_sidecar_filename(filename) {
            Some((base, index)) if snapshot.has_image(&artifact_filename(base, index)) => {}
            _ => result.orphans.orphaned_sidecars.push(filename.clone()),
        }
    }

    result
}

/// Projected spend for a generation plan, shown before committing to the
/// paid API calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostPreview {
    pub image_count: u32,
    pub estimated_cost: f64,
}

pub fn cost_preview(diff: &InventoryDiff, variations: u32, cost_per_image: f64) -> CostPreview {
    let image_count = diff.needs_generation.len() as u32 * variations;
    CostPreview {
        image_count,
        estimated_cost: f64::from(image_count) * cost_per_image,
    }
}

/// How a cleanup run finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupStatus {
    DryRun,
    Completed,
    CompletedWithErrors,
}

/// One file the cleanup could not handle.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupFailure {
    pub file: String,
    pub error: String,
}

/// Report of a cleanup run (or of what a dry run would have done).
#[derive(Debug, Serialize)]
pub struct CleanupReport {
    pub status: CleanupStatus,

    /// Files removed, or planned for removal in a dry run.
    pub removed: Vec<String>,

    /// Bytes freed, or that would be freed.
    pub bytes_reclaimed: u64,

    /// Archive folder the orphans were copied into, when archiving ran.
    pub archive_dir: Option<PathBuf>,

    /// Per-file failures; the batch continues past them.
    pub errors: Vec<CleanupFailure>,
}

/// Remove every orphaned file, optionally archiving copies first.
///
/// With `dry_run`, reports the exact file list and byte total without
/// touching disk. Each deletion is independent: failures are collected and
/// reported, never fatal to the batch.
pub async fn cleanup(
    orphans: &OrphanSet,
    images_dir: impl AsRef<Path>,
    metadata_dir: impl AsRef<Path>,
    archive_root: impl AsRef<Path>,
    snapshot: &DirectorySnapshot,
    dry_run: bool,
    archive: bool,
) -> Result<CleanupReport, InventoryError> {
    let images_dir = images_dir.as_ref();
    let metadata_dir = metadata_dir.as_ref();

    let mut targets: Vec<(PathBuf, String, u64)> = Vec::new();
    for filename in orphans
        .missing_content
        .iter()
        .chain(orphans.excess_variation.iter())
    {
        let size = snapshot.images.get(filename).copied().unwrap_or(0);
        targets.push((images_dir.join(filename), filename.clone(), size));
    }
    for filename in &orphans.orphaned_sidecars {
        let size = snapshot.sidecars.get(filename).copied().unwrap_or(0);
        targets.push((metadata_dir.join(filename), filename.clone(), size));
    }

    let bytes_reclaimed: u64 = targets.iter().map(|(_, _, size)| size).sum();
    let planned: Vec<String> = targets.iter().map(|(_, name, _)| name.clone()).collect();

    if dry_run {
        return Ok(CleanupReport {
            status: CleanupStatus::DryRun,
            removed: planned,
            bytes_reclaimed,
            archive_dir: None,
            errors: Vec::new(),
        });
    }

    let mut errors = Vec::new();
    let mut removed = Vec::new();
    let mut reclaimed = 0u64;

    let archive_dir = if archive && !targets.is_empty() {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let dir = archive_root.as_ref().join(format!("orphans_{stamp}"));
        fs::create_dir_all(&dir).await?;
        Some(dir)
    } else {
        None
    };

    for (path, filename, size) in targets {
        if let Some(archive_dir) = &archive_dir {
            if let Err(e) = fs::copy(&path, archive_dir.join(&filename)).await {
                // Never delete what could not be archived.
                tracing::warn!("Failed to archive {}: {}", filename, e);
                errors.push(CleanupFailure {
                    file: filename,
                    error: e.to_string(),
                });
                continue;
            }
        }
        match fs::remove_file(&path).await {
            Ok(()) => {
                removed.push(filename);
                reclaimed += size;
            }
            Err(e) => {
                tracing::warn!("Failed to delete {}: {}", filename, e);
                errors.push(CleanupFailure {
                    file: filename,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(CleanupReport {
        status: if errors.is_empty() {
            CleanupStatus::Completed
        } else {
            CleanupStatus::CompletedWithErrors
        },
        removed,
        bytes_reclaimed: reclaimed,
        archive_dir,
        errors,
    })
}
