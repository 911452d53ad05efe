//! Filter and sticker resource registration
//!
//! Resources are `.fbd` bundles laid out as
//! `<root>/filters/portrait/<id>/<id>.fbd` and
//! `<root>/stickers/face/<id>/<id>.fbd`. A missing or rejected bundle only
//! disables that one effect.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::EffectsProcessor;

/// Resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Filter,
    Sticker,
}

/// Ids of the resources to register at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceManifest {
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default)]
    pub stickers: Vec<String>,
}

impl Default for ResourceManifest {
    fn default() -> Self {
        Self {
            filters: [
                "initial_heart",
                "first_love",
                "vivid",
                "confession",
                "milk_tea",
                "mousse",
                "japanese",
                "dawn",
                "cookie",
                "lively",
                "pure",
                "fair",
                "snow",
                "plain",
                "natural",
                "rose",
                "extraordinary",
                "tender",
                "tender_2",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            stickers: vec!["rabbit".to_string()],
        }
    }
}

/// Location of a resource bundle under `root`
pub fn resource_path(root: &Path, kind: ResourceKind, id: &str) -> PathBuf {
    let file = format!("{id}.fbd");
    match kind {
        ResourceKind::Filter => root.join("filters").join("portrait").join(id).join(file),
        ResourceKind::Sticker => root.join("stickers").join("face").join(id).join(file),
    }
}

/// Outcome of a registration pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationReport {
    pub registered: Vec<String>,
    /// (id, reason) for each resource that could not be registered
    pub failed: Vec<(String, String)>,
}

impl RegistrationReport {
    pub fn all_registered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Read every bundle named in `manifest` and hand it to the processor.
pub fn register_resources(
    processor: &mut dyn EffectsProcessor,
    root: &Path,
    manifest: &ResourceManifest,
) -> RegistrationReport {
    let mut report = RegistrationReport::default();

    let entries = manifest
        .filters
        .iter()
        .map(|id| (ResourceKind::Filter, id))
        .chain(manifest.stickers.iter().map(|id| (ResourceKind::Sticker, id)));

    for (kind, id) in entries {
        let path = resource_path(root, kind, id);
        let result = std::fs::read(&path)
            .map_err(|e| format!("{}: {}", path.display(), e))
            .and_then(|data| {
                match kind {
                    ResourceKind::Filter => processor.register_filter(id, &data),
                    ResourceKind::Sticker => processor.register_sticker(id, &data),
                }
                .map_err(|e| e.to_string())
            });

        match result {
            Ok(()) => {
                tracing::debug!(id = %id, kind = ?kind, "Registered resource");
                report.registered.push(id.clone());
            }
            Err(reason) => {
                tracing::error!(id = %id, kind = ?kind, %reason, "Failed to register resource");
                report.failed.push((id.clone(), reason));
            }
        }
    }

    tracing::info!(
        registered = report.registered.len(),
        failed = report.failed.len(),
        "Resource registration finished"
    );
    report
}
