//! `ImageRecord` — the persisted, serializable form of an image (§3).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use super::defaults::ImageDefaults;
use servin_shared::ContainerId;

/// Special tag denoting an untagged image (§3 invariant).
pub const NONE_TAG: &str = "<none>:<none>";

/// A single element of an image's ordered content list.
///
/// Opaque to callers beyond the three kinds a buildfile produces:
/// `scratch` initializes an empty rootfs, `run` is a metadata-only
/// marker for a build-time command, `copy` records a file placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layer {
    Scratch,
    Run { command: Vec<String> },
    Copy { sources: Vec<String>, dest: String },
    Imported { tar_path: PathBuf },
}

/// A fully built image: an ordered layer list plus the config a
/// container created `FROM` this image should start with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: ContainerId,
    /// `name:tag`, or [`NONE_TAG`] if untagged.
    pub tag: String,
    pub layers: Vec<Layer>,
    pub config: ImageDefaults,
    pub labels: HashMap<String, String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub size_bytes: u64,
    /// Build-metadata map: `context`, `buildfile`, `built_at`, ... (§4.4).
    pub build_metadata: HashMap<String, String>,
}

impl ImageRecord {
    pub fn untagged(id: ContainerId, config: ImageDefaults) -> Self {
        Self {
            id,
            tag: NONE_TAG.to_string(),
            layers: Vec::new(),
            config,
            labels: HashMap::new(),
            created_at: chrono::Utc::now(),
            size_bytes: 0,
            build_metadata: HashMap::new(),
        }
    }
}
