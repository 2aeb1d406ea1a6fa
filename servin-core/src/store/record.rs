//! `ContainerRecord` — the persisted snapshot of a container (§3).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use servin_shared::{ContainerId, PortMapping};

/// The container status state machine (§3, §4.5). Transitions are
/// enforced by [`super::StateStore::transition`], never by callers
/// mutating this field directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerStatus {
    Created,
    Running,
    Stopped,
    Exited,
    Removed,
}

impl ContainerStatus {
    /// The fixed transition table (§3/§8 property 3).
    pub fn can_transition_to(self, next: ContainerStatus) -> bool {
        use ContainerStatus::*;
        matches!(
            (self, next),
            (Created, Running)
                | (Created, Removed)
                | (Created, Exited)
                | (Running, Stopped)
                | (Running, Exited)
                | (Stopped, Running)
                | (Stopped, Removed)
                | (Stopped, Exited)
                | (Exited, Running)
                | (Exited, Removed)
        )
    }
}

/// A single volume binding: host path or named volume, to a container path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeBinding {
    pub source: String,
    pub target: String,
    pub read_only: bool,
}

/// Resource limits, parsed from human-readable quantities (`128m`,
/// `1g`, CPU weight as a float) by [`crate::platform::parse_memory_quantity`]
/// and [`crate::platform::parse_cpu_quantity`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub memory_bytes: Option<u64>,
    pub cpu_weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub id: ContainerId,
    pub name: String,

    // Config snapshot (§3).
    pub image: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub working_dir: String,
    pub hostname: String,
    pub user: Option<String>,
    pub limits: ResourceLimits,
    pub network_mode: String,
    pub ports: Vec<PortMapping>,
    pub volumes: Vec<VolumeBinding>,

    // Runtime fields (§3).
    pub status: ContainerStatus,
    pub pid: Option<u32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    pub exit_code: Option<i32>,
    pub rootfs_path: PathBuf,

    pub labels: HashMap<String, String>,
}
