//! Volume resource manager (§4.9): a named directory plus a
//! `volume.json` sidecar recording its metadata, addressed through
//! [`servin_shared::layout::ServinLayout`]'s `volume_dir`/
//! `volume_data_dir`/`volume_sidecar_path` builders.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use servin_shared::layout::ServinLayout;
use servin_shared::{ServinError, ServinResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub labels: HashMap<String, String>,
}

pub struct VolumeManager {
    layout: ServinLayout,
}

impl VolumeManager {
    pub fn new(layout: ServinLayout) -> Self {
        Self { layout }
    }

    /// `create`: refuses if a volume of this name already exists
    /// (mirrors the State Store's `AlreadyExists` convention).
    pub fn create(&self, name: &str, labels: HashMap<String, String>) -> ServinResult<VolumeRecord> {
        let sidecar = self.layout.volume_sidecar_path(name);
        if sidecar.is_file() {
            return Err(ServinError::AlreadyExists(format!("volume already exists: {name}")));
        }
        std::fs::create_dir_all(self.layout.volume_data_dir(name))?;
        let record = VolumeRecord { name: name.to_string(), created_at: Utc::now(), labels };
        self.persist(&record)?;
        Ok(record)
    }

    fn persist(&self, record: &VolumeRecord) -> ServinResult<()> {
        let path = self.layout.volume_sidecar_path(&record.name);
        std::fs::write(path, serde_json::to_string_pretty(record)?)?;
        Ok(())
    }

    pub fn inspect(&self, name: &str) -> ServinResult<VolumeRecord> {
        let path = self.layout.volume_sidecar_path(name);
        let contents = std::fs::read_to_string(&path)
            .map_err(|_| ServinError::NotFound(format!("no such volume: {name}")))?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn list(&self) -> ServinResult<Vec<VolumeRecord>> {
        let dir = self.layout.volumes_dir();
        std::fs::create_dir_all(&dir)?;
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(record) = self.inspect(name) {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    /// Remove the volume's directory and sidecar. The container-reference
    /// guard (§3: "refused if any non-removed container binds it, unless
    /// forced") lives one layer up at `ServinRuntime::remove_volume`,
    /// which is the only caller with visibility into the State Store;
    /// `force` is accepted here only so callers have a uniform signature.
    pub fn remove(&self, name: &str, _force: bool) -> ServinResult<()> {
        let dir = self.layout.volume_dir(name);
        if !dir.exists() {
            return Err(ServinError::NotFound(format!("no such volume: {name}")));
        }
        std::fs::remove_dir_all(dir)?;
        Ok(())
    }

    /// Remove every volume not currently bound to a live container;
    /// `in_use` is the set of volume names the caller's State Store
    /// scan found referenced by a non-removed container record.
    pub fn prune(&self, in_use: &std::collections::HashSet<String>) -> ServinResult<Vec<String>> {
        let mut pruned = Vec::new();
        for record in self.list()? {
            if !in_use.contains(&record.name) && self.remove(&record.name, true).is_ok() {
                pruned.push(record.name);
            }
        }
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_twice_is_rejected() {
        let dir = tempdir().unwrap();
        let manager = VolumeManager::new(ServinLayout::new(dir.path().to_path_buf()));
        manager.create("data", HashMap::new()).unwrap();
        assert!(manager.create("data", HashMap::new()).is_err());
    }

    #[test]
    fn remove_deletes_data_and_sidecar() {
        let dir = tempdir().unwrap();
        let manager = VolumeManager::new(ServinLayout::new(dir.path().to_path_buf()));
        manager.create("data", HashMap::new()).unwrap();
        std::fs::write(manager.layout.volume_data_dir("data").join("f"), b"x").unwrap();
        manager.remove("data", false).unwrap();
        assert!(manager.inspect("data").is_err());
    }

    #[test]
    fn remove_missing_volume_not_found() {
        let dir = tempdir().unwrap();
        let manager = VolumeManager::new(ServinLayout::new(dir.path().to_path_buf()));
        assert!(manager.remove("ghost", false).is_err());
    }

    #[test]
    fn prune_removes_only_unreferenced_volumes() {
        let dir = tempdir().unwrap();
        let manager = VolumeManager::new(ServinLayout::new(dir.path().to_path_buf()));
        manager.create("kept", HashMap::new()).unwrap();
        manager.create("gone", HashMap::new()).unwrap();
        let in_use: std::collections::HashSet<String> = ["kept".to_string()].into_iter().collect();
        let pruned = manager.prune(&in_use).unwrap();
        assert_eq!(pruned, vec!["gone".to_string()]);
        assert!(manager.inspect("kept").is_ok());
    }
}
