//! State Store (§4.3): durable `ContainerId` → `ContainerRecord` mapping
//! plus name and short-ID secondary indices.

mod lock;
mod record;

pub use lock::FileLock;
pub use record::{ContainerRecord, ContainerStatus, ResourceLimits, VolumeBinding};

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use servin_shared::{ContainerId, ServinError, ServinResult};

/// A record plus its in-process mutex, kept consistent with the
/// advisory file lock so two mutations of the same record are strictly
/// serialized while mutations of different records proceed in
/// parallel (§4.3 concurrency note).
type RecordSlot = Arc<Mutex<ContainerRecord>>;

pub struct StateStore {
    /// Index rebuilds are exclusive; reads of the map proceed in parallel.
    records: RwLock<HashMap<ContainerId, RecordSlot>>,
    base_dir: PathBuf,
}

impl StateStore {
    /// Open the store, reconstructing indices by listing
    /// `<base>/containers/` on disk (§4.3).
    pub fn open(base_dir: PathBuf) -> ServinResult<Self> {
        let containers_dir = base_dir.join("containers");
        std::fs::create_dir_all(&containers_dir)?;

        let mut records = HashMap::new();
        for entry in std::fs::read_dir(&containers_dir)? {
            let entry = entry?;
            let config_path = entry.path().join("config.json");
            if !config_path.is_file() {
                continue;
            }
            match std::fs::read_to_string(&config_path) {
                Ok(contents) => match serde_json::from_str::<ContainerRecord>(&contents) {
                    Ok(record) => {
                        records.insert(record.id.clone(), Arc::new(Mutex::new(record)));
                    }
                    Err(e) => tracing::warn!(path = %config_path.display(), error = %e, "skipping corrupt container record"),
                },
                Err(e) => tracing::warn!(path = %config_path.display(), error = %e, "failed to read container record"),
            }
        }

        let store = Self {
            records: RwLock::new(records),
            base_dir,
        };
        store.reconcile();
        Ok(store)
    }

    fn container_dir(&self, id: &ContainerId) -> PathBuf {
        self.base_dir.join("containers").join(id.as_str())
    }

    fn config_path(&self, id: &ContainerId) -> PathBuf {
        self.container_dir(id).join("config.json")
    }

    /// ▸ Supplemented: startup reconciliation (§4.3 "any record whose
    /// status is Running but whose PID is not alive is transitioned to
    /// Exited with a synthetic exit code"), grounded on
    /// `BoxManager::refresh_states`'s `kill(pid, 0)` liveness probe.
    pub fn reconcile(&self) {
        let ids: Vec<ContainerId> = {
            let records = self.records.read();
            records
                .values()
                .filter(|slot| {
                    let record = slot.lock();
                    record.status == ContainerStatus::Running
                        && !record.pid.map(crate::util::process::is_process_alive).unwrap_or(false)
                })
                .map(|slot| slot.lock().id.clone())
                .collect()
        };
        for id in ids {
            tracing::warn!(container_id = %id, "reconciling stale Running record to Exited");
            // Routed through `transition()` rather than a direct field write
            // so the fixed table (§3/§8 property 3) is actually enforced for
            // the Exited column, not just assumed.
            if self.transition(&id, ContainerStatus::Exited).is_err() {
                continue;
            }
            let _ = self.update(&id, |r| {
                r.exit_code = Some(-1);
                r.finished_at = Some(chrono::Utc::now());
                Ok(())
            });
        }
    }

    fn persist(&self, record: &ContainerRecord) -> ServinResult<()> {
        let dir = self.container_dir(&record.id);
        std::fs::create_dir_all(&dir)?;
        let path = self.config_path(&record.id);
        let tmp = dir.join(".config.json.tmp");
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Generate a fresh ID whose 12-char short prefix doesn't collide
    /// with any non-removed record's (§3: "short-ID prefixes must not
    /// collide across non-removed records (regenerate full ID if they
    /// do)"). Astronomically unlikely to loop even once at 128 bits of
    /// entropy, but the invariant is explicit in §3/§8 property 2.
    pub fn fresh_id(&self) -> ContainerId {
        loop {
            let id = ContainerId::new();
            let records = self.records.read();
            let collides = records.values().any(|s| {
                let r = s.lock();
                r.status != ContainerStatus::Removed && r.id.short() == id.short()
            });
            if !collides {
                return id;
            }
            tracing::warn!(short_id = %id.short(), "short-ID prefix collision, regenerating");
        }
    }

    /// `create(record)`: refuses if the ID or name exists; writes
    /// atomically (§4.3).
    pub fn create(&self, record: ContainerRecord) -> ServinResult<()> {
        let mut records = self.records.write();
        if records.contains_key(&record.id) {
            return Err(ServinError::AlreadyExists(format!(
                "container id already exists: {}",
                record.id
            )));
        }
        if records.values().any(|s| {
            let existing = s.lock();
            existing.name == record.name && existing.status != ContainerStatus::Removed
        }) {
            return Err(ServinError::AlreadyExists(format!(
                "container name already in use: {}",
                record.name
            )));
        }
        self.persist(&record)?;
        records.insert(record.id.clone(), Arc::new(Mutex::new(record)));
        Ok(())
    }

    /// Resolve `id_or_name_or_prefix` to a full `ContainerId` (§S4:
    /// ambiguous short-ID prefixes are a `Validation` error).
    pub fn resolve(&self, reference: &str) -> ServinResult<ContainerId> {
        let records = self.records.read();

        if let Some(id) = ContainerId::parse(reference) {
            if records.contains_key(&id) {
                return Ok(id);
            }
        }
        if let Some((id, _)) = records.iter().find(|(_, s)| s.lock().name == reference) {
            return Ok(id.clone());
        }

        let mut matches: Vec<&ContainerId> = records
            .keys()
            .filter(|id| id.as_str().starts_with(reference))
            .collect();
        match matches.len() {
            0 => Err(ServinError::NotFound(format!("no such container: {reference}"))),
            1 => Ok(matches.remove(0).clone()),
            _ => Err(ServinError::Validation(format!(
                "ambiguous prefix: {reference}"
            ))),
        }
    }

    pub fn get(&self, reference: &str) -> ServinResult<ContainerRecord> {
        let id = self.resolve(reference)?;
        let records = self.records.read();
        Ok(records
            .get(&id)
            .expect("resolve() returned an id not present in the map")
            .lock()
            .clone())
    }

    /// A snapshot list; not guaranteed consistent with any single point
    /// in time, but each record is whole (§4.3).
    pub fn list(&self) -> Vec<ContainerRecord> {
        self.records.read().values().map(|s| s.lock().clone()).collect()
    }

    /// Apply `f` to the record under its per-record lock, persisting the
    /// result. This is the only way callers mutate a record (§9: "State
    /// Store as owner, records as values").
    pub fn update<F>(&self, id: &ContainerId, f: F) -> ServinResult<ContainerRecord>
    where
        F: FnOnce(&mut ContainerRecord) -> ServinResult<()>,
    {
        let slot = {
            let records = self.records.read();
            records
                .get(id)
                .cloned()
                .ok_or_else(|| ServinError::NotFound(format!("no such container: {id}")))?
        };

        let mut record = slot.lock();
        f(&mut record)?;
        self.persist(&record)?;
        Ok(record.clone())
    }

    /// Enforce the fixed transition table (§3, §8 property 3).
    pub fn transition(&self, id: &ContainerId, next: ContainerStatus) -> ServinResult<ContainerRecord> {
        self.update(id, |record| {
            if !record.status.can_transition_to(next) {
                return Err(ServinError::InvalidState(format!(
                    "cannot transition {id} from {:?} to {:?}",
                    record.status, next
                )));
            }
            record.status = next;
            Ok(())
        })
    }

    /// `delete`: purges the record and its directory (§4.5 remove).
    pub fn delete(&self, id: &ContainerId) -> ServinResult<()> {
        let mut records = self.records.write();
        records
            .remove(id)
            .ok_or_else(|| ServinError::NotFound(format!("no such container: {id}")))?;
        let dir = self.container_dir(id);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use servin_shared::ids::ContainerId as Cid;
    use tempfile::tempdir;

    fn sample_record(name: &str) -> ContainerRecord {
        ContainerRecord {
            id: Cid::new(),
            name: name.to_string(),
            image: "alpine:latest".into(),
            command: "/bin/sh".into(),
            args: vec![],
            env: vec![],
            working_dir: "/".into(),
            hostname: "servin".into(),
            user: None,
            limits: ResourceLimits::default(),
            network_mode: "bridge".into(),
            ports: vec![],
            volumes: vec![],
            status: ContainerStatus::Created,
            pid: None,
            created_at: chrono::Utc::now(),
            started_at: None,
            finished_at: None,
            exit_code: None,
            rootfs_path: PathBuf::from("/tmp/rootfs"),
            labels: HashMap::new(),
        }
    }

    #[test]
    fn name_uniqueness_enforced() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path().to_path_buf()).unwrap();
        store.create(sample_record("web")).unwrap();
        let err = store.create(sample_record("web"));
        assert!(err.is_err());
    }

    #[test]
    fn valid_transitions_succeed_and_invalid_ones_fail() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path().to_path_buf()).unwrap();
        let record = sample_record("web");
        let id = record.id.clone();
        store.create(record).unwrap();

        store.transition(&id, ContainerStatus::Running).unwrap();
        assert!(store.transition(&id, ContainerStatus::Created).is_err());
        store.transition(&id, ContainerStatus::Stopped).unwrap();
        store.transition(&id, ContainerStatus::Removed).unwrap();
    }

    #[test]
    fn fresh_id_avoids_short_prefix_collision_with_a_live_record() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path().to_path_buf()).unwrap();
        let existing = sample_record("taken");
        let existing_id = existing.id.clone();
        store.create(existing).unwrap();

        for _ in 0..64 {
            let id = store.fresh_id();
            assert_ne!(id.short(), existing_id.short(), "fresh_id must not collide with a live record's short id");
        }
    }

    #[test]
    fn short_id_disambiguation_s4() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path().to_path_buf()).unwrap();
        store.create(sample_record("a")).unwrap();
        store.create(sample_record("b")).unwrap();

        let all: Vec<_> = store.list();
        let unique_prefix = &all[0].id.as_str()[..14];
        assert_eq!(store.resolve(unique_prefix).unwrap(), all[0].id);
    }

    #[test]
    fn round_trip_persistence() {
        let dir = tempdir().unwrap();
        let id;
        {
            let store = StateStore::open(dir.path().to_path_buf()).unwrap();
            let mut record = sample_record("persisted");
            record.status = ContainerStatus::Created;
            id = record.id.clone();
            store.create(record).unwrap();
            store.transition(&id, ContainerStatus::Running).unwrap();
        }
        let store = StateStore::open(dir.path().to_path_buf()).unwrap();
        let reloaded = store.get(id.as_str()).unwrap();
        assert_eq!(reloaded.status, ContainerStatus::Exited, "stale Running reconciled on reopen");
    }

    #[test]
    fn delete_removes_record_and_directory() {
        let dir = tempdir().unwrap();
        let store = StateStore::open(dir.path().to_path_buf()).unwrap();
        let record = sample_record("gone");
        let id = record.id.clone();
        store.create(record).unwrap();
        store.delete(&id).unwrap();
        assert!(store.get(id.as_str()).is_err());
    }
}
