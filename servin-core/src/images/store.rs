//! Image Store (§4.4): `get`, `list`, `tag`, `remove`, `import_tarball`, `save`.
//!
//! One JSON file per image under `<base>/images/<id>.json`, same
//! atomic temp-file-plus-rename discipline as the container State
//! Store. A name:tag index is rebuilt from the on-disk records at
//! startup rather than kept as a separate authoritative file, so a
//! corrupted index can never diverge from reality.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use servin_shared::{ContainerId, ServinError, ServinResult};

use super::defaults::ImageDefaults;
use super::record::{ImageRecord, Layer, NONE_TAG};

#[derive(Clone)]
pub struct ImageStore {
    inner: Arc<RwLock<HashMap<ContainerId, ImageRecord>>>,
    dir: PathBuf,
}

impl ImageStore {
    /// Open (or create) the image store rooted at `dir`, reloading every
    /// record found on disk. Corrupt individual records are skipped with
    /// a warning rather than failing the whole store, mirroring the
    /// teacher's index-load tolerance for corruption.
    pub fn open(dir: PathBuf) -> ServinResult<Self> {
        std::fs::create_dir_all(&dir)?;
        let mut records = HashMap::new();

        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(contents) => match serde_json::from_str::<ImageRecord>(&contents) {
                    Ok(record) => {
                        records.insert(record.id.clone(), record);
                    }
                    Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping corrupt image record"),
                },
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to read image record"),
            }
        }

        Ok(Self {
            inner: Arc::new(RwLock::new(records)),
            dir,
        })
    }

    fn record_path(&self, id: &ContainerId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Write a record atomically (temp file + rename), then update the
    /// in-memory map. Never leaves a half-written `.json` visible.
    fn persist(&self, record: &ImageRecord) -> ServinResult<()> {
        let path = self.record_path(&record.id);
        let tmp = self.dir.join(format!(".{}.tmp", record.id));
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Resolve a reference in order: full ID, short-ID prefix, `name:tag`
    /// (default tag `latest`) (§4.4).
    pub fn resolve(&self, reference: &str) -> ServinResult<ContainerId> {
        let inner = self.inner.read();

        if let Some(id) = ContainerId::parse(reference) {
            if inner.contains_key(&id) {
                return Ok(id);
            }
        }

        let mut short_matches: Vec<&ContainerId> = inner
            .keys()
            .filter(|id| id.as_str().starts_with(reference))
            .collect();
        if short_matches.len() == 1 {
            return Ok(short_matches.remove(0).clone());
        }
        if short_matches.len() > 1 {
            return Err(ServinError::Validation(format!(
                "ambiguous image reference prefix: {reference}"
            )));
        }

        let wanted = if reference.contains(':') {
            reference.to_string()
        } else {
            format!("{reference}:latest")
        };
        inner
            .values()
            .find(|r| r.tag == wanted)
            .map(|r| r.id.clone())
            .ok_or_else(|| ServinError::NotFound(format!("no such image: {reference}")))
    }

    pub fn get(&self, reference: &str) -> ServinResult<ImageRecord> {
        let id = self.resolve(reference)?;
        self.inner
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| ServinError::NotFound(format!("no such image: {reference}")))
    }

    pub fn list(&self) -> Vec<ImageRecord> {
        self.inner.read().values().cloned().collect()
    }

    /// Insert a freshly-built or imported record (§4.4 invariant: tags
    /// within the store are unique).
    pub fn save(&self, record: ImageRecord) -> ServinResult<()> {
        {
            let inner = self.inner.read();
            if record.tag != NONE_TAG && inner.values().any(|r| r.tag == record.tag && r.id != record.id) {
                return Err(ServinError::AlreadyExists(format!(
                    "image tag already in use: {}",
                    record.tag
                )));
            }
        }
        self.persist(&record)?;
        self.inner.write().insert(record.id.clone(), record);
        Ok(())
    }

    pub fn tag(&self, src: &str, dst_tag: &str) -> ServinResult<ImageRecord> {
        let id = self.resolve(src)?;
        let mut inner = self.inner.write();
        if inner.values().any(|r| r.tag == dst_tag && r.id != id) {
            return Err(ServinError::AlreadyExists(format!(
                "image tag already in use: {dst_tag}"
            )));
        }
        let record = inner
            .get_mut(&id)
            .ok_or_else(|| ServinError::NotFound(format!("no such image: {src}")))?;
        record.tag = dst_tag.to_string();
        let snapshot = record.clone();
        drop(inner);
        self.persist(&snapshot)?;
        Ok(snapshot)
    }

    /// Remove an image, refusing if any non-removed container still
    /// references it unless `force` (§3 lifecycle note).
    pub fn remove(&self, reference: &str, force: bool, referenced: impl Fn(&ContainerId) -> bool) -> ServinResult<()> {
        let id = self.resolve(reference)?;
        if !force && referenced(&id) {
            return Err(ServinError::InvalidState(format!(
                "image {reference} is in use by a container; use force to remove anyway"
            )));
        }
        self.inner.write().remove(&id);
        let path = self.record_path(&id);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Import a root filesystem tarball as a new single-layer image.
    pub fn import_tarball(&self, tar_path: &Path, name: Option<&str>, tag: Option<&str>) -> ServinResult<ImageRecord> {
        let id = ContainerId::new();
        let size = super::archive::extract_layer_tarball_streaming(
            tar_path,
            &self.dir.join(id.as_str()).join("rootfs"),
        )?;

        let image_tag = match (name, tag) {
            (Some(n), Some(t)) => format!("{n}:{t}"),
            (Some(n), None) => format!("{n}:latest"),
            _ => NONE_TAG.to_string(),
        };

        let mut record = ImageRecord::untagged(id, ImageDefaults::default());
        record.tag = image_tag;
        record.layers.push(Layer::Imported {
            tar_path: tar_path.to_path_buf(),
        });
        record.size_bytes = size;
        record
            .build_metadata
            .insert("imported_from".into(), tar_path.display().to_string());

        self.save(record.clone())?;
        Ok(record)
    }
}
