//! Blank qcow2 disk-image creation for the VM orchestrator (§4.7).
//! Grounded on the teacher's `Qcow2Helper::create_disk_native`, kept to
//! the blank-disk path only — `servin` has no base-disk/COW-child
//! concept since each VM's disk is provisioned fresh per guest.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use qcow2_rs::meta::Qcow2Header;
use servin_shared::{ServinError, ServinResult};

use super::constants::{BLOCK_SIZE, CLUSTER_BITS, REFCOUNT_ORDER};

/// Create a sparse qcow2 disk of `size_gb` gibibytes at `disk_path`,
/// unless a disk already exists there (idempotent, §8 property 5).
pub fn create_blank_qcow2(disk_path: &Path, size_gb: u64) -> ServinResult<PathBuf> {
    if let Some(parent) = disk_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if disk_path.exists() {
        tracing::debug!(path = %disk_path.display(), "qcow2 disk already exists");
        return Ok(disk_path.to_path_buf());
    }

    let size_bytes = size_gb * 1024 * 1024 * 1024;

    let (rc_table, rc_block, _l1_table) =
        Qcow2Header::calculate_meta_params(size_bytes, CLUSTER_BITS, REFCOUNT_ORDER, BLOCK_SIZE);
    let clusters = 1 + rc_table.1 + rc_block.1;
    let buffer_size = ((clusters as usize) << CLUSTER_BITS) + BLOCK_SIZE;

    let mut header_buf = vec![0u8; buffer_size];
    Qcow2Header::format_qcow2(&mut header_buf, size_bytes, CLUSTER_BITS, REFCOUNT_ORDER, BLOCK_SIZE)
        .map_err(|e| ServinError::internal("create_blank_qcow2", format!("formatting header: {e}")))?;

    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(disk_path)?;
    file.write_all(&header_buf)?;

    tracing::info!(path = %disk_path.display(), size_gb, "created qcow2 disk");
    Ok(disk_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_blank_qcow2_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.qcow2");
        create_blank_qcow2(&path, 4).unwrap();
        let size_after_first = std::fs::metadata(&path).unwrap().len();
        create_blank_qcow2(&path, 4).unwrap();
        let size_after_second = std::fs::metadata(&path).unwrap().len();
        assert_eq!(size_after_first, size_after_second);
    }
}
