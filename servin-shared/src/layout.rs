//! Path builders for the on-disk layout in §6.
//!
//! ```text
//! <base>/containers/<id>/rootfs/
//! <base>/containers/<id>/config.json
//! <base>/logs/<id>/stdout.log
//! <base>/logs/<id>/stderr.log
//! <base>/images/<id>.json
//! <base>/volumes/<name>/_data/
//! <base>/volumes/<name>/volume.json
//! <base>/vms/<name>/vmlinuz-virt
//! <base>/vms/<name>/initramfs-virt
//! <base>/vms/<name>/disk.qcow2
//! <base>/vms/<name>/cloud-init.iso
//! <base>/vms/<name>/vm-running
//! ```

use crate::constants::{dirs, filenames};
use std::path::{Path, PathBuf};

/// All paths derive from a single base directory, resolved once at
/// facade construction (`SERVIN_BASE_DIR` → `~/.servin` → `/tmp/servin`).
#[derive(Clone, Debug)]
pub struct ServinLayout {
    base: PathBuf,
}

impl ServinLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn lock_file(&self) -> PathBuf {
        self.base.join(filenames::RUNTIME_LOCK)
    }

    // --- containers ---

    pub fn containers_dir(&self) -> PathBuf {
        self.base.join(dirs::CONTAINERS_DIR)
    }

    pub fn container_dir(&self, id: &str) -> PathBuf {
        self.containers_dir().join(id)
    }

    pub fn container_rootfs_dir(&self, id: &str) -> PathBuf {
        self.container_dir(id).join(dirs::ROOTFS_DIR)
    }

    pub fn container_config_path(&self, id: &str) -> PathBuf {
        self.container_dir(id).join(filenames::CONTAINER_CONFIG)
    }

    pub fn container_lock_path(&self, id: &str) -> PathBuf {
        self.container_dir(id).join(filenames::RUNTIME_LOCK)
    }

    // --- logs ---

    pub fn logs_dir(&self) -> PathBuf {
        self.base.join(dirs::LOGS_DIR)
    }

    pub fn container_log_dir(&self, id: &str) -> PathBuf {
        self.logs_dir().join(id)
    }

    pub fn stdout_log_path(&self, id: &str) -> PathBuf {
        self.container_log_dir(id).join(filenames::STDOUT_LOG)
    }

    pub fn stderr_log_path(&self, id: &str) -> PathBuf {
        self.container_log_dir(id).join(filenames::STDERR_LOG)
    }

    // --- images ---

    pub fn images_dir(&self) -> PathBuf {
        self.base.join(dirs::IMAGES_DIR)
    }

    pub fn image_record_path(&self, id: &str) -> PathBuf {
        self.images_dir().join(format!("{id}.json"))
    }

    pub fn image_layers_dir(&self, id: &str) -> PathBuf {
        self.images_dir().join(id).join("layers")
    }

    // --- volumes ---

    pub fn volumes_dir(&self) -> PathBuf {
        self.base.join(dirs::VOLUMES_DIR)
    }

    pub fn volume_dir(&self, name: &str) -> PathBuf {
        self.volumes_dir().join(name)
    }

    pub fn volume_data_dir(&self, name: &str) -> PathBuf {
        self.volume_dir(name).join("_data")
    }

    pub fn volume_sidecar_path(&self, name: &str) -> PathBuf {
        self.volume_dir(name).join(filenames::VOLUME_SIDECAR)
    }

    // --- VMs ---

    pub fn vms_dir(&self) -> PathBuf {
        self.base.join(dirs::VMS_DIR)
    }

    pub fn vm_dir(&self, name: &str) -> PathBuf {
        self.vms_dir().join(name)
    }

    pub fn vm_kernel_path(&self, name: &str) -> PathBuf {
        self.vm_dir(name).join(filenames::VM_KERNEL)
    }

    pub fn vm_initramfs_path(&self, name: &str) -> PathBuf {
        self.vm_dir(name).join(filenames::VM_INITRAMFS)
    }

    pub fn vm_disk_path(&self, name: &str) -> PathBuf {
        self.vm_dir(name).join(filenames::VM_DISK)
    }

    pub fn vm_cloud_init_path(&self, name: &str) -> PathBuf {
        self.vm_dir(name).join(filenames::VM_CLOUD_INIT)
    }

    pub fn vm_running_marker_path(&self, name: &str) -> PathBuf {
        self.vm_dir(name).join(filenames::VM_RUNNING_MARKER)
    }

    pub fn vm_config_path(&self, name: &str) -> PathBuf {
        self.vm_dir(name).join("vm.yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_paths_nest_under_base() {
        let layout = ServinLayout::new("/base");
        assert_eq!(
            layout.container_config_path("abc"),
            PathBuf::from("/base/containers/abc/config.json")
        );
        assert_eq!(
            layout.container_rootfs_dir("abc"),
            PathBuf::from("/base/containers/abc/rootfs")
        );
        assert_eq!(
            layout.stdout_log_path("abc"),
            PathBuf::from("/base/logs/abc/stdout.log")
        );
    }

    #[test]
    fn vm_paths_match_section_6_layout() {
        let layout = ServinLayout::new("/base");
        assert_eq!(layout.vm_kernel_path("dev"), PathBuf::from("/base/vms/dev/vmlinuz-virt"));
        assert_eq!(layout.vm_disk_path("dev"), PathBuf::from("/base/vms/dev/disk.qcow2"));
        assert_eq!(
            layout.vm_running_marker_path("dev"),
            PathBuf::from("/base/vms/dev/vm-running")
        );
    }

    #[test]
    fn volume_sidecar_path_is_json_under_volume_dir() {
        let layout = ServinLayout::new("/base");
        assert_eq!(
            layout.volume_sidecar_path("data"),
            PathBuf::from("/base/volumes/data/volume.json")
        );
        assert_eq!(
            layout.volume_data_dir("data"),
            PathBuf::from("/base/volumes/data/_data")
        );
    }
}
