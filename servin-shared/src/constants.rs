//! Centralized hardcoded values, paths and defaults.

/// Environment variables the runtime reads.
pub mod envs {
    /// Overrides the runtime's base directory (§6).
    pub const SERVIN_BASE_DIR: &str = "SERVIN_BASE_DIR";
}

/// Directory structure under the base directory (§6 on-disk layout).
pub mod dirs {
    pub const CONTAINERS_DIR: &str = "containers";
    pub const LOGS_DIR: &str = "logs";
    pub const IMAGES_DIR: &str = "images";
    pub const VOLUMES_DIR: &str = "volumes";
    pub const VMS_DIR: &str = "vms";
    pub const ROOTFS_DIR: &str = "rootfs";
}

/// File names within a per-entity directory.
pub mod filenames {
    pub const CONTAINER_CONFIG: &str = "config.json";
    pub const STDOUT_LOG: &str = "stdout.log";
    pub const STDERR_LOG: &str = "stderr.log";
    pub const VOLUME_SIDECAR: &str = "volume.json";
    pub const VM_KERNEL: &str = "vmlinuz-virt";
    pub const VM_INITRAMFS: &str = "initramfs-virt";
    pub const VM_DISK: &str = "disk.qcow2";
    pub const VM_CLOUD_INIT: &str = "cloud-init.iso";
    pub const VM_RUNNING_MARKER: &str = "vm-running";
    pub const RUNTIME_LOCK: &str = ".lock";
}

/// Container defaults.
pub mod container {
    pub const DEFAULT_HOSTNAME: &str = "servin";
    pub const DEFAULT_WORKDIR: &str = "/";
    pub const RLIMIT_NOFILE_SOFT: u64 = 1_048_576;
    pub const RLIMIT_NOFILE_HARD: u64 = 1_048_576;
}

/// Linux bridge network defaults (§4.9).
pub mod network {
    pub const BRIDGE_NAME: &str = "servin0";
    pub const BRIDGE_CIDR: &str = "172.17.0.0/16";
    pub const BRIDGE_GATEWAY: &str = "172.17.0.1";
}

/// VM provisioning defaults (§4.7).
pub mod vm {
    pub const DEFAULT_CPUS: u8 = 2;
    pub const DEFAULT_MEMORY_MB: u32 = 2048;
    pub const DEFAULT_DISK_GB: u32 = 16;
    pub const SSH_PORT_RANGE: std::ops::RangeInclusive<u16> = 2222..=2299;
    pub const SSH_READY_POLL_INTERVAL_SECS: u64 = 2;
    pub const SSH_READY_TIMEOUT_SECS: u64 = 90;
    pub const GRACEFUL_STOP_TIMEOUT_SECS: u64 = 10;
    pub const GUEST_BINARY_PATH: &str = "/usr/local/bin/servin";
    pub const GUEST_ROOT_PASSWORD: &str = "servin123";
    pub const GUEST_USER: &str = "servin";
    pub const ALPINE_DISTRO: &str = "alpine";
}
