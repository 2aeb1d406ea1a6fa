//! Dispatcher (§4.8): decides whether a container operation runs
//! natively (Linux, privileged) or is relayed into the guest VM, and
//! when relayed, translates the operation into the canonical `servin`
//! CLI invocation the guest's own binary understands.

use servin_shared::{PortMapping, ServinResult};

use crate::orchestrator::VmOrchestrator;
use crate::platform;

/// The default VM a host-level `servin` process relays every container
/// operation through when native isolation is unavailable. One guest
/// VM per host process keeps the design in §4.7/§4.8 simple; a future
/// per-image or per-network VM pool is out of scope.
pub const DEFAULT_VM_ID: &str = "default";

pub enum Route {
    Native,
    Vm,
}

pub fn route() -> Route {
    if platform::native_containers_supported() {
        Route::Native
    } else {
        Route::Vm
    }
}

/// The inputs needed to build the canonical guest invocation (§4.8):
/// deterministic, sorted port/volume ordering so repeated translations
/// of the same logical request are byte-identical.
pub struct CreateArgs<'a> {
    pub name: &'a str,
    pub image: &'a str,
    pub env: &'a [(String, String)],
    pub ports: &'a [PortMapping],
    pub volumes: &'a [(String, String, bool)],
    pub working_dir: &'a str,
    pub detach: bool,
    pub command: &'a str,
    pub args: &'a [String],
}

/// Build the canonical `servin run ...` argv the guest's own CLI
/// accepts (§6: "Guest-side invocation shape"), with ports and volumes
/// sorted so two calls describing the same container produce an
/// identical argv (§6/§S5 determinism).
pub fn build_create_argv(create: &CreateArgs) -> Vec<String> {
    let mut argv = vec!["run".to_string(), "--name".to_string(), create.name.to_string()];

    let mut ports: Vec<&PortMapping> = create.ports.iter().collect();
    ports.sort_by_key(|p| p.sort_key());
    for port in ports {
        argv.push("-p".to_string());
        let suffix = match port.protocol {
            servin_shared::PortProtocol::Tcp => String::new(),
            servin_shared::PortProtocol::Udp => "/udp".to_string(),
        };
        match &port.host_ip {
            Some(ip) => argv.push(format!("{ip}:{}:{}{suffix}", port.host_port, port.container_port)),
            None => argv.push(format!("{}:{}{suffix}", port.host_port, port.container_port)),
        }
    }

    let mut volumes: Vec<&(String, String, bool)> = create.volumes.iter().collect();
    volumes.sort_by(|a, b| a.1.cmp(&b.1));
    for (source, target, read_only) in volumes {
        argv.push("-v".to_string());
        let suffix = if *read_only { ":ro" } else { "" };
        argv.push(format!("{source}:{target}{suffix}"));
    }

    let mut env: Vec<&(String, String)> = create.env.iter().collect();
    env.sort_by(|a, b| a.0.cmp(&b.0));
    for (k, v) in env {
        argv.push("-e".to_string());
        argv.push(format!("{k}={v}"));
    }

    if create.working_dir != "/" {
        argv.push("-w".to_string());
        argv.push(create.working_dir.to_string());
    }
    if create.detach {
        argv.push("-d".to_string());
    }

    argv.push(create.image.to_string());
    if !create.command.is_empty() {
        argv.push(create.command.to_string());
        argv.extend(create.args.iter().cloned());
    }
    argv
}

/// Relay a container-create request into the default guest VM and
/// return the new container ID the guest's own `create` printed as its
/// last stdout line.
pub fn create_in_vm(orchestrator: &VmOrchestrator, create: &CreateArgs) -> ServinResult<String> {
    let argv = build_create_argv(create);
    let output = orchestrator.run_container(DEFAULT_VM_ID, &argv)?;
    last_line(&output.stdout).ok_or_else(|| {
        servin_shared::ServinError::internal("dispatcher::create_in_vm", "guest produced no container id")
    })
}

fn last_line(s: &str) -> Option<String> {
    s.lines().map(str::trim).filter(|l| !l.is_empty()).last().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use servin_shared::{PortMapping, PortProtocol};

    #[test]
    fn build_create_argv_sorts_ports_and_volumes_deterministically() {
        let ports = vec![
            PortMapping { host_ip: None, host_port: 9090, container_port: 90, protocol: PortProtocol::Tcp },
            PortMapping { host_ip: None, host_port: 8080, container_port: 80, protocol: PortProtocol::Tcp },
        ];
        let volumes = vec![
            ("/data/b".to_string(), "/mnt/b".to_string(), false),
            ("/data/a".to_string(), "/mnt/a".to_string(), true),
        ];
        let create = CreateArgs {
            name: "web",
            image: "alpine:latest",
            env: &[],
            ports: &ports,
            volumes: &volumes,
            working_dir: "/",
            detach: true,
            command: "",
            args: &[],
        };
        let argv = build_create_argv(&create);
        let p_idx = argv.iter().position(|a| a == "8080:80").unwrap();
        let q_idx = argv.iter().position(|a| a == "9090:90").unwrap();
        assert!(p_idx < q_idx);
        let a_idx = argv.iter().position(|a| a == "/data/a:/mnt/a:ro").unwrap();
        let b_idx = argv.iter().position(|a| a == "/data/b:/mnt/b").unwrap();
        assert!(a_idx < b_idx);
    }

    #[test]
    fn last_line_ignores_trailing_blank_lines() {
        assert_eq!(last_line("abc123\n\n"), Some("abc123".to_string()));
    }
}
