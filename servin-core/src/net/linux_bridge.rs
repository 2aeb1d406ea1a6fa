//! Linux bridge/veth/iptables mechanics (§4.9). Shells out to `ip` and
//! `iptables` rather than reimplementing rtnetlink — the same
//! trade-off the jailer's Linux path takes for anything that isn't
//! itself the container's namespace/cgroup setup.

use std::process::Command;

use servin_shared::{ServinError, ServinResult};

use super::NetworkRecord;

fn run(program: &str, args: &[&str]) -> ServinResult<()> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| ServinError::internal(program, e))?;
    if !output.status.success() {
        return Err(ServinError::internal(
            program,
            format!("{} {:?}: {}", program, args, String::from_utf8_lossy(&output.stderr)),
        ));
    }
    Ok(())
}

/// Idempotent: `ip link add` fails with "File exists" if the bridge is
/// already there, which is treated as success.
pub fn ensure_bridge(record: &NetworkRecord) -> ServinResult<()> {
    let exists = Command::new("ip")
        .args(["link", "show", &record.name])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);
    if exists {
        return Ok(());
    }
    run("ip", &["link", "add", "name", &record.name, "type", "bridge"])?;
    run("ip", &["addr", "add", &format!("{}/16", record.gateway), "dev", &record.name])?;
    run("ip", &["link", "set", &record.name, "up"])?;
    Ok(())
}

pub fn teardown_bridge(record: &NetworkRecord) -> ServinResult<()> {
    run("ip", &["link", "delete", &record.name])
}

fn veth_names(container_id: &str) -> (String, String) {
    let suffix = &container_id[..container_id.len().min(8)];
    (format!("veth{suffix}h"), format!("veth{suffix}c"))
}

pub fn attach_veth(record: &NetworkRecord, container_id: &str, container_pid: u32) -> ServinResult<()> {
    let (host_side, container_side) = veth_names(container_id);
    run("ip", &["link", "add", &host_side, "type", "veth", "peer", "name", &container_side])?;
    run("ip", &["link", "set", &host_side, "master", &record.name])?;
    run("ip", &["link", "set", &host_side, "up"])?;
    run("ip", &["link", "set", &container_side, "netns", &container_pid.to_string()])?;
    Ok(())
}

pub fn detach_veth(_record: &NetworkRecord, container_id: &str) -> ServinResult<()> {
    let (host_side, _container_side) = veth_names(container_id);
    // The container-side end is destroyed automatically when its netns
    // is torn down; only the host-side end needs explicit cleanup.
    let _ = run("ip", &["link", "delete", &host_side]);
    Ok(())
}

pub fn publish_port(record: &NetworkRecord, host_port: u16, container_ip: &str, container_port: u16) -> ServinResult<()> {
    run(
        "iptables",
        &[
            "-t",
            "nat",
            "-A",
            "PREROUTING",
            "-i",
            "eth0",
            "-p",
            "tcp",
            "--dport",
            &host_port.to_string(),
            "-j",
            "DNAT",
            "--to-destination",
            &format!("{container_ip}:{container_port}"),
        ],
    )?;
    let _ = &record.name;
    Ok(())
}
