//! Disk-image helpers for VM artifacts (§4.7): qcow2 disk creation
//! used by the orchestrator when provisioning a guest VM. The ext4
//! rootfs path the teacher also carries has no counterpart in
//! `servin`'s guest design (the guest boots the same binary as the
//! host over a generic Alpine image, it doesn't assemble its own
//! rootfs image), so only the qcow2 half survives here.

mod constants;
mod qcow2;

pub use qcow2::create_blank_qcow2;
