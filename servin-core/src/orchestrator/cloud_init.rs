//! cloud-init seed ISO generation (§4.7): a `NoCloud` datasource disk
//! carrying `user-data`/`meta-data`, used to set the guest's root
//! password and SSH access on first boot. The actual ISO-9660 image is
//! produced by whichever tool the host has — `genisoimage`, `mkisofs`,
//! or macOS's `hdiutil` — located with `which` rather than assumed.

use std::path::Path;
use std::process::Command;

use servin_shared::constants::vm::{GUEST_ROOT_PASSWORD, GUEST_USER};
use servin_shared::{ServinError, ServinResult};

fn user_data() -> String {
    format!(
        "#cloud-config\nusers:\n  - name: {GUEST_USER}\n    sudo: ALL=(ALL) NOPASSWD:ALL\n    lock_passwd: false\n    plain_text_passwd: '{GUEST_ROOT_PASSWORD}'\nssh_pwauth: true\nchpasswd:\n  expire: false\n"
    )
}

const META_DATA: &str = "instance-id: servin-guest\nlocal-hostname: servin-guest\n";

pub fn generate(iso_path: &Path) -> ServinResult<()> {
    if iso_path.exists() {
        return Ok(());
    }
    let dir = iso_path
        .parent()
        .ok_or_else(|| ServinError::internal("cloud_init::generate", "iso_path has no parent directory"))?;
    std::fs::create_dir_all(dir)?;

    let seed_dir = dir.join("cloud-init-seed");
    std::fs::create_dir_all(&seed_dir)?;
    std::fs::write(seed_dir.join("user-data"), user_data())?;
    std::fs::write(seed_dir.join("meta-data"), META_DATA)?;

    let output = if let Ok(tool) = which::which("genisoimage").or_else(|_| which::which("mkisofs")) {
        Command::new(tool)
            .args(["-output"])
            .arg(iso_path)
            .args(["-volid", "cidata", "-joliet", "-rock"])
            .arg(&seed_dir)
            .output()
    } else if let Ok(hdiutil) = which::which("hdiutil") {
        Command::new(hdiutil)
            .args(["makehybrid", "-o"])
            .arg(iso_path)
            .args(["-hfs", "-joliet", "-iso", "-default-volume-name", "cidata"])
            .arg(&seed_dir)
            .output()
    } else {
        return Err(ServinError::ProviderUnavailable(
            "no ISO-generation tool found (genisoimage, mkisofs, or hdiutil)".into(),
        ));
    }
    .map_err(|e| ServinError::internal("cloud_init::generate", e))?;

    let _ = std::fs::remove_dir_all(&seed_dir);

    if !output.status.success() {
        return Err(ServinError::internal(
            "cloud_init::generate",
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }
    Ok(())
}
