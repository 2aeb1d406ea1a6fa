//! Alpine kernel/initramfs artifact fetch (§4.7). Downloaded once per
//! VM directory and reused on subsequent boots — idempotent the same
//! way [`crate::disk::create_blank_qcow2`] is.

use std::path::Path;

use downloader::Downloader;
use servin_shared::constants::vm::ALPINE_DISTRO;
use servin_shared::{ServinError, ServinResult};

const ALPINE_VERSION: &str = "3.20.3";
const ALPINE_ARCH: &str = "x86_64";

fn artifact_url(filename: &str) -> String {
    format!(
        "https://dl-cdn.{ALPINE_DISTRO}linux.org/alpine/v3.20/releases/{ALPINE_ARCH}/{filename}",
    )
}

/// Fetch `vmlinuz-virt`/`initramfs-virt` into the VM directory if not
/// already present there.
pub fn ensure_alpine_artifacts(kernel_path: &Path, initramfs_path: &Path) -> ServinResult<()> {
    if kernel_path.exists() && initramfs_path.exists() {
        return Ok(());
    }
    let dir = kernel_path
        .parent()
        .ok_or_else(|| ServinError::internal("ensure_alpine_artifacts", "kernel_path has no parent directory"))?;
    std::fs::create_dir_all(dir)?;

    let mut downloader = Downloader::builder()
        .download_folder(dir)
        .build()
        .map_err(|e| ServinError::internal("ensure_alpine_artifacts", e))?;

    let mut downloads = Vec::new();
    if !kernel_path.exists() {
        downloads.push(
            downloader::Download::new(&artifact_url("vmlinuz-virt")).file_name(std::path::Path::new("vmlinuz-virt")),
        );
    }
    if !initramfs_path.exists() {
        downloads.push(
            downloader::Download::new(&artifact_url("initramfs-virt"))
                .file_name(std::path::Path::new("initramfs-virt")),
        );
    }

    let results = downloader
        .download(&downloads)
        .map_err(|e| ServinError::internal("ensure_alpine_artifacts", e))?;
    for result in results {
        result.map_err(|e| ServinError::internal("ensure_alpine_artifacts", format!("{ALPINE_VERSION}: {e}")))?;
    }
    Ok(())
}
