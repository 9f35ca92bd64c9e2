//! System utilities: privilege and environment probes

use crate::error::Result;
use std::path::Path;
use std::process::Command;

/// Check if running as root
pub fn is_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}

/// Check if running inside container virtualization
///
/// Prefers `systemd-detect-virt --container` (exit 0 means a container was
/// detected). When the tool is unavailable, falls back to the marker files
/// container runtimes leave behind.
pub fn in_container() -> bool {
    match Command::new("systemd-detect-virt").arg("--container").output() {
        Ok(output) => output.status.success(),
        Err(_) => {
            Path::new("/.dockerenv").exists() || Path::new("/run/.containerenv").exists()
        }
    }
}

/// Sync filesystems
pub fn sync() -> Result<()> {
    Command::new("sync").status()?;
    Ok(())
}
