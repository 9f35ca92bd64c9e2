//! Data migration onto the new layout
//!
//! Runs only after a live table write. Resizes the grown root filesystem,
//! creates filesystems on the two new partitions, and moves the persistent
//! data directory onto the data partition with a copy-verify-swap protocol:
//! the original data is kept as a backup until a recursive diff confirms
//! the copy, and a mismatch preserves the backup for inspection.

use crate::config::Config;
use crate::error::{RepartError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Filesystem type created on the new partitions
const DATA_FSTYPE: &str = "ext4";

/// Directory names the verification diff must ignore
const VERIFY_EXCLUDES: &[&str] = &["lost+found"];

/// Device paths of the partitions the migration operates on
#[derive(Debug, Clone)]
pub struct MigrationDevices {
    /// The grown root partition (filesystem resized in place)
    pub root: String,
    /// The freshly carved alternate root partition
    pub second_root: String,
    /// The freshly carved data partition
    pub data: String,
}

/// Performs the post-write filesystem and data work
pub struct DataMigrator {
    data_dir: PathBuf,
    backup_dir: PathBuf,
    fstab_path: PathBuf,
}

impl DataMigrator {
    /// Create a migrator from the run configuration
    pub fn new(config: &Config) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            backup_dir: config.backup_dir(),
            fstab_path: config.fstab_path.clone(),
        }
    }

    /// Execute a command
    fn execute(&self, cmd: &mut Command) -> Result<std::process::Output> {
        let cmd_str = format!("{:?}", cmd);
        log::debug!("Executing: {}", cmd_str);
        let output = cmd.output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RepartError::CommandFailed {
                cmd: cmd_str,
                code: output.status.code().unwrap_or(-1),
                stderr: stderr.to_string(),
            });
        }

        Ok(output)
    }

    /// Run the full migration sequence
    ///
    /// Each step is fatal on failure; there is no rollback once the table
    /// has been written.
    pub fn run(&self, devices: &MigrationDevices) -> Result<()> {
        log::info!("Resizing root filesystem on {}", devices.root);
        self.execute(Command::new("resize2fs").arg(&devices.root))?;

        log::info!("Creating filesystem on {}", devices.second_root);
        self.execute(
            Command::new(format!("mkfs.{}", DATA_FSTYPE))
                .arg("-F")
                .arg(&devices.second_root),
        )?;

        log::info!("Creating filesystem on {}", devices.data);
        self.execute(
            Command::new(format!("mkfs.{}", DATA_FSTYPE))
                .arg("-F")
                .arg(&devices.data),
        )?;

        self.copy_data(&devices.data)?;
        self.swap_mounts(&devices.data)?;
        self.verify_and_discard_backup()?;

        Ok(())
    }

    /// Copy the data directory onto the new partition via a scratch mount
    fn copy_data(&self, data_device: &str) -> Result<()> {
        let scratch = tempfile::Builder::new()
            .prefix("ab-repart-data.")
            .tempdir()?;
        let scratch_path = scratch.path().to_path_buf();

        log::info!(
            "Copying {} to {} (mounted at {})",
            self.data_dir.display(),
            data_device,
            scratch_path.display()
        );
        self.execute(Command::new("mount").arg(data_device).arg(&scratch_path))?;

        // Copy contents, not the directory itself, preserving attributes
        let copy_result = self.execute(
            Command::new("cp")
                .arg("-a")
                .arg(format!("{}/.", self.data_dir.display()))
                .arg(&scratch_path),
        );

        // Unmount before surfacing any copy failure, or the scratch dir
        // cannot be cleaned up
        let umount_result = self.execute(Command::new("umount").arg(&scratch_path));
        copy_result?;
        umount_result?;

        Ok(())
    }

    /// Swap the data mount point to the new partition
    ///
    /// The old directory becomes the backup; a fresh directory takes its
    /// place, gains a persistent mount entry, and is mounted.
    fn swap_mounts(&self, data_device: &str) -> Result<()> {
        log::info!(
            "Moving {} to {}",
            self.data_dir.display(),
            self.backup_dir.display()
        );
        fs::rename(&self.data_dir, &self.backup_dir)?;
        fs::create_dir_all(&self.data_dir)?;

        self.register_mount(data_device)?;
        self.execute(Command::new("mount").arg(&self.data_dir))?;

        Ok(())
    }

    /// Append the data partition to the persistent mount table
    fn register_mount(&self, data_device: &str) -> Result<()> {
        let fstab = fs::read_to_string(&self.fstab_path).unwrap_or_default();
        if fstab_has_entry(&fstab, &self.data_dir) {
            log::warn!(
                "{} already lists {}; leaving the existing entry",
                self.fstab_path.display(),
                self.data_dir.display()
            );
            return Ok(());
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.fstab_path)?;
        writeln!(file, "{}", fstab_entry(data_device, &self.data_dir))?;
        Ok(())
    }

    /// Diff the backup against the mounted copy; delete the backup on match
    fn verify_and_discard_backup(&self) -> Result<()> {
        log::info!(
            "Verifying {} against {}",
            self.backup_dir.display(),
            self.data_dir.display()
        );
        verify_copy(&self.backup_dir, &self.data_dir)?;

        log::info!("Verification passed; removing {}", self.backup_dir.display());
        fs::remove_dir_all(&self.backup_dir)?;
        Ok(())
    }
}

/// Render the persistent mount-table entry for the data partition
pub(crate) fn fstab_entry(device: &str, mountpoint: &Path) -> String {
    format!(
        "{}  {}  {}  defaults  0  2",
        device,
        mountpoint.display(),
        DATA_FSTYPE
    )
}

/// Check whether the mount table already binds `mountpoint`
pub(crate) fn fstab_has_entry(fstab: &str, mountpoint: &Path) -> bool {
    let wanted = mountpoint.to_string_lossy();
    fstab.lines().any(|line| {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return false;
        }
        let mut parts = trimmed.split_whitespace();
        let _source = parts.next();
        parts.next() == Some(wanted.as_ref())
    })
}

/// Recursively compare two directories with the external diff capability
///
/// Exit code 0 means identical, 1 means a difference was found, anything
/// else is a tool failure. Filesystem-internal recovery directories are
/// excluded from the comparison.
pub(crate) fn verify_copy(original: &Path, copy: &Path) -> Result<()> {
    let mut cmd = Command::new("diff");
    cmd.arg("-r");
    for name in VERIFY_EXCLUDES {
        cmd.arg(format!("--exclude={}", name));
    }
    cmd.arg(original).arg(copy);

    let cmd_str = format!("{:?}", cmd);
    log::debug!("Executing: {}", cmd_str);
    let output = cmd.output()?;

    match output.status.code() {
        Some(0) => Ok(()),
        Some(1) => Err(RepartError::DataVerificationMismatch {
            backup: original.to_path_buf(),
        }),
        code => Err(RepartError::CommandFailed {
            cmd: cmd_str,
            code: code.unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_fstab_entry_format() {
        let entry = fstab_entry("/dev/mmcblk0p4", &PathBuf::from("/data"));
        assert_eq!(entry, "/dev/mmcblk0p4  /data  ext4  defaults  0  2");
    }

    #[test]
    fn test_fstab_has_entry() {
        let fstab = "\
# /etc/fstab
/dev/mmcblk0p1  /boot  vfat  defaults  0  2
/dev/mmcblk0p2  /      ext4  defaults,noatime  0  1
";
        assert!(fstab_has_entry(fstab, &PathBuf::from("/boot")));
        assert!(!fstab_has_entry(fstab, &PathBuf::from("/data")));
    }

    #[test]
    fn test_fstab_has_entry_ignores_comments() {
        let fstab = "# /dev/sda4  /data  ext4  defaults  0  2\n";
        assert!(!fstab_has_entry(fstab, &PathBuf::from("/data")));
    }

    #[test]
    fn test_verify_copy_identical_dirs() {
        let original = tempfile::tempdir().unwrap();
        let copy = tempfile::tempdir().unwrap();
        for dir in [original.path(), copy.path()] {
            fs::create_dir(dir.join("sub")).unwrap();
            fs::write(dir.join("sub/file.txt"), b"payload").unwrap();
        }
        assert!(verify_copy(original.path(), copy.path()).is_ok());
    }

    #[test]
    fn test_verify_copy_ignores_lost_and_found() {
        let original = tempfile::tempdir().unwrap();
        let copy = tempfile::tempdir().unwrap();
        fs::write(original.path().join("file.txt"), b"payload").unwrap();
        fs::write(copy.path().join("file.txt"), b"payload").unwrap();
        fs::create_dir(copy.path().join("lost+found")).unwrap();
        assert!(verify_copy(original.path(), copy.path()).is_ok());
    }

    #[test]
    fn test_verify_copy_mismatch_preserves_backup() {
        let original = tempfile::tempdir().unwrap();
        let copy = tempfile::tempdir().unwrap();
        fs::write(original.path().join("file.txt"), b"payload").unwrap();
        fs::write(copy.path().join("file.txt"), b"corrupted").unwrap();

        let err = verify_copy(original.path(), copy.path()).unwrap_err();
        match err {
            RepartError::DataVerificationMismatch { backup } => {
                assert_eq!(backup, original.path());
                // The backup is reported, not cleaned up
                assert!(backup.exists());
            }
            other => panic!("expected verification mismatch, got {}", other),
        }
    }

    #[test]
    fn test_migrator_paths_from_config() {
        let config = Config::default();
        let migrator = DataMigrator::new(&config);
        assert_eq!(migrator.data_dir, PathBuf::from("/data"));
        assert_eq!(migrator.backup_dir, PathBuf::from("/data.bak"));
    }
}
