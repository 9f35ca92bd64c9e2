//! Configuration types and management
//!
//! Defines the run configuration: the dry-run/live mode switch and the
//! filesystem locations the repartitioner reads and mutates. All paths are
//! plain fields so tests can point them at fixtures instead of the live
//! system.

use crate::error::{RepartError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main repartitioner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Apply changes for real; false means dry-run
    pub live: bool,

    /// Mount point of the active root filesystem
    pub root_mountpoint: PathBuf,

    /// Mount table consulted to identify the root device
    pub mounts_path: PathBuf,

    /// Persistent data directory to migrate onto the new data partition
    pub data_dir: PathBuf,

    /// Persistent mount-table file that receives the data partition entry
    pub fstab_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            live: false,
            root_mountpoint: PathBuf::from("/"),
            mounts_path: PathBuf::from("/proc/mounts"),
            data_dir: PathBuf::from("/data"),
            fstab_path: PathBuf::from("/etc/fstab"),
        }
    }
}

impl Config {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.root_mountpoint.is_absolute() {
            return Err(RepartError::validation(format!(
                "Root mount point must be absolute: {}",
                self.root_mountpoint.display()
            )));
        }

        if !self.data_dir.is_absolute() {
            return Err(RepartError::validation(format!(
                "Data directory must be absolute: {}",
                self.data_dir.display()
            )));
        }

        if self.data_dir == PathBuf::from("/") {
            return Err(RepartError::validation(
                "Data directory cannot be the filesystem root",
            ));
        }

        if self.mounts_path.as_os_str().is_empty() || self.fstab_path.as_os_str().is_empty() {
            return Err(RepartError::validation(
                "Mount table paths cannot be empty",
            ));
        }

        Ok(())
    }

    /// Backup location the data directory is renamed to during migration
    pub fn backup_dir(&self) -> PathBuf {
        PathBuf::from(format!("{}.bak", self.data_dir.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(!config.live);
    }

    #[test]
    fn test_backup_dir_is_sibling() {
        let config = Config::default();
        assert_eq!(config.backup_dir(), PathBuf::from("/data.bak"));
    }

    #[test]
    fn test_relative_data_dir_rejected() {
        let mut config = Config::default();
        config.data_dir = PathBuf::from("data");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_root_as_data_dir_rejected() {
        let mut config = Config::default();
        config.data_dir = PathBuf::from("/");
        assert!(config.validate().is_err());
    }
}
