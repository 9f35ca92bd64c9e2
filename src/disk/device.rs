//! Root device identification
//!
//! Resolves the block device backing the live root mount point and decodes
//! its name into a disk plus partition number. Only two device families are
//! recognized: MMC (mmcblkN, with a `p` separator before the partition
//! number) and SCSI-style disks (sdX, partition number appended directly).

use crate::error::{RepartError, Result};
use regex::Regex;
use std::path::Path;

/// Recognized disk naming families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskFamily {
    /// mmcblkN devices; partitions carry a `p` infix (mmcblk0p2)
    Mmc,
    /// sdX devices; partitions append the number directly (sda2)
    Scsi,
}

impl DiskFamily {
    /// Render the device name of partition `number` on `disk`
    pub fn partition_device(&self, disk: &str, number: u32) -> String {
        match self {
            Self::Mmc => format!("{}p{}", disk, number),
            Self::Scsi => format!("{}{}", disk, number),
        }
    }
}

impl std::fmt::Display for DiskFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mmc => write!(f, "MMC"),
            Self::Scsi => write!(f, "SCSI"),
        }
    }
}

/// The partition currently hosting the root filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootPartitionRef {
    /// Bare disk device name (e.g. mmcblk0)
    pub disk: String,
    /// Naming family of the disk
    pub family: DiskFamily,
    /// Partition number on the disk (1-based)
    pub number: u32,
}

impl RootPartitionRef {
    /// Device name of this partition (e.g. mmcblk0p2)
    pub fn device(&self) -> String {
        self.family.partition_device(&self.disk, self.number)
    }
}

/// Find the block device mounted at `mountpoint` in mount-table text
///
/// Returns the device name without the `/dev/` prefix. The text is one
/// mount per line, source followed by mount point, as in `/proc/mounts`.
pub fn root_block_device(mounts: &str, mountpoint: &Path) -> Result<String> {
    let wanted = mountpoint.to_string_lossy();
    for line in mounts.lines() {
        let mut fields = line.split_whitespace();
        let source = match fields.next() {
            Some(s) => s,
            None => continue,
        };
        let target = match fields.next() {
            Some(t) => t,
            None => continue,
        };
        if target == wanted {
            if let Some(name) = source.strip_prefix("/dev/") {
                return Ok(name.to_string());
            }
        }
    }
    Err(RepartError::UnrecognizedRootDevice)
}

/// Decode a partition device name into disk, family, and partition number
pub fn decode_partition(name: &str) -> Result<RootPartitionRef> {
    let bare_disk = Regex::new(r"^(?:mmcblk\d+|sd[a-z]+)$").expect("bare disk pattern");
    let mmc_part = Regex::new(r"^(mmcblk\d+)p(\d*)$").expect("mmc partition pattern");
    let scsi_part = Regex::new(r"^(sd[a-z]+)(\d+)$").expect("scsi partition pattern");

    if bare_disk.is_match(name) {
        return Err(RepartError::NotAPartition(name.to_string()));
    }

    if let Some(caps) = mmc_part.captures(name) {
        let digits = &caps[2];
        if digits.is_empty() {
            return Err(RepartError::MissingPartitionNumber(name.to_string()));
        }
        let number = digits
            .parse::<u32>()
            .map_err(|_| RepartError::MissingPartitionNumber(name.to_string()))?;
        return Ok(RootPartitionRef {
            disk: caps[1].to_string(),
            family: DiskFamily::Mmc,
            number,
        });
    }

    if let Some(caps) = scsi_part.captures(name) {
        let number = caps[2]
            .parse::<u32>()
            .map_err(|_| RepartError::MissingPartitionNumber(name.to_string()))?;
        return Ok(RootPartitionRef {
            disk: caps[1].to_string(),
            family: DiskFamily::Scsi,
            number,
        });
    }

    Err(RepartError::UnrecognizedDiskFamily(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_decode_mmc_partition() {
        let root = decode_partition("mmcblk0p2").unwrap();
        assert_eq!(root.disk, "mmcblk0");
        assert_eq!(root.family, DiskFamily::Mmc);
        assert_eq!(root.number, 2);
        assert_eq!(root.device(), "mmcblk0p2");
    }

    #[test]
    fn test_decode_scsi_partition() {
        let root = decode_partition("sda3").unwrap();
        assert_eq!(root.disk, "sda");
        assert_eq!(root.family, DiskFamily::Scsi);
        assert_eq!(root.number, 3);
        assert_eq!(root.device(), "sda3");
    }

    #[test]
    fn test_bare_disk_rejected() {
        assert!(matches!(
            decode_partition("sda"),
            Err(RepartError::NotAPartition(_))
        ));
        assert!(matches!(
            decode_partition("mmcblk0"),
            Err(RepartError::NotAPartition(_))
        ));
    }

    #[test]
    fn test_nvme_family_rejected() {
        assert!(matches!(
            decode_partition("nvme0n1p2"),
            Err(RepartError::UnrecognizedDiskFamily(_))
        ));
    }

    #[test]
    fn test_missing_partition_number() {
        assert!(matches!(
            decode_partition("mmcblk0p"),
            Err(RepartError::MissingPartitionNumber(_))
        ));
    }

    #[test]
    fn test_root_block_device_lookup() {
        let mounts = "\
/dev/mmcblk0p1 /boot vfat rw,relatime 0 0
/dev/mmcblk0p2 / ext4 rw,noatime 0 0
proc /proc proc rw 0 0
";
        let name = root_block_device(mounts, &PathBuf::from("/")).unwrap();
        assert_eq!(name, "mmcblk0p2");
    }

    #[test]
    fn test_root_block_device_missing() {
        let mounts = "proc /proc proc rw 0 0\n";
        assert!(matches!(
            root_block_device(mounts, &PathBuf::from("/")),
            Err(RepartError::UnrecognizedRootDevice)
        ));
    }

    #[test]
    fn test_non_dev_root_source_rejected() {
        // overlayfs / tmpfs roots have no /dev-backed source
        let mounts = "overlay / overlay rw 0 0\n";
        assert!(matches!(
            root_block_device(mounts, &PathBuf::from("/")),
            Err(RepartError::UnrecognizedRootDevice)
        ));
    }

    #[test]
    fn test_partition_device_rendering() {
        assert_eq!(DiskFamily::Mmc.partition_device("mmcblk1", 4), "mmcblk1p4");
        assert_eq!(DiskFamily::Scsi.partition_device("sdb", 4), "sdb4");
    }
}
