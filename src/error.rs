//! Error types for the repartitioner
//!
//! Provides comprehensive error handling using thiserror for ergonomic error definitions.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for repartitioner operations
pub type Result<T> = std::result::Result<T, RepartError>;

/// Main error type for the repartitioner
#[derive(Error, Debug)]
pub enum RepartError {
    /// No mount entry matched the root mount point
    #[error("Could not determine the block device backing the root filesystem")]
    UnrecognizedRootDevice,

    /// Root device name matches none of the supported naming conventions
    #[error("Unrecognized disk family for device '{0}' (supported: mmcblkN, sdX)")]
    UnrecognizedDiskFamily(String),

    /// Root device is a bare disk, not a partition
    #[error("Device '{0}' is a whole disk, not a partition")]
    NotAPartition(String),

    /// No trailing numeric partition index could be extracted
    #[error("Device '{0}' has no trailing partition number")]
    MissingPartitionNumber(String),

    /// Disk inspection output could not be parsed
    #[error("Failed to parse disk geometry: {0}")]
    GeometryParse(String),

    /// Disk layout does not match the expected boot+root starting state
    #[error("Unsupported disk layout: {0}")]
    UnsupportedLayout(String),

    /// Disk too small to hold the new layout
    #[error(
        "Insufficient space: need more than {needed_sectors} sectors after the root start, \
         only {available_sectors} available"
    )]
    InsufficientSpace {
        /// Sectors the grown root and its twin would claim
        needed_sectors: u64,
        /// Sectors between the root start and the end of the disk
        available_sectors: u64,
    },

    /// The partition tool rejected the new table
    #[error("Partition table write rejected: {details}")]
    TableWriteRejected {
        /// Diagnostic output from the apply tool
        details: String,
    },

    /// Post-migration verification found differences between backup and copy
    #[error(
        "Data verification mismatch: copied data differs from the original, \
         backup preserved at {}",
        .backup.display()
    )]
    DataVerificationMismatch {
        /// Location of the preserved backup directory
        backup: PathBuf,
    },

    /// Not running with root privileges
    #[error("Insufficient privileges. This program must be run as root.")]
    InsufficientPrivilege,

    /// Command execution failed
    #[error("Command '{cmd}' failed with exit code {code}: {stderr}")]
    CommandFailed {
        /// The command line that was run
        cmd: String,
        /// Its exit code
        code: i32,
        /// Captured standard error
        stderr: String,
    },

    /// Validation error
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RepartError {
    /// Create a validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a geometry parse error
    pub fn geometry<S: Into<String>>(msg: S) -> Self {
        Self::GeometryParse(msg.into())
    }

    /// Create an unsupported-layout error
    pub fn layout<S: Into<String>>(msg: S) -> Self {
        Self::UnsupportedLayout(msg.into())
    }

    /// Check if this error class is always raised before any disk mutation
    ///
    /// Discovery, parse, planning, and precondition failures abort the run
    /// while the disk is still untouched. Command and I/O failures can
    /// occur on either side of the table write and are not classified.
    pub fn is_pre_mutation(&self) -> bool {
        matches!(
            self,
            Self::UnrecognizedRootDevice
                | Self::UnrecognizedDiskFamily(_)
                | Self::NotAPartition(_)
                | Self::MissingPartitionNumber(_)
                | Self::GeometryParse(_)
                | Self::UnsupportedLayout(_)
                | Self::InsufficientSpace { .. }
                | Self::InsufficientPrivilege
                | Self::ValidationError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = RepartError::validation("test");
        assert!(matches!(err, RepartError::ValidationError(_)));
        assert!(err.is_pre_mutation());
    }

    #[test]
    fn test_unrecognized_family_message() {
        let err = RepartError::UnrecognizedDiskFamily("nvme0n1p2".to_string());
        assert!(err.to_string().contains("nvme0n1p2"));
    }

    #[test]
    fn test_verification_mismatch_names_backup() {
        let err = RepartError::DataVerificationMismatch {
            backup: PathBuf::from("/data.bak"),
        };
        assert!(err.to_string().contains("/data.bak"));
        assert!(!err.is_pre_mutation());
    }

    #[test]
    fn test_command_failed() {
        let err = RepartError::CommandFailed {
            cmd: "sfdisk /dev/mmcblk0".to_string(),
            code: 1,
            stderr: "device busy".to_string(),
        };
        assert!(err.to_string().contains("sfdisk /dev/mmcblk0"));
    }
}
