//! One-shot boot disk repartitioner
//!
//! Converts a boot+root two-partition disk into a four-partition layout on
//! the running system: the root partition doubles in place, an equally
//! sized alternate root is carved directly after it, and everything left is
//! allocated to a persistent data partition that the existing data
//! directory is migrated onto.
//!
//! # Architecture
//!
//! The crate is organized into modules:
//! - `config`: run configuration and validation
//! - `disk`: device identification, geometry reading, layout planning, and
//!   table mutation
//! - `migrate`: filesystem creation and the copy-verify-swap data migration
//! - `system`: privilege and container probes
//! - `validation`: pre-flight checks
//! - `report`: terminal outcomes and the abnormal-termination guard
//! - `error`: error types and handling
//!
//! # Safety model
//!
//! The default mode is a dry run: the new table is computed, staged, and
//! validated but never written. A live run rewrites the partition table of
//! the disk the system is running from; once the table is written there is
//! no rollback. The data migration keeps the original data as a backup
//! until a recursive diff confirms the copy, and a mismatch preserves that
//! backup instead of declaring success.
//!
//! # Example
//!
//! ```rust,no_run
//! use ab_repart::*;
//!
//! # fn main() -> Result<()> {
//! let config = Config::default(); // dry-run
//! let outcome = Repartitioner::new(config)?.run()?;
//! println!("{}", outcome);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod disk;
pub mod error;
pub mod migrate;
pub mod report;
pub mod system;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use disk::{DiskFamily, GeometryReader, LayoutPlan, PartitionExtent, RootPartitionRef};
pub use error::{RepartError, Result};
pub use migrate::{DataMigrator, MigrationDevices};
pub use report::{Outcome, TerminationGuard};
pub use validation::{ValidationResult, Validator};

use bytesize::ByteSize;
use disk::geometry;
use disk::table::{PartitionTableDocument, TableMutator};
use std::fs;

/// Bytes per sector, for human-readable size reporting
const SECTOR_BYTES: u64 = 512;

/// Main repartitioning orchestrator
pub struct Repartitioner {
    config: Config,
}

impl Repartitioner {
    /// Create a new repartitioner with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run the repartitioning sequence
    ///
    /// Dry-run stops after the table document has been validated; a live
    /// run continues through the data migration. Every failure aborts the
    /// run.
    pub fn run(&self) -> Result<Outcome> {
        log::info!("Phase 1: Environment checks");
        if system::in_container() {
            log::info!("Container virtualization detected; nothing to do");
            return Ok(Outcome::ContainerDetected);
        }
        if !system::is_root() {
            return Err(RepartError::InsufficientPrivilege);
        }
        self.preflight()?;

        log::info!("Phase 2: Identifying root device");
        let mounts = fs::read_to_string(&self.config.mounts_path)?;
        let root_device = disk::device::root_block_device(&mounts, &self.config.root_mountpoint)?;
        let root = disk::device::decode_partition(&root_device)?;
        if root.number < 2 {
            return Err(RepartError::layout(format!(
                "root filesystem on partition {} of {}; expected a boot partition before it",
                root.number, root.disk
            )));
        }
        log::info!(
            "Root filesystem on /dev/{} ({} disk {}, partition {})",
            root_device,
            root.family,
            root.disk,
            root.number
        );

        log::info!("Phase 3: Reading disk geometry");
        let (disk_geometry, dump) = GeometryReader::new().read(&root.disk)?;
        let root_line = geometry::root_extent(&dump)?;
        let root_dev_path = format!("/dev/{}", root.device());
        if root_line.device != root_dev_path {
            return Err(RepartError::layout(format!(
                "last partition in the table is {}, but the root filesystem lives on {}",
                root_line.device, root_dev_path
            )));
        }
        log::info!(
            "Disk /dev/{}: {} sectors ({}), root at {} + {} sectors",
            disk_geometry.disk,
            disk_geometry.total_sectors,
            ByteSize(disk_geometry.total_sectors * SECTOR_BYTES),
            root_line.start,
            root_line.size
        );

        log::info!("Phase 4: Planning new layout");
        let plan = disk::plan_layout(disk_geometry.total_sectors, root_line.start, root_line.size)?;
        log::info!(
            "  root:        start={} size={} ({})",
            plan.resized_root.start,
            plan.resized_root.size,
            ByteSize(plan.resized_root.size * SECTOR_BYTES)
        );
        log::info!(
            "  second root: start={} size={} ({})",
            plan.second_root.start,
            plan.second_root.size,
            ByteSize(plan.second_root.size * SECTOR_BYTES)
        );
        log::info!(
            "  data:        start={} size={} ({})",
            plan.data.start,
            plan.data.size,
            ByteSize(plan.data.size * SECTOR_BYTES)
        );

        log::info!(
            "Phase 5: {} partition table",
            if self.config.live {
                "Writing"
            } else {
                "Validating"
            }
        );
        let mut doc = PartitionTableDocument::from_dump(&dump, &root_line.device);
        doc.append_partition(&root_dev_path, &plan.resized_root);
        let second_root_dev = format!(
            "/dev/{}",
            root.family.partition_device(&root.disk, root.number + 1)
        );
        doc.append_partition(&second_root_dev, &plan.second_root);
        let data_dev = format!(
            "/dev/{}",
            root.family.partition_device(&root.disk, root.number + 2)
        );
        doc.append_partition(&data_dev, &plan.data);

        TableMutator::new(&root.disk, self.config.live).apply(&doc)?;
        if !self.config.live {
            return Ok(Outcome::DryRunCompleted);
        }

        log::info!("Phase 6: Migrating data");
        let devices = MigrationDevices {
            root: root_dev_path,
            second_root: second_root_dev,
            data: data_dev,
        };
        DataMigrator::new(&self.config).run(&devices)?;
        system::sync()?;

        log::info!("Repartitioning completed successfully");
        Ok(Outcome::Applied)
    }

    /// Run pre-flight validation, mapping findings to log output
    fn preflight(&self) -> Result<()> {
        let validator = Validator::new(self.config.clone());
        let result = validator.validate()?;

        for warning in &result.warnings {
            log::warn!("Warning: {}", warning);
        }

        if !result.is_ok() {
            for error in &result.errors {
                log::error!("Error: {}", error);
            }
            return Err(RepartError::validation("Pre-flight checks failed"));
        }

        Ok(())
    }
}
