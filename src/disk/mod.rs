//! Disk inspection, layout planning, and partition table mutation

pub mod device;
pub mod geometry;
pub mod planner;
pub mod table;

pub use device::{DiskFamily, RootPartitionRef};
pub use geometry::{DiskGeometry, GeometryReader, PartitionLine, TableDump};
pub use planner::{plan_layout, LayoutPlan, PartitionExtent};
pub use table::{PartitionTableDocument, TableMutator};
