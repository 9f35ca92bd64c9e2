//! Disk geometry inspection
//!
//! Reads the physical disk's total size and current partition table through
//! the external partitioning tools, and parses their sector-unit output.
//! The parsers are plain functions over text so they can be exercised
//! without a disk.

use crate::error::{RepartError, Result};
use regex::Regex;
use std::process::Command;

/// Immutable snapshot of a disk's size, taken once at the start of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskGeometry {
    /// Bare disk device name (e.g. mmcblk0)
    pub disk: String,
    /// Total disk size in 512-byte sectors
    pub total_sectors: u64,
}

/// One partition record from a sector-unit table dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionLine {
    /// Partition device path (e.g. /dev/mmcblk0p2)
    pub device: String,
    /// Start sector
    pub start: u64,
    /// Size in sectors
    pub size: u64,
    /// Partition type code (e.g. 83)
    pub type_code: String,
}

/// Parsed sfdisk-style dump: raw lines plus the partition records
#[derive(Debug, Clone)]
pub struct TableDump {
    /// Every line of the dump, verbatim, in order
    pub lines: Vec<String>,
    /// The partition records, in listing order
    pub partitions: Vec<PartitionLine>,
}

/// Parse one `<device> : start=N, size=N, type=T` record
pub fn parse_partition_line(line: &str) -> Result<PartitionLine> {
    let re = Regex::new(
        r"^(?P<dev>/dev/\S+)\s*:\s*start=\s*(?P<start>\d+)\s*,\s*size=\s*(?P<size>\d+)\s*,\s*type=\s*(?P<ty>[0-9A-Fa-f-]+)",
    )
    .expect("partition record pattern");

    let caps = re.captures(line.trim()).ok_or_else(|| {
        RepartError::geometry(format!("malformed partition record: '{}'", line.trim()))
    })?;

    let start = caps["start"]
        .parse::<u64>()
        .map_err(|e| RepartError::geometry(format!("bad start sector: {}", e)))?;
    let size = caps["size"]
        .parse::<u64>()
        .map_err(|e| RepartError::geometry(format!("bad size: {}", e)))?;

    Ok(PartitionLine {
        device: caps["dev"].to_string(),
        start,
        size,
        type_code: caps["ty"].to_string(),
    })
}

/// Parse a full sector-unit table dump
///
/// Header lines (label, device, unit, ...) are kept verbatim; any line
/// naming a /dev node is parsed as a partition record and must be
/// well-formed.
pub fn parse_dump(text: &str) -> Result<TableDump> {
    let mut lines = Vec::new();
    let mut partitions = Vec::new();

    for line in text.lines() {
        lines.push(line.to_string());
        if line.trim_start().starts_with("/dev/") {
            partitions.push(parse_partition_line(line)?);
        }
    }

    if lines.is_empty() {
        return Err(RepartError::geometry("empty partition table dump"));
    }

    Ok(TableDump { lines, partitions })
}

/// Parse `blockdev --getsz` output: the disk size as a sector count
pub fn parse_total_sectors(text: &str) -> Result<u64> {
    text.trim()
        .parse::<u64>()
        .map_err(|_| RepartError::geometry(format!("bad disk size: '{}'", text.trim())))
}

/// Extract the current root partition record from a dump
///
/// The starting layout must be exactly boot plus root; the root is the last
/// record. Any other count means the disk was already converted (or never
/// matched the expected layout) and the run is refused rather than
/// miscomputing against the wrong record.
pub fn root_extent(dump: &TableDump) -> Result<&PartitionLine> {
    if dump.partitions.len() != 2 {
        return Err(RepartError::layout(format!(
            "expected exactly 2 partitions (boot, root), found {}",
            dump.partitions.len()
        )));
    }
    Ok(&dump.partitions[1])
}

/// Queries the partitioning tools for a disk's geometry
pub struct GeometryReader;

impl GeometryReader {
    /// Create a new geometry reader
    pub fn new() -> Self {
        Self
    }

    /// Execute a read-only inspection command
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

    /// Read the total size and current table of `disk`
    pub fn read(&self, disk: &str) -> Result<(DiskGeometry, TableDump)> {
        let device = format!("/dev/{}", disk);

        let output = self.execute(Command::new("blockdev").arg("--getsz").arg(&device))?;
        let total_sectors = parse_total_sectors(&String::from_utf8_lossy(&output.stdout))?;

        let output = self.execute(Command::new("sfdisk").arg("--dump").arg(&device))?;
        let dump = parse_dump(&String::from_utf8_lossy(&output.stdout))?;

        Ok((
            DiskGeometry {
                disk: disk.to_string(),
                total_sectors,
            },
            dump,
        ))
    }
}

impl Default for GeometryReader {
    fn default() -> Self {
        Self::new()
    }
}
