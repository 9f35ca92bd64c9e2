//! Partition table mutation
//!
//! Builds the new sector-unit table description (current table minus the
//! root record, plus the three new records), stages it to a uniquely named
//! temporary file, and feeds it to the apply tool. Dry-run validates the
//! document without writing; live apply is the point of no return.

use crate::disk::geometry::TableDump;
use crate::disk::planner::PartitionExtent;
use crate::error::{RepartError, Result};
use std::fs::File;
use std::io::Write;
use std::process::{Command, Stdio};

/// MBR type code for a standard Linux filesystem partition
pub const LINUX_PARTITION_TYPE: &str = "83";

/// Ordered line-based table description destined for the apply tool
#[derive(Debug, Clone)]
pub struct PartitionTableDocument {
    lines: Vec<String>,
}

impl PartitionTableDocument {
    /// Build a document from the current dump with `drop_device`'s record removed
    pub fn from_dump(dump: &TableDump, drop_device: &str) -> Self {
        let lines = dump
            .lines
            .iter()
            .filter(|line| {
                let trimmed = line.trim_start();
                !(trimmed.starts_with(drop_device)
                    && trimmed[drop_device.len()..].trim_start().starts_with(':'))
            })
            .cloned()
            .collect();
        Self { lines }
    }

    /// Append a record for `device` covering `extent`, typed as a Linux partition
    pub fn append_partition(&mut self, device: &str, extent: &PartitionExtent) {
        self.lines.push(format!(
            "{} : start={}, size={}, type={}",
            device, extent.start, extent.size, LINUX_PARTITION_TYPE
        ));
    }

    /// The document's lines, in order
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Render the document for the apply tool
    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

/// Applies a table document to a disk, honoring dry-run vs live mode
pub struct TableMutator {
    disk: String,
    live: bool,
}

impl TableMutator {
    /// Create a mutator for `disk`
    pub fn new(disk: &str, live: bool) -> Self {
        Self {
            disk: disk.to_string(),
            live,
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

    /// Stage the document and hand it to the apply tool
    ///
    /// Dry-run invokes the tool in simulate-only mode, which validates the
    /// document against the disk without writing. Live mode writes the
    /// table with the kernel re-read deferred, then asks the kernel to
    /// pick up the new layout.
    pub fn apply(&self, doc: &PartitionTableDocument) -> Result<()> {
        let mut staged = tempfile::Builder::new()
            .prefix("ab-repart-table.")
            .tempfile()?;
        staged.write_all(doc.render().as_bytes())?;
        staged.flush()?;

        log::info!("Staged partition table at {}", staged.path().display());
        for line in doc.lines() {
            log::info!("  {}", line);
        }

        let device = format!("/dev/{}", self.disk);
        let mut cmd = Command::new("sfdisk");
        if self.live {
            cmd.arg("--no-reread").arg("--force");
        } else {
            log::warn!("Dry-run mode: validating the table without writing it");
            cmd.arg("--no-act");
        }
        cmd.arg(&device);
        cmd.stdin(Stdio::from(File::open(staged.path())?));

        let cmd_str = format!("{:?}", cmd);
        log::debug!("Executing: {}", cmd_str);
        let output = cmd.output()?;
        if !output.status.success() {
            return Err(RepartError::TableWriteRejected {
                details: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if self.live {
            self.execute(Command::new("partprobe").arg(&device))?;
        }

        Ok(())
    }
}
