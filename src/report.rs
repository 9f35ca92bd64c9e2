//! Terminal outcome reporting
//!
//! Every run ends in exactly one of the [`Outcome`] variants or an error.
//! [`TerminationGuard`] covers the remaining gap: if the process unwinds
//! without recording a deliberate result, a generic abnormal-termination
//! report is still written to standard error.

use std::fmt;

/// Deliberate terminal result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Container virtualization detected; nothing was inspected or changed
    ContainerDetected,
    /// Dry run finished; the proposed table was validated but not written
    DryRunCompleted,
    /// Live run finished; table written, filesystems created, data migrated
    Applied,
}

impl Outcome {
    /// Human-readable completion message for standard output
    pub fn message(&self) -> &'static str {
        match self {
            Self::ContainerDetected => {
                "Container environment detected; skipping repartitioning."
            }
            Self::DryRunCompleted => {
                "Dry run complete; no changes were made. Re-run with --live to apply."
            }
            Self::Applied => {
                "Repartitioning complete: root doubled, alternate root and data partitions created."
            }
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Scoped guard reporting abnormal termination
///
/// Armed for the whole run. Dropping it without [`disarm`](Self::disarm)
/// means no deliberate terminal result was recorded, so a generic error is
/// reported on the way out (e.g. during panic unwinding).
#[derive(Debug)]
pub struct TerminationGuard {
    armed: bool,
}

impl TerminationGuard {
    /// Arm the guard
    pub fn new() -> Self {
        Self { armed: true }
    }

    /// Record that a deliberate terminal result was reached
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Default for TerminationGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TerminationGuard {
    fn drop(&mut self) {
        if self.armed {
            eprintln!("Error: terminated abnormally before reaching a terminal result");
        }
    }
}
