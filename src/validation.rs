//! Pre-flight validation checks

use crate::config::Config;
use crate::error::Result;
use crate::system::is_root;

/// External tools needed to inspect and rewrite the partition table
const TABLE_TOOLS: &[&str] = &["sfdisk", "blockdev", "partprobe"];

/// External tools needed only by the live data migration
const MIGRATION_TOOLS: &[&str] = &["resize2fs", "mkfs.ext4", "mount", "umount", "cp", "diff"];

/// Validation result
#[derive(Debug)]
pub struct ValidationResult {
    /// Whether all checks passed
    pub passed: bool,
    /// Fatal findings
    pub errors: Vec<String>,
    /// Non-fatal findings
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Create a new validation result
    pub fn new() -> Self {
        Self {
            passed: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn add_error(&mut self, msg: String) {
        self.passed = false;
        self.errors.push(msg);
    }

    /// Add a warning
    pub fn add_warning(&mut self, msg: String) {
        self.warnings.push(msg);
    }

    /// Check if validation passed
    pub fn is_ok(&self) -> bool {
        self.passed
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// System validator
pub struct Validator {
    config: Config,
}

impl Validator {
    /// Create a new validator
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run all validation checks
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut result = ValidationResult::new();

        // Check root privileges
        if !is_root() {
            result.add_error("This program must be run as root".to_string());
        }

        // Validate config
        if let Err(e) = self.config.validate() {
            result.add_error(format!("Configuration error: {}", e));
        }

        // Check required commands
        for cmd in TABLE_TOOLS {
            if !self.command_exists(cmd) {
                result.add_error(format!("Required command not found: {}", cmd));
            }
        }

        // Migration tools only matter once the table has been written; in a
        // dry run their absence is merely worth mentioning.
        for cmd in MIGRATION_TOOLS {
            if !self.command_exists(cmd) {
                if self.config.live {
                    result.add_error(format!("Required command not found: {}", cmd));
                } else {
                    result.add_warning(format!(
                        "Command '{}' not found; a live run would need it",
                        cmd
                    ));
                }
            }
        }

        Ok(result)
    }

    /// Check if a command exists
    fn command_exists(&self, cmd: &str) -> bool {
        std::process::Command::new("which")
            .arg(cmd)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_result() {
        let mut result = ValidationResult::new();
        assert!(result.is_ok());

        result.add_warning("Test warning".to_string());
        assert!(result.is_ok());

        result.add_error("Test error".to_string());
        assert!(!result.is_ok());
    }

    #[test]
    fn test_validator_creation() {
        let config = Config::default();
        let validator = Validator::new(config);
        assert!(!validator.config.live);
    }
}
