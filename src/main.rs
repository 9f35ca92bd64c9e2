//! Boot disk repartitioner - Main Entry Point
//!
//! CLI wrapper around the repartitioning library.

use ab_repart::{Config, Repartitioner, TerminationGuard};
use clap::Parser;
use std::process;

/// One-shot boot disk repartitioner
///
/// Doubles the root partition in place, carves out an equally sized
/// alternate root, and turns the rest of the disk into a persistent data
/// partition. Without --live this is a dry run that only validates and
/// prints the proposed table.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(after_help = "\
EXAMPLES:
    # Show the proposed layout without touching the disk (default)
    ab-repart

    # Apply the new layout for real (irreversible)
    ab-repart --live

Log verbosity is controlled through RUST_LOG (e.g. RUST_LOG=debug).
")]
struct Args {
    /// Apply the new layout to the disk instead of dry-running
    #[arg(long)]
    live: bool,
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Covers panics and any exit path that never records a result
    let guard = TerminationGuard::new();

    let config = Config {
        live: args.live,
        ..Config::default()
    };

    if config.live {
        log::warn!("LIVE MODE - the partition table of the boot disk will be rewritten");
    } else {
        log::info!("Dry-run mode - no changes will be made (use --live to apply)");
    }

    let result = Repartitioner::new(config).and_then(|repart| repart.run());

    match result {
        Ok(outcome) => {
            guard.disarm();
            println!("{}", outcome.message());
            process::exit(0);
        }
        Err(e) => {
            guard.disarm();
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_to_dry_run() {
        let args = Args::parse_from(["ab-repart"]);
        assert!(!args.live);
    }

    #[test]
    fn test_args_live_flag() {
        let args = Args::parse_from(["ab-repart", "--live"]);
        assert!(args.live);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Args::try_parse_from(["ab-repart", "--force"]).is_err());
    }
}
