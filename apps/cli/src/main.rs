//! fstab-builder CLI - interactive fstab construction for discovered devices.
//!
//! Walks every ext4/NTFS partition blkid reports, asks the operator which
//! ones to persist, then commits and validates the resulting mount table,
//! rolling back from the automatic backup if validation fails.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use fstab_builder_core::builder::{BuilderConfig, FstabBuilder, RunOutcome};
use fstab_builder_core::device::BlkidSource;
use fstab_builder_core::fstab::FsConfigStore;
use fstab_builder_core::mount::{E2label, MountAll};
use fstab_builder_core::prompt::TtyPrompter;

/// Interactive fstab builder.
#[derive(Parser)]
#[command(name = "fstab-builder")]
#[command(about = "Build fstab entries for discovered devices", long_about = None)]
struct Cli {
    /// Path to the fstab file.
    #[arg(long, default_value = "/etc/fstab")]
    fstab: PathBuf,

    /// Directory under which mount points are created.
    #[arg(long, default_value = "/mnt")]
    mount_base: PathBuf,

    /// Prompt to replace entries whose UUID is already configured.
    #[arg(long)]
    overwrite: bool,

    /// Skip device node and /dev/disk/by-uuid existence checks.
    #[arg(long)]
    skip_device_checks: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut prompter = match TtyPrompter::open() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(1);
        }
    };

    let store = FsConfigStore::new(&cli.fstab);
    let config = BuilderConfig {
        mount_base: cli.mount_base,
        overwrite: cli.overwrite,
        device_checks: !cli.skip_device_checks,
        require_root: true,
    };

    let mut builder = FstabBuilder::new(
        config,
        &store,
        &BlkidSource,
        &mut prompter,
        &E2label,
        &MountAll,
    );

    match builder.run() {
        Ok(RunOutcome::Committed { appended, backup }) => {
            println!(
                "Added {appended} entr{} to {}; backup at {}",
                if appended == 1 { "y" } else { "ies" },
                cli.fstab.display(),
                backup.display()
            );
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::NoEntries { .. }) => {
            println!("No entries added; {} left untouched", cli.fstab.display());
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::RolledBack { backup }) => {
            eprintln!(
                "Mount table validation failed; {} restored from {}",
                cli.fstab.display(),
                backup.display()
            );
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}
