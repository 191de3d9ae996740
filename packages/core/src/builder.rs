//! The interactive fstab builder run loop.
//!
//! One run walks the phases in order: preconditions, backup, enumeration,
//! per-record processing, commit, validation with rollback. Each record
//! produces an explicit [`RecordOutcome`] consumed by the outer loop, so a
//! skipped record never aborts the run and there are no early exits.

use std::collections::HashSet;
use std::path::PathBuf;

use nix::unistd::Uid;

use crate::device::{self, DeviceRecord, DeviceSource, FsKind};
use crate::error::{Error, Result};
use crate::fstab::{self, ConfigStore, MountEntry};
use crate::mount::{self, Labeler, TableVerifier};
use crate::prompt::Prompter;

/// Configuration for one builder run.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Directory under which mount points are created.
    pub mount_base: PathBuf,
    /// Prompt to replace entries whose UUID is already configured.
    /// Without this, a duplicate UUID skips the record.
    pub overwrite: bool,
    /// Verify device nodes and by-uuid symlinks before prompting.
    pub device_checks: bool,
    /// Require an effective UID of 0. Disabled in tests.
    pub require_root: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            mount_base: PathBuf::from("/mnt"),
            overwrite: false,
            device_checks: true,
            require_root: true,
        }
    }
}

/// Why a record was skipped. Skips are warnings, never run failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// blkid reported no UUID for the device.
    MissingUuid,
    /// The device node is gone from /dev.
    DeviceNodeAbsent,
    /// Operator answered anything but yes.
    Declined,
    /// Mount name was empty or invalid after sanitizing.
    InvalidMountName { name: String },
    /// Mount point directory could not be created.
    MountPointFailed { message: String },
    /// UUID already configured and no overwrite consent.
    DuplicateUuid,
    /// Rendered entry did not have exactly six fields.
    MalformedEntry,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingUuid => write!(f, "device has no UUID"),
            Self::DeviceNodeAbsent => write!(f, "device node does not exist"),
            Self::Declined => write!(f, "declined by operator"),
            Self::InvalidMountName { name } => {
                write!(f, "mount name {name:?} is invalid after sanitizing")
            }
            Self::MountPointFailed { message } => {
                write!(f, "mount point creation failed: {message}")
            }
            Self::DuplicateUuid => write!(f, "UUID already configured"),
            Self::MalformedEntry => write!(f, "generated entry is malformed"),
        }
    }
}

/// Result of processing a single device record.
#[derive(Debug)]
pub enum RecordOutcome {
    /// Entry staged for commit. `replace` marks an overwrite-consented
    /// duplicate whose prior line is removed at commit time.
    Staged { entry: MountEntry, replace: bool },
    /// Record skipped; the run continues.
    Skipped(SkipReason),
}

/// Terminal state of a run that did not abort.
#[derive(Debug)]
pub enum RunOutcome {
    /// Entries were appended and the mount table validated.
    Committed { appended: usize, backup: PathBuf },
    /// Nothing was staged; the config file was not touched.
    NoEntries { backup: PathBuf },
    /// Validation failed and the config file was restored from backup.
    RolledBack { backup: PathBuf },
}

/// Interactive builder for persistent mount configuration entries.
pub struct FstabBuilder<'a> {
    config: BuilderConfig,
    store: &'a dyn ConfigStore,
    source: &'a dyn DeviceSource,
    prompter: &'a mut dyn Prompter,
    labeler: &'a dyn Labeler,
    verifier: &'a dyn TableVerifier,
}

impl<'a> FstabBuilder<'a> {
    pub fn new(
        config: BuilderConfig,
        store: &'a dyn ConfigStore,
        source: &'a dyn DeviceSource,
        prompter: &'a mut dyn Prompter,
        labeler: &'a dyn Labeler,
        verifier: &'a dyn TableVerifier,
    ) -> Self {
        Self {
            config,
            store,
            source,
            prompter,
            labeler,
            verifier,
        }
    }

    /// Runs all phases once.
    ///
    /// Fatal conditions (privileges, missing config, backup or commit
    /// write failures, a failed restore) return an error; everything
    /// per-record is a logged skip.
    pub fn run(&mut self) -> Result<RunOutcome> {
        if self.config.require_root && !Uid::effective().is_root() {
            return Err(Error::NotRoot);
        }
        if !self.store.exists() {
            return Err(Error::FstabMissing {
                path: self.store.path().to_path_buf(),
            });
        }

        let backup = self.store.backup()?;
        log::info!(
            "backed up {} to {}",
            self.store.path().display(),
            backup.display()
        );

        let lines = self.source.probe()?;
        let records = device::candidate_records(&lines);
        let existing = self.store.read()?;

        let mut staged: Vec<(MountEntry, bool)> = Vec::new();
        let mut skipped = 0usize;

        for record in &records {
            let staged_uuids: HashSet<String> =
                staged.iter().map(|(e, _)| e.uuid.clone()).collect();

            match self.process_record(record, &existing, &staged_uuids)? {
                RecordOutcome::Staged { entry, replace } => {
                    if replace {
                        staged.retain(|(e, _)| e.uuid != entry.uuid);
                    }
                    staged.push((entry, replace));
                }
                RecordOutcome::Skipped(reason) => {
                    log::warn!("skipping {}: {}", record.path.display(), reason);
                    skipped += 1;
                }
            }
        }

        if staged.is_empty() {
            log::info!(
                "no entries staged ({skipped} skipped); {} left untouched",
                self.store.path().display()
            );
            return Ok(RunOutcome::NoEntries { backup });
        }

        self.commit(&existing, &staged)?;
        log::info!("committed {} entries ({} skipped)", staged.len(), skipped);

        match self.verifier.verify() {
            Ok(()) => Ok(RunOutcome::Committed {
                appended: staged.len(),
                backup,
            }),
            Err(e) => {
                log::error!("{e}; restoring from {}", backup.display());
                self.store.restore(&backup)?;
                Ok(RunOutcome::RolledBack { backup })
            }
        }
    }

    /// Walks one device record through confirmation and staging.
    fn process_record(
        &mut self,
        record: &DeviceRecord,
        existing: &str,
        staged_uuids: &HashSet<String>,
    ) -> Result<RecordOutcome> {
        let Some(uuid) = record.uuid.clone() else {
            return Ok(RecordOutcome::Skipped(SkipReason::MissingUuid));
        };

        if self.config.device_checks {
            if !record.node_exists() {
                return Ok(RecordOutcome::Skipped(SkipReason::DeviceNodeAbsent));
            }
            if !device::uuid_resolves(&uuid) {
                log::warn!(
                    "UUID {uuid} does not resolve under {}; entry may not mount at boot",
                    device::BY_UUID_DIR
                );
            }
        }

        let summary = match &record.label {
            Some(label) => format!(
                "{} ({}, UUID {uuid}, label {label:?})",
                record.path.display(),
                record.fstype
            ),
            None => format!("{} ({}, UUID {uuid})", record.path.display(), record.fstype),
        };
        if !self.prompter.confirm(&format!("Add {summary} to fstab?"))? {
            return Ok(RecordOutcome::Skipped(SkipReason::Declined));
        }

        let raw_name = match &record.label {
            Some(label) => label.clone(),
            None => loop {
                let reply = self.prompter.ask("Mount point name")?;
                if !reply.trim().is_empty() {
                    break reply;
                }
            },
        };
        let name = fstab::sanitize_mount_name(&raw_name);
        if !fstab::is_valid_mount_name(&name) {
            return Ok(RecordOutcome::Skipped(SkipReason::InvalidMountName {
                name: raw_name,
            }));
        }

        // Offered for ext4 only, and only when the chosen name differs
        // from the on-disk label. A relabel failure keeps the old label.
        if record.fstype == FsKind::Ext4
            && record.label.as_deref() != Some(name.as_str())
            && self.prompter.confirm(&format!(
                "Relabel {} to {name:?}?",
                record.path.display()
            ))?
        {
            if let Err(e) = self.labeler.set_label(&record.path, &name) {
                log::warn!("{e}; continuing with old label");
            }
        }

        let mount_point = self.config.mount_base.join(&name);
        if let Err(e) = mount::create_mount_point(&mount_point) {
            return Ok(RecordOutcome::Skipped(SkipReason::MountPointFailed {
                message: e.to_string(),
            }));
        }

        let mut replace = false;
        if fstab::contains_uuid(existing, &uuid) || staged_uuids.contains(&uuid) {
            if !self.config.overwrite {
                return Ok(RecordOutcome::Skipped(SkipReason::DuplicateUuid));
            }
            if !self.prompter.confirm(&format!(
                "UUID {uuid} is already configured; replace the existing entry?"
            ))? {
                return Ok(RecordOutcome::Skipped(SkipReason::DuplicateUuid));
            }
            replace = true;
        }

        let entry = MountEntry::for_device(uuid, mount_point, record.fstype);
        if entry.to_fstab_line().split_whitespace().count() != 6 {
            return Ok(RecordOutcome::Skipped(SkipReason::MalformedEntry));
        }

        Ok(RecordOutcome::Staged { entry, replace })
    }

    /// Writes staged entries to the config file.
    ///
    /// Plain staging appends; overwrite-consented entries rewrite the file
    /// with the prior lines for their UUIDs removed first, so a UUID never
    /// appears twice.
    fn commit(&self, existing: &str, staged: &[(MountEntry, bool)]) -> Result<()> {
        let block: String = staged
            .iter()
            .map(|(e, _)| e.to_fstab_line() + "\n")
            .collect();

        if staged.iter().any(|(_, replace)| *replace) {
            let mut content = self.store.read()?;
            for (entry, replace) in staged {
                if *replace {
                    content = fstab::strip_uuid_entries(&content, &entry.uuid);
                }
            }
            if !content.is_empty() && !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str(&block);
            self.store.write(&content)
        } else if !existing.is_empty() && !existing.ends_with('\n') {
            self.store.append(&format!("\n{block}"))
        } else {
            self.store.append(&block)
        }
    }
}
