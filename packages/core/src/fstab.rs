//! Fstab entry construction and config file access.
//!
//! This module renders and parses six-field fstab lines, carries the fixed
//! per-filesystem mount parameter table, and defines the [`ConfigStore`]
//! abstraction over the persisted mount table so tests can substitute an
//! in-memory file.

use std::cell::RefCell;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::device::FsKind;
use crate::error::{Error, IoResultExt, Result};

/// Default fstab path.
pub const FSTAB_PATH: &str = "/etc/fstab";

/// Fixed mount parameters for a filesystem type. Not user-configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountDefaults {
    pub options: &'static str,
    pub dump: u8,
    pub pass: u8,
}

/// Returns the mount parameter table entry for a filesystem type.
pub fn mount_defaults(fs: FsKind) -> MountDefaults {
    match fs {
        FsKind::Ext4 => MountDefaults {
            options: "defaults",
            dump: 0,
            pass: 2,
        },
        FsKind::Ntfs => MountDefaults {
            options: "defaults,uid=1000,gid=1000",
            dump: 0,
            pass: 0,
        },
    }
}

/// A single generated fstab entry. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Filesystem UUID, without the `UUID=` prefix.
    pub uuid: String,
    /// Mount point path.
    pub mount_point: PathBuf,
    /// Filesystem type.
    pub fstype: FsKind,
    /// Mount options string.
    pub options: String,
    /// This field is used by dump(8) to determine which filesystems need to be dumped.
    pub dump: u8,
    /// This field is used by fsck(8) to determine the order in which filesystem checks are done at boot time.
    pub pass: u8,
}

impl MountEntry {
    /// Creates an entry for a device using the fixed parameter table.
    pub fn for_device(
        uuid: impl Into<String>,
        mount_point: impl Into<PathBuf>,
        fstype: FsKind,
    ) -> Self {
        let defaults = mount_defaults(fstype);
        Self {
            uuid: uuid.into(),
            mount_point: mount_point.into(),
            fstype,
            options: defaults.options.to_string(),
            dump: defaults.dump,
            pass: defaults.pass,
        }
    }

    /// Formats the entry as a six-field fstab line.
    pub fn to_fstab_line(&self) -> String {
        format!(
            "UUID={} {} {} {} {} {}",
            self.uuid,
            self.mount_point.display(),
            self.fstype,
            self.options,
            self.dump,
            self.pass
        )
    }

    /// Parses a single fstab line into an entry.
    ///
    /// Returns None for comments, empty lines, lines without six fields,
    /// and lines this tool would never generate (non-UUID specs, other
    /// filesystem types).
    pub fn from_line(line: &str) -> Result<Option<Self>> {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 6 {
            return Ok(None);
        }

        let Some(uuid) = parts[0].strip_prefix("UUID=") else {
            return Ok(None);
        };
        let Ok(fstype) = FsKind::try_from(parts[2]) else {
            return Ok(None);
        };

        let dump = parts[4].parse::<u8>().map_err(|e| Error::FstabParse {
            message: format!("failed to parse dump field of line {line}: {e}"),
        })?;
        let pass = parts[5].parse::<u8>().map_err(|e| Error::FstabParse {
            message: format!("failed to parse pass field of line {line}: {e}"),
        })?;

        Ok(Some(Self {
            uuid: uuid.to_string(),
            mount_point: PathBuf::from(parts[1]),
            fstype,
            options: parts[3].to_string(),
            dump,
            pass,
        }))
    }
}

/// Sanitizes a string for use as a mount point directory name.
///
/// Whitespace runs become a single underscore; everything outside the
/// alphanumeric-and-underscore set is dropped. Idempotent.
pub fn sanitize_mount_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_whitespace = false;

    for c in name.trim().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
        } else {
            in_whitespace = false;
            if c.is_ascii_alphanumeric() || c == '_' {
                out.push(c);
            }
        }
    }

    out
}

/// Returns true if a sanitized mount name is acceptable.
pub fn is_valid_mount_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Returns true if any entry line in the config references this UUID.
///
/// Comments are ignored; only the first field of entry lines is compared,
/// so a UUID appearing in options or a comment does not count.
pub fn contains_uuid(content: &str, uuid: &str) -> bool {
    let spec = format!("UUID={uuid}");
    content.lines().any(|line| {
        let line = line.trim();
        !line.starts_with('#') && line.split_whitespace().next() == Some(spec.as_str())
    })
}

/// Removes entry lines whose first field references this UUID.
///
/// Comments and unrelated lines pass through untouched. Used by the
/// overwrite path, which replaces a prior entry instead of shadowing it.
pub fn strip_uuid_entries(content: &str, uuid: &str) -> String {
    let spec = format!("UUID={uuid}");
    let mut out = String::with_capacity(content.len());

    for line in content.lines() {
        let trimmed = line.trim();
        if !trimmed.starts_with('#') && trimmed.split_whitespace().next() == Some(spec.as_str()) {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }

    out
}

/// Abstraction over the persisted mount table.
///
/// The builder only touches the config file through this trait, so tests
/// substitute [`MemConfigStore`] and never need a real /etc/fstab.
pub trait ConfigStore {
    /// Path of the config file, for messages.
    fn path(&self) -> &Path;

    /// Returns true if the config file exists.
    fn exists(&self) -> bool;

    /// Reads the full config file content.
    fn read(&self) -> Result<String>;

    /// Copies the config file to a timestamped snapshot; returns its path.
    fn backup(&self) -> Result<PathBuf>;

    /// Appends a block of text to the config file.
    fn append(&self, block: &str) -> Result<()>;

    /// Replaces the config file content wholesale.
    fn write(&self, content: &str) -> Result<()>;

    /// Restores the config file from a snapshot.
    fn restore(&self, backup: &Path) -> Result<()>;
}

/// Filesystem-backed config store.
pub struct FsConfigStore {
    path: PathBuf,
}

impl FsConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigStore for FsConfigStore {
    fn path(&self) -> &Path {
        &self.path
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn read(&self) -> Result<String> {
        fs::read_to_string(&self.path).fstab_read_context(&self.path)
    }

    fn backup(&self) -> Result<PathBuf> {
        let backup_name = format!("{}.backup.{}", self.path.display(), timestamp());
        let backup_path = PathBuf::from(&backup_name);

        fs::copy(&self.path, &backup_path).backup_context(&backup_path)?;

        Ok(backup_path)
    }

    fn append(&self, block: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .fstab_write_context(&self.path)?;
        file.write_all(block.as_bytes())
            .fstab_write_context(&self.path)?;
        Ok(())
    }

    fn write(&self, content: &str) -> Result<()> {
        fs::write(&self.path, content).fstab_write_context(&self.path)
    }

    fn restore(&self, backup: &Path) -> Result<()> {
        fs::copy(backup, &self.path)
            .map(|_| ())
            .restore_context(backup)
    }
}

/// In-memory config store for tests and rehearsals.
#[derive(Debug, Default)]
pub struct MemConfigStore {
    path: PathBuf,
    content: RefCell<String>,
    snapshot: RefCell<Option<String>>,
}

impl MemConfigStore {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            path: PathBuf::from("<memory>"),
            content: RefCell::new(content.into()),
            snapshot: RefCell::new(None),
        }
    }

    /// Returns the current content.
    pub fn content(&self) -> String {
        self.content.borrow().clone()
    }
}

impl ConfigStore for MemConfigStore {
    fn path(&self) -> &Path {
        &self.path
    }

    fn exists(&self) -> bool {
        true
    }

    fn read(&self) -> Result<String> {
        Ok(self.content.borrow().clone())
    }

    fn backup(&self) -> Result<PathBuf> {
        *self.snapshot.borrow_mut() = Some(self.content.borrow().clone());
        Ok(PathBuf::from("<memory backup>"))
    }

    fn append(&self, block: &str) -> Result<()> {
        self.content.borrow_mut().push_str(block);
        Ok(())
    }

    fn write(&self, content: &str) -> Result<()> {
        *self.content.borrow_mut() = content.to_string();
        Ok(())
    }

    fn restore(&self, _backup: &Path) -> Result<()> {
        let snapshot = self.snapshot.borrow().clone().ok_or(Error::Restore {
            backup: PathBuf::from("<memory backup>"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no snapshot taken"),
        })?;
        *self.content.borrow_mut() = snapshot;
        Ok(())
    }
}

/// Timestamp for backup file names, without external dependencies.
///
/// UTC, formatted `YYYYmmdd-HHMMSS`.
fn timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let (year, month, day) = civil_from_days((secs / 86_400) as i64);
    let rem = secs % 86_400;

    format!(
        "{:04}{:02}{:02}-{:02}{:02}{:02}",
        year,
        month,
        day,
        rem / 3_600,
        (rem % 3_600) / 60,
        rem % 60
    )
}

/// Days-since-epoch to calendar date (Howard Hinnant's civil_from_days).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);

    (year, month, day)
}
