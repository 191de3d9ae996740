//! Device scanning module using blkid.
//!
//! This module parses `blkid` output lines into device records and filters
//! for the ext4 and NTFS partitions that this tool can configure.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, IoResultExt, Result};

/// Directory of UUID-to-device symlinks maintained by udev.
pub const BY_UUID_DIR: &str = "/dev/disk/by-uuid";

/// Filesystem types this tool generates entries for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsKind {
    Ext4,
    Ntfs,
}

impl FsKind {
    /// Returns the filesystem type name as written in fstab.
    pub fn fstab_name(&self) -> &'static str {
        match self {
            Self::Ext4 => "ext4",
            Self::Ntfs => "ntfs",
        }
    }
}

impl std::fmt::Display for FsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.fstab_name())
    }
}

impl TryFrom<&str> for FsKind {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        match s {
            "ext4" => Ok(FsKind::Ext4),
            "ntfs" => Ok(FsKind::Ntfs),
            _ => Err(Error::InvalidFilesystem { fs: s.to_string() }),
        }
    }
}

/// A block device as reported by blkid. Immutable after parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    /// Full device path (e.g., "/dev/sda1").
    pub path: PathBuf,
    /// Filesystem type.
    pub fstype: FsKind,
    /// Filesystem UUID, if blkid reported one.
    pub uuid: Option<String>,
    /// Filesystem label from the exact `LABEL` attribute.
    ///
    /// `PARTLABEL` (the partition-table-level label) is a different
    /// attribute and never matches here.
    pub label: Option<String>,
}

impl DeviceRecord {
    /// Parses one blkid output line.
    ///
    /// Line format: `/dev/sda1: UUID="..." TYPE="ext4" LABEL="Data"`.
    ///
    /// Returns `None` for lines without a recognized filesystem type, so
    /// swap partitions, vfat ESPs and the like are ignored entirely.
    pub fn from_blkid_line(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (device, attrs) = line.split_once(':').ok_or_else(|| Error::BlkidParse {
            message: format!("missing device separator in line: {line}"),
        })?;

        let attrs = parse_attrs(attrs);

        let Some(fstype) = exact_attr(&attrs, "TYPE") else {
            return Ok(None);
        };
        let Ok(fstype) = FsKind::try_from(fstype) else {
            return Ok(None);
        };

        Ok(Some(Self {
            path: PathBuf::from(device.trim()),
            fstype,
            uuid: exact_attr(&attrs, "UUID").map(str::to_string),
            label: exact_attr(&attrs, "LABEL")
                .filter(|l| !l.is_empty())
                .map(str::to_string),
        }))
    }

    /// Returns true if the device node is present under /dev.
    pub fn node_exists(&self) -> bool {
        self.path.exists()
    }
}

/// Looks up an attribute by its exact key.
///
/// Exact matching is what disambiguates `LABEL` from `PARTLABEL`: a suffix
/// match would pick up the partition-table label by mistake.
fn exact_attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Parses a run of `KEY="value"` pairs.
///
/// Values may contain spaces; a pair ends at the closing quote.
fn parse_attrs(s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = s;

    loop {
        rest = rest.trim_start();
        let Some(eq) = rest.find("=\"") else {
            break;
        };
        let key = rest[..eq].to_string();
        let after = &rest[eq + 2..];
        let Some(end) = after.find('"') else {
            break;
        };
        attrs.push((key, after[..end].to_string()));
        rest = &after[end + 1..];
    }

    attrs
}

/// Checks whether a UUID resolves through the by-uuid symlink directory.
pub fn uuid_resolves(uuid: &str) -> bool {
    Path::new(BY_UUID_DIR).join(uuid).exists()
}

/// Source of raw device description lines.
///
/// Injectable so tests can feed canned blkid output. Re-querying the source
/// re-runs the underlying probe; enumeration is not restartable.
pub trait DeviceSource {
    /// Returns one raw line per device.
    fn probe(&self) -> Result<Vec<String>>;
}

/// Production device source backed by the `blkid` command.
pub struct BlkidSource;

impl DeviceSource for BlkidSource {
    fn probe(&self) -> Result<Vec<String>> {
        let output = Command::new("blkid").output().command_context("blkid")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(Error::CommandExit {
                command: "blkid".to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().map(str::to_string).collect())
    }
}

/// Parses probe output into candidate device records.
///
/// Unparseable lines are logged and dropped rather than failing the run.
pub fn candidate_records(lines: &[String]) -> Vec<DeviceRecord> {
    let mut records = Vec::new();
    for line in lines {
        match DeviceRecord::from_blkid_line(line) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => log::warn!("skipping unparseable blkid line: {e}"),
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ext4_line() {
        let line = r#"/dev/sda1: UUID="abcd-1234" TYPE="ext4" LABEL="Data""#;
        let record = DeviceRecord::from_blkid_line(line).unwrap().unwrap();

        assert_eq!(record.path, PathBuf::from("/dev/sda1"));
        assert_eq!(record.fstype, FsKind::Ext4);
        assert_eq!(record.uuid.as_deref(), Some("abcd-1234"));
        assert_eq!(record.label.as_deref(), Some("Data"));
    }

    #[test]
    fn test_parse_ntfs_line_without_label() {
        let line = r#"/dev/sdb1: UUID="ef01-5678" TYPE="ntfs""#;
        let record = DeviceRecord::from_blkid_line(line).unwrap().unwrap();

        assert_eq!(record.fstype, FsKind::Ntfs);
        assert_eq!(record.uuid.as_deref(), Some("ef01-5678"));
        assert_eq!(record.label, None);
    }

    #[test]
    fn test_partlabel_never_matches_label() {
        let line = r#"/dev/sdc1: UUID="1111-2222" TYPE="ext4" PARTLABEL="primary""#;
        let record = DeviceRecord::from_blkid_line(line).unwrap().unwrap();

        assert_eq!(record.label, None);
    }

    #[test]
    fn test_partlabel_and_label_coexist() {
        let line = r#"/dev/sdc1: PARTLABEL="primary" LABEL="Media" UUID="1111-2222" TYPE="ext4""#;
        let record = DeviceRecord::from_blkid_line(line).unwrap().unwrap();

        assert_eq!(record.label.as_deref(), Some("Media"));
    }

    #[test]
    fn test_unrecognized_fstype_ignored() {
        let line = r#"/dev/sda2: UUID="9999-0000" TYPE="swap""#;
        assert!(DeviceRecord::from_blkid_line(line).unwrap().is_none());

        let line = r#"/dev/sda3: UUID="8888-0000" TYPE="vfat" LABEL="EFI""#;
        assert!(DeviceRecord::from_blkid_line(line).unwrap().is_none());
    }

    #[test]
    fn test_missing_uuid_kept_as_candidate() {
        // The builder warns and skips; the parser keeps the record.
        let line = r#"/dev/sdd1: TYPE="ext4" LABEL="NoUuid""#;
        let record = DeviceRecord::from_blkid_line(line).unwrap().unwrap();

        assert_eq!(record.uuid, None);
        assert_eq!(record.label.as_deref(), Some("NoUuid"));
    }

    #[test]
    fn test_label_with_spaces() {
        let line = r#"/dev/sde1: UUID="aa-bb" TYPE="ntfs" LABEL="My Media Drive""#;
        let record = DeviceRecord::from_blkid_line(line).unwrap().unwrap();

        assert_eq!(record.label.as_deref(), Some("My Media Drive"));
    }

    #[test]
    fn test_malformed_line_errors() {
        assert!(DeviceRecord::from_blkid_line("not a blkid line").is_err());
    }

    #[test]
    fn test_candidate_records_filters() {
        let lines: Vec<String> = [
            r#"/dev/sda1: UUID="a" TYPE="ext4""#,
            r#"/dev/sda2: UUID="b" TYPE="swap""#,
            "garbage without separator",
            r#"/dev/sdb1: UUID="c" TYPE="ntfs""#,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let records = candidate_records(&lines);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fstype, FsKind::Ext4);
        assert_eq!(records[1].fstype, FsKind::Ntfs);
    }
}
