//! Mount point creation, relabeling and mount table validation.
//!
//! The relabel and validation collaborators are traits so the builder can
//! run against recording fakes in tests.

use std::fs;
use std::path::Path;
use std::process::Command;

use crate::error::{Error, IoResultExt, Result};

/// Creates a mount point directory if it doesn't exist.
pub fn create_mount_point(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).mount_point_context(path)?;
    }
    Ok(())
}

/// Applies a new filesystem label to a device in place.
///
/// Only invoked for ext4; NTFS relabeling is never attempted.
pub trait Labeler {
    fn set_label(&self, device: &Path, label: &str) -> Result<()>;
}

/// Production labeler backed by `e2label`.
pub struct E2label;

impl Labeler for E2label {
    fn set_label(&self, device: &Path, label: &str) -> Result<()> {
        let output = Command::new("e2label")
            .arg(device)
            .arg(label)
            .output()
            .command_context("e2label")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(Error::Relabel {
                device: device.display().to_string(),
                message: stderr,
            });
        }

        Ok(())
    }
}

/// Applies the full mount table and reports overall success.
pub trait TableVerifier {
    fn verify(&self) -> Result<()>;
}

/// Production verifier backed by `mount -a`.
///
/// Already-mounted entries are left alone; any entry that fails to mount
/// makes the whole run fail.
pub struct MountAll;

impl TableVerifier for MountAll {
    fn verify(&self) -> Result<()> {
        let output = Command::new("mount")
            .arg("-a")
            .output()
            .command_context("mount -a")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(Error::Validation { message: stderr });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_mount_point_recursive() {
        let base = TempDir::new().unwrap();
        let target = base.path().join("deep").join("Mount_Point");

        create_mount_point(&target).unwrap();
        assert!(target.is_dir());

        // Existing directory is fine.
        create_mount_point(&target).unwrap();
    }

    #[test]
    fn test_create_mount_point_failure() {
        let base = TempDir::new().unwrap();
        let file = base.path().join("occupied");
        std::fs::write(&file, "x").unwrap();

        let result = create_mount_point(&file.join("child"));
        assert!(matches!(result, Err(Error::MountPointCreation { .. })));
    }
}
