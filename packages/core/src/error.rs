//! Unified error types for the fstab-builder-core library.
//!
//! Uses SNAFU for context-rich error handling, especially useful when the same
//! underlying error type (like `std::io::Error`) appears in different contexts.

use snafu::{ResultExt, Snafu};
use std::path::PathBuf;

/// Result type alias using the library's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all core library operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Run started without root privileges.
    #[snafu(display("this operation must be run as root"))]
    NotRoot,

    /// The target fstab file does not exist.
    #[snafu(display("fstab not found at {}", path.display()))]
    FstabMissing { path: PathBuf },

    /// Fstab file cannot be read.
    #[snafu(display("failed to read fstab at {}", path.display()))]
    FstabRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the fstab file.
    #[snafu(display("failed to write fstab at {}", path.display()))]
    FstabWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse an fstab entry.
    #[snafu(display("failed to parse fstab entry: {message}"))]
    FstabParse { message: String },

    /// Failed to create the pre-mutation backup.
    #[snafu(display("failed to create backup at {}", path.display()))]
    Backup {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to restore the fstab file from its backup.
    #[snafu(display("failed to restore fstab from {}", backup.display()))]
    Restore {
        backup: PathBuf,
        source: std::io::Error,
    },

    /// Failed to execute a system command.
    #[snafu(display("failed to execute command '{command}'"))]
    CommandExecution {
        command: String,
        source: std::io::Error,
    },

    /// Command executed but returned non-zero exit code.
    #[snafu(display("command '{command}' exited with code {code}: {stderr}"))]
    CommandExit {
        command: String,
        code: i32,
        stderr: String,
    },

    /// Failed to parse blkid output.
    #[snafu(display("failed to parse blkid output: {message}"))]
    BlkidParse { message: String },

    /// Mount point creation failed.
    #[snafu(display("failed to create mount point at {}", path.display()))]
    MountPointCreation {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid filesystem type.
    #[snafu(display("unsupported filesystem type: {fs}"))]
    InvalidFilesystem { fs: String },

    /// Mount point name failed validation after sanitizing.
    #[snafu(display("invalid mount point name: {name:?}"))]
    InvalidMountName { name: String },

    /// No controlling terminal available for operator prompts.
    #[snafu(display("could not open controlling terminal: {message}"))]
    TerminalUnavailable { message: String },

    /// Reading or writing an operator prompt failed.
    #[snafu(display("prompt I/O failed"))]
    Prompt { source: std::io::Error },

    /// Relabeling a filesystem in place failed.
    #[snafu(display("failed to relabel {device}: {message}"))]
    Relabel { device: String, message: String },

    /// Post-commit validation of the mount table failed.
    #[snafu(display("mount table validation failed: {message}"))]
    Validation { message: String },
}

/// Extension trait for adding context to io::Error results.
pub trait IoResultExt<T> {
    /// Add context for command execution errors.
    fn command_context(self, command: impl Into<String>) -> Result<T>;

    /// Add context for fstab read errors.
    fn fstab_read_context(self, path: impl Into<PathBuf>) -> Result<T>;

    /// Add context for fstab write errors.
    fn fstab_write_context(self, path: impl Into<PathBuf>) -> Result<T>;

    /// Add context for backup errors.
    fn backup_context(self, path: impl Into<PathBuf>) -> Result<T>;

    /// Add context for restore errors.
    fn restore_context(self, backup: impl Into<PathBuf>) -> Result<T>;

    /// Add context for mount point creation errors.
    fn mount_point_context(self, path: impl Into<PathBuf>) -> Result<T>;

    /// Add context for prompt I/O errors.
    fn prompt_context(self) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, std::io::Error> {
    fn command_context(self, command: impl Into<String>) -> Result<T> {
        self.context(CommandExecutionSnafu {
            command: command.into(),
        })
    }

    fn fstab_read_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.context(FstabReadSnafu { path: path.into() })
    }

    fn fstab_write_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.context(FstabWriteSnafu { path: path.into() })
    }

    fn backup_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.context(BackupSnafu { path: path.into() })
    }

    fn restore_context(self, backup: impl Into<PathBuf>) -> Result<T> {
        self.context(RestoreSnafu {
            backup: backup.into(),
        })
    }

    fn mount_point_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.context(MountPointCreationSnafu { path: path.into() })
    }

    fn prompt_context(self) -> Result<T> {
        self.context(PromptSnafu)
    }
}
