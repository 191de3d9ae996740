//! fstab-builder-core: Core library for interactive fstab construction.
//!
//! This library discovers block devices with a recognized filesystem type
//! (ext4, NTFS), confirms each with the operator, and builds persistent
//! `/etc/fstab` entries with a backup/restore safety net: the table is
//! backed up before any mutation, validated after commit, and restored
//! automatically if validation fails.
//!
//! # Modules
//!
//! - [`device`]: Device scanning using `blkid`
//! - [`fstab`]: Fstab entry construction and config file access
//! - [`prompt`]: Operator confirmation and free-text prompts
//! - [`mount`]: Mount point creation, relabeling, table validation
//! - [`builder`]: The sequential run loop tying the phases together
//! - [`error`]: Error types
//!
//! # Example
//!
//! ```no_run
//! use fstab_builder_core::builder::{BuilderConfig, FstabBuilder};
//! use fstab_builder_core::device::BlkidSource;
//! use fstab_builder_core::fstab::{FsConfigStore, FSTAB_PATH};
//! use fstab_builder_core::mount::{E2label, MountAll};
//! use fstab_builder_core::prompt::TtyPrompter;
//!
//! let store = FsConfigStore::new(FSTAB_PATH);
//! let mut prompter = TtyPrompter::open().unwrap();
//!
//! let mut builder = FstabBuilder::new(
//!     BuilderConfig::default(),
//!     &store,
//!     &BlkidSource,
//!     &mut prompter,
//!     &E2label,
//!     &MountAll,
//! );
//!
//! // Requires root; walks every candidate device interactively.
//! let outcome = builder.run().unwrap();
//! ```

pub mod builder;
pub mod device;
pub mod error;
pub mod fstab;
pub mod mount;
pub mod prompt;

// Re-export commonly used types
pub use builder::{BuilderConfig, FstabBuilder, RunOutcome};
pub use device::{DeviceRecord, FsKind};
pub use error::{Error, Result};
pub use fstab::MountEntry;
