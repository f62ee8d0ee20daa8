//! A Unix-style file system built on a flat, block-addressed disk image.
//!
//! [`disk`] provides the storage medium, [`fs`] the driver (descriptor table,
//! free-block pool, directory codec, path resolution and file I/O) and
//! [`shell`] an interactive session on top of the driver.

pub mod disk;
pub mod fs;
pub mod shell;
pub mod utils;

pub use disk::{BlockDevice, FileDisk, MemDisk};
pub use fs::{
    directory::DirEntry,
    error::{FileSystemError, Result},
    DescriptorId, FileDescriptor, FileHandle, FileSystem, FileType,
};
