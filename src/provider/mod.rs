//! Storage providers
//!
//! A provider is a pluggable backend that can enumerate, read, and (when
//! supported) write files from one kind of physical storage. Two built-in
//! variants ship: `FolderProvider` for plain directories and `PakProvider`
//! for pak archive containers. New container formats only need a `Provider`
//! implementation; the mount table and tree builder are unaffected.

pub mod folder;
pub mod pak;

use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::VfsError;
use crate::tree::FileEntry;

/// One physical file reported by a provider during enumeration
#[derive(Debug, Clone, PartialEq)]
pub struct FileDescriptor {
    /// Path relative to the enumerated root, `/`-separated
    pub relative_path: String,
    /// Uncompressed file size in bytes
    pub size_bytes: u64,
    /// Byte offset inside the backing container (0 for plain files)
    pub offset: u64,
    /// Creation timestamp as reported by the backing store
    pub created_at: SystemTime,
}

/// Seekable byte stream returned by `open`
///
/// Streams start positioned at zero and are independent per call; the
/// underlying handle is released when the stream is dropped.
pub trait VfsStream: Read + Write + Seek + Send {}

impl<T: Read + Write + Seek + Send> VfsStream for T {}

/// Capability contract for a storage backend
pub trait Provider: Send + Sync {
    /// Registry identifier for this provider (e.g. `"folder"`, `"pak"`)
    fn name(&self) -> &str;

    /// Whether write operations are refused by this provider
    fn read_only(&self) -> bool {
        false
    }

    /// Enumerate every file under a physical root.
    ///
    /// The scan is restartable: each call re-reads the backing store, no
    /// state is cached between calls.
    fn enumerate(&self, physical_root: &Path) -> Result<Vec<FileDescriptor>, VfsError>;

    /// Read the full contents of a file
    fn read(&self, entry: &FileEntry) -> Result<Vec<u8>, VfsError>;

    /// Overwrite the contents of a file
    fn write(&self, entry: &FileEntry, data: &[u8]) -> Result<(), VfsError>;

    /// Open a seekable stream over a file, positioned at zero
    fn open(&self, entry: &FileEntry, writable: bool) -> Result<Box<dyn VfsStream>, VfsError>;

    /// Physical location recorded on entries from this provider.
    ///
    /// Plain stores point at the file itself; container formats point at the
    /// container and use the entry offset for addressing.
    fn physical_path(&self, physical_root: &Path, descriptor: &FileDescriptor) -> PathBuf {
        physical_root.join(&descriptor.relative_path)
    }
}
