//! Folder provider - plain directory pass-through
//!
//! Reads and writes files directly on the native filesystem. Enumeration
//! walks the mounted directory recursively and reports `/`-separated
//! relative paths regardless of the host platform.

use std::fs::{self, Metadata, OpenOptions};
use std::path::Path;
use std::time::SystemTime;

use super::{FileDescriptor, Provider, VfsStream};
use crate::error::VfsError;
use crate::tree::FileEntry;

/// Registry name of the built-in folder provider
pub const PROVIDER_NAME: &str = "folder";

/// Plain directory provider
///
/// Stateless: every enumeration re-scans the directory tree.
#[derive(Debug, Clone, Default)]
pub struct FolderProvider;

impl FolderProvider {
    /// Create a new folder provider
    pub fn new() -> Self {
        Self
    }
}

impl Provider for FolderProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn enumerate(&self, physical_root: &Path) -> Result<Vec<FileDescriptor>, VfsError> {
        if !physical_root.is_dir() {
            return Err(VfsError::Io(format!(
                "{} is not a readable directory",
                physical_root.display()
            )));
        }

        let mut descriptors = Vec::new();
        walk(physical_root, String::new(), &mut descriptors)?;
        // Stable order regardless of directory iteration order
        descriptors.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(descriptors)
    }

    fn read(&self, entry: &FileEntry) -> Result<Vec<u8>, VfsError> {
        Ok(fs::read(&entry.physical_path)?)
    }

    fn write(&self, entry: &FileEntry, data: &[u8]) -> Result<(), VfsError> {
        // Ensure parent directory exists
        if let Some(parent) = entry.physical_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&entry.physical_path, data)?;
        Ok(())
    }

    fn open(&self, entry: &FileEntry, writable: bool) -> Result<Box<dyn VfsStream>, VfsError> {
        let file = if writable {
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(&entry.physical_path)?
        } else {
            OpenOptions::new().read(true).open(&entry.physical_path)?
        };
        Ok(Box::new(file))
    }
}

/// Recursively collect file descriptors under `dir`
fn walk(dir: &Path, prefix: String, out: &mut Vec<FileDescriptor>) -> Result<(), VfsError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                log::warn!("skipping non-UTF-8 file name {:?} in {}", raw, dir.display());
                continue;
            }
        };

        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };

        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            walk(&entry.path(), relative, out)?;
        } else if metadata.is_file() {
            out.push(FileDescriptor {
                relative_path: relative,
                size_bytes: metadata.len(),
                offset: 0,
                created_at: created_time(&metadata),
            });
        }
    }
    Ok(())
}

/// Creation time, falling back to modification time where the platform
/// doesn't record one
fn created_time(metadata: &Metadata) -> SystemTime {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}
