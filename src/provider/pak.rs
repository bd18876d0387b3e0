//! Pak provider - archive container backend
//!
//! A pak file is a ZIP-like container: entry data blobs in the body, a
//! central directory at the end, and a fixed footer locating it. The
//! directory is brotli-compressed RON, the same on-disk recipe the rest of
//! the engine uses for its data files. Entry data is stored uncompressed so
//! reads can seek straight to the blob.
//!
//! Layout:
//! - entry blobs, back to back
//! - central directory: brotli(RON `Vec<PakRecord>`)
//! - footer: directory offset (u64 LE), directory length (u64 LE), `LPK1`

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::folder::FolderProvider;
use super::{FileDescriptor, Provider, VfsStream};
use crate::error::VfsError;
use crate::path;
use crate::tree::FileEntry;

/// Registry name of the built-in pak provider
pub const PROVIDER_NAME: &str = "pak";

/// Footer magic, last four bytes of every pak file
const PAK_MAGIC: &[u8; 4] = b"LPK1";

/// Footer size: directory offset + directory length + magic
const FOOTER_LEN: u64 = 20;

/// One central-directory record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PakRecord {
    /// Entry path relative to the archive root, `/`-separated
    path: String,
    /// Byte offset of the entry data in the container
    offset: u64,
    /// Entry data length in bytes
    size_bytes: u64,
    /// Creation time as seconds since the Unix epoch
    created_secs: u64,
}

/// Archive container provider
///
/// Read-only. Stateless: every enumeration re-opens the container and
/// re-reads its central directory.
#[derive(Debug, Clone, Default)]
pub struct PakProvider;

impl PakProvider {
    /// Create a new pak provider
    pub fn new() -> Self {
        Self
    }
}

impl Provider for PakProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn read_only(&self) -> bool {
        true
    }

    fn enumerate(&self, physical_root: &Path) -> Result<Vec<FileDescriptor>, VfsError> {
        let records = read_directory(physical_root)?;
        Ok(records
            .into_iter()
            .map(|r| FileDescriptor {
                relative_path: r.path,
                size_bytes: r.size_bytes,
                offset: r.offset,
                created_at: UNIX_EPOCH + Duration::from_secs(r.created_secs),
            })
            .collect())
    }

    fn read(&self, entry: &FileEntry) -> Result<Vec<u8>, VfsError> {
        let mut file = File::open(&entry.physical_path)?;
        file.seek(SeekFrom::Start(entry.offset_in_container))?;

        let mut data = vec![0u8; entry.size_bytes as usize];
        file.read_exact(&mut data).map_err(|e| {
            VfsError::CorruptContainer(format!(
                "entry '{}' extends past the end of {}: {}",
                entry.name,
                entry.physical_path.display(),
                e
            ))
        })?;
        Ok(data)
    }

    fn write(&self, entry: &FileEntry, _data: &[u8]) -> Result<(), VfsError> {
        Err(VfsError::Unsupported(format!(
            "pak archives are read-only (write to '{}')",
            entry.full_path
        )))
    }

    fn open(&self, entry: &FileEntry, writable: bool) -> Result<Box<dyn VfsStream>, VfsError> {
        if writable {
            return Err(VfsError::Unsupported(format!(
                "pak archives are read-only (writable stream for '{}')",
                entry.full_path
            )));
        }
        let data = self.read(entry)?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn physical_path(&self, physical_root: &Path, _descriptor: &FileDescriptor) -> PathBuf {
        // Entries live inside the container itself
        physical_root.to_path_buf()
    }
}

/// Read and validate the central directory of a pak file
fn read_directory(pak_path: &Path) -> Result<Vec<PakRecord>, VfsError> {
    let mut file = File::open(pak_path)
        .map_err(|e| VfsError::Io(format!("cannot open {}: {}", pak_path.display(), e)))?;
    let file_len = file.metadata()?.len();

    if file_len < FOOTER_LEN {
        return Err(VfsError::CorruptContainer(format!(
            "{} is too small to be a pak file",
            pak_path.display()
        )));
    }

    let mut footer = [0u8; FOOTER_LEN as usize];
    file.seek(SeekFrom::End(-(FOOTER_LEN as i64)))?;
    file.read_exact(&mut footer)?;

    if &footer[16..20] != PAK_MAGIC {
        return Err(VfsError::CorruptContainer(format!(
            "{} has no pak footer magic",
            pak_path.display()
        )));
    }

    let mut offset_bytes = [0u8; 8];
    offset_bytes.copy_from_slice(&footer[0..8]);
    let dir_offset = u64::from_le_bytes(offset_bytes);

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&footer[8..16]);
    let dir_len = u64::from_le_bytes(len_bytes);

    let dir_end = dir_offset.checked_add(dir_len);
    if dir_end.map(|end| end > file_len - FOOTER_LEN).unwrap_or(true) {
        return Err(VfsError::CorruptContainer(format!(
            "{} declares a central directory outside the file",
            pak_path.display()
        )));
    }

    let mut compressed = vec![0u8; dir_len as usize];
    file.seek(SeekFrom::Start(dir_offset))?;
    file.read_exact(&mut compressed).map_err(|e| {
        VfsError::CorruptContainer(format!("truncated central directory: {}", e))
    })?;

    let mut decompressed = Vec::new();
    brotli::BrotliDecompress(&mut Cursor::new(&compressed), &mut decompressed).map_err(|e| {
        VfsError::CorruptContainer(format!("central directory decompression failed: {}", e))
    })?;

    let text = String::from_utf8_lossy(&decompressed);
    let records: Vec<PakRecord> = ron::from_str(&text).map_err(|e| {
        VfsError::CorruptContainer(format!("central directory parse error: {}", e))
    })?;

    // Every record must point inside the data region
    for record in &records {
        let end = record.offset.checked_add(record.size_bytes);
        if end.map(|end| end > dir_offset).unwrap_or(true) {
            return Err(VfsError::CorruptContainer(format!(
                "entry '{}' points outside the data region",
                record.path
            )));
        }
    }

    Ok(records)
}

// ─────────────────────────────────────────────────────────────────────────────
// PakWriter - editor-side archive packer
// ─────────────────────────────────────────────────────────────────────────────

/// Builds a pak file entry by entry
///
/// Data blobs stream to disk as they are added; `finish` appends the central
/// directory and footer. Dropping the writer without calling `finish` leaves
/// an unreadable file behind.
pub struct PakWriter {
    file: File,
    records: Vec<PakRecord>,
    seen: HashSet<String>,
    cursor: u64,
}

impl PakWriter {
    /// Create a new pak file at `path`, overwriting any existing file
    pub fn create(path: &Path) -> Result<Self, VfsError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Self {
            file,
            records: Vec::new(),
            seen: HashSet::new(),
            cursor: 0,
        })
    }

    /// Append one entry.
    ///
    /// `relative_path` is the archive-internal path; duplicates (compared
    /// case-insensitively) are rejected.
    pub fn add_file(
        &mut self,
        relative_path: &str,
        data: &[u8],
        created_at: SystemTime,
    ) -> Result<(), VfsError> {
        let relative = relative_path.replace('\\', "/");
        let relative = relative.trim_matches('/').to_string();
        if relative.is_empty() {
            return Err(VfsError::InvalidPath(
                "pak entry path is empty".to_string(),
            ));
        }
        if !self.seen.insert(path::fold(&relative)) {
            return Err(VfsError::InvalidPath(format!(
                "duplicate pak entry '{}'",
                relative
            )));
        }

        self.file.write_all(data)?;

        let created_secs = created_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.records.push(PakRecord {
            path: relative,
            offset: self.cursor,
            size_bytes: data.len() as u64,
            created_secs,
        });
        self.cursor += data.len() as u64;
        Ok(())
    }

    /// Pack every file under a directory, preserving relative paths.
    ///
    /// Returns the number of entries added.
    pub fn add_dir_contents(&mut self, physical_dir: &Path) -> Result<usize, VfsError> {
        let descriptors = FolderProvider::new().enumerate(physical_dir)?;
        let mut added = 0;
        for descriptor in descriptors {
            let data = fs::read(physical_dir.join(&descriptor.relative_path))?;
            self.add_file(&descriptor.relative_path, &data, descriptor.created_at)?;
            added += 1;
        }
        Ok(added)
    }

    /// Number of entries added so far
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no entries have been added yet
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write the central directory and footer, consuming the writer
    pub fn finish(mut self) -> Result<(), VfsError> {
        let config = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .indentor("  ".to_string());
        let ron_data = ron::ser::to_string_pretty(&self.records, config)
            .map_err(|e| VfsError::Io(format!("central directory serialization failed: {}", e)))?;

        let mut compressed = Vec::new();
        brotli::BrotliCompress(
            &mut Cursor::new(ron_data.as_bytes()),
            &mut compressed,
            &brotli::enc::BrotliEncoderParams {
                quality: 6,
                lgwin: 22,
                ..Default::default()
            },
        )
        .map_err(|e| VfsError::Io(format!("central directory compression failed: {}", e)))?;

        self.file.write_all(&compressed)?;

        let mut footer = Vec::with_capacity(FOOTER_LEN as usize);
        footer.extend_from_slice(&self.cursor.to_le_bytes());
        footer.extend_from_slice(&(compressed.len() as u64).to_le_bytes());
        footer.extend_from_slice(PAK_MAGIC);
        self.file.write_all(&footer)?;
        Ok(())
    }
}
