//! Virtual directory tree
//!
//! In-memory hierarchy of directory and file nodes, rebuilt by replaying
//! the active mounts in registration order. Nodes live in arena vectors and
//! reference each other by index, so navigation back-references never own
//! anything; ownership flows from the facade down through the tree.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::error::VfsError;
use crate::mount::MountPoint;
use crate::path;
use crate::provider::FileDescriptor;

/// Index of a directory node in the tree arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirId(pub(crate) usize);

/// Index of a file node in the tree arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(pub(crate) usize);

/// A directory in the virtual namespace
///
/// Children are keyed by case-folded name, so iteration order is
/// name-sorted and lookups are case-insensitive.
#[derive(Debug)]
pub struct DirectoryEntry {
    /// Directory name ("" for the root)
    pub name: String,
    /// Absolute virtual path, always ending in `/`
    pub full_path: String,
    /// Parent directory, None for the root
    pub parent: Option<DirId>,
    subdirs: BTreeMap<String, DirId>,
    files: BTreeMap<String, FileId>,
}

impl DirectoryEntry {
    /// Child directories, ordered by folded name
    pub fn subdir_ids(&self) -> impl Iterator<Item = DirId> + '_ {
        self.subdirs.values().copied()
    }

    /// Files in this directory, ordered by folded name
    pub fn file_ids(&self) -> impl Iterator<Item = FileId> + '_ {
        self.files.values().copied()
    }

    /// Look up a child directory by name (case-insensitive)
    pub fn subdir(&self, name: &str) -> Option<DirId> {
        self.subdirs.get(&path::fold(name)).copied()
    }

    /// Look up a file by name (case-insensitive)
    pub fn file(&self, name: &str) -> Option<FileId> {
        self.files.get(&path::fold(name)).copied()
    }

    /// Number of child directories
    pub fn subdir_count(&self) -> usize {
        self.subdirs.len()
    }

    /// Number of files directly in this directory
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// A file in the virtual namespace, bound to the mount that provided it
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// File name with illegal characters removed
    pub name: String,
    /// Name without the extension
    pub base_name: String,
    /// Extension without the dot ("" if none)
    pub extension: String,
    /// Absolute virtual path
    pub full_path: String,
    /// Owning directory
    pub directory: DirId,
    /// Index of the providing mount in the mount table
    pub mount: usize,
    /// Physical location (the file itself, or its container)
    pub physical_path: PathBuf,
    /// File size in bytes
    pub size_bytes: u64,
    /// Creation timestamp reported by the provider
    pub created_at: SystemTime,
    /// Byte offset inside the backing container (0 for plain files)
    pub offset_in_container: u64,
}

/// Arena of directory and file nodes forming the virtual namespace
#[derive(Debug)]
pub struct VfsTree {
    dirs: Vec<DirectoryEntry>,
    files: Vec<FileEntry>,
}

impl Default for VfsTree {
    fn default() -> Self {
        Self::new()
    }
}

impl VfsTree {
    /// The root directory's id
    pub const ROOT: DirId = DirId(0);

    /// Create a tree containing only the root directory
    pub fn new() -> Self {
        Self {
            dirs: vec![DirectoryEntry {
                name: String::new(),
                full_path: "/".to_string(),
                parent: None,
                subdirs: BTreeMap::new(),
                files: BTreeMap::new(),
            }],
            files: Vec::new(),
        }
    }

    /// The root directory
    pub fn root(&self) -> &DirectoryEntry {
        &self.dirs[0]
    }

    /// Resolve a directory node by id
    pub fn dir(&self, id: DirId) -> &DirectoryEntry {
        &self.dirs[id.0]
    }

    /// Resolve a file node by id
    pub fn file(&self, id: FileId) -> &FileEntry {
        &self.files[id.0]
    }

    pub(crate) fn file_mut(&mut self, id: FileId) -> &mut FileEntry {
        &mut self.files[id.0]
    }

    /// Total number of files in the tree
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Total number of directories, including the root
    pub fn dir_count(&self) -> usize {
        self.dirs.len()
    }

    /// Whether the tree holds nothing but the bare root
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.len() == 1
    }

    /// Iterate over every file in the tree
    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.iter()
    }

    /// Child directories of `id`, ordered by folded name
    pub fn subdirs_of(&self, id: DirId) -> impl Iterator<Item = &DirectoryEntry> {
        self.dirs[id.0]
            .subdirs
            .values()
            .map(move |child| &self.dirs[child.0])
    }

    /// Files of `id`, ordered by folded name
    pub fn files_of(&self, id: DirId) -> impl Iterator<Item = &FileEntry> {
        self.dirs[id.0]
            .files
            .values()
            .map(move |child| &self.files[child.0])
    }

    /// Find a directory by normalized virtual path (case-insensitive)
    pub fn find_dir(&self, normalized: &str) -> Option<DirId> {
        let mut dir = Self::ROOT;
        for segment in normalized.split('/').filter(|s| !s.is_empty()) {
            dir = self.dirs[dir.0].subdir(segment)?;
        }
        Some(dir)
    }

    /// Find a file by normalized virtual path (case-insensitive)
    pub fn find_file(&self, normalized: &str) -> Option<FileId> {
        let (dir_part, leaf) = normalized.rsplit_once('/')?;
        if leaf.is_empty() {
            return None;
        }
        let dir = self.find_dir(dir_part)?;
        self.dirs[dir.0].file(leaf)
    }

    /// Get (or create) the directory chain for a `/`-separated path below
    /// `start`, reusing existing nodes on a case-insensitive match
    fn ensure_dirs(&mut self, start: DirId, segments: &[&str]) -> DirId {
        let mut dir = start;
        for segment in segments {
            dir = self.ensure_dir(dir, segment);
        }
        dir
    }

    fn ensure_dir(&mut self, parent: DirId, name: &str) -> DirId {
        let key = path::fold(name);
        if let Some(&existing) = self.dirs[parent.0].subdirs.get(&key) {
            return existing;
        }
        let full_path = format!("{}{}/", self.dirs[parent.0].full_path, name);
        let id = DirId(self.dirs.len());
        self.dirs.push(DirectoryEntry {
            name: name.to_string(),
            full_path,
            parent: Some(parent),
            subdirs: BTreeMap::new(),
            files: BTreeMap::new(),
        });
        self.dirs[parent.0].subdirs.insert(key, id);
        id
    }

    /// Insert one enumerated file under its mount point, creating missing
    /// intermediate directories.
    ///
    /// A collision with an existing file at the same virtual path replaces
    /// that entry outright: the later-registered mount wins.
    pub(crate) fn insert(
        &mut self,
        mount_index: usize,
        mount: &MountPoint,
        descriptor: &FileDescriptor,
    ) -> Result<FileId, VfsError> {
        let relative = descriptor.relative_path.replace('\\', "/");
        let mut segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
        let raw_name = segments.pop().ok_or_else(|| {
            VfsError::InvalidPath(format!(
                "mount {} produced an empty entry path",
                mount.virtual_path
            ))
        })?;

        let name = path::clean_name(raw_name)?;
        let (base_name, extension) = path::split_name(&name);
        if base_name.is_empty() {
            return Err(VfsError::InvalidPath(format!(
                "entry '{}' has no base name",
                raw_name
            )));
        }
        let base_name = base_name.to_string();
        let extension = extension.to_string();

        let mount_segments: Vec<&str> = mount
            .virtual_path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        let dir = self.ensure_dirs(Self::ROOT, &mount_segments);
        let dir = self.ensure_dirs(dir, &segments);

        let full_path = format!("{}{}", self.dirs[dir.0].full_path, name);
        let entry = FileEntry {
            base_name,
            extension,
            full_path,
            directory: dir,
            mount: mount_index,
            physical_path: mount
                .provider
                .physical_path(&mount.physical_root, descriptor),
            size_bytes: descriptor.size_bytes,
            created_at: descriptor.created_at,
            offset_in_container: descriptor.offset,
            name: name.clone(),
        };

        let key = path::fold(&name);
        if let Some(&existing) = self.dirs[dir.0].files.get(&key) {
            // Last mount wins: full replace, not merge
            self.files[existing.0] = entry;
            Ok(existing)
        } else {
            let id = FileId(self.files.len());
            self.files.push(entry);
            self.dirs[dir.0].files.insert(key, id);
            Ok(id)
        }
    }
}

#[cfg(test)]
pub(crate) fn test_entry(physical_path: PathBuf, size_bytes: u64) -> FileEntry {
    test_entry_at(physical_path, size_bytes, 0)
}

#[cfg(test)]
pub(crate) fn test_entry_at(physical_path: PathBuf, size_bytes: u64, offset: u64) -> FileEntry {
    let name = physical_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let (base_name, extension) = path::split_name(&name);
    FileEntry {
        base_name: base_name.to_string(),
        extension: extension.to_string(),
        full_path: format!("/{}", name),
        directory: VfsTree::ROOT,
        mount: 0,
        physical_path,
        size_bytes,
        created_at: SystemTime::UNIX_EPOCH,
        offset_in_container: offset,
        name,
    }
}
