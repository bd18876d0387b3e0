//! File system facade
//!
//! `VirtualFs` is the entry point: it owns the provider registry, the mount
//! table, and the virtual directory tree, and exposes mount/unmount plus
//! path-based lookup and IO.
//!
//! The tree is rebuilt from scratch on every mount and unmount by replaying
//! all active mounts in registration order. The rebuild is atomic from the
//! caller's perspective: the new tree replaces the old one only if every
//! mount enumerates cleanly; otherwise the previous table and tree are kept
//! and the error is surfaced.
//!
//! Mount/unmount must be externally serialized by the caller; lookups may
//! run concurrently with each other but not with a rebuild. Callers that
//! need concurrent read/write should wrap the facade in their own
//! read-write lock.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::VfsError;
use crate::mount::{MountManifest, MountPoint, MountTable};
use crate::path;
use crate::provider::{folder, pak, Provider, VfsStream};
use crate::tree::{DirectoryEntry, FileEntry, FileId, VfsTree};

/// Unified virtual file system over mounted folders and archives
pub struct VirtualFs {
    providers: HashMap<String, Arc<dyn Provider>>,
    mounts: MountTable,
    tree: VfsTree,
}

impl Default for VirtualFs {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualFs {
    /// Create an unmounted file system with the built-in `folder` and
    /// `pak` providers registered
    pub fn new() -> Self {
        let mut vfs = Self {
            providers: HashMap::new(),
            mounts: MountTable::new(),
            tree: VfsTree::new(),
        };
        vfs.add_provider(Arc::new(folder::FolderProvider::new()));
        vfs.add_provider(Arc::new(pak::PakProvider::new()));
        vfs
    }

    /// Register a provider under its name, replacing any provider already
    /// registered under the same name
    pub fn add_provider(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    /// Look up a registered provider by name
    pub fn provider(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mounting
    // ─────────────────────────────────────────────────────────────────────────

    /// Mount a physical path, auto-detecting the provider: directories use
    /// the folder provider, files the pak provider
    pub fn mount(
        &mut self,
        physical: impl Into<PathBuf>,
        virtual_path: &str,
    ) -> Result<(), VfsError> {
        let physical = physical.into();
        let provider_name = if physical.is_dir() {
            folder::PROVIDER_NAME
        } else {
            pak::PROVIDER_NAME
        };
        self.mount_with(physical, virtual_path, provider_name)
    }

    /// Mount a physical path through a named provider
    pub fn mount_with(
        &mut self,
        physical: impl Into<PathBuf>,
        virtual_path: &str,
        provider_name: &str,
    ) -> Result<(), VfsError> {
        let provider = self.provider(provider_name).ok_or_else(|| {
            VfsError::NotFound(format!("provider '{}' is not registered", provider_name))
        })?;
        let virtual_path = path::normalize_dir(virtual_path)?;
        let physical = physical.into();

        self.mounts.push(MountPoint {
            physical_root: physical,
            virtual_path,
            provider,
        });

        match self.rebuild() {
            Ok(tree) => {
                self.tree = tree;
                Ok(())
            }
            Err(e) => {
                // Failed mount leaves the table as if it never happened
                self.mounts.pop();
                Err(e)
            }
        }
    }

    /// Remove the most recent mount at a virtual path and rebuild.
    ///
    /// Fails with `NotFound` if nothing is mounted there.
    pub fn unmount(&mut self, virtual_path: &str) -> Result<(), VfsError> {
        let virtual_path = path::normalize_dir(virtual_path)?;
        let (index, removed) = self.mounts.remove_last(&virtual_path)?;

        match self.rebuild() {
            Ok(tree) => {
                self.tree = tree;
                Ok(())
            }
            Err(e) => {
                // Failed unmount keeps the mount at its original position
                self.mounts.insert(index, removed);
                Err(e)
            }
        }
    }

    /// Apply every mount in a manifest file, in listed order.
    ///
    /// Returns the number of mounts applied. Stops at the first failure;
    /// mounts applied before the failure remain active.
    pub fn mount_manifest(&mut self, manifest_path: &Path) -> Result<usize, VfsError> {
        let manifest = MountManifest::load(manifest_path)?;
        let mut applied = 0;
        for spec in &manifest.mounts {
            match &spec.provider {
                Some(name) => self.mount_with(&spec.physical, &spec.virtual_path, name)?,
                None => self.mount(&spec.physical, &spec.virtual_path)?,
            }
            applied += 1;
        }
        Ok(applied)
    }

    /// Replay all active mounts into a fresh tree
    fn rebuild(&self) -> Result<VfsTree, VfsError> {
        let mut tree = VfsTree::new();
        for (index, mount) in self.mounts.iter().enumerate() {
            let descriptors = mount.provider.enumerate(&mount.physical_root)?;
            for descriptor in &descriptors {
                tree.insert(index, mount, descriptor)?;
            }
        }
        log::debug!(
            "rebuilt virtual tree: {} mounts, {} files, {} directories",
            self.mounts.len(),
            tree.file_count(),
            tree.dir_count()
        );
        Ok(tree)
    }

    /// Number of active mounts
    pub fn mount_count(&self) -> usize {
        self.mounts.len()
    }

    /// Whether at least one mount is active
    pub fn is_mounted(&self) -> bool {
        !self.mounts.is_empty()
    }

    /// Active mounts in registration order
    pub fn mounts(&self) -> impl Iterator<Item = &MountPoint> {
        self.mounts.iter()
    }

    /// The current virtual directory tree
    pub fn tree(&self) -> &VfsTree {
        &self.tree
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────────────────

    /// Look up a file entry; absent or malformed paths yield None
    pub fn get_file(&self, virtual_path: &str) -> Option<&FileEntry> {
        let normalized = path::normalize(virtual_path).ok()?;
        let id = self.tree.find_file(&normalized)?;
        Some(self.tree.file(id))
    }

    /// Look up a directory entry; absent or malformed paths yield None
    pub fn get_directory(&self, virtual_path: &str) -> Option<&DirectoryEntry> {
        let normalized = path::normalize(virtual_path).ok()?;
        let id = self.tree.find_dir(&normalized)?;
        Some(self.tree.dir(id))
    }

    /// Whether a file or directory exists at the path
    pub fn exists(&self, virtual_path: &str) -> bool {
        self.get_file(virtual_path).is_some() || self.get_directory(virtual_path).is_some()
    }

    /// Names of the subdirectories and files in a directory, directories
    /// first, each group ordered by name
    pub fn list(&self, virtual_path: &str) -> Option<Vec<String>> {
        let normalized = path::normalize(virtual_path).ok()?;
        let id = self.tree.find_dir(&normalized)?;
        let names = self
            .tree
            .subdirs_of(id)
            .map(|d| d.name.clone())
            .chain(self.tree.files_of(id).map(|f| f.name.clone()))
            .collect();
        Some(names)
    }

    /// The provider serving a file entry
    pub fn provider_for(&self, entry: &FileEntry) -> Option<Arc<dyn Provider>> {
        self.mounts.get(entry.mount).map(|m| m.provider.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // IO
    // ─────────────────────────────────────────────────────────────────────────

    /// Read the full contents of a file
    pub fn read(&self, virtual_path: &str) -> Result<Vec<u8>, VfsError> {
        let (entry, provider) = self.resolve(virtual_path)?;
        provider.read(entry)
    }

    /// Read a file as a UTF-8 string
    pub fn read_to_string(&self, virtual_path: &str) -> Result<String, VfsError> {
        let bytes = self.read(virtual_path)?;
        String::from_utf8(bytes)
            .map_err(|e| VfsError::Io(format!("{} is not UTF-8: {}", virtual_path, e)))
    }

    /// Overwrite the contents of an existing file through its provider.
    ///
    /// Fails with `NotFound` for absent paths and `Unsupported` for
    /// read-only providers. The entry's recorded size is refreshed on
    /// success.
    pub fn write_file(&mut self, virtual_path: &str, data: &[u8]) -> Result<(), VfsError> {
        let normalized = path::normalize(virtual_path)?;
        let id = self
            .tree
            .find_file(&normalized)
            .ok_or_else(|| VfsError::NotFound(format!("file not found: {}", normalized)))?;

        let provider = self.provider_for_id(id)?;
        provider.write(self.tree.file(id), data)?;
        self.tree.file_mut(id).size_bytes = data.len() as u64;
        Ok(())
    }

    /// Open a seekable stream over a file, positioned at zero.
    ///
    /// Streams are independent per call; the handle is released on drop.
    pub fn open_stream(
        &self,
        virtual_path: &str,
        writable: bool,
    ) -> Result<Box<dyn VfsStream>, VfsError> {
        let (entry, provider) = self.resolve(virtual_path)?;
        provider.open(entry, writable)
    }

    /// Resolve a virtual path to its entry and owning provider
    fn resolve(&self, virtual_path: &str) -> Result<(&FileEntry, Arc<dyn Provider>), VfsError> {
        let normalized = path::normalize(virtual_path)?;
        let id = self
            .tree
            .find_file(&normalized)
            .ok_or_else(|| VfsError::NotFound(format!("file not found: {}", normalized)))?;
        let provider = self.provider_for_id(id)?;
        Ok((self.tree.file(id), provider))
    }

    fn provider_for_id(&self, id: FileId) -> Result<Arc<dyn Provider>, VfsError> {
        let entry = self.tree.file(id);
        self.mounts
            .get(entry.mount)
            .map(|m| m.provider.clone())
            .ok_or_else(|| {
                VfsError::NotFound(format!("mount for '{}' is gone", entry.full_path))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::pak::PakWriter;
    use std::fs;
    use std::io::{Read, Seek, SeekFrom};
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Folder with a config file and a nested texture
    fn setup_folder(dir: &TempDir, name: &str) -> PathBuf {
        let root = dir.path().join(name);
        fs::create_dir_all(root.join("textures")).unwrap();
        fs::write(root.join("config.ron"), "(volume: 7)").unwrap();
        fs::write(root.join("textures/grass.png"), "GRASS").unwrap();
        root
    }

    /// Pak with a nested texture
    fn setup_pak(dir: &TempDir, name: &str) -> PathBuf {
        let pak_path = dir.path().join(name);
        let mut writer = PakWriter::create(&pak_path).unwrap();
        writer
            .add_file("textures/hero.png", b"HERODATA", SystemTime::now())
            .unwrap();
        writer
            .add_file("readme.txt", b"from pak", SystemTime::now())
            .unwrap();
        writer.finish().unwrap();
        pak_path
    }

    #[test]
    fn test_unmounted_state() {
        let vfs = VirtualFs::new();
        assert!(!vfs.is_mounted());
        assert_eq!(vfs.mount_count(), 0);
        assert!(vfs.tree().is_empty());
        assert!(vfs.get_file("/anything").is_none());
    }

    #[test]
    fn test_mount_folder_and_pak() {
        init_logging();
        let dir = TempDir::new().unwrap();
        let folder_root = setup_folder(&dir, "data");
        let pak_path = setup_pak(&dir, "assets.pak");

        let mut vfs = VirtualFs::new();
        vfs.mount(&folder_root, "/fs").unwrap();
        vfs.mount(&pak_path, "/zip").unwrap();
        assert!(vfs.is_mounted());
        assert_eq!(vfs.mount_count(), 2);

        let config = vfs.get_file("/fs/config.ron").unwrap();
        assert_eq!(config.size_bytes, 11);
        assert_eq!(vfs.provider_for(config).unwrap().name(), "folder");

        let hero = vfs.get_file("/zip/textures/hero.png").unwrap();
        assert_eq!(hero.size_bytes, 8);
        assert_eq!(hero.extension, "png");
        assert_eq!(vfs.provider_for(hero).unwrap().name(), "pak");

        assert_eq!(vfs.read("/fs/config.ron").unwrap(), b"(volume: 7)");
        assert_eq!(vfs.read("/zip/textures/hero.png").unwrap(), b"HERODATA");
    }

    #[test]
    fn test_last_mount_wins() {
        let dir = TempDir::new().unwrap();
        let root_a = dir.path().join("a");
        let root_b = dir.path().join("b");
        fs::create_dir_all(&root_a).unwrap();
        fs::create_dir_all(&root_b).unwrap();
        fs::write(root_a.join("readme.txt"), "from a").unwrap();
        fs::write(root_a.join("only_a.txt"), "a only").unwrap();
        fs::write(root_b.join("readme.txt"), "from b").unwrap();

        let mut vfs = VirtualFs::new();
        vfs.mount(&root_a, "/data").unwrap();
        vfs.mount(&root_b, "/data").unwrap();

        // Collision: the later mount's file wins outright
        assert_eq!(vfs.read_to_string("/data/readme.txt").unwrap(), "from b");
        // Non-colliding files from the earlier mount still show through
        assert_eq!(vfs.read_to_string("/data/only_a.txt").unwrap(), "a only");

        // Unmounting the later layer exposes the earlier one again
        vfs.unmount("/data").unwrap();
        assert_eq!(vfs.read_to_string("/data/readme.txt").unwrap(), "from a");
    }

    #[test]
    fn test_pak_overrides_folder() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("base");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("readme.txt"), "from folder").unwrap();
        let pak_path = setup_pak(&dir, "patch.pak");

        let mut vfs = VirtualFs::new();
        vfs.mount(&root, "/data").unwrap();
        vfs.mount(&pak_path, "/data").unwrap();

        assert_eq!(vfs.read_to_string("/data/readme.txt").unwrap(), "from pak");
        let entry = vfs.get_file("/data/readme.txt").unwrap();
        assert_eq!(vfs.provider_for(entry).unwrap().name(), "pak");
    }

    #[test]
    fn test_unmount_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let root = setup_folder(&dir, "data");

        let mut vfs = VirtualFs::new();
        vfs.mount(&root, "/data").unwrap();
        let files_before = vfs.tree().file_count();

        let result = vfs.unmount("/nope");
        assert!(matches!(result, Err(VfsError::NotFound(_))));
        assert_eq!(vfs.tree().file_count(), files_before);
        assert_eq!(vfs.mount_count(), 1);
    }

    #[test]
    fn test_unmount_to_empty() {
        let dir = TempDir::new().unwrap();
        let root = setup_folder(&dir, "data");

        let mut vfs = VirtualFs::new();
        vfs.mount(&root, "/data").unwrap();
        vfs.unmount("/data").unwrap();

        assert!(!vfs.is_mounted());
        assert!(vfs.tree().is_empty());
        assert!(vfs.get_file("/data/config.ron").is_none());
    }

    #[test]
    fn test_nested_mounts() {
        let dir = TempDir::new().unwrap();
        let root_a = dir.path().join("a");
        let root_b = dir.path().join("b");
        fs::create_dir_all(root_a.join("B")).unwrap();
        fs::create_dir_all(&root_b).unwrap();
        fs::write(root_a.join("top.txt"), "top").unwrap();
        fs::write(root_a.join("B/shared.txt"), "from a").unwrap();
        fs::write(root_b.join("inner.txt"), "inner").unwrap();
        fs::write(root_b.join("shared.txt"), "from b").unwrap();

        let mut vfs = VirtualFs::new();
        vfs.mount(&root_a, "/A").unwrap();
        vfs.mount(&root_b, "/A/B").unwrap();

        // /A/B reflects the nested mount
        assert!(vfs.get_file("/A/B/inner.txt").is_some());
        assert_eq!(vfs.read_to_string("/A/B/shared.txt").unwrap(), "from b");
        // /A reflects the outer mount outside of B
        assert!(vfs.get_file("/A/top.txt").is_some());
        assert!(vfs.get_directory("/A/B").is_some());
    }

    #[test]
    fn test_write_round_trip() {
        let dir = TempDir::new().unwrap();
        let root = setup_folder(&dir, "data");

        let mut vfs = VirtualFs::new();
        vfs.mount(&root, "/data").unwrap();

        let payload = b"(volume: 11, fullscreen: true)";
        vfs.write_file("/data/config.ron", payload).unwrap();
        assert_eq!(vfs.read("/data/config.ron").unwrap(), payload);
        assert_eq!(
            vfs.get_file("/data/config.ron").unwrap().size_bytes,
            payload.len() as u64
        );
        // The physical file changed too
        assert_eq!(fs::read(root.join("config.ron")).unwrap(), payload);
    }

    #[test]
    fn test_write_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let root = setup_folder(&dir, "data");

        let mut vfs = VirtualFs::new();
        vfs.mount(&root, "/data").unwrap();

        let result = vfs.write_file("/data/ghost.ron", b"x");
        assert!(matches!(result, Err(VfsError::NotFound(_))));
        let result = vfs.read("/data/ghost.ron");
        assert!(matches!(result, Err(VfsError::NotFound(_))));
    }

    #[test]
    fn test_pak_is_read_only() {
        let dir = TempDir::new().unwrap();
        let pak_path = setup_pak(&dir, "assets.pak");

        let mut vfs = VirtualFs::new();
        vfs.mount(&pak_path, "/zip").unwrap();

        let result = vfs.write_file("/zip/readme.txt", b"x");
        assert!(matches!(result, Err(VfsError::Unsupported(_))));
        let result = vfs.open_stream("/zip/readme.txt", true);
        assert!(matches!(result, Err(VfsError::Unsupported(_))));
    }

    #[test]
    fn test_corrupt_pak_keeps_previous_tree() {
        init_logging();
        let dir = TempDir::new().unwrap();
        let root = setup_folder(&dir, "data");
        let corrupt = dir.path().join("broken.pak");
        fs::write(&corrupt, b"garbage that is long enough to not be short").unwrap();

        let mut vfs = VirtualFs::new();
        vfs.mount(&root, "/data").unwrap();

        let result = vfs.mount(&corrupt, "/patch");
        assert!(matches!(result, Err(VfsError::CorruptContainer(_))));

        // Table and tree are exactly as before the failed mount
        assert_eq!(vfs.mount_count(), 1);
        assert!(vfs.get_file("/data/config.ron").is_some());
        assert_eq!(vfs.read("/data/config.ron").unwrap(), b"(volume: 7)");
        assert!(vfs.get_file("/patch/readme.txt").is_none());
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let dir = TempDir::new().unwrap();
        let root = setup_folder(&dir, "data");

        let mut vfs = VirtualFs::new();
        vfs.mount(&root, "/Data").unwrap();

        assert!(vfs.get_file("/data/CONFIG.RON").is_some());
        assert!(vfs.get_directory("/DATA/Textures").is_some());
        assert_eq!(
            vfs.read("/data/Textures/GRASS.png").unwrap(),
            b"GRASS"
        );
        assert!(vfs.exists("/dAtA"));
    }

    #[test]
    fn test_open_stream() {
        let dir = TempDir::new().unwrap();
        let root = setup_folder(&dir, "data");

        let vfs = {
            let mut vfs = VirtualFs::new();
            vfs.mount(&root, "/data").unwrap();
            vfs
        };

        let mut stream = vfs.open_stream("/data/config.ron", false).unwrap();
        let mut text = String::new();
        stream.read_to_string(&mut text).unwrap();
        assert_eq!(text, "(volume: 7)");

        stream.seek(SeekFrom::Start(1)).unwrap();
        text.clear();
        stream.read_to_string(&mut text).unwrap();
        assert_eq!(text, "volume: 7)");
    }

    #[test]
    fn test_list() {
        let dir = TempDir::new().unwrap();
        let root = setup_folder(&dir, "data");

        let mut vfs = VirtualFs::new();
        vfs.mount(&root, "/data").unwrap();

        let names = vfs.list("/data").unwrap();
        assert_eq!(names, vec!["textures", "config.ron"]);
        assert!(vfs.list("/missing").is_none());
    }

    #[test]
    fn test_unknown_provider() {
        let dir = TempDir::new().unwrap();
        let root = setup_folder(&dir, "data");

        let mut vfs = VirtualFs::new();
        let result = vfs.mount_with(&root, "/data", "cloud");
        assert!(matches!(result, Err(VfsError::NotFound(_))));
        assert_eq!(vfs.mount_count(), 0);
    }

    #[test]
    fn test_mount_manifest() {
        let dir = TempDir::new().unwrap();
        let root = setup_folder(&dir, "base");
        let pak_path = setup_pak(&dir, "patch.pak");

        let manifest = format!(
            r#"(
  mounts: [
    (physical: {:?}, virtual_path: "/data"),
    (physical: {:?}, virtual_path: "/data", provider: Some("pak")),
  ],
)"#,
            root, pak_path
        );
        let manifest_path = dir.path().join("mounts.ron");
        fs::write(&manifest_path, manifest).unwrap();

        let mut vfs = VirtualFs::new();
        let applied = vfs.mount_manifest(&manifest_path).unwrap();
        assert_eq!(applied, 2);
        assert_eq!(vfs.mount_count(), 2);
        assert_eq!(vfs.read_to_string("/data/readme.txt").unwrap(), "from pak");
        assert!(vfs.get_file("/data/config.ron").is_some());
    }
}
