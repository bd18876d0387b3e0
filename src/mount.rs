//! Mount table
//!
//! Ordered bindings of physical storage roots to positions in the virtual
//! namespace. Mounts may overlap; registration order decides precedence,
//! with later mounts overriding earlier ones on file collisions so patch
//! content can be layered over base content.

use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::VfsError;
use crate::path;
use crate::provider::Provider;

/// A binding of a physical root to a virtual mount point
pub struct MountPoint {
    /// Physical storage root (directory or container file)
    pub physical_root: PathBuf,
    /// Absolute normalized virtual path with leading and trailing `/`
    pub virtual_path: String,
    /// Provider serving this mount
    pub provider: Arc<dyn Provider>,
}

impl fmt::Debug for MountPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountPoint")
            .field("physical_root", &self.physical_root)
            .field("virtual_path", &self.virtual_path)
            .field("provider", &self.provider.name())
            .finish()
    }
}

/// Ordered list of active mounts
#[derive(Debug, Default)]
pub struct MountTable {
    mounts: Vec<MountPoint>,
}

impl MountTable {
    /// Create an empty mount table
    pub fn new() -> Self {
        Self { mounts: Vec::new() }
    }

    /// Number of active mounts
    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    /// Whether no mounts are active
    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Mounts in registration order
    pub fn iter(&self) -> impl Iterator<Item = &MountPoint> {
        self.mounts.iter()
    }

    /// Mount at a given registration index
    pub fn get(&self, index: usize) -> Option<&MountPoint> {
        self.mounts.get(index)
    }

    /// Register a mount at the end of the table
    pub(crate) fn push(&mut self, mount: MountPoint) {
        self.mounts.push(mount);
    }

    /// Drop the most recently registered mount
    pub(crate) fn pop(&mut self) -> Option<MountPoint> {
        self.mounts.pop()
    }

    /// Re-insert a mount at its original registration index
    pub(crate) fn insert(&mut self, index: usize, mount: MountPoint) {
        self.mounts.insert(index, mount);
    }

    /// Remove the most recent mount whose virtual path matches
    /// (case-insensitive). Returns the removed mount and its index.
    pub(crate) fn remove_last(&mut self, virtual_path: &str) -> Result<(usize, MountPoint), VfsError> {
        let key = path::fold(virtual_path);
        let index = self
            .mounts
            .iter()
            .rposition(|m| path::fold(&m.virtual_path) == key)
            .ok_or_else(|| VfsError::NotFound(format!("no mount at {}", virtual_path)))?;
        Ok((index, self.mounts.remove(index)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mount manifest - declarative mount layout in RON
// ─────────────────────────────────────────────────────────────────────────────

/// One mount declaration in a manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountSpec {
    /// Physical path (directory or container file)
    pub physical: String,
    /// Virtual mount point
    pub virtual_path: String,
    /// Provider name; omitted means auto-detect from the physical path
    #[serde(default)]
    pub provider: Option<String>,
}

/// Declarative mount layout, applied in listed order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MountManifest {
    /// Mounts in registration order
    pub mounts: Vec<MountSpec>,
}

impl MountManifest {
    /// Load a manifest from a RON file (supports both compressed and
    /// uncompressed)
    pub fn load(manifest_path: &Path) -> Result<Self, VfsError> {
        let bytes = fs::read(manifest_path)?;
        Self::from_bytes(&bytes)
    }

    /// Parse a manifest from bytes (supports both compressed and
    /// uncompressed RON)
    pub fn from_bytes(data: &[u8]) -> Result<Self, VfsError> {
        // Detect format: RON files start with '(' or whitespace, brotli is binary
        let is_plain_ron = data
            .first()
            .map(|&b| b == b'(' || b == b' ' || b == b'\n' || b == b'\r' || b == b'\t')
            .unwrap_or(false);

        let contents = if is_plain_ron {
            String::from_utf8_lossy(data).to_string()
        } else {
            let mut decompressed = Vec::new();
            brotli::BrotliDecompress(&mut Cursor::new(data), &mut decompressed)
                .map_err(|e| VfsError::Io(format!("manifest decompression failed: {}", e)))?;
            String::from_utf8_lossy(&decompressed).to_string()
        };

        ron::from_str(&contents).map_err(|e| VfsError::Io(format!("manifest parse error: {}", e)))
    }

    /// Save the manifest as pretty RON (uncompressed, manifests are
    /// hand-edited)
    pub fn save(&self, manifest_path: &Path) -> Result<(), VfsError> {
        let config = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .indentor("  ".to_string());
        let ron_string = ron::ser::to_string_pretty(self, config)
            .map_err(|e| VfsError::Io(format!("manifest serialization failed: {}", e)))?;
        fs::write(manifest_path, ron_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::folder::FolderProvider;

    fn mount_at(virtual_path: &str) -> MountPoint {
        MountPoint {
            physical_root: PathBuf::from("/phys"),
            virtual_path: path::normalize_dir(virtual_path).unwrap(),
            provider: Arc::new(FolderProvider::new()),
        }
    }

    #[test]
    fn test_remove_last_takes_most_recent() {
        let mut table = MountTable::new();
        table.push(mount_at("/data"));
        table.push(mount_at("/other"));
        table.push(mount_at("/data"));

        let (index, _removed) = table.remove_last("/data/").unwrap();
        assert_eq!(index, 2);
        assert_eq!(table.len(), 2);

        // The earlier /data mount is still there
        let (index, _removed) = table.remove_last("/data/").unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn test_remove_last_case_insensitive() {
        let mut table = MountTable::new();
        table.push(mount_at("/Data"));
        assert!(table.remove_last("/data/").is_ok());
    }

    #[test]
    fn test_remove_last_missing() {
        let mut table = MountTable::new();
        table.push(mount_at("/data"));
        let result = table.remove_last("/nope/");
        assert!(matches!(result, Err(VfsError::NotFound(_))));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_manifest_parse() {
        let text = r#"(
  mounts: [
    (physical: "assets/base", virtual_path: "/data"),
    (physical: "assets/patch.pak", virtual_path: "/data", provider: Some("pak")),
  ],
)"#;
        let manifest = MountManifest::from_bytes(text.as_bytes()).unwrap();
        assert_eq!(manifest.mounts.len(), 2);
        assert_eq!(manifest.mounts[0].provider, None);
        assert_eq!(manifest.mounts[1].provider, Some("pak".to_string()));
        assert_eq!(manifest.mounts[1].virtual_path, "/data");
    }

    #[test]
    fn test_manifest_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let manifest_path = dir.path().join("mounts.ron");

        let manifest = MountManifest {
            mounts: vec![MountSpec {
                physical: "assets/base".to_string(),
                virtual_path: "/data".to_string(),
                provider: None,
            }],
        };
        manifest.save(&manifest_path).unwrap();

        let loaded = MountManifest::load(&manifest_path).unwrap();
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_manifest_compressed() {
        let text = r#"(mounts: [(physical: "base", virtual_path: "/d")])"#;
        let mut compressed = Vec::new();
        brotli::BrotliCompress(
            &mut Cursor::new(text.as_bytes()),
            &mut compressed,
            &brotli::enc::BrotliEncoderParams {
                quality: 6,
                lgwin: 22,
                ..Default::default()
            },
        )
        .unwrap();

        let manifest = MountManifest::from_bytes(&compressed).unwrap();
        assert_eq!(manifest.mounts.len(), 1);
    }

    #[test]
    fn test_manifest_garbage() {
        let result = MountManifest::from_bytes(&[0xde, 0xad, 0xbe, 0xef]);
        assert!(matches!(result, Err(VfsError::Io(_))));
    }
}
