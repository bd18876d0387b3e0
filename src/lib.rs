//! LODE: a layered virtual file system for game assets
//!
//! Unifies plain directories and pak archive containers under a single
//! forward-slash virtual namespace:
//! - Mount folders or pak archives at virtual paths
//! - Later mounts override earlier ones on collisions (patch layering)
//! - Case-insensitive lookups for cross-platform asset references
//! - Pluggable providers for new container formats
//!
//! ```no_run
//! use lode::VirtualFs;
//!
//! let mut vfs = VirtualFs::new();
//! vfs.mount("assets/base", "/data")?;
//! vfs.mount("assets/patch.pak", "/data")?;
//! let config = vfs.read("/data/config.ron")?;
//! # Ok::<(), lode::VfsError>(())
//! ```

pub mod error;
pub mod mount;
pub mod path;
pub mod provider;
pub mod tree;
pub mod vfs;

pub use error::VfsError;
pub use mount::{MountManifest, MountPoint, MountSpec, MountTable};
pub use provider::folder::FolderProvider;
pub use provider::pak::{PakProvider, PakWriter};
pub use provider::{FileDescriptor, Provider, VfsStream};
pub use tree::{DirId, DirectoryEntry, FileEntry, FileId, VfsTree};
pub use vfs::VirtualFs;
