//! Virtual path normalization
//!
//! All paths in the virtual namespace are forward-slash separated and
//! absolute, independent of the host platform's path syntax. Lookups are
//! case-insensitive; `fold` produces the canonical matching key.

use crate::error::VfsError;

/// The virtual path separator
pub const SEPARATOR: char = '/';

/// Characters that are never valid in a file name (plus ASCII control chars)
const ILLEGAL_NAME_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Canonicalize a virtual path.
///
/// Backslashes become `/`, repeated separators collapse, the result gains a
/// single leading `/` and loses any trailing separator (except for the root
/// itself). Illegal filename characters are stripped from the leaf segment
/// only; directory segments are assumed already valid.
pub fn normalize(path: &str) -> Result<String, VfsError> {
    if path.trim().is_empty() {
        return Err(VfsError::InvalidPath("empty path".to_string()));
    }

    let unified = path.replace('\\', "/");
    let mut segments: Vec<String> = unified
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();

    // Only separators left: the root
    if segments.is_empty() {
        return Ok("/".to_string());
    }

    if let Some(leaf) = segments.last_mut() {
        *leaf = clean_name(leaf)?;
    }

    Ok(format!("/{}", segments.join("/")))
}

/// Canonicalize a virtual directory path (mount-point form).
///
/// Same as `normalize`, but the result always carries a trailing `/`.
pub fn normalize_dir(path: &str) -> Result<String, VfsError> {
    let mut normalized = normalize(path)?;
    if !normalized.ends_with(SEPARATOR) {
        normalized.push(SEPARATOR);
    }
    Ok(normalized)
}

/// Case-fold a path or name for case-insensitive matching
pub fn fold(path: &str) -> String {
    path.to_ascii_lowercase()
}

/// Strip illegal filename characters from a name.
///
/// Fails if nothing remains after stripping.
pub fn clean_name(name: &str) -> Result<String, VfsError> {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control() && !ILLEGAL_NAME_CHARS.contains(c))
        .collect();

    if cleaned.is_empty() {
        return Err(VfsError::InvalidPath(format!(
            "name '{}' is empty after removing illegal characters",
            name.escape_debug()
        )));
    }
    Ok(cleaned)
}

/// Split a file name into (base name, extension).
///
/// Dot-files like `.config` count as all base name, no extension.
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(0) | None => (name, ""),
        Some(idx) => (&name[..idx], &name[idx + 1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("foo/bar.txt").unwrap(), "/foo/bar.txt");
        assert_eq!(normalize("/foo/bar.txt").unwrap(), "/foo/bar.txt");
        assert_eq!(normalize("foo\\bar\\baz.png").unwrap(), "/foo/bar/baz.png");
    }

    #[test]
    fn test_normalize_collapses_separators() {
        assert_eq!(normalize("//foo///bar").unwrap(), "/foo/bar");
        assert_eq!(normalize("foo//bar/").unwrap(), "/foo/bar");
    }

    #[test]
    fn test_normalize_root() {
        assert_eq!(normalize("/").unwrap(), "/");
        assert_eq!(normalize("///").unwrap(), "/");
        assert_eq!(normalize("\\").unwrap(), "/");
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(matches!(normalize(""), Err(VfsError::InvalidPath(_))));
        assert!(matches!(normalize("   "), Err(VfsError::InvalidPath(_))));
    }

    #[test]
    fn test_normalize_strips_illegal_leaf_chars() {
        assert_eq!(normalize("/data/he*ro?.png").unwrap(), "/data/hero.png");
        assert_eq!(normalize("/data/a<b>c.txt").unwrap(), "/data/abc.txt");
        // Leaf that is nothing but illegal characters fails
        assert!(matches!(
            normalize("/data/???"),
            Err(VfsError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_normalize_idempotent() {
        for p in ["/a/b/c.txt", "a\\b\\c", "//x//y//", "/", "foo"] {
            let once = normalize(p).unwrap();
            assert_eq!(normalize(&once).unwrap(), once);
        }
    }

    #[test]
    fn test_normalize_dir() {
        assert_eq!(normalize_dir("/a/b").unwrap(), "/a/b/");
        assert_eq!(normalize_dir("/a/b/").unwrap(), "/a/b/");
        assert_eq!(normalize_dir("/").unwrap(), "/");
        // Idempotent too
        let once = normalize_dir("data\\packs").unwrap();
        assert_eq!(normalize_dir(&once).unwrap(), once);
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold("/Data/Hero.PNG"), "/data/hero.png");
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("hero.png"), ("hero", "png"));
        assert_eq!(split_name("archive.tar.gz"), ("archive.tar", "gz"));
        assert_eq!(split_name("readme"), ("readme", ""));
        assert_eq!(split_name(".config"), (".config", ""));
    }
}
