//! Lazy directory traversal producing upload candidates.
//!
//! The walk is depth-first and single-pass: entries are produced as they are
//! discovered, so hashing and uploading can interleave with enumeration.

use crate::utils::errors::{Result, WebautoError};
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Options for directory walking
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Upload the target of symlinked files. Symlinked directories are
    /// always skipped, so the walk cannot loop.
    pub follow_links: bool,

    /// Names to skip (substring match against the file or directory name)
    pub exclude_patterns: Vec<String>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            follow_links: true,
            exclude_patterns: Vec::new(),
        }
    }
}

/// A regular file under the sync root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Full path to the file
    pub path: PathBuf,

    /// Object key: path relative to the root, `/`-separated
    pub key: String,

    /// File size in bytes
    pub size: u64,
}

impl LocalFile {
    /// Build a LocalFile from a DirEntry.
    /// Returns None for directories, directory symlinks and broken symlinks.
    fn from_entry(entry: &DirEntry, root: &Path, follow_links: bool) -> Result<Option<Self>> {
        let path = entry.path();
        let file_type = entry.file_type();

        let size = if file_type.is_symlink() {
            if !follow_links {
                return Ok(None);
            }
            match std::fs::metadata(path) {
                Ok(resolved) if resolved.is_file() => resolved.len(),
                // Symlinked directory or broken link: skip
                _ => return Ok(None),
            }
        } else if file_type.is_file() {
            entry
                .metadata()
                .map_err(|e| WebautoError::local_read(path, e.into()))?
                .len()
        } else {
            return Ok(None);
        };

        let relative = path.strip_prefix(root).unwrap_or(path);

        Ok(Some(Self {
            path: path.to_path_buf(),
            key: object_key(relative),
            size,
        }))
    }
}

/// Join the normal components of a relative path with `/`.
pub fn object_key(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Iterator over the regular files below a root directory.
pub struct LocalFiles {
    root: PathBuf,
    follow_links: bool,
    inner: Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + Send>,
}

impl LocalFiles {
    pub fn new(root: &Path, options: WalkOptions) -> Self {
        let patterns = options.exclude_patterns;
        let inner = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(move |entry| entry.depth() == 0 || !should_exclude(entry, &patterns));

        Self {
            root: root.to_path_buf(),
            follow_links: options.follow_links,
            inner: Box::new(inner),
        }
    }
}

impl Iterator for LocalFiles {
    type Item = Result<LocalFile>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                    return Some(Err(WebautoError::local_read(path, e.into())));
                }
            };

            match LocalFile::from_entry(&entry, &self.root, self.follow_links) {
                Ok(Some(file)) => return Some(Ok(file)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Walk a directory tree lazily
///
/// # Example
/// ```no_run
/// use webauto::fs::walker::{walk_directory, WalkOptions};
/// use std::path::Path;
///
/// for file in walk_directory(Path::new("site"), WalkOptions::default()) {
///     println!("{}", file.unwrap().key);
/// }
/// ```
pub fn walk_directory(root: &Path, options: WalkOptions) -> LocalFiles {
    LocalFiles::new(root, options)
}

/// Check if a directory entry should be excluded based on patterns
fn should_exclude(entry: &DirEntry, patterns: &[String]) -> bool {
    let file_name = entry.file_name().to_string_lossy();
    patterns.iter().any(|pattern| file_name.contains(pattern.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn keys(root: &Path, options: WalkOptions) -> Vec<String> {
        let mut keys: Vec<String> = walk_directory(root, options)
            .map(|f| f.unwrap().key)
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_walk_empty_directory() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        assert!(keys(temp_dir.path(), WalkOptions::default()).is_empty());
        Ok(())
    }

    #[test]
    fn test_walk_with_subdirectories() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;

        fs::create_dir_all(temp_dir.path().join("sub/deeper"))?;
        fs::write(temp_dir.path().join("a.html"), b"a")?;
        fs::write(temp_dir.path().join("sub/b.css"), b"b")?;
        fs::write(temp_dir.path().join("sub/deeper/c.js"), b"c")?;

        assert_eq!(
            keys(temp_dir.path(), WalkOptions::default()),
            vec!["a.html", "sub/b.css", "sub/deeper/c.js"]
        );
        Ok(())
    }

    #[test]
    fn test_walk_has_no_depth_limit() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let deep = "l1/l2/l3/l4/l5/l6/l7/l8/l9/l10";
        fs::create_dir_all(temp_dir.path().join(deep))?;
        fs::write(temp_dir.path().join(deep).join("leaf.html"), b"leaf")?;

        assert_eq!(
            keys(temp_dir.path(), WalkOptions::default()),
            vec![format!("{deep}/leaf.html")]
        );
        Ok(())
    }

    #[test]
    fn test_sizes_reported() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join("five.txt"), b"12345")?;

        let files: Vec<LocalFile> = walk_directory(temp_dir.path(), WalkOptions::default())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, 5);
        assert_eq!(files[0].path, temp_dir.path().join("five.txt"));
        Ok(())
    }

    #[test]
    fn test_exclude_patterns_prune_directories() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;

        fs::create_dir(temp_dir.path().join(".git"))?;
        fs::write(temp_dir.path().join(".git/HEAD"), b"ref")?;
        fs::write(temp_dir.path().join("index.html"), b"keep")?;
        fs::write(temp_dir.path().join(".DS_Store"), b"exclude")?;

        let options = WalkOptions {
            exclude_patterns: vec![".git".to_string(), ".DS_Store".to_string()],
            ..WalkOptions::default()
        };
        assert_eq!(keys(temp_dir.path(), options), vec!["index.html"]);
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_symlinked_directory_is_skipped() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;

        fs::create_dir(temp_dir.path().join("real"))?;
        fs::write(temp_dir.path().join("real/page.html"), b"x")?;
        std::os::unix::fs::symlink(temp_dir.path(), temp_dir.path().join("real/loop"))?;
        std::os::unix::fs::symlink(
            temp_dir.path().join("real/page.html"),
            temp_dir.path().join("alias.html"),
        )?;

        assert_eq!(
            keys(temp_dir.path(), WalkOptions::default()),
            vec!["alias.html", "real/page.html"]
        );

        let no_links = WalkOptions {
            follow_links: false,
            ..WalkOptions::default()
        };
        assert_eq!(keys(temp_dir.path(), no_links), vec!["real/page.html"]);
        Ok(())
    }

    #[test]
    fn test_object_key_uses_forward_slashes() {
        let relative: PathBuf = ["docs", "guide", "intro.html"].iter().collect();
        assert_eq!(object_key(&relative), "docs/guide/intro.html");
    }
}
