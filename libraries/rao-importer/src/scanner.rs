//! Asset discovery
//!
//! Eagle keeps one directory per asset, `images/{id}.info/`, each holding a
//! `metadata.json`. The scanner only lists those files; reading them is the
//! metadata reader's job.

use crate::metadata::METADATA_FILE;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory under the library root holding the asset directories
pub const IMAGES_DIR: &str = "images";

/// Suffix of an asset directory name
pub const INFO_SUFFIX: &str = ".info";

/// Scanner for per-asset metadata files
#[derive(Debug, Clone, Default)]
pub struct AssetScanner {
    /// Whether to follow symbolic links
    follow_links: bool,
}

/// An entry under `images/` that should have led to an asset but did not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableEntry {
    pub path: PathBuf,
    pub reason: String,
}

/// What a scan found
#[derive(Debug, Default)]
pub struct AssetScan {
    /// `images/*.info/metadata.json` files, sorted
    pub metadata_files: Vec<PathBuf>,
    /// Asset directories without a metadata file and entries the walk could
    /// not read, sorted by path
    pub unreadable: Vec<UnreadableEntry>,
}

impl AssetScanner {
    /// Create a new asset scanner
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to follow symbolic links
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Scan `{root}/images/*.info/`
    ///
    /// A library without an `images/` directory has no assets.
    pub fn scan(&self, root: &Path) -> AssetScan {
        let images = root.join(IMAGES_DIR);
        if !images.is_dir() {
            tracing::debug!("No images directory in {}", root.display());
            return AssetScan::default();
        }

        let walker = WalkDir::new(&images)
            .follow_links(self.follow_links)
            .min_depth(1)
            .max_depth(2);

        let mut scan = AssetScan::default();
        let mut info_dirs = BTreeSet::new();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Failed to read entry under {}: {}", images.display(), e);
                    scan.unreadable.push(UnreadableEntry {
                        path: e.path().map_or_else(|| images.clone(), Path::to_path_buf),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if entry.depth() == 1 {
                if entry.file_type().is_dir() && has_info_suffix(entry.path()) {
                    info_dirs.insert(entry.into_path());
                }
            } else if entry.file_type().is_file() && is_asset_metadata(entry.path()) {
                scan.metadata_files.push(entry.into_path());
            }
        }

        for file in &scan.metadata_files {
            if let Some(dir) = file.parent() {
                info_dirs.remove(dir);
            }
        }
        for dir in info_dirs {
            if scan.unreadable.iter().any(|entry| entry.path.starts_with(&dir)) {
                continue;
            }
            tracing::debug!("Asset directory {} has no {}", dir.display(), METADATA_FILE);
            scan.unreadable.push(UnreadableEntry {
                path: dir.join(METADATA_FILE),
                reason: format!("{METADATA_FILE} is missing"),
            });
        }

        scan.metadata_files.sort();
        scan.unreadable.sort_by(|a, b| a.path.cmp(&b.path));
        scan
    }
}

fn has_info_suffix(dir: &Path) -> bool {
    dir.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(INFO_SUFFIX))
}

/// Whether a path looks like `{...}.info/metadata.json`
pub fn is_asset_metadata(path: &Path) -> bool {
    let is_metadata = path.file_name().and_then(|n| n.to_str()) == Some(METADATA_FILE);
    let in_info_dir = path.parent().is_some_and(has_info_suffix);

    is_metadata && in_info_dir
}

/// `images/{id}.info/` prefix of any path inside an asset directory
///
/// `None` for paths that do not belong to a single asset, such as the
/// `images/` directory itself.
pub fn info_dir_of(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut components = relative.components().map(|c| c.as_os_str().to_str());
    match (components.next()??, components.next()??) {
        (IMAGES_DIR, dir) if dir.ends_with(INFO_SUFFIX) => Some(format!("{IMAGES_DIR}/{dir}/")),
        _ => None,
    }
}

/// Path relative to the library root with `/` separators
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "{}").unwrap();
    }

    #[test]
    fn test_scan_finds_metadata_sorted() {
        let dir = TempDir::new().unwrap();
        let images = dir.path().join(IMAGES_DIR);
        touch(&images.join("B.info").join(METADATA_FILE));
        touch(&images.join("A.info").join(METADATA_FILE));
        // Ignored: not an .info directory, wrong file, wrong depth
        touch(&images.join("tmp").join(METADATA_FILE));
        touch(&images.join("C.info").join("photo.jpg"));
        touch(&images.join(METADATA_FILE));
        touch(&dir.path().join(METADATA_FILE));

        let scan = AssetScanner::new().scan(dir.path());

        assert_eq!(
            scan.metadata_files,
            vec![
                images.join("A.info").join(METADATA_FILE),
                images.join("B.info").join(METADATA_FILE),
            ]
        );
        // C.info is an asset directory without metadata
        assert_eq!(
            scan.unreadable,
            vec![UnreadableEntry {
                path: images.join("C.info").join(METADATA_FILE),
                reason: format!("{METADATA_FILE} is missing"),
            }]
        );
    }

    #[test]
    fn test_scan_without_images_dir() {
        let dir = TempDir::new().unwrap();
        let scan = AssetScanner::new().scan(dir.path());
        assert!(scan.metadata_files.is_empty());
        assert!(scan.unreadable.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_error_is_reported() {
        let dir = TempDir::new().unwrap();
        let images = dir.path().join(IMAGES_DIR);
        touch(&images.join("A.info").join(METADATA_FILE));
        std::os::unix::fs::symlink(dir.path().join("gone"), images.join("L.info")).unwrap();

        // Without following links the dangling link is just not an asset
        let scan = AssetScanner::new().scan(dir.path());
        assert_eq!(scan.metadata_files.len(), 1);
        assert!(scan.unreadable.is_empty());

        let scan = AssetScanner::new().follow_links(true).scan(dir.path());
        assert_eq!(scan.metadata_files, vec![images.join("A.info").join(METADATA_FILE)]);
        assert_eq!(scan.unreadable.len(), 1);
        assert_eq!(
            info_dir_of(dir.path(), &scan.unreadable[0].path).as_deref(),
            Some("images/L.info/")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_follow_links_reaches_linked_assets() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        touch(&outside.path().join(METADATA_FILE));
        let images = dir.path().join(IMAGES_DIR);
        std::fs::create_dir_all(&images).unwrap();
        std::os::unix::fs::symlink(outside.path(), images.join("S.info")).unwrap();

        assert!(AssetScanner::new().scan(dir.path()).metadata_files.is_empty());

        let scan = AssetScanner::new().follow_links(true).scan(dir.path());
        assert_eq!(scan.metadata_files, vec![images.join("S.info").join(METADATA_FILE)]);
        assert!(scan.unreadable.is_empty());
    }

    #[test]
    fn test_path_helpers() {
        let root = Path::new("/lib/Main.library");
        let metadata = root.join("images").join("K1.info").join(METADATA_FILE);

        assert_eq!(relative_path(root, &metadata), "images/K1.info/metadata.json");
        assert!(is_asset_metadata(&metadata));

        assert_eq!(info_dir_of(root, &metadata).as_deref(), Some("images/K1.info/"));
        assert_eq!(
            info_dir_of(root, &root.join("images").join("K1.info")).as_deref(),
            Some("images/K1.info/")
        );
        assert_eq!(info_dir_of(root, &root.join("images")), None);
        assert_eq!(info_dir_of(root, &root.join("images").join("tmp")), None);
    }
}
