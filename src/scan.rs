//! Image discovery for carousels.
//!
//! Assets are found by filename convention (`prefix1.jpg`, `prefix2.png`, ...
//! plus a `prefix*` fallback) or listed in a JSON manifest. Both sources share
//! the same inclusion policy: the path must be a regular file with nonzero
//! size. An empty result is valid and means "nothing uploaded yet".

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extension priority for numbered candidates (lowercase, without dot).
pub const EXTENSION_PRIORITY: &[&str] = &["jpg", "jpeg", "png"];

/// A resolved image. Identity is `path`; `stem` keys caption overrides.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageAsset {
    pub path: PathBuf,
    pub stem: String,
}

impl ImageAsset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, stem }
    }
}

/// Anything that can list candidate assets for a carousel.
pub trait ImageSource {
    fn list(&self) -> Vec<ImageAsset>;
}

/// Filename-convention source scanning one directory.
#[derive(Debug, Clone)]
pub struct PatternSource {
    pub dir: PathBuf,
    pub prefix: String,
    pub max_count: usize,
}

impl PatternSource {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, max_count: usize) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            max_count,
        }
    }
}

impl ImageSource for PatternSource {
    fn list(&self) -> Vec<ImageAsset> {
        resolve(&self.dir, &self.prefix, self.max_count)
    }
}

/// Source backed by a JSON array of paths.
///
/// Relative entries are resolved against the manifest's own directory.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    pub manifest: PathBuf,
    pub max_count: usize,
}

impl ImageSource for ManifestSource {
    fn list(&self) -> Vec<ImageAsset> {
        let raw = match fs::read_to_string(&self.manifest) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %self.manifest.display(), %err, "manifest unreadable; no assets");
                return Vec::new();
            }
        };
        let entries: Vec<PathBuf> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %self.manifest.display(), %err, "manifest malformed; no assets");
                return Vec::new();
            }
        };
        let base = self.manifest.parent().unwrap_or_else(|| Path::new(""));
        let mut seen = HashSet::new();
        entries
            .into_iter()
            .map(|p| if p.is_relative() { base.join(p) } else { p })
            .filter(|p| is_nonempty_file(p))
            .filter(|p| seen.insert(p.clone()))
            .take(self.max_count)
            .map(ImageAsset::new)
            .collect()
    }
}

/// Resolve the ordered asset list for `prefix` inside `base_dir`.
///
/// Numbered files come first (ascending number, then extension priority),
/// followed by any other `prefix*` match in lexicographic path order. The
/// result is deduplicated by path and truncated to `max_count`.
#[must_use]
pub fn resolve(base_dir: &Path, prefix: &str, max_count: usize) -> Vec<ImageAsset> {
    if !base_dir.is_dir() {
        debug!(dir = %base_dir.display(), "image directory missing; no assets");
        return Vec::new();
    }

    let mut numbered: Vec<(u64, usize, PathBuf)> = Vec::new();
    let mut wildcard: Vec<PathBuf> = Vec::new();

    for entry in WalkDir::new(base_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(rest) = name.strip_prefix(prefix) else {
            continue;
        };
        let Some(ext_rank) = extension_rank(path) else {
            continue;
        };
        if !is_nonempty_file(path) {
            debug!(path = %path.display(), "skipping empty or non-regular file");
            continue;
        }
        match numbered_suffix(rest) {
            Some(n) => numbered.push((n, ext_rank, path.to_path_buf())),
            None => wildcard.push(path.to_path_buf()),
        }
    }

    numbered.sort();
    wildcard.sort();

    let mut seen = HashSet::new();
    numbered
        .into_iter()
        .map(|(_, _, p)| p)
        .chain(wildcard)
        .filter(|p| seen.insert(p.clone()))
        .take(max_count)
        .map(ImageAsset::new)
        .collect()
}

/// Position of the extension in [`EXTENSION_PRIORITY`], case-insensitive.
fn extension_rank(path: &Path) -> Option<usize> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    EXTENSION_PRIORITY.iter().position(|e| *e == ext)
}

/// `"12.jpg"` -> `Some(12)`; anything other than digits before the dot -> `None`.
fn numbered_suffix(rest: &str) -> Option<u64> {
    let (digits, _ext) = rest.rsplit_once('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn is_nonempty_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}
