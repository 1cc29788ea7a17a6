//! Workspace-relative path normalisation.
//!
//! Paths reported by the agent runtime may be absolute, may use either
//! separator convention, and may contain `.` or doubled separators. Everything
//! that flows into a candidate set goes through [`NormalizedPath`] first so
//! that the same logical file always compares equal.

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A relative, `/`-separated path with no root, no empty and no `.` segments.
///
/// `..` segments are kept verbatim; no traversal is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedPath(String);

impl NormalizedPath {
    fn from_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> Self {
        let kept: Vec<&str> = segments
            .into_iter()
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();
        Self(kept.join("/"))
    }

    /// The POSIX string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }

    /// The final segment, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Convert to a native relative path, suitable for joining onto a workspace root.
    pub fn to_path_buf(&self) -> PathBuf {
        self.segments().collect()
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Plain strings treat both `/` and `\` as separators. A leading root is
/// dropped along with the empty segment it produces.
impl From<&str> for NormalizedPath {
    fn from(path: &str) -> Self {
        let unified = path.replace('\\', "/");
        Self::from_segments(unified.split('/'))
    }
}

impl From<String> for NormalizedPath {
    fn from(path: String) -> Self {
        Self::from(path.as_str())
    }
}

impl From<&String> for NormalizedPath {
    fn from(path: &String) -> Self {
        Self::from(path.as_str())
    }
}

/// Structured paths are walked by component: the root (and any Windows
/// prefix) is discarded rather than rejected.
impl From<&Path> for NormalizedPath {
    fn from(path: &Path) -> Self {
        let segments: Vec<String> = path
            .components()
            .filter_map(|component| match component {
                Component::Prefix(_) | Component::RootDir | Component::CurDir => None,
                Component::ParentDir => Some("..".to_string()),
                Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            })
            .collect();
        Self::from_segments(segments.iter().map(String::as_str))
    }
}

impl From<&PathBuf> for NormalizedPath {
    fn from(path: &PathBuf) -> Self {
        Self::from(path.as_path())
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(path: PathBuf) -> Self {
        Self::from(path.as_path())
    }
}
