//! Search scope resolution for a scan
//!
//! Architectural Principle: Service Layer - PathScope turns caller input into canonical boundaries
//! - Include and exclude directories are resolved against the project root
//! - Exclusion is path containment on whole components, never raw string prefixes
//! - Missing directories are inert rather than errors

use crate::domain::outcome::{ComplianceError, ComplianceResult};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// A directory subtree pruned entirely from discovery
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExclusionBoundary {
    path: PathBuf,
}

impl ExclusionBoundary {
    /// Create a boundary from an already canonical path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `path` is the boundary itself or lies beneath it
    pub fn contains(&self, path: &Path) -> bool {
        // Path::starts_with compares whole components, so /a/bc is not under /a/b.
        path.starts_with(&self.path)
    }
}

/// Canonical search roots and exclusion boundaries for one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScope {
    /// Canonical project root
    pub root: PathBuf,
    /// Directories discovery starts from, deduplicated in first-seen order
    pub search_roots: Vec<PathBuf>,
    /// Subtrees pruned from discovery
    pub exclusions: Vec<ExclusionBoundary>,
}

impl ResolvedScope {
    /// Whether a path falls inside any exclusion boundary
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.exclusions.iter().any(|boundary| boundary.contains(path))
    }
}

/// Resolves include/exclude directory lists relative to a project root
#[derive(Debug, Clone)]
pub struct PathScope {
    root: PathBuf,
    default_includes: Vec<String>,
}

impl PathScope {
    /// Create a scope for an existing root directory
    pub fn new<P: AsRef<Path>>(root: P) -> ComplianceResult<Self> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Err(ComplianceError::config("A project root is required"));
        }

        let absolute = absolutize(root)?;
        if !absolute.is_dir() {
            return Err(ComplianceError::config(format!(
                "Project root '{}' does not exist or is not a directory",
                root.display()
            )));
        }

        Ok(Self { root: canonicalize(&absolute), default_includes: vec![".".to_string()] })
    }

    /// Search roots used when the caller supplies no include directories
    pub fn with_default_includes<I, S>(mut self, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_includes = includes.into_iter().map(Into::into).collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve include and exclude directories into a canonical scope
    pub fn resolve(&self, include_dirs: &[String], exclude_dirs: &[String]) -> ResolvedScope {
        let includes = if include_dirs.is_empty() { &self.default_includes } else { include_dirs };

        let mut search_roots: Vec<PathBuf> = Vec::new();
        for dir in includes {
            let resolved = self.resolve_dir(dir);
            if !search_roots.contains(&resolved) {
                search_roots.push(resolved);
            }
        }

        let mut exclusions: Vec<ExclusionBoundary> = Vec::new();
        for dir in exclude_dirs {
            let boundary = ExclusionBoundary::new(self.resolve_dir(dir));
            if !exclusions.contains(&boundary) {
                exclusions.push(boundary);
            }
        }

        tracing::debug!(
            root = %self.root.display(),
            search_roots = search_roots.len(),
            exclusions = exclusions.len(),
            "resolved scan scope"
        );

        ResolvedScope { root: self.root.clone(), search_roots, exclusions }
    }

    fn resolve_dir(&self, dir: &str) -> PathBuf {
        let path = Path::new(dir);
        if path.is_absolute() {
            canonicalize(path)
        } else {
            canonicalize(&self.root.join(path))
        }
    }
}

/// Split a comma-separated directory list, trimming entries and dropping empties
pub fn parse_dir_list(arg: &str) -> Vec<String> {
    arg.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Canonical form of a path: the filesystem's view when it exists, lexical otherwise
pub fn canonicalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| normalize_lexically(path))
}

/// Remove `.` components and fold `..` without touching the filesystem
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

fn absolutize(path: &Path) -> ComplianceResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
