//! Recursive candidate-file discovery under a resolved scope
//!
//! Architectural Principle: Service Layer - FileDiscovery owns the filesystem walk
//! - Excluded subtrees are pruned before they are descended
//! - Traversal is sorted by file name so repeated scans yield the same order
//! - Unreadable directories become warnings, never scan failures

use crate::domain::outcome::{CandidateFile, ComplianceError, ComplianceResult, DiscoveryWarning};
use crate::scope::ResolvedScope;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Decides whether a discovered regular file should be evaluated
pub trait CandidateSelector: Sync {
    fn is_candidate(&self, path: &Path) -> bool;
}

impl<F> CandidateSelector for F
where
    F: Fn(&Path) -> bool + Sync,
{
    fn is_candidate(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Case-insensitive file extension allow-list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSelector {
    /// Lower-cased suffixes including the leading dot
    suffixes: Vec<String>,
}

impl ExtensionSelector {
    /// Accepts extensions with or without the leading dot
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{ext}"))
            .collect();
        Self { suffixes }
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }
}

impl CandidateSelector for ExtensionSelector {
    fn is_candidate(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy().to_ascii_lowercase();
        self.suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
    }
}

/// Candidate files found by a walk, plus whatever had to be skipped
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Unique candidates in discovery order
    pub candidates: Vec<CandidateFile>,
    /// Roots and directories that could not be walked
    pub warnings: Vec<DiscoveryWarning>,
}

impl Discovery {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }
}

/// Walks search roots and collects candidate files
#[derive(Debug, Clone, Default)]
pub struct FileDiscovery {
    /// Directory names pruned wherever they appear below a search root
    skip_dir_names: Vec<glob::Pattern>,
}

impl FileDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prune directories whose name matches any of the given glob patterns
    pub fn with_skip_dirs(mut self, patterns: &[String]) -> ComplianceResult<Self> {
        for pattern in patterns {
            let compiled = glob::Pattern::new(pattern).map_err(|e| {
                ComplianceError::pattern(format!("Invalid directory pattern '{pattern}': {e}"))
            })?;
            self.skip_dir_names.push(compiled);
        }
        Ok(self)
    }

    /// Walk every search root and return the deduplicated candidate set
    pub fn discover(&self, scope: &ResolvedScope, selector: &dyn CandidateSelector) -> Discovery {
        let mut discovery = Discovery::default();
        let mut seen: HashSet<PathBuf> = HashSet::new();

        for root in &scope.search_roots {
            if !root.is_dir() {
                tracing::debug!("Skipping search root {}: not a directory", root.display());
                continue;
            }

            let walker = WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| !self.prunes(entry, scope));

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                        tracing::warn!("Skipping unreadable path {}: {}", path.display(), e);
                        discovery.warnings.push(DiscoveryWarning::new(path, e.to_string()));
                        continue;
                    }
                };

                if !entry.file_type().is_file() {
                    continue;
                }

                let path = entry.path();
                if !selector.is_candidate(path) {
                    continue;
                }

                if seen.insert(path.to_path_buf()) {
                    discovery.candidates.push(CandidateFile::new(entry.into_path()));
                }
            }
        }

        tracing::debug!(
            candidates = discovery.candidates.len(),
            warnings = discovery.warnings.len(),
            "discovery finished"
        );

        discovery
    }

    /// Whether an entry (and, for directories, its whole subtree) is left out
    fn prunes(&self, entry: &DirEntry, scope: &ResolvedScope) -> bool {
        if scope.is_excluded(entry.path()) {
            return true;
        }

        if entry.depth() > 0 && entry.file_type().is_dir() && !self.skip_dir_names.is_empty() {
            let name = entry.file_name().to_string_lossy();
            return self.skip_dir_names.iter().any(|pattern| pattern.matches(&name));
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::PathScope;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn relative_paths(discovery: &Discovery, root: &Path) -> Vec<String> {
        discovery
            .candidates
            .iter()
            .map(|c| c.path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[rstest]
    #[case("rock.png", true)]
    #[case("ROCK.PNG", true)]
    #[case("level.UMap", true)]
    #[case("rock.png.bak", false)]
    #[case("notes.txt", false)]
    fn test_extension_selector(#[case] name: &str, #[case] expected: bool) {
        let selector = ExtensionSelector::new([".png", "umap", " .WAV "]);

        assert_eq!(selector.is_candidate(Path::new(name)), expected);
        assert_eq!(selector.suffixes(), &[".png", ".umap", ".wav"]);
    }

    #[test]
    fn test_exclusion_prunes_subtree_but_not_string_prefix_siblings() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "a/b/inside.png");
        touch(temp_dir.path(), "a/b/deeper/inside.png");
        touch(temp_dir.path(), "a/bc/x.png");

        let scope = PathScope::new(temp_dir.path()).unwrap();
        let resolved = scope.resolve(&[], &strings(&["a/b"]));
        let discovery =
            FileDiscovery::new().discover(&resolved, &ExtensionSelector::new(["png"]));

        assert_eq!(relative_paths(&discovery, scope.root()), vec!["a/bc/x.png"]);
    }

    #[test]
    fn test_overlapping_includes_are_deduplicated() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "x/top.png");
        touch(temp_dir.path(), "x/y/nested.png");

        let scope = PathScope::new(temp_dir.path()).unwrap();
        let resolved = scope.resolve(&strings(&["x", "x/y"]), &[]);
        let discovery =
            FileDiscovery::new().discover(&resolved, &ExtensionSelector::new(["png"]));

        assert_eq!(relative_paths(&discovery, scope.root()), vec!["x/top.png", "x/y/nested.png"]);
    }

    #[test]
    fn test_discovery_is_idempotent_and_sorted() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["b/2.png", "a/1.png", "c.png", "a/z/3.png"] {
            touch(temp_dir.path(), name);
        }

        let scope = PathScope::new(temp_dir.path()).unwrap();
        let resolved = scope.resolve(&[], &[]);
        let discovery = FileDiscovery::new();
        let selector = ExtensionSelector::new(["png"]);

        let first = discovery.discover(&resolved, &selector);
        let second = discovery.discover(&resolved, &selector);

        assert_eq!(first.candidates, second.candidates);
        assert_eq!(
            relative_paths(&first, scope.root()),
            vec!["a/1.png", "a/z/3.png", "b/2.png", "c.png"]
        );
    }

    #[test]
    fn test_missing_root_is_skipped_silently() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "present/a.png");

        let scope = PathScope::new(temp_dir.path()).unwrap();
        let resolved = scope.resolve(&strings(&["missing", "present"]), &[]);
        let discovery =
            FileDiscovery::new().discover(&resolved, &ExtensionSelector::new(["png"]));

        assert_eq!(discovery.len(), 1);
        assert!(discovery.warnings.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_a_warning() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "Content/a.png");
        touch(temp_dir.path(), "Content/Locked/hidden.png");
        touch(temp_dir.path(), "Content/z.png");

        let locked = temp_dir.path().join("Content/Locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        // Root ignores directory permissions, so there is nothing to observe.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let scope = PathScope::new(temp_dir.path()).unwrap();
        let discovery =
            FileDiscovery::new().discover(&scope.resolve(&[], &[]), &ExtensionSelector::new(["png"]));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let names: Vec<_> = discovery.candidates.iter().map(|c| c.display_name()).collect();
        assert_eq!(names, vec!["a", "z"]);
        assert_eq!(discovery.warnings.len(), 1);
        assert_eq!(discovery.warnings[0].path, scope.root().join("Content/Locked"));
    }

    #[test]
    fn test_skip_dir_names_prune_below_roots() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "src/main.cc");
        touch(temp_dir.path(), "node_modules/pkg/vendored.cc");
        touch(temp_dir.path(), "src/.git/hooks/hook.cc");

        let scope = PathScope::new(temp_dir.path()).unwrap();
        let resolved = scope.resolve(&[], &[]);
        let discovery = FileDiscovery::new()
            .with_skip_dirs(&strings(&["node_modules", ".git"]))
            .unwrap()
            .discover(&resolved, &ExtensionSelector::new(["cc"]));

        assert_eq!(relative_paths(&discovery, scope.root()), vec!["src/main.cc"]);
    }

    #[test]
    fn test_invalid_skip_pattern_is_rejected() {
        let result = FileDiscovery::new().with_skip_dirs(&strings(&["[invalid"]));

        assert!(matches!(result, Err(ComplianceError::Pattern { .. })));
    }

    #[test]
    fn test_closure_selector() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "keep_me.txt");
        touch(temp_dir.path(), "drop_me.txt");

        let scope = PathScope::new(temp_dir.path()).unwrap();
        let resolved = scope.resolve(&[], &[]);
        let selector = |path: &Path| path.to_string_lossy().contains("keep");
        let discovery = FileDiscovery::new().discover(&resolved, &selector);

        assert_eq!(relative_paths(&discovery, scope.root()), vec!["keep_me.txt"]);
    }
}
