//! Filesystem indexing and language detection
//!
//! Walks project directories, filters out build and VCS noise, counts the
//! supported source extensions and picks each project's dominant language.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::types::Language;

/// Directory names that never contain student source worth parsing.
const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".idea",
    ".vscode",
    "target",
    "build",
    "out",
    "dist",
    "node_modules",
    "__pycache__",
    "venv",
    ".venv",
];

/// Glob set matching every excluded directory at any depth.
fn excluded_set() -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for dir in EXCLUDED_DIRS {
        // Both the directory itself and anything below it.
        for pattern in [format!("**/{dir}"), format!("**/{dir}/**")] {
            if let Ok(glob) = Glob::new(&pattern) {
                builder.add(glob);
            }
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}

/// The immediate subdirectories of a directory, sorted by name. Each one is
/// treated as a candidate project.
pub fn project_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let entries = std::fs::read_dir(root)
        .with_context(|| format!("could not list projects in {}", root.display()))?;
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// All source files of `language` under `root`, excluded directories
/// pruned, sorted for deterministic load order.
pub fn source_files(root: &Path, language: Language) -> Vec<PathBuf> {
    let excluded = excluded_set();
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && excluded.is_match(e.path())))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .map(|e| e == language.extension())
                .unwrap_or(false)
        })
        .filter(|p| {
            let name = p.file_name().map(|n| n.to_string_lossy().into_owned());
            name.map_or(false, |n| {
                !language.ignored_file_names().contains(&n.as_str())
            })
        })
        .collect();
    files.sort();
    files
}

/// Pick the dominant source language of a directory by counting supported
/// file extensions. Returns `None` when no supported files exist — such a
/// directory is recorded as skipped rather than compared.
pub fn detect_language(root: &Path) -> Option<Language> {
    let mut best: Option<(Language, usize)> = None;
    for language in Language::ALL {
        let count = source_files(root, language).len();
        if count == 0 {
            continue;
        }
        match best {
            Some((_, best_count)) if best_count >= count => {}
            _ => best = Some((language, count)),
        }
    }
    best.map(|(language, _)| language)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn test_source_files_filters_extension_and_noise() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("src/Main.java"));
        touch(&dir.path().join("src/util/Helper.java"));
        touch(&dir.path().join("src/module-info.java"));
        touch(&dir.path().join("README.md"));
        touch(&dir.path().join("target/Generated.java"));

        let files = source_files(dir.path(), Language::Java);
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Main.java", "Helper.java"]);
    }

    #[test]
    fn test_detect_language_picks_dominant() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.py"));
        touch(&dir.path().join("b.py"));
        touch(&dir.path().join("Legacy.java"));

        assert_eq!(detect_language(dir.path()), Some(Language::Python));
    }

    #[test]
    fn test_detect_language_none_without_sources() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("notes.txt"));

        assert_eq!(detect_language(dir.path()), None);
    }

    #[test]
    fn test_python_package_markers_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("pkg/__init__.py"));
        touch(&dir.path().join("pkg/logic.py"));

        let files = source_files(dir.path(), Language::Python);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("pkg/logic.py"));
    }

    #[test]
    fn test_project_dirs_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("beta")).unwrap();
        fs::create_dir(dir.path().join("alpha")).unwrap();
        touch(&dir.path().join("loose-file.txt"));

        let dirs = project_dirs(dir.path()).unwrap();
        let names: Vec<String> = dirs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }
}
