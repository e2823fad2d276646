use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use directories::BaseDirs;
use globset::GlobBuilder;
use regex::Regex;
use walkdir::WalkDir;

use crate::errors::{Result, UserFacingError};

/// Expands the configured globs into the deduplicated, sorted set of files to index.
///
/// `~` at the start of a pattern expands to the home directory. A glob matching no files is not an error; walk errors
/// (e.g. permission denied) are logged and skipped. Files matching `exclude` are dropped after expansion. The returned
/// paths are sorted lexicographically so indexing runs are reproducible.
pub fn collect_files(globs: &[String], exclude: Option<&Regex>) -> Result<Vec<PathBuf>> {
    let mut files: BTreeSet<PathBuf> = BTreeSet::new();

    for pattern in globs {
        let pattern = expand_home(pattern);
        tracing::debug!("Searching for files matching: {pattern}");

        let before = files.len();
        if let Some(base) = literal_base(&pattern) {
            // Patterns with glob metacharacters walk their literal base directory.
            // `*` must not cross directory separators, matching what a shell would expand.
            let matcher = GlobBuilder::new(&pattern)
                .literal_separator(true)
                .build()
                .map_err(|err| UserFacingError::ConfigInvalidGlob {
                    glob: pattern.clone(),
                    error: err.to_string(),
                })?
                .compile_matcher();
            for entry in WalkDir::new(base) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        tracing::warn!("Skipping unreadable path: {err}");
                        continue;
                    }
                };
                if entry.file_type().is_file() && matcher.is_match(entry.path()) {
                    files.insert(entry.path().to_path_buf());
                }
            }
        } else {
            // A pattern without metacharacters is a plain file path
            let path = PathBuf::from(&pattern);
            if path.is_file() {
                files.insert(path);
            }
        }
        if files.len() == before {
            tracing::debug!("Glob found no files: {pattern}");
        }
    }

    if let Some(exclude) = exclude {
        files.retain(|path| {
            let keep = !exclude.is_match(&path.to_string_lossy());
            if !keep {
                tracing::trace!("Excluding file: {}", path.display());
            }
            keep
        });
    }

    Ok(files.into_iter().collect())
}

/// Replaces a leading `~` with the user's home directory
fn expand_home(pattern: &str) -> String {
    if let Some(rest) = pattern.strip_prefix("~/")
        && let Some(dirs) = BaseDirs::new()
    {
        return dirs.home_dir().join(rest).to_string_lossy().into_owned();
    }
    pattern.to_string()
}

/// The directory to walk for a pattern with glob metacharacters: everything up to the first component containing one.
///
/// Returns `None` when the pattern has no metacharacters at all, in which case it's a plain path.
fn literal_base(pattern: &str) -> Option<PathBuf> {
    fn has_meta(component: &str) -> bool {
        component.contains(['*', '?', '[', '{'])
    }

    if !has_meta(pattern) {
        return None;
    }
    let path = Path::new(pattern);
    let mut base = PathBuf::new();
    for component in path.components() {
        if has_meta(&component.as_os_str().to_string_lossy()) {
            break;
        }
        base.push(component);
    }
    if base.as_os_str().is_empty() {
        base.push(".");
    }
    Some(base)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("aliases.sh"), "alias ll='ls -la'\n").unwrap();
        fs::write(dir.path().join("functions.sh"), "greet() {\n  echo hi\n}\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a shell file\n").unwrap();
        fs::write(dir.path().join("nested/extra.sh"), "alias x='y'\n").unwrap();
        dir
    }

    #[test]
    fn test_collect_files_glob() {
        let dir = setup();
        let glob = format!("{}/**/*.sh", dir.path().display());
        let files = collect_files(&[glob], None).unwrap();

        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["aliases.sh", "functions.sh", "nested/extra.sh"]);
    }

    #[test]
    fn test_collect_files_plain_path() {
        let dir = setup();
        let path = dir.path().join("aliases.sh");
        let files = collect_files(&[path.display().to_string()], None).unwrap();
        assert_eq!(files, vec![path]);
    }

    #[test]
    fn test_collect_files_deduplicates() {
        let dir = setup();
        let glob = format!("{}/*.sh", dir.path().display());
        let plain = dir.path().join("aliases.sh").display().to_string();
        let files = collect_files(&[glob, plain], None).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_collect_files_exclude_regex() {
        let dir = setup();
        let glob = format!("{}/**/*.sh", dir.path().display());
        let exclude = Regex::new("nested").unwrap();
        let files = collect_files(&[glob], Some(&exclude)).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| !p.to_string_lossy().contains("nested")));
    }

    #[test]
    fn test_collect_files_no_matches_is_not_an_error() {
        let dir = setup();
        let glob = format!("{}/**/*.zsh", dir.path().display());
        let files = collect_files(&[glob], None).unwrap();
        assert_eq!(files, Vec::<PathBuf>::new());
    }

    #[test]
    fn test_collect_files_invalid_glob() {
        let err = collect_files(&[String::from("/tmp/[")], None).unwrap_err();
        assert!(matches!(
            err,
            crate::errors::AppError::UserFacing(UserFacingError::ConfigInvalidGlob { .. })
        ));
    }

    #[test]
    fn test_literal_base() {
        assert_eq!(literal_base("/home/user/**/*.sh"), Some(PathBuf::from("/home/user")));
        assert_eq!(literal_base("/home/user/.bashrc"), None);
        assert_eq!(literal_base("*.sh"), Some(PathBuf::from(".")));
    }
}
