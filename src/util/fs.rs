//! Filesystem utilities.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use walkdir::WalkDir;

/// Outcome of [`write_if_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOutcome {
    Updated,
    Unchanged,
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write `contents` to `path` unless the file already holds exactly those bytes.
///
/// The new content goes to a temporary file in the destination directory
/// first and is then persisted over the target, so readers never observe a
/// half-written file.
pub fn write_if_changed(path: &Path, contents: &str) -> Result<WriteOutcome> {
    if let Ok(existing) = fs::read(path) {
        if existing == contents.as_bytes() {
            return Ok(WriteOutcome::Unchanged);
        }
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temporary file in {}", parent.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write file: {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("failed to write file: {}", path.display()))?;

    Ok(WriteOutcome::Updated)
}

/// Find files matching glob patterns relative to a base directory.
pub fn glob_files(base: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();

    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        for entry in
            glob(&pattern_str).with_context(|| format!("invalid glob pattern: {}", pattern))?
        {
            match entry {
                Ok(path) => {
                    if path.is_file() {
                        results.push(path);
                    }
                }
                Err(e) => {
                    tracing::warn!("glob error: {}", e);
                }
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}

/// Walk `root` and collect every file whose lowercased extension is in `extensions`.
///
/// Extensions carry their leading dot (`.cpp`). Results are sorted.
pub fn walk_files_with_extensions(root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!("skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| extensions.contains(&dotted_extension(p).as_str()))
        .collect();
    files.sort();
    files
}

/// Lowercased extension of `path` including the leading dot, or an empty string.
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Lexically normalize a path: drop `.` components and fold `..` where possible.
///
/// Unlike `canonicalize`, this never touches the filesystem, so it works
/// for files that are yet to be generated.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Render a path with forward slashes, the separator FASTBuild accepts everywhere.
pub fn to_slash(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    if s.is_empty() {
        ".".to_string()
    } else {
        s
    }
}

/// Relative path from `base` to `path`, slash-separated.
pub fn relative_slash(base: &Path, path: &Path) -> String {
    to_slash(&relative_path(base, path))
}

/// Whether `path` lies inside `root` (or equals it).
pub fn is_inside(path: &Path, root: &Path) -> bool {
    !relative_path(root, path).starts_with("..")
        && path.is_absolute() == root.is_absolute()
}

/// Whether `path` lies inside any of `roots`.
pub fn is_inside_any(path: &Path, roots: &[PathBuf]) -> bool {
    roots.iter().any(|root| is_inside(path, root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_glob_files() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("main.c"), "int main() {}").unwrap();
        fs::write(src.join("util.c"), "void util() {}").unwrap();
        fs::write(src.join("readme.txt"), "readme").unwrap();

        let files = glob_files(tmp.path(), &["src/**/*.c".to_string()]).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_walk_filters_by_extension() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src/nested");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.CPP"), "").unwrap();
        fs::write(src.join("b.h"), "").unwrap();
        fs::write(tmp.path().join("src/c.c"), "").unwrap();

        let files = walk_files_with_extensions(tmp.path(), &[".cpp", ".c"]);
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| !f.ends_with("b.h")));
    }

    #[test]
    fn test_write_if_changed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out/file.bff");

        assert_eq!(write_if_changed(&path, "a").unwrap(), WriteOutcome::Updated);
        assert_eq!(write_if_changed(&path, "a").unwrap(), WriteOutcome::Unchanged);
        assert_eq!(write_if_changed(&path, "b").unwrap(), WriteOutcome::Updated);
        assert_eq!(fs::read_to_string(&path).unwrap(), "b");
    }

    #[test]
    fn test_is_inside() {
        let root = Path::new("/work/proj/src");
        assert!(is_inside(Path::new("/work/proj/src/a.cpp"), root));
        assert!(is_inside(Path::new("/work/proj/src"), root));
        assert!(!is_inside(Path::new("/work/proj/other/a.cpp"), root));
        assert!(is_inside_any(
            Path::new("/work/ext/b.cpp"),
            &[root.to_path_buf(), PathBuf::from("/work/ext")]
        ));
    }

    #[test]
    fn test_normalize_and_slash() {
        let p = normalize_path(Path::new("/a/b/./c/../d.cpp"));
        assert_eq!(to_slash(&p), "/a/b/d.cpp");
        assert_eq!(relative_slash(Path::new("/a/b"), Path::new("/a/b/c/d.cpp")), "c/d.cpp");
        assert_eq!(relative_slash(Path::new("/a/b"), Path::new("/a/b")), ".");
    }
}
