//! Architectural Enforcement Integration Tests
//!
//! Source scans that keep the face crates non-blocking:
//! - No `sleep()` calls in production code (wait on deadlines and events)
//! - No blocking I/O inside async functions
//!
//! The helpers here are shared by the test files under `tests/`.

use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: [&str; 2] = ["face/core/src", "face/daemon/src"];

/// Absolute path of the workspace root
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// Every `.rs` file under a production directory
#[must_use]
pub fn production_files(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Index of the first `#[cfg(test)]` line; everything from there on is test code
#[must_use]
pub fn test_module_start(lines: &[&str]) -> usize {
    lines
        .iter()
        .position(|line| line.trim_start().starts_with("#[cfg(test)]"))
        .unwrap_or(lines.len())
}

/// The part of a line before any `//` comment
#[must_use]
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_dirs_exist() {
        for dir in PRODUCTION_DIRS {
            assert!(
                !production_files(dir).is_empty(),
                "{dir} should contain Rust sources"
            );
        }
    }

    #[test]
    fn test_test_module_start() {
        let lines = ["fn real() {}", "", "#[cfg(test)]", "mod tests {}"];
        assert_eq!(test_module_start(&lines), 2);
        assert_eq!(test_module_start(&lines[..2]), 2);
    }

    #[test]
    fn test_code_part_strips_comments() {
        assert_eq!(code_part("let x = 1; // sleep(1)"), "let x = 1; ");
    }
}
