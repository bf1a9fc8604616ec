//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async code in the face crates MUST NOT use blocking I/O.
//! **Required**: Use `tokio::fs`, `tokio::io`, not `std::fs`, `std::net`, `std::process`
//! **Acceptable**: non-async functions that run before the runtime needs them
//! (configuration loading), and test code

use std::fs;
use std::path::Path;

use architectural_enforcement::{code_part, production_files, test_module_start, PRODUCTION_DIRS};

/// Test that production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_production_code() {
    let violations = find_blocking_io_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking I/O calls found in async code!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n❌ FORBIDDEN blocking I/O:");
        eprintln!("  - std::fs::read(), std::fs::write(), std::fs::File");
        eprintln!("  - std::net::TcpStream, std::net::TcpListener");
        eprintln!("  - std::process::Command::output()");
        eprintln!("  - std::io::stdin() / std::io::stdout() in async functions");
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::fs::read().await");
        eprintln!("  - tokio::io::stdin() with AsyncBufReadExt");
        eprintln!("  - tokio::task::spawn_blocking for CPU-bound decoding");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Find all blocking I/O calls in production code
fn find_blocking_io_violations() -> Vec<String> {
    let mut violations = Vec::new();
    for dir in PRODUCTION_DIRS {
        for file in production_files(dir) {
            check_file(&file, &mut violations);
        }
    }
    violations
}

fn check_file(path: &Path, violations: &mut Vec<String>) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };

    let lines: Vec<&str> = content.lines().collect();
    let tests_start = test_module_start(&lines);

    for (idx, line) in lines.iter().enumerate().take(tests_start) {
        let code = code_part(line);

        if is_in_non_async_function(&lines, idx) {
            continue;
        }

        if let Some(kind) = blocking_kind(code) {
            violations.push(format!(
                "{}:{} - {kind}: {}",
                path.display(),
                idx + 1,
                line.trim()
            ));
        }
    }
}

/// Classify a line of code as blocking I/O
fn blocking_kind(code: &str) -> Option<&'static str> {
    if code.contains("std::fs::") || code.contains("use std::fs") {
        Some("Blocking file I/O")
    } else if code.contains("std::net::") || code.contains("use std::net") {
        Some("Blocking network I/O")
    } else if code.contains("std::process::Command") {
        Some("Blocking process I/O")
    } else if code.contains("std::io::stdin()") || code.contains("std::io::stdout()") {
        Some("Blocking stdin/stdout")
    } else {
        None
    }
}

/// Check if line is inside a non-async function (acceptable for blocking I/O)
fn is_in_non_async_function(lines: &[&str], current_idx: usize) -> bool {
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if line.contains("async fn ") {
            return false;
        }

        if is_fn_signature(line) {
            return true;
        }

        if line.starts_with("mod ") || (line.starts_with("impl") && line.contains('{')) {
            return false;
        }
    }
    false
}

fn is_fn_signature(line: &str) -> bool {
    line.starts_with("fn ") || line.starts_with("pub fn ") || line.starts_with("pub(crate) fn ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_io_detection() {
        let code = [
            "async fn bad_function() {",
            "    let contents = std::fs::read_to_string(\"file.txt\")?;",
            "}",
        ];
        assert!(!is_in_non_async_function(&code, 1));
        assert_eq!(blocking_kind(code[1]), Some("Blocking file I/O"));
    }

    #[test]
    fn test_non_async_function_detection() {
        let code = [
            "fn load_with_env<F>(path: Option<PathBuf>, env: F) -> Result<FaceConfig, ConfigError>",
            "where",
            "    F: Fn(&str) -> Option<String>,",
            "{",
            "    let text = std::fs::read_to_string(path)?;",
            "}",
        ];
        assert!(is_in_non_async_function(&code, 4));
    }

    #[test]
    fn test_async_io_allowed() {
        assert_eq!(blocking_kind("tokio::fs::read(&path).await"), None);
        assert_eq!(blocking_kind("ScriptReader::new(tokio::io::stdin())"), None);
    }
}
