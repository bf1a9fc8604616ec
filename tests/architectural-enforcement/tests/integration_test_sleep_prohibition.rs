//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the face crates MUST NOT call sleep methods.
//! Timers wait on deadlines (`sleep_until`) owned by the scheduler, and
//! everything else waits on events.
//! **Exceptions**: test code (`#[cfg(test)]` modules and test functions)

use std::fs;
use std::path::Path;

use architectural_enforcement::{code_part, production_files, test_module_start, PRODUCTION_DIRS};

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_sleep_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n✅ ACCEPTABLE:");
        eprintln!("  - tokio::time::sleep_until on a deadline the scheduler owns");
        eprintln!("  - tokio::time::timeout around external I/O");
        eprintln!("  - Test code (#[cfg(test)] modules, #[test] / #[tokio::test] functions)");
        eprintln!("\n❌ FORBIDDEN:");
        eprintln!("  - Sleep in polling loops");
        eprintln!("  - Sleep as poor man's synchronization");
        eprintln!("  - Sleep to 'wait' for a fetch or a redraw");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Find all sleep() calls in production code
fn find_sleep_violations() -> Vec<String> {
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
        if is_sleep_call(code_part(line)) && !is_in_test_function(&lines, idx) {
            violations.push(format!("{}:{} - {}", path.display(), idx + 1, line.trim()));
        }
    }
}

fn is_sleep_call(code: &str) -> bool {
    code.contains("::sleep(") || code.contains(".sleep(")
}

/// Check if line is inside a test function
fn is_in_test_function(lines: &[&str], current_idx: usize) -> bool {
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if line.starts_with("fn ") && !line.contains("test") {
            return false;
        }

        if line.starts_with("#[test]") || line.starts_with("#[tokio::test") {
            return true;
        }

        if line.starts_with("mod ") || line.starts_with("impl ") {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_violation_detection() {
        assert!(is_sleep_call("    tokio::time::sleep(Duration::from_millis(10)).await;"));
        assert!(is_sleep_call("    std::thread::sleep(d);"));
        assert!(!is_sleep_call("    tokio::time::sleep_until(deadline).await;"));

        let code = [
            "fn bad_function() {",
            "    tokio::time::sleep(Duration::from_millis(10)).await;",
            "}",
        ];
        assert!(!is_in_test_function(&code, 1));
    }

    #[test]
    fn test_test_function_detection() {
        let code = [
            "#[tokio::test(start_paused = true)]",
            "async fn test_ticks() {",
            "    tokio::time::sleep(Duration::from_secs(1)).await;",
            "}",
        ];
        assert!(is_in_test_function(&code, 2));
    }
}
