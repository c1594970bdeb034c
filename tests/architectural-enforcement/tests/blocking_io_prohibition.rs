//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async production code in the core and the TUI MUST NOT use
//! blocking I/O. Use `tokio::fs`, `tokio::net` and `reqwest` (async), not
//! `std::fs`, `std::net` or `reqwest::blocking`.
//! **Exceptions**: Non-async functions (such as log file setup) and tests.

use architectural_enforcement::{code_part, rust_sources, SourceFile, CORE_SRC, TUI_SRC};

/// Test that production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_production_code() {
    let violations: Vec<String> = [CORE_SRC, TUI_SRC]
        .into_iter()
        .flat_map(rust_sources)
        .flat_map(|file| check_file(&file))
        .collect();

    if !violations.is_empty() {
        eprintln!("\nBlocking I/O calls found in production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nRequired async I/O:");
        eprintln!("  - tokio::fs::read_to_string().await, tokio::fs::write().await");
        eprintln!("  - tokio::net::TcpStream::connect().await");
        eprintln!("  - reqwest::Client (async)");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.",
            violations.len()
        );
    }
}

fn check_file(file: &SourceFile) -> Vec<String> {
    let lines = file.lines();
    let path = file.display_path();
    let mut violations = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if is_in_test_function(&lines, idx) || is_in_non_async_function(&lines, idx) {
            continue;
        }

        let code = code_part(line);
        let kind = if code.contains("std::fs::") || code.contains("use std::fs") {
            Some("Blocking file I/O")
        } else if code.contains("std::net::") || code.contains("use std::net") {
            Some("Blocking network I/O")
        } else if code.contains("std::process::Command") {
            Some("Blocking process I/O")
        } else if code.contains("reqwest::blocking") {
            Some("Blocking HTTP client")
        } else if (code.contains("std::io::stdin()") || code.contains("std::io::stdout()"))
            && is_in_async_function(&lines, idx)
        {
            Some("Blocking stdin/stdout in async")
        } else {
            None
        };

        if let Some(kind) = kind {
            violations.push(format!("{}:{} - {}: {}", path, idx + 1, kind, line.trim()));
        }
    }
    violations
}

/// Check if line is inside a test function
fn is_in_test_function(lines: &[&str], current_idx: usize) -> bool {
    let mut found_fn_idx = None;
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if line.starts_with("fn ") || line.contains(" fn ") {
            found_fn_idx = Some(i);
            break;
        }

        // Stop at module boundaries
        if line.starts_with("mod ") || (line.starts_with("impl ") && line.contains('{')) {
            return false;
        }
    }

    let Some(fn_idx) = found_fn_idx else {
        return false;
    };
    for i in (0..fn_idx).rev() {
        let line = lines[i].trim();

        if line.starts_with("#[test]")
            || line.starts_with("#[tokio::test")
            || line.starts_with("#[cfg(test)]")
        {
            return true;
        }

        if line.starts_with("fn ") || line.starts_with("mod ") || line.starts_with("impl ") {
            break;
        }
    }
    false
}

/// Check if line is inside an async function
fn is_in_async_function(lines: &[&str], current_idx: usize) -> bool {
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if line.contains("async fn ") {
            return true;
        }
        if line.starts_with("fn ") {
            return false;
        }
        if line.starts_with("mod ") || (line.starts_with("impl ") && line.contains('{')) {
            return false;
        }
    }
    false
}

/// Check if line is inside a private non-async function
fn is_in_non_async_function(lines: &[&str], current_idx: usize) -> bool {
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if line.starts_with("fn ") && !line.contains("async") {
            return true;
        }
        if line.contains("async fn ") {
            return false;
        }
        if line.starts_with("mod ") || (line.starts_with("impl ") && line.contains('{')) {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_io_detection() {
        let code = vec![
            "async fn load(&self) {",
            "    let contents = std::fs::read_to_string(\"app.toml\")?;",
            "}",
        ];
        assert!(is_in_async_function(&code, 1));
        assert!(!is_in_non_async_function(&code, 1));
    }

    #[test]
    fn test_non_async_function_detection() {
        let code = vec![
            "fn init_logging() -> Option<PathBuf> {",
            "    std::fs::create_dir_all(&dir).ok()?;",
            "}",
        ];
        assert!(is_in_non_async_function(&code, 1));
    }

    #[test]
    fn test_test_function_detection() {
        let code = vec![
            "#[test]",
            "fn test_something() {",
            "    let contents = std::fs::read_to_string(\"test.txt\")?;",
            "}",
        ];
        assert!(is_in_test_function(&code, 2));
    }
}
