//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the core and the TUI MUST NOT call sleep.
//! Session timing uses `tokio::time::timeout` and cancellation tokens.
//! **Exceptions**: Frame rate limiting in `tui/src/app.rs`, interval ticks.

use architectural_enforcement::{code_part, rust_sources, SourceFile, CORE_SRC, TUI_SRC};

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_sleep_violations();

    if !violations.is_empty() {
        eprintln!("\nSleep calls found in production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nAcceptable sleep uses:");
        eprintln!("  - Frame rate limiting in the TUI render loop");
        eprintln!("  - Periodic tasks using tokio::time::interval()");
        eprintln!("\nUse tokio::time::timeout, a Notify or a CancellationToken instead.");

        panic!(
            "\nFound {} sleep violation(s) in production code.",
            violations.len()
        );
    }
}

fn find_sleep_violations() -> Vec<String> {
    let mut violations = Vec::new();

    for file in rust_sources(TUI_SRC) {
        check_file(&file, &mut violations, &SleepPolicy { allow_frame_limiting: true });
    }

    // Tests in the core use paused time, so no exception there either
    for file in rust_sources(CORE_SRC) {
        check_file(&file, &mut violations, &SleepPolicy { allow_frame_limiting: false });
    }

    violations
}

struct SleepPolicy {
    allow_frame_limiting: bool,
}

fn check_file(file: &SourceFile, violations: &mut Vec<String>, policy: &SleepPolicy) {
    let lines = file.lines();
    let path = file.display_path();

    for (idx, line) in lines.iter().enumerate() {
        let code = code_part(line);
        if !code.contains("::sleep(") && !code.contains(".sleep(") {
            continue;
        }

        if policy.allow_frame_limiting
            && path == "tui/src/app.rs"
            && is_frame_limiting_context(&lines, idx)
        {
            continue;
        }

        if is_interval_pattern(&lines, idx) {
            continue;
        }

        violations.push(format!("{}:{} - {}", path, idx + 1, line.trim()));
    }
}

/// Check if sleep is used for frame rate limiting
fn is_frame_limiting_context(lines: &[&str], current_idx: usize) -> bool {
    let context_range = current_idx.saturating_sub(10)..std::cmp::min(current_idx + 5, lines.len());

    lines[context_range].iter().any(|line| {
        let line = line.to_lowercase();
        line.contains("frame") || line.contains("fps") || line.contains("tick_rate")
    })
}

/// Check if this is the tokio::time::interval pattern
fn is_interval_pattern(lines: &[&str], current_idx: usize) -> bool {
    let back = current_idx.saturating_sub(20)..current_idx;
    if lines[back]
        .iter()
        .any(|l| l.contains("interval.tick()") || l.contains("tokio::time::interval"))
    {
        return true;
    }

    let forward = current_idx..std::cmp::min(current_idx + 5, lines.len());
    lines[forward].iter().any(|l| l.contains("interval.tick()"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_limiting_detection() {
        let code = vec![
            "async fn run(&mut self) {",
            "    let frame_duration = Duration::from_millis(50);",
            "    loop {",
            "        self.render();",
            "        tokio::time::sleep(frame_duration).await;",
            "    }",
            "}",
        ];
        assert!(is_frame_limiting_context(&code, 4));
    }

    #[test]
    fn test_plain_sleep_is_not_frame_limiting() {
        let code = vec![
            "async fn wait_for_agent(&self) {",
            "    tokio::time::sleep(Duration::from_secs(20)).await;",
            "}",
        ];
        assert!(!is_frame_limiting_context(&code, 1));
        assert!(!is_interval_pattern(&code, 1));
    }

    #[test]
    fn test_interval_detection() {
        let code = vec![
            "let mut interval = tokio::time::interval(period);",
            "loop {",
            "    interval.tick().await;",
            "    std::thread::sleep(d);",
            "}",
        ];
        assert!(is_interval_pattern(&code, 3));
    }
}
