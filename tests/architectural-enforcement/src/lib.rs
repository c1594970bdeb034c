//! Source scanning helpers for the architecture guards in `tests/`
//!
//! The guards read production sources line by line; these helpers locate the
//! workspace crates and walk their `.rs` files.

use std::path::{Path, PathBuf};

/// Production source roots, relative to the workspace root
pub const CORE_SRC: &str = "agent/core/src";
/// Terminal surface sources, relative to the workspace root
pub const TUI_SRC: &str = "tui/src";

/// Workspace root (two levels above this crate)
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// A production source file, split into lines
pub struct SourceFile {
    /// Path as found on disk
    pub path: PathBuf,
    /// File contents
    pub content: String,
}

impl SourceFile {
    /// Lines of the file
    pub fn lines(&self) -> Vec<&str> {
        self.content.lines().collect()
    }

    /// Path relative to the workspace root, with `/` separators
    pub fn display_path(&self) -> String {
        let root = workspace_root();
        self.path
            .strip_prefix(&root)
            .unwrap_or(&self.path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// Every `.rs` file under `dir` (relative to the workspace root)
///
/// A missing directory yields nothing.
pub fn rust_sources(dir: &str) -> Vec<SourceFile> {
    let root = workspace_root().join(dir);
    if !root.exists() {
        return Vec::new();
    }

    walkdir::WalkDir::new(&root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .filter_map(|e| {
            let content = std::fs::read_to_string(e.path()).ok()?;
            Some(SourceFile {
                path: e.path().to_path_buf(),
                content,
            })
        })
        .collect()
}

/// Code before any `//` comment
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_workspace_sources() {
        let core = rust_sources(CORE_SRC);
        assert!(core.iter().any(|f| f.display_path().ends_with("session.rs")));

        let tui = rust_sources(TUI_SRC);
        assert!(tui.iter().any(|f| f.display_path() == "tui/src/app.rs"));
    }

    #[test]
    fn test_code_part_strips_comments() {
        assert_eq!(code_part("let x = 1; // sleep(1)"), "let x = 1; ");
        assert_eq!(code_part("/// docs"), "");
    }
}
