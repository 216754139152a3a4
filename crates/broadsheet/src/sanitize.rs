//! Helpers for sanitizing data before it enters storage keys or tracing
//! span attributes.
//!
//! Uploaded filenames are attacker-controlled: they must never steer an
//! object key outside its namespace, and full local paths must not leak
//! into spans.

use std::path::Path;

/// Clamps a suggested object name to `[A-Za-z0-9.-]`.
///
/// Every other character (path separators, spaces, control bytes, unicode)
/// becomes `_`, which rules out traversal sequences and key injection while
/// keeping the name recognizable. Empty input maps to `"file"`.
pub fn sanitize_object_name(name: &str) -> String {
    if name.is_empty() {
        return "file".to_string();
    }

    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields: reveals the file name without exposing the full
/// local path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_allowed_charset() {
        assert_eq!(
            sanitize_object_name("Issue-2025.06.01.pdf"),
            "Issue-2025.06.01.pdf"
        );
    }

    #[test]
    fn test_sanitize_replaces_spaces_and_separators() {
        assert_eq!(
            sanitize_object_name("my issue/june 01.pdf"),
            "my_issue_june_01.pdf"
        );
        assert_eq!(
            sanitize_object_name("..\\..\\etc\\passwd"),
            ".._.._etc_passwd"
        );
    }

    #[test]
    fn test_sanitize_traversal_cannot_escape() {
        // Dots survive but separators do not, so "../" never reassembles.
        let sanitized = sanitize_object_name("../../secret.pdf");
        assert!(!sanitized.contains('/'));
        assert_eq!(sanitized, ".._.._secret.pdf");
    }

    #[test]
    fn test_sanitize_unicode_and_controls() {
        assert_eq!(sanitize_object_name("täge\n01.pdf"), "t_ge_01.pdf");
    }

    #[test]
    fn test_sanitize_empty_name() {
        assert_eq!(sanitize_object_name(""), "file");
    }

    #[test]
    fn test_redact_path_returns_filename() {
        assert_eq!(
            redact_path(Path::new("/var/scratch/job-1/issue.pdf")),
            "issue.pdf"
        );
    }

    #[test]
    fn test_redact_path_no_filename() {
        assert_eq!(redact_path(Path::new("/")), "<unknown>");
    }
}
