//! String utility functions

/// Truncate text to max length (in characters) with ellipsis
pub fn truncate_chars(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        format!("{}...", text.chars().take(max_len).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Final segment of a `/`-separated path.
///
/// Returns the input unchanged when it contains no separator.
pub fn path_tail(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_short() {
        assert_eq!(truncate_chars("hello", 50), "hello");
    }

    #[test]
    fn test_truncate_chars_exact() {
        let text = "a".repeat(50);
        assert_eq!(truncate_chars(&text, 50), text);
    }

    #[test]
    fn test_truncate_chars_long() {
        let text = "a".repeat(60);
        let truncated = truncate_chars(&text, 50);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 53);
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        let text = "é".repeat(60);
        let truncated = truncate_chars(&text, 50);
        assert_eq!(truncated.chars().count(), 53);
    }

    #[test]
    fn test_path_tail() {
        assert_eq!(path_tail("/a/b/config.ts"), "config.ts");
        assert_eq!(path_tail("relative/file.rs"), "file.rs");
        assert_eq!(path_tail("no-separator"), "no-separator");
        assert_eq!(path_tail("/trailing/"), "");
    }
}
