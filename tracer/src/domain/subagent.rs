//! Sub-agent session title parsing.
//!
//! Hosts label spawned sub-agent sessions with a title of the form
//! `"<description> (@<agent> subagent)"`. The trace shows the agent first,
//! so the title is rewritten to `"<agent>: <description>"`. Titles that do
//! not match the grammar are kept verbatim.

use std::sync::LazyLock;

use regex::Regex;

static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<description>.+) \(@(?P<agent>[^)\s]+) subagent\)$")
        .expect("hard-coded pattern compiles")
});

/// Human-readable display title for a sub-agent session.
pub fn display_title(title: &str) -> String {
    match TITLE_PATTERN.captures(title) {
        Some(caps) => format!("{}: {}", &caps["agent"], &caps["description"]),
        None => title.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_title_is_rewritten() {
        assert_eq!(
            display_title("Research the answer (@general subagent)"),
            "general: Research the answer"
        );
    }

    #[test]
    fn test_description_may_contain_parentheses() {
        assert_eq!(
            display_title("Fix build (again) (@builder subagent)"),
            "builder: Fix build (again)"
        );
    }

    #[test]
    fn test_unmatched_title_is_kept() {
        assert_eq!(display_title("just a session"), "just a session");
        assert_eq!(display_title("(@x subagent)"), "(@x subagent)");
    }

    #[test]
    fn test_empty_title_is_kept() {
        assert_eq!(display_title(""), "");
    }
}
