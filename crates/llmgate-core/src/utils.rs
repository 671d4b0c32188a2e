//! Small helpers: data and scratch paths, timestamps, log-safe strings.

use std::path::PathBuf;

/// `~/.llmgate`, or `./.llmgate` when no home directory is known.
pub fn get_data_path() -> PathBuf {
    home_or_cwd().join(".llmgate")
}

/// Default attachment scratch directory, `<tmp>/llmgate`.
pub fn get_default_scratch_path() -> PathBuf {
    std::env::temp_dir().join("llmgate")
}

/// Current UTC time as RFC 3339.
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Cut `s` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some(_) => {
            let keep = max_chars.saturating_sub(3);
            let end = s.char_indices().nth(keep).map_or(s.len(), |(i, _)| i);
            format!("{}...", &s[..end])
        }
    }
}

/// Map a client-supplied name onto a single safe path component.
///
/// Anything outside `[A-Za-z0-9._-]` (and non-ASCII alphanumerics) becomes
/// `_`; names made only of dots are neutralised.
pub fn safe_filename(name: &str) -> String {
    let keep = |c: char| c.is_alphanumeric() || matches!(c, '-' | '_' | '.');
    let cleaned: String = name.chars().map(|c| if keep(c) { c } else { '_' }).collect();

    if cleaned.chars().all(|c| c == '.') {
        "_".repeat(cleaned.len().max(1))
    } else {
        cleaned
    }
}

/// Expand a leading `~` (alone or as `~/...`).
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some("") => home_or_cwd(),
        Some(rest) if rest.starts_with('/') => home_or_cwd().join(&rest[1..]),
        _ => PathBuf::from(path),
    }
}

fn home_or_cwd() -> PathBuf {
    ["HOME", "USERPROFILE"]
        .iter()
        .find_map(|var| std::env::var_os(var))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_input() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("exact", 5), "exact");
    }

    #[test]
    fn truncate_marks_cut() {
        let cut = truncate_string("{\"model\": \"echo-backend\", \"messages\": []}", 12);
        assert_eq!(cut, "{\"model\":...");
        assert_eq!(cut.chars().count(), 12);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_string("日本語のテキストです", 6), "日本語...");
    }

    #[test]
    fn safe_filename_cases() {
        assert_eq!(safe_filename("1093847.png"), "1093847.png");
        assert_eq!(safe_filename("my report (v2).pdf"), "my_report__v2_.pdf");
        assert_eq!(safe_filename("../secret"), ".._secret");
        assert_eq!(safe_filename(".."), "__");
        assert_eq!(safe_filename("."), "_");
        assert_eq!(safe_filename(""), "_");
    }

    #[test]
    fn expand_home_variants() {
        assert!(!expand_home("~/scratch").starts_with("~"));
        assert!(expand_home("~/scratch").ends_with("scratch"));
        assert!(!expand_home("~").to_string_lossy().contains('~'));
        assert_eq!(expand_home("/tmp/llmgate"), PathBuf::from("/tmp/llmgate"));
        assert_eq!(expand_home("~other/x"), PathBuf::from("~other/x"));
    }

    #[test]
    fn timestamp_parses() {
        assert!(chrono::DateTime::parse_from_rfc3339(&timestamp()).is_ok());
    }

    #[test]
    fn paths() {
        assert!(get_data_path().ends_with(".llmgate"));
        assert!(get_default_scratch_path().starts_with(std::env::temp_dir()));
    }
}
