//! Text normalization helpers

use regex::Regex;
use std::sync::LazyLock;

static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\w+").expect("hashtag pattern is valid"));

/// Trims surrounding whitespace from rendered text
///
/// Character references are already decoded by the HTML parser, so text is
/// never decoded again here: a post that reads `&lt;b&gt;` keeps it.
pub fn normalize_text(text: &str) -> String {
    text.trim().to_string()
}

/// Normalizes post body text
///
/// Every line is trimmed and runs of line breaks (`\n`, `\r\n`, `\r`)
/// collapse to a single `\n`.
pub fn normalize_body(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extracts hashtags from body text in order of appearance
///
/// Case is preserved and repeats are kept.
///
/// # Example
///
/// ```
/// use timeline_trawler::extract::extract_hashtags;
///
/// assert_eq!(extract_hashtags("#Rust and #rust, #Rust"), vec!["#Rust", "#rust", "#Rust"]);
/// ```
pub fn extract_hashtags(text: &str) -> Vec<String> {
    HASHTAG
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Normalizes a rendered handle: trims, strips a leading `@`
///
/// Returns `None` for blank input or text that cannot be a handle.
pub fn normalize_handle(text: &str) -> Option<String> {
    let handle = normalize_text(text);
    let handle = handle.strip_prefix('@').unwrap_or(&handle).trim();

    if handle.is_empty() || handle.chars().any(char::is_whitespace) {
        return None;
    }
    Some(handle.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_body() {
        assert_eq!(normalize_body("  hello \r\n\r\n\r\n world  "), "hello\nworld");
        assert_eq!(normalize_body("one\rtwo\n\nthree"), "one\ntwo\nthree");
        assert_eq!(normalize_body("\n\n"), "");
        assert_eq!(normalize_body("write &lt;b&gt; and AT&amp;T"), "write &lt;b&gt; and AT&amp;T");
    }

    #[test]
    fn test_extract_hashtags() {
        assert_eq!(
            extract_hashtags("Go #Rust!\n#async_await #Rust"),
            vec!["#Rust", "#async_await", "#Rust"]
        );
        assert_eq!(extract_hashtags("#Çay time"), vec!["#Çay"]);
        assert!(extract_hashtags("no tags # here").is_empty());
    }

    #[test]
    fn test_normalize_handle() {
        assert_eq!(normalize_handle(" @alice "), Some("alice".to_string()));
        assert_eq!(normalize_handle("Bob_2"), Some("Bob_2".to_string()));
        assert_eq!(normalize_handle("@"), None);
        assert_eq!(normalize_handle(""), None);
        assert_eq!(normalize_handle("two words"), None);
    }
}
