//! Name extraction from introduction replies

use std::sync::LazyLock;

use regex::Regex;

/// Patterns tried in order; the last one takes the final word
static NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"i am (\w+)",
        r"my name is (\w+)",
        r"i'm (\w+)",
        r"it's (\w+)",
        r"(\w+)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Words that are never taken as a name
const NOT_NAMES: &[&str] = &["yes", "no", "the", "a", "an", "is", "am", "are"];

/// Pull a capitalized first name out of a reply like "I'm sam"
///
/// Returns `None` when every candidate is a filler word or the wake word.
#[must_use]
pub fn extract_name(text: &str, wake_word: &str) -> Option<String> {
    let text = text.to_lowercase();
    let text = text.trim();
    let wake_word = wake_word.to_lowercase();

    NAME_PATTERNS
        .iter()
        .filter_map(|pattern| pattern.captures(text)?.get(1))
        .map(|m| m.as_str())
        .find(|candidate| !NOT_NAMES.contains(candidate) && *candidate != wake_word)
        .map(capitalize)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_introduction_phrases() {
        assert_eq!(extract_name("I am Sam", "gaia").as_deref(), Some("Sam"));
        assert_eq!(extract_name("my name is alex", "gaia").as_deref(), Some("Alex"));
        assert_eq!(extract_name("I'm jo.", "gaia").as_deref(), Some("Jo"));
        assert_eq!(extract_name("it's Priya", "gaia").as_deref(), Some("Priya"));
    }

    #[test]
    fn test_bare_name() {
        assert_eq!(extract_name("  Morgan ", "gaia").as_deref(), Some("Morgan"));
    }

    #[test]
    fn test_stopwords_rejected() {
        assert_eq!(extract_name("yes", "gaia"), None);
        assert_eq!(extract_name("hello gaia", "gaia"), None);
        assert_eq!(extract_name("", "gaia"), None);
    }

    #[test]
    fn test_later_pattern_used_when_first_is_filler() {
        // "i am the" is rejected, the final word still wins
        assert_eq!(extract_name("i am the robin", "gaia").as_deref(), Some("Robin"));
    }
}
