//! Text normalization shared by the entry parser and the importer.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
    static ref BLANK_RUN: Regex = Regex::new(r"[ \t]+").unwrap();
}

/// Lowercases, trims and collapses whitespace.
///
/// With `preserve_german == false` umlauts are folded to ASCII (`ä -> a`,
/// `ß -> ss`) and any remaining combining diacritics are stripped.
pub fn normalize(text: &str, preserve_german: bool) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let lowered = trimmed.to_lowercase();
    let collapsed = WHITESPACE_RUN.replace_all(&lowered, " ");
    if preserve_german {
        return collapsed.into_owned();
    }
    let folded = collapsed
        .replace('ä', "a")
        .replace('ö', "o")
        .replace('ü', "u")
        .replace('ß', "ss");
    remove_diacritics(&folded)
}

/// Search key for English words (aggressive folding).
pub fn normalize_english(text: &str) -> String {
    normalize(text, false)
}

/// Search key for German words (umlauts and `ß` kept).
pub fn normalize_german(text: &str) -> String {
    normalize(text, true)
}

fn remove_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Drops control characters (except newline and tab) and collapses runs of
/// spaces/tabs. Newlines are kept since the entry parser works line by line.
pub fn clean_raw_entry(text: &str) -> String {
    let without_controls: String = text
        .trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();
    BLANK_RUN.replace_all(&without_controls, " ").into_owned()
}

/// Capitalized but not an all-caps acronym, the usual shape of a German noun.
pub fn is_noun_shaped(word: &str) -> bool {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_uppercase() {
        return false;
    }
    // "EU", "USA" and friends are not nouns by shape.
    word.chars().any(|c| c.is_lowercase())
}

/// Uppercases the first character, leaving the rest untouched.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Truncates to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_english_folds_umlauts_and_accents() {
        assert_eq!(normalize_english("  Über   Café "), "uber cafe");
        assert_eq!(normalize_english("Straße"), "strasse");
        assert_eq!(normalize_english("naïve"), "naive");
        assert_eq!(normalize_english("   "), "");
    }

    #[test]
    fn test_normalize_german_keeps_umlauts() {
        assert_eq!(normalize_german("Die  Straße"), "die straße");
        assert_eq!(normalize_german("ÄRGER"), "ärger");
    }

    #[test]
    fn test_clean_raw_entry() {
        let raw = "  Haus\u{0007}  <n>\t\tdas \n house  ";
        assert_eq!(clean_raw_entry(raw), "Haus <n> das \n house");
    }

    #[test]
    fn test_is_noun_shaped() {
        assert!(is_noun_shaped("Essen"));
        assert!(is_noun_shaped("Äpfel"));
        assert!(!is_noun_shaped("essen"));
        assert!(!is_noun_shaped("USA"));
        assert!(!is_noun_shaped(""));
    }

    #[test]
    fn test_capitalize_and_truncate() {
        assert_eq!(capitalize("übung"), "Übung");
        assert_eq!(capitalize(""), "");
        assert_eq!(truncate_chars("Größe", 3), "Grö");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }
}
