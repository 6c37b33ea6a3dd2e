//! Extraction of structured data from raw dictd entry text.
//!
//! FreeDict entries are loosely formatted: a headword line with optional IPA
//! and `<pos, gender>` markup, followed by translation lines. Every step here
//! degrades to an empty result on odd input; nothing in this module fails.

use crate::index::METADATA_SENTINEL;
use crate::models::{Example, Gender, ParsedEntry, Translation, WordType};
use crate::normalize::clean_raw_entry;
use lazy_static::lazy_static;
use log::trace;
use regex::Regex;
use std::collections::HashSet;

pub const MAX_TRANSLATIONS: usize = 10;
pub const MAX_EXAMPLES: usize = 5;
pub const MAX_DOMAIN_LABELS: usize = 3;
const MAX_DOMAIN_LABEL_CHARS: usize = 20;
const MIN_TRANSLATION_CHARS: usize = 2;
const MAX_TRANSLATION_CHARS: usize = 100;
const MIN_MARKED_EXAMPLE_CHARS: usize = 10;
const MIN_PARENTHETICAL_CHARS: usize = 10;
const MAX_PARENTHETICAL_CHARS: usize = 200;
const MIN_PARENTHETICAL_WORDS: usize = 3;

const EXAMPLE_MARKERS: &[&str] = &[
    "e.g.",
    "ex.",
    "example:",
    "ex:",
    "beispiel:",
    "z.b.",
    "zum beispiel:",
];

const METADATA_MARKERS: &[&str] = &["see:", "synonym:", "antonym:", "compare:", "cf.", "also:"];

lazy_static! {
    static ref MARKUP_TAG: Regex = Regex::new(r"<([^>]*)>").unwrap();
    static ref BRACKET_LABEL: Regex = Regex::new(r"\[([^\]]*)\]").unwrap();
    static ref BRACE_GROUP: Regex = Regex::new(r"\{([^}]*)\}").unwrap();
    static ref PARENTHESES: Regex = Regex::new(r"\(([^)]*)\)").unwrap();
    static ref IPA: Regex = Regex::new(r"/\s*([^/\n]+?)\s*/").unwrap();
    static ref QUOTED_EXAMPLE: Regex =
        Regex::new(r#""([^"\n]+)"\s*[-–—]\s*([^"\n]+)"#).unwrap();
    static ref LEADING_ARTICLE: Regex =
        Regex::new(r"(?i)^(der|die|das|ein|eine|the|a|an)\s+").unwrap();
    static ref GENDER_ARTICLE: Regex = Regex::new(r"(?i)^(der|die|das)\s+\S").unwrap();
    static ref ENUMERATION: Regex = Regex::new(r"^\d+[.)]\s*").unwrap();
    static ref NOTE: Regex = Regex::new(r"(?i)note:.*").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref TAG_TOKEN_SEPARATOR: Regex = Regex::new(r"[,\s]+").unwrap();
}

/// Parses one entry. Never fails; missing pieces come back empty.
pub fn parse(headword: &str, raw_text: &str) -> ParsedEntry {
    let cleaned = clean_raw_entry(raw_text);

    let pronunciation_ipa = extract_pronunciation(&cleaned);
    let part_of_speech_tags = extract_part_of_speech_tags(&cleaned);
    let domain_labels = extract_domain_labels(&cleaned);
    let examples = extract_examples(&cleaned);
    let translations = extract_translations(&cleaned, headword, &domain_labels);

    trace!(
        "Parsed '{}': {} translations, {} examples, tags {:?}",
        headword,
        translations.len(),
        examples.len(),
        part_of_speech_tags
    );

    ParsedEntry {
        headword: headword.to_string(),
        translations,
        examples,
        pronunciation_ipa,
        part_of_speech_tags,
        domain_labels,
        raw_text: cleaned,
    }
}

fn headword_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|l| !l.is_empty())
}

/// Byte range and content of the pronunciation on a headword line.
///
/// Only a `/…/` group holding at least one non-ASCII character counts, so
/// plain alternatives like `Haus/Heim/Bau` stay translations.
fn pronunciation_span(line: &str) -> Option<(std::ops::Range<usize>, &str)> {
    IPA.captures_iter(line).find_map(|caps| {
        let whole = caps.get(0)?;
        let content = caps.get(1)?.as_str().trim();
        (!content.is_empty() && !content.is_ascii()).then(|| (whole.range(), content))
    })
}

/// Pronunciation written on the first non-empty line.
pub fn extract_pronunciation(text: &str) -> Option<String> {
    headword_line(text)
        .and_then(pronunciation_span)
        .map(|(_, ipa)| ipa.to_string())
}

fn tag_tokens(content: &str) -> impl Iterator<Item = &str> {
    TAG_TOKEN_SEPARATOR
        .split(content)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Word types named by `<…>` markup, in order of first appearance.
///
/// Tags may carry several comma-separated tokens (`<n, fem, sg>`); tokens
/// outside the word type vocabulary are ignored. `n` means noun here, never
/// neuter.
pub fn extract_part_of_speech_tags(text: &str) -> Vec<WordType> {
    let mut tags = Vec::new();
    for caps in MARKUP_TAG.captures_iter(text) {
        for token in tag_tokens(&caps[1]) {
            if let Ok(word_type) = token.parse::<WordType>() {
                if !tags.contains(&word_type) {
                    tags.push(word_type);
                }
            }
        }
    }
    tags
}

fn clean_label(label: &str) -> &str {
    let label = label.trim();
    label.strip_suffix('.').unwrap_or(label).trim()
}

/// `[label]` markup, trailing period removed, short labels only.
pub fn extract_domain_labels(text: &str) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for caps in BRACKET_LABEL.captures_iter(text) {
        let label = clean_label(&caps[1]);
        if label.is_empty() || label.chars().count() > MAX_DOMAIN_LABEL_CHARS {
            continue;
        }
        if !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
        if labels.len() == MAX_DOMAIN_LABELS {
            break;
        }
    }
    labels
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

fn clean_example_text(text: &str) -> String {
    let without_tags = MARKUP_TAG.replace_all(text, "");
    let without_labels = BRACKET_LABEL.replace_all(&without_tags, "");
    let without_notes = NOTE.replace_all(&without_labels, "");
    let trimmed = without_notes.trim_matches(|c: char| {
        matches!(c, ',' | ';' | ':' | '-' | '–' | '—') || c.is_whitespace()
    });
    collapse_whitespace(trimmed)
}

/// The text after a leading example marker, if the line has one.
fn strip_example_marker(line: &str) -> Option<&str> {
    let lower = line.to_lowercase();
    EXAMPLE_MARKERS
        .iter()
        .find(|marker| lower.starts_with(*marker))
        .and_then(|marker| line.get(marker.len()..))
}

fn is_metadata_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains(METADATA_SENTINEL) || METADATA_MARKERS.iter().any(|m| lower.contains(m))
}

/// Cross-references and database metadata, not translations.
pub fn is_metadata_line(line: &str) -> bool {
    let lower = line.trim().to_lowercase();
    lower.contains(METADATA_SENTINEL) || METADATA_MARKERS.iter().any(|m| lower.starts_with(m))
}

fn is_example_line(line: &str) -> bool {
    strip_example_marker(line).is_some() || QUOTED_EXAMPLE.is_match(line)
}

/// Example sentences: marker-prefixed lines, `"source" - target` pairs and
/// sentence-like parentheticals. Deduplicated on the source text.
pub fn extract_examples(text: &str) -> Vec<Example> {
    let mut candidates = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(rest) = strip_example_marker(line) {
            let example = clean_example_text(rest);
            if example.chars().count() > MIN_MARKED_EXAMPLE_CHARS {
                candidates.push(Example {
                    source_text: example,
                    target_text: None,
                });
            }
        }
    }

    for caps in QUOTED_EXAMPLE.captures_iter(text) {
        let source = collapse_whitespace(&caps[1]);
        let target = clean_example_text(&caps[2]);
        if !source.is_empty() && !target.is_empty() {
            candidates.push(Example {
                source_text: source,
                target_text: Some(target),
            });
        }
    }

    for caps in PARENTHESES.captures_iter(text) {
        let content = caps[1].trim();
        let chars = content.chars().count();
        if content.split_whitespace().count() < MIN_PARENTHETICAL_WORDS
            || !(MIN_PARENTHETICAL_CHARS..=MAX_PARENTHETICAL_CHARS).contains(&chars)
        {
            continue;
        }
        let example = clean_example_text(content);
        if !example.is_empty() && !is_metadata_text(&example) {
            candidates.push(Example {
                source_text: example,
                target_text: None,
            });
        }
    }

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|ex| seen.insert(ex.source_text.to_lowercase()))
        .take(MAX_EXAMPLES)
        .collect()
}

fn gender_from_tag_content(content: &str) -> Option<Gender> {
    tag_tokens(content).find_map(Gender::from_article)
}

fn gender_from_brace_content(content: &str) -> Option<Gender> {
    match content.trim().to_lowercase().as_str() {
        "n" => Some(Gender::Neuter),
        other => Gender::from_article(other),
    }
}

/// Gender spelled out by markup anywhere in `text`: `<fem>`, `<n, masc>`, `{f}`, `{n}`.
///
/// Inside angle brackets `n` is the noun tag; inside braces it is neuter.
pub fn explicit_gender(text: &str) -> Option<Gender> {
    MARKUP_TAG
        .captures_iter(text)
        .find_map(|caps| gender_from_tag_content(&caps[1]))
        .or_else(|| {
            BRACE_GROUP
                .captures_iter(text)
                .find_map(|caps| gender_from_brace_content(&caps[1]))
        })
}

fn strip_markup(segment: &str) -> String {
    let s = MARKUP_TAG.replace_all(segment, " ");
    let s = BRACKET_LABEL.replace_all(&s, " ");
    let s = BRACE_GROUP.replace_all(&s, " ");
    let s = PARENTHESES.replace_all(&s, " ");
    collapse_whitespace(&s)
}

/// Gender of one translation segment: markup first, then a leading article.
fn segment_gender(segment: &str, stripped: &str) -> Option<Gender> {
    explicit_gender(segment).or_else(|| {
        GENDER_ARTICLE
            .captures(stripped)
            .and_then(|caps| Gender::from_article(&caps[1]))
    })
}

fn clean_translation_word(stripped: &str) -> String {
    let without_enumeration = ENUMERATION.replace(stripped, "");
    let trimmed = without_enumeration.trim_matches(|c: char| {
        matches!(c, '"' | '\'' | ',' | '.' | ':' | '–' | '—' | '•' | '!' | '?')
            || c.is_whitespace()
    });
    let without_article = LEADING_ARTICLE.replace(trimmed, "");
    without_article
        .trim_matches(|c: char| matches!(c, '"' | '\'' | ',' | '.') || c.is_whitespace())
        .to_string()
}

/// Candidate translations, one per `;`, `|` or `/` separated segment.
pub fn extract_translations(
    text: &str,
    headword: &str,
    domain_labels: &[String],
) -> Vec<Translation> {
    let headword_lower = headword.trim().to_lowercase();
    let mut seen = HashSet::new();
    let mut translations = Vec::new();

    let lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    for (line_no, line) in lines.enumerate() {
        if is_metadata_line(line) || is_example_line(line) {
            continue;
        }

        let domain = BRACKET_LABEL
            .captures(line)
            .map(|caps| clean_label(&caps[1]).to_string())
            .filter(|label| !label.is_empty())
            .or_else(|| domain_labels.first().cloned());

        let mut without_ipa = line.to_string();
        if line_no == 0 {
            if let Some((range, _)) = pronunciation_span(line) {
                without_ipa.replace_range(range, " ");
            }
        }
        for segment in without_ipa.split([';', '|', '/']) {
            let stripped = strip_markup(segment);
            let word = clean_translation_word(&stripped);

            let chars = word.chars().count();
            if !(MIN_TRANSLATION_CHARS..=MAX_TRANSLATION_CHARS).contains(&chars) {
                continue;
            }
            let lower = word.to_lowercase();
            if lower == headword_lower || is_metadata_text(&word) {
                continue;
            }
            if !seen.insert(lower) {
                continue;
            }

            translations.push(Translation {
                gender: segment_gender(segment, &stripped),
                word,
                domain: domain.clone(),
            });
            if translations.len() == MAX_TRANSLATIONS {
                return translations;
            }
        }
    }

    translations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_freedict_style_entry() {
        let raw = "Mutter /ˈmʊtɐ/ <n, fem, sg>\nmother; mom [Am.]\n";
        let entry = parse("Mutter", raw);

        assert_eq!(entry.headword, "Mutter");
        assert_eq!(entry.pronunciation_ipa.as_deref(), Some("ˈmʊtɐ"));
        assert_eq!(entry.part_of_speech_tags, vec![WordType::Noun]);
        assert_eq!(entry.domain_labels, vec!["Am"]);
        let words: Vec<&str> = entry.translations.iter().map(|t| t.word.as_str()).collect();
        assert_eq!(words, vec!["mother", "mom"]);
        assert_eq!(entry.translations[0].domain.as_deref(), Some("Am"));
    }

    #[test]
    fn test_pronunciation_only_on_headword_line() {
        let entry = parse("house", "house / haʊs /\nHaus; Heim");
        assert_eq!(entry.pronunciation_ipa.as_deref(), Some("haʊs"));
        let words: Vec<&str> = entry.translations.iter().map(|t| t.word.as_str()).collect();
        assert_eq!(words, vec!["Haus", "Heim"]);

        // Slash-separated alternatives are not a pronunciation.
        let entry = parse("home", "home\nHaus/Heim/Bau");
        assert_eq!(entry.pronunciation_ipa, None);
        let words: Vec<&str> = entry.translations.iter().map(|t| t.word.as_str()).collect();
        assert_eq!(words, vec!["Haus", "Heim", "Bau"]);
    }

    #[test]
    fn test_translation_gender_from_markup_and_article() {
        let entries = extract_translations("<fem> Mutter\ndas Haus; der Baum {m}\nTür {f}", "x", &[]);
        let got: Vec<(&str, Option<Gender>)> = entries
            .iter()
            .map(|t| (t.word.as_str(), t.gender))
            .collect();
        assert_eq!(
            got,
            vec![
                ("Mutter", Some(Gender::Feminine)),
                ("Haus", Some(Gender::Neuter)),
                ("Baum", Some(Gender::Masculine)),
                ("Tür", Some(Gender::Feminine)),
            ]
        );
    }

    #[test]
    fn test_translations_exclude_headword_and_bad_lengths() {
        let long = "x".repeat(101);
        let text = format!("House; haus; a; {long}; Heim; heim; HEIM");
        let translations = extract_translations(&text, "Haus", &[]);
        let words: Vec<&str> = translations.iter().map(|t| t.word.as_str()).collect();
        assert_eq!(words, vec!["House", "Heim"]);
    }

    #[test]
    fn test_translations_skip_metadata_lines_and_markers() {
        let text = "see: Haus\nsynonym: Heim\n00databaseinfo\nBleibe\nUnterkunft (cf. Herberge)\nWohnung";
        let words: Vec<String> = extract_translations(text, "home", &[])
            .into_iter()
            .map(|t| t.word)
            .collect();
        assert_eq!(words, vec!["Bleibe", "Unterkunft", "Wohnung"]);
    }

    #[test]
    fn test_translations_strip_articles_and_punctuation() {
        let words: Vec<String> = extract_translations("1. \"the house\"; an apple.", "Haus", &[])
            .into_iter()
            .map(|t| t.word)
            .collect();
        assert_eq!(words, vec!["house", "apple"]);
    }

    #[test]
    fn test_translations_are_capped() {
        let text: Vec<String> = (0..30).map(|i| format!("Wort{i}")).collect();
        let translations = extract_translations(&text.join("; "), "word", &[]);
        assert_eq!(translations.len(), MAX_TRANSLATIONS);
        assert_eq!(translations[9].word, "Wort9");
    }

    #[test]
    fn test_domain_labels_are_trimmed_deduped_and_capped() {
        let text = "[med.] [med] [bot.] [this label is definitely too long] [cook.] [zool.]";
        assert_eq!(extract_domain_labels(text), vec!["med", "bot", "cook"]);
    }

    #[test]
    fn test_examples_from_markers_quotes_and_parentheses() {
        let text = "Haus\ne.g. Das Haus ist sehr groß\n\"ein altes Haus\" - an old house\n(wir gehen nach Hause)\n(bot.)";
        let examples = extract_examples(text);
        assert_eq!(
            examples,
            vec![
                Example {
                    source_text: "Das Haus ist sehr groß".to_string(),
                    target_text: None,
                },
                Example {
                    source_text: "ein altes Haus".to_string(),
                    target_text: Some("an old house".to_string()),
                },
                Example {
                    source_text: "wir gehen nach Hause".to_string(),
                    target_text: None,
                },
            ]
        );
        // Example lines never become translations.
        let words: Vec<String> = extract_translations(text, "Haus", &[])
            .into_iter()
            .map(|t| t.word)
            .collect();
        assert!(words.is_empty(), "{words:?}");
    }

    #[test]
    fn test_examples_are_deduplicated_and_capped() {
        let mut text = String::from("Example: Das ist ein Beispielsatz\nexample: das ist ein beispielsatz\n");
        for i in 0..10 {
            text.push_str(&format!("(ein Satz mit Nummer {i})\n"));
        }
        let examples = extract_examples(&text);
        assert_eq!(examples.len(), MAX_EXAMPLES);
        assert_eq!(examples[0].source_text, "Das ist ein Beispielsatz");
        assert_eq!(examples[1].source_text, "ein Satz mit Nummer 0");
    }

    #[test]
    fn test_explicit_gender_vocabulary() {
        assert_eq!(explicit_gender("<n, fem, sg>"), Some(Gender::Feminine));
        assert_eq!(explicit_gender("<n>"), None);
        assert_eq!(explicit_gender("Haus {n}"), Some(Gender::Neuter));
        assert_eq!(explicit_gender("<masculine>"), Some(Gender::Masculine));
        assert_eq!(explicit_gender("no markup"), None);
    }

    #[test]
    fn test_pos_tags_map_to_closed_vocabulary() {
        let tags = extract_part_of_speech_tags("<vt> <adj> <sg> <substantiv> <vi>");
        assert_eq!(
            tags,
            vec![WordType::Verb, WordType::Adjective, WordType::Noun]
        );
    }

    #[test]
    fn test_parse_never_panics_on_garbage() {
        for raw in ["", "<<<>>>", "////", "[[[]]", "(((", "\"\"\" - ", "\u{0}\u{1}"] {
            let entry = parse("x", raw);
            assert!(entry.translations.len() <= MAX_TRANSLATIONS);
        }
    }
}
