//! Grammar extraction for German words: word type, gender, plural, verb and
//! adjective properties.

use crate::gender;
use crate::models::{AuxiliaryVerb, GrammarInfo, WordType};
use crate::normalize::is_noun_shaped;
use lazy_static::lazy_static;
use regex::Regex;

const SEPARABLE_PREFIXES: &[&str] = &[
    "ab", "an", "auf", "aus", "bei", "ein", "fest", "her", "hin", "los", "mit", "nach", "vor",
    "weg", "zu", "zurück",
];
const VERB_ENDINGS: &[&str] = &["en", "ern", "eln"];
const ADVERB_ENDINGS: &[&str] = &["lich", "weise"];

lazy_static! {
    static ref PLURAL: Regex = Regex::new(r"(?i)\(pl\.?\s*([^)]+)\)").unwrap();
    static ref PLURAL_ALT: Regex = Regex::new(r"\bpl\.?\s+([A-ZÄÖÜ][a-zäöüß]+)").unwrap();
    static ref AUXILIARY: Regex = Regex::new(r"(?i)\b(haben|sein)\b").unwrap();
    static ref IRREGULAR: Regex =
        Regex::new(r"(?i)\b(irregular|unregelmäßig|strong|stark)\b").unwrap();
    static ref SEPARABLE: Regex =
        Regex::new(r"(?i)(\bsep\.|\bseparable\b|\btrennbar\b)").unwrap();
    static ref COMPARATIVE: Regex =
        Regex::new(r"\b(comp\.|comparative)\s+([a-zäöüß]+)").unwrap();
    static ref SUPERLATIVE: Regex =
        Regex::new(r"\b(sup\.|superlative)\s+([a-zäöüß]+)").unwrap();
}

/// Extracts [`GrammarInfo`] for one German word.
///
/// All fields are best effort; absence is the normal outcome for most of them.
#[derive(Debug, Default, Clone, Copy)]
pub struct GrammarExtractor;

impl GrammarExtractor {
    pub fn new() -> Self {
        GrammarExtractor
    }

    /// `german_word` is the word being described, `other_word` its counterpart
    /// in the other language, `context` the raw entry text and `pos_tags` the
    /// tags the entry parser found.
    pub fn extract(
        &self,
        german_word: &str,
        other_word: &str,
        context: &str,
        pos_tags: &[WordType],
    ) -> GrammarInfo {
        let word_type = determine_word_type(german_word, other_word, context, pos_tags);
        let mut info = GrammarInfo {
            word_type,
            ..GrammarInfo::default()
        };

        match word_type {
            Some(WordType::Noun) => {
                info.gender = gender::detect_simple(german_word, context);
                info.plural_form = extract_plural(context);
            }
            Some(WordType::Verb) => {
                info.auxiliary_verb = extract_auxiliary(context);
                info.is_irregular = IRREGULAR.is_match(context);
                info.is_separable = is_separable(german_word, context);
            }
            Some(WordType::Adjective) => {
                info.comparative = capture_word(&COMPARATIVE, context);
                info.superlative = capture_word(&SUPERLATIVE, context);
            }
            _ => {}
        }

        info
    }
}

/// Word type of `german_word`.
///
/// A space on either side makes a phrase. Otherwise: explicit tags, inline
/// markup hints, then the shape of the word, where a capitalized word is a
/// noun even if it ends like an infinitive.
pub fn determine_word_type(
    german_word: &str,
    other_word: &str,
    context: &str,
    pos_tags: &[WordType],
) -> Option<WordType> {
    if german_word.trim().contains(char::is_whitespace)
        || other_word.trim().contains(char::is_whitespace)
    {
        return Some(WordType::Phrase);
    }

    if let Some(&tag) = pos_tags.first() {
        return Some(tag);
    }

    let lower_context = context.to_lowercase();
    if lower_context.contains("<noun>") || lower_context.contains("<substantiv>") {
        return Some(WordType::Noun);
    }
    if lower_context.contains("<verb>") {
        return Some(WordType::Verb);
    }
    if lower_context.contains("<adj") {
        return Some(WordType::Adjective);
    }
    if lower_context.contains("<adv") {
        return Some(WordType::Adverb);
    }

    let word = german_word.trim();
    let lower = word.to_lowercase();
    if VERB_ENDINGS.iter().any(|ending| lower.ends_with(ending)) {
        // Nominalized infinitives ("das Essen") keep their capital.
        return Some(if is_noun_shaped(word) {
            WordType::Noun
        } else {
            WordType::Verb
        });
    }
    if is_noun_shaped(word) {
        return Some(WordType::Noun);
    }
    if ADVERB_ENDINGS.iter().any(|ending| lower.ends_with(ending)) {
        return Some(WordType::Adverb);
    }
    None
}

fn extract_plural(context: &str) -> Option<String> {
    PLURAL
        .captures(context)
        .or_else(|| PLURAL_ALT.captures(context))
        .map(|caps| caps[1].trim().to_string())
        .filter(|plural| !plural.is_empty())
}

// Both or neither mentioned means we cannot tell.
fn extract_auxiliary(context: &str) -> Option<AuxiliaryVerb> {
    let mut haben = false;
    let mut sein = false;
    for caps in AUXILIARY.captures_iter(context) {
        match caps[1].to_lowercase().as_str() {
            "haben" => haben = true,
            _ => sein = true,
        }
    }
    match (haben, sein) {
        (true, false) => Some(AuxiliaryVerb::Haben),
        (false, true) => Some(AuxiliaryVerb::Sein),
        _ => None,
    }
}

fn is_separable(german_word: &str, context: &str) -> bool {
    if SEPARABLE.is_match(context) {
        return true;
    }
    let lower = german_word.trim().to_lowercase();
    SEPARABLE_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

fn capture_word(pattern: &Regex, context: &str) -> Option<String> {
    pattern.captures(context).map(|caps| caps[2].to_string())
}
