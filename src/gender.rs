//! German noun gender resolution.
//!
//! Gender comes from an ordered chain of strategies, each returning a gender
//! with a confidence. The chain stops at the first strategy whose answer
//! clears that strategy's threshold:
//!
//! 1. explicit markup on the authoritative side of the entry,
//! 2. the curated table of common nouns,
//! 3. the confidence-scored [`detect`] heuristics (>= [`MIN_DETECTOR_CONFIDENCE`]),
//! 4. whatever the grammar extractor guessed on its own.

use crate::models::{Gender, GenderSource};
use crate::normalize::capitalize;
use crate::parse::explicit_gender;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

pub const CONFIDENCE_EXPLICIT: f32 = 1.0;
pub const CONFIDENCE_VERY_HIGH: f32 = 0.95;
pub const CONFIDENCE_HIGH: f32 = 0.85;
pub const CONFIDENCE_MEDIUM: f32 = 0.7;
/// Detector answers below this are ignored by the chain.
pub const MIN_DETECTOR_CONFIDENCE: f32 = 0.7;

const CONFIDENCE_COMMON_WORD: f32 = 0.95;
const CONFIDENCE_EXTRACTION: f32 = 0.5;

use Gender::{Feminine as F, Masculine as M, Neuter as N};

// "See" is both der See (lake) and die See (sea); the table keeps the lake.
const COMMON_NOUNS: &[(&str, Gender)] = &[
    // Family
    ("Mutter", F), ("Vater", M), ("Kind", N), ("Eltern", F), ("Tochter", F),
    ("Sohn", M), ("Bruder", M), ("Schwester", F), ("Oma", F), ("Opa", M),
    ("Großmutter", F), ("Großvater", M), ("Familie", F), ("Mann", M), ("Frau", F),
    ("Junge", M), ("Mädchen", N), ("Baby", N), ("Mensch", M), ("Person", F),
    ("Leute", F), ("Freund", M), ("Freundin", F),
    // Home
    ("Haus", N), ("Wohnung", F), ("Zimmer", N), ("Küche", F), ("Bad", N),
    ("Tür", F), ("Fenster", N), ("Tisch", M), ("Stuhl", M), ("Bett", N),
    ("Sofa", N), ("Lampe", F), ("Wand", F), ("Boden", M), ("Decke", F),
    // Food and drink
    ("Essen", N), ("Trinken", N), ("Wasser", N), ("Brot", N), ("Milch", F),
    ("Käse", M), ("Butter", F), ("Ei", N), ("Fleisch", N), ("Fisch", M),
    ("Obst", N), ("Gemüse", N), ("Apfel", M), ("Birne", F), ("Orange", F),
    ("Banane", F), ("Tomate", F), ("Kartoffel", F), ("Reis", M), ("Nudeln", F),
    ("Suppe", F), ("Salat", M), ("Kuchen", M), ("Kaffee", M), ("Tee", M),
    ("Bier", N), ("Wein", M), ("Saft", M),
    // Nature
    ("Natur", F), ("Baum", M), ("Blume", F), ("Gras", N), ("Berg", M),
    ("Fluss", M), ("See", M), ("Meer", N), ("Wald", M), ("Feld", N),
    ("Himmel", M), ("Sonne", F), ("Mond", M), ("Stern", M), ("Wolke", F),
    ("Regen", M), ("Schnee", M), ("Wind", M),
    // Animals
    ("Tier", N), ("Hund", M), ("Katze", F), ("Vogel", M), ("Pferd", N),
    ("Kuh", F), ("Schwein", N), ("Schaf", N), ("Huhn", N), ("Maus", F),
    // Objects
    ("Buch", N), ("Stift", M), ("Papier", N), ("Brief", M), ("Karte", F),
    ("Telefon", N), ("Computer", M), ("Handy", N), ("Uhr", F), ("Schlüssel", M),
    ("Tasche", F), ("Rucksack", M), ("Kamera", F), ("Foto", N), ("Bild", N),
    ("Spiegel", M),
    // Transportation
    ("Auto", N), ("Bus", M), ("Zug", M), ("Flugzeug", N), ("Fahrrad", N),
    ("Schiff", N), ("Straße", F), ("Weg", M), ("Brücke", F),
    // Body
    ("Körper", M), ("Kopf", M), ("Gesicht", N), ("Auge", N), ("Ohr", N),
    ("Nase", F), ("Mund", M), ("Hand", F), ("Fuß", M), ("Arm", M),
    ("Bein", N), ("Herz", N), ("Haar", N), ("Haut", F),
    // Clothing
    ("Kleidung", F), ("Hemd", N), ("Hose", F), ("Kleid", N), ("Rock", M),
    ("Jacke", F), ("Mantel", M), ("Schuh", M), ("Socke", F), ("Hut", M),
    // Time
    ("Zeit", F), ("Tag", M), ("Nacht", F), ("Morgen", M), ("Abend", M),
    ("Woche", F), ("Monat", M), ("Jahr", N), ("Stunde", F), ("Minute", F),
    ("Sekunde", F),
    // Places
    ("Stadt", F), ("Land", N), ("Dorf", N), ("Platz", M), ("Park", M),
    ("Schule", F), ("Universität", F), ("Kirche", F), ("Geschäft", N), ("Laden", M),
    ("Markt", M), ("Restaurant", N), ("Café", N), ("Hotel", N), ("Bahnhof", M),
    ("Flughafen", M), ("Krankenhaus", N), ("Büro", N),
    // Abstract
    ("Liebe", F), ("Leben", N), ("Tod", M), ("Glück", N), ("Freude", F),
    ("Angst", F), ("Hoffnung", F), ("Traum", M), ("Idee", F), ("Problem", N),
    ("Frage", F), ("Antwort", F), ("Arbeit", F), ("Geld", N), ("Preis", M),
    // Colors
    ("Farbe", F), ("Rot", N), ("Blau", N), ("Grün", N), ("Gelb", N),
    ("Schwarz", N), ("Weiß", N),
    // Quantity
    ("Zahl", F), ("Nummer", F), ("Stück", N),
    // School and work
    ("Lehrer", M), ("Lehrerin", F), ("Schüler", M), ("Schülerin", F), ("Arzt", M),
    ("Ärztin", F), ("Klasse", F), ("Wort", N), ("Satz", M), ("Sprache", F),
    ("Text", M), ("Heft", N), ("Tafel", F), ("Prüfung", F), ("Firma", F),
    ("Chef", M), ("Kollege", M), ("Kollegin", F),
    // Leisure and world
    ("Musik", F), ("Film", M), ("Spiel", N), ("Sport", M), ("Ball", M),
    ("Lied", N), ("Fest", N), ("Geschenk", N), ("Urlaub", M), ("Reise", F),
    ("Welt", F), ("Wetter", N), ("Luft", F), ("Feuer", N), ("Erde", F),
    ("Stein", M), ("Insel", F), ("Strand", M),
];

// --- Ending rules ---

const FEMININE_ENDINGS_VERY_HIGH: &[&str] = &[
    "ung", "heit", "keit", "schaft", "ion", "tät", "anz", "enz", "ie", "ik", "ur", "age",
];
const NEUTER_ENDINGS_VERY_HIGH: &[&str] = &["chen", "lein", "ment", "um", "ma", "tum"];
const MASCULINE_ENDINGS_HIGH: &[&str] = &["ling", "or", "ismus", "ant", "ist", "eur"];
const FEMININE_ENDINGS_MEDIUM: &[&str] = &["ei", "in", "nz", "si", "sis", "th", "st"];
const NEUTER_ENDINGS_MEDIUM: &[&str] = &["nis", "sal", "sel", "tel", "tum"];
const MASCULINE_ENDINGS_MEDIUM: &[&str] = &["er", "en", "el", "ich", "ig", "us"];

const FEMININE_KEYWORDS: &[&str] = &[
    "frau", "mutter", "tochter", "schwester", "tante", "königin", "prinzessin", "dame",
];
const MASCULINE_KEYWORDS: &[&str] = &[
    "mann", "vater", "sohn", "bruder", "onkel", "könig", "prinz", "herr",
];

// Simple detector used by the grammar extractor.
const SIMPLE_FEMININE_ENDINGS: &[&str] = &[
    "ung", "heit", "keit", "schaft", "ion", "tät", "ik", "ur", "ie", "enz", "anz", "age", "ade",
    "ette", "ine",
];
const SIMPLE_NEUTER_ENDINGS: &[&str] = &["chen", "lein", "ment", "um", "tum", "ma", "ett"];
const SIMPLE_MASCULINE_ENDINGS: &[&str] = &[
    "ismus", "or", "ling", "ig", "ich", "ner", "ant", "ent", "ist",
];

lazy_static! {
    static ref COMMON_NOUN_MAP: HashMap<&'static str, Gender> =
        COMMON_NOUNS.iter().copied().collect();
    static ref ARTICLE_BEFORE_NOUN: Regex = Regex::new(r"\b(der|die|das)\s+\p{Lu}").unwrap();
}

/// Gender from the curated common-noun table, trying the word as given and then capitalized.
pub fn common_word_gender(word: &str) -> Option<Gender> {
    let word = word.trim();
    COMMON_NOUN_MAP
        .get(word)
        .or_else(|| COMMON_NOUN_MAP.get(capitalize(word).as_str()))
        .copied()
}

pub fn is_common_word(word: &str) -> bool {
    common_word_gender(word).is_some()
}

/// How [`detect`] reached its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    ExplicitMarkup,
    Article,
    CompoundAnalysis,
    LinguisticRule,
    KeywordMatch,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenderGuess {
    pub gender: Gender,
    pub confidence: f32,
    pub method: DetectionMethod,
}

impl GenderGuess {
    fn new(gender: Gender, confidence: f32, method: DetectionMethod) -> Self {
        GenderGuess {
            gender,
            confidence,
            method,
        }
    }
}

fn ends_with_any(word: &str, endings: &[&str]) -> bool {
    endings.iter().any(|ending| word.ends_with(ending))
}

fn article_in_word(word: &str) -> Option<Gender> {
    let lower = word.trim().to_lowercase();
    let (article, rest) = lower.split_once(' ')?;
    if rest.trim().is_empty() {
        return None;
    }
    match article {
        "der" | "die" | "das" => Gender::from_article(article),
        _ => None,
    }
}

// The last component of a compound decides its gender.
fn compound_tail(word: &str) -> Option<GenderGuess> {
    let lower = word.trim().to_lowercase();
    let chars: Vec<char> = lower.chars().collect();
    if chars.len() < 6 {
        return None;
    }
    for len in (4..=6).rev() {
        if chars.len() <= len {
            continue;
        }
        let tail: String = chars[chars.len() - len..].iter().collect();
        let guess = match tail.as_str() {
            "frau" | "mutter" => (F, CONFIDENCE_HIGH),
            "mann" | "vater" => (M, CONFIDENCE_HIGH),
            "haus" | "buch" => (N, CONFIDENCE_MEDIUM),
            _ => continue,
        };
        return Some(GenderGuess::new(
            guess.0,
            guess.1,
            DetectionMethod::CompoundAnalysis,
        ));
    }
    None
}

fn ending_rules(word: &str) -> Option<GenderGuess> {
    let lower = word.trim().to_lowercase();
    let rule = |gender, confidence| {
        Some(GenderGuess::new(
            gender,
            confidence,
            DetectionMethod::LinguisticRule,
        ))
    };

    if ends_with_any(&lower, FEMININE_ENDINGS_VERY_HIGH) {
        return rule(F, CONFIDENCE_VERY_HIGH);
    }
    if ends_with_any(&lower, NEUTER_ENDINGS_VERY_HIGH) {
        return rule(N, CONFIDENCE_VERY_HIGH);
    }
    if ends_with_any(&lower, MASCULINE_ENDINGS_HIGH) {
        return rule(M, CONFIDENCE_HIGH);
    }
    if ends_with_any(&lower, FEMININE_ENDINGS_MEDIUM) {
        return rule(F, CONFIDENCE_MEDIUM);
    }
    if ends_with_any(&lower, NEUTER_ENDINGS_MEDIUM) {
        return rule(N, CONFIDENCE_MEDIUM);
    }
    // Short -er/-en words are too often not nouns at all.
    if lower.chars().count() > 4 && ends_with_any(&lower, MASCULINE_ENDINGS_MEDIUM) {
        return rule(M, CONFIDENCE_MEDIUM);
    }
    None
}

fn keyword_match(word: &str) -> Option<GenderGuess> {
    let lower = word.trim().to_lowercase();
    let keyword = |gender| {
        Some(GenderGuess::new(
            gender,
            CONFIDENCE_MEDIUM,
            DetectionMethod::KeywordMatch,
        ))
    };
    if FEMININE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return keyword(F);
    }
    if MASCULINE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return keyword(M);
    }
    None
}

/// Confidence-scored gender heuristics for a German noun.
///
/// Order: markup in `context`, an article inside `word`, strong compound
/// tails, strong ending rules, weak compound tails, medium ending rules,
/// semantic keywords.
pub fn detect(word: &str, context: &str) -> Option<GenderGuess> {
    if let Some(gender) = explicit_gender(context) {
        return Some(GenderGuess::new(
            gender,
            CONFIDENCE_EXPLICIT,
            DetectionMethod::ExplicitMarkup,
        ));
    }
    if let Some(gender) = article_in_word(word) {
        return Some(GenderGuess::new(
            gender,
            CONFIDENCE_EXPLICIT,
            DetectionMethod::Article,
        ));
    }

    let strong = |guess: &GenderGuess| guess.confidence >= CONFIDENCE_HIGH;
    let compound = compound_tail(word);
    if let Some(guess) = compound.filter(strong) {
        return Some(guess);
    }
    let rule = ending_rules(word);
    if let Some(guess) = rule.filter(strong) {
        return Some(guess);
    }
    compound.or(rule).or_else(|| keyword_match(word))
}

/// Markup or a `der/die/das Noun` mention in `text`.
pub fn detect_from_markup(text: &str) -> Option<Gender> {
    explicit_gender(text).or_else(|| {
        ARTICLE_BEFORE_NOUN
            .captures(text)
            .and_then(|caps| Gender::from_article(&caps[1]))
    })
}

/// Unscored ending rules, including the broad `-e` (feminine) and `-er`
/// (masculine) patterns the scored detector leaves out.
pub fn detect_from_ending(word: &str) -> Option<Gender> {
    let lower = word.trim().to_lowercase();
    let len = lower.chars().count();
    if len < 3 {
        return None;
    }
    if ends_with_any(&lower, SIMPLE_FEMININE_ENDINGS) {
        return Some(F);
    }
    if ends_with_any(&lower, SIMPLE_NEUTER_ENDINGS) {
        return Some(N);
    }
    if ends_with_any(&lower, SIMPLE_MASCULINE_ENDINGS) {
        return Some(M);
    }
    if len > 4 && lower.ends_with('e') {
        return Some(F);
    }
    if len > 4 && lower.ends_with("er") {
        return Some(M);
    }
    None
}

/// Markup in `context` first, then ending rules on `word`.
pub fn detect_simple(word: &str, context: &str) -> Option<Gender> {
    if !context.is_empty() {
        if let Some(gender) = detect_from_markup(context) {
            return Some(gender);
        }
    }
    detect_from_ending(word)
}

// --- Priority chain ---

/// Inputs available to every gender strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenderInput<'a> {
    pub german_word: &'a str,
    /// Text the detector may scan for markup. Empty when the entry text
    /// describes other words than `german_word`.
    pub context: &'a str,
    /// Gender marked on the authoritative side of the entry.
    pub explicit: Option<Gender>,
    /// Gender the grammar extractor settled on.
    pub extracted: Option<Gender>,
}

pub type GenderStrategy = fn(&GenderInput<'_>) -> Option<(Gender, f32)>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenderResolution {
    pub gender: Gender,
    pub source: GenderSource,
    pub confidence: f32,
}

struct Step {
    source: GenderSource,
    strategy: GenderStrategy,
    min_confidence: f32,
}

/// Ordered gender strategies, short-circuiting on the first confident answer.
pub struct GenderChain {
    steps: Vec<Step>,
}

fn explicit_strategy(input: &GenderInput<'_>) -> Option<(Gender, f32)> {
    input.explicit.map(|g| (g, CONFIDENCE_EXPLICIT))
}

fn common_word_strategy(input: &GenderInput<'_>) -> Option<(Gender, f32)> {
    common_word_gender(input.german_word).map(|g| (g, CONFIDENCE_COMMON_WORD))
}

fn detector_strategy(input: &GenderInput<'_>) -> Option<(Gender, f32)> {
    detect(input.german_word, input.context).map(|guess| (guess.gender, guess.confidence))
}

fn extraction_strategy(input: &GenderInput<'_>) -> Option<(Gender, f32)> {
    input.extracted.map(|g| (g, CONFIDENCE_EXTRACTION))
}

impl GenderChain {
    pub fn new() -> Self {
        GenderChain { steps: Vec::new() }
    }

    /// Appends a strategy; answers below `min_confidence` fall through.
    pub fn with_step(mut self, source: GenderSource, strategy: GenderStrategy, min_confidence: f32) -> Self {
        self.steps.push(Step {
            source,
            strategy,
            min_confidence,
        });
        self
    }

    /// Explicit marker, common-word table, detector (>= 0.7), extraction.
    pub fn standard() -> Self {
        Self::new()
            .with_step(GenderSource::ExplicitMarker, explicit_strategy, 0.0)
            .with_step(GenderSource::CommonWord, common_word_strategy, 0.0)
            .with_step(GenderSource::Detector, detector_strategy, MIN_DETECTOR_CONFIDENCE)
            .with_step(GenderSource::Extraction, extraction_strategy, 0.0)
    }

    pub fn resolve(&self, input: &GenderInput<'_>) -> Option<GenderResolution> {
        self.steps.iter().find_map(|step| {
            (step.strategy)(input)
                .filter(|(_, confidence)| *confidence >= step.min_confidence)
                .map(|(gender, confidence)| GenderResolution {
                    gender,
                    source: step.source,
                    confidence,
                })
        })
    }
}

impl Default for GenderChain {
    fn default() -> Self {
        Self::standard()
    }
}
