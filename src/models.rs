use serde::{Deserialize, Serialize};

// --- Index ---

/// Location of one headword inside the decompressed dictionary body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexLocation {
    pub headword: String,
    pub byte_offset: u64,
    pub byte_length: u32, // Always > 0 for locations produced by the index parser
}

// --- Parsed entry text ---

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Translation {
    pub word: String,
    pub gender: Option<Gender>,
    pub domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Example {
    pub source_text: String,
    pub target_text: Option<String>,
}

/// Structured data extracted from the raw text of one dictionary entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedEntry {
    pub headword: String,
    pub translations: Vec<Translation>, // Case-insensitively unique, at most 10
    pub examples: Vec<Example>,         // At most 5
    pub pronunciation_ipa: Option<String>,
    pub part_of_speech_tags: Vec<WordType>,
    pub domain_labels: Vec<String>, // At most 3
    pub raw_text: String,
}

// --- Grammar ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WordType {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Pronoun,
    Preposition,
    Conjunction,
    Interjection,
    Phrase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Masculine, // der
    Feminine,  // die
    Neuter,    // das
}

impl Gender {
    /// The German definite article for this gender.
    pub fn article(self) -> &'static str {
        match self {
            Gender::Masculine => "der",
            Gender::Feminine => "die",
            Gender::Neuter => "das",
        }
    }

    /// Parses an article or a gender abbreviation ("der", "m", "fem", "neuter", ...).
    pub fn from_article(article: &str) -> Option<Gender> {
        match article.to_lowercase().as_str() {
            "der" | "m" | "masc" | "masculine" => Some(Gender::Masculine),
            "die" | "f" | "fem" | "feminine" => Some(Gender::Feminine),
            "das" | "nt" | "neut" | "neuter" => Some(Gender::Neuter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuxiliaryVerb {
    Haben,
    Sein,
}

/// Which step of the gender priority chain produced a gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenderSource {
    ExplicitMarker,
    CommonWord,
    Detector,
    Extraction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarInfo {
    pub word_type: Option<WordType>,
    pub gender: Option<Gender>,
    pub plural_form: Option<String>,
    pub auxiliary_verb: Option<AuxiliaryVerb>,
    pub is_irregular: bool,
    pub is_separable: bool,
    pub comparative: Option<String>,
    pub superlative: Option<String>,
}

// --- Import output ---

/// Translation direction of a dictd pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    EngDeu, // English headwords, German translations
    DeuEng, // German headwords, English translations
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::EngDeu, Direction::DeuEng];

    /// FreeDict identifier of the dictionary ("eng-deu" / "deu-eng").
    pub fn id(self) -> &'static str {
        match self {
            Direction::EngDeu => "eng-deu",
            Direction::DeuEng => "deu-eng",
        }
    }

    /// Provenance tag stored with every imported record.
    pub fn source_tag(self) -> &'static str {
        match self {
            Direction::EngDeu => "FreeDict eng-deu",
            Direction::DeuEng => "FreeDict deu-eng",
        }
    }
}

/// One imported word pair. Built once per surviving translation and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub english_word: String,
    pub german_word: String,
    pub direction: Direction,
    pub word_type: Option<WordType>,
    pub gender: Option<Gender>,
    pub gender_source: Option<GenderSource>,
    pub plural_form: Option<String>,
    pub auxiliary_verb: Option<AuxiliaryVerb>,
    pub is_irregular: bool,
    pub is_separable: bool,
    pub comparative: Option<String>,
    pub superlative: Option<String>,
    pub additional_translations: Vec<String>,
    pub examples: Vec<Example>,
    pub pronunciation_ipa: Option<String>,
    pub domain: Option<String>,
    pub raw_entry: String,
    pub english_normalized: String,
    pub german_normalized: String,
    pub word_length: usize,
    pub source: String,
}

/// Aggregate counts over the stored entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryStatistics {
    pub total: u64,
    pub nouns: u64,
    pub verbs: u64,
    pub adjectives: u64,
    pub masculine: u64,
    pub feminine: u64,
    pub neuter: u64,
    pub with_examples: u64,
}

// Implement Display for WordType for easier printing
impl std::fmt::Display for WordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                WordType::Noun => "noun",
                WordType::Verb => "verb",
                WordType::Adjective => "adjective",
                WordType::Adverb => "adverb",
                WordType::Pronoun => "pronoun",
                WordType::Preposition => "preposition",
                WordType::Conjunction => "conjunction",
                WordType::Interjection => "interjection",
                WordType::Phrase => "phrase",
            }
        )
    }
}

// Tag spellings used by FreeDict markup, English and German abbreviations
impl std::str::FromStr for WordType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "n" | "noun" | "substantiv" => Ok(WordType::Noun),
            "v" | "verb" | "vi" | "vt" => Ok(WordType::Verb),
            "adj" | "adjective" | "adjektiv" => Ok(WordType::Adjective),
            "adv" | "adverb" => Ok(WordType::Adverb),
            "pron" | "pronoun" | "pronomen" => Ok(WordType::Pronoun),
            "prep" | "preposition" | "präp" | "praep" => Ok(WordType::Preposition),
            "conj" | "conjunction" | "konj" => Ok(WordType::Conjunction),
            "interj" | "interjection" => Ok(WordType::Interjection),
            "phrase" => Ok(WordType::Phrase),
            _ => Err(format!("Invalid word type: {}", s)),
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.article())
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_type_tag_spellings() {
        assert_eq!("Substantiv".parse::<WordType>(), Ok(WordType::Noun));
        assert_eq!("vt".parse::<WordType>(), Ok(WordType::Verb));
        assert_eq!("adjektiv".parse::<WordType>(), Ok(WordType::Adjective));
        assert!("fem".parse::<WordType>().is_err());
    }

    #[test]
    fn test_gender_from_article() {
        assert_eq!(Gender::from_article("Die"), Some(Gender::Feminine));
        assert_eq!(Gender::from_article("masc"), Some(Gender::Masculine));
        assert_eq!(Gender::from_article("neut"), Some(Gender::Neuter));
        // "n" is the noun tag in FreeDict markup, not a gender.
        assert_eq!(Gender::from_article("n"), None);
        assert_eq!(Gender::Neuter.to_string(), "das");
    }

    #[test]
    fn test_direction_tags() {
        assert_eq!(Direction::EngDeu.id(), "eng-deu");
        assert_eq!(Direction::DeuEng.source_tag(), "FreeDict deu-eng");
        assert_eq!(
            serde_json::to_string(&Direction::DeuEng).unwrap(),
            "\"deu-eng\""
        );
    }
}
