use crate::error::{FreedictError, Result};
use crate::models::{
    AuxiliaryVerb, DictionaryEntry, DictionaryStatistics, Direction, Example, Gender,
    GenderSource, WordType,
};
use crate::normalize::{normalize_english, normalize_german};
use log::{debug, info, warn};
use rusqlite::types::Type;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, Transaction, params};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Destination for imported entries.
///
/// `insert_entries` must be atomic: either the whole batch is stored or none of it.
pub trait EntrySink {
    fn delete_all_entries(&mut self) -> Result<()>;
    fn insert_entries(&mut self, entries: &[DictionaryEntry]) -> Result<()>;
    fn statistics_summary(&self) -> Result<DictionaryStatistics>;
    /// Bytes used by the backing store, 0 when it has no file.
    fn store_size_bytes(&self) -> u64;
}

// --- Schema Definition ---

const SCHEMA_VERSION: u32 = 1;

const CREATE_METADATA_TABLE: &str = "
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);";

const CREATE_ENTRIES_TABLE: &str = "
CREATE TABLE IF NOT EXISTS dictionary_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    english_word TEXT NOT NULL,
    german_word TEXT NOT NULL,
    direction TEXT NOT NULL, -- 'eng-deu' or 'deu-eng'
    word_type TEXT,
    gender TEXT,
    gender_source TEXT,
    plural_form TEXT,
    auxiliary_verb TEXT,
    is_irregular INTEGER NOT NULL, -- 0 for false, 1 for true
    is_separable INTEGER NOT NULL,
    comparative TEXT,
    superlative TEXT,
    additional_translations TEXT NOT NULL, -- JSON array of strings
    examples TEXT NOT NULL, -- JSON array of examples
    pronunciation_ipa TEXT,
    domain TEXT,
    raw_entry TEXT NOT NULL,
    english_normalized TEXT NOT NULL,
    german_normalized TEXT NOT NULL,
    word_length INTEGER NOT NULL,
    source TEXT NOT NULL
);";

// --- Indices ---

const CREATE_ENGLISH_NORMALIZED_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_entry_english_normalized ON dictionary_entries (english_normalized);";
const CREATE_GERMAN_NORMALIZED_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_entry_german_normalized ON dictionary_entries (german_normalized);";
const CREATE_WORD_TYPE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_entry_word_type ON dictionary_entries (word_type);";
const CREATE_GENDER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_entry_gender ON dictionary_entries (gender);";
const CREATE_WORD_LENGTH_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_entry_word_length ON dictionary_entries (word_length);";

const ENTRY_COLUMNS: &str = "english_word, german_word, direction, word_type, gender, gender_source, \
     plural_form, auxiliary_verb, is_irregular, is_separable, comparative, superlative, \
     additional_translations, examples, pronunciation_ipa, domain, raw_entry, \
     english_normalized, german_normalized, word_length, source";

const INSERT_ENTRY: &str = "INSERT INTO dictionary_entries (
    english_word, german_word, direction, word_type, gender, gender_source,
    plural_form, auxiliary_verb, is_irregular, is_separable, comparative, superlative,
    additional_translations, examples, pronunciation_ipa, domain, raw_entry,
    english_normalized, german_normalized, word_length, source
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)";

// Exact match, nouns, gendered entries, shorter words, then alphabetical.
const RANKING_TAIL: &str = "
    CASE WHEN word_type = 'NOUN' THEN 0 ELSE 1 END,
    CASE WHEN gender IS NOT NULL THEN 0 ELSE 1 END,
    word_length ASC";

const STATISTICS_QUERY: &str = "
SELECT
    COUNT(*),
    COUNT(CASE WHEN word_type = 'NOUN' THEN 1 END),
    COUNT(CASE WHEN word_type = 'VERB' THEN 1 END),
    COUNT(CASE WHEN word_type = 'ADJECTIVE' THEN 1 END),
    COUNT(CASE WHEN gender = 'MASCULINE' THEN 1 END),
    COUNT(CASE WHEN gender = 'FEMININE' THEN 1 END),
    COUNT(CASE WHEN gender = 'NEUTER' THEN 1 END),
    COUNT(CASE WHEN examples != '[]' THEN 1 END)
FROM dictionary_entries";

// --- Initialization Function ---

/// Creates all necessary tables and indices in the database if they don't exist.
/// Also checks and sets the schema version.
pub fn initialize_database(conn: &mut Connection) -> Result<()> {
    info!(
        "Initializing database schema (version {})...",
        SCHEMA_VERSION
    );
    let tx = conn.transaction()?;

    tx.execute(CREATE_METADATA_TABLE, [])?;
    tx.execute(CREATE_ENTRIES_TABLE, [])?;

    tx.execute(CREATE_ENGLISH_NORMALIZED_INDEX, [])?;
    tx.execute(CREATE_GERMAN_NORMALIZED_INDEX, [])?;
    tx.execute(CREATE_WORD_TYPE_INDEX, [])?;
    tx.execute(CREATE_GENDER_INDEX, [])?;
    tx.execute(CREATE_WORD_LENGTH_INDEX, [])?;

    let existing_version_str: Option<String> = tx
        .query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    match existing_version_str {
        Some(v_str) => {
            let existing_version: u32 = v_str.parse().map_err(|e| {
                FreedictError::ParseError(format!(
                    "Failed to parse existing schema version '{}': {}",
                    v_str, e
                ))
            })?;
            match existing_version.cmp(&SCHEMA_VERSION) {
                std::cmp::Ordering::Less => {
                    warn!(
                        "Database schema version ({}) is older than expected ({}). Re-import recommended.",
                        existing_version, SCHEMA_VERSION
                    );
                    tx.execute(
                        "UPDATE metadata SET value = ?1 WHERE key = 'schema_version'",
                        params![SCHEMA_VERSION.to_string()],
                    )?;
                }
                std::cmp::Ordering::Greater => {
                    warn!(
                        "Database schema version ({}) is newer than expected ({}). Using potentially incompatible schema.",
                        existing_version, SCHEMA_VERSION
                    );
                }
                std::cmp::Ordering::Equal => {
                    debug!(
                        "Database schema version ({}) matches expected version.",
                        existing_version
                    );
                }
            }
        }
        None => {
            tx.execute(
                "INSERT INTO metadata (key, value) VALUES ('schema_version', ?1)",
                params![SCHEMA_VERSION.to_string()],
            )?;
            info!("Set initial schema version in metadata table.");
        }
    }

    tx.commit()?;
    info!("Database schema initialization complete.");
    Ok(())
}

/// Deletes every dictionary entry. The metadata table is kept.
pub fn clear_database_data(tx: &Transaction) -> Result<()> {
    info!("Clearing existing dictionary entries...");
    let deleted = tx.execute("DELETE FROM dictionary_entries", [])?;
    info!("Deleted {} entries.", deleted);
    Ok(())
}

// Opens/creates the database file with the pragmas used for bulk imports.
fn open_db_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )?;
    // WAL lets readers proceed while an import batch is being written
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "cache_size", "-64000")?; // 64MB
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(conn)
}

/// SQLite-backed dictionary store.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens (or creates) the store at `path` and makes sure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        info!("Opening dictionary database: {:?}", path);
        let mut conn = open_db_connection(path)?;
        initialize_database(&mut conn)?;
        Ok(SqliteStore {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// A store that lives only as long as the value, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        initialize_database(&mut conn)?;
        Ok(SqliteStore { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn entry_count(&self) -> Result<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM dictionary_entries", [], |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }

    /// Entries whose normalized English form equals or starts with `query`, best match first.
    pub fn search_english(&self, query: &str, limit: usize) -> Result<Vec<DictionaryEntry>> {
        self.search("english_normalized", "english_word", &normalize_english(query), limit)
    }

    /// Entries whose normalized German form equals or starts with `query`, best match first.
    pub fn search_german(&self, query: &str, limit: usize) -> Result<Vec<DictionaryEntry>> {
        self.search("german_normalized", "german_word", &normalize_german(query), limit)
    }

    fn search(
        &self,
        normalized_column: &str,
        word_column: &str,
        normalized: &str,
        limit: usize,
    ) -> Result<Vec<DictionaryEntry>> {
        debug!("search: {}='{}', limit={}", normalized_column, normalized, limit);
        if normalized.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM dictionary_entries
             WHERE {col} = ?1 OR {col} LIKE ?2 ESCAPE '\\'
             ORDER BY
                CASE WHEN {col} = ?1 THEN 0 ELSE 1 END,{RANKING_TAIL},
                {word_column} ASC
             LIMIT ?3",
            col = normalized_column,
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![normalized, like_prefix(normalized), limit as i64],
            row_to_entry,
        )?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(FreedictError::from)
    }

    /// Distinct English words starting with `prefix`, shortest first.
    pub fn english_suggestions(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        self.suggestions("english_normalized", "english_word", &normalize_english(prefix), limit)
    }

    /// Distinct German words starting with `prefix`, shortest first.
    pub fn german_suggestions(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        self.suggestions("german_normalized", "german_word", &normalize_german(prefix), limit)
    }

    fn suggestions(
        &self,
        normalized_column: &str,
        word_column: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        if prefix.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {word_column} FROM dictionary_entries
             WHERE {normalized_column} LIKE ?1 ESCAPE '\\'
             GROUP BY {word_column}
             ORDER BY length({word_column}) ASC, {word_column} ASC
             LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![like_prefix(prefix), limit as i64], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<String>>>()
            .map_err(FreedictError::from)
    }

    /// A random stored entry, `None` when the store is empty.
    pub fn random_entry(&self) -> Result<Option<DictionaryEntry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM dictionary_entries ORDER BY RANDOM() LIMIT 1");
        self.conn
            .query_row(&sql, [], row_to_entry)
            .optional()
            .map_err(FreedictError::from)
    }
}

impl EntrySink for SqliteStore {
    fn delete_all_entries(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        clear_database_data(&tx)?;
        tx.commit()?;
        Ok(())
    }

    fn insert_entries(&mut self, entries: &[DictionaryEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let start = Instant::now();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(INSERT_ENTRY)?;
            for entry in entries {
                stmt.execute(params![
                    entry.english_word,
                    entry.german_word,
                    entry.direction.id(),
                    entry.word_type.map(word_type_to_string),
                    entry.gender.map(gender_to_string),
                    entry.gender_source.map(gender_source_to_string),
                    entry.plural_form,
                    entry.auxiliary_verb.map(auxiliary_verb_to_string),
                    entry.is_irregular,
                    entry.is_separable,
                    entry.comparative,
                    entry.superlative,
                    serde_json::to_string(&entry.additional_translations)?,
                    serde_json::to_string(&entry.examples)?,
                    entry.pronunciation_ipa,
                    entry.domain,
                    entry.raw_entry,
                    entry.english_normalized,
                    entry.german_normalized,
                    entry.word_length as i64,
                    entry.source,
                ])?;
            }
        } // stmt dropped before commit
        tx.commit()?;
        debug!(
            "Inserted batch of {} entries in {:?}",
            entries.len(),
            start.elapsed()
        );
        Ok(())
    }

    fn statistics_summary(&self) -> Result<DictionaryStatistics> {
        let stats = self.conn.query_row(STATISTICS_QUERY, [], |row| {
            let count = |idx: usize| row.get::<_, i64>(idx).map(|v| v as u64);
            Ok(DictionaryStatistics {
                total: count(0)?,
                nouns: count(1)?,
                verbs: count(2)?,
                adjectives: count(3)?,
                masculine: count(4)?,
                feminine: count(5)?,
                neuter: count(6)?,
                with_examples: count(7)?,
            })
        })?;
        Ok(stats)
    }

    fn store_size_bytes(&self) -> u64 {
        let Some(path) = &self.path else {
            return 0;
        };
        let mut wal = path.clone().into_os_string();
        wal.push("-wal");
        [path.clone(), PathBuf::from(wal)]
            .iter()
            .filter_map(|p| fs::metadata(p).ok())
            .map(|meta| meta.len())
            .sum()
    }
}

fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn conversion_error(idx: usize, e: FreedictError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn optional_enum<T>(
    row: &Row,
    idx: usize,
    convert: fn(&str) -> Result<T>,
) -> rusqlite::Result<Option<T>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|s| convert(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, e.into()))
}

// Column order follows ENTRY_COLUMNS.
fn row_to_entry(row: &Row) -> rusqlite::Result<DictionaryEntry> {
    let direction: String = row.get(2)?;
    let examples: Vec<Example> = json_column(row, 13)?;
    Ok(DictionaryEntry {
        english_word: row.get(0)?,
        german_word: row.get(1)?,
        direction: string_to_direction(&direction).map_err(|e| conversion_error(2, e))?,
        word_type: optional_enum(row, 3, string_to_word_type)?,
        gender: optional_enum(row, 4, string_to_gender)?,
        gender_source: optional_enum(row, 5, string_to_gender_source)?,
        plural_form: row.get(6)?,
        auxiliary_verb: optional_enum(row, 7, string_to_auxiliary_verb)?,
        is_irregular: row.get(8)?,
        is_separable: row.get(9)?,
        comparative: row.get(10)?,
        superlative: row.get(11)?,
        additional_translations: json_column(row, 12)?,
        examples,
        pronunciation_ipa: row.get(14)?,
        domain: row.get(15)?,
        raw_entry: row.get(16)?,
        english_normalized: row.get(17)?,
        german_normalized: row.get(18)?,
        word_length: row.get::<_, i64>(19)? as usize,
        source: row.get(20)?,
    })
}

// --- Enum to String Conversion Helpers ---

pub(crate) fn word_type_to_string(word_type: WordType) -> &'static str {
    match word_type {
        WordType::Noun => "NOUN",
        WordType::Verb => "VERB",
        WordType::Adjective => "ADJECTIVE",
        WordType::Adverb => "ADVERB",
        WordType::Pronoun => "PRONOUN",
        WordType::Preposition => "PREPOSITION",
        WordType::Conjunction => "CONJUNCTION",
        WordType::Interjection => "INTERJECTION",
        WordType::Phrase => "PHRASE",
    }
}

pub fn string_to_word_type(s: &str) -> Result<WordType> {
    match s {
        "NOUN" => Ok(WordType::Noun),
        "VERB" => Ok(WordType::Verb),
        "ADJECTIVE" => Ok(WordType::Adjective),
        "ADVERB" => Ok(WordType::Adverb),
        "PRONOUN" => Ok(WordType::Pronoun),
        "PREPOSITION" => Ok(WordType::Preposition),
        "CONJUNCTION" => Ok(WordType::Conjunction),
        "INTERJECTION" => Ok(WordType::Interjection),
        "PHRASE" => Ok(WordType::Phrase),
        _ => Err(FreedictError::ParseError(format!(
            "Invalid WordType string in DB: {}",
            s
        ))),
    }
}

pub(crate) fn gender_to_string(gender: Gender) -> &'static str {
    match gender {
        Gender::Masculine => "MASCULINE",
        Gender::Feminine => "FEMININE",
        Gender::Neuter => "NEUTER",
    }
}

pub fn string_to_gender(s: &str) -> Result<Gender> {
    match s {
        "MASCULINE" => Ok(Gender::Masculine),
        "FEMININE" => Ok(Gender::Feminine),
        "NEUTER" => Ok(Gender::Neuter),
        _ => Err(FreedictError::ParseError(format!(
            "Invalid Gender string in DB: {}",
            s
        ))),
    }
}

pub(crate) fn gender_source_to_string(source: GenderSource) -> &'static str {
    match source {
        GenderSource::ExplicitMarker => "EXPLICIT_MARKER",
        GenderSource::CommonWord => "COMMON_WORD",
        GenderSource::Detector => "DETECTOR",
        GenderSource::Extraction => "EXTRACTION",
    }
}

pub fn string_to_gender_source(s: &str) -> Result<GenderSource> {
    match s {
        "EXPLICIT_MARKER" => Ok(GenderSource::ExplicitMarker),
        "COMMON_WORD" => Ok(GenderSource::CommonWord),
        "DETECTOR" => Ok(GenderSource::Detector),
        "EXTRACTION" => Ok(GenderSource::Extraction),
        _ => Err(FreedictError::ParseError(format!(
            "Invalid GenderSource string in DB: {}",
            s
        ))),
    }
}

pub(crate) fn auxiliary_verb_to_string(aux: AuxiliaryVerb) -> &'static str {
    match aux {
        AuxiliaryVerb::Haben => "HABEN",
        AuxiliaryVerb::Sein => "SEIN",
    }
}

pub fn string_to_auxiliary_verb(s: &str) -> Result<AuxiliaryVerb> {
    match s {
        "HABEN" => Ok(AuxiliaryVerb::Haben),
        "SEIN" => Ok(AuxiliaryVerb::Sein),
        _ => Err(FreedictError::ParseError(format!(
            "Invalid AuxiliaryVerb string in DB: {}",
            s
        ))),
    }
}

pub fn string_to_direction(s: &str) -> Result<Direction> {
    Direction::ALL
        .into_iter()
        .find(|direction| direction.id() == s)
        .ok_or_else(|| {
            FreedictError::ParseError(format!("Invalid Direction string in DB: {}", s))
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::tempdir;

    pub(crate) fn sample_entry(
        english: &str,
        german: &str,
        word_type: Option<WordType>,
        gender: Option<Gender>,
    ) -> DictionaryEntry {
        DictionaryEntry {
            english_word: english.to_string(),
            german_word: german.to_string(),
            direction: Direction::EngDeu,
            word_type,
            gender,
            gender_source: gender.map(|_| GenderSource::CommonWord),
            plural_form: None,
            auxiliary_verb: None,
            is_irregular: false,
            is_separable: false,
            comparative: None,
            superlative: None,
            additional_translations: Vec::new(),
            examples: Vec::new(),
            pronunciation_ipa: None,
            domain: None,
            raw_entry: format!("{} {}", english, german),
            english_normalized: normalize_english(english),
            german_normalized: normalize_german(german),
            word_length: german.chars().count(),
            source: Direction::EngDeu.source_tag().to_string(),
        }
    }

    #[test]
    fn test_insert_and_read_back_all_fields() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut entry = sample_entry("go", "gehen", Some(WordType::Verb), None);
        entry.direction = Direction::DeuEng;
        entry.auxiliary_verb = Some(AuxiliaryVerb::Sein);
        entry.is_irregular = true;
        entry.additional_translations = vec!["walk".to_string()];
        entry.examples = vec![Example {
            source_text: "wir gehen nach Hause".to_string(),
            target_text: Some("we go home".to_string()),
        }];
        entry.pronunciation_ipa = Some("ˈɡeːən".to_string());
        store.insert_entries(&[entry.clone()]).unwrap();

        let found = store.search_german("gehen", 10).unwrap();
        assert_eq!(found, vec![entry]);
    }

    #[test]
    fn test_search_ranking() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_entries(&[
                sample_entry("house", "hausen", Some(WordType::Verb), None),
                sample_entry("household", "Haushalt", Some(WordType::Noun), Some(Gender::Masculine)),
                sample_entry("house", "Gebäude", Some(WordType::Noun), None),
                sample_entry("house", "Haus", Some(WordType::Noun), Some(Gender::Neuter)),
            ])
            .unwrap();

        let german: Vec<String> = store
            .search_english("House", 10)
            .unwrap()
            .into_iter()
            .map(|e| e.german_word)
            .collect();
        // Exact matches first, then nouns, gendered and shorter words.
        assert_eq!(german, vec!["Haus", "Gebäude", "hausen", "Haushalt"]);

        assert_eq!(store.search_english("hou", 2).unwrap().len(), 2);
        assert!(store.search_english("   ", 10).unwrap().is_empty());
    }

    #[test]
    fn test_search_german_keeps_umlauts_and_escapes_wildcards() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_entries(&[
                sample_entry("door", "Tür", Some(WordType::Noun), Some(Gender::Feminine)),
                sample_entry("tour", "Tour", Some(WordType::Noun), Some(Gender::Feminine)),
            ])
            .unwrap();
        let found = store.search_german("tü", 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].german_word, "Tür");
        assert!(store.search_german("t%", 10).unwrap().is_empty());
    }

    #[test]
    fn test_suggestions_are_distinct_and_shortest_first() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_entries(&[
                sample_entry("water", "Wasser", None, None),
                sample_entry("water", "gießen", None, None),
                sample_entry("waterfall", "Wasserfall", None, None),
                sample_entry("wave", "Welle", None, None),
            ])
            .unwrap();
        assert_eq!(
            store.english_suggestions("wa", 10).unwrap(),
            vec!["wave", "water", "waterfall"]
        );
        assert_eq!(
            store.german_suggestions("wasser", 10).unwrap(),
            vec!["Wasser", "Wasserfall"]
        );
    }

    #[test]
    fn test_statistics_and_delete_all() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut with_example = sample_entry("cat", "Katze", Some(WordType::Noun), Some(Gender::Feminine));
        with_example.examples.push(Example {
            source_text: "the cat sleeps all day".to_string(),
            target_text: None,
        });
        store
            .insert_entries(&[
                with_example,
                sample_entry("dog", "Hund", Some(WordType::Noun), Some(Gender::Masculine)),
                sample_entry("run", "laufen", Some(WordType::Verb), None),
                sample_entry("fast", "schnell", Some(WordType::Adjective), None),
            ])
            .unwrap();

        let stats = store.statistics_summary().unwrap();
        assert_eq!(
            stats,
            DictionaryStatistics {
                total: 4,
                nouns: 2,
                verbs: 1,
                adjectives: 1,
                masculine: 1,
                feminine: 1,
                neuter: 0,
                with_examples: 1,
            }
        );

        store.delete_all_entries().unwrap();
        assert_eq!(store.entry_count().unwrap(), 0);
        assert!(store.random_entry().unwrap().is_none());
        assert_eq!(store.store_size_bytes(), 0);
    }

    #[test]
    fn test_file_store_persists_and_reports_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("dict.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store
                .insert_entries(&[sample_entry("sun", "Sonne", Some(WordType::Noun), Some(Gender::Feminine))])
                .unwrap();
            assert!(store.store_size_bytes() > 0);
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.entry_count().unwrap(), 1);
        let random = store.random_entry().unwrap().unwrap();
        assert_eq!(random.german_word, "Sonne");
        let version: String = store
            .conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION.to_string());
    }

    #[test]
    fn test_enum_strings_round_trip() {
        for direction in Direction::ALL {
            assert_eq!(string_to_direction(direction.id()).unwrap(), direction);
        }
        assert_eq!(string_to_gender(gender_to_string(Gender::Neuter)).unwrap(), Gender::Neuter);
        assert!(string_to_word_type("noun").is_err());
    }
}
