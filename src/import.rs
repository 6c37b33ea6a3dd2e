//! Two-direction dictionary import.
//!
//! Each index location is read from the decompressed body, parsed, run through
//! grammar and gender resolution and turned into one [`DictionaryEntry`] per
//! translation. Entries are flushed to an [`EntrySink`] in batches; a failed
//! batch is counted and skipped, never fatal.

use crate::data::{DictFile, DictionaryPaths};
use crate::db::EntrySink;
use crate::error::{FreedictError, Result};
use crate::gender::{GenderChain, GenderInput};
use crate::grammar::GrammarExtractor;
use crate::index::DictdIndex;
use crate::models::{DictionaryEntry, Direction, IndexLocation, ParsedEntry, WordType};
use crate::normalize::{normalize_english, normalize_german, truncate_chars};
use crate::parse;
use crate::progress::{
    ErrorLog, ImportPhase, ImportProgress, ImportResult, MAX_RETAINED_ERRORS, ProgressReporter,
    report_progress_async,
};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BATCH_SIZE: usize = 500;
/// Characters of cleaned entry text kept in [`DictionaryEntry::raw_entry`].
pub const RAW_ENTRY_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Records per insert transaction.
    pub batch_size: usize,
    /// Delete stored entries before importing (full replace).
    pub clear_existing: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            batch_size: DEFAULT_BATCH_SIZE,
            clear_existing: true,
        }
    }
}

/// Body and index of one direction.
#[derive(Debug, Clone)]
pub struct DirectionSource {
    pub direction: Direction,
    pub dict: Arc<DictFile>,
    pub index_path: PathBuf,
}

impl DirectionSource {
    pub fn new(direction: Direction, dict: Arc<DictFile>, index_path: impl Into<PathBuf>) -> Self {
        DirectionSource {
            direction,
            dict,
            index_path: index_path.into(),
        }
    }

    pub fn from_paths(paths: &DictionaryPaths) -> Self {
        Self::new(
            paths.direction,
            Arc::new(DictFile::from_paths(paths)),
            &paths.index,
        )
    }

    fn check_exists(&self) -> Result<()> {
        for path in [self.dict.source_path(), self.index_path.as_path()] {
            if !path.is_file() {
                return Err(FreedictError::DataFileNotFound(path.display().to_string()));
            }
        }
        Ok(())
    }
}

/// Drives the import of all configured directions into a sink.
pub struct DictionaryImporter {
    sources: Vec<DirectionSource>,
    options: ImportOptions,
    grammar: GrammarExtractor,
    gender_chain: GenderChain,
}

// Mutable bookkeeping of one run.
struct RunState<'a> {
    reporter: Option<&'a ProgressReporter>,
    progress: ImportProgress,
    errors: ErrorLog,
    inserted_records: u64,
}

impl RunState<'_> {
    async fn enter(&mut self, phase: ImportPhase, direction: Option<Direction>, message: String) {
        info!("{}", message);
        self.progress.phase = phase;
        self.progress.direction = direction;
        self.progress.message = message;
        self.report().await;
    }

    async fn report(&self) {
        if let Some(reporter) = self.reporter {
            report_progress_async(reporter, self.progress.clone()).await;
        }
    }

    fn fail_entry(&mut self, message: String) {
        debug!("{}", message);
        self.progress.processed_entries += 1;
        self.progress.failed_entries += 1;
        self.errors.push(message);
    }
}

// Records waiting for the next flush and the locations they came from.
#[derive(Default)]
struct PendingBatch {
    entries: Vec<DictionaryEntry>,
    locations: u64,
}

impl DictionaryImporter {
    pub fn new(sources: Vec<DirectionSource>, options: ImportOptions) -> Self {
        DictionaryImporter {
            sources,
            options,
            grammar: GrammarExtractor::new(),
            gender_chain: GenderChain::standard(),
        }
    }

    /// Importer for both FreeDict directions in their standard layout.
    pub fn from_dirs(data_dir: &Path, cache_dir: &Path, options: ImportOptions) -> Self {
        let sources = DictionaryPaths::all(data_dir, cache_dir)
            .iter()
            .map(DirectionSource::from_paths)
            .collect();
        Self::new(sources, options)
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    pub fn sources(&self) -> &[DirectionSource] {
        &self.sources
    }

    /// Runs the whole import and summarizes it.
    ///
    /// Never returns an error: fatal problems end the run in the ERROR phase
    /// and are reported as the first message of [`ImportResult::errors`].
    pub async fn run<S: EntrySink>(
        &self,
        sink: &mut S,
        reporter: Option<ProgressReporter>,
        cancel: CancellationToken,
    ) -> ImportResult {
        let start = Instant::now();
        let mut state = RunState {
            reporter: reporter.as_ref(),
            progress: ImportProgress::new(ImportPhase::Initializing, ""),
            errors: ErrorLog::new(),
            inserted_records: 0,
        };

        let outcome = self.execute(sink, &mut state, &cancel).await;

        let cancelled = matches!(outcome, Err(FreedictError::Cancelled));
        let fatal = match &outcome {
            Ok(()) => None,
            Err(FreedictError::Cancelled) => {
                warn!("Import cancelled after {} entries", state.progress.processed_entries);
                state
                    .enter(ImportPhase::Error, None, "Import cancelled".to_string())
                    .await;
                None
            }
            Err(e) => {
                error!("Import failed: {}", e);
                state
                    .enter(ImportPhase::Error, None, format!("Import failed: {}", e))
                    .await;
                Some(e.to_string())
            }
        };

        let progress = &state.progress;
        let (total_entries, successful_entries, failed_entries) = (
            progress.total_entries,
            progress.successful_entries,
            progress.failed_entries,
        );
        let mut errors = state.errors.into_messages();
        if let Some(message) = fatal {
            errors.insert(0, message);
            errors.truncate(MAX_RETAINED_ERRORS);
        }

        ImportResult {
            success: outcome.is_ok(),
            cancelled,
            total_entries,
            successful_entries,
            failed_entries,
            inserted_records: state.inserted_records,
            duration_ms: start.elapsed().as_millis() as u64,
            errors,
            resulting_store_size_bytes: sink.store_size_bytes(),
        }
    }

    async fn execute<S: EntrySink>(
        &self,
        sink: &mut S,
        state: &mut RunState<'_>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if self.options.batch_size == 0 {
            return Err(FreedictError::InvalidArgument(
                "batch size must be at least 1".to_string(),
            ));
        }

        state
            .enter(
                ImportPhase::Initializing,
                None,
                format!("Preparing import of {} dictionaries", self.sources.len()),
            )
            .await;
        for source in &self.sources {
            source.check_exists()?;
        }

        for source in &self.sources {
            check_cancelled(cancel)?;
            state
                .enter(
                    ImportPhase::Decompressing,
                    Some(source.direction),
                    format!("Decompressing {} dictionary", source.direction),
                )
                .await;
            let outcome = source.dict.ensure_ready().await?;
            debug!("{}: {:?}", source.direction, outcome);
        }

        let mut indexes = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            check_cancelled(cancel)?;
            state
                .enter(
                    ImportPhase::ParsingIndex,
                    Some(source.direction),
                    format!("Parsing {} index", source.direction),
                )
                .await;
            let index = DictdIndex::load(source.index_path.clone()).await?;
            state.progress.total_entries += (index.len() + index.malformed_lines().len()) as u64;
            indexes.push(index);
        }

        let locations: u64 = indexes.iter().map(|index| index.len() as u64).sum();
        // One record per location; grows in `flush` when entries expand into several.
        state.progress.total_batches = locations.div_ceil(self.options.batch_size as u64);

        // Malformed index lines are entries that can never be imported.
        for index in &indexes {
            for message in index.malformed_lines() {
                state.fail_entry(message.clone());
            }
        }

        if self.options.clear_existing {
            info!("Clearing existing entries before import");
            sink.delete_all_entries()?;
        }

        for (source, index) in self.sources.iter().zip(&indexes) {
            check_cancelled(cancel)?;
            state
                .enter(
                    ImportPhase::ImportingEntries,
                    Some(source.direction),
                    format!(
                        "Importing {} entries from {}",
                        index.len(),
                        source.direction
                    ),
                )
                .await;
            self.import_direction(sink, state, cancel, source, index)
                .await?;
        }

        state
            .enter(
                ImportPhase::Finalizing,
                None,
                "Collecting statistics".to_string(),
            )
            .await;
        match sink.statistics_summary() {
            Ok(stats) => info!(
                "Store holds {} entries ({} nouns, {} verbs, {} adjectives)",
                stats.total, stats.nouns, stats.verbs, stats.adjectives
            ),
            Err(e) => warn!("Could not read store statistics: {}", e),
        }

        let message = format!(
            "Imported {} of {} entries ({} failed)",
            state.progress.successful_entries,
            state.progress.total_entries,
            state.progress.failed_entries
        );
        state.enter(ImportPhase::Completed, None, message).await;
        Ok(())
    }

    async fn import_direction<S: EntrySink>(
        &self,
        sink: &mut S,
        state: &mut RunState<'_>,
        cancel: &CancellationToken,
        source: &DirectionSource,
        index: &DictdIndex,
    ) -> Result<()> {
        let mut pending = PendingBatch::default();

        for location in index.locations() {
            // An unflushed batch is dropped on cancellation.
            check_cancelled(cancel)?;

            match self.process_location(source, location) {
                Ok(entries) => {
                    pending.entries.extend(entries);
                    pending.locations += 1;
                }
                Err(message) => state.fail_entry(message),
            }

            if pending.entries.len() >= self.options.batch_size {
                self.flush(sink, state, &mut pending).await;
                tokio::task::yield_now().await;
                check_cancelled(cancel)?;
            }
        }

        if pending.locations > 0 {
            self.flush(sink, state, &mut pending).await;
            tokio::task::yield_now().await;
        }
        Ok(())
    }

    async fn flush<S: EntrySink>(
        &self,
        sink: &mut S,
        state: &mut RunState<'_>,
        pending: &mut PendingBatch,
    ) {
        state.progress.current_batch += 1;
        let batch = state.progress.current_batch;
        state.progress.total_batches = state.progress.total_batches.max(batch);
        match sink.insert_entries(&pending.entries) {
            Ok(()) => {
                state.progress.successful_entries += pending.locations;
                state.inserted_records += pending.entries.len() as u64;
            }
            Err(e) => {
                warn!(
                    "Batch {} ({} records) failed to insert: {}",
                    batch,
                    pending.entries.len(),
                    e
                );
                state.progress.failed_entries += pending.locations;
                state.errors.push(format!(
                    "Batch {} insert failed ({} entries): {}",
                    batch, pending.locations, e
                ));
            }
        }
        state.progress.processed_entries += pending.locations;
        state.progress.message = format!(
            "Processed {} of {} entries",
            state.progress.processed_entries, state.progress.total_entries
        );
        state.report().await;

        pending.entries.clear();
        pending.locations = 0;
    }

    fn process_location(
        &self,
        source: &DirectionSource,
        location: &IndexLocation,
    ) -> std::result::Result<Vec<DictionaryEntry>, String> {
        let raw = source
            .dict
            .read_block(location.byte_offset, location.byte_length)
            .map_err(|e| format!("Failed to read entry '{}': {}", location.headword, e))?;
        if raw.trim().is_empty() {
            return Err(format!(
                "Empty entry block for '{}' at offset {}",
                location.headword, location.byte_offset
            ));
        }

        let parsed = parse::parse(&location.headword, &raw);
        if parsed.translations.is_empty() {
            return Err(format!("No translations found for '{}'", location.headword));
        }
        Ok(self.build_entries(source.direction, &parsed))
    }

    /// One entry per translation of `parsed`.
    ///
    /// The German word is the translation for `eng-deu` and the headword for
    /// `deu-eng`. A gender marked on the German side always wins; otherwise
    /// nouns go through the gender chain.
    pub fn build_entries(&self, direction: Direction, parsed: &ParsedEntry) -> Vec<DictionaryEntry> {
        let headword = parsed.headword.trim();
        let raw_entry = truncate_chars(&parsed.raw_text, RAW_ENTRY_MAX_CHARS).to_string();
        // In deu-eng the whole entry describes the headword.
        let (headword_gender, chain_context) = match direction {
            Direction::EngDeu => (None, ""),
            Direction::DeuEng => (parse::explicit_gender(&parsed.raw_text), parsed.raw_text.as_str()),
        };

        parsed
            .translations
            .iter()
            .map(|translation| {
                let (english, german) = match direction {
                    Direction::EngDeu => (headword, translation.word.as_str()),
                    Direction::DeuEng => (translation.word.as_str(), headword),
                };
                let explicit = match direction {
                    Direction::EngDeu => translation.gender,
                    Direction::DeuEng => headword_gender.or(translation.gender),
                };

                let info = self.grammar.extract(
                    german,
                    english,
                    &parsed.raw_text,
                    &parsed.part_of_speech_tags,
                );
                let word_type = info.word_type.or(explicit.map(|_| WordType::Noun));
                let resolution = if explicit.is_some() || word_type == Some(WordType::Noun) {
                    self.gender_chain.resolve(&GenderInput {
                        german_word: german,
                        context: chain_context,
                        explicit,
                        extracted: info.gender,
                    })
                } else {
                    None
                };

                let additional_translations = parsed
                    .translations
                    .iter()
                    .filter(|other| other.word != translation.word)
                    .map(|other| other.word.clone())
                    .collect();

                DictionaryEntry {
                    english_word: english.to_string(),
                    german_word: german.to_string(),
                    direction,
                    word_type,
                    gender: resolution.map(|r| r.gender),
                    gender_source: resolution.map(|r| r.source),
                    plural_form: info.plural_form,
                    auxiliary_verb: info.auxiliary_verb,
                    is_irregular: info.is_irregular,
                    is_separable: info.is_separable,
                    comparative: info.comparative,
                    superlative: info.superlative,
                    additional_translations,
                    examples: parsed.examples.clone(),
                    pronunciation_ipa: parsed.pronunciation_ipa.clone(),
                    domain: translation
                        .domain
                        .clone()
                        .or_else(|| parsed.domain_labels.first().cloned()),
                    raw_entry: raw_entry.clone(),
                    english_normalized: normalize_english(english),
                    german_normalized: normalize_german(german),
                    word_length: german.chars().count(),
                    source: direction.source_tag().to_string(),
                }
            })
            .collect()
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(FreedictError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use crate::data::tests::create_gz;
    use crate::db::SqliteStore;
    use crate::models::{Gender, GenderSource};
    use crate::progress::progress_channel;
    use std::fs;
    use tempfile::tempdir;

    fn importer() -> DictionaryImporter {
        DictionaryImporter::new(Vec::new(), ImportOptions::default())
    }

    // Writes a body + index pair and returns its source.
    fn write_dictionary(
        dir: &Path,
        direction: Direction,
        entries: &[(&str, &str)],
    ) -> DirectionSource {
        let mut body = String::new();
        let mut index = String::from("00databaseinfo\tA\tB\n");
        for (headword, text) in entries {
            let offset = body.len() as u64;
            body.push_str(text);
            body.push('\n');
            index.push_str(&format!(
                "{}\t{}\t{}\n",
                headword,
                encode(offset),
                encode(text.len() as u64)
            ));
        }
        let id = direction.id();
        let dz = dir.join(format!("{id}.dict.dz"));
        create_gz(&dz, body.as_bytes()).unwrap();
        let index_path = dir.join(format!("{id}.index"));
        fs::write(&index_path, index).unwrap();
        DirectionSource::new(
            direction,
            Arc::new(DictFile::new(dz, dir.join(format!("{id}.dict")))),
            index_path,
        )
    }

    #[test]
    fn test_forward_entries_use_translation_gender() {
        let parsed = parse::parse("house", "house /haʊs/\n<n> das Haus; Gebäude {n}; Heim");
        let entries = importer().build_entries(Direction::EngDeu, &parsed);

        let words: Vec<&str> = entries.iter().map(|e| e.german_word.as_str()).collect();
        assert_eq!(words, vec!["Haus", "Gebäude", "Heim"]);

        let haus = &entries[0];
        assert_eq!(haus.english_word, "house");
        assert_eq!(haus.word_type, Some(WordType::Noun));
        assert_eq!(haus.gender, Some(Gender::Neuter));
        assert_eq!(haus.gender_source, Some(GenderSource::ExplicitMarker));
        assert_eq!(haus.pronunciation_ipa.as_deref(), Some("haʊs"));
        assert_eq!(haus.additional_translations, vec!["Gebäude", "Heim"]);
        assert_eq!(haus.source, "FreeDict eng-deu");
        assert_eq!(haus.word_length, 4);

        assert_eq!(entries[1].gender, Some(Gender::Neuter));
        assert_eq!(entries[1].german_normalized, "gebäude");
        assert_eq!(entries[1].english_normalized, "house");
    }

    #[test]
    fn test_forward_marker_does_not_leak_between_translations() {
        let parsed = parse::parse("bench", "<n> Bank {f}; Sitz");
        let entries = importer().build_entries(Direction::EngDeu, &parsed);
        assert_eq!(entries[0].gender, Some(Gender::Feminine));
        assert_eq!(entries[0].gender_source, Some(GenderSource::ExplicitMarker));
        // The marker belongs to the "Bank" segment only.
        assert_ne!(entries[1].gender_source, Some(GenderSource::ExplicitMarker));
    }

    #[test]
    fn test_reverse_entries_prefer_headword_marker() {
        let parsed = parse::parse("See", "<masc> lake; sea");
        let entries = importer().build_entries(Direction::DeuEng, &parsed);
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            assert_eq!(entry.german_word, "See");
            assert_eq!(entry.gender, Some(Gender::Masculine));
            assert_eq!(entry.gender_source, Some(GenderSource::ExplicitMarker));
            assert_eq!(entry.direction, Direction::DeuEng);
        }
        assert_eq!(entries[1].english_word, "sea");
    }

    #[test]
    fn test_common_word_beats_detector() {
        let parsed = parse::parse("Mädchen", "girl");
        let entries = importer().build_entries(Direction::DeuEng, &parsed);
        assert_eq!(entries[0].word_type, Some(WordType::Noun));
        assert_eq!(entries[0].gender, Some(Gender::Neuter));
        assert_eq!(entries[0].gender_source, Some(GenderSource::CommonWord));
    }

    #[test]
    fn test_non_nouns_get_no_gender() {
        let parsed = parse::parse("laufen", "<verb> run; walk");
        let entries = importer().build_entries(Direction::DeuEng, &parsed);
        assert!(entries.iter().all(|e| e.word_type == Some(WordType::Verb)));
        assert!(entries.iter().all(|e| e.gender.is_none() && e.gender_source.is_none()));
    }

    #[tokio::test]
    async fn test_run_reports_phases_in_order() {
        let dir = tempdir().unwrap();
        let source = write_dictionary(
            dir.path(),
            Direction::DeuEng,
            &[("Hund", "<masc> dog; hound"), ("Katze", "<fem> cat"), ("leer", "")],
        );
        let importer = DictionaryImporter::new(
            vec![source],
            ImportOptions {
                batch_size: 2,
                clear_existing: true,
            },
        );
        let mut store = SqliteStore::open_in_memory().unwrap();
        let (tx, mut rx) = progress_channel(64);

        let result = importer
            .run(&mut store, Some(tx), CancellationToken::new())
            .await;

        assert!(result.success);
        assert!(!result.cancelled);
        assert_eq!(result.total_entries, 3);
        assert_eq!(result.successful_entries, 2);
        assert_eq!(result.failed_entries, 1);
        assert_eq!(result.inserted_records, 3);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.resulting_store_size_bytes, 0);
        assert_eq!(store.entry_count().unwrap(), 3);

        let mut phases = Vec::new();
        while let Ok(update) = rx.try_recv() {
            if phases.last() != Some(&update.phase) {
                phases.push(update.phase);
            }
        }
        assert_eq!(
            phases,
            vec![
                ImportPhase::Initializing,
                ImportPhase::Decompressing,
                ImportPhase::ParsingIndex,
                ImportPhase::ImportingEntries,
                ImportPhase::Finalizing,
                ImportPhase::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_batch_counter_never_exceeds_total() {
        let dir = tempdir().unwrap();
        let source = write_dictionary(
            dir.path(),
            Direction::DeuEng,
            &[
                ("Haus", "house; home; building"),
                ("Hund", "dog; hound; cur"),
                ("Katze", "cat; puss; feline"),
            ],
        );
        let importer = DictionaryImporter::new(
            vec![source],
            ImportOptions {
                batch_size: 2,
                clear_existing: true,
            },
        );
        let mut store = SqliteStore::open_in_memory().unwrap();
        let (tx, mut rx) = progress_channel(64);

        let result = importer
            .run(&mut store, Some(tx), CancellationToken::new())
            .await;
        assert!(result.success);
        assert_eq!(result.inserted_records, 9);

        let mut last_batch = 0;
        while let Ok(update) = rx.try_recv() {
            assert!(
                update.current_batch <= update.total_batches,
                "batch {} of {}",
                update.current_batch,
                update.total_batches
            );
            last_batch = update.current_batch;
        }
        // Every location fills a batch on its own.
        assert_eq!(last_batch, 3);
    }

    #[tokio::test]
    async fn test_missing_files_end_in_error_phase() {
        let dir = tempdir().unwrap();
        let importer = DictionaryImporter::from_dirs(dir.path(), dir.path(), ImportOptions::default());
        let mut store = SqliteStore::open_in_memory().unwrap();
        let (tx, mut rx) = progress_channel(16);

        let result = importer.run(&mut store, Some(tx), CancellationToken::new()).await;

        assert!(!result.success);
        assert!(!result.cancelled);
        assert!(result.errors[0].contains("not found"));
        let mut last = None;
        while let Ok(update) = rx.try_recv() {
            last = Some(update.phase);
        }
        assert_eq!(last, Some(ImportPhase::Error));
    }

    #[tokio::test]
    async fn test_keep_existing_entries() {
        let dir = tempdir().unwrap();
        let source = write_dictionary(dir.path(), Direction::EngDeu, &[("dog", "<n> Hund")]);
        let importer = DictionaryImporter::new(
            vec![source],
            ImportOptions {
                batch_size: 10,
                clear_existing: false,
            },
        );
        let mut store = SqliteStore::open_in_memory().unwrap();

        importer.run(&mut store, None, CancellationToken::new()).await;
        importer.run(&mut store, None, CancellationToken::new()).await;
        assert_eq!(store.entry_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_imports_nothing() {
        let dir = tempdir().unwrap();
        let source = write_dictionary(dir.path(), Direction::EngDeu, &[("dog", "<n> Hund")]);
        let importer = DictionaryImporter::new(vec![source], ImportOptions::default());
        let mut store = SqliteStore::open_in_memory().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = importer.run(&mut store, None, cancel).await;
        assert!(result.cancelled);
        assert!(!result.success);
        assert_eq!(store.entry_count().unwrap(), 0);
    }
}
