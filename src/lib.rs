// Declare modules
pub mod codec;
pub mod data;
pub mod db;
pub mod error;
pub mod gender;
pub mod grammar;
pub mod import;
pub mod index;
pub mod models;
pub mod normalize;
pub mod parse;
pub mod progress;
pub mod reader;

// Re-export key types for easier use
pub use data::{DictFile, DictionaryPaths};
pub use db::{EntrySink, SqliteStore};
pub use error::{FreedictError, Result};
pub use import::{DictionaryImporter, DirectionSource, ImportOptions};
pub use index::DictdIndex;
pub use models::{
    AuxiliaryVerb,
    DictionaryEntry,
    DictionaryStatistics,
    Direction,
    Example,
    Gender,
    GenderSource,
    GrammarInfo,
    IndexLocation,
    ParsedEntry,
    Translation,
    WordType,
};
pub use progress::{ImportPhase, ImportProgress, ImportResult, ProgressReporter, progress_channel};
pub use reader::DictdReader;

use directories_next::ProjectDirs;
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// Where the dictionary lives on disk.
#[derive(Debug, Default, Clone)]
pub struct LoadOptions {
    /// Optional path to a specific database file to use or create.
    /// If None, the default location based on ProjectDirs will be used.
    pub db_path: Option<PathBuf>,
    /// Directory holding the `freedict-*.dictd` folders.
    pub data_dir: Option<PathBuf>,
    /// Directory for decompressed dictionary bodies.
    pub cache_dir: Option<PathBuf>,
}

/// The main dictionary interface: imports FreeDict data into SQLite and
/// answers lookups from it.
pub struct FreedictDictionary {
    store: Mutex<SqliteStore>,
    db_file_path: PathBuf,
    data_dir: PathBuf,
    cache_dir: PathBuf,
}

impl FreedictDictionary {
    /// Opens (or creates) the dictionary database. Does not import anything.
    pub fn open(options: LoadOptions) -> Result<Self> {
        let db_path = match options.db_path {
            Some(path) => path,
            None => Self::default_db_path()?,
        };
        let data_dir = match options.data_dir {
            Some(dir) => dir,
            None => data::get_data_dir()?,
        };
        let cache_dir = match options.cache_dir {
            Some(dir) => dir,
            None => data::get_cache_dir()?,
        };
        info!("Using database at: {:?}", db_path);
        info!("Dictionary data directory: {:?}", data_dir);

        let store = SqliteStore::open(&db_path)?;
        Ok(FreedictDictionary {
            store: Mutex::new(store),
            db_file_path: db_path,
            data_dir,
            cache_dir,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_file_path
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// File layout of one direction under this dictionary's directories.
    pub fn paths(&self, direction: Direction) -> DictionaryPaths {
        DictionaryPaths::for_direction(direction, &self.data_dir, &self.cache_dir)
    }

    fn store(&self) -> Result<MutexGuard<'_, SqliteStore>> {
        self.store
            .lock()
            .map_err(|_| FreedictError::Internal("Mutex poisoned".to_string()))
    }

    /// Imports both directions into the database.
    ///
    /// Fatal problems are reported through [`ImportResult::success`]; the
    /// outer `Result` only fails when the store itself is unusable.
    pub async fn import(
        &mut self,
        options: ImportOptions,
        reporter: Option<ProgressReporter>,
        cancel: CancellationToken,
    ) -> Result<ImportResult> {
        let importer = DictionaryImporter::from_dirs(&self.data_dir, &self.cache_dir, options);
        let store = self
            .store
            .get_mut()
            .map_err(|_| FreedictError::Internal("Mutex poisoned".to_string()))?;
        Ok(importer.run(store, reporter, cancel).await)
    }

    /// A reader that looks words up directly in the dictd files of `direction`.
    pub fn reader(&self, direction: Direction) -> DictdReader {
        DictdReader::from_paths(&self.paths(direction))
    }

    // --- Query Methods ---

    /// Entries for an English word or prefix, best match first.
    pub fn lookup_english(&self, word: &str, limit: usize) -> Result<Vec<DictionaryEntry>> {
        self.store()?.search_english(word, limit)
    }

    /// Entries for a German word or prefix, best match first.
    pub fn lookup_german(&self, word: &str, limit: usize) -> Result<Vec<DictionaryEntry>> {
        self.store()?.search_german(word, limit)
    }

    pub fn suggest_english(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        self.store()?.english_suggestions(prefix, limit)
    }

    pub fn suggest_german(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        self.store()?.german_suggestions(prefix, limit)
    }

    pub fn random_entry(&self) -> Result<Option<DictionaryEntry>> {
        self.store()?.random_entry()
    }

    pub fn statistics(&self) -> Result<DictionaryStatistics> {
        self.store()?.statistics_summary()
    }

    pub fn store_size_bytes(&self) -> Result<u64> {
        Ok(self.store()?.store_size_bytes())
    }

    /// Deletes all imported entries and the decompressed caches of both directions.
    pub fn clear_dictionary(&self) -> Result<()> {
        self.store()?.delete_all_entries()?;
        for direction in Direction::ALL {
            DictFile::from_paths(&self.paths(direction)).clear_cache()?;
        }
        info!("Dictionary entries and caches cleared");
        Ok(())
    }

    /// Gets the default path for the SQLite database file.
    pub fn default_db_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("org", "FreedictRs", data::FREEDICT_SUBDIR)
            .ok_or(FreedictError::DataDirNotFound)?;
        let data_dir = project_dirs.data_dir();
        fs::create_dir_all(data_dir)?;
        let db_filename = format!("freedict-{}.db", data::FREEDICT_VERSION);
        Ok(data_dir.join(db_filename))
    }

    /// Deletes the decompressed bodies in `cache_dir` (the default cache
    /// directory when `None`).
    pub fn clear_cache_files(cache_dir: Option<PathBuf>) -> Result<()> {
        let cache_dir = match cache_dir {
            Some(dir) => dir,
            None => data::get_cache_dir()?,
        };
        for direction in Direction::ALL {
            // Only the cache path matters for clearing.
            let paths = DictionaryPaths::for_direction(direction, &cache_dir, &cache_dir);
            DictFile::from_paths(&paths).clear_cache()?;
        }
        Ok(())
    }

    /// Clears the dictionary database file(s).
    ///
    /// If `db_path_override` is `Some`, it attempts to delete that specific file.
    /// If `db_path_override` is `None`, it calculates the default database path and attempts to delete that file.
    pub fn clear_database(db_path_override: Option<PathBuf>) -> Result<()> {
        let path_to_clear = match db_path_override {
            Some(path) => {
                info!("Attempting to clear specified database file: {:?}", path);
                path
            }
            None => {
                let default_path = Self::default_db_path()?;
                info!("Attempting to clear default database file: {:?}", default_path);
                default_path
            }
        };

        if path_to_clear.exists() {
            match fs::remove_file(&path_to_clear) {
                Ok(_) => {
                    info!("Successfully deleted database file: {:?}", path_to_clear);
                    // WAL and SHM files are recreated on next open
                    for suffix in ["-wal", "-shm"] {
                        let mut side_file = path_to_clear.clone().into_os_string();
                        side_file.push(suffix);
                        let _ = fs::remove_file(PathBuf::from(side_file));
                    }
                    Ok(())
                }
                Err(e) => {
                    error!("Failed to delete database file {:?}: {}", path_to_clear, e);
                    Err(FreedictError::Io(e))
                }
            }
        } else {
            info!(
                "Database file not found, nothing to clear: {:?}",
                path_to_clear
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use crate::data::tests::create_gz;
    use tempfile::tempdir;

    fn write_direction(paths: &DictionaryPaths, entries: &[(&str, &str)]) {
        let mut body = String::new();
        let mut index = String::new();
        for (headword, text) in entries {
            index.push_str(&format!(
                "{}\t{}\t{}\n",
                headword,
                encode(body.len() as u64),
                encode(text.len() as u64)
            ));
            body.push_str(text);
            body.push('\n');
        }
        fs::create_dir_all(paths.index.parent().unwrap()).unwrap();
        create_gz(&paths.dict_dz, body.as_bytes()).unwrap();
        fs::write(&paths.index, index).unwrap();
    }

    fn open_in(dir: &Path) -> FreedictDictionary {
        FreedictDictionary::open(LoadOptions {
            db_path: Some(dir.join("db").join("freedict.db")),
            data_dir: Some(dir.join("data")),
            cache_dir: Some(dir.join("cache")),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_import_then_query() {
        let dir = tempdir().unwrap();
        let mut dictionary = open_in(dir.path());
        write_direction(
            &dictionary.paths(Direction::EngDeu),
            &[("cat", "<n> die Katze"), ("dog", "<n> der Hund; Rüde")],
        );
        write_direction(
            &dictionary.paths(Direction::DeuEng),
            &[("Katze", "<fem> cat"), ("laufen", "<verb> run")],
        );

        let result = dictionary
            .import(ImportOptions::default(), None, CancellationToken::new())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.total_entries, 4);
        assert_eq!(result.successful_entries, 4);
        assert_eq!(result.inserted_records, 5);
        assert!(result.resulting_store_size_bytes > 0);

        let cats = dictionary.lookup_english("cat", 10).unwrap();
        assert_eq!(cats.len(), 2);
        assert!(cats.iter().all(|e| e.german_word == "Katze"));
        assert!(cats.iter().all(|e| e.gender == Some(Gender::Feminine)));

        let hund = dictionary.lookup_german("hund", 10).unwrap();
        assert_eq!(hund[0].english_word, "dog");
        assert_eq!(hund[0].additional_translations, vec!["Rüde"]);

        assert_eq!(dictionary.suggest_german("ka", 5).unwrap(), vec!["Katze"]);
        assert_eq!(dictionary.suggest_english("r", 5).unwrap(), vec!["run"]);

        let stats = dictionary.statistics().unwrap();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.verbs, 1);
        assert!(dictionary.random_entry().unwrap().is_some());

        let reader = dictionary.reader(Direction::DeuEng);
        let katze = reader.lookup_exact("katze").await.unwrap().unwrap();
        assert_eq!(katze.translations[0].word, "cat");

        dictionary.clear_dictionary().unwrap();
        assert_eq!(dictionary.statistics().unwrap().total, 0);
        assert!(!DictFile::from_paths(&dictionary.paths(Direction::EngDeu)).is_ready());
    }

    #[test]
    fn test_clear_database_removes_file() {
        let dir = tempdir().unwrap();
        let db_path = {
            let dictionary = open_in(dir.path());
            dictionary.db_path().to_path_buf()
        };
        assert!(db_path.exists());
        FreedictDictionary::clear_database(Some(db_path.clone())).unwrap();
        assert!(!db_path.exists());
        // Clearing a missing file is not an error.
        FreedictDictionary::clear_database(Some(db_path)).unwrap();
    }

    #[tokio::test]
    async fn test_clear_cache_files() {
        let dir = tempdir().unwrap();
        let dictionary = open_in(dir.path());
        let paths = dictionary.paths(Direction::EngDeu);
        write_direction(&paths, &[("cat", "Katze")]);
        let file = std::sync::Arc::new(DictFile::from_paths(&paths));
        file.ensure_ready().await.unwrap();
        assert!(file.is_ready());

        FreedictDictionary::clear_cache_files(Some(dir.path().join("cache"))).unwrap();
        assert!(!file.is_ready());
    }
}
