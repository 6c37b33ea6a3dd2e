//! Dictionary file management.
//!
//! FreeDict ships each direction as a gzip-compressed `.dict.dz` body plus a
//! plain `.index`. The body is decompressed once into a cache file and then
//! served through random-access block reads.

use crate::error::{FreedictError, Result};
use crate::models::Direction;
use directories_next::ProjectDirs;
use flate2::read::GzDecoder;
use log::{debug, info};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// FreeDict release the asset layout refers to
pub const FREEDICT_VERSION: &str = "1.9-fd1";
/// Subdirectory name within user's data and cache directories
pub const FREEDICT_SUBDIR: &str = "freedict-rs";
/// Largest block a single index location may request.
pub const MAX_BLOCK_BYTES: u32 = 1024 * 1024;

const BUFFER_SIZE: usize = 8192;
const LOG_EVERY_BYTES: u64 = 1024 * 1024;

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("org", "FreedictRs", FREEDICT_SUBDIR).ok_or(FreedictError::DataDirNotFound)
}

/// Gets the project's data directory path.
/// Creates the directory if it doesn't exist.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = project_dirs()?.data_dir().to_path_buf();
    fs::create_dir_all(&data_dir)?;
    Ok(data_dir)
}

/// Gets the directory holding decompressed dictionary bodies.
pub fn get_cache_dir() -> Result<PathBuf> {
    let cache_dir = project_dirs()?.cache_dir().to_path_buf();
    fs::create_dir_all(&cache_dir)?;
    Ok(cache_dir)
}

/// Where the files of one direction live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryPaths {
    pub direction: Direction,
    pub dict_dz: PathBuf,
    pub index: PathBuf,
    pub cache: PathBuf,
}

impl DictionaryPaths {
    /// Standard FreeDict layout, e.g.
    /// `freedict-eng-deu-1.9-fd1.dictd/eng-deu/eng-deu.dict.dz`.
    pub fn for_direction(direction: Direction, data_dir: &Path, cache_dir: &Path) -> Self {
        let id = direction.id();
        let dir = data_dir
            .join(format!("freedict-{}-{}.dictd", id, FREEDICT_VERSION))
            .join(id);
        DictionaryPaths {
            direction,
            dict_dz: dir.join(format!("{}.dict.dz", id)),
            index: dir.join(format!("{}.index", id)),
            cache: cache_dir.join(format!("{}.dict", id)),
        }
    }

    /// Both directions, forward first.
    pub fn all(data_dir: &Path, cache_dir: &Path) -> Vec<Self> {
        Direction::ALL
            .iter()
            .map(|&direction| Self::for_direction(direction, data_dir, cache_dir))
            .collect()
    }

    /// Fails with [`FreedictError::DataFileNotFound`] unless both source files exist.
    pub fn check_exists(&self) -> Result<()> {
        for path in [&self.dict_dz, &self.index] {
            if !path.is_file() {
                return Err(FreedictError::DataFileNotFound(path.display().to_string()));
            }
        }
        Ok(())
    }
}

/// Result of [`DictFile::decompress_if_needed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressOutcome {
    AlreadyCached,
    /// Freshly written, with the decompressed size in bytes.
    Decompressed(u64),
}

/// A compressed dictionary body and its decompressed cache file.
///
/// Decompression is serialized through an internal lock and goes through a
/// temporary file that is persisted into place only once complete, so a cache
/// file that exists and is non-empty is always a full copy. Block reads take
/// no lock; the cache is never modified after it is written.
#[derive(Debug)]
pub struct DictFile {
    source: PathBuf,
    cache_path: PathBuf,
    write_lock: Mutex<()>,
    ready: AtomicBool,
}

impl DictFile {
    pub fn new(source: impl Into<PathBuf>, cache_path: impl Into<PathBuf>) -> Self {
        DictFile {
            source: source.into(),
            cache_path: cache_path.into(),
            write_lock: Mutex::new(()),
            ready: AtomicBool::new(false),
        }
    }

    pub fn from_paths(paths: &DictionaryPaths) -> Self {
        Self::new(&paths.dict_dz, &paths.cache)
    }

    pub fn source_path(&self) -> &Path {
        &self.source
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    fn cache_is_complete(&self) -> bool {
        fs::metadata(&self.cache_path)
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    /// Decompresses the body into the cache unless a non-empty cache exists.
    ///
    /// Blocking. On failure nothing is left at the cache path.
    pub fn decompress_if_needed(&self) -> Result<DecompressOutcome> {
        if self.cache_is_complete() {
            self.ready.store(true, Ordering::Release);
            return Ok(DecompressOutcome::AlreadyCached);
        }

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| FreedictError::Internal("decompression lock poisoned".to_string()))?;

        // Another caller may have finished while we waited.
        if self.cache_is_complete() {
            self.ready.store(true, Ordering::Release);
            return Ok(DecompressOutcome::AlreadyCached);
        }

        if !self.source.is_file() {
            return Err(FreedictError::DataFileNotFound(
                self.source.display().to_string(),
            ));
        }

        info!("Decompressing {:?} to {:?}...", self.source, self.cache_path);
        let cache_dir = match self.cache_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&cache_dir)?;

        // Dropped (and deleted) on every early return below.
        let mut tmp = NamedTempFile::new_in(&cache_dir)?;
        let total = self.decompress_into(tmp.as_file_mut())?;
        if total == 0 {
            return Err(FreedictError::Decompression(format!(
                "{:?} decompressed to an empty body",
                self.source
            )));
        }
        tmp.persist(&self.cache_path)
            .map_err(|e| FreedictError::Io(e.error))?;

        self.ready.store(true, Ordering::Release);
        info!(
            "Decompression complete. Total size: {:.1} MiB",
            total as f64 / (1024.0 * 1024.0)
        );
        Ok(DecompressOutcome::Decompressed(total))
    }

    fn decompress_into(&self, dest: &mut File) -> Result<u64> {
        let gz_file = File::open(&self.source)?;
        let mut decoder = GzDecoder::new(BufReader::with_capacity(BUFFER_SIZE, gz_file));
        let mut writer = BufWriter::with_capacity(BUFFER_SIZE, dest);
        let mut buffer = [0u8; BUFFER_SIZE];
        let mut total: u64 = 0;
        let mut next_log = LOG_EVERY_BYTES;

        loop {
            let read = match decoder.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(FreedictError::Decompression(format!(
                        "{:?}: {}",
                        self.source, e
                    )));
                }
            };
            writer.write_all(&buffer[..read])?;
            total += read as u64;
            if total >= next_log {
                debug!("Decompressed {} MiB...", total / LOG_EVERY_BYTES);
                next_log += LOG_EVERY_BYTES;
            }
        }

        writer.flush()?;
        Ok(total)
    }

    /// Runs [`Self::decompress_if_needed`] on the blocking thread pool.
    pub async fn ensure_ready(self: &Arc<Self>) -> Result<DecompressOutcome> {
        let file = Arc::clone(self);
        tokio::task::spawn_blocking(move || file.decompress_if_needed()).await?
    }

    /// Reads `length` bytes at `offset` from the decompressed body, decompressing first if needed.
    ///
    /// Returns fewer bytes (possibly none) when the range runs past the end of
    /// the file. Invalid UTF-8 is replaced rather than rejected.
    pub fn read_block(&self, offset: u64, length: u32) -> Result<String> {
        if length > MAX_BLOCK_BYTES {
            return Err(FreedictError::BlockTooLarge { offset, length });
        }
        let mut file = self.open_cache()?;
        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; length as usize];
        let mut filled = 0;
        while filled < buffer.len() {
            match file.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        buffer.truncate(filled);
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn open_cache(&self) -> Result<File> {
        if !self.ready.load(Ordering::Acquire) {
            self.decompress_if_needed()?;
        }
        match File::open(&self.cache_path) {
            Ok(file) => Ok(file),
            // Deleted since it was last seen, e.g. through another handle on the same paths.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.ready.store(false, Ordering::Release);
                self.decompress_if_needed()?;
                Ok(File::open(&self.cache_path)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// True when the cache file exists and is non-empty.
    pub fn is_ready(&self) -> bool {
        self.cache_is_complete()
    }

    /// Size of the decompressed cache, 0 if absent.
    pub fn file_size(&self) -> u64 {
        fs::metadata(&self.cache_path).map(|m| m.len()).unwrap_or(0)
    }

    /// Deletes the cache file. The next read decompresses again.
    pub fn clear_cache(&self) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| FreedictError::Internal("decompression lock poisoned".to_string()))?;
        self.ready.store(false, Ordering::Release);
        match fs::remove_file(&self.cache_path) {
            Ok(()) => {
                info!("Cleared dictionary cache {:?}", self.cache_path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
