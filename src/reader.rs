//! Direct lookups against a dictd pair, without going through the database.

use crate::data::{DictFile, DictionaryPaths};
use crate::error::Result;
use crate::index::DictdIndex;
use crate::models::ParsedEntry;
use crate::parse;
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Reads entries straight from the decompressed body.
///
/// The body is decompressed and the index parsed on first use; both are
/// reused afterwards.
#[derive(Debug)]
pub struct DictdReader {
    dict: Arc<DictFile>,
    index_path: PathBuf,
    index: OnceCell<DictdIndex>,
}

impl DictdReader {
    pub fn new(dict: Arc<DictFile>, index_path: impl Into<PathBuf>) -> Self {
        DictdReader {
            dict,
            index_path: index_path.into(),
            index: OnceCell::new(),
        }
    }

    pub fn from_paths(paths: &DictionaryPaths) -> Self {
        Self::new(Arc::new(DictFile::from_paths(paths)), &paths.index)
    }

    async fn index(&self) -> Result<&DictdIndex> {
        self.index
            .get_or_try_init(|| DictdIndex::load(self.index_path.clone()))
            .await
    }

    /// Parsed entry for `word` (case-insensitive), `None` if it is not indexed.
    pub async fn lookup_exact(&self, word: &str) -> Result<Option<ParsedEntry>> {
        let Some(location) = self.index().await?.get(word.trim()).cloned() else {
            debug!("'{}' not in index", word);
            return Ok(None);
        };
        self.dict.ensure_ready().await?;

        let dict = Arc::clone(&self.dict);
        let (offset, length) = (location.byte_offset, location.byte_length);
        let raw = tokio::task::spawn_blocking(move || dict.read_block(offset, length)).await??;
        Ok(Some(parse::parse(&location.headword, &raw)))
    }

    /// Up to `limit` headwords starting with `prefix`, in sorted key order.
    pub async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        Ok(self
            .index()
            .await?
            .prefix_search(prefix.trim(), limit)
            .into_iter()
            .map(|location| location.headword.clone())
            .collect())
    }

    /// Number of indexed headwords.
    pub async fn len(&self) -> Result<usize> {
        Ok(self.index().await?.len())
    }

    /// Deletes the decompressed body; the next lookup decompresses again.
    pub fn clear_cache(&self) -> Result<()> {
        self.dict.clear_cache()
    }

    pub fn is_cached(&self) -> bool {
        self.dict.is_ready()
    }
}
