//! Parsing of dictd `.index` files.
//!
//! Each line is `headword\t<offset>\t<length>` with both numbers in the
//! base64 form handled by [`crate::codec`]. Lines whose headword starts with
//! [`METADATA_SENTINEL`] describe the database itself and are not entries.

use crate::codec;
use crate::error::Result;
use crate::models::IndexLocation;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Headword prefix of the database metadata pseudo-entries (`00databaseinfo`, `00databaseurl`, ...).
pub const METADATA_SENTINEL: &str = "00database";

const LOG_EVERY_LINES: u64 = 10_000;

/// Line counters collected while parsing an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub lines: u64,
    pub blank: u64,
    pub too_few_fields: u64,
    pub metadata: u64,
    /// Lines whose offset or length could not be decoded, or whose length is zero.
    pub malformed: u64,
    pub duplicates: u64,
}

impl IndexStats {
    /// Lines that did not produce a location, for any reason.
    pub fn skipped(&self) -> u64 {
        self.blank + self.too_few_fields + self.metadata + self.malformed + self.duplicates
    }
}

/// In-memory index: case-folded headword lookup plus lazily built sorted keys
/// for prefix search.
#[derive(Debug, Default)]
pub struct DictdIndex {
    entries: Vec<IndexLocation>,
    by_key: HashMap<String, usize>,
    malformed_lines: Vec<String>,
    stats: IndexStats,
    sorted_keys: OnceLock<Vec<String>>,
}

enum LineKind<'a> {
    Skip,
    Entry { headword: &'a str, fields: &'a [&'a str] },
}

fn classify<'a>(line: &'a str, fields: &'a [&'a str], stats: &mut IndexStats) -> LineKind<'a> {
    if line.trim().is_empty() {
        stats.blank += 1;
        return LineKind::Skip;
    }
    if fields.len() < 3 {
        stats.too_few_fields += 1;
        return LineKind::Skip;
    }
    let headword = fields[0];
    if headword.is_empty() || headword.starts_with(METADATA_SENTINEL) {
        stats.metadata += 1;
        return LineKind::Skip;
    }
    LineKind::Entry { headword, fields }
}

/// Decodes both numbers with the strict [`codec::try_decode`], unlike the
/// lenient [`codec::decode`] that reads unknown symbols as 0. A line with a
/// foreign symbol, a zero length or a length beyond `u32` is malformed rather
/// than pointing at an unrelated block.
fn decode_location(headword: &str, offset: &str, length: &str) -> Option<IndexLocation> {
    let byte_offset = codec::try_decode(offset.trim())?;
    let byte_length = codec::try_decode(length.trim())?;
    let byte_length = u32::try_from(byte_length).ok().filter(|len| *len > 0)?;
    Some(IndexLocation {
        headword: headword.to_string(),
        byte_offset,
        byte_length,
    })
}

/// Reads one raw line, tolerating invalid UTF-8 and CRLF endings.
fn next_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

impl DictdIndex {
    /// Parses an index from any buffered reader.
    ///
    /// Malformed lines are skipped and counted, never fatal. Only the first
    /// occurrence of a case-folded headword is kept.
    pub fn parse<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut index = DictdIndex::default();
        let mut buf = Vec::new();

        while let Some(line) = next_line(&mut reader, &mut buf)? {
            index.stats.lines += 1;
            let fields: Vec<&str> = line.split('\t').collect();

            if let LineKind::Entry { headword, fields } = classify(&line, &fields, &mut index.stats) {
                match decode_location(headword, fields[1], fields[2]) {
                    Some(location) => {
                        let key = headword.to_lowercase();
                        if index.by_key.contains_key(&key) {
                            index.stats.duplicates += 1;
                        } else {
                            index.by_key.insert(key, index.entries.len());
                            index.entries.push(location);
                        }
                    }
                    None => {
                        warn!(
                            "Skipping malformed index line {} for '{}'",
                            index.stats.lines, headword
                        );
                        index.stats.malformed += 1;
                        index.malformed_lines.push(format!(
                            "Malformed index line {}: '{}'",
                            index.stats.lines, headword
                        ));
                    }
                }
            }

            if index.stats.lines % LOG_EVERY_LINES == 0 {
                debug!(
                    "Parsed {} index lines ({} unique)...",
                    index.stats.lines,
                    index.entries.len()
                );
            }
        }

        info!(
            "Index parsing complete: {} entries, {} lines skipped",
            index.entries.len(),
            index.stats.skipped()
        );
        Ok(index)
    }

    /// Parses the index file at `path`.
    pub fn from_path(path: &Path) -> Result<Self> {
        info!("Parsing index file: {:?}", path);
        let file = File::open(path)?;
        Self::parse(BufReader::new(file))
    }

    /// Parses the index file on the blocking thread pool.
    pub async fn load(path: PathBuf) -> Result<Self> {
        tokio::task::spawn_blocking(move || Self::from_path(&path)).await?
    }

    /// Case-insensitive exact lookup.
    pub fn get(&self, headword: &str) -> Option<&IndexLocation> {
        self.by_key
            .get(&headword.to_lowercase())
            .map(|&idx| &self.entries[idx])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All locations in first-occurrence order.
    pub fn locations(&self) -> &[IndexLocation] {
        &self.entries
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    /// One message per malformed line, in file order.
    pub fn malformed_lines(&self) -> &[String] {
        &self.malformed_lines
    }

    fn sorted_keys(&self) -> &[String] {
        self.sorted_keys.get_or_init(|| {
            let mut keys: Vec<String> = self.by_key.keys().cloned().collect();
            keys.sort_unstable();
            keys
        })
    }

    /// Up to `limit` locations whose case-folded headword starts with `prefix`,
    /// in ascending key order.
    pub fn prefix_search(&self, prefix: &str, limit: usize) -> Vec<&IndexLocation> {
        let prefix = prefix.to_lowercase();
        let keys = self.sorted_keys();
        let start = keys.partition_point(|key| key.as_str() < prefix.as_str());
        keys[start..]
            .iter()
            .take_while(|key| key.starts_with(&prefix))
            .take(limit)
            .filter_map(|key| self.by_key.get(key).map(|&idx| &self.entries[idx]))
            .collect()
    }
}

/// Headwords in file order, without decoding any location. Duplicates are kept.
pub fn parse_headwords_only<R: BufRead>(mut reader: R) -> Result<Vec<String>> {
    let mut headwords = Vec::new();
    let mut buf = Vec::new();
    while let Some(line) = next_line(&mut reader, &mut buf)? {
        if line.trim().is_empty() {
            continue;
        }
        let headword = line.split('\t').next().unwrap_or_default();
        if !headword.is_empty() && !headword.starts_with(METADATA_SENTINEL) {
            headwords.push(headword.to_string());
        }
    }
    debug!("Parsed {} headwords", headwords.len());
    Ok(headwords)
}

/// Counts entry lines (non-blank, non-metadata) without building an index.
pub fn count_entries<R: BufRead>(mut reader: R) -> Result<usize> {
    let mut count = 0;
    let mut buf = Vec::new();
    while let Some(line) = next_line(&mut reader, &mut buf)? {
        if line.trim().is_empty() {
            continue;
        }
        let headword = line.split('\t').next().unwrap_or_default();
        if !headword.is_empty() && !headword.starts_with(METADATA_SENTINEL) {
            count += 1;
        }
    }
    Ok(count)
}
