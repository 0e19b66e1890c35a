//! `LazyJSONL`: a sparse byte-offset index over a JSONL file plus an LRU
//! cache of recently parsed records, for the virtual-filesystem navigator.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;

use crate::value::{Record, Value};

const DEFAULT_CACHE_SIZE: usize = 100;

/// Random-access view over a JSONL file: an index built on first access,
/// plus an LRU cache of parsed records bounded by record count.
pub struct LazyJsonl {
    path: PathBuf,
    offsets: Vec<u64>,
    cache: LruCache<usize, Record>,
}

impl LazyJsonl {
    /// Scan the file once and build `record_index → byte_offset`.
    ///
    /// # Errors
    /// Propagates I/O failures opening or scanning the file.
    pub fn open(path: &Path) -> crate::error::Result<Self> {
        Self::open_with_cache_size(path, DEFAULT_CACHE_SIZE)
    }

    /// As `open`, but with an explicit LRU capacity (default 100 records).
    ///
    /// # Errors
    /// Propagates I/O failures opening or scanning the file.
    pub fn open_with_cache_size(path: &Path, cache_size: usize) -> crate::error::Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut offsets = Vec::new();
        let mut pos: u64 = 0;
        let mut line = String::new();
        loop {
            line.clear();
            let start = pos;
            let read = reader.read_line(&mut line)?;
            if read == 0 {
                break;
            }
            pos += read as u64;
            if !line.trim().is_empty() {
                offsets.push(start);
            }
        }
        let capacity = NonZeroUsize::new(cache_size.max(1)).expect("max(1) is nonzero");
        Ok(Self { path: path.to_path_buf(), offsets, cache: LruCache::new(capacity) })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Seek to the offset for `index` and parse exactly one line.
    ///
    /// # Errors
    /// Returns an I/O or parse error; `Ok(None)` if `index` is out of range.
    pub fn get(&mut self, index: usize) -> crate::error::Result<Option<Record>> {
        if let Some(record) = self.cache.get(&index) {
            return Ok(Some(record.clone()));
        }
        let Some(&offset) = self.offsets.get(index) else {
            return Ok(None);
        };
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut reader = BufReader::new(&mut file);
        let mut line = String::new();
        reader.read_line(&mut line)?;
        let json: serde_json::Value = serde_json::from_str(line.trim_end())?;
        let Value::Object(record) = Value::from(json) else {
            return Err(crate::error::Error::Usage(format!("{}: record {index} is not an object", self.path.display())));
        };
        self.cache.put(index, record.clone());
        Ok(Some(record))
    }
}

/// The navigation contract an out-of-process virtual-filesystem browser
/// would be specified against: paginated, index-addressed access over a
/// relation backed by a `LazyJsonl`. The VFS UI itself (tree
/// rendering, path navigation syntax with `a[0]` indexing) is an external
/// collaborator; this trait is the seam it would be built on.
pub trait VfsNavigate {
    /// Total number of records in the relation.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch the record at `index`, or `None` if out of range.
    fn record_at(&mut self, index: usize) -> crate::error::Result<Option<Record>>;

    /// Fetch a contiguous page of records starting at `start`.
    fn page(&mut self, start: usize, limit: usize) -> crate::error::Result<Vec<Record>> {
        let mut out = Vec::with_capacity(limit.min(self.len().saturating_sub(start)));
        for i in start..(start + limit).min(self.len()) {
            if let Some(record) = self.record_at(i)? {
                out.push(record);
            }
        }
        Ok(out)
    }
}

impl VfsNavigate for LazyJsonl {
    fn len(&self) -> usize {
        Self::len(self)
    }

    fn record_at(&mut self, index: usize) -> crate::error::Result<Option<Record>> {
        self.get(index)
    }
}
