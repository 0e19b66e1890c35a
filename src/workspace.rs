//! Workspace: the REPL's session state. `Workspace` owns a named
//! dataset registry plus a `tempfile::TempDir` scratch directory, and
//! every dataset is either a *source* (external file, re-opened on
//! each read) or *derived* (a spill file written once when
//! materialized).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::io::{LineMode, Reader, Writer};
use crate::ops::Relation;
use crate::value::{Record, Value};

/// Whether a dataset is a reference to an external file or a
/// session-local spill file written once by an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Source,
    Derived,
}

/// One registered dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub kind: DatasetKind,
    pub path: PathBuf,
    row_count: Option<usize>,
}

/// A summary returned by `Workspace::info``).
#[derive(Debug, Clone)]
pub struct DatasetInfo {
    pub row_count: usize,
    pub size_bytes: u64,
    pub top_level_keys: Vec<String>,
    pub preview: Option<Record>,
}

/// How many records `info` samples to determine `top_level_keys`.
const INFO_SAMPLE_BOUND: usize = 200;

/// A REPL session's in-memory registry of named datasets plus its
/// scratch directory. The scratch directory is created eagerly and
/// cleaned up on drop (via `TempDir`'s own `Drop` impl).
pub struct Workspace {
    datasets: BTreeMap<String, Dataset>,
    current: Option<String>,
    scratch: TempDir,
    next_seq: usize,
}

impl Workspace {
    /// Create a new workspace with an eagerly-created scratch directory.
    /// The parent directory is resolved by
    /// [`crate::utils::resolve_scratch_base`] (`JLA_SCRATCH_DIR`, then
    /// the OS cache dir, then the OS temp dir), falling back further to
    /// `tempfile`'s own default if even that parent can't be used.
    ///
    /// # Errors
    /// Returns an error if the scratch directory cannot be created.
    pub fn new() -> Result<Self> {
        let base = crate::utils::resolve_scratch_base();
        let scratch = tempfile::Builder::new().prefix("jla-").tempdir_in(&base).or_else(|_| {
            tempfile::Builder::new().prefix("jla-").tempdir()
        })?;
        Ok(Self { datasets: BTreeMap::new(), current: None, scratch, next_seq: 0 })
    }

    /// `load(path, [name])`: register a source dataset; default name is
    /// the file stem.
    ///
    /// # Errors
    /// Returns `Error::DuplicateDataset` if `name` is already in use.
    pub fn load(&mut self, path: &Path, name: Option<&str>) -> Result<String> {
        let name = name.map(ToString::to_string).unwrap_or_else(|| {
            path.file_stem().map_or_else(|| "dataset".to_string(), |s| s.to_string_lossy().to_string())
        });
        if self.datasets.contains_key(&name) {
            return Err(Error::DuplicateDataset { name });
        }
        self.datasets.insert(
            name.clone(),
            Dataset { kind: DatasetKind::Source, path: path.to_path_buf(), row_count: None },
        );
        self.current = Some(name.clone());
        Ok(name)
    }

    /// `cd(name)`: move the current pointer.
    ///
    /// # Errors
    /// Returns `Error::UnknownDataset` if `name` is not registered.
    pub fn cd(&mut self, name: &str) -> Result<()> {
        if !self.datasets.contains_key(name) {
            return Err(Error::UnknownDataset { name: name.to_string() });
        }
        self.current = Some(name.to_string());
        Ok(())
    }

    /// `pwd()`: inspect the current pointer.
    #[must_use]
    pub fn pwd(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// `datasets()`: list all by lexical order with the current pointer
    /// marked (a `BTreeMap` keeps registration-order-independent
    /// lexical order for free).
    #[must_use]
    pub fn datasets(&self) -> Vec<(&str, &Dataset, bool)> {
        self.datasets
            .iter()
            .map(|(name, ds)| (name.as_str(), ds, Some(name.as_str()) == self.current.as_deref()))
            .collect()
    }

    fn dataset(&self, name: &str) -> Result<&Dataset> {
        self.datasets.get(name).ok_or_else(|| Error::UnknownDataset { name: name.to_string() })
    }

    fn current_name(&self) -> Result<&str> {
        self.current.as_deref().ok_or_else(|| Error::Usage("no current dataset; use load/cd first".to_string()))
    }

    /// Open `name` (or `current` if `None`) as a fresh `Relation`.
    ///
    /// # Errors
    /// Returns `Error::UnknownDataset` or an I/O error opening the file.
    pub fn open(&self, name: Option<&str>) -> Result<Relation> {
        let name = match name {
            Some(n) => n,
            None => self.current_name()?,
        };
        let dataset = self.dataset(name)?;
        let reader = Reader::open(Some(&dataset.path), LineMode::Strict)?;
        Ok(Box::new(reader))
    }

    /// Run an operator pipeline against `current`, spilling the result
    /// to `<scratch>/<name>_<seq>.jsonl`, registering it as *derived*,
    /// and moving `current` to it.
    ///
    /// # Errors
    /// Returns any error raised while running the pipeline or writing
    /// the spill file.
    pub fn run_into(&mut self, name: &str, pipeline: crate::pipeline::Pipeline) -> Result<String> {
        let input = self.open(None)?;
        let relation = pipeline.run(input)?;
        let output_name = self.spill(name, relation)?;
        Ok(output_name)
    }

    fn spill(&mut self, name: &str, relation: Relation) -> Result<String> {
        let seq = self.next_seq;
        self.next_seq += 1;
        let output_name = format!("{name}_{seq}");
        let path = self.scratch.path().join(format!("{output_name}.jsonl"));
        let file = std::fs::File::create(&path)?;
        let mut writer = Writer::new(std::io::BufWriter::new(file), crate::io::KeyOrder::Insertion);
        let mut count = 0usize;
        for record in relation {
            let record = record?;
            writer.write_record(&record)?;
            count += 1;
        }
        writer.flush()?;
        self.datasets.insert(
            output_name.clone(),
            Dataset { kind: DatasetKind::Derived, path, row_count: Some(count) },
        );
        self.current = Some(output_name.clone());
        Ok(output_name)
    }

    /// `info([name])`: row count (by a counting pass, cached), byte
    /// size, the set of top-level keys up to a sample bound, and a
    /// preview record.
    ///
    /// # Errors
    /// Returns `Error::UnknownDataset` or an I/O error reading the file.
    pub fn info(&mut self, name: Option<&str>) -> Result<DatasetInfo> {
        let name = match name {
            Some(n) => n.to_string(),
            None => self.current_name()?.to_string(),
        };
        let size_bytes = std::fs::metadata(&self.dataset(&name)?.path).map(|m| m.len()).unwrap_or(0);

        let mut relation = self.open(Some(&name))?;
        let mut top_level_keys: Vec<String> = Vec::new();
        let mut preview = None;
        let mut row_count = 0usize;
        for (i, record) in (&mut relation).enumerate() {
            let record = record?;
            if i == 0 {
                preview = Some(record.clone());
            }
            if i < INFO_SAMPLE_BOUND {
                for key in record.keys() {
                    if !top_level_keys.iter().any(|k| k == key) {
                        top_level_keys.push(key.clone());
                    }
                }
            }
            row_count = i + 1;
        }

        if let Some(dataset) = self.datasets.get_mut(&name) {
            dataset.row_count = Some(row_count);
        }

        Ok(DatasetInfo { row_count, size_bytes, top_level_keys, preview })
    }

    /// `ls([name], limit)`: stream the first `limit` records.
    ///
    /// # Errors
    /// Returns `Error::UnknownDataset` or an I/O error reading the file.
    pub fn ls(&self, name: Option<&str>, limit: usize) -> Result<Vec<Record>> {
        let relation = self.open(name)?;
        relation.take(limit).collect()
    }

    /// `save(path)`: copy the file backing `current` to `path`. Does
    /// not register the saved file.
    ///
    /// # Errors
    /// Returns `Error::UnknownDataset` or an I/O error copying the file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let name = self.current_name()?;
        let dataset = self.dataset(name)?;
        std::fs::copy(&dataset.path, path)?;
        Ok(())
    }

    #[must_use]
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }
}

impl Dataset {
    #[must_use]
    pub const fn cached_row_count(&self) -> Option<usize> {
        self.row_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_jsonl(path: &Path, lines: &[&str]) {
        let mut file = std::fs::File::create(path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
    }

    #[test]
    fn load_registers_source_and_sets_current() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.jsonl");
        write_jsonl(&path, &[r#"{"a":1}"#]);

        let mut ws = Workspace::new().unwrap();
        let name = ws.load(&path, None).unwrap();
        assert_eq!(name, "people");
        assert_eq!(ws.pwd(), Some("people"));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        write_jsonl(&path, &[r#"{"a":1}"#]);

        let mut ws = Workspace::new().unwrap();
        ws.load(&path, Some("x")).unwrap();
        assert!(ws.load(&path, Some("x")).is_err());
    }

    #[test]
    fn info_counts_rows_and_samples_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        write_jsonl(&path, &[r#"{"a":1,"b":2}"#, r#"{"a":3}"#]);

        let mut ws = Workspace::new().unwrap();
        ws.load(&path, Some("x")).unwrap();
        let info = ws.info(None).unwrap();
        assert_eq!(info.row_count, 2);
        assert!(info.top_level_keys.contains(&"a".to_string()));
        assert!(info.top_level_keys.contains(&"b".to_string()));
    }

    #[test]
    fn cd_to_unknown_dataset_errors() {
        let mut ws = Workspace::new().unwrap();
        assert!(ws.cd("nope").is_err());
    }
}
