//! Flat-directory store of PoC records.
//!
//! One `.rs` file per record, named `NNNN-<slug>`, where `NNNN` is the
//! record's 4-digit id. A linear scan of the directory is the whole index.

use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::PocError;
use crate::metadata::{PocDocument, PocMetadata, Report, Target, Test};

fn record_stem_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{4})-.+$").expect("valid record stem pattern"))
}

/// Code body every freshly scaffolded record starts with.
const PLACEHOLDER_CODE: &str = "#![forbid(unsafe_code)]\n\nfn main() {\n    println!(\"Hello, World!\")\n}";

pub struct PocStore {
    root: PathBuf,
}

impl PocStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        PocStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map each record id to its file stem.
    ///
    /// Non-file entries and names that do not match `NNNN-<slug>` are not
    /// records and are skipped. Two files sharing an id prefix would make
    /// `resolve` ambiguous, so that surfaces as an error instead of letting
    /// one silently shadow the other.
    pub fn list(&self) -> Result<BTreeMap<String, String>, PocError> {
        let mut records = BTreeMap::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let Some(captures) = record_stem_pattern().captures(stem) else {
                continue;
            };
            let id = captures[1].to_string();
            if let Some(first) = records.insert(id.clone(), stem.to_string()) {
                return Err(PocError::DuplicateId {
                    id,
                    first,
                    second: stem.to_string(),
                });
            }
        }
        Ok(records)
    }

    /// First unused id in 0000..=9999.
    pub fn next_id(&self) -> Result<String, PocError> {
        let records = self.list()?;
        for number in 0..10_000u32 {
            let id = format!("{number:04}");
            if !records.contains_key(&id) {
                return Ok(id);
            }
        }
        Err(PocError::StoreFull)
    }

    /// Path of the record file backing `id`.
    pub fn resolve(&self, id: &str) -> Result<PathBuf, PocError> {
        let records = self.list()?;
        let stem = records
            .get(id)
            .ok_or_else(|| PocError::UnknownId(id.to_string()))?;
        Ok(self.root.join(format!("{stem}.rs")))
    }

    /// Scaffold a new record for `krate`/`version` under the next free id
    /// and return its path.
    pub fn add(&self, krate: &str, version: &str) -> Result<PathBuf, PocError> {
        fs::create_dir_all(&self.root)?;
        let id = self.next_id()?;
        let path = self.root.join(format!("{id}-{krate}.rs"));
        let document = PocDocument {
            metadata: template_metadata(krate, version),
            code: PLACEHOLDER_CODE.to_string(),
        };
        fs::write(&path, document.render()?)?;
        Ok(path)
    }

    /// Read and parse the record backing `id`.
    pub fn load(&self, id: &str) -> Result<(PathBuf, PocDocument), PocError> {
        let path = self.resolve(id)?;
        let source = fs::read_to_string(&path)?;
        let document = PocDocument::parse(&source)?;
        Ok((path, document))
    }
}

fn template_metadata(krate: &str, version: &str) -> PocMetadata {
    PocMetadata {
        target: Target {
            krate: Some(krate.to_string()),
            version: Some(version.to_string()),
            peer: Vec::new(),
        },
        test: Test {
            cargo_toolchain: None,
            cargo_flags: None,
            analyzers: Some(Vec::new()),
        },
        report: Report {
            title: Some("issue title".to_string()),
            description: Some("issue description".to_string()),
            code_snippets: Vec::new(),
            patched: Some(Vec::new()),
            informational: Some("unsound".to_string()),
            issue_url: None,
            issue_date: None,
        },
    }
}
