//! Testing harness for talk page parsing
//!
//!     Tests should run against real rendered talk pages, not hand-assembled node trees. The
//!     fixtures under `fixtures/pages/` (workspace root) are verified page snippets: each was
//!     checked by eye against how the page reads, so a test failing on one of them means the
//!     parser changed, not the fixture.
//!
//! File naming
//!
//!     Fixtures are numbered: `01-basic-thread.html`, `2-lead-section.html`, `003-x.html`.
//!     The number is whatever comes before the first dash (or the extension). Two files
//!     resolving to the same number is an error, so `1-a.html` and `01-b.html` cannot coexist.
//!
//! Usage
//!
//!     let set = Fixtures::page(1).parse();
//!     let html = Fixtures::page(4).source();
//!     let set = Fixtures::page(7).parse_with(&locale, options);
//!
//!     The loader panics with a descriptive message when a fixture is missing or fails to
//!     parse; it is meant for tests only.

use crate::error::ParserError;
use crate::item::ThreadItemSet;
use crate::locale::{LocaleData, ParserOptions};
use crate::parser::CommentParser;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const FIXTURES_ROOT: &str = "fixtures";
const PAGES_DIR: &str = "pages";

#[derive(Debug, Clone)]
pub enum FixtureError {
    FileNotFound(String),
    IoError(String),
    DuplicateNumber(String),
    ParseError(String),
}

impl fmt::Display for FixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixtureError::FileNotFound(msg) => write!(f, "Fixture not found: {}", msg),
            FixtureError::IoError(msg) => write!(f, "IO error: {}", msg),
            FixtureError::DuplicateNumber(msg) => write!(f, "Duplicate number: {}", msg),
            FixtureError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for FixtureError {}

impl From<std::io::Error> for FixtureError {
    fn from(err: std::io::Error) -> Self {
        FixtureError::IoError(err.to_string())
    }
}

impl From<ParserError> for FixtureError {
    fn from(err: ParserError) -> Self {
        FixtureError::ParseError(err.to_string())
    }
}

/// `fixtures/pages` at the workspace root.
pub fn pages_root() -> PathBuf {
    // CARGO_MANIFEST_DIR is talk-parser/, the fixtures live one level up
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let workspace_root = manifest_dir.parent().unwrap_or(manifest_dir);
    workspace_root.join(FIXTURES_ROOT).join(PAGES_DIR)
}

fn file_number(path: &Path) -> Option<usize> {
    let stem = path.file_stem()?.to_str()?;
    stem.split('-').next()?.parse().ok()
}

/// Map of fixture number to path for every numbered `.html` file in `dir`.
pub fn list_files_by_number(dir: &Path) -> Result<HashMap<usize, PathBuf>, FixtureError> {
    let mut files = HashMap::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("html") {
            continue;
        }
        let Some(number) = file_number(&path) else {
            continue;
        };
        if let Some(existing) = files.insert(number, path.clone()) {
            return Err(FixtureError::DuplicateNumber(format!(
                "{} and {} both resolve to {}",
                existing.display(),
                path.display(),
                number
            )));
        }
    }
    Ok(files)
}

pub fn find_page(number: usize) -> Result<PathBuf, FixtureError> {
    let root = pages_root();
    list_files_by_number(&root)?
        .remove(&number)
        .ok_or_else(|| FixtureError::FileNotFound(format!("page #{} in {}", number, root.display())))
}

/// Fluent loader for one fixture.
pub struct PageLoader {
    number: usize,
    container_id: Option<String>,
}

impl PageLoader {
    pub fn path(&self) -> PathBuf {
        find_page(self.number)
            .unwrap_or_else(|e| panic!("Failed to find page #{}: {}", self.number, e))
    }

    /// Parse inside the element with this id instead of `body`.
    pub fn in_container(mut self, id: impl Into<String>) -> Self {
        self.container_id = Some(id.into());
        self
    }

    pub fn source(&self) -> String {
        let path = self.path();
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
    }

    pub fn try_parse_with(
        &self,
        locale: &LocaleData,
        options: ParserOptions,
    ) -> Result<ThreadItemSet, FixtureError> {
        let parser = CommentParser::new(locale, options)?;
        Ok(parser.parse_html(&self.source(), self.container_id.as_deref())?)
    }

    pub fn parse_with(&self, locale: &LocaleData, options: ParserOptions) -> ThreadItemSet {
        self.try_parse_with(locale, options)
            .unwrap_or_else(|e| panic!("Failed to parse page #{}: {}", self.number, e))
    }

    /// Parse with the English locale and default options (shorthand).
    pub fn parse(&self) -> ThreadItemSet {
        self.parse_with(&LocaleData::english(), ParserOptions::default())
    }
}

/// Entry point for fixture loading.
pub struct Fixtures;

impl Fixtures {
    pub fn page(number: usize) -> PageLoader {
        PageLoader {
            number,
            container_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_read_before_the_first_dash() {
        assert_eq!(file_number(Path::new("01-basic-thread.html")), Some(1));
        assert_eq!(file_number(Path::new("12.html")), Some(12));
        assert_eq!(file_number(Path::new("notes.html")), None);
    }

    #[test]
    fn duplicate_numbers_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("1-a.html"), "").unwrap();
        fs::write(dir.path().join("01-b.html"), "").unwrap();
        assert!(matches!(
            list_files_by_number(dir.path()),
            Err(FixtureError::DuplicateNumber(_))
        ));
    }

    #[test]
    fn every_fixture_parses() {
        let files = list_files_by_number(&pages_root()).unwrap();
        assert!(!files.is_empty());
        for number in files.keys() {
            Fixtures::page(*number).parse();
        }
    }
}
