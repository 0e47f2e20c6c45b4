//! Public parser: files, includes, the session, and the query surface
//!
//! A [`Parser`] owns one [`ParseSession`]. Every `parse()` call adds to it;
//! declarations seen again merge into the records they already have.

use super::ast::SourceLocation;
use super::scanner::{ScanEvent, ScannedItem, Scanner};
use crate::config::{Configuration, ConfigurationError, ErrorPolicy};
use crate::errors::{Error, ParseError, RecordedError};
use crate::model::{Declaration, Function, Origin, Placeholder, Structure, Typedef, Variable};
use crate::session::ParseSession;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What one `parse()` call encountered, by name, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub file: PathBuf,
    pub functions: Vec<String>,
    pub structures: Vec<String>,
    pub typedefs: Vec<String>,
    pub variables: Vec<String>,
    pub placeholders: Vec<String>,
    /// Headers scanned through `#include`, in scan order
    pub included_files: Vec<PathBuf>,
    pub errors: Vec<RecordedError>,
}

impl ParseReport {
    fn new(file: &Path) -> Self {
        ParseReport {
            file: file.to_path_buf(),
            ..ParseReport::default()
        }
    }

    /// Number of declarations scanned by the call
    pub fn declaration_count(&self) -> usize {
        self.functions.len()
            + self.structures.len()
            + self.typedefs.len()
            + self.variables.len()
            + self.placeholders.len()
    }

    fn note(&mut self, item: &ScannedItem) {
        match item {
            ScannedItem::Function(f) => self.functions.push(f.name.clone()),
            ScannedItem::Structure(s) => self.structures.push(s.name.clone()),
            ScannedItem::Typedef(t) => self.typedefs.push(t.alias_name.clone()),
            ScannedItem::Variable(v) => self.variables.push(v.name.clone()),
            ScannedItem::Placeholder(p) => self.placeholders.push(p.name().to_string()),
        }
    }
}

/// State carried through one `parse()` call
struct ParseRun {
    visited: FxHashSet<PathBuf>,
    report: ParseReport,
}

/// Declaration extractor for annotated C sources
#[derive(Debug, Clone)]
pub struct Parser {
    config: Configuration,
    session: ParseSession,
}

impl Parser {
    /// Validate `config` and start an empty session
    pub fn new(config: Configuration) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Parser {
            config,
            session: ParseSession::new(),
        })
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn session(&self) -> &ParseSession {
        &self.session
    }

    pub fn into_session(self) -> ParseSession {
        self.session
    }

    /// Read `file` and add its declarations, plus those of the headers it
    /// includes, to the session
    pub fn parse(&mut self, file: impl AsRef<Path>) -> Result<ParseReport, Error> {
        let file = file.as_ref();
        let source = std::fs::read_to_string(file).map_err(|source| Error::Io {
            path: file.to_path_buf(),
            source,
        })?;
        self.parse_source(file, &source)
    }

    /// Like [`parse`](Self::parse), with the text of `file` already in memory.
    /// Includes are still read from disk relative to `file`.
    pub fn parse_source(&mut self, file: impl AsRef<Path>, source: &str) -> Result<ParseReport, Error> {
        let file = file.as_ref();
        info!(file = %file.display(), "parsing");

        let snapshot = match self.config.error_policy {
            ErrorPolicy::Abort => Some(self.session.clone()),
            ErrorPolicy::Skip => None,
        };

        let mut run = ParseRun {
            visited: FxHashSet::default(),
            report: ParseReport::new(file),
        };
        // Records carry the canonical path so one file reached by two spellings merges cleanly
        let scanned_path = canonical(file);
        run.visited.insert(scanned_path.clone());
        self.session.record_input(file);

        match self.scan_file(&scanned_path, source, Origin::InputFile, 0, &mut run) {
            Ok(()) => {
                info!(
                    file = %file.display(),
                    declarations = run.report.declaration_count(),
                    errors = run.report.errors.len(),
                    "parsed"
                );
                Ok(run.report)
            }
            Err(err) => {
                if let Some(previous) = snapshot {
                    self.session = previous;
                }
                Err(err.into())
            }
        }
    }

    fn scan_file(
        &mut self,
        file: &Path,
        source: &str,
        origin: Origin,
        depth: usize,
        run: &mut ParseRun,
    ) -> Result<(), RecordedError> {
        let scanned = Scanner::new(source, file, origin, &self.config).map(Scanner::scan);
        let events = match scanned {
            Ok(events) => events,
            Err(err) => return self.record(err.into(), run),
        };

        for event in events {
            match event {
                ScanEvent::Item(item) => {
                    run.report.note(&item);
                    if let Err(err) = self.session.merge(item) {
                        debug!(error = %err, "merge rejected");
                        self.record(err.into(), run)?;
                    }
                }
                ScanEvent::Include {
                    path,
                    system,
                    location,
                } => self.follow_include(file, &path, system, location, depth, run)?,
                ScanEvent::Error(err) => self.record(err, run)?,
            }
        }
        Ok(())
    }

    fn follow_include(
        &mut self,
        including: &Path,
        path: &str,
        system: bool,
        location: SourceLocation,
        depth: usize,
        run: &mut ParseRun,
    ) -> Result<(), RecordedError> {
        let Some(resolved) = self.resolve_include(including, path, system) else {
            if system {
                debug!(include = %path, "system include not found; skipped");
            } else {
                warn!(file = %including.display(), line = location.line, include = %path, "include not found");
            }
            return Ok(());
        };

        let resolved = canonical(&resolved);
        if !run.visited.insert(resolved.clone()) {
            debug!(include = %resolved.display(), "already scanned in this call");
            return Ok(());
        }
        if depth + 1 > self.config.max_include_depth {
            let err = ParseError::new(
                including,
                location,
                format!(
                    "include depth limit of {} exceeded at '{}'",
                    self.config.max_include_depth, path
                ),
            );
            return self.record(err.into(), run);
        }

        let source = match std::fs::read_to_string(&resolved) {
            Ok(source) => source,
            Err(e) => {
                let err = ParseError::new(
                    including,
                    location,
                    format!("cannot read '{}': {}", resolved.display(), e),
                );
                return self.record(err.into(), run);
            }
        };

        debug!(include = %resolved.display(), depth = depth + 1, "following include");
        run.report.included_files.push(resolved.clone());
        self.scan_file(&resolved, &source, Origin::IncludedFile, depth + 1, run)
    }

    /// Quoted includes look next to the including file first
    fn resolve_include(&self, including: &Path, path: &str, system: bool) -> Option<PathBuf> {
        let requested = Path::new(path);
        if requested.is_absolute() {
            return requested.is_file().then(|| requested.to_path_buf());
        }

        if !system {
            let local = including
                .parent()
                .map(|dir| dir.join(requested))
                .unwrap_or_else(|| requested.to_path_buf());
            if local.is_file() {
                return Some(local);
            }
        }

        self.config
            .include_paths
            .iter()
            .map(|dir| dir.join(requested))
            .find(|candidate| candidate.is_file())
    }

    /// Log a recoverable error; under the abort policy it also ends the call
    fn record(&mut self, err: RecordedError, run: &mut ParseRun) -> Result<(), RecordedError> {
        run.report.errors.push(err.clone());
        self.session.record_error(err.clone());
        match self.config.error_policy {
            ErrorPolicy::Abort => Err(err),
            ErrorPolicy::Skip => Ok(()),
        }
    }

    // ===== Queries =====

    /// Functions in first-encounter order, filtered by every flag that is set
    pub fn get_functions(&self, input_file_only: bool, defined_only: bool, annotated_only: bool) -> Vec<&Function> {
        self.session
            .functions()
            .iter()
            .filter(|f| !input_file_only || f.origin.is_input())
            .filter(|f| !defined_only || f.is_defined)
            .filter(|f| !annotated_only || f.is_annotated())
            .collect()
    }

    /// All functions, honoring the configured `defined_only_default`
    pub fn functions(&self) -> Vec<&Function> {
        self.get_functions(false, self.config.defined_only_default, false)
    }

    pub fn get_structures(&self, input_file_only: bool) -> Vec<&Structure> {
        self.session
            .structures()
            .iter()
            .filter(|s| !input_file_only || s.origin.is_input())
            .collect()
    }

    pub fn get_variables(&self, input_file_only: bool) -> Vec<&Variable> {
        self.session
            .variables()
            .iter()
            .filter(|v| !input_file_only || v.origin.is_input())
            .collect()
    }

    pub fn get_placeholders(&self, input_file_only: bool) -> Vec<&Placeholder> {
        self.session
            .placeholders()
            .iter()
            .filter(|p| !input_file_only || p.origin.is_input())
            .collect()
    }

    pub fn get_typedefs(&self) -> &[Typedef] {
        self.session.typedefs()
    }

    /// Distinct annotation names in the session. Functions are visited first,
    /// then structures, typedefs, variables and placeholders; each name appears
    /// once, where it was first met.
    pub fn get_annotations(&self) -> Vec<&str> {
        let mut seen = FxHashSet::default();
        let mut names = Vec::new();

        let all = self
            .session
            .functions()
            .iter()
            .flat_map(|f| f.annotations())
            .chain(self.session.structures().iter().flat_map(|s| s.annotations()))
            .chain(self.session.typedefs().iter().flat_map(|t| t.annotations()))
            .chain(self.session.variables().iter().flat_map(|v| v.annotations()))
            .chain(self.session.placeholders().iter().flat_map(|p| p.annotations()));

        for annotation in all {
            if seen.insert(annotation.name()) {
                names.push(annotation.name());
            }
        }
        names
    }

    /// Session-wide log of recoverable errors
    pub fn errors(&self) -> &[RecordedError] {
        self.session.errors()
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
