//! Accumulated declarations of one parse session
//!
//! Each kind is its own namespace: a `Vec` keeps first-encounter order and an
//! `FxHashMap` maps names to positions so a later sighting merges into the
//! existing record instead of appending a duplicate.

use crate::errors::{MalformedDeclarationError, RecordedError};
use crate::model::{DeclKind, Function, Placeholder, Redefinition, Structure, Typedef, Variable};
use crate::parser::scanner::ScannedItem;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ParseSession {
    functions: Vec<Function>,
    function_index: FxHashMap<String, usize>,
    structures: Vec<Structure>,
    structure_index: FxHashMap<String, usize>,
    typedefs: Vec<Typedef>,
    typedef_index: FxHashMap<String, usize>,
    variables: Vec<Variable>,
    variable_index: FxHashMap<String, usize>,
    placeholders: Vec<Placeholder>,
    errors: Vec<RecordedError>,
    input_files: Vec<PathBuf>,
}

impl ParseSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    pub fn typedefs(&self) -> &[Typedef] {
        &self.typedefs
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    pub fn errors(&self) -> &[RecordedError] {
        &self.errors
    }

    /// Files passed to `parse()`, in call order
    pub fn input_files(&self) -> &[PathBuf] {
        &self.input_files
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.function_index.get(name).map(|&i| &self.functions[i])
    }

    pub fn structure(&self, name: &str) -> Option<&Structure> {
        self.structure_index.get(name).map(|&i| &self.structures[i])
    }

    pub fn typedef(&self, name: &str) -> Option<&Typedef> {
        self.typedef_index.get(name).map(|&i| &self.typedefs[i])
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variable_index.get(name).map(|&i| &self.variables[i])
    }

    pub(crate) fn record_input(&mut self, file: &Path) {
        if !self.input_files.iter().any(|f| f == file) {
            self.input_files.push(file.to_path_buf());
        }
    }

    pub(crate) fn record_error(&mut self, error: RecordedError) {
        self.errors.push(error);
    }

    /// Merge one scanned declaration, enforcing one record per name and kind
    pub(crate) fn merge(&mut self, item: ScannedItem) -> Result<(), MalformedDeclarationError> {
        match item {
            ScannedItem::Function(f) => match self.function_index.get(&f.name) {
                Some(&i) => {
                    debug!(name = %f.name, "merging function sighting");
                    let location = f.location.clone();
                    self.functions[i]
                        .merge(f)
                        .map_err(|r| redefinition(DeclKind::Function, &self.functions[i].name, location, r))
                }
                None => {
                    self.function_index.insert(f.name.clone(), self.functions.len());
                    self.functions.push(f);
                    Ok(())
                }
            },
            ScannedItem::Structure(s) => match self.structure_index.get(&s.name) {
                Some(&i) => {
                    debug!(name = %s.name, "merging structure sighting");
                    let location = s.location.clone();
                    self.structures[i]
                        .merge(s)
                        .map_err(|r| redefinition(DeclKind::Structure, &self.structures[i].name, location, r))
                }
                None => {
                    self.structure_index.insert(s.name.clone(), self.structures.len());
                    self.structures.push(s);
                    Ok(())
                }
            },
            ScannedItem::Typedef(t) => {
                match self.typedef_index.get(&t.alias_name) {
                    Some(&i) => self.typedefs[i].merge(t),
                    None => {
                        self.typedef_index.insert(t.alias_name.clone(), self.typedefs.len());
                        self.typedefs.push(t);
                    }
                }
                Ok(())
            }
            ScannedItem::Variable(v) => {
                match self.variable_index.get(&v.name) {
                    Some(&i) => self.variables[i].merge(v),
                    None => {
                        self.variable_index.insert(v.name.clone(), self.variables.len());
                        self.variables.push(v);
                    }
                }
                Ok(())
            }
            ScannedItem::Placeholder(p) => {
                // Identity is the statement and its place; the first sighting keeps its origin
                let seen = self
                    .placeholders
                    .iter()
                    .any(|known| known.annotation == p.annotation && known.location == p.location);
                if !seen {
                    self.placeholders.push(p);
                }
                Ok(())
            }
        }
    }
}

fn redefinition(
    kind: DeclKind,
    name: &str,
    at: crate::model::DeclLocation,
    conflict: Redefinition,
) -> MalformedDeclarationError {
    MalformedDeclarationError::new(
        at.file,
        at.location,
        kind,
        format!("redefinition of '{}' (first defined at {})", name, conflict.first),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Annotation, DeclLocation, Origin};
    use crate::parser::ast::{SourceLocation, Type};

    fn at(line: usize) -> DeclLocation {
        DeclLocation::new("api.c", SourceLocation::new(line, 1))
    }

    fn function(name: &str, line: usize, defined: bool) -> Function {
        let mut f = Function::new(name, Type::builtin("void"), Origin::InputFile, at(line));
        if defined {
            f.is_defined = true;
            f.definition = Some(at(line));
        }
        f
    }

    #[test]
    fn test_first_encounter_order() {
        let mut session = ParseSession::new();
        session.merge(ScannedItem::Function(function("b", 1, false))).unwrap();
        session.merge(ScannedItem::Function(function("a", 2, false))).unwrap();
        session.merge(ScannedItem::Function(function("b", 3, true))).unwrap();

        let names: Vec<&str> = session.functions().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(session.function("b").unwrap().is_defined);
    }

    #[test]
    fn test_kinds_are_separate_namespaces() {
        let mut session = ParseSession::new();
        session.merge(ScannedItem::Function(function("point", 1, false))).unwrap();
        session
            .merge(ScannedItem::Structure(Structure::new("point", Origin::InputFile, at(2))))
            .unwrap();
        session
            .merge(ScannedItem::Typedef(Typedef::new("point", Type::builtin("int"), Origin::InputFile, at(3))))
            .unwrap();

        assert_eq!(session.functions().len(), 1);
        assert_eq!(session.structures().len(), 1);
        assert_eq!(session.typedefs().len(), 1);
    }

    #[test]
    fn test_redefinition_is_reported() {
        let mut session = ParseSession::new();
        session.merge(ScannedItem::Function(function("f", 1, true))).unwrap();
        let err = session.merge(ScannedItem::Function(function("f", 8, true))).unwrap_err();

        assert_eq!(err.kind, DeclKind::Function);
        assert_eq!(err.location, SourceLocation::new(8, 1));
        assert!(err.reason.contains("redefinition of 'f'"));
        assert_eq!(session.functions().len(), 1);
    }

    #[test]
    fn test_placeholders_deduplicated() {
        let mut session = ParseSession::new();
        let group = Annotation::with_arguments("GROUP", vec!["g".into()]).unwrap();
        let p = Placeholder::new(group.clone(), Origin::InputFile, at(1));
        session.merge(ScannedItem::Placeholder(p.clone())).unwrap();
        session.merge(ScannedItem::Placeholder(p)).unwrap();

        // Same statement reached again through an include
        let again = Placeholder::new(group.clone(), Origin::IncludedFile, at(1));
        session.merge(ScannedItem::Placeholder(again)).unwrap();
        assert_eq!(session.placeholders().len(), 1);
        assert_eq!(session.placeholders()[0].origin, Origin::InputFile);

        let elsewhere = Placeholder::new(group, Origin::InputFile, at(7));
        session.merge(ScannedItem::Placeholder(elsewhere)).unwrap();
        assert_eq!(session.placeholders().len(), 2);
    }
}
