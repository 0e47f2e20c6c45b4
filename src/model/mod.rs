//! Declaration models handed to the generation stage
//!
//! - [`annotation`]: [`Annotation`] value object
//! - [`function`]: [`Function`] prototypes and definitions
//! - [`structure`]: [`Structure`] forward declarations and definitions
//! - [`typedef`]: [`Typedef`] aliases, including callback (function pointer) types
//! - [`variable`]: file-scope [`Variable`]s
//! - [`placeholder`]: top-level marker statements ([`Placeholder`])
//!
//! Every model implements [`Declaration`], which gives the stable identity
//! (name + kind), origin, first location, and the ordered annotation list.

pub mod annotation;
pub mod function;
pub mod placeholder;
pub mod structure;
pub mod typedef;
pub mod variable;

pub use annotation::{Annotation, EmptyAnnotationName};
pub use function::{Function, StorageClass};
pub use placeholder::Placeholder;
pub use structure::Structure;
pub use typedef::Typedef;
pub use variable::Variable;

use crate::parser::ast::SourceLocation;
use std::fmt;
use std::path::{Path, PathBuf};

/// Independent identity namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Function,
    Structure,
    Typedef,
    Variable,
    Placeholder,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeclKind::Function => "function",
            DeclKind::Structure => "structure",
            DeclKind::Typedef => "typedef",
            DeclKind::Variable => "variable",
            DeclKind::Placeholder => "placeholder",
        };
        f.write_str(s)
    }
}

/// Whether a declaration came from a file passed to `parse()` or from a header it included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    InputFile,
    IncludedFile,
}

impl Origin {
    pub fn is_input(self) -> bool {
        self == Origin::InputFile
    }
}

/// File and position of a declaration's first token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclLocation {
    pub file: PathBuf,
    pub location: SourceLocation,
}

impl DeclLocation {
    pub fn new(file: impl Into<PathBuf>, location: SourceLocation) -> Self {
        DeclLocation {
            file: file.into(),
            location,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

impl fmt::Display for DeclLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.location)
    }
}

/// Identity and annotations shared by every model
pub trait Declaration {
    fn name(&self) -> &str;
    fn kind(&self) -> DeclKind;
    fn origin(&self) -> Origin;
    fn location(&self) -> &DeclLocation;
    fn annotations(&self) -> &[Annotation];

    fn is_annotated(&self) -> bool {
        !self.annotations().is_empty()
    }
}

/// Two definitions of the same name at different places
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redefinition {
    pub first: DeclLocation,
}

/// Append annotations not already present, keeping first-seen order
pub(crate) fn union_annotations(into: &mut Vec<Annotation>, from: Vec<Annotation>) {
    for annotation in from {
        if !into.contains(&annotation) {
            into.push(annotation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_annotations_keeps_order() {
        let rpc = Annotation::new("rpc").unwrap();
        let out = Annotation::with_arguments("OUT", vec!["buf".into()]).unwrap();
        let event = Annotation::new("EVENT").unwrap();

        let mut list = vec![rpc.clone(), out.clone()];
        union_annotations(&mut list, vec![event.clone(), rpc.clone()]);

        assert_eq!(list, vec![rpc, out, event]);
    }
}
