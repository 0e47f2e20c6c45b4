//! Type aliases

use super::{union_annotations, Annotation, DeclKind, DeclLocation, Declaration, Origin};
use crate::parser::ast::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Typedef {
    pub alias_name: String,
    pub underlying_type: Type,
    pub origin: Origin,
    pub location: DeclLocation,
    pub annotations: Vec<Annotation>,
}

impl Typedef {
    pub fn new(alias_name: impl Into<String>, underlying_type: Type, origin: Origin, location: DeclLocation) -> Self {
        Typedef {
            alias_name: alias_name.into(),
            underlying_type,
            origin,
            location,
            annotations: Vec::new(),
        }
    }

    /// Function pointer alias, e.g. `typedef int (*callback_t)(int);`
    pub fn is_callback(&self) -> bool {
        self.underlying_type.is_function_pointer()
    }

    /// First sighting wins; repeats only contribute annotations
    pub(crate) fn merge(&mut self, newer: Typedef) {
        union_annotations(&mut self.annotations, newer.annotations);
    }
}

impl Declaration for Typedef {
    fn name(&self) -> &str {
        &self.alias_name
    }

    fn kind(&self) -> DeclKind {
        DeclKind::Typedef
    }

    fn origin(&self) -> Origin {
        self.origin
    }

    fn location(&self) -> &DeclLocation {
        &self.location
    }

    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}
