//! File-scope variables

use super::{union_annotations, Annotation, DeclKind, DeclLocation, Declaration, Origin};
use crate::parser::ast::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub var_type: Type,
    pub is_extern: bool,
    pub is_static: bool,
    /// Initializer text as written, if any
    pub initializer: Option<String>,
    pub origin: Origin,
    pub location: DeclLocation,
    pub annotations: Vec<Annotation>,
}

impl Variable {
    pub fn new(name: impl Into<String>, var_type: Type, origin: Origin, location: DeclLocation) -> Self {
        Variable {
            name: name.into(),
            var_type,
            is_extern: false,
            is_static: false,
            initializer: None,
            origin,
            location,
            annotations: Vec::new(),
        }
    }

    /// `extern int x;` followed by `int x = 1;` leaves one non-extern record
    pub(crate) fn merge(&mut self, newer: Variable) {
        if !newer.is_extern {
            self.is_extern = false;
        }
        if self.initializer.is_none() {
            self.initializer = newer.initializer;
        }
        union_annotations(&mut self.annotations, newer.annotations);
    }
}

impl Declaration for Variable {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeclKind {
        DeclKind::Variable
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::SourceLocation;

    #[test]
    fn test_extern_then_definition() {
        let loc = |line| DeclLocation::new("api.c", SourceLocation::new(line, 1));
        let mut first = Variable::new("counter", Type::builtin("int"), Origin::InputFile, loc(1));
        first.is_extern = true;
        let mut second = Variable::new("counter", Type::builtin("int"), Origin::InputFile, loc(4));
        second.initializer = Some("0".into());

        first.merge(second);

        assert!(!first.is_extern);
        assert_eq!(first.initializer.as_deref(), Some("0"));
        assert_eq!(first.location, loc(1));
    }
}
