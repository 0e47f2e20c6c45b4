//! Structure forward declarations and definitions

use super::{union_annotations, Annotation, DeclKind, DeclLocation, Declaration, Origin, Redefinition};
use crate::parser::ast::{Field, Type};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Structure {
    pub name: String,
    pub fields: Vec<Field>,
    /// Has a field block, as opposed to `struct name;`
    pub is_defined: bool,
    pub origin: Origin,
    pub location: DeclLocation,
    pub definition: Option<DeclLocation>,
    pub annotations: Vec<Annotation>,
}

impl Structure {
    pub fn new(name: impl Into<String>, origin: Origin, location: DeclLocation) -> Self {
        Structure {
            name: name.into(),
            fields: Vec::new(),
            is_defined: false,
            origin,
            location,
            definition: None,
            annotations: Vec::new(),
        }
    }

    /// `(name, type)` pairs in declaration order
    pub fn field_pairs(&self) -> impl Iterator<Item = (&str, &Type)> {
        self.fields.iter().map(|f| (f.name.as_str(), &f.field_type))
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub(crate) fn merge(&mut self, newer: Structure) -> Result<(), Redefinition> {
        if newer.is_defined && self.is_defined {
            if self.definition.as_ref() == Some(&newer.location) {
                union_annotations(&mut self.annotations, newer.annotations);
                return Ok(());
            }
            return Err(Redefinition {
                first: self.definition.clone().unwrap_or_else(|| self.location.clone()),
            });
        }

        union_annotations(&mut self.annotations, newer.annotations);
        if newer.is_defined {
            self.fields = newer.fields;
            self.is_defined = true;
            self.definition = Some(newer.location);
        }
        Ok(())
    }
}

impl Declaration for Structure {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeclKind {
        DeclKind::Structure
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
    fn test_forward_then_definition() {
        let loc = |line| DeclLocation::new("api.h", SourceLocation::new(line, 1));
        let mut forward = Structure::new("ping_res", Origin::IncludedFile, loc(1));
        let mut defined = Structure::new("ping_res", Origin::InputFile, loc(3));
        defined.is_defined = true;
        defined.fields.push(Field {
            name: "code".into(),
            field_type: Type::builtin("int"),
            bit_width: None,
        });

        forward.merge(defined).unwrap();

        assert!(forward.is_defined);
        assert_eq!(forward.origin, Origin::IncludedFile);
        assert_eq!(forward.field("code").map(|f| f.field_type.to_string()), Some("int".into()));
        assert_eq!(forward.definition, Some(loc(3)));
    }
}
