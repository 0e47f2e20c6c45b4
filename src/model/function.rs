//! Function prototypes and definitions

use super::{union_annotations, Annotation, DeclKind, DeclLocation, Declaration, Origin, Redefinition};
use crate::parser::ast::{Param, Type};

/// Storage-class and function specifiers seen on a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StorageClass {
    pub is_static: bool,
    pub is_extern: bool,
    pub is_inline: bool,
}

impl StorageClass {
    fn union(self, other: StorageClass) -> StorageClass {
        StorageClass {
            is_static: self.is_static || other.is_static,
            is_extern: self.is_extern || other.is_extern,
            is_inline: self.is_inline || other.is_inline,
        }
    }
}

/// One record per function name in a session. A later definition fills in
/// the prototype it follows; annotations from every sighting are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub return_type: Type,
    pub parameters: Vec<Param>,
    pub is_variadic: bool,
    pub is_defined: bool,
    pub storage: StorageClass,
    pub origin: Origin,
    /// First sighting
    pub location: DeclLocation,
    /// Where the body was found, once defined
    pub definition: Option<DeclLocation>,
    pub annotations: Vec<Annotation>,
}

impl Function {
    pub fn new(name: impl Into<String>, return_type: Type, origin: Origin, location: DeclLocation) -> Self {
        Function {
            name: name.into(),
            return_type,
            parameters: Vec::new(),
            is_variadic: false,
            is_defined: false,
            storage: StorageClass::default(),
            origin,
            location,
            definition: None,
            annotations: Vec::new(),
        }
    }

    pub fn get_annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// `(name, type)` pairs in declaration order
    pub fn params(&self) -> impl Iterator<Item = (Option<&str>, &Type)> {
        self.parameters
            .iter()
            .map(|p| (p.name.as_deref(), &p.param_type))
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.parameters
            .iter()
            .find(|p| p.name.as_deref() == Some(name))
    }

    pub fn returns_void(&self) -> bool {
        self.return_type.is_void()
    }

    /// C prototype text, e.g. `int foo(int x, char *buf)`
    pub fn signature(&self) -> String {
        let mut params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| match &p.name {
                Some(name) => p.param_type.declare(name),
                None => p.param_type.to_string(),
            })
            .collect();
        if self.is_variadic {
            params.push("...".to_string());
        }
        if params.is_empty() {
            params.push("void".to_string());
        }
        self.return_type
            .declare(&format!("{}({})", self.name, params.join(", ")))
    }

    /// Fold a later sighting of the same name into this record
    pub(crate) fn merge(&mut self, newer: Function) -> Result<(), Redefinition> {
        if newer.is_defined && self.is_defined {
            if self.definition.as_ref() == Some(&newer.location) {
                union_annotations(&mut self.annotations, newer.annotations);
                return Ok(());
            }
            return Err(Redefinition {
                first: self.definition.clone().unwrap_or_else(|| self.location.clone()),
            });
        }

        self.storage = self.storage.union(newer.storage);
        union_annotations(&mut self.annotations, newer.annotations);

        if newer.is_defined {
            self.return_type = newer.return_type;
            self.parameters = newer.parameters;
            self.is_variadic = newer.is_variadic;
            self.is_defined = true;
            self.definition = Some(newer.location);
        }
        Ok(())
    }
}

impl Declaration for Function {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeclKind {
        DeclKind::Function
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

    fn at(line: usize) -> DeclLocation {
        DeclLocation::new("api.c", SourceLocation::new(line, 1))
    }

    fn prototype(line: usize) -> Function {
        let mut f = Function::new("foo", Type::builtin("int"), Origin::InputFile, at(line));
        f.parameters.push(Param {
            name: None,
            param_type: Type::builtin("int"),
        });
        f
    }

    fn definition(line: usize) -> Function {
        let mut f = Function::new("foo", Type::builtin("int"), Origin::IncludedFile, at(line));
        f.parameters.push(Param {
            name: Some("x".into()),
            param_type: Type::builtin("int"),
        });
        f.is_defined = true;
        f.definition = Some(at(line));
        f
    }

    #[test]
    fn test_signature() {
        let mut f = definition(1);
        f.parameters.push(Param {
            name: Some("buf".into()),
            param_type: Type::builtin("char").with_pointer(),
        });
        assert_eq!(f.signature(), "int foo(int x, char *buf)");

        let g = Function::new("ping", Type::builtin("void"), Origin::InputFile, at(1));
        assert_eq!(g.signature(), "void ping(void)");
    }

    #[test]
    fn test_definition_fills_prototype() {
        let mut f = prototype(1);
        f.annotations.push(Annotation::new("rpc").unwrap());
        let mut d = definition(5);
        d.annotations.push(Annotation::new("EVENT").unwrap());
        d.annotations.push(Annotation::new("rpc").unwrap());

        f.merge(d).unwrap();

        assert!(f.is_defined);
        assert_eq!(f.param("x").map(|p| p.param_type.to_string()), Some("int".into()));
        // Origin and first location stay from the first sighting
        assert_eq!(f.origin, Origin::InputFile);
        assert_eq!(f.location, at(1));
        assert_eq!(f.definition, Some(at(5)));
        let names: Vec<&str> = f.annotations.iter().map(Annotation::name).collect();
        assert_eq!(names, vec!["rpc", "EVENT"]);
    }

    #[test]
    fn test_prototype_after_definition_changes_nothing() {
        let mut f = definition(1);
        f.merge(prototype(9)).unwrap();
        assert!(f.is_defined);
        assert_eq!(f.parameters[0].name.as_deref(), Some("x"));
    }

    #[test]
    fn test_redefinition() {
        let mut f = definition(1);
        assert_eq!(f.merge(definition(1)), Ok(()));
        assert_eq!(f.merge(definition(7)), Err(Redefinition { first: at(1) }));
    }
}
