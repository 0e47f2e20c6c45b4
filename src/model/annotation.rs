//! Annotation value object

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("annotation name must not be empty")]
pub struct EmptyAnnotationName;

/// A marker attached to a declaration: a name plus literal arguments as written.
///
/// Immutable once built; equality is by `(name, arguments)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Annotation {
    name: String,
    arguments: Vec<String>,
}

impl Annotation {
    pub fn new(name: impl Into<String>) -> Result<Self, EmptyAnnotationName> {
        Self::with_arguments(name, Vec::new())
    }

    pub fn with_arguments(
        name: impl Into<String>,
        arguments: Vec<String>,
    ) -> Result<Self, EmptyAnnotationName> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(EmptyAnnotationName);
        }
        Ok(Annotation { name, arguments })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// First argument, which most markers use as their subject (`OUT(buf)`)
    pub fn first_argument(&self) -> Option<&str> {
        self.arguments.first().map(String::as_str)
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        if !self.arguments.is_empty() {
            write!(f, "({})", self.arguments.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_rejected() {
        assert_eq!(Annotation::new(""), Err(EmptyAnnotationName));
        assert_eq!(Annotation::new("  "), Err(EmptyAnnotationName));
    }

    #[test]
    fn test_equality_by_name_and_arguments() {
        let a = Annotation::with_arguments("OUT", vec!["buf".into()]).unwrap();
        let b = Annotation::with_arguments("OUT", vec!["buf".into()]).unwrap();
        let c = Annotation::with_arguments("OUT", vec!["len".into()]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, Annotation::new("OUT").unwrap());
    }

    #[test]
    fn test_display() {
        assert_eq!(Annotation::new("rpc").unwrap().to_string(), "@rpc");
        let sized = Annotation::with_arguments("SIZE", vec!["buf".into(), "len".into()]).unwrap();
        assert_eq!(sized.to_string(), "@SIZE(buf, len)");
        assert_eq!(sized.first_argument(), Some("buf"));
    }
}
