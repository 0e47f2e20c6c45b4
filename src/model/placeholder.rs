//! Top-level marker statements such as `SERIALIZE(GROUP(my_group));`
//!
//! They carry no declaration of their own; the emitter uses them as
//! module-level directives or as the spot to put generated code.

use super::{Annotation, DeclKind, DeclLocation, Declaration, Origin};
use std::slice;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub annotation: Annotation,
    pub origin: Origin,
    pub location: DeclLocation,
}

impl Placeholder {
    pub fn new(annotation: Annotation, origin: Origin, location: DeclLocation) -> Self {
        Placeholder {
            annotation,
            origin,
            location,
        }
    }
}

impl Declaration for Placeholder {
    fn name(&self) -> &str {
        self.annotation.name()
    }

    fn kind(&self) -> DeclKind {
        DeclKind::Placeholder
    }

    fn origin(&self) -> Origin {
        self.origin
    }

    fn location(&self) -> &DeclLocation {
        &self.location
    }

    fn annotations(&self) -> &[Annotation] {
        slice::from_ref(&self.annotation)
    }
}
