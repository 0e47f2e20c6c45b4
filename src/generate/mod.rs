//! Generation interface
//!
//! The parser's output is handed to an external emitter through this module.
//! Each model is a [`UnitGenerator`]; the four kinds a generator stage works
//! with are wrapped in the [`Unit`] tagged variant, so callers can hold a
//! mixed list and dispatch through one `generate` call.
//!
//! Which regions of output are wanted is described by [`CodeBlocks`]: an
//! optional header and footer plus a non-empty ordered list of body
//! [`Block`]s. [`StubEmitter`] is the reference [`Emitter`].

pub mod stub;

pub use stub::StubEmitter;

use crate::model::{Annotation, Declaration, Function, Placeholder, Structure, Typedef, Variable};
use crate::rpc::RpcError;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("code blocks need at least one body block")]
    EmptyBody,

    #[error("unknown code block '{0}'")]
    UnknownBlock(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("failed to format generated code")]
    Format(#[from] std::fmt::Error),
}

/// One named region of a generated function body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Block {
    Locals,
    Encode,
    Send,
    Decode,
    Execute,
    Response,
    Return,
}

impl Block {
    pub const ALL: [Block; 7] = [
        Block::Locals,
        Block::Encode,
        Block::Send,
        Block::Decode,
        Block::Execute,
        Block::Response,
        Block::Return,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Block::Locals => "locals",
            Block::Encode => "encode",
            Block::Send => "send",
            Block::Decode => "decode",
            Block::Execute => "execute",
            Block::Response => "response",
            Block::Return => "return",
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Block {
    type Err = GenerateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Block::ALL
            .into_iter()
            .find(|b| b.name() == s.trim())
            .ok_or_else(|| GenerateError::UnknownBlock(s.to_string()))
    }
}

/// The regions a caller wants rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlocks {
    include_header: bool,
    include_footer: bool,
    body: Vec<Block>,
}

impl CodeBlocks {
    pub fn new(include_header: bool, include_footer: bool, body: Vec<Block>) -> Result<Self, GenerateError> {
        if body.is_empty() {
            return Err(GenerateError::EmptyBody);
        }
        Ok(CodeBlocks {
            include_header,
            include_footer,
            body,
        })
    }

    /// Header, footer and every body block, in natural order
    pub fn all() -> Self {
        CodeBlocks {
            include_header: true,
            include_footer: true,
            body: Block::ALL.to_vec(),
        }
    }

    /// Body blocks from their names, e.g. `["locals", "encode", "send"]`
    pub fn from_names<S: AsRef<str>>(
        include_header: bool,
        include_footer: bool,
        names: &[S],
    ) -> Result<Self, GenerateError> {
        let body = names
            .iter()
            .map(|n| n.as_ref().parse())
            .collect::<Result<Vec<Block>, _>>()?;
        Self::new(include_header, include_footer, body)
    }

    pub fn include_header(&self) -> bool {
        self.include_header
    }

    pub fn include_footer(&self) -> bool {
        self.include_footer
    }

    pub fn body(&self) -> &[Block] {
        &self.body
    }

    pub fn contains(&self, block: Block) -> bool {
        self.body.contains(&block)
    }
}

/// The external emission layer: one entry point per unit kind
pub trait Emitter {
    fn emit_function(&mut self, function: &Function, blocks: &CodeBlocks) -> Result<String, GenerateError>;

    fn emit_structure(&mut self, structure: &Structure, blocks: &CodeBlocks) -> Result<String, GenerateError>;

    fn emit_placeholder(&mut self, placeholder: &Placeholder, blocks: &CodeBlocks) -> Result<String, GenerateError>;

    fn emit_annotation(&mut self, annotation: &Annotation, blocks: &CodeBlocks) -> Result<String, GenerateError>;

    /// Typedefs produce nothing unless an emitter asks for them
    fn emit_typedef(&mut self, _typedef: &Typedef, _blocks: &CodeBlocks) -> Result<String, GenerateError> {
        Ok(String::new())
    }

    fn emit_variable(&mut self, _variable: &Variable, _blocks: &CodeBlocks) -> Result<String, GenerateError> {
        Ok(String::new())
    }
}

/// Anything that can render itself through an [`Emitter`]
pub trait UnitGenerator {
    fn generate(&self, emitter: &mut dyn Emitter, blocks: &CodeBlocks) -> Result<String, GenerateError>;
}

impl UnitGenerator for Function {
    fn generate(&self, emitter: &mut dyn Emitter, blocks: &CodeBlocks) -> Result<String, GenerateError> {
        emitter.emit_function(self, blocks)
    }
}

impl UnitGenerator for Structure {
    fn generate(&self, emitter: &mut dyn Emitter, blocks: &CodeBlocks) -> Result<String, GenerateError> {
        emitter.emit_structure(self, blocks)
    }
}

impl UnitGenerator for Placeholder {
    fn generate(&self, emitter: &mut dyn Emitter, blocks: &CodeBlocks) -> Result<String, GenerateError> {
        emitter.emit_placeholder(self, blocks)
    }
}

impl UnitGenerator for Annotation {
    fn generate(&self, emitter: &mut dyn Emitter, blocks: &CodeBlocks) -> Result<String, GenerateError> {
        emitter.emit_annotation(self, blocks)
    }
}

impl UnitGenerator for Typedef {
    fn generate(&self, emitter: &mut dyn Emitter, blocks: &CodeBlocks) -> Result<String, GenerateError> {
        emitter.emit_typedef(self, blocks)
    }
}

impl UnitGenerator for Variable {
    fn generate(&self, emitter: &mut dyn Emitter, blocks: &CodeBlocks) -> Result<String, GenerateError> {
        emitter.emit_variable(self, blocks)
    }
}

/// A generation unit borrowed from the session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Unit<'a> {
    Function(&'a Function),
    Structure(&'a Structure),
    Placeholder(&'a Placeholder),
    Annotation(&'a Annotation),
}

impl<'a> Unit<'a> {
    pub fn name(&self) -> &'a str {
        match *self {
            Unit::Function(f) => &f.name,
            Unit::Structure(s) => &s.name,
            Unit::Placeholder(p) => p.annotation.name(),
            Unit::Annotation(a) => a.name(),
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Unit::Function(_) => "function",
            Unit::Structure(_) => "struct",
            Unit::Placeholder(_) => "placeholder",
            Unit::Annotation(_) => "annotation",
        }
    }

    /// Annotations carried by the unit; an annotation unit carries itself
    pub fn annotations(&self) -> &'a [Annotation] {
        match *self {
            Unit::Function(f) => f.annotations(),
            Unit::Structure(s) => s.annotations(),
            Unit::Placeholder(p) => p.annotations(),
            Unit::Annotation(a) => std::slice::from_ref(a),
        }
    }

    pub fn generate(&self, emitter: &mut dyn Emitter, blocks: &CodeBlocks) -> Result<String, GenerateError> {
        match self {
            Unit::Function(f) => f.generate(emitter, blocks),
            Unit::Structure(s) => s.generate(emitter, blocks),
            Unit::Placeholder(p) => p.generate(emitter, blocks),
            Unit::Annotation(a) => a.generate(emitter, blocks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeclLocation, Origin};
    use crate::parser::ast::{SourceLocation, Type};

    /// Records which entry point was called
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Emitter for Recorder {
        fn emit_function(&mut self, function: &Function, _: &CodeBlocks) -> Result<String, GenerateError> {
            self.calls.push(format!("function {}", function.name));
            Ok(String::new())
        }

        fn emit_structure(&mut self, structure: &Structure, _: &CodeBlocks) -> Result<String, GenerateError> {
            self.calls.push(format!("structure {}", structure.name));
            Ok(String::new())
        }

        fn emit_placeholder(&mut self, placeholder: &Placeholder, _: &CodeBlocks) -> Result<String, GenerateError> {
            self.calls.push(format!("placeholder {}", placeholder.annotation));
            Ok(String::new())
        }

        fn emit_annotation(&mut self, annotation: &Annotation, _: &CodeBlocks) -> Result<String, GenerateError> {
            self.calls.push(format!("annotation {}", annotation));
            Ok(String::new())
        }
    }

    #[test]
    fn test_code_blocks_require_body() {
        assert_eq!(CodeBlocks::new(true, true, vec![]), Err(GenerateError::EmptyBody));
        let blocks = CodeBlocks::from_names(false, true, &["locals", "send"]).unwrap();
        assert_eq!(blocks.body(), [Block::Locals, Block::Send]);
        assert!(!blocks.include_header());
        assert_eq!(
            CodeBlocks::from_names(false, false, &["bogus"]),
            Err(GenerateError::UnknownBlock("bogus".into()))
        );
    }

    #[test]
    fn test_unit_dispatch() {
        let at = DeclLocation::new("api.c", SourceLocation::new(1, 1));
        let function = Function::new("ping", Type::builtin("void"), Origin::InputFile, at.clone());
        let structure = Structure::new("ping_res", Origin::InputFile, at.clone());
        let group = Annotation::with_arguments("GROUP", vec!["grp".into()]).unwrap();
        let placeholder = Placeholder::new(group.clone(), Origin::InputFile, at);

        let units = [
            Unit::Function(&function),
            Unit::Structure(&structure),
            Unit::Placeholder(&placeholder),
            Unit::Annotation(&group),
        ];
        let mut recorder = Recorder::default();
        for unit in units {
            unit.generate(&mut recorder, &CodeBlocks::all()).unwrap();
        }

        assert_eq!(
            recorder.calls,
            vec![
                "function ping",
                "structure ping_res",
                "placeholder @GROUP(grp)",
                "annotation @GROUP(grp)",
            ]
        );
        assert_eq!(units[2].name(), "GROUP");
        assert_eq!(units[3].annotations().len(), 1);
    }
}
