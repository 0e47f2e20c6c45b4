//! C declaration parser
//!
//! This module turns annotated C sources into the declaration models in
//! [`crate::model`]:
//! - [`lexer`]: Tokenization (source text → tokens + comment/blank-line trivia)
//! - [`ast`]: Source locations and the C type model
//! - `scanner`: Token cursor, top-level loop and error recovery
//! - `declarations`: Specifiers, declarators, structs, functions, typedefs, variables
//! - `annotations`: Marker recognition in attributes, comments and statements
//! - [`parser`]: The public [`Parser`]: files, includes, session and queries
//!
//! # What is parsed
//!
//! Only file-scope declarations are modeled. Function bodies and initializers
//! are skipped by delimiter matching; marker statements inside function bodies
//! are the one thing picked out of them. Preprocessor directives are skipped
//! except `#include`, which is followed, and `#if 0` regions, which are dropped.
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent over the token stream, with C declarators
//! resolved inside-out. No external parser generator dependencies.

pub mod ast;
pub mod lexer;
#[allow(clippy::module_inception)]
pub mod parser;

mod annotations;
mod declarations;
pub(crate) mod scanner;

pub use declarations::ANONYMOUS_TAG;
pub use parser::{ParseReport, Parser};
