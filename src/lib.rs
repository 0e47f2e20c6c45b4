//! # Introduction
//!
//! rpcstub reads annotated C translation units and extracts the declarations
//! an RPC stub generator needs: functions, structures, typedefs, file-scope
//! variables and top-level marker statements, each with the annotations that
//! were attached to it. The extracted units are then handed to an emitter
//! that writes the client stubs, server handlers and response callbacks.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Lexer → Scanner → Declarations → Session → Units → Emitter
//! ```
//!
//! 1. [`parser`]: tokenises the source and scans file-scope declarations,
//!    following `#include` and recording recoverable errors.
//! 2. [`model`]: the declaration records and their annotations.
//! 3. [`session`]: ordered, merged storage of everything parsed so far.
//! 4. [`rpc`]: RPC naming, boundary discovery and parameter directions.
//! 5. [`generate`]: the emitter contract, code-block selection and a
//!    reference stub emitter.
//! 6. [`ui`]: ratatui-based inspector; not part of the stable library API.
//!
//! ## Example
//!
//! ```no_run
//! use rpcstub::config::Configuration;
//! use rpcstub::parser::Parser;
//!
//! let mut parser = Parser::new(Configuration::new(["rpc"]))?;
//! parser.parse("api.c")?;
//! for function in parser.get_functions(true, false, true) {
//!     println!("{}", function.signature());
//! }
//! # Ok::<(), rpcstub::Error>(())
//! ```

pub mod config;
pub mod errors;
pub mod generate;
pub mod model;
pub mod parser;
pub mod rpc;
pub mod session;
pub mod ui;

pub use errors::Error;
