//! Terminal inspector built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! The UI is organized into three layers:
//!
//! - **[`app`]**: inspector state, keyboard event loop, pane focus, and the
//!   [`UnitEntry`] rows built from a parsed session
//! - **[`panes`]**: stateless render functions for each visible pane (units,
//!   detail, diagnostics, status bar)
//! - **[`theme`]**: centralized color palette used by all panes
//!
//! The entry point for consumers is [`App`]: construct it from a [`Parser`]
//! that has already parsed its inputs and call [`App::run`] to start the
//! event loop.
//!
//! [`Parser`]: crate::parser::Parser
//! [`App::run`]: app::App::run

pub mod app;
pub mod panes;
pub mod theme;

pub use app::{App, UnitEntry};
