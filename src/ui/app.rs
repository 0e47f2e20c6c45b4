//! Main inspector state and logic

use crate::errors::RecordedError;
use crate::generate::{CodeBlocks, StubEmitter, Unit};
use crate::model::{Declaration, Origin};
use crate::parser::Parser;
use crate::rpc::{discover_rpc_functions, RpcNames};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Units,
    Detail,
    Diagnostics,
}

impl FocusedPane {
    /// Move focus to the next pane (units -> detail -> diagnostics)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Units => FocusedPane::Detail,
            FocusedPane::Detail => FocusedPane::Diagnostics,
            FocusedPane::Diagnostics => FocusedPane::Units,
        }
    }

    /// Move focus to the previous pane
    pub fn prev(self) -> Self {
        match self {
            FocusedPane::Units => FocusedPane::Diagnostics,
            FocusedPane::Detail => FocusedPane::Units,
            FocusedPane::Diagnostics => FocusedPane::Detail,
        }
    }
}

/// One row of the unit list, with everything the detail pane shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitEntry {
    pub kind: &'static str,
    pub name: String,
    pub location: String,
    pub origin: Origin,
    pub annotations: Vec<String>,
    pub details: Vec<String>,
    /// Output of the stub emitter, when the unit generates anything
    pub preview: Option<String>,
}

impl UnitEntry {
    /// Rows for every declaration in the session: functions, structures,
    /// typedefs, variables, then placeholders
    pub fn collect(parser: &Parser) -> Vec<UnitEntry> {
        let rpc_functions = discover_rpc_functions(parser);
        let blocks = CodeBlocks::all();
        let mut emitter = StubEmitter::new().with_indent("    ");
        let mut entries = Vec::new();

        for function in parser.get_functions(false, false, false) {
            let mut details = vec![function.signature()];
            let storage: Vec<&str> = [
                (function.storage.is_static, "static"),
                (function.storage.is_extern, "extern"),
                (function.storage.is_inline, "inline"),
            ]
            .into_iter()
            .filter_map(|(set, word)| set.then_some(word))
            .collect();
            if !storage.is_empty() {
                details.push(format!("storage: {}", storage.join(" ")));
            }
            match &function.definition {
                Some(at) => details.push(format!("defined at {}", at)),
                None => details.push("prototype only".to_string()),
            }

            let unit = Unit::Function(function);
            let preview = if rpc_functions.contains(&function.name) {
                let names = RpcNames::for_function(&function.name);
                details.push(format!("handler: {}", names.handler));
                details.push(format!("response: {}", names.response));
                details.push(format!("result: struct {}", names.result));
                Some(
                    unit.generate(&mut emitter, &blocks)
                        .unwrap_or_else(|err| format!("/* cannot generate: {} */", err)),
                )
            } else {
                None
            };
            entries.push(UnitEntry::from_declaration(unit.kind_label(), function, details, preview));
        }

        for structure in parser.get_structures(false) {
            let details = if structure.is_defined {
                structure
                    .fields
                    .iter()
                    .map(|f| format!("{};", f.field_type.declare(&f.name)))
                    .collect()
            } else {
                vec!["forward declaration".to_string()]
            };
            let unit = Unit::Structure(structure);
            let preview = unit.generate(&mut emitter, &blocks).ok();
            entries.push(UnitEntry::from_declaration(unit.kind_label(), structure, details, preview));
        }

        for typedef in parser.get_typedefs() {
            let mut details = vec![format!("typedef {};", typedef.underlying_type.declare(&typedef.alias_name))];
            if typedef.is_callback() {
                details.push("callback type".to_string());
            }
            entries.push(UnitEntry::from_declaration("typedef", typedef, details, None));
        }

        for variable in parser.get_variables(false) {
            let mut details = vec![variable.var_type.declare(&variable.name)];
            if variable.is_extern {
                details.push("extern".to_string());
            }
            if variable.is_static {
                details.push("static".to_string());
            }
            if let Some(init) = &variable.initializer {
                details.push(format!("= {}", init));
            }
            entries.push(UnitEntry::from_declaration("variable", variable, details, None));
        }

        for placeholder in parser.get_placeholders(false) {
            let unit = Unit::Placeholder(placeholder);
            let preview = unit.generate(&mut emitter, &blocks).ok();
            entries.push(UnitEntry::from_declaration(unit.kind_label(), placeholder, Vec::new(), preview));
        }

        entries
    }

    fn from_declaration<D: Declaration + ?Sized>(
        kind: &'static str,
        decl: &D,
        details: Vec<String>,
        preview: Option<String>,
    ) -> Self {
        UnitEntry {
            kind,
            name: decl.name().to_string(),
            location: decl.location().to_string(),
            origin: decl.origin(),
            annotations: decl.annotations().iter().map(ToString::to_string).collect(),
            details,
            preview,
        }
    }
}

/// The inspector state
pub struct App {
    pub entries: Vec<UnitEntry>,
    pub errors: Vec<RecordedError>,
    pub input_files: usize,

    /// Currently focused pane
    pub focused_pane: FocusedPane,

    /// Index into `entries`
    pub selected: usize,

    /// Per-pane scroll offsets
    pub units_scroll: usize,
    pub detail_scroll: usize,
    pub diagnostics_scroll: usize,

    /// Whether the app should quit
    pub should_quit: bool,

    /// Status message to display
    pub status_message: String,
}

impl App {
    /// Create an inspector over everything `parser` has extracted so far
    pub fn new(parser: &Parser) -> Self {
        let entries = UnitEntry::collect(parser);
        let status_message = format!("{} units extracted", entries.len());
        App {
            entries,
            errors: parser.errors().to_vec(),
            input_files: parser.session().input_files().len(),
            focused_pane: FocusedPane::Units,
            selected: 0,
            units_scroll: 0,
            detail_scroll: 0,
            diagnostics_scroll: 0,
            should_quit: false,
            status_message,
        }
    }

    pub fn selected_entry(&self) -> Option<&UnitEntry> {
        self.entries.get(self.selected)
    }

    /// Run the inspector
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    /// Render the UI
    pub fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        // Panes on top, status bar at the bottom
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(size);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(main_chunks[0]);

        // Left column: Units (top) | Diagnostics (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(columns[0]);

        super::panes::render_units_pane(
            frame,
            left_rows[0],
            &self.entries,
            self.selected,
            self.focused_pane == FocusedPane::Units,
            &mut self.units_scroll,
        );

        super::panes::render_diagnostics_pane(
            frame,
            left_rows[1],
            &self.errors,
            self.focused_pane == FocusedPane::Diagnostics,
            &mut self.diagnostics_scroll,
        );

        super::panes::render_detail_pane(
            frame,
            columns[1],
            self.entries.get(self.selected),
            self.focused_pane == FocusedPane::Detail,
            &mut self.detail_scroll,
        );

        super::panes::render_status_bar(
            frame,
            main_chunks[1],
            &self.status_message,
            self.input_files,
            self.entries.len(),
            self.errors.len(),
        );
    }

    /// Handle keyboard events
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::BackTab => {
                self.focused_pane = self.focused_pane.prev();
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Units => {
                    if self.selected > 0 {
                        self.select(self.selected - 1);
                    }
                }
                FocusedPane::Detail => {
                    self.detail_scroll = self.detail_scroll.saturating_sub(1);
                }
                FocusedPane::Diagnostics => {
                    self.diagnostics_scroll = self.diagnostics_scroll.saturating_sub(1);
                }
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Units => {
                    if self.selected + 1 < self.entries.len() {
                        self.select(self.selected + 1);
                    }
                }
                FocusedPane::Detail => {
                    self.detail_scroll = self.detail_scroll.saturating_add(1);
                }
                FocusedPane::Diagnostics => {
                    self.diagnostics_scroll = self.diagnostics_scroll.saturating_add(1);
                }
            },
            KeyCode::Home => {
                if self.focused_pane == FocusedPane::Units && !self.entries.is_empty() {
                    self.select(0);
                }
            }
            KeyCode::End => {
                if self.focused_pane == FocusedPane::Units && !self.entries.is_empty() {
                    self.select(self.entries.len() - 1);
                }
            }
            _ => {}
        }
    }

    fn select(&mut self, index: usize) {
        self.selected = index;
        self.detail_scroll = 0;
        if let Some(entry) = self.entries.get(index) {
            self.status_message = format!("{} {} at {}", entry.kind, entry.name, entry.location);
        }
    }
}
