//! Structural scanner core
//!
//! This module provides the [`Scanner`] struct: the token cursor, error
//! helpers, the top-level loop, and boundary resynchronization. The actual
//! grammar lives in sibling modules that extend `Scanner` with `impl` blocks:
//!
//! - `declarations`: specifiers, declarators, structs, functions, typedefs, variables
//! - `annotations`: the three annotation forms and their attachment rules
//!
//! The scanner never builds an expression tree. Function bodies and
//! initializers are skipped by brace/paren matching; literals and comments
//! were already folded into single tokens by the lexer, so braces inside them
//! cannot unbalance the scan.

use super::annotations::PendingAnnotation;
use super::ast::SourceLocation;
use super::lexer::{Lexer, Token, Trivia};
use crate::config::{Configuration, DetachedAnnotationPolicy};
use crate::errors::{MalformedDeclarationError, ParseError, RecordedError};
use crate::model::{
    Annotation, DeclKind, DeclLocation, Function, Origin, Placeholder, Structure, Typedef, Variable,
};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One declaration produced by the scanner, before session merging
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScannedItem {
    Function(Function),
    Structure(Structure),
    Typedef(Typedef),
    Variable(Variable),
    Placeholder(Placeholder),
}

impl ScannedItem {
    pub(crate) fn annotations_mut(&mut self) -> Option<&mut Vec<Annotation>> {
        match self {
            ScannedItem::Function(f) => Some(&mut f.annotations),
            ScannedItem::Structure(s) => Some(&mut s.annotations),
            ScannedItem::Typedef(t) => Some(&mut t.annotations),
            ScannedItem::Variable(v) => Some(&mut v.annotations),
            ScannedItem::Placeholder(_) => None,
        }
    }
}

/// Scanner output, in source order
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScanEvent {
    Item(ScannedItem),
    Include {
        path: String,
        system: bool,
        location: SourceLocation,
    },
    Error(RecordedError),
}

/// Why a declaration could not be scanned
#[derive(Debug)]
pub(crate) enum ScanFailure {
    /// Skip to the next top-level boundary and continue
    Malformed(MalformedDeclarationError),
    /// Stop scanning this file
    Fatal(ParseError),
}

pub(crate) struct Scanner<'c> {
    pub(crate) tokens: Vec<Token>,
    pub(crate) trivia: Vec<Vec<Trivia>>,
    pub(crate) position: usize,
    pub(crate) config: &'c Configuration,
    pub(crate) file: PathBuf,
    pub(crate) origin: Origin,
    /// Kind reported by malformed-declaration errors for the declaration in progress
    pub(crate) decl_kind: DeclKind,
    /// Structures defined inside specifiers of the declaration in progress
    pub(crate) tag_items: Vec<ScannedItem>,
    pub(crate) pending: Vec<PendingAnnotation>,
    /// Open `extern "C" {` blocks
    linkage_depth: usize,
    events: Vec<ScanEvent>,
}

impl<'c> Scanner<'c> {
    pub(crate) fn new(
        source: &str,
        file: &Path,
        origin: Origin,
        config: &'c Configuration,
    ) -> Result<Self, ParseError> {
        let lexed = Lexer::new(source)
            .tokenize()
            .map_err(|e| ParseError::from_lex(file, e))?;
        Ok(Self {
            tokens: lexed.tokens,
            trivia: lexed.trivia,
            position: 0,
            config,
            file: file.to_path_buf(),
            origin,
            decl_kind: DeclKind::Variable,
            tag_items: Vec::new(),
            pending: Vec::new(),
            linkage_depth: 0,
            events: Vec::new(),
        })
    }

    /// Scan every top-level construct in the file
    pub(crate) fn scan(mut self) -> Vec<ScanEvent> {
        while !self.is_at_end() {
            self.absorb_trivia(self.position);

            match self.peek() {
                Token::Include {
                    path,
                    system,
                    location,
                } => {
                    let event = ScanEvent::Include {
                        path: path.clone(),
                        system: *system,
                        location: *location,
                    };
                    self.flush_dangling_annotations();
                    self.events.push(event);
                    self.advance();
                }
                Token::At(_) => match self.parse_attribute_annotation() {
                    Ok(()) => {}
                    // A bad annotation does not take the declaration after it down
                    Err(ScanFailure::Malformed(err)) => self.record(err.into()),
                    Err(ScanFailure::Fatal(err)) => {
                        self.record(err.into());
                        break;
                    }
                },
                Token::Semicolon(_) => {
                    self.advance();
                }
                Token::RBrace(loc) => {
                    let loc = *loc;
                    self.advance();
                    if self.linkage_depth > 0 {
                        self.linkage_depth -= 1;
                    } else {
                        let err = MalformedDeclarationError::new(
                            &self.file,
                            loc,
                            DeclKind::Variable,
                            "unbalanced '}' at file scope",
                        );
                        self.record(err.into());
                    }
                }
                _ if self.at_linkage_block() => {
                    self.advance(); // extern
                    self.advance(); // "C"
                    self.advance(); // {
                    self.linkage_depth += 1;
                }
                _ if self.at_marker_statement() => {
                    let start = self.position;
                    match self.parse_top_level_marker() {
                        Ok(Some(placeholder)) => {
                            self.flush_dangling_annotations();
                            self.events
                                .push(ScanEvent::Item(ScannedItem::Placeholder(placeholder)));
                        }
                        Ok(None) => {}
                        Err(failure) => {
                            if !self.handle_failure(failure, start) {
                                break;
                            }
                        }
                    }
                }
                _ if self.at_opaque_macro() => {
                    let start = self.position;
                    if let Err(failure) = self.skip_opaque_macro() {
                        if !self.handle_failure(failure, start) {
                            break;
                        }
                    }
                }
                _ => {
                    let start = self.position;
                    match self.parse_external_declaration() {
                        Ok(items) => self.emit_declaration(items),
                        Err(failure) => {
                            if !self.handle_failure(failure, start) {
                                break;
                            }
                        }
                    }
                }
            }
        }

        if self.is_at_end() {
            self.absorb_trivia(self.position);
            self.flush_dangling_annotations();
        }
        self.events
    }

    fn emit_declaration(&mut self, mut items: Vec<ScannedItem>) {
        let pending = std::mem::take(&mut self.pending);
        let mut attached = Vec::new();

        for p in pending {
            if p.detached && self.config.detached_annotations == DetachedAnnotationPolicy::Error {
                let err = MalformedDeclarationError::new(
                    &self.file,
                    p.location,
                    self.decl_kind,
                    format!(
                        "annotation '{}' is separated from its declaration by a blank line",
                        p.annotation
                    ),
                );
                self.record(err.into());
            } else {
                attached.push(p.annotation);
            }
        }

        for item in items.iter_mut() {
            if let Some(list) = item.annotations_mut() {
                // Pending markers precede any written inside the body
                let body = std::mem::take(list);
                list.extend(attached.iter().cloned());
                crate::model::union_annotations(list, body);
            }
        }

        self.events
            .extend(items.into_iter().map(ScanEvent::Item));
    }

    /// Annotations with nothing left to attach to
    fn flush_dangling_annotations(&mut self) {
        for p in std::mem::take(&mut self.pending) {
            match self.config.detached_annotations {
                DetachedAnnotationPolicy::Error => {
                    let err = MalformedDeclarationError::new(
                        &self.file,
                        p.location,
                        DeclKind::Placeholder,
                        format!("annotation '{}' is not followed by a declaration", p.annotation),
                    );
                    self.record(err.into());
                }
                DetachedAnnotationPolicy::Attach => {
                    warn!(
                        file = %self.file.display(),
                        line = p.location.line,
                        annotation = %p.annotation,
                        "annotation is not followed by a declaration; dropped"
                    );
                }
            }
        }
    }

    /// Record the failure; returns false when the file cannot be scanned further
    fn handle_failure(&mut self, failure: ScanFailure, start: usize) -> bool {
        self.pending.clear();
        self.tag_items.clear();
        match failure {
            ScanFailure::Malformed(err) => {
                self.record(err.into());
                match self.synchronize(start) {
                    Ok(()) => true,
                    Err(fatal) => {
                        self.record(fatal.into());
                        false
                    }
                }
            }
            ScanFailure::Fatal(err) => {
                self.record(err.into());
                false
            }
        }
    }

    pub(crate) fn record(&mut self, err: RecordedError) {
        warn!(error = %err, "recorded scan error");
        self.events.push(ScanEvent::Error(err));
    }

    /// Skip from `start` past the end of the declaration that failed: a `;` at
    /// depth 0, or the `}` closing a function body
    fn synchronize(&mut self, start: usize) -> Result<(), ParseError> {
        self.position = start;
        let mut depth = 0usize;
        let mut opened_after_paren = false;
        let mut open_loc = self.current_location();

        loop {
            match self.peek() {
                Token::Eof(_) => {
                    if depth > 0 {
                        return Err(ParseError::new(
                            &self.file,
                            open_loc,
                            "unbalanced delimiter reaches end of file",
                        ));
                    }
                    return Ok(());
                }
                Token::LParen(loc) | Token::LBracket(loc) | Token::LBrace(loc) => {
                    if depth == 0 {
                        open_loc = *loc;
                        opened_after_paren = matches!(self.peek(), Token::LBrace(_))
                            && self.position > start
                            && matches!(self.tokens[self.position - 1], Token::RParen(_));
                    }
                    depth += 1;
                    self.advance();
                }
                Token::RParen(_) | Token::RBracket(_) | Token::RBrace(_) => {
                    let closes_body = depth == 1 && matches!(self.peek(), Token::RBrace(_));
                    depth = depth.saturating_sub(1);
                    self.advance();
                    if closes_body && opened_after_paren {
                        return Ok(());
                    }
                    if depth == 0 && self.position == start + 1 {
                        // Stray closer: skipping it is progress enough
                        return Ok(());
                    }
                }
                Token::Semicolon(_) if depth == 0 => {
                    self.advance();
                    return Ok(());
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ===== Helper methods =====

    fn at_linkage_block(&self) -> bool {
        matches!(self.peek(), Token::Storage(s, _) if s == "extern")
            && matches!(self.peek_ahead(1), Some(Token::StringLiteral(..)))
            && matches!(self.peek_ahead(2), Some(Token::LBrace(_)))
    }

    /// `NAME(...)` at the start of a declaration where `NAME` is not a marker:
    /// an unexpanded macro invocation
    fn at_opaque_macro(&self) -> bool {
        matches!(self.peek(), Token::Ident(..))
            && matches!(self.peek_ahead(1), Some(Token::LParen(_)))
            && !matches!(self.peek_ahead(2), Some(Token::Star(_)))
    }

    fn skip_opaque_macro(&mut self) -> Result<(), ScanFailure> {
        let name = self.peek().text();
        let loc = self.current_location();
        self.advance();
        self.skip_balanced()?;
        self.match_token(&Token::Semicolon(loc));
        debug!(file = %self.file.display(), line = loc.line, macro_name = %name, "skipped opaque macro");
        Ok(())
    }

    /// Skip a balanced `( ... )`, `[ ... ]` or `{ ... }` group starting at the
    /// current token. Returns the range of tokens strictly inside it.
    pub(crate) fn skip_balanced(&mut self) -> Result<std::ops::Range<usize>, ScanFailure> {
        let open_loc = self.current_location();
        let opener = self.peek().text();
        self.advance();
        let inner_start = self.position;
        let mut depth = 1usize;

        loop {
            match self.peek() {
                Token::Eof(_) => {
                    return Err(ScanFailure::Fatal(ParseError::new(
                        &self.file,
                        open_loc,
                        format!("unbalanced '{}' reaches end of file", opener),
                    )));
                }
                Token::LParen(_) | Token::LBracket(_) | Token::LBrace(_) => depth += 1,
                Token::RParen(_) | Token::RBracket(_) | Token::RBrace(_) => {
                    depth -= 1;
                    if depth == 0 {
                        let inner_end = self.position;
                        self.advance();
                        return Ok(inner_start..inner_end);
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    pub(crate) fn malformed(&self, reason: impl Into<String>) -> ScanFailure {
        ScanFailure::Malformed(MalformedDeclarationError::new(
            &self.file,
            self.current_location(),
            self.decl_kind,
            reason,
        ))
    }

    pub(crate) fn decl_location(&self, location: SourceLocation) -> DeclLocation {
        DeclLocation::new(&self.file, location)
    }

    pub(crate) fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof(_))
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location()
    }

    pub(crate) fn expect_token(&mut self, token: &Token, message: &str) -> Result<(), ScanFailure> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.malformed(format!("{}, found {}", message, self.peek())))
        }
    }

    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> Result<(), ScanFailure> {
        self.expect_token(
            &Token::Semicolon(self.current_location()),
            &format!("expected ';' {ctx}"),
        )
    }
}

/// Source text of a token run, with a single space wherever the source had a gap
pub(crate) fn join_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut prev: Option<&Token> = None;

    for token in tokens {
        if let Some(p) = prev {
            let p_loc = p.location();
            let adjacent = p_loc.line == token.location().line
                && p_loc.column + p.text().chars().count() == token.location().column;
            if !adjacent {
                out.push(' ');
            }
        }
        out.push_str(&token.text());
        prev = Some(token);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> Vec<ScanEvent> {
        let config = Configuration::new(["rpc", "SERIALIZE"]);
        Scanner::new(source, Path::new("test.c"), Origin::InputFile, &config)
            .unwrap()
            .scan()
    }

    fn items(events: &[ScanEvent]) -> Vec<&ScannedItem> {
        events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::Item(item) => Some(item),
                _ => None,
            })
            .collect()
    }

    fn errors(events: &[ScanEvent]) -> Vec<&RecordedError> {
        events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::Error(err) => Some(err),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_join_tokens() {
        let lexed = Lexer::new("sizeof(x) * 2").tokenize().unwrap();
        let tokens = &lexed.tokens[..lexed.tokens.len() - 1];
        assert_eq!(join_tokens(tokens), "sizeof(x) * 2");
    }

    #[test]
    fn test_opaque_macro_skipped() {
        let events = scan("NRF_RPC_GROUP_DEFINE(grp, \"}\", NULL);\nint x;");
        let items = items(&events);
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], ScannedItem::Variable(v) if v.name == "x"));
        assert!(errors(&events).is_empty());
    }

    #[test]
    fn test_include_event() {
        let events = scan("#include \"api.h\"\nvoid f(void);");
        assert!(matches!(
            &events[0],
            ScanEvent::Include { path, system: false, .. } if path == "api.h"
        ));
    }

    #[test]
    fn test_linkage_block() {
        let events = scan("extern \"C\" {\nint f(void);\n}\nint g(void);");
        assert_eq!(items(&events).len(), 2);
        assert!(errors(&events).is_empty());
    }

    #[test]
    fn test_stray_brace_recorded() {
        let events = scan("}\nint g(void);");
        assert_eq!(items(&events).len(), 1);
        assert_eq!(errors(&events).len(), 1);
    }

    #[test]
    fn test_unbalanced_body_is_fatal() {
        let events = scan("int ok;\nint f(void) {\n  if (x) {\n");
        assert_eq!(items(&events).len(), 1);
        let errs = errors(&events);
        assert_eq!(errs.len(), 1);
        assert!(matches!(errs[0], RecordedError::Parse(_)));
    }

    #[test]
    fn test_resynchronizes_after_malformed_function() {
        let events = scan("int bad(int x,);\nint good(void) { return 1; }\nint also;");
        let items = items(&events);
        assert_eq!(items.len(), 2);
        assert_eq!(errors(&events).len(), 1);
    }

    #[test]
    fn test_resynchronizes_after_malformed_definition_body() {
        let events = scan("int bad(int 3) { int y = 2; }\nint good;");
        let items = items(&events);
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], ScannedItem::Variable(v) if v.name == "good"));
    }
}
