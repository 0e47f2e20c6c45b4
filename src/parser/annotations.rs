//! Annotation recognition
//!
//! Three written forms produce the same [`Annotation`] value, and only names
//! listed in the configured markers count:
//!
//! - attribute form: `@name` or `@name(args)` before a declaration
//! - comment form: `@name` or `@name(args)` inside a comment before a declaration
//! - macro form: `MARKER(...);` or `MARKER;` as a statement. Inside a function
//!   or struct body it annotates that declaration; at file scope it becomes a
//!   [`Placeholder`].
//!
//! `MARKER(INNER(a, b))` names the annotation `INNER`, which is how the
//! `SERIALIZE(OUT(buf))` family of markers reads.

use super::ast::SourceLocation;
use super::lexer::{Lexer, Token, Trivia};
use super::scanner::{join_tokens, ScanFailure, Scanner};
use crate::errors::MalformedDeclarationError;
use crate::model::{union_annotations, Annotation, DeclKind, Placeholder};
use std::ops::Range;
use tracing::debug;

/// A recognized annotation waiting for the declaration it belongs to
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingAnnotation {
    pub annotation: Annotation,
    pub location: SourceLocation,
    /// A blank line came between the annotation and the current token
    pub detached: bool,
}

impl<'c> Scanner<'c> {
    /// Collect comment annotations and blank lines preceding token `index`
    pub(crate) fn absorb_trivia(&mut self, index: usize) {
        let Some(slot) = self.trivia.get_mut(index) else {
            return;
        };
        for item in std::mem::take(slot) {
            match item {
                Trivia::BlankLine(_) => {
                    for p in self.pending.iter_mut() {
                        p.detached = true;
                    }
                }
                Trivia::Comment(text, location) => {
                    for annotation in self.comment_annotations(&text) {
                        self.pending.push(PendingAnnotation {
                            annotation,
                            location,
                            detached: false,
                        });
                    }
                }
            }
        }
    }

    /// Recognized `@name(args)` occurrences in comment text
    fn comment_annotations(&self, text: &str) -> Vec<Annotation> {
        let chars: Vec<char> = text.chars().collect();
        let mut found = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            if chars[i] != '@' {
                i += 1;
                continue;
            }
            // `user@example.com` is prose
            if i > 0 && is_ident_char(chars[i - 1]) {
                i += 1;
                continue;
            }

            let start = i + 1;
            let mut end = start;
            while end < chars.len() && is_ident_char(chars[end]) {
                end += 1;
            }
            i = end.max(start);

            let name: String = chars[start..end].iter().collect();
            if name.is_empty() || !self.config.is_marker(&name) {
                continue;
            }

            let mut arguments = Vec::new();
            if chars.get(end) == Some(&'(') {
                if let Some(close) = matching_paren(&chars, end) {
                    let inner: String = chars[end + 1..close].iter().collect();
                    arguments = split_text_arguments(&inner);
                    i = close + 1;
                }
            }
            if let Ok(annotation) = Annotation::with_arguments(name, arguments) {
                found.push(annotation);
            }
        }
        found
    }

    /// `@name` or `@name(args)` outside comments. Always consumes the `@`.
    pub(crate) fn parse_attribute_annotation(&mut self) -> Result<(), ScanFailure> {
        let location = self.current_location();
        self.advance(); // '@'

        let name = match self.peek() {
            Token::Ident(name, _) => name.clone(),
            other => {
                return Err(ScanFailure::Malformed(MalformedDeclarationError::new(
                    &self.file,
                    location,
                    DeclKind::Placeholder,
                    format!("expected annotation name after '@', found {}", other),
                )));
            }
        };
        self.advance();

        let mut arguments = Vec::new();
        if self.check(&Token::LParen(location)) {
            let inner = self.skip_balanced()?;
            arguments = split_arguments(&self.tokens[inner]);
        }

        if !self.config.is_marker(&name) {
            debug!(file = %self.file.display(), line = location.line, name = %name, "skipped unrecognized annotation");
            return Ok(());
        }
        if let Ok(annotation) = Annotation::with_arguments(name, arguments) {
            self.pending.push(PendingAnnotation {
                annotation,
                location,
                detached: false,
            });
        }
        Ok(())
    }

    /// A recognized marker name opening a `MARKER(...)` or `MARKER;` statement
    pub(crate) fn at_marker_statement(&self) -> bool {
        match (self.peek(), self.peek_ahead(1)) {
            (Token::Ident(name, _), Some(Token::LParen(_) | Token::Semicolon(_))) => {
                self.config.is_marker(name)
            }
            _ => false,
        }
    }

    /// Consume a marker statement, returning its annotation and location
    pub(crate) fn parse_marker_call(
        &mut self,
    ) -> Result<Option<(Annotation, SourceLocation)>, ScanFailure> {
        let location = self.current_location();
        let marker = self.peek().text();
        self.advance();

        let annotation = if self.check(&Token::LParen(location)) {
            let inner = self.skip_balanced()?;
            marker_annotation(&marker, &self.tokens[inner])
        } else {
            Annotation::new(marker).ok()
        };
        self.match_token(&Token::Semicolon(location));

        Ok(annotation.map(|a| (a, location)))
    }

    /// File-scope marker statement
    pub(crate) fn parse_top_level_marker(&mut self) -> Result<Option<Placeholder>, ScanFailure> {
        let parsed = self.parse_marker_call()?;
        Ok(parsed.map(|(annotation, location)| {
            Placeholder::new(annotation, self.origin, self.decl_location(location))
        }))
    }

    /// Marker statements inside a function body, in order of appearance
    pub(crate) fn body_annotations(&self, body: Range<usize>) -> Vec<Annotation> {
        let tokens = &self.tokens[body];
        let mut found = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            let statement_start = i == 0
                || matches!(
                    tokens[i - 1],
                    Token::Semicolon(_) | Token::LBrace(_) | Token::RBrace(_) | Token::Colon(_)
                );
            if let (true, Token::Ident(name, _)) = (statement_start, &tokens[i]) {
                if self.config.is_marker(name) {
                    match tokens.get(i + 1) {
                        Some(Token::LParen(_)) => {
                            if let Some(close) = matching_close(tokens, i + 1) {
                                if let Some(a) = marker_annotation(name, &tokens[i + 2..close]) {
                                    union_annotations(&mut found, vec![a]);
                                }
                                i = close + 1;
                                continue;
                            }
                        }
                        Some(Token::Semicolon(_)) => {
                            if let Ok(a) = Annotation::new(name.clone()) {
                                union_annotations(&mut found, vec![a]);
                            }
                            i += 2;
                            continue;
                        }
                        _ => {}
                    }
                }
            }
            i += 1;
        }
        found
    }
}

/// `MARKER(INNER(a, b))` → `INNER [a, b]`, otherwise `MARKER [args]`
fn marker_annotation(marker: &str, inner: &[Token]) -> Option<Annotation> {
    if let [Token::Ident(name, _), Token::LParen(_), rest @ .., Token::RParen(_)] = inner {
        if is_balanced(rest) {
            return Annotation::with_arguments(name.clone(), split_arguments(rest)).ok();
        }
    }
    Annotation::with_arguments(marker, split_arguments(inner)).ok()
}

/// Comma-separated token groups at depth 0, as source text
pub(crate) fn split_arguments(tokens: &[Token]) -> Vec<String> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen(_) | Token::LBracket(_) | Token::LBrace(_) => depth += 1,
            Token::RParen(_) | Token::RBracket(_) | Token::RBrace(_) => {
                depth = depth.saturating_sub(1)
            }
            Token::Comma(_) if depth == 0 => {
                groups.push(join_tokens(&tokens[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    groups.push(join_tokens(&tokens[start..]));
    groups.retain(|g| !g.is_empty());
    groups
}

fn split_text_arguments(text: &str) -> Vec<String> {
    match Lexer::new(text).tokenize() {
        Ok(lexed) => {
            let tokens: Vec<Token> = lexed
                .tokens
                .into_iter()
                .filter(|t| !matches!(t, Token::Eof(_)))
                .collect();
            split_arguments(&tokens)
        }
        Err(_) => text
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    }
}

fn is_balanced(tokens: &[Token]) -> bool {
    let mut depth = 0isize;
    for token in tokens {
        match token {
            Token::LParen(_) => depth += 1,
            Token::RParen(_) => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Index of the `)` matching the `(` at `open`
fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::LParen(_) => depth += 1,
            Token::RParen(_) => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate().skip(open) {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::model::Origin;
    use std::path::Path;

    fn config() -> Configuration {
        Configuration::new(["rpc", "SERIALIZE", "OUT"])
    }

    fn tokens(src: &str) -> Vec<Token> {
        let mut tokens = Lexer::new(src).tokenize().unwrap().tokens;
        tokens.pop();
        tokens
    }

    #[test]
    fn test_split_arguments() {
        assert_eq!(
            split_arguments(&tokens("buf, sizeof(x) * 2, f(a, b)")),
            vec!["buf", "sizeof(x) * 2", "f(a, b)"]
        );
        assert!(split_arguments(&tokens("")).is_empty());
    }

    #[test]
    fn test_marker_annotation_forms() {
        let a = marker_annotation("SERIALIZE", &tokens("OUT(buf, len)")).unwrap();
        assert_eq!(a.name(), "OUT");
        assert_eq!(a.arguments(), ["buf", "len"]);

        let b = marker_annotation("SERIALIZE", &tokens("OUT(a), IN(b)")).unwrap();
        assert_eq!(b.name(), "SERIALIZE");
        assert_eq!(b.arguments(), ["OUT(a)", "IN(b)"]);

        let c = marker_annotation("SERIALIZE", &tokens("EVENT")).unwrap();
        assert_eq!(c.name(), "SERIALIZE");
        assert_eq!(c.arguments(), ["EVENT"]);
    }

    #[test]
    fn test_comment_annotations() {
        let config = config();
        let scanner = Scanner::new("", Path::new("t.c"), Origin::InputFile, &config).unwrap();
        let found = scanner.comment_annotations(" @rpc(ping, \"a,b\") mail me@rpc.org @unknown @OUT");

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name(), "rpc");
        assert_eq!(found[0].arguments(), ["ping", "\"a,b\""]);
        assert_eq!(found[1].name(), "OUT");
        assert!(found[1].arguments().is_empty());
    }

    #[test]
    fn test_body_annotations() {
        let config = config();
        let src = "{ SERIALIZE(OUT(buf)); int x = f(SERIALIZE); SERIALIZE; SERIALIZE(OUT(buf)); }";
        let mut scanner = Scanner::new(src, Path::new("t.c"), Origin::InputFile, &config).unwrap();
        let body = scanner.skip_balanced().unwrap();
        let found = scanner.body_annotations(body);

        let names: Vec<String> = found.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["@OUT(buf)", "@SERIALIZE"]);
    }
}
