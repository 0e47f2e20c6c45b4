//! Lexer (tokenizer) for C source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the scanner.
//! Comments and blank lines are not dropped: they are collected as [`Trivia`]
//! attached to the token that follows them, because annotation markers may live
//! in comments and the blank-line rule decides whether a marker still belongs to
//! the next declaration.
//!
//! Preprocessor directives are skipped, except `#include` which becomes a
//! [`Token::Include`] so the parser can follow headers. `#if 0` regions are
//! dropped entirely.

use super::ast::SourceLocation;
use std::fmt;

/// All token variants produced by the lexer.
///
/// Every variant carries a [`SourceLocation`] so that parse errors can report
/// an accurate line and column without a separate token→location table.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals, kept as written
    Number(String, SourceLocation),
    CharLiteral(String, SourceLocation),
    StringLiteral(String, SourceLocation),

    // Identifiers
    Ident(String, SourceLocation),

    // Keywords
    Builtin(String, SourceLocation),   // void char short int long float double signed unsigned _Bool
    Qualifier(String, SourceLocation), // const volatile restrict
    Storage(String, SourceLocation),   // static extern inline register auto _Noreturn
    Struct(SourceLocation),
    Union(SourceLocation),
    Enum(SourceLocation),
    Typedef(SourceLocation),

    // Punctuation the scanner cares about
    LParen(SourceLocation),    // (
    RParen(SourceLocation),    // )
    LBrace(SourceLocation),    // {
    RBrace(SourceLocation),    // }
    LBracket(SourceLocation),  // [
    RBracket(SourceLocation),  // ]
    Semicolon(SourceLocation), // ;
    Comma(SourceLocation),     // ,
    Star(SourceLocation),      // *
    Eq(SourceLocation),        // =
    Colon(SourceLocation),     // :
    At(SourceLocation),        // @
    Ellipsis(SourceLocation),  // ...

    // Every other operator, opaque to the scanner
    Punct(String, SourceLocation),

    // `#include "path"` or `#include <path>`
    Include {
        path: String,
        system: bool,
        location: SourceLocation,
    },

    // End of file
    Eof(SourceLocation),
}

impl Token {
    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::Number(_, loc)
            | Token::CharLiteral(_, loc)
            | Token::StringLiteral(_, loc)
            | Token::Ident(_, loc)
            | Token::Builtin(_, loc)
            | Token::Qualifier(_, loc)
            | Token::Storage(_, loc)
            | Token::Struct(loc)
            | Token::Union(loc)
            | Token::Enum(loc)
            | Token::Typedef(loc)
            | Token::LParen(loc)
            | Token::RParen(loc)
            | Token::LBrace(loc)
            | Token::RBrace(loc)
            | Token::LBracket(loc)
            | Token::RBracket(loc)
            | Token::Semicolon(loc)
            | Token::Comma(loc)
            | Token::Star(loc)
            | Token::Eq(loc)
            | Token::Colon(loc)
            | Token::At(loc)
            | Token::Ellipsis(loc)
            | Token::Punct(_, loc)
            | Token::Eof(loc) => *loc,
            Token::Include { location, .. } => *location,
        }
    }

    /// Source spelling of the token
    pub fn text(&self) -> String {
        match self {
            Token::Number(s, _)
            | Token::CharLiteral(s, _)
            | Token::StringLiteral(s, _)
            | Token::Ident(s, _)
            | Token::Builtin(s, _)
            | Token::Qualifier(s, _)
            | Token::Storage(s, _)
            | Token::Punct(s, _) => s.clone(),
            Token::Struct(_) => "struct".to_string(),
            Token::Union(_) => "union".to_string(),
            Token::Enum(_) => "enum".to_string(),
            Token::Typedef(_) => "typedef".to_string(),
            Token::LParen(_) => "(".to_string(),
            Token::RParen(_) => ")".to_string(),
            Token::LBrace(_) => "{".to_string(),
            Token::RBrace(_) => "}".to_string(),
            Token::LBracket(_) => "[".to_string(),
            Token::RBracket(_) => "]".to_string(),
            Token::Semicolon(_) => ";".to_string(),
            Token::Comma(_) => ",".to_string(),
            Token::Star(_) => "*".to_string(),
            Token::Eq(_) => "=".to_string(),
            Token::Colon(_) => ":".to_string(),
            Token::At(_) => "@".to_string(),
            Token::Ellipsis(_) => "...".to_string(),
            Token::Include { path, system, .. } => {
                if *system {
                    format!("#include <{}>", path)
                } else {
                    format!("#include \"{}\"", path)
                }
            }
            Token::Eof(_) => String::new(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n, _) => write!(f, "number {}", n),
            Token::CharLiteral(c, _) => write!(f, "char literal {}", c),
            Token::StringLiteral(s, _) => write!(f, "string literal {}", s),
            Token::Ident(s, _) => write!(f, "identifier '{}'", s),
            Token::Builtin(s, _) | Token::Qualifier(s, _) | Token::Storage(s, _) => {
                write!(f, "'{}'", s)
            }
            Token::Include { .. } => write!(f, "include directive"),
            Token::Eof(_) => write!(f, "end of file"),
            other => write!(f, "'{}'", other.text()),
        }
    }
}

/// Comments and blank lines that precede a token
#[derive(Debug, Clone, PartialEq)]
pub enum Trivia {
    /// Comment body without the `//` or `/* */` delimiters
    Comment(String, SourceLocation),
    /// A whitespace-only line
    BlankLine(SourceLocation),
}

impl Trivia {
    pub fn location(&self) -> SourceLocation {
        match self {
            Trivia::Comment(_, loc) | Trivia::BlankLine(loc) => *loc,
        }
    }
}

/// Tokens plus the trivia preceding each of them; `trivia[i]` belongs to `tokens[i]`
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub trivia: Vec<Vec<Trivia>>,
}

/// Lexer error type
#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lexer error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for LexError {}

const THREE_CHAR_PUNCT: [&str; 3] = ["...", "<<=", ">>="];
const TWO_CHAR_PUNCT: [&str; 19] = [
    "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "+=", "-=", "*=", "/=",
    "%=", "&=", "|=", "^=",
];

/// Lexer for C source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    /// Newlines seen since the last token, comment or directive
    newlines_in_run: usize,
    pending_trivia: Vec<Trivia>,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            newlines_in_run: 0,
            pending_trivia: Vec::new(),
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Lexed, LexError> {
        let mut lexed = Lexed::default();

        loop {
            self.skip_whitespace_and_comments()?;

            if self.is_at_end() {
                lexed.trivia.push(std::mem::take(&mut self.pending_trivia));
                lexed.tokens.push(Token::Eof(self.current_location()));
                break;
            }

            if self.peek() == Some('#') {
                if let Some(include) = self.preprocessor_directive()? {
                    lexed.trivia.push(std::mem::take(&mut self.pending_trivia));
                    lexed.tokens.push(include);
                }
                self.newlines_in_run = 0;
                continue;
            }

            let token = self.next_token()?;
            lexed.trivia.push(std::mem::take(&mut self.pending_trivia));
            lexed.tokens.push(token);
            self.newlines_in_run = 0;
        }

        Ok(lexed)
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file".to_string(),
            location: loc,
        })?;

        match ch {
            '"' => self.quoted_literal('"', loc),
            '\'' => self.quoted_literal('\'', loc),
            '0'..='9' => Ok(self.number_literal(ch, loc)),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                Ok(self.number_literal(ch, loc))
            }
            'a'..='z' | 'A'..='Z' | '_' => Ok(self.identifier_or_keyword(ch, loc)),
            '(' => Ok(Token::LParen(loc)),
            ')' => Ok(Token::RParen(loc)),
            '{' => Ok(Token::LBrace(loc)),
            '}' => Ok(Token::RBrace(loc)),
            '[' => Ok(Token::LBracket(loc)),
            ']' => Ok(Token::RBracket(loc)),
            ';' => Ok(Token::Semicolon(loc)),
            ',' => Ok(Token::Comma(loc)),
            ':' => Ok(Token::Colon(loc)),
            '@' => Ok(Token::At(loc)),
            _ => Ok(self.operator(ch, loc)),
        }
    }

    /// Longest-match operator; anything unknown becomes an opaque punctuation token
    fn operator(&mut self, first: char, loc: SourceLocation) -> Token {
        for candidate in THREE_CHAR_PUNCT {
            if self.matches_rest(first, candidate) {
                self.advance();
                self.advance();
                if candidate == "..." {
                    return Token::Ellipsis(loc);
                }
                return Token::Punct(candidate.to_string(), loc);
            }
        }
        for candidate in TWO_CHAR_PUNCT {
            if self.matches_rest(first, candidate) {
                self.advance();
                return Token::Punct(candidate.to_string(), loc);
            }
        }
        match first {
            '*' => Token::Star(loc),
            '=' => Token::Eq(loc),
            _ => Token::Punct(first.to_string(), loc),
        }
    }

    fn matches_rest(&self, first: char, candidate: &str) -> bool {
        let mut chars = candidate.chars();
        if chars.next() != Some(first) {
            return false;
        }
        chars
            .enumerate()
            .all(|(i, c)| self.peek_ahead(i) == Some(c))
    }

    /// String or character literal, kept with its quotes and escapes as written
    fn quoted_literal(&mut self, quote: char, loc: SourceLocation) -> Result<Token, LexError> {
        let mut text = String::new();
        text.push(quote);

        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
            text.push(ch);
            if ch == '\\' {
                if let Some(escaped) = self.advance() {
                    text.push(escaped);
                }
                continue;
            }
            if ch == quote {
                return Ok(if quote == '"' {
                    Token::StringLiteral(text, loc)
                } else {
                    Token::CharLiteral(text, loc)
                });
            }
        }

        Err(LexError {
            message: if quote == '"' {
                "Unterminated string literal".to_string()
            } else {
                "Unterminated character literal".to_string()
            },
            location: loc,
        })
    }

    /// Numeric literal with any suffix, kept as written
    fn number_literal(&mut self, first: char, loc: SourceLocation) -> Token {
        let mut text = String::new();
        text.push(first);
        let mut prev = first;

        while let Some(ch) = self.peek() {
            let exponent_sign =
                (ch == '+' || ch == '-') && matches!(prev, 'e' | 'E' | 'p' | 'P');
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' || exponent_sign {
                text.push(ch);
                prev = ch;
                self.advance();
            } else {
                break;
            }
        }

        Token::Number(text, loc)
    }

    /// Parse identifier or keyword
    fn identifier_or_keyword(&mut self, first_char: char, loc: SourceLocation) -> Token {
        let mut ident = String::new();
        ident.push(first_char);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match ident.as_str() {
            "void" | "char" | "short" | "int" | "long" | "float" | "double" | "signed"
            | "unsigned" | "_Bool" => Token::Builtin(ident, loc),
            "const" | "volatile" | "restrict" | "__restrict" => Token::Qualifier(ident, loc),
            "static" | "extern" | "inline" | "__inline" | "register" | "auto" | "_Noreturn"
            | "_Thread_local" => Token::Storage(ident, loc),
            "struct" => Token::Struct(loc),
            "union" => Token::Union(loc),
            "enum" => Token::Enum(loc),
            "typedef" => Token::Typedef(loc),
            _ => Token::Ident(ident, loc),
        }
    }

    /// Skip whitespace and comments, recording them as trivia
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some('\n') => {
                    self.newlines_in_run += 1;
                    if self.newlines_in_run == 2 {
                        self.pending_trivia
                            .push(Trivia::BlankLine(self.current_location()));
                    }
                    self.advance();
                }
                Some(' ') | Some('\t') | Some('\r') | Some('\x0c') => {
                    self.advance();
                }
                Some('\\') if self.peek_ahead(1) == Some('\n') => {
                    // Stray line continuation
                    self.advance();
                    self.advance();
                }
                Some('/') => {
                    if self.peek_ahead(1) == Some('/') {
                        self.skip_line_comment();
                    } else if self.peek_ahead(1) == Some('*') {
                        self.skip_block_comment()?;
                    } else {
                        break;
                    }
                    self.newlines_in_run = 0;
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Single-line comment (// ...). The newline is left for the blank-line count.
    fn skip_line_comment(&mut self) {
        let loc = self.current_location();
        self.advance(); // skip '/'
        self.advance(); // skip '/'

        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            text.push(ch);
            self.advance();
        }
        self.pending_trivia.push(Trivia::Comment(text, loc));
    }

    /// Multi-line comment (/* ... */)
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start_loc = self.current_location();
        self.advance(); // skip '/'
        self.advance(); // skip '*'

        let mut text = String::new();
        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance(); // skip '*'
                self.advance(); // skip '/'
                self.pending_trivia.push(Trivia::Comment(text, start_loc));
                return Ok(());
            }
            if let Some(ch) = self.advance() {
                text.push(ch);
            }
        }

        Err(LexError {
            message: "Unterminated block comment".to_string(),
            location: start_loc,
        })
    }

    /// Handle a preprocessor directive. Returns a token only for `#include`.
    fn preprocessor_directive(&mut self) -> Result<Option<Token>, LexError> {
        let loc = self.current_location();
        let text = self.read_directive_line();
        let body = text.trim_start_matches('#').trim_start();
        let (name, rest) = split_directive(body);

        match name {
            "include" => Ok(parse_include(rest, loc)),
            "if" if rest.trim() == "0" => {
                self.skip_disabled_region();
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    /// Read a directive line including backslash continuations; stops before the newline
    fn read_directive_line(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' && self.peek_ahead(1) == Some('\n') {
                self.advance();
                self.advance();
                text.push(' ');
                continue;
            }
            if ch == '\n' {
                break;
            }
            // Comments may trail a directive
            if ch == '/' && self.peek_ahead(1) == Some('/') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
                break;
            }
            text.push(ch);
            self.advance();
        }
        text
    }

    /// Skip lines until the `#endif`, `#else` or `#elif` closing an `#if 0`
    fn skip_disabled_region(&mut self) {
        let mut depth = 0usize;
        while !self.is_at_end() {
            // Move to the start of the next line
            while self.peek().is_some_and(|c| c != '\n') {
                self.advance();
            }
            self.advance();

            while matches!(self.peek(), Some(' ') | Some('\t')) {
                self.advance();
            }
            if self.peek() != Some('#') {
                continue;
            }

            let text = self.read_directive_line();
            let (name, _) = split_directive(text.trim_start_matches('#').trim_start());
            match name {
                "if" | "ifdef" | "ifndef" => depth += 1,
                "endif" if depth == 0 => return,
                "endif" => depth -= 1,
                "else" | "elif" if depth == 0 => return,
                _ => {}
            }
        }
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters past the current one
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    /// Check if at end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get current source location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

fn split_directive(body: &str) -> (&str, &str) {
    let end = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(body.len());
    (&body[..end], &body[end..])
}

fn parse_include(rest: &str, location: SourceLocation) -> Option<Token> {
    let rest = rest.trim();
    let (close, system) = match rest.chars().next()? {
        '"' => ('"', false),
        '<' => ('>', true),
        // Computed includes are left alone
        _ => return None,
    };
    let inner = &rest[1..];
    let end = inner.find(close)?;
    Some(Token::Include {
        path: inner[..end].to_string(),
        system,
        location,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        Lexer::new(src).tokenize().unwrap().tokens
    }

    #[test]
    fn test_simple_tokens() {
        let tokens = tokens("int main(void) { return 0; }");

        assert!(matches!(tokens[0], Token::Builtin(ref s, _) if s == "int"));
        assert!(matches!(tokens[1], Token::Ident(ref s, _) if s == "main"));
        assert!(matches!(tokens[2], Token::LParen(_)));
        assert!(matches!(tokens[3], Token::Builtin(ref s, _) if s == "void"));
        assert!(matches!(tokens[4], Token::RParen(_)));
        assert!(matches!(tokens[5], Token::LBrace(_)));
        assert!(matches!(tokens[6], Token::Ident(ref s, _) if s == "return"));
        assert!(matches!(tokens[7], Token::Number(ref s, _) if s == "0"));
        assert!(matches!(tokens[8], Token::Semicolon(_)));
        assert!(matches!(tokens[9], Token::RBrace(_)));
        assert!(matches!(tokens[10], Token::Eof(_)));
    }

    #[test]
    fn test_operators() {
        let tokens = tokens("-> ... <<= * = x++");

        assert!(matches!(tokens[0], Token::Punct(ref s, _) if s == "->"));
        assert!(matches!(tokens[1], Token::Ellipsis(_)));
        assert!(matches!(tokens[2], Token::Punct(ref s, _) if s == "<<="));
        assert!(matches!(tokens[3], Token::Star(_)));
        assert!(matches!(tokens[4], Token::Eq(_)));
        assert!(matches!(tokens[5], Token::Ident(ref s, _) if s == "x"));
        assert!(matches!(tokens[6], Token::Punct(ref s, _) if s == "++"));
    }

    #[test]
    fn test_comments_become_trivia() {
        let lexed = Lexer::new("int x; // note\nint y; /* block\ncomment */ int z;")
            .tokenize()
            .unwrap();

        assert!(matches!(lexed.tokens[3], Token::Builtin(ref s, _) if s == "int"));
        assert_eq!(
            lexed.trivia[3],
            vec![Trivia::Comment(" note".to_string(), SourceLocation::new(1, 8))]
        );
        assert!(matches!(&lexed.trivia[6][0], Trivia::Comment(text, _) if text == " block\ncomment "));
    }

    #[test]
    fn test_blank_line_trivia() {
        let lexed = Lexer::new("@rpc\n\nint foo(void);\n@rpc\nint bar(void);")
            .tokenize()
            .unwrap();

        // `int` of foo follows a blank line
        assert!(matches!(lexed.trivia[2][..], [Trivia::BlankLine(_)]));
        // `int` of bar does not
        let bar_int = lexed
            .tokens
            .iter()
            .rposition(|t| matches!(t, Token::Builtin(s, _) if s == "int"))
            .unwrap();
        assert!(lexed.trivia[bar_int].is_empty());
    }

    #[test]
    fn test_literals_keep_braces() {
        let tokens = tokens(r#"x = "}{" ; c = '{' ; n = 0x1Fu;"#);

        assert!(matches!(tokens[2], Token::StringLiteral(ref s, _) if s == "\"}{\""));
        assert!(matches!(tokens[6], Token::CharLiteral(ref s, _) if s == "'{'"));
        assert!(matches!(tokens[10], Token::Number(ref s, _) if s == "0x1Fu"));
    }

    #[test]
    fn test_include_directives() {
        let tokens = tokens("#include <stdio.h>\n#include \"api.h\"\n#define X 1 \\\n  + 2\nint x;");

        assert!(matches!(
            tokens[0],
            Token::Include { ref path, system: true, .. } if path == "stdio.h"
        ));
        assert!(matches!(
            tokens[1],
            Token::Include { ref path, system: false, .. } if path == "api.h"
        ));
        assert!(matches!(tokens[2], Token::Builtin(ref s, _) if s == "int"));
        assert!(matches!(tokens[3], Token::Ident(ref s, _) if s == "x"));
    }

    #[test]
    fn test_if_zero_region_skipped() {
        let tokens = tokens("#if 0\nint hidden;\n#ifdef X\nint also;\n#endif\n#endif\nint shown;");

        assert!(matches!(tokens[1], Token::Ident(ref s, _) if s == "shown"));
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn test_unterminated_comment_is_error() {
        let err = Lexer::new("int x; /* never closed").tokenize().unwrap_err();
        assert_eq!(err.location, SourceLocation::new(1, 8));
    }

    #[test]
    fn test_unterminated_string_is_error() {
        assert!(Lexer::new("char *s = \"abc\n;").tokenize().is_err());
    }
}
