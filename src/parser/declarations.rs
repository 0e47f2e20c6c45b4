//! Declaration parsing implementation
//!
//! This module handles the top-level declarations the extractor models:
//!
//! - Function prototypes and definitions (bodies are skipped, marker statements kept)
//! - Struct forward declarations and definitions, including nested and anonymous ones
//! - Typedefs, including function pointer (callback) aliases
//! - File-scope variables, one record per declarator
//!
//! # Grammar
//!
//! ```text
//! declaration ::= specifiers ";"
//!               | specifiers init_decl ("," init_decl)* ";"
//!               | specifiers declarator body
//! specifiers  ::= (storage | qualifier | "typedef" | builtin+ | tag | typedef_name | attribute)+
//! tag         ::= ("struct" | "union" | "enum") identifier? ("{" members "}")?
//! init_decl   ::= declarator ("=" initializer)?
//! declarator  ::= ("*" qualifier*)* (identifier | "(" declarator ")") suffix*
//! suffix      ::= "[" size? "]" | "(" params ")"
//! params      ::= "void" | param ("," param)* ("," "...")?
//! ```
//!
//! Union and enum bodies are skipped. All parsing methods are `pub(crate)`
//! methods on the [`Scanner`] struct.

use super::ast::{BaseType, Field, Param, SourceLocation, Type};
use super::lexer::Token;
use super::scanner::{join_tokens, ScanFailure, ScannedItem, Scanner};
use crate::errors::ParseError;
use crate::model::{union_annotations, DeclKind, Function, StorageClass, Structure, Typedef, Variable};

/// Tag used for structs, unions and enums declared without a name
pub const ANONYMOUS_TAG: &str = "(anonymous)";

struct Specifiers {
    storage: StorageClass,
    is_typedef: bool,
    base: Type,
    /// `struct name` with no body
    struct_reference: Option<(String, SourceLocation)>,
    /// `struct { ... }` with no tag
    anonymous_struct: Option<Structure>,
}

enum TagOutcome {
    Reference(String, SourceLocation),
    Anonymous(Structure),
    Other,
}

#[derive(Debug, Default)]
struct ParamList {
    params: Vec<Param>,
    is_variadic: bool,
}

enum DeclaratorOp {
    Pointer,
    Array(Option<String>),
    Function(ParamList),
}

/// Operators listed from the identifier outward
struct Declarator {
    name: Option<(String, SourceLocation)>,
    ops: Vec<DeclaratorOp>,
}

enum Declared {
    Object(Type),
    Function { return_type: Type, params: ParamList },
}

impl Declarator {
    /// Apply the operators to `base`, outermost first
    fn resolve(self, base: Type) -> Result<Declared, &'static str> {
        let mut ty = base;
        let mut function: Option<ParamList> = None;

        for op in self.ops.into_iter().rev() {
            match op {
                DeclaratorOp::Function(params) => {
                    if function.is_some() {
                        return Err("function returning a function");
                    }
                    if !ty.array_dims.is_empty() {
                        return Err("function returning an array");
                    }
                    function = Some(params);
                }
                DeclaratorOp::Pointer => {
                    ty = match function.take() {
                        Some(params) => function_type(ty, params).with_pointer(),
                        None => ty.with_pointer(),
                    };
                }
                DeclaratorOp::Array(size) => {
                    if function.is_some() {
                        return Err("array of functions");
                    }
                    ty.array_dims.insert(0, size);
                }
            }
        }

        Ok(match function {
            Some(params) => Declared::Function {
                return_type: ty,
                params,
            },
            None => Declared::Object(ty),
        })
    }
}

fn function_type(return_type: Type, params: ParamList) -> Type {
    Type::new(BaseType::FunctionPointer {
        return_type: Box::new(return_type),
        params: params.params.into_iter().map(|p| p.param_type).collect(),
        is_variadic: params.is_variadic,
    })
}

impl<'c> Scanner<'c> {
    /// Parse one top-level declaration into zero or more items
    pub(crate) fn parse_external_declaration(&mut self) -> Result<Vec<ScannedItem>, ScanFailure> {
        let start = self.current_location();
        self.decl_kind = DeclKind::Variable;
        self.tag_items.clear();

        let mut specs = self.parse_specifiers()?;
        if specs.is_typedef {
            self.decl_kind = DeclKind::Typedef;
        }
        let mut items = std::mem::take(&mut self.tag_items);

        if self.match_token(&Token::Semicolon(start)) {
            if let (Some((name, location)), false) = (specs.struct_reference, specs.is_typedef) {
                let forward = Structure::new(name, self.origin, self.decl_location(location));
                items.push(ScannedItem::Structure(forward));
            }
            return Ok(items);
        }

        let mut anonymous = specs.anonymous_struct.take();
        loop {
            let declarator = self.parse_declarator(false)?;
            let name = match &declarator.name {
                Some((name, _)) => name.clone(),
                None => return Err(self.malformed("expected identifier in declarator")),
            };

            if let Some(mut structure) = anonymous.take() {
                // `typedef struct { ... } A, *PA;` names the structure after the first alias
                if specs.is_typedef {
                    structure.name = name.clone();
                    specs.base.base = BaseType::Struct(name.clone());
                    items.push(ScannedItem::Structure(structure));
                }
            }
            let base = specs.base.clone();

            let declared = declarator
                .resolve(base)
                .map_err(|reason| self.malformed(reason))?;
            let location = self.decl_location(start);

            match declared {
                Declared::Function {
                    return_type,
                    params,
                } if !specs.is_typedef => {
                    self.decl_kind = DeclKind::Function;
                    self.skip_attributes()?;

                    let mut function = Function::new(name, return_type, self.origin, location);
                    function.parameters = params.params;
                    function.is_variadic = params.is_variadic;
                    function.storage = specs.storage;

                    if self.check(&Token::LBrace(start)) {
                        let body = self.skip_balanced()?;
                        function.is_defined = true;
                        function.definition = Some(function.location.clone());
                        union_annotations(&mut function.annotations, self.body_annotations(body));
                        items.push(ScannedItem::Function(function));
                        return Ok(items);
                    }
                    items.push(ScannedItem::Function(function));
                }
                Declared::Function {
                    return_type,
                    params,
                } => {
                    // `typedef int handler_t(int);`
                    let alias = Typedef::new(name, function_type(return_type, params), self.origin, location);
                    items.push(ScannedItem::Typedef(alias));
                }
                Declared::Object(ty) if specs.is_typedef => {
                    self.skip_attributes()?;
                    items.push(ScannedItem::Typedef(Typedef::new(name, ty, self.origin, location)));
                }
                Declared::Object(ty) => {
                    self.skip_attributes()?;
                    let mut variable = Variable::new(name, ty, self.origin, location);
                    variable.is_extern = specs.storage.is_extern;
                    variable.is_static = specs.storage.is_static;
                    if self.match_token(&Token::Eq(start)) {
                        variable.initializer = Some(self.parse_expression_text()?);
                    }
                    items.push(ScannedItem::Variable(variable));
                }
            }

            if self.match_token(&Token::Comma(start)) {
                continue;
            }
            self.expect_semicolon("after declaration")?;
            return Ok(items);
        }
    }

    fn parse_specifiers(&mut self) -> Result<Specifiers, ScanFailure> {
        let mut storage = StorageClass::default();
        let mut is_typedef = false;
        let mut is_const = false;
        let mut is_volatile = false;
        let mut words: Vec<String> = Vec::new();
        let mut base: Option<BaseType> = None;
        let mut tag = TagOutcome::Other;

        loop {
            match self.peek() {
                Token::Storage(word, _) => {
                    match word.as_str() {
                        "static" => storage.is_static = true,
                        "extern" => storage.is_extern = true,
                        "inline" | "__inline" => storage.is_inline = true,
                        _ => {}
                    }
                    self.advance();
                }
                Token::Qualifier(word, _) => {
                    match word.as_str() {
                        "const" => is_const = true,
                        "volatile" => is_volatile = true,
                        _ => {}
                    }
                    self.advance();
                }
                Token::Typedef(_) => {
                    is_typedef = true;
                    self.advance();
                }
                Token::Builtin(word, _) => {
                    if base.is_some() {
                        return Err(self.malformed(format!("unexpected '{}' after type name", word)));
                    }
                    words.push(word.clone());
                    self.advance();
                }
                Token::Struct(_) | Token::Union(_) | Token::Enum(_) => {
                    if base.is_some() || !words.is_empty() {
                        return Err(self.malformed("two types in one declaration"));
                    }
                    let (parsed, outcome) = self.parse_tag_specifier()?;
                    base = Some(parsed);
                    tag = outcome;
                }
                Token::Ident(word, _) if is_attribute_keyword(word) => self.skip_attribute()?,
                Token::Ident(word, _) if is_ignored_keyword(word) => {
                    self.advance();
                }
                Token::Ident(word, _) if base.is_none() && words.is_empty() => {
                    base = Some(BaseType::Named(word.clone()));
                    self.advance();
                }
                _ => break,
            }
        }

        let base = match base {
            Some(base) => base,
            None if !words.is_empty() => BaseType::Builtin(words.join(" ")),
            None => {
                return Err(self.malformed(format!("expected type specifier, found {}", self.peek())));
            }
        };

        let mut ty = Type::new(base);
        ty.is_const = is_const;
        ty.is_volatile = is_volatile;

        let (struct_reference, anonymous_struct) = match tag {
            TagOutcome::Reference(name, location) => (Some((name, location)), None),
            TagOutcome::Anonymous(structure) => (None, Some(structure)),
            TagOutcome::Other => (None, None),
        };

        Ok(Specifiers {
            storage,
            is_typedef,
            base: ty,
            struct_reference,
            anonymous_struct,
        })
    }

    /// `struct`/`union`/`enum` with optional tag and body. Named struct
    /// definitions are queued in `tag_items`.
    fn parse_tag_specifier(&mut self) -> Result<(BaseType, TagOutcome), ScanFailure> {
        let location = self.current_location();
        let keyword = self.advance().clone();
        self.skip_attributes()?;

        let name = match self.peek() {
            Token::Ident(name, _) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        };
        self.skip_attributes()?;

        let label = name.clone().unwrap_or_else(|| ANONYMOUS_TAG.to_string());
        let is_struct = matches!(keyword, Token::Struct(_));
        let base = match keyword {
            Token::Struct(_) => BaseType::Struct(label),
            Token::Union(_) => BaseType::Union(label),
            _ => BaseType::Enum(label),
        };

        if !self.check(&Token::LBrace(location)) {
            return match name {
                Some(name) if is_struct => Ok((base, TagOutcome::Reference(name, location))),
                Some(_) => Ok((base, TagOutcome::Other)),
                None => Err(self.malformed(format!(
                    "expected tag name or '{{' after '{}'",
                    keyword.text()
                ))),
            };
        }

        if !is_struct {
            self.skip_balanced()?;
            return Ok((base, TagOutcome::Other));
        }

        let structure = self.parse_struct_body(name.clone(), location)?;
        if name.is_some() {
            self.tag_items.push(ScannedItem::Structure(structure));
            Ok((base, TagOutcome::Other))
        } else {
            Ok((base, TagOutcome::Anonymous(structure)))
        }
    }

    /// Parse `{ members }` of a struct whose keyword is at `location`
    fn parse_struct_body(
        &mut self,
        name: Option<String>,
        location: SourceLocation,
    ) -> Result<Structure, ScanFailure> {
        let saved_kind = self.decl_kind;
        self.decl_kind = DeclKind::Structure;
        let open = self.current_location();
        self.advance(); // '{'

        let mut structure = Structure::new(
            name.unwrap_or_else(|| ANONYMOUS_TAG.to_string()),
            self.origin,
            self.decl_location(location),
        );
        structure.is_defined = true;
        structure.definition = Some(structure.location.clone());

        loop {
            if self.match_token(&Token::RBrace(open)) {
                break;
            }
            if self.is_at_end() {
                return Err(ScanFailure::Fatal(ParseError::new(
                    &self.file,
                    open,
                    "unbalanced '{' reaches end of file",
                )));
            }
            if self.match_token(&Token::Semicolon(open)) {
                continue;
            }
            if self.at_marker_statement() {
                if let Some((annotation, _)) = self.parse_marker_call()? {
                    union_annotations(&mut structure.annotations, vec![annotation]);
                }
                continue;
            }
            self.parse_member(&mut structure)?;
        }

        self.decl_kind = saved_kind;
        Ok(structure)
    }

    fn parse_member(&mut self, structure: &mut Structure) -> Result<(), ScanFailure> {
        let mut specs = self.parse_specifiers()?;

        if self.match_token(&Token::Semicolon(self.current_location())) {
            // Anonymous struct members contribute their fields directly
            if let Some(inner) = specs.anonymous_struct.take() {
                structure.fields.extend(inner.fields);
            }
            return Ok(());
        }

        loop {
            let (name, field_type) = if self.check(&Token::Colon(self.current_location())) {
                (None, specs.base.clone())
            } else {
                let declarator = self.parse_declarator(false)?;
                let name = declarator.name.as_ref().map(|(n, _)| n.clone());
                match declarator.resolve(specs.base.clone()) {
                    Ok(Declared::Object(ty)) => (name, ty),
                    Ok(Declared::Function { .. }) => {
                        return Err(self.malformed("function declared as a struct member"));
                    }
                    Err(reason) => return Err(self.malformed(reason)),
                }
            };

            let bit_width = if self.match_token(&Token::Colon(self.current_location())) {
                Some(self.parse_expression_text()?)
            } else {
                None
            };
            self.skip_attributes()?;

            if let Some(name) = name {
                structure.fields.push(Field {
                    name,
                    field_type,
                    bit_width,
                });
            }

            if self.match_token(&Token::Comma(self.current_location())) {
                continue;
            }
            return self.expect_semicolon("after struct member");
        }
    }

    fn parse_declarator(&mut self, allow_abstract: bool) -> Result<Declarator, ScanFailure> {
        let mut pointers = 0usize;
        while self.match_token(&Token::Star(self.current_location())) {
            pointers += 1;
            while matches!(self.peek(), Token::Qualifier(..)) {
                self.advance();
            }
            self.skip_attributes()?;
        }

        let mut declarator = match self.peek() {
            Token::Ident(name, location) if !is_attribute_keyword(name) => {
                let declarator = Declarator {
                    name: Some((name.clone(), *location)),
                    ops: Vec::new(),
                };
                self.advance();
                declarator
            }
            Token::LParen(_) if self.nested_declarator_follows(allow_abstract) => {
                self.advance();
                let inner = self.parse_declarator(allow_abstract)?;
                self.expect_token(
                    &Token::RParen(self.current_location()),
                    "expected ')' to close declarator",
                )?;
                inner
            }
            _ if allow_abstract => Declarator {
                name: None,
                ops: Vec::new(),
            },
            other => {
                return Err(self.malformed(format!("expected identifier, found {}", other)));
            }
        };

        loop {
            match self.peek() {
                Token::LBracket(_) => {
                    let inner = self.skip_balanced()?;
                    let size = join_tokens(&self.tokens[inner]);
                    let size = if size.is_empty() { None } else { Some(size) };
                    declarator.ops.push(DeclaratorOp::Array(size));
                }
                Token::LParen(_) => {
                    if self.decl_kind == DeclKind::Variable {
                        self.decl_kind = DeclKind::Function;
                    }
                    let params = self.parse_parameter_list()?;
                    declarator.ops.push(DeclaratorOp::Function(params));
                }
                _ => break,
            }
        }

        declarator
            .ops
            .extend(std::iter::repeat_with(|| DeclaratorOp::Pointer).take(pointers));
        Ok(declarator)
    }

    /// Whether the `(` at the cursor opens a nested declarator rather than a parameter list
    fn nested_declarator_follows(&self, allow_abstract: bool) -> bool {
        match self.peek_ahead(1) {
            Some(Token::Star(_)) => true,
            Some(Token::LParen(_)) => !allow_abstract,
            Some(Token::Ident(name, _)) => !allow_abstract && !is_attribute_keyword(name),
            _ => false,
        }
    }

    fn parse_parameter_list(&mut self) -> Result<ParamList, ScanFailure> {
        self.advance(); // '('
        let mut list = ParamList::default();

        if self.match_token(&Token::RParen(self.current_location())) {
            return Ok(list);
        }
        if matches!(self.peek(), Token::Builtin(word, _) if word == "void")
            && matches!(self.peek_ahead(1), Some(Token::RParen(_)))
        {
            self.advance();
            self.advance();
            return Ok(list);
        }

        loop {
            if self.match_token(&Token::Ellipsis(self.current_location())) {
                list.is_variadic = true;
                self.expect_token(
                    &Token::RParen(self.current_location()),
                    "expected ')' after '...'",
                )?;
                return Ok(list);
            }

            let specs = self.parse_specifiers()?;
            let declarator = self.parse_declarator(true)?;
            let name = declarator.name.as_ref().map(|(n, _)| n.clone());
            let param_type = match declarator.resolve(specs.base) {
                Ok(Declared::Object(ty)) => ty,
                // A function parameter decays to a function pointer
                Ok(Declared::Function {
                    return_type,
                    params,
                }) => function_type(return_type, params).with_pointer(),
                Err(reason) => return Err(self.malformed(reason)),
            };
            self.skip_attributes()?;
            list.params.push(Param { name, param_type });

            if self.match_token(&Token::Comma(self.current_location())) {
                continue;
            }
            self.expect_token(
                &Token::RParen(self.current_location()),
                "expected ',' or ')' in parameter list",
            )?;
            return Ok(list);
        }
    }

    /// Source text up to the next `,` or `;` at depth 0
    fn parse_expression_text(&mut self) -> Result<String, ScanFailure> {
        let start = self.position;
        let mut depth = 0usize;
        let mut open = self.current_location();

        loop {
            let token = self.peek();
            match token {
                Token::Eof(_) if depth > 0 => {
                    return Err(ScanFailure::Fatal(ParseError::new(
                        &self.file,
                        open,
                        "unbalanced delimiter in initializer reaches end of file",
                    )));
                }
                Token::Eof(_) => break,
                Token::LParen(loc) | Token::LBracket(loc) | Token::LBrace(loc) => {
                    if depth == 0 {
                        open = *loc;
                    }
                    depth += 1;
                }
                Token::RParen(_) | Token::RBracket(_) | Token::RBrace(_) => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                Token::Comma(_) | Token::Semicolon(_) if depth == 0 => break,
                _ => {}
            }
            self.advance();
        }

        let text = join_tokens(&self.tokens[start..self.position]);
        if text.is_empty() {
            return Err(self.malformed(format!("expected expression, found {}", self.peek())));
        }
        Ok(text)
    }

    fn skip_attribute(&mut self) -> Result<(), ScanFailure> {
        self.advance();
        if self.check(&Token::LParen(self.current_location())) {
            self.skip_balanced()?;
        }
        Ok(())
    }

    /// Skip `__attribute__((...))` and friends
    pub(crate) fn skip_attributes(&mut self) -> Result<(), ScanFailure> {
        while matches!(self.peek(), Token::Ident(word, _) if is_attribute_keyword(word)) {
            self.skip_attribute()?;
        }
        Ok(())
    }
}

fn is_attribute_keyword(word: &str) -> bool {
    matches!(
        word,
        "__attribute__" | "__attribute" | "__declspec" | "__asm__" | "__asm" | "asm" | "_Alignas" | "alignas"
    )
}

fn is_ignored_keyword(word: &str) -> bool {
    matches!(word, "__extension__" | "__thread" | "__restrict__" | "__volatile__")
}
