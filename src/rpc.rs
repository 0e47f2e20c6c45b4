//! RPC reading of the extracted declarations
//!
//! A call to `f()` on the client is forwarded to `f_rpc_handler()` on the
//! server; the answer comes back through `f_rpc_rsp(struct f_rpc_res *)`.
//! This module derives those names, finds which functions form RPC
//! boundaries, and resolves every parameter's direction from the function's
//! annotations.
//!
//! Directives are read from annotation names and from annotation arguments
//! alike, so `@rpc(OUT(buf))`, `SERIALIZE(OUT(buf));` and
//! `SERIALIZE(OUT(buf), STR(name));` all mean the same thing.

use crate::model::{Annotation, Declaration, Function};
use crate::parser::ast::Type;
use crate::parser::Parser;
use thiserror::Error;

pub const HANDLER_SUFFIX: &str = "_rpc_handler";
pub const RESPONSE_SUFFIX: &str = "_rpc_rsp";
pub const RESULT_SUFFIX: &str = "_rpc_res";
/// Name of the synthetic output carrying a non-void return value
pub const RESULT_PARAM: &str = "_result";
/// Placeholder directive naming an RPC function declared elsewhere
pub const FUNC_DIRECTIVE: &str = "FUNC";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    #[error("'{0}' is not a known function")]
    UnknownFunction(String),

    #[error("parameter {index} of '{function}' has no name")]
    UnnamedParameter { function: String, index: usize },

    #[error("{directive} on '{function}' names missing parameter '{parameter}'")]
    MissingParameter {
        function: String,
        directive: String,
        parameter: String,
    },

    #[error("'{0}' cannot be an event and have an inline response")]
    EventWithInlineResponse(String),
}

/// The names generated around one RPC function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcNames {
    pub function: String,
    pub handler: String,
    pub response: String,
    pub result: String,
}

impl RpcNames {
    pub fn for_function(name: &str) -> Self {
        RpcNames {
            function: name.to_string(),
            handler: format!("{name}{HANDLER_SUFFIX}"),
            response: format!("{name}{RESPONSE_SUFFIX}"),
            result: format!("{name}{RESULT_SUFFIX}"),
        }
    }

    /// Function name behind a generated name, if `name` is one
    pub fn stem(name: &str) -> Option<&str> {
        [HANDLER_SUFFIX, RESPONSE_SUFFIX, RESULT_SUFFIX]
            .into_iter()
            .find_map(|suffix| name.strip_suffix(suffix))
            .filter(|stem| !stem.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
    InOut,
}

impl Direction {
    /// Sent from client to server
    pub fn is_input(self) -> bool {
        matches!(self, Direction::In | Direction::InOut)
    }

    /// Sent back in the response
    pub fn is_output(self) -> bool {
        matches!(self, Direction::Out | Direction::InOut)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcParam {
    pub name: String,
    pub param_type: Type,
    pub direction: Direction,
    pub is_string: bool,
}

/// A function ready for stub generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcFunction {
    pub names: RpcNames,
    pub return_type: Type,
    /// Declared parameters, then `_result` when a value is returned
    pub params: Vec<RpcParam>,
    /// No response is sent back
    pub is_event: bool,
    /// The response is decoded in the stub instead of a separate `_rpc_rsp`
    pub inline_response: bool,
}

impl RpcFunction {
    pub fn from_function(function: &Function) -> Result<Self, RpcError> {
        let mut params = Vec::with_capacity(function.parameters.len() + 1);
        for (index, param) in function.parameters.iter().enumerate() {
            let name = param.name.clone().ok_or_else(|| RpcError::UnnamedParameter {
                function: function.name.clone(),
                index,
            })?;
            params.push(RpcParam {
                name,
                param_type: param.param_type.clone(),
                direction: Direction::In,
                is_string: false,
            });
        }

        let mut is_event = false;
        let mut inline_response = false;
        let mut ignore_return = false;

        for (directive, args) in directives(function.annotations()) {
            match directive.as_str() {
                "OUT" | "INOUT" | "STR" => {
                    for arg in &args {
                        let param = params.iter_mut().find(|p| &p.name == arg).ok_or_else(|| {
                            RpcError::MissingParameter {
                                function: function.name.clone(),
                                directive: directive.clone(),
                                parameter: arg.clone(),
                            }
                        })?;
                        match directive.as_str() {
                            "OUT" => param.direction = Direction::Out,
                            "INOUT" => param.direction = Direction::InOut,
                            _ => param.is_string = true,
                        }
                    }
                }
                "EVENT" => is_event = true,
                "INLINE_RESPONSE" => inline_response = true,
                "IGNORE_RETURN" => ignore_return = true,
                _ => {}
            }
        }

        if is_event && inline_response {
            return Err(RpcError::EventWithInlineResponse(function.name.clone()));
        }

        if !function.returns_void() && !ignore_return {
            params.push(RpcParam {
                name: RESULT_PARAM.to_string(),
                param_type: function.return_type.clone(),
                direction: Direction::Out,
                is_string: false,
            });
        }

        Ok(RpcFunction {
            names: RpcNames::for_function(&function.name),
            return_type: function.return_type.clone(),
            params,
            is_event,
            inline_response,
        })
    }

    /// Resolve the function called `name` in the parser's session
    pub fn lookup(parser: &Parser, name: &str) -> Result<Self, RpcError> {
        parser
            .session()
            .function(name)
            .ok_or_else(|| RpcError::UnknownFunction(name.to_string()))
            .and_then(Self::from_function)
    }

    pub fn name(&self) -> &str {
        &self.names.function
    }

    pub fn inputs(&self) -> impl Iterator<Item = &RpcParam> {
        self.params.iter().filter(|p| p.direction.is_input())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &RpcParam> {
        self.params.iter().filter(|p| p.direction.is_output())
    }

    pub fn result(&self) -> Option<&RpcParam> {
        self.params.iter().find(|p| p.name == RESULT_PARAM)
    }

    pub fn has_response(&self) -> bool {
        !self.is_event && self.outputs().next().is_some()
    }
}

/// Names of RPC functions in the session, each once: annotated functions,
/// then stems of `_rpc_rsp`/`_rpc_handler` functions and `_rpc_res`
/// structures, then `FUNC(name)` placeholders.
pub fn discover_rpc_functions(parser: &Parser) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut add = |name: &str| {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    };

    for function in parser.get_functions(false, false, true) {
        add(RpcNames::stem(&function.name).unwrap_or(function.name.as_str()));
    }
    for function in parser.get_functions(false, false, false) {
        if function.name.ends_with(HANDLER_SUFFIX) || function.name.ends_with(RESPONSE_SUFFIX) {
            if let Some(stem) = RpcNames::stem(&function.name) {
                add(stem);
            }
        }
    }
    for structure in parser.get_structures(false) {
        if let Some(stem) = structure.name.strip_suffix(RESULT_SUFFIX).filter(|s| !s.is_empty()) {
            add(stem);
        }
    }
    for placeholder in parser.get_placeholders(false) {
        if placeholder.annotation.name() == FUNC_DIRECTIVE {
            if let Some(name) = placeholder.annotation.first_argument() {
                add(name);
            }
        }
    }
    names
}

/// `(directive, arguments)` pairs from annotation names and arguments
fn directives(annotations: &[Annotation]) -> Vec<(String, Vec<String>)> {
    let mut found = Vec::new();
    for annotation in annotations {
        if is_directive(annotation.name()) {
            found.push((annotation.name().to_string(), annotation.arguments().to_vec()));
            continue;
        }
        for argument in annotation.arguments() {
            if let Some(parsed) = parse_directive(argument) {
                found.push(parsed);
            }
        }
    }
    found
}

fn is_directive(name: &str) -> bool {
    matches!(name, "OUT" | "INOUT" | "STR" | "EVENT" | "INLINE_RESPONSE" | "IGNORE_RETURN")
}

/// `OUT(buf, len)` → `("OUT", ["buf", "len"])`; `EVENT` → `("EVENT", [])`
fn parse_directive(text: &str) -> Option<(String, Vec<String>)> {
    let text = text.trim();
    let (name, args) = match text.find('(') {
        Some(open) if text.ends_with(')') => {
            let inner = &text[open + 1..text.len() - 1];
            let args = inner
                .split(',')
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();
            (text[..open].trim(), args)
        }
        Some(_) => return None,
        None => (text, Vec::new()),
    };
    is_directive(name).then(|| (name.to_string(), args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeclLocation, Origin};
    use crate::parser::ast::{Param, SourceLocation};

    fn function(name: &str, ret: &str, params: &[(&str, Type)], annotations: Vec<Annotation>) -> Function {
        let mut f = Function::new(
            name,
            Type::builtin(ret),
            Origin::InputFile,
            DeclLocation::new("api.c", SourceLocation::new(1, 1)),
        );
        f.parameters = params
            .iter()
            .map(|(n, t)| Param {
                name: Some(n.to_string()),
                param_type: t.clone(),
            })
            .collect();
        f.annotations = annotations;
        f
    }

    fn annotation(name: &str, args: &[&str]) -> Annotation {
        Annotation::with_arguments(name, args.iter().map(|a| a.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_names() {
        let names = RpcNames::for_function("ping");
        assert_eq!(names.handler, "ping_rpc_handler");
        assert_eq!(names.response, "ping_rpc_rsp");
        assert_eq!(names.result, "ping_rpc_res");
        assert_eq!(RpcNames::stem("ping_rpc_rsp"), Some("ping"));
        assert_eq!(RpcNames::stem("_rpc_res"), None);
        assert_eq!(RpcNames::stem("ping"), None);
    }

    #[test]
    fn test_directions_from_macro_arguments() {
        let f = function(
            "get_name",
            "int",
            &[
                ("id", Type::builtin("int")),
                ("buf", Type::builtin("char").with_pointer()),
            ],
            vec![annotation("SERIALIZE", &["OUT(buf)", "STR(buf)"])],
        );
        let rpc = RpcFunction::from_function(&f).unwrap();

        let inputs: Vec<&str> = rpc.inputs().map(|p| p.name.as_str()).collect();
        let outputs: Vec<&str> = rpc.outputs().map(|p| p.name.as_str()).collect();
        assert_eq!(inputs, vec!["id"]);
        assert_eq!(outputs, vec!["buf", "_result"]);
        assert!(rpc.params[1].is_string);
        assert!(rpc.has_response());
    }

    #[test]
    fn test_event_without_result() {
        let f = function(
            "notify",
            "int",
            &[("code", Type::builtin("int"))],
            vec![annotation("rpc", &[]), annotation("EVENT", &[]), annotation("IGNORE_RETURN", &[])],
        );
        let rpc = RpcFunction::from_function(&f).unwrap();
        assert!(rpc.is_event);
        assert!(rpc.result().is_none());
        assert!(!rpc.has_response());
    }

    #[test]
    fn test_errors() {
        let missing = function("f", "void", &[], vec![annotation("OUT", &["buf"])]);
        assert_eq!(
            RpcFunction::from_function(&missing),
            Err(RpcError::MissingParameter {
                function: "f".into(),
                directive: "OUT".into(),
                parameter: "buf".into(),
            })
        );

        let both = function("g", "void", &[], vec![annotation("rpc", &["EVENT", "INLINE_RESPONSE"])]);
        assert_eq!(
            RpcFunction::from_function(&both),
            Err(RpcError::EventWithInlineResponse("g".into()))
        );

        let mut unnamed = function("h", "void", &[], vec![]);
        unnamed.parameters.push(Param {
            name: None,
            param_type: Type::builtin("int"),
        });
        assert!(matches!(
            RpcFunction::from_function(&unnamed),
            Err(RpcError::UnnamedParameter { index: 0, .. })
        ));
    }

    #[test]
    fn test_parse_directive() {
        assert_eq!(
            parse_directive("OUT(buf, len)"),
            Some(("OUT".to_string(), vec!["buf".to_string(), "len".to_string()]))
        );
        assert_eq!(parse_directive("EVENT"), Some(("EVENT".to_string(), vec![])));
        assert_eq!(parse_directive("GROUP(g)"), None);
    }
}
