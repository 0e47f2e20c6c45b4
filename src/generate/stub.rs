//! Reference emitter producing client stubs and server handlers
//!
//! For an RPC function `f` the emitter writes, depending on the requested
//! [`CodeBlocks`]:
//! - header: `struct f_rpc_res` with the outputs and the prototypes of
//!   `f_rpc_handler` and, when the response is not inline, `f_rpc_rsp`
//! - client stub `f` with its `locals`, `encode`, `send`, `decode` and
//!   `return` sections
//! - server handler `f_rpc_handler` with its `locals`, `decode`, `execute`
//!   and `response` sections
//! - footer: the handler registration
//!
//! Every section is fenced by `/* Autogenerated: <block> */` and
//! `/* Autogenerated: end */` so a later pass can find and replace it.

use super::{Block, CodeBlocks, Emitter, GenerateError};
use crate::model::{Annotation, Function, Placeholder, Structure};
use crate::parser::ast::{BaseType, Type};
use crate::rpc::{Direction, RpcFunction, RpcParam, RESULT_PARAM};
use std::fmt::{self, Write};
use tracing::debug;

const SECTION_END: &str = "/* Autogenerated: end */";

/// Blocks that belong to the client stub, in output order
const CLIENT_BLOCKS: [Block; 5] = [Block::Locals, Block::Encode, Block::Send, Block::Decode, Block::Return];
/// Blocks that belong to the server handler
const HANDLER_BLOCKS: [Block; 4] = [Block::Locals, Block::Decode, Block::Execute, Block::Response];

#[derive(Debug, Clone)]
pub struct StubEmitter {
    indent: String,
    emitted: usize,
}

impl Default for StubEmitter {
    fn default() -> Self {
        StubEmitter {
            indent: "\t".to_string(),
            emitted: 0,
        }
    }
}

impl StubEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    /// Number of RPC functions emitted so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn section(&self, out: &mut String, block: Block, lines: &[String]) -> fmt::Result {
        writeln!(out, "{}/* Autogenerated: {} */", self.indent, block)?;
        for line in lines {
            writeln!(out, "{}{}", self.indent, line)?;
        }
        writeln!(out, "{}{}", self.indent, SECTION_END)
    }

    fn header(&self, out: &mut String, rpc: &RpcFunction) -> fmt::Result {
        if rpc.has_response() {
            writeln!(out, "struct {} {{", rpc.names.result)?;
            for param in rpc.outputs() {
                writeln!(out, "{}{};", self.indent, storage_type(param).declare(&param.name))?;
            }
            out.push_str("};\n\n");
            if !rpc.inline_response {
                writeln!(out, "void {}(struct {} *res);", rpc.names.response, rpc.names.result)?;
            }
        }
        writeln!(out, "void {}(struct rpc_decoder *_dec);", rpc.names.handler)
    }

    fn client(&self, out: &mut String, function: &Function, rpc: &RpcFunction, blocks: &CodeBlocks) -> fmt::Result {
        writeln!(out, "{}\n{{", function.signature())?;
        let mut first = true;
        for &block in blocks.body().iter().filter(|b| CLIENT_BLOCKS.contains(b)) {
            let lines = match block {
                Block::Locals => client_locals(rpc),
                Block::Encode => rpc.inputs().filter(|p| p.name != RESULT_PARAM).map(encode_line).collect(),
                Block::Send => vec![send_line(rpc)],
                Block::Decode => client_decode(rpc),
                Block::Return => client_return(rpc),
                _ => continue,
            };
            if !first {
                out.push('\n');
            }
            first = false;
            self.section(out, block, &lines)?;
        }
        out.push_str("}\n");
        Ok(())
    }

    fn handler(&self, out: &mut String, rpc: &RpcFunction, blocks: &CodeBlocks) -> fmt::Result {
        writeln!(out, "void {}(struct rpc_decoder *_dec)\n{{", rpc.names.handler)?;
        let mut first = true;
        for &block in blocks.body().iter().filter(|b| HANDLER_BLOCKS.contains(b)) {
            let lines = match block {
                Block::Locals => handler_locals(rpc),
                Block::Decode => handler_decode(rpc),
                Block::Execute => vec![call_line(rpc)],
                Block::Response => handler_response(rpc),
                _ => continue,
            };
            if !first {
                out.push('\n');
            }
            first = false;
            self.section(out, block, &lines)?;
        }
        out.push_str("}\n");
        Ok(())
    }
}

impl Emitter for StubEmitter {
    fn emit_function(&mut self, function: &Function, blocks: &CodeBlocks) -> Result<String, GenerateError> {
        let rpc = RpcFunction::from_function(function)?;
        debug!(function = %function.name, event = rpc.is_event, "emitting stub");

        let mut out = String::new();
        if blocks.include_header() {
            self.header(&mut out, &rpc)?;
            out.push('\n');
        }
        self.client(&mut out, function, &rpc, blocks)?;
        out.push('\n');
        self.handler(&mut out, &rpc, blocks)?;
        if blocks.include_footer() {
            writeln!(out, "\nRPC_REGISTER_HANDLER({}, {});", rpc.name(), rpc.names.handler)?;
        }
        self.emitted += 1;
        Ok(out)
    }

    fn emit_structure(&mut self, structure: &Structure, _blocks: &CodeBlocks) -> Result<String, GenerateError> {
        if !structure.is_defined {
            return Ok(format!("struct {};\n", structure.name));
        }
        let mut out = format!("struct {} {{\n", structure.name);
        for field in &structure.fields {
            let declared = field.field_type.declare(&field.name);
            match &field.bit_width {
                Some(width) => writeln!(out, "{}{} : {};", self.indent, declared, width)?,
                None => writeln!(out, "{}{};", self.indent, declared)?,
            }
        }
        out.push_str("};\n");
        Ok(out)
    }

    fn emit_placeholder(&mut self, placeholder: &Placeholder, _blocks: &CodeBlocks) -> Result<String, GenerateError> {
        Ok(format!(
            "/* Autogenerated: {} at {} */\n",
            placeholder.annotation, placeholder.location
        ))
    }

    fn emit_annotation(&mut self, annotation: &Annotation, _blocks: &CodeBlocks) -> Result<String, GenerateError> {
        Ok(format!("/* {} */\n", annotation))
    }
}

/// Type a parameter is held in on the receiving side: the pointee of an
/// output pointer, the pointer itself for strings
fn storage_type(param: &RpcParam) -> Type {
    let mut ty = param.param_type.clone();
    if !param.is_string && ty.pointer_depth > 0 && param.name != RESULT_PARAM {
        ty.pointer_depth -= 1;
        ty.is_const = false;
    }
    ty
}

/// Wire encoding picked from the C type
fn wire_kind(param: &RpcParam) -> &'static str {
    if param.is_string {
        return "str";
    }
    let ty = storage_type(param);
    if !ty.array_dims.is_empty() || ty.pointer_depth > 0 {
        return "buffer";
    }
    match &ty.base {
        BaseType::Builtin(name) | BaseType::Named(name) => {
            let name = name.as_str();
            if name == "bool" || name == "_Bool" {
                "bool"
            } else if name.starts_with("unsigned") || name.starts_with("uint") || name == "size_t" {
                "uint"
            } else if name.starts_with("int")
                || name.ends_with("int")
                || name.ends_with("long")
                || name.ends_with("short")
                || name == "char"
                || name.starts_with("signed")
            {
                "int"
            } else {
                "buffer"
            }
        }
        BaseType::Enum(_) => "int",
        _ => "buffer",
    }
}

fn value_ref(param: &RpcParam) -> String {
    let is_pointer = param.param_type.pointer_depth > 0 && !param.is_string;
    if is_pointer {
        format!("(*{})", param.name)
    } else {
        param.name.clone()
    }
}

fn encode_line(param: &RpcParam) -> String {
    match wire_kind(param) {
        "buffer" => format!(
            "ser_encode_buffer(&_ctx.encoder, {0}, sizeof({1}));",
            param.name,
            value_ref(param)
        ),
        kind => format!("ser_encode_{}(&_ctx.encoder, {});", kind, value_ref(param)),
    }
}

fn decode_line(target: &str, param: &RpcParam) -> String {
    format!("ser_decode_{}(_dec, &{});", wire_kind(param), target)
}

fn send_line(rpc: &RpcFunction) -> String {
    if rpc.is_event {
        format!("nrf_rpc_event_send(&_ctx, \"{}\");", rpc.name())
    } else if rpc.inline_response {
        format!("nrf_rpc_cmd_send(&_ctx, \"{}\", &_rsp);", rpc.name())
    } else if rpc.has_response() {
        format!("nrf_rpc_cmd_send(&_ctx, \"{}\", {});", rpc.name(), rpc.names.response)
    } else {
        format!("nrf_rpc_cmd_send(&_ctx, \"{}\", NULL);", rpc.name())
    }
}

fn client_locals(rpc: &RpcFunction) -> Vec<String> {
    let mut lines = vec!["struct rpc_encoder _ctx;".to_string()];
    if rpc.inline_response && rpc.has_response() {
        lines.push("struct rpc_decoder _rsp;".to_string());
        lines.push(format!("struct {} _res;", rpc.names.result));
    } else if let Some(result) = rpc.result() {
        lines.push(format!("{} = {{0}};", result.param_type.declare(RESULT_PARAM)));
    }
    lines
}

fn client_decode(rpc: &RpcFunction) -> Vec<String> {
    if !(rpc.inline_response && rpc.has_response()) {
        return Vec::new();
    }
    let mut lines: Vec<String> = rpc
        .outputs()
        .map(|p| format!("ser_decode_{}(&_rsp, &_res.{});", wire_kind(p), p.name))
        .collect();
    for param in rpc.outputs().filter(|p| p.name != RESULT_PARAM) {
        lines.push(format!("{} = _res.{};", value_ref(param), param.name));
    }
    lines
}

fn client_return(rpc: &RpcFunction) -> Vec<String> {
    match rpc.result() {
        Some(_) if rpc.inline_response && rpc.has_response() => vec![format!("return _res.{};", RESULT_PARAM)],
        Some(_) => vec![format!("return {};", RESULT_PARAM)],
        None => Vec::new(),
    }
}

fn handler_locals(rpc: &RpcFunction) -> Vec<String> {
    let mut lines = Vec::new();
    if rpc.has_response() {
        lines.push(format!("struct {} _res;", rpc.names.result));
    }
    for param in rpc.params.iter().filter(|p| p.direction != Direction::Out) {
        lines.push(format!("{};", storage_type(param).declare(&param.name)));
    }
    lines
}

fn handler_decode(rpc: &RpcFunction) -> Vec<String> {
    rpc.params
        .iter()
        .filter(|p| p.direction.is_input())
        .map(|p| decode_line(&p.name, p))
        .collect()
}

fn call_line(rpc: &RpcFunction) -> String {
    let args: Vec<String> = rpc
        .params
        .iter()
        .filter(|p| p.name != RESULT_PARAM)
        .map(|p| {
            let by_address = p.param_type.pointer_depth > 0 && !p.is_string;
            match (p.direction, by_address) {
                (Direction::Out, true) => format!("&_res.{}", p.name),
                (Direction::Out, false) => format!("_res.{}", p.name),
                (_, true) => format!("&{}", p.name),
                (_, false) => p.name.clone(),
            }
        })
        .collect();
    let call = format!("{}({});", rpc.name(), args.join(", "));
    match rpc.result() {
        Some(_) if rpc.has_response() => format!("_res.{} = {}", RESULT_PARAM, call),
        _ => call,
    }
}

fn handler_response(rpc: &RpcFunction) -> Vec<String> {
    if rpc.is_event {
        return Vec::new();
    }
    if !rpc.has_response() {
        return vec!["nrf_rpc_rsp_send_void();".to_string()];
    }
    let mut lines: Vec<String> = rpc
        .params
        .iter()
        .filter(|p| p.direction == Direction::InOut)
        .map(|p| format!("_res.{0} = {0};", p.name))
        .collect();
    lines.push("nrf_rpc_rsp_send(&_res, sizeof(_res));".to_string());
    lines
}
