//! Textual rendering of instructions and method bodies
//!
//! Diagnostics only: error messages and test fixtures want a deterministic,
//! locale-free view of what a list looks like. Nothing in the transformation
//! reads this output back.

use crate::jvm::code::{Insn, InsnId, InsnList, LdcConstant, MethodBody, MNEMONICS};

fn mnemonic(opcode: u8) -> &'static str {
    MNEMONICS.get(opcode as usize).copied().unwrap_or("<bad>")
}

/// Render one instruction as `mnemonic operands...`
pub fn insn_text(insn: &Insn) -> String {
    match insn {
        Insn::Label(label) => format!("{:?}:", label),
        Insn::LineNumber { line, start } => format!("line {} {:?}", line, start),
        Insn::Simple(opcode) => mnemonic(*opcode).to_string(),
        Insn::IntOperand { opcode, operand } => format!("{} {}", mnemonic(*opcode), operand),
        Insn::Ldc(constant) => format!("ldc {}", ldc_text(constant)),
        Insn::Var { opcode, index } => format!("{} {}", mnemonic(*opcode), index),
        Insn::IInc { index, delta } => format!("iinc {} {}", index, delta),
        Insn::Type { opcode, class } => format!("{} {}", mnemonic(*opcode), class),
        Insn::Field {
            opcode,
            owner,
            name,
            descriptor,
        } => format!("{} {}.{} : {}", mnemonic(*opcode), owner, name, descriptor),
        Insn::Method {
            opcode,
            owner,
            name,
            descriptor,
            ..
        } => format!("{} {}.{} {}", mnemonic(*opcode), owner, name, descriptor),
        Insn::InvokeDynamic { name, descriptor } => {
            format!("invokedynamic {} {}", name, descriptor)
        }
        Insn::Jump { opcode, target } => format!("{} {:?}", mnemonic(*opcode), target),
        Insn::TableSwitch {
            default,
            low,
            targets,
        } => {
            let mut out = format!("tableswitch default={:?}", default);
            for (i, target) in targets.iter().enumerate() {
                out.push_str(&format!(" {}={:?}", *low + i as i32, target));
            }
            out
        }
        Insn::LookupSwitch { default, pairs } => {
            let mut out = format!("lookupswitch default={:?}", default);
            for (key, target) in pairs {
                out.push_str(&format!(" {}={:?}", key, target));
            }
            out
        }
        Insn::MultiANewArray { descriptor, dims } => {
            format!("multianewarray {} {}", descriptor, dims)
        }
    }
}

fn ldc_text(constant: &LdcConstant) -> String {
    match constant {
        LdcConstant::Int(value) => value.to_string(),
        LdcConstant::Float(value) => format!("{}f", value),
        LdcConstant::Long(value) => format!("{}L", value),
        LdcConstant::Double(value) => format!("{}d", value),
        LdcConstant::String(value) => format!("{:?}", value),
        LdcConstant::Class(name) => format!("{}.class", name),
        LdcConstant::MethodType(descriptor) => descriptor.clone(),
    }
}

/// Render the instruction behind `id`, or `"<null>"` for a dead handle
pub fn insn_text_at(list: &InsnList, id: InsnId) -> String {
    match list.get(id) {
        Some(insn) => insn_text(insn),
        None => String::from("<null>"),
    }
}

/// Render a whole body: `name descriptor:` header, one instruction per line
pub fn body_text(body: &MethodBody) -> String {
    let mut out = format!("{} {}:\n", body.name, body.descriptor);
    for (_, insn) in &body.instructions {
        out.push_str("  ");
        out.push_str(&insn_text(insn));
        out.push('\n');
    }
    out
}

/// Render an optional body, `"Not generated"` when absent
pub fn node_text(body: Option<&MethodBody>) -> String {
    match body {
        Some(body) => body_text(body),
        None => String::from("Not generated"),
    }
}
