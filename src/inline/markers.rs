//! Synthetic marker calls delimiting inlined regions
//!
//! The code generator communicates structural facts across inlining passes
//! by emitting calls to symbols that do not exist at runtime: a fixed marker
//! owner class whose method name tells the marker kind, and a non-local
//! return owner whose method name carries a target label. Markers are never
//! executed; they exist to be recognized and stripped here. A finally marker
//! additionally carries its nesting depth as an ordinary int-constant
//! instruction pushed immediately before the call, in whatever constant
//! encoding the emitter chose.

use crate::jvm::code::{is_return_opcode, Insn, InsnId, InsnList, MethodBody};
use crate::jvm::names::{
    INLINE_MARKER_AFTER_METHOD_NAME, INLINE_MARKER_BEFORE_METHOD_NAME, INLINE_MARKER_CLASS_NAME,
    INLINE_MARKER_FINALLY_END, INLINE_MARKER_FINALLY_START, NON_LOCAL_RETURN_OWNER,
};
use crate::jvm::{code::opcodes, Error};

/// Append a before- or after-inline-call marker to `list`
pub fn add_inline_marker(list: &mut InsnList, is_start: bool) {
    let name = if is_start {
        INLINE_MARKER_BEFORE_METHOD_NAME
    } else {
        INLINE_MARKER_AFTER_METHOD_NAME
    };
    list.push_back(marker_call(name, "()V"));
}

/// Append a finally-block boundary marker carrying its nesting depth
pub fn add_finally_marker(list: &mut InsnList, depth: i32, is_start: bool) {
    let name = if is_start {
        INLINE_MARKER_FINALLY_START
    } else {
        INLINE_MARKER_FINALLY_END
    };
    list.push_back(Insn::int_const(depth));
    list.push_back(marker_call(name, "(I)V"));
}

/// Append the non-local-return flag call naming its target label
pub fn add_non_local_return_flag(list: &mut InsnList, label_name: &str) {
    list.push_back(Insn::Method {
        opcode: opcodes::INVOKESTATIC,
        owner: String::from(NON_LOCAL_RETURN_OWNER),
        name: String::from(label_name),
        descriptor: String::from("()V"),
        interface: false,
    });
}

fn marker_call(name: &str, descriptor: &str) -> Insn {
    Insn::Method {
        opcode: opcodes::INVOKESTATIC,
        owner: String::from(INLINE_MARKER_CLASS_NAME),
        name: String::from(name),
        descriptor: String::from(descriptor),
        interface: false,
    }
}

fn is_marker_named(insn: &Insn, expected: Option<&str>) -> bool {
    match insn {
        Insn::Method {
            opcode, owner, name, ..
        } if *opcode == opcodes::INVOKESTATIC && owner == INLINE_MARKER_CLASS_NAME => {
            match expected {
                Some(expected) => name == expected,
                None => {
                    name == INLINE_MARKER_BEFORE_METHOD_NAME
                        || name == INLINE_MARKER_AFTER_METHOD_NAME
                }
            }
        }
        _ => false,
    }
}

/// Whether `insn` is a before- or after-inline-call marker
pub fn is_inline_marker(insn: &Insn) -> bool {
    is_marker_named(insn, None)
}

pub fn is_before_inline_marker(insn: &Insn) -> bool {
    is_marker_named(insn, Some(INLINE_MARKER_BEFORE_METHOD_NAME))
}

pub fn is_after_inline_marker(insn: &Insn) -> bool {
    is_marker_named(insn, Some(INLINE_MARKER_AFTER_METHOD_NAME))
}

pub fn is_finally_start(insn: &Insn) -> bool {
    is_marker_named(insn, Some(INLINE_MARKER_FINALLY_START))
}

pub fn is_finally_end(insn: &Insn) -> bool {
    is_marker_named(insn, Some(INLINE_MARKER_FINALLY_END))
}

pub fn is_finally_marker(insn: &Insn) -> bool {
    is_finally_start(insn) || is_finally_end(insn)
}

/// Decode the int operand instruction preceding a finally marker
///
/// Accepts any constant-loading form and normalizes it to the plain value.
/// A finally marker whose predecessor is not an int constant means the
/// emitter and this pass have fallen out of sync.
pub fn marker_constant(insn: &Insn) -> Result<i32, Error> {
    insn.int_constant().ok_or_else(|| {
        Error::InconsistentState(format!(
            "Expected an int constant before a finally marker, found {:?}",
            insn
        ))
    })
}

/// Strip every finally-marker pair and its depth operand from `body`
///
/// Single forward scan; removed nodes are never revisited, so running this
/// on an already-clean body is a no-op.
pub fn remove_finally_markers(body: &mut MethodBody) -> Result<(), Error> {
    let instructions = &mut body.instructions;
    let mut cursor = instructions.first();
    let mut removed = 0usize;
    while let Some(id) = cursor {
        let insn = instructions
            .get(id)
            .ok_or_else(|| Error::InconsistentState(format!("Dangling instruction {:?}", id)))?;
        if !is_finally_marker(insn) {
            cursor = instructions.next(id);
            continue;
        }
        let operand = instructions.prev(id).ok_or_else(|| {
            Error::InconsistentState(String::from("Finally marker with no depth operand"))
        })?;
        match instructions.get(operand) {
            Some(depth) => marker_constant(depth)?,
            None => {
                return Err(Error::InconsistentState(String::from(
                    "Finally marker operand already removed",
                )))
            }
        };
        cursor = instructions.next(id);
        instructions.remove(operand)?;
        instructions.remove(id)?;
        removed += 2;
    }
    if removed > 0 {
        log::debug!(
            "Removed {} finally marker instructions from {}",
            removed,
            body.name
        );
    }
    Ok(())
}

/// Target label carried by a marked return, if `id` is one
///
/// A return-family instruction is marked when the instruction immediately
/// before it is a call on the non-local-return owner; the call's method name
/// is the label. Whether that label means a non-local exit or a labeled
/// self-return is for the caller to decide by comparing label names.
pub fn marked_return_label(list: &InsnList, id: InsnId) -> Option<&str> {
    match list.get(id) {
        Some(insn) if insn.opcode().map(is_return_opcode).unwrap_or(false) => (),
        _ => return None,
    }
    let previous = list.prev(id)?;
    match list.get(previous) {
        Some(Insn::Method { owner, name, .. }) if owner == NON_LOCAL_RETURN_OWNER => {
            Some(name.as_str())
        }
        _ => None,
    }
}

pub fn is_marked_return(list: &InsnList, id: InsnId) -> bool {
    marked_return_label(list, id).is_some()
}
