//! In-memory instruction model and list surgery
//!
//! A loaded method body is an [`InsnList`]: an ordered, doubly-linked
//! sequence of typed [`Insn`] nodes with stable [`InsnId`] handles. Branches
//! refer to [`Label`] pseudo-instructions in the same list, so the list forms
//! an implicit control-flow graph. Inlining mutates this structure in place:
//! inserting one list into another, deleting marker instructions, and
//! renumbering locals - all through local pointer updates, never a global
//! rebuild.

mod disassembler;
mod insn_list;
mod instructions;
mod label;
mod max_calc;
mod method_body;

pub use disassembler::*;
pub use insn_list::*;
pub use instructions::*;
pub use label::*;
pub use max_calc::*;
pub use method_body::*;
