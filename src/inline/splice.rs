//! Instruction splicing and local-slot arithmetic
//!
//! Inlining relocates a callee's locals into the caller's frame: the
//! callee's real parameter slots collapse onto the caller-side argument
//! slots, and every other local moves up past whatever synthetic staging
//! locals the code generator already introduced. The shift computed here is
//! additive, so callers must apply it exactly once per relocation.

use crate::jvm::code::{InsnId, InsnList, MethodBody};
use crate::jvm::FieldType;
use crate::jvm::names::{INLINE_ARG_LOCAL_PREFIX, INLINE_FUN_LOCAL_PREFIX};
use crate::jvm::Error;
use crate::util::Width;

/// Stack-slot layout of a callee's parameters
///
/// `real` covers what the callee itself declares (receiver plus captured
/// variables plus declared parameters); `args` is the footprint of the
/// arguments as they sit on the caller's stack at the call site.
#[derive(Clone, Debug, Default)]
pub struct Parameters {
    pub real: Vec<ParameterKind>,
    pub args: Vec<ParameterKind>,
}

/// One parameter slot-group in a [`Parameters`] layout
#[derive(Clone, Debug)]
pub enum ParameterKind {
    Receiver(FieldType),
    Captured(FieldType),
    Declared(FieldType),
}

impl ParameterKind {
    fn field_type(&self) -> &FieldType {
        match self {
            ParameterKind::Receiver(typ)
            | ParameterKind::Captured(typ)
            | ParameterKind::Declared(typ) => typ,
        }
    }
}

impl Parameters {
    /// Slot footprint of the callee's own parameter list
    pub fn real_parameters_size_on_stack(&self) -> usize {
        self.real.iter().map(|p| p.field_type().width()).sum()
    }

    /// Slot footprint of the arguments on the caller's stack
    pub fn args_size_on_stack(&self) -> usize {
        self.args.iter().map(|p| p.field_type().width()).sum()
    }
}

/// Whether a local-variable name marks a synthetic inline staging local
pub fn is_fake_local_variable_for_inline(name: &str) -> bool {
    name.starts_with(INLINE_FUN_LOCAL_PREFIX) || name.starts_with(INLINE_ARG_LOCAL_PREFIX)
}

/// One past the highest slot occupied by an inline staging local, -1 if none
fn index_after_last_marker(body: &MethodBody) -> i32 {
    let mut result = -1;
    for variable in &body.local_variables {
        if is_fake_local_variable_for_inline(&variable.name) {
            result = result.max(variable.index as i32 + 1);
        }
    }
    result
}

/// Slot shift to add to the callee's non-parameter local indices
pub fn calc_marker_shift(parameters: &Parameters, body: &MethodBody) -> i32 {
    index_after_last_marker(body) - parameters.real_parameters_size_on_stack() as i32
        + parameters.args_size_on_stack() as i32
}

/// Splice every instruction of `source`, in order, before `anchor` in `to`
///
/// `anchor` must be a live member of `to`. Labels carried by `source` are
/// renumbered into the destination's label space, so branches inside the
/// spliced region keep pointing at their (relocated) targets.
pub fn insert_sequence_before(
    source: InsnList,
    to: &mut InsnList,
    anchor: InsnId,
) -> Result<(), Error> {
    to.splice_before(source, anchor)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{opcodes, Insn, LocalVariable, MethodBody};
    use crate::jvm::BaseType;

    fn local(name: &str, index: u16, body: &mut MethodBody) {
        let start = body.instructions.fresh_label();
        let end = body.instructions.fresh_label();
        body.local_variables.push(LocalVariable {
            name: String::from(name),
            descriptor: String::from("I"),
            start,
            end,
            index,
        });
    }

    #[test]
    fn fake_locals_are_recognized_by_prefix() {
        assert!(is_fake_local_variable_for_inline("$i$f$measureTime"));
        assert!(is_fake_local_variable_for_inline("$i$a$1$forEach"));
        assert!(!is_fake_local_variable_for_inline("elapsed$iv"));
        assert!(!is_fake_local_variable_for_inline("this"));
    }

    #[test]
    fn shift_counts_past_the_highest_staging_local() {
        let mut body = MethodBody::empty();
        local("receiver$iv", 0, &mut body);
        local("$i$f$apply", 1, &mut body);
        local("$i$a$1$apply", 4, &mut body);
        local("ordinary", 9, &mut body);

        let parameters = Parameters {
            real: vec![
                ParameterKind::Receiver(FieldType::object("java/lang/Object")),
                ParameterKind::Declared(FieldType::Base(BaseType::Long)),
            ],
            args: vec![ParameterKind::Declared(FieldType::Base(BaseType::Int))],
        };

        // slots [1, 5) are staging locals: 5 - 3 + 1
        assert_eq!(calc_marker_shift(&parameters, &body), 3);
    }

    #[test]
    fn shift_without_staging_locals_is_based_on_the_sentinel() {
        let mut body = MethodBody::empty();
        local("x", 0, &mut body);

        let parameters = Parameters {
            real: vec![ParameterKind::Declared(FieldType::INT)],
            args: vec![ParameterKind::Declared(FieldType::INT)],
        };
        assert_eq!(calc_marker_shift(&parameters, &body), -1);
    }

    #[test]
    fn shift_is_additive_not_idempotent() {
        let mut body = MethodBody::empty();
        local("$i$f$run", 2, &mut body);
        let parameters = Parameters::default();
        let shift = calc_marker_shift(&parameters, &body);
        assert_eq!(shift, 3);

        // Relocating a slot is one application of the shift; doing it twice
        // keeps moving, so the caller must shift each index exactly once.
        let slot = 5;
        assert_eq!(slot + shift, 8);
        assert_ne!(slot + shift + shift, slot + shift);
    }

    #[test]
    fn sequence_lands_before_the_anchor_in_order() {
        let mut to = InsnList::new();
        to.push_back(Insn::Simple(opcodes::NOP));
        let anchor = to.push_back(Insn::Simple(opcodes::RETURN));

        let mut source = InsnList::new();
        source.push_back(Insn::int_const(1));
        source.push_back(Insn::int_const(2));
        source.push_back(Insn::Simple(opcodes::POP2));

        insert_sequence_before(source, &mut to, anchor).unwrap();

        let shapes: Vec<&Insn> = to.iter().map(|(_, insn)| insn).collect();
        assert_eq!(
            shapes,
            vec![
                &Insn::Simple(opcodes::NOP),
                &Insn::int_const(1),
                &Insn::int_const(2),
                &Insn::Simple(opcodes::POP2),
                &Insn::Simple(opcodes::RETURN),
            ]
        );
    }

    #[test]
    fn splicing_before_a_removed_anchor_fails() {
        let mut to = InsnList::new();
        let anchor = to.push_back(Insn::Simple(opcodes::NOP));
        to.push_back(Insn::Simple(opcodes::RETURN));
        to.remove(anchor).unwrap();

        let mut source = InsnList::new();
        source.push_back(Insn::Simple(opcodes::NOP));

        assert!(matches!(
            insert_sequence_before(source, &mut to, anchor),
            Err(Error::InconsistentState(_))
        ));
    }
}
