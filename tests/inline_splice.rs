//! End-to-end surgery: splice a callee into a caller, strip every marker,
//! recompute frame limits

use kinline::inline::markers::{
    add_finally_marker, add_inline_marker, is_after_inline_marker, is_before_inline_marker,
    is_finally_marker, is_inline_marker, remove_finally_markers,
};
use kinline::inline::splice::insert_sequence_before;
use kinline::jvm::code::{
    opcodes, recalculate_frame_limits, Insn, InsnId, InsnList, MethodBody,
};
use kinline::jvm::MethodAccessFlags;

/// Caller: pushes its argument, then a call site bracketed by inline markers
///
/// Returns the body plus the handles of the bracketed call and the
/// after-marker (the splice anchor).
fn build_caller() -> (MethodBody, InsnId, InsnId) {
    let mut body = MethodBody::empty();
    body.name = String::from("caller");
    body.descriptor = String::from("(I)V");
    body.access_flags = MethodAccessFlags::STATIC;

    let list = &mut body.instructions;
    list.push_back(Insn::Var {
        opcode: opcodes::ILOAD,
        index: 0,
    });
    add_inline_marker(list, true);
    let call = list.push_back(Insn::Method {
        opcode: opcodes::INVOKESTATIC,
        owner: String::from("com/example/Util"),
        name: String::from("consume"),
        descriptor: String::from("(I)V"),
        interface: false,
    });
    add_inline_marker(list, false);
    let after_marker = list.last().unwrap();
    list.push_back(Insn::Simple(opcodes::RETURN));

    (body, call, after_marker)
}

/// Callee: stores the argument, bumps it inside a finally-marked cleanup
/// region, jumps over a dead store to exercise label remapping
fn build_callee() -> InsnList {
    let mut list = InsnList::new();
    let skip = list.fresh_label();

    list.push_back(Insn::Var {
        opcode: opcodes::ISTORE,
        index: 1,
    });
    add_finally_marker(&mut list, 1, true);
    list.push_back(Insn::IInc { index: 1, delta: 1 });
    add_finally_marker(&mut list, 1, false);
    list.push_back(Insn::Jump {
        opcode: opcodes::GOTO,
        target: skip,
    });
    list.push_back(Insn::int_const(0));
    list.push_back(Insn::Var {
        opcode: opcodes::ISTORE,
        index: 1,
    });
    list.push_back(Insn::Label(skip));
    list
}

fn marker_count(body: &MethodBody) -> usize {
    body.instructions
        .iter()
        .filter(|(_, insn)| is_inline_marker(insn) || is_finally_marker(insn))
        .count()
}

#[test]
fn inline_a_callee_and_strip_every_marker() {
    let (mut caller, call, after_marker) = build_caller();
    let callee = build_callee();
    let callee_len = callee.len();

    insert_sequence_before(callee, &mut caller.instructions, after_marker).unwrap();

    // the spliced region sits exactly between the call and the after-marker
    let mut spliced = Vec::new();
    let mut cursor = caller.instructions.next(call);
    while let Some(id) = cursor {
        if id == after_marker {
            break;
        }
        spliced.push(id);
        cursor = caller.instructions.next(id);
    }
    assert_eq!(spliced.len(), callee_len);

    // the call site itself is replaced by the spliced body
    caller.instructions.remove(call).unwrap();

    // inline markers have served their purpose
    let brackets: Vec<InsnId> = caller
        .instructions
        .iter()
        .filter(|(_, insn)| is_before_inline_marker(insn) || is_after_inline_marker(insn))
        .map(|(id, _)| id)
        .collect();
    assert_eq!(brackets.len(), 2);
    for id in brackets {
        caller.instructions.remove(id).unwrap();
    }

    remove_finally_markers(&mut caller).unwrap();
    assert_eq!(marker_count(&caller), 0);

    // running the sweep again changes nothing
    let len_before = caller.instructions.len();
    remove_finally_markers(&mut caller).unwrap();
    assert_eq!(caller.instructions.len(), len_before);

    recalculate_frame_limits(&mut caller).unwrap();
    assert_eq!(caller.max_stack, 1);
    assert_eq!(caller.max_locals, 2);

    // final shape: argument flows through the relocated callee locals
    let shapes: Vec<&Insn> = caller.instructions.iter().map(|(_, insn)| insn).collect();
    let skip = match shapes[3] {
        Insn::Jump { target, .. } => *target,
        other => panic!("Expected the callee's jump, got {:?}", other),
    };
    assert_eq!(
        shapes,
        vec![
            &Insn::Var {
                opcode: opcodes::ILOAD,
                index: 0
            },
            &Insn::Var {
                opcode: opcodes::ISTORE,
                index: 1
            },
            &Insn::IInc { index: 1, delta: 1 },
            &Insn::Jump {
                opcode: opcodes::GOTO,
                target: skip
            },
            &Insn::int_const(0),
            &Insn::Var {
                opcode: opcodes::ISTORE,
                index: 1
            },
            &Insn::Label(skip),
            &Insn::Simple(opcodes::RETURN),
        ]
    );
}

#[test]
fn callee_labels_are_renumbered_into_the_caller_space() {
    let (mut caller, _, after_marker) = build_caller();
    // burn a few caller labels so the spaces would collide without renumbering
    let l0 = caller.instructions.fresh_label();
    let l1 = caller.instructions.fresh_label();

    insert_sequence_before(build_callee(), &mut caller.instructions, after_marker).unwrap();

    for (_, insn) in &caller.instructions {
        if let Insn::Jump { target, .. } = insn {
            assert_ne!(*target, l0);
            assert_ne!(*target, l1);
        }
    }
}
