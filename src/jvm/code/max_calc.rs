use super::{load_store_arg_size, opcodes, Insn, Label, LdcConstant, MethodBody};
use crate::jvm::{FieldType, MethodDescriptor, ParseDescriptor};
use crate::jvm::{Error, MethodAccessFlags};
use crate::util::Width;
use std::collections::HashMap;

/// Recompute `max_stack` and `max_locals` from the instruction list
///
/// Splicing and marker removal leave the cached frame limits stale, so this
/// runs once after all surgery on a body is done. Locals come from the
/// parameter footprint and every variable-touching instruction. Stack depth
/// is tracked by a single forward walk: branches record the depth at their
/// target label, exception handlers start with the thrown reference on the
/// stack, and code after an unconditional transfer picks its depth back up
/// from whichever label introduces it.
pub fn recalculate_frame_limits(body: &mut MethodBody) -> Result<(), Error> {
    let descriptor = MethodDescriptor::parse(&body.descriptor)?;

    let this_slot = if body.access_flags.contains(MethodAccessFlags::STATIC) {
        0
    } else {
        1
    };
    let mut max_locals = this_slot + descriptor.parameter_slots();

    let mut depth_at: HashMap<Label, i32> = HashMap::new();
    for block in &body.try_catch_blocks {
        depth_at.insert(block.handler, 1);
    }

    let mut max_stack: i32 = 0;
    let mut depth: i32 = 0;
    let mut reachable = true;

    for (_, insn) in &body.instructions {
        match insn {
            Insn::Label(label) => {
                let recorded = depth_at.get(label).copied();
                if reachable {
                    depth = depth.max(recorded.unwrap_or(depth));
                } else {
                    depth = recorded.unwrap_or(0);
                    reachable = true;
                }
            }
            Insn::LineNumber { .. } => (),

            // locals count even in code a branch skipped over
            Insn::Var { opcode, index } => {
                let size = load_store_arg_size(*opcode);
                max_locals = max_locals.max(*index as usize + size);
                if !reachable {
                    continue;
                }
                if *opcode == opcodes::RET {
                    reachable = false;
                } else {
                    let load = *opcode < opcodes::ISTORE;
                    depth += if load { size as i32 } else { -(size as i32) };
                }
            }
            Insn::IInc { index, .. } => {
                max_locals = max_locals.max(*index as usize + 1);
            }

            Insn::Jump { opcode, target } => {
                if !reachable {
                    continue;
                }
                depth += jump_stack_delta(*opcode);
                // jsr pushes a return address at the target only
                let at_target = if *opcode == opcodes::JSR {
                    depth + 1
                } else {
                    depth
                };
                record_branch(&mut depth_at, *target, at_target);
                if *opcode == opcodes::GOTO {
                    reachable = false;
                }
            }
            Insn::TableSwitch {
                default, targets, ..
            } => {
                if !reachable {
                    continue;
                }
                depth -= 1;
                record_branch(&mut depth_at, *default, depth);
                for target in targets {
                    record_branch(&mut depth_at, *target, depth);
                }
                reachable = false;
            }
            Insn::LookupSwitch { default, pairs } => {
                if !reachable {
                    continue;
                }
                depth -= 1;
                record_branch(&mut depth_at, *default, depth);
                for (_, target) in pairs {
                    record_branch(&mut depth_at, *target, depth);
                }
                reachable = false;
            }

            other => {
                if !reachable {
                    continue;
                }
                depth += plain_stack_delta(other)?;
                if is_terminator(other) {
                    reachable = false;
                }
            }
        }

        if depth < 0 {
            return Err(Error::InconsistentState(format!(
                "Stack underflow at {:?} in {}",
                insn, body.name
            )));
        }
        max_stack = max_stack.max(depth);
    }

    body.max_locals = max_locals as u16;
    body.max_stack = max_stack as u16;
    Ok(())
}

fn record_branch(depth_at: &mut HashMap<Label, i32>, target: Label, depth: i32) {
    let entry = depth_at.entry(target).or_insert(depth);
    if *entry < depth {
        *entry = depth;
    }
}

/// Stack delta of a conditional or unconditional branch
fn jump_stack_delta(opcode: u8) -> i32 {
    use opcodes::*;
    match opcode {
        IFEQ..=IFLE | IFNULL | IFNONNULL => -1,
        IF_ICMPEQ..=IF_ACMPNE => -2,
        JSR => 0,
        _ => 0, // goto
    }
}

fn is_terminator(insn: &Insn) -> bool {
    use opcodes::*;
    match insn {
        Insn::Simple(opcode) => {
            (IRETURN..=RETURN).contains(opcode) || *opcode == ATHROW
        }
        _ => false,
    }
}

/// Stack delta of everything that is not a branch, label, or local access
fn plain_stack_delta(insn: &Insn) -> Result<i32, Error> {
    use opcodes::*;
    let delta = match insn {
        Insn::Simple(opcode) => simple_stack_delta(*opcode)?,
        Insn::IntOperand { opcode, .. } => {
            if *opcode == NEWARRAY {
                0
            } else {
                1 // bipush, sipush
            }
        }
        Insn::Ldc(constant) => match constant {
            LdcConstant::Long(_) | LdcConstant::Double(_) => 2,
            _ => 1,
        },
        Insn::Type { opcode, .. } => {
            if *opcode == NEW {
                1
            } else {
                0 // anewarray, checkcast, instanceof
            }
        }
        Insn::Field {
            opcode, descriptor, ..
        } => {
            let width = FieldType::parse(descriptor)?.width() as i32;
            match *opcode {
                GETSTATIC => width,
                PUTSTATIC => -width,
                GETFIELD => width - 1,
                _ => -width - 1, // putfield
            }
        }
        Insn::Method {
            opcode, descriptor, ..
        } => {
            let descriptor = MethodDescriptor::parse(descriptor)?;
            let receiver = if *opcode == INVOKESTATIC { 0 } else { 1 };
            let returned = descriptor.return_type.width() as i32;
            returned - receiver - descriptor.parameter_slots() as i32
        }
        Insn::InvokeDynamic { descriptor, .. } => {
            let descriptor = MethodDescriptor::parse(descriptor)?;
            descriptor.return_type.width() as i32 - descriptor.parameter_slots() as i32
        }
        Insn::MultiANewArray { dims, .. } => 1 - *dims as i32,
        _ => 0,
    };
    Ok(delta)
}

/// Stack delta of an operand-free instruction
fn simple_stack_delta(opcode: u8) -> Result<i32, Error> {
    use opcodes::*;
    let delta = match opcode {
        NOP => 0,
        ACONST_NULL..=ICONST_5 | FCONST_0..=FCONST_2 => 1,
        LCONST_0 | LCONST_1 | DCONST_0 | DCONST_1 => 2,

        // array loads: pop array + index, push the element
        IALOAD..=SALOAD => match opcode {
            47 | 49 => 0, // laload, daload
            _ => -1,
        },
        // array stores: pop array + index + value
        IASTORE..=SASTORE => match opcode {
            80 | 82 => -4, // lastore, dastore
            _ => -3,
        },

        POP => -1,
        POP2 => -2,
        DUP | DUP_X1 | DUP_X2 => 1,
        DUP2 | DUP2_X1 | DUP2_X2 => 2,
        SWAP => 0,

        // binary arithmetic in int/long/float/double column order
        IADD..=115 => match (opcode - IADD) % 4 {
            1 | 3 => -2, // long, double
            _ => -1,
        },
        116..=119 => 0, // negations
        120..=125 => -1, // shifts pop an int amount
        126 | 128 | 130 => -1, // iand, ior, ixor
        127 | 129 | 131 => -2, // land, lor, lxor

        // conversions
        133 | 135 | 140 | 141 => 1, // i2l, i2d, f2l, f2d
        136 | 137 | 144 | 146 => -1, // l2i, l2f, d2i, d2f
        134 | 138 | 139 | 142 | 143 | 145 | 147 => 0,

        LCMP => -3,
        149 | 150 => -1, // fcmpl, fcmpg
        151 | DCMPG => -3,

        IRETURN | FRETURN | ARETURN => -1,
        LRETURN | DRETURN => -2,
        RETURN => 0,

        ARRAYLENGTH => 0,
        ATHROW => -1,
        MONITORENTER | MONITOREXIT => -1,

        other => {
            return Err(Error::InconsistentState(format!(
                "Cannot compute stack effect of opcode {}",
                other
            )))
        }
    };
    Ok(delta)
}

#[cfg(test)]
mod test {
    use super::super::InsnList;
    use super::*;
    use crate::jvm::code::TryCatchBlock;

    fn body_of(descriptor: &str, insns: Vec<Insn>) -> MethodBody {
        let mut body = MethodBody::empty();
        body.descriptor = String::from(descriptor);
        body.access_flags = MethodAccessFlags::STATIC;
        for insn in insns {
            body.instructions.push_back(insn);
        }
        body
    }

    #[test]
    fn straight_line_arithmetic() {
        let mut body = body_of(
            "(II)I",
            vec![
                Insn::Var {
                    opcode: opcodes::ILOAD,
                    index: 0,
                },
                Insn::Var {
                    opcode: opcodes::ILOAD,
                    index: 1,
                },
                Insn::Simple(opcodes::IADD),
                Insn::Simple(opcodes::IRETURN),
            ],
        );
        recalculate_frame_limits(&mut body).unwrap();
        assert_eq!(body.max_stack, 2);
        assert_eq!(body.max_locals, 2);
    }

    #[test]
    fn wide_locals_take_two_slots() {
        let mut body = body_of(
            "(J)J",
            vec![
                Insn::Var {
                    opcode: opcodes::LLOAD,
                    index: 0,
                },
                Insn::Var {
                    opcode: opcodes::LSTORE,
                    index: 2,
                },
                Insn::Var {
                    opcode: opcodes::LLOAD,
                    index: 2,
                },
                Insn::Simple(opcodes::LRETURN),
            ],
        );
        recalculate_frame_limits(&mut body).unwrap();
        assert_eq!(body.max_stack, 2);
        assert_eq!(body.max_locals, 4);
    }

    #[test]
    fn branch_target_depth_is_propagated() {
        let mut body = MethodBody::empty();
        body.descriptor = String::from("(I)I");
        body.access_flags = MethodAccessFlags::STATIC;
        let join = body.instructions.fresh_label();
        for insn in vec![
            Insn::Var {
                opcode: opcodes::ILOAD,
                index: 0,
            },
            Insn::Var {
                opcode: opcodes::ILOAD,
                index: 0,
            },
            Insn::Jump {
                opcode: opcodes::IFEQ,
                target: join,
            },
            Insn::int_const(7),
            Insn::Simple(opcodes::IRETURN),
            Insn::Label(join),
            Insn::Simple(opcodes::IRETURN),
        ] {
            body.instructions.push_back(insn);
        }
        recalculate_frame_limits(&mut body).unwrap();
        assert_eq!(body.max_stack, 2);
    }

    #[test]
    fn exception_handler_starts_with_one_value() {
        let mut body = MethodBody::empty();
        body.descriptor = String::from("()V");
        body.access_flags = MethodAccessFlags::STATIC;
        let start = body.instructions.fresh_label();
        let end = body.instructions.fresh_label();
        let handler = body.instructions.fresh_label();
        for insn in vec![
            Insn::Label(start),
            Insn::Simple(opcodes::NOP),
            Insn::Label(end),
            Insn::Simple(opcodes::RETURN),
            Insn::Label(handler),
            Insn::Simple(opcodes::ATHROW),
        ] {
            body.instructions.push_back(insn);
        }
        body.try_catch_blocks.push(TryCatchBlock {
            start,
            end,
            handler,
            catch_type: None,
        });
        recalculate_frame_limits(&mut body).unwrap();
        assert_eq!(body.max_stack, 1);
    }

    #[test]
    fn method_call_pops_receiver_and_arguments() {
        let mut body = body_of(
            "(Ljava/lang/String;)I",
            vec![
                Insn::Var {
                    opcode: opcodes::ALOAD,
                    index: 0,
                },
                Insn::int_const(1),
                Insn::Method {
                    opcode: opcodes::INVOKEVIRTUAL,
                    owner: String::from("java/lang/String"),
                    name: String::from("charAt"),
                    descriptor: String::from("(I)C"),
                    interface: false,
                },
                Insn::Simple(opcodes::IRETURN),
            ],
        );
        recalculate_frame_limits(&mut body).unwrap();
        assert_eq!(body.max_stack, 2);
        assert_eq!(body.max_locals, 1);
    }

    #[test]
    fn stack_underflow_is_an_error() {
        let mut body = body_of("()V", vec![Insn::Simple(opcodes::POP)]);
        let result = recalculate_frame_limits(&mut body);
        assert!(matches!(result, Err(Error::InconsistentState(_))));
    }
}
