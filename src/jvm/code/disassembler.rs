//! Decode a `Code` attribute's bytecode array into the instruction model
//!
//! Decoding runs in two passes. The first pass walks the encoded
//! instructions, resolving constant pool operands to symbolic names and
//! collecting every bytecode offset that anything refers to: jump and switch
//! targets, exception handler bounds, line number starts, and local variable
//! ranges. The second pass allocates one [`Label`] per referenced offset and
//! emits the final [`InsnList`], placing label (and line number)
//! pseudo-instructions ahead of the instruction at each referenced offset.

use super::{opcodes::*, Insn, InsnList, Label, LdcConstant, LocalVariable, MethodBody, TryCatchBlock};
use crate::jvm::class_file::{CodeAttribute, Constant, ConstantPool, RawMethod};
use crate::jvm::Error;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Build a [`MethodBody`] from a parsed method
///
/// Methods without a `Code` attribute (abstract, native) come back with an
/// empty instruction list.
pub fn disassemble(method: &RawMethod, pool: &ConstantPool) -> Result<MethodBody, Error> {
    let mut body = MethodBody {
        access_flags: method.access_flags,
        name: method.name.clone(),
        descriptor: method.descriptor.clone(),
        signature: method.signature.clone(),
        exceptions: method.exceptions.clone(),
        instructions: InsnList::new(),
        try_catch_blocks: vec![],
        local_variables: vec![],
        max_stack: 0,
        max_locals: 0,
    };
    let code = match &method.code {
        Some(code) => code,
        None => return Ok(body),
    };
    body.max_stack = code.max_stack;
    body.max_locals = code.max_locals;

    let decoded = decode_instructions(&code.bytecode, pool)?;

    // Offsets that need a label in front of the instruction at them
    let mut referenced: BTreeSet<usize> = BTreeSet::new();
    for (_, raw) in &decoded {
        match raw {
            Raw::Jump { target, .. } => {
                referenced.insert(*target);
            }
            Raw::TableSwitch {
                default, targets, ..
            } => {
                referenced.insert(*default);
                referenced.extend(targets.iter().copied());
            }
            Raw::LookupSwitch { default, pairs } => {
                referenced.insert(*default);
                referenced.extend(pairs.iter().map(|(_, target)| *target));
            }
            Raw::Insn(_) => (),
        }
    }
    for handler in &code.exception_table {
        referenced.insert(handler.start_pc as usize);
        referenced.insert(handler.end_pc as usize);
        referenced.insert(handler.handler_pc as usize);
    }
    for (start_pc, _) in &code.line_numbers {
        referenced.insert(*start_pc as usize);
    }
    for variable in &code.local_variables {
        referenced.insert(variable.start_pc as usize);
        referenced.insert(variable.start_pc as usize + variable.length as usize);
    }

    let starts: BTreeSet<usize> = decoded.iter().map(|(offset, _)| *offset).collect();
    for offset in &referenced {
        if !starts.contains(offset) && *offset != code.bytecode.len() {
            return Err(Error::BadClassFile(format!(
                "Branch or range target {} is not an instruction boundary",
                offset
            )));
        }
    }

    let mut labels: BTreeMap<usize, Label> = BTreeMap::new();
    for offset in &referenced {
        labels.insert(*offset, body.instructions.fresh_label());
    }
    let label_at = |offset: usize| -> Result<Label, Error> {
        labels.get(&offset).copied().ok_or_else(|| {
            Error::BadClassFile(format!("Reference to unknown bytecode offset {}", offset))
        })
    };

    let mut lines_at: HashMap<usize, Vec<u16>> = HashMap::new();
    for (start_pc, line) in &code.line_numbers {
        lines_at.entry(*start_pc as usize).or_default().push(*line);
    }

    for (offset, raw) in decoded {
        if let Some(label) = labels.get(&offset) {
            body.instructions.push_back(Insn::Label(*label));
            if let Some(lines) = lines_at.get(&offset) {
                for line in lines {
                    body.instructions.push_back(Insn::LineNumber {
                        line: *line,
                        start: *label,
                    });
                }
            }
        }
        let insn = match raw {
            Raw::Insn(insn) => insn,
            Raw::Jump { opcode, target } => Insn::Jump {
                opcode,
                target: label_at(target)?,
            },
            Raw::TableSwitch {
                default,
                low,
                targets,
            } => Insn::TableSwitch {
                default: label_at(default)?,
                low,
                targets: targets
                    .into_iter()
                    .map(label_at)
                    .collect::<Result<_, _>>()?,
            },
            Raw::LookupSwitch { default, pairs } => Insn::LookupSwitch {
                default: label_at(default)?,
                pairs: pairs
                    .into_iter()
                    .map(|(key, target)| Ok((key, label_at(target)?)))
                    .collect::<Result<_, Error>>()?,
            },
        };
        body.instructions.push_back(insn);
    }

    // A label can sit one past the last instruction (range ends)
    if let Some(label) = labels.get(&code.bytecode.len()) {
        body.instructions.push_back(Insn::Label(*label));
    }

    for handler in &code.exception_table {
        body.try_catch_blocks.push(TryCatchBlock {
            start: label_at(handler.start_pc as usize)?,
            end: label_at(handler.end_pc as usize)?,
            handler: label_at(handler.handler_pc as usize)?,
            catch_type: handler.catch_type.clone(),
        });
    }
    for variable in &code.local_variables {
        body.local_variables.push(LocalVariable {
            name: variable.name.clone(),
            descriptor: variable.descriptor.clone(),
            start: label_at(variable.start_pc as usize)?,
            end: label_at(variable.start_pc as usize + variable.length as usize)?,
            index: variable.index,
        });
    }

    Ok(body)
}

/// Instruction with branch targets still as absolute bytecode offsets
enum Raw {
    Insn(Insn),
    Jump { opcode: u8, target: usize },
    TableSwitch { default: usize, low: i32, targets: Vec<usize> },
    LookupSwitch { default: usize, pairs: Vec<(i32, usize)> },
}

struct Cursor<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    fn truncated(&self) -> Error {
        Error::BadClassFile(format!(
            "Bytecode array truncated at offset {}",
            self.position
        ))
    }

    fn u8(&mut self) -> Result<u8, Error> {
        let byte = *self.bytes.get(self.position).ok_or_else(|| self.truncated())?;
        self.position += 1;
        Ok(byte)
    }

    fn u16(&mut self) -> Result<u16, Error> {
        Ok(u16::from_be_bytes([self.u8()?, self.u8()?]))
    }

    fn i16(&mut self) -> Result<i16, Error> {
        Ok(self.u16()? as i16)
    }

    fn i32(&mut self) -> Result<i32, Error> {
        Ok(i32::from_be_bytes([
            self.u8()?,
            self.u8()?,
            self.u8()?,
            self.u8()?,
        ]))
    }

    /// Skip the alignment padding after a switch opcode
    fn align(&mut self) -> Result<(), Error> {
        while self.position % 4 != 0 {
            let _ = self.u8()?;
        }
        Ok(())
    }
}

fn decode_instructions(bytecode: &[u8], pool: &ConstantPool) -> Result<Vec<(usize, Raw)>, Error> {
    let mut cursor = Cursor {
        bytes: bytecode,
        position: 0,
    };
    let mut decoded = vec![];

    while cursor.position < bytecode.len() {
        let offset = cursor.position;
        let opcode = cursor.u8()?;
        let target_from = |relative: i32| -> usize { (offset as i64 + relative as i64) as usize };

        let raw = match opcode {
            NOP..=DCONST_1 => Raw::Insn(Insn::Simple(opcode)),
            BIPUSH => Raw::Insn(Insn::IntOperand {
                opcode,
                operand: cursor.u8()? as i8 as i32,
            }),
            SIPUSH => Raw::Insn(Insn::IntOperand {
                opcode,
                operand: cursor.i16()? as i32,
            }),
            LDC => {
                let index = cursor.u8()? as u16;
                Raw::Insn(Insn::Ldc(ldc_constant(pool, index)?))
            }
            19 | 20 => {
                // ldc_w / ldc2_w
                let index = cursor.u16()?;
                Raw::Insn(Insn::Ldc(ldc_constant(pool, index)?))
            }
            ILOAD..=ALOAD => Raw::Insn(Insn::Var {
                opcode,
                index: cursor.u8()? as u16,
            }),
            26..=45 => Raw::Insn(Insn::Var {
                opcode: ILOAD + (opcode - 26) / 4,
                index: ((opcode - 26) % 4) as u16,
            }),
            IALOAD..=SALOAD => Raw::Insn(Insn::Simple(opcode)),
            ISTORE..=ASTORE => Raw::Insn(Insn::Var {
                opcode,
                index: cursor.u8()? as u16,
            }),
            59..=78 => Raw::Insn(Insn::Var {
                opcode: ISTORE + (opcode - 59) / 4,
                index: ((opcode - 59) % 4) as u16,
            }),
            132 => Raw::Insn(Insn::IInc {
                index: cursor.u8()? as u16,
                delta: cursor.u8()? as i8 as i16,
            }),
            IASTORE..=131 | 133..=DCMPG => Raw::Insn(Insn::Simple(opcode)),
            IFEQ..=JSR | IFNULL | IFNONNULL => {
                let relative = cursor.i16()? as i32;
                Raw::Jump {
                    opcode,
                    target: target_from(relative),
                }
            }
            RET => Raw::Insn(Insn::Var {
                opcode,
                index: cursor.u8()? as u16,
            }),
            TABLESWITCH => {
                cursor.align()?;
                let default = target_from(cursor.i32()?);
                let low = cursor.i32()?;
                let high = cursor.i32()?;
                if high < low {
                    return Err(Error::BadClassFile(format!(
                        "tableswitch with high {} < low {}",
                        high, low
                    )));
                }
                let mut targets = Vec::with_capacity((high - low + 1) as usize);
                for _ in low..=high {
                    targets.push(target_from(cursor.i32()?));
                }
                Raw::TableSwitch {
                    default,
                    low,
                    targets,
                }
            }
            LOOKUPSWITCH => {
                cursor.align()?;
                let default = target_from(cursor.i32()?);
                let npairs = cursor.i32()?;
                let mut pairs = Vec::with_capacity(npairs.max(0) as usize);
                for _ in 0..npairs {
                    let key = cursor.i32()?;
                    pairs.push((key, target_from(cursor.i32()?)));
                }
                Raw::LookupSwitch { default, pairs }
            }
            IRETURN..=RETURN => Raw::Insn(Insn::Simple(opcode)),
            GETSTATIC..=PUTFIELD => {
                let (owner, name, descriptor, _) = pool.member_ref(cursor.u16()?)?;
                Raw::Insn(Insn::Field {
                    opcode,
                    owner: owner.to_owned(),
                    name: name.to_owned(),
                    descriptor: descriptor.to_owned(),
                })
            }
            INVOKEVIRTUAL..=INVOKESTATIC => {
                let (owner, name, descriptor, interface) = pool.member_ref(cursor.u16()?)?;
                Raw::Insn(Insn::Method {
                    opcode,
                    owner: owner.to_owned(),
                    name: name.to_owned(),
                    descriptor: descriptor.to_owned(),
                    interface,
                })
            }
            INVOKEINTERFACE => {
                let (owner, name, descriptor, _) = pool.member_ref(cursor.u16()?)?;
                let _count = cursor.u8()?;
                let _zero = cursor.u8()?;
                Raw::Insn(Insn::Method {
                    opcode,
                    owner: owner.to_owned(),
                    name: name.to_owned(),
                    descriptor: descriptor.to_owned(),
                    interface: true,
                })
            }
            INVOKEDYNAMIC => {
                let index = cursor.u16()?;
                let _zeros = cursor.u16()?;
                let name_and_type = match pool.get(index)? {
                    Constant::InvokeDynamic { name_and_type, .. } => *name_and_type,
                    other => {
                        return Err(Error::BadClassFile(format!(
                            "invokedynamic operand resolves to {:?}",
                            other
                        )))
                    }
                };
                let (name, descriptor) = pool.name_and_type(name_and_type)?;
                Raw::Insn(Insn::InvokeDynamic {
                    name: name.to_owned(),
                    descriptor: descriptor.to_owned(),
                })
            }
            NEW | ANEWARRAY | CHECKCAST | INSTANCEOF => Raw::Insn(Insn::Type {
                opcode,
                class: pool.class_name(cursor.u16()?)?.to_owned(),
            }),
            NEWARRAY => Raw::Insn(Insn::IntOperand {
                opcode,
                operand: cursor.u8()? as i32,
            }),
            ARRAYLENGTH | ATHROW | MONITORENTER | MONITOREXIT => Raw::Insn(Insn::Simple(opcode)),
            WIDE => {
                let wide_opcode = cursor.u8()?;
                match wide_opcode {
                    132 => Raw::Insn(Insn::IInc {
                        index: cursor.u16()?,
                        delta: cursor.i16()?,
                    }),
                    ILOAD..=ALOAD | ISTORE..=ASTORE | RET => Raw::Insn(Insn::Var {
                        opcode: wide_opcode,
                        index: cursor.u16()?,
                    }),
                    other => {
                        return Err(Error::BadClassFile(format!(
                            "Invalid wide-prefixed opcode {}",
                            other
                        )))
                    }
                }
            }
            MULTIANEWARRAY => Raw::Insn(Insn::MultiANewArray {
                descriptor: pool.class_name(cursor.u16()?)?.to_owned(),
                dims: cursor.u8()?,
            }),
            GOTO_W | JSR_W => {
                let relative = cursor.i32()?;
                Raw::Jump {
                    // normalize to the short-form opcode
                    opcode: if opcode == GOTO_W { GOTO } else { JSR },
                    target: target_from(relative),
                }
            }
            other => {
                return Err(Error::BadClassFile(format!(
                    "Unknown opcode {} at offset {}",
                    other, offset
                )))
            }
        };
        decoded.push((offset, raw));
    }

    Ok(decoded)
}

fn ldc_constant(pool: &ConstantPool, index: u16) -> Result<LdcConstant, Error> {
    let constant = match pool.get(index)? {
        Constant::Integer(value) => LdcConstant::Int(*value),
        Constant::Float(value) => LdcConstant::Float(*value),
        Constant::Long(value) => LdcConstant::Long(*value),
        Constant::Double(value) => LdcConstant::Double(*value),
        Constant::String(utf8) => LdcConstant::String(pool.utf8(*utf8)?.to_owned()),
        Constant::Class(name) => LdcConstant::Class(pool.utf8(*name)?.to_owned()),
        Constant::MethodType(descriptor) => {
            LdcConstant::MethodType(pool.utf8(*descriptor)?.to_owned())
        }
        other => {
            return Err(Error::BadClassFile(format!(
                "Unsupported ldc constant {:?} at index {}",
                other, index
            )))
        }
    };
    Ok(constant)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::MethodAccessFlags;

    /// `iconst_2; istore_1; iload_1; ifeq +6; iinc 1 1; return` with the
    /// `ifeq` jumping to the `return`
    const SIMPLE: &[u8] = &[
        5, // iconst_2
        60, // istore_1
        27, // iload_1
        153, 0, 6, // ifeq -> offset 9
        132, 1, 1, // iinc 1, 1
        177, // return (offset 9)
    ];

    fn decode(bytes: &[u8]) -> MethodBody {
        // a minimal pool is enough, no constant-pool operands in SIMPLE
        let pool = ConstantPool::parse(&mut &1u16.to_be_bytes()[..]).unwrap();
        let method = RawMethod {
            access_flags: MethodAccessFlags::STATIC,
            name: String::from("f"),
            descriptor: String::from("(I)V"),
            signature: None,
            exceptions: vec![],
            code: Some(CodeAttribute {
                max_stack: 1,
                max_locals: 2,
                bytecode: bytes.to_vec(),
                exception_table: vec![],
                line_numbers: vec![(0, 17)],
                local_variables: vec![],
            }),
        };
        disassemble(&method, &pool).unwrap()
    }

    #[test]
    fn jump_targets_become_labels() {
        let body = decode(SIMPLE);
        let insns: Vec<Insn> = body.instructions.iter().map(|(_, i)| i.clone()).collect();
        // label at 0 (line number) and label at 8 (jump target)
        let jump_target = match insns
            .iter()
            .find(|insn| matches!(insn, Insn::Jump { .. }))
            .unwrap()
        {
            Insn::Jump { target, .. } => *target,
            _ => unreachable!(),
        };
        let pos_of_target_label = insns
            .iter()
            .position(|insn| *insn == Insn::Label(jump_target))
            .unwrap();
        assert_eq!(insns[pos_of_target_label + 1], Insn::Simple(RETURN));
    }

    #[test]
    fn line_numbers_follow_their_label() {
        let body = decode(SIMPLE);
        let insns: Vec<Insn> = body.instructions.iter().map(|(_, i)| i.clone()).collect();
        match (&insns[0], &insns[1]) {
            (Insn::Label(label), Insn::LineNumber { line, start }) => {
                assert_eq!(label, start);
                assert_eq!(*line, 17);
            }
            other => panic!("expected label + line number, got {:?}", other),
        }
    }

    #[test]
    fn short_form_loads_are_normalized() {
        let body = decode(SIMPLE);
        let vars: Vec<Insn> = body
            .instructions
            .iter()
            .filter(|(_, insn)| matches!(insn, Insn::Var { .. }))
            .map(|(_, insn)| insn.clone())
            .collect();
        assert_eq!(
            vars,
            vec![
                Insn::Var {
                    opcode: ISTORE,
                    index: 1
                },
                Insn::Var {
                    opcode: ILOAD,
                    index: 1
                },
            ]
        );
    }

    #[test]
    fn truncated_bytecode_is_an_error() {
        let pool_bytes = 1u16.to_be_bytes();
        let pool = ConstantPool::parse(&mut &pool_bytes[..]).unwrap();
        let method = RawMethod {
            access_flags: MethodAccessFlags::STATIC,
            name: String::from("f"),
            descriptor: String::from("()V"),
            signature: None,
            exceptions: vec![],
            code: Some(CodeAttribute {
                max_stack: 0,
                max_locals: 0,
                bytecode: vec![153], // ifeq missing its offset
                exception_table: vec![],
                line_numbers: vec![],
                local_variables: vec![],
            }),
        };
        assert!(matches!(
            disassemble(&method, &pool),
            Err(Error::BadClassFile(_))
        ));
    }
}
