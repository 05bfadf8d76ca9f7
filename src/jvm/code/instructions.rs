use super::Label;
use crate::jvm::{BaseType, FieldType};

/// Raw JVM opcode values
///
/// Only the canonical forms are named: the disassembler folds `wide`,
/// `iload_<n>`-style, and `ldc_w` variants into these.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-6.html
#[allow(missing_docs)]
pub mod opcodes {
    pub const NOP: u8 = 0;
    pub const ACONST_NULL: u8 = 1;
    pub const ICONST_M1: u8 = 2;
    pub const ICONST_0: u8 = 3;
    pub const ICONST_1: u8 = 4;
    pub const ICONST_2: u8 = 5;
    pub const ICONST_3: u8 = 6;
    pub const ICONST_4: u8 = 7;
    pub const ICONST_5: u8 = 8;
    pub const LCONST_0: u8 = 9;
    pub const LCONST_1: u8 = 10;
    pub const FCONST_0: u8 = 11;
    pub const FCONST_1: u8 = 12;
    pub const FCONST_2: u8 = 13;
    pub const DCONST_0: u8 = 14;
    pub const DCONST_1: u8 = 15;
    pub const BIPUSH: u8 = 16;
    pub const SIPUSH: u8 = 17;
    pub const LDC: u8 = 18;
    pub const ILOAD: u8 = 21;
    pub const LLOAD: u8 = 22;
    pub const FLOAD: u8 = 23;
    pub const DLOAD: u8 = 24;
    pub const ALOAD: u8 = 25;
    pub const IALOAD: u8 = 46;
    pub const SALOAD: u8 = 53;
    pub const ISTORE: u8 = 54;
    pub const LSTORE: u8 = 55;
    pub const FSTORE: u8 = 56;
    pub const DSTORE: u8 = 57;
    pub const ASTORE: u8 = 58;
    pub const IASTORE: u8 = 79;
    pub const SASTORE: u8 = 86;
    pub const POP: u8 = 87;
    pub const POP2: u8 = 88;
    pub const DUP: u8 = 89;
    pub const DUP_X1: u8 = 90;
    pub const DUP_X2: u8 = 91;
    pub const DUP2: u8 = 92;
    pub const DUP2_X1: u8 = 93;
    pub const DUP2_X2: u8 = 94;
    pub const SWAP: u8 = 95;
    pub const IADD: u8 = 96;
    pub const LCMP: u8 = 148;
    pub const DCMPG: u8 = 152;
    pub const IFEQ: u8 = 153;
    pub const IFLE: u8 = 158;
    pub const IF_ICMPEQ: u8 = 159;
    pub const IF_ACMPNE: u8 = 166;
    pub const GOTO: u8 = 167;
    pub const JSR: u8 = 168;
    pub const RET: u8 = 169;
    pub const TABLESWITCH: u8 = 170;
    pub const LOOKUPSWITCH: u8 = 171;
    pub const IRETURN: u8 = 172;
    pub const LRETURN: u8 = 173;
    pub const FRETURN: u8 = 174;
    pub const DRETURN: u8 = 175;
    pub const ARETURN: u8 = 176;
    pub const RETURN: u8 = 177;
    pub const GETSTATIC: u8 = 178;
    pub const PUTSTATIC: u8 = 179;
    pub const GETFIELD: u8 = 180;
    pub const PUTFIELD: u8 = 181;
    pub const INVOKEVIRTUAL: u8 = 182;
    pub const INVOKESPECIAL: u8 = 183;
    pub const INVOKESTATIC: u8 = 184;
    pub const INVOKEINTERFACE: u8 = 185;
    pub const INVOKEDYNAMIC: u8 = 186;
    pub const NEW: u8 = 187;
    pub const NEWARRAY: u8 = 188;
    pub const ANEWARRAY: u8 = 189;
    pub const ARRAYLENGTH: u8 = 190;
    pub const ATHROW: u8 = 191;
    pub const CHECKCAST: u8 = 192;
    pub const INSTANCEOF: u8 = 193;
    pub const MONITORENTER: u8 = 194;
    pub const MONITOREXIT: u8 = 195;
    pub const WIDE: u8 = 196;
    pub const MULTIANEWARRAY: u8 = 197;
    pub const IFNULL: u8 = 198;
    pub const IFNONNULL: u8 = 199;
    pub const GOTO_W: u8 = 200;
    pub const JSR_W: u8 = 201;
}

/// Mnemonic per opcode, indexed by opcode value
pub const MNEMONICS: [&str; 202] = [
    "nop", "aconst_null", "iconst_m1", "iconst_0", "iconst_1", "iconst_2", "iconst_3", "iconst_4",
    "iconst_5", "lconst_0", "lconst_1", "fconst_0", "fconst_1", "fconst_2", "dconst_0", "dconst_1",
    "bipush", "sipush", "ldc", "ldc_w", "ldc2_w", "iload", "lload", "fload", "dload", "aload",
    "iload_0", "iload_1", "iload_2", "iload_3", "lload_0", "lload_1", "lload_2", "lload_3",
    "fload_0", "fload_1", "fload_2", "fload_3", "dload_0", "dload_1", "dload_2", "dload_3",
    "aload_0", "aload_1", "aload_2", "aload_3", "iaload", "laload", "faload", "daload", "aaload",
    "baload", "caload", "saload", "istore", "lstore", "fstore", "dstore", "astore", "istore_0",
    "istore_1", "istore_2", "istore_3", "lstore_0", "lstore_1", "lstore_2", "lstore_3", "fstore_0",
    "fstore_1", "fstore_2", "fstore_3", "dstore_0", "dstore_1", "dstore_2", "dstore_3", "astore_0",
    "astore_1", "astore_2", "astore_3", "iastore", "lastore", "fastore", "dastore", "aastore",
    "bastore", "castore", "sastore", "pop", "pop2", "dup", "dup_x1", "dup_x2", "dup2", "dup2_x1",
    "dup2_x2", "swap", "iadd", "ladd", "fadd", "dadd", "isub", "lsub", "fsub", "dsub", "imul",
    "lmul", "fmul", "dmul", "idiv", "ldiv", "fdiv", "ddiv", "irem", "lrem", "frem", "drem", "ineg",
    "lneg", "fneg", "dneg", "ishl", "lshl", "ishr", "lshr", "iushr", "lushr", "iand", "land",
    "ior", "lor", "ixor", "lxor", "iinc", "i2l", "i2f", "i2d", "l2i", "l2f", "l2d", "f2i", "f2l",
    "f2d", "d2i", "d2l", "d2f", "i2b", "i2c", "i2s", "lcmp", "fcmpl", "fcmpg", "dcmpl", "dcmpg",
    "ifeq", "ifne", "iflt", "ifge", "ifgt", "ifle", "if_icmpeq", "if_icmpne", "if_icmplt",
    "if_icmpge", "if_icmpgt", "if_icmple", "if_acmpeq", "if_acmpne", "goto", "jsr", "ret",
    "tableswitch", "lookupswitch", "ireturn", "lreturn", "freturn", "dreturn", "areturn", "return",
    "getstatic", "putstatic", "getfield", "putfield", "invokevirtual", "invokespecial",
    "invokestatic", "invokeinterface", "invokedynamic", "new", "newarray", "anewarray",
    "arraylength", "athrow", "checkcast", "instanceof", "monitorenter", "monitorexit", "wide",
    "multianewarray", "ifnull", "ifnonnull", "goto_w", "jsr_w",
];

/// Loadable constant operand of an `ldc`-family instruction
#[derive(Clone, Debug, PartialEq)]
pub enum LdcConstant {
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    Class(String),
    MethodType(String),
}

/// One typed instruction node
///
/// This is the tree-style representation: operands are symbolic (resolved
/// class/member names, labels) rather than constant pool indices, and the
/// `wide`/short-form encoding variants are normalized away. `Label` and
/// `LineNumber` are pseudo-instructions with no runtime effect.
#[derive(Clone, Debug, PartialEq)]
pub enum Insn {
    Label(Label),
    LineNumber {
        line: u16,
        start: Label,
    },

    /// Any instruction that is fully described by its opcode
    Simple(u8),

    /// `bipush`, `sipush`, `newarray`
    IntOperand {
        opcode: u8,
        operand: i32,
    },
    Ldc(LdcConstant),

    /// Local variable loads, stores, and `ret`
    Var {
        opcode: u8,
        index: u16,
    },
    IInc {
        index: u16,
        delta: i16,
    },

    /// `new`, `anewarray`, `checkcast`, `instanceof`
    Type {
        opcode: u8,
        class: String,
    },
    Field {
        opcode: u8,
        owner: String,
        name: String,
        descriptor: String,
    },
    Method {
        opcode: u8,
        owner: String,
        name: String,
        descriptor: String,
        interface: bool,
    },
    InvokeDynamic {
        name: String,
        descriptor: String,
    },
    Jump {
        opcode: u8,
        target: Label,
    },
    TableSwitch {
        default: Label,
        low: i32,
        targets: Vec<Label>,
    },
    LookupSwitch {
        default: Label,
        pairs: Vec<(i32, Label)>,
    },
    MultiANewArray {
        descriptor: String,
        dims: u8,
    },
}

impl Insn {
    /// Opcode of a real instruction; `None` for pseudo-instructions
    pub fn opcode(&self) -> Option<u8> {
        use opcodes::*;
        match self {
            Insn::Label(_) | Insn::LineNumber { .. } => None,
            Insn::Simple(opcode)
            | Insn::IntOperand { opcode, .. }
            | Insn::Var { opcode, .. }
            | Insn::Type { opcode, .. }
            | Insn::Field { opcode, .. }
            | Insn::Method { opcode, .. }
            | Insn::Jump { opcode, .. } => Some(*opcode),
            Insn::Ldc(LdcConstant::Long(_)) | Insn::Ldc(LdcConstant::Double(_)) => Some(20),
            Insn::Ldc(_) => Some(LDC),
            Insn::IInc { .. } => Some(132),
            Insn::InvokeDynamic { .. } => Some(INVOKEDYNAMIC),
            Insn::TableSwitch { .. } => Some(TABLESWITCH),
            Insn::LookupSwitch { .. } => Some(LOOKUPSWITCH),
            Insn::MultiANewArray { .. } => Some(MULTIANEWARRAY),
        }
    }

    /// The instruction pushing `value`, in its smallest encoding
    pub fn int_const(value: i32) -> Insn {
        use opcodes::*;
        match value {
            -1..=5 => Insn::Simple((value + ICONST_0 as i32) as u8),
            -128..=127 => Insn::IntOperand {
                opcode: BIPUSH,
                operand: value,
            },
            -32768..=32767 => Insn::IntOperand {
                opcode: SIPUSH,
                operand: value,
            },
            _ => Insn::Ldc(LdcConstant::Int(value)),
        }
    }

    /// Plain integer value of a constant-loading instruction, whichever form
    /// was used to encode it
    pub fn int_constant(&self) -> Option<i32> {
        use opcodes::*;
        match self {
            Insn::Simple(opcode) if (ICONST_M1..=ICONST_5).contains(opcode) => {
                Some(*opcode as i32 - ICONST_0 as i32)
            }
            Insn::IntOperand {
                opcode: BIPUSH | SIPUSH,
                operand,
            } => Some(*operand),
            Insn::Ldc(LdcConstant::Int(value)) => Some(*value),
            _ => None,
        }
    }
}

/// Whether `opcode` is in the contiguous return-instruction range
pub fn is_return_opcode(opcode: u8) -> bool {
    (opcodes::IRETURN..=opcodes::RETURN).contains(&opcode)
}

/// Value type returned by a return-family instruction
///
/// Anything outside of the primitive returns is treated as an object return.
pub fn return_type(opcode: u8) -> Option<FieldType> {
    use opcodes::*;
    match opcode {
        RETURN => None,
        IRETURN => Some(FieldType::Base(BaseType::Int)),
        LRETURN => Some(FieldType::Base(BaseType::Long)),
        FRETURN => Some(FieldType::Base(BaseType::Float)),
        DRETURN => Some(FieldType::Base(BaseType::Double)),
        _ => Some(FieldType::object("java/lang/Object")),
    }
}

/// Whether `opcode` is a local-variable store
pub fn is_store_instruction(opcode: u8) -> bool {
    (opcodes::ISTORE..=opcodes::ASTORE).contains(&opcode)
}

/// Slot footprint of the operand of a load/store instruction
pub fn load_store_arg_size(opcode: u8) -> usize {
    use opcodes::*;
    if opcode == DSTORE || opcode == LSTORE || opcode == DLOAD || opcode == LLOAD {
        2
    } else {
        1
    }
}
