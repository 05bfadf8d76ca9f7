use super::{InsnList, Label};
use crate::jvm::MethodAccessFlags;

/// Entry of the local-variable debug table
#[derive(Clone, Debug, PartialEq)]
pub struct LocalVariable {
    pub name: String,
    pub descriptor: String,

    /// First label of the variable's live range
    pub start: Label,

    /// Label just past the variable's live range
    pub end: Label,

    /// Variable slot index
    pub index: u16,
}

/// Protected region of the method
#[derive(Clone, Debug, PartialEq)]
pub struct TryCatchBlock {
    pub start: Label,
    pub end: Label,
    pub handler: Label,

    /// `None` catches everything (`finally`)
    pub catch_type: Option<String>,
}

/// A method body loaded for inlining
///
/// Owns one [`InsnList`] plus the method metadata needed to splice it
/// elsewhere. Created by the loader, mutated in place by the splicer;
/// `max_stack`/`max_locals` become stale during surgery and are only
/// meaningful again after a recomputation pass.
#[derive(Debug)]
pub struct MethodBody {
    pub access_flags: MethodAccessFlags,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub exceptions: Vec<String>,
    pub instructions: InsnList,
    pub try_catch_blocks: Vec<TryCatchBlock>,
    pub local_variables: Vec<LocalVariable>,
    pub max_stack: u16,
    pub max_locals: u16,
}

impl MethodBody {
    /// Placeholder body used as a scratch destination for generated code
    pub fn empty() -> MethodBody {
        MethodBody {
            access_flags: MethodAccessFlags::empty(),
            name: String::from("fake"),
            descriptor: String::from("()V"),
            signature: None,
            exceptions: vec![],
            instructions: InsnList::new(),
            try_catch_blocks: vec![],
            local_variables: vec![],
            max_stack: 0,
            max_locals: 0,
        }
    }
}
