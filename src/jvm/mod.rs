//! Read and manipulate JVM method bodies
//!
//! The submodules here mirror the structure of a class file:
//!
//!   - [`class_file`] parses the binary container format (constant pool,
//!     fields, methods, attributes)
//!   - [`code`] is the in-memory instruction model: a mutable, doubly-linked
//!     [`code::InsnList`] of typed instruction nodes, owned by a
//!     [`code::MethodBody`]
//!   - [`names`] centralizes the reserved name sigils, prefixes, and suffixes
//!     that form the wire protocol between this crate and the rest of the
//!     compiler
//!
//! Parsing never loads `StackMapTable` frames - positions and frames are
//! recomputed downstream after surgery, so carrying stale ones around would
//! only invite inconsistencies.

mod access_flags;
mod binary_format;
pub mod class_file;
pub mod code;
mod descriptors;
mod errors;
pub mod names;

pub use access_flags::*;
pub use binary_format::*;
pub use descriptors::*;
pub use errors::*;
