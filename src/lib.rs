//! Bytecode-level function inlining support for JVM class files
//!
//! This crate implements the low-level half of an inliner for a JVM language
//! compiler: it loads a compiled method body out of a class file into a
//! mutable instruction list, recognizes and strips the synthetic marker
//! instructions that an upstream code generator leaves behind to delimit
//! inlined regions, splices one instruction sequence into another, computes
//! the local-variable slot shift needed to relocate a callee's locals into a
//! caller's frame, and derives collision-free internal names for declarations
//! synthesized during inline/lambda lowering.
//!
//! The surrounding compiler (type resolution, code emission, frame
//! recomputation) is an external collaborator: this crate consumes raw class
//! bytes plus a method name and descriptor, and produces a transformed
//! [`MethodBody`](jvm::code::MethodBody) together with a
//! [`SourceMap`](inline::SourceMap) for debugger fidelity.

pub mod inline;
pub mod jvm;
mod util;

pub use util::Width;
