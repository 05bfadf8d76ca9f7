//! Parse the class file container format
//!
//! Only the parts of a class file that the inliner consumes are modelled:
//! the constant pool, method headers, `Code` attributes (with their debug
//! tables), and the class-level source attributes. Everything else is
//! length-skipped.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html

mod constants;
mod reader;

pub use constants::*;
pub use reader::*;
