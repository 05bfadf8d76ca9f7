//! The inlining transformation proper
//!
//! Built on top of [`crate::jvm`], this module holds the pieces specific to
//! inline expansion: loading a callee body out of raw class bytes
//! ([`loader`]), the synthetic marker call protocol ([`markers`]), the list
//! splice and slot-shift arithmetic ([`splice`]), naming of declarations
//! synthesized during lowering ([`naming`]), the source-map model ([`smap`]),
//! and textual rendering for diagnostics ([`textify`]).

pub mod loader;
pub mod markers;
pub mod naming;
pub mod smap;
pub mod splice;
pub mod textify;

pub use loader::{ClassBytesSource, InlineSettings, SmapMethodBody};
pub use smap::{SourceLineRange, SourceMap};
pub use splice::Parameters;
