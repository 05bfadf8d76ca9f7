//! Loading a method body out of raw class bytes
//!
//! The entry point of an inlining attempt: given the callee class's binary
//! form plus the target method's name and descriptor, produce the mutable
//! [`MethodBody`] the splicer will operate on, together with the source map
//! needed to keep debug lines honest after splicing.

use super::smap::{SourceLineRange, SourceMap};
use crate::jvm::class_file::{ClassFile, ParseOptions};
use crate::jvm::code::{disassemble, Insn, MethodBody};
use crate::jvm::names::INTRINSIC_ARRAY_CONSTRUCTORS;
use crate::jvm::Error;

/// Per-compilation-session switches threaded into the loader
///
/// Explicit values rather than ambient globals, so independent sessions can
/// run with different settings.
#[derive(Copy, Clone, Debug)]
pub struct InlineSettings {
    /// Retain debug attributes and build real source maps; when off, debug
    /// info is skipped at parse time and the map covers nothing
    pub generate_source_maps: bool,

    /// Inlining is switched off for this session (bodies are still loadable
    /// for diagnostics)
    pub inline_disabled: bool,
}

impl Default for InlineSettings {
    fn default() -> InlineSettings {
        InlineSettings {
            generate_source_maps: true,
            inline_disabled: false,
        }
    }
}

/// A loaded method body paired with its source map
#[derive(Debug)]
pub struct SmapMethodBody {
    pub body: MethodBody,
    pub source_map: SourceMap,
}

/// Narrow boundary through which callee class bytes are retrieved
///
/// The surrounding driver decides where bytes come from (just-compiled
/// output, a jar on the classpath, an index). A missing class or an
/// unreadable byte source is a hard failure of the inlining attempt.
pub trait ClassBytesSource {
    fn class_bytes(&self, internal_name: &str) -> Result<Vec<u8>, Error>;
}

/// Load `method_name method_descriptor` out of `class_data`
///
/// Fails with [`Error::MethodNotFound`] when no method matches both name and
/// descriptor. While converting the bytecode, the minimum and maximum source
/// line are recorded to seed the default source map; the class-level source
/// file and debug descriptor feed the real one. Source info is suppressed
/// for the array-constructor intrinsics class, which is compiler-synthesized
/// and has no meaningful source.
pub fn load_method(
    class_data: &[u8],
    method_name: &str,
    method_descriptor: &str,
    class_internal_name: &str,
    settings: &InlineSettings,
) -> Result<SmapMethodBody, Error> {
    let options = ParseOptions {
        skip_debug: !settings.generate_source_maps,
    };
    let class_file = ClassFile::parse(class_data, options)?;

    let method = class_file
        .find_method(method_name, method_descriptor)
        .ok_or_else(|| Error::MethodNotFound {
            name: String::from(method_name),
            descriptor: String::from(method_descriptor),
        })?;

    let body = disassemble(method, &class_file.constant_pool)?;

    let mut lines = SourceLineRange::empty();
    for (_, insn) in &body.instructions {
        if let Insn::LineNumber { line, .. } = insn {
            lines.observe(*line);
        }
    }

    // no meaningful map exists for the synthesized array constructors
    let source_file = if class_internal_name == INTRINSIC_ARRAY_CONSTRUCTORS {
        None
    } else {
        class_file.source_file.as_deref()
    };

    let source_map = SourceMap::parse_or_create_default(
        class_file.source_debug_extension.as_deref(),
        source_file,
        class_internal_name,
        lines,
    )?;

    log::debug!(
        "Loaded {}.{} {} ({} instructions, lines {:?})",
        class_internal_name,
        method_name,
        method_descriptor,
        body.instructions.len(),
        lines.bounds(),
    );

    Ok(SmapMethodBody { body, source_map })
}

/// Load a method by owner name through a byte source
pub fn load_method_from(
    source: &dyn ClassBytesSource,
    class_internal_name: &str,
    method_name: &str,
    method_descriptor: &str,
    settings: &InlineSettings,
) -> Result<SmapMethodBody, Error> {
    let bytes = source.class_bytes(class_internal_name)?;
    load_method(
        &bytes,
        method_name,
        method_descriptor,
        class_internal_name,
        settings,
    )
}

/// Whether a body compiled in this session needs the default one-to-one
/// source mapping set up before codegen
///
/// True when inlining is enabled and some enclosing context is an inline
/// method, since its expansion will need lines of this body remapped.
pub fn requires_default_source_mapping(
    settings: &InlineSettings,
    enclosing_is_inline: bool,
) -> bool {
    !settings.inline_disabled && enclosing_is_inline
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_mapping_requires_an_inline_context_and_inlining_on() {
        let on = InlineSettings::default();
        let off = InlineSettings {
            inline_disabled: true,
            ..on
        };
        assert!(requires_default_source_mapping(&on, true));
        assert!(!requires_default_source_mapping(&on, false));
        assert!(!requires_default_source_mapping(&off, true));
    }
}
