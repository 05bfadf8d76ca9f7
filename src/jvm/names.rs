//! Reserved names forming the inlining wire protocol
//!
//! Synthetic constructs left behind by lambda lowering and inline expansion
//! are recognized structurally, by name convention rather than by type. Every
//! sigil, prefix, and suffix taking part in those conventions lives here so
//! that the string patterns stay consistent with the code generator on the
//! other side of the protocol. The predicates that consume these constants
//! are in [`crate::inline::naming`] and [`crate::inline::markers`].

/// Name of the implicit receiver variable
pub const THIS: &str = "this";

/// Captured outer-instance field on lambda/inner classes
pub const THIS_0: &str = "this$0";

/// Legacy captured-receiver field name
pub const RECEIVER_0: &str = "receiver$0";

/// Label marking a return from the outermost function being generated
pub const FIRST_FUN_LABEL: &str = "$$$$$ROOT$$$$$";

/// Common prefix of the numbered function-interface family; the trailing
/// digits denote the arity (`.../Function0`, `.../Function1`, ...)
pub const NUMBERED_FUNCTION_PREFIX: &str = "kotlin/jvm/functions/Function";

/// Call-operator convention name dispatched on function values
pub const INVOKE_METHOD_NAME: &str = "invoke";

/// JVM constructor name
pub const INIT_METHOD_NAME: &str = "<init>";

/// Instance field of anonymous singleton objects
pub const INSTANCE_FIELD: &str = "INSTANCE";

pub const SPECIAL_TRANSFORMATION_NAME: &str = "$special";
pub const INLINE_TRANSFORMATION_SUFFIX: &str = "$inlined";
pub const INLINE_CALL_TRANSFORMATION_SUFFIX: &str = "$$inlined";
pub const INLINE_FUN_THIS_0_SUFFIX: &str = "$inline_fun";

/// Suffix appended to local variables relocated from an inline function
pub const INLINE_FUN_VAR_SUFFIX: &str = "$iv";

/// Fake call used to mark default-lambda invocations during transformation
pub const DEFAULT_LAMBDA_FAKE_CALL: &str = "$$$DEFAULT_LAMBDA_FAKE_CALL$$$";

/// Sigil starting the name of a field holding a captured variable
pub const CAPTURED_FIELD_PREFIX: &str = "$";

/// Doubled sigil: a field that looks captured but is not
pub const NON_CAPTURED_FIELD_PREFIX: &str = "$$";

/// Prefix a capture-folding pass puts on fields it has rewritten
pub const CAPTURED_FIELD_FOLD_PREFIX: &str = "$$$";

/// Synthetic owner of non-local-return flag calls; the method name carries
/// the target label
pub const NON_LOCAL_RETURN_OWNER: &str = "$$$$$NON_LOCAL_RETURN$$$$$";

/// Synthetic owner of all inline markers
pub const INLINE_MARKER_CLASS_NAME: &str = "kotlin/jvm/internal/InlineMarker";

pub const INLINE_MARKER_BEFORE_METHOD_NAME: &str = "beforeInlineCall";
pub const INLINE_MARKER_AFTER_METHOD_NAME: &str = "afterInlineCall";
pub const INLINE_MARKER_FINALLY_START: &str = "finallyStart";
pub const INLINE_MARKER_FINALLY_END: &str = "finallyEnd";

/// Prefix of synthetic locals staging an inline function's own locals
pub const INLINE_FUN_LOCAL_PREFIX: &str = "$i$f$";

/// Prefix of synthetic locals staging an inline argument's locals
pub const INLINE_ARG_LOCAL_PREFIX: &str = "$i$a$";

/// Field prefix of enum-`when` optimization mapping arrays
pub const MAPPING_ARRAY_FIELD_PREFIX: &str = "$EnumSwitchMapping$";

/// Class suffix of the synthetic holder of enum-`when` mapping arrays
pub const MAPPINGS_CLASS_SUFFIX: &str = "$WhenMappings";

/// File class holding the compiler-synthesized array-constructor intrinsics;
/// the loader suppresses source info for it since no meaningful map exists
pub const INTRINSIC_ARRAY_CONSTRUCTORS: &str = "kotlin/jvm/internal/ArrayConstructorsKt";

/// Separator used when concatenating name segments of nested declarations
pub const INLINE_NAME_SEPARATOR: &str = "$";
