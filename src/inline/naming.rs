//! Names for declarations synthesized during inline/lambda lowering
//!
//! Two concerns live here. `derive_inline_name` walks a chain of declaration
//! contexts to a deterministic, collision-free internal name for a class
//! synthesized while lowering. The identity predicates go the other way:
//! given a name the lowering passes left behind, they recognize what kind of
//! artifact it is. Both are pure string work against the reserved-name
//! constants in [`crate::jvm::names`].

use crate::jvm::names::{
    CAPTURED_FIELD_PREFIX, INIT_METHOD_NAME, INLINE_NAME_SEPARATOR, INSTANCE_FIELD,
    INVOKE_METHOD_NAME, MAPPINGS_CLASS_SUFFIX, MAPPING_ARRAY_FIELD_PREFIX,
    NON_CAPTURED_FIELD_PREFIX, NUMBERED_FUNCTION_PREFIX, RECEIVER_0, THIS_0,
};
use crate::jvm::Error;

/// One link in a lexical declaration chain, innermost first
///
/// The chain mirrors source nesting: a lambda sits in a function, which sits
/// in a class or directly in a package. Name resolution dispatches on the
/// variant, so every case is handled explicitly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeclarationContext {
    /// Top-level package scope; `file_class` is the internal name of the
    /// synthetic file-level class when the containing file is known, and
    /// `implementation_owner` the owner type computed for the context
    Package {
        name: String,
        file_class: Option<String>,
        implementation_owner: Option<String>,
    },

    /// A class-like entity with its already-mapped internal name
    Class {
        mapped_name: String,
        parent: Box<DeclarationContext>,
    },

    /// A function, optionally with a known owning class
    Function {
        name: String,
        owner_class: Option<String>,
        parent: Box<DeclarationContext>,
    },

    /// Any other declaration (lambda, property accessor, anonymous
    /// initializer); `name` is `None` when compiler-synthesized
    Other {
        name: Option<String>,
        parent: Box<DeclarationContext>,
    },
}

/// Globally-unique internal name for the declaration `context` denotes
///
/// Most-specific case wins: package scopes resolve to the file class (or the
/// implementation owner), classes to their mapped name, functions to their
/// owning class when one is known. Everything else resolves its parent and
/// appends one separator plus its own simple name, giving lambda-lowered
/// classes names like `com/example/FileKt$outer$1`.
pub fn derive_inline_name(context: &DeclarationContext) -> Result<String, Error> {
    match context {
        DeclarationContext::Package {
            name,
            file_class,
            implementation_owner,
        } => match file_class.as_ref().or(implementation_owner.as_ref()) {
            Some(owner) => Ok(owner.clone()),
            None => Err(Error::InconsistentState(format!(
                "Couldn't find declaration owner for package {}",
                name
            ))),
        },
        DeclarationContext::Class { mapped_name, .. } => Ok(mapped_name.clone()),
        DeclarationContext::Function {
            owner_class: Some(owner),
            ..
        } => Ok(owner.clone()),
        DeclarationContext::Function { name, parent, .. } => {
            append_segment(parent, Some(name.as_str()))
        }
        DeclarationContext::Other { name, parent } => {
            append_segment(parent, name.as_deref())
        }
    }
}

fn append_segment(parent: &DeclarationContext, name: Option<&str>) -> Result<String, Error> {
    let parent_name = derive_inline_name(parent)?;
    Ok(format!(
        "{}{}{}",
        parent_name,
        INLINE_NAME_SEPARATOR,
        name.unwrap_or("")
    ))
}

/// Whether `field_name` holds a variable captured by a lambda or inner class
///
/// Single-sigil names are captures, doubled-sigil names are not; the two
/// legacy outer-instance fields count as captures despite not carrying the
/// sigil.
pub fn is_captured_field_name(field_name: &str) -> bool {
    field_name.starts_with(CAPTURED_FIELD_PREFIX)
        && !field_name.starts_with(NON_CAPTURED_FIELD_PREFIX)
        || field_name == THIS_0
        || field_name == RECEIVER_0
}

pub fn is_this0(name: &str) -> bool {
    name == THIS_0
}

/// Whether `internal_name` names an anonymous class (`Foo$Bar$3` shape)
pub fn is_anonymous_class(internal_name: &str) -> bool {
    let short_name = last_name_part(internal_name);
    match short_name.rfind('$') {
        Some(index) => is_integer(&short_name[index + 1..]),
        None => false,
    }
}

/// Whether a call is a constructor invocation on an anonymous class
pub fn is_anonymous_constructor_call(internal_name: &str, method_name: &str) -> bool {
    method_name == INIT_METHOD_NAME && is_anonymous_class(internal_name)
}

/// Whether a field access loads the singleton instance of an anonymous class
pub fn is_anonymous_singleton_load(internal_name: &str, field_name: &str) -> bool {
    field_name == INSTANCE_FIELD && is_anonymous_class(internal_name)
}

/// Whether a field access reads an enum-`when` optimization mapping array
pub fn is_when_mapping_access(internal_name: &str, field_name: &str) -> bool {
    field_name.starts_with(MAPPING_ARRAY_FIELD_PREFIX)
        && internal_name.ends_with(MAPPINGS_CLASS_SUFFIX)
}

/// Whether a call is the call operator dispatched on a function value
///
/// The owner must be one of the numbered function interfaces, whose trailing
/// digits denote the arity.
pub fn is_invoke_on_lambda(owner: &str, name: &str) -> bool {
    name == INVOKE_METHOD_NAME
        && owner.starts_with(NUMBERED_FUNCTION_PREFIX)
        && is_integer(&owner[NUMBERED_FUNCTION_PREFIX.len()..])
}

fn last_name_part(internal_name: &str) -> &str {
    match internal_name.rfind('/') {
        Some(index) => &internal_name[index + 1..],
        None => internal_name,
    }
}

fn is_integer(string: &str) -> bool {
    !string.is_empty() && string.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod test {
    use super::*;

    fn package(file_class: Option<&str>, implementation_owner: Option<&str>) -> DeclarationContext {
        DeclarationContext::Package {
            name: String::from("com.example"),
            file_class: file_class.map(String::from),
            implementation_owner: implementation_owner.map(String::from),
        }
    }

    #[test]
    fn package_scope_prefers_the_file_class() {
        let context = package(Some("com/example/FileKt"), Some("com/example/Facade"));
        assert_eq!(derive_inline_name(&context).unwrap(), "com/example/FileKt");

        let context = package(None, Some("com/example/Facade"));
        assert_eq!(derive_inline_name(&context).unwrap(), "com/example/Facade");
    }

    #[test]
    fn package_scope_without_any_owner_is_fatal() {
        let result = derive_inline_name(&package(None, None));
        assert!(matches!(result, Err(Error::InconsistentState(_))));
    }

    #[test]
    fn nested_contexts_append_one_segment_per_level() {
        let base = DeclarationContext::Class {
            mapped_name: String::from("com/example/Outer"),
            parent: Box::new(package(Some("com/example/FileKt"), None)),
        };
        let function = DeclarationContext::Function {
            name: String::from("transform"),
            owner_class: None,
            parent: Box::new(base),
        };
        assert_eq!(
            derive_inline_name(&function).unwrap(),
            "com/example/Outer$transform"
        );

        let lambda = DeclarationContext::Other {
            name: None,
            parent: Box::new(function.clone()),
        };
        assert_eq!(
            derive_inline_name(&lambda).unwrap(),
            "com/example/Outer$transform$"
        );

        // identical chains resolve identically
        assert_eq!(
            derive_inline_name(&function).unwrap(),
            derive_inline_name(&function.clone()).unwrap()
        );
    }

    #[test]
    fn function_with_a_known_owner_uses_it_directly() {
        let function = DeclarationContext::Function {
            name: String::from("block"),
            owner_class: Some(String::from("com/example/FileKt$main$1")),
            parent: Box::new(package(None, None)),
        };
        assert_eq!(
            derive_inline_name(&function).unwrap(),
            "com/example/FileKt$main$1"
        );
    }

    #[test]
    fn captured_field_sigils() {
        assert!(is_captured_field_name("$x"));
        assert!(!is_captured_field_name("$$x"));
        assert!(is_captured_field_name("this$0"));
        assert!(is_captured_field_name("receiver$0"));
        assert!(!is_captured_field_name("x"));
    }

    #[test]
    fn anonymous_class_needs_a_purely_numeric_suffix() {
        assert!(is_anonymous_class("Foo$Bar$3"));
        assert!(!is_anonymous_class("Foo$Bar"));
        assert!(!is_anonymous_class("Foo$3Bar"));
        assert!(is_anonymous_class("com/example/Foo$12"));
        assert!(!is_anonymous_class("com/exa$3mple/Foo"));
        assert!(!is_anonymous_class("Foo$"));
    }

    #[test]
    fn anonymous_constructor_and_singleton_shapes() {
        assert!(is_anonymous_constructor_call("com/example/Foo$1", "<init>"));
        assert!(!is_anonymous_constructor_call("com/example/Foo$1", "invoke"));
        assert!(is_anonymous_singleton_load("com/example/Foo$1", "INSTANCE"));
        assert!(!is_anonymous_singleton_load("com/example/Foo", "INSTANCE"));
    }

    #[test]
    fn when_mapping_access_shape() {
        assert!(is_when_mapping_access(
            "com/example/FileKt$WhenMappings",
            "$EnumSwitchMapping$0"
        ));
        assert!(!is_when_mapping_access(
            "com/example/FileKt",
            "$EnumSwitchMapping$0"
        ));
        assert!(!is_when_mapping_access(
            "com/example/FileKt$WhenMappings",
            "$SomethingElse$0"
        ));
    }

    #[test]
    fn invoke_on_numbered_function_interfaces_only() {
        assert!(is_invoke_on_lambda("kotlin/jvm/functions/Function2", "invoke"));
        assert!(is_invoke_on_lambda("kotlin/jvm/functions/Function22", "invoke"));
        assert!(!is_invoke_on_lambda("kotlin/jvm/functions/Function", "invoke"));
        assert!(!is_invoke_on_lambda("kotlin/jvm/functions/FunctionN", "invoke"));
        assert!(!is_invoke_on_lambda("kotlin/jvm/functions/Function2", "apply"));
        assert!(!is_invoke_on_lambda("com/example/Function2", "invoke"));
    }
}
