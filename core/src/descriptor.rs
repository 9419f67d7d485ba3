//! Field Descriptor Builder.
//!
//! Turns one declared field (name, annotation, explicit metadata) into a
//! normalized [`FieldSpec`]. Explicit metadata always wins over what the
//! annotation implies:
//!
//! | annotation                | kind       | inferred arity | implied default |
//! |---------------------------|------------|----------------|-----------------|
//! | `bool` with flags         | optional   | `0`            | `false`         |
//! | `list`/`set`/`map`        | any        | `*`            | empty container |
//! | `tuple[..]` of N          | any        | `N`            | none            |
//! | `optional[T]` positional  | positional | `?`            | none value      |
//! | other scalars             | any        | `1`            | none            |

use tracing::{debug, trace};

use crate::annotation::TypeDescriptor;
use crate::error::ConfigurationError;
use crate::resolve::resolve;
use crate::types::{ArgumentMeta, Arity, FieldKind, FieldSpec};
use crate::validate::validate_flags;
use crate::value::Value;

/// Builds the [`FieldSpec`] of one declared field.
///
/// A field without flags is positional and named after the field. A field
/// with at least one flag, explicit or derived through `short`/`long`, is
/// optional. A `command[...]` annotation makes a
/// subcommand field, which may carry help text but no argument metadata.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] when the metadata is inconsistent:
/// malformed flags, flags on a field marked positional, an arity that cannot
/// hold the type, or an explicit default that does not resolve.
///
/// # Examples
///
/// ```
/// use argschema_core::*;
///
/// let input = build_field("input", &TypeDescriptor::Str, &ArgumentMeta::default()).unwrap();
/// assert_eq!(input.kind, FieldKind::Positional);
/// assert!(input.required);
///
/// let verbose = build_field(
///     "verbose",
///     &TypeDescriptor::Bool,
///     &ArgumentMeta::new().flag("-v").flag("--verbose"),
/// )
/// .unwrap();
/// assert_eq!(verbose.arity, Arity::Exact(0));
/// assert_eq!(verbose.default, Some(Value::Bool(false)));
/// ```
pub fn build_field(
    name: &str,
    annotation: &TypeDescriptor,
    meta: &ArgumentMeta,
) -> Result<FieldSpec, ConfigurationError> {
    if annotation.command_name().is_some() {
        return build_subcommand_field(name, annotation, meta);
    }

    let flags = meta.resolved_flags(name);
    if let Some(err) = validate_flags(name, &flags).into_iter().next() {
        return Err(err);
    }
    if meta.positional && !flags.is_empty() {
        return Err(ConfigurationError::PositionalWithFlags {
            field: name.to_string(),
        });
    }

    let coercion = meta
        .type_override
        .clone()
        .unwrap_or_else(|| annotation.clone());
    if coercion.command_name().is_some() {
        return Err(ConfigurationError::CommandAsValue {
            field: name.to_string(),
            annotation: coercion.to_string(),
        });
    }

    let kind = if flags.is_empty() {
        FieldKind::Positional
    } else {
        FieldKind::Optional
    };

    let arity = match meta.arity {
        Some(arity) => {
            check_arity(name, &coercion, kind, arity)?;
            arity
        }
        None => infer_arity(&coercion, kind),
    };

    let default = match &meta.default {
        Some(explicit) => Some(normalize_default(name, &coercion, explicit)?),
        None => implied_default(&coercion, arity),
    };

    let required = match kind {
        FieldKind::Positional => {
            if meta.required.is_some() {
                debug!(field = name, "Ignoring `required` on positional field");
            }
            default.is_none()
        }
        _ => meta.required.unwrap_or(false),
    };

    let choices = if meta.choices.is_empty() {
        enum_members(&coercion)
    } else {
        meta.choices.clone()
    };

    trace!(field = name, kind = ?kind, arity = %arity, coercion = %coercion, required, "Built field spec");

    Ok(FieldSpec {
        name: name.to_string(),
        kind,
        flags,
        arity,
        coercion,
        default,
        required,
        choices,
        help: meta.help.clone(),
        value_name: meta.value_name.clone(),
    })
}

fn build_subcommand_field(
    name: &str,
    annotation: &TypeDescriptor,
    meta: &ArgumentMeta,
) -> Result<FieldSpec, ConfigurationError> {
    if meta.has_flags()
        || meta.positional
        || meta.arity.is_some()
        || meta.type_override.is_some()
    {
        return Err(ConfigurationError::SubcommandWithMetadata {
            field: name.to_string(),
        });
    }

    Ok(FieldSpec {
        name: name.to_string(),
        kind: FieldKind::Subcommand,
        flags: Vec::new(),
        arity: Arity::Exact(0),
        coercion: annotation.clone(),
        default: Some(Value::None),
        required: false,
        choices: Vec::new(),
        help: meta.help.clone(),
        value_name: None,
    })
}

/// Arity implied by the annotation alone.
pub fn infer_arity(coercion: &TypeDescriptor, kind: FieldKind) -> Arity {
    match coercion.strip_optional() {
        TypeDescriptor::Bool if kind == FieldKind::Optional => Arity::Exact(0),
        TypeDescriptor::List(_) | TypeDescriptor::Set(_) | TypeDescriptor::Map(..) => {
            Arity::ZeroOrMore
        }
        TypeDescriptor::Tuple(items) => Arity::Exact(items.len()),
        _ if kind == FieldKind::Positional && coercion.is_optional() => Arity::OptionalOne,
        _ => Arity::Exact(1),
    }
}

fn check_arity(
    name: &str,
    coercion: &TypeDescriptor,
    kind: FieldKind,
    arity: Arity,
) -> Result<(), ConfigurationError> {
    let fits = match coercion.strip_optional() {
        TypeDescriptor::Tuple(items) => arity == Arity::Exact(items.len()),
        TypeDescriptor::List(_) | TypeDescriptor::Set(_) | TypeDescriptor::Map(..) => {
            arity != Arity::Exact(0)
        }
        TypeDescriptor::Bool if kind == FieldKind::Optional => matches!(
            arity,
            Arity::Exact(0) | Arity::Exact(1) | Arity::OptionalOne
        ),
        _ => matches!(arity, Arity::Exact(1) | Arity::OptionalOne),
    };

    if fits {
        Ok(())
    } else {
        Err(ConfigurationError::ArityMismatch {
            field: name.to_string(),
            arity: arity.to_string(),
            annotation: coercion.to_string(),
        })
    }
}

/// Brings an explicit default to the field's type.
///
/// Declaration files carry defaults as plain data, so a string default for a
/// non-string type (or a list of strings for a container) is resolved like
/// command-line tokens. An explicit none is kept as is.
fn normalize_default(
    name: &str,
    coercion: &TypeDescriptor,
    explicit: &Value,
) -> Result<Value, ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidDefault {
        field: name.to_string(),
        reason,
    };
    let target = coercion.strip_optional();

    match explicit {
        Value::None => Ok(Value::None),
        Value::Str(_) if *target == TypeDescriptor::Str => Ok(explicit.clone()),
        Value::Str(token) => {
            resolve(coercion, std::slice::from_ref(token)).map_err(|e| invalid(e.to_string()))
        }
        Value::Int(i) if *target == TypeDescriptor::Float => Ok(Value::Float(*i as f64)),
        Value::List(items) if target.is_container() => {
            let tokens: Option<Vec<String>> = items
                .iter()
                .map(|item| match item {
                    Value::Str(s) => Some(s.clone()),
                    _ => None,
                })
                .collect();
            match tokens {
                Some(tokens) => resolve(coercion, &tokens).map_err(|e| invalid(e.to_string())),
                None => Ok(explicit.clone()),
            }
        }
        _ => Ok(explicit.clone()),
    }
}

fn implied_default(coercion: &TypeDescriptor, arity: Arity) -> Option<Value> {
    if coercion.is_optional() {
        return Some(Value::None);
    }
    match (coercion, arity) {
        (TypeDescriptor::Bool, Arity::Exact(0)) => Some(Value::Bool(false)),
        (TypeDescriptor::List(_), Arity::ZeroOrMore) => Some(Value::List(Vec::new())),
        (TypeDescriptor::Set(_), Arity::ZeroOrMore) => Some(Value::Set(Vec::new())),
        (TypeDescriptor::Map(..), Arity::ZeroOrMore) => Some(Value::Map(Vec::new())),
        (_, Arity::OptionalOne) => Some(Value::None),
        _ => None,
    }
}

fn enum_members(coercion: &TypeDescriptor) -> Vec<String> {
    match coercion.strip_optional() {
        TypeDescriptor::Enum(descriptor) => descriptor.members.clone(),
        TypeDescriptor::List(inner) | TypeDescriptor::Set(inner) => enum_members(inner),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(expression: &str) -> TypeDescriptor {
        expression.parse().unwrap()
    }

    #[test]
    fn test_positional_without_metadata() {
        let spec = build_field("input", &ty("str"), &ArgumentMeta::default()).unwrap();
        assert_eq!(spec.kind, FieldKind::Positional);
        assert!(spec.flags.is_empty());
        assert_eq!(spec.arity, Arity::Exact(1));
        assert_eq!(spec.default, None);
        assert!(spec.required);
    }

    #[test]
    fn test_optional_positional_is_not_required() {
        let spec = build_field("target", &ty("optional[str]"), &ArgumentMeta::default()).unwrap();
        assert_eq!(spec.arity, Arity::OptionalOne);
        assert_eq!(spec.default, Some(Value::None));
        assert!(!spec.required);
    }

    #[test]
    fn test_flagged_field_is_optional_and_not_required() {
        let spec = build_field("count", &ty("int"), &ArgumentMeta::new().flag("--count")).unwrap();
        assert_eq!(spec.kind, FieldKind::Optional);
        assert_eq!(spec.arity, Arity::Exact(1));
        assert!(!spec.required);
        assert_eq!(spec.default, None);

        let spec = build_field(
            "count",
            &ty("int"),
            &ArgumentMeta::new().flag("--count").required(true),
        )
        .unwrap();
        assert!(spec.required);
    }

    #[test]
    fn test_derived_flags_make_an_option() {
        let spec = build_field("verbose", &ty("bool"), &ArgumentMeta::new().short()).unwrap();
        assert_eq!(spec.kind, FieldKind::Optional);
        assert_eq!(spec.flags, vec!["--verbose", "-v"]);
        assert_eq!(spec.arity, Arity::Exact(0));

        let err = build_field("x", &ty("int"), &ArgumentMeta::new().positional().long())
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::PositionalWithFlags { .. }));

        let err = build_field("add", &ty("command[Add]"), &ArgumentMeta::new().short())
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::SubcommandWithMetadata { .. }));
    }

    #[test]
    fn test_repeated_flag_names_the_field() {
        let err = build_field(
            "verbose",
            &ty("bool"),
            &ArgumentMeta::new().flag("-v").short_name('v').flag("-v"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::RepeatedFlag {
                field: "verbose".to_string(),
                flag: "-v".to_string(),
            }
        );
    }

    #[test]
    fn test_literal_field_is_single_token() {
        let spec = build_field("level", &ty("literal[1, 2, 3]"), &ArgumentMeta::new().long()).unwrap();
        assert_eq!(spec.arity, Arity::Exact(1));
        assert!(spec.choices.is_empty());
        let spec = build_field(
            "level",
            &ty("literal[1, 2, 3]"),
            &ArgumentMeta::new().long().default_value("2"),
        )
        .unwrap();
        assert_eq!(spec.default, Some(Value::Int(2)));
    }

    #[test]
    fn test_container_and_tuple_arity() {
        let list = build_field("n", &ty("list[int]"), &ArgumentMeta::new().flag("--n")).unwrap();
        assert_eq!(list.arity, Arity::ZeroOrMore);
        assert_eq!(list.default, Some(Value::List(vec![])));

        let tuple = build_field("p", &ty("tuple[int, int]"), &ArgumentMeta::default()).unwrap();
        assert_eq!(tuple.arity, Arity::Exact(2));
        assert!(tuple.required);
    }

    #[test]
    fn test_explicit_arity_and_type_win() {
        let spec = build_field(
            "numbers",
            &ty("list[str]"),
            &ArgumentMeta::new()
                .flag("--numbers")
                .arity(Arity::OneOrMore)
                .type_override(ty("list[float]")),
        )
        .unwrap();
        assert_eq!(spec.arity, Arity::OneOrMore);
        assert_eq!(spec.coercion, ty("list[float]"));
        assert_eq!(spec.default, None);
    }

    #[test]
    fn test_arity_mismatch() {
        let err = build_field(
            "pair",
            &ty("tuple[int, int]"),
            &ArgumentMeta::new().arity(Arity::Exact(1)),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::ArityMismatch { .. }));

        let err = build_field("n", &ty("int"), &ArgumentMeta::new().arity(Arity::OneOrMore))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::ArityMismatch { .. }));

        let err = build_field("n", &ty("list[int]"), &ArgumentMeta::new().arity(Arity::Exact(0)))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::ArityMismatch { .. }));
    }

    #[test]
    fn test_positional_with_flags_rejected() {
        let err = build_field(
            "x",
            &ty("int"),
            &ArgumentMeta::new().positional().flag("--x"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::PositionalWithFlags {
                field: "x".to_string()
            }
        );
    }

    #[test]
    fn test_explicit_default_wins_over_implied() {
        let spec = build_field(
            "verbose",
            &ty("bool"),
            &ArgumentMeta::new().flag("-v").default_value(true),
        )
        .unwrap();
        assert_eq!(spec.default, Some(Value::Bool(true)));

        let spec = build_field(
            "level",
            &ty("bool"),
            &ArgumentMeta::new().flag("--level").default_value(Value::None),
        )
        .unwrap();
        assert_eq!(spec.default, Some(Value::None));
    }

    #[test]
    fn test_string_defaults_are_resolved() {
        let spec = build_field("port", &ty("int"), &ArgumentMeta::new().flag("--port").default_value("8080"))
            .unwrap();
        assert_eq!(spec.default, Some(Value::Int(8080)));

        let spec = build_field(
            "tags",
            &ty("set[int]"),
            &ArgumentMeta::new().flag("--tags").default_value(vec!["1", "1", "2"]),
        )
        .unwrap();
        assert_eq!(spec.default, Some(Value::Set(vec![Value::Int(1), Value::Int(2)])));

        let err = build_field("port", &ty("int"), &ArgumentMeta::new().flag("--port").default_value("http"))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidDefault { .. }));
    }

    #[test]
    fn test_enum_members_become_choices() {
        let spec = build_field("color", &ty("enum[RED, GREEN]"), &ArgumentMeta::new().flag("--color"))
            .unwrap();
        assert_eq!(spec.choices, vec!["RED", "GREEN"]);

        let spec = build_field(
            "color",
            &ty("enum[RED, GREEN]"),
            &ArgumentMeta::new().flag("--color").choices(["RED"]),
        )
        .unwrap();
        assert_eq!(spec.choices, vec!["RED"]);
    }

    #[test]
    fn test_subcommand_field() {
        let spec = build_field("add", &ty("command[Add]"), &ArgumentMeta::new().help("Add numbers"))
            .unwrap();
        assert_eq!(spec.kind, FieldKind::Subcommand);
        assert_eq!(spec.default, Some(Value::None));
        assert_eq!(spec.help.as_deref(), Some("Add numbers"));

        let err = build_field("add", &ty("command[Add]"), &ArgumentMeta::new().flag("--add"))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::SubcommandWithMetadata { .. }));

        let err = build_field(
            "x",
            &ty("str"),
            &ArgumentMeta::new().type_override(ty("command[Add]")),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::CommandAsValue { .. }));
    }
}
