//! Type Resolver: raw tokens to typed values.
//!
//! [`resolve`] is pure. The same descriptor and tokens always give the same
//! outcome, and a failure is a [`CoercionError`] carrying the tokens and the
//! target type.
//!
//! # Examples
//!
//! ```
//! use argschema_core::{TypeDescriptor, Value, resolve};
//!
//! let ty = TypeDescriptor::union([TypeDescriptor::Int, TypeDescriptor::Str]);
//! assert_eq!(resolve(&ty, &["42".to_string()]).unwrap(), Value::Int(42));
//! assert_eq!(resolve(&ty, &["hi".to_string()]).unwrap(), Value::Str("hi".into()));
//! ```

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use crate::annotation::{Literal, ScalarKind, TypeDescriptor};
use crate::error::{CoercionError, CoercionReason};
use crate::value::{Pattern, Value};

const TRUE_LITERALS: [&str; 5] = ["true", "t", "yes", "y", "1"];
const FALSE_LITERALS: [&str; 5] = ["false", "f", "no", "n", "0"];

/// Resolves `tokens` against `ty`.
///
/// Scalars take exactly one token; a boolean with no tokens is `true`
/// (flag presence). Lists and sets resolve every token, maps split each token
/// on the first `=`, tuples need one token per element. Unions try members
/// left to right and the first success wins. Optional types resolve zero
/// tokens to [`Value::None`].
///
/// # Errors
///
/// Returns a [`CoercionError`] without a field name; the materializer attaches
/// it.
pub fn resolve(ty: &TypeDescriptor, tokens: &[String]) -> Result<Value, CoercionError> {
    match ty {
        TypeDescriptor::Absent => {
            if tokens.is_empty() {
                Ok(Value::None)
            } else {
                Err(count_error(ty, tokens, "0"))
            }
        }
        TypeDescriptor::Optional(inner) => {
            if tokens.is_empty() {
                Ok(Value::None)
            } else {
                resolve(inner, tokens)
            }
        }
        TypeDescriptor::Union(members) => resolve_union(ty, members, tokens),
        TypeDescriptor::Bool if tokens.is_empty() => Ok(Value::Bool(true)),
        TypeDescriptor::List(inner) => resolve_each(inner, tokens).map(Value::List),
        TypeDescriptor::Set(inner) => {
            let mut items: Vec<Value> = Vec::with_capacity(tokens.len());
            for item in resolve_each(inner, tokens)? {
                if !items.contains(&item) {
                    items.push(item);
                }
            }
            Ok(Value::Set(items))
        }
        TypeDescriptor::Map(key_ty, value_ty) => {
            let mut entries: Vec<(Value, Value)> = Vec::with_capacity(tokens.len());
            for token in tokens {
                let (key, value) = token.split_once('=').ok_or_else(|| {
                    CoercionError::new(
                        std::slice::from_ref(token),
                        ty,
                        CoercionReason::MissingDelimiter,
                    )
                })?;
                let key = resolve_one(key_ty, key)?;
                let value = resolve_one(value_ty, value)?;
                match entries.iter_mut().find(|(k, _)| *k == key) {
                    Some(entry) => entry.1 = value,
                    None => entries.push((key, value)),
                }
            }
            Ok(Value::Map(entries))
        }
        TypeDescriptor::Tuple(items) => {
            if tokens.len() != items.len() {
                return Err(count_error(ty, tokens, &items.len().to_string()));
            }
            items
                .iter()
                .zip(tokens)
                .map(|(item, token)| resolve_element(item, token))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Tuple)
        }
        TypeDescriptor::Command(_) => {
            Err(CoercionError::new(tokens, ty, CoercionReason::NotResolvable))
        }
        scalar => match tokens {
            [token] => resolve_scalar(scalar, token)
                .map_err(|reason| CoercionError::new(tokens, scalar, reason)),
            _ => Err(count_error(scalar, tokens, "1")),
        },
    }
}

fn resolve_union(
    ty: &TypeDescriptor,
    members: &[TypeDescriptor],
    tokens: &[String],
) -> Result<Value, CoercionError> {
    if tokens.is_empty() && members.contains(&TypeDescriptor::Absent) {
        return Ok(Value::None);
    }

    let mut attempts = Vec::with_capacity(members.len());
    for member in members.iter().filter(|m| **m != TypeDescriptor::Absent) {
        match resolve(member, tokens) {
            Ok(value) => return Ok(value),
            Err(err) => attempts.push(err),
        }
    }
    Err(CoercionError::new(
        tokens,
        ty,
        CoercionReason::NoUnionMember(attempts),
    ))
}

fn resolve_each(inner: &TypeDescriptor, tokens: &[String]) -> Result<Vec<Value>, CoercionError> {
    tokens
        .iter()
        .map(|token| resolve_element(inner, token))
        .collect()
}

/// Resolves one element token. Elements that are containers themselves take
/// comma-separated items from the single token.
fn resolve_element(ty: &TypeDescriptor, token: &str) -> Result<Value, CoercionError> {
    match ty.strip_optional() {
        TypeDescriptor::List(_) | TypeDescriptor::Set(_) | TypeDescriptor::Tuple(_) => {
            let parts: Vec<String> = if token.is_empty() {
                Vec::new()
            } else {
                token.split(',').map(str::to_string).collect()
            };
            resolve(ty, &parts)
        }
        _ => resolve_one(ty, token),
    }
}

fn resolve_one(ty: &TypeDescriptor, token: &str) -> Result<Value, CoercionError> {
    resolve(ty, &[token.to_string()])
}

fn count_error(ty: &TypeDescriptor, tokens: &[String], expected: &str) -> CoercionError {
    CoercionError::new(
        tokens,
        ty,
        CoercionReason::WrongTokenCount {
            expected: expected.to_string(),
            found: tokens.len(),
        },
    )
}

fn resolve_scalar(ty: &TypeDescriptor, token: &str) -> Result<Value, CoercionReason> {
    let invalid = |err: &dyn std::fmt::Display| CoercionReason::Invalid(err.to_string());
    match ty {
        TypeDescriptor::Int => token.trim().parse().map(Value::Int).map_err(|e| invalid(&e)),
        TypeDescriptor::Float => token
            .trim()
            .parse()
            .map(Value::Float)
            .map_err(|e| invalid(&e)),
        TypeDescriptor::Str => Ok(Value::Str(token.to_string())),
        TypeDescriptor::Bool => parse_bool(token).map(Value::Bool),
        TypeDescriptor::Enum(descriptor) => {
            if descriptor.members.iter().any(|m| m == token) {
                Ok(Value::Enum(token.to_string()))
            } else {
                Err(CoercionReason::NotAMember {
                    members: descriptor.members.clone(),
                })
            }
        }
        TypeDescriptor::Literal(members) => members
            .iter()
            .find(|member| literal_matches(member, token))
            .map(literal_value)
            .ok_or_else(|| CoercionReason::NotAMember {
                members: members.iter().map(ToString::to_string).collect(),
            }),
        TypeDescriptor::Scalar(kind) => parse_custom(*kind, token),
        other => Err(CoercionReason::Invalid(format!(
            "`{other}` is not a scalar type"
        ))),
    }
}

fn literal_matches(member: &Literal, token: &str) -> bool {
    match member {
        Literal::Str(s) => s == token,
        Literal::Int(i) => token.trim().parse::<i64>().is_ok_and(|parsed| parsed == *i),
        Literal::Float(f) => token.trim().parse::<f64>().is_ok_and(|parsed| parsed == *f),
        Literal::Bool(b) => parse_bool(token).is_ok_and(|parsed| parsed == *b),
    }
}

fn literal_value(member: &Literal) -> Value {
    match member {
        Literal::Int(i) => Value::Int(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Str(s) => Value::Str(s.clone()),
    }
}

fn parse_bool(token: &str) -> Result<bool, CoercionReason> {
    let lowered = token.trim().to_ascii_lowercase();
    if TRUE_LITERALS.contains(&lowered.as_str()) {
        Ok(true)
    } else if FALSE_LITERALS.contains(&lowered.as_str()) {
        Ok(false)
    } else {
        Err(CoercionReason::Invalid(format!(
            "expected one of {} or {}",
            TRUE_LITERALS.join("/"),
            FALSE_LITERALS.join("/")
        )))
    }
}

fn parse_custom(kind: ScalarKind, token: &str) -> Result<Value, CoercionReason> {
    let invalid = |err: &dyn std::fmt::Display| CoercionReason::Invalid(err.to_string());
    match kind {
        ScalarKind::Date => NaiveDate::parse_from_str(token, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|e| invalid(&e)),
        ScalarKind::Time => NaiveTime::parse_from_str(token, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(token, "%H:%M"))
            .map(Value::Time)
            .map_err(|e| invalid(&e)),
        ScalarKind::DateTime => {
            let normalized = token.replacen('T', " ", 1);
            NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M"))
                .map(Value::DateTime)
                .map_err(|e| invalid(&e))
        }
        ScalarKind::Uuid => Uuid::parse_str(token)
            .map(Value::Uuid)
            .map_err(|e| invalid(&e)),
        ScalarKind::Path => Ok(Value::Path(PathBuf::from(token))),
        ScalarKind::Ipv4 => token
            .parse::<Ipv4Addr>()
            .map(|ip| Value::Ip(IpAddr::V4(ip)))
            .map_err(|e| invalid(&e)),
        ScalarKind::Ipv6 => token
            .parse::<Ipv6Addr>()
            .map(|ip| Value::Ip(IpAddr::V6(ip)))
            .map_err(|e| invalid(&e)),
        ScalarKind::Ip => token
            .parse::<IpAddr>()
            .map(Value::Ip)
            .map_err(|e| invalid(&e)),
        ScalarKind::Pattern => Pattern::new(token)
            .map(Value::Pattern)
            .map_err(|e| invalid(&e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn ty(expression: &str) -> TypeDescriptor {
        expression.parse().unwrap()
    }

    #[test]
    fn test_primitives() {
        assert_eq!(resolve(&ty("int"), &toks(&["-7"])).unwrap(), Value::Int(-7));
        assert_eq!(resolve(&ty("float"), &toks(&["2.5"])).unwrap(), Value::Float(2.5));
        assert_eq!(
            resolve(&ty("str"), &toks(&[" spaced "])).unwrap(),
            Value::Str(" spaced ".into())
        );
        let err = resolve(&ty("int"), &toks(&["4.2"])).unwrap_err();
        assert_eq!(err.target, "int");
        assert_eq!(err.tokens, vec!["4.2"]);
        assert!(matches!(err.reason, CoercionReason::Invalid(_)));
    }

    #[test]
    fn test_scalar_requires_one_token() {
        let err = resolve(&ty("int"), &toks(&["1", "2"])).unwrap_err();
        assert_eq!(
            err.reason,
            CoercionReason::WrongTokenCount {
                expected: "1".into(),
                found: 2
            }
        );
        assert!(resolve(&ty("int"), &[]).is_err());
    }

    #[test]
    fn test_bool_literals_and_presence() {
        assert_eq!(resolve(&ty("bool"), &[]).unwrap(), Value::Bool(true));
        for literal in ["TRUE", "yes", "Y", "1", "t"] {
            assert_eq!(resolve(&ty("bool"), &toks(&[literal])).unwrap(), Value::Bool(true));
        }
        for literal in ["false", "No", "0", "f", "n"] {
            assert_eq!(resolve(&ty("bool"), &toks(&[literal])).unwrap(), Value::Bool(false));
        }
        assert!(resolve(&ty("bool"), &toks(&["maybe"])).is_err());
    }

    #[test]
    fn test_list_preserves_order_and_accepts_empty() {
        assert_eq!(
            resolve(&ty("list[int]"), &toks(&["1", "2", "3"])).unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(resolve(&ty("list[int]"), &[]).unwrap(), Value::List(vec![]));
    }

    #[test]
    fn test_set_keeps_first_occurrence() {
        assert_eq!(
            resolve(&ty("set[str]"), &toks(&["b", "a", "b"])).unwrap(),
            Value::Set(vec![Value::Str("b".into()), Value::Str("a".into())])
        );
    }

    #[test]
    fn test_map_splits_on_first_delimiter() {
        let value = resolve(&ty("map[str, str]"), &toks(&["k=a=b", "x=1", "k=c"])).unwrap();
        assert_eq!(
            value,
            Value::Map(vec![
                (Value::Str("k".into()), Value::Str("c".into())),
                (Value::Str("x".into()), Value::Str("1".into())),
            ])
        );

        let err = resolve(&ty("map[str, int]"), &toks(&["novalue"])).unwrap_err();
        assert_eq!(err.reason, CoercionReason::MissingDelimiter);

        let err = resolve(&ty("map[str, int]"), &toks(&["a=x"])).unwrap_err();
        assert_eq!(err.target, "int");
    }

    #[test]
    fn test_tuple_resolves_positionally() {
        let value = resolve(&ty("tuple[str, int, bool]"), &toks(&["x", "3", "no"])).unwrap();
        assert_eq!(
            value,
            Value::Tuple(vec![Value::Str("x".into()), Value::Int(3), Value::Bool(false)])
        );

        let err = resolve(&ty("tuple[str, int]"), &toks(&["x"])).unwrap_err();
        assert!(matches!(err.reason, CoercionReason::WrongTokenCount { found: 1, .. }));
    }

    #[test]
    fn test_nested_elements_split_on_comma() {
        let value = resolve(&ty("list[tuple[int, int]]"), &toks(&["1,2", "3,4"])).unwrap();
        assert_eq!(
            value,
            Value::List(vec![
                Value::Tuple(vec![Value::Int(1), Value::Int(2)]),
                Value::Tuple(vec![Value::Int(3), Value::Int(4)]),
            ])
        );
    }

    #[test]
    fn test_union_first_match_wins() {
        let int_or_str = ty("union[int, str]");
        assert_eq!(resolve(&int_or_str, &toks(&["42"])).unwrap(), Value::Int(42));
        assert_eq!(resolve(&int_or_str, &toks(&["hi"])).unwrap(), Value::Str("hi".into()));

        let str_or_int = ty("union[str, int]");
        assert_eq!(resolve(&str_or_int, &toks(&["42"])).unwrap(), Value::Str("42".into()));
    }

    #[test]
    fn test_union_failure_reports_every_member() {
        let err = resolve(&ty("union[int, float, none]"), &toks(&["abc"])).unwrap_err();
        match err.reason {
            CoercionReason::NoUnionMember(attempts) => {
                let targets: Vec<_> = attempts.iter().map(|a| a.target.as_str()).collect();
                assert_eq!(targets, vec!["int", "float"]);
            }
            other => panic!("unexpected reason: {other:?}"),
        }
    }

    #[test]
    fn test_optional_short_circuits_on_no_tokens() {
        assert_eq!(resolve(&ty("optional[int]"), &[]).unwrap(), Value::None);
        assert_eq!(resolve(&ty("union[int, none]"), &[]).unwrap(), Value::None);
        assert_eq!(resolve(&ty("optional[int]"), &toks(&["5"])).unwrap(), Value::Int(5));
    }

    #[test]
    fn test_enum_is_case_sensitive() {
        let color = ty("enum[Color: RED, GREEN]");
        assert_eq!(resolve(&color, &toks(&["RED"])).unwrap(), Value::Enum("RED".into()));
        let err = resolve(&color, &toks(&["red"])).unwrap_err();
        assert_eq!(
            err.reason,
            CoercionReason::NotAMember {
                members: vec!["RED".into(), "GREEN".into()]
            }
        );
        assert_eq!(err.target, "enum[Color: RED, GREEN]");
    }

    #[test]
    fn test_literal_matches_by_value() {
        let level = ty("literal[1, 2.5, true, fast]");
        assert_eq!(resolve(&level, &toks(&["01"])).unwrap(), Value::Int(1));
        assert_eq!(resolve(&level, &toks(&["2.50"])).unwrap(), Value::Float(2.5));
        assert_eq!(resolve(&level, &toks(&["yes"])).unwrap(), Value::Bool(true));
        assert_eq!(resolve(&level, &toks(&["fast"])).unwrap(), Value::Str("fast".into()));

        let err = resolve(&level, &toks(&["FAST"])).unwrap_err();
        assert_eq!(
            err.reason,
            CoercionReason::NotAMember {
                members: vec!["1".into(), "2.5".into(), "true".into(), "\"fast\"".into()]
            }
        );
        assert!(resolve(&level, &toks(&["false"])).is_err());
    }

    #[test]
    fn test_literal_first_member_wins() {
        // "1" is both the int member and a true literal
        let ty = ty("literal[true, 1]");
        assert_eq!(resolve(&ty, &toks(&["1"])).unwrap(), Value::Bool(true));
        let ty = TypeDescriptor::literal([1_i64]);
        assert_eq!(resolve(&ty, &toks(&["1"])).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_custom_scalars() {
        assert_eq!(
            resolve(&ty("date"), &toks(&["2024-02-29"])).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert!(resolve(&ty("date"), &toks(&["2023-02-29"])).is_err());
        assert_eq!(
            resolve(&ty("time"), &toks(&["09:30"])).unwrap(),
            Value::Time(NaiveTime::from_hms_opt(9, 30, 0).unwrap())
        );
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(
            resolve(&ty("datetime"), &toks(&["2024-01-02T03:04:05"])).unwrap(),
            Value::DateTime(expected)
        );
        assert_eq!(
            resolve(&ty("datetime"), &toks(&["2024-01-02 03:04:05"])).unwrap(),
            Value::DateTime(expected)
        );
        assert!(matches!(
            resolve(&ty("uuid"), &toks(&["67e55044-10b1-426f-9247-bb680e5fe0c8"])).unwrap(),
            Value::Uuid(_)
        ));
        assert_eq!(
            resolve(&ty("path"), &toks(&["./out.txt"])).unwrap(),
            Value::Path(PathBuf::from("./out.txt"))
        );
        assert!(resolve(&ty("ipv4"), &toks(&["::1"])).is_err());
        assert!(matches!(
            resolve(&ty("ip"), &toks(&["::1"])).unwrap(),
            Value::Ip(IpAddr::V6(_))
        ));
        assert!(resolve(&ty("pattern"), &toks(&["(unclosed"])).is_err());
    }

    #[test]
    fn test_deterministic() {
        let ty = ty("union[date, int, list[str]]");
        let tokens = toks(&["x"]);
        assert_eq!(resolve(&ty, &tokens), resolve(&ty, &tokens));
    }
}
