//! Instance Materializer and composition of nested subcommands.
//!
//! A token parser turns argv into a [`RawParseResult`]; [`materialize`] then
//! resolves every field of a compiled schema against it and builds the
//! [`Instance`] tree. Materialization is all-or-nothing and fail-fast: fields
//! are visited in declaration order and the first failure aborts the pass.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::{MaterializationError, MissingRequiredFieldError, ParseError};
use crate::resolve::resolve;
use crate::types::{Arity, CompiledSchema, FieldKind, FieldSpec};
use crate::value::{Instance, Value};

/// Tokens the token parser captured for one argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// A flag given without tokens.
    Present,
    /// A single token.
    Token(String),
    /// Every token, in command-line order.
    Tokens(Vec<String>),
}

impl RawValue {
    /// Tokens as a slice; empty for [`RawValue::Present`].
    pub fn as_tokens(&self) -> &[String] {
        match self {
            RawValue::Present => &[],
            RawValue::Token(token) => std::slice::from_ref(token),
            RawValue::Tokens(tokens) => tokens,
        }
    }
}

/// Output of a token parser for one schema level.
///
/// Holds the raw tokens of every argument that appeared on the command line
/// and, when a subcommand was chosen, its name and nested result. Arguments
/// that did not appear are simply absent.
///
/// # Examples
///
/// ```
/// use argschema_core::{RawParseResult, RawValue};
///
/// let raw = RawParseResult::new()
///     .with_flag("verbose")
///     .with_subcommand("add", RawParseResult::new().with_tokens("numbers", ["1", "2"]));
///
/// assert_eq!(raw.get("verbose"), Some(&RawValue::Present));
/// let (name, nested) = raw.selected().unwrap();
/// assert_eq!(name, "add");
/// assert_eq!(nested.get("numbers").unwrap().as_tokens(), ["1", "2"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParseResult {
    values: HashMap<String, RawValue>,
    selected: Option<(String, Box<RawParseResult>)>,
}

impl RawParseResult {
    /// Creates an empty result: nothing appeared, no subcommand selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the raw value of an argument.
    pub fn insert(&mut self, name: impl Into<String>, value: RawValue) {
        self.values.insert(name.into(), value);
    }

    /// Records the selected subcommand and its nested result.
    pub fn select(&mut self, name: impl Into<String>, nested: RawParseResult) {
        self.selected = Some((name.into(), Box::new(nested)));
    }

    /// Builder form of [`insert`](Self::insert) for a flag given without tokens.
    pub fn with_flag(mut self, name: &str) -> Self {
        self.insert(name, RawValue::Present);
        self
    }

    /// Builder form of [`insert`](Self::insert) for a single token.
    pub fn with_token(mut self, name: &str, token: &str) -> Self {
        self.insert(name, RawValue::Token(token.to_string()));
        self
    }

    /// Builder form of [`insert`](Self::insert) for several tokens.
    pub fn with_tokens<I, S>(mut self, name: &str, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(
            name,
            RawValue::Tokens(tokens.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Builder form of [`select`](Self::select).
    pub fn with_subcommand(mut self, name: &str, nested: RawParseResult) -> Self {
        self.select(name, nested);
        self
    }

    /// Raw value of an argument, `None` when it did not appear.
    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.values.get(name)
    }

    /// The selected subcommand at this level, if any.
    pub fn selected(&self) -> Option<(&str, &RawParseResult)> {
        self.selected
            .as_ref()
            .map(|(name, nested)| (name.as_str(), nested.as_ref()))
    }
}

/// Token-level parser collaborator.
///
/// Implementations register the schema's fields with a concrete argv parser,
/// parse `args` and report what appeared. Usage errors (unknown flags,
/// missing tokens) are returned as `Self::Error` and passed through
/// unchanged by [`parse_with`].
pub trait TokenParser {
    type Error: std::error::Error + 'static;

    /// Parses `args` against `schema`; `args` excludes the program name.
    fn parse(&self, schema: &CompiledSchema, args: &[String]) -> Result<RawParseResult, Self::Error>;
}

/// Tokenizes `args` with `parser`, then materializes the raw result.
///
/// # Errors
///
/// [`ParseError::Usage`] carries the parser's error; no materialization is
/// attempted in that case.
pub fn parse_with<P: TokenParser>(
    parser: &P,
    schema: &CompiledSchema,
    args: &[String],
) -> Result<Instance, ParseError<P::Error>> {
    let raw = parser.parse(schema, args).map_err(ParseError::Usage)?;
    Ok(materialize(schema, &raw)?)
}

/// Builds the typed instance of `schema` from a raw parse result.
///
/// Non-subcommand fields resolve their raw tokens, fall back to their
/// default when absent, and fail when required and absent. The selected
/// subcommand is materialized recursively; every other subcommand field is
/// [`Value::None`].
///
/// # Errors
///
/// Returns the first failure in declaration order, annotated with the field
/// name and subcommand path.
pub fn materialize(
    schema: &CompiledSchema,
    raw: &RawParseResult,
) -> Result<Instance, MaterializationError> {
    let mut path = Vec::new();
    materialize_at(schema, raw, &mut path)
}

fn materialize_at(
    schema: &CompiledSchema,
    raw: &RawParseResult,
    path: &mut Vec<String>,
) -> Result<Instance, MaterializationError> {
    let selected = match raw.selected() {
        Some((name, nested)) => {
            let Some(entry) = schema.dispatch.member(name) else {
                return Err(MaterializationError::UnknownSubcommand {
                    path: path.clone(),
                    command: name.to_string(),
                });
            };
            debug!(schema = %schema.name, subcommand = name, "Selected subcommand");
            Some((name, entry.schema.as_ref(), nested))
        }
        None => None,
    };

    let mut fields = Vec::with_capacity(schema.fields.len());
    for spec in &schema.fields {
        let value = match spec.kind {
            FieldKind::Subcommand => match selected {
                Some((name, nested_schema, nested_raw)) if name == spec.name => {
                    path.push(spec.name.clone());
                    let nested = materialize_at(nested_schema, nested_raw, path);
                    path.pop();
                    Value::Instance(Box::new(nested?))
                }
                _ => Value::None,
            },
            FieldKind::Positional | FieldKind::Optional => {
                materialize_field(spec, raw.get(&spec.name), path)?
            }
        };
        fields.push((spec.name.clone(), value));
    }

    trace!(schema = %schema.name, fields = fields.len(), "Materialized instance");
    Ok(Instance::new(schema.name.clone(), fields))
}

fn materialize_field(
    spec: &FieldSpec,
    raw: Option<&RawValue>,
    path: &[String],
) -> Result<Value, MaterializationError> {
    let Some(raw) = raw else {
        return match &spec.default {
            Some(default) => Ok(default.clone()),
            None if spec.required => Err(MissingRequiredFieldError {
                path: path.to_vec(),
                field: spec.name.clone(),
            }
            .into()),
            None => Ok(Value::None),
        };
    };

    let tokens = raw.as_tokens();
    if tokens.is_empty() && spec.arity == Arity::OptionalOne {
        return Ok(spec.default.clone().unwrap_or(Value::None));
    }
    // a presence flag means `true` even when its type also admits none
    let target = if spec.arity == Arity::Exact(0) {
        spec.coercion.strip_optional()
    } else {
        &spec.coercion
    };

    resolve(target, tokens).map_err(|err| err.for_field(&spec.name, path).into())
}
