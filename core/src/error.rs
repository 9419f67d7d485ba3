//! Error taxonomy of the engine.
//!
//! - [`ConfigurationError`]: a declaration is inconsistent; raised at
//!   registration or compile time, before any parse.
//! - [`CoercionError`]: raw tokens could not be converted to the declared type.
//! - [`MissingRequiredFieldError`]: a required field got no tokens and has no
//!   default.
//! - [`MaterializationError`]: wraps exactly one of the above, the first
//!   failure encountered.
//!
//! Errors carry structured data; their `Display` output is a plain message
//! a caller can show as-is or reformat.

use std::fmt;

use thiserror::Error;

/// A declaration is internally inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Declaration name is empty or whitespace-only.
    #[error("declaration name cannot be empty")]
    EmptyName,
    /// Field name is empty or whitespace-only.
    #[error("field name cannot be empty in declaration {declaration}")]
    EmptyFieldName { declaration: String },
    /// A parent or subcommand refers to a declaration that is not registered.
    #[error("unknown declaration: {0}")]
    UnknownDeclaration(String),
    /// Two declarations share a name in one registry.
    #[error("duplicate declaration: {0}")]
    DuplicateDeclaration(String),
    /// A declaration lists the same field twice.
    #[error("duplicate field `{field}` in declaration {declaration}")]
    DuplicateField { declaration: String, field: String },
    /// Short flag is not a single dash followed by one character.
    #[error("invalid short flag format: {0}")]
    InvalidShortFlag(String),
    /// Long flag does not start with `--` or is too short.
    #[error("invalid long flag format: {0}")]
    InvalidLongFlag(String),
    /// One field lists the same flag twice.
    #[error("field `{field}` repeats flag `{flag}`")]
    RepeatedFlag { field: String, flag: String },
    /// Two fields of one compiled schema share a flag.
    #[error("duplicate flag `{flag}` in schema {schema}")]
    DuplicateFlag { schema: String, flag: String },
    /// A positional that may be left out precedes a required one.
    #[error(
        "schema {schema}: optional positional `{optional}` cannot precede required positional `{required}`"
    )]
    OptionalPositionalBeforeRequired {
        schema: String,
        optional: String,
        required: String,
    },
    /// A positional taking several tokens is followed by another positional.
    #[error("schema {schema}: positional `{field}` takes several tokens and must be the last positional")]
    VariadicPositionalNotLast { schema: String, field: String },
    /// A field is marked positional and also given flags.
    #[error("field `{field}` is positional but declares flags")]
    PositionalWithFlags { field: String },
    /// Explicit arity cannot hold the annotation's values.
    #[error("field `{field}`: arity {arity} does not fit type {annotation}")]
    ArityMismatch {
        field: String,
        arity: String,
        annotation: String,
    },
    /// A `command[...]` annotation appears where a value type is expected.
    #[error("field `{field}`: command type {annotation} cannot be used as a value type")]
    CommandAsValue { field: String, annotation: String },
    /// A subcommand field carries argument metadata.
    #[error("subcommand field `{field}` cannot declare flags, arity or type")]
    SubcommandWithMetadata { field: String },
    /// Explicit default does not resolve against the field's type.
    #[error("field `{field}`: invalid default: {reason}")]
    InvalidDefault { field: String, reason: String },
    /// A declaration inherits from itself.
    #[error("inheritance cycle detected at path: {0}")]
    InheritanceCycle(String),
    /// Parents cannot be linearized consistently.
    #[error("inconsistent inheritance order for {0}")]
    InconsistentHierarchy(String),
    /// A declaration contains itself as a subcommand.
    #[error("subcommand cycle detected at path: {0}")]
    SubcommandCycle(String),
    /// A type expression could not be parsed.
    #[error("invalid type expression `{expression}`: {reason}")]
    InvalidAnnotation { expression: String, reason: String },
}

/// Why a coercion failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionReason {
    /// The target type's parse rejected the token.
    #[error("{0}")]
    Invalid(String),
    /// Token count does not match the type.
    #[error("expected {expected} token(s), got {found}")]
    WrongTokenCount { expected: String, found: usize },
    /// A map entry lacks the `=` delimiter.
    #[error("expected KEY=VALUE")]
    MissingDelimiter,
    /// Token is not an enum or literal member.
    #[error("valid members: {}", .members.join(", "))]
    NotAMember { members: Vec<String> },
    /// Every union member failed; one sub-error per attempted member.
    #[error("no member matched ({})", union_attempts(.0))]
    NoUnionMember(Vec<CoercionError>),
    /// The type cannot be built from tokens (subcommand references).
    #[error("not resolvable from tokens")]
    NotResolvable,
}

fn union_attempts(attempts: &[CoercionError]) -> String {
    attempts
        .iter()
        .map(|attempt| format!("{}: {}", attempt.target, attempt.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Raw tokens could not be converted to the declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{}cannot convert {tokens:?} to {target}: {reason}",
    field_scope(.path, .field.as_deref())
)]
pub struct CoercionError {
    /// Subcommand path from the root; empty at the top level.
    pub path: Vec<String>,
    /// Field name, set once the error leaves the resolver.
    pub field: Option<String>,
    /// Offending tokens.
    pub tokens: Vec<String>,
    /// Target type in canonical form.
    pub target: String,
    pub reason: CoercionReason,
}

impl CoercionError {
    pub(crate) fn new(tokens: &[String], target: impl fmt::Display, reason: CoercionReason) -> Self {
        Self {
            path: Vec::new(),
            field: None,
            tokens: tokens.to_vec(),
            target: target.to_string(),
            reason,
        }
    }

    /// Attaches the field name and subcommand path.
    pub fn for_field(mut self, field: &str, path: &[String]) -> Self {
        self.field = Some(field.to_string());
        self.path = path.to_vec();
        self
    }
}

/// `"remote add: "` for a nested path, empty at the top level.
fn scope(path: &[String]) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("{}: ", path.join(" "))
    }
}

fn field_scope(path: &[String], field: Option<&str>) -> String {
    match field {
        Some(field) => format!("{}field `{field}`: ", scope(path)),
        None => String::new(),
    }
}

/// A required field had no tokens and no default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}missing required field `{field}`", scope(.path))]
pub struct MissingRequiredFieldError {
    /// Subcommand path from the root.
    pub path: Vec<String>,
    pub field: String,
}

/// First failure of a materialization pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaterializationError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Coercion(#[from] CoercionError),
    #[error(transparent)]
    MissingRequired(#[from] MissingRequiredFieldError),
    /// The raw result selects a subcommand the schema does not dispatch to.
    #[error("unknown subcommand `{command}` at `{}`", .path.join(" "))]
    UnknownSubcommand { path: Vec<String>, command: String },
}

impl MaterializationError {
    /// Name of the failing field, when the error concerns one.
    pub fn field(&self) -> Option<&str> {
        match self {
            MaterializationError::Coercion(err) => err.field.as_deref(),
            MaterializationError::MissingRequired(err) => Some(&err.field),
            MaterializationError::Configuration(_)
            | MaterializationError::UnknownSubcommand { .. } => None,
        }
    }
}

/// Failure of a full parse: the token parser's usage error, passed through
/// unchanged, or a materialization failure.
#[derive(Debug, Error)]
pub enum ParseError<E>
where
    E: std::error::Error + 'static,
{
    #[error(transparent)]
    Usage(E),
    #[error(transparent)]
    Materialization(#[from] MaterializationError),
}

/// Typed access into an [`Instance`](crate::Instance) failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("field `{field}` holds {found}, not {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}
