//! Declaration and compiled-schema types.
//!
//! A [`Declaration`] is the data-only description of one level of a CLI:
//! its fields, its parents and its help metadata. The compiler turns it
//! into a [`CompiledSchema`] made of normalized [`FieldSpec`] values and a
//! [`DispatchGroup`] of mutually exclusive subcommands.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::annotation::TypeDescriptor;
use crate::value::Value;

/// Version of the declaration file contract (semver).
pub const SCHEMA_CONTRACT_VERSION: &str = "1.0.0";

/// Whether a declaration is an application root or a subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Application root (the default).
    #[default]
    App,
    /// Subcommand, reachable through a `command[...]` field.
    Subcommand,
}

/// Number of tokens an argument consumes.
///
/// Serialized like argparse's `nargs`: an integer, `"*"`, `"+"` or `"?"`.
///
/// # Examples
///
/// ```
/// use argschema_core::Arity;
///
/// assert!(Arity::ZeroOrMore.accepts(0));
/// assert!(!Arity::OneOrMore.accepts(0));
/// assert!(Arity::Exact(2).accepts(2));
/// assert_eq!(Arity::OptionalOne.to_string(), "?");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ArityRepr", into = "ArityRepr")]
pub enum Arity {
    /// Exactly `n` tokens; `Exact(0)` is a presence flag.
    Exact(usize),
    /// Any number of tokens.
    ZeroOrMore,
    /// At least one token.
    OneOrMore,
    /// Zero or one token.
    OptionalOne,
}

impl Arity {
    /// Returns `true` if `count` tokens satisfy this arity.
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::ZeroOrMore => true,
            Arity::OneOrMore => count >= 1,
            Arity::OptionalOne => count <= 1,
        }
    }

    /// Minimum number of tokens.
    pub fn min(self) -> usize {
        match self {
            Arity::Exact(n) => n,
            Arity::OneOrMore => 1,
            Arity::ZeroOrMore | Arity::OptionalOne => 0,
        }
    }

    /// Maximum number of tokens, `None` when unbounded.
    pub fn max(self) -> Option<usize> {
        match self {
            Arity::Exact(n) => Some(n),
            Arity::OptionalOne => Some(1),
            Arity::ZeroOrMore | Arity::OneOrMore => None,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::ZeroOrMore => f.write_str("*"),
            Arity::OneOrMore => f.write_str("+"),
            Arity::OptionalOne => f.write_str("?"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ArityRepr {
    Count(usize),
    Symbol(String),
}

impl TryFrom<ArityRepr> for Arity {
    type Error = String;

    fn try_from(repr: ArityRepr) -> Result<Self, Self::Error> {
        match repr {
            ArityRepr::Count(n) => Ok(Arity::Exact(n)),
            ArityRepr::Symbol(symbol) => match symbol.as_str() {
                "*" => Ok(Arity::ZeroOrMore),
                "+" => Ok(Arity::OneOrMore),
                "?" => Ok(Arity::OptionalOne),
                other => other
                    .parse()
                    .map(Arity::Exact)
                    .map_err(|_| format!("invalid arity `{other}`, expected a count, *, + or ?")),
            },
        }
    }
}

impl From<Arity> for ArityRepr {
    fn from(arity: Arity) -> Self {
        match arity {
            Arity::Exact(n) => ArityRepr::Count(n),
            other => ArityRepr::Symbol(other.to_string()),
        }
    }
}

/// Help metadata of a declaration; unset values inherit from ancestors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeclarationConfig {
    /// Overrides the program name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prog: Option<String>,
    /// Help header text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Help footer text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epilog: Option<String>,
}

/// A `short` or `long` key: `true` derives the flag from the field name,
/// a string spells it out without dashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagName {
    Derived(bool),
    Named(String),
}

/// Explicit argument metadata attached to a field.
///
/// Every member is optional; an empty `ArgumentMeta` declares a positional
/// argument named after the field.
///
/// # Examples
///
/// ```
/// use argschema_core::{ArgumentMeta, Arity, Value};
///
/// let meta = ArgumentMeta::new()
///     .flag("-n")
///     .flag("--numbers")
///     .arity(Arity::OneOrMore)
///     .help("Numbers to add");
/// assert_eq!(meta.flags, vec!["-n", "--numbers"]);
///
/// let explicit_none = ArgumentMeta::new().flag("--limit").default_value(Value::None);
/// assert_eq!(explicit_none.default, Some(Value::None));
///
/// let derived = ArgumentMeta::new().short().long_name("output-file");
/// assert_eq!(derived.resolved_flags("output"), vec!["--output", "-o", "--output-file"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgumentMeta {
    /// Flag names such as `-v` or `--verbose`; empty for positionals.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
    /// Short flag derived from the field name or given by name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<FlagName>,
    /// Extra long flag; any `short` or `long` key also adds `--<field>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long: Option<FlagName>,
    /// Marks the field positional explicitly; conflicts with `flags`.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub positional: bool,
    /// Explicit arity; inferred from the annotation when unset.
    #[serde(alias = "nargs", skip_serializing_if = "Option::is_none")]
    pub arity: Option<Arity>,
    /// Explicit coercion target; wins over the annotation.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_override: Option<TypeDescriptor>,
    /// Explicit default. `Some(Value::None)` is a deliberate "none" default,
    /// distinct from leaving the default unset.
    #[serde(
        deserialize_with = "present_default",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
    /// Marks an optional (flagged) argument as required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Closed value set, passed to the token parser.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    /// Help text, passed through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    /// Placeholder name shown in usage lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_name: Option<String>,
}

// Only called when the key is present, so `null` becomes `Some(Value::None)`.
fn present_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl ArgumentMeta {
    /// Creates empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a flag name.
    pub fn flag(mut self, flag: &str) -> Self {
        self.flags.push(flag.to_string());
        self
    }

    /// Adds `-<first letter of the field>`, and `--<field>`.
    pub fn short(mut self) -> Self {
        self.short = Some(FlagName::Derived(true));
        self
    }

    /// Adds `-<short>`, and `--<field>`.
    pub fn short_name(mut self, short: char) -> Self {
        self.short = Some(FlagName::Named(short.to_string()));
        self
    }

    /// Adds `--<field>`.
    pub fn long(mut self) -> Self {
        self.long = Some(FlagName::Derived(true));
        self
    }

    /// Adds `--<field>` and `--<long>`.
    pub fn long_name(mut self, long: &str) -> Self {
        self.long = Some(FlagName::Named(long.to_string()));
        self
    }

    /// Explicit flags followed by the ones `short` and `long` derive for
    /// `field`, without repeats.
    ///
    /// Setting either key makes the field an option named `--<field>`;
    /// `short: true` adds the field's first letter, a named short or long
    /// adds that flag as well.
    pub fn resolved_flags(&self, field: &str) -> Vec<String> {
        let mut flags = self.flags.clone();
        if self.short.is_none() && self.long.is_none() {
            return flags;
        }

        let mut derived = vec![format!("--{field}")];
        match &self.short {
            Some(FlagName::Derived(true)) => {
                derived.extend(field.chars().next().map(|c| format!("-{c}")));
            }
            Some(FlagName::Named(short)) => derived.push(format!("-{short}")),
            Some(FlagName::Derived(false)) | None => {}
        }
        if let Some(FlagName::Named(long)) = &self.long {
            derived.push(format!("--{long}"));
        }

        for flag in derived {
            if !flags.contains(&flag) {
                flags.push(flag);
            }
        }
        flags
    }

    /// Returns `true` when any flag is declared, explicitly or derived.
    pub fn has_flags(&self) -> bool {
        !self.flags.is_empty() || self.short.is_some() || self.long.is_some()
    }

    /// Marks the field positional.
    pub fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    /// Sets an explicit arity.
    pub fn arity(mut self, arity: Arity) -> Self {
        self.arity = Some(arity);
        self
    }

    /// Sets an explicit coercion target.
    pub fn type_override(mut self, ty: TypeDescriptor) -> Self {
        self.type_override = Some(ty);
        self
    }

    /// Sets an explicit default.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Marks the argument required or not.
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Sets the closed value set.
    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the help text.
    pub fn help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    /// Sets the usage placeholder.
    pub fn value_name(mut self, name: &str) -> Self {
        self.value_name = Some(name.to_string());
        self
    }
}

/// One declared field: a name, an annotation and explicit metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Field name, unique within the declaration.
    pub name: String,
    /// Declared type.
    pub annotation: TypeDescriptor,
    /// Explicit metadata.
    #[serde(flatten)]
    pub meta: ArgumentMeta,
}

/// Data-only description of one CLI level.
///
/// # Examples
///
/// ```
/// use argschema_core::*;
///
/// let status = Declaration::subcommand("Status")
///     .extends("Base")
///     .field_with("all", TypeDescriptor::Bool, ArgumentMeta::new().flag("-a").flag("--all"));
///
/// assert_eq!(status.role, Role::Subcommand);
/// assert_eq!(status.parents, vec!["Base"]);
/// assert_eq!(status.fields[0].name, "all");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    /// Declaration name, unique within a registry.
    pub name: String,
    /// Application root or subcommand.
    #[serde(default)]
    pub role: Role,
    /// Parent declarations, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    /// Help metadata.
    #[serde(flatten)]
    pub config: DeclarationConfig,
    /// Own fields, in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

impl Declaration {
    fn with_role(name: &str, role: Role) -> Self {
        Self {
            name: name.to_string(),
            role,
            parents: Vec::new(),
            config: DeclarationConfig::default(),
            fields: Vec::new(),
        }
    }

    /// Creates an application root declaration.
    pub fn app(name: &str) -> Self {
        Self::with_role(name, Role::App)
    }

    /// Creates a subcommand declaration.
    pub fn subcommand(name: &str) -> Self {
        Self::with_role(name, Role::Subcommand)
    }

    /// Adds a parent declaration.
    pub fn extends(mut self, parent: &str) -> Self {
        self.parents.push(parent.to_string());
        self
    }

    /// Overrides the program name.
    pub fn prog(mut self, prog: &str) -> Self {
        self.config.prog = Some(prog.to_string());
        self
    }

    /// Sets the help header.
    pub fn description(mut self, description: &str) -> Self {
        self.config.description = Some(description.to_string());
        self
    }

    /// Sets the help footer.
    pub fn epilog(mut self, epilog: &str) -> Self {
        self.config.epilog = Some(epilog.to_string());
        self
    }

    /// Adds a field without explicit metadata (a positional argument, or a
    /// subcommand when `annotation` is `command[...]`).
    pub fn field(self, name: &str, annotation: TypeDescriptor) -> Self {
        self.field_with(name, annotation, ArgumentMeta::default())
    }

    /// Adds a field with explicit metadata.
    pub fn field_with(mut self, name: &str, annotation: TypeDescriptor, meta: ArgumentMeta) -> Self {
        self.fields.push(FieldDecl {
            name: name.to_string(),
            annotation,
            meta,
        });
        self
    }

    /// Adds a subcommand field named `name` dispatching to `declaration`.
    pub fn subcommand_field(self, name: &str, declaration: &str) -> Self {
        self.field(name, TypeDescriptor::command(declaration))
    }
}

/// How a compiled field is registered with the token parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Positional argument, ordered by declaration.
    Positional,
    /// Flagged argument.
    Optional,
    /// Member of the schema's dispatch group.
    Subcommand,
}

/// Normalized description of one argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name; the key in raw parse results and instances.
    pub name: String,
    pub kind: FieldKind,
    /// Flag names; empty for positionals and subcommands.
    pub flags: Vec<String>,
    pub arity: Arity,
    /// Type the raw tokens are resolved against.
    pub coercion: TypeDescriptor,
    /// Value used when no tokens are supplied.
    pub default: Option<Value>,
    pub required: bool,
    pub choices: Vec<String>,
    pub help: Option<String>,
    pub value_name: Option<String>,
}

impl FieldSpec {
    /// Returns `true` for positional arguments.
    pub fn is_positional(&self) -> bool {
        self.kind == FieldKind::Positional
    }

    /// Returns `true` for subcommand fields.
    pub fn is_subcommand(&self) -> bool {
        self.kind == FieldKind::Subcommand
    }

    /// Short flags (`-x`) in declaration order.
    pub fn short_flags(&self) -> impl Iterator<Item = char> + '_ {
        self.flags
            .iter()
            .filter(|f| !f.starts_with("--"))
            .filter_map(|f| f.chars().nth(1))
    }

    /// Long flags without the leading `--`, in declaration order.
    pub fn long_flags(&self) -> impl Iterator<Item = &str> + '_ {
        self.flags.iter().filter_map(|f| f.strip_prefix("--"))
    }
}

/// Help metadata after inheritance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMetadata {
    pub prog: Option<String>,
    pub description: Option<String>,
    pub epilog: Option<String>,
}

/// One member of a dispatch group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcommandEntry {
    /// Field name, also the subcommand's registered name.
    pub field: String,
    /// Compiled schema of the nested declaration.
    pub schema: Arc<CompiledSchema>,
}

/// Mutually exclusive sibling subcommands; at most one is selected per parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchGroup {
    pub members: Vec<SubcommandEntry>,
}

impl DispatchGroup {
    /// Finds a member by field name.
    pub fn member(&self, field: &str) -> Option<&SubcommandEntry> {
        self.members.iter().find(|m| m.field == field)
    }

    /// Returns `true` if there are no subcommands.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Subcommand names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.field.as_str()).collect()
    }
}

/// Inheritance-merged, immutable form of a [`Declaration`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledSchema {
    /// Name of the source declaration.
    pub name: String,
    pub role: Role,
    pub metadata: SchemaMetadata,
    /// All fields, ancestors first, in declaration order.
    pub fields: Vec<FieldSpec>,
    pub dispatch: DispatchGroup,
}

impl CompiledSchema {
    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Non-subcommand fields in declaration order.
    pub fn arguments(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| !f.is_subcommand())
    }

    /// Positional fields in declaration order.
    pub fn positionals(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.is_positional())
    }

    /// Program name: the `prog` override, or the declaration name.
    pub fn program_name(&self) -> &str {
        self.metadata.prog.as_deref().unwrap_or(&self.name)
    }

    /// Finds the compiled schema of a direct subcommand.
    pub fn subcommand(&self, field: &str) -> Option<&CompiledSchema> {
        self.dispatch.member(field).map(|m| m.schema.as_ref())
    }
}
