//! Type descriptors for declared fields.
//!
//! A [`TypeDescriptor`] is the closed set of annotations a field can carry.
//! The Type Resolver dispatches on these variants instead of inspecting
//! types at runtime, and the compiler uses them to infer arity and
//! implied defaults.
//!
//! Descriptors have a compact textual form used in declaration files and in
//! error messages:
//!
//! ```
//! use argschema_core::TypeDescriptor;
//!
//! let ty: TypeDescriptor = "map[str, list[int]]".parse().unwrap();
//! assert_eq!(
//!     ty,
//!     TypeDescriptor::map(TypeDescriptor::Str, TypeDescriptor::list(TypeDescriptor::Int)),
//! );
//! assert_eq!(ty.to_string(), "map[str, list[int]]");
//!
//! let color: TypeDescriptor = "enum[Color: RED, GREEN]".parse().unwrap();
//! assert_eq!(color.to_string(), "enum[Color: RED, GREEN]");
//!
//! let mode: TypeDescriptor = "literal[1, 2.5, true, 'fast']".parse().unwrap();
//! assert_eq!(mode.to_string(), r#"literal[1, 2.5, true, "fast"]"#);
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Scalar types with exactly one canonical textual parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    /// ISO date, `YYYY-MM-DD`.
    Date,
    /// ISO time, `HH:MM[:SS[.f]]`.
    Time,
    /// ISO date and time separated by `T` or a space.
    DateTime,
    /// Hyphenated or simple UUID.
    Uuid,
    /// Filesystem path (never fails).
    Path,
    /// Dotted-quad IPv4 address.
    Ipv4,
    /// IPv6 address.
    Ipv6,
    /// Either IPv4 or IPv6.
    Ip,
    /// Regular expression.
    Pattern,
}

impl ScalarKind {
    const ALL: [ScalarKind; 9] = [
        ScalarKind::Date,
        ScalarKind::Time,
        ScalarKind::DateTime,
        ScalarKind::Uuid,
        ScalarKind::Path,
        ScalarKind::Ipv4,
        ScalarKind::Ipv6,
        ScalarKind::Ip,
        ScalarKind::Pattern,
    ];

    /// Keyword used in type expressions.
    pub fn keyword(self) -> &'static str {
        match self {
            ScalarKind::Date => "date",
            ScalarKind::Time => "time",
            ScalarKind::DateTime => "datetime",
            ScalarKind::Uuid => "uuid",
            ScalarKind::Path => "path",
            ScalarKind::Ipv4 => "ipv4",
            ScalarKind::Ipv6 => "ipv6",
            ScalarKind::Ip => "ip",
            ScalarKind::Pattern => "pattern",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.keyword() == keyword)
    }
}

/// A closed set of named members; tokens must match a member name exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumDescriptor {
    /// Optional type name shown in error messages.
    pub name: Option<String>,
    /// Member names in declaration order.
    pub members: Vec<String>,
}

/// One accepted value of a `literal[...]` type.
///
/// Tokens match a member by value: `"01"` matches `Int(1)` and `"yes"`
/// matches `Bool(true)`.
#[derive(Debug, Clone)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl Literal {
    /// Reads a bare literal: `true`/`false`, an integer, a float, or else a
    /// string.
    fn from_word(word: &str) -> Self {
        match word {
            "true" => return Literal::Bool(true),
            "false" => return Literal::Bool(false),
            _ => {}
        }
        if let Ok(int) = word.parse() {
            return Literal::Int(int);
        }
        // a digit keeps words like `inf` and `nan` strings
        if word.chars().any(|c| c.is_ascii_digit()) {
            if let Ok(float) = word.parse() {
                return Literal::Float(float);
            }
        }
        Literal::Str(word.to_string())
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Int(a), Literal::Int(b)) => a == b,
            (Literal::Float(a), Literal::Float(b)) => a.to_bits() == b.to_bits(),
            (Literal::Bool(a), Literal::Bool(b)) => a == b,
            (Literal::Str(a), Literal::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Literal::Int(i) => i.hash(state),
            Literal::Float(f) => f.to_bits().hash(state),
            Literal::Bool(b) => b.hash(state),
            Literal::Str(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(x) => write!(f, "{x:?}"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

/// Declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeDescriptor {
    /// Signed 64-bit integer.
    Int,
    /// 64-bit float.
    Float,
    /// Text, taken verbatim.
    Str,
    /// Boolean; zero tokens mean "flag present".
    Bool,
    /// Custom scalar with one canonical parse.
    Scalar(ScalarKind),
    /// Ordered sequence.
    List(Box<TypeDescriptor>),
    /// Set, first occurrence order preserved.
    Set(Box<TypeDescriptor>),
    /// Mapping from `key=value` tokens.
    Map(Box<TypeDescriptor>, Box<TypeDescriptor>),
    /// Fixed-size heterogeneous tuple.
    Tuple(Vec<TypeDescriptor>),
    /// Members tried left to right; the first successful one wins.
    Union(Vec<TypeDescriptor>),
    /// Shorthand for `union[T, none]`.
    Optional(Box<TypeDescriptor>),
    /// Closed member set.
    Enum(EnumDescriptor),
    /// Closed set of typed values, matched by value.
    Literal(Vec<Literal>),
    /// Reference to another declaration: the field is a subcommand.
    Command(String),
    /// The absent alternative of a union (`none`).
    Absent,
}

impl TypeDescriptor {
    /// `list[inner]`.
    pub fn list(inner: TypeDescriptor) -> Self {
        TypeDescriptor::List(Box::new(inner))
    }

    /// `set[inner]`.
    pub fn set(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Set(Box::new(inner))
    }

    /// `map[key, value]`.
    pub fn map(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Map(Box::new(key), Box::new(value))
    }

    /// `tuple[...]`.
    pub fn tuple(items: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        TypeDescriptor::Tuple(items.into_iter().collect())
    }

    /// `union[...]`.
    pub fn union(members: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        TypeDescriptor::Union(members.into_iter().collect())
    }

    /// `optional[inner]`.
    pub fn optional(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Optional(Box::new(inner))
    }

    /// Anonymous or named enum.
    pub fn enumeration<I, S>(name: Option<&str>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TypeDescriptor::Enum(EnumDescriptor {
            name: name.map(String::from),
            members: members.into_iter().map(Into::into).collect(),
        })
    }

    /// `literal[...]`.
    pub fn literal<I, L>(members: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        TypeDescriptor::Literal(members.into_iter().map(Into::into).collect())
    }

    /// `command[declaration]`.
    pub fn command(declaration: impl Into<String>) -> Self {
        TypeDescriptor::Command(declaration.into())
    }

    /// Parses a type expression.
    pub fn parse(expression: &str) -> Result<Self, ConfigurationError> {
        expression.parse()
    }

    /// Returns `true` for `optional[T]` and unions that include `none`.
    pub fn is_optional(&self) -> bool {
        match self {
            TypeDescriptor::Optional(_) | TypeDescriptor::Absent => true,
            TypeDescriptor::Union(members) => members.contains(&TypeDescriptor::Absent),
            _ => false,
        }
    }

    /// Strips one level of optionality when it wraps exactly one type.
    ///
    /// `optional[int]` and `union[int, none]` both yield `int`; a union with
    /// several non-`none` members is returned unchanged.
    pub fn strip_optional(&self) -> &TypeDescriptor {
        match self {
            TypeDescriptor::Optional(inner) => inner,
            TypeDescriptor::Union(members) => {
                let mut present = members.iter().filter(|m| **m != TypeDescriptor::Absent);
                match (present.next(), present.next()) {
                    (Some(only), None) => only,
                    _ => self,
                }
            }
            _ => self,
        }
    }

    /// Returns `true` for list, set, map and tuple annotations.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::List(_)
                | TypeDescriptor::Set(_)
                | TypeDescriptor::Map(..)
                | TypeDescriptor::Tuple(_)
        )
    }

    /// Declaration referenced by a subcommand annotation, looking through
    /// optionality.
    pub fn command_name(&self) -> Option<&str> {
        match self.strip_optional() {
            TypeDescriptor::Command(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[TypeDescriptor]) -> fmt::Result {
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }

        match self {
            TypeDescriptor::Int => f.write_str("int"),
            TypeDescriptor::Float => f.write_str("float"),
            TypeDescriptor::Str => f.write_str("str"),
            TypeDescriptor::Bool => f.write_str("bool"),
            TypeDescriptor::Absent => f.write_str("none"),
            TypeDescriptor::Scalar(kind) => f.write_str(kind.keyword()),
            TypeDescriptor::List(inner) => write!(f, "list[{inner}]"),
            TypeDescriptor::Set(inner) => write!(f, "set[{inner}]"),
            TypeDescriptor::Map(key, value) => write!(f, "map[{key}, {value}]"),
            TypeDescriptor::Optional(inner) => write!(f, "optional[{inner}]"),
            TypeDescriptor::Command(name) => write!(f, "command[{name}]"),
            TypeDescriptor::Tuple(items) => {
                f.write_str("tuple[")?;
                join(f, items)?;
                f.write_str("]")
            }
            TypeDescriptor::Union(members) => {
                f.write_str("union[")?;
                join(f, members)?;
                f.write_str("]")
            }
            TypeDescriptor::Enum(descriptor) => {
                f.write_str("enum[")?;
                if let Some(name) = &descriptor.name {
                    write!(f, "{name}: ")?;
                }
                f.write_str(&descriptor.members.join(", "))?;
                f.write_str("]")
            }
            TypeDescriptor::Literal(members) => {
                f.write_str("literal[")?;
                for (idx, member) in members.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{member}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl FromStr for TypeDescriptor {
    type Err = ConfigurationError;

    fn from_str(expression: &str) -> Result<Self, Self::Err> {
        let mut parser = ExpressionParser {
            src: expression,
            pos: 0,
        };
        let result = parser.parse_type().and_then(|ty| {
            parser.skip_ws();
            if parser.pos == expression.len() {
                Ok(ty)
            } else {
                Err(format!("unexpected trailing input at offset {}", parser.pos))
            }
        });
        result.map_err(|reason| ConfigurationError::InvalidAnnotation {
            expression: expression.to_string(),
            reason,
        })
    }
}

impl TryFrom<String> for TypeDescriptor {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeDescriptor> for String {
    fn from(value: TypeDescriptor) -> Self {
        value.to_string()
    }
}

struct ExpressionParser<'a> {
    src: &'a str,
    pos: usize,
}

impl ExpressionParser<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(format!("expected `{expected}` at offset {}", self.pos))
        }
    }

    fn ident(&mut self) -> Result<&str, String> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.')) {
                break;
            }
            self.pos += c.len_utf8();
        }
        if start == self.pos {
            Err(format!("expected a name at offset {start}"))
        } else {
            Ok(&self.src[start..self.pos])
        }
    }

    fn type_list(&mut self) -> Result<Vec<TypeDescriptor>, String> {
        let mut items = vec![self.parse_type()?];
        while self.eat(',') {
            items.push(self.parse_type()?);
        }
        Ok(items)
    }

    fn parse_type(&mut self) -> Result<TypeDescriptor, String> {
        let keyword = self.ident()?.to_ascii_lowercase();
        if !self.eat('[') {
            return match keyword.as_str() {
                "int" => Ok(TypeDescriptor::Int),
                "float" => Ok(TypeDescriptor::Float),
                "str" => Ok(TypeDescriptor::Str),
                "bool" => Ok(TypeDescriptor::Bool),
                "none" => Ok(TypeDescriptor::Absent),
                other => ScalarKind::from_keyword(other)
                    .map(TypeDescriptor::Scalar)
                    .ok_or_else(|| format!("unknown type `{other}`")),
            };
        }

        let ty = match keyword.as_str() {
            "list" => TypeDescriptor::list(self.parse_type()?),
            "set" => TypeDescriptor::set(self.parse_type()?),
            "optional" => TypeDescriptor::optional(self.parse_type()?),
            "map" => {
                let key = self.parse_type()?;
                self.expect(',')?;
                TypeDescriptor::map(key, self.parse_type()?)
            }
            "tuple" => TypeDescriptor::Tuple(self.type_list()?),
            "union" => TypeDescriptor::Union(self.type_list()?),
            "command" => TypeDescriptor::Command(self.ident()?.to_string()),
            "enum" => self.enum_body()?,
            "literal" => self.literal_body()?,
            other => return Err(format!("`{other}` takes no type parameters")),
        };
        self.expect(']')?;
        Ok(ty)
    }

    fn enum_body(&mut self) -> Result<TypeDescriptor, String> {
        let first = self.ident()?.to_string();
        let (name, mut members) = if self.eat(':') {
            (Some(first), vec![self.ident()?.to_string()])
        } else {
            (None, vec![first])
        };
        while self.eat(',') {
            members.push(self.ident()?.to_string());
        }
        Ok(TypeDescriptor::Enum(EnumDescriptor { name, members }))
    }

    fn literal_body(&mut self) -> Result<TypeDescriptor, String> {
        let mut members = vec![self.literal()?];
        while self.eat(',') {
            members.push(self.literal()?);
        }
        Ok(TypeDescriptor::Literal(members))
    }

    fn literal(&mut self) -> Result<Literal, String> {
        self.skip_ws();
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                let start = self.pos + 1;
                let Some(len) = self.src[start..].find(quote) else {
                    return Err(format!("unterminated string at offset {}", self.pos));
                };
                self.pos = start + len + 1;
                Ok(Literal::Str(self.src[start..start + len].to_string()))
            }
            _ => self.ident().map(Literal::from_word),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_expression() {
        let ty: TypeDescriptor = "optional[ tuple[int, str, ipv4] ]".parse().unwrap();
        assert_eq!(
            ty,
            TypeDescriptor::optional(TypeDescriptor::tuple([
                TypeDescriptor::Int,
                TypeDescriptor::Str,
                TypeDescriptor::Scalar(ScalarKind::Ipv4),
            ]))
        );
    }

    #[test]
    fn test_display_is_canonical() {
        for expression in [
            "int",
            "list[float]",
            "map[str, int]",
            "union[int, str, none]",
            "enum[RED, GREEN]",
            "command[Remote]",
            "set[datetime]",
        ] {
            let ty: TypeDescriptor = expression.parse().unwrap();
            assert_eq!(ty.to_string(), expression);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let err = TypeDescriptor::parse("integer").unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidAnnotation { .. }));

        assert!(TypeDescriptor::parse("list[int").is_err());
        assert!(TypeDescriptor::parse("int[str]").is_err());
        assert!(TypeDescriptor::parse("int str").is_err());
    }

    #[test]
    fn test_parse_literal_members() {
        let ty: TypeDescriptor = "literal[1, -2.5, false, fast, \"with space\"]".parse().unwrap();
        assert_eq!(
            ty,
            TypeDescriptor::Literal(vec![
                Literal::Int(1),
                Literal::Float(-2.5),
                Literal::Bool(false),
                Literal::Str("fast".into()),
                Literal::Str("with space".into()),
            ])
        );
        assert_eq!(
            ty.to_string(),
            "literal[1, -2.5, false, \"fast\", \"with space\"]"
        );
        assert_eq!(TypeDescriptor::parse(&ty.to_string()).unwrap(), ty);

        // quoted members stay strings
        let quoted: TypeDescriptor = "literal['1', \"true\"]".parse().unwrap();
        assert_eq!(quoted, TypeDescriptor::literal(["1", "true"]));
        assert_eq!(TypeDescriptor::literal([2.0]).to_string(), "literal[2.0]");

        assert!(TypeDescriptor::parse("literal[\"open]").is_err());
        assert!(TypeDescriptor::parse("literal[]").is_err());
    }

    #[test]
    fn test_strip_optional() {
        let ty = TypeDescriptor::union([TypeDescriptor::Absent, TypeDescriptor::Int]);
        assert!(ty.is_optional());
        assert_eq!(ty.strip_optional(), &TypeDescriptor::Int);

        let wide = TypeDescriptor::union([TypeDescriptor::Int, TypeDescriptor::Str]);
        assert!(!wide.is_optional());
        assert_eq!(wide.strip_optional(), &wide);
    }

    #[test]
    fn test_command_name_looks_through_optional() {
        let ty = TypeDescriptor::optional(TypeDescriptor::command("Remote"));
        assert_eq!(ty.command_name(), Some("Remote"));
        assert_eq!(TypeDescriptor::Int.command_name(), None);
    }

    #[test]
    fn test_serde_uses_expression_form() {
        let ty = TypeDescriptor::list(TypeDescriptor::Int);
        let json = serde_json::to_string(&ty).unwrap();
        assert_eq!(json, "\"list[int]\"");
        let back: TypeDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ty);
    }
}
