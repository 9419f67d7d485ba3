//! Schema resolution and coercion engine for declarative command-line
//! interfaces.
//!
//! A CLI is described as data:
//!
//! - [`Declaration`]: one CLI level (application root or subcommand) with
//!   typed fields, parent declarations and help metadata.
//! - [`TypeDescriptor`]: the closed set of field types (primitives,
//!   containers, unions, enums, literals, custom scalars, subcommand
//!   references).
//! - [`ArgumentMeta`]: explicit flags, arity, type override, default and
//!   choices of a field.
//!
//! A [`Registry`] compiles declarations into immutable [`CompiledSchema`]
//! values ([`FieldSpec`] list plus subcommand [`DispatchGroup`]). An external
//! token parser (see [`TokenParser`]) turns argv into a [`RawParseResult`],
//! and [`materialize`] resolves it into a typed [`Instance`] tree.
//!
//! # Example
//!
//! ```
//! use argschema_core::*;
//!
//! let mut registry = Registry::new();
//! registry
//!     .register(Declaration::subcommand("Add").field_with(
//!         "numbers",
//!         TypeDescriptor::list(TypeDescriptor::Float),
//!         ArgumentMeta::new().flag("--numbers").arity(Arity::OneOrMore),
//!     ))
//!     .unwrap();
//! registry
//!     .register(Declaration::subcommand("Remove").field("index", TypeDescriptor::Int))
//!     .unwrap();
//! registry
//!     .register(
//!         Declaration::app("calc")
//!             .description("A tiny calculator")
//!             .subcommand_field("add", "Add")
//!             .subcommand_field("remove", "Remove"),
//!     )
//!     .unwrap();
//!
//! let schema = registry.compile("calc").unwrap();
//! assert_eq!(schema.dispatch.names(), vec!["add", "remove"]);
//!
//! // What a token parser reports for `calc add --numbers 1 2 3`
//! let raw = RawParseResult::new().with_subcommand(
//!     "add",
//!     RawParseResult::new().with_tokens("numbers", ["1", "2", "3"]),
//! );
//! let instance = materialize(&schema, &raw).unwrap();
//!
//! let add = instance.subcommand("add").unwrap();
//! assert_eq!(add.get_as::<Vec<f64>>("numbers").unwrap(), vec![1.0, 2.0, 3.0]);
//! assert_eq!(instance.get("remove"), Some(&Value::None));
//! ```

mod annotation;
mod compile;
mod descriptor;
mod error;
mod materialize;
mod merge;
mod package;
mod registry;
mod resolve;
mod types;
mod validate;
mod value;

pub use annotation::{EnumDescriptor, Literal, ScalarKind, TypeDescriptor};
pub use descriptor::{build_field, infer_arity};
pub use error::{
    AccessError, CoercionError, CoercionReason, ConfigurationError, MaterializationError,
    MissingRequiredFieldError, ParseError,
};
pub use materialize::{RawParseResult, RawValue, TokenParser, materialize, parse_with};
pub use merge::{linearize, merge_metadata, overlay_fields};
pub use package::DeclarationPackage;
pub use registry::Registry;
pub use resolve::resolve;
pub use types::*;
pub use validate::{validate_declaration, validate_package, validate_schema};
pub use value::{FromValue, Instance, Pattern, Value};
