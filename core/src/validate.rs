//! Declaration and schema validation.
//!
//! Validates structural invariants of declarations, declaration packages and
//! compiled schemas: empty names, duplicate fields, malformed flags,
//! duplicate flags within one schema and positional layouts that cannot be
//! split unambiguously. Validation is fail-fast; the returned
//! vector holds at most the first problem found.
//!
//! # Examples
//!
//! ```
//! use argschema_core::*;
//!
//! let ok = Declaration::app("git")
//!     .field_with("verbose", TypeDescriptor::Bool, ArgumentMeta::new().flag("-v").flag("--verbose"));
//! assert!(validate_declaration(&ok).is_empty());
//!
//! // Invalid: short flag missing leading dash
//! let bad = Declaration::app("git")
//!     .field_with("verbose", TypeDescriptor::Bool, ArgumentMeta::new().flag("v"));
//! assert_eq!(
//!     validate_declaration(&bad),
//!     vec![ConfigurationError::InvalidShortFlag("v".to_string())]
//! );
//! ```

use std::collections::HashSet;

use crate::error::ConfigurationError;
use crate::package::DeclarationPackage;
use crate::types::{Arity, CompiledSchema, Declaration};

/// Validates every declaration of a package.
///
/// Checks for duplicate declaration names and validates each declaration
/// individually.
pub fn validate_package(package: &DeclarationPackage) -> Vec<ConfigurationError> {
    let mut errors = Vec::new();

    let mut seen: HashSet<&str> = HashSet::new();
    for declaration in &package.declarations {
        if !seen.insert(declaration.name.as_str()) {
            errors.push(ConfigurationError::DuplicateDeclaration(
                declaration.name.clone(),
            ));
            return errors;
        }
        errors.extend(validate_declaration(declaration));
        if !errors.is_empty() {
            return errors;
        }
    }

    errors
}

/// Validates a single declaration in isolation.
///
/// Checks for an empty name, empty or duplicate field names and malformed
/// flags. Checks that need other declarations (parents, subcommands, flag
/// collisions with inherited fields) happen at compile time.
pub fn validate_declaration(declaration: &Declaration) -> Vec<ConfigurationError> {
    let mut errors = Vec::new();

    if declaration.name.trim().is_empty() {
        errors.push(ConfigurationError::EmptyName);
        return errors;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for field in &declaration.fields {
        let name = field.name.trim();
        if name.is_empty() {
            errors.push(ConfigurationError::EmptyFieldName {
                declaration: declaration.name.clone(),
            });
            return errors;
        }
        if !seen.insert(name) {
            errors.push(ConfigurationError::DuplicateField {
                declaration: declaration.name.clone(),
                field: name.to_string(),
            });
            return errors;
        }

        errors.extend(validate_flags(name, &field.meta.resolved_flags(name)));
        if !errors.is_empty() {
            return errors;
        }
    }

    errors
}

/// Checks a compiled schema as a whole.
///
/// No two fields may share a flag. Positionals must be splittable from left
/// to right: a positional that may be left out cannot precede a required
/// one, and only the last positional may take more than one token.
pub fn validate_schema(schema: &CompiledSchema) -> Vec<ConfigurationError> {
    let mut errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for flag in schema.fields.iter().flat_map(|f| f.flags.iter()) {
        if !seen.insert(flag.as_str()) {
            errors.push(ConfigurationError::DuplicateFlag {
                schema: schema.name.clone(),
                flag: flag.clone(),
            });
            return errors;
        }
    }

    let positionals: Vec<_> = schema.positionals().collect();
    for (idx, spec) in positionals.iter().enumerate() {
        let later = &positionals[idx + 1..];
        if later.is_empty() {
            break;
        }
        if spec.arity.max() != Some(1) {
            errors.push(ConfigurationError::VariadicPositionalNotLast {
                schema: schema.name.clone(),
                field: spec.name.clone(),
            });
            return errors;
        }
        if !spec.required {
            if let Some(required) = later.iter().find(|p| p.required) {
                errors.push(ConfigurationError::OptionalPositionalBeforeRequired {
                    schema: schema.name.clone(),
                    optional: spec.name.clone(),
                    required: required.name.clone(),
                });
                return errors;
            }
        }
    }

    errors
}

/// Checks the format of one field's flags: `-x` for short flags, `--name`
/// for long ones, no repeats.
pub(crate) fn validate_flags(field: &str, flags: &[String]) -> Vec<ConfigurationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for flag in flags {
        if flag.starts_with("--") {
            if flag.len() < 3 || flag.contains(char::is_whitespace) {
                errors.push(ConfigurationError::InvalidLongFlag(flag.clone()));
                return errors;
            }
        } else if !flag.starts_with('-') || flag.chars().count() != 2 {
            errors.push(ConfigurationError::InvalidShortFlag(flag.clone()));
            return errors;
        }

        if !seen.insert(flag.as_str()) {
            errors.push(ConfigurationError::RepeatedFlag {
                field: field.to_string(),
                flag: flag.clone(),
            });
            return errors;
        }
    }

    errors
}
