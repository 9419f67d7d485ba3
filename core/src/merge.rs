//! Inheritance merging.
//!
//! A declaration's ancestors are ordered with C3 linearization, so diamond
//! hierarchies are merged deterministically. Fields and metadata are then
//! layered from the most distant ancestor to the declaration itself:
//!
//! - a field redeclared by a descendant replaces the inherited one entirely
//!   and keeps the inherited position;
//! - a metadata value set by a descendant replaces the inherited one, an
//!   unset value inherits.
//!
//! # Example
//!
//! ```
//! use argschema_core::*;
//!
//! let mut registry = Registry::new();
//! registry.register(Declaration::subcommand("Base")).unwrap();
//! registry.register(Declaration::subcommand("Left").extends("Base")).unwrap();
//! registry.register(Declaration::subcommand("Right").extends("Base")).unwrap();
//! registry
//!     .register(Declaration::subcommand("Both").extends("Left").extends("Right"))
//!     .unwrap();
//!
//! assert_eq!(
//!     linearize(&registry, "Both").unwrap(),
//!     vec!["Both", "Left", "Right", "Base"],
//! );
//! ```

use crate::error::ConfigurationError;
use crate::registry::Registry;
use crate::types::{DeclarationConfig, FieldSpec, SchemaMetadata};

/// Returns `name` followed by its ancestors in resolution order.
///
/// # Errors
///
/// - [`ConfigurationError::UnknownDeclaration`] if a parent is not registered.
/// - [`ConfigurationError::InheritanceCycle`] if a declaration inherits from
///   itself.
/// - [`ConfigurationError::InconsistentHierarchy`] if the parents' orders
///   contradict each other.
pub fn linearize(registry: &Registry, name: &str) -> Result<Vec<String>, ConfigurationError> {
    let mut stack = Vec::new();
    linearize_inner(registry, name, &mut stack)
}

fn linearize_inner(
    registry: &Registry,
    name: &str,
    stack: &mut Vec<String>,
) -> Result<Vec<String>, ConfigurationError> {
    if stack.iter().any(|segment| segment == name) {
        let cycle_path = stack
            .iter()
            .cloned()
            .chain(std::iter::once(name.to_string()))
            .collect::<Vec<_>>()
            .join(" ");
        return Err(ConfigurationError::InheritanceCycle(cycle_path));
    }

    let declaration = registry
        .get(name)
        .ok_or_else(|| ConfigurationError::UnknownDeclaration(name.to_string()))?;

    stack.push(name.to_string());
    let mut sequences = Vec::with_capacity(declaration.parents.len() + 1);
    for parent in &declaration.parents {
        match linearize_inner(registry, parent, stack) {
            Ok(order) => sequences.push(order),
            Err(err) => {
                stack.pop();
                return Err(err);
            }
        }
    }
    stack.pop();
    sequences.push(declaration.parents.clone());

    let mut order = vec![name.to_string()];
    order.extend(c3_merge(name, sequences)?);
    Ok(order)
}

fn c3_merge(name: &str, mut sequences: Vec<Vec<String>>) -> Result<Vec<String>, ConfigurationError> {
    let mut merged = Vec::new();

    loop {
        sequences.retain(|sequence| !sequence.is_empty());
        if sequences.is_empty() {
            return Ok(merged);
        }

        let head = sequences
            .iter()
            .map(|sequence| &sequence[0])
            .find(|candidate| {
                !sequences
                    .iter()
                    .any(|sequence| sequence[1..].contains(*candidate))
            })
            .cloned()
            .ok_or_else(|| ConfigurationError::InconsistentHierarchy(name.to_string()))?;

        for sequence in &mut sequences {
            if sequence[0] == head {
                sequence.remove(0);
            }
        }
        merged.push(head);
    }
}

/// Layers `overlay` onto `fields`.
///
/// A field whose name already exists replaces the existing spec in place;
/// new fields are appended in declaration order.
pub fn overlay_fields(fields: &mut Vec<FieldSpec>, overlay: Vec<FieldSpec>) {
    for spec in overlay {
        match fields.iter_mut().find(|existing| existing.name == spec.name) {
            Some(existing) => *existing = spec,
            None => fields.push(spec),
        }
    }
}

/// Layers a declaration's config onto inherited metadata.
pub fn merge_metadata(base: &SchemaMetadata, overlay: &DeclarationConfig) -> SchemaMetadata {
    SchemaMetadata {
        prog: overlay.prog.clone().or_else(|| base.prog.clone()),
        description: overlay
            .description
            .clone()
            .or_else(|| base.description.clone()),
        epilog: overlay.epilog.clone().or_else(|| base.epilog.clone()),
    }
}
