use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::registry::Registry;
use crate::types::Declaration;

/// Serializable bundle of declarations.
///
/// A package groups the declarations of one or more CLIs with version
/// metadata, so a whole interface can be written to a single JSON or YAML
/// file and loaded back into a [`Registry`].
///
/// # Examples
///
/// ```
/// use argschema_core::*;
///
/// let mut package = DeclarationPackage::new("1.0.0", "2024-01-15T10:30:00Z");
/// package.name = Some("calculator".into());
/// package.declarations.push(Declaration::subcommand("Add"));
/// package.declarations.push(
///     Declaration::app("calc").subcommand_field("add", "Add"),
/// );
///
/// assert_eq!(package.declaration_count(), 2);
/// let registry = package.into_registry().unwrap();
/// assert!(registry.compile("calc").is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclarationPackage {
    /// Declaration contract version (populated from
    /// [`SCHEMA_CONTRACT_VERSION`](crate::SCHEMA_CONTRACT_VERSION)).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Package format version (semver string).
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// ISO-8601 timestamp for package creation.
    pub generated_at: String,
    /// Declarations, in registration order.
    #[serde(default)]
    pub declarations: Vec<Declaration>,
}

impl DeclarationPackage {
    /// Creates an empty package.
    ///
    /// The `schema_version` is set from
    /// [`SCHEMA_CONTRACT_VERSION`](crate::SCHEMA_CONTRACT_VERSION).
    pub fn new(version: impl Into<String>, generated_at: impl Into<String>) -> Self {
        Self {
            schema_version: Some(crate::SCHEMA_CONTRACT_VERSION.to_string()),
            version: version.into(),
            name: None,
            description: None,
            generated_at: generated_at.into(),
            declarations: Vec::new(),
        }
    }

    /// Returns the number of declarations in this package.
    pub fn declaration_count(&self) -> usize {
        self.declarations.len()
    }

    /// Registers every declaration in a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] raised by registration.
    pub fn into_registry(self) -> Result<Registry, ConfigurationError> {
        Registry::from_declarations(self.declarations)
    }
}
