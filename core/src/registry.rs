//! Declaration registry with a compiled-schema cache.
//!
//! Declarations refer to each other by name (parents, `command[...]`
//! fields), so they are registered together and compiled on demand.
//! Compiled schemas are immutable and cached per declaration name; the cache
//! is filled once per name and shared across threads.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::compile::Compiler;
use crate::error::{ConfigurationError, ParseError};
use crate::materialize::{TokenParser, parse_with};
use crate::types::{CompiledSchema, Declaration};
use crate::validate::validate_declaration;
use crate::value::Instance;

/// Named declarations plus their compiled schemas.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use argschema_core::*;
///
/// let mut registry = Registry::new();
/// registry
///     .register(Declaration::app("echo").field("text", TypeDescriptor::Str))
///     .unwrap();
///
/// let first = registry.compile("echo").unwrap();
/// let second = registry.compile("echo").unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    declarations: Vec<Declaration>,
    index: HashMap<String, usize>,
    cache: RwLock<HashMap<String, Arc<CompiledSchema>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every declaration, in order.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`Registry::register`].
    pub fn from_declarations(
        declarations: impl IntoIterator<Item = Declaration>,
    ) -> Result<Self, ConfigurationError> {
        let mut registry = Self::new();
        for declaration in declarations {
            registry.register(declaration)?;
        }
        Ok(registry)
    }

    /// Validates and adds a declaration.
    ///
    /// Parents and subcommand targets may be registered later; they are
    /// resolved at compile time. Registering invalidates cached schemas.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the declaration is malformed or its
    /// name is already taken.
    pub fn register(&mut self, declaration: Declaration) -> Result<(), ConfigurationError> {
        if let Some(err) = validate_declaration(&declaration).into_iter().next() {
            return Err(err);
        }
        if self.index.contains_key(&declaration.name) {
            return Err(ConfigurationError::DuplicateDeclaration(declaration.name));
        }

        debug!(
            declaration = %declaration.name,
            role = ?declaration.role,
            fields = declaration.fields.len(),
            "Registered declaration"
        );
        self.index
            .insert(declaration.name.clone(), self.declarations.len());
        self.declarations.push(declaration);
        self.cache.get_mut().clear();
        Ok(())
    }

    /// Looks up a declaration by name.
    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.index.get(name).map(|&idx| &self.declarations[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Declaration names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.declarations.iter().map(|d| d.name.as_str())
    }

    /// Declarations in registration order.
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Returns the compiled schema of `name`, compiling it on first use.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the declaration, an ancestor or a
    /// nested subcommand is inconsistent, or if subcommands nest cyclically.
    pub fn compile(&self, name: &str) -> Result<Arc<CompiledSchema>, ConfigurationError> {
        if let Some(schema) = self.cache.read().get(name) {
            return Ok(Arc::clone(schema));
        }

        let mut compiler = Compiler::new(self);
        let compiled = compiler.compile(name)?;

        let mut cache = self.cache.write();
        for (key, schema) in compiler.into_memo() {
            cache.entry(key).or_insert(schema);
        }
        Ok(cache.get(name).cloned().unwrap_or(compiled))
    }

    /// Compiles every registered declaration, in registration order.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] encountered.
    pub fn compile_all(&self) -> Result<Vec<Arc<CompiledSchema>>, ConfigurationError> {
        self.declarations
            .iter()
            .map(|declaration| self.compile(&declaration.name))
            .collect()
    }

    /// Compiles `name`, tokenizes `args` with `parser` and materializes the
    /// result.
    ///
    /// # Errors
    ///
    /// Usage errors from `parser` are returned unchanged as
    /// [`ParseError::Usage`]; compile and materialization failures as
    /// [`ParseError::Materialization`].
    pub fn parse<P: TokenParser>(
        &self,
        name: &str,
        parser: &P,
        args: &[String],
    ) -> Result<Instance, ParseError<P::Error>> {
        let schema = self
            .compile(name)
            .map_err(|err| ParseError::Materialization(err.into()))?;
        parse_with(parser, &schema, args)
    }
}

impl Clone for Registry {
    fn clone(&self) -> Self {
        Self {
            declarations: self.declarations.clone(),
            index: self.index.clone(),
            cache: RwLock::new(self.cache.read().clone()),
        }
    }
}
