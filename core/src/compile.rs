//! Schema Compiler.
//!
//! Compiles a registered declaration into a [`CompiledSchema`]: linearizes
//! its ancestors, layers their fields and metadata, then compiles every
//! subcommand field's declaration recursively into the dispatch group.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::descriptor::build_field;
use crate::error::ConfigurationError;
use crate::merge::{linearize, merge_metadata, overlay_fields};
use crate::registry::Registry;
use crate::types::{CompiledSchema, DispatchGroup, FieldSpec, SchemaMetadata, SubcommandEntry};
use crate::validate::validate_schema;

/// One compilation pass over a registry.
///
/// Schemas compiled during the pass are memoized by declaration name, so a
/// declaration reachable through several subcommand fields is compiled once.
pub(crate) struct Compiler<'a> {
    registry: &'a Registry,
    memo: HashMap<String, Arc<CompiledSchema>>,
    /// Declarations whose subcommands are being compiled.
    stack: Vec<String>,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            memo: HashMap::new(),
            stack: Vec::new(),
        }
    }

    /// Schemas compiled so far, keyed by declaration name.
    pub(crate) fn into_memo(self) -> HashMap<String, Arc<CompiledSchema>> {
        self.memo
    }

    pub(crate) fn compile(&mut self, name: &str) -> Result<Arc<CompiledSchema>, ConfigurationError> {
        if let Some(schema) = self.memo.get(name) {
            return Ok(Arc::clone(schema));
        }

        if self.stack.iter().any(|segment| segment == name) {
            let cycle_path = self
                .stack
                .iter()
                .cloned()
                .chain(std::iter::once(name.to_string()))
                .collect::<Vec<_>>()
                .join(" ");
            return Err(ConfigurationError::SubcommandCycle(cycle_path));
        }

        self.stack.push(name.to_string());
        let result = self.compile_uncached(name);
        self.stack.pop();

        let schema = Arc::new(result?);
        self.memo.insert(name.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    fn compile_uncached(&mut self, name: &str) -> Result<CompiledSchema, ConfigurationError> {
        let order = linearize(self.registry, name)?;

        let mut fields: Vec<FieldSpec> = Vec::new();
        let mut metadata = SchemaMetadata::default();
        for ancestor in order.iter().rev() {
            let declaration = self.declaration(ancestor)?;
            let layer = declaration
                .fields
                .iter()
                .map(|field| build_field(&field.name, &field.annotation, &field.meta))
                .collect::<Result<Vec<_>, _>>()?;
            overlay_fields(&mut fields, layer);
            metadata = merge_metadata(&metadata, &declaration.config);
        }

        let role = self.declaration(name)?.role;
        let mut schema = CompiledSchema {
            name: name.to_string(),
            role,
            metadata,
            fields,
            dispatch: DispatchGroup::default(),
        };
        if let Some(err) = validate_schema(&schema).into_iter().next() {
            return Err(err);
        }

        for spec in schema.fields.iter().filter(|f| f.is_subcommand()) {
            let Some(target) = spec.coercion.command_name() else {
                continue;
            };
            let nested = self.compile(target)?;
            schema.dispatch.members.push(SubcommandEntry {
                field: spec.name.clone(),
                schema: nested,
            });
        }

        debug!(
            declaration = name,
            ancestors = ?&order[1..],
            fields = schema.fields.len(),
            subcommands = ?schema.dispatch.names(),
            "Compiled schema"
        );
        Ok(schema)
    }

    fn declaration(&self, name: &str) -> Result<&'a crate::types::Declaration, ConfigurationError> {
        self.registry
            .get(name)
            .ok_or_else(|| ConfigurationError::UnknownDeclaration(name.to_string()))
    }
}
