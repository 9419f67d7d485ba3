//! [`TokenParser`] implementation backed by clap.

use argschema_core::{CompiledSchema, RawParseResult, TokenParser};
use tracing::debug;

use crate::command::build_command;
use crate::matches::collect_matches;

/// Token parser that registers a schema with clap and parses argv with it.
///
/// `args` passed to [`TokenParser::parse`] exclude the program name. Usage
/// errors (unknown flags, missing values, `--help`) come back as
/// [`clap::Error`]; call [`clap::Error::exit`] to print them the clap way.
///
/// # Examples
///
/// ```
/// use argschema_core::*;
/// use argschema_clap::ClapParser;
///
/// let registry = Registry::from_declarations(vec![
///     Declaration::app("greet")
///         .field("name", TypeDescriptor::Str)
///         .field_with(
///             "times",
///             TypeDescriptor::Int,
///             ArgumentMeta::new().flag("-n").default_value(1_i64),
///         ),
/// ])
/// .unwrap();
///
/// let args = vec!["-n".to_string(), "3".to_string(), "world".to_string()];
/// let instance = registry.parse("greet", &ClapParser::new(), &args).unwrap();
/// assert_eq!(instance.get_as::<String>("name").unwrap(), "world");
/// assert_eq!(instance.get_as::<i64>("times").unwrap(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClapParser {
    bin_name: Option<String>,
}

impl ClapParser {
    /// Creates a parser that names the program after the schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the program name shown in usage and error messages.
    pub fn bin_name(mut self, name: impl Into<String>) -> Self {
        self.bin_name = Some(name.into());
        self
    }

    /// Renders the `--help` text of `schema`.
    pub fn render_help(&self, schema: &CompiledSchema) -> String {
        self.command(schema).render_help().to_string()
    }

    fn command(&self, schema: &CompiledSchema) -> clap::Command {
        let command = build_command(schema);
        match &self.bin_name {
            Some(name) => command.bin_name(name.clone()),
            None => command,
        }
    }
}

impl TokenParser for ClapParser {
    type Error = clap::Error;

    fn parse(&self, schema: &CompiledSchema, args: &[String]) -> Result<RawParseResult, Self::Error> {
        let command = self.command(schema);
        let argv = std::iter::once(command.get_name().to_string()).chain(args.iter().cloned());
        let matches = command.try_get_matches_from(argv)?;

        debug!(schema = %schema.name, args = args.len(), "Tokenized arguments");
        Ok(collect_matches(schema, &matches))
    }
}
