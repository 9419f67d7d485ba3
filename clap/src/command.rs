//! Argument registration: [`CompiledSchema`] to [`clap::Command`].

use argschema_core::{Arity, CompiledSchema, FieldKind, FieldSpec};
use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgAction, Command};
use tracing::trace;

/// Builds the clap command tree for `schema`.
///
/// The root command is named by the schema's program name; each dispatch
/// member becomes a subcommand named by its field.
///
/// # Examples
///
/// ```
/// use argschema_core::*;
/// use argschema_clap::build_command;
///
/// let registry = Registry::from_declarations(vec![
///     Declaration::subcommand("Add").field("x", TypeDescriptor::Int),
///     Declaration::app("calc").subcommand_field("add", "Add"),
/// ])
/// .unwrap();
/// let command = build_command(&registry.compile("calc").unwrap());
///
/// assert_eq!(command.get_name(), "calc");
/// assert!(command.find_subcommand("add").is_some());
/// ```
pub fn build_command(schema: &CompiledSchema) -> Command {
    build_level(schema.program_name().to_string(), schema)
}

fn build_level(name: String, schema: &CompiledSchema) -> Command {
    let mut command = Command::new(name);
    if let Some(description) = &schema.metadata.description {
        command = command.about(description.clone());
    }
    if let Some(epilog) = &schema.metadata.epilog {
        command = command.after_help(epilog.clone());
    }
    if schema
        .arguments()
        .any(|spec| spec.flags.iter().any(|f| f == "-h" || f == "--help"))
    {
        command = command.disable_help_flag(true);
    }

    for spec in schema.arguments() {
        command = command.arg(build_arg(spec));
    }
    for member in &schema.dispatch.members {
        let mut subcommand = build_level(member.field.clone(), &member.schema);
        if member.schema.metadata.description.is_none() {
            // field help stands in for a missing description
            if let Some(help) = schema.field(&member.field).and_then(|f| f.help.clone()) {
                subcommand = subcommand.about(help);
            }
        }
        command = command.subcommand(subcommand);
    }
    command
}

/// Registration directive for one non-subcommand field.
fn build_arg(spec: &FieldSpec) -> Arg {
    let mut arg = Arg::new(spec.name.clone()).required(spec.required);

    if spec.kind == FieldKind::Optional {
        let mut shorts = spec.short_flags();
        if let Some(short) = shorts.next() {
            arg = arg.short(short).short_aliases(shorts);
        }
        let mut longs = spec.long_flags().map(str::to_string);
        if let Some(long) = longs.next() {
            arg = arg.long(long).aliases(longs.collect::<Vec<_>>());
        }
    }

    arg = match spec.arity {
        Arity::Exact(0) => arg.action(ArgAction::SetTrue),
        Arity::Exact(n) => arg.action(ArgAction::Set).num_args(n),
        Arity::OptionalOne => arg.action(ArgAction::Set).num_args(0..=1),
        Arity::ZeroOrMore => arg.action(ArgAction::Append).num_args(0..),
        Arity::OneOrMore => arg.action(ArgAction::Append).num_args(1..),
    };

    if !spec.choices.is_empty() {
        arg = arg.value_parser(PossibleValuesParser::new(spec.choices.clone()));
    }
    if let Some(help) = &spec.help {
        arg = arg.help(help.clone());
    }
    if let Some(value_name) = &spec.value_name {
        arg = arg.value_name(value_name.clone());
    }

    trace!(field = %spec.name, kind = ?spec.kind, arity = %spec.arity, "Registered argument");
    arg
}
