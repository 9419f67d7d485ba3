//! Collection: [`clap::ArgMatches`] to [`RawParseResult`].

use argschema_core::{Arity, CompiledSchema, RawParseResult, RawValue};
use clap::ArgMatches;
use clap::parser::ValueSource;

/// Reports every argument of `schema` that appeared on the command line.
///
/// Values clap filled in itself (such as `false` for an unset `SetTrue`
/// flag) are left out; defaults are applied by the materializer.
pub fn collect_matches(schema: &CompiledSchema, matches: &ArgMatches) -> RawParseResult {
    let mut raw = RawParseResult::new();

    for spec in schema.arguments() {
        if matches.value_source(&spec.name) != Some(ValueSource::CommandLine) {
            continue;
        }
        let value = if spec.arity == Arity::Exact(0) {
            RawValue::Present
        } else {
            let mut tokens: Vec<String> = matches
                .get_many::<String>(&spec.name)
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            match tokens.len() {
                0 => RawValue::Present,
                1 if spec.arity.max() == Some(1) => RawValue::Token(tokens.remove(0)),
                _ => RawValue::Tokens(tokens),
            }
        };
        raw.insert(spec.name.clone(), value);
    }

    if let Some((name, sub_matches)) = matches.subcommand() {
        if let Some(nested) = schema.subcommand(name) {
            raw.select(name, collect_matches(nested, sub_matches));
        }
    }
    raw
}
