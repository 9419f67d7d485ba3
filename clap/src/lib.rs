//! [clap](https://docs.rs/clap) adapter for argschema.
//!
//! [`build_command`] registers a
//! [`CompiledSchema`](argschema_core::CompiledSchema) tree as a
//! [`clap::Command`], [`collect_matches`] turns the resulting
//! [`clap::ArgMatches`] into a
//! [`RawParseResult`](argschema_core::RawParseResult), and [`ClapParser`]
//! ties both together as a [`TokenParser`](argschema_core::TokenParser).
//!
//! Only values that appeared on the command line are reported; defaults
//! stay with the engine so they go through the same resolution as tokens.

mod command;
mod matches;
mod parser;

pub use command::build_command;
pub use matches::collect_matches;
pub use parser::ClapParser;
