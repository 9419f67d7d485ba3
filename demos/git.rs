//! Three-level subcommand tree with shared options.
//!
//! `Common` contributes `--quiet` to several subcommands through
//! inheritance, `remote` nests its own dispatch group, and the materialized
//! instance is decoded into plain serde structs.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p argschema-demos --example git -- remote add origin https://example.com/repo.git
//! cargo run -p argschema-demos --example git -- status -q --porcelain
//! ```

use argschema_clap::ClapParser;
use argschema_core::{ArgumentMeta, Declaration, Registry, TypeDescriptor};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Git {
    remote: Option<Remote>,
    status: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct Remote {
    add: Option<RemoteAdd>,
    remove: Option<RemoteRemove>,
}

#[derive(Debug, Deserialize)]
struct RemoteAdd {
    quiet: bool,
    name: String,
    url: String,
    fetch: bool,
}

#[derive(Debug, Deserialize)]
struct RemoteRemove {
    quiet: bool,
    name: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    quiet: bool,
    porcelain: bool,
    paths: Vec<String>,
}

fn registry() -> Registry {
    Registry::from_declarations(vec![
        Declaration::subcommand("Common").field_with(
            "quiet",
            TypeDescriptor::Bool,
            ArgumentMeta::new().flag("-q").flag("--quiet"),
        ),
        Declaration::subcommand("RemoteAdd")
            .extends("Common")
            .description("Add a remote")
            .field("name", TypeDescriptor::Str)
            .field("url", TypeDescriptor::Str)
            .field_with(
                "fetch",
                TypeDescriptor::Bool,
                ArgumentMeta::new().flag("-f").help("Fetch after adding"),
            ),
        Declaration::subcommand("RemoteRemove")
            .extends("Common")
            .description("Remove a remote")
            .field("name", TypeDescriptor::Str),
        Declaration::subcommand("Remote")
            .description("Manage remotes")
            .subcommand_field("add", "RemoteAdd")
            .subcommand_field("remove", "RemoteRemove"),
        Declaration::subcommand("Status")
            .extends("Common")
            .description("Show the working tree status")
            .field_with(
                "porcelain",
                TypeDescriptor::Bool,
                ArgumentMeta::new().flag("--porcelain"),
            )
            .field("paths", TypeDescriptor::list(TypeDescriptor::Str)),
        Declaration::app("git")
            .subcommand_field("remote", "Remote")
            .subcommand_field("status", "Status"),
    ])
    .expect("git declarations are valid")
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let instance = match registry().parse("git", &ClapParser::new(), &args) {
        Ok(instance) => instance,
        Err(argschema_core::ParseError::Usage(err)) => err.exit(),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    println!("{}", serde_json::to_string_pretty(&instance.to_json()).unwrap());

    let git: Git = instance.decode().expect("instance matches the Git struct");
    match git {
        Git { remote: Some(Remote { add: Some(add), .. }), .. } => {
            println!(
                "would add remote {} -> {} (fetch: {}, quiet: {})",
                add.name, add.url, add.fetch, add.quiet
            );
        }
        Git { remote: Some(Remote { remove: Some(remove), .. }), .. } => {
            println!("would remove remote {} (quiet: {})", remove.name, remove.quiet);
        }
        Git { status: Some(status), .. } => {
            println!(
                "status of {:?} (porcelain: {}, quiet: {})",
                status.paths, status.porcelain, status.quiet
            );
        }
        _ => println!("nothing to do"),
    }
}
