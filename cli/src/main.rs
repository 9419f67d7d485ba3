use std::fs;
use std::path::{Path, PathBuf};

use argschema_clap::ClapParser;
use argschema_core::{ParseError, Registry};
use argschema_store::{DeclarationStore, write_package};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "argschema")]
#[command(about = "Validate, bundle and run declarative CLI schemas")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load declarations and compile every one of them.
    Validate(ValidateArgs),
    /// Print the compiled schema of one declaration.
    Inspect(InspectArgs),
    /// Bundle declaration files into a single DeclarationPackage file.
    Bundle(BundleArgs),
    /// Parse arguments against a declaration and print the typed instance.
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Declaration files, package files or directories.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// Declaration file, package file or directory (repeatable).
    #[arg(long = "decl", required = true)]
    decls: Vec<PathBuf>,
    /// Declaration to compile.
    #[arg(long)]
    name: String,
    /// Output format.
    #[arg(long, value_enum, default_value = "json")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct BundleArgs {
    /// Declaration files, package files or directories.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Output package path (`.yaml`/`.yml` for YAML, JSON otherwise).
    #[arg(long)]
    output: PathBuf,
    /// Optional package name.
    #[arg(long)]
    name: Option<String>,
    /// Optional package description.
    #[arg(long)]
    description: Option<String>,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Declaration file, package file or directory (repeatable).
    #[arg(long = "decl", required = true)]
    decls: Vec<PathBuf>,
    /// Declaration to parse against.
    #[arg(long)]
    name: String,
    /// Output format.
    #[arg(long, value_enum, default_value = "json")]
    format: CliOutputFormat,
    /// Arguments for the declared CLI, after `--`.
    #[arg(last = true)]
    args: Vec<String>,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Validate(args) => run_validate(args),
        Command::Inspect(args) => run_inspect(args),
        Command::Bundle(args) => run_bundle(args),
        Command::Run(args) => run_run(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the default filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("argschema=warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Loads every input into one registry, in argument order.
fn load_registry(inputs: &[PathBuf]) -> Result<Registry, String> {
    let mut registry = Registry::new();
    for input in inputs {
        let store = DeclarationStore::open(input)
            .map_err(|err| format!("Failed to load '{}': {err}", input.display()))?;
        debug!(path = %input.display(), declarations = store.len(), "Loaded input");
        for declaration in store.into_registry().declarations() {
            registry
                .register(declaration.clone())
                .map_err(|err| format!("'{}': {err}", input.display()))?;
        }
    }
    Ok(registry)
}

fn render<T: Serialize>(value: &T, format: CliOutputFormat) -> Result<String, String> {
    match format {
        CliOutputFormat::Json => serde_json::to_string_pretty(value).map_err(|err| err.to_string()),
        CliOutputFormat::Yaml => serde_yaml::to_string(value).map_err(|err| err.to_string()),
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let registry = load_registry(&args.inputs)?;
    let schemas = registry.compile_all().map_err(|err| err.to_string())?;
    println!(
        "Validated {} declaration(s) from {} input(s).",
        schemas.len(),
        args.inputs.len()
    );
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<(), String> {
    let registry = load_registry(&args.decls)?;
    let schema = registry.compile(&args.name).map_err(|err| err.to_string())?;
    println!("{}", render(schema.as_ref(), args.format)?.trim_end());
    Ok(())
}

fn run_bundle(args: BundleArgs) -> Result<(), String> {
    let registry = load_registry(&args.inputs)?;
    registry.compile_all().map_err(|err| err.to_string())?;

    let mut package = argschema_core::DeclarationPackage::new(
        PACKAGE_VERSION,
        chrono::Utc::now().to_rfc3339(),
    );
    package.name = args.name;
    package.description = args.description;
    package.declarations = registry.declarations().to_vec();

    create_parent_dir(&args.output)?;
    write_package(&package, &args.output)
        .map_err(|err| format!("Failed to write '{}': {err}", args.output.display()))?;

    println!(
        "Bundled {} declaration(s) into '{}'.",
        package.declaration_count(),
        args.output.display()
    );
    Ok(())
}

fn run_run(args: RunArgs) -> Result<(), String> {
    let registry = load_registry(&args.decls)?;
    let instance = match registry.parse(&args.name, &ClapParser::new(), &args.args) {
        Ok(instance) => instance,
        // clap prints usage errors and help itself and picks the exit code
        Err(ParseError::Usage(err)) => err.exit(),
        Err(ParseError::Materialization(err)) => return Err(err.to_string()),
    };
    println!("{}", render(&instance, args.format)?.trim_end());
    Ok(())
}

fn create_parent_dir(path: &Path) -> Result<(), String> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(parent).map_err(|err| {
        format!(
            "Failed to create output directory '{}': {err}",
            parent.display()
        )
    })
}
