//! Declarations from YAML files.
//!
//! Writes a small `serve` declaration to a temporary directory, loads it
//! with `DeclarationStore`, bundles it into a single package and parses a
//! command line against it.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p argschema-demos --example load_declarations
//! ```

use argschema_clap::ClapParser;
use argschema_store::{DeclarationStore, write_package};

const SERVE: &str = r#"
name: serve
description: Serve a directory over HTTP
fields:
  - name: root
    annotation: path
    help: Directory to serve
  - name: port
    annotation: int
    flags: ["-p", "--port"]
    default: 8080
  - name: bind
    annotation: ip
    flags: ["--bind"]
    default: "127.0.0.1"
  - name: mode
    annotation: "enum[Mode: dev, prod]"
    flags: ["--mode"]
    default: dev
  - name: header
    annotation: "map[str, str]"
    flags: ["-H", "--header"]
"#;

fn main() {
    let dir = std::env::temp_dir().join("argschema_example_declarations");
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("serve.yaml"), SERVE).unwrap();

    let store = DeclarationStore::from_dir(&dir).unwrap();
    println!("Loaded {} declaration(s) from {:?}", store.len(), store.source());

    let schema = store.registry().compile("serve").unwrap();
    for field in &schema.fields {
        println!(
            "  {:<8} {:<12} arity={} required={} default={:?}",
            field.name,
            field.coercion.to_string(),
            field.arity,
            field.required,
            field.default
        );
    }

    let args: Vec<String> = ["/srv/www", "-p", "9000", "-H", "X-Env=dev", "--mode", "prod"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let instance = store
        .registry()
        .parse("serve", &ClapParser::new(), &args)
        .unwrap();
    println!();
    println!("{}", serde_json::to_string_pretty(&instance.to_json()).unwrap());

    let bundle = dir.join("bundle.json");
    write_package(&store.to_package("1.0.0", "2024-01-01T00:00:00Z"), &bundle).unwrap();
    let reloaded = DeclarationStore::from_bundle(&bundle).unwrap();
    println!();
    println!("Bundle round-trip: {} declaration(s)", reloaded.len());

    std::fs::remove_dir_all(&dir).ok();
}
