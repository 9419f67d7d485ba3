//! Calculator built from declarations.
//!
//! Declares an application root with two subcommands through the builder
//! API, parses argv with the clap adapter and evaluates the selected
//! subcommand.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p argschema-demos --example calculator -- add --numbers 1 2 3.5
//! cargo run -p argschema-demos --example calculator -- --precision 4 divide 1 3
//! ```

use argschema_clap::ClapParser;
use argschema_core::{
    ArgumentMeta, Arity, Declaration, ParseError, Registry, TypeDescriptor,
};

fn registry() -> Registry {
    Registry::from_declarations(vec![
        Declaration::subcommand("Add")
            .description("Add numbers together")
            .field_with(
                "numbers",
                TypeDescriptor::list(TypeDescriptor::Float),
                ArgumentMeta::new()
                    .flag("-n")
                    .flag("--numbers")
                    .arity(Arity::OneOrMore)
                    .help("Numbers to add"),
            ),
        Declaration::subcommand("Divide")
            .description("Divide two numbers")
            .field("dividend", TypeDescriptor::Float)
            .field("divisor", TypeDescriptor::Float),
        Declaration::app("calc")
            .description("A tiny calculator")
            .epilog("Numbers accept any float syntax, e.g. 1e-3.")
            .field_with(
                "precision",
                TypeDescriptor::Int,
                ArgumentMeta::new()
                    .flag("-p")
                    .flag("--precision")
                    .default_value(2_i64)
                    .help("Digits after the decimal point"),
            )
            .subcommand_field("add", "Add")
            .subcommand_field("divide", "Divide"),
    ])
    .expect("calculator declarations are valid")
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let instance = match registry().parse("calc", &ClapParser::new(), &args) {
        Ok(instance) => instance,
        Err(ParseError::Usage(err)) => err.exit(),
        Err(ParseError::Materialization(err)) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    let precision = instance.get_as::<i64>("precision").unwrap_or(2) as usize;
    let result = match instance.selected() {
        Some(("add", add)) => add.get_as::<Vec<f64>>("numbers").unwrap().iter().sum(),
        Some(("divide", divide)) => {
            divide.get_as::<f64>("dividend").unwrap() / divide.get_as::<f64>("divisor").unwrap()
        }
        _ => {
            eprintln!("no operation selected (try `add` or `divide`)");
            std::process::exit(2);
        }
    };
    println!("{result:.precision$}");
}
