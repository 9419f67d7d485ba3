//! Loading and bundling of declaration files.
//!
//! This crate reads [`Declaration`](argschema_core::Declaration)s from disk
//! (a directory with one declaration per file, or a single
//! [`DeclarationPackage`](argschema_core::DeclarationPackage) bundle in JSON
//! or YAML) into a ready-to-compile
//! [`Registry`](argschema_core::Registry), and writes packages back out.
//!
//! # Quick start
//!
//! ```no_run
//! use argschema_store::{DeclarationStore, write_package};
//!
//! let store = DeclarationStore::builder()
//!     .from_dir("declarations/")
//!     .from_bundle("cli.yaml")
//!     .build()
//!     .unwrap();
//! let schema = store.registry().compile("git").unwrap();
//! println!("{} has {} fields", schema.name, schema.fields.len());
//!
//! // Bundle everything into a single file
//! let package = store.to_package("1.0.0", "2024-01-15T10:30:00Z");
//! write_package(&package, "bundle.json").unwrap();
//! ```

mod error;
mod loader;

pub use error::{Result, StoreError};
pub use loader::{
    DeclarationStore, Format, StoreBuilder, StoreSource, read_package, write_package,
};
