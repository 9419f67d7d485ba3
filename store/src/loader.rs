//! Declaration loading with builder pattern and fallback chains.
//!
//! Provides [`DeclarationStore`] for loading declarations from disk into a
//! [`Registry`] and [`StoreBuilder`] for trying several sources in order.
//!
//! # Loading patterns
//!
//! ```no_run
//! use argschema_store::DeclarationStore;
//!
//! // A directory with one declaration per file
//! let store = DeclarationStore::from_dir("declarations/").unwrap();
//! let schema = store.registry().compile("git").unwrap();
//!
//! // A single DeclarationPackage bundle (JSON or YAML)
//! let store = DeclarationStore::from_bundle("cli.yaml").unwrap();
//!
//! // A fallback chain
//! let store = DeclarationStore::builder()
//!     .from_dir("declarations/")
//!     .from_bundle("cli.json")
//!     .build()
//!     .unwrap();
//! ```

use std::path::{Path, PathBuf};

use argschema_core::{Declaration, DeclarationPackage, Registry, SCHEMA_CONTRACT_VERSION};
use tracing::{debug, warn};

use crate::error::{Result, StoreError};

/// Serialization format of a declaration file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Detects the format from a path's extension (`.json`, `.yaml`, `.yml`).
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(Format::Json),
            Some("yaml" | "yml") => Some(Format::Yaml),
            _ => None,
        }
    }
}

/// Describes where a [`DeclarationStore`] was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSource {
    /// A directory of individual declaration files.
    Directory(PathBuf),
    /// A single [`DeclarationPackage`] file.
    Bundle(PathBuf),
    /// A fallback chain of multiple sources.
    Multiple(Vec<StoreSource>),
}

/// Declarations loaded from disk, registered in a [`Registry`].
///
/// Every loaded declaration passes registration checks (well-formed names,
/// flags and no duplicates), so a loaded store is ready for compilation.
#[derive(Debug)]
pub struct DeclarationStore {
    registry: Registry,
    source: StoreSource,
}

impl DeclarationStore {
    /// Returns a new [`StoreBuilder`] for configuring a fallback chain.
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Loads one [`Declaration`] per `*.json`, `*.yaml` or `*.yml` file.
    ///
    /// Files are registered in file-name order so the resulting registry is
    /// the same on every platform. Other files are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IoError`] if the directory or a file cannot be
    /// read, a JSON or YAML error if a file is malformed, or
    /// [`StoreError::Configuration`] if a declaration is rejected.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let file_path = entry?.path();
            match Format::from_path(&file_path) {
                Some(format) => files.push((file_path, format)),
                None => debug!(path = %file_path.display(), "Skipping non-declaration file"),
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let mut registry = Registry::new();
        for (file_path, format) in files {
            let contents = std::fs::read_to_string(&file_path)?;
            let declaration: Declaration = match format {
                Format::Json => serde_json::from_str(&contents)?,
                Format::Yaml => serde_yaml::from_str(&contents)?,
            };
            debug!(
                path = %file_path.display(),
                declaration = %declaration.name,
                "Loaded declaration"
            );
            registry.register(declaration)?;
        }

        Ok(Self {
            registry,
            source: StoreSource::Directory(path.to_path_buf()),
        })
    }

    /// Loads a [`DeclarationPackage`] from a JSON or YAML file.
    ///
    /// Files without a recognized extension are read as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IoError`] if the file cannot be read, a JSON or
    /// YAML error if parsing fails, [`StoreError::InvalidPackage`] if the
    /// package targets an incompatible contract version, or
    /// [`StoreError::Configuration`] if a declaration is rejected.
    pub fn from_bundle(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let package = read_package(path)?;
        check_contract_version(&package)?;

        debug!(
            path = %path.display(),
            declarations = package.declaration_count(),
            "Loaded package"
        );
        Ok(Self {
            registry: package.into_registry()?,
            source: StoreSource::Bundle(path.to_path_buf()),
        })
    }

    /// Loads from a directory or a bundle file, whichever `path` is.
    ///
    /// # Errors
    ///
    /// See [`DeclarationStore::from_dir`] and
    /// [`DeclarationStore::from_bundle`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::from_dir(path)
        } else {
            Self::from_bundle(path)
        }
    }

    /// Looks up a declaration by name.
    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.registry.get(name)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Declaration names in load order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registry.names()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    /// Returns a reference to the source metadata.
    pub fn source(&self) -> &StoreSource {
        &self.source
    }

    /// Packages every loaded declaration, in load order.
    pub fn to_package(
        &self,
        version: impl Into<String>,
        generated_at: impl Into<String>,
    ) -> DeclarationPackage {
        let mut package = DeclarationPackage::new(version, generated_at);
        package.declarations = self.registry.declarations().to_vec();
        package
    }
}

/// Reads a package file, choosing the format by extension.
///
/// # Errors
///
/// Returns [`StoreError::IoError`] if the file cannot be read, or a JSON or
/// YAML error if parsing fails.
pub fn read_package(path: impl AsRef<Path>) -> Result<DeclarationPackage> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    let package = match Format::from_path(path) {
        Some(Format::Yaml) => serde_yaml::from_str(&contents)?,
        Some(Format::Json) | None => serde_json::from_str(&contents)?,
    };
    Ok(package)
}

/// Writes a package to `path`, as YAML for `.yaml`/`.yml` and JSON otherwise.
///
/// # Errors
///
/// Returns [`StoreError::IoError`] if the file cannot be written, or a
/// serialization error.
pub fn write_package(package: &DeclarationPackage, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let contents = match Format::from_path(path) {
        Some(Format::Yaml) => serde_yaml::to_string(package)?,
        Some(Format::Json) | None => {
            let mut json = serde_json::to_string_pretty(package)?;
            json.push('\n');
            json
        }
    };
    std::fs::write(path, contents)?;
    debug!(
        path = %path.display(),
        declarations = package.declaration_count(),
        "Wrote package"
    );
    Ok(())
}

/// Rejects packages written for a different major contract version.
///
/// Packages without a `schema_version` are accepted as current.
fn check_contract_version(package: &DeclarationPackage) -> Result<()> {
    let Some(version) = package.schema_version.as_deref() else {
        return Ok(());
    };
    let major = |v: &str| v.split('.').next().unwrap_or_default().to_string();
    if major(version) != major(SCHEMA_CONTRACT_VERSION) {
        return Err(StoreError::InvalidPackage(format!(
            "unsupported schema_version {version} (expected {SCHEMA_CONTRACT_VERSION})"
        )));
    }
    Ok(())
}

/// Builder for constructing a [`DeclarationStore`] with a fallback chain.
///
/// Sources are tried in the order they are added. The first successful load
/// wins; if all fail, [`StoreError::NoSourcesAvailable`] is returned.
///
/// # Example
///
/// ```no_run
/// use argschema_store::DeclarationStore;
///
/// let store = DeclarationStore::builder()
///     .from_dir("/etc/mytool/declarations/")
///     .from_bundle("/usr/share/mytool/cli.json")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Default)]
pub struct StoreBuilder {
    sources: Vec<StoreSource>,
}

impl StoreBuilder {
    /// Creates a new builder with no sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory of declaration files as a source.
    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(StoreSource::Directory(path.into()));
        self
    }

    /// Adds a [`DeclarationPackage`] file as a source.
    pub fn from_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(StoreSource::Bundle(path.into()));
        self
    }

    /// Attempts to load declarations from configured sources in order.
    ///
    /// Returns the first successfully loaded store. If all sources fail,
    /// returns [`StoreError::NoSourcesAvailable`].
    pub fn build(self) -> Result<DeclarationStore> {
        if self.sources.is_empty() {
            return Err(StoreError::NoSourcesAvailable);
        }

        for source in &self.sources {
            let result = match source {
                StoreSource::Directory(path) => DeclarationStore::from_dir(path),
                StoreSource::Bundle(path) => DeclarationStore::from_bundle(path),
                StoreSource::Multiple(_) => continue,
            };

            match result {
                Ok(mut store) => {
                    store.source = StoreSource::Multiple(self.sources.clone());
                    return Ok(store);
                }
                Err(err) => warn!(source = ?source, error = %err, "Declaration source failed"),
            }
        }

        Err(StoreError::NoSourcesAvailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argschema_core::TypeDescriptor;

    fn write_json(dir: &Path, declaration: &Declaration) {
        let path = dir.join(format!("{}.json", declaration.name));
        std::fs::write(path, serde_json::to_string_pretty(declaration).unwrap()).unwrap();
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("a.json")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("a.yml")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("a.yaml")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("README.md")), None);
    }

    #[test]
    fn test_from_dir_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write_json(dir.path(), &Declaration::subcommand("b"));
        write_json(dir.path(), &Declaration::subcommand("a"));
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = DeclarationStore::from_dir(dir.path()).unwrap();
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(
            store.source(),
            &StoreSource::Directory(dir.path().to_path_buf())
        );
    }

    #[test]
    fn test_from_dir_rejects_duplicate_names() {
        let dir = tempfile::tempdir().unwrap();
        write_json(dir.path(), &Declaration::app("tool"));
        std::fs::write(
            dir.path().join("tool2.yaml"),
            "name: tool\nfields: []\n",
        )
        .unwrap();

        let err = DeclarationStore::from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }

    #[test]
    fn test_bundle_contract_version_checked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.json");

        let mut package = DeclarationPackage::new("1.0.0", "2024-01-01T00:00:00Z");
        package.schema_version = Some("2.0.0".into());
        write_package(&package, &path).unwrap();
        assert!(matches!(
            DeclarationStore::from_bundle(&path).unwrap_err(),
            StoreError::InvalidPackage(_)
        ));

        package.schema_version = None;
        package
            .declarations
            .push(Declaration::app("echo").field("text", TypeDescriptor::Str));
        write_package(&package, &path).unwrap();
        let store = DeclarationStore::from_bundle(&path).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_open_dispatches_on_path_kind() {
        let dir = tempfile::tempdir().unwrap();
        write_json(dir.path(), &Declaration::app("echo"));
        assert!(matches!(
            DeclarationStore::open(dir.path()).unwrap().source(),
            StoreSource::Directory(_)
        ));

        let bundle = dir.path().join("bundle.yaml");
        let store = DeclarationStore::open(dir.path()).unwrap();
        write_package(&store.to_package("1.0.0", "2024-01-01T00:00:00Z"), &bundle).unwrap();
        assert!(matches!(
            DeclarationStore::open(&bundle).unwrap().source(),
            StoreSource::Bundle(_)
        ));
    }

    #[test]
    fn test_builder_empty() {
        assert!(matches!(
            StoreBuilder::new().build().unwrap_err(),
            StoreError::NoSourcesAvailable
        ));
    }
}
