//! Schema file loading and include resolution (§6 Engine constructor)
//!
//! This is system-boundary plumbing, not core algorithm (§1 calls file I/O
//! and include resolution an external collaborator in the abstract); it's
//! implemented here in the small, local-filesystem-only shape §6 actually
//! specifies so the crate is usable standalone.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::documents::SchemaDoc;
use crate::error::{Error, Result};
use crate::limits::EngineLimits;
use crate::locations::Location;
use crate::node::{attrs, tags};

/// Loads `{schemaName}.xsd` from a directory, discovering and merging
/// `xs:include`s transitively.
#[derive(Debug, Clone)]
pub struct Loader {
    directory: PathBuf,
    limits: EngineLimits,
}

impl Loader {
    /// Create a loader rooted at `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            limits: EngineLimits::default(),
        }
    }

    /// Override the limits used for include-depth guarding.
    pub fn with_limits(mut self, limits: EngineLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Load `{schema_name}.xsd` and merge in every discoverable include,
    /// depth-first, in document order, each file included at most once.
    pub fn load_schema(&self, schema_name: &str) -> Result<SchemaDoc> {
        let main_path = self.directory.join(format!("{schema_name}.xsd"));
        if !main_path.is_file() {
            return Err(Error::Resource(format!(
                "schema file not found: {}",
                main_path.display()
            )));
        }

        let mut visited = HashSet::new();
        self.load_path(&main_path, &mut visited)
    }

    fn load_path(&self, path: &Path, visited: &mut HashSet<PathBuf>) -> Result<SchemaDoc> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if !visited.insert(canonical.clone()) {
            tracing::debug!(path = %path.display(), "include already visited, skipping");
            return Ok(SchemaDoc {
                children: Vec::new(),
                source_uri: Location::Path(path.to_path_buf()).to_uri(),
            });
        }

        if visited.len() > self.limits.max_descent_depth.max(100) {
            return Err(Error::LimitExceeded(format!(
                "include chain exceeds depth limit while loading '{}'",
                path.display()
            )));
        }

        let mut doc = SchemaDoc::load(path)?;

        let include_files: Vec<String> = doc
            .children
            .iter()
            .filter(|n| n.tag == tags::INCLUDE)
            .filter_map(|n| n.attr(attrs::SCHEMA_LOCATION).map(|s| s.to_string()))
            .collect();

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        for file in include_files {
            let include_path = parent.join(&file);
            if include_path.is_file() {
                tracing::debug!(include = %include_path.display(), "merging xs:include");
                let included = self.load_path(&include_path, visited)?;
                doc.merge(&included);
            } else {
                tracing::warn!(
                    include = %include_path.display(),
                    "xs:include schemaLocation not found, skipping"
                );
            }
        }

        Ok(doc)
    }

    /// List `.xsd` files in the directory (basenames without extension),
    /// for `getDiscoverableSchemas` (§6).
    pub fn discoverable_schemas(&self) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(&self.directory) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("xsd") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        names.push(stem.to_string());
                    }
                }
            }
        }
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_schema_not_found() {
        let dir = tempdir().unwrap();
        let loader = Loader::new(dir.path());
        assert!(loader.load_schema("missing").is_err());
    }

    #[test]
    fn test_load_schema_with_include() {
        let dir = tempdir().unwrap();

        let mut main = std::fs::File::create(dir.path().join("main.xsd")).unwrap();
        write!(
            main,
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:include schemaLocation="shared.xsd"/>
  <xs:element name="root"/>
</xs:schema>"#
        )
        .unwrap();

        let mut shared = std::fs::File::create(dir.path().join("shared.xsd")).unwrap();
        write!(
            shared,
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:simpleType name="SharedType">
    <xs:restriction base="xs:string"/>
  </xs:simpleType>
</xs:schema>"#
        )
        .unwrap();

        let loader = Loader::new(dir.path());
        let doc = loader.load_schema("main").unwrap();

        let names: Vec<_> = doc.children.iter().filter_map(|n| n.name()).collect();
        assert!(names.contains(&"root"));
        assert!(names.contains(&"SharedType"));
    }

    #[test]
    fn test_discoverable_schemas() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("aiscripts.xsd"), "<xs:schema/>").unwrap();
        std::fs::write(dir.path().join("md.xsd"), "<xs:schema/>").unwrap();
        std::fs::write(dir.path().join("readme.txt"), "not a schema").unwrap();

        let loader = Loader::new(dir.path());
        let schemas = loader.discoverable_schemas();
        assert_eq!(schemas, vec!["aiscripts".to_string(), "md".to_string()]);
    }
}
