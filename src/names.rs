//! Schema-name detection (§6 "Schema name detection")
//!
//! Maps an XML instance document to the schema name that governs it. This
//! is an external collaborator per spec.md §1 (schema queries always take
//! an explicit schema name), but its algorithm is specified precisely
//! enough in §6 to ship as a standalone pure function.

use once_cell::sync::Lazy;
use regex::Regex;

static SCHEMA_LOCATION_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"xsi:noNamespaceSchemaLocation\s*=\s*"([^"]+)""#).unwrap()
});

static ROOT_ELEMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"<\s*([A-Za-z_][\w.\-]*)").unwrap());

/// Detect the schema name that governs an XML instance document.
///
/// 1. If the document carries `xsi:noNamespaceSchemaLocation="…"`, the
///    schema name is the basename of that location with its `.xsd`
///    extension stripped.
/// 2. Otherwise, the schema name is derived from the root element's local
///    name: `aiscript` maps to `aiscripts`, `mdscript` maps to `md`, and any
///    other root name is lowercased as-is.
pub fn detect_schema_name(xml: &str) -> Option<String> {
    if let Some(caps) = SCHEMA_LOCATION_ATTR.captures(xml) {
        let location = &caps[1];
        let basename = location.rsplit(['/', '\\']).next().unwrap_or(location);
        let stem = basename.strip_suffix(".xsd").unwrap_or(basename);
        return Some(stem.to_string());
    }

    let caps = ROOT_ELEMENT.captures(xml)?;
    let root_name = &caps[1];
    let local = root_name.rsplit(':').next().unwrap_or(root_name);

    Some(match local {
        "aiscript" => "aiscripts".to_string(),
        "mdscript" => "md".to_string(),
        other => other.to_lowercase(),
    })
}

/// Read `path` and detect its schema name, per [`detect_schema_name`].
pub fn detect_schema_name_for_file(path: impl AsRef<std::path::Path>) -> std::io::Result<Option<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(detect_schema_name(&content))
}
