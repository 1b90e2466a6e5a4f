//! SchemaDoc: a parsed XSD tree plus its included documents (§4.1)

use std::path::Path;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{Error, ParseError, Result};
use crate::locations::{line_column_at, scan_start_tag_length, Location};
use crate::node::{tags, NodeRef, SchemaNode};

/// A parsed XSD document: the `xs:schema` root's children, with any
/// `xs:include`d documents already merged in (§4.1).
///
/// Immutable once built (§3 "Lifecycle").
#[derive(Debug, Clone)]
pub struct SchemaDoc {
    /// Direct children of the (possibly merged) `xs:schema` root, in the
    /// order main document followed by each include in discovery order.
    pub children: Vec<NodeRef>,
    /// URI of the main schema file, for diagnostics
    pub source_uri: String,
}

impl SchemaDoc {
    /// Parse a single XSD document (no include merging) from its text.
    pub fn from_str(xml: &str, location: &Location) -> Result<Self> {
        let uri = location.to_uri();
        let doc = roxmltree::Document::parse(xml).map_err(|e| {
            Error::Parse(
                ParseError::new(format!("failed to parse XSD: {e}")).with_location(uri.clone()),
            )
        })?;

        let root = doc.root_element();
        if local_name(root.tag_name().name()) != tags::SCHEMA {
            return Err(Error::Parse(ParseError::new(format!(
                "expected root element 'xs:schema', found '{}'",
                root.tag_name().name()
            ))));
        }

        let children = root
            .children()
            .filter(|n| n.is_element())
            .map(|n| convert_node(n, xml, &uri))
            .collect();

        Ok(Self {
            children,
            source_uri: uri,
        })
    }

    /// Parse an XSD document from a file path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|e| {
            Error::Resource(format!("failed to read schema file '{}': {e}", path.display()))
        })?;
        let location = Location::Path(path.to_path_buf());
        Self::from_str(&xml, &location)
    }

    /// Merge another document's top-level children into this one
    /// (§4.1 `merge(main, include)`).
    ///
    /// Structural only: no conflict detection. Duplicate names simply
    /// coexist in the resulting index lists, matching the reference
    /// behavior. Since `SchemaNode`s are immutable after construction,
    /// sharing the include's `Rc` children is equivalent to a deep copy.
    pub fn merge(&mut self, include: &SchemaDoc) {
        self.children.extend(include.children.iter().cloned());
    }
}

fn local_name(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}

fn convert_node(node: roxmltree::Node, source: &str, uri: &str) -> NodeRef {
    let mut attributes = IndexMap::new();
    for attr in node.attributes() {
        attributes.insert(attr.name().to_string(), attr.value().to_string());
    }

    let children: Vec<NodeRef> = node
        .children()
        .filter(|n| n.is_element())
        .map(|n| convert_node(n, source, uri))
        .collect();

    let text = if node.children().all(|c| !c.is_element()) {
        let joined: String = node.children().filter_map(|c| c.text()).collect();
        let joined = joined.trim();
        if joined.is_empty() {
            None
        } else {
            Some(joined.to_string())
        }
    } else {
        None
    };

    let start = node.range().start;
    let (line, column) = line_column_at(source, start);
    let length_of_start_tag = scan_start_tag_length(source, start);

    Rc::new(SchemaNode {
        tag: local_name(node.tag_name().name()).to_string(),
        attributes,
        children,
        text,
        location: crate::locations::SourceLocation {
            uri: uri.to_string(),
            line,
            column,
            length_of_start_tag,
        },
    })
}
