//! The generic tagged-record XSD node (§3 SchemaNode, §9 "Tagged variants
//! over subclassing").
//!
//! Every XSD construct (`xs:element`, `xs:complexType`, `xs:sequence`, a
//! facet, `xs:annotation`, …) is the same Rust type, distinguished by its
//! `tag` (the XSD local name, without the `xs:` prefix — this schema
//! family uses that prefix exclusively and no target-namespace semantics,
//! so dropping the prefix loses no information). Every algorithm in this
//! crate dispatches on `tag` rather than on a type hierarchy, matching the
//! reference design.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::locations::SourceLocation;

/// Shared handle to a node. The tree is built once and never mutated
/// (§3 "Lifecycle"), so `Rc` without interior mutability is enough; node
/// identity (`Rc::as_ptr`) is used as the cycle-guard key throughout the
/// crate.
pub type NodeRef = Rc<SchemaNode>;

/// XSD local-name tag constants, used throughout instead of string
/// literals so a typo is a compile error at the call site, not a silent
/// non-match at traversal time.
pub mod tags {
    pub const SCHEMA: &str = "schema";
    pub const ELEMENT: &str = "element";
    pub const COMPLEX_TYPE: &str = "complexType";
    pub const SIMPLE_TYPE: &str = "simpleType";
    pub const ATTRIBUTE: &str = "attribute";
    pub const ATTRIBUTE_GROUP: &str = "attributeGroup";
    pub const GROUP: &str = "group";
    pub const SEQUENCE: &str = "sequence";
    pub const CHOICE: &str = "choice";
    pub const ALL: &str = "all";
    pub const ANY: &str = "any";
    pub const ANNOTATION: &str = "annotation";
    pub const DOCUMENTATION: &str = "documentation";
    pub const EXTENSION: &str = "extension";
    pub const RESTRICTION: &str = "restriction";
    pub const UNION: &str = "union";
    pub const LIST: &str = "list";
    pub const COMPLEX_CONTENT: &str = "complexContent";
    pub const SIMPLE_CONTENT: &str = "simpleContent";
    pub const INCLUDE: &str = "include";
    pub const IMPORT: &str = "import";
    pub const ENUMERATION: &str = "enumeration";
    pub const PATTERN: &str = "pattern";
    pub const MIN_LENGTH: &str = "minLength";
    pub const MAX_LENGTH: &str = "maxLength";
    pub const LENGTH: &str = "length";
    pub const MIN_INCLUSIVE: &str = "minInclusive";
    pub const MAX_INCLUSIVE: &str = "maxInclusive";
    pub const MIN_EXCLUSIVE: &str = "minExclusive";
    pub const MAX_EXCLUSIVE: &str = "maxExclusive";
    pub const TOTAL_DIGITS: &str = "totalDigits";
    pub const FRACTION_DIGITS: &str = "fractionDigits";
    pub const WHITE_SPACE: &str = "whiteSpace";

    /// Structural nodes the resolvers descend through without treating as
    /// element/type boundaries (§4.3 step 4).
    pub const STRUCTURAL: &[&str] = &[
        SEQUENCE,
        CHOICE,
        ALL,
        COMPLEX_TYPE,
        COMPLEX_CONTENT,
        SIMPLE_CONTENT,
        GROUP,
    ];
}

/// XSD attribute name constants.
pub mod attrs {
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const REF: &str = "ref";
    pub const BASE: &str = "base";
    pub const USE: &str = "use";
    pub const VALUE: &str = "value";
    pub const MIN_OCCURS: &str = "minOccurs";
    pub const MAX_OCCURS: &str = "maxOccurs";
    pub const MEMBER_TYPES: &str = "memberTypes";
    pub const SCHEMA_LOCATION: &str = "schemaLocation";
}

/// A node in an XSD tree (§3 SchemaNode).
#[derive(Debug, Clone)]
pub struct SchemaNode {
    /// The XSD local name, e.g. `"element"`, `"complexType"`, `"sequence"`
    pub tag: String,
    /// Attributes in source order
    pub attributes: IndexMap<String, String>,
    /// Child nodes in source order (text-only children are not retained
    /// except as `text`, below — this engine never validates element text
    /// content, only documentation strings)
    pub children: Vec<NodeRef>,
    /// Concatenated text content of this node (used for `xs:documentation`)
    pub text: Option<String>,
    /// Where this node's start tag appears in its source file
    pub location: SourceLocation,
}

impl SchemaNode {
    /// Get an attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    /// The `name` attribute, if present
    pub fn name(&self) -> Option<&str> {
        self.attr(attrs::NAME)
    }

    /// Identity key for cycle guards: stable for the node's lifetime since
    /// the tree is immutable after construction.
    pub fn identity(self: &NodeRef) -> usize {
        Rc::as_ptr(self) as usize
    }

    /// Direct children whose tag matches `tag`
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a NodeRef> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// First direct child whose tag matches `tag`
    pub fn first_child_named(&self, tag: &str) -> Option<&NodeRef> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Text of this node's `xs:annotation/xs:documentation` child, trimmed.
    /// §4.4/§4.6: annotation text is harvested this way throughout.
    pub fn annotation_text(&self) -> Option<String> {
        let annotation = self.first_child_named(tags::ANNOTATION)?;
        let doc = annotation.first_child_named(tags::DOCUMENTATION)?;
        let text = doc.text.as_deref().unwrap_or("").trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }

    /// Whether this is a structural node the resolvers transparently descend
    /// through (sequence/choice/all/complexType/complexContent/
    /// simpleContent/group) — §4.3 step 4.
    pub fn is_structural(&self) -> bool {
        tags::STRUCTURAL.contains(&self.tag.as_str())
    }
}

/// Pure free function form of `extract_annotation_text` (§6 static helper).
pub fn extract_annotation_text(node: &NodeRef) -> Option<String> {
    node.annotation_text()
}
