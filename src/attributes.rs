//! AttributeCollector: the attribute surface of one element declaration
//! (§4.4)

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::locations::SourceLocation;
use crate::node::{attrs, tags, NodeRef};
use crate::types::TypeResolver;

/// One attribute on one element declaration, with its restriction metadata
/// already resolved (§3 "AttributeDescriptor").
#[derive(Debug, Clone)]
pub struct AttributeDescriptor {
    pub name: String,
    pub type_name: Option<String>,
    pub required: bool,
    pub location: Option<SourceLocation>,
    pub annotation: Option<String>,
    pub enum_values: Option<Vec<EnumValue>>,
    pub patterns: Option<Vec<String>>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_inclusive: Option<String>,
    pub max_inclusive: Option<String>,
    pub min_exclusive: Option<String>,
    pub max_exclusive: Option<String>,
}

/// One enumerated value and its documentation, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub value: String,
    pub annotation: Option<String>,
}

/// Collects the de-duplicated attribute surface of a declaration node
/// (§4.4), given a `TypeResolver` to fill in restriction facets for typed
/// attributes.
pub struct AttributeCollector<'a> {
    types: &'a TypeResolver<'a>,
}

#[derive(Default)]
struct Guards {
    types: HashSet<String>,
    groups: HashSet<String>,
    attr_groups: HashSet<String>,
    attr_group_refs: HashSet<String>,
}

impl<'a> AttributeCollector<'a> {
    pub fn new(types: &'a TypeResolver<'a>) -> Self {
        Self { types }
    }

    /// Collect the attribute surface of `declaration`, in first-encountered
    /// order, each attribute's facets resolved.
    pub fn collect(&self, declaration: &NodeRef) -> Vec<AttributeDescriptor> {
        let mut seen = IndexMap::new();
        let mut guards = Guards::default();
        self.walk(declaration, &mut seen, &mut guards);
        seen.into_values().map(|raw| self.finish(raw)).collect()
    }

    fn walk(&self, node: &NodeRef, seen: &mut IndexMap<String, RawAttribute>, guards: &mut Guards) {
        // A declaration's own `type="T"` or inline `xs:complexType` child
        // widens the attribute search into the named/inline type.
        if let Some(type_name) = node.attr(attrs::TYPE) {
            if !type_name.starts_with("xs:") && guards.types.insert(type_name.to_string()) {
                if let Some(named) = self.types.index().named_types.get(type_name).cloned() {
                    self.walk(&named, seen, guards);
                }
            }
        }
        if node.tag == tags::ELEMENT {
            if let Some(inline) = node.first_child_named(tags::COMPLEX_TYPE) {
                self.walk(inline, seen, guards);
            }
        }

        for child in &node.children {
            match child.tag.as_str() {
                tags::ATTRIBUTE => {
                    if let Some(name) = child.name() {
                        seen.entry(name.to_string()).or_insert_with(|| RawAttribute {
                            node: child.clone(),
                        });
                    }
                }
                tags::ATTRIBUTE_GROUP => {
                    if let Some(ref_name) = child.attr(attrs::REF) {
                        if guards.attr_group_refs.insert(ref_name.to_string()) {
                            if let Some(group) =
                                self.types.index().attribute_groups.get(ref_name).cloned()
                            {
                                self.walk(&group, seen, guards);
                            }
                        }
                    } else if let Some(name) = child.name() {
                        if guards.attr_groups.insert(name.to_string()) {
                            self.walk(child, seen, guards);
                        }
                    }
                }
                tags::EXTENSION => {
                    if let Some(base_name) = child.attr(attrs::BASE) {
                        if !base_name.starts_with("xs:") && guards.types.insert(base_name.to_string())
                        {
                            if let Some(base) = self.types.index().named_types.get(base_name).cloned()
                            {
                                self.walk(&base, seen, guards);
                            }
                        }
                    }
                    self.walk(child, seen, guards);
                }
                tags::COMPLEX_CONTENT | tags::SIMPLE_CONTENT => self.walk(child, seen, guards),
                tags::COMPLEX_TYPE | tags::SEQUENCE | tags::CHOICE | tags::ALL => {
                    self.walk(child, seen, guards)
                }
                tags::ELEMENT => {
                    // Do not collect attributes across an element boundary.
                }
                _ => {}
            }
        }
    }

    fn finish(&self, raw: RawAttribute) -> AttributeDescriptor {
        let node = &raw.node;
        let required = node.attr(attrs::USE) == Some("required");
        let annotation = node.annotation_text();
        let explicit_type = node.attr(attrs::TYPE).map(|s| s.to_string());

        let (
            mut type_name,
            mut enum_values,
            mut patterns,
            mut min_length,
            mut max_length,
            mut min_inclusive,
            mut max_inclusive,
            mut min_exclusive,
            mut max_exclusive,
        ) = (explicit_type.clone(), None, None, None, None, None, None, None, None);

        if let Some(ref type_ref) = explicit_type {
            let bundle = self.types.restriction_bundle(type_ref);
            if !bundle.enum_values.is_empty() {
                enum_values = Some(
                    bundle
                        .enum_values
                        .iter()
                        .map(|v| EnumValue {
                            value: v.clone(),
                            annotation: bundle.enum_annotations.get(v).cloned(),
                        })
                        .collect(),
                );
            }
            if !bundle.patterns.is_empty() {
                patterns = Some(bundle.patterns.clone());
            }
            min_length = bundle.min_length;
            max_length = bundle.max_length;
            min_inclusive = bundle.min_inclusive.map(|d| d.to_string());
            max_inclusive = bundle.max_inclusive.map(|d| d.to_string());
            min_exclusive = bundle.min_exclusive.map(|d| d.to_string());
            max_exclusive = bundle.max_exclusive.map(|d| d.to_string());
        } else if let Some(inline) = node.first_child_named(tags::SIMPLE_TYPE) {
            let bundle = self.types.restriction_bundle_from_node(inline);
            if !bundle.enum_values.is_empty() {
                enum_values = Some(
                    bundle
                        .enum_values
                        .iter()
                        .map(|v| EnumValue {
                            value: v.clone(),
                            annotation: bundle.enum_annotations.get(v).cloned(),
                        })
                        .collect(),
                );
                type_name = Some("enumeration".to_string());
            }
            if !bundle.patterns.is_empty() {
                patterns = Some(bundle.patterns.clone());
            }
            min_length = bundle.min_length;
            max_length = bundle.max_length;
            min_inclusive = bundle.min_inclusive.map(|d| d.to_string());
            max_inclusive = bundle.max_inclusive.map(|d| d.to_string());
            min_exclusive = bundle.min_exclusive.map(|d| d.to_string());
            max_exclusive = bundle.max_exclusive.map(|d| d.to_string());
        }

        AttributeDescriptor {
            name: node.name().unwrap_or_default().to_string(),
            type_name,
            required,
            location: Some(node.location.clone()),
            annotation,
            enum_values,
            patterns,
            min_length,
            max_length,
            min_inclusive,
            max_inclusive,
            min_exclusive,
            max_exclusive,
        }
    }
}

struct RawAttribute {
    node: NodeRef,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::SchemaDoc;
    use crate::index::SchemaIndex;
    use crate::locations::Location;
    use pretty_assertions::assert_eq;

    fn build(xml: &str) -> SchemaIndex {
        let children = SchemaDoc::from_str(xml, &Location::String("t.xsd".to_string()))
            .unwrap()
            .children;
        SchemaIndex::build(&children)
    }

    #[test]
    fn test_collects_direct_attributes_in_order() {
        let index = build(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="cue">
    <xs:complexType>
      <xs:attribute name="name" use="required"/>
      <xs:attribute name="delay"/>
    </xs:complexType>
  </xs:element>
</xs:schema>"#,
        );
        let types = TypeResolver::new(&index);
        let collector = AttributeCollector::new(&types);
        let decl = &index.global_elements["cue"][0];
        let attrs = collector.collect(decl);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name, "name");
        assert!(attrs[0].required);
        assert_eq!(attrs[1].name, "delay");
        assert!(!attrs[1].required);
    }

    #[test]
    fn test_does_not_cross_element_boundary() {
        let index = build(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="outer">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="inner">
          <xs:complexType>
            <xs:attribute name="innerAttr"/>
          </xs:complexType>
        </xs:element>
      </xs:sequence>
      <xs:attribute name="outerAttr"/>
    </xs:complexType>
  </xs:element>
</xs:schema>"#,
        );
        let types = TypeResolver::new(&index);
        let collector = AttributeCollector::new(&types);
        let decl = &index.global_elements["outer"][0];
        let attrs = collector.collect(decl);
        let names: Vec<_> = attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["outerAttr"]);
    }

    #[test]
    fn test_extension_inherits_base_attributes_first() {
        let index = build(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:complexType name="Base">
    <xs:attribute name="id"/>
  </xs:complexType>
  <xs:element name="cue">
    <xs:complexType>
      <xs:complexContent>
        <xs:extension base="Base">
          <xs:attribute name="name"/>
        </xs:extension>
      </xs:complexContent>
    </xs:complexType>
  </xs:element>
</xs:schema>"#,
        );
        let types = TypeResolver::new(&index);
        let collector = AttributeCollector::new(&types);
        let decl = &index.global_elements["cue"][0];
        let attrs = collector.collect(decl);
        let names: Vec<_> = attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name"]);
    }

    #[test]
    fn test_inline_enum_only_simple_type_sets_enumeration_marker() {
        let index = build(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="cue">
    <xs:complexType>
      <xs:attribute name="mode">
        <xs:simpleType>
          <xs:restriction base="xs:string">
            <xs:enumeration value="on"/>
            <xs:enumeration value="off"/>
          </xs:restriction>
        </xs:simpleType>
      </xs:attribute>
    </xs:complexType>
  </xs:element>
</xs:schema>"#,
        );
        let types = TypeResolver::new(&index);
        let collector = AttributeCollector::new(&types);
        let decl = &index.global_elements["cue"][0];
        let attrs = collector.collect(decl);
        assert_eq!(attrs[0].type_name.as_deref(), Some("enumeration"));
        assert_eq!(
            attrs[0].enum_values,
            Some(vec![
                EnumValue { value: "on".to_string(), annotation: None },
                EnumValue { value: "off".to_string(), annotation: None },
            ])
        );
    }
}
