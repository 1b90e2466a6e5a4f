//! TypeResolver: restriction-facet accumulation and built-in resolution
//! (§4.5)

use std::collections::HashMap;
use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::index::SchemaIndex;
use crate::node::{attrs, tags, NodeRef};

/// The accumulated restriction facets of a (possibly union) type (§4.5
/// `getRestrictionBundle`).
#[derive(Debug, Clone, Default)]
pub struct RestrictionBundle {
    pub enum_values: Vec<String>,
    pub enum_annotations: HashMap<String, String>,
    pub patterns: Vec<String>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_inclusive: Option<Decimal>,
    pub max_inclusive: Option<Decimal>,
    pub min_exclusive: Option<Decimal>,
    pub max_exclusive: Option<Decimal>,
}

impl RestrictionBundle {
    /// Overlay `self` on top of `base`: fields already set on `self` win,
    /// fields unset on `self` fall through to `base` (§4.5 "overlay").
    fn overlay_onto(mut self, base: RestrictionBundle) -> RestrictionBundle {
        if self.enum_values.is_empty() {
            self.enum_values = base.enum_values;
        }
        for (k, v) in base.enum_annotations {
            self.enum_annotations.entry(k).or_insert(v);
        }
        if self.patterns.is_empty() {
            self.patterns = base.patterns;
        }
        self.min_length = self.min_length.or(base.min_length);
        self.max_length = self.max_length.or(base.max_length);
        self.min_inclusive = self.min_inclusive.or(base.min_inclusive);
        self.max_inclusive = self.max_inclusive.or(base.max_inclusive);
        self.min_exclusive = self.min_exclusive.or(base.min_exclusive);
        self.max_exclusive = self.max_exclusive.or(base.max_exclusive);
        self
    }

    /// Widen `self` with `other` as union members: concatenate list facets,
    /// widen numeric/length bounds to the most permissive (§4.5 "union").
    fn widen_with(&mut self, other: RestrictionBundle) {
        self.enum_values.extend(other.enum_values);
        for (k, v) in other.enum_annotations {
            self.enum_annotations.entry(k).or_insert(v);
        }
        self.patterns.extend(other.patterns);
        self.min_length = widen_min(self.min_length, other.min_length);
        self.max_length = widen_max(self.max_length, other.max_length);
        self.min_inclusive = widen_min(self.min_inclusive, other.min_inclusive);
        self.max_inclusive = widen_max(self.max_inclusive, other.max_inclusive);
        self.min_exclusive = widen_min(self.min_exclusive, other.min_exclusive);
        self.max_exclusive = widen_max(self.max_exclusive, other.max_exclusive);
    }
}

fn widen_min<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if a <= b { a } else { b }),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

fn widen_max<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if a >= b { a } else { b }),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// Resolves named types' restriction facets and their underlying built-in
/// base type (§4.5).
pub struct TypeResolver<'a> {
    index: &'a SchemaIndex,
}

impl<'a> TypeResolver<'a> {
    pub fn new(index: &'a SchemaIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &SchemaIndex {
        self.index
    }

    /// `getRestrictionBundle(typeName)` (§4.5).
    pub fn restriction_bundle(&self, type_name: &str) -> RestrictionBundle {
        if type_name.starts_with("xs:") {
            return RestrictionBundle::default();
        }
        let Some(node) = self.index.named_types.get(type_name).cloned() else {
            return RestrictionBundle::default();
        };
        let mut visited = HashSet::new();
        visited.insert(type_name.to_string());
        self.bundle_for_node(&node, &mut visited)
    }

    /// Same as `restriction_bundle`, but starting from an inline
    /// `xs:simpleType` node rather than a named type (used for inline
    /// enum-only attribute types).
    pub fn restriction_bundle_from_node(&self, node: &NodeRef) -> RestrictionBundle {
        let mut visited = HashSet::new();
        self.bundle_for_node(node, &mut visited)
    }

    fn bundle_for_node(&self, node: &NodeRef, visited: &mut HashSet<String>) -> RestrictionBundle {
        // xs:simpleType wraps xs:restriction or xs:union directly.
        if node.tag == tags::SIMPLE_TYPE {
            if let Some(restriction) = node.first_child_named(tags::RESTRICTION) {
                return self.bundle_from_restriction(restriction, visited);
            }
            if let Some(union) = node.first_child_named(tags::UNION) {
                return self.bundle_from_union(union, visited);
            }
            return RestrictionBundle::default();
        }
        if node.tag == tags::RESTRICTION {
            return self.bundle_from_restriction(node, visited);
        }
        if node.tag == tags::UNION {
            return self.bundle_from_union(node, visited);
        }
        RestrictionBundle::default()
    }

    fn bundle_from_restriction(
        &self,
        restriction: &NodeRef,
        visited: &mut HashSet<String>,
    ) -> RestrictionBundle {
        let mut bundle = RestrictionBundle::default();

        for facet in &restriction.children {
            match facet.tag.as_str() {
                tags::ENUMERATION => {
                    if let Some(value) = facet.attr(attrs::VALUE) {
                        bundle.enum_values.push(value.to_string());
                        if let Some(doc) = facet.annotation_text() {
                            bundle.enum_annotations.insert(value.to_string(), doc);
                        }
                    }
                }
                tags::PATTERN => {
                    if let Some(value) = facet.attr(attrs::VALUE) {
                        bundle.patterns.push(value.to_string());
                    }
                }
                tags::MIN_LENGTH => {
                    bundle.min_length = facet.attr(attrs::VALUE).and_then(|v| v.parse().ok());
                }
                tags::MAX_LENGTH => {
                    bundle.max_length = facet.attr(attrs::VALUE).and_then(|v| v.parse().ok());
                }
                tags::LENGTH => {
                    let len = facet.attr(attrs::VALUE).and_then(|v| v.parse().ok());
                    bundle.min_length = len;
                    bundle.max_length = len;
                }
                tags::MIN_INCLUSIVE => {
                    bundle.min_inclusive = parse_decimal(facet.attr(attrs::VALUE));
                }
                tags::MAX_INCLUSIVE => {
                    bundle.max_inclusive = parse_decimal(facet.attr(attrs::VALUE));
                }
                tags::MIN_EXCLUSIVE => {
                    bundle.min_exclusive = parse_decimal(facet.attr(attrs::VALUE));
                }
                tags::MAX_EXCLUSIVE => {
                    bundle.max_exclusive = parse_decimal(facet.attr(attrs::VALUE));
                }
                _ => {}
            }
        }

        if let Some(base_name) = restriction.attr(attrs::BASE) {
            if !base_name.starts_with("xs:") && visited.insert(base_name.to_string()) {
                if let Some(base_node) = self.index.named_types.get(base_name).cloned() {
                    let base_bundle = self.bundle_for_node(&base_node, visited);
                    return bundle.overlay_onto(base_bundle);
                }
            }
        }

        bundle
    }

    fn bundle_from_union(&self, union: &NodeRef, visited: &mut HashSet<String>) -> RestrictionBundle {
        let mut result = RestrictionBundle::default();
        let mut first = true;

        if let Some(member_types) = union.attr(attrs::MEMBER_TYPES) {
            for member in member_types.split_whitespace() {
                if member.starts_with("xs:") {
                    continue;
                }
                if !visited.insert(member.to_string()) {
                    continue;
                }
                if let Some(member_node) = self.index.named_types.get(member).cloned() {
                    let member_bundle = self.bundle_for_node(&member_node, visited);
                    if first {
                        result = member_bundle;
                        first = false;
                    } else {
                        result.widen_with(member_bundle);
                    }
                }
            }
        }

        // Inline member simpleTypes (nested xs:simpleType children), if any.
        for child in union.children_named(tags::SIMPLE_TYPE) {
            let member_bundle = self.bundle_for_node(child, visited);
            if first {
                result = member_bundle;
                first = false;
            } else {
                result.widen_with(member_bundle);
            }
        }

        result
    }

    /// `resolveToBuiltin(typeName)` (§4.5): follow `xs:restriction`/
    /// `xs:extension` base once, recursively; unknown types default to
    /// `xs:string`.
    pub fn resolve_to_builtin(&self, type_name: &str) -> String {
        if type_name.starts_with("xs:") {
            return type_name.to_string();
        }
        let mut visited = HashSet::new();
        self.resolve_to_builtin_inner(type_name, &mut visited)
    }

    fn resolve_to_builtin_inner(&self, type_name: &str, visited: &mut HashSet<String>) -> String {
        if type_name.starts_with("xs:") {
            return type_name.to_string();
        }
        if !visited.insert(type_name.to_string()) {
            return "xs:string".to_string();
        }
        let Some(node) = self.index.named_types.get(type_name).cloned() else {
            return "xs:string".to_string();
        };
        self.resolve_node_to_builtin(&node, visited)
    }

    fn resolve_node_to_builtin(&self, node: &NodeRef, visited: &mut HashSet<String>) -> String {
        if let Some(restriction) = node.first_child_named(tags::RESTRICTION) {
            if let Some(base) = restriction.attr(attrs::BASE) {
                return self.resolve_to_builtin_inner(base, visited);
            }
        }
        if let Some(extension) = node.first_child_named(tags::EXTENSION) {
            if let Some(base) = extension.attr(attrs::BASE) {
                return self.resolve_to_builtin_inner(base, visited);
            }
        }
        if let Some(union) = node.first_child_named(tags::UNION) {
            return self.resolve_union_to_builtin(union, visited);
        }
        "xs:string".to_string()
    }

    fn resolve_union_to_builtin(&self, union: &NodeRef, visited: &mut HashSet<String>) -> String {
        let mut candidates = Vec::new();
        if let Some(member_types) = union.attr(attrs::MEMBER_TYPES) {
            for member in member_types.split_whitespace() {
                candidates.push(self.resolve_to_builtin_inner(member, visited));
            }
        }
        for child in union.children_named(tags::SIMPLE_TYPE) {
            candidates.push(self.resolve_node_to_builtin(child, visited));
        }

        candidates
            .iter()
            .find(|c| is_numeric_or_boolean(c))
            .cloned()
            .unwrap_or_else(|| "xs:string".to_string())
    }
}

fn is_numeric_or_boolean(builtin: &str) -> bool {
    matches!(
        builtin,
        "xs:boolean"
            | "xs:integer"
            | "xs:int"
            | "xs:long"
            | "xs:short"
            | "xs:byte"
            | "xs:decimal"
            | "xs:float"
            | "xs:double"
            | "xs:nonNegativeInteger"
            | "xs:positiveInteger"
            | "xs:nonPositiveInteger"
            | "xs:negativeInteger"
            | "xs:unsignedInt"
            | "xs:unsignedLong"
            | "xs:unsignedShort"
            | "xs:unsignedByte"
    )
}

fn parse_decimal(value: Option<&str>) -> Option<Decimal> {
    value.and_then(|v| v.parse().ok())
}
