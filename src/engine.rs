//! Engine: the per-directory, per-schema stateful pipeline (§6)
//!
//! Caches are guarded through `RefCell`, matching `HierarchicalResolver`'s
//! own interior-mutability style, since the schema tree itself is built on
//! `Rc` (single-threaded by design, §5 "single-threaded cooperative
//! scheduling"). An implementation targeting a parallel runtime would widen
//! these guards to a mutex and the tree to `Arc` together, not one without
//! the other.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::attributes::{AttributeCollector, AttributeDescriptor};
use crate::cache::{keys, Cache};
use crate::content_model::{ChildElement, ContentModelWalker};
use crate::error::{RuleViolationOutcome, ValidationOutcome};
use crate::index::SchemaIndex;
use crate::limits::EngineLimits;
use crate::loaders::Loader;
use crate::node::{extract_annotation_text, NodeRef};
use crate::resolver::HierarchicalResolver;
use crate::types::TypeResolver;
use crate::validation::{
    validate_attribute_names, validate_attribute_value_against_rules, AttributeNameValidation,
    ValueValidator,
};

/// One loaded schema's full pipeline: its tree, index, and the stateful
/// helpers that cache across queries (§3 "Lifecycle": built once per
/// schema, immutable; caches owned by the per-schema engine).
struct SchemaPipeline {
    index: SchemaIndex,
    limits: EngineLimits,
    resolver: HierarchicalResolver,
    walker: ContentModelWalker,
    attrs_cache: RefCell<Cache<Rc<Vec<AttributeDescriptor>>>>,
    children_cache: RefCell<Cache<Rc<Vec<ChildElement>>>>,
}

impl SchemaPipeline {
    fn new(index: SchemaIndex, limits: EngineLimits) -> Self {
        Self {
            index,
            resolver: HierarchicalResolver::new(limits),
            walker: ContentModelWalker::new(limits),
            attrs_cache: RefCell::new(Cache::new(limits.cache_soft_cap)),
            children_cache: RefCell::new(Cache::new(limits.cache_soft_cap)),
            limits,
        }
    }
}

/// The stateful engine: one XSD directory, lazily-loaded schemas (§6
/// "Engine constructor").
pub struct Engine {
    loader: Loader,
    limits: EngineLimits,
    pipelines: RefCell<HashMap<String, Rc<SchemaPipeline>>>,
}

impl Engine {
    /// `new(xsdDirectory)` (§6).
    pub fn new(xsd_directory: impl Into<std::path::PathBuf>) -> Self {
        Self::with_limits(xsd_directory, EngineLimits::default())
    }

    pub fn with_limits(xsd_directory: impl Into<std::path::PathBuf>, limits: EngineLimits) -> Self {
        Self {
            loader: Loader::new(xsd_directory).with_limits(limits),
            limits,
            pipelines: RefCell::new(HashMap::new()),
        }
    }

    /// `getSchema(name)` (§6): loads `{name}.xsd` (plus includes) on first
    /// request, and returns whether the schema is available.
    pub fn get_schema(&self, name: &str) -> bool {
        self.pipeline(name).is_some()
    }

    fn pipeline(&self, schema_name: &str) -> Option<Rc<SchemaPipeline>> {
        if let Some(p) = self.pipelines.borrow().get(schema_name) {
            return Some(p.clone());
        }

        let doc = self.loader.load_schema(schema_name).ok()?;
        tracing::info!(schema = schema_name, "schema loaded");
        let index = SchemaIndex::build(&doc.children);
        let pipeline = Rc::new(SchemaPipeline::new(index, self.limits));

        self.pipelines
            .borrow_mut()
            .insert(schema_name.to_string(), pipeline.clone());
        Some(pipeline)
    }

    /// `getElementDefinition(schema, element, hierarchy)` (§6).
    pub fn get_element_definition(
        &self,
        schema: &str,
        element: &str,
        hierarchy: &[String],
    ) -> Option<NodeRef> {
        let pipeline = self.pipeline(schema)?;
        tracing::debug!(schema, element, hierarchy = ?hierarchy, "resolving element definition");
        pipeline.resolver.resolve(&pipeline.index, element, hierarchy)
    }

    /// `getElementAttributes(schema, element, hierarchy)` (§6): the bare
    /// `{ name, node }` shape — here, the declaration node itself, since
    /// `AttributeDescriptor` already carries `name`.
    pub fn get_element_attributes(
        &self,
        schema: &str,
        element: &str,
        hierarchy: &[String],
    ) -> Vec<AttributeDescriptor> {
        self.get_element_attributes_with_types(schema, element, hierarchy)
    }

    /// `getElementAttributesWithTypes(schema, element, hierarchy)` (§6).
    pub fn get_element_attributes_with_types(
        &self,
        schema: &str,
        element: &str,
        hierarchy: &[String],
    ) -> Vec<AttributeDescriptor> {
        let Some(pipeline) = self.pipeline(schema) else {
            return Vec::new();
        };
        let Some(decl) = pipeline.resolver.resolve(&pipeline.index, element, hierarchy) else {
            return Vec::new();
        };

        let cache_key = keys::attrs_key(element, hierarchy);
        if let Some(hit) = pipeline.attrs_cache.borrow().get(&cache_key) {
            return (**hit).clone();
        }

        let types = TypeResolver::new(&pipeline.index);
        let collector = AttributeCollector::new(&types);
        let result = Rc::new(collector.collect(&decl));
        pipeline
            .attrs_cache
            .borrow_mut()
            .insert(cache_key, result.clone());
        (*result).clone()
    }

    /// `validateAttributeValue(schema, element, attribute, value, hierarchy)`
    /// (§6).
    pub fn validate_attribute_value(
        &self,
        schema: &str,
        element: &str,
        attribute: &str,
        value: &str,
        hierarchy: &[String],
    ) -> ValidationOutcome {
        let Some(pipeline) = self.pipeline(schema) else {
            return ValidationOutcome::invalid("schema not found");
        };
        let descriptors = self.get_element_attributes_with_types(schema, element, hierarchy);
        let Some(descriptor) = descriptors.iter().find(|d| d.name == attribute) else {
            return ValidationOutcome::invalid(format!(
                "attribute '{attribute}' is not declared on element '{element}'"
            ));
        };
        let types = TypeResolver::new(&pipeline.index);
        let validator = ValueValidator::new(&types);
        validator.validate(descriptor, value)
    }

    /// `getPossibleChildElements(schema, element, hierarchy, previousSibling?)`
    /// (§6): an ordered map from child element name to annotation text.
    pub fn get_possible_child_elements(
        &self,
        schema: &str,
        element: &str,
        hierarchy: &[String],
        previous_sibling: Option<&str>,
    ) -> Vec<(String, Option<String>)> {
        let Some(pipeline) = self.pipeline(schema) else {
            return Vec::new();
        };
        let Some(decl) = pipeline.resolver.resolve(&pipeline.index, element, hierarchy) else {
            return Vec::new();
        };

        let cache_key = keys::children_key(element, hierarchy, previous_sibling);
        let children = if let Some(hit) = pipeline.children_cache.borrow().get(&cache_key) {
            (**hit).clone()
        } else {
            let found = pipeline
                .walker
                .possible_next_children(&pipeline.index, &decl, previous_sibling);
            if pipeline.walker.capped() {
                tracing::warn!(schema, element, "RunawayGuard: content-model walk reached step cap");
            }
            pipeline
                .children_cache
                .borrow_mut()
                .insert(cache_key, Rc::new(found.clone()));
            found
        };

        children
            .into_iter()
            .map(|c| (c.node.name().unwrap_or_default().to_string(), c.annotation))
            .collect()
    }

    /// `getSimpleTypesWithBaseType(schema, baseTypeName)` (§6): named simple
    /// types that restrict `baseTypeName` directly.
    pub fn get_simple_types_with_base_type(&self, schema: &str, base_type_name: &str) -> Vec<String> {
        let Some(pipeline) = self.pipeline(schema) else {
            return Vec::new();
        };
        pipeline
            .index
            .named_types
            .iter()
            .filter(|(_, node)| node.tag == crate::node::tags::SIMPLE_TYPE)
            .filter(|(_, node)| {
                node.first_child_named(crate::node::tags::RESTRICTION)
                    .and_then(|r| r.attr(crate::node::attrs::BASE))
                    == Some(base_type_name)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// `getSimpleTypeEnumerationValues(schema, typeName)` (§6): `None` if
    /// the type (recursing into union members) carries no enum facets.
    pub fn get_simple_type_enumeration_values(
        &self,
        schema: &str,
        type_name: &str,
    ) -> Option<(Vec<String>, HashMap<String, String>)> {
        let pipeline = self.pipeline(schema)?;
        let types = TypeResolver::new(&pipeline.index);
        let bundle = types.restriction_bundle(type_name);
        if bundle.enum_values.is_empty() {
            None
        } else {
            Some((bundle.enum_values, bundle.enum_annotations))
        }
    }

    /// `getAvailableSchemas()` (§6): schema names already loaded.
    pub fn get_available_schemas(&self) -> Vec<String> {
        let pipelines = self.pipelines.borrow();
        let mut names: Vec<String> = pipelines.keys().cloned().collect();
        names.sort();
        names
    }

    /// `getDiscoverableSchemas()` (§6): `.xsd` files present in the
    /// directory, whether or not loaded yet.
    pub fn get_discoverable_schemas(&self) -> Vec<String> {
        self.loader.discoverable_schemas()
    }

    /// `dispose()` (§6): release every cache and drop parsed trees.
    pub fn dispose(&self) {
        self.pipelines.borrow_mut().clear();
        tracing::debug!("engine disposed: all schema pipelines released");
    }
}

/// `validateAttributeNames(descriptors, providedNames)` (§6 static helper).
pub fn validate_attribute_names_static(
    descriptors: &[AttributeDescriptor],
    provided_names: &[String],
) -> AttributeNameValidation {
    validate_attribute_names(descriptors, provided_names)
}

/// `validateAttributeValueAgainstRules(descriptors, name, value)` (§6 static
/// helper). Requires a `TypeResolver` bound to the owning schema's index.
pub fn validate_attribute_value_against_rules_static(
    types: &TypeResolver,
    descriptors: &[AttributeDescriptor],
    name: &str,
    value: &str,
) -> RuleViolationOutcome {
    validate_attribute_value_against_rules(types, descriptors, name, value)
}

/// `filterAttributesByType(descriptors, typeName)` (§6 static helper).
pub fn filter_attributes_by_type(descriptors: &[AttributeDescriptor], type_name: &str) -> Vec<String> {
    descriptors
        .iter()
        .filter(|d| d.type_name.as_deref() == Some(type_name))
        .map(|d| d.name.clone())
        .collect()
}

/// Which restriction kind `filterAttributesByRestriction` filters on (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictionKind {
    Enumeration,
    Pattern,
    Length,
    Range,
}

/// `filterAttributesByRestriction(descriptors, kind)` (§6 static helper).
pub fn filter_attributes_by_restriction(
    descriptors: &[AttributeDescriptor],
    kind: RestrictionKind,
) -> Vec<String> {
    descriptors
        .iter()
        .filter(|d| match kind {
            RestrictionKind::Enumeration => d.enum_values.is_some(),
            RestrictionKind::Pattern => d.patterns.is_some(),
            RestrictionKind::Length => d.min_length.is_some() || d.max_length.is_some(),
            RestrictionKind::Range => {
                d.min_inclusive.is_some()
                    || d.max_inclusive.is_some()
                    || d.min_exclusive.is_some()
                    || d.max_exclusive.is_some()
            }
        })
        .map(|d| d.name.clone())
        .collect()
}

/// `getAttributePossibleValues(descriptors, name)` (§6 static helper).
pub fn get_attribute_possible_values(
    descriptors: &[AttributeDescriptor],
    name: &str,
) -> Vec<(String, Option<String>)> {
    descriptors
        .iter()
        .find(|d| d.name == name)
        .and_then(|d| d.enum_values.as_ref())
        .map(|values| values.iter().map(|v| (v.value.clone(), v.annotation.clone())).collect())
        .unwrap_or_default()
}

/// `extractAnnotationText(node)` (§6 static helper).
pub fn extract_annotation_text_static(node: &NodeRef) -> Option<String> {
    extract_annotation_text(node)
}
