//! SchemaIndex: the three-pass catalog of a merged schema tree (§3, §4.2)

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::node::{attrs, tags, NodeRef};

/// One site at which an element name is declared: the node that governs
/// it, the model-group names it was reached through, and the immediate
/// enclosing-element chain (bottom-up, nearest parent first).
#[derive(Debug, Clone)]
pub struct ElementContext {
    pub declaration_node: NodeRef,
    pub groups: Vec<String>,
    pub parents: Vec<String>,
}

/// The built catalog of a merged schema (main document plus all includes),
/// per §3 "SchemaIndex".
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    pub global_elements: IndexMap<String, Vec<NodeRef>>,
    pub named_types: IndexMap<String, NodeRef>,
    pub groups: IndexMap<String, NodeRef>,
    pub attribute_groups: IndexMap<String, NodeRef>,
    pub element_contexts: IndexMap<String, Vec<ElementContext>>,
}

impl SchemaIndex {
    /// Build an index from the top-level children of a merged schema tree.
    pub fn build(schema_children: &[NodeRef]) -> Self {
        let mut index = SchemaIndex::default();
        index.pass_a_globals(schema_children);
        index.pass_b_types_and_groups(schema_children);
        index.pass_c_element_contexts();
        index
    }

    fn pass_a_globals(&mut self, schema_children: &[NodeRef]) {
        for child in schema_children {
            let Some(name) = child.name() else { continue };
            match child.tag.as_str() {
                tags::ELEMENT => self
                    .global_elements
                    .entry(name.to_string())
                    .or_default()
                    .push(child.clone()),
                tags::COMPLEX_TYPE | tags::SIMPLE_TYPE => {
                    self.named_types.entry(name.to_string()).or_insert_with(|| child.clone());
                }
                tags::GROUP => {
                    self.groups.entry(name.to_string()).or_insert_with(|| child.clone());
                }
                tags::ATTRIBUTE_GROUP => {
                    self.attribute_groups
                        .entry(name.to_string())
                        .or_insert_with(|| child.clone());
                }
                _ => {}
            }
        }
    }

    fn pass_b_types_and_groups(&mut self, schema_children: &[NodeRef]) {
        for child in schema_children {
            self.walk_for_named_definitions(child);
        }
    }

    fn walk_for_named_definitions(&mut self, node: &NodeRef) {
        if let Some(name) = node.name() {
            match node.tag.as_str() {
                tags::COMPLEX_TYPE | tags::SIMPLE_TYPE => {
                    self.named_types.entry(name.to_string()).or_insert_with(|| node.clone());
                }
                tags::GROUP => {
                    self.groups.entry(name.to_string()).or_insert_with(|| node.clone());
                }
                tags::ATTRIBUTE_GROUP => {
                    self.attribute_groups
                        .entry(name.to_string())
                        .or_insert_with(|| node.clone());
                }
                _ => {}
            }
        }
        for child in &node.children {
            self.walk_for_named_definitions(child);
        }
    }

    fn pass_c_element_contexts(&mut self) {
        // Step 1: seed globals with empty groups/parents.
        for (name, decls) in self.global_elements.clone() {
            for decl in decls {
                self.element_contexts.entry(name.clone()).or_default().push(ElementContext {
                    declaration_node: decl,
                    groups: Vec::new(),
                    parents: Vec::new(),
                });
            }
        }

        // Step 2: each named group, walked standalone with currentGroups=[groupName].
        for (group_name, group_node) in self.groups.clone() {
            let mut visited_groups = HashSet::new();
            visited_groups.insert(group_name.clone());
            self.walk_group_subtree(&group_node, &[group_name], &mut visited_groups);
        }

        // Step 3: each global element, walked from its own declaration.
        for (element_name, decls) in self.global_elements.clone() {
            for decl in decls {
                let mut visited_types = HashSet::new();
                let mut visited_groups = HashSet::new();
                self.walk_element_subtree(
                    &decl,
                    &[element_name.clone()],
                    true,
                    &mut visited_types,
                    &mut visited_groups,
                );
            }
        }
    }

    /// Walk a named group's subtree (Pass C step 2): every `xs:element`
    /// found is a context carrying `groups` and no `parents`.
    fn walk_group_subtree(
        &mut self,
        node: &NodeRef,
        groups: &[String],
        visited_groups: &mut HashSet<String>,
    ) {
        for child in &node.children {
            if child.tag == tags::ELEMENT {
                if let Some(name) = child.name() {
                    self.element_contexts.entry(name.to_string()).or_default().push(
                        ElementContext {
                            declaration_node: child.clone(),
                            groups: groups.to_vec(),
                            parents: Vec::new(),
                        },
                    );
                }
                // Do not descend across a nested element's own subtree here;
                // its content is discovered when *it* is walked as a root.
                continue;
            }
            if child.tag == tags::GROUP {
                if let Some(ref_name) = child.attr(attrs::REF) {
                    if visited_groups.insert(ref_name.to_string()) {
                        if let Some(referenced) = self.groups.get(ref_name).cloned() {
                            self.walk_group_subtree(&referenced, groups, visited_groups);
                        }
                        visited_groups.remove(ref_name);
                    }
                    continue;
                }
            }
            self.walk_group_subtree(child, groups, visited_groups);
        }
    }

    /// Walk an element declaration's subtree (Pass C step 3).
    fn walk_element_subtree(
        &mut self,
        node: &NodeRef,
        parents: &[String],
        is_root: bool,
        visited_types: &mut HashSet<String>,
        visited_groups: &mut HashSet<String>,
    ) {
        // An element's own declaration may carry `type="T"`: follow it with
        // the same parent chain before descending its inline children.
        if node.tag == tags::ELEMENT {
            if let Some(type_name) = node.attr(attrs::TYPE) {
                if !type_name.starts_with("xs:") && visited_types.insert(type_name.to_string()) {
                    if let Some(named) = self.named_types.get(type_name).cloned() {
                        self.walk_element_subtree(
                            &named,
                            parents,
                            false,
                            visited_types,
                            visited_groups,
                        );
                    }
                    visited_types.remove(type_name);
                }
            }
        }

        for child in &node.children {
            match child.tag.as_str() {
                tags::ELEMENT => {
                    let Some(name) = child.name() else { continue };
                    if is_root && name == parents[0] {
                        // The root element's own declaration node is already
                        // the seeded global context; do not duplicate it.
                        continue;
                    }
                    let mut new_parents = vec![name.to_string()];
                    new_parents.extend(parents.iter().cloned());
                    self.element_contexts.entry(name.to_string()).or_default().push(
                        ElementContext {
                            declaration_node: child.clone(),
                            groups: Vec::new(),
                            parents: parents.to_vec(),
                        },
                    );
                    self.walk_element_subtree(
                        child,
                        &new_parents,
                        false,
                        visited_types,
                        visited_groups,
                    );
                }
                tags::GROUP => {
                    if let Some(ref_name) = child.attr(attrs::REF) {
                        if visited_groups.insert(ref_name.to_string()) {
                            if let Some(group_node) = self.groups.get(ref_name).cloned() {
                                // Immediate enclosing element only, not the full chain.
                                let immediate = vec![parents[0].clone()];
                                self.walk_group_subtree_as_elements(
                                    &group_node,
                                    &immediate,
                                    visited_types,
                                    visited_groups,
                                );
                            }
                            visited_groups.remove(ref_name);
                        }
                    } else {
                        self.walk_element_subtree(
                            child,
                            parents,
                            is_root,
                            visited_types,
                            visited_groups,
                        );
                    }
                }
                tags::EXTENSION => {
                    if let Some(base_name) = child.attr(attrs::BASE) {
                        if !base_name.starts_with("xs:")
                            && visited_types.insert(base_name.to_string())
                        {
                            if let Some(base_node) = self.named_types.get(base_name).cloned() {
                                self.walk_element_subtree(
                                    &base_node,
                                    parents,
                                    false,
                                    visited_types,
                                    visited_groups,
                                );
                            }
                            visited_types.remove(base_name);
                        }
                    }
                    self.walk_element_subtree(
                        child,
                        parents,
                        is_root,
                        visited_types,
                        visited_groups,
                    );
                }
                _ => {
                    self.walk_element_subtree(
                        child,
                        parents,
                        is_root,
                        visited_types,
                        visited_groups,
                    );
                }
            }
        }
    }

    /// Like `walk_element_subtree`, but entered from a group reference: the
    /// elements found inside carry only the immediate enclosing element as
    /// `parents`, per §4.2 Pass C step 3.
    fn walk_group_subtree_as_elements(
        &mut self,
        node: &NodeRef,
        immediate_parent: &[String],
        visited_types: &mut HashSet<String>,
        visited_groups: &mut HashSet<String>,
    ) {
        for child in &node.children {
            if child.tag == tags::ELEMENT {
                if let Some(name) = child.name() {
                    self.element_contexts.entry(name.to_string()).or_default().push(
                        ElementContext {
                            declaration_node: child.clone(),
                            groups: Vec::new(),
                            parents: immediate_parent.to_vec(),
                        },
                    );
                    let mut new_parents = vec![name.to_string()];
                    new_parents.extend(immediate_parent.iter().cloned());
                    self.walk_element_subtree(
                        child,
                        &new_parents,
                        false,
                        visited_types,
                        visited_groups,
                    );
                }
                continue;
            }
            if child.tag == tags::GROUP {
                if let Some(ref_name) = child.attr(attrs::REF) {
                    if visited_groups.insert(ref_name.to_string()) {
                        if let Some(group_node) = self.groups.get(ref_name).cloned() {
                            self.walk_group_subtree_as_elements(
                                &group_node,
                                immediate_parent,
                                visited_types,
                                visited_groups,
                            );
                        }
                        visited_groups.remove(ref_name);
                    }
                    continue;
                }
            }
            self.walk_group_subtree_as_elements(
                child,
                immediate_parent,
                visited_types,
                visited_groups,
            );
        }
    }
}
