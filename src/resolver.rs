//! HierarchicalResolver: context-sensitive element lookup (§4.3)
//!
//! Owns only its cache and limits, not the `SchemaIndex` — the index is
//! passed in per call so an `Engine` pipeline can hold both side by side
//! without a self-referential struct.

use std::cell::RefCell;
use std::collections::HashSet;

use crate::cache::{keys, Cache};
use crate::index::SchemaIndex;
use crate::limits::EngineLimits;
use crate::node::{attrs, tags, NodeRef};

/// Resolves which `xs:element` declaration governs an element name in a
/// given ancestor context (§4.3).
pub struct HierarchicalResolver {
    limits: EngineLimits,
    cache: RefCell<Cache<Option<NodeRef>>>,
}

impl HierarchicalResolver {
    pub fn new(limits: EngineLimits) -> Self {
        Self {
            cache: RefCell::new(Cache::new(limits.cache_soft_cap)),
            limits,
        }
    }

    /// Resolve `element` under `hierarchy` (bottom-up: `[parent,
    /// grandparent, …, root]`).
    pub fn resolve(&self, index: &SchemaIndex, element: &str, hierarchy: &[String]) -> Option<NodeRef> {
        let exact_key = keys::element_key(element, hierarchy);
        if let Some(hit) = self.cache.borrow().get(&exact_key) {
            return hit.clone();
        }

        if let Some(reused) = self.try_prefix_reuse(element, hierarchy, &exact_key) {
            return reused;
        }

        let result = if hierarchy.is_empty() {
            self.resolve_global(index, element)
        } else {
            self.resolve_with_hierarchy(index, element, hierarchy)
        };

        self.cache.borrow_mut().insert(exact_key, result.clone());
        result
    }

    /// Partial-prefix cache reuse (§4.3 "Cache behavior"): any cached key
    /// for the same element whose hierarchy is a prefix of the requested
    /// one, and which resolved non-none, is reused and re-cached under the
    /// longer key.
    fn try_prefix_reuse(
        &self,
        element: &str,
        hierarchy: &[String],
        exact_key: &str,
    ) -> Option<Option<NodeRef>> {
        let prefix_marker = format!("{element}::");
        let mut found = None;
        for (key, value) in self.cache.borrow().iter() {
            if key == exact_key || !key.starts_with(&prefix_marker) || value.is_none() {
                continue;
            }
            let cached_hierarchy = &key[prefix_marker.len()..];
            let cached_parts: Vec<&str> = if cached_hierarchy.is_empty() {
                Vec::new()
            } else {
                cached_hierarchy.split('|').collect()
            };
            if cached_parts.len() <= hierarchy.len()
                && cached_parts.iter().zip(hierarchy.iter()).all(|(a, b)| *a == b)
            {
                found = Some(value.clone());
                break;
            }
        }
        if let Some(value) = &found {
            self.cache.borrow_mut().insert(exact_key.to_string(), value.clone());
        }
        found
    }

    fn resolve_global(&self, index: &SchemaIndex, element: &str) -> Option<NodeRef> {
        index.global_elements.get(element)?.first().cloned()
    }

    fn resolve_with_hierarchy(
        &self,
        index: &SchemaIndex,
        element: &str,
        hierarchy: &[String],
    ) -> Option<NodeRef> {
        for level in 1..=hierarchy.len() {
            let slice = &hierarchy[0..level];
            // Top-down order: [root', …, parent']
            let top_down: Vec<&str> = slice.iter().rev().map(|s| s.as_str()).collect();

            let root_name = top_down[0];
            let mut current: Vec<NodeRef> = index
                .global_elements
                .get(root_name)
                .cloned()
                .unwrap_or_default();
            if current.is_empty() {
                if let Some(named) = index.named_types.get(root_name) {
                    current = vec![named.clone()];
                }
            }

            let mut ok = true;
            for &next_name in &top_down[1..] {
                let mut matched = Vec::new();
                for decl in &current {
                    let mut visited = HashSet::new();
                    self.find_child_elements(index, decl, next_name, 0, &mut visited, &mut matched);
                }
                if matched.is_empty() {
                    ok = false;
                    break;
                }
                current = matched;
            }

            if !ok {
                continue;
            }

            let mut found = Vec::new();
            for decl in &current {
                let mut visited = HashSet::new();
                self.find_child_elements(index, decl, element, 0, &mut visited, &mut found);
            }
            if let Some(first) = found.into_iter().next() {
                let level_hierarchy = &hierarchy[0..level];
                let level_key = keys::element_key(element, level_hierarchy);
                self.cache.borrow_mut().insert(level_key, Some(first.clone()));
                return Some(first);
            }
        }
        None
    }

    /// Search within `node`'s subtree for an `xs:element name="target"`,
    /// descending through structural nodes (§4.3 step 4). Does not recurse
    /// through a matched element (early stop). Bounded by `max_descent_depth`.
    fn find_child_elements(
        &self,
        index: &SchemaIndex,
        node: &NodeRef,
        target: &str,
        depth: usize,
        visited: &mut HashSet<usize>,
        out: &mut Vec<NodeRef>,
    ) {
        if depth > self.limits.max_descent_depth {
            return;
        }
        if !visited.insert(node.identity()) {
            return;
        }

        for child in &node.children {
            if child.tag == tags::ELEMENT {
                if child.name() == Some(target) {
                    out.push(child.clone());
                }
                continue;
            }
            if child.is_structural() {
                self.find_child_elements(index, child, target, depth + 1, visited, out);
                continue;
            }
            if child.tag == tags::EXTENSION {
                if let Some(base_name) = child.attr(attrs::BASE) {
                    if !base_name.starts_with("xs:") {
                        if let Some(base_node) = index.named_types.get(base_name) {
                            self.find_child_elements(index, base_node, target, depth + 1, visited, out);
                        }
                    }
                }
                self.find_child_elements(index, child, target, depth + 1, visited, out);
                continue;
            }
        }

        // xs:group ref= is handled as a direct child tag match (GROUP is
        // structural already, so descend into the referenced group too).
        if node.tag == tags::GROUP {
            if let Some(ref_name) = node.attr(attrs::REF) {
                if let Some(group_node) = index.groups.get(ref_name) {
                    self.find_child_elements(index, group_node, target, depth + 1, visited, out);
                }
            }
        }
    }
}
