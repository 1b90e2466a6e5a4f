//! ContentModelWalker: "what child elements can come next" (§4.6)
//!
//! Owns only its step counter, not the `SchemaIndex` — the index is passed
//! in per call so an `Engine` pipeline can hold both side by side without a
//! self-referential struct.

use std::cell::Cell;
use std::collections::HashSet;

use crate::index::SchemaIndex;
use crate::limits::EngineLimits;
use crate::node::{attrs, tags, NodeRef};

/// Occurrence bounds, defaulting to exactly-one (§4.6 "Effective occurs").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    pub min: u64,
    pub max: Option<u64>,
}

impl Occurs {
    pub const ONE: Occurs = Occurs { min: 1, max: Some(1) };

    fn effective(node: &NodeRef, parent_default: Occurs) -> Occurs {
        let min = match node.attr(attrs::MIN_OCCURS) {
            Some(v) => v.parse().unwrap_or(1),
            None => parent_default.min,
        };
        let max = match node.attr(attrs::MAX_OCCURS) {
            Some("unbounded") => None,
            Some(v) => v.parse().ok(),
            None => parent_default.max,
        };
        Occurs { min, max }
    }

    fn can_repeat(&self) -> bool {
        self.max.is_none() || self.max.unwrap_or(1) > 1
    }
}

/// A child element made available by the content model, with its resolved
/// annotation (§4.6 "Annotations on the returned elements").
#[derive(Debug, Clone)]
pub struct ChildElement {
    pub node: NodeRef,
    pub annotation: Option<String>,
}

/// Walks content models (sequence/choice/all) to answer "what can come
/// next" (§4.6).
pub struct ContentModelWalker {
    limits: EngineLimits,
    steps: Cell<usize>,
}

impl ContentModelWalker {
    pub fn new(limits: EngineLimits) -> Self {
        Self {
            limits,
            steps: Cell::new(0),
        }
    }

    fn step(&self) -> bool {
        let n = self.steps.get() + 1;
        self.steps.set(n);
        n <= self.limits.max_walk_steps
    }

    /// Whether the most recent walk hit the step cap (§7 `RunawayGuard`):
    /// its result is a best-effort partial set, not the full content model.
    pub fn capped(&self) -> bool {
        self.steps.get() > self.limits.max_walk_steps
    }

    /// `findContentModel(def)` (§4.6): locate the governing sequence/
    /// choice/all for a declaration, descending through complexType/
    /// complexContent/simpleContent/extension/restriction and `type="T"`.
    pub fn find_content_model(&self, index: &SchemaIndex, def: &NodeRef) -> Option<NodeRef> {
        self.steps.set(0);
        let mut visited = HashSet::new();
        self.find_content_model_inner(index, def, &mut visited)
    }

    fn find_content_model_inner(
        &self,
        index: &SchemaIndex,
        node: &NodeRef,
        visited: &mut HashSet<usize>,
    ) -> Option<NodeRef> {
        if !self.step() || !visited.insert(node.identity()) {
            return None;
        }
        if matches!(node.tag.as_str(), tags::SEQUENCE | tags::CHOICE | tags::ALL) {
            return Some(node.clone());
        }
        if node.tag == tags::GROUP {
            if let Some(resolved) = self.resolve_group_ref(index, node) {
                return self.find_content_model_inner(index, &resolved, visited);
            }
            for child in &node.children {
                if let Some(found) = self.find_content_model_inner(index, child, visited) {
                    return Some(found);
                }
            }
            return None;
        }

        for tag in [
            tags::COMPLEX_TYPE,
            tags::COMPLEX_CONTENT,
            tags::SIMPLE_CONTENT,
            tags::EXTENSION,
            tags::RESTRICTION,
        ] {
            if let Some(child) = node.first_child_named(tag) {
                if let Some(found) = self.find_content_model_inner(index, child, visited) {
                    return Some(found);
                }
            }
        }
        for group_child in node.children_named(tags::GROUP) {
            if let Some(found) = self.find_content_model_inner(index, group_child, visited) {
                return Some(found);
            }
        }
        for seq_or_choice in node
            .children
            .iter()
            .filter(|c| matches!(c.tag.as_str(), tags::SEQUENCE | tags::CHOICE | tags::ALL))
        {
            return Some(seq_or_choice.clone());
        }

        if let Some(type_name) = node.attr(attrs::TYPE) {
            if !type_name.starts_with("xs:") {
                if let Some(named) = index.named_types.get(type_name).cloned() {
                    return self.find_content_model_inner(index, &named, visited);
                }
            }
        }

        None
    }

    fn resolve_group_ref(&self, index: &SchemaIndex, group_node: &NodeRef) -> Option<NodeRef> {
        let ref_name = group_node.attr(attrs::REF)?;
        index.groups.get(ref_name).cloned()
    }

    /// `getStartElementsOfSequence(seq)` (§4.6).
    pub fn start_elements_of_sequence(&self, index: &SchemaIndex, seq: &NodeRef) -> Vec<ChildElement> {
        let mut out = Vec::new();
        let default_occurs = Occurs::effective(seq, Occurs::ONE);
        for item in &seq.children {
            if !self.step() {
                break;
            }
            let occurs = Occurs::effective(item, default_occurs);
            out.extend(self.start_elements_from_item(index, item));
            if occurs.min >= 1 {
                break;
            }
        }
        dedup(out)
    }

    /// `getStartElementsFromItem(item)` (§4.6).
    pub fn start_elements_from_item(&self, index: &SchemaIndex, item: &NodeRef) -> Vec<ChildElement> {
        if !self.step() {
            return Vec::new();
        }
        match item.tag.as_str() {
            tags::ELEMENT => vec![self.as_child_element(index, item)],
            tags::CHOICE => self.elements_in_choice(index, item),
            tags::SEQUENCE => self.start_elements_of_sequence(index, item),
            tags::ALL => {
                let mut out = Vec::new();
                for child in &item.children {
                    out.extend(self.start_elements_from_item(index, child));
                }
                dedup(out)
            }
            tags::GROUP => {
                if let Some(resolved) = self.resolve_group_ref(index, item) {
                    if let Some(model) = resolved
                        .children
                        .iter()
                        .find(|c| matches!(c.tag.as_str(), tags::SEQUENCE | tags::CHOICE | tags::ALL))
                    {
                        return self.start_elements_from_item(index, model);
                    }
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// `getElementsInChoice(choice)` (§4.6).
    pub fn elements_in_choice(&self, index: &SchemaIndex, choice: &NodeRef) -> Vec<ChildElement> {
        let mut out = Vec::new();
        for alt in &choice.children {
            if !self.step() {
                break;
            }
            match alt.tag.as_str() {
                tags::ELEMENT => out.push(self.as_child_element(index, alt)),
                tags::CHOICE => out.extend(self.elements_in_choice(index, alt)),
                tags::SEQUENCE => out.extend(self.start_elements_of_sequence(index, alt)),
                tags::GROUP => out.extend(self.start_elements_from_item(index, alt)),
                _ => {}
            }
        }
        dedup(out)
    }

    fn as_child_element(&self, index: &SchemaIndex, element: &NodeRef) -> ChildElement {
        let annotation = element.annotation_text().or_else(|| {
            element
                .attr(attrs::TYPE)
                .filter(|t| !t.starts_with("xs:"))
                .and_then(|t| index.named_types.get(t))
                .and_then(|n| n.annotation_text())
        });
        ChildElement {
            node: element.clone(),
            annotation,
        }
    }

    /// Next-after algorithm (§4.6): given the parent declaration and the
    /// name of the previous sibling already placed (or `None` for the
    /// start-capable set), return what may legally appear next.
    pub fn possible_next_children(
        &self,
        index: &SchemaIndex,
        parent_def: &NodeRef,
        previous_sibling: Option<&str>,
    ) -> Vec<ChildElement> {
        self.steps.set(0);
        let Some(model) = self.find_content_model(index, parent_def) else {
            return Vec::new();
        };

        let Some(prev) = previous_sibling else {
            return self.start_elements_from_item(index, &model);
        };

        match model.tag.as_str() {
            tags::ALL => model
                .children
                .iter()
                .map(|c| self.as_child_element(index, c))
                .collect(),
            tags::CHOICE => self.next_after_choice(index, &model, prev, &mut HashSet::new()),
            tags::SEQUENCE => self.next_after_sequence(index, &model, prev),
            _ => Vec::new(),
        }
    }

    /// Implements the `xs:choice` branch of the next-after algorithm.
    fn next_after_choice(
        &self,
        index: &SchemaIndex,
        choice: &NodeRef,
        prev: &str,
        visited: &mut HashSet<usize>,
    ) -> Vec<ChildElement> {
        if let Some(seq) = self.find_sequence_alternative_containing(index, choice, prev, visited) {
            return self.next_within_sequence_items(index, &seq, prev, Some(choice));
        }
        // `prev` was a direct choice alternative: the choice restarts.
        self.elements_in_choice(index, choice)
    }

    /// Find a sequence alternative of `choice` (direct, or reachable through
    /// a group or nested choice) that contains `prev` as a direct element.
    fn find_sequence_alternative_containing(
        &self,
        index: &SchemaIndex,
        choice: &NodeRef,
        prev: &str,
        visited: &mut HashSet<usize>,
    ) -> Option<NodeRef> {
        if !visited.insert(choice.identity()) {
            return None;
        }
        for alt in &choice.children {
            if !self.step() {
                return None;
            }
            match alt.tag.as_str() {
                tags::SEQUENCE => {
                    if sequence_contains_direct_element(alt, prev) {
                        return Some(alt.clone());
                    }
                }
                tags::GROUP => {
                    if let Some(resolved) = self.resolve_group_ref(index, alt) {
                        if let Some(seq) = resolved.first_child_named(tags::SEQUENCE) {
                            if sequence_contains_direct_element(seq, prev) {
                                return Some(seq.clone());
                            }
                        }
                        if let Some(nested_choice) = resolved.first_child_named(tags::CHOICE) {
                            if let Some(found) = self.find_sequence_alternative_containing(
                                index,
                                nested_choice,
                                prev,
                                visited,
                            ) {
                                return Some(found);
                            }
                        }
                    }
                }
                tags::CHOICE => {
                    if let Some(found) =
                        self.find_sequence_alternative_containing(index, alt, prev, visited)
                    {
                        return Some(found);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Items of a nested sequence that directly contained `prev` (§4.6
    /// choice-case step 2). When `parent_choice` is given, the sequence is
    /// itself one alternative of that choice, so the restart step must union
    /// in every sibling alternative's start elements, not just this
    /// sequence's own — e.g. a direct-element alternative like `do_all`
    /// reappears alongside this sequence's own restart.
    fn next_within_sequence_items(
        &self,
        index: &SchemaIndex,
        seq: &NodeRef,
        prev: &str,
        parent_choice: Option<&NodeRef>,
    ) -> Vec<ChildElement> {
        let default_occurs = Occurs::effective(seq, Occurs::ONE);
        let items: Vec<&NodeRef> = seq.children.iter().collect();
        let Some(prev_index) = items.iter().position(|i| i.tag == tags::ELEMENT && i.name() == Some(prev))
        else {
            return Vec::new();
        };

        let mut out = Vec::new();
        let prev_occurs = Occurs::effective(items[prev_index], default_occurs);
        if prev_occurs.can_repeat() {
            out.push(self.as_child_element(index, items[prev_index]));
        }

        for item in &items[prev_index + 1..] {
            if !self.step() {
                break;
            }
            let occurs = Occurs::effective(item, default_occurs);
            out.extend(self.start_elements_from_item(index, item));
            if occurs.min >= 1 {
                break;
            }
        }

        if let Some(choice) = parent_choice {
            out.extend(self.elements_in_choice(index, choice));
        }

        dedup(out)
    }

    /// Implements the `xs:sequence` branch of the next-after algorithm.
    fn next_after_sequence(&self, index: &SchemaIndex, seq: &NodeRef, prev: &str) -> Vec<ChildElement> {
        let default_occurs = Occurs::effective(seq, Occurs::ONE);
        let items: Vec<NodeRef> = seq.children.clone();

        let Some(holder_index) = self.find_item_containing(&items, prev) else {
            return Vec::new();
        };
        let holder = &items[holder_index];
        let mut out = Vec::new();

        match holder.tag.as_str() {
            tags::CHOICE => {
                out.extend(self.next_after_choice(index, holder, prev, &mut HashSet::new()));
                let rest = &items[holder_index + 1..];
                if rest.iter().all(|i| Occurs::effective(i, default_occurs).min == 0) {
                    for item in rest {
                        let occurs = Occurs::effective(item, default_occurs);
                        out.extend(self.start_elements_from_item(index, item));
                        if occurs.min >= 1 {
                            break;
                        }
                    }
                }
            }
            tags::GROUP => {
                if let Some(resolved) = self.resolve_group_ref(index, holder) {
                    if let Some(choice) = resolved.first_child_named(tags::CHOICE) {
                        out.extend(self.next_after_choice(index, choice, prev, &mut HashSet::new()));
                    } else if let Some(inner_seq) = resolved.first_child_named(tags::SEQUENCE) {
                        out.extend(self.next_after_sequence(index, inner_seq, prev));
                    }
                }
            }
            tags::ELEMENT => {
                let holder_occurs = Occurs::effective(holder, default_occurs);
                if holder_occurs.can_repeat() {
                    out.push(self.as_child_element(index, holder));
                }
                for item in &items[holder_index + 1..] {
                    if !self.step() {
                        break;
                    }
                    let occurs = Occurs::effective(item, default_occurs);
                    out.extend(self.start_elements_from_item(index, item));
                    if occurs.min >= 1 {
                        break;
                    }
                }
            }
            _ => {}
        }

        if default_occurs.can_repeat() {
            out.extend(self.start_elements_of_sequence(index, seq));
        }

        let out = dedup(out);
        self.apply_leakage_guard(seq, holder_index, out)
    }

    fn find_item_containing(&self, items: &[NodeRef], prev: &str) -> Option<usize> {
        items.iter().position(|item| match item.tag.as_str() {
            tags::ELEMENT => item.name() == Some(prev),
            tags::CHOICE => choice_contains_anywhere(item, prev),
            tags::SEQUENCE => sequence_contains_direct_element(item, prev),
            tags::GROUP => true, // best-effort: group membership resolved lazily by caller
            _ => false,
        })
    }

    /// §4.6 step 6: when the holder is a choice whose alternatives contain
    /// sequences, suppress non-start (position ≥ 2) element names from
    /// those sequence alternatives, since they're only reachable by first
    /// placing that alternative's own start element.
    fn apply_leakage_guard(
        &self,
        seq: &NodeRef,
        holder_index: usize,
        candidates: Vec<ChildElement>,
    ) -> Vec<ChildElement> {
        let Some(holder) = seq.children.get(holder_index) else {
            return candidates;
        };
        if holder.tag != tags::CHOICE {
            return candidates;
        }

        let mut non_start_names: HashSet<String> = HashSet::new();
        for alt in &holder.children {
            if alt.tag == tags::SEQUENCE {
                for item in alt.children.iter().skip(1) {
                    if item.tag == tags::ELEMENT {
                        if let Some(name) = item.name() {
                            non_start_names.insert(name.to_string());
                        }
                    }
                }
            }
        }

        candidates
            .into_iter()
            .filter(|c| c.node.name().map(|n| !non_start_names.contains(n)).unwrap_or(true))
            .collect()
    }
}

fn sequence_contains_direct_element(seq: &NodeRef, name: &str) -> bool {
    seq.children
        .iter()
        .any(|c| c.tag == tags::ELEMENT && c.name() == Some(name))
}

fn choice_contains_anywhere(choice: &NodeRef, name: &str) -> bool {
    choice.children.iter().any(|alt| match alt.tag.as_str() {
        tags::ELEMENT => alt.name() == Some(name),
        tags::CHOICE => choice_contains_anywhere(alt, name),
        tags::SEQUENCE => sequence_contains_direct_element(alt, name),
        _ => false,
    })
}

fn dedup(items: Vec<ChildElement>) -> Vec<ChildElement> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if seen.insert(item.node.identity()) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::SchemaDoc;
    use crate::locations::Location;

    fn build(xml: &str) -> SchemaIndex {
        let children = SchemaDoc::from_str(xml, &Location::String("t.xsd".to_string()))
            .unwrap()
            .children;
        SchemaIndex::build(&children)
    }

    fn names(elements: &[ChildElement]) -> Vec<&str> {
        elements.iter().map(|e| e.node.name().unwrap()).collect()
    }

    const IF_ELSE_SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="actions">
    <xs:complexType>
      <xs:choice maxOccurs="unbounded">
        <xs:element name="do_if"/>
        <xs:sequence>
          <xs:element name="do_elseif"/>
          <xs:element name="do_else" minOccurs="0"/>
        </xs:sequence>
        <xs:element name="do_all"/>
      </xs:choice>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

    #[test]
    fn test_start_capable_set_with_no_previous_sibling() {
        let index = build(IF_ELSE_SCHEMA);
        let walker = ContentModelWalker::new(EngineLimits::default());
        let def = &index.global_elements["actions"][0];
        let start = walker.possible_next_children(&index, def, None);
        let mut found = names(&start);
        found.sort();
        assert_eq!(found, vec!["do_all", "do_elseif", "do_if"]);
    }

    #[test]
    fn test_restart_after_first_element_of_nested_sequence_includes_other_choice_alternatives() {
        // Mirrors scenario 5: a choice of a direct `do_all` alternative and a
        // sequence `do_if, do_elseif*, do_else?`. `prev = "do_if"` is the
        // *first* element of the sequence alternative, so the restart step
        // must union in every other alternative of the enclosing choice too.
        let schema = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="actions">
    <xs:complexType>
      <xs:choice maxOccurs="unbounded">
        <xs:element name="do_all"/>
        <xs:sequence>
          <xs:element name="do_if"/>
          <xs:element name="do_elseif" minOccurs="0" maxOccurs="unbounded"/>
          <xs:element name="do_else" minOccurs="0"/>
        </xs:sequence>
      </xs:choice>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;
        let index = build(schema);
        let walker = ContentModelWalker::new(EngineLimits::default());
        let def = &index.global_elements["actions"][0];
        let next = walker.possible_next_children(&index, def, Some("do_if"));
        let mut found = names(&next);
        found.sort();
        assert_eq!(found, vec!["do_all", "do_else", "do_elseif", "do_if"]);
    }

    #[test]
    fn test_next_after_do_elseif_offers_do_else() {
        let index = build(IF_ELSE_SCHEMA);
        let walker = ContentModelWalker::new(EngineLimits::default());
        let def = &index.global_elements["actions"][0];
        let next = walker.possible_next_children(&index, def, Some("do_elseif"));
        let found = names(&next);
        assert!(found.contains(&"do_else"));
    }

    #[test]
    fn test_leakage_guard_excludes_do_else_after_unrelated_sibling() {
        let schema = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="actions">
    <xs:complexType>
      <xs:sequence>
        <xs:choice maxOccurs="unbounded">
          <xs:element name="do_if"/>
          <xs:sequence>
            <xs:element name="do_elseif"/>
            <xs:element name="do_else" minOccurs="0"/>
          </xs:sequence>
        </xs:choice>
        <xs:element name="cleanup"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;
        let index = build(schema);
        let walker = ContentModelWalker::new(EngineLimits::default());
        let def = &index.global_elements["actions"][0];
        let next = walker.possible_next_children(&index, def, Some("do_if"));
        let found = names(&next);
        assert!(!found.contains(&"do_else"));
    }

    #[test]
    fn test_xs_all_allows_any_remaining_child_in_any_order() {
        let schema = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="settings">
    <xs:complexType>
      <xs:all>
        <xs:element name="a"/>
        <xs:element name="b"/>
      </xs:all>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;
        let index = build(schema);
        let walker = ContentModelWalker::new(EngineLimits::default());
        let def = &index.global_elements["settings"][0];
        let next = walker.possible_next_children(&index, def, Some("a"));
        let mut found = names(&next);
        found.sort();
        assert_eq!(found, vec!["a", "b"]);
    }
}
