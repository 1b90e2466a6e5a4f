//! Integration tests exercising the full `Engine` pipeline against the
//! literal scenarios this schema family's lookup/validation behavior is
//! specified against.

use std::io::Write;

use tempfile::tempdir;
use xsd_lookup::Engine;

fn schema_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    for (name, contents) in files {
        let mut f = std::fs::File::create(dir.path().join(name)).unwrap();
        write!(f, "{contents}").unwrap();
    }
    dir
}

#[test]
fn scenario_1_enumeration_reject() {
    let dir = schema_dir(&[(
        "aiscripts.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="cue">
    <xs:complexType>
      <xs:attribute name="type">
        <xs:simpleType>
          <xs:restriction base="xs:string">
            <xs:enumeration value="trade"/>
            <xs:enumeration value="fight"/>
          </xs:restriction>
        </xs:simpleType>
      </xs:attribute>
    </xs:complexType>
  </xs:element>
</xs:schema>"#,
    )]);
    let engine = Engine::new(dir.path());
    engine.get_schema("aiscripts");

    let outcome = engine.validate_attribute_value("aiscripts", "cue", "type", "xplore", &[]);
    assert!(!outcome.is_valid);
    assert_eq!(
        outcome.allowed_values,
        Some(vec!["trade".to_string(), "fight".to_string()])
    );
    assert!(outcome.error_message.unwrap().contains("not"));
}

#[test]
fn scenario_2_pattern_anchoring() {
    let dir = schema_dir(&[(
        "aiscripts.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="cue">
    <xs:complexType>
      <xs:attribute name="comment">
        <xs:simpleType>
          <xs:restriction base="xs:string">
            <xs:pattern value="[^']*"/>
          </xs:restriction>
        </xs:simpleType>
      </xs:attribute>
    </xs:complexType>
  </xs:element>
</xs:schema>"#,
    )]);
    let engine = Engine::new(dir.path());
    engine.get_schema("aiscripts");

    let quoted = engine.validate_attribute_value("aiscripts", "cue", "comment", "value'with'quotes", &[]);
    assert!(!quoted.is_valid);

    let clean = engine.validate_attribute_value("aiscripts", "cue", "comment", "clean_value", &[]);
    assert!(clean.is_valid);
}

#[test]
fn scenario_3_union_numeric_widening() {
    let dir = schema_dir(&[(
        "aiscripts.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:simpleType name="LowRange">
    <xs:restriction base="xs:integer">
      <xs:minInclusive value="0"/>
      <xs:maxInclusive value="10"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:simpleType name="HighRange">
    <xs:restriction base="xs:integer">
      <xs:minInclusive value="100"/>
      <xs:maxInclusive value="200"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:simpleType name="EitherRange">
    <xs:union memberTypes="LowRange HighRange"/>
  </xs:simpleType>
  <xs:element name="cue">
    <xs:complexType>
      <xs:attribute name="amount" type="EitherRange"/>
    </xs:complexType>
  </xs:element>
</xs:schema>"#,
    )]);
    let engine = Engine::new(dir.path());
    engine.get_schema("aiscripts");

    assert!(engine.validate_attribute_value("aiscripts", "cue", "amount", "5", &[]).is_valid);
    assert!(engine.validate_attribute_value("aiscripts", "cue", "amount", "150", &[]).is_valid);
    assert!(engine.validate_attribute_value("aiscripts", "cue", "amount", "50", &[]).is_valid);
    assert!(!engine.validate_attribute_value("aiscripts", "cue", "amount", "-1", &[]).is_valid);
}

#[test]
fn scenario_4_hierarchical_resolution_distinguishes_same_named_elements() {
    let dir = schema_dir(&[(
        "aiscripts.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="libraries">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="library">
          <xs:complexType>
            <xs:sequence>
              <xs:element name="params">
                <xs:complexType>
                  <xs:sequence>
                    <xs:element name="param" type="LibraryParam"/>
                  </xs:sequence>
                </xs:complexType>
              </xs:element>
            </xs:sequence>
          </xs:complexType>
        </xs:element>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
  <xs:element name="cue">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="param_list">
          <xs:complexType>
            <xs:sequence>
              <xs:element name="param" type="CueParam"/>
            </xs:sequence>
          </xs:complexType>
        </xs:element>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
  <xs:simpleType name="LibraryParam">
    <xs:restriction base="xs:string"/>
  </xs:simpleType>
  <xs:simpleType name="CueParam">
    <xs:restriction base="xs:string"/>
  </xs:simpleType>
</xs:schema>"#,
    )]);
    let engine = Engine::new(dir.path());
    engine.get_schema("aiscripts");

    let under_library = engine
        .get_element_definition(
            "aiscripts",
            "param",
            &["params".to_string(), "library".to_string(), "libraries".to_string()],
        )
        .unwrap();
    let under_cue = engine
        .get_element_definition(
            "aiscripts",
            "param",
            &["param_list".to_string(), "cue".to_string()],
        )
        .unwrap();

    assert_eq!(under_library.attr("type"), Some("LibraryParam"));
    assert_eq!(under_cue.attr("type"), Some("CueParam"));
    assert_ne!(under_library.identity(), under_cue.identity());
}

#[test]
fn scenario_5_next_after_in_nested_choice_of_sequences() {
    let dir = schema_dir(&[(
        "aiscripts.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
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
</xs:schema>"#,
    )]);
    let engine = Engine::new(dir.path());
    engine.get_schema("aiscripts");

    let after_do_if = engine.get_possible_child_elements("aiscripts", "actions", &[], Some("do_if"));
    let names: Vec<&str> = after_do_if.iter().map(|(n, _)| n.as_str()).collect();
    assert!(names.contains(&"do_elseif"));
    assert!(names.contains(&"do_else"));
    assert!(names.contains(&"do_all"));

    let after_do_all = engine.get_possible_child_elements("aiscripts", "actions", &[], Some("do_all"));
    let names: Vec<&str> = after_do_all.iter().map(|(n, _)| n.as_str()).collect();
    assert!(!names.contains(&"do_elseif"));
    assert!(!names.contains(&"do_else"));
}

#[test]
fn scenario_6_required_and_wrong_attribute_names() {
    let dir = schema_dir(&[(
        "aiscripts.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="cue">
    <xs:complexType>
      <xs:attribute name="name" use="required"/>
      <xs:attribute name="value"/>
    </xs:complexType>
  </xs:element>
</xs:schema>"#,
    )]);
    let engine = Engine::new(dir.path());
    engine.get_schema("aiscripts");

    let descriptors = engine.get_element_attributes_with_types("aiscripts", "cue", &[]);
    let provided = vec!["value".to_string(), "xmlns:foo".to_string(), "stray".to_string()];
    let result = xsd_lookup::engine::validate_attribute_names_static(&descriptors, &provided);

    assert_eq!(result.wrong_attributes, vec!["stray".to_string()]);
    assert_eq!(result.missing_required_attributes, vec!["name".to_string()]);
}

#[test]
fn extension_attributes_prefix_matches_base_type() {
    let dir = schema_dir(&[(
        "aiscripts.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:complexType name="BaseCue">
    <xs:attribute name="id" use="required"/>
  </xs:complexType>
  <xs:element name="cue">
    <xs:complexType>
      <xs:complexContent>
        <xs:extension base="BaseCue">
          <xs:attribute name="name"/>
        </xs:extension>
      </xs:complexContent>
    </xs:complexType>
  </xs:element>
</xs:schema>"#,
    )]);
    let engine = Engine::new(dir.path());
    engine.get_schema("aiscripts");

    let attrs = engine.get_element_attributes_with_types("aiscripts", "cue", &[]);
    let names: Vec<&str> = attrs.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name"]);
}

#[test]
fn unknown_schema_returns_empty_results_not_panics() {
    let dir = schema_dir(&[]);
    let engine = Engine::new(dir.path());
    assert!(!engine.get_schema("missing"));
    assert!(engine.get_element_definition("missing", "cue", &[]).is_none());
    assert!(engine.get_element_attributes_with_types("missing", "cue", &[]).is_empty());
    assert!(engine.get_possible_child_elements("missing", "cue", &[], None).is_empty());
}
