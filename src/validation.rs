//! ValueValidator: attribute-value validation (§4.7) and attribute-name
//! validation (§4.8)

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::attributes::AttributeDescriptor;
use crate::error::{RuleViolationOutcome, ValidationOutcome};
use crate::types::TypeResolver;

static INTEGER_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").unwrap());
static NUMERIC_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?([eE][+-]?\d+)?$").unwrap());
static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static TIME_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}$").unwrap());

const INTEGER_BUILTINS: &[&str] = &[
    "xs:int",
    "xs:integer",
    "xs:long",
    "xs:short",
    "xs:byte",
    "xs:positiveInteger",
    "xs:negativeInteger",
    "xs:nonPositiveInteger",
    "xs:nonNegativeInteger",
    "xs:unsignedInt",
    "xs:unsignedLong",
    "xs:unsignedShort",
    "xs:unsignedByte",
];
const NUMERIC_BUILTINS: &[&str] = &["xs:float", "xs:double", "xs:decimal"];

/// Normalize a candidate value per §4.7: line breaks become spaces,
/// whitespace runs collapse to single spaces, the result is trimmed.
pub fn normalize(value: &str) -> String {
    let no_breaks = value.replace(['\n', '\r'], " ");
    let collapsed: String = no_breaks
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    collapsed.trim().to_string()
}

fn anchored(pattern: &str) -> String {
    let mut p = pattern.to_string();
    if !p.starts_with('^') {
        p = format!("^{p}");
    }
    if !p.ends_with('$') {
        p = format!("{p}$");
    }
    p
}

/// Instance validator: union-lenient, short-circuits on first acceptance
/// (§4.7 "Validation order").
pub struct ValueValidator<'a> {
    types: &'a TypeResolver<'a>,
}

impl<'a> ValueValidator<'a> {
    pub fn new(types: &'a TypeResolver<'a>) -> Self {
        Self { types }
    }

    pub fn validate(&self, descriptor: &AttributeDescriptor, raw_value: &str) -> ValidationOutcome {
        let value = normalize(raw_value);
        let mut restrictions = Vec::new();

        let enum_match = descriptor.enum_values.as_ref().map(|values| {
            restrictions.push(format!(
                "enumeration: {}",
                values.iter().map(|v| v.value.as_str()).collect::<Vec<_>>().join(", ")
            ));
            values.iter().any(|v| v.value == value)
        });
        if enum_match == Some(true) {
            return ValidationOutcome {
                is_valid: true,
                expected_type: descriptor.type_name.clone(),
                allowed_values: descriptor
                    .enum_values
                    .as_ref()
                    .map(|v| v.iter().map(|e| e.value.clone()).collect()),
                restrictions,
                error_message: None,
            };
        }

        let mut pattern_matched = false;
        let mut pattern_unusable = false;
        if let Some(patterns) = &descriptor.patterns {
            restrictions.push(format!("patterns: {}", patterns.join(", ")));
            for pattern in patterns {
                match Regex::new(&anchored(pattern)) {
                    Ok(re) => {
                        if re.is_match(&value) {
                            pattern_matched = true;
                            break;
                        }
                    }
                    Err(_) => {
                        tracing::warn!(pattern = %pattern, "PatternUnusable: skipping invalid regex facet");
                        pattern_unusable = true;
                    }
                }
            }
        }
        if pattern_matched {
            return ValidationOutcome {
                is_valid: true,
                expected_type: descriptor.type_name.clone(),
                allowed_values: None,
                restrictions,
                error_message: None,
            };
        }

        if enum_match.is_some() && descriptor.patterns.is_some() && !pattern_unusable {
            return ValidationOutcome {
                is_valid: false,
                expected_type: descriptor.type_name.clone(),
                allowed_values: descriptor
                    .enum_values
                    .as_ref()
                    .map(|v| v.iter().map(|e| e.value.clone()).collect()),
                restrictions,
                error_message: Some(format!(
                    "value '{value}' matched neither the allowed enumeration nor any pattern"
                )),
            };
        }
        if enum_match == Some(false) {
            return ValidationOutcome {
                is_valid: false,
                expected_type: descriptor.type_name.clone(),
                allowed_values: descriptor
                    .enum_values
                    .as_ref()
                    .map(|v| v.iter().map(|e| e.value.clone()).collect()),
                restrictions,
                error_message: Some(format!(
                    "value '{value}' is not one of the allowed enumeration values"
                )),
            };
        }

        if let Some(min_len) = descriptor.min_length {
            restrictions.push(format!("minLength: {min_len}"));
            if (value.chars().count() as u64) < min_len {
                return ValidationOutcome {
                    is_valid: false,
                    expected_type: descriptor.type_name.clone(),
                    allowed_values: None,
                    restrictions,
                    error_message: Some(format!("value '{value}' is shorter than minLength {min_len}")),
                };
            }
        }
        if let Some(max_len) = descriptor.max_length {
            restrictions.push(format!("maxLength: {max_len}"));
            if (value.chars().count() as u64) > max_len {
                return ValidationOutcome {
                    is_valid: false,
                    expected_type: descriptor.type_name.clone(),
                    allowed_values: None,
                    restrictions,
                    error_message: Some(format!("value '{value}' is longer than maxLength {max_len}")),
                };
            }
        }

        let builtin = descriptor
            .type_name
            .as_deref()
            .filter(|t| *t != "enumeration")
            .map(|t| self.types.resolve_to_builtin(t));

        if let Some(builtin) = &builtin {
            restrictions.push(format!("type: {builtin}"));
            if let Some(message) = self.check_builtin_shape(builtin, &value) {
                return ValidationOutcome {
                    is_valid: false,
                    expected_type: Some(builtin.clone()),
                    allowed_values: None,
                    restrictions,
                    error_message: Some(message),
                };
            }

            if let Some(message) = self.check_numeric_range(descriptor, builtin, &value) {
                return ValidationOutcome {
                    is_valid: false,
                    expected_type: Some(builtin.clone()),
                    allowed_values: None,
                    restrictions,
                    error_message: Some(message),
                };
            }
        }

        ValidationOutcome {
            is_valid: true,
            expected_type: descriptor.type_name.clone(),
            allowed_values: None,
            restrictions,
            error_message: None,
        }
    }

    fn check_builtin_shape(&self, builtin: &str, value: &str) -> Option<String> {
        match builtin {
            "xs:string" => None,
            "xs:boolean" => {
                let lowered = value.trim().to_lowercase();
                if matches!(lowered.as_str(), "true" | "false" | "1" | "0") {
                    None
                } else {
                    Some(format!("'{value}' is not a valid xs:boolean"))
                }
            }
            t if INTEGER_BUILTINS.contains(&t) => {
                if INTEGER_SHAPE.is_match(value) {
                    None
                } else {
                    Some(format!("'{value}' is not a valid {t}"))
                }
            }
            t if NUMERIC_BUILTINS.contains(&t) => {
                if NUMERIC_SHAPE.is_match(value) {
                    None
                } else {
                    Some(format!("'{value}' is not a valid {t}"))
                }
            }
            "xs:date" => {
                if DATE_SHAPE.is_match(value) {
                    None
                } else {
                    Some(format!("'{value}' is not a valid xs:date (expected YYYY-MM-DD)"))
                }
            }
            "xs:time" => {
                if TIME_SHAPE.is_match(value) {
                    None
                } else {
                    Some(format!("'{value}' is not a valid xs:time (expected HH:MM:SS)"))
                }
            }
            _ => None,
        }
    }

    fn check_numeric_range(
        &self,
        descriptor: &AttributeDescriptor,
        builtin: &str,
        value: &str,
    ) -> Option<String> {
        if !INTEGER_BUILTINS.contains(&builtin) && !NUMERIC_BUILTINS.contains(&builtin) {
            return None;
        }
        let parsed: Decimal = value.parse().ok()?;

        if let Some(min) = descriptor.min_inclusive.as_ref().and_then(|s| s.parse::<Decimal>().ok()) {
            if parsed < min {
                return Some(format!("{parsed} is below minInclusive {min}"));
            }
        }
        if let Some(max) = descriptor.max_inclusive.as_ref().and_then(|s| s.parse::<Decimal>().ok()) {
            if parsed > max {
                return Some(format!("{parsed} is above maxInclusive {max}"));
            }
        }
        if let Some(min) = descriptor.min_exclusive.as_ref().and_then(|s| s.parse::<Decimal>().ok()) {
            if parsed <= min {
                return Some(format!("{parsed} is not above minExclusive {min}"));
            }
        }
        if let Some(max) = descriptor.max_exclusive.as_ref().and_then(|s| s.parse::<Decimal>().ok()) {
            if parsed >= max {
                return Some(format!("{parsed} is not below maxExclusive {max}"));
            }
        }
        None
    }
}

/// Static, accumulating rule validator (§4.7, §6
/// `validateAttributeValueAgainstRules`): every failing facet is recorded,
/// and enumeration violation is suppressed when a pattern matched.
pub fn validate_attribute_value_against_rules(
    types: &TypeResolver,
    descriptors: &[AttributeDescriptor],
    name: &str,
    value: &str,
) -> RuleViolationOutcome {
    let Some(descriptor) = descriptors.iter().find(|d| d.name == name) else {
        return RuleViolationOutcome {
            is_valid: false,
            error_message: Some(format!("attribute '{name}' is not declared on this element")),
            violated_rules: Vec::new(),
        };
    };

    let normalized = normalize(value);
    let mut violated = Vec::new();

    let enum_matched = descriptor
        .enum_values
        .as_ref()
        .map(|values| values.iter().any(|v| v.value == normalized));
    if enum_matched == Some(false) {
        violated.push("enumeration".to_string());
    }

    let mut pattern_matched = false;
    if let Some(patterns) = &descriptor.patterns {
        let mut any_usable = false;
        for pattern in patterns {
            if let Ok(re) = Regex::new(&anchored(pattern)) {
                any_usable = true;
                if re.is_match(&normalized) {
                    pattern_matched = true;
                    break;
                }
            }
        }
        if any_usable && !pattern_matched {
            violated.push("pattern".to_string());
        }
    }

    if pattern_matched {
        violated.retain(|rule| rule != "enumeration");
    }

    if let Some(min_len) = descriptor.min_length {
        if (normalized.chars().count() as u64) < min_len {
            violated.push("minLength".to_string());
        }
    }
    if let Some(max_len) = descriptor.max_length {
        if (normalized.chars().count() as u64) > max_len {
            violated.push("maxLength".to_string());
        }
    }

    if let Some(type_name) = descriptor.type_name.as_deref().filter(|t| *t != "enumeration") {
        let builtin = types.resolve_to_builtin(type_name);
        if INTEGER_BUILTINS.contains(&builtin.as_str()) || NUMERIC_BUILTINS.contains(&builtin.as_str()) {
            if let Ok(parsed) = normalized.parse::<Decimal>() {
                if let Some(min) = descriptor.min_inclusive.as_ref().and_then(|s| s.parse::<Decimal>().ok()) {
                    if parsed < min {
                        violated.push("minInclusive".to_string());
                    }
                }
                if let Some(max) = descriptor.max_inclusive.as_ref().and_then(|s| s.parse::<Decimal>().ok()) {
                    if parsed > max {
                        violated.push("maxInclusive".to_string());
                    }
                }
                if let Some(min) = descriptor.min_exclusive.as_ref().and_then(|s| s.parse::<Decimal>().ok()) {
                    if parsed <= min {
                        violated.push("minExclusive".to_string());
                    }
                }
                if let Some(max) = descriptor.max_exclusive.as_ref().and_then(|s| s.parse::<Decimal>().ok()) {
                    if parsed >= max {
                        violated.push("maxExclusive".to_string());
                    }
                }
            } else {
                violated.push("type".to_string());
            }
        }
    }

    if violated.is_empty() {
        RuleViolationOutcome {
            is_valid: true,
            error_message: None,
            violated_rules: Vec::new(),
        }
    } else {
        RuleViolationOutcome {
            is_valid: false,
            error_message: Some(format!(
                "value '{normalized}' for attribute '{name}' violates: {}",
                violated.join(", ")
            )),
            violated_rules: violated,
        }
    }
}

/// §4.8 attribute-name validation result.
#[derive(Debug, Clone, Default)]
pub struct AttributeNameValidation {
    pub wrong_attributes: Vec<String>,
    pub missing_required_attributes: Vec<String>,
}

/// `validateAttributeNames(descriptors, providedNames)` (§4.8): filters out
/// infrastructure names (`xmlns`, `xmlns:*`, `xsi:*`) before comparing.
pub fn validate_attribute_names(
    descriptors: &[AttributeDescriptor],
    provided_names: &[String],
) -> AttributeNameValidation {
    let known: HashSet<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
    let required: HashSet<&str> = descriptors
        .iter()
        .filter(|d| d.required)
        .map(|d| d.name.as_str())
        .collect();

    let provided: Vec<&str> = provided_names
        .iter()
        .map(|s| s.as_str())
        .filter(|n| *n != "xmlns" && !n.starts_with("xmlns:") && !n.starts_with("xsi:"))
        .collect();
    let provided_set: HashSet<&str> = provided.iter().copied().collect();

    let wrong_attributes = provided
        .iter()
        .filter(|n| !known.contains(*n))
        .map(|n| n.to_string())
        .collect();
    let missing_required_attributes = required
        .iter()
        .filter(|n| !provided_set.contains(*n))
        .map(|n| n.to_string())
        .collect();

    AttributeNameValidation {
        wrong_attributes,
        missing_required_attributes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::EnumValue;
    use crate::documents::SchemaDoc;
    use crate::index::SchemaIndex;
    use crate::locations::Location;

    fn build_index(xml: &str) -> SchemaIndex {
        let children = SchemaDoc::from_str(xml, &Location::String("t.xsd".to_string()))
            .unwrap()
            .children;
        SchemaIndex::build(&children)
    }

    fn descriptor_with_enum(values: &[&str]) -> AttributeDescriptor {
        AttributeDescriptor {
            name: "mode".to_string(),
            type_name: Some("enumeration".to_string()),
            required: false,
            location: None,
            annotation: None,
            enum_values: Some(
                values
                    .iter()
                    .map(|v| EnumValue { value: v.to_string(), annotation: None })
                    .collect(),
            ),
            patterns: None,
            min_length: None,
            max_length: None,
            min_inclusive: None,
            max_inclusive: None,
            min_exclusive: None,
            max_exclusive: None,
        }
    }

    #[test]
    fn test_normalize_collapses_and_trims() {
        assert_eq!(normalize("  a\nb\r\n  c  "), "a b c");
    }

    #[test]
    fn test_enum_exact_match_is_valid() {
        let index = build_index(r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#);
        let types = TypeResolver::new(&index);
        let validator = ValueValidator::new(&types);
        let descriptor = descriptor_with_enum(&["on", "off"]);
        let result = validator.validate(&descriptor, "on");
        assert!(result.is_valid);
    }

    #[test]
    fn test_enum_mismatch_is_invalid_with_allowed_values() {
        let index = build_index(r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#);
        let types = TypeResolver::new(&index);
        let validator = ValueValidator::new(&types);
        let descriptor = descriptor_with_enum(&["on", "off"]);
        let result = validator.validate(&descriptor, "maybe");
        assert!(!result.is_valid);
        assert_eq!(
            result.allowed_values,
            Some(vec!["on".to_string(), "off".to_string()])
        );
    }

    #[test]
    fn test_pattern_anchored_match() {
        let index = build_index(r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#);
        let types = TypeResolver::new(&index);
        let validator = ValueValidator::new(&types);
        let mut descriptor = descriptor_with_enum(&[]);
        descriptor.enum_values = None;
        descriptor.patterns = Some(vec![r"[^']*".to_string()]);
        let result = validator.validate(&descriptor, "no quotes here");
        assert!(result.is_valid);
    }

    #[test]
    fn test_boolean_shape_rejects_garbage() {
        let index = build_index(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:simpleType name="Flag"><xs:restriction base="xs:boolean"/></xs:simpleType>
</xs:schema>"#,
        );
        let types = TypeResolver::new(&index);
        let validator = ValueValidator::new(&types);
        let mut descriptor = descriptor_with_enum(&[]);
        descriptor.enum_values = None;
        descriptor.type_name = Some("Flag".to_string());
        let ok = validator.validate(&descriptor, "true");
        let bad = validator.validate(&descriptor, "maybe");
        assert!(ok.is_valid);
        assert!(!bad.is_valid);
    }

    #[test]
    fn test_numeric_range_facet() {
        let index = build_index(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:simpleType name="Percent"><xs:restriction base="xs:integer"/></xs:simpleType>
</xs:schema>"#,
        );
        let types = TypeResolver::new(&index);
        let validator = ValueValidator::new(&types);
        let mut descriptor = descriptor_with_enum(&[]);
        descriptor.enum_values = None;
        descriptor.type_name = Some("Percent".to_string());
        descriptor.min_inclusive = Some("0".to_string());
        descriptor.max_inclusive = Some("100".to_string());
        assert!(validator.validate(&descriptor, "50").is_valid);
        assert!(!validator.validate(&descriptor, "150").is_valid);
    }

    #[test]
    fn test_accumulating_validator_suppresses_enum_violation_when_pattern_matches() {
        let index = build_index(r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#);
        let types = TypeResolver::new(&index);
        let mut descriptor = descriptor_with_enum(&["on", "off"]);
        descriptor.patterns = Some(vec!["o.*".to_string()]);
        let result = validate_attribute_value_against_rules(&types, &[descriptor], "mode", "over");
        assert!(!result.violated_rules.contains(&"enumeration".to_string()));
    }

    #[test]
    fn test_accumulating_validator_reports_unknown_attribute() {
        let index = build_index(r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#);
        let types = TypeResolver::new(&index);
        let result = validate_attribute_value_against_rules(&types, &[], "missing", "x");
        assert!(!result.is_valid);
    }

    #[test]
    fn test_attribute_name_validation_filters_infrastructure_and_flags_missing() {
        let mut required = descriptor_with_enum(&["on", "off"]);
        required.name = "mode".to_string();
        required.required = true;
        let provided = vec!["xmlns:foo".to_string(), "extra".to_string()];
        let result = validate_attribute_names(&[required], &provided);
        assert_eq!(result.wrong_attributes, vec!["extra".to_string()]);
        assert_eq!(result.missing_required_attributes, vec!["mode".to_string()]);
    }
}
