//! Tests for schema types.

use super::*;
use crate::error::RuleError;
use crate::pattern::PatternProperty;
use crate::rule::RuleId;

const DEVICE_IP_YAML: &str = r#"
apiVersion: v1
kind: PatternRule
metadata:
  id: device-ip
  name: Device IP
  description: Any device holding an IPv4 address
  tags: [inventory]
spec:
  ruleId: 10
  recommendation: "Please check IP: $ip$"
  publish: ip
  vertices:
    dev:
      type: device
      properties:
        "/device/name": { value: bronko, restricted: true }
    ip:
      type: ip-address
      properties:
        "/ip-address[@type]": IPv4
        "/ip-address[@value]": { value: ip, related: true }
      metadata:
        - type: event
          properties:
            "/meta:event/name": scan
  edges:
    - from: dev
      to: ip
      metadata:
        type: device-ip
        properties:
          "/meta:device-ip[@ifmap-cardinality]": singleValue
  actions: [log, webhook]
"#;

#[test]
fn parse_pattern_rule_document() {
    let doc = PatternRuleDocument::from_yaml(DEVICE_IP_YAML).unwrap();
    assert_eq!(doc.api_version, "v1");
    assert_eq!(doc.kind, RuleKind::PatternRule);
    assert_eq!(doc.metadata.id, "device-ip");
    assert!(doc.metadata.enabled);
    assert_eq!(doc.spec.rule_id, Some(10));
    assert_eq!(doc.spec.vertices.len(), 2);
    assert_eq!(doc.spec.edges.len(), 1);
    assert_eq!(doc.spec.actions, vec!["log", "webhook"]);
}

#[test]
fn document_converts_into_rule() {
    let rule = PatternRuleDocument::from_yaml(DEVICE_IP_YAML).unwrap().to_rule().unwrap();
    assert_eq!(rule.id, RuleId(10));
    assert_eq!(rule.key, "device-ip");
    assert_eq!(rule.name, "Device IP");
    assert_eq!(rule.description, "Any device holding an IPv4 address");
    assert_eq!(rule.recommendation, "Please check IP: $ip$");

    let pattern = &rule.pattern;
    assert_eq!(pattern.vertex_count(), 2);
    assert_eq!(pattern.edge_count(), 1);

    let ip = pattern.publish_vertex().unwrap();
    let ip_vertex = pattern.vertex(ip);
    assert_eq!(ip_vertex.type_name, "ip-address");
    assert_eq!(
        ip_vertex.properties.get("/ip-address[@type]"),
        Some(&PatternProperty::literal("IPv4"))
    );
    assert_eq!(
        ip_vertex.properties.get("/ip-address[@value]"),
        Some(&PatternProperty::related("ip"))
    );
    assert_eq!(ip_vertex.metadata.len(), 1);

    let (dev, dev_vertex) = pattern.vertices().next().unwrap();
    assert_eq!(
        dev_vertex.properties.get("/device/name"),
        Some(&PatternProperty::restricted("bronko"))
    );
    let (_, edge) = pattern.edges().next().unwrap();
    assert_eq!((edge.source, edge.target), (dev, ip));
    assert_eq!(edge.metadata.type_name, "device-ip");
}

#[test]
fn missing_rule_id_and_publish_use_defaults() {
    let yaml = r#"
apiVersion: v1
kind: PatternRule
metadata:
  id: lonely
  name: Lonely
spec:
  vertices:
    only: { type: device }
"#;
    let rule = PatternRuleDocument::from_yaml(yaml).unwrap().to_rule().unwrap();
    assert_eq!(rule.id, DEFAULT_RULE_ID);
    assert_eq!(rule.pattern.publish_vertex().map(|v| v.index()), Some(0));
    assert!(rule.actions.is_empty());
}

#[test]
fn unknown_edge_endpoint_is_rejected() {
    let yaml = DEVICE_IP_YAML.replace("to: ip", "to: nowhere");
    let err = PatternRuleDocument::from_yaml(&yaml).unwrap_err();
    assert!(matches!(err, RuleError::Validation(ref msg) if msg.contains("nowhere")), "{err}");
}

#[test]
fn unknown_publish_key_is_rejected() {
    let yaml = DEVICE_IP_YAML.replace("publish: ip", "publish: mac");
    let err = PatternRuleDocument::from_yaml(&yaml).unwrap_err();
    assert!(matches!(err, RuleError::Validation(ref msg) if msg.contains("mac")), "{err}");
}

#[test]
fn duplicate_vertex_keys_are_rejected() {
    let yaml = r#"
apiVersion: v1
kind: PatternRule
metadata:
  id: dup
  name: Dup
spec:
  vertices:
    dev: { type: device }
    dev: { type: ip-address }
"#;
    assert!(PatternRuleDocument::from_yaml(yaml).is_err());
}

#[test]
fn related_property_needs_a_variable() {
    let yaml = DEVICE_IP_YAML.replace("{ value: ip, related: true }", "{ related: true }");
    let err = PatternRuleDocument::from_yaml(&yaml).unwrap_err();
    assert!(matches!(err, RuleError::Validation(_)), "{err}");
}

#[test]
fn header_is_checked_first() {
    let wrong_kind = DEVICE_IP_YAML.replace("kind: PatternRule", "kind: AnomalyRule");
    assert!(matches!(
        PatternRuleDocument::from_yaml(&wrong_kind),
        Err(RuleError::Validation(ref msg)) if msg.contains("unknown rule kind")
    ));

    let wrong_version = DEVICE_IP_YAML.replace("apiVersion: v1", "apiVersion: v2");
    assert!(matches!(
        PatternRuleDocument::from_yaml(&wrong_version),
        Err(RuleError::Validation(ref msg)) if msg.contains("apiVersion")
    ));

    let empty_id = DEVICE_IP_YAML.replace("id: device-ip", "id: \"\"");
    assert!(matches!(
        PatternRuleDocument::from_yaml(&empty_id),
        Err(RuleError::Validation(_))
    ));
}

#[test]
fn unknown_spec_fields_are_rejected() {
    let yaml = DEVICE_IP_YAML.replace("actions: [log, webhook]", "actoins: [log]");
    assert!(matches!(
        PatternRuleDocument::from_yaml(&yaml),
        Err(RuleError::Parse(_))
    ));
}

#[test]
fn yaml_round_trip_preserves_document() {
    let doc = PatternRuleDocument::from_yaml(DEVICE_IP_YAML).unwrap();
    let yaml = doc.to_yaml().unwrap();
    assert_eq!(PatternRuleDocument::from_yaml(&yaml).unwrap(), doc);
}
