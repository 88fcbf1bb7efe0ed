//! Pattern rule document and its conversion into a [`PatternRule`].

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use super::{CommonMetadata, RuleEnvelope, RuleKind};
use crate::error::{Result, RuleError};
use crate::pattern::{PatternGraph, PatternMetadata, PatternProperties, PatternProperty, PatternVertex};
use crate::rule::{PatternRule, RuleId};

/// Numeric id given to a rule whose document sets no `ruleId`. The engine
/// moves it to the next free id on registration.
pub const DEFAULT_RULE_ID: RuleId = RuleId(1);

/// A `kind: PatternRule` document.
///
/// ```yaml
/// apiVersion: v1
/// kind: PatternRule
/// metadata:
///   id: device-ip
///   name: Device IP check
/// spec:
///   recommendation: "Please check IP: $ip$"
///   publish: ip
///   vertices:
///     dev: { type: device }
///     ip:
///       type: ip-address
///       properties:
///         "/ip-address[@value]": { value: ip, related: true }
///   edges:
///     - { from: dev, to: ip, metadata: { type: device-ip } }
///   actions: [log]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternRuleDocument {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: RuleKind,
    pub metadata: CommonMetadata,
    pub spec: PatternRuleSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PatternRuleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<u64>,
    #[serde(default)]
    pub recommendation: String,
    /// Key of the publish vertex; the first vertex when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish: Option<String>,
    #[serde(deserialize_with = "unique_vertex_keys")]
    pub vertices: IndexMap<String, VertexSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
    #[serde(default)]
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VertexSpec {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub properties: IndexMap<String, PropertySpec>,
    #[serde(default)]
    pub metadata: Vec<MetadataSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetadataSpec {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub properties: IndexMap<String, PropertySpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
    pub metadata: MetadataSpec,
}

/// A property constraint: a bare string is a plain literal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PropertySpec {
    Literal(String),
    Constraint {
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        restricted: bool,
        #[serde(default)]
        related: bool,
    },
}

impl PropertySpec {
    fn to_property(&self, key: &str) -> Result<PatternProperty> {
        match self {
            PropertySpec::Literal(value) => Ok(PatternProperty::literal(value.clone())),
            PropertySpec::Constraint {
                value,
                restricted,
                related,
            } => {
                if *related && value.as_deref().map_or(true, str::is_empty) {
                    return Err(RuleError::Validation(format!(
                        "related property '{key}' needs a variable name as value"
                    )));
                }
                Ok(PatternProperty {
                    value: value.clone(),
                    restricted: *restricted,
                    related: *related,
                })
            }
        }
    }
}

fn unique_vertex_keys<'de, D>(deserializer: D) -> std::result::Result<IndexMap<String, VertexSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    struct UniqueKeys;

    impl<'de> Visitor<'de> for UniqueKeys {
        type Value = IndexMap<String, VertexSpec>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of vertex keys to vertices")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
            let mut vertices = IndexMap::new();
            while let Some((key, vertex)) = map.next_entry::<String, VertexSpec>()? {
                if vertices.contains_key(&key) {
                    return Err(de::Error::custom(format!("duplicate vertex key '{key}'")));
                }
                vertices.insert(key, vertex);
            }
            Ok(vertices)
        }
    }

    deserializer.deserialize_map(UniqueKeys)
}

fn to_properties(properties: &IndexMap<String, PropertySpec>) -> Result<PatternProperties> {
    properties
        .iter()
        .map(|(key, spec)| Ok::<_, RuleError>((key.clone(), spec.to_property(key)?)))
        .collect()
}

fn to_metadata(spec: &MetadataSpec) -> Result<PatternMetadata> {
    Ok(PatternMetadata {
        type_name: spec.type_name.clone(),
        properties: to_properties(&spec.properties)?,
    })
}

impl PatternRuleDocument {
    /// Two-pass parse: check the envelope, then deserialize the full document.
    pub fn from_yaml(source: &str) -> Result<Self> {
        let envelope: RuleEnvelope = serde_yaml::from_str(source)?;
        match envelope.check().map_err(RuleError::Validation)? {
            RuleKind::PatternRule => {
                let doc: PatternRuleDocument = serde_yaml::from_str(source)?;
                doc.validate()?;
                Ok(doc)
            }
        }
    }

    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Check everything [`to_rule`](Self::to_rule) would reject.
    pub fn validate(&self) -> Result<()> {
        self.to_pattern().map(|_| ())
    }

    pub fn to_pattern(&self) -> Result<PatternGraph> {
        let id = &self.metadata.id;
        if self.spec.vertices.is_empty() {
            return Err(RuleError::Validation(format!("rule '{id}' declares no vertices")));
        }

        let mut pattern = PatternGraph::new();
        let mut ids = HashMap::new();
        for (key, spec) in &self.spec.vertices {
            let mut vertex = PatternVertex::new(spec.type_name.clone());
            vertex.properties = to_properties(&spec.properties)?;
            vertex.metadata = spec.metadata.iter().map(to_metadata).collect::<Result<_>>()?;
            ids.insert(key.as_str(), pattern.add_vertex(vertex));
        }

        let lookup = |key: &str, role: &str| {
            ids.get(key).copied().ok_or_else(|| {
                RuleError::Validation(format!("rule '{id}': {role} references unknown vertex '{key}'"))
            })
        };

        for edge in &self.spec.edges {
            let from = lookup(&edge.from, "edge")?;
            let to = lookup(&edge.to, "edge")?;
            pattern.add_edge(from, to, to_metadata(&edge.metadata)?)?;
        }

        if let Some(publish) = &self.spec.publish {
            pattern.set_publish_vertex(lookup(publish, "publish")?)?;
        }
        Ok(pattern)
    }

    pub fn to_rule(&self) -> Result<PatternRule> {
        let pattern = self.to_pattern()?;
        let id = self.spec.rule_id.map(RuleId).unwrap_or(DEFAULT_RULE_ID);
        let mut rule = PatternRule::new(id, self.metadata.id.clone(), self.metadata.name.clone(), pattern)
            .with_description(self.metadata.description.clone().unwrap_or_default())
            .with_recommendation(self.spec.recommendation.clone());
        rule.actions = self.spec.actions.clone();
        Ok(rule)
    }
}
