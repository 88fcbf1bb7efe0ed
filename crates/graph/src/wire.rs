//! JSON wire representation of graph snapshots and diffs.
//!
//! A snapshot is `{timestamp, links: [...]}`. Each link entry either binds
//! two identifiers (`identifiers: [a, b]`) or attaches metadata to a single
//! identifier (`identifiers: a`); `metadata` is one object or an array.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::model::{Identifier, Metadata, Properties};
use crate::store::MetadataGraph;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// A single element becomes `One`, anything else `Many`.
    pub fn from_vec(mut items: Vec<T>) -> Self {
        if items.len() == 1 {
            if let Some(item) = items.pop() {
                return OneOrMany::One(item);
            }
        }
        OneOrMany::Many(items)
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifierDocument {
    pub typename: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(rename = "rawData", default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub typename: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(rename = "rawData", default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub identifiers: OneOrMany<IdentifierDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<OneOrMany<MetadataDocument>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub links: Vec<LinkEntry>,
}

/// Body of `GET {from}/{to}`: deletes are applied before updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffDocument {
    #[serde(default)]
    pub updates: Vec<GraphDocument>,
    #[serde(default)]
    pub deletes: Vec<GraphDocument>,
}

impl From<&Identifier> for IdentifierDocument {
    fn from(identifier: &Identifier) -> Self {
        Self {
            typename: identifier.type_name.clone(),
            properties: identifier.properties.clone(),
            raw_data: identifier.raw_data.clone(),
        }
    }
}

impl From<IdentifierDocument> for Identifier {
    fn from(doc: IdentifierDocument) -> Self {
        let mut identifier = Identifier::new(doc.typename, doc.properties);
        identifier.raw_data = doc.raw_data;
        identifier
    }
}

impl From<&Metadata> for MetadataDocument {
    fn from(metadata: &Metadata) -> Self {
        Self {
            typename: metadata.type_name.clone(),
            properties: metadata.properties.clone(),
            raw_data: metadata.raw_data.clone(),
        }
    }
}

impl From<MetadataDocument> for Metadata {
    fn from(doc: MetadataDocument) -> Self {
        let mut metadata = Metadata::new(doc.typename, doc.properties);
        metadata.raw_data = doc.raw_data;
        metadata
    }
}

impl MetadataGraph {
    pub fn from_document(doc: GraphDocument) -> Result<Self> {
        let mut graph = MetadataGraph::new();
        graph.set_last_updated(doc.timestamp);

        for entry in doc.links {
            let metadata: Vec<Metadata> = entry
                .metadata
                .map(OneOrMany::into_vec)
                .unwrap_or_default()
                .into_iter()
                .map(Metadata::from)
                .collect();

            match entry.identifiers {
                OneOrMany::One(doc) => attach(&mut graph, doc.into(), metadata),
                OneOrMany::Many(ids) if ids.len() == 1 => {
                    for doc in ids {
                        attach(&mut graph, doc.into(), metadata.clone());
                    }
                }
                OneOrMany::Many(ids) if ids.len() == 2 => {
                    let mut ids = ids.into_iter().map(Identifier::from);
                    let (Some(a), Some(b)) = (ids.next(), ids.next()) else {
                        continue;
                    };
                    graph.add_identifier(a.clone());
                    graph.add_identifier(b.clone());
                    for m in metadata {
                        graph.add_link(a.clone(), b.clone(), m);
                    }
                }
                OneOrMany::Many(ids) => {
                    return Err(GraphError::InvalidLink(format!(
                        "expected one or two identifiers, got {}",
                        ids.len()
                    )));
                }
            }
        }

        Ok(graph)
    }

    /// Links between the same pair of identifiers are grouped into one entry.
    pub fn to_document(&self) -> GraphDocument {
        let mut links = Vec::new();
        let mut visited: HashSet<&Identifier> = HashSet::new();

        for v in self.identifiers() {
            let mut seen: HashSet<&Identifier> = HashSet::new();
            for link in self.links_of(v) {
                let Some(other) = link.opposite(v) else { continue };
                if visited.contains(other) || seen.contains(other) {
                    continue;
                }
                let metadata: Vec<MetadataDocument> = self
                    .links_of(v)
                    .filter(|l| l.connects(v, other))
                    .map(|l| MetadataDocument::from(&l.metadata))
                    .collect();
                links.push(LinkEntry {
                    identifiers: OneOrMany::Many(vec![v.into(), other.into()]),
                    metadata: Some(OneOrMany::from_vec(metadata)),
                });
                seen.insert(other);
            }

            let attached = self.metadata_of(v);
            if !attached.is_empty() {
                links.push(LinkEntry {
                    identifiers: OneOrMany::One(v.into()),
                    metadata: Some(OneOrMany::from_vec(
                        attached.iter().map(MetadataDocument::from).collect(),
                    )),
                });
            }
            visited.insert(v);
        }

        GraphDocument {
            timestamp: self.last_updated(),
            links,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: GraphDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_document())?)
    }
}

fn attach(graph: &mut MetadataGraph, identifier: Identifier, metadata: Vec<Metadata>) {
    graph.add_identifier(identifier.clone());
    for m in metadata {
        graph.add_metadata_to_identifier(identifier.clone(), m);
    }
}

/// Parse an array of partial graphs, the shape of the `initial` and `current` endpoints.
pub fn documents_from_json_array(json: &str) -> Result<Vec<MetadataGraph>> {
    let docs: Vec<GraphDocument> = serde_json::from_str(json)?;
    docs.into_iter().map(MetadataGraph::from_document).collect()
}
