//! Pattern graph: the template a rule searches for in the live graph.
//!
//! Vertices and edges live in two arenas addressed by index. A pattern is
//! immutable once handed to a rule; all per-search state is kept by the
//! matcher, never on the pattern itself.

use std::fmt;

use gpm_graph::model::CARDINALITY_SUFFIX;
use gpm_graph::Cardinality;
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Result, RuleError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PatternVertexId(pub(crate) usize);

impl PatternVertexId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PatternVertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PatternEdgeId(pub(crate) usize);

impl PatternEdgeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PatternEdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// A single property constraint.
///
/// - plain: the live value must equal `value` (both absent counts as equal)
/// - `restricted`: the live value must differ from `value`
/// - `related`: `value` names a variable in the relation table instead of a literal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatternProperty {
    pub value: Option<String>,
    pub restricted: bool,
    pub related: bool,
}

impl PatternProperty {
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// A NOT-constraint on `value`.
    pub fn restricted(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            restricted: true,
            related: false,
        }
    }

    /// Binds the live value to the variable `name`.
    pub fn related(name: impl Into<String>) -> Self {
        Self {
            value: Some(name.into()),
            restricted: false,
            related: true,
        }
    }

    /// Requires the property to be absent.
    pub fn absent() -> Self {
        Self::default()
    }
}

/// Constraints keyed by live property name, in declaration order.
pub type PatternProperties = IndexMap<String, PatternProperty>;

/// Constraints on one metadata value, either on an edge or attached to a vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternMetadata {
    pub type_name: String,
    pub properties: PatternProperties,
}

impl PatternMetadata {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: PatternProperties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, property: PatternProperty) -> Self {
        self.properties.insert(key.into(), property);
        self
    }

    /// Cardinality declared by the pattern, read like live metadata reads it.
    pub fn cardinality(&self) -> Cardinality {
        let declared = self
            .properties
            .iter()
            .find(|(key, property)| key.ends_with(CARDINALITY_SUFFIX) && !property.related)
            .and_then(|(_, property)| property.value.as_deref());
        match declared {
            Some("singleValue") | None => Cardinality::Single,
            Some(_) => Cardinality::Multi,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternVertex {
    pub type_name: String,
    pub properties: PatternProperties,
    /// Every entry must be satisfied by some metadata on the live vertex.
    pub metadata: Vec<PatternMetadata>,
}

impl PatternVertex {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: PatternProperties::new(),
            metadata: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, property: PatternProperty) -> Self {
        self.properties.insert(key.into(), property);
        self
    }

    pub fn with_metadata(mut self, metadata: PatternMetadata) -> Self {
        self.metadata.push(metadata);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternEdge {
    pub source: PatternVertexId,
    pub target: PatternVertexId,
    pub metadata: PatternMetadata,
}

impl PatternEdge {
    pub fn touches(&self, v: PatternVertexId) -> bool {
        self.source == v || self.target == v
    }

    /// The endpoint across from `v`. A self-loop returns `v` itself.
    pub fn opposite(&self, v: PatternVertexId) -> Option<PatternVertexId> {
        if self.source == v {
            Some(self.target)
        } else if self.target == v {
            Some(self.source)
        } else {
            None
        }
    }
}

/// Arena-backed pattern multigraph with a designated publish vertex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatternGraph {
    vertices: Vec<PatternVertex>,
    edges: Vec<PatternEdge>,
    publish: Option<PatternVertexId>,
}

impl PatternGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, vertex: PatternVertex) -> PatternVertexId {
        self.vertices.push(vertex);
        PatternVertexId(self.vertices.len() - 1)
    }

    pub fn add_edge(
        &mut self,
        source: PatternVertexId,
        target: PatternVertexId,
        metadata: PatternMetadata,
    ) -> Result<PatternEdgeId> {
        self.check_vertex(source)?;
        self.check_vertex(target)?;
        self.edges.push(PatternEdge {
            source,
            target,
            metadata,
        });
        Ok(PatternEdgeId(self.edges.len() - 1))
    }

    pub fn set_publish_vertex(&mut self, id: PatternVertexId) -> Result<()> {
        self.check_vertex(id)?;
        self.publish = Some(id);
        Ok(())
    }

    /// The publish vertex, defaulting to the first vertex. `None` only for an empty pattern.
    pub fn publish_vertex(&self) -> Option<PatternVertexId> {
        self.publish
            .or_else(|| (!self.vertices.is_empty()).then_some(PatternVertexId(0)))
    }

    fn check_vertex(&self, id: PatternVertexId) -> Result<()> {
        if id.0 < self.vertices.len() {
            Ok(())
        } else {
            Err(RuleError::Validation(format!(
                "pattern vertex {id} does not exist ({} vertices)",
                self.vertices.len()
            )))
        }
    }

    /// The vertex behind an id minted by this pattern.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not returned by this pattern's [`add_vertex`](Self::add_vertex).
    /// Use [`get_vertex`](Self::get_vertex) for ids of unknown origin.
    pub fn vertex(&self, id: PatternVertexId) -> &PatternVertex {
        &self.vertices[id.0]
    }

    pub fn get_vertex(&self, id: PatternVertexId) -> Option<&PatternVertex> {
        self.vertices.get(id.0)
    }

    /// The edge behind an id minted by this pattern.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not returned by this pattern's [`add_edge`](Self::add_edge).
    /// Use [`get_edge`](Self::get_edge) for ids of unknown origin.
    pub fn edge(&self, id: PatternEdgeId) -> &PatternEdge {
        &self.edges[id.0]
    }

    pub fn get_edge(&self, id: PatternEdgeId) -> Option<&PatternEdge> {
        self.edges.get(id.0)
    }

    pub fn vertices(&self) -> impl Iterator<Item = (PatternVertexId, &PatternVertex)> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (PatternVertexId(i), v))
    }

    pub fn edges(&self) -> impl Iterator<Item = (PatternEdgeId, &PatternEdge)> {
        self.edges
            .iter()
            .enumerate()
            .map(|(i, e)| (PatternEdgeId(i), e))
    }

    /// Edges incident to `v`, in declaration order.
    pub fn edges_of(&self, v: PatternVertexId) -> impl Iterator<Item = PatternEdgeId> + '_ {
        self.edges()
            .filter(move |(_, e)| e.touches(v))
            .map(|(id, _)| id)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}
