use std::collections::{BTreeMap, HashMap};
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::{Identifier, Metadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LinkId(u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

/// An edge between two identifiers carrying exactly one metadata value.
///
/// Direction is kept for serialization only; every query treats the
/// endpoints as an unordered pair.
#[derive(Debug, Clone)]
pub struct Link {
    pub id: LinkId,
    pub source: Identifier,
    pub target: Identifier,
    pub metadata: Metadata,
}

impl Link {
    pub fn connects(&self, a: &Identifier, b: &Identifier) -> bool {
        (&self.source == a && &self.target == b) || (&self.source == b && &self.target == a)
    }

    pub fn touches(&self, v: &Identifier) -> bool {
        &self.source == v || &self.target == v
    }

    /// The endpoint across from `v`, or `None` if `v` is not an endpoint.
    pub fn opposite(&self, v: &Identifier) -> Option<&Identifier> {
        if &self.source == v {
            Some(&self.target)
        } else if &self.target == v {
            Some(&self.source)
        } else {
            None
        }
    }
}

/// What an insertion did to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Added(LinkId),
    /// A single-valued slot held different content and now holds the new value.
    Replaced(LinkId),
    Unchanged(LinkId),
}

impl LinkOutcome {
    pub fn id(&self) -> LinkId {
        match self {
            LinkOutcome::Added(id) | LinkOutcome::Replaced(id) | LinkOutcome::Unchanged(id) => *id,
        }
    }

    pub fn changed(&self) -> bool {
        !matches!(self, LinkOutcome::Unchanged(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataOutcome {
    Added,
    Replaced,
    Unchanged,
}

impl MetadataOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, MetadataOutcome::Unchanged)
    }
}

#[derive(Debug, Serialize)]
pub struct GraphStats {
    pub identifier_count: usize,
    pub link_count: usize,
    pub identifiers_by_type: HashMap<String, usize>,
    pub links_by_type: HashMap<String, usize>,
    pub last_updated: u64,
}

#[derive(Debug, Clone)]
struct Vertex {
    identifier: Identifier,
    metadata: Vec<Metadata>,
    links: Vec<LinkId>,
}

impl Vertex {
    fn is_orphaned(&self) -> bool {
        self.metadata.is_empty() && self.links.is_empty()
    }
}

/// A multigraph of identifiers joined by metadata-carrying links.
///
/// Identifiers are owned by value equality: adding an identifier that equals
/// one already present is a no-op. Iteration follows insertion order so that
/// matching and serialization are deterministic.
#[derive(Debug, Clone, Default)]
pub struct MetadataGraph {
    vertices: IndexMap<Identifier, Vertex>,
    links: BTreeMap<LinkId, Link>,
    next_link: u64,
    last_updated: u64,
}

impl MetadataGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_updated(&self) -> u64 {
        self.last_updated
    }

    pub fn set_last_updated(&mut self, timestamp: u64) {
        self.last_updated = timestamp;
    }

    // ── Identifiers ──────────────────────────────────────────

    /// Insert `identifier` unless an equal one exists. Returns `true` if inserted.
    pub fn add_identifier(&mut self, identifier: Identifier) -> bool {
        if self.vertices.contains_key(&identifier) {
            return false;
        }
        let vertex = Vertex {
            identifier: identifier.clone(),
            metadata: Vec::new(),
            links: Vec::new(),
        };
        self.vertices.insert(identifier, vertex);
        true
    }

    pub fn contains_identifier(&self, identifier: &Identifier) -> bool {
        self.vertices.contains_key(identifier)
    }

    /// The stored instance equal to `identifier` (it may carry raw data the probe lacks).
    pub fn identifier(&self, identifier: &Identifier) -> Option<&Identifier> {
        self.vertices.get(identifier).map(|v| &v.identifier)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.vertices.values().map(|v| &v.identifier)
    }

    pub fn identifier_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Metadata attached directly to `identifier` (empty if absent).
    pub fn metadata_of(&self, identifier: &Identifier) -> &[Metadata] {
        self.vertices
            .get(identifier)
            .map(|v| v.metadata.as_slice())
            .unwrap_or(&[])
    }

    /// Attach `metadata` to `identifier`, inserting the identifier if needed.
    ///
    /// Single-valued metadata replaces the value of the same type; multi-valued
    /// metadata is appended unless an identical value is already attached.
    pub fn add_metadata_to_identifier(
        &mut self,
        identifier: Identifier,
        metadata: Metadata,
    ) -> MetadataOutcome {
        let vertex = self
            .vertices
            .entry(identifier.clone())
            .or_insert_with(|| Vertex {
                identifier,
                metadata: Vec::new(),
                links: Vec::new(),
            });

        match vertex.metadata.iter().position(|m| m.slot_eq(&metadata)) {
            Some(pos) if vertex.metadata[pos] == metadata => MetadataOutcome::Unchanged,
            Some(pos) => {
                vertex.metadata[pos] = metadata;
                MetadataOutcome::Replaced
            }
            None => {
                vertex.metadata.push(metadata);
                MetadataOutcome::Added
            }
        }
    }

    /// Detach the value occupying `metadata`'s slot on `identifier`.
    /// The identifier is collected if this leaves it orphaned.
    pub fn remove_metadata_from_identifier(
        &mut self,
        identifier: &Identifier,
        metadata: &Metadata,
    ) -> Option<Metadata> {
        let vertex = self.vertices.get_mut(identifier)?;
        let pos = vertex.metadata.iter().position(|m| m.slot_eq(metadata))?;
        let removed = vertex.metadata.remove(pos);
        self.collect_identifier(identifier);
        Some(removed)
    }

    // ── Links ────────────────────────────────────────────────

    /// Link `a` and `b` with `metadata`, inserting missing endpoints.
    ///
    /// A single-valued value whose slot is taken replaces the existing content
    /// when it differs and is a no-op otherwise. A multi-valued value is added
    /// unless an identical link already exists.
    pub fn add_link(&mut self, a: Identifier, b: Identifier, metadata: Metadata) -> LinkOutcome {
        if let Some(id) = self.find_link(&a, &b, &metadata) {
            if let Some(link) = self.links.get_mut(&id) {
                if link.metadata == metadata {
                    return LinkOutcome::Unchanged(id);
                }
                link.metadata = metadata;
                return LinkOutcome::Replaced(id);
            }
        }

        self.add_identifier(a.clone());
        self.add_identifier(b.clone());

        let id = LinkId(self.next_link);
        self.next_link += 1;

        if let Some(v) = self.vertices.get_mut(&a) {
            v.links.push(id);
        }
        if a != b {
            if let Some(v) = self.vertices.get_mut(&b) {
                v.links.push(id);
            }
        }
        self.links.insert(
            id,
            Link {
                id,
                source: a,
                target: b,
                metadata,
            },
        );
        LinkOutcome::Added(id)
    }

    /// The link occupying `metadata`'s slot between `a` and `b`, in either direction.
    pub fn find_link(&self, a: &Identifier, b: &Identifier, metadata: &Metadata) -> Option<LinkId> {
        self.links_of(a)
            .find(|l| l.connects(a, b) && l.metadata.slot_eq(metadata))
            .map(|l| l.id)
    }

    pub fn contains_link(&self, a: &Identifier, b: &Identifier, metadata: &Metadata) -> bool {
        self.find_link(a, b, metadata).is_some()
    }

    /// Remove the link occupying `metadata`'s slot between `a` and `b`.
    /// Endpoints left without links and metadata are collected.
    pub fn remove_link(
        &mut self,
        a: &Identifier,
        b: &Identifier,
        metadata: &Metadata,
    ) -> Option<Link> {
        let id = self.find_link(a, b, metadata)?;
        self.remove_link_by_id(id)
    }

    pub fn remove_link_by_id(&mut self, id: LinkId) -> Option<Link> {
        let link = self.links.remove(&id)?;
        for endpoint in [&link.source, &link.target] {
            if let Some(v) = self.vertices.get_mut(endpoint) {
                v.links.retain(|l| *l != id);
            }
        }
        self.collect_identifier(&link.source);
        self.collect_identifier(&link.target);
        Some(link)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Links incident to `identifier` (empty if absent).
    pub fn links_of<'a>(&'a self, identifier: &Identifier) -> impl Iterator<Item = &'a Link> + 'a {
        self.vertices
            .get(identifier)
            .into_iter()
            .flat_map(|v| v.links.iter())
            .filter_map(move |id| self.links.get(id))
    }

    pub fn degree(&self, identifier: &Identifier) -> usize {
        self.vertices.get(identifier).map_or(0, |v| v.links.len())
    }

    // ── Garbage collection ───────────────────────────────────

    fn collect_identifier(&mut self, identifier: &Identifier) -> bool {
        match self.vertices.get(identifier) {
            Some(v) if v.is_orphaned() => {
                self.vertices.shift_remove(identifier);
                true
            }
            _ => false,
        }
    }

    /// Remove every identifier with no links and no metadata. Returns what was removed.
    pub fn collect_garbage(&mut self) -> Vec<Identifier> {
        let orphans: Vec<Identifier> = self
            .vertices
            .values()
            .filter(|v| v.is_orphaned())
            .map(|v| v.identifier.clone())
            .collect();
        for orphan in &orphans {
            self.vertices.shift_remove(orphan);
        }
        orphans
    }

    // ── Bulk ─────────────────────────────────────────────────

    /// Merge every identifier, identifier metadata and link of `other` into `self`.
    pub fn merge(&mut self, other: &MetadataGraph) {
        for vertex in other.vertices.values() {
            self.add_identifier(vertex.identifier.clone());
            for m in &vertex.metadata {
                self.add_metadata_to_identifier(vertex.identifier.clone(), m.clone());
            }
        }
        for link in other.links.values() {
            self.add_link(link.source.clone(), link.target.clone(), link.metadata.clone());
        }
    }

    pub fn stats(&self) -> GraphStats {
        let mut identifiers_by_type: HashMap<String, usize> = HashMap::new();
        for id in self.identifiers() {
            *identifiers_by_type.entry(id.type_name.clone()).or_default() += 1;
        }

        let mut links_by_type: HashMap<String, usize> = HashMap::new();
        for link in self.links.values() {
            *links_by_type.entry(link.metadata.type_name.clone()).or_default() += 1;
        }

        GraphStats {
            identifier_count: self.vertices.len(),
            link_count: self.links.len(),
            identifiers_by_type,
            links_by_type,
            last_updated: self.last_updated,
        }
    }
}

impl PartialEq for MetadataGraph {
    fn eq(&self, other: &Self) -> bool {
        self.vertices.len() == other.vertices.len()
            && self.links.len() == other.links.len()
            && self.canonical_lines() == other.canonical_lines()
    }
}

impl Eq for MetadataGraph {}
