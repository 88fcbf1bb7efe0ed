use gpm_graph::{DiffDocument, GraphDocument, MetadataGraph};

use crate::error::Result;

/// The change set that moves a graph from timestamp `from` to `to`.
///
/// Every delete part is applied before any update part.
#[derive(Debug, Clone, Default)]
pub struct GraphDiff {
    pub from: u64,
    pub to: u64,
    pub updates: Vec<MetadataGraph>,
    pub deletes: Vec<MetadataGraph>,
}

impl GraphDiff {
    pub fn new(from: u64, to: u64) -> Self {
        Self {
            from,
            to,
            ..Self::default()
        }
    }

    pub fn with_update(mut self, part: MetadataGraph) -> Self {
        self.updates.push(part);
        self
    }

    pub fn with_delete(mut self, part: MetadataGraph) -> Self {
        self.deletes.push(part);
        self
    }

    pub fn from_document(from: u64, to: u64, doc: DiffDocument) -> Result<Self> {
        let decode = |docs: Vec<GraphDocument>| -> Result<Vec<MetadataGraph>> {
            docs.into_iter()
                .map(|d| MetadataGraph::from_document(d).map_err(Into::into))
                .collect()
        };
        Ok(Self {
            from,
            to,
            updates: decode(doc.updates)?,
            deletes: decode(doc.deletes)?,
        })
    }

    pub fn to_document(&self) -> DiffDocument {
        DiffDocument {
            updates: self.updates.iter().map(MetadataGraph::to_document).collect(),
            deletes: self.deletes.iter().map(MetadataGraph::to_document).collect(),
        }
    }

    /// Concatenate `self` and a diff that follows it.
    ///
    /// For diffs touching disjoint identifiers and links, applying the merged
    /// diff is equivalent to applying both in sequence.
    pub fn merge(mut self, next: GraphDiff) -> GraphDiff {
        self.to = next.to;
        self.deletes.extend(next.deletes);
        self.updates.extend(next.updates);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.updates.iter().all(MetadataGraph::is_empty)
            && self.deletes.iter().all(MetadataGraph::is_empty)
    }
}
