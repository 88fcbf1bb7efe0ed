use std::fmt;

use crate::model::Identifier;
use crate::store::Link;

/// A single observable change to the live graph.
#[derive(Debug, Clone)]
pub enum GraphEvent {
    IdentifierAdded(Identifier),
    IdentifierRemoved(Identifier),
    /// Metadata attached directly to the identifier was added, replaced or removed.
    IdentifierChanged(Identifier),
    LinkAdded(Link),
    LinkRemoved(Link),
}

impl GraphEvent {
    /// Whether this change can complete a pattern occurrence.
    ///
    /// Patterns only assert existence, so removals cannot create matches, and a
    /// bare identifier without links or metadata cannot satisfy anything a
    /// link or metadata change would not report anyway.
    pub fn is_trigger(&self) -> bool {
        matches!(self, GraphEvent::LinkAdded(_) | GraphEvent::IdentifierChanged(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GraphEvent::IdentifierAdded(_) => "identifier_added",
            GraphEvent::IdentifierRemoved(_) => "identifier_removed",
            GraphEvent::IdentifierChanged(_) => "identifier_changed",
            GraphEvent::LinkAdded(_) => "link_added",
            GraphEvent::LinkRemoved(_) => "link_removed",
        }
    }
}

impl fmt::Display for GraphEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphEvent::IdentifierAdded(i)
            | GraphEvent::IdentifierRemoved(i)
            | GraphEvent::IdentifierChanged(i) => write!(f, "{} {}", self.kind(), i),
            GraphEvent::LinkAdded(l) | GraphEvent::LinkRemoved(l) => write!(
                f,
                "{} {} -[{}]- {}",
                self.kind(),
                l.source,
                l.metadata,
                l.target
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Metadata, Properties};
    use crate::store::MetadataGraph;

    #[test]
    fn only_link_added_and_identifier_changed_trigger() {
        let dev = Identifier::new("device", [("/device/name", "d")].into_iter().collect());
        let ip = Identifier::new("ip-address", [("/ip-address[@value]", "1")].into_iter().collect());
        let mut g = MetadataGraph::new();
        let id = g
            .add_link(dev.clone(), ip, Metadata::new("device-ip", Properties::new()))
            .id();
        let link = g.link(id).cloned().unwrap();

        assert!(GraphEvent::LinkAdded(link.clone()).is_trigger());
        assert!(GraphEvent::IdentifierChanged(dev.clone()).is_trigger());
        assert!(!GraphEvent::LinkRemoved(link).is_trigger());
        assert!(!GraphEvent::IdentifierAdded(dev.clone()).is_trigger());
        assert!(!GraphEvent::IdentifierRemoved(dev).is_trigger());
    }
}
