pub mod digest;
pub mod error;
pub mod events;
pub mod extended;
pub mod model;
pub mod store;
pub mod wire;

pub use error::{GraphError, Result};
pub use events::GraphEvent;
pub use extended::expand_extended;
pub use model::{Cardinality, Identifier, Metadata, Properties};
pub use store::{GraphStats, Link, LinkId, LinkOutcome, MetadataGraph, MetadataOutcome};
pub use wire::{DiffDocument, GraphDocument, IdentifierDocument, LinkEntry, MetadataDocument, OneOrMany};
