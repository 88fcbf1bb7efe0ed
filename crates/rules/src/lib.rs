//! Pattern rules over the live metadata graph.
//!
//! This crate provides:
//! - The pattern model (vertices, edges and property constraints with
//!   restriction and shared-variable semantics)
//! - Constraint comparison and the backtracking subgraph matcher
//! - Match records deduplicated by the content digest of their subgraph
//! - YAML rule documents with a filesystem loader and `notify` hot-reload
//! - The compiled-in example rule set

pub mod builtin;
pub mod compare;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod pattern;
pub mod recommendation;
pub mod relation;
pub mod rule;
pub mod rule_match;
pub mod schema;
pub mod source;

pub use builtin::builtin_rules;
pub use compare::{compare_metadata, compare_properties, compare_vertex};
pub use error::{Result, RuleError};
pub use loader::{LoadResult, LoadStatus, RuleChange, RuleLoader};
pub use matcher::PatternMatcher;
pub use pattern::{
    PatternEdge, PatternEdgeId, PatternGraph, PatternMetadata, PatternProperties, PatternProperty, PatternVertex,
    PatternVertexId,
};
pub use recommendation::render_recommendation;
pub use relation::RelationTable;
pub use rule::{PatternRule, RuleId};
pub use rule_match::RuleMatch;
pub use source::{DirectoryRuleSource, RuleSource, StaticRuleSource};
