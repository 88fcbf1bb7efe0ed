//! YAML rule documents with serde deserialization.
//!
//! - `RuleEnvelope`: lightweight first-pass header (apiVersion, kind, metadata)
//! - `PatternRuleDocument`: a full pattern rule, convertible into a [`PatternRule`](crate::PatternRule)

mod document;
mod envelope;
mod kind;
mod metadata;

pub use document::*;
pub use envelope::*;
pub use kind::*;
pub use metadata::*;

#[cfg(test)]
mod tests;
