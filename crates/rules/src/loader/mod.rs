//! Filesystem rule loader with hot-reload via a `notify` watcher.
//!
//! Scans the rules directory for `PatternRule` YAML documents and keeps the
//! loaded set in memory. While watching, file changes are re-parsed and
//! forwarded as [`RuleChange`]s.

mod core;
mod status;
mod store;
mod watcher;


pub use self::core::RuleLoader;
pub use self::status::{LoadResult, LoadStatus, RuleChange};
