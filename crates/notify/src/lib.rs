//! Match dispatch and actions.
//!
//! This crate provides:
//! - `RuleAction` trait for pluggable reactions to novel matches
//! - Log and webhook actions, with minijinja body templates
//! - `ActionRegistry` resolving the action names rules refer to
//! - `MatchEngine`, which evaluates affected rules per change batch and
//!   fires each distinct match once

pub mod dispatcher;
pub mod log_action;
pub mod registry;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use dispatcher::MatchEngine;
pub use log_action::LogAction;
pub use registry::ActionRegistry;
pub use templating::TemplateRenderer;
pub use traits::{ActionError, DispatchResult, Incident, PublishedIdentifier, RuleAction};
pub use webhook::WebhookAction;
