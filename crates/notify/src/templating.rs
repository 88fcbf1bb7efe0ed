//! Minijinja template rendering for action payloads.
//!
//! Templates see the [`Incident`] fields at the top level, so a webhook body
//! can say `{{ rule_name }}`, `{{ recommendation }}`,
//! `{{ publish_vertex.type_name }}` or iterate `{% for k, v in bindings|items %}`.
//!
//! Templates are arbitrary strings (not pre-registered), so a fresh
//! [`minijinja::Environment`] is created per render call.

use crate::traits::{ActionError, Incident};

/// Renders incident templates using minijinja.
#[derive(Debug)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();

        // `lower` and `upper` are built-in with the "builtins" feature,
        // but we register explicit versions to guarantee availability.
        env.add_filter("lower", lower_filter);
        env.add_filter("upper", upper_filter);
        env.add_filter("json", json_filter);

        env.add_function("env", env_function);

        env
    }

    /// Render `template_str` with the incident as context.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Template`] if the template is invalid or
    /// rendering fails.
    pub fn render(&self, template_str: &str, incident: &Incident) -> Result<String, ActionError> {
        let env = Self::build_env();
        env.render_str(template_str, incident)
            .map_err(|e| ActionError::Template(e.to_string()))
    }

    /// Validate that a template string parses without errors.
    ///
    /// This does not evaluate the template, it only checks syntax.
    pub fn validate(&self, template_str: &str) -> Result<(), ActionError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| ActionError::Template(e.to_string()))?;
        Ok(())
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn lower_filter(value: String) -> String {
    value.to_lowercase()
}

fn upper_filter(value: String) -> String {
    value.to_uppercase()
}

/// Custom filter: serialize any value as a JSON string literal-safe text.
fn json_filter(value: minijinja::Value) -> Result<String, minijinja::Error> {
    serde_json::to_string(&value)
        .map_err(|e| minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, e.to_string()))
}

/// Global function: read an environment variable by name.
///
/// Returns the variable value, or an empty string if not found
/// (with a warning logged via tracing).
fn env_function(name: String) -> String {
    match std::env::var(&name) {
        Ok(val) => val,
        Err(_) => {
            tracing::warn!(var = %name, "Environment variable not found, returning empty string");
            String::new()
        }
    }
}
