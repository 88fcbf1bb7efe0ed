//! HTTP webhook action.
//!
//! Posts every novel match as an incident JSON payload, or as a rendered
//! minijinja body when a template is configured.

use std::collections::HashMap;
use std::sync::Arc;

use gpm_rules::{PatternRule, RuleMatch};

use crate::templating::TemplateRenderer;
use crate::traits::{ActionError, Incident, RuleAction};

/// Delivers incidents over HTTP to a configured endpoint.
///
/// Environment variable references (`${VAR_NAME}`) in the URL and header
/// values are resolved at construction time.
#[derive(Debug)]
pub struct WebhookAction {
    /// Target URL (env vars already resolved).
    url: String,
    method: reqwest::Method,
    headers: HashMap<String, String>,
    /// When set, the request body is this template rendered with the
    /// incident; otherwise the incident is serialized as JSON directly.
    body_template: Option<String>,
    renderer: Arc<TemplateRenderer>,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl WebhookAction {
    /// Create a new webhook action. `method` defaults to `POST` when `None`.
    pub fn new(
        url: String,
        method: Option<reqwest::Method>,
        headers: HashMap<String, String>,
        body_template: Option<String>,
        renderer: Arc<TemplateRenderer>,
    ) -> Result<Self, ActionError> {
        let resolved_url = resolve_env_vars(&url)?;

        let mut resolved_headers = HashMap::with_capacity(headers.len());
        for (key, value) in &headers {
            resolved_headers.insert(key.clone(), resolve_env_vars(value)?);
        }

        // Validate body template syntax at construction time.
        if let Some(ref tmpl) = body_template {
            renderer
                .validate(tmpl)
                .map_err(|e| ActionError::Config(format!("invalid body template: {e}")))?;
        }

        Ok(Self {
            url: resolved_url,
            method: method.unwrap_or(reqwest::Method::POST),
            headers: resolved_headers,
            body_template,
            renderer,
            client: reqwest::Client::new(),
        })
    }

    /// Construct a [`WebhookAction`] from config-level primitives.
    ///
    /// `method` is parsed from a string (e.g. `"POST"`, `"PUT"`).
    pub fn from_config(
        url: String,
        method: Option<String>,
        headers: Option<HashMap<String, String>>,
        body_template: Option<String>,
        renderer: Arc<TemplateRenderer>,
    ) -> Result<Self, ActionError> {
        let parsed_method = match method {
            Some(m) => {
                let upper = m.to_uppercase();
                upper
                    .parse::<reqwest::Method>()
                    .map(Some)
                    .map_err(|_| ActionError::Config(format!("invalid HTTP method: {m}")))?
            }
            None => None,
        };

        Self::new(url, parsed_method, headers.unwrap_or_default(), body_template, renderer)
    }

    /// The request body for `incident`.
    pub fn body_for(&self, incident: &Incident) -> Result<String, ActionError> {
        match &self.body_template {
            Some(template) => self.renderer.render(template, incident),
            None => serde_json::to_string(incident)
                .map_err(|e| ActionError::Config(format!("failed to serialize incident: {e}"))),
        }
    }
}

#[async_trait::async_trait]
impl RuleAction for WebhookAction {
    async fn perform(&self, rule: &PatternRule, found: &RuleMatch) -> Result<(), ActionError> {
        let incident = Incident::new(rule, found)?;
        let body = self.body_for(&incident)?;

        let mut request = self
            .client
            .request(self.method.clone(), &self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                url = %self.url,
                %status,
                body = %body_text,
                "webhook returned non-2xx status"
            );
            return Err(ActionError::Config(format!("webhook returned {status}: {body_text}")));
        }

        tracing::debug!(
            url = %self.url,
            method = %self.method,
            status = %status,
            rule_id = %rule.id,
            digest = %incident.digest,
            "webhook incident delivered"
        );

        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }
}

/// Resolve `${VAR_NAME}` patterns in a string using `std::env::var`.
///
/// Returns an error if a referenced variable is not set.
fn resolve_env_vars(input: &str) -> Result<String, ActionError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if !closed {
                return Err(ActionError::Config(format!("unclosed env var reference in: {input}")));
            }
            let value = std::env::var(&var_name)
                .map_err(|_| ActionError::Config(format!("env var not found: {var_name}")))?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}
