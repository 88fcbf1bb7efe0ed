//! Rule envelope for lightweight first-pass deserialization.

use serde::{Deserialize, Serialize};

use super::{CommonMetadata, RuleKind};

/// The only document version understood.
pub const API_VERSION: &str = "v1";

/// Lightweight first-pass deserializer that reads only the header fields.
///
/// Used during two-pass loading: first check `apiVersion`, `kind` and the
/// metadata, then deserialize the source again into the kind-specific type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEnvelope {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    /// Remaining fields, not interpreted by the first pass.
    #[serde(flatten)]
    pub rest: serde_yaml::Value,
}

impl RuleEnvelope {
    /// Parse the `kind` field into a typed [`RuleKind`].
    pub fn rule_kind(&self) -> std::result::Result<RuleKind, String> {
        self.kind.parse()
    }

    /// Check the header and return the document kind.
    pub fn check(&self) -> std::result::Result<RuleKind, String> {
        if self.api_version != API_VERSION {
            return Err(format!(
                "unsupported apiVersion '{}' (expected '{}')",
                self.api_version, API_VERSION
            ));
        }
        if self.metadata.id.is_empty() {
            return Err("rule metadata.id must not be empty".to_string());
        }
        self.rule_kind()
    }
}
