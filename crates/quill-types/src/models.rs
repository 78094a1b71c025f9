//! Static registry of supported chat models
//!
//! Each entry is addressable by its display name (what a UI shows), its model
//! id, or its cross-region inference profile. Lookups are exact and
//! case-sensitive.

use serde::Serialize;

/// Display name lookup failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("no model found for display name: {0}")]
    UnknownDisplayName(String),
}

/// One registered model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelSpec {
    /// Stable registry key
    pub key: &'static str,
    pub display_name: &'static str,
    pub model_id: &'static str,
    /// Cross-region profile, when the vendor offers one
    pub inference_profile: Option<&'static str>,
}

impl ModelSpec {
    /// Identifier to send on the wire: profile when present, model id otherwise
    #[inline]
    #[must_use]
    pub fn invocation_id(&self) -> &'static str {
        self.inference_profile.unwrap_or(self.model_id)
    }
}

/// Fast, cheap model used for query generation
pub const CLAUDE_HAIKU_3_5: ModelSpec = ModelSpec {
    key: "ANTHROPIC_HAIKU_3_5",
    display_name: "Claude 3.5 Haiku",
    model_id: "anthropic.claude-3-5-haiku-20241022-v1:0",
    inference_profile: Some("us.anthropic.claude-3-5-haiku-20241022-v1:0"),
};

/// Stronger model used for planning and writing
pub const CLAUDE_SONNET_3_5_V2: ModelSpec = ModelSpec {
    key: "ANTHROPIC_SONNET_3_5_V2",
    display_name: "Claude 3.5 Sonnet v2",
    model_id: "anthropic.claude-3-5-sonnet-20241022-v2:0",
    inference_profile: Some("us.anthropic.claude-3-5-sonnet-20241022-v2:0"),
};

const REGISTRY: &[ModelSpec] = &[CLAUDE_HAIKU_3_5, CLAUDE_SONNET_3_5_V2];

/// All registered models in declaration order
#[inline]
#[must_use]
pub fn all() -> &'static [ModelSpec] {
    REGISTRY
}

/// Look up by display name
///
/// # Errors
/// Returns `ModelError::UnknownDisplayName` when no entry matches exactly.
pub fn by_display_name(name: &str) -> Result<&'static ModelSpec, ModelError> {
    REGISTRY
        .iter()
        .find(|m| m.display_name == name)
        .ok_or_else(|| ModelError::UnknownDisplayName(name.to_string()))
}

/// Look up by model id or inference profile
#[must_use]
pub fn by_model_id(id: &str) -> Option<&'static ModelSpec> {
    REGISTRY
        .iter()
        .find(|m| m.model_id == id || m.inference_profile == Some(id))
}

#[must_use]
pub fn list_display_names() -> Vec<&'static str> {
    REGISTRY.iter().map(|m| m.display_name).collect()
}

/// Inference profiles, falling back to the model id for entries without one
#[must_use]
pub fn list_inference_profiles() -> Vec<&'static str> {
    REGISTRY.iter().map(ModelSpec::invocation_id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_id_lookup_returns_entry() {
        let model = by_model_id("anthropic.claude-3-5-haiku-20241022-v1:0").unwrap();
        assert_eq!(*model, CLAUDE_HAIKU_3_5);
        assert_eq!(model.display_name, "Claude 3.5 Haiku");
        assert_eq!(
            model.inference_profile,
            Some("us.anthropic.claude-3-5-haiku-20241022-v1:0")
        );
    }

    #[test]
    fn model_id_lookup_accepts_inference_profile() {
        let model = by_model_id("us.anthropic.claude-3-5-sonnet-20241022-v2:0").unwrap();
        assert_eq!(model.key, "ANTHROPIC_SONNET_3_5_V2");
    }

    #[test]
    fn model_id_lookup_is_exact() {
        assert!(by_model_id("ANTHROPIC.CLAUDE-3-5-HAIKU-20241022-V1:0").is_none());
        assert!(by_model_id("anthropic.claude-3-5-haiku").is_none());
        assert!(by_model_id("").is_none());
        assert!(by_model_id("invalid.model.id").is_none());
    }

    #[test]
    fn display_name_lookup_returns_entry() {
        let model = by_display_name("Claude 3.5 Haiku").unwrap();
        assert_eq!(model.model_id, "anthropic.claude-3-5-haiku-20241022-v1:0");
    }

    #[test]
    fn display_name_lookup_is_case_sensitive() {
        let err = by_display_name("claude 3.5 haiku").unwrap_err();
        assert_eq!(
            err.to_string(),
            "no model found for display name: claude 3.5 haiku"
        );
    }

    #[test]
    fn display_name_lookup_does_not_trim() {
        assert!(by_display_name(" Claude 3.5 Haiku").is_err());
        assert!(by_display_name("").is_err());
    }

    #[test]
    fn listings_follow_registry_order() {
        assert_eq!(
            list_display_names(),
            vec!["Claude 3.5 Haiku", "Claude 3.5 Sonnet v2"]
        );
        assert_eq!(
            list_inference_profiles(),
            vec![
                "us.anthropic.claude-3-5-haiku-20241022-v1:0",
                "us.anthropic.claude-3-5-sonnet-20241022-v2:0",
            ]
        );
    }

    #[test]
    fn invocation_id_falls_back_to_model_id() {
        let spec = ModelSpec {
            key: "LOCAL",
            display_name: "Local",
            model_id: "local-model",
            inference_profile: None,
        };
        assert_eq!(spec.invocation_id(), "local-model");
    }
}
