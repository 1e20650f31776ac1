use thiserror::Error;

/// Fatal request errors. Each aborts the request it occurs in.
///
/// Side-effect failures (issue creation, notification) are not represented
/// here; they are folded into the outcome objects of a successful result.
#[derive(Debug, Error)]
pub enum TriageError {
    /// Bad or missing caller input.
    #[error("invalid ticket: {0}")]
    Validation(String),

    /// Model unavailable or inference failed.
    #[error("classification failed: {0}")]
    Classification(String),

    /// A category has no policy entry, or the policy source is malformed.
    #[error("routing configuration error: {0}")]
    RoutingConfig(String),
}

impl TriageError {
    /// Stable machine-readable kind, used in error response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Classification(_) => "classification_error",
            Self::RoutingConfig(_) => "routing_config_error",
        }
    }

    /// True for errors caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category: {0:?}")]
pub struct UnknownCategory(pub String);

impl From<UnknownCategory> for TriageError {
    fn from(err: UnknownCategory) -> Self {
        Self::RoutingConfig(err.to_string())
    }
}

/// Reject empty or whitespace-only ticket text.
pub fn validate_text(text: &str) -> Result<(), TriageError> {
    if text.trim().is_empty() {
        return Err(TriageError::Validation(
            "ticket text must not be empty".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_text_is_invalid() {
        for text in ["", "   ", "\n\t "] {
            assert!(matches!(
                validate_text(text),
                Err(TriageError::Validation(_))
            ));
        }
        assert!(validate_text(" help ").is_ok());
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(TriageError::Validation("x".into()).kind(), "validation_error");
        assert_eq!(
            TriageError::Classification("x".into()).kind(),
            "classification_error"
        );
        assert_eq!(
            TriageError::RoutingConfig("x".into()).kind(),
            "routing_config_error"
        );
        assert!(TriageError::Validation("x".into()).is_client_error());
        assert!(!TriageError::Classification("x".into()).is_client_error());
    }

    #[test]
    fn unknown_category_maps_to_routing_config() {
        let err: TriageError = UnknownCategory("spam".into()).into();
        assert!(matches!(err, TriageError::RoutingConfig(ref m) if m.contains("spam")));
    }
}
