//! Error taxonomy for the playback core.
//!
//! Every failure a view can observe is one of these variants. They are
//! cloneable so the orchestrator can keep the current one in its error slot
//! and publish it in view snapshots.

use crate::VideoId;

/// Default message when a delete fails without a server-provided reason.
pub const DEFAULT_DELETE_MESSAGE: &str = "Failed to delete video";

/// Error type for catalog, manifest and playback operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlayerError {
    /// Transport failure or non-2xx response on the listing or the manifest.
    #[error("Failed to fetch {resource}: {reason}")]
    FetchFailed { resource: String, reason: String },

    /// The identifier is absent from the catalog.
    #[error("Video not found: {0}")]
    NotFound(String),

    /// The manifest was fetched but could not be parsed or attached.
    #[error("Manifest error: {0}")]
    ManifestError(String),

    /// The server refused a delete. Displayed verbatim.
    #[error("{0}")]
    DeleteFailed(String),

    /// The server refused an upload. Displayed verbatim.
    #[error("{0}")]
    UploadFailed(String),

    /// Neither an adaptive engine nor a native playback path is available.
    #[error("Video format not supported")]
    UnsupportedPlayback,

    /// A quality selection that does not exist in the current ladder.
    #[error("Unknown quality level: {0}")]
    UnknownQuality(String),

    /// Quality selection was requested without an attached engine.
    #[error("No streaming engine attached")]
    NoEngine,
}

impl PlayerError {
    /// Create a FetchFailed error.
    pub fn fetch_failed(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::FetchFailed {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a NotFound error for an identifier.
    pub fn not_found(id: &VideoId) -> Self {
        Self::NotFound(id.to_string())
    }

    /// Create a ManifestError.
    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::ManifestError(msg.into())
    }

    /// Create a DeleteFailed error, falling back to the default message when
    /// the server gave none.
    pub fn delete_failed(message: Option<String>) -> Self {
        match message {
            Some(m) if !m.trim().is_empty() => Self::DeleteFailed(m),
            _ => Self::DeleteFailed(DEFAULT_DELETE_MESSAGE.to_string()),
        }
    }

    /// Create an UnknownQuality error.
    pub fn unknown_quality(selection: impl Into<String>) -> Self {
        Self::UnknownQuality(selection.into())
    }

    /// Whether a caller may reasonably retry the same operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchFailed { .. })
    }
}

/// Result type alias using [`PlayerError`].
pub type Result<T> = std::result::Result<T, PlayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlayerError::fetch_failed("catalog", "HTTP 503");
        assert_eq!(err.to_string(), "Failed to fetch catalog: HTTP 503");

        let err = PlayerError::not_found(&VideoId::from("v9"));
        assert_eq!(err.to_string(), "Video not found: v9");

        let err = PlayerError::manifest("missing #EXTM3U");
        assert_eq!(err.to_string(), "Manifest error: missing #EXTM3U");

        assert_eq!(
            PlayerError::UnsupportedPlayback.to_string(),
            "Video format not supported"
        );
    }

    #[test]
    fn test_delete_failed_is_verbatim() {
        let err = PlayerError::delete_failed(Some("locked".to_string()));
        assert_eq!(err.to_string(), "locked");
    }

    #[test]
    fn test_delete_failed_default_message() {
        assert_eq!(
            PlayerError::delete_failed(None).to_string(),
            DEFAULT_DELETE_MESSAGE
        );
        assert_eq!(
            PlayerError::delete_failed(Some("  ".to_string())).to_string(),
            DEFAULT_DELETE_MESSAGE
        );
    }

    #[test]
    fn test_only_fetch_failures_are_retryable() {
        assert!(PlayerError::fetch_failed("manifest", "timeout").is_retryable());
        assert!(!PlayerError::NotFound("x".into()).is_retryable());
        assert!(!PlayerError::NoEngine.is_retryable());
    }
}
