//! The resolver port, its error taxonomy, and error-body normalization.

use async_trait::async_trait;
use reqwest::Error as ReqwestError;
use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::Value;
use tracing::warn;

use crate::model::{
    DebugPreview, ResolutionInput, ResolvedRoute, Selection, TownConfig, VersionResponse,
};
use crate::url::EndpointError;

/// Shown when a town's endpoint configuration cannot produce a URL.
pub const MISCONFIGURED_MESSAGE: &str =
    "This town's calendar service is misconfigured. Please try again later.";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Failures of a remote call, as shown to the user.
pub enum ApiError {
    /// The request exceeded its time bound.
    #[error("Request timed out. Please try again.")]
    Timeout,
    /// Network or transport failure.
    #[error("The backend is temporarily unavailable. Please retry.")]
    Unavailable,
    /// Non-success status with a structured JSON error body.
    #[error("{message}")]
    Remote {
        /// Message from the body, or `HTTP <status>` when it had none.
        message: String,
        /// HTTP status code.
        status: u16,
        /// Street suggestions, in service order.
        suggestions: Vec<String>,
        /// The street is known but needs a house number.
        requires_number: bool,
    },
    /// Non-success status without a usable JSON body.
    #[error("HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
    /// A success status whose body is not the expected JSON.
    #[error("Unexpected response from the backend.")]
    InvalidResponse,
    /// The request URL could not be built.
    #[error("{}", MISCONFIGURED_MESSAGE)]
    Endpoint(#[source] EndpointError),
}

impl ApiError {
    /// User-facing message.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// HTTP status, when a response was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Remote { status, .. } | ApiError::Status { status } => Some(*status),
            _ => None,
        }
    }

    /// Street suggestions carried by the error.
    #[must_use]
    pub fn suggestions(&self) -> &[String] {
        match self {
            ApiError::Remote { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    /// Whether the service asked for a house number.
    #[must_use]
    pub fn requires_number(&self) -> bool {
        matches!(
            self,
            ApiError::Remote {
                requires_number: true,
                ..
            }
        )
    }

    /// Build the error for a non-success response from its status and optional JSON body.
    ///
    /// `json_body` is `None` when the response was not declared as JSON.
    #[must_use]
    pub fn from_error_response(status: u16, json_body: Option<&[u8]>) -> Self {
        let Some(body) = json_body.and_then(|bytes| serde_json::from_slice::<ErrorBody>(bytes).ok())
        else {
            return ApiError::Status { status };
        };

        ApiError::Remote {
            message: body.error.unwrap_or_else(|| format!("HTTP {status}")),
            status,
            suggestions: body.suggestions.into_strings(),
            requires_number: body.requires_number.unwrap_or(false),
        }
    }
}

impl From<EndpointError> for ApiError {
    fn from(err: EndpointError) -> Self {
        warn!(error = %err, "request URL could not be built");
        ApiError::Endpoint(err)
    }
}

impl From<ReqwestError> for ApiError {
    fn from(err: ReqwestError) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::InvalidResponse
        } else if let Some(status) = err.status() {
            ApiError::Status {
                status: status.as_u16(),
            }
        } else {
            ApiError::Unavailable
        }
    }
}

/// Error body shape shared by `/resolve` and `/debug`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    suggestions: SuggestionPayload,
    #[serde(default)]
    requires_number: Option<bool>,
}

/// Suggestions as sent by the service: hopefully a list, possibly anything.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SuggestionPayload {
    List(Vec<SuggestionEntry>),
    Other(IgnoredAny),
}

impl Default for SuggestionPayload {
    fn default() -> Self {
        SuggestionPayload::List(Vec::new())
    }
}

impl SuggestionPayload {
    fn into_strings(self) -> Vec<String> {
        match self {
            SuggestionPayload::List(entries) => entries
                .into_iter()
                .filter_map(|entry| match entry {
                    SuggestionEntry::Plain(street) | SuggestionEntry::Record { street } => {
                        Some(street)
                    }
                    SuggestionEntry::Unknown(_) => None,
                })
                .collect(),
            SuggestionPayload::Other(_) => Vec::new(),
        }
    }
}

/// A single suggestion: a street name or a record carrying one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SuggestionEntry {
    Plain(String),
    Record { street: String },
    Unknown(IgnoredAny),
}

/// Flatten a raw suggestions payload into street names.
///
/// Entries that are neither strings nor objects with a string `street` are dropped, and
/// anything other than an array yields an empty list.
#[must_use]
pub fn normalize_suggestions(raw: &Value) -> Vec<String> {
    SuggestionPayload::deserialize(raw)
        .map(SuggestionPayload::into_strings)
        .unwrap_or_default()
}

#[async_trait]
/// Remote calls the orchestrator needs from a town's calendar service.
pub trait ResolverPort: Send + Sync {
    /// Town this port talks to.
    fn town(&self) -> &TownConfig;

    /// Fetch the service and schema version.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails.
    async fn fetch_version(&self) -> Result<VersionResponse, ApiError>;

    /// Resolve an address or street/number to a route.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] carrying suggestions or the house-number flag on rejection.
    async fn resolve_route(&self, input: &ResolutionInput) -> Result<ResolvedRoute, ApiError>;

    /// Fetch upcoming pickups for a selection.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails or the service rejects the selection.
    async fn fetch_debug_preview(&self, selection: &Selection) -> Result<DebugPreview, ApiError>;

    /// List the street names the service knows.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the request fails.
    async fn fetch_streets(&self) -> Result<Vec<String>, ApiError>;
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Clipboard unavailable: {0}")]
/// The clipboard rejected a write.
pub struct ClipboardError(pub String);

/// Destination for the copy action.
pub trait Clipboard {
    /// Replace the clipboard contents with `text`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClipboardError`] when the text could not be placed on the clipboard.
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}
