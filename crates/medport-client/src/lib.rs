//! # MedPort Client - The Kit
//!
//! HTTP client for the MedPort medication API.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use medport_client::MedportClient;
//! use medport_core::MedicationForm;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = MedportClient::new("http://127.0.0.1:8000");
//!
//!     let mut form = MedicationForm::new();
//!     form.set_name("Ibuprofen");
//!     form.color_mut().set_name("White");
//!     form.color_mut().set_hex("#ffffff");
//!
//!     let notification = client.submit_form(&mut form).await;
//!     println!("{}", notification.message());
//! }
//! ```
//!
//! ## Submission flow
//!
//! ```text
//! MedicationForm ──validate──► invalid? ──► Notification::Invalid (no request)
//!        │
//!        └──► POST /api/medications ──► 2xx ──► Notification::Success, form reset
//!                                   └─► anything else ──► Notification::Failure,
//!                                                        form untouched
//! ```

use medport_core::{MedicationDetail, MedicationForm, MedicationInput, ValidationErrors};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Path the medication form posts to.
pub const SUBMIT_PATH: &str = "/api/medications";

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Errors from the MedPort client.
#[derive(Debug, Error)]
pub enum Error {
    /// The request could not be sent or the response not read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with a non-success status.
    #[error("server rejected the request with status {status}")]
    Rejected { status: u16, body: String },

    /// Client configuration was unusable.
    #[error("invalid client configuration: {0}")]
    Config(String),
}

// =============================================================================
// RESPONSE TYPES
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// =============================================================================
// NOTIFICATION
// =============================================================================

pub const MSG_CREATED: &str = "Medication created successfully!";
pub const MSG_FAILED: &str = "Failed to create medication. Please try again.";

/// What the user is told after pressing "Create Medication".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The server accepted the medication; the form was reset.
    Success,
    /// The request failed or the server said no; the form is unchanged.
    Failure,
    /// The form did not pass validation; nothing was sent.
    Invalid(ValidationErrors),
}

impl Notification {
    /// The headline shown to the user.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Success => MSG_CREATED.to_string(),
            Self::Failure => MSG_FAILED.to_string(),
            Self::Invalid(errors) => format!("Please correct the form: {}", errors),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// Options for building a [`MedportClient`].
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Sent as `Authorization: Bearer <key>` when set.
    pub api_key: Option<String>,
    /// Per-request timeout. None waits until the server answers.
    pub timeout: Option<Duration>,
}

/// HTTP client for the MedPort server.
#[derive(Debug, Clone)]
pub struct MedportClient {
    base_url: String,
    client: reqwest::Client,
}

impl MedportClient {
    /// Create a client with default options.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base(base_url.into()),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client with an API key and/or timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the API key contains invalid header characters,
    /// or [`Error::Http`] if the HTTP client fails to build.
    pub fn with_options(base_url: impl Into<String>, options: &ClientOptions) -> Result<Self, Error> {
        use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

        let mut builder = reqwest::Client::builder();
        if let Some(api_key) = &options.api_key {
            let mut headers = HeaderMap::new();
            let value = HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| Error::Config(format!("Invalid API key header: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
            builder = builder.default_headers(headers);
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: normalize_base(base_url.into()),
            client: builder.build()?,
        })
    }

    /// The server this client talks to, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let response = self.client.get(&url).send().await?;
        let response = ensure_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Health check.
    pub async fn health(&self) -> Result<HealthResponse, Error> {
        self.get_json("/health").await
    }

    /// The API root, as raw JSON.
    pub async fn root(&self) -> Result<serde_json::Value, Error> {
        self.get_json("/").await
    }

    /// The medication collection, as raw JSON.
    pub async fn medications_raw(&self) -> Result<serde_json::Value, Error> {
        self.get_json("/medications/").await
    }

    /// All medications with their colors and reminders.
    pub async fn medications(&self) -> Result<Vec<MedicationDetail>, Error> {
        self.get_json(SUBMIT_PATH).await
    }

    /// POST a submission body. Any 2xx is success; the response body is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] when the request fails and [`Error::Rejected`]
    /// for any non-2xx status.
    pub async fn post_medication(&self, input: &MedicationInput) -> Result<(), Error> {
        let url = self.url(SUBMIT_PATH);
        tracing::debug!(%url, name = %input.name, "POST medication");
        let response = self.client.post(&url).json(input).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    /// Validate and submit the form.
    ///
    /// On success the form is reset. On failure it is left exactly as it was,
    /// so the user can retry. Network and server errors are not told apart.
    pub async fn submit_form(&self, form: &mut MedicationForm) -> Notification {
        let input = match form.validate() {
            Ok(input) => input,
            Err(errors) => {
                tracing::debug!(errors = errors.len(), "form invalid, not submitting");
                return Notification::Invalid(errors);
            }
        };

        match self.post_medication(input).await {
            Ok(()) => {
                tracing::info!("medication created");
                form.reset();
                Notification::Success
            }
            Err(e) => {
                tracing::warn!(error = %e, "medication submission failed");
                Notification::Failure
            }
        }
    }
}

fn normalize_base(mut base_url: String) -> String {
    while base_url.ends_with('/') {
        base_url.pop();
    }
    base_url
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slashes() {
        let client = MedportClient::new("http://localhost:8000//");
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("/health"), "http://localhost:8000/health");
    }

    #[test]
    fn notification_messages() {
        assert_eq!(Notification::Success.message(), MSG_CREATED);
        assert_eq!(Notification::Failure.message(), MSG_FAILED);
        assert!(Notification::Success.is_success());
        assert!(!Notification::Invalid(ValidationErrors::new()).is_success());
    }

    #[test]
    fn bad_api_key_is_a_config_error() {
        let options = ClientOptions {
            api_key: Some("line\nbreak".to_string()),
            timeout: None,
        };
        let result = MedportClient::with_options("http://localhost", &options);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
