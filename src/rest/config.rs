use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::trace;

use crate::client::DatabaseTarget;
use crate::config::redacted;
use crate::error::SpannerDbError;

pub const PRODUCTION_ENDPOINT: &str = "https://spanner.googleapis.com";

/// Base URL for `target`: the emulator's REST gateway when one is configured.
#[must_use]
pub fn base_url(target: &DatabaseTarget) -> String {
    match target.emulator_host.as_deref() {
        Some(host) if host.starts_with("http://") || host.starts_with("https://") => {
            host.trim_end_matches('/').to_string()
        }
        Some(host) => format!("http://{}", host.trim_end_matches('/')),
        None => PRODUCTION_ENDPOINT.to_string(),
    }
}

/// HTTP plumbing shared by the session pool, connections and transactions.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    database_path: String,
    access_token: Option<String>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("database_path", &self.database_path)
            .field("access_token", &redacted(self.access_token.as_deref()))
            .finish_non_exhaustive()
    }
}

impl RestClient {
    #[must_use]
    pub fn new(http: reqwest::Client, target: &DatabaseTarget) -> Self {
        Self {
            http,
            base_url: base_url(target),
            database_path: target.database_path(),
            access_token: target.access_token.clone(),
        }
    }

    /// `projects/{p}/instances/{i}/databases/{d}`
    #[must_use]
    pub fn database_path(&self) -> &str {
        &self.database_path
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/v1/{resource}", self.base_url)
    }

    /// POST `body` to `/v1/{resource}` and decode the JSON reply.
    ///
    /// # Errors
    /// Returns `SpannerDbError::Api` for non-2xx replies, `HttpError` for transport failures
    /// and `JsonError` for undecodable bodies.
    pub async fn post<B, T>(&self, resource: &str, body: &B) -> Result<T, SpannerDbError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        trace!(resource, "POST");
        let mut request = self.http.post(self.url(resource)).json(body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        decode_response(response).await
    }

    /// DELETE `/v1/{resource}`.
    ///
    /// # Errors
    /// Same as [`RestClient::post`].
    pub async fn delete(&self, resource: &str) -> Result<(), SpannerDbError> {
        trace!(resource, "DELETE");
        let mut request = self.http.delete(self.url(resource));
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let _: JsonValue = decode_response(response).await?;
        Ok(())
    }
}

async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, SpannerDbError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(api_error(status.as_u16(), &body));
    }
    if body.trim().is_empty() {
        return Ok(serde_json::from_str("{}")?);
    }
    Ok(serde_json::from_str(&body)?)
}

/// Build an API error from a Google-style `{"error": {"message": ...}}` body.
pub(crate) fn api_error(status: u16, body: &str) -> SpannerDbError {
    let message = serde_json::from_str::<JsonValue>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(JsonValue::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());
    SpannerDbError::Api { status, message }
}

/// Re-tag a transport, API or decoding failure as `kind`, keeping the server's message.
///
/// Errors that already carry a kind pass through unchanged.
pub(crate) fn classify(
    err: SpannerDbError,
    kind: fn(String) -> SpannerDbError,
    context: &str,
) -> SpannerDbError {
    match err {
        SpannerDbError::Api { status, message } => {
            kind(format!("{context}: {message} (HTTP {status})"))
        }
        SpannerDbError::HttpError(e) => kind(format!("{context}: {e}")),
        SpannerDbError::JsonError(e) => kind(format!("{context}: unreadable response: {e}")),
        other => other,
    }
}
