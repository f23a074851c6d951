#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod types;

use reqwest::header::HeaderMap;
use reqwest::{Client as ReqwestClient, Request};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;

pub use auth::{AuthHeaders, Credentials, Params, Signer, Window};
pub use client::Client;
pub use config::Config;

pub type Result<T> = std::result::Result<T, Error>;

/// Unix timestamp in milliseconds.
pub type Timestamp = i64;

/// Production REST host.
pub const DEFAULT_HOST: &str = "https://api.backpack.exchange";

/// Longest slice of a non-JSON error body kept in the error message.
const ERROR_BODY_LIMIT: usize = 200;

/// Sends `request` with `headers` attached and returns the JSON body.
///
/// Non-2xx responses become [`error::Kind::Api`] errors, transport failures
/// [`error::Kind::Network`]. An empty 2xx body is returned as `Value::Null`.
pub(crate) async fn request(
    client: &ReqwestClient,
    mut request: Request,
    headers: Option<HeaderMap>,
) -> Result<Value> {
    let method = request.method().clone();
    let path = request.url().path().to_owned();

    if let Some(h) = headers {
        request.headers_mut().extend(h);
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(%method, %path, "sending request");

    let response = client.execute(request).await?;
    let status_code = response.status();
    let body = response.text().await?;

    if !status_code.is_success() {
        #[cfg(feature = "tracing")]
        tracing::debug!(%method, %path, status = %status_code, "request failed");

        let (code, message) = error_detail(&body);
        return Err(Error::status(status_code, method, path, code, message));
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_str(&body)?)
}

/// Extracts `(code, message)` from an error body: the `message` field of a
/// JSON object when present, else the head of the raw text.
fn error_detail(body: &str) -> (Option<String>, String) {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        let code = map.get("code").and_then(Value::as_str).map(str::to_owned);
        match map.get("message") {
            Some(Value::String(message)) => return (code, message.clone()),
            Some(other) => return (code, other.to_string()),
            None => {}
        }
    }

    (None, body.chars().take(ERROR_BODY_LIMIT).collect())
}

/// Decodes a typed record out of a JSON value.
pub(crate) fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    #[cfg(feature = "tracing")]
    {
        let mut unknown = Vec::new();
        let deserializer = serde_ignored::Deserializer::new(value, |path| {
            unknown.push(path.to_string());
        });
        let decoded: T = serde_path_to_error::deserialize(deserializer)?;
        if !unknown.is_empty() {
            tracing::trace!(fields = ?unknown, "ignored unknown response fields");
        }
        Ok(decoded)
    }

    #[cfg(not(feature = "tracing"))]
    {
        Ok(serde_json::from_value(value)?)
    }
}
