use std::error::Error as StdError;
use std::fmt;

use reqwest::{Method, StatusCode};

/// Broad classification of every failure this crate can surface.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    /// Credential material could not be decoded into an ED25519 keypair.
    KeyFormat,
    /// Caller-supplied arguments failed a precondition. No request was sent.
    Validation,
    /// The exchange answered with a non-2xx status.
    Api,
    /// The request never completed: connection refused, DNS, timeout.
    Network,
    /// Missing or malformed configuration (environment, host).
    Config,
    /// Anything else, e.g. a 2xx body that does not decode.
    Internal,
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Box<dyn StdError + Send + Sync + 'static>,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.source.as_ref()
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.source.downcast_ref::<E>()
    }

    pub fn validation<S: Into<String>>(reason: S) -> Self {
        Validation {
            reason: reason.into(),
        }
        .into()
    }

    pub fn key_format<S: Into<String>>(reason: S) -> Self {
        KeyFormat {
            reason: reason.into(),
        }
        .into()
    }

    pub fn config<S: Into<String>>(reason: S) -> Self {
        Config {
            reason: reason.into(),
        }
        .into()
    }

    pub fn status<S: Into<String>>(
        status_code: StatusCode,
        method: Method,
        path: String,
        code: Option<String>,
        message: S,
    ) -> Self {
        Status {
            status_code,
            method,
            path,
            code,
            message: message.into(),
        }
        .into()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Kind::Network => write!(f, "Network error: {}", self.source),
            _ => write!(f, "{}", self.source),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref())
    }
}

/// A non-2xx response from the exchange.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub status_code: StatusCode,
    pub method: Method,
    pub path: String,
    /// Exchange error code (`INSUFFICIENT_FUNDS`, ...) when the body carried one.
    pub code: Option<String>,
    pub message: String,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status_code.as_u16(), self.message)
    }
}

impl StdError for Status {}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validation {
    pub reason: String,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl StdError for Validation {}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyFormat {
    pub reason: String,
}

impl fmt::Display for KeyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid key material: {}", self.reason)
    }
}

impl StdError for KeyFormat {}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub reason: String,
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl StdError for Config {}

impl From<Status> for Error {
    fn from(err: Status) -> Self {
        Error::with_source(Kind::Api, err)
    }
}

impl From<Validation> for Error {
    fn from(err: Validation) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}

impl From<KeyFormat> for Error {
    fn from(err: KeyFormat) -> Self {
        Error::with_source(Kind::KeyFormat, err)
    }
}

impl From<Config> for Error {
    fn from(err: Config) -> Self {
        Error::with_source(Kind::Config, err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() || err.is_decode() {
            Error::with_source(Kind::Internal, err)
        } else {
            Error::with_source(Kind::Network, err)
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(Kind::Config, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(Kind::Internal, err)
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::key_format(format!("not valid base64: {err}"))
    }
}

#[cfg(feature = "tracing")]
impl From<serde_path_to_error::Error<serde_json::Error>> for Error {
    fn from(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        Error::with_source(Kind::Internal, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_is_the_literal_exchange_message() {
        let err = Error::status(
            StatusCode::BAD_REQUEST,
            Method::POST,
            "/api/v1/order".to_owned(),
            Some("INSUFFICIENT_FUNDS".to_owned()),
            "Insufficient funds",
        );

        assert_eq!(err.kind(), Kind::Api);
        assert_eq!(err.to_string(), "HTTP 400: Insufficient funds");

        let status = err.downcast_ref::<Status>().expect("status payload");
        assert_eq!(status.code.as_deref(), Some("INSUFFICIENT_FUNDS"));
        assert_eq!(status.method, Method::POST);
    }

    #[test]
    fn validation_display_has_no_prefix() {
        let err = Error::validation("price is required for Limit orders");
        assert_eq!(err.kind(), Kind::Validation);
        assert_eq!(err.to_string(), "price is required for Limit orders");
    }

    #[test]
    fn base64_errors_are_key_format() {
        let err: Error = base64::DecodeError::InvalidLength(3).into();
        assert_eq!(err.kind(), Kind::KeyFormat);
        assert!(err.to_string().starts_with("invalid key material"), "{err}");
    }
}
