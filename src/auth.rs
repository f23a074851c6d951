//! ED25519 request signing.
//!
//! Every privileged call is authenticated with four headers derived from a
//! canonical string of the form
//!
//! ```text
//! instruction=<instruction>[&<sorted, form-encoded params>]&timestamp=<ms>&window=<ms>
//! ```
//!
//! signed with the account's ED25519 key. ED25519 signatures are
//! deterministic, so identical inputs always produce identical headers.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use ed25519_dalek::Signer as _;
use ed25519_dalek::{PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH, Signature, SigningKey, VerifyingKey};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret as _, SecretString};

use crate::error::Error;
use crate::{Result, Timestamp};

pub const API_KEY: &str = "X-API-Key";
pub const SIGNATURE: &str = "X-Signature";
pub const TIMESTAMP: &str = "X-Timestamp";
pub const WINDOW: &str = "X-Window";

const PRIVATE_KEY_VARS: [&str; 2] = ["BACKPACK_PRIVATE_KEY", "BACKPACK_SECRET_KEY"];
const PUBLIC_KEY_VARS: [&str; 2] = ["BACKPACK_PUBLIC_KEY", "BACKPACK_API_KEY"];

/// Bytes that pass through form encoding untouched. Space is kept here and
/// rewritten to `+` afterwards.
const FORM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b' ');

/// Flat request parameters. A `BTreeMap` keeps keys in byte-wise order, which
/// is exactly the order the canonical string requires.
pub type Params = BTreeMap<String, String>;

/// Base64 key material as handed out by the exchange.
#[derive(Clone)]
pub struct Credentials {
    public_key: String,
    private_key: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(public_key: String, private_key: SecretString) -> Self {
        Self {
            public_key: public_key.trim().to_owned(),
            private_key,
        }
    }

    /// Loads credentials from the process environment, reading `.env` first
    /// when one is present.
    ///
    /// The private seed comes from `BACKPACK_PRIVATE_KEY` (or
    /// `BACKPACK_SECRET_KEY`), the public key from `BACKPACK_PUBLIC_KEY` (or
    /// `BACKPACK_API_KEY`).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let private_key = first_var(&PRIVATE_KEY_VARS).ok_or_else(|| {
            Error::config("missing private key: set BACKPACK_PRIVATE_KEY or BACKPACK_SECRET_KEY")
        })?;
        let public_key = first_var(&PUBLIC_KEY_VARS).ok_or_else(|| {
            Error::config("missing public key: set BACKPACK_PUBLIC_KEY or BACKPACK_API_KEY")
        })?;

        Ok(Self::new(public_key, SecretString::from(private_key)))
    }

    #[must_use]
    pub fn public_key(&self) -> &str {
        &self.public_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

fn first_var(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

/// Validity window of a signed request, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Window(u32);

impl Window {
    pub const MAX_MILLIS: u32 = 60_000;
    pub const DEFAULT: Window = Window(5_000);

    pub fn new(millis: u32) -> Result<Self> {
        if millis == 0 || millis > Self::MAX_MILLIS {
            return Err(Error::validation(format!(
                "window must be between 1 and {} ms, got {millis}",
                Self::MAX_MILLIS
            )));
        }
        Ok(Self(millis))
    }

    #[must_use]
    pub const fn as_millis(self) -> u32 {
        self.0
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four authentication header values for a single request.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthHeaders {
    pub api_key: String,
    pub signature: String,
    pub timestamp: String,
    pub window: String,
}

impl AuthHeaders {
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(4);
        for (name, value) in [
            (API_KEY, &self.api_key),
            (SIGNATURE, &self.signature),
            (TIMESTAMP, &self.timestamp),
            (WINDOW, &self.window),
        ] {
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::key_format(format!("{name} is not a valid header: {e}")))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

/// Holds the account keypair for the lifetime of the client.
#[derive(Clone)]
pub struct Signer {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    api_key: String,
}

impl Signer {
    pub fn new(credentials: &Credentials) -> Result<Self> {
        let seed = decode_key::<SECRET_KEY_LENGTH>(
            credentials.private_key.expose_secret(),
            "private key",
        )?;
        let public = decode_key::<PUBLIC_KEY_LENGTH>(&credentials.public_key, "public key")?;

        let verifying_key = VerifyingKey::from_bytes(&public)
            .map_err(|e| Error::key_format(format!("public key is not a valid ED25519 point: {e}")))?;

        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
            verifying_key,
            api_key: credentials.public_key.clone(),
        })
    }

    /// The value sent in `X-API-Key`.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    #[must_use]
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Signs `instruction` over `params`. A `None` timestamp means "now".
    #[must_use]
    pub fn sign(
        &self,
        instruction: &str,
        params: &Params,
        timestamp: Option<Timestamp>,
        window: Window,
    ) -> AuthHeaders {
        let timestamp = timestamp.unwrap_or_else(|| Utc::now().timestamp_millis());
        let message = signing_string(instruction, params, timestamp, window);
        let signature: Signature = self.signing_key.sign(message.as_bytes());

        #[cfg(feature = "tracing")]
        tracing::trace!(%instruction, %timestamp, %window, "signed request");

        AuthHeaders {
            api_key: self.api_key.clone(),
            signature: STANDARD.encode(signature.to_bytes()),
            timestamp: timestamp.to_string(),
            window: window.to_string(),
        }
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

/// Builds the canonical string that gets signed.
#[must_use]
pub fn signing_string(
    instruction: &str,
    params: &Params,
    timestamp: Timestamp,
    window: Window,
) -> String {
    let mut segments = vec![format!("instruction={instruction}")];

    if !params.is_empty() {
        segments.push(encode_params(params));
    }

    segments.push(format!("timestamp={timestamp}"));
    segments.push(format!("window={window}"));
    segments.join("&")
}

/// Form-encodes `params` in key order: `k1=v1&k2=v2`.
///
/// Everything except ASCII alphanumerics and `_.-~` is percent-encoded and
/// spaces become `+`. The same string is signed and sent as the GET query.
#[must_use]
pub fn encode_params(params: &Params) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, FORM).to_string().replace(' ', "+")
}

fn decode_key<const N: usize>(encoded: &str, what: &str) -> Result<[u8; N]> {
    let bytes = STANDARD.decode(encoded.trim())?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_bytes: Vec<u8>| Error::key_format(format!("{what} must be {N} bytes, got {len}")))
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::Verifier as _;

    use super::*;
    use crate::error::Kind;

    // RFC 8032, section 7.1, test 1.
    const SEED: &str = "nWGxne/9WmC6hEr0kuwsxERJxWl7MmkZcDusAxyuf2A=";
    const PUBLIC: &str = "11qYAYKxCrfVS/7TyWQHOg7hcvPapiMlrwIaaPcHURo=";
    const TS: Timestamp = 1_700_000_000_000;

    fn signer() -> Signer {
        let credentials = Credentials::new(PUBLIC.to_owned(), SecretString::from(SEED));
        Signer::new(&credentials).expect("valid test keypair")
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn signing_string_matches_reference() {
        let s = signing_string(
            "orderQueryAll",
            &params(&[("marketType", "SPOT")]),
            TS,
            Window::DEFAULT,
        );
        assert_eq!(
            s,
            "instruction=orderQueryAll&marketType=SPOT&timestamp=1700000000000&window=5000"
        );
    }

    #[test]
    fn signing_string_sorts_keys() {
        let forward = params(&[("symbol", "BTC_USDC"), ("marketType", "SPOT")]);
        let backward = params(&[("marketType", "SPOT"), ("symbol", "BTC_USDC")]);

        let expected =
            "instruction=orderQueryAll&marketType=SPOT&symbol=BTC_USDC&timestamp=1700000000000&window=5000";
        assert_eq!(
            signing_string("orderQueryAll", &forward, TS, Window::DEFAULT),
            expected
        );
        assert_eq!(
            signing_string("orderQueryAll", &backward, TS, Window::DEFAULT),
            expected
        );
    }

    #[test]
    fn signing_string_sorts_bytewise() {
        let s = signing_string(
            "orderExecute",
            &params(&[("side", "Bid"), ("Symbol", "x"), ("orderType", "Limit")]),
            TS,
            Window::DEFAULT,
        );
        assert!(
            s.starts_with("instruction=orderExecute&Symbol=x&orderType=Limit&side=Bid&"),
            "{s}"
        );
    }

    #[test]
    fn signing_string_omits_empty_params() {
        let s = signing_string("balanceQuery", &Params::new(), TS, Window::DEFAULT);
        assert_eq!(s, "instruction=balanceQuery&timestamp=1700000000000&window=5000");
    }

    #[test]
    fn signing_string_form_encodes_values() {
        let s = signing_string(
            "orderCancel",
            &params(&[("b", "a b"), ("a", "x/y&z=1")]),
            TS,
            Window::new(60_000).expect("valid window"),
        );
        assert_eq!(
            s,
            "instruction=orderCancel&a=x%2Fy%26z%3D1&b=a+b&timestamp=1700000000000&window=60000"
        );
    }

    #[test]
    fn signing_string_escapes_like_quote_plus() {
        let s = signing_string(
            "orderCancel",
            &params(&[("a", "x*y~z"), ("b", "1+1 (é)")]),
            TS,
            Window::DEFAULT,
        );
        assert_eq!(
            s,
            "instruction=orderCancel&a=x%2Ay~z&b=1%2B1+%28%C3%A9%29&timestamp=1700000000000&window=5000"
        );
    }

    #[test]
    fn encode_params_keeps_unreserved_bytes() {
        let encoded = encode_params(&params(&[("symbol", "BTC_USDC"), ("q", "0.5-1~")]));
        assert_eq!(encoded, "q=0.5-1~&symbol=BTC_USDC");
        assert_eq!(encode_params(&Params::new()), "");
    }

    #[test]
    fn sign_is_deterministic() {
        let signer = signer();
        let p = params(&[("marketType", "SPOT")]);

        let first = signer.sign("orderQueryAll", &p, Some(TS), Window::DEFAULT);
        let second = signer.sign("orderQueryAll", &p, Some(TS), Window::DEFAULT);
        assert_eq!(first, second);
    }

    #[test]
    fn sign_matches_known_vector() {
        let headers = signer().sign(
            "orderQueryAll",
            &params(&[("marketType", "SPOT")]),
            Some(TS),
            Window::DEFAULT,
        );

        assert_eq!(headers.api_key, PUBLIC);
        assert_eq!(headers.timestamp, "1700000000000");
        assert_eq!(headers.window, "5000");
        assert_eq!(
            headers.signature,
            "AKNtJmfnLDiBBC2igMkFKyBIj9G0Jx3zd9y0ZoTJnzuoIqWydDaISckJ7YqKTQRAV6LglllFWgG4Qf7cHvm3Bw=="
        );
    }

    #[test]
    fn signature_verifies_against_public_key() {
        let signer = signer();
        let headers = signer.sign("balanceQuery", &Params::new(), Some(TS), Window::DEFAULT);

        let raw: [u8; 64] = STANDARD
            .decode(&headers.signature)
            .expect("base64 signature")
            .try_into()
            .expect("64 byte signature");
        let message = signing_string("balanceQuery", &Params::new(), TS, Window::DEFAULT);

        signer
            .verifying_key()
            .verify(message.as_bytes(), &Signature::from_bytes(&raw))
            .expect("signature verifies");
    }

    #[test]
    fn sign_defaults_timestamp_to_now() {
        let before = Utc::now().timestamp_millis();
        let headers = signer().sign("balanceQuery", &Params::new(), None, Window::DEFAULT);
        let after = Utc::now().timestamp_millis();

        let ts: Timestamp = headers.timestamp.parse().expect("numeric timestamp");
        assert!((before..=after).contains(&ts), "{ts} not in {before}..={after}");
    }

    #[test]
    fn header_map_carries_all_four_headers() {
        let map = signer()
            .sign("positionQuery", &Params::new(), Some(TS), Window::DEFAULT)
            .to_header_map()
            .expect("valid headers");

        assert_eq!(map.len(), 4);
        assert_eq!(map[API_KEY], PUBLIC);
        assert_eq!(map[TIMESTAMP], "1700000000000");
        assert_eq!(map[WINDOW], "5000");
        assert!(map.contains_key(SIGNATURE));
    }

    #[test]
    fn rejects_bad_key_material() {
        let cases = [
            (PUBLIC, "not base64!"),
            (PUBLIC, "AAAA"),
            ("AAAA", SEED),
            // 32 bytes, but y = 2 is not on the curve.
            ("AgAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=", SEED),
        ];

        for (public, private) in cases {
            let credentials = Credentials::new(public.to_owned(), SecretString::from(private));
            let err = Signer::new(&credentials).expect_err("bad key material");
            assert_eq!(err.kind(), Kind::KeyFormat, "{public} / {private}: {err}");
        }
    }

    #[test]
    fn window_bounds() {
        assert_eq!(Window::default().as_millis(), 5_000);
        assert!(Window::new(1).is_ok(), "1 ms is allowed");
        assert!(Window::new(60_000).is_ok(), "60 s is allowed");
        assert_eq!(
            Window::new(0).expect_err("zero").kind(),
            Kind::Validation
        );
        assert_eq!(
            Window::new(60_001).expect_err("too large").kind(),
            Kind::Validation
        );
    }

    #[test]
    fn debug_redacts_private_key() {
        let credentials = Credentials::new(PUBLIC.to_owned(), SecretString::from(SEED));
        let debug = format!("{credentials:?} {:?}", signer());
        assert!(!debug.contains(SEED), "{debug}");
        assert!(debug.contains("[REDACTED]"), "{debug}");
    }
}
