use std::time::Duration;

use bon::Builder;
use url::Url;

use crate::auth::Window;
use crate::error::Error;
use crate::{DEFAULT_HOST, Result};

/// Per-request deadline. There is no retry on top of it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const HOST_VAR: &str = "BACKPACK_API_URL";
const WINDOW_VAR: &str = "BACKPACK_WINDOW_MS";

/// Client configuration. Credentials are passed separately, see
/// [`crate::Credentials`].
///
/// The builder needs an explicit host; [`Config::from_raw`] and
/// [`Config::from_env`] parse one, falling back to [`DEFAULT_HOST`].
#[non_exhaustive]
#[derive(Clone, Debug, Builder)]
pub struct Config {
    pub host: Url,
    #[builder(default)]
    pub window: Window,
    #[builder(default = DEFAULT_TIMEOUT)]
    pub timeout: Duration,
}

impl Config {
    /// Builds a configuration from string inputs, typically app-level
    /// settings or environment variables.
    pub fn from_raw(host: &str, window_ms: Option<&str>) -> Result<Self> {
        let host = parse_host(host)?;
        let window = match window_ms.map(str::trim).filter(|w| !w.is_empty()) {
            Some(raw) => {
                let millis = raw
                    .parse::<u32>()
                    .map_err(|e| Error::config(format!("invalid window `{raw}`: {e}")))?;
                Window::new(millis)?
            }
            None => Window::DEFAULT,
        };

        Ok(Self::builder().host(host).window(window).build())
    }

    /// Reads `BACKPACK_API_URL` and `BACKPACK_WINDOW_MS`, both optional.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var(HOST_VAR).unwrap_or_else(|_| DEFAULT_HOST.to_owned());
        let window = std::env::var(WINDOW_VAR).ok();
        Self::from_raw(&host, window.as_deref())
    }
}

/// Parses `host` and makes sure relative joins keep any path prefix.
pub(crate) fn parse_host(host: &str) -> Result<Url> {
    let mut url = Url::parse(host.trim())?;
    if url.cannot_be_a_base() {
        return Err(Error::config(format!("host `{host}` cannot be used as a base URL")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
