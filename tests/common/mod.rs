#![allow(dead_code, reason = "not every test binary uses every helper")]

use backpack_client_sdk::{Client, Config, Credentials};
use httpmock::MockServer;
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

/// RFC 8032 test key 1, base64 encoded.
pub const PUBLIC_KEY: &str = "11qYAYKxCrfVS/7TyWQHOg7hcvPapiMlrwIaaPcHURo=";
pub const PRIVATE_KEY: &str = "nWGxne/9WmC6hEr0kuwsxERJxWl7MmkZcDusAxyuf2A=";

pub const AUTH_HEADERS: [&str; 4] = ["X-API-Key", "X-Signature", "X-Timestamp", "X-Window"];

/// Routes client logs to the test harness. Filtered by `RUST_LOG`, warnings
/// and up by default; only emits anything with the `tracing` feature on.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init()
        .ok();
}

pub fn credentials() -> Credentials {
    Credentials::new(PUBLIC_KEY.to_owned(), SecretString::from(PRIVATE_KEY))
}

pub fn config(host: &str) -> Config {
    Config::from_raw(host, None).expect("valid test host")
}

pub fn client(server: &MockServer) -> Client {
    init_logging();
    Client::new(config(&server.base_url()), &credentials()).expect("valid test client")
}

/// A client pointed at a port nothing listens on. Any request it sends fails
/// with a network error, so a validation error proves nothing was sent.
pub fn offline_client() -> Client {
    init_logging();
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
        listener.local_addr().expect("local addr").port()
    };
    Client::new(config(&format!("http://127.0.0.1:{port}")), &credentials())
        .expect("valid test client")
}
