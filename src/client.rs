use std::sync::Arc;

use reqwest::Client as ReqwestClient;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use strum_macros::AsRefStr;
use url::Url;

use crate::auth::{Credentials, Params, Signer, Window, encode_params};
use crate::config::Config;
use crate::error::Error;
use crate::types::{
    Balances, BorrowLendPosition, CreateOrderRequest, NewOrder, Order, Position, SPOT,
    normalize_optional,
};
use crate::{Result, from_value};

/// Exchange action being authenticated. The string form is the
/// `instruction=` value of the signing string.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum Instruction {
    OrderQueryAll,
    PositionQuery,
    BorrowLendPositionQuery,
    BalanceQuery,
    OrderExecute,
    OrderCancel,
}

impl Instruction {
    #[must_use]
    pub fn method(self) -> Method {
        match self {
            Instruction::OrderQueryAll
            | Instruction::PositionQuery
            | Instruction::BorrowLendPositionQuery
            | Instruction::BalanceQuery => Method::GET,
            Instruction::OrderExecute => Method::POST,
            Instruction::OrderCancel => Method::DELETE,
        }
    }

    /// Path relative to the configured host.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Instruction::OrderQueryAll => "api/v1/orders",
            Instruction::PositionQuery => "api/v1/position",
            Instruction::BorrowLendPositionQuery => "api/v1/borrowLend/positions",
            Instruction::BalanceQuery => "api/v1/capital",
            Instruction::OrderExecute | Instruction::OrderCancel => "api/v1/order",
        }
    }
}

/// Signed client for the trading endpoints.
///
/// Every call builds and signs its own request; nothing is cached between
/// calls, so a `Client` can be cloned and shared across tasks freely.
#[derive(Clone, Debug)]
pub struct Client {
    host: Url,
    window: Window,
    signer: Arc<Signer>,
    client: ReqwestClient,
}

impl Client {
    /// Creates a client with its own HTTP connection pool and the configured
    /// per-request timeout.
    pub fn new(config: Config, credentials: &Credentials) -> Result<Self> {
        let client = ReqwestClient::builder().timeout(config.timeout).build()?;
        Self::with_client(config, credentials, client)
    }

    /// Creates a client on top of a caller-supplied HTTP client. The caller is
    /// responsible for its timeout settings.
    pub fn with_client(
        config: Config,
        credentials: &Credentials,
        client: ReqwestClient,
    ) -> Result<Self> {
        let signer = Signer::new(credentials)?;

        Ok(Self {
            host: config.host,
            window: config.window,
            signer: Arc::new(signer),
            client,
        })
    }

    /// Builds configuration and credentials from the environment.
    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env()?, &Credentials::from_env()?)
    }

    #[must_use]
    pub fn host(&self) -> &Url {
        &self.host
    }

    #[must_use]
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Open spot orders, optionally for a single symbol.
    pub async fn list_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>> {
        let mut params = Params::new();
        params.insert("marketType".to_owned(), SPOT.to_owned());
        if let Some(symbol) = normalize_optional(symbol) {
            params.insert("symbol".to_owned(), symbol.to_owned());
        }

        let value = self.send(Instruction::OrderQueryAll, &params).await?;
        Ok(lenient_list(Instruction::OrderQueryAll, value, Some("orders")))
    }

    /// Open futures positions.
    pub async fn list_positions(&self) -> Result<Vec<Position>> {
        let value = self.send(Instruction::PositionQuery, &Params::new()).await?;
        Ok(lenient_list(Instruction::PositionQuery, value, None))
    }

    /// Borrow and lend positions. Anything but a JSON array is read as "no
    /// positions".
    pub async fn list_borrow_lend_positions(&self) -> Result<Vec<BorrowLendPosition>> {
        let value = self
            .send(Instruction::BorrowLendPositionQuery, &Params::new())
            .await?;

        match value {
            Value::Array(items) => Ok(decode_items(Instruction::BorrowLendPositionQuery, items)),
            other => {
                log_unexpected_shape(Instruction::BorrowLendPositionQuery, &other);
                Ok(Vec::new())
            }
        }
    }

    /// Account balances, including funds lent out.
    ///
    /// The lent amounts come from a second request to the borrow/lend
    /// positions endpoint. If that request fails the balances are still
    /// returned, with `lent` at zero for every asset.
    pub async fn balances(&self) -> Result<Balances> {
        let value = self.send(Instruction::BalanceQuery, &Params::new()).await?;
        let mut balances: Balances = if value.is_null() {
            Balances::default()
        } else {
            from_value(value)?
        };

        let positions = self
            .list_borrow_lend_positions()
            .await
            .unwrap_or_else(|err| {
                log_lent_fallback(&err);
                Vec::new()
            });

        balances.merge_lent(&positions);
        Ok(balances)
    }

    /// Validates and places an order. Invalid requests fail before anything
    /// is sent.
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order> {
        let order = request.validate()?;
        self.execute_order(&order).await
    }

    /// Places an already validated order.
    pub async fn execute_order(&self, order: &NewOrder) -> Result<Order> {
        let value = self
            .send(Instruction::OrderExecute, &order.to_params())
            .await?;
        from_value(value)
    }

    /// Cancels an open order.
    pub async fn cancel_order(&self, order_id: &str, symbol: &str) -> Result<Order> {
        if order_id.trim().is_empty() {
            return Err(Error::validation("orderId is required"));
        }
        if symbol.trim().is_empty() {
            return Err(Error::validation("symbol is required"));
        }

        let mut params = Params::new();
        params.insert("orderId".to_owned(), order_id.to_owned());
        params.insert("symbol".to_owned(), symbol.to_owned());

        let value = self.send(Instruction::OrderCancel, &params).await?;
        from_value(value)
    }

    /// Signs and sends one request. GET carries `params` in the query string,
    /// encoded exactly as they appear in the signing string. Everything else
    /// sends them as a JSON body.
    async fn send(&self, instruction: Instruction, params: &Params) -> Result<Value> {
        let method = instruction.method();
        let mut url = self.endpoint(instruction.path())?;

        let request = if method == Method::GET {
            if !params.is_empty() {
                url.set_query(Some(&encode_params(params)));
            }
            self.client.request(method, url).build()?
        } else {
            self.client.request(method, url).json(params).build()?
        };

        let headers = self
            .signer
            .sign(instruction.as_ref(), params, None, self.window)
            .to_header_map()?;

        crate::request(&self.client, request, Some(headers)).await
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.host.join(path)?)
    }
}

/// Decodes a list response that might not be a list.
///
/// An array decodes item by item. An object holding an array under
/// `wrapper` yields that array; any other object is a single record.
/// Everything else (including an empty body) is an empty list. Records that
/// do not decode are logged and skipped, so this never fails.
fn lenient_list<T: DeserializeOwned>(
    instruction: Instruction,
    value: Value,
    wrapper: Option<&str>,
) -> Vec<T> {
    match value {
        Value::Array(items) => decode_items(instruction, items),
        Value::Object(map) => {
            if let Some(Value::Array(items)) = wrapper.and_then(|key| map.get(key)) {
                return decode_items(instruction, items.clone());
            }
            decode_items(instruction, vec![Value::Object(map)])
        }
        other => {
            log_unexpected_shape(instruction, &other);
            Vec::new()
        }
    }
}

fn decode_items<T: DeserializeOwned>(instruction: Instruction, items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| {
            from_value(item)
                .inspect_err(|err| log_skipped_record(instruction, err))
                .ok()
        })
        .collect()
}

#[cfg_attr(
    not(feature = "tracing"),
    expect(unused_variables, reason = "only read by tracing")
)]
fn log_unexpected_shape(instruction: Instruction, value: &Value) {
    #[cfg(feature = "tracing")]
    tracing::warn!(
        instruction = instruction.as_ref(),
        response = %value,
        "unexpected response shape, treating as empty"
    );
}

#[cfg_attr(
    not(feature = "tracing"),
    expect(unused_variables, reason = "only read by tracing")
)]
fn log_skipped_record(instruction: Instruction, err: &Error) {
    #[cfg(feature = "tracing")]
    tracing::warn!(
        instruction = instruction.as_ref(),
        error = %err,
        "skipping record that does not decode"
    );
}

#[cfg_attr(
    not(feature = "tracing"),
    expect(unused_variables, reason = "only read by tracing")
)]
fn log_lent_fallback(err: &Error) {
    #[cfg(feature = "tracing")]
    tracing::warn!(error = %err, "borrow/lend positions unavailable, reporting lent as 0");
}
