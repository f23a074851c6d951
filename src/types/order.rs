use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::formats::Flexible;
use serde_with::{TimestampMilliSeconds, serde_as};
use strum_macros::{AsRefStr, Display};

use crate::Result;
use crate::error::Error;

#[non_exhaustive]
#[derive(Clone, Copy, Debug, Display, AsRefStr, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn parse(value: &str) -> Result<Side> {
        match value {
            "Bid" => Ok(Side::Bid),
            "Ask" => Ok(Side::Ask),
            other => Err(Error::validation(format!(
                "side must be 'Bid' or 'Ask', got '{other}'"
            ))),
        }
    }
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Side::parse(s)
    }
}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, Display, AsRefStr, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

impl OrderType {
    pub fn parse(value: &str) -> Result<OrderType> {
        match value {
            "Limit" => Ok(OrderType::Limit),
            "Market" => Ok(OrderType::Market),
            other => Err(Error::validation(format!(
                "orderType must be 'Limit' or 'Market', got '{other}'"
            ))),
        }
    }
}

impl FromStr for OrderType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        OrderType::parse(s)
    }
}

/// Order lifetime policy.
#[non_exhaustive]
#[derive(
    Clone, Copy, Debug, Default, Display, AsRefStr, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum TimeInForce {
    /// Good till canceled.
    #[default]
    GTC,
    /// Immediate or cancel.
    IOC,
    /// Fill or kill.
    FOK,
}

impl TimeInForce {
    pub fn parse(value: &str) -> Result<TimeInForce> {
        match value {
            "GTC" => Ok(TimeInForce::GTC),
            "IOC" => Ok(TimeInForce::IOC),
            "FOK" => Ok(TimeInForce::FOK),
            other => Err(Error::validation(format!(
                "timeInForce must be one of 'GTC', 'IOC', 'FOK', got '{other}'"
            ))),
        }
    }
}

impl FromStr for TimeInForce {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TimeInForce::parse(s)
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Expired,
    TriggerPending,
    TriggerFailed,
    #[serde(other)]
    Unknown,
}

/// An order as reported by the exchange.
#[serde_as]
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub executed_quantity: Option<Decimal>,
    #[serde(default)]
    pub quote_quantity: Option<Decimal>,
    #[serde(default)]
    pub executed_quote_quantity: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub time_in_force: Option<TimeInForce>,
    #[serde(default)]
    pub post_only: Option<bool>,
    #[serde(default)]
    pub client_id: Option<u64>,
    #[serde(default)]
    pub self_trade_prevention: Option<String>,
    #[serde_as(as = "Option<TimestampMilliSeconds<i64, Flexible>>")]
    pub created_at: Option<DateTime<Utc>>,
}
