//! Exchange records and order input types.

mod balance;
mod order;
mod position;
mod request;

pub use balance::{Balance, Balances};
pub use order::{Order, OrderStatus, OrderType, Side, TimeInForce};
pub use position::{BorrowLendPosition, Position};
pub use request::{CreateOrderRequest, NewOrder};
pub use rust_decimal::Decimal;

/// Only spot orders are listed.
pub const SPOT: &str = "SPOT";

/// Treats `""` and the literal `"null"` as absent.
///
/// Loosely typed callers (JSON tool hosts, CLI flags) tend to pass these
/// instead of omitting a value.
#[must_use]
pub fn normalize_optional(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && *v != "null")
}

/// Whether a caller-supplied string is a finite number, in plain or
/// scientific notation.
pub(crate) fn is_number(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok_and(f64::is_finite)
}
