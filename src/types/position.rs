use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An open futures position.
#[non_exhaustive]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Position {
    pub symbol: String,
    /// Positive when long, negative when short.
    pub net_quantity: Option<Decimal>,
    pub entry_price: Option<Decimal>,
    pub mark_price: Option<Decimal>,
    pub break_even_price: Option<Decimal>,
    pub est_liquidation_price: Option<Decimal>,
    pub pnl_unrealized: Option<Decimal>,
    pub pnl_realized: Option<Decimal>,
    pub net_exposure_quantity: Option<Decimal>,
    pub net_exposure_notional: Option<Decimal>,
    pub net_cost: Option<Decimal>,
    pub cumulative_funding_payment: Option<Decimal>,
    pub cumulative_interest: Option<Decimal>,
    pub position_id: Option<String>,
    /// Initial margin factor.
    pub imf: Option<Decimal>,
    /// Maintenance margin factor.
    pub mmf: Option<Decimal>,
    pub imf_function: Option<Value>,
    pub mmf_function: Option<Value>,
    pub subaccount_id: Option<u64>,
    pub user_id: Option<u64>,
}

/// A borrow (negative net quantity) or lend (positive) position for one asset.
#[non_exhaustive]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BorrowLendPosition {
    /// Asset symbol, e.g. `USDC`.
    pub symbol: String,
    pub net_quantity: Decimal,
    pub net_exposure_quantity: Option<Decimal>,
    pub net_exposure_notional: Option<Decimal>,
    pub cumulative_interest: Option<Decimal>,
    pub mark_price: Option<Decimal>,
    pub imf: Option<Decimal>,
    pub mmf: Option<Decimal>,
    pub position_id: Option<String>,
}

impl BorrowLendPosition {
    #[must_use]
    pub fn is_lend(&self) -> bool {
        self.net_quantity > Decimal::ZERO
    }
}
