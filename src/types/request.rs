use bon::Builder;

use crate::Result;
use crate::auth::Params;
use crate::error::Error;
use crate::types::{OrderType, Side, TimeInForce, is_number, normalize_optional};

/// Order input as it arrives from a loosely typed caller.
///
/// Everything is a string so that validation can report exactly what was
/// wrong. Call [`CreateOrderRequest::validate`] (or hand it to
/// [`crate::Client::create_order`]) to obtain a [`NewOrder`].
#[non_exhaustive]
#[derive(Clone, Debug, Builder)]
pub struct CreateOrderRequest {
    #[builder(into)]
    pub symbol: String,
    /// `Bid` or `Ask`.
    #[builder(into)]
    pub side: String,
    /// `Limit` or `Market`.
    #[builder(into)]
    pub order_type: String,
    #[builder(into)]
    pub quantity: Option<String>,
    #[builder(into)]
    pub price: Option<String>,
    /// `GTC`, `IOC` or `FOK`.
    #[builder(into, default = String::from("GTC"))]
    pub time_in_force: String,
    /// Quote-asset amount for market orders, e.g. `"10"` for 10 USDC worth.
    #[builder(into)]
    pub quote_quantity: Option<String>,
}

impl CreateOrderRequest {
    /// Checks the request and converts it into typed form. Fails fast on the
    /// first violated rule.
    pub fn validate(&self) -> Result<NewOrder> {
        let quantity = normalize_optional(self.quantity.as_deref());
        let price = normalize_optional(self.price.as_deref());
        let quote_quantity = normalize_optional(self.quote_quantity.as_deref());

        if self.symbol.trim().is_empty() {
            return Err(Error::validation("symbol is required"));
        }
        let side = Side::parse(&self.side)?;
        let order_type = OrderType::parse(&self.order_type)?;

        let price = match order_type {
            OrderType::Market => {
                if quantity.is_none() && quote_quantity.is_none() {
                    return Err(Error::validation(
                        "quantity or quoteQuantity is required for Market orders",
                    ));
                }
                None
            }
            OrderType::Limit => {
                if quantity.is_none() {
                    return Err(Error::validation("quantity is required for Limit orders"));
                }
                let price =
                    price.ok_or_else(|| Error::validation("price is required for Limit orders"))?;
                Some(number("price", price)?)
            }
        };

        let quantity = quantity.map(|q| number("quantity", q)).transpose()?;
        let quote_quantity = quote_quantity
            .map(|q| number("quoteQuantity", q))
            .transpose()?;
        let time_in_force = TimeInForce::parse(&self.time_in_force)?;

        Ok(NewOrder {
            symbol: self.symbol.clone(),
            side,
            order_type,
            quantity,
            quote_quantity,
            price,
            time_in_force,
        })
    }
}

/// Checks that `value` is numeric and hands it back untouched.
fn number(field: &str, value: &str) -> Result<String> {
    if !is_number(value) {
        return Err(Error::validation(format!(
            "{field} must be a valid number, got '{value}'"
        )));
    }
    Ok(value.to_owned())
}

/// A validated order, ready to be signed and submitted.
///
/// Amounts keep the caller's spelling; they are only checked to be numeric.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrder {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Option<String>,
    pub quote_quantity: Option<String>,
    /// Only set for limit orders.
    pub price: Option<String>,
    pub time_in_force: TimeInForce,
}

impl NewOrder {
    /// The `orderExecute` parameter set: exactly the fields that are present.
    #[must_use]
    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("orderType".to_owned(), self.order_type.to_string());
        params.insert("side".to_owned(), self.side.to_string());
        params.insert("symbol".to_owned(), self.symbol.clone());
        params.insert("timeInForce".to_owned(), self.time_in_force.to_string());

        if let Some(quantity) = &self.quantity {
            params.insert("quantity".to_owned(), quantity.clone());
        }
        if let Some(quote_quantity) = &self.quote_quantity {
            params.insert("quoteQuantity".to_owned(), quote_quantity.clone());
        }
        if let Some(price) = &self.price {
            params.insert("price".to_owned(), price.clone());
        }
        params
    }
}
