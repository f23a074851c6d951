use std::collections::BTreeMap;
use std::collections::btree_map;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::BorrowLendPosition;

/// Holdings of a single asset. Quantities serialize as decimal strings.
#[non_exhaustive]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Balance {
    pub available: Decimal,
    pub locked: Decimal,
    pub staked: Decimal,
    /// Funds currently lent out. Not reported by the capital endpoint;
    /// filled in from the borrow/lend positions.
    pub lent: Decimal,
}

impl Balance {
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.available + self.locked + self.staked + self.lent
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        [self.available, self.locked, self.staked, self.lent]
            .iter()
            .all(Decimal::is_zero)
    }
}

/// Balances keyed by asset symbol.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balances(BTreeMap<String, Balance>);

impl Balances {
    #[must_use]
    pub fn get(&self, asset: &str) -> Option<&Balance> {
        self.0.get(asset)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Balance> {
        self.0.iter()
    }

    /// Assets with at least one non-zero component.
    #[must_use]
    pub fn non_zero(&self) -> Balances {
        Balances(
            self.0
                .iter()
                .filter(|(_, balance)| !balance.is_zero())
                .map(|(asset, balance)| (asset.clone(), balance.clone()))
                .collect(),
        )
    }

    /// Sets `lent` from every lend position (strictly positive net quantity),
    /// adding the asset when the capital endpoint did not report it. Assets
    /// without a lend position get `lent = 0`.
    pub fn merge_lent(&mut self, positions: &[BorrowLendPosition]) {
        for balance in self.0.values_mut() {
            balance.lent = Decimal::ZERO;
        }

        for position in positions.iter().filter(|p| p.is_lend()) {
            self.0.entry(position.symbol.clone()).or_default().lent = position.net_quantity;
        }
    }

    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, Balance> {
        self.0
    }
}

impl From<BTreeMap<String, Balance>> for Balances {
    fn from(map: BTreeMap<String, Balance>) -> Self {
        Self(map)
    }
}

impl IntoIterator for Balances {
    type Item = (String, Balance);
    type IntoIter = btree_map::IntoIter<String, Balance>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'balances> IntoIterator for &'balances Balances {
    type Item = (&'balances String, &'balances Balance);
    type IntoIter = btree_map::Iter<'balances, String, Balance>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
