//! Account currencies and their tiers.
//!
//! Every currency belongs to exactly one tier. Which tiers a customer may
//! hold is decided by the role (see `Role::currency_tiers`), so adding a
//! currency is a change to the table below only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Availability tier of a currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurrencyTier {
    /// Any active customer may hold it.
    Regular,
    /// Only VIP customers may hold it.
    Vip,
}

/// Account currency.
///
/// Maps to the `currency` PostgreSQL enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "currency", rename_all = "UPPERCASE")]
pub enum Currency {
    Rub,
    Usd,
    Eur,
    Jpy,
    Cny,
    Rsd,
    Bgn,
    Ars,
}

impl Currency {
    pub const ALL: [Currency; 8] = [
        Currency::Rub,
        Currency::Usd,
        Currency::Eur,
        Currency::Jpy,
        Currency::Cny,
        Currency::Rsd,
        Currency::Bgn,
        Currency::Ars,
    ];

    /// Currencies through which deposits and withdrawals are permitted.
    pub const SIMPLE_TRANSACTABLE: [Currency; 2] = [Currency::Rub, Currency::Usd];

    pub fn tier(self) -> CurrencyTier {
        match self {
            Currency::Rub | Currency::Usd | Currency::Eur => CurrencyTier::Regular,
            Currency::Jpy | Currency::Cny | Currency::Rsd | Currency::Bgn | Currency::Ars => {
                CurrencyTier::Vip
            }
        }
    }

    /// All currencies belonging to `tier`.
    pub fn in_tier(tier: CurrencyTier) -> Vec<Currency> {
        Currency::ALL
            .into_iter()
            .filter(|currency| currency.tier() == tier)
            .collect()
    }

    pub fn code(self) -> &'static str {
        match self {
            Currency::Rub => "RUB",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Jpy => "JPY",
            Currency::Cny => "CNY",
            Currency::Rsd => "RSD",
            Currency::Bgn => "BGN",
            Currency::Ars => "ARS",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_partition_all_currencies() {
        let regular = Currency::in_tier(CurrencyTier::Regular);
        let vip = Currency::in_tier(CurrencyTier::Vip);

        assert_eq!(regular, vec![Currency::Rub, Currency::Usd, Currency::Eur]);
        assert_eq!(
            vip,
            vec![
                Currency::Jpy,
                Currency::Cny,
                Currency::Rsd,
                Currency::Bgn,
                Currency::Ars
            ]
        );
        assert_eq!(regular.len() + vip.len(), Currency::ALL.len());
    }

    #[test]
    fn test_serde_uses_iso_codes() {
        let json = serde_json::to_string(&Currency::Jpy).unwrap();
        assert_eq!(json, "\"JPY\"");

        let parsed: Currency = serde_json::from_str("\"RSD\"").unwrap();
        assert_eq!(parsed, Currency::Rsd);
    }
}
