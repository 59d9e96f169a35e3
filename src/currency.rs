//! Display-currency conversion
//!
//! Prices are stored in USD; Russian-speaking users see rubles converted at
//! the live rate, everyone else sees dollars.

use crate::payment::RateClient;
use anyhow::Result;

/// Ruble currency symbol
pub const RUB: &str = "₽";
/// Dollar currency symbol
pub const USD: &str = "$";

/// Convert a USD amount into the user's display currency
pub async fn convert_currency(
    rates: &RateClient,
    amount_usd: f64,
    language: &str,
) -> Result<(f64, &'static str)> {
    if language == "ru" {
        let usd_to_rub = rates.usd_to_rub().await?;
        Ok((amount_usd * usd_to_rub, RUB))
    } else {
        Ok((amount_usd, USD))
    }
}

/// Format a converted amount: rubles without decimals, dollars with two
pub fn format_price(amount: f64, currency: &str) -> String {
    if currency == RUB {
        format!("{:.0} {}", amount, currency)
    } else {
        format!("{:.2} {}", amount, currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price_rubles_drop_decimals() {
        assert_eq!(format_price(1234.56, RUB), "1235 ₽");
        assert_eq!(format_price(90.0, RUB), "90 ₽");
    }

    #[test]
    fn test_format_price_dollars_keep_two_decimals() {
        assert_eq!(format_price(12.5, USD), "12.50 $");
        assert_eq!(format_price(7.0, USD), "7.00 $");
    }
}
