//! # Payment integration
//!
//! Exchange-rate lookups and Crypto Pay invoice handling for checkout, plus
//! the Telegram Stars conversion. The invoice poller runs as a background
//! task for at most [`PAYMENT_WINDOW`]; the caller owns everything that
//! happens after a payment resolves (order creation, notifications).

use crate::cache::{BotCaches, RATE_TTL};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Crypto assets offered at checkout
pub const SUPPORTED_ASSETS: [&str; 4] = ["TON", "BTC", "USDT", "ETH"];

/// How long an invoice stays payable
pub const PAYMENT_WINDOW: Duration = Duration::from_secs(3 * 60);

/// Delay between invoice status checks
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Convert a USD amount into Telegram Stars at the configured star rate
pub fn stars_for_usd(amount_usd: f64, star_rate_usd: f64) -> i32 {
    (amount_usd / star_rate_usd) as i32
}

/// Format a crypto amount the way the payment message shows it:
/// stablecoins with 2 decimals, everything else with 8
pub fn format_crypto_amount(amount: f64, asset: &str) -> String {
    if asset == "USDT" {
        format!("{:.2}", amount)
    } else {
        format!("{:.8}", amount)
    }
}

/// Client for the public exchange-rate API
#[derive(Clone)]
pub struct RateClient {
    http: reqwest::Client,
    base_url: String,
    caches: BotCaches,
}

impl RateClient {
    pub fn new(http: reqwest::Client, base_url: String, caches: BotCaches) -> Self {
        Self {
            http,
            base_url,
            caches,
        }
    }

    /// Fetch how much one unit of `asset` costs in `fiat`.
    ///
    /// Rates are memoized briefly so a burst of checkouts does not hammer the
    /// provider.
    pub async fn get_rate(&self, asset: &str, fiat: &str) -> Result<f64> {
        let cache_key = format!("{}/{}", asset, fiat);
        if let Some(rate) = self.caches.rates.get(&cache_key) {
            debug!(asset = %asset, fiat = %fiat, rate = %rate, "Rate served from cache");
            return Ok(rate);
        }

        let url = format!(
            "{}/data/price?fsym={}&tsyms={}",
            self.base_url, asset, fiat
        );
        let response: HashMap<String, f64> = self
            .http
            .get(&url)
            .send()
            .await
            .context("Rate request failed")?
            .error_for_status()
            .context("Rate request returned an error status")?
            .json()
            .await
            .context("Rate response was not valid JSON")?;

        let rate = *response
            .get(fiat)
            .ok_or_else(|| anyhow::anyhow!("Rate response is missing the {} price", fiat))?;
        if rate <= 0.0 {
            return Err(anyhow::anyhow!("Provider returned a non-positive {} rate", fiat));
        }

        self.caches.rates.insert(cache_key, rate, RATE_TTL);
        Ok(rate)
    }

    /// Convert a fiat amount into the equivalent amount of `asset`
    pub async fn convert_to_crypto(&self, amount: f64, fiat: &str, asset: &str) -> Result<f64> {
        let rate = self.get_rate(asset, fiat).await?;
        Ok(amount / rate)
    }

    /// Current USD→RUB rate, used for ruble price display
    pub async fn usd_to_rub(&self) -> Result<f64> {
        self.get_rate("USD", "RUB").await
    }
}

/// An invoice as returned by the Crypto Pay API
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Invoice {
    pub invoice_id: i64,
    pub status: String,
    pub asset: String,
    pub amount: String,
    pub bot_invoice_url: String,
}

impl Invoice {
    pub fn is_paid(&self) -> bool {
        self.status == "paid"
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InvoiceList {
    items: Vec<Invoice>,
}

/// Thin client for the Crypto Pay HTTP API
#[derive(Clone)]
pub struct CryptoPayClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl CryptoPayClient {
    pub fn new(http: reqwest::Client, base_url: String, token: String) -> Self {
        Self {
            http,
            base_url,
            token,
        }
    }

    /// Create an invoice for `amount` of `asset`
    pub async fn create_invoice(
        &self,
        asset: &str,
        amount: f64,
        description: &str,
    ) -> Result<Invoice> {
        #[derive(serde::Serialize)]
        struct InvoiceReq<'a> {
            asset: &'a str,
            amount: String,
            description: &'a str,
        }

        let response: ApiResponse<Invoice> = self
            .http
            .post(format!("{}/createInvoice", self.base_url))
            .header("Crypto-Pay-API-Token", &self.token)
            .json(&InvoiceReq {
                asset,
                amount: format!("{:.8}", amount),
                description,
            })
            .send()
            .await
            .context("createInvoice request failed")?
            .json()
            .await
            .context("createInvoice response was not valid JSON")?;

        if !response.ok {
            return Err(anyhow::anyhow!("createInvoice was rejected by the provider"));
        }
        response
            .result
            .ok_or_else(|| anyhow::anyhow!("createInvoice returned no invoice"))
    }

    /// Fetch one invoice by id
    pub async fn get_invoice(&self, invoice_id: i64) -> Result<Option<Invoice>> {
        let response: ApiResponse<InvoiceList> = self
            .http
            .get(format!("{}/getInvoices", self.base_url))
            .header("Crypto-Pay-API-Token", &self.token)
            .query(&[("invoice_ids", invoice_id.to_string())])
            .send()
            .await
            .context("getInvoices request failed")?
            .json()
            .await
            .context("getInvoices response was not valid JSON")?;

        if !response.ok {
            return Err(anyhow::anyhow!("getInvoices was rejected by the provider"));
        }
        Ok(response
            .result
            .and_then(|list| list.items.into_iter().next()))
    }

    /// Poll an invoice until it is paid or the payment window closes.
    ///
    /// Returns `true` when the invoice was paid in time. Transient provider
    /// errors are logged and retried until the deadline.
    pub async fn wait_for_payment(&self, invoice_id: i64) -> bool {
        let deadline = tokio::time::Instant::now() + PAYMENT_WINDOW;

        while tokio::time::Instant::now() < deadline {
            match self.get_invoice(invoice_id).await {
                Ok(Some(invoice)) if invoice.is_paid() => return true,
                Ok(_) => {}
                Err(e) => {
                    warn!(invoice_id = %invoice_id, error = %e, "Invoice status check failed, retrying");
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stars_for_usd() {
        // 10 USD at 0.0187 USD per star rounds down to 534 stars
        assert_eq!(stars_for_usd(10.0, 0.0187), 534);
        assert_eq!(stars_for_usd(0.0, 0.0187), 0);
        assert_eq!(stars_for_usd(1.87, 0.0187), 100);
    }

    #[test]
    fn test_format_crypto_amount() {
        assert_eq!(format_crypto_amount(12.3456789, "USDT"), "12.35");
        assert_eq!(format_crypto_amount(0.5, "BTC"), "0.50000000");
        assert_eq!(format_crypto_amount(1.0, "TON"), "1.00000000");
    }

    #[test]
    fn test_invoice_deserializes_provider_payload() {
        let payload = r#"{
            "invoice_id": 528,
            "status": "active",
            "asset": "TON",
            "amount": "10.5",
            "bot_invoice_url": "https://t.me/CryptoBot?start=IVxyz"
        }"#;
        let invoice: Invoice = serde_json::from_str(payload).unwrap();
        assert_eq!(invoice.invoice_id, 528);
        assert!(!invoice.is_paid());

        let paid = Invoice {
            status: "paid".to_string(),
            ..invoice
        };
        assert!(paid.is_paid());
    }

    #[test]
    fn test_api_response_envelope() {
        let payload = r#"{"ok": true, "result": {"items": [
            {"invoice_id": 1, "status": "paid", "asset": "BTC", "amount": "0.001",
             "bot_invoice_url": "https://t.me/CryptoBot?start=abc"}
        ]}}"#;
        let response: ApiResponse<InvoiceList> = serde_json::from_str(payload).unwrap();
        assert!(response.ok);
        assert_eq!(response.result.unwrap().items[0].invoice_id, 1);

        let rejected: ApiResponse<InvoiceList> =
            serde_json::from_str(r#"{"ok": false, "result": null}"#).unwrap();
        assert!(!rejected.ok);
    }
}
