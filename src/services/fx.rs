// src/services/fx.rs

//! Per-user exchange rate cache.
//!
//! Rates are cached on the user record with a 24h TTL. A failed refresh
//! never discards data the user already has: the stale (possibly empty)
//! map is returned and the failure reason is recorded on the record, where
//! the settings surface can show it.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{FxConfig, UserRecord};

/// HTTP client for the exchange rate collaborator.
pub struct FxClient {
    client: Client,
    endpoint: String,
    ttl_secs: i64,
}

/// Upper-case the keys and coerce every value to f64.
///
/// Any entry that fails coercion fails the whole table; a half-usable rate
/// map is worse than keeping the previous one.
fn normalize_rates(payload: &Value) -> Result<HashMap<String, f64>> {
    let rates = payload
        .get("rates")
        .and_then(Value::as_object)
        .filter(|table| !table.is_empty())
        .ok_or_else(|| AppError::fx("Rate API returned no usable rates."))?;

    let mut normalized = HashMap::with_capacity(rates.len());
    for (code, value) in rates {
        let rate = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|r| r.is_finite())
        .ok_or_else(|| AppError::fx("Rate API returned malformed rate values."))?;
        normalized.insert(code.to_uppercase(), rate);
    }
    Ok(normalized)
}

impl FxClient {
    /// Create a client from configuration.
    pub fn new(config: &FxConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            ttl_secs: config.ttl_secs,
        })
    }

    /// Fetch a fresh rate table for the given base currency.
    pub async fn fetch_rates(&self, base: &str) -> Result<HashMap<String, f64>> {
        let base = if base.trim().is_empty() { "USD" } else { base }.to_uppercase();

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("base", base.as_str())])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                log::warn!("fx: request failed for {}: {}", base, e);
                AppError::fx("Could not reach the rate service. Try again later.")
            })?;

        let payload: Value = response.json().await.map_err(|e| {
            log::warn!("fx: invalid JSON for {}: {}", base, e);
            AppError::fx("Rate API returned an invalid response.")
        })?;

        normalize_rates(&payload)
    }

    /// Return the user's rate map, refreshing it when empty or older than
    /// the TTL.
    ///
    /// Operates on the in-memory record only; the caller persists the
    /// record afterwards so no network call ever happens inside the store's
    /// critical section.
    pub async fn ensure_rates(&self, user: &mut UserRecord) -> HashMap<String, f64> {
        self.ensure_rates_at(user, Utc::now().timestamp()).await
    }

    /// `ensure_rates` with an injected clock.
    pub async fn ensure_rates_at(&self, user: &mut UserRecord, now: i64) -> HashMap<String, f64> {
        let stale = user.fx_rates.is_empty() || now - user.fx_ts > self.ttl_secs;
        if !stale {
            return user.fx_rates.clone();
        }

        match self.fetch_rates(&user.base_currency).await {
            Ok(rates) => {
                user.fx_rates = rates.clone();
                user.fx_ts = now;
                user.fx_error = None;
                rates
            }
            Err(e) => {
                let reason = match e {
                    AppError::Fx(msg) => msg,
                    other => other.to_string(),
                };
                log::warn!("fx: refresh failed for {}: {}", user.base_currency, reason);
                user.fx_error = Some(reason);
                user.fx_rates.clone()
            }
        }
    }
}
