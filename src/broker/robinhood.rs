//! Robinhood Broker Integration
//!
//! REST client for the crypto trading API: password + one-time-code login,
//! then bearer-token requests for market data and orders. Orders are sized
//! in dollars, which is also how the model is told to size them.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Broker, Candle, Holding, OpenOrder, OrderAck, Quote};
use crate::config::BrokerConfig;

pub struct RobinhoodBroker {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    mfa_code: Option<String>,
    access_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    grant_type: &'a str,
    scope: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mfa_code: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// Paginated list envelope used by most of the account endpoints.
#[derive(Debug, Deserialize)]
struct Page<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct AccountProfile {
    buying_power: String,
}

#[derive(Debug, Deserialize)]
struct RawPosition {
    currency: CurrencyRef,
    quantity: String,
}

#[derive(Debug, Deserialize)]
struct CurrencyRef {
    code: String,
}

#[derive(Debug, Deserialize)]
struct HistoricalsResponse {
    historicals: Vec<Candle>,
}

#[derive(Debug, Serialize)]
struct OrderRequest<'a> {
    symbol: String,
    side: &'a str,
    #[serde(rename = "type")]
    order_type: &'a str,
    time_in_force: &'a str,
    amount_in_dollars: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit_price: Option<String>,
}

impl RobinhoodBroker {
    pub fn new(cfg: &BrokerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            username: cfg.username.clone(),
            password: cfg.password.clone(),
            mfa_code: cfg.mfa_code.clone(),
            access_token: None,
        }
    }

    fn token(&self) -> Result<&str> {
        self.access_token
            .as_deref()
            .ok_or_else(|| anyhow!("brokerage session not connected"))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(self.token()?)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("GET {path} failed: {status}"));
        }
        Ok(resp.json::<T>().await?)
    }

    async fn submit_order(
        &self,
        symbol: &str,
        side: &str,
        amount: Decimal,
        limit: Option<Decimal>,
    ) -> Result<OrderAck> {
        let order = OrderRequest {
            symbol: symbol.to_uppercase(),
            side,
            order_type: if limit.is_some() { "limit" } else { "market" },
            time_in_force: "gtc",
            amount_in_dollars: amount.to_string(),
            limit_price: limit.map(|p| p.to_string()),
        };

        info!(symbol, side, %amount, ?limit, "submitting order");

        let resp = self
            .client
            .post(format!("{}/crypto/orders/", self.base_url))
            .bearer_auth(self.token()?)
            .json(&order)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("order rejected: {status} {body}"));
        }
        Ok(resp.json::<OrderAck>().await?)
    }
}

#[async_trait]
impl Broker for RobinhoodBroker {
    async fn connect(&mut self) -> Result<()> {
        let login = LoginRequest {
            username: &self.username,
            password: &self.password,
            grant_type: "password",
            scope: "internal",
            mfa_code: self.mfa_code.as_deref(),
        };

        let resp = self
            .client
            .post(format!("{}/oauth2/token/", self.base_url))
            .json(&login)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("brokerage login failed: {status}"));
        }

        let token: LoginResponse = resp.json().await?;
        self.access_token = Some(token.access_token);
        info!("brokerage session established");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.access_token.is_some()
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        self.get_json(&format!("/marketdata/forex/quotes/{symbol}/"))
            .await
    }

    async fn account_balance(&self) -> Result<Decimal> {
        let page: Page<AccountProfile> = self.get_json("/accounts/").await?;
        let profile = page
            .results
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no account profile returned"))?;
        profile
            .buying_power
            .parse::<Decimal>()
            .with_context(|| format!("bad buying_power {:?}", profile.buying_power))
    }

    async fn get_positions(&self) -> Result<Vec<Holding>> {
        let page: Page<RawPosition> = self.get_json("/crypto/positions/").await?;
        Ok(page
            .results
            .into_iter()
            .map(|p| Holding {
                symbol: p.currency.code,
                quantity: p.quantity,
            })
            .collect())
    }

    async fn get_open_orders(&self) -> Result<Vec<OpenOrder>> {
        let page: Page<OpenOrder> = self.get_json("/crypto/orders/?state=open").await?;
        Ok(page.results)
    }

    async fn get_historicals(
        &self,
        symbol: &str,
        interval: &str,
        span: &str,
    ) -> Result<Vec<Candle>> {
        let resp: HistoricalsResponse = self
            .get_json(&format!(
                "/marketdata/forex/historicals/{symbol}/?interval={interval}&span={span}&bounds=24_7"
            ))
            .await?;
        Ok(resp.historicals)
    }

    async fn buy_by_price(&self, symbol: &str, amount: Decimal) -> Result<OrderAck> {
        self.submit_order(symbol, "buy", amount, None).await
    }

    async fn buy_by_limit(&self, symbol: &str, amount: Decimal, limit: Decimal) -> Result<OrderAck> {
        self.submit_order(symbol, "buy", amount, Some(limit)).await
    }

    async fn sell_by_price(&self, symbol: &str, amount: Decimal) -> Result<OrderAck> {
        self.submit_order(symbol, "sell", amount, None).await
    }

    async fn sell_by_limit(&self, symbol: &str, amount: Decimal, limit: Decimal) -> Result<OrderAck> {
        self.submit_order(symbol, "sell", amount, Some(limit)).await
    }

    async fn cancel_order(&self, order_id: &str) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/crypto/orders/{order_id}/cancel/", self.base_url))
            .bearer_auth(self.token()?)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("cancel of order {order_id} failed: {status}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_config() -> BrokerConfig {
        BrokerConfig {
            username: "trader@example.com".to_string(),
            password: "hunter2".to_string(),
            mfa_code: None,
            base_url: "https://api.robinhood.com/".to_string(),
        }
    }

    #[test]
    fn test_requests_fail_before_connect() {
        let broker = RobinhoodBroker::new(&test_config());
        assert!(!broker.is_connected());
        assert!(broker.token().is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let broker = RobinhoodBroker::new(&test_config());
        assert_eq!(broker.base_url, "https://api.robinhood.com");
    }

    #[test]
    fn test_login_request_omits_missing_mfa_code() {
        let without = LoginRequest {
            username: "u",
            password: "p",
            grant_type: "password",
            scope: "internal",
            mfa_code: None,
        };
        let json = serde_json::to_string(&without).unwrap();
        assert!(!json.contains("mfa_code"));

        let with = LoginRequest {
            mfa_code: Some("123456"),
            ..without
        };
        let json = serde_json::to_string(&with).unwrap();
        assert!(json.contains("\"mfa_code\":\"123456\""));
    }

    #[test]
    fn test_order_request_wire_shape() {
        let market = OrderRequest {
            symbol: "BTC".to_string(),
            side: "buy",
            order_type: "market",
            time_in_force: "gtc",
            amount_in_dollars: dec!(30).to_string(),
            limit_price: None,
        };
        let json = serde_json::to_string(&market).unwrap();
        assert!(json.contains("\"type\":\"market\""));
        assert!(json.contains("\"amount_in_dollars\":\"30\""));
        assert!(!json.contains("limit_price"));

        let limit = OrderRequest {
            order_type: "limit",
            limit_price: Some(dec!(30000).to_string()),
            ..market
        };
        let json = serde_json::to_string(&limit).unwrap();
        assert!(json.contains("\"limit_price\":\"30000\""));
    }
}
