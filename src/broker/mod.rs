//! Broker Module
//!
//! Narrow interface to the brokerage. The loop only ever needs a handful of
//! reads (quote, balance, positions, open orders, candles) and five writes
//! (four order shapes and a cancel), so that is the whole trait.
//!
//! Wire types keep the API's string-typed numbers; parsing to `Decimal`
//! happens at the call sites that do arithmetic.

pub mod robinhood;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Brokerage session - all implementations must provide this.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Authenticate with the brokerage. Credentials and the optional
    /// one-time MFA code come from configuration.
    async fn connect(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    async fn get_quote(&self, symbol: &str) -> Result<Quote>;

    /// Current buying power in dollars.
    async fn account_balance(&self) -> Result<Decimal>;

    async fn get_positions(&self) -> Result<Vec<Holding>>;

    async fn get_open_orders(&self) -> Result<Vec<OpenOrder>>;

    async fn get_historicals(&self, symbol: &str, interval: &str, span: &str)
        -> Result<Vec<Candle>>;

    /// Market buy sized in dollars.
    async fn buy_by_price(&self, symbol: &str, amount: Decimal) -> Result<OrderAck>;

    /// Limit buy: spend `amount` dollars if the price reaches `limit`.
    async fn buy_by_limit(&self, symbol: &str, amount: Decimal, limit: Decimal)
        -> Result<OrderAck>;

    /// Market sell sized in dollars.
    async fn sell_by_price(&self, symbol: &str, amount: Decimal) -> Result<OrderAck>;

    /// Limit sell: release `amount` dollars of the position at `limit`.
    async fn sell_by_limit(&self, symbol: &str, amount: Decimal, limit: Decimal)
        -> Result<OrderAck>;

    async fn cancel_order(&self, order_id: &str) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub ask_price: String,
    pub bid_price: String,
    /// Midpoint the brokerage values positions at. Not shown to the model,
    /// used to convert position quantities into dollar amounts.
    #[serde(skip_serializing)]
    pub mark_price: String,
    pub high_price: String,
    pub low_price: String,
    pub volume: String,
}

/// A raw position row: how much of one currency the account holds.
#[derive(Debug, Clone, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub quantity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenOrder {
    pub id: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub side: String,
    pub quantity: String,
    #[serde(default)]
    pub price: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub begins_at: String,
    pub open_price: String,
    pub close_price: String,
    pub high_price: String,
    pub low_price: String,
    pub volume: String,
}

/// What the brokerage returns when an order is accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderAck {
    pub id: String,
    pub state: String,
    pub side: String,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
}
