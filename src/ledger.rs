//! Trade Ledger - bounded history of executed actions
//!
//! The model has no memory between cycles, so the last few executed trades
//! are rendered into every prompt. The ledger is volatile by design: it
//! lives for the life of the process and is owned by the loop driver, which
//! lends it to the executor for each cycle. Nothing here is global.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

/// Oldest entries are evicted once the ledger grows past this.
pub const LEDGER_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeAction {
    #[serde(rename = "buy_crypto_price")]
    BuyByPrice,
    #[serde(rename = "buy_crypto_limit")]
    BuyByLimit,
    #[serde(rename = "sell_crypto_price")]
    SellByPrice,
    #[serde(rename = "sell_crypto_limit")]
    SellByLimit,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TradeAction::BuyByPrice => "buy_crypto_price",
            TradeAction::BuyByLimit => "buy_crypto_limit",
            TradeAction::SellByPrice => "sell_crypto_price",
            TradeAction::SellByLimit => "sell_crypto_limit",
        };
        write!(f, "{name}")
    }
}

/// One executed trade. Immutable once recorded.
#[derive(Debug, Clone, Serialize)]
pub struct TradeRecord {
    pub action: TradeAction,
    pub symbol: String,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<Decimal>,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct TradeLedger {
    records: VecDeque<TradeRecord>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self {
            records: VecDeque::new(),
        }
    }

    /// Append a record stamped now; evict the oldest past capacity.
    pub fn record(
        &mut self,
        action: TradeAction,
        symbol: &str,
        amount: Decimal,
        limit: Option<Decimal>,
    ) {
        self.records.push_back(TradeRecord {
            action,
            symbol: symbol.to_string(),
            amount,
            limit,
            time: Utc::now(),
        });
        while self.records.len() > LEDGER_CAPACITY {
            self.records.pop_front();
        }
    }

    /// Records in chronological order, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &TradeRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One record per line, for the prompt.
    pub fn render(&self) -> String {
        self.records
            .iter()
            .filter_map(|record| serde_json::to_string(record).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
