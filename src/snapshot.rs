//! Market/Account Snapshot Builder
//!
//! Everything the model gets to see for one decision, rebuilt from scratch
//! every cycle: quotes, balance, positions, open orders, a week of candles
//! and a few headlines per symbol. Nothing is cached between cycles.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

use crate::broker::{Broker, Candle, OpenOrder, Quote};
use crate::news::{Headline, NewsSource};
use crate::universe::Universe;

/// Candle resolution and span for the historical pull: a week of
/// ten-minute candles, around the clock.
pub const HISTORICAL_INTERVAL: &str = "10minute";
pub const HISTORICAL_SPAN: &str = "week";

/// One dollar of buying power is held back for fees.
const FEE_RESERVE: Decimal = dec!(1);

/// A held position valued at the current mark price.
#[derive(Debug, Clone, Serialize)]
pub struct PositionView {
    pub symbol: String,
    pub quantity: Decimal,
    pub dollar_value: Decimal,
}

#[derive(Debug)]
pub struct Snapshot {
    pub quotes: HashMap<String, Quote>,
    pub balance: Decimal,
    pub positions: Vec<PositionView>,
    pub open_orders: Vec<OpenOrder>,
    pub historicals: HashMap<String, Vec<Candle>>,
    /// May cover fewer than the five symbols: the news pull stops at the
    /// first malformed payload and keeps what it has.
    pub news: HashMap<String, Vec<Headline>>,
}

impl Snapshot {
    /// The data block appended to the system prompt.
    pub fn render(&self) -> Result<String> {
        Ok(format!(
            "Crypto Info: {}\nBalance: {}\nPositions: {}\nHistoricals: {}\nNews: {}\nOpen Orders: {}",
            serde_json::to_string(&self.quotes)?,
            self.balance,
            serde_json::to_string(&self.positions)?,
            serde_json::to_string(&self.historicals)?,
            serde_json::to_string(&self.news)?,
            serde_json::to_string(&self.open_orders)?,
        ))
    }
}

pub async fn build<B, N>(broker: &B, news: &N, universe: &Universe) -> Result<Snapshot>
where
    B: Broker,
    N: NewsSource,
{
    let mut quotes = HashMap::new();
    for symbol in universe.symbols() {
        quotes.insert(symbol.to_string(), broker.get_quote(symbol).await?);
    }

    let balance = broker.account_balance().await? - FEE_RESERVE;

    let mut positions = Vec::new();
    for holding in broker.get_positions().await? {
        let quantity: Decimal = holding
            .quantity
            .parse()
            .with_context(|| format!("bad position quantity {:?}", holding.quantity))?;
        if quantity <= Decimal::ZERO || !universe.contains(&holding.symbol) {
            continue;
        }
        let mark: Decimal = broker
            .get_quote(&holding.symbol)
            .await?
            .mark_price
            .parse()
            .with_context(|| format!("bad mark price for {}", holding.symbol))?;
        positions.push(PositionView {
            dollar_value: quantity * mark,
            symbol: holding.symbol,
            quantity,
        });
    }

    let open_orders = broker.get_open_orders().await?;

    let mut historicals = HashMap::new();
    for symbol in universe.symbols() {
        historicals.insert(
            symbol.to_string(),
            broker
                .get_historicals(symbol, HISTORICAL_INTERVAL, HISTORICAL_SPAN)
                .await?,
        );
    }

    // Degrade silently on a malformed news payload: stop pulling and keep
    // whatever is already gathered. Callers must not assume all five
    // symbols are present.
    let mut news_map = HashMap::new();
    for symbol in universe.symbols() {
        match news.search(symbol).await? {
            Some(headlines) => {
                news_map.insert(symbol.to_string(), headlines);
            }
            None => {
                warn!(symbol, "news payload missing expected fields, keeping what we have");
                break;
            }
        }
    }

    Ok(Snapshot {
        quotes,
        balance,
        positions,
        open_orders,
        historicals,
        news: news_map,
    })
}
