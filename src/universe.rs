//! Trading Universe Module
//!
//! The fixed set of cryptos the bot is allowed to touch. This is the market
//! definition, not a tunable: the snapshot covers exactly these symbols and
//! the prompt tells the model these are the only ones it may trade.

/// The five tracked symbols, in the order they appear in every snapshot.
pub const TRACKED_SYMBOLS: &[&str] = &["BTC", "ETH", "BNB", "XRP", "ADA"];

#[derive(Debug, Clone)]
pub struct Universe {
    symbols: Vec<String>,
}

impl Universe {
    pub fn new() -> Self {
        Self {
            symbols: TRACKED_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Symbols in snapshot order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Human list for the prompt: "BTC, ETH, BNB, XRP and ADA".
    pub fn spoken_list(&self) -> String {
        match self.symbols.split_last() {
            Some((last, rest)) if !rest.is_empty() => {
                format!("{} and {}", rest.join(", "), last)
            }
            Some((only, _)) => only.clone(),
            None => String::new(),
        }
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}
