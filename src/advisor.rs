//! Decision Requester
//!
//! Turns the cycle's snapshot and the trade ledger into a chat prompt,
//! calls the completion service, and hands back the raw reply for the
//! interpreter. The system prompt spells out the six commands and the data
//! categories; the user prompt demands exactly one command-shaped line.
//!
//! Sampling runs near-deterministic (temperature 0.2 by default) and every
//! backslash is stripped from the reply - models occasionally escape the
//! quotes in their own command, and the interpreter should not have to care.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::{AdvisorConfig, TradingConfig};
use crate::ledger::TradeLedger;
use crate::snapshot::Snapshot;
use crate::universe::Universe;

/// Completion service - the only thing the requester needs from the model
/// provider.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
    ) -> Result<String>;
}

pub struct OpenAiCompletion {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

impl OpenAiCompletion {
    pub fn new(cfg: &AdvisorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
        }
    }
}

#[async_trait]
impl Completion for OpenAiCompletion {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature,
        };

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("completion request failed: {status} {body}"));
        }

        let reply: ChatResponse = resp.json().await?;
        let choice = reply
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("completion response contained no choices"))?;
        Ok(choice.message.content)
    }
}

const USER_PROMPT: &str = r#"
What should we do to make the most amount of profit based on the info?

buy_crypto_price(symbol, amount) This will buy the specified dollars of the specified cryptocurrency.
buy_crypto_limit(symbol, amount, limit) This will set a limit order to buy the specified dollars of the specified cryptocurrency if it reaches the specified limit.
sell_crypto_price(symbol, amount) This will sell the specified dollars of the specified cryptocurrency.
sell_crypto_limit(symbol, amount, limit) This will set a limit order to sell the specified dollars of the specified cryptocurrency if it reaches the specified limit.
cancel_order(orderId) This will cancel the specified order.
do_nothing() Use this when you don't see any necessary changes.

CRITICAL: RESPOND IN ONLY THE ABOVE FORMAT. EXAMPLE: buy_crypto_price("BTC", 30). ONLY RESPOND WITH ONE COMMAND.
"#;

pub struct DecisionRequester<C: Completion> {
    completion: C,
    temperature: f64,
    cadence_minutes: u64,
    tradable: String,
}

impl<C: Completion> DecisionRequester<C> {
    pub fn new(completion: C, trading: &TradingConfig, universe: &Universe) -> Self {
        Self {
            completion,
            temperature: trading.temperature,
            cadence_minutes: trading.cycle_interval_secs / 60,
            tradable: universe.spoken_list(),
        }
    }

    /// One decision request. Returns the reply verbatim except that every
    /// backslash is stripped.
    pub async fn request(&self, snapshot: &Snapshot, ledger: &TradeLedger) -> Result<String> {
        let system_prompt = self.system_prompt(snapshot, ledger)?;
        let raw = self
            .completion
            .complete(&system_prompt, USER_PROMPT, self.temperature)
            .await?;
        Ok(raw.replace('\\', ""))
    }

    fn system_prompt(&self, snapshot: &Snapshot, ledger: &TradeLedger) -> Result<String> {
        Ok(format!(
            "You are in control of my crypto trading profile. You should take into \
             consideration the factors you have to determine the best trade. Here is the info:\n\
             \n\
             You can execute these commands:\n\
             \n\
             1. buy_crypto_price(symbol, amount) This will buy the specified dollars of the specified cryptocurrency.\n\
             2. buy_crypto_limit(symbol, amount, limit) This will set a limit order to buy the specified dollars of the specified cryptocurrency if it reaches the specified limit.\n\
             3. sell_crypto_price(symbol, amount) This will sell the specified dollars of the specified cryptocurrency.\n\
             4. sell_crypto_limit(symbol, amount, limit) This will set a limit order to sell the specified dollars of the specified cryptocurrency if it reaches the specified limit.\n\
             5. cancel_order(orderId) This will cancel the specified order.\n\
             6. do_nothing() Use this when you don't see any necessary changes.\n\
             \n\
             You also have access to these data:\n\
             \n\
             1. Crypto Info (symbol, ask_price, bid_price, high_price, low_price, volume)\n\
             2. Balance\n\
             3. Open Orders (id, type, side, quantity, price)\n\
             4. Positions (symbol, quantity, dollar_value)\n\
             5. Historical Data (begins_at, open_price, close_price, high_price, low_price, volume)\n\
             6. News Headlines\n\
             \n\
             The current date and time is {now}\n\
             \n\
             You are called once every {cadence} minutes, keep this in mind.\n\
             \n\
             The only cryptos you can trade are {tradable}.\n\
             \n\
             {info}\n\
             Past Trades: {past_trades}",
            now = Utc::now().to_rfc3339(),
            cadence = self.cadence_minutes,
            tradable = self.tradable,
            info = snapshot.render()?,
            past_trades = ledger.render(),
        ))
    }
}
