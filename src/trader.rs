//! Loop Driver
//!
//! One `Trader` owns the ledger and the collaborator handles and runs the
//! cycle forever: snapshot -> decision -> interpret -> execute -> sleep.
//! Everything is sequential on one task; the safety pauses and the
//! inter-cycle sleep are plain awaits with nothing else going on.
//!
//! A malformed reply is the only thing that gets retried, and the retry is
//! a bounded loop: after `max_decision_retries` fresh decisions the cycle
//! fails for good. Any error out of a cycle ends the process - restart
//! supervision belongs to the watchdog, not to this loop.

use anyhow::{bail, Result};
use rust_decimal::prelude::ToPrimitive;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::advisor::{Completion, DecisionRequester};
use crate::broker::Broker;
use crate::comms::telegram;
use crate::config::{TelegramConfig, TradingConfig};
use crate::executor;
use crate::interpreter::{self, Command, Outcome};
use crate::ledger::TradeLedger;
use crate::news::NewsSource;
use crate::snapshot;
use crate::status::SystemStatus;
use crate::universe::Universe;

pub struct Trader<B, C, N>
where
    B: Broker,
    C: Completion,
    N: NewsSource,
{
    trading: TradingConfig,
    telegram: TelegramConfig,
    universe: Universe,
    broker: B,
    requester: DecisionRequester<C>,
    news: N,
    ledger: TradeLedger,
    cycles_completed: u64,
}

impl<B, C, N> Trader<B, C, N>
where
    B: Broker,
    C: Completion,
    N: NewsSource,
{
    pub fn new(
        trading: TradingConfig,
        telegram: TelegramConfig,
        universe: Universe,
        broker: B,
        requester: DecisionRequester<C>,
        news: N,
    ) -> Self {
        Self {
            trading,
            telegram,
            universe,
            broker,
            requester,
            news,
            ledger: TradeLedger::new(),
            cycles_completed: 0,
        }
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    /// Run forever. Only returns with an error.
    pub async fn run(&mut self) -> Result<()> {
        let interval = Duration::from_secs(self.trading.cycle_interval_secs);
        loop {
            self.cycle().await?;
            info!(
                secs = self.trading.cycle_interval_secs,
                "cycle complete, sleeping"
            );
            sleep(interval).await;
        }
    }

    /// One full cycle: snapshot, decision, parse, execute.
    pub async fn cycle(&mut self) -> Result<()> {
        let snapshot = snapshot::build(&self.broker, &self.news, &self.universe).await?;
        info!(
            balance = %snapshot.balance,
            positions = snapshot.positions.len(),
            open_orders = snapshot.open_orders.len(),
            news_symbols = snapshot.news.len(),
            "snapshot assembled"
        );

        let mut response = self.requester.request(&snapshot, &self.ledger).await?;
        let mut retries = 0u32;

        let command: Option<Command> = loop {
            match interpreter::interpret(&response) {
                Outcome::Execute(command) => break Some(command),
                Outcome::InsufficientArgs { verb_name, args } => {
                    info!(verb = %verb_name, ?args, "not enough arguments, doing nothing");
                    break None;
                }
                Outcome::UnknownVerb { name } => {
                    warn!(verb = %name, "invalid command");
                    break None;
                }
                Outcome::Malformed => {
                    if retries >= self.trading.max_decision_retries {
                        let _ = telegram::send_retry_exhausted(&self.telegram, &response).await;
                        bail!(
                            "no well-formed command after {retries} fresh decisions, \
                             last response: {response:?}"
                        );
                    }
                    retries += 1;
                    warn!(retries, response = %response, "malformed decision, asking again");
                    sleep(Duration::from_secs(self.trading.retry_delay_secs)).await;
                    response = self.requester.request(&snapshot, &self.ledger).await?;
                }
            }
        };

        let mut last_command = "no action".to_string();
        if let Some(command) = command {
            info!(
                verb = %command.verb,
                args = ?command.args,
                delay_secs = self.trading.execute_delay_secs,
                "executing command after safety delay"
            );
            sleep(Duration::from_secs(self.trading.execute_delay_secs)).await;

            let ack = executor::execute(&self.broker, &mut self.ledger, &command).await?;
            if let Some(ack) = &ack {
                info!(id = %ack.id, state = %ack.state, "brokerage acknowledged");
            }
            let _ = telegram::send_trade(&self.telegram, &command).await;
            last_command = format!("{}({})", command.verb, command.args.join(", "));
        }

        self.cycles_completed += 1;

        let status = SystemStatus {
            running: true,
            cycles_completed: self.cycles_completed,
            balance: snapshot.balance.to_f64().unwrap_or(0.0),
            last_command,
            updated_at: chrono::Utc::now().timestamp(),
        };
        if let Err(e) = status.save() {
            warn!("failed to write status file: {e}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{Candle, Holding, OpenOrder, OrderAck, Quote};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct StubBroker {
        orders: Mutex<Vec<String>>,
    }

    impl StubBroker {
        fn new() -> Self {
            Self {
                orders: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Broker for StubBroker {
        async fn connect(&mut self) -> Result<()> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }

        async fn get_quote(&self, symbol: &str) -> Result<Quote> {
            Ok(Quote {
                symbol: symbol.to_string(),
                ask_price: "101".to_string(),
                bid_price: "99".to_string(),
                mark_price: "100".to_string(),
                high_price: "110".to_string(),
                low_price: "90".to_string(),
                volume: "1".to_string(),
            })
        }

        async fn account_balance(&self) -> Result<Decimal> {
            Ok(dec!(500))
        }

        async fn get_positions(&self) -> Result<Vec<Holding>> {
            Ok(Vec::new())
        }

        async fn get_open_orders(&self) -> Result<Vec<OpenOrder>> {
            Ok(Vec::new())
        }

        async fn get_historicals(
            &self,
            _symbol: &str,
            _interval: &str,
            _span: &str,
        ) -> Result<Vec<Candle>> {
            Ok(Vec::new())
        }

        async fn buy_by_price(&self, symbol: &str, amount: Decimal) -> Result<OrderAck> {
            self.orders
                .lock()
                .unwrap()
                .push(format!("buy {symbol} {amount}"));
            Ok(OrderAck {
                id: "ack".to_string(),
                state: "confirmed".to_string(),
                side: "buy".to_string(),
                quantity: None,
                price: None,
            })
        }

        async fn buy_by_limit(
            &self,
            _symbol: &str,
            _amount: Decimal,
            _limit: Decimal,
        ) -> Result<OrderAck> {
            unimplemented!("not used in these tests")
        }

        async fn sell_by_price(&self, _symbol: &str, _amount: Decimal) -> Result<OrderAck> {
            unimplemented!("not used in these tests")
        }

        async fn sell_by_limit(
            &self,
            _symbol: &str,
            _amount: Decimal,
            _limit: Decimal,
        ) -> Result<OrderAck> {
            unimplemented!("not used in these tests")
        }

        async fn cancel_order(&self, _order_id: &str) -> Result<()> {
            unimplemented!("not used in these tests")
        }
    }

    struct NoNews;

    #[async_trait]
    impl NewsSource for NoNews {
        async fn search(&self, _query: &str) -> Result<Option<Vec<crate::news::Headline>>> {
            Ok(Some(Vec::new()))
        }
    }

    /// Replays a fixed sequence of replies and counts how often it is asked.
    /// The last reply repeats once the script runs out.
    struct ScriptedCompletion {
        replies: Vec<String>,
        requests: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Completion for ScriptedCompletion {
        async fn complete(&self, _system: &str, _user: &str, _temperature: f64) -> Result<String> {
            let index = self.requests.fetch_add(1, Ordering::SeqCst);
            let reply = self
                .replies
                .get(index)
                .or_else(|| self.replies.last())
                .cloned()
                .unwrap_or_default();
            Ok(reply)
        }
    }

    fn fast_config() -> TradingConfig {
        TradingConfig {
            cycle_interval_secs: 60,
            execute_delay_secs: 0,
            retry_delay_secs: 0,
            max_decision_retries: 5,
            temperature: 0.0,
        }
    }

    fn trader(
        replies: &[&str],
        trading: TradingConfig,
    ) -> (
        Trader<StubBroker, ScriptedCompletion, NoNews>,
        Arc<AtomicUsize>,
    ) {
        let requests = Arc::new(AtomicUsize::new(0));
        let completion = ScriptedCompletion {
            replies: replies.iter().map(|s| s.to_string()).collect(),
            requests: Arc::clone(&requests),
        };
        let universe = Universe::new();
        let requester = DecisionRequester::new(completion, &trading, &universe);
        let trader = Trader::new(
            trading,
            TelegramConfig::default(),
            universe,
            StubBroker::new(),
            requester,
            NoNews,
        );
        (trader, requests)
    }

    #[tokio::test]
    async fn test_malformed_replies_trigger_fresh_decisions() {
        // two malformed replies, then a well-formed no-op: N + 1 requests
        let (mut t, requests) = trader(
            &["thinking about it", "still thinking", "do_nothing()"],
            fast_config(),
        );

        t.cycle().await.unwrap();

        assert_eq!(requests.load(Ordering::SeqCst), 3);
        assert!(t.ledger().is_empty());
    }

    #[tokio::test]
    async fn test_retry_cap_is_terminal() {
        let mut config = fast_config();
        config.max_decision_retries = 2;
        let (mut t, requests) = trader(&["not a command"], config);

        let err = t.cycle().await.unwrap_err();

        // initial request plus two retries, then the cycle dies
        assert_eq!(requests.load(Ordering::SeqCst), 3);
        assert!(err.to_string().contains("no well-formed command"));
        assert_eq!(t.cycles_completed(), 0);
    }

    #[tokio::test]
    async fn test_executed_command_lands_in_ledger() {
        let (mut t, requests) = trader(&["buy_crypto_price(\"BTC\", 30)"], fast_config());

        t.cycle().await.unwrap();

        assert_eq!(requests.load(Ordering::SeqCst), 1);
        assert_eq!(t.ledger().len(), 1);
        let record = t.ledger().history().next().unwrap();
        assert_eq!(record.symbol, "BTC");
        assert_eq!(record.amount, dec!(30));
        assert_eq!(t.cycles_completed(), 1);
    }

    #[tokio::test]
    async fn test_unknown_verb_completes_the_cycle_without_action() {
        let (mut t, requests) = trader(&["short_everything(\"BTC\", 30)"], fast_config());

        t.cycle().await.unwrap();

        assert_eq!(requests.load(Ordering::SeqCst), 1);
        assert!(t.ledger().is_empty());
        assert_eq!(t.cycles_completed(), 1);
    }

    #[tokio::test]
    async fn test_single_argument_cancel_is_swallowed() {
        // the interpreter's arity gate drops it; the cycle still succeeds
        let (mut t, _requests) = trader(&["cancel_order(\"7f3a\")"], fast_config());

        t.cycle().await.unwrap();

        assert!(t.ledger().is_empty());
        assert_eq!(t.cycles_completed(), 1);
    }
}
