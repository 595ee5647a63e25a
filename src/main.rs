//! CryptoPilot - GPT-Driven Crypto Trading Loop
//!
//! Every thirty minutes: snapshot the account and the market, ask the
//! model for exactly one command, parse it, execute it. The model is the
//! strategy; this binary is the plumbing and the safety rails around it.

use anyhow::Result;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use cryptopilot::advisor::{DecisionRequester, OpenAiCompletion};
use cryptopilot::broker::robinhood::RobinhoodBroker;
use cryptopilot::broker::Broker;
use cryptopilot::comms::telegram;
use cryptopilot::config::Config;
use cryptopilot::news::NewsApiClient;
use cryptopilot::trader::Trader;
use cryptopilot::universe::Universe;

const SEP: &str = "===========================================================";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let cfg = Config::load("config.toml").unwrap_or_else(|e| {
        eprintln!("Failed to load config.toml: {}. Exiting.", e);
        std::process::exit(1);
    });

    // Setup logging
    let level = cfg.system.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{}", SEP);
    info!("  {} - GPT-Driven Crypto Trading Loop", cfg.system.name);
    info!("  The model decides. This process snapshots, parses, executes.");
    info!("{}", SEP);

    let universe = Universe::new();
    info!("Universe: {}", universe.spoken_list());
    info!(
        "Cycle: every {}s | execute delay {}s | retry delay {}s | max retries {}",
        cfg.trading.cycle_interval_secs,
        cfg.trading.execute_delay_secs,
        cfg.trading.retry_delay_secs,
        cfg.trading.max_decision_retries
    );
    info!("Advisor model: {}", cfg.advisor.model);

    // Authenticate with the brokerage. No session, no bot.
    let mut broker = RobinhoodBroker::new(&cfg.broker);
    broker.connect().await?;

    match broker.account_balance().await {
        Ok(balance) => info!("Buying power: ${balance}"),
        Err(e) => warn!("Failed to read account balance: {e}"),
    }

    if cfg.telegram.enabled {
        telegram::send_startup(&cfg.telegram, &cfg.system.name).await;
    }

    let requester = DecisionRequester::new(
        OpenAiCompletion::new(&cfg.advisor),
        &cfg.trading,
        &universe,
    );
    let news = NewsApiClient::new(&cfg.news);

    let mut trader = Trader::new(
        cfg.trading,
        cfg.telegram,
        universe,
        broker,
        requester,
        news,
    );

    info!("Entering the trading loop. Kill the process to stop.");
    trader.run().await
}
