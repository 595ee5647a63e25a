//! Action Executor
//!
//! Dispatches a parsed [`Command`] to the brokerage and records the trade
//! in the ledger. The match over [`Verb`] is exhaustive, so a new verb
//! cannot be added without deciding what executing it means.
//!
//! Argument conversion is strict: a bad arity or an amount that does not
//! parse as a decimal is an error, and errors here abort the cycle - there
//! is no local recovery, by contract.

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use tracing::info;

use crate::broker::{Broker, OrderAck};
use crate::interpreter::{Command, Verb};
use crate::ledger::{TradeAction, TradeLedger};

/// Execute one command. Returns the brokerage acknowledgment for the four
/// order verbs, `None` for cancel and the no-op.
pub async fn execute<B: Broker>(
    broker: &B,
    ledger: &mut TradeLedger,
    command: &Command,
) -> Result<Option<OrderAck>> {
    match command.verb {
        Verb::BuyByPrice => {
            let (symbol, amount) = order_args(command)?;
            let ack = broker.buy_by_price(symbol, amount).await?;
            ledger.record(TradeAction::BuyByPrice, symbol, amount, None);
            info!(symbol, %amount, ?ack, "market buy placed");
            Ok(Some(ack))
        }
        Verb::BuyByLimit => {
            let (symbol, amount, limit) = limit_order_args(command)?;
            let ack = broker.buy_by_limit(symbol, amount, limit).await?;
            ledger.record(TradeAction::BuyByLimit, symbol, amount, Some(limit));
            info!(symbol, %amount, %limit, ?ack, "limit buy placed");
            Ok(Some(ack))
        }
        Verb::SellByPrice => {
            let (symbol, amount) = order_args(command)?;
            let ack = broker.sell_by_price(symbol, amount).await?;
            ledger.record(TradeAction::SellByPrice, symbol, amount, None);
            info!(symbol, %amount, ?ack, "market sell placed");
            Ok(Some(ack))
        }
        Verb::SellByLimit => {
            let (symbol, amount, limit) = limit_order_args(command)?;
            let ack = broker.sell_by_limit(symbol, amount, limit).await?;
            ledger.record(TradeAction::SellByLimit, symbol, amount, Some(limit));
            info!(symbol, %amount, %limit, ?ack, "limit sell placed");
            Ok(Some(ack))
        }
        Verb::CancelOrder => {
            check_arity(command, 1)?;
            let order_id = &command.args[0];
            broker.cancel_order(order_id).await?;
            info!(%order_id, "order cancelled");
            Ok(None)
        }
        // No brokerage call and no ledger entry.
        Verb::NoOp => Ok(None),
    }
}

fn order_args(command: &Command) -> Result<(&str, Decimal)> {
    check_arity(command, 2)?;
    Ok((
        command.args[0].as_str(),
        parse_decimal(&command.args[1], "amount")?,
    ))
}

fn limit_order_args(command: &Command) -> Result<(&str, Decimal, Decimal)> {
    check_arity(command, 3)?;
    Ok((
        command.args[0].as_str(),
        parse_decimal(&command.args[1], "amount")?,
        parse_decimal(&command.args[2], "limit")?,
    ))
}

fn check_arity(command: &Command, expected: usize) -> Result<()> {
    if command.args.len() != expected {
        bail!(
            "{} expects {} arguments, got {}",
            command.verb,
            expected,
            command.args.len()
        );
    }
    Ok(())
}

fn parse_decimal(raw: &str, what: &str) -> Result<Decimal> {
    raw.parse::<Decimal>()
        .with_context(|| format!("could not parse {what} {raw:?} as a decimal"))
}
