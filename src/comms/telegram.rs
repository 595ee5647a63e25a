//! Telegram notifications
//!
//! Fire-and-forget: a failed notification is logged and swallowed, it must
//! never take the trading loop down with it.

use anyhow::Result;
use tracing::warn;

use crate::config::TelegramConfig;
use crate::interpreter::Command;

pub async fn send(cfg: &TelegramConfig, message: &str) -> Result<()> {
    if !cfg.enabled {
        return Ok(());
    }

    let url = format!("https://api.telegram.org/bot{}/sendMessage", cfg.bot_token);
    let client = reqwest::Client::new();
    let params = [
        ("chat_id", cfg.chat_id.as_str()),
        ("text", message),
        ("parse_mode", "HTML"),
    ];

    match client.post(&url).form(&params).send().await {
        Ok(resp) => {
            if !resp.status().is_success() {
                warn!("telegram send failed: {}", resp.status());
            }
        }
        Err(e) => {
            warn!("telegram error: {e}");
        }
    }

    Ok(())
}

pub async fn send_startup(cfg: &TelegramConfig, name: &str) {
    let msg = format!("🚀 <b>{name}</b> started\n\nFirst cycle begins now...");
    let _ = send(cfg, &msg).await;
}

pub async fn send_trade(cfg: &TelegramConfig, command: &Command) -> Result<()> {
    let msg = format!(
        "✅ <b>EXECUTED</b>\n\nCommand: {}({})",
        command.verb,
        command.args.join(", ")
    );
    send(cfg, &msg).await
}

pub async fn send_retry_exhausted(cfg: &TelegramConfig, response: &str) -> Result<()> {
    let msg = format!(
        "🚨 <b>CYCLE FAILED</b>\n\nNo parseable command after retries.\nLast reply: {response}"
    );
    send(cfg, &msg).await
}
