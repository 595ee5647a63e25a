//! CryptoPilot - Watchdog
//!
//! External guardian process: starts the bot, waits for it to exit, and
//! restarts it. The trading loop itself treats every uncaught failure as
//! fatal, so this is where "keep it running" lives.

use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const MAX_RESTARTS_PER_HOUR: u32 = 5;
const RESTART_DELAY_SECS: u64 = 10;
const BOT_BINARY: &str = "./target/release/cryptopilot";

fn send_telegram(message: &str) {
    let token = std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default();
    let chat_id = std::env::var("TELEGRAM_CHAT_ID").unwrap_or_default();
    if token.is_empty() || chat_id.is_empty() {
        return;
    }

    let url = format!(
        "https://api.telegram.org/bot{}/sendMessage?chat_id={}&text={}",
        token,
        chat_id,
        urlencoding(message)
    );

    // Fire and forget - don't block the watchdog
    let _ = Command::new("curl")
        .args(["-s", &url])
        .stdout(Stdio::null())
        .spawn();
}

fn urlencoding(s: &str) -> String {
    s.replace(' ', "%20")
        .replace('\n', "%0A")
        .replace('!', "%21")
        .replace('#', "%23")
}

fn start_bot() -> Option<Child> {
    println!("[WATCHDOG] Starting CryptoPilot...");

    match Command::new(BOT_BINARY)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
    {
        Ok(child) => {
            println!("[WATCHDOG] CryptoPilot started (PID: {})", child.id());
            Some(child)
        }
        Err(e) => {
            println!("[WATCHDOG] Failed to start: {}", e);
            send_telegram(&format!("❌ WATCHDOG: Failed to start CryptoPilot: {}", e));
            None
        }
    }
}

fn main() {
    println!("═══════════════════════════════════════════════════════════");
    println!("  CRYPTOPILOT WATCHDOG - External Guardian");
    println!("═══════════════════════════════════════════════════════════");

    send_telegram("🐕 Watchdog started - monitoring CryptoPilot");

    let mut restart_count: u32 = 0;
    let mut hour_start = Instant::now();

    loop {
        // Reset restart counter every hour
        if hour_start.elapsed() > Duration::from_secs(3600) {
            restart_count = 0;
            hour_start = Instant::now();
        }

        // Check restart limit
        if restart_count >= MAX_RESTARTS_PER_HOUR {
            println!("[WATCHDOG] Too many restarts! Waiting for next hour...");
            send_telegram("🚨 WATCHDOG: Too many restarts! Pausing for 1 hour.");
            thread::sleep(Duration::from_secs(3600));
            restart_count = 0;
            hour_start = Instant::now();
            continue;
        }

        // Start the process
        let mut child = match start_bot() {
            Some(c) => c,
            None => {
                thread::sleep(Duration::from_secs(RESTART_DELAY_SECS));
                restart_count += 1;
                continue;
            }
        };

        // Wait for process to exit
        match child.wait() {
            Ok(status) => {
                if status.success() {
                    println!("[WATCHDOG] CryptoPilot exited normally");
                    send_telegram("ℹ️ CryptoPilot exited normally");
                } else {
                    println!("[WATCHDOG] CryptoPilot died! Exit code: {:?}", status.code());
                    send_telegram(&format!(
                        "💀 CryptoPilot DIED! Exit: {:?}. Restarting...",
                        status.code()
                    ));
                    restart_count += 1;
                }
            }
            Err(e) => {
                println!("[WATCHDOG] Error waiting for process: {}", e);
                send_telegram(&format!("❌ Watchdog error: {}", e));
                restart_count += 1;
            }
        }

        // Delay before restart
        println!("[WATCHDOG] Restarting in {} seconds...", RESTART_DELAY_SECS);
        thread::sleep(Duration::from_secs(RESTART_DELAY_SECS));
    }
}
