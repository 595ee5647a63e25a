//! Status file for sharing state between processes

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const STATUS_FILE: &str = "cryptopilot_status.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SystemStatus {
    pub running: bool,
    pub cycles_completed: u64,
    pub balance: f64,
    pub last_command: String,
    pub updated_at: i64,
}

impl SystemStatus {
    pub fn save(&self) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(STATUS_FILE, json)?;
        Ok(())
    }

    pub fn load() -> Self {
        if Path::new(STATUS_FILE).exists() {
            fs::read_to_string(STATUS_FILE)
                .ok()
                .and_then(|contents| serde_json::from_str(&contents).ok())
                .unwrap_or_default()
        } else {
            Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status() {
        let status = SystemStatus::default();
        assert!(!status.running);
        assert_eq!(status.cycles_completed, 0);
        assert_eq!(status.last_command, "");
    }

    #[test]
    fn test_round_trip_through_json() {
        let status = SystemStatus {
            running: true,
            cycles_completed: 7,
            balance: 998.25,
            last_command: "buy_crypto_price(BTC, 30)".to_string(),
            updated_at: 1_700_000_000,
        };
        let json = serde_json::to_string(&status).unwrap();
        let parsed: SystemStatus = serde_json::from_str(&json).unwrap();
        assert!(parsed.running);
        assert_eq!(parsed.cycles_completed, 7);
        assert_eq!(parsed.last_command, status.last_command);
    }
}
