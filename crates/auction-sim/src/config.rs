use std::fs;

use feels_auction::config::u128_serde;
use feels_auction::{AuctionConfig, TradeSide};
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Simulation loaded from a TOML file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimConfig {
    /// Pool fee charged on the input token (basis points)
    #[serde(default)]
    pub fee_bps: u16,

    /// Auction parameters
    pub auction: AuctionConfig,

    /// Scripted trades, replayed in order
    #[serde(default)]
    pub trades: Vec<ScriptedTrade>,
}

/// One trade of the script
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScriptedTrade {
    /// Seconds after the auction start
    pub at: i64,

    pub side: TradeSide,

    /// Input amount before fees: numeraire for buys, asset for sells
    #[serde(with = "u128_serde")]
    pub amount: u128,
}

impl SimConfig {
    /// Load configuration from TOML file
    pub fn load(path: &str) -> SimResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| SimError::InvalidConfig(format!("Failed to read config file {}: {}", path, e)))?;

        let config: SimConfig = toml::from_str(&content)
            .map_err(|e| SimError::InvalidConfig(format!("Failed to parse config file {}: {}", path, e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &str) -> SimResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SimResult<()> {
        self.auction
            .validate()
            .map_err(|e| SimError::InvalidConfig(format!("auction: {}", e)))?;

        if self.fee_bps >= 10_000 {
            return Err(SimError::InvalidConfig(format!(
                "fee_bps {} must be below 10000",
                self.fee_bps
            )));
        }

        let mut previous = 0;
        for (i, trade) in self.trades.iter().enumerate() {
            if trade.at < previous {
                return Err(SimError::InvalidConfig(format!(
                    "trade {} at {}s is out of order",
                    i, trade.at
                )));
            }
            if trade.amount == 0 {
                return Err(SimError::InvalidConfig(format!("trade {} has zero amount", i)));
            }
            previous = trade.at;
        }

        Ok(())
    }

    /// Elapsed time at which the script settles the auction
    pub fn end_time(&self) -> i64 {
        let last_trade = self.trades.last().map_or(0, |trade| trade.at);
        last_trade.max(self.auction.duration as i64)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        const ETH: u128 = 1_000_000_000_000_000_000;
        let buy = |at: i64, eth: u128| ScriptedTrade {
            at,
            side: TradeSide::Buy,
            amount: eth * ETH,
        };

        Self {
            fee_bps: 30,
            auction: AuctionConfig::default(),
            trades: vec![
                buy(60, 5),
                buy(900, 10),
                buy(2_400, 20),
                ScriptedTrade {
                    at: 4_000,
                    side: TradeSide::Sell,
                    amount: 50 * ETH,
                },
                buy(7_200, 40),
                buy(12_600, 60),
            ],
        }
    }
}

/// Write a starter configuration to `path`
pub fn create_example_config(path: &str) -> SimResult<()> {
    let config = SimConfig::default();
    config.save(path)?;
    log::info!("Example configuration written to {}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.end_time(), 6 * 3600);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = SimConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("[auction]"));
        assert!(text.contains("[[trades]]"));

        let parsed: SimConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.auction, config.auction);
        assert_eq!(parsed.trades.len(), config.trades.len());
        assert_eq!(parsed.trades[0].amount, config.trades[0].amount);
    }

    #[test]
    fn test_rejects_bad_script() {
        let mut config = SimConfig::default();
        config.trades.swap(0, 1);
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        let mut config = SimConfig::default();
        config.trades[0].amount = 0;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.fee_bps = 10_000;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.auction.duration += 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parses_minimal_file() {
        let text = r#"
            [auction]
            start_tick = 0
            end_tick = -200000
            start_time = 0
            duration = 21600
            epoch_length = 1800
            total_tokens = "1_000_000_000_000_000_000_000_000_000"
            min_proceeds = "50000000000000000000"
            max_proceeds = "500000000000000000000"
            numeraire_decimals = 18
            tick_spacing = 8
            gamma = 800
            num_pd_slugs = 2
            pd_supply_bps = 5000
            min_drift = -20000
            max_drift = 20000
            curve = "ease_out"

            [[trades]]
            at = 10
            side = "buy"
            amount = "1000000000000000000"
        "#;
        let config: SimConfig = toml::from_str(text).unwrap();
        config.validate().unwrap();
        assert_eq!(config.fee_bps, 0);
        assert_eq!(config.auction.drift_follow_bps, 10_000);
        assert_eq!(config.auction.total_tokens, 10u128.pow(27));
        assert_eq!(config.trades[0].side, TradeSide::Buy);
    }
}
