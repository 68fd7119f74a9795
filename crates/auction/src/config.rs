//! # Auction Configuration
//!
//! Immutable parameters of one auction, validated once before the engine is
//! constructed. Token amounts are raw units of the respective token.

use crate::constants::{
    BPS_DENOMINATOR, DEFAULT_DRIFT_FOLLOW_BPS, MAX_NUMERAIRE_DECIMALS, MAX_PD_SLUGS, MAX_TICK, MIN_TICK,
};
use crate::errors::{AuctionError, AuctionResult};
use crate::math::tick_math::check_tick;
use crate::schedule::CurveKind;

/// Parameters of a Dutch auction
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct AuctionConfig {
    /// Tick at which the auction opens (highest price)
    pub start_tick: i32,
    /// Tick the schedule reaches at `duration`
    pub end_tick: i32,
    /// Absolute start timestamp in seconds
    pub start_time: u64,
    /// Auction length in seconds
    pub duration: u64,
    /// Rebalance interval in seconds
    pub epoch_length: u64,
    /// Asset supply offered by the auction
    #[cfg_attr(feature = "client", serde(with = "u128_serde"))]
    pub total_tokens: u128,
    /// Net proceeds required to graduate
    #[cfg_attr(feature = "client", serde(with = "u128_serde"))]
    pub min_proceeds: u128,
    /// Net proceeds that graduate the auction early
    #[cfg_attr(feature = "client", serde(with = "u128_serde"))]
    pub max_proceeds: u128,
    /// Decimals of the numeraire token
    pub numeraire_decimals: u8,
    /// Pool tick spacing; every slug bound is a multiple of it
    pub tick_spacing: i32,
    /// Width in ticks of the upper slug and of each price discovery slug
    pub gamma: i32,
    /// Price discovery slugs placed above the upper slug
    pub num_pd_slugs: u8,
    /// Share of the post-epoch remaining supply seeded into price discovery slugs
    pub pd_supply_bps: u16,
    /// Lower clamp of the accumulated drift (ticks, <= 0)
    pub min_drift: i32,
    /// Upper clamp of the accumulated drift (ticks, >= 0)
    pub max_drift: i32,
    /// How strongly accumulated drift moves the slug anchor
    #[cfg_attr(feature = "client", serde(default = "default_drift_follow_bps"))]
    pub drift_follow_bps: u16,
    /// Shape of the price decay
    #[cfg_attr(feature = "client", serde(default))]
    pub curve: CurveKind,
}

#[cfg(feature = "client")]
fn default_drift_follow_bps() -> u16 {
    DEFAULT_DRIFT_FOLLOW_BPS
}

impl AuctionConfig {
    /// Validate every construction invariant
    pub fn validate(&self) -> AuctionResult<()> {
        check_tick(self.start_tick).map_err(|_| AuctionError::InvalidTickRange)?;
        check_tick(self.end_tick).map_err(|_| AuctionError::InvalidTickRange)?;
        if self.start_tick <= self.end_tick {
            return Err(AuctionError::InvalidTickRange);
        }

        if self.epoch_length == 0 {
            return Err(AuctionError::invalid_parameter("epoch_length"));
        }
        if self.duration == 0 || self.duration > i64::MAX as u64 {
            return Err(AuctionError::invalid_parameter("duration"));
        }
        if self.duration % self.epoch_length != 0 {
            return Err(AuctionError::DurationNotMultipleOfEpoch);
        }

        if self.total_tokens == 0 {
            return Err(AuctionError::invalid_parameter("total_tokens"));
        }
        if self.max_proceeds == 0 {
            return Err(AuctionError::invalid_parameter("max_proceeds"));
        }
        if self.min_proceeds > self.max_proceeds {
            return Err(AuctionError::invalid_parameter("min_proceeds"));
        }
        if self.numeraire_decimals > MAX_NUMERAIRE_DECIMALS {
            return Err(AuctionError::invalid_parameter("numeraire_decimals"));
        }

        if self.tick_spacing <= 0 || self.tick_spacing > MAX_TICK {
            return Err(AuctionError::invalid_parameter("tick_spacing"));
        }
        if self.gamma <= 0 || self.gamma % self.tick_spacing != 0 {
            return Err(AuctionError::invalid_parameter("gamma"));
        }
        if self.num_pd_slugs == 0 || self.num_pd_slugs > MAX_PD_SLUGS {
            return Err(AuctionError::invalid_parameter("num_pd_slugs"));
        }
        if self.pd_supply_bps as u128 > BPS_DENOMINATOR {
            return Err(AuctionError::invalid_parameter("pd_supply_bps"));
        }

        if self.min_drift > 0 {
            return Err(AuctionError::invalid_parameter("min_drift"));
        }
        if self.max_drift < 0 {
            return Err(AuctionError::invalid_parameter("max_drift"));
        }
        if self.drift_follow_bps as u128 > BPS_DENOMINATOR {
            return Err(AuctionError::invalid_parameter("drift_follow_bps"));
        }

        self.validate_headroom()
    }

    // Every slug any epoch can place must stay inside the legal tick range.
    fn validate_headroom(&self) -> AuctionResult<()> {
        let spacing = self.tick_spacing as i64;
        let gamma = self.gamma as i64;
        let follow = self.drift_follow_bps as i64;
        let max_shift = self.max_drift as i64 * follow / BPS_DENOMINATOR as i64;
        let min_shift = self.min_drift as i64 * follow / BPS_DENOMINATOR as i64;

        // Highest anchor, rounded up, plus the upper slug and the full PD stack
        let top = self.start_tick as i64
            + max_shift
            + spacing
            + gamma * (1 + self.num_pd_slugs as i64);
        // Lowest anchor minus the widest lower slug, plus one spacing of alignment
        let bottom = self.end_tick as i64 + min_shift - (gamma - min_shift) - spacing;

        if top > MAX_TICK as i64 || bottom < MIN_TICK as i64 {
            return Err(AuctionError::InvalidTickRange);
        }
        Ok(())
    }

    /// Number of epochs in the auction
    pub fn num_epochs(&self) -> u64 {
        self.duration.checked_div(self.epoch_length).unwrap_or(0)
    }

    /// Convert an absolute timestamp into seconds since `start_time`
    pub fn elapsed_at(&self, now: u64) -> i64 {
        let elapsed = now as i128 - self.start_time as i128;
        elapsed.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    /// Whether the auction window has closed at `elapsed`
    pub fn is_expired(&self, elapsed: i64) -> bool {
        elapsed >= 0 && elapsed as u64 >= self.duration
    }
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            start_tick: 0,
            end_tick: -200_000,
            start_time: 0,
            duration: 6 * 3600,
            epoch_length: 30 * 60,
            total_tokens: 1_000_000_000 * 10u128.pow(18),
            min_proceeds: 50 * 10u128.pow(18),
            max_proceeds: 500 * 10u128.pow(18),
            numeraire_decimals: 18,
            tick_spacing: 8,
            gamma: 800,
            num_pd_slugs: 1,
            pd_supply_bps: 5_000,
            min_drift: -20_000,
            max_drift: 20_000,
            drift_follow_bps: DEFAULT_DRIFT_FOLLOW_BPS,
            curve: CurveKind::Linear,
        }
    }
}

/// Serialize `u128` amounts as decimal strings
///
/// TOML integers are 64-bit, too small for 18-decimal token amounts.
#[cfg(feature = "client")]
pub mod u128_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &u128, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.replace('_', "").parse::<u128>().map_err(serde::de::Error::custom)
    }
}
