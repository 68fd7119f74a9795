//! # Auction Schedule
//!
//! Pure functions of time: where the price should be and how much supply
//! should have been released. The shape of the decay is a pluggable
//! [`DecayCurve`]; everything is integer math so results are bit-identical
//! on every platform.

use std::fmt::Debug;

use crate::config::AuctionConfig;
use crate::constants::WAD;
use crate::errors::{AuctionError, AuctionResult};
use crate::math::safe_math::mul_div;
use crate::math::tick_math::Rounding;

/// Maps elapsed time to decay progress
pub trait DecayCurve: Debug + Send + Sync {
    /// Progress of the price move after `elapsed` of `duration` seconds, in
    /// WAD (0 at the start, `WAD` at the end). Must be monotonic in `elapsed`.
    fn progress_wad(&self, elapsed: u64, duration: u64) -> AuctionResult<u128>;
}

/// Constant-rate decay
#[derive(Debug, Clone, Copy, Default)]
pub struct Linear;

impl DecayCurve for Linear {
    fn progress_wad(&self, elapsed: u64, duration: u64) -> AuctionResult<u128> {
        mul_div(elapsed as u128, WAD, duration as u128, Rounding::Down)
    }
}

/// Quadratic ease-out, `1 - (1 - x)^2`: most of the decay happens early
#[derive(Debug, Clone, Copy, Default)]
pub struct EaseOut;

impl DecayCurve for EaseOut {
    fn progress_wad(&self, elapsed: u64, duration: u64) -> AuctionResult<u128> {
        let x = Linear.progress_wad(elapsed, duration)?;
        mul_div(x, 2 * WAD - x, WAD, Rounding::Down)
    }
}

/// Built-in curves selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "client", serde(rename_all = "snake_case"))]
pub enum CurveKind {
    #[default]
    Linear,
    EaseOut,
}

impl CurveKind {
    pub fn curve(self) -> Box<dyn DecayCurve> {
        match self {
            CurveKind::Linear => Box::new(Linear),
            CurveKind::EaseOut => Box::new(EaseOut),
        }
    }
}

/// Expected price and supply release over the auction
#[derive(Debug)]
pub struct AuctionSchedule {
    start_tick: i32,
    end_tick: i32,
    duration: u64,
    epoch_length: u64,
    num_epochs: u64,
    total_tokens: u128,
    curve: Box<dyn DecayCurve>,
}

impl AuctionSchedule {
    /// Build the schedule for a validated config using its configured curve
    pub fn new(config: &AuctionConfig) -> Self {
        Self::with_curve(config, config.curve.curve())
    }

    /// Build the schedule with a custom decay curve
    pub fn with_curve(config: &AuctionConfig, curve: Box<dyn DecayCurve>) -> Self {
        Self {
            start_tick: config.start_tick,
            end_tick: config.end_tick,
            duration: config.duration,
            epoch_length: config.epoch_length,
            num_epochs: config.num_epochs(),
            total_tokens: config.total_tokens,
            curve,
        }
    }

    /// Schedule tick at `elapsed` seconds, truncated toward the start tick
    pub fn expected_tick(&self, elapsed: i64) -> AuctionResult<i32> {
        if elapsed < 0 {
            return Err(AuctionError::AuctionNotStarted);
        }
        let elapsed = elapsed as u64;
        if elapsed >= self.duration {
            return Ok(self.end_tick);
        }

        let progress = self.curve.progress_wad(elapsed, self.duration)?;
        if progress > WAD {
            return Err(AuctionError::invalid_parameter("curve"));
        }

        let delta = self.end_tick as i128 - self.start_tick as i128;
        // Integer division truncates toward zero, i.e. toward the start tick
        let offset = delta * progress as i128 / WAD as i128;
        Ok((self.start_tick as i128 + offset) as i32)
    }

    /// Epoch index at `elapsed`, capped at the last epoch
    pub fn epoch_at(&self, elapsed: i64) -> AuctionResult<u64> {
        if elapsed < 0 {
            return Err(AuctionError::AuctionNotStarted);
        }
        let epoch = (elapsed as u64)
            .checked_div(self.epoch_length)
            .ok_or(AuctionError::DivisionByZero)?;
        Ok(epoch.min(self.num_epochs.saturating_sub(1)))
    }

    /// Elapsed seconds at which `epoch` begins
    pub fn epoch_start(&self, epoch: u64) -> i64 {
        epoch.saturating_mul(self.epoch_length).min(i64::MAX as u64) as i64
    }

    /// Cumulative supply expected to be sold by the end of `epoch`
    pub fn expected_sold(&self, epoch: u64) -> AuctionResult<u128> {
        let epochs_done = epoch.saturating_add(1).min(self.num_epochs);
        mul_div(self.total_tokens, epochs_done as u128, self.num_epochs as u128, Rounding::Down)
    }

    pub fn num_epochs(&self) -> u64 {
        self.num_epochs
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }
}
