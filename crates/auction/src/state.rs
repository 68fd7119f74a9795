//! # Auction State
//!
//! Mutable per-asset state. All mutation happens on a scratch copy of
//! [`AuctionState`] that the controller commits only when the whole call
//! succeeds.

use crate::config::AuctionConfig;
use crate::drift::DriftAccumulator;
use crate::errors::{AuctionError, AuctionResult};
use crate::events::AuctionEvent;
use crate::lifecycle::LifecycleGate;
use crate::math::safe_math::{safe_add_proceeds, safe_sub_u128};
use crate::reentrancy::ReentrancyStatus;
use crate::slugs::SlugSet;
use crate::types::TokenAmounts;

// ============================================================================
// Trade Types
// ============================================================================

/// Direction of a trade from the trader's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "client", serde(rename_all = "snake_case"))]
pub enum TradeSide {
    /// Numeraire in, asset out
    Buy,
    /// Asset in, numeraire out
    Sell,
}

/// What the pool executed, reported after the trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct TradeReceipt {
    pub side: TradeSide,
    /// Gross input, fee included
    pub amount_in: u128,
    pub amount_out: u128,
    /// Fee charged in the input token
    pub fee: u128,
}

/// Caps the engine places on a trade before it executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct TradeLimit {
    /// Asset the slugs hold at the starting price, at most the never-sold supply
    pub max_asset_out: u128,
    /// Numeraire the slugs hold at the starting price, at most net proceeds
    pub max_numeraire_out: u128,
}

impl TradeLimit {
    pub fn allows(&self, receipt: &TradeReceipt) -> bool {
        match receipt.side {
            TradeSide::Buy => receipt.amount_out <= self.max_asset_out,
            TradeSide::Sell => receipt.amount_out <= self.max_numeraire_out,
        }
    }
}

// ============================================================================
// Epoch State
// ============================================================================

/// Progress and accounting of one auction
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct EpochState {
    /// Current epoch; advances by exactly one per crossed boundary
    pub epoch: u64,
    /// Anchor the slugs of the current epoch were placed around
    pub anchor_tick: i32,
    /// Last pool tick reported to the engine
    pub last_tick: i32,
    /// Cumulative asset bought from the engine; never exceeds the supply
    pub tokens_sold: u128,
    /// Gross asset sold back into the engine
    pub tokens_returned: u128,
    /// Gross numeraire received, fees excluded
    pub proceeds: u128,
    /// Gross numeraire paid out on sell-backs
    pub proceeds_refunded: u128,
    pub drift: DriftAccumulator,
    /// Fees earned by the active slugs, collected on withdrawal
    pub fees_pending: TokenAmounts,
    pub fees_collected: TokenAmounts,
}

impl EpochState {
    pub fn new(config: &AuctionConfig) -> Self {
        Self {
            epoch: 0,
            anchor_tick: config.start_tick,
            last_tick: config.start_tick,
            tokens_sold: 0,
            tokens_returned: 0,
            proceeds: 0,
            proceeds_refunded: 0,
            drift: DriftAccumulator::new(config.min_drift, config.max_drift),
            fees_pending: TokenAmounts::ZERO,
            fees_collected: TokenAmounts::ZERO,
        }
    }

    /// Asset currently held by traders
    pub fn net_sold(&self) -> u128 {
        self.tokens_sold.saturating_sub(self.tokens_returned)
    }

    /// Numeraire currently held by the engine
    pub fn net_proceeds(&self) -> u128 {
        self.proceeds.saturating_sub(self.proceeds_refunded)
    }

    /// Book an executed trade against the auction totals. Leaves the state
    /// untouched on error.
    pub fn record_trade(&mut self, receipt: &TradeReceipt, total_tokens: u128) -> AuctionResult<()> {
        let mut next = self.clone();
        let net_in = safe_sub_u128(receipt.amount_in, receipt.fee)?;
        match receipt.side {
            TradeSide::Buy => {
                next.tokens_sold = safe_add_proceeds(next.tokens_sold, receipt.amount_out)?;
                next.proceeds = safe_add_proceeds(next.proceeds, net_in)?;
                next.fees_pending.numeraire = safe_add_proceeds(next.fees_pending.numeraire, receipt.fee)?;
            }
            TradeSide::Sell => {
                next.tokens_returned = safe_add_proceeds(next.tokens_returned, net_in)?;
                next.proceeds_refunded = safe_add_proceeds(next.proceeds_refunded, receipt.amount_out)?;
                next.fees_pending.asset = safe_add_proceeds(next.fees_pending.asset, receipt.fee)?;
            }
        }

        if next.tokens_sold > total_tokens
            || next.tokens_returned > next.tokens_sold
            || next.proceeds_refunded > next.proceeds
        {
            return Err(AuctionError::LiquidityUnderflow);
        }
        *self = next;
        Ok(())
    }

    /// Move pending fees into the collected totals; returns what moved
    pub fn collect_fees(&mut self) -> AuctionResult<TokenAmounts> {
        let pending = std::mem::take(&mut self.fees_pending);
        self.fees_collected = self.fees_collected.checked_add(pending)?;
        Ok(pending)
    }

    /// Zero the proceeds once the migrator has taken custody of them
    pub fn clear_proceeds(&mut self) {
        self.proceeds = 0;
        self.proceeds_refunded = 0;
    }
}

// ============================================================================
// Auction State
// ============================================================================

/// Everything a callback may mutate, cloned as one unit of work
#[derive(Debug, Clone)]
pub struct AuctionState {
    pub gate: LifecycleGate,
    pub epoch: EpochState,
    pub slugs: SlugSet,
    pub reentrancy: ReentrancyStatus,
    /// Limit handed out for the trade currently open
    pub open_limit: Option<TradeLimit>,
    /// Events not yet drained by the caller
    pub events: Vec<AuctionEvent>,
}

impl AuctionState {
    pub fn new(config: &AuctionConfig) -> Self {
        Self {
            gate: LifecycleGate::default(),
            epoch: EpochState::new(config),
            slugs: SlugSet::default(),
            reentrancy: ReentrancyStatus::default(),
            open_limit: None,
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: AuctionEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buy(amount_in: u128, amount_out: u128, fee: u128) -> TradeReceipt {
        TradeReceipt {
            side: TradeSide::Buy,
            amount_in,
            amount_out,
            fee,
        }
    }

    fn sell(amount_in: u128, amount_out: u128, fee: u128) -> TradeReceipt {
        TradeReceipt {
            side: TradeSide::Sell,
            amount_in,
            amount_out,
            fee,
        }
    }

    #[test]
    fn test_buy_and_sell_bookkeeping() {
        let config = AuctionConfig::default();
        let mut state = EpochState::new(&config);

        state.record_trade(&buy(1_010, 5_000, 10), config.total_tokens).unwrap();
        assert_eq!(state.tokens_sold, 5_000);
        assert_eq!(state.proceeds, 1_000);
        assert_eq!(state.fees_pending.numeraire, 10);

        state.record_trade(&sell(2_002, 300, 2), config.total_tokens).unwrap();
        assert_eq!(state.tokens_returned, 2_000);
        assert_eq!(state.proceeds_refunded, 300);
        assert_eq!(state.net_sold(), 3_000);
        assert_eq!(state.net_proceeds(), 700);
        assert_eq!(state.fees_pending.asset, 2);

        // Gross counters only grow
        assert_eq!(state.tokens_sold, 5_000);
        assert_eq!(state.proceeds, 1_000);
    }

    #[test]
    fn test_bookkeeping_bounds() {
        let config = AuctionConfig {
            total_tokens: 1_000,
            ..AuctionConfig::default()
        };

        let mut state = EpochState::new(&config);
        assert_eq!(
            state.record_trade(&buy(10, 1_001, 0), config.total_tokens),
            Err(AuctionError::LiquidityUnderflow)
        );

        let mut state = EpochState::new(&config);
        state.record_trade(&buy(10, 100, 0), config.total_tokens).unwrap();
        assert_eq!(
            state.record_trade(&sell(101, 1, 0), config.total_tokens),
            Err(AuctionError::LiquidityUnderflow)
        );
        assert_eq!(
            state.record_trade(&sell(1, 11, 0), config.total_tokens),
            Err(AuctionError::LiquidityUnderflow)
        );
        assert_eq!(
            state.record_trade(&buy(1, 0, 2), config.total_tokens),
            Err(AuctionError::LiquidityUnderflow)
        );
        // Rejected trades leave no trace
        assert_eq!(state.tokens_returned, 0);
        assert_eq!(state.net_sold(), 100);

        // Sold-back tokens do not make room for more sales
        let mut state = EpochState::new(&config);
        state.record_trade(&buy(10, 1_000, 0), config.total_tokens).unwrap();
        state.record_trade(&sell(1_000, 10, 0), config.total_tokens).unwrap();
        assert_eq!(state.net_sold(), 0);
        assert_eq!(
            state.record_trade(&buy(10, 1, 0), config.total_tokens),
            Err(AuctionError::LiquidityUnderflow)
        );
        assert_eq!(state.tokens_sold, 1_000);

        let mut state = EpochState::new(&config);
        state.proceeds = u128::MAX;
        assert_eq!(
            state.record_trade(&buy(1, 0, 0), config.total_tokens),
            Err(AuctionError::ProceedsOverflow)
        );
    }

    #[test]
    fn test_fee_collection() {
        let config = AuctionConfig::default();
        let mut state = EpochState::new(&config);
        state.record_trade(&buy(110, 50, 10), config.total_tokens).unwrap();
        let moved = state.collect_fees().unwrap();
        assert_eq!(moved.numeraire, 10);
        assert!(state.fees_pending.is_zero());
        assert_eq!(state.fees_collected.numeraire, 10);
        assert_eq!(state.net_proceeds(), 100);

        state.clear_proceeds();
        assert_eq!(state.net_proceeds(), 0);
        assert_eq!(state.tokens_sold, 50);
    }

    #[test]
    fn test_trade_limit() {
        let limit = TradeLimit {
            max_asset_out: 100,
            max_numeraire_out: 5,
        };
        assert!(limit.allows(&buy(1, 100, 0)));
        assert!(!limit.allows(&buy(1, 101, 0)));
        assert!(limit.allows(&sell(1, 5, 0)));
        assert!(!limit.allows(&sell(1, 6, 0)));
    }
}
