//! # Rebalance Controller
//!
//! The pool invokes a [`PoolHook`] around every trade. [`AuctionEngine`] is
//! the hook for one auctioned asset: it advances epochs, measures drift,
//! repositions the slugs through the [`SlugManager`], books trades and drives
//! the [`LifecycleGate`](crate::lifecycle::LifecycleGate).
//!
//! Atomicity
//! ---------
//! Every call works on a scratch copy of the auction state and commits it
//! only if the whole call succeeds, so a failed call leaves state and event
//! buffer exactly as they were. The pool must then reject the surrounding
//! trade.
//!
//! Trade bracket
//! -------------
//! `on_before_trade` opens a trade, `on_after_trade` books and closes it and
//! `on_trade_aborted` closes it without bookkeeping. A second
//! `on_before_trade` inside an open trade fails with `ReentrantCall`.

use crate::config::AuctionConfig;
use crate::errors::{AuctionError, AuctionResult};
use crate::events::AuctionEvent;
use crate::lifecycle::{LifecycleStatus, Snapshot};
use crate::math::tick_math::{check_tick, tick_to_sqrt_price, Rounding};
use crate::reentrancy::ReentrancyGuard;
use crate::schedule::{AuctionSchedule, DecayCurve};
use crate::slugs::{BoundsPolicy, DriftShift, RebalancePlan, SlugInputs, SlugLayout, SlugManager, SlugSet};
use crate::state::{AuctionState, EpochState, TradeLimit, TradeReceipt};
use crate::types::{Address, Authorities};

// ============================================================================
// Hook Interface
// ============================================================================

/// Callbacks the pool's execution environment invokes
pub trait PoolHook {
    /// Pool created: seed the epoch 0 slugs
    fn on_initialize(&mut self, caller: &Address) -> AuctionResult<RebalancePlan>;

    /// Before a trade executes at `current_tick`, `elapsed` seconds after start
    fn on_before_trade(&mut self, caller: &Address, current_tick: i32, elapsed: i64) -> AuctionResult<BeforeTrade>;

    /// After the trade executed and moved the pool to `realized_tick`
    fn on_after_trade(
        &mut self,
        caller: &Address,
        realized_tick: i32,
        receipt: &TradeReceipt,
        elapsed: i64,
    ) -> AuctionResult<()>;

    /// The pool rejected the trade opened by `on_before_trade`
    fn on_trade_aborted(&mut self, caller: &Address) -> AuctionResult<()>;
}

/// Outcome of `on_before_trade`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeforeTrade {
    /// Execute the trade within `limit`, after applying `rebalance` if present
    Proceed {
        limit: TradeLimit,
        rebalance: Option<RebalancePlan>,
    },
    /// The auction just ended; the trade must not execute
    Finalized(Finalization),
}

/// A terminal transition: the outcome and the slug teardown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalization {
    pub snapshot: Snapshot,
    /// Withdraws every slug; deposits nothing
    pub teardown: RebalancePlan,
}

// ============================================================================
// Auction Engine
// ============================================================================

/// Auction controller for one asset
#[derive(Debug)]
pub struct AuctionEngine {
    config: AuctionConfig,
    authorities: Authorities,
    schedule: AuctionSchedule,
    policy: Box<dyn BoundsPolicy>,
    state: AuctionState,
}

impl AuctionEngine {
    /// Validate `config` and build an uninitialized engine
    pub fn new(config: AuctionConfig, authorities: Authorities) -> AuctionResult<Self> {
        config.validate()?;
        let schedule = AuctionSchedule::new(&config);
        let policy = Box::new(DriftShift::new(config.drift_follow_bps));
        let state = AuctionState::new(&config);
        Ok(Self {
            config,
            authorities,
            schedule,
            policy,
            state,
        })
    }

    /// Replace the decay curve. Call before `on_initialize`.
    pub fn with_curve(mut self, curve: Box<dyn DecayCurve>) -> Self {
        self.schedule = AuctionSchedule::with_curve(&self.config, curve);
        self
    }

    /// Replace the slug bounds policy. Call before `on_initialize`.
    pub fn with_bounds_policy(mut self, policy: Box<dyn BoundsPolicy>) -> Self {
        self.policy = policy;
        self
    }

    // ------------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------------

    pub fn status(&self) -> LifecycleStatus {
        self.state.gate.status()
    }

    pub fn current_epoch(&self) -> u64 {
        self.state.epoch.epoch
    }

    pub fn accumulated_drift(&self) -> i32 {
        self.state.epoch.drift.value()
    }

    pub fn active_slugs(&self) -> &SlugSet {
        &self.state.slugs
    }

    pub fn epoch_state(&self) -> &EpochState {
        &self.state.epoch
    }

    /// Outcome of a finished auction; `None` while it is running
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.state.gate.snapshot()
    }

    pub fn is_migrated(&self) -> bool {
        self.state.gate.is_migrated()
    }

    pub fn is_trade_open(&self) -> bool {
        ReentrancyGuard::is_locked(&self.state.reentrancy)
    }

    pub fn config(&self) -> &AuctionConfig {
        &self.config
    }

    pub fn authorities(&self) -> &Authorities {
        &self.authorities
    }

    /// Schedule tick at `elapsed`
    pub fn expected_tick(&self, elapsed: i64) -> AuctionResult<i32> {
        self.schedule.expected_tick(elapsed)
    }

    /// Take every event emitted by committed calls, oldest first
    pub fn drain_events(&mut self) -> Vec<AuctionEvent> {
        std::mem::take(&mut self.state.events)
    }

    // ------------------------------------------------------------------------
    // Migrator Surface
    // ------------------------------------------------------------------------

    /// Run the end-of-auction check without a trade
    ///
    /// Returns `None` while the auction is still running.
    pub fn settle(&mut self, caller: &Address, elapsed: i64) -> AuctionResult<Option<Finalization>> {
        let result = self.try_settle(caller, elapsed);
        rejected("settle", result)
    }

    fn try_settle(&mut self, caller: &Address, elapsed: i64) -> AuctionResult<Option<Finalization>> {
        if *caller != self.authorities.pool_manager && *caller != self.authorities.migrator {
            return Err(AuctionError::NotMigrator);
        }
        self.ensure_trading()?;
        ReentrancyGuard::ensure_unlocked(&self.state.reentrancy)?;
        if elapsed < 0 {
            return Err(AuctionError::AuctionNotStarted);
        }

        let Some(outcome) = self.terminal_status(&self.state.epoch, elapsed) else {
            log::debug!("settle at {}s: auction still running", elapsed);
            return Ok(None);
        };

        let mut scratch = self.state.clone();
        let finalization = self.teardown(&mut scratch, outcome, elapsed)?;
        self.state = scratch;
        Ok(Some(finalization))
    }

    /// Consume the snapshot of a finished auction, exactly once
    pub fn finalize(&mut self, caller: &Address) -> AuctionResult<Snapshot> {
        let result = self.try_finalize(caller);
        rejected("finalize", result)
    }

    fn try_finalize(&mut self, caller: &Address) -> AuctionResult<Snapshot> {
        if *caller != self.authorities.migrator {
            return Err(AuctionError::NotMigrator);
        }

        let mut scratch = self.state.clone();
        let snapshot = scratch.gate.finalize()?;
        scratch.epoch.clear_proceeds();
        scratch.emit(AuctionEvent::Migrated {
            success: snapshot.success,
        });
        self.state = scratch;

        log::info!(
            "Auction migrated: success={}, proceeds={}, sold={}",
            snapshot.success,
            snapshot.total_proceeds,
            snapshot.total_sold
        );
        Ok(snapshot)
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn authorize_pool(&self, caller: &Address) -> AuctionResult<()> {
        if *caller != self.authorities.pool_manager {
            return Err(AuctionError::NotPoolManager);
        }
        Ok(())
    }

    fn ensure_trading(&self) -> AuctionResult<()> {
        match self.status() {
            LifecycleStatus::Uninitialized => Err(AuctionError::NotInitialized),
            LifecycleStatus::Graduated | LifecycleStatus::Exited => Err(AuctionError::AuctionAlreadyFinalized),
            LifecycleStatus::Initialized | LifecycleStatus::Locked => Ok(()),
        }
    }

    fn slug_manager(&self) -> SlugManager<'_> {
        SlugManager::new(&self.config, &self.schedule, self.policy.as_ref())
    }

    fn place(&self, epoch: &EpochState, expected_tick: i32) -> AuctionResult<SlugLayout> {
        self.slug_manager().compute(&SlugInputs {
            epoch: epoch.epoch,
            expected_tick,
            drift: epoch.drift.value(),
            tokens_sold: epoch.tokens_sold,
            net_sold: epoch.net_sold(),
            net_proceeds: epoch.net_proceeds(),
        })
    }

    fn terminal_status(&self, epoch: &EpochState, elapsed: i64) -> Option<LifecycleStatus> {
        let net_proceeds = epoch.net_proceeds();
        let expired = self.config.is_expired(elapsed);
        if net_proceeds >= self.config.min_proceeds && (expired || net_proceeds >= self.config.max_proceeds) {
            Some(LifecycleStatus::Graduated)
        } else if expired {
            Some(LifecycleStatus::Exited)
        } else {
            None
        }
    }

    /// Advance through every crossed epoch boundary, one epoch at a time
    fn catch_up(&self, scratch: &mut AuctionState, current_tick: i32, elapsed: i64) -> AuctionResult<Option<RebalancePlan>> {
        let target = self.schedule.epoch_at(elapsed)?;
        if target <= scratch.epoch.epoch {
            return Ok(None);
        }

        let withdraw = scratch.slugs.to_vec();
        let fees = scratch.epoch.collect_fees()?;

        // The pool has not moved since the last trade; every crossed boundary
        // sees the same realized tick
        while scratch.epoch.epoch < target {
            scratch.epoch.epoch += 1;
            let expected_tick = self.schedule.expected_tick(self.schedule.epoch_start(scratch.epoch.epoch))?;
            let drift = scratch.epoch.drift.accumulate(current_tick, expected_tick);

            let layout = self.place(&scratch.epoch, expected_tick)?;
            scratch.epoch.anchor_tick = layout.anchor;
            scratch.slugs = layout.slugs;

            log::info!(
                "Rebalanced into epoch {}: expected_tick={}, anchor={}, drift={}, slugs={}",
                scratch.epoch.epoch,
                expected_tick,
                layout.anchor,
                drift,
                scratch.slugs.len()
            );
            let event = AuctionEvent::Rebalanced {
                epoch: scratch.epoch.epoch,
                expected_tick,
                anchor_tick: layout.anchor,
                drift,
                slugs: scratch.slugs.to_vec(),
                net_sold: scratch.epoch.net_sold(),
                net_proceeds: scratch.epoch.net_proceeds(),
                fees_collected: scratch.epoch.fees_collected,
            };
            scratch.emit(event);
        }

        if !fees.is_zero() {
            log::debug!("Collected fees: asset={}, numeraire={}", fees.asset, fees.numeraire);
        }
        scratch.epoch.last_tick = scratch.epoch.anchor_tick;

        Ok(Some(RebalancePlan {
            withdraw,
            deposit: scratch.slugs.to_vec(),
            target_tick: scratch.epoch.anchor_tick,
        }))
    }

    /// Remove every slug and record the terminal outcome
    fn teardown(&self, scratch: &mut AuctionState, outcome: LifecycleStatus, elapsed: i64) -> AuctionResult<Finalization> {
        let withdraw = std::mem::take(&mut scratch.slugs).to_vec();
        scratch.epoch.collect_fees()?;

        let epoch = &scratch.epoch;
        let snapshot = Snapshot {
            final_tick: epoch.last_tick,
            total_proceeds: epoch.net_proceeds(),
            total_sold: epoch.net_sold(),
            success: outcome == LifecycleStatus::Graduated,
            epoch: epoch.epoch,
            ended_at: elapsed,
            fees_asset: epoch.fees_collected.asset,
            fees_numeraire: epoch.fees_collected.numeraire,
        };
        scratch.gate.conclude(outcome, snapshot)?;

        if snapshot.success {
            log::info!(
                "Auction graduated at epoch {}: proceeds={}, sold={}",
                snapshot.epoch,
                snapshot.total_proceeds,
                snapshot.total_sold
            );
            scratch.emit(AuctionEvent::Graduated(snapshot));
        } else {
            log::warn!(
                "Auction exited below minimum proceeds: proceeds={}, minimum={}",
                snapshot.total_proceeds,
                self.config.min_proceeds
            );
            scratch.emit(AuctionEvent::Exited(snapshot));
        }

        Ok(Finalization {
            snapshot,
            teardown: RebalancePlan {
                withdraw,
                deposit: Vec::new(),
                target_tick: snapshot.final_tick,
            },
        })
    }

    /// What the slugs hold at `tick`, capped at the never-sold supply and net proceeds
    fn trade_limit(&self, state: &AuctionState, tick: i32) -> AuctionResult<TradeLimit> {
        let reserves = state.slugs.reserves_at(tick_to_sqrt_price(tick)?, Rounding::Down)?;
        let unsold = self.config.total_tokens.saturating_sub(state.epoch.tokens_sold);
        Ok(TradeLimit {
            max_asset_out: reserves.asset.min(unsold),
            max_numeraire_out: reserves.numeraire.min(state.epoch.net_proceeds()),
        })
    }

    fn try_initialize(&mut self, caller: &Address) -> AuctionResult<RebalancePlan> {
        self.authorize_pool(caller)?;

        let mut scratch = self.state.clone();
        scratch.gate.advance(LifecycleStatus::Initialized)?;

        let expected_tick = self.schedule.expected_tick(0)?;
        let layout = self.place(&scratch.epoch, expected_tick)?;
        scratch.epoch.anchor_tick = layout.anchor;
        scratch.epoch.last_tick = layout.anchor;
        scratch.slugs = layout.slugs;
        scratch.emit(AuctionEvent::Initialized {
            anchor_tick: layout.anchor,
            slugs: scratch.slugs.to_vec(),
        });

        let plan = RebalancePlan {
            withdraw: Vec::new(),
            deposit: scratch.slugs.to_vec(),
            target_tick: layout.anchor,
        };
        self.state = scratch;

        log::info!(
            "Auction initialized: anchor={}, epochs={}, slugs={}",
            plan.target_tick,
            self.schedule.num_epochs(),
            plan.deposit.len()
        );
        Ok(plan)
    }

    fn try_before_trade(&mut self, caller: &Address, current_tick: i32, elapsed: i64) -> AuctionResult<BeforeTrade> {
        self.authorize_pool(caller)?;
        check_tick(current_tick)?;
        self.ensure_trading()?;
        ReentrancyGuard::ensure_unlocked(&self.state.reentrancy)?;
        if elapsed < 0 {
            return Err(AuctionError::AuctionNotStarted);
        }

        let mut scratch = self.state.clone();
        if scratch.gate.status() == LifecycleStatus::Initialized {
            scratch.gate.advance(LifecycleStatus::Locked)?;
            scratch.emit(AuctionEvent::Locked {
                epoch: scratch.epoch.epoch,
                tick: current_tick,
            });
            log::info!("Auction locked at tick {} ({}s after start)", current_tick, elapsed);
        }
        scratch.epoch.last_tick = current_tick;

        if let Some(outcome) = self.terminal_status(&scratch.epoch, elapsed) {
            let finalization = self.teardown(&mut scratch, outcome, elapsed)?;
            self.state = scratch;
            return Ok(BeforeTrade::Finalized(finalization));
        }

        let rebalance = self.catch_up(&mut scratch, current_tick, elapsed)?;
        // A rebalance moves the pool to the new anchor before the trade
        let start_tick = rebalance.as_ref().map_or(current_tick, |plan| plan.target_tick);
        let limit = self.trade_limit(&scratch, start_tick)?;
        ReentrancyGuard::acquire(&mut scratch.reentrancy)?;
        scratch.open_limit = Some(limit);
        self.state = scratch;

        Ok(BeforeTrade::Proceed { limit, rebalance })
    }

    fn try_after_trade(
        &mut self,
        caller: &Address,
        realized_tick: i32,
        receipt: &TradeReceipt,
        elapsed: i64,
    ) -> AuctionResult<()> {
        self.authorize_pool(caller)?;
        check_tick(realized_tick)?;
        self.ensure_trading()?;
        if !ReentrancyGuard::is_locked(&self.state.reentrancy) {
            return Err(AuctionError::TradeNotOpen);
        }
        if elapsed < 0 {
            return Err(AuctionError::AuctionNotStarted);
        }

        let mut scratch = self.state.clone();
        let limit = scratch.open_limit.take().ok_or(AuctionError::TradeNotOpen)?;
        if !limit.allows(receipt) {
            return Err(AuctionError::LiquidityUnderflow);
        }
        scratch.epoch.record_trade(receipt, self.config.total_tokens)?;
        scratch.epoch.last_tick = realized_tick;
        ReentrancyGuard::release(&mut scratch.reentrancy)?;
        self.state = scratch;

        log::debug!(
            "Booked {:?}: in={}, out={}, fee={}, tick={}, net_sold={}, net_proceeds={}",
            receipt.side,
            receipt.amount_in,
            receipt.amount_out,
            receipt.fee,
            realized_tick,
            self.state.epoch.net_sold(),
            self.state.epoch.net_proceeds()
        );
        Ok(())
    }

    fn try_trade_aborted(&mut self, caller: &Address) -> AuctionResult<()> {
        self.authorize_pool(caller)?;
        let mut scratch = self.state.clone();
        ReentrancyGuard::release(&mut scratch.reentrancy)?;
        scratch.open_limit = None;
        self.state = scratch;
        log::debug!("Open trade aborted by the pool");
        Ok(())
    }
}

impl PoolHook for AuctionEngine {
    fn on_initialize(&mut self, caller: &Address) -> AuctionResult<RebalancePlan> {
        let result = self.try_initialize(caller);
        rejected("on_initialize", result)
    }

    fn on_before_trade(&mut self, caller: &Address, current_tick: i32, elapsed: i64) -> AuctionResult<BeforeTrade> {
        let result = self.try_before_trade(caller, current_tick, elapsed);
        rejected("on_before_trade", result)
    }

    fn on_after_trade(
        &mut self,
        caller: &Address,
        realized_tick: i32,
        receipt: &TradeReceipt,
        elapsed: i64,
    ) -> AuctionResult<()> {
        let result = self.try_after_trade(caller, realized_tick, receipt, elapsed);
        rejected("on_after_trade", result)
    }

    fn on_trade_aborted(&mut self, caller: &Address) -> AuctionResult<()> {
        let result = self.try_trade_aborted(caller);
        rejected("on_trade_aborted", result)
    }
}

fn rejected<T>(operation: &str, result: AuctionResult<T>) -> AuctionResult<T> {
    if let Err(err) = &result {
        log::warn!("{} rejected: {} ({:?})", operation, err, err.kind());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TradeSide;

    const POOL: Address = Address::from_tag(1);
    const MIGRATOR: Address = Address::from_tag(2);
    const ETH: u128 = 1_000_000_000_000_000_000;

    fn engine() -> AuctionEngine {
        let authorities = Authorities {
            pool_manager: POOL,
            migrator: MIGRATOR,
        };
        let mut engine = AuctionEngine::new(AuctionConfig::default(), authorities).unwrap();
        engine.on_initialize(&POOL).unwrap();
        engine
    }

    fn buy(amount_in: u128, amount_out: u128) -> TradeReceipt {
        TradeReceipt {
            side: TradeSide::Buy,
            amount_in,
            amount_out,
            fee: 0,
        }
    }

    fn proceed(outcome: BeforeTrade) -> (TradeLimit, Option<RebalancePlan>) {
        match outcome {
            BeforeTrade::Proceed { limit, rebalance } => (limit, rebalance),
            BeforeTrade::Finalized(f) => panic!("unexpected finalization: {:?}", f),
        }
    }

    #[test]
    fn test_initialize_seeds_epoch_zero() {
        let mut engine = engine();
        assert_eq!(engine.status(), LifecycleStatus::Initialized);
        assert_eq!(engine.current_epoch(), 0);
        assert!(engine.active_slugs().upper.is_some());
        assert!(matches!(engine.drain_events().as_slice(), [AuctionEvent::Initialized { .. }]));
        assert_eq!(engine.on_initialize(&POOL), Err(AuctionError::AlreadyInitialized));
    }

    #[test]
    fn test_authorization_is_checked_first() {
        let mut engine = engine();
        let stranger = Address::from_tag(9);
        assert_eq!(engine.on_before_trade(&stranger, 0, 0), Err(AuctionError::NotPoolManager));
        assert_eq!(engine.on_after_trade(&stranger, 0, &buy(1, 1), 0), Err(AuctionError::NotPoolManager));
        assert_eq!(engine.finalize(&POOL), Err(AuctionError::NotMigrator));
        assert_eq!(engine.settle(&stranger, 0), Err(AuctionError::NotMigrator));
        // Even an invalid tick is reported as an authorization failure
        assert_eq!(engine.on_before_trade(&stranger, i32::MAX, -1), Err(AuctionError::NotPoolManager));
    }

    #[test]
    fn test_trade_bracket() {
        let mut engine = engine();
        assert_eq!(engine.on_after_trade(&POOL, 0, &buy(1, 1), 0), Err(AuctionError::TradeNotOpen));

        let (limit, rebalance) = proceed(engine.on_before_trade(&POOL, 0, 10).unwrap());
        assert!(rebalance.is_none());
        assert!(limit.max_asset_out > 0);
        assert_eq!(limit.max_numeraire_out, 0);
        assert_eq!(engine.status(), LifecycleStatus::Locked);
        assert!(engine.is_trade_open());

        assert_eq!(engine.on_before_trade(&POOL, 0, 10), Err(AuctionError::ReentrantCall));
        assert_eq!(engine.settle(&MIGRATOR, 10), Err(AuctionError::ReentrantCall));

        engine.on_trade_aborted(&POOL).unwrap();
        assert!(!engine.is_trade_open());
        assert_eq!(engine.on_trade_aborted(&POOL), Err(AuctionError::TradeNotOpen));
        assert_eq!(engine.epoch_state().tokens_sold, 0);
    }

    #[test]
    fn test_trade_beyond_limit_is_rejected() {
        let mut engine = engine();
        let (limit, _) = proceed(engine.on_before_trade(&POOL, 0, 10).unwrap());
        let greedy = buy(ETH, limit.max_asset_out + 1);
        assert_eq!(engine.on_after_trade(&POOL, 10, &greedy, 10), Err(AuctionError::LiquidityUnderflow));
        // The trade stays open and nothing was booked
        assert!(engine.is_trade_open());
        assert_eq!(engine.epoch_state().tokens_sold, 0);
        engine.on_after_trade(&POOL, 10, &buy(ETH, limit.max_asset_out), 10).unwrap();
        assert_eq!(engine.epoch_state().tokens_sold, limit.max_asset_out);
    }

    #[test]
    fn test_catch_up_measures_every_boundary_against_schedule() {
        let mut engine = engine();
        proceed(engine.on_before_trade(&POOL, 0, 10).unwrap());
        engine.on_after_trade(&POOL, 0, &buy(ETH, 1_000), 10).unwrap();
        engine.drain_events();

        // Three boundaries crossed while the pool stayed at tick 0
        let (_, rebalance) = proceed(engine.on_before_trade(&POOL, 0, 3 * 1800 + 5).unwrap());
        let plan = rebalance.unwrap();
        assert_eq!(engine.current_epoch(), 3);
        assert_eq!(plan.target_tick, engine.epoch_state().anchor_tick);
        assert!(!plan.withdraw.is_empty());

        let first = -engine.expected_tick(1800).unwrap();
        assert_eq!(first, 16_666);
        let drifts: Vec<i32> = engine
            .drain_events()
            .into_iter()
            .filter_map(|event| match event {
                AuctionEvent::Rebalanced { drift, .. } => Some(drift),
                _ => None,
            })
            .collect();
        // 0 - (-16666), then saturated at max_drift
        assert_eq!(drifts, vec![first, 20_000, 20_000]);
        assert_eq!(engine.accumulated_drift(), engine.config().max_drift);
    }

    #[test]
    fn test_drift_measured_against_schedule() {
        let mut engine = engine();
        proceed(engine.on_before_trade(&POOL, 0, 10).unwrap());
        engine.on_after_trade(&POOL, 400, &buy(ETH, 1_000), 10).unwrap();

        // Pool sits at tick 400 at the first boundary, schedule says -16666
        proceed(engine.on_before_trade(&POOL, 400, 1800).unwrap());
        assert_eq!(engine.current_epoch(), 1);
        assert_eq!(engine.accumulated_drift(), 400 - engine.expected_tick(1800).unwrap());
        assert_eq!(engine.accumulated_drift(), 17_066);
        // Anchor follows drift fully: -16666 + 17066
        assert_eq!(engine.epoch_state().anchor_tick, 400);
    }

    #[test]
    fn test_price_below_schedule_drifts_negative() {
        let mut engine = engine();
        proceed(engine.on_before_trade(&POOL, 0, 10).unwrap());
        engine.on_after_trade(&POOL, -17_000, &buy(ETH, 1_000), 10).unwrap();

        proceed(engine.on_before_trade(&POOL, -17_000, 1800).unwrap());
        assert_eq!(engine.accumulated_drift(), -334);
        // Anchor -17000 aligned up; lower slug widened by the shift
        assert_eq!(engine.epoch_state().anchor_tick, -17_000);
        let lower = engine.active_slugs().lower.unwrap();
        assert_eq!(lower.tick_upper, -17_000);
        assert_eq!(lower.tick_upper - lower.tick_lower, 800 + 336);
    }

    #[test]
    fn test_sell_backs_do_not_reopen_supply() {
        let mut engine = engine();
        let total = engine.config().total_tokens;
        let mut sold = 0;

        for round in 0..3 {
            let elapsed = 10 + 2 * round;
            let (limit, _) = proceed(engine.on_before_trade(&POOL, 0, elapsed).unwrap());
            assert!(limit.max_asset_out <= total - engine.epoch_state().tokens_sold);
            engine.on_after_trade(&POOL, 0, &buy(ETH, limit.max_asset_out), elapsed).unwrap();
            assert!(engine.epoch_state().tokens_sold >= sold);
            sold = engine.epoch_state().tokens_sold;

            // Everything bought goes straight back
            let sell_back = TradeReceipt {
                side: TradeSide::Sell,
                amount_in: engine.epoch_state().net_sold(),
                amount_out: 0,
                fee: 0,
            };
            proceed(engine.on_before_trade(&POOL, 0, elapsed + 1).unwrap());
            engine.on_after_trade(&POOL, 0, &sell_back, elapsed + 1).unwrap();
            assert_eq!(engine.epoch_state().net_sold(), 0);
        }

        assert_eq!(engine.epoch_state().tokens_sold, total);
        let (limit, _) = proceed(engine.on_before_trade(&POOL, 0, 20).unwrap());
        assert_eq!(limit.max_asset_out, 0);
        assert_eq!(engine.on_after_trade(&POOL, 0, &buy(ETH, 1), 20), Err(AuctionError::LiquidityUnderflow));
    }

    #[test]
    fn test_failed_call_commits_nothing() {
        let mut engine = engine();
        engine.drain_events();
        proceed(engine.on_before_trade(&POOL, 0, 10).unwrap());
        let before = engine.epoch_state().clone();
        let oversold = buy(ETH, engine.config().total_tokens + 1);
        assert!(engine.on_after_trade(&POOL, 0, &oversold, 10).is_err());
        assert_eq!(engine.epoch_state(), &before);
        assert_eq!(engine.drain_events().len(), 1); // only the lock
    }

    #[test]
    fn test_settle_exits_untraded_auction() {
        let mut engine = engine();
        assert_eq!(engine.settle(&MIGRATOR, 100).unwrap(), None);
        let finalization = engine.settle(&MIGRATOR, 6 * 3600).unwrap().unwrap();
        assert!(!finalization.snapshot.success);
        assert_eq!(engine.status(), LifecycleStatus::Exited);
        assert!(engine.active_slugs().is_empty());
        assert!(!finalization.teardown.withdraw.is_empty());
        assert_eq!(engine.settle(&MIGRATOR, 6 * 3600), Err(AuctionError::AuctionAlreadyFinalized));
        assert_eq!(engine.on_before_trade(&POOL, 0, 6 * 3600), Err(AuctionError::AuctionAlreadyFinalized));
    }

    #[test]
    fn test_not_started() {
        let mut engine = engine();
        assert_eq!(engine.on_before_trade(&POOL, 0, -1), Err(AuctionError::AuctionNotStarted));
        assert_eq!(engine.status(), LifecycleStatus::Initialized);
    }

    #[test]
    fn test_uninitialized_engine_rejects_trades() {
        let authorities = Authorities {
            pool_manager: POOL,
            migrator: MIGRATOR,
        };
        let mut engine = AuctionEngine::new(AuctionConfig::default(), authorities).unwrap();
        assert_eq!(engine.on_before_trade(&POOL, 0, 0), Err(AuctionError::NotInitialized));
        assert_eq!(engine.finalize(&MIGRATOR), Err(AuctionError::NotFinalized));
    }
}
