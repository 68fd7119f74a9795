//! Replays a scripted trade sequence against the engine through the
//! in-memory pool, then settles and finalizes the auction.

use feels_auction::{
    Address, AuctionEngine, AuctionEvent, Authorities, BeforeTrade, PoolHook, Slug, Snapshot, TradeSide,
};
use serde::Serialize;

use crate::config::{ScriptedTrade, SimConfig};
use crate::error::{SimError, SimResult};
use crate::pool::{Quote, SimPool};

pub const POOL_MANAGER: Address = Address::from_tag(1);
pub const MIGRATOR: Address = Address::from_tag(2);

/// What happened to one scripted trade
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TradeOutcome {
    /// Executed and booked by the engine
    Filled { at: i64, epoch: u64, quote: Quote },
    /// Nothing to trade against, or the engine refused the amounts
    Skipped { at: i64, reason: String },
    /// The auction had already ended
    AuctionEnded { at: i64 },
}

/// One entry of the slug dump
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlugRecord {
    pub epoch: u64,
    pub slug_name: &'static str,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
}

impl SlugRecord {
    fn new(epoch: u64, slug: &Slug) -> Self {
        Self {
            epoch,
            slug_name: slug.role.name(),
            tick_lower: slug.tick_lower,
            tick_upper: slug.tick_upper,
            liquidity: slug.liquidity,
        }
    }
}

/// Slug layouts of every epoch, in the shape the plotting tools read
#[derive(Debug, Clone, Default, Serialize)]
pub struct SlugDump {
    pub data: Vec<SlugRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub snapshot: Snapshot,
    pub trades: Vec<TradeOutcome>,
    pub events: Vec<AuctionEvent>,
}

impl SimReport {
    pub fn slug_dump(&self) -> SlugDump {
        let mut dump = SlugDump::default();
        for event in &self.events {
            let (epoch, slugs) = match event {
                AuctionEvent::Initialized { slugs, .. } => (0, slugs),
                AuctionEvent::Rebalanced { epoch, slugs, .. } => (*epoch, slugs),
                _ => continue,
            };
            dump.data.extend(slugs.iter().map(|slug| SlugRecord::new(epoch, slug)));
        }
        dump
    }
}

pub struct Simulation {
    engine: AuctionEngine,
    pool: SimPool,
    fee_bps: u16,
    events: Vec<AuctionEvent>,
}

impl Simulation {
    /// Build the engine and seed the pool with the epoch 0 slugs
    pub fn new(config: &SimConfig) -> SimResult<Self> {
        let authorities = Authorities {
            pool_manager: POOL_MANAGER,
            migrator: MIGRATOR,
        };
        let mut engine = AuctionEngine::new(config.auction.clone(), authorities)?;
        let mut pool = SimPool::new(config.auction.start_tick)?;
        let plan = engine.on_initialize(&POOL_MANAGER)?;
        pool.apply(&plan)?;

        Ok(Self {
            engine,
            pool,
            fee_bps: config.fee_bps,
            events: Vec::new(),
        })
    }

    pub fn engine(&self) -> &AuctionEngine {
        &self.engine
    }

    pub fn pool(&self) -> &SimPool {
        &self.pool
    }

    /// Run one scripted trade through the hook bracket
    pub fn step(&mut self, trade: &ScriptedTrade) -> SimResult<TradeOutcome> {
        let at = trade.at;
        if self.engine.status().is_terminal() {
            return Ok(TradeOutcome::AuctionEnded { at });
        }

        let limit = match self.engine.on_before_trade(&POOL_MANAGER, self.pool.tick()?, at)? {
            BeforeTrade::Finalized(finalization) => {
                self.pool.apply(&finalization.teardown)?;
                self.collect_events();
                return Ok(TradeOutcome::AuctionEnded { at });
            }
            BeforeTrade::Proceed { limit, rebalance } => {
                if let Some(plan) = rebalance {
                    self.pool.apply(&plan)?;
                }
                limit
            }
        };

        // Traders cannot sell back more than they bought
        let amount = match trade.side {
            TradeSide::Buy => trade.amount,
            TradeSide::Sell => trade.amount.min(self.engine.epoch_state().net_sold()),
        };
        let priced = self
            .pool
            .quote(trade.side, amount, self.fee_bps)
            .and_then(|quote| Ok((quote, quote.receipt()?)));
        let (quote, receipt) = match priced {
            Ok(priced) => priced,
            Err(err) => {
                // Close the bracket so the engine stays usable
                self.engine.on_trade_aborted(&POOL_MANAGER)?;
                return Err(err);
            }
        };
        if quote.amount_out == 0 || !limit.allows(&receipt) {
            self.engine.on_trade_aborted(&POOL_MANAGER)?;
            self.collect_events();
            let reason = if quote.amount_out == 0 {
                "no liquidity on this side".to_string()
            } else {
                format!("output {} exceeds engine limit", quote.amount_out)
            };
            log::warn!("Trade at {}s skipped: {}", at, reason);
            return Ok(TradeOutcome::Skipped { at, reason });
        }

        self.engine.on_after_trade(&POOL_MANAGER, quote.tick, &receipt, at)?;
        self.pool.commit(&quote);
        self.collect_events();

        log::info!(
            "{:?} at {}s: in={}, out={}, tick={}",
            trade.side,
            at,
            receipt.amount_in,
            receipt.amount_out,
            quote.tick
        );
        Ok(TradeOutcome::Filled {
            at,
            epoch: self.engine.current_epoch(),
            quote,
        })
    }

    /// Settle at `end` if still running, then hand the snapshot to the migrator
    pub fn finish(&mut self, end: i64) -> SimResult<Snapshot> {
        if !self.engine.status().is_terminal() {
            let finalization = self
                .engine
                .settle(&MIGRATOR, end)?
                .ok_or_else(|| SimError::InvalidConfig(format!("auction still running at {}s", end)))?;
            self.pool.apply(&finalization.teardown)?;
        }
        let snapshot = self.engine.finalize(&MIGRATOR)?;
        self.collect_events();
        Ok(snapshot)
    }

    fn collect_events(&mut self) {
        self.events.extend(self.engine.drain_events());
    }
}

/// Replay the whole script
pub fn run(config: &SimConfig) -> SimResult<SimReport> {
    let mut sim = Simulation::new(config)?;
    let trades = config
        .trades
        .iter()
        .map(|trade| sim.step(trade))
        .collect::<SimResult<Vec<_>>>()?;
    let snapshot = sim.finish(config.end_time())?;

    Ok(SimReport {
        snapshot,
        trades,
        events: std::mem::take(&mut sim.events),
    })
}
