//! Shared fixtures for the integration tests

#![allow(dead_code)]

use feels_auction::{
    Address, AuctionConfig, AuctionEngine, Authorities, BeforeTrade, PoolHook, RebalancePlan, TradeLimit,
    TradeReceipt, TradeSide,
};

pub const POOL: Address = Address::from_tag(1);
pub const MIGRATOR: Address = Address::from_tag(2);
pub const ETH: u128 = 1_000_000_000_000_000_000;
pub const HOUR: i64 = 3_600;
pub const EPOCH: i64 = 1_800;

pub fn authorities() -> Authorities {
    Authorities {
        pool_manager: POOL,
        migrator: MIGRATOR,
    }
}

/// Six hour auction from tick 0 down to -200000 in 30 minute epochs,
/// graduating between 50 and 500 ETH
pub fn reference_config() -> AuctionConfig {
    AuctionConfig {
        start_tick: 0,
        end_tick: -200_000,
        duration: 6 * HOUR as u64,
        epoch_length: EPOCH as u64,
        min_proceeds: 50 * ETH,
        max_proceeds: 500 * ETH,
        ..AuctionConfig::default()
    }
}

pub fn initialized_engine(config: AuctionConfig) -> AuctionEngine {
    let mut engine = AuctionEngine::new(config, authorities()).expect("valid config");
    engine.on_initialize(&POOL).expect("initialize");
    engine
}

pub fn buy(amount_in: u128, amount_out: u128) -> TradeReceipt {
    TradeReceipt {
        side: TradeSide::Buy,
        amount_in,
        amount_out,
        fee: 0,
    }
}

pub fn sell(amount_in: u128, amount_out: u128) -> TradeReceipt {
    TradeReceipt {
        side: TradeSide::Sell,
        amount_in,
        amount_out,
        fee: 0,
    }
}

pub fn expect_proceed(outcome: BeforeTrade) -> (TradeLimit, Option<RebalancePlan>) {
    match outcome {
        BeforeTrade::Proceed { limit, rebalance } => (limit, rebalance),
        BeforeTrade::Finalized(finalization) => panic!("auction ended unexpectedly: {:?}", finalization.snapshot),
    }
}

/// Run a full trade bracket at `elapsed`, leaving the pool at `tick`
pub fn trade(engine: &mut AuctionEngine, tick: i32, receipt: TradeReceipt, elapsed: i64) {
    expect_proceed(engine.on_before_trade(&POOL, tick, elapsed).expect("before trade"));
    engine
        .on_after_trade(&POOL, tick, &receipt, elapsed)
        .expect("after trade");
}
