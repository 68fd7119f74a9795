//! # In-Memory Pool
//!
//! A concentrated liquidity pool holding nothing but the engine's slugs.
//! Applies rebalance plans and quotes swaps by walking the ranges with the
//! engine's own liquidity math, so amounts round the way the engine expects.

use feels_auction::math::{
    amount0_delta, amount1_delta, mul_div, next_sqrt_price_from_amount0_in, next_sqrt_price_from_amount1_in,
    sqrt_price_to_tick, tick_to_sqrt_price, Rounding,
};
use feels_auction::{RebalancePlan, Slug, TradeReceipt, TradeSide};
use serde::Serialize;

use crate::error::{SimError, SimResult};

/// Result of walking the slugs for one trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub side: TradeSide,
    /// Input absorbed by the slugs, fee excluded
    pub amount_in: u128,
    pub amount_out: u128,
    pub fee: u128,
    /// Pool price after the trade
    pub sqrt_price: u128,
    pub tick: i32,
}

impl Quote {
    /// What the pool reports to the engine
    pub fn receipt(&self) -> SimResult<TradeReceipt> {
        let amount_in = self
            .amount_in
            .checked_add(self.fee)
            .ok_or_else(|| SimError::Pool(format!("input {} plus fee {} overflows", self.amount_in, self.fee)))?;
        Ok(TradeReceipt {
            side: self.side,
            amount_in,
            amount_out: self.amount_out,
            fee: self.fee,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SimPool {
    sqrt_price: u128,
    /// Active positions, ascending by lower tick
    positions: Vec<Slug>,
}

impl SimPool {
    pub fn new(tick: i32) -> SimResult<Self> {
        Ok(Self {
            sqrt_price: tick_to_sqrt_price(tick)?,
            positions: Vec::new(),
        })
    }

    pub fn sqrt_price(&self) -> u128 {
        self.sqrt_price
    }

    pub fn tick(&self) -> SimResult<i32> {
        sqrt_price_to_tick(self.sqrt_price, Rounding::Down).map_err(SimError::from)
    }

    pub fn positions(&self) -> &[Slug] {
        &self.positions
    }

    /// Withdraw, deposit, then move the price to the plan's target
    pub fn apply(&mut self, plan: &RebalancePlan) -> SimResult<()> {
        for slug in &plan.withdraw {
            let index = self
                .positions
                .iter()
                .position(|position| position == slug)
                .ok_or_else(|| SimError::Pool(format!("no position [{}, {}] to withdraw", slug.tick_lower, slug.tick_upper)))?;
            self.positions.remove(index);
        }
        self.positions.extend(plan.deposit.iter().copied());
        self.positions.sort_by_key(|slug| slug.tick_lower);
        self.sqrt_price = tick_to_sqrt_price(plan.target_tick)?;

        log::debug!(
            "Applied plan: -{} +{} positions, price moved to tick {}",
            plan.withdraw.len(),
            plan.deposit.len(),
            plan.target_tick
        );
        Ok(())
    }

    /// Walk the positions for `amount` of input without changing the pool
    ///
    /// Input the positions cannot absorb stays with the trader; the fee is
    /// charged on top of what was absorbed.
    pub fn quote(&self, side: TradeSide, amount: u128, fee_bps: u16) -> SimResult<Quote> {
        let (remaining, amount_out, sqrt_price) = match side {
            TradeSide::Buy => self.walk_up(amount)?,
            TradeSide::Sell => self.walk_down(amount)?,
        };
        let amount_in = amount - remaining;
        let fee = mul_div(amount_in, fee_bps as u128, 10_000, Rounding::Up)?;

        Ok(Quote {
            side,
            amount_in,
            amount_out,
            fee,
            sqrt_price,
            tick: sqrt_price_to_tick(sqrt_price, Rounding::Down)?,
        })
    }

    /// Accept a quote produced from the current state
    pub fn commit(&mut self, quote: &Quote) {
        self.sqrt_price = quote.sqrt_price;
    }

    // Numeraire in, asset out, price rises
    fn walk_up(&self, amount: u128) -> SimResult<(u128, u128, u128)> {
        let mut price = self.sqrt_price;
        let mut remaining = amount;
        let mut amount_out = 0u128;

        for slug in &self.positions {
            if remaining == 0 {
                break;
            }
            let lower = tick_to_sqrt_price(slug.tick_lower)?;
            let upper = tick_to_sqrt_price(slug.tick_upper)?;
            if upper <= price {
                continue;
            }

            let start = price.max(lower);
            let needed = amount1_delta(start, upper, slug.liquidity, Rounding::Up)?;
            let end = if remaining >= needed {
                remaining -= needed;
                upper
            } else {
                let end = next_sqrt_price_from_amount1_in(start, slug.liquidity, remaining)?.min(upper);
                remaining = 0;
                end
            };
            amount_out += amount0_delta(start, end, slug.liquidity, Rounding::Down)?;
            price = end;
        }
        Ok((remaining, amount_out, price))
    }

    // Asset in, numeraire out, price falls
    fn walk_down(&self, amount: u128) -> SimResult<(u128, u128, u128)> {
        let mut price = self.sqrt_price;
        let mut remaining = amount;
        let mut amount_out = 0u128;

        for slug in self.positions.iter().rev() {
            if remaining == 0 {
                break;
            }
            let lower = tick_to_sqrt_price(slug.tick_lower)?;
            let upper = tick_to_sqrt_price(slug.tick_upper)?;
            if lower >= price {
                continue;
            }

            let start = price.min(upper);
            let needed = amount0_delta(lower, start, slug.liquidity, Rounding::Up)?;
            let end = if remaining >= needed {
                remaining -= needed;
                lower
            } else {
                let end = next_sqrt_price_from_amount0_in(start, slug.liquidity, remaining)?.max(lower);
                remaining = 0;
                end
            };
            amount_out += amount1_delta(end, start, slug.liquidity, Rounding::Down)?;
            price = end;
        }
        Ok((remaining, amount_out, price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feels_auction::{Address, AuctionConfig, AuctionEngine, Authorities, PoolHook};

    const ETH: u128 = 1_000_000_000_000_000_000;

    fn seeded_pool() -> (SimPool, RebalancePlan) {
        let pool_manager = Address::from_tag(1);
        let authorities = Authorities {
            pool_manager,
            migrator: Address::from_tag(2),
        };
        let mut engine = AuctionEngine::new(AuctionConfig::default(), authorities).unwrap();
        let plan = engine.on_initialize(&pool_manager).unwrap();
        let mut pool = SimPool::new(0).unwrap();
        pool.apply(&plan).unwrap();
        (pool, plan)
    }

    #[test]
    fn test_apply_plan() {
        let (pool, plan) = seeded_pool();
        assert_eq!(pool.positions().len(), plan.deposit.len());
        assert_eq!(pool.tick().unwrap(), plan.target_tick);

        let mut pool = pool;
        let teardown = RebalancePlan {
            withdraw: plan.deposit.clone(),
            deposit: Vec::new(),
            target_tick: -100,
        };
        pool.apply(&teardown).unwrap();
        assert!(pool.positions().is_empty());
        assert!(matches!(pool.apply(&teardown), Err(SimError::Pool(_))));
    }

    #[test]
    fn test_buy_moves_price_up() {
        let (mut pool, _) = seeded_pool();
        let before = pool.sqrt_price();
        let quote = pool.quote(TradeSide::Buy, 10 * ETH, 30).unwrap();
        assert_eq!(pool.sqrt_price(), before);
        assert_eq!(quote.amount_in, 10 * ETH);
        assert_eq!(quote.fee, 3 * ETH / 100);
        // Price 1.0 at tick 0: slightly less asset than numeraire in
        assert!(quote.amount_out < 10 * ETH && quote.amount_out > 9 * ETH);
        assert!(quote.sqrt_price > before);
        assert_eq!(quote.receipt().unwrap().amount_in, 10 * ETH + quote.fee);

        pool.commit(&quote);
        assert!(pool.tick().unwrap() >= 0);
    }

    #[test]
    fn test_receipt_rejects_overflowing_input() {
        let quote = Quote {
            side: TradeSide::Buy,
            amount_in: u128::MAX,
            amount_out: 1,
            fee: 1,
            sqrt_price: 1 << 64,
            tick: 0,
        };
        assert!(matches!(quote.receipt(), Err(SimError::Pool(_))));
    }

    #[test]
    fn test_sell_walks_back_down() {
        let (mut pool, _) = seeded_pool();
        let bought = pool.quote(TradeSide::Buy, 10 * ETH, 0).unwrap();
        pool.commit(&bought);

        let sold = pool.quote(TradeSide::Sell, bought.amount_out / 2, 0).unwrap();
        assert!(sold.sqrt_price < bought.sqrt_price);
        assert!(sold.amount_out < 10 * ETH);
        assert_eq!(sold.amount_in, bought.amount_out / 2);
    }

    #[test]
    fn test_unabsorbed_input_stays_with_trader() {
        let (pool, _) = seeded_pool();
        // Nothing below the price yet
        let quote = pool.quote(TradeSide::Sell, ETH, 30).unwrap();
        assert_eq!(quote.amount_in, 0);
        assert_eq!(quote.amount_out, 0);
        assert_eq!(quote.fee, 0);
        assert_eq!(quote.sqrt_price, pool.sqrt_price());
    }
}
