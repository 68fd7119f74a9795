//! # Liquidity Math
//!
//! Amount/liquidity conversions for concentrated liquidity positions in
//! Q64.64. token0 is the auctioned asset, token1 the numeraire.
//!
//! Rounding Behavior
//! -----------------
//! - Amounts a position *needs* are rounded up, amounts it *pays out* down.
//! - Liquidity derived from a budget is rounded down and then fitted so that
//!   the rounded-up requirement never exceeds the budget.

use ethnum::U256;

use crate::errors::{AuctionError, AuctionResult};
use crate::math::safe_math::{div_ceil_u256, to_u128};
use crate::math::tick_math::Rounding;

fn sorted(sqrt_price_a: u128, sqrt_price_b: u128) -> AuctionResult<(u128, u128)> {
    let (lo, hi) = if sqrt_price_a > sqrt_price_b {
        (sqrt_price_b, sqrt_price_a)
    } else {
        (sqrt_price_a, sqrt_price_b)
    };
    if lo == 0 {
        return Err(AuctionError::DivisionByZero);
    }
    Ok((lo, hi))
}

/// Asset (token0) amount spanned by `liquidity` between two sqrt prices
pub fn amount0_delta(
    sqrt_price_a: u128,
    sqrt_price_b: u128,
    liquidity: u128,
    rounding: Rounding,
) -> AuctionResult<u128> {
    let (lo, hi) = sorted(sqrt_price_a, sqrt_price_b)?;
    let scaled = U256::from(liquidity) << 64;
    let lo = U256::from(lo);
    let hi = U256::from(hi);

    // L * 2^64 / lo - L * 2^64 / hi, with each term rounded outward
    let amount = match rounding {
        Rounding::Down => {
            let floor_lo: U256 = scaled / lo;
            floor_lo.saturating_sub(div_ceil_u256(scaled, hi)?)
        }
        Rounding::Up => {
            let floor_hi: U256 = scaled / hi;
            div_ceil_u256(scaled, lo)?.saturating_sub(floor_hi)
        }
    };
    to_u128(amount)
}

/// Numeraire (token1) amount spanned by `liquidity` between two sqrt prices
pub fn amount1_delta(
    sqrt_price_a: u128,
    sqrt_price_b: u128,
    liquidity: u128,
    rounding: Rounding,
) -> AuctionResult<u128> {
    let (lo, hi) = sorted(sqrt_price_a, sqrt_price_b)?;
    let product = U256::from(liquidity) * U256::from(hi - lo);
    let amount = match rounding {
        Rounding::Down => product >> 64,
        Rounding::Up => div_ceil_u256(product, U256::ONE << 64)?,
    };
    to_u128(amount)
}

/// Liquidity supported by `amount0` of asset over a range (rounded down)
pub fn liquidity_for_amount0(sqrt_price_a: u128, sqrt_price_b: u128, amount0: u128) -> AuctionResult<u128> {
    let (lo, hi) = sorted(sqrt_price_a, sqrt_price_b)?;
    if lo == hi {
        return Err(AuctionError::DivisionByZero);
    }
    let intermediate = (U256::from(lo) * U256::from(hi)) >> 64;
    let numerator = U256::from(amount0)
        .checked_mul(intermediate)
        .ok_or(AuctionError::MathOverflow)?;
    to_u128(numerator / U256::from(hi - lo))
}

/// Liquidity supported by `amount1` of numeraire over a range (rounded down)
pub fn liquidity_for_amount1(sqrt_price_a: u128, sqrt_price_b: u128, amount1: u128) -> AuctionResult<u128> {
    let (lo, hi) = sorted(sqrt_price_a, sqrt_price_b)?;
    if lo == hi {
        return Err(AuctionError::DivisionByZero);
    }
    to_u128((U256::from(amount1) << 64) / U256::from(hi - lo))
}

/// Largest liquidity whose rounded-up asset requirement fits in `amount0`
pub fn fit_liquidity_for_amount0(sqrt_price_a: u128, sqrt_price_b: u128, amount0: u128) -> AuctionResult<u128> {
    fit(amount0, |budget| liquidity_for_amount0(sqrt_price_a, sqrt_price_b, budget), |liquidity| {
        amount0_delta(sqrt_price_a, sqrt_price_b, liquidity, Rounding::Up)
    })
}

/// Largest liquidity whose rounded-up numeraire requirement fits in `amount1`
pub fn fit_liquidity_for_amount1(sqrt_price_a: u128, sqrt_price_b: u128, amount1: u128) -> AuctionResult<u128> {
    fit(amount1, |budget| liquidity_for_amount1(sqrt_price_a, sqrt_price_b, budget), |liquidity| {
        amount1_delta(sqrt_price_a, sqrt_price_b, liquidity, Rounding::Up)
    })
}

// Shrinks the budget by the observed excess until the requirement fits.
fn fit<L, A>(amount: u128, liquidity_for: L, required_for: A) -> AuctionResult<u128>
where
    L: Fn(u128) -> AuctionResult<u128>,
    A: Fn(u128) -> AuctionResult<u128>,
{
    let mut budget = amount;
    for _ in 0..8 {
        let liquidity = liquidity_for(budget)?;
        let required = required_for(liquidity)?;
        if required <= amount {
            return Ok(liquidity);
        }
        budget = budget.saturating_sub(required - amount);
    }
    Err(AuctionError::LiquidityUnderflow)
}

/// Sqrt price after `amount1` of numeraire enters a range (price moves up)
pub fn next_sqrt_price_from_amount1_in(sqrt_price: u128, liquidity: u128, amount1: u128) -> AuctionResult<u128> {
    if liquidity == 0 {
        return Err(AuctionError::DivisionByZero);
    }
    let delta: U256 = (U256::from(amount1) << 64) / U256::from(liquidity);
    let next = U256::from(sqrt_price)
        .checked_add(delta)
        .ok_or(AuctionError::MathOverflow)?;
    to_u128(next)
}

/// Sqrt price after `amount0` of asset enters a range (price moves down)
pub fn next_sqrt_price_from_amount0_in(sqrt_price: u128, liquidity: u128, amount0: u128) -> AuctionResult<u128> {
    if amount0 == 0 {
        return Ok(sqrt_price);
    }
    if sqrt_price == 0 || liquidity == 0 {
        return Err(AuctionError::DivisionByZero);
    }
    let numerator = U256::from(liquidity) << 64;
    let denominator: U256 = numerator / U256::from(sqrt_price) + U256::from(amount0);
    to_u128(div_ceil_u256(numerator, denominator)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::Q64;
    use crate::math::tick_math::tick_to_sqrt_price;

    #[test]
    fn test_amount_deltas() {
        let lower = Q64;
        let upper = Q64 + (Q64 / 100);
        let liquidity = 1_000_000u128;

        let down = amount0_delta(lower, upper, liquidity, Rounding::Down).unwrap();
        let up = amount0_delta(lower, upper, liquidity, Rounding::Up).unwrap();
        assert!(down > 0);
        assert!(up >= down && up - down <= 3);

        let down = amount1_delta(lower, upper, liquidity, Rounding::Down).unwrap();
        let up = amount1_delta(lower, upper, liquidity, Rounding::Up).unwrap();
        assert_eq!(down, 9_999);
        assert_eq!(up, 10_000);
    }

    #[test]
    fn test_fitted_liquidity_never_exceeds_budget() {
        let a = tick_to_sqrt_price(-12_000).unwrap();
        let b = tick_to_sqrt_price(-11_400).unwrap();
        for amount in [1_000u128, 123_456_789, 10u128.pow(24), 7 * 10u128.pow(26)] {
            let l0 = fit_liquidity_for_amount0(a, b, amount).unwrap();
            assert!(amount0_delta(a, b, l0, Rounding::Up).unwrap() <= amount);
            let l1 = fit_liquidity_for_amount1(a, b, amount).unwrap();
            assert!(amount1_delta(a, b, l1, Rounding::Up).unwrap() <= amount);
        }
    }

    #[test]
    fn test_next_sqrt_price_direction() {
        let sqrt_price = Q64;
        let liquidity = 10u128.pow(20);

        let up = next_sqrt_price_from_amount1_in(sqrt_price, liquidity, 10u128.pow(18)).unwrap();
        assert!(up > sqrt_price);

        let down = next_sqrt_price_from_amount0_in(sqrt_price, liquidity, 10u128.pow(18)).unwrap();
        assert!(down < sqrt_price);
        assert_eq!(next_sqrt_price_from_amount0_in(sqrt_price, liquidity, 0).unwrap(), sqrt_price);
    }

    #[test]
    fn test_degenerate_range() {
        assert_eq!(liquidity_for_amount0(Q64, Q64, 100), Err(AuctionError::DivisionByZero));
        assert_eq!(amount0_delta(0, Q64, 1, Rounding::Down), Err(AuctionError::DivisionByZero));
    }
}
