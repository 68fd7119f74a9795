//! # Safe Math Operations
//!
//! Overflow-checked arithmetic for accounting quantities. Proceeds and
//! liquidity are never clamped: a bound violation is an error.

use ethnum::U256;

use crate::constants::BPS_DENOMINATOR;
use crate::errors::{AuctionError, AuctionResult};
use crate::math::tick_math::Rounding;

/// Macro to generate safe arithmetic functions
macro_rules! safe_arith {
    ($fn_name:ident, $type:ty, $checked_method:ident, $error:expr) => {
        /// Checked operation returning the given error on overflow/underflow
        pub fn $fn_name(a: $type, b: $type) -> AuctionResult<$type> {
            a.$checked_method(b).ok_or($error)
        }
    };
}

safe_arith!(safe_add_u128, u128, checked_add, AuctionError::MathOverflow);
safe_arith!(safe_sub_u128, u128, checked_sub, AuctionError::LiquidityUnderflow);
safe_arith!(safe_add_proceeds, u128, checked_add, AuctionError::ProceedsOverflow);
safe_arith!(safe_add_i32, i32, checked_add, AuctionError::InvalidTick);
safe_arith!(safe_sub_i32, i32, checked_sub, AuctionError::InvalidTick);

/// `a * b / denominator` with a 256-bit intermediate
pub fn mul_div(a: u128, b: u128, denominator: u128, rounding: Rounding) -> AuctionResult<u128> {
    if denominator == 0 {
        return Err(AuctionError::DivisionByZero);
    }
    let product = U256::from(a) * U256::from(b);
    let denominator = U256::from(denominator);
    let mut quotient: U256 = product / denominator;
    if rounding == Rounding::Up && product % denominator != U256::ZERO {
        quotient += U256::ONE;
    }
    to_u128(quotient)
}

/// Apply a basis point fraction, rounding down
pub fn apply_bps(value: u128, bps: u16) -> AuctionResult<u128> {
    if bps as u128 > BPS_DENOMINATOR {
        return Err(AuctionError::invalid_parameter("bps"));
    }
    mul_div(value, bps as u128, BPS_DENOMINATOR, Rounding::Down)
}

/// Narrow a U256 to u128
pub fn to_u128(value: U256) -> AuctionResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(AuctionError::MathOverflow);
    }
    Ok(value.as_u128())
}

/// Ceiling division on U256
pub fn div_ceil_u256(numerator: U256, denominator: U256) -> AuctionResult<U256> {
    if denominator == U256::ZERO {
        return Err(AuctionError::DivisionByZero);
    }
    let quotient: U256 = numerator / denominator;
    if numerator % denominator != U256::ZERO {
        Ok(quotient + U256::ONE)
    } else {
        Ok(quotient)
    }
}

/// Integer square root for U256 (floor)
pub fn isqrt_u256(n: U256) -> U256 {
    if n < U256::from(2u8) {
        return n;
    }

    // Newton's method from a power of two above the root
    let bits = 256 - n.leading_zeros();
    let mut x = U256::ONE << ((bits + 1) / 2);
    loop {
        let y: U256 = (x + n / x) >> 1;
        if y >= x {
            return x;
        }
        x = y;
    }
}
