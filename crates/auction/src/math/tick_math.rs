//! # Tick Math
//!
//! Conversions between ticks and Q64.64 sqrt prices, bit-exact with the
//! pool's own tick math so that slug bounds computed here land on the same
//! prices the pool uses.
//!
//! Rounding is part of the contract. A buyer's effective price ceiling is
//! converted with `Rounding::Down` and a seller's floor with `Rounding::Up`,
//! so a price that falls between two ticks never resolves in the trader's
//! favour.

use ethnum::U256;

use crate::constants::{MAX_SQRT_PRICE, MAX_TICK, MIN_SQRT_PRICE, MIN_TICK};
use crate::errors::{AuctionError, AuctionResult};

/// Rounding mode for price to tick conversions and tick alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum Rounding {
    /// Toward lower ticks
    Down,
    /// Toward higher ticks
    Up,
}

// Precision of the fractional log2 approximation
const BIT_PRECISION: u32 = 14;

// log_2(sqrt(1.0001)) in Q32.32
const LOG_B_2_X32: i128 = 59_543_866_431_248;

// Error margins of the log approximation
const LOG_B_P_ERR_MARGIN_LOWER_X64: i128 = 184_467_440_737_095_516; // 0.01
const LOG_B_P_ERR_MARGIN_UPPER_X64: i128 = 15_793_534_762_490_258_745; // 2^-precision / log_2_b + 0.01

/// Check if a tick is within the supported range
pub fn is_tick_valid(tick: i32) -> bool {
    (MIN_TICK..=MAX_TICK).contains(&tick)
}

/// Return the tick unchanged if it is legal
pub fn check_tick(tick: i32) -> AuctionResult<i32> {
    if is_tick_valid(tick) {
        Ok(tick)
    } else {
        Err(AuctionError::InvalidTick)
    }
}

/// Get the Q64.64 sqrt price at a tick
pub fn tick_to_sqrt_price(tick: i32) -> AuctionResult<u128> {
    check_tick(tick)?;
    if tick >= 0 {
        Ok(sqrt_price_positive_tick(tick))
    } else {
        Ok(sqrt_price_negative_tick(tick))
    }
}

/// Get the tick at a Q64.64 sqrt price
///
/// `Rounding::Down` returns the greatest tick whose price is at or below the
/// input, `Rounding::Up` the least tick whose price is at or above it.
pub fn sqrt_price_to_tick(sqrt_price: u128, rounding: Rounding) -> AuctionResult<i32> {
    if !(MIN_SQRT_PRICE..=MAX_SQRT_PRICE).contains(&sqrt_price) {
        return Err(AuctionError::InvalidTick);
    }

    let floor = floor_tick(sqrt_price)?;
    match rounding {
        Rounding::Down => Ok(floor),
        Rounding::Up => {
            if tick_to_sqrt_price(floor)? == sqrt_price {
                Ok(floor)
            } else {
                check_tick(floor + 1)
            }
        }
    }
}

/// Align a tick to a multiple of `spacing`
pub fn align_tick(tick: i32, spacing: i32, rounding: Rounding) -> i32 {
    if spacing <= 1 {
        return tick;
    }
    let floor = tick.div_euclid(spacing) * spacing;
    match rounding {
        Rounding::Down => floor,
        Rounding::Up if floor == tick => floor,
        Rounding::Up => floor + spacing,
    }
}

fn floor_tick(sqrt_price: u128) -> AuctionResult<i32> {
    // Integer part of log2(sqrt_price) from the msb
    let msb: u32 = 128 - sqrt_price.leading_zeros() - 1;
    let log2p_integer_x32 = (msb as i128 - 64) << 32;

    // Fractional part, starting from bit 63 (0.5 in Q64.64)
    let mut bit: i128 = 0x8000_0000_0000_0000i128;
    let mut precision = 0;
    let mut log2p_fraction_x64 = 0;

    let mut r = if msb >= 64 {
        sqrt_price >> (msb - 63)
    } else {
        sqrt_price << (63 - msb)
    };

    while bit > 0 && precision < BIT_PRECISION {
        r *= r;
        let is_r_more_than_two = r >> 127_u32;
        r >>= 63 + is_r_more_than_two;
        log2p_fraction_x64 += bit * is_r_more_than_two as i128;
        bit >>= 1;
        precision += 1;
    }

    let log2p_fraction_x32 = log2p_fraction_x64 >> 32;
    let log2p_x32 = log2p_integer_x32 + log2p_fraction_x32;

    // Change of base 2 -> sqrt(1.0001)
    let logbp_x64 = log2p_x32 * LOG_B_2_X32;

    let tick_low = ((logbp_x64 - LOG_B_P_ERR_MARGIN_LOWER_X64) >> 64) as i32;
    let tick_high = ((logbp_x64 + LOG_B_P_ERR_MARGIN_UPPER_X64) >> 64) as i32;

    if tick_low == tick_high {
        return Ok(tick_low);
    }
    // tick_high may overshoot by one
    if is_tick_valid(tick_high) && tick_to_sqrt_price(tick_high)? <= sqrt_price {
        Ok(tick_high)
    } else {
        Ok(tick_low)
    }
}

fn sqrt_price_positive_tick(tick: i32) -> u128 {
    let mut ratio: u128 = if tick & 1 != 0 {
        79232123823359799118286999567
    } else {
        79228162514264337593543950336
    };

    const FACTORS: [(i32, u128); 18] = [
        (2, 79236085330515764027303304731),
        (4, 79244008939048815603706035061),
        (8, 79259858533276714757314932305),
        (16, 79291567232598584799939703904),
        (32, 79355022692464371645785046466),
        (64, 79482085999252804386437311141),
        (128, 79736823300114093921829183326),
        (256, 80248749790819932309965073892),
        (512, 81282483887344747381513967011),
        (1024, 83390072131320151908154831281),
        (2048, 87770609709833776024991924138),
        (4096, 97234110755111693312479820773),
        (8192, 119332217159966728226237229890),
        (16384, 179736315981702064433883588727),
        (32768, 407748233172238350107850275304),
        (65536, 2098478828474011932436660412517),
        (131072, 55581415166113811149459800483533),
        (262144, 38992368544603139932233054999993551),
    ];

    for (mask, factor) in FACTORS {
        if tick & mask != 0 {
            ratio = mul_shift_96(ratio, factor);
        }
    }

    ratio >> 32
}

fn sqrt_price_negative_tick(tick: i32) -> u128 {
    let abs_tick = tick.abs();

    let mut ratio: u128 = if abs_tick & 1 != 0 {
        18445821805675392311
    } else {
        18446744073709551616
    };

    const FACTORS: [(i32, u128); 18] = [
        (2, 18444899583751176498),
        (4, 18443055278223354162),
        (8, 18439367220385604838),
        (16, 18431993317065449817),
        (32, 18417254355718160513),
        (64, 18387811781193591352),
        (128, 18329067761203520168),
        (256, 18212142134806087854),
        (512, 17980523815641551639),
        (1024, 17526086738831147013),
        (2048, 16651378430235024244),
        (4096, 15030750278693429944),
        (8192, 12247334978882834399),
        (16384, 8131365268884726200),
        (32768, 3584323654723342297),
        (65536, 696457651847595233),
        (131072, 26294789957452057),
        (262144, 37481735321082),
    ];

    for (mask, factor) in FACTORS {
        if abs_tick & mask != 0 {
            ratio = (ratio * factor) >> 64;
        }
    }

    ratio
}

fn mul_shift_96(n0: u128, n1: u128) -> u128 {
    let mul: U256 = (U256::from(n0) * U256::from(n1)) >> 96;
    mul.as_u128()
}
