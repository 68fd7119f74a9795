//! # Auction Constants
//!
//! Fixed-point scales, legal tick and price bounds of the underlying pool,
//! and engine defaults.

// ============================================================================
// Mathematical Constants
// ============================================================================

/// Q64 fixed-point scale factor: 2^64
pub const Q64: u128 = 1u128 << 64;

/// WAD scale for schedule progress (1e18 = 100%)
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Basis points denominator (10,000 = 100%)
pub const BPS_DENOMINATOR: u128 = 10_000;

// ============================================================================
// Pool Bounds
// ============================================================================

/// Minimum tick supported by the pool
pub const MIN_TICK: i32 = -443_636;

/// Maximum tick supported by the pool
pub const MAX_TICK: i32 = 443_636;

/// Sqrt price at `MIN_TICK` in Q64.64
pub const MIN_SQRT_PRICE: u128 = 4_295_048_016;

/// Sqrt price at `MAX_TICK` in Q64.64
pub const MAX_SQRT_PRICE: u128 = 79_226_673_515_401_279_992_447_579_055;

/// Smallest liquidity the pool treats as a meaningful position
pub const MIN_LIQUIDITY: u128 = 1000;

// ============================================================================
// Engine Limits
// ============================================================================

/// Upper bound on price discovery slugs per epoch
pub const MAX_PD_SLUGS: u8 = 8;

/// Largest numeraire decimals accepted by config validation
pub const MAX_NUMERAIRE_DECIMALS: u8 = 36;

/// Default drift follow strength (100%)
pub const DEFAULT_DRIFT_FOLLOW_BPS: u16 = 10_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_validity() {
        assert!(MIN_TICK < MAX_TICK);
        assert_eq!(MIN_TICK, -MAX_TICK);
        assert!(MIN_SQRT_PRICE < Q64 && Q64 < MAX_SQRT_PRICE);
        assert_eq!(Q64, 18446744073709551616u128);
        assert_eq!(BPS_DENOMINATOR, 10000);
    }
}
