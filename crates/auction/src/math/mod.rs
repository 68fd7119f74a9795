//! # Mathematical Functions
//!
//! Pure fixed-point functions: tick/price conversion, liquidity sizing and
//! checked accounting arithmetic. No state.

pub mod liquidity_math;
pub mod safe_math;
pub mod tick_math;

// Re-export commonly used functions
pub use liquidity_math::*;
pub use safe_math::*;
pub use tick_math::*;
