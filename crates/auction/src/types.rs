//! # Identity Types
//!
//! Caller and asset identifiers. Both are opaque 32-byte keys supplied by
//! the execution environment.

use std::fmt;

use crate::errors::AuctionResult;
use crate::math::safe_math::safe_add_u128;

/// Identity of a caller (pool manager, migrator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct Address(pub [u8; 32]);

/// Identity of a launched asset; one auction per asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct AssetId(pub [u8; 32]);

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8; 32]) -> fmt::Result {
    for byte in bytes {
        write!(f, "{:02x}", byte)?;
    }
    Ok(())
}

impl Address {
    /// Address whose last byte is `tag`, used by fixtures and the simulator
    pub const fn from_tag(tag: u8) -> Self {
        let mut bytes = [0u8; 32];
        bytes[31] = tag;
        Self(bytes)
    }
}

impl AssetId {
    /// Asset id whose last byte is `tag`
    pub const fn from_tag(tag: u8) -> Self {
        let mut bytes = [0u8; 32];
        bytes[31] = tag;
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

/// The callers an auction trusts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct Authorities {
    /// Only caller allowed to drive trade callbacks
    pub pool_manager: Address,
    /// Only caller allowed to finalize and consume the snapshot
    pub migrator: Address,
}

/// A pair of raw amounts, one per pool token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenAmounts {
    /// Auctioned asset (token0)
    pub asset: u128,
    /// Numeraire (token1)
    pub numeraire: u128,
}

impl TokenAmounts {
    pub const ZERO: Self = Self { asset: 0, numeraire: 0 };

    pub fn checked_add(self, other: Self) -> AuctionResult<Self> {
        Ok(Self {
            asset: safe_add_u128(self.asset, other.asset)?,
            numeraire: safe_add_u128(self.numeraire, other.numeraire)?,
        })
    }

    pub fn is_zero(&self) -> bool {
        self.asset == 0 && self.numeraire == 0
    }
}
