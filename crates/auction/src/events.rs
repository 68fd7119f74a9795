//! Auction events
//!
//! Buffered in the auction state and drained by the caller. A call that fails
//! leaves no events behind.

use crate::lifecycle::Snapshot;
use crate::slugs::Slug;
use crate::types::TokenAmounts;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "client", serde(rename_all = "snake_case"))]
pub enum AuctionEvent {
    /// Epoch 0 slugs seeded
    Initialized {
        anchor_tick: i32,
        slugs: Vec<Slug>,
    },
    /// First trade seen
    Locked {
        epoch: u64,
        tick: i32,
    },
    /// Slugs repositioned for a new epoch
    Rebalanced {
        epoch: u64,
        expected_tick: i32,
        anchor_tick: i32,
        drift: i32,
        slugs: Vec<Slug>,
        net_sold: u128,
        net_proceeds: u128,
        fees_collected: TokenAmounts,
    },
    Graduated(Snapshot),
    Exited(Snapshot),
    /// Snapshot consumed by the migrator
    Migrated {
        success: bool,
    },
}
