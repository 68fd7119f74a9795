//! # Feels Auction - Dutch Auction Launch Engine
//!
//! Price discovery for newly launched assets on a concentrated liquidity
//! pool. The engine runs as the pool's hook: before and after every trade it
//! advances a descending price schedule epoch by epoch, measures how far
//! realized demand drifted from it, and repositions three kinds of
//! engine-owned liquidity ranges ("slugs") accordingly. When the auction
//! raises enough, or runs out of time, it hands an immutable snapshot to the
//! migrator.
//!
//! - [`schedule`]: expected tick and supply release over time
//! - [`drift`]: clamped accumulator of realized vs. expected price
//! - [`slugs`]: lower / upper / price discovery range placement
//! - [`hook`]: the controller invoked by the pool
//! - [`lifecycle`]: status gate and graduation snapshot
//! - [`registry`]: one engine per launched asset
//!
//! ## Feature Flags
//!
//! - `client`: Enables serde for off-chain use and borsh for snapshots

pub mod config;
pub mod constants;
pub mod drift;
pub mod errors;
pub mod events;
pub mod hook;
pub mod lifecycle;
pub mod math;
pub mod reentrancy;
pub mod registry;
pub mod schedule;
pub mod slugs;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use config::AuctionConfig;
pub use errors::{AuctionError, AuctionResult, ErrorKind};
pub use events::AuctionEvent;
pub use hook::{AuctionEngine, BeforeTrade, Finalization, PoolHook};
pub use lifecycle::{LifecycleStatus, Snapshot};
pub use registry::AuctionRegistry;
pub use schedule::{AuctionSchedule, CurveKind, DecayCurve};
pub use slugs::{BoundsPolicy, DriftShift, RebalancePlan, Slug, SlugRole, SlugSet};
pub use state::{EpochState, TradeLimit, TradeReceipt, TradeSide};
pub use types::{Address, AssetId, Authorities, TokenAmounts};
