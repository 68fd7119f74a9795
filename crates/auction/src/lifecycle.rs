//! # Lifecycle Gate
//!
//! Single source of truth for where an auction is in its life and the only
//! surface the migrator consumes. Status only moves forward:
//!
//! ```text
//! Uninitialized -> Initialized -> Locked -> Graduated | Exited
//!                       \----------------> Graduated | Exited   (settled, never traded)
//! ```

use crate::errors::{AuctionError, AuctionResult};

/// Auction lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum LifecycleStatus {
    /// No auction for the asset yet
    #[default]
    Uninitialized = 0,
    /// Epoch 0 slugs seeded, no trade seen
    Initialized = 1,
    /// Trading; external liquidity locked out of the auction ranges
    Locked = 2,
    /// Raised at least the minimum; proceeds seed the permanent pool
    Graduated = 3,
    /// Expired below the minimum; migrator unwinds and refunds
    Exited = 4,
}

impl LifecycleStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleStatus::Graduated | LifecycleStatus::Exited)
    }

    /// Check if trade callbacks are accepted
    pub fn allows_trading(&self) -> bool {
        matches!(self, LifecycleStatus::Initialized | LifecycleStatus::Locked)
    }

    /// Validate status transition
    pub fn can_transition_to(&self, next: LifecycleStatus) -> bool {
        use LifecycleStatus::*;
        matches!(
            (self, next),
            (Uninitialized, Initialized)
                | (Initialized, Locked)
                | (Locked, Graduated)
                | (Locked, Exited)
                | (Initialized, Graduated)
                | (Initialized, Exited)
        )
    }

    fn transition_error(&self) -> AuctionError {
        match self {
            LifecycleStatus::Uninitialized => AuctionError::NotInitialized,
            LifecycleStatus::Graduated | LifecycleStatus::Exited => AuctionError::AuctionAlreadyFinalized,
            LifecycleStatus::Initialized | LifecycleStatus::Locked => AuctionError::AlreadyInitialized,
        }
    }
}

/// Immutable outcome of a finished auction, handed to the migrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "client", derive(borsh::BorshSerialize, borsh::BorshDeserialize))]
pub struct Snapshot {
    /// Pool tick when the auction ended
    pub final_tick: i32,
    /// Net numeraire raised
    pub total_proceeds: u128,
    /// Net asset sold
    pub total_sold: u128,
    /// Graduated (true) or exited (false)
    pub success: bool,
    /// Epoch in force at the end
    pub epoch: u64,
    /// Seconds since start when the outcome was decided
    pub ended_at: i64,
    /// Trading fees collected by the slugs, asset side
    pub fees_asset: u128,
    /// Trading fees collected by the slugs, numeraire side
    pub fees_numeraire: u128,
}

#[cfg(feature = "client")]
impl Snapshot {
    /// Borsh encoding persisted by the migrator
    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        borsh::BorshSerialize::try_to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> std::io::Result<Self> {
        borsh::BorshDeserialize::try_from_slice(bytes)
    }
}

/// Status holder and migrator guard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleGate {
    status: LifecycleStatus,
    snapshot: Option<Snapshot>,
    migrated: bool,
}

impl LifecycleGate {
    pub fn status(&self) -> LifecycleStatus {
        self.status
    }

    /// Snapshot of a finished auction; readable any number of times
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_migrated(&self) -> bool {
        self.migrated
    }

    /// Move to a non-terminal status
    pub fn advance(&mut self, next: LifecycleStatus) -> AuctionResult<()> {
        if next.is_terminal() || !self.status.can_transition_to(next) {
            return Err(self.status.transition_error());
        }
        self.status = next;
        Ok(())
    }

    /// Move to a terminal status and record the outcome
    pub fn conclude(&mut self, next: LifecycleStatus, snapshot: Snapshot) -> AuctionResult<()> {
        if !next.is_terminal() || !self.status.can_transition_to(next) {
            return Err(self.status.transition_error());
        }
        self.status = next;
        self.snapshot = Some(snapshot);
        Ok(())
    }

    /// Hand the snapshot to the migrator, exactly once
    pub fn finalize(&mut self) -> AuctionResult<Snapshot> {
        if !self.status.is_terminal() {
            return Err(AuctionError::NotFinalized);
        }
        if self.migrated {
            return Err(AuctionError::AlreadyMigrated);
        }
        let snapshot = self.snapshot.ok_or(AuctionError::NotFinalized)?;
        self.migrated = true;
        Ok(snapshot)
    }
}
