//! Trade bracket guard.
//!
//! `on_before_trade` opens a trade and `on_after_trade` (or
//! `on_trade_aborted`) closes it. Any engine entry that would nest inside an
//! open trade is rejected.

use crate::errors::{AuctionError, AuctionResult};

// ============================================================================
// Reentrancy Status Types
// ============================================================================

/// Whether a trade is currently in flight
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum ReentrancyStatus {
    /// Ready for a new trade
    #[default]
    Unlocked,
    /// Between `on_before_trade` and its closing callback
    Locked,
}

// ============================================================================
// Reentrancy Guard Manager
// ============================================================================

pub struct ReentrancyGuard;

impl ReentrancyGuard {
    /// Open a trade
    pub fn acquire(status: &mut ReentrancyStatus) -> AuctionResult<()> {
        match *status {
            ReentrancyStatus::Unlocked => {
                *status = ReentrancyStatus::Locked;
                Ok(())
            }
            ReentrancyStatus::Locked => Err(AuctionError::ReentrantCall),
        }
    }

    /// Close the open trade
    pub fn release(status: &mut ReentrancyStatus) -> AuctionResult<()> {
        match *status {
            ReentrancyStatus::Locked => {
                *status = ReentrancyStatus::Unlocked;
                Ok(())
            }
            ReentrancyStatus::Unlocked => Err(AuctionError::TradeNotOpen),
        }
    }

    pub fn is_locked(status: &ReentrancyStatus) -> bool {
        *status != ReentrancyStatus::Unlocked
    }

    /// Reject entry points that must not run inside an open trade
    pub fn ensure_unlocked(status: &ReentrancyStatus) -> AuctionResult<()> {
        if Self::is_locked(status) {
            return Err(AuctionError::ReentrantCall);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reentrancy_guard_lifecycle() {
        let mut status = ReentrancyStatus::Unlocked;

        assert!(ReentrancyGuard::acquire(&mut status).is_ok());
        assert_eq!(status, ReentrancyStatus::Locked);
        assert!(ReentrancyGuard::is_locked(&status));

        // Nested trade
        assert_eq!(ReentrancyGuard::acquire(&mut status), Err(AuctionError::ReentrantCall));
        assert_eq!(ReentrancyGuard::ensure_unlocked(&status), Err(AuctionError::ReentrantCall));

        assert!(ReentrancyGuard::release(&mut status).is_ok());
        assert_eq!(status, ReentrancyStatus::Unlocked);
        assert!(ReentrancyGuard::ensure_unlocked(&status).is_ok());
    }

    #[test]
    fn test_release_without_open_trade() {
        let mut status = ReentrancyStatus::Unlocked;
        assert_eq!(ReentrancyGuard::release(&mut status), Err(AuctionError::TradeNotOpen));
    }
}
