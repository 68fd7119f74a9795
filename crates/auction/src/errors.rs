//! # Auction Error Types
//!
//! Every failure aborts the whole triggering call. Nothing here is retried
//! internally; the pool rejects the surrounding trade instead.

use thiserror::Error;

/// Broad classes of auction failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Detected once while validating an `AuctionConfig`
    Configuration,
    /// Operation attempted outside the lifecycle window
    Temporal,
    /// Arithmetic bound or accounting invariant violated
    Numeric,
    /// Call did not come from the expected caller context
    Authorization,
}

/// Errors raised by the auction engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize))]
pub enum AuctionError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================

    #[error("Invalid tick range")]
    InvalidTickRange,

    #[error("Auction duration is not a multiple of the epoch length")]
    DurationNotMultipleOfEpoch,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),

    // ========================================================================
    // Temporal Errors
    // ========================================================================

    #[error("Auction has not started")]
    AuctionNotStarted,

    #[error("Auction already finalized")]
    AuctionAlreadyFinalized,

    #[error("Auction not initialized")]
    NotInitialized,

    #[error("Auction already initialized")]
    AlreadyInitialized,

    #[error("Auction not finalized")]
    NotFinalized,

    #[error("No trade is open")]
    TradeNotOpen,

    #[error("Auction already migrated")]
    AlreadyMigrated,

    // ========================================================================
    // Numeric Errors
    // ========================================================================

    #[error("Invalid tick")]
    InvalidTick,

    #[error("Liquidity underflow")]
    LiquidityUnderflow,

    #[error("Proceeds overflow")]
    ProceedsOverflow,

    #[error("Math overflow")]
    MathOverflow,

    #[error("Division by zero")]
    DivisionByZero,

    // ========================================================================
    // Authorization Errors
    // ========================================================================

    #[error("Caller is not the pool manager")]
    NotPoolManager,

    #[error("Caller is not the migrator")]
    NotMigrator,

    #[error("Reentrant call")]
    ReentrantCall,
}

/// Result type using auction errors
pub type AuctionResult<T> = Result<T, AuctionError>;

impl AuctionError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTickRange | Self::DurationNotMultipleOfEpoch | Self::InvalidParameter(_) => {
                ErrorKind::Configuration
            }
            Self::AuctionNotStarted
            | Self::AuctionAlreadyFinalized
            | Self::NotInitialized
            | Self::AlreadyInitialized
            | Self::NotFinalized
            | Self::TradeNotOpen
            | Self::AlreadyMigrated => ErrorKind::Temporal,
            Self::InvalidTick
            | Self::LiquidityUnderflow
            | Self::ProceedsOverflow
            | Self::MathOverflow
            | Self::DivisionByZero => ErrorKind::Numeric,
            Self::NotPoolManager | Self::NotMigrator | Self::ReentrantCall => ErrorKind::Authorization,
        }
    }

    /// Create an invalid parameter error naming the offending field
    pub fn invalid_parameter(field: &'static str) -> Self {
        Self::InvalidParameter(field)
    }
}
