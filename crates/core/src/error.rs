//! Domain rejection model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Reasons a ledger transition is rejected.
///
/// Every variant is transition-rejecting: when one is returned, no field of the
/// ledger has changed. Callers may resubmit with adjusted parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// `buy` was called without value attached.
    #[error("deposit must be greater than zero")]
    ZeroDeposit,

    /// The curve quoted a zero unit price.
    #[error("unit price must be greater than zero")]
    InvalidPrice,

    /// The deposit rounds down to zero minted units at the current price.
    #[error("deposit too small to mint at least one unit")]
    DepositTooSmall,

    /// `sell` was called for zero units.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: u128, requested: u128 },

    /// The reserve cannot cover the payout owed at the current price.
    #[error("reserve exhausted: reserve {reserve}, owed {owed}")]
    ReserveExhausted { reserve: u128, owed: u128 },

    #[error("allowance exceeded: allowed {allowed}, requested {requested}")]
    AllowanceExceeded { allowed: u128, requested: u128 },

    #[error("transfer to the null identity")]
    TransferToNullIdentity,

    /// A checked operation would have wrapped.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// Pricing constants that cannot produce a well-defined price.
    #[error("invalid curve parameters: {0}")]
    InvalidCurve(&'static str),
}

impl LedgerError {
    /// Stable machine-readable code (used by transport layers).
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::ZeroDeposit => "zero_deposit",
            LedgerError::InvalidPrice => "invalid_price",
            LedgerError::DepositTooSmall => "deposit_too_small",
            LedgerError::ZeroAmount => "zero_amount",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::ReserveExhausted { .. } => "reserve_exhausted",
            LedgerError::AllowanceExceeded { .. } => "allowance_exceeded",
            LedgerError::TransferToNullIdentity => "transfer_to_null_identity",
            LedgerError::ArithmeticOverflow => "arithmetic_overflow",
            LedgerError::InvalidCurve(_) => "invalid_curve",
        }
    }
}
