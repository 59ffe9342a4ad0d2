//! Token ledger module (bonding-curve priced, event-sourced).
//!
//! Pure domain logic only: no IO, no locking, no value movement. The ledger
//! decides transitions (`handle`) and evolves state (`apply`); the service in
//! `curvebook-infra` serializes transitions and moves backing value.

pub mod token;

pub use token::{
    Approve, Approved, Bought, Buy, BuyQuote, Checkpoint, DecreaseAllowance, FallbackCall,
    IncreaseAllowance, Ledger, LedgerCommand, LedgerEvent, LedgerId, LedgerSnapshot, ReceiveValue,
    Sell, SellQuote, Sold, Transfer, TransferFrom, Transferred, ValueEntry, ValueReceived,
};
