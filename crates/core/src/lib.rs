//! `curvebook-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! aggregate traits, identifiers, the rejection model and checked fixed-point math.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod math;

pub use aggregate::{Aggregate, AggregateRoot};
pub use error::{LedgerError, LedgerResult};
pub use id::{AccountId, AggregateId};
pub use math::{checked_add, checked_sub, mul_div_floor};
