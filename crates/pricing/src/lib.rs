//! Pricing module: the linear bonding curve and its fixed-point mint/burn
//! arithmetic.
//!
//! Pure domain logic only: no state beyond the compile-time constants, no IO.

pub mod engine;

pub use engine::PricingEngine;
