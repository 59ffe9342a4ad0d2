//! Checked fixed-point arithmetic.
//!
//! Amounts are stored as `u128`. Multiply-then-divide goes through a 256-bit
//! intermediate so the product itself never wraps; only a quotient that does
//! not fit back into `u128` is reported as [`LedgerError::ArithmeticOverflow`].

use uint::construct_uint;

use crate::error::{LedgerError, LedgerResult};

construct_uint! {
    /// 256-bit integer used for intermediate products.
    struct U256(4);
}

fn narrow(value: U256) -> LedgerResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(LedgerError::ArithmeticOverflow);
    }
    Ok(value.low_u128())
}

/// `floor(a * b / d)` without intermediate overflow.
///
/// A zero divisor is reported as overflow: callers validate divisors up front,
/// so reaching it means the inputs were already out of range.
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> LedgerResult<u128> {
    if d == 0 {
        return Err(LedgerError::ArithmeticOverflow);
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(LedgerError::ArithmeticOverflow)?;
    narrow(product / U256::from(d))
}

pub fn checked_add(a: u128, b: u128) -> LedgerResult<u128> {
    a.checked_add(b).ok_or(LedgerError::ArithmeticOverflow)
}

pub fn checked_sub(a: u128, b: u128) -> LedgerResult<u128> {
    a.checked_sub(b).ok_or(LedgerError::ArithmeticOverflow)
}
