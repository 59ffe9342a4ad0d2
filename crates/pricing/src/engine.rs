//! # Linear bonding curve
//!
//! ```text
//! unit_price = base_price + floor(slope * net_traded / scale)
//!
//!   price ▲
//!         │                      ╱
//!         │                 ╱
//!         │            ╱          slope / scale per token unit
//!         │       ╱
//!  base ──┼──╱
//!         └──────────────────────────▶ net traded volume
//! ```
//!
//! Prices are quoted in base-currency units per **one whole token**
//! (`10^decimals` token units). Minting and burning convert between the two
//! with floor division, so rounding always favours the reserve.

use serde::{Deserialize, Serialize};

use curvebook_core::{LedgerError, LedgerResult, checked_add, mul_div_floor};

/// Largest exponent for which `10^decimals` fits in a `u128`.
const MAX_DECIMALS: u32 = 38;

/// Price function plus the fixed-point conversions that depend on it.
///
/// Deserialization goes through [`PricingEngine::new`], so a stored curve is
/// validated the same way as one built in code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CurveParams")]
pub struct PricingEngine {
    base_price: u128,
    slope: u128,
    scale: u128,
    decimals: u32,
}

#[derive(Deserialize)]
struct CurveParams {
    base_price: u128,
    slope: u128,
    scale: u128,
    decimals: u32,
}

impl TryFrom<CurveParams> for PricingEngine {
    type Error = LedgerError;

    fn try_from(p: CurveParams) -> LedgerResult<Self> {
        PricingEngine::new(p.base_price, p.slope, p.scale, p.decimals)
    }
}

impl PricingEngine {
    /// Minimum unit price (price at zero volume).
    pub const BASE_PRICE: u128 = 1_000_000_000_000_000;
    /// Price sensitivity to volume, normalized by [`Self::SCALE`].
    pub const SLOPE: u128 = 1_000_000_000;
    pub const SCALE: u128 = 1_000_000_000_000_000_000;
    /// Fractional digits of the token unit.
    pub const DECIMALS: u32 = 18;

    /// Build-time curve used by every production ledger.
    pub const DEFAULT: PricingEngine = PricingEngine {
        base_price: Self::BASE_PRICE,
        slope: Self::SLOPE,
        scale: Self::SCALE,
        decimals: Self::DECIMALS,
    };

    /// Custom curve (tests, simulations, embedding with scaled-down constants).
    ///
    /// A zero `base_price` is accepted; such a curve quotes a zero price at
    /// zero volume and every buy against it is rejected with `InvalidPrice`.
    pub fn new(base_price: u128, slope: u128, scale: u128, decimals: u32) -> LedgerResult<Self> {
        if scale == 0 {
            return Err(LedgerError::InvalidCurve("scale must be non-zero"));
        }
        if decimals > MAX_DECIMALS {
            return Err(LedgerError::InvalidCurve("decimals must be at most 38"));
        }
        Ok(Self {
            base_price,
            slope,
            scale,
            decimals,
        })
    }

    pub fn base_price(&self) -> u128 {
        self.base_price
    }

    /// Token units in one whole token (`10^decimals`).
    pub fn one_token(&self) -> u128 {
        10u128.pow(self.decimals)
    }

    /// Unit price at the given net traded volume.
    pub fn price(&self, net_traded: u128) -> LedgerResult<u128> {
        let premium = mul_div_floor(self.slope, net_traded, self.scale)?;
        checked_add(self.base_price, premium)
    }

    /// Token units minted for `value` base-currency units at `price`.
    pub fn tokens_for_value(&self, value: u128, price: u128) -> LedgerResult<u128> {
        if price == 0 {
            return Err(LedgerError::InvalidPrice);
        }
        mul_div_floor(value, self.one_token(), price)
    }

    /// Base-currency units owed for burning `amount` token units at `price`.
    pub fn value_for_tokens(&self, amount: u128, price: u128) -> LedgerResult<u128> {
        mul_div_floor(amount, price, self.one_token())
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::DEFAULT
    }
}
