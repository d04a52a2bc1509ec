// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Currency amounts and the rounding rules applied to them.
//!
//! Every price in the pricing hierarchy is a whole number of won. Rates and
//! confidences stay plain [`Decimal`] values; only the products they produce
//! become [`Krw`].

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

const THOUSAND: Decimal = dec!(1000);

// ---------------------------------------------------------------------------
// Rounding
// ---------------------------------------------------------------------------

/// Round half away from zero to `dp` decimal places.
pub fn round_dp(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Round up to the next multiple of 1000. Exact multiples are unchanged.
pub fn ceil_to_thousand(value: Decimal) -> Decimal {
    (value / THOUSAND).ceil() * THOUSAND
}

// ---------------------------------------------------------------------------
// Krw
// ---------------------------------------------------------------------------

/// Korean won amount backed by `rust_decimal::Decimal`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Krw(#[serde(with = "number")] pub Decimal);

impl Krw {
    /// Zero value
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Round an arbitrary decimal to whole won.
    pub fn round(value: Decimal) -> Self {
        Self(round_dp(value, 0))
    }

    /// `round(self * rate)` -- the shape of every surcharge and margin.
    pub fn scaled(&self, rate: Decimal) -> Self {
        Self::round(self.0 * rate)
    }

    /// Round up to the next 1000 won.
    pub fn ceil_to_thousand(&self) -> Self {
        Self(ceil_to_thousand(self.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<i64> for Krw {
    fn from(v: i64) -> Self {
        Self(Decimal::from(v))
    }
}

impl Add for Krw {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Krw {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for Krw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} KRW", self.0)
    }
}

// ---------------------------------------------------------------------------
// JSON numbers
// ---------------------------------------------------------------------------

/// `#[serde(with = "number")]` for `Decimal` fields of the UI contract.
///
/// Whole values are written as JSON integers, the rest as floats. Input may be
/// a number or a numeric string.
pub mod number {
    use num_traits::ToPrimitive;
    use rust_decimal::Decimal;
    use serde::ser::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        if value.fract().is_zero() {
            if let Some(whole) = value.to_i64() {
                return serializer.serialize_i64(whole);
            }
        }
        let float = value
            .to_f64()
            .ok_or_else(|| S::Error::custom(format!("{value} has no f64 representation")))?;
        serializer.serialize_f64(float)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        <Decimal as Deserialize>::deserialize(deserializer)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
