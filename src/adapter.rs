//! Adapter layer: converts between the analyzer's f64 statistics and the
//! engine's Decimal money.

use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::money::{round_dp, Krw};

/// Convert f64 to Decimal. Non-finite input maps to zero.
pub fn to_decimal(v: f64) -> Decimal {
    Decimal::from_f64(v).unwrap_or(Decimal::ZERO)
}

/// Convert Decimal to f64.
pub fn from_decimal(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Round a statistic to whole won.
pub fn to_krw(v: f64) -> Krw {
    Krw(to_decimal(v.round()))
}

/// Round a `[0,1]` score to 2 decimal places as Decimal.
pub fn to_score(v: f64) -> Decimal {
    round_dp(to_decimal(v), 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn krw_conversion_rounds_half_away() {
        assert_eq!(to_krw(11.5), Krw(dec!(12)));
        assert_eq!(to_krw(153214.28), Krw(dec!(153214)));
        assert_eq!(to_krw(f64::NAN), Krw::zero());
    }

    #[test]
    fn score_conversion_is_two_places() {
        assert_eq!(to_score(0.85), dec!(0.85));
        assert_eq!(to_score(0.581), dec!(0.58));
        assert!((from_decimal(dec!(0.7)) - 0.7).abs() < 1e-12);
    }
}
