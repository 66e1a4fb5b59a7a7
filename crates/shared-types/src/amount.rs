//! Decimal coin amounts.
//!
//! Fees and values travel as decimal strings (`"1"`, `"0.25"`). Internally
//! they are fixed-point integers with [`DECIMALS`] fractional digits, stored
//! as a `U256` like every other ledger value.

use crate::errors::AmountError;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fractional digits carried by an [`Amount`].
pub const DECIMALS: usize = 18;

/// A non-negative coin amount in base units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(U256);

impl Amount {
    /// The zero amount.
    pub fn zero() -> Self {
        Self(U256::zero())
    }

    /// Raw base units.
    pub fn base_units(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Add two amounts, `None` on overflow.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Whether `value` parses as a decimal amount.
    pub fn is_numeric(value: &str) -> bool {
        value.parse::<Amount>().is_ok()
    }
}

fn scale() -> U256 {
    U256::exp10(DECIMALS)
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AmountError::Empty);
        }

        let (int_part, frac_part) = match s.split_once('.') {
            Some((int_part, frac_part)) if !frac_part.is_empty() => (int_part, frac_part),
            Some(_) => return Err(AmountError::NotNumeric(s.to_string())),
            None => (s, ""),
        };

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty() || !all_digits(int_part) || !all_digits(frac_part) {
            return Err(AmountError::NotNumeric(s.to_string()));
        }

        if frac_part.len() > DECIMALS {
            return Err(AmountError::TooPrecise {
                value: s.to_string(),
                max: DECIMALS,
            });
        }

        let mut digits = String::with_capacity(int_part.len() + DECIMALS);
        digits.push_str(int_part);
        digits.push_str(frac_part);
        digits.extend(std::iter::repeat('0').take(DECIMALS - frac_part.len()));

        U256::from_dec_str(&digits)
            .map(Amount)
            .map_err(|_| AmountError::Overflow(s.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (int_part, frac_part) = self.0.div_mod(scale());
        if frac_part.is_zero() {
            return write!(f, "{}", int_part);
        }
        let frac = format!("{:0>width$}", frac_part.to_string(), width = DECIMALS);
        write!(f, "{}.{}", int_part, frac.trim_end_matches('0'))
    }
}
