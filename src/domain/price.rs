use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ValidationError;

const MAX_SCALE: u32 = 2;

/// 9 999 999 999.99
const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// A non-negative amount with at most two fractional digits, capped at
/// [`Price::MAX`] for new input.
///
/// Stored as text so the exact decimal survives a round trip through SQLite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Price = Price(Decimal::ZERO);
    pub const MAX: Price = Price(MAX_AMOUNT);

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::InvalidPrice);
        }
        let amount = Decimal::from_str(raw).map_err(|_| ValidationError::InvalidPrice)?;
        Self::try_from(amount)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    fn checked(amount: Decimal) -> Result<Self, ValidationError> {
        if amount < Decimal::ZERO {
            return Err(ValidationError::NegativePrice);
        }
        let amount = amount.normalize();
        if amount.scale() > MAX_SCALE {
            return Err(ValidationError::TooPrecise);
        }
        Ok(Self(amount))
    }
}

impl TryFrom<Decimal> for Price {
    type Error = ValidationError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        let price = Self::checked(amount)?;
        if price > Self::MAX {
            return Err(ValidationError::PriceTooLarge);
        }
        Ok(price)
    }
}

// Used by sqlx when decoding the `price` column. Rows written before the cap
// existed may exceed it and must still load.
impl TryFrom<String> for Price {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let amount = Decimal::from_str(value.trim()).map_err(|_| ValidationError::InvalidPrice)?;
        Self::checked(amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
