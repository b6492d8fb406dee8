use chrono::NaiveDate;
use serde::Deserialize;

use super::{Price, ValidationError};

const NAME_MAX_CHARS: usize = 120;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw dashboard form. Missing fields deserialize as blank so that they are
/// reported by validation instead of rejected by the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: String,
    #[serde(default, alias = "renewal_date")]
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionName(String);

impl SubscriptionName {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if name.chars().count() > NAME_MAX_CHARS {
            return Err(ValidationError::NameTooLong {
                max: NAME_MAX_CHARS,
            });
        }
        Ok(Self(name.to_string()))
    }
}

impl AsRef<str> for SubscriptionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A subscription that passed validation and can be handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub name: SubscriptionName,
    pub price: Price,
    pub renewal_date: Option<NaiveDate>,
}

impl TryFrom<SubscriptionForm> for NewSubscription {
    type Error = ValidationError;

    fn try_from(form: SubscriptionForm) -> Result<Self, Self::Error> {
        let name = SubscriptionName::parse(&form.name)?;
        let price = Price::parse(&form.price)?;
        let date = form.date.trim();
        let renewal_date = if date.is_empty() {
            None
        } else {
            Some(
                NaiveDate::parse_from_str(date, DATE_FORMAT)
                    .map_err(|_| ValidationError::InvalidDate)?,
            )
        };
        Ok(Self {
            name,
            price,
            renewal_date,
        })
    }
}
