mod email;
mod new_subscription;
mod price;

pub use email::UserEmail;
pub use new_subscription::{NewSubscription, SubscriptionForm, SubscriptionName};
pub use price::Price;

use thiserror::Error;

/// Rejections produced while turning raw form input into typed commands.
///
/// The `Display` text is shown to the user as-is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a name for the subscription.")]
    EmptyName,

    #[error("Subscription names are limited to {max} characters.")]
    NameTooLong { max: usize },

    #[error("Price must be a number.")]
    InvalidPrice,

    #[error("Price cannot be negative.")]
    NegativePrice,

    #[error("Price can have at most two decimal places.")]
    TooPrecise,

    #[error("Price cannot exceed 9999999999.99.")]
    PriceTooLarge,

    #[error("Date must be in YYYY-MM-DD format.")]
    InvalidDate,

    #[error("Email is required.")]
    EmptyEmail,
}
