pub mod schema;
pub mod subscription;
pub mod user;

pub use subscription::{InsertOutcome, SubscriptionRepository};
pub use user::UserRepository;
