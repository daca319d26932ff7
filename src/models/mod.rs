pub mod conversation;
pub mod subscription;

pub use conversation::ConversationState;
pub use subscription::{is_valid_notification_time, Location, Subscription, SubscriptionRow};
