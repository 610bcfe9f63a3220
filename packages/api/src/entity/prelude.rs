pub use super::app::Entity as App;
pub use super::developer_device_usage::Entity as DeveloperDeviceUsage;
pub use super::developer_subscription::Entity as DeveloperSubscription;
pub use super::push_token::Entity as PushToken;
