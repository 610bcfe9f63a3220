mod app;
mod subscription;
mod usage;

pub use app::*;
pub use subscription::*;
pub use usage::*;

/// A registered push token and whether its owner wants notifications.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushToken {
    pub token: String,
    pub enabled: bool,
}
