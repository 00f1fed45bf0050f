pub mod client;
pub mod error;

pub use belltower_core::*;
pub use client::NotificationsClient;
pub use error::{SdkError, SdkResult};
