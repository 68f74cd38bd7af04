//! Data models shared by the cache manager and its substrates.
//!
//! - `Request`, `Response`: The intercepted request and a response snapshot
//! - `CachedEntry`: A stored request/response pair with its age
//! - `Notification`, `NotificationOptions`: What a push message displays

pub mod entry;
pub mod notification;
pub mod request;
pub mod response;

pub use entry::CachedEntry;
pub use notification::{Notification, NotificationAction, NotificationData, NotificationOptions};
pub use request::Request;
pub use response::Response;
