pub mod auth;
pub mod click_tracking;
pub mod request_id;

pub use auth::AdminAuth;
pub use click_tracking::ClickTracking;
pub use request_id::{RequestId, RequestIdMiddleware};
