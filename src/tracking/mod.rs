//! 推广点击追踪：cookie 编解码、访客分类、点击记录

pub mod classifier;
pub mod codec;
pub mod tracker;

pub use codec::{CookieCodec, TrackingPayload};
pub use tracker::{ClickContext, ClickRecord, ClickTracker, SkipReason, TrackingOutcome};
