//! Mode routing
//!
//! - Server mode (HTTP server + background jobs)
//! - CLI mode (one-shot job runs)

pub mod cli;
pub mod server;

pub use cli::{run_payouts_once, run_performance_once};
pub use server::run_server;
