pub mod shutdown;
pub mod startup;

pub use startup::{AppState, prepare_app_state};
