//! affiliate-engine - affiliate attribution and commission settlement
//!
//! Tracks referral clicks behind an encrypted first-party cookie, attributes
//! ticket purchases to referral links, splits each ticket price into platform
//! fee, agency, affiliate and tier-2 commissions, and batches the resulting
//! earnings into payouts.
//!
//! # Architecture
//! - `tracking`: cookie codec, client classification, click tracker
//! - `services`: attribution, commission calculator, conversion recorder and
//!   the link / commission-config / payout / performance services
//! - `jobs`: payout scheduler and performance cache refresher
//! - `storage`: domain models and the SeaORM backend
//! - `api`: HTTP middleware and endpoints
//! - `config`: static configuration
//! - `runtime`: application lifecycle and execution modes
//! - `system`: logging

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod tracking;
pub mod utils;
