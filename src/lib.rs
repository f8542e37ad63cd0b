//! Cats Tapper Library
//!
//! A Telegram mini-app automation client for the Cats backend.
//!
//! This crate provides the core functionality for:
//! - Loading settings and the quiz answer book
//! - Obtaining web-app auth payloads via Telegram `MTProto`
//! - Claiming tasks, uploading the daily avatar and checking withdrawals
//! - Repeating the cycle with randomized delays

pub mod config;
pub mod tapper;
pub mod telegram;
