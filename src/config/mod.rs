//! Configuration module for the tapper.
//!
//! Handles loading of Telegram API credentials, loop timing settings
//! and the quiz answer book.

mod answers;
mod settings;

pub use answers::{AnswerBook, AnswerError, QuizAnswer};
pub use settings::{ConfigError, SecondsRange, TapperSettings, TelegramConfig};

/// Referral code used for a share of registrations.
pub const FALLBACK_REFERRAL_CODE: &str = "rfFNTns6NAJuGvXDkG_tv";

/// Weight of the configured referral code against the fallback one.
pub const REFERRAL_WEIGHTS: [u32; 2] = [85, 15];
