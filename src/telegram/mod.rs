//! Telegram client wrapper module.
//!
//! Provides the `MTProto` side of the tapper: session authorization,
//! mini-app web view requests and flood wait handling.

mod client;
mod flood_wait;

pub use client::{
    BotPeer, PwdToken as PasswordToken, TelegramClient, TelegramError, Token as LoginToken,
};
pub use flood_wait::FloodWaitPolicy;
