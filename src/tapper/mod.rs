//! Mini-app automation for a single account.
//!
//! Obtains a web-app auth payload through Telegram, uses it as a bearer
//! token against the Cats API and runs the daily actions on a timer.

pub mod agents;
pub mod api;
pub mod auth;
pub mod avatar;
mod guard;
pub mod models;
pub mod proxy;
mod runner;
pub mod session;
pub mod tasks;

pub use api::{ApiError, CatsApi, RequestConfig};
pub use auth::{AuthError, Authenticator, TelegramAuthenticator, WebAppAuth};
pub use guard::suppress;
pub use proxy::{ProxyError, ProxySpec};
pub use runner::{AvatarOutcome, CycleError, CycleReport, Pacing, Tapper, TapperError};
pub use session::{Session, TokenState};
