//! Web-app authentication handshake.
//!
//! The backend trusts the signed `tgWebAppData` blob Telegram hands to a
//! mini app when it is opened. The handshake opens the app through the
//! user's own account and pulls that blob out of the launch URL.

use async_trait::async_trait;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{FALLBACK_REFERRAL_CODE, REFERRAL_WEIGHTS, TelegramConfig};
use crate::telegram::{FloodWaitPolicy, TelegramClient, TelegramError};

/// Bot hosting the mini app.
pub const BOT_USERNAME: &str = "catsgang_bot";
/// Short name of the mini app.
pub const APP_SHORT_NAME: &str = "join";
pub const WEB_VIEW_PLATFORM: &str = "android";

const DATA_MARKER: &str = "tgWebAppData=";
const VERSION_MARKER: &str = "&tgWebAppVersion";

#[derive(Debug, Error)]
pub enum AuthError {
    /// The stored session was rejected; the account cannot continue.
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("Web app URL has no tgWebAppData section")]
    MalformedWebAppUrl,

    #[error("Web app data is not valid UTF-8 after decoding")]
    InvalidEncoding,

    #[error(transparent)]
    Telegram(#[from] TelegramError),
}

impl AuthError {
    /// Only a rejected session ends the account loop.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidSession(_))
    }
}

/// Result of a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAppAuth {
    /// Referral code the app was opened with.
    pub referral_code: String,
    /// Decoded `tgWebAppData`, used as the bearer payload.
    pub init_data: String,
    pub telegram_user_id: i64,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self) -> Result<WebAppAuth, AuthError>;
}

/// Picks the configured referral code or the fallback one, 85 to 15.
pub fn choose_referral_code<R: Rng + ?Sized>(rng: &mut R, configured: &str) -> String {
    let choices = [configured, FALLBACK_REFERRAL_CODE];
    WeightedIndex::new(REFERRAL_WEIGHTS)
        .map_or(configured, |dist| choices[dist.sample(rng)])
        .to_owned()
}

/// Extracts and percent-decodes the payload between `tgWebAppData=` and
/// `&tgWebAppVersion`.
pub fn extract_web_app_data(url: &str) -> Result<String, AuthError> {
    let (_, rest) = url
        .split_once(DATA_MARKER)
        .ok_or(AuthError::MalformedWebAppUrl)?;
    let (encoded, _) = rest
        .split_once(VERSION_MARKER)
        .ok_or(AuthError::MalformedWebAppUrl)?;
    urlencoding::decode(encoded)
        .map(std::borrow::Cow::into_owned)
        .map_err(|_| AuthError::InvalidEncoding)
}

/// Runs the handshake through the user's Telegram session.
#[derive(Debug, Clone)]
pub struct TelegramAuthenticator {
    config: TelegramConfig,
    referral_code: String,
    flood_wait: FloodWaitPolicy,
}

impl TelegramAuthenticator {
    #[must_use]
    pub fn new(config: TelegramConfig, referral_code: String) -> Self {
        Self {
            config,
            referral_code,
            flood_wait: FloodWaitPolicy::default(),
        }
    }

    #[must_use]
    pub const fn with_flood_wait(mut self, policy: FloodWaitPolicy) -> Self {
        self.flood_wait = policy;
        self
    }

    async fn handshake(&self, client: &TelegramClient) -> Result<WebAppAuth, AuthError> {
        match client.is_authorized().await {
            Ok(true) => {}
            Ok(false) => return Err(AuthError::InvalidSession("not authorized".to_owned())),
            Err(e) if e.is_invalid_session() => return Err(AuthError::InvalidSession(e.to_string())),
            Err(e) => return Err(e.into()),
        }

        let bot = self
            .flood_wait
            .run("resolve peer", move || client.resolve_bot(BOT_USERNAME))
            .await
            .map_err(session_fault)?;

        let referral_code = choose_referral_code(&mut rand::thread_rng(), &self.referral_code);
        debug!("Opening {} with referral {}", APP_SHORT_NAME, referral_code);

        let start_param = referral_code.as_str();
        let url = self
            .flood_wait
            .run("request web view", move || {
                client.request_app_web_view(bot, APP_SHORT_NAME, start_param, WEB_VIEW_PLATFORM)
            })
            .await
            .map_err(session_fault)?;

        let init_data = extract_web_app_data(&url)?;
        let telegram_user_id = client.self_id().await.map_err(session_fault)?;

        Ok(WebAppAuth {
            referral_code,
            init_data,
            telegram_user_id,
        })
    }
}

fn session_fault(err: TelegramError) -> AuthError {
    if err.is_invalid_session() {
        AuthError::InvalidSession(err.to_string())
    } else {
        AuthError::Telegram(err)
    }
}

#[async_trait]
impl Authenticator for TelegramAuthenticator {
    async fn authenticate(&self) -> Result<WebAppAuth, AuthError> {
        let client = TelegramClient::connect(&self.config).await.map_err(session_fault)?;
        let result = self.handshake(&client).await;
        client.disconnect();

        if result.is_ok() {
            info!("Obtained web app data");
        }
        result
    }
}
