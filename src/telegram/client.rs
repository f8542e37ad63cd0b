//! Telegram client wrapper for web-app authentication.

use std::sync::Arc;

use grammers_client::client::{LoginToken, PasswordToken};
use grammers_client::{Client, InvocationError, SenderPool, SignInError, sender};
use grammers_session::storages::SqliteSession;
use grammers_tl_types as tl;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::TelegramConfig;

/// Re-export types for external use.
pub use grammers_client::client::{LoginToken as Token, PasswordToken as PwdToken};

/// RPC error names meaning the stored session can no longer be used.
const INVALID_SESSION_ERRORS: [&str; 7] = [
    "AUTH_KEY_UNREGISTERED",
    "AUTH_KEY_INVALID",
    "USER_DEACTIVATED",
    "USER_DEACTIVATED_BAN",
    "SESSION_REVOKED",
    "SESSION_EXPIRED",
    "UNAUTHORIZED",
];

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Not authorized. Please sign in first.")]
    NotAuthorized,

    #[error("Session is no longer valid: {0}")]
    InvalidSession(String),

    #[error("Sign in failed: {0}")]
    SignInFailed(String),

    #[error("Password required for 2FA")]
    PasswordRequired(PasswordToken),

    #[error("Invalid password")]
    InvalidPassword(PasswordToken),

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Peer not found: {0}")]
    PeerNotFound(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("API invocation error: {0}")]
    Invocation(String),
}

impl From<InvocationError> for TelegramError {
    fn from(err: InvocationError) -> Self {
        if let InvocationError::Rpc(rpc) = &err
            && let Some(classified) = classify_rpc(&rpc.name, rpc.value)
        {
            return classified;
        }

        let err_str = err.to_string();

        if (err_str.contains("FLOOD_WAIT") || err_str.contains("flood"))
            && let Some(seconds) = extract_flood_wait_seconds(&err_str)
        {
            return Self::FloodWait(seconds);
        }

        if let Some(name) = INVALID_SESSION_ERRORS
            .iter()
            .find(|name| err_str.contains(*name))
        {
            return Self::InvalidSession((*name).to_owned());
        }

        Self::Invocation(err_str)
    }
}

impl TelegramError {
    /// Whether the session must be discarded rather than retried.
    #[must_use]
    pub const fn is_invalid_session(&self) -> bool {
        matches!(self, Self::InvalidSession(_) | Self::NotAuthorized)
    }
}

/// Maps a named RPC error onto the variants the tapper reacts to.
fn classify_rpc(name: &str, value: Option<u32>) -> Option<TelegramError> {
    if name == "FLOOD_WAIT" || name == "FLOOD_PREMIUM_WAIT" {
        return Some(TelegramError::FloodWait(value.unwrap_or(0)));
    }
    if INVALID_SESSION_ERRORS.contains(&name) {
        return Some(TelegramError::InvalidSession(name.to_owned()));
    }
    None
}

/// Extracts flood wait seconds from an error message.
fn extract_flood_wait_seconds(err_msg: &str) -> Option<u32> {
    let patterns = ["FLOOD_WAIT_", "flood wait "];
    let lowered = err_msg.to_lowercase();

    for pattern in patterns {
        if let Some(idx) = lowered.find(&pattern.to_lowercase()) {
            let start = idx + pattern.len();
            let num_str: String = err_msg[start..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(seconds) = num_str.parse() {
                return Some(seconds);
            }
        }
    }
    None
}

/// A bot account resolved by username.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotPeer {
    pub user_id: i64,
    pub access_hash: i64,
}

impl BotPeer {
    fn input_peer(self) -> tl::enums::InputPeer {
        tl::enums::InputPeer::User(tl::types::InputPeerUser {
            user_id: self.user_id,
            access_hash: self.access_hash,
        })
    }

    fn input_user(self) -> tl::enums::InputUser {
        tl::enums::InputUser::User(tl::types::InputUser {
            user_id: self.user_id,
            access_hash: self.access_hash,
        })
    }
}

/// High-level Telegram client wrapper.
///
/// One instance corresponds to one live connection; it is created for each
/// authentication handshake and dropped after [`TelegramClient::disconnect`].
pub struct TelegramClient {
    /// The underlying grammers client.
    client: Client,

    /// Handle to the sender pool for disconnection.
    handle: sender::SenderPoolHandle,

    /// Background task running the sender pool.
    _pool_task: JoinHandle<()>,
}

impl TelegramClient {
    /// Connects to Telegram with the given configuration.
    pub async fn connect(config: &TelegramConfig) -> Result<Self, TelegramError> {
        debug!("Connecting to Telegram...");

        let session = Arc::new(
            SqliteSession::open(&config.session_path)
                .await
                .map_err(|e| TelegramError::Session(e.to_string()))?,
        );

        let SenderPool {
            runner,
            updates: _updates,
            handle,
        } = SenderPool::new(Arc::clone(&session), config.api_id);

        let client = Client::new(handle.clone());

        let pool_task = tokio::spawn(async move {
            runner.run().await;
        });

        Ok(Self {
            client,
            handle: handle.thin,
            _pool_task: pool_task,
        })
    }

    /// Checks if the client is authorized.
    pub async fn is_authorized(&self) -> Result<bool, TelegramError> {
        self.client.is_authorized().await.map_err(|e| {
            let err: TelegramError = e.into();
            match err {
                TelegramError::Invocation(msg) => TelegramError::Connection(msg),
                other => other,
            }
        })
    }

    /// Requests a login code to be sent to the phone number.
    pub async fn request_login_code(
        &self,
        phone: &str,
        api_hash: &str,
    ) -> Result<LoginToken, TelegramError> {
        info!("Requesting login code for phone: {}...", mask_phone(phone));

        self.client
            .request_login_code(phone, api_hash)
            .await
            .map_err(|e| TelegramError::SignInFailed(e.to_string()))
    }

    /// Signs in with the login code.
    pub async fn sign_in(&self, token: &LoginToken, code: &str) -> Result<(), TelegramError> {
        info!("Signing in with login code...");

        match self.client.sign_in(token, code).await {
            Ok(_user) => Ok(()),
            Err(SignInError::PasswordRequired(password_token)) => {
                debug!("2FA password required, hint: {:?}", password_token.hint());
                Err(TelegramError::PasswordRequired(password_token))
            }
            Err(SignInError::InvalidCode) => {
                Err(TelegramError::SignInFailed("Invalid code".to_owned()))
            }
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Checks the 2FA password.
    pub async fn check_password(
        &self,
        password_token: PasswordToken,
        password: &str,
    ) -> Result<(), TelegramError> {
        info!("Checking 2FA password...");

        match self.client.check_password(password_token, password).await {
            Ok(_user) => Ok(()),
            Err(SignInError::InvalidPassword(token)) => Err(TelegramError::InvalidPassword(token)),
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Resolves a bot by its public username.
    pub async fn resolve_bot(&self, username: &str) -> Result<BotPeer, TelegramError> {
        let request = tl::functions::contacts::ResolveUsername {
            username: username.to_owned(),
            referer: None,
        };

        let tl::enums::contacts::ResolvedPeer::Peer(resolved) =
            self.client.invoke(&request).await?;

        let tl::enums::Peer::User(peer) = resolved.peer else {
            return Err(TelegramError::PeerNotFound(username.to_owned()));
        };

        resolved
            .users
            .into_iter()
            .find_map(|user| match user {
                tl::enums::User::User(user) if user.id == peer.user_id => user
                    .access_hash
                    .map(|access_hash| BotPeer {
                        user_id: user.id,
                        access_hash,
                    }),
                _ => None,
            })
            .ok_or_else(|| TelegramError::PeerNotFound(username.to_owned()))
    }

    /// Opens the bot's mini app and returns the launch URL.
    pub async fn request_app_web_view(
        &self,
        bot: BotPeer,
        short_name: &str,
        start_param: &str,
        platform: &str,
    ) -> Result<String, TelegramError> {
        debug!("Requesting web view for app '{}'", short_name);

        let request = tl::functions::messages::RequestAppWebView {
            write_allowed: true,
            compact: false,
            fullscreen: false,
            peer: bot.input_peer(),
            app: tl::enums::InputBotApp::ShortName(tl::types::InputBotAppShortName {
                bot_id: bot.input_user(),
                short_name: short_name.to_owned(),
            }),
            start_param: Some(start_param.to_owned()),
            theme_params: None,
            platform: platform.to_owned(),
        };

        match self.client.invoke(&request).await? {
            tl::enums::WebViewResult::Url(result) => Ok(result.url),
        }
    }

    /// Returns the numeric id of the signed-in account.
    pub async fn self_id(&self) -> Result<i64, TelegramError> {
        let request = tl::functions::users::GetUsers {
            id: vec![tl::enums::InputUser::UserSelf],
        };

        let users = self.client.invoke(&request).await?;
        match users.first() {
            Some(tl::enums::User::User(user)) => Ok(user.id),
            _ => Err(TelegramError::UnexpectedResponse(
                "users.getUsers returned no self user".to_owned(),
            )),
        }
    }

    /// Disconnects from Telegram.
    pub fn disconnect(&self) {
        debug!("Disconnecting from Telegram...");
        self.handle.quit();
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient").finish_non_exhaustive()
    }
}

/// Masks a phone number for logging (shows last 4 digits).
fn mask_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > 4 {
        format!("***{}", &digits[digits.len() - 4..])
    } else {
        "****".to_owned()
    }
}
