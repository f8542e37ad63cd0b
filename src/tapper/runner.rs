//! The account loop.
//!
//! Each iteration:
//! 1. Refresh the web-app token when it is missing or older than an hour,
//!    logging in (and registering if needed) with the new token
//! 2. Claim every task that can be completed automatically
//! 3. Run the avatar quest (three times with an OG pass, once otherwise)
//! 4. Report whether withdrawal is available
//!
//! Steps 2-4 are best-effort: a failing request is logged and the loop moves
//! on. Only a rejected Telegram session stops the loop.

use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;
use tracing::{error, info, warn};

use super::api::{ApiError, CatsApi, RequestConfig};
use super::auth::{AuthError, Authenticator};
use super::avatar::{AvatarEligibility, avatar_eligibility, format_wait};
use super::guard::suppress;
use super::models::{User, display_points};
use super::session::Session;
use super::tasks::{SkipReason, TaskPlan, plan_task};
use crate::config::{AnswerBook, SecondsRange, TapperSettings};

/// Errors that end the account loop.
#[derive(Debug, Error)]
pub enum TapperError {
    #[error("Invalid session {session}: {reason}")]
    InvalidSession { session: String, reason: String },
}

/// Why a single iteration stopped early.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("authentication failed: {0}")]
    Auth(AuthError),

    #[error("login failed")]
    LoginFailed,

    #[error("could not build HTTP client: {0}")]
    Client(#[from] ApiError),
}

/// Delays used by the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Applied once before the first iteration.
    pub startup_delay: Option<SecondsRange>,
    /// Idle time between iterations.
    pub idle: SecondsRange,
    pub between_tasks: SecondsRange,
    pub between_avatar_uploads: SecondsRange,
    /// Pause after a failed step.
    pub step_pause: Duration,
    /// Pause after a failed iteration.
    pub cycle_pause: Duration,
    /// Cooldown when no user record exists even after registering.
    pub login_cooldown: Duration,
    /// Wait between registering and re-reading the user record.
    pub registration_wait: Duration,
}

impl Pacing {
    #[must_use]
    pub fn from_settings(settings: &TapperSettings) -> Self {
        Self {
            startup_delay: settings
                .use_random_delay_in_run
                .then_some(settings.random_delay_in_run),
            idle: settings.sleep_time,
            between_tasks: SecondsRange { min: 5, max: 7 },
            between_avatar_uploads: SecondsRange { min: 5, max: 7 },
            step_pause: Duration::from_secs(1),
            cycle_pause: Duration::from_secs(3),
            login_cooldown: Duration::from_secs(300),
            registration_wait: Duration::from_secs(5),
        }
    }

    /// No waiting at all.
    #[must_use]
    pub const fn immediate() -> Self {
        let zero = SecondsRange { min: 0, max: 0 };
        Self {
            startup_delay: None,
            idle: zero,
            between_tasks: zero,
            between_avatar_uploads: zero,
            step_pause: Duration::ZERO,
            cycle_pause: Duration::ZERO,
            login_cooldown: Duration::ZERO,
            registration_wait: Duration::ZERO,
        }
    }
}

/// Picks a uniformly random whole-second delay in `range`.
#[must_use]
pub fn random_delay(range: SecondsRange) -> Duration {
    Duration::from_secs(rand::thread_rng().gen_range(range.min..=range.max))
}

/// What happened during one avatar attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AvatarOutcome {
    Uploaded { rewards: f64 },
    Waiting(Duration),
}

/// Summary of one iteration, mostly for logging and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Whether the web-app handshake ran this iteration.
    pub reauthenticated: bool,
    pub tasks_submitted: usize,
    pub tasks_done: usize,
    pub avatar_attempts: u32,
    pub avatar_outcomes: Vec<AvatarOutcome>,
    pub withdrawal_available: Option<bool>,
}

/// Automation loop for one account.
pub struct Tapper<A> {
    session: Session,
    authenticator: A,
    request: RequestConfig,
    answers: AnswerBook,
    pacing: Pacing,
}

impl<A: Authenticator> Tapper<A> {
    #[must_use]
    pub fn new(
        session: Session,
        authenticator: A,
        request: RequestConfig,
        answers: AnswerBook,
        pacing: Pacing,
    ) -> Self {
        Self {
            session,
            authenticator,
            request,
            answers,
            pacing,
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs until the Telegram session is rejected.
    pub async fn run(mut self) -> Result<(), TapperError> {
        if let Some(range) = self.pacing.startup_delay {
            let delay = random_delay(range);
            info!("Bot will start in {}s", delay.as_secs());
            tokio::time::sleep(delay).await;
        }

        if self.session.proxy.is_some() {
            self.check_proxy().await;
        }

        loop {
            match self.run_cycle().await {
                Ok(report) => {
                    info!(
                        "Cycle finished: {} tasks submitted, {} done, {} avatar attempts",
                        report.tasks_submitted, report.tasks_done, report.avatar_attempts
                    );
                }
                Err(CycleError::Auth(e)) if e.is_fatal() => {
                    return Err(TapperError::InvalidSession {
                        session: self.session.name.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(CycleError::LoginFailed) => {
                    error!("Failed to login");
                    info!("Sleep {}s", self.pacing.login_cooldown.as_secs());
                    tokio::time::sleep(self.pacing.login_cooldown).await;
                    continue;
                }
                Err(e) => {
                    error!("Unknown error: {}", e);
                    tokio::time::sleep(self.pacing.cycle_pause).await;
                }
            }

            let idle = random_delay(self.pacing.idle);
            info!("Sleep {}s", idle.as_secs());
            tokio::time::sleep(idle).await;
        }
    }

    async fn check_proxy(&self) {
        let Ok(api) = self.request.build_client() else {
            warn!("Could not build client for proxy check");
            return;
        };
        if let Some(ip) = suppress("proxy check", self.pacing.step_pause, api.check_proxy_ip()).await {
            info!("Proxy IP: {}", ip);
        }
    }

    /// Runs one iteration using the current time.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        self.run_cycle_at(Instant::now()).await
    }

    /// Runs one iteration as if the clock read `now`.
    pub async fn run_cycle_at(&mut self, now: Instant) -> Result<CycleReport, CycleError> {
        let mut report = CycleReport::default();

        let (api, user) = if self.session.token.needs_refresh(now) {
            report.reauthenticated = true;
            self.reauthenticate(now).await?
        } else {
            let api = self.authorized_client()?;
            let user = self.session.user.clone().ok_or(CycleError::LoginFailed)?;
            (api, user)
        };

        info!(
            "User ID: {} | Telegram Age: {} | Points: {}",
            user.id,
            display_points(user.telegram_age),
            display_points(user.total_rewards)
        );
        info!("User has OG Pass: {}", user.has_og_pass);

        self.run_tasks(&api, &mut report).await;

        let repetitions = if user.has_og_pass { 3 } else { 1 };
        for _ in 0..repetitions {
            report.avatar_attempts += 1;
            let outcome = suppress("avatar quest", self.pacing.step_pause, self.avatar_quest(&api)).await;
            if let Some(outcome) = outcome {
                if let AvatarOutcome::Uploaded { rewards } = outcome {
                    info!("Reward from Avatar quest: {}", rewards);
                }
                report.avatar_outcomes.push(outcome);
            }
            tokio::time::sleep(random_delay(self.pacing.between_avatar_uploads)).await;
        }

        if let Some(status) =
            suppress("withdrawal check", self.pacing.step_pause, api.check_withdrawal()).await
        {
            info!("Available withdrawal: {}", status.is_available);
            report.withdrawal_available = Some(status.is_available);
        }

        Ok(report)
    }

    fn authorized_client(&self) -> Result<CatsApi, ApiError> {
        match self.session.token.payload() {
            Some(payload) => self.request.authorized(payload).build_client(),
            None => self.request.build_client(),
        }
    }

    async fn reauthenticate(&mut self, now: Instant) -> Result<(CatsApi, User), CycleError> {
        if self.session.token.was_issued() {
            info!("Token expired, refreshing...");
        }
        self.session.token.clear();

        let auth = self.authenticator.authenticate().await.map_err(CycleError::Auth)?;
        self.session.telegram_user_id = Some(auth.telegram_user_id);

        let api = self.request.authorized(&auth.init_data).build_client()?;
        let user = match self.login(&api, &auth.referral_code).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(CycleError::LoginFailed),
            Err(e) => {
                error!("Login request failed: {}", e);
                return Err(CycleError::LoginFailed);
            }
        };

        info!("Successfully logged in");
        self.session.token.issue(auth.init_data, now);
        self.session.user = Some(user.clone());
        Ok((api, user))
    }

    async fn login(&self, api: &CatsApi, referral_code: &str) -> Result<Option<User>, ApiError> {
        if let Some(user) = api.get_user().await? {
            return Ok(Some(user));
        }

        info!("User not found. Registering...");
        api.create_user(referral_code).await?;
        tokio::time::sleep(self.pacing.registration_wait).await;
        api.get_user().await
    }

    /// Re-reads the user record, keeping the cached one if the read fails.
    async fn run_tasks(&self, api: &CatsApi, report: &mut CycleReport) {
        let Some(list) = suppress("task fetch", self.pacing.step_pause, api.get_tasks()).await else {
            return;
        };
        if list.tasks.is_empty() {
            error!("No tasks");
            return;
        }

        for task in &list.tasks {
            let (endpoint, answer) = match plan_task(task, &self.answers) {
                TaskPlan::Submit { endpoint, answer } => (endpoint, answer),
                TaskPlan::Skip(SkipReason::NoKnownAnswer) => {
                    info!("Skipping task {} - No answer available", task.id);
                    continue;
                }
                TaskPlan::Skip(_) => continue,
            };
            if let Some(answer) = &answer {
                info!("Answer found for '{}': {}", task.title, answer);
            }

            report.tasks_submitted += 1;
            let outcome = suppress(
                "task completion",
                self.pacing.step_pause,
                api.complete_task(&task.id, endpoint, answer.as_deref()),
            )
            .await;
            if outcome.is_some_and(|o| o.is_done()) {
                report.tasks_done += 1;
                info!(
                    "Task {} done! Reward: {}",
                    task.title,
                    display_points(task.reward_points)
                );
            }

            tokio::time::sleep(random_delay(self.pacing.between_tasks)).await;
        }
    }

    async fn avatar_quest(&self, api: &CatsApi) -> Result<AvatarOutcome, ApiError> {
        let info = api.get_avatar().await?;
        match avatar_eligibility(info.attempt_time, chrono::Utc::now()) {
            AvatarEligibility::Wait(wait) => {
                info!("Time until next avatar upload: {}", format_wait(wait));
                Ok(AvatarOutcome::Waiting(wait))
            }
            AvatarEligibility::Eligible => {
                let image = api.fetch_cat_image().await?;
                let upgrade = api.upgrade_avatar(image).await?;
                Ok(AvatarOutcome::Uploaded {
                    rewards: upgrade.rewards,
                })
            }
        }
    }
}

impl<A> std::fmt::Debug for Tapper<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tapper")
            .field("session", &self.session.name)
            .field("pacing", &self.pacing)
            .finish_non_exhaustive()
    }
}
