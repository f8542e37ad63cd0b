//! Response and request bodies of the Cats API.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Account record returned by `GET /user`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,

    #[serde(default)]
    pub telegram_age: Option<f64>,

    #[serde(default)]
    pub total_rewards: Option<f64>,

    /// Premium pass unlocking extra avatar uploads.
    #[serde(default)]
    pub has_og_pass: bool,
}

/// Task identifier; the backend has used both numbers and strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    Number(i64),
    Text(String),
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Task type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    SubscribeToChannel,
    YoutubeWatch,
    OpenLink,
    ActivityChallenge,
    InviteFriends,
    NicknameChange,
    TonTransaction,
    BoostChannel,
    #[serde(other)]
    Other,
}

impl TaskKind {
    /// Kinds that need manual or external action and are never submitted.
    pub const EXCLUDED: [Self; 5] = [
        Self::ActivityChallenge,
        Self::InviteFriends,
        Self::NicknameChange,
        Self::TonTransaction,
        Self::BoostChannel,
    ];

    #[must_use]
    pub fn is_excluded(self) -> bool {
        Self::EXCLUDED.contains(&self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,

    #[serde(rename = "type")]
    pub kind: TaskKind,

    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,

    #[serde(default)]
    pub reward_points: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// Result of a `check` or `complete` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub completed: bool,
}

impl TaskOutcome {
    #[must_use]
    pub const fn is_done(self) -> bool {
        self.success || self.completed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarInfo {
    #[serde(default)]
    pub attempt_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AvatarUpgrade {
    #[serde(default)]
    pub rewards: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalStatus {
    #[serde(default)]
    pub is_available: bool,
}

/// Reads an explicit `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Formats an optional point amount for log lines.
#[must_use]
pub fn display_points(points: Option<f64>) -> String {
    points.map_or_else(|| "-".to_owned(), |p| p.to_string())
}
