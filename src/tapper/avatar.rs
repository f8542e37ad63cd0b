//! Daily avatar quest timing.
//!
//! An upload is allowed again at the first reset (03:00 UTC) that falls at
//! least one full day after the previous attempt.

use chrono::{DateTime, Duration, NaiveTime, Utc};

/// Hour of the daily reset, UTC.
pub const RESET_HOUR: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarEligibility {
    Eligible,
    Wait(std::time::Duration),
}

/// First reset at or after `attempt + 24h`.
#[must_use]
pub fn next_reset_after(attempt: DateTime<Utc>) -> DateTime<Utc> {
    let earliest = attempt + Duration::days(1);
    let reset_time = NaiveTime::from_hms_opt(RESET_HOUR, 0, 0).unwrap_or_default();
    let candidate = earliest.date_naive().and_time(reset_time).and_utc();
    if candidate < earliest {
        candidate + Duration::days(1)
    } else {
        candidate
    }
}

/// Whether an avatar can be uploaded at `now`.
#[must_use]
pub fn avatar_eligibility(attempt: Option<DateTime<Utc>>, now: DateTime<Utc>) -> AvatarEligibility {
    let Some(attempt) = attempt else {
        return AvatarEligibility::Eligible;
    };

    let reset = next_reset_after(attempt);
    if now >= reset {
        return AvatarEligibility::Eligible;
    }

    (reset - now)
        .to_std()
        .map_or(AvatarEligibility::Eligible, AvatarEligibility::Wait)
}

/// Renders a wait as `Hh Mm Ss`.
#[must_use]
pub fn format_wait(wait: std::time::Duration) -> String {
    let total = wait.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours}h {minutes}m {seconds}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_no_previous_attempt_is_eligible() {
        assert_eq!(
            avatar_eligibility(None, at("2024-01-02T12:00:00Z")),
            AvatarEligibility::Eligible
        );
    }

    #[test]
    fn test_reset_is_first_three_am_after_a_full_day() {
        assert_eq!(
            next_reset_after(at("2024-01-01T10:00:00Z")),
            at("2024-01-03T03:00:00Z")
        );
        assert_eq!(
            next_reset_after(at("2024-01-01T01:00:00Z")),
            at("2024-01-02T03:00:00Z")
        );
        assert_eq!(
            next_reset_after(at("2024-01-01T03:00:00Z")),
            at("2024-01-02T03:00:00Z")
        );
    }

    #[test]
    fn test_waits_until_reset() {
        let result = avatar_eligibility(
            Some(at("2024-01-01T10:00:00Z")),
            at("2024-01-02T12:00:00Z"),
        );
        assert_eq!(
            result,
            AvatarEligibility::Wait(std::time::Duration::from_secs(15 * 3600))
        );
    }

    #[test]
    fn test_eligible_after_reset() {
        assert_eq!(
            avatar_eligibility(
                Some(at("2024-01-01T10:00:00Z")),
                at("2024-01-03T03:00:00Z")
            ),
            AvatarEligibility::Eligible
        );
    }

    #[test]
    fn test_format_wait() {
        assert_eq!(
            format_wait(std::time::Duration::from_secs(15 * 3600 + 61)),
            "15h 1m 1s"
        );
    }
}
