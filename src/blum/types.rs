//! Wire types of the mini-app API.
//!
//! Amounts arrive as decimal strings and timestamps as Unix milliseconds,
//! sometimes as strings too; both are accepted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Option::<NumberOrString>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(NumberOrString::as_f64).unwrap_or(0.0))
}

#[allow(clippy::cast_possible_truncation)]
fn lenient_millis<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Option::<NumberOrString>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(NumberOrString::as_f64)
        .filter(|ms| *ms > 0.0)
        .and_then(|ms| DateTime::from_timestamp_millis(ms as i64)))
}

/// Request body of the mini-app login.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub query: &'a str,
}

/// Access and refresh tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Response of the mini-app login.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: TokenPair,
}

/// Request body of a token refresh.
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Current farming period.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Farming {
    #[serde(default, deserialize_with = "lenient_millis")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_millis")]
    pub end_time: Option<DateTime<Utc>>,
}

/// `user/balance`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub available_balance: f64,
    #[serde(default)]
    pub play_passes: u32,
    #[serde(default)]
    pub farming: Option<Farming>,
}

/// `time/now`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerTime {
    #[serde(default, deserialize_with = "lenient_millis")]
    pub now: Option<DateTime<Utc>>,
}

/// `farming/claim`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmingClaim {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub available_balance: f64,
    #[serde(default)]
    pub play_passes: Option<u32>,
}

/// `friends/balance`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendsBalance {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount_for_claim: f64,
    #[serde(default)]
    pub can_claim: bool,
    #[serde(default, deserialize_with = "lenient_millis")]
    pub can_claim_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub used_invitation: u32,
}

/// `friends/claim`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendsClaim {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub claim_balance: f64,
}

/// `game/play`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStarted {
    pub game_id: String,
}

/// Request body of `game/claim`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameClaim<'a> {
    pub game_id: &'a str,
    pub points: u32,
}

/// Reward of one day of the daily streak.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyReward {
    #[serde(default)]
    pub passes: u32,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub points: f64,
}

/// One day of the daily streak.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyDay {
    /// Position of the day in the streak.
    #[serde(default)]
    pub original: u32,
    #[serde(default)]
    pub reward: DailyReward,
}

/// `daily-reward` info.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyInfo {
    #[serde(default)]
    pub days: Vec<DailyDay>,
}
