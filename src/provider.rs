//! Typed view of the api-football v3 payloads.
//!
//! Everything coming off the wire is parsed here; downstream code never
//! inspects raw JSON for field presence.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FetchError;
use crate::model::MatchStatus;

/// The api-football envelope. `T` is the per-endpoint item; fixtures by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse<T = Fixture> {
    #[serde(default = "Vec::new")]
    pub response: Vec<T>,
    // Either `[]` or an object such as `{"requests": "..."}`.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub errors: Value,
}

impl<T> Default for ProviderResponse<T> {
    fn default() -> Self {
        Self::from_items(Vec::new())
    }
}

impl<T> ProviderResponse<T> {
    pub fn from_items(response: Vec<T>) -> Self {
        Self {
            response,
            errors: Value::Null,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.response.is_empty()
    }

    /// The quota message api-football embeds in an otherwise successful body.
    pub fn rate_limit_error(&self) -> Option<String> {
        let requests = self.errors.get("requests")?;
        match requests {
            Value::String(msg) => Some(msg.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub fixture: FixtureInfo,
    pub teams: Teams,
    #[serde(default)]
    pub goals: Goals,
    pub league: LeagueInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureInfo {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub date: DateTime<Utc>,
    pub status: FixtureStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureStatus {
    pub short: String,
    #[serde(default)]
    pub elapsed: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teams {
    pub home: TeamRef,
    pub away: TeamRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRef {
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Goals {
    #[serde(default)]
    pub home: Option<u8>,
    #[serde(default)]
    pub away: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueInfo {
    pub name: String,
}

/// Which shape of fixture the provider handed us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureKind {
    Live,
    Finished,
    Scheduled,
    Other,
}

impl Fixture {
    pub fn status(&self) -> MatchStatus {
        MatchStatus::from_short_code(&self.fixture.status.short)
    }

    pub fn kind(&self) -> FixtureKind {
        match self.status() {
            MatchStatus::Live | MatchStatus::Halftime => FixtureKind::Live,
            MatchStatus::Finished => FixtureKind::Finished,
            MatchStatus::NotStarted => FixtureKind::Scheduled,
            MatchStatus::Postponed | MatchStatus::Cancelled => FixtureKind::Other,
        }
    }
}

/// `/standings` item: one league with its groups, each an ordered table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueStandings {
    pub league: StandingsLeague,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingsLeague {
    #[serde(default)]
    pub id: Option<u32>,
    pub name: String,
    #[serde(default)]
    pub season: Option<u16>,
    #[serde(default)]
    pub standings: Vec<Vec<StandingRow>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingRow {
    pub rank: u32,
    pub team: StandingTeam,
    pub points: i32,
    #[serde(default)]
    pub goals_diff: i32,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default)]
    pub all: RecordLine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingTeam {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordLine {
    pub played: u32,
    pub win: u32,
    pub draw: u32,
    pub lose: u32,
    pub goals: GoalTally,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalTally {
    #[serde(rename = "for")]
    pub scored: u32,
    pub against: u32,
}

/// `/teams` item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamEntry {
    pub team: TeamDetail,
    #[serde(default)]
    pub venue: Option<VenueDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDetail {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub founded: Option<u16>,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueDetail {
    pub name: Option<String>,
    pub city: Option<String>,
    pub capacity: Option<u32>,
}

pub fn parse_provider_json(raw: &str) -> Result<ProviderResponse, FetchError> {
    parse_provider_payload(raw)
}

/// Any envelope; blank and `null` bodies read as an empty response.
pub fn parse_provider_payload<T: DeserializeOwned>(
    raw: &str,
) -> Result<ProviderResponse<T>, FetchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(ProviderResponse::default());
    }
    serde_json::from_str(trimmed).map_err(|err| FetchError::Decode(err.to_string()))
}

/// Outcome of the `/status` probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyStatus {
    pub valid: bool,
    pub message: String,
    pub requests: Option<u64>,
    pub requests_limit: Option<u64>,
}

pub fn parse_status_json(raw: &str) -> Result<ApiKeyStatus, FetchError> {
    let root: Value =
        serde_json::from_str(raw.trim()).map_err(|err| FetchError::Decode(err.to_string()))?;
    if let Some(limit) = root.get("errors").and_then(|e| e.get("requests")) {
        return Ok(ApiKeyStatus {
            valid: false,
            message: format!("request limit exceeded: {}", limit.as_str().unwrap_or_default()),
            requests: None,
            requests_limit: None,
        });
    }
    let requests = root.get("response").and_then(|r| r.get("requests"));
    Ok(ApiKeyStatus {
        valid: true,
        message: "api key valid".to_string(),
        requests: requests
            .and_then(|r| r.get("current"))
            .and_then(Value::as_u64),
        requests_limit: requests
            .and_then(|r| r.get("limit_day"))
            .and_then(Value::as_u64),
    })
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "fixture id must be a string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_quota_error_is_detected() {
        let raw = r#"{"errors":{"requests":"You have reached the request limit for the day"},"response":[]}"#;
        let parsed = parse_provider_json(raw).unwrap();
        assert_eq!(
            parsed.rate_limit_error().as_deref(),
            Some("You have reached the request limit for the day")
        );
    }

    #[test]
    fn empty_errors_array_is_not_a_rate_limit() {
        let parsed = parse_provider_json(r#"{"errors":[],"response":[]}"#).unwrap();
        assert!(parsed.rate_limit_error().is_none());
        assert!(parsed.is_empty());
    }

    #[test]
    fn blank_body_parses_as_empty() {
        assert!(parse_provider_json("  ").unwrap().is_empty());
    }
}
