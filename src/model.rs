use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NotifyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    NotStarted,
    Live,
    Halftime,
    Finished,
    Postponed,
    Cancelled,
}

impl MatchStatus {
    /// Maps api-football short codes (plus the labels the old site stored) onto a status.
    pub fn from_short_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "1H" | "2H" | "ET" | "BT" | "P" | "LIVE" | "INT" => Self::Live,
            "HT" => Self::Halftime,
            "FT" | "AET" | "PEN" | "FINISHED" => Self::Finished,
            "PST" | "SUSP" | "POSTPONED" => Self::Postponed,
            "CANC" | "ABD" | "AWD" | "WO" | "CANCELLED" => Self::Cancelled,
            _ => Self::NotStarted,
        }
    }

    pub fn is_live(self) -> bool {
        matches!(self, Self::Live | Self::Halftime)
    }

    pub fn short_code(self) -> &'static str {
        match self {
            Self::NotStarted => "NS",
            Self::Live => "LIVE",
            Self::Halftime => "HT",
            Self::Finished => "FT",
            Self::Postponed => "PST",
            Self::Cancelled => "CANC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub home_logo: Option<String>,
    #[serde(default)]
    pub away_logo: Option<String>,
    #[serde(default)]
    pub home_score: Option<u8>,
    #[serde(default)]
    pub away_score: Option<u8>,
    pub status: MatchStatus,
    #[serde(default)]
    pub elapsed: Option<u16>,
    pub competition: String,
    pub kickoff: DateTime<Utc>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub(crate) is_live: bool,
}

impl Match {
    pub fn new(
        id: impl Into<String>,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        competition: impl Into<String>,
        kickoff: DateTime<Utc>,
        status: MatchStatus,
    ) -> Self {
        Self {
            id: id.into(),
            home_team: home_team.into(),
            away_team: away_team.into(),
            home_logo: None,
            away_logo: None,
            home_score: None,
            away_score: None,
            status,
            elapsed: None,
            competition: competition.into(),
            kickoff,
            venue: None,
            is_live: status.is_live(),
        }
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    pub fn set_status(&mut self, status: MatchStatus) {
        self.status = status;
        self.is_live = status.is_live();
    }

    /// Re-derives the live flag after a record was read from storage.
    pub fn sync_live(&mut self) {
        self.is_live = self.status.is_live();
    }

    pub fn with_score(mut self, home: u8, away: u8) -> Self {
        self.home_score = Some(home);
        self.away_score = Some(away);
        self
    }

    pub fn with_elapsed(mut self, minute: u16) -> Self {
        self.elapsed = Some(minute);
        self
    }

    pub fn with_logos(mut self, home: Option<String>, away: Option<String>) -> Self {
        self.home_logo = home;
        self.away_logo = away;
        self
    }

    pub fn with_venue(mut self, venue: Option<String>) -> Self {
        self.venue = venue;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
    Coach,
    Unassigned,
}

impl Position {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Goalkeeper => "goalkeeper",
            Self::Defender => "defender",
            Self::Midfielder => "midfielder",
            Self::Forward => "forward",
            Self::Coach => "coach",
            Self::Unassigned => "unassigned",
        }
    }
}

impl From<String> for Position {
    fn from(raw: String) -> Self {
        // The old site stored Spanish labels.
        match raw.trim().to_lowercase().as_str() {
            "goalkeeper" | "portero" => Self::Goalkeeper,
            "defender" | "defensa" => Self::Defender,
            "midfielder" | "centrocampista" | "mediocampista" => Self::Midfielder,
            "forward" | "delantero" => Self::Forward,
            "coach" | "director técnico" | "director tecnico" => Self::Coach,
            _ => Self::Unassigned,
        }
    }
}

impl From<Position> for String {
    fn from(pos: Position) -> Self {
        pos.as_str().to_string()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerStats {
    pub goals: u32,
    pub assists: u32,
    #[serde(alias = "matches")]
    pub games_played: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: u64,
    pub full_name: String,
    #[serde(default)]
    pub nickname: Option<String>,
    pub jersey_number: u8,
    pub position: Position,
    pub email: String,
    #[serde(default)]
    pub whatsapp: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password_hash: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default = "Utc::now")]
    pub registered_at: DateTime<Utc>,
    #[serde(default)]
    pub stats: PlayerStats,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct News {
    pub id: u64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_published: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    WhatsApp,
}

impl Channel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::WhatsApp => "whatsapp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: u64,
    pub player_id: u64,
    pub channel: Channel,
    pub recipient: String,
    pub message: String,
    pub status: NotificationStatus,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn pending(player_id: u64, channel: Channel, recipient: &str, message: &str) -> Self {
        Self {
            id: 0,
            player_id,
            channel,
            recipient: recipient.to_string(),
            message: message.to_string(),
            status: NotificationStatus::Pending,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// A delivery that already went through.
    pub fn sent(player_id: u64, channel: Channel, recipient: &str, message: &str) -> Self {
        Self {
            status: NotificationStatus::Sent,
            ..Self::pending(player_id, channel, recipient, message)
        }
    }

    pub fn failed(
        player_id: u64,
        channel: Channel,
        recipient: &str,
        message: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status: NotificationStatus::Failed,
            error: Some(reason.into()),
            ..Self::pending(player_id, channel, recipient, message)
        }
    }

    pub fn mark_sent(&mut self) -> Result<(), NotifyError> {
        self.finish(NotificationStatus::Sent, None)
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), NotifyError> {
        self.finish(NotificationStatus::Failed, Some(reason.into()))
    }

    fn finish(&mut self, status: NotificationStatus, error: Option<String>) -> Result<(), NotifyError> {
        match self.status {
            NotificationStatus::Pending => {
                self.status = status;
                self.error = error;
                Ok(())
            }
            NotificationStatus::Sent => Err(NotifyError::InvalidTransition("sent")),
            NotificationStatus::Failed => Err(NotifyError::InvalidTransition("failed")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStats {
    pub total_players: usize,
    pub total_matches: usize,
    pub total_goals: u32,
    pub total_assists: u32,
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
}

/// One row of a league table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub rank: u32,
    pub team_id: u64,
    pub team: String,
    #[serde(default)]
    pub team_logo: Option<String>,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i32,
    pub points: i32,
    #[serde(default)]
    pub form: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamInfo {
    pub id: u64,
    pub name: String,
    pub short_name: String,
    #[serde(default)]
    pub crest: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub founded: Option<u16>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_flag_follows_status() {
        let mut m = Match::new("1", "A", "B", "Liga", Utc::now(), MatchStatus::NotStarted);
        assert!(!m.is_live());
        m.set_status(MatchStatus::Halftime);
        assert!(m.is_live());
        m.set_status(MatchStatus::Finished);
        assert!(!m.is_live());
    }

    #[test]
    fn legacy_spanish_positions_parse() {
        let pos: Position = serde_json::from_str("\"Portero\"").unwrap();
        assert_eq!(pos, Position::Goalkeeper);
        let pos: Position = serde_json::from_str("\"Director Técnico\"").unwrap();
        assert_eq!(pos, Position::Coach);
        assert_eq!(serde_json::to_string(&Position::Forward).unwrap(), "\"forward\"");
    }

    #[test]
    fn terminal_constructors_skip_pending() {
        let sent = Notification::sent(1, Channel::WhatsApp, "+5255", "hola");
        assert_eq!(sent.status, NotificationStatus::Sent);
        assert_eq!(sent.error, None);

        let mut failed = Notification::failed(1, Channel::Email, "a@x.com", "hola", "bounced");
        assert_eq!(failed.status, NotificationStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("bounced"));
        assert!(failed.mark_sent().is_err());
    }

    #[test]
    fn notification_states_are_terminal() {
        let mut n = Notification::pending(1, Channel::Email, "a@x.com", "hi");
        n.mark_failed("boom").unwrap();
        assert_eq!(n.status, NotificationStatus::Failed);
        assert_eq!(n.mark_sent(), Err(NotifyError::InvalidTransition("failed")));
        assert_eq!(n.status, NotificationStatus::Failed);
    }
}
