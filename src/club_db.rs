use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{NotifyError, PersistError, StoreError};
use crate::model::{
    Match, MatchStatus, News, Notification, Player, PlayerStats, Position, TeamStats,
};
use crate::notify::NotificationLog;
use crate::persist::{KeyValueStore, load_json, save_json};
use crate::validation::{
    hash_password, is_valid_email, is_valid_phone, normalize_email, verify_password,
};

pub const PLAYERS_KEY: &str = "players";
/// Written by the old self-service registration form.
pub const LEGACY_USERS_KEY: &str = "registered_users";
pub const MATCHES_KEY: &str = "matches";
pub const NEWS_KEY: &str = "news";
pub const NEXT_MATCH_KEY: &str = "next_match";
pub const NOTIFICATIONS_KEY: &str = "notifications";

pub const DEFAULT_COMPETITION: &str = "Liga Local";
pub const DEFAULT_NEWS_AUTHOR: &str = "Administrador";

pub const ERR_MISSING_FIELDS: &str = "missing required fields";
pub const ERR_INVALID_EMAIL: &str = "invalid email format";
pub const ERR_INVALID_PHONE: &str = "invalid phone format";
pub const ERR_JERSEY_TAKEN: &str = "jersey number unavailable";
pub const ERR_EMAIL_TAKEN: &str = "email already registered";
pub const ERR_INVALID_POSITION: &str = "invalid position";
pub const ERR_BAD_CREDENTIALS: &str = "invalid credentials";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewPlayer {
    pub full_name: String,
    pub nickname: Option<String>,
    pub jersey_number: Option<u8>,
    pub position: Option<Position>,
    pub email: String,
    pub whatsapp: String,
    pub password: String,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerPatch {
    pub full_name: Option<String>,
    pub nickname: Option<String>,
    pub jersey_number: Option<u8>,
    pub position: Option<Position>,
    pub email: Option<String>,
    pub whatsapp: Option<String>,
    pub password: Option<String>,
    pub photo: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsPatch {
    pub goals: Option<u32>,
    pub assists: Option<u32>,
    pub games_played: Option<u32>,
    pub yellow_cards: Option<u32>,
    pub red_cards: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerFilter {
    pub position: Option<Position>,
    pub include_inactive: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMatch {
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub competition: Option<String>,
    pub kickoff: DateTime<Utc>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub status: Option<MatchStatus>,
    #[serde(default)]
    pub home_score: Option<u8>,
    #[serde(default)]
    pub away_score: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchPatch {
    pub status: Option<MatchStatus>,
    pub home_score: Option<u8>,
    pub away_score: Option<u8>,
    pub elapsed: Option<u16>,
    pub kickoff: Option<DateTime<Utc>>,
    pub venue: Option<String>,
    pub competition: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewNews {
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewsPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
}

// Registration-form records kept the password in clear text.
#[derive(Debug, Deserialize)]
struct LegacyPlayer {
    #[serde(flatten)]
    player: Player,
    #[serde(default)]
    password: Option<String>,
}

impl LegacyPlayer {
    fn into_player(self) -> Player {
        let mut player = self.player;
        player.email = normalize_email(&player.email);
        if player.password_hash.is_empty() {
            if let Some(password) = self.password.filter(|p| !p.is_empty()) {
                player.password_hash = hash_password(&password);
            }
        }
        player
    }
}

#[derive(Debug, Serialize)]
struct Snapshot<'a> {
    players: &'a [Player],
    matches: &'a [Match],
    news: &'a [News],
    next_match: Option<&'a Match>,
}

/// Players, matches and news persisted through a key-value store.
///
/// Every mutation is written before it becomes visible in memory; a failed
/// write leaves the in-memory state untouched.
pub struct ClubDatabase<S: KeyValueStore> {
    store: S,
    players: Vec<Player>,
    matches: Vec<Match>,
    news: Vec<News>,
    next_match: Option<Match>,
    notifications: Vec<Notification>,
}

impl<S: KeyValueStore> ClubDatabase<S> {
    pub fn open(store: S) -> Result<Self, StoreError> {
        let mut players: Vec<Player> = load_json(&store, PLAYERS_KEY)?.unwrap_or_default();
        let legacy = match load_json::<_, Vec<Value>>(&store, LEGACY_USERS_KEY) {
            Ok(list) => list.unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "skipping unreadable legacy registrations");
                Vec::new()
            }
        };
        let merged = merge_by_id(&mut players, legacy_players(legacy));
        if merged > 0 {
            info!(merged, "merged legacy registrations");
        }

        let mut matches: Vec<Match> = load_json(&store, MATCHES_KEY)?.unwrap_or_default();
        for m in &mut matches {
            m.sync_live();
        }
        let news = load_json(&store, NEWS_KEY)?.unwrap_or_default();
        let notifications = load_json(&store, NOTIFICATIONS_KEY)?.unwrap_or_default();
        let next_match = compute_next_match(&matches, Utc::now());

        Ok(Self {
            store,
            players,
            matches,
            news,
            next_match,
            notifications,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ---- players ----

    pub fn add_player(&mut self, data: NewPlayer) -> Result<Player, StoreError> {
        let full_name = data.full_name.trim();
        let email = normalize_email(&data.email);
        let whatsapp = data.whatsapp.trim();
        let (Some(jersey_number), Some(position)) = (data.jersey_number, data.position) else {
            return Err(StoreError::validation(ERR_MISSING_FIELDS));
        };
        if full_name.is_empty() || email.is_empty() || whatsapp.is_empty() || data.password.is_empty()
        {
            return Err(StoreError::validation(ERR_MISSING_FIELDS));
        }
        if position == Position::Unassigned {
            return Err(StoreError::validation(ERR_INVALID_POSITION));
        }
        if !is_valid_email(&email) {
            return Err(StoreError::validation(ERR_INVALID_EMAIL));
        }
        if !is_valid_phone(whatsapp) {
            return Err(StoreError::validation(ERR_INVALID_PHONE));
        }
        if self.is_jersey_taken(jersey_number, None) {
            return Err(StoreError::validation(ERR_JERSEY_TAKEN));
        }
        if self.is_email_registered(&email, None) {
            return Err(StoreError::validation(ERR_EMAIL_TAKEN));
        }

        let player = Player {
            id: self.players.iter().map(|p| p.id).max().unwrap_or(0) + 1,
            full_name: full_name.to_string(),
            nickname: data
                .nickname
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            jersey_number,
            position,
            email,
            whatsapp: whatsapp.to_string(),
            password_hash: hash_password(&data.password),
            photo: data.photo,
            registered_at: Utc::now(),
            stats: PlayerStats::default(),
            is_active: true,
        };

        let mut players = self.players.clone();
        players.push(player.clone());
        self.commit_players(players)?;
        info!(player_id = player.id, jersey = player.jersey_number, "player registered");
        Ok(player)
    }

    pub fn update_player(&mut self, id: u64, patch: PlayerPatch) -> Result<Player, StoreError> {
        let idx = self.player_index(id)?;
        let mut player = self.players[idx].clone();

        if let Some(name) = patch.full_name {
            let name = name.trim();
            if name.is_empty() {
                return Err(StoreError::validation(ERR_MISSING_FIELDS));
            }
            player.full_name = name.to_string();
        }
        if let Some(email) = patch.email {
            let email = normalize_email(&email);
            if !is_valid_email(&email) {
                return Err(StoreError::validation(ERR_INVALID_EMAIL));
            }
            if self.is_email_registered(&email, Some(id)) {
                return Err(StoreError::validation(ERR_EMAIL_TAKEN));
            }
            player.email = email;
        }
        if let Some(whatsapp) = patch.whatsapp {
            if !is_valid_phone(&whatsapp) {
                return Err(StoreError::validation(ERR_INVALID_PHONE));
            }
            player.whatsapp = whatsapp.trim().to_string();
        }
        if let Some(number) = patch.jersey_number {
            if self.is_jersey_taken(number, Some(id)) {
                return Err(StoreError::validation(ERR_JERSEY_TAKEN));
            }
            player.jersey_number = number;
        }
        if let Some(active) = patch.is_active {
            // Reactivation re-enters the uniqueness pool.
            if active && !player.is_active {
                if self.is_jersey_taken(player.jersey_number, Some(id)) {
                    return Err(StoreError::validation(ERR_JERSEY_TAKEN));
                }
                if self.is_email_registered(&player.email, Some(id)) {
                    return Err(StoreError::validation(ERR_EMAIL_TAKEN));
                }
            }
            player.is_active = active;
        }
        if let Some(position) = patch.position {
            if position == Position::Unassigned {
                return Err(StoreError::validation(ERR_INVALID_POSITION));
            }
            player.position = position;
        }
        if let Some(nickname) = patch.nickname {
            player.nickname = Some(nickname.trim().to_string()).filter(|n| !n.is_empty());
        }
        if let Some(password) = patch.password {
            if password.is_empty() {
                return Err(StoreError::validation(ERR_MISSING_FIELDS));
            }
            player.password_hash = hash_password(&password);
        }
        if let Some(photo) = patch.photo {
            player.photo = Some(photo);
        }

        let mut players = self.players.clone();
        players[idx] = player.clone();
        self.commit_players(players)?;
        Ok(player)
    }

    /// Soft delete: the player stays on record but frees their jersey number and email.
    pub fn remove_player(&mut self, id: u64) -> Result<(), StoreError> {
        let idx = self.player_index(id)?;
        let mut players = self.players.clone();
        players[idx].is_active = false;
        self.commit_players(players)?;
        info!(player_id = id, "player deactivated");
        Ok(())
    }

    pub fn update_player_stats(&mut self, id: u64, patch: StatsPatch) -> Result<Player, StoreError> {
        let idx = self.player_index(id)?;
        let mut players = self.players.clone();
        let stats = &mut players[idx].stats;
        if let Some(v) = patch.goals {
            stats.goals = v;
        }
        if let Some(v) = patch.assists {
            stats.assists = v;
        }
        if let Some(v) = patch.games_played {
            stats.games_played = v;
        }
        if let Some(v) = patch.yellow_cards {
            stats.yellow_cards = v;
        }
        if let Some(v) = patch.red_cards {
            stats.red_cards = v;
        }
        let player = players[idx].clone();
        self.commit_players(players)?;
        Ok(player)
    }

    pub fn get_player(&self, id: u64) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_by_email(&self, email: &str) -> Option<&Player> {
        let email = normalize_email(email);
        self.players.iter().find(|p| p.email == email)
    }

    pub fn list_players(&self, filter: PlayerFilter) -> Vec<Player> {
        self.players
            .iter()
            .filter(|p| filter.include_inactive || p.is_active)
            .filter(|p| filter.position.is_none_or(|pos| p.position == pos))
            .cloned()
            .collect()
    }

    pub fn active_players(&self) -> Vec<Player> {
        self.list_players(PlayerFilter::default())
    }

    pub fn authenticate(&self, email: &str, password: &str) -> Result<Player, StoreError> {
        let email = normalize_email(email);
        self.players
            .iter()
            .find(|p| p.is_active && p.email == email)
            .filter(|p| verify_password(password, &p.password_hash))
            .cloned()
            .ok_or_else(|| StoreError::validation(ERR_BAD_CREDENTIALS))
    }

    pub fn is_jersey_taken(&self, number: u8, exclude: Option<u64>) -> bool {
        self.players
            .iter()
            .any(|p| p.is_active && p.jersey_number == number && Some(p.id) != exclude)
    }

    pub fn is_email_registered(&self, email: &str, exclude: Option<u64>) -> bool {
        let email = normalize_email(email);
        self.players
            .iter()
            .any(|p| p.is_active && p.email == email && Some(p.id) != exclude)
    }

    // ---- matches ----

    pub fn add_match(&mut self, data: NewMatch) -> Result<Match, StoreError> {
        let home = data.home_team.trim();
        let away = data.away_team.trim();
        if home.is_empty() || away.is_empty() {
            return Err(StoreError::validation(ERR_MISSING_FIELDS));
        }
        let next_id = self
            .matches
            .iter()
            .filter_map(|m| m.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let mut m = Match::new(
            next_id.to_string(),
            home,
            away,
            data.competition
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_COMPETITION.to_string()),
            data.kickoff,
            data.status.unwrap_or(MatchStatus::NotStarted),
        )
        .with_venue(data.venue);
        m.home_score = data.home_score;
        m.away_score = data.away_score;

        let mut matches = self.matches.clone();
        matches.push(m.clone());
        self.commit_matches(matches)?;
        info!(match_id = %m.id, home = %m.home_team, away = %m.away_team, "match added");
        Ok(m)
    }

    /// Inserts or replaces a match by id, e.g. one normalized from the provider.
    pub fn save_match(&mut self, mut m: Match) -> Result<Match, StoreError> {
        m.sync_live();
        let mut matches = self.matches.clone();
        match matches.iter_mut().find(|existing| existing.id == m.id) {
            Some(existing) => *existing = m.clone(),
            None => matches.push(m.clone()),
        }
        self.commit_matches(matches)?;
        Ok(m)
    }

    pub fn update_match(&mut self, id: &str, patch: MatchPatch) -> Result<Match, StoreError> {
        let idx = self
            .matches
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| StoreError::not_found("match not found"))?;
        let mut m = self.matches[idx].clone();
        if let Some(status) = patch.status {
            m.set_status(status);
        }
        if let Some(score) = patch.home_score {
            m.home_score = Some(score);
        }
        if let Some(score) = patch.away_score {
            m.away_score = Some(score);
        }
        if let Some(minute) = patch.elapsed {
            m.elapsed = Some(minute);
        }
        if let Some(kickoff) = patch.kickoff {
            m.kickoff = kickoff;
        }
        if let Some(venue) = patch.venue {
            m.venue = Some(venue);
        }
        if let Some(competition) = patch.competition {
            m.competition = competition;
        }

        let mut matches = self.matches.clone();
        matches[idx] = m.clone();
        self.commit_matches(matches)?;
        Ok(m)
    }

    /// Hard delete.
    pub fn remove_match(&mut self, id: &str) -> Result<(), StoreError> {
        if !self.matches.iter().any(|m| m.id == id) {
            return Err(StoreError::not_found("match not found"));
        }
        let matches = self.matches.iter().filter(|m| m.id != id).cloned().collect();
        self.commit_matches(matches)?;
        info!(match_id = id, "match removed");
        Ok(())
    }

    pub fn get_match(&self, id: &str) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == id)
    }

    /// Newest kickoff first.
    pub fn list_matches(&self) -> Vec<Match> {
        let mut out = self.matches.clone();
        out.sort_by(|a, b| b.kickoff.cmp(&a.kickoff));
        out
    }

    pub fn recent_matches(&self, limit: usize) -> Vec<Match> {
        self.list_matches()
            .into_iter()
            .filter(|m| m.status == MatchStatus::Finished)
            .take(limit)
            .collect()
    }

    pub fn upcoming_matches(&self, now: DateTime<Utc>) -> Vec<Match> {
        let mut out: Vec<Match> = self
            .matches
            .iter()
            .filter(|m| m.status == MatchStatus::NotStarted && m.kickoff > now)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.kickoff.cmp(&b.kickoff));
        out
    }

    pub fn next_match(&self) -> Option<&Match> {
        self.next_match.as_ref()
    }

    // ---- news ----

    pub fn add_news(&mut self, data: NewNews) -> Result<News, StoreError> {
        let title = data.title.trim();
        let content = data.content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(StoreError::validation(ERR_MISSING_FIELDS));
        }
        let item = News {
            id: self.news.iter().map(|n| n.id).max().unwrap_or(0) + 1,
            title: title.to_string(),
            content: content.to_string(),
            image: data.image,
            author: data
                .author
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_NEWS_AUTHOR.to_string()),
            created_at: Utc::now(),
            is_published: true,
        };
        let mut news = self.news.clone();
        news.push(item.clone());
        self.commit_news(news)?;
        Ok(item)
    }

    pub fn update_news(&mut self, id: u64, patch: NewsPatch) -> Result<News, StoreError> {
        let idx = self
            .news
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| StoreError::not_found("news not found"))?;
        let mut news = self.news.clone();
        let item = &mut news[idx];
        if let Some(title) = patch.title {
            if title.trim().is_empty() {
                return Err(StoreError::validation(ERR_MISSING_FIELDS));
            }
            item.title = title.trim().to_string();
        }
        if let Some(content) = patch.content {
            if content.trim().is_empty() {
                return Err(StoreError::validation(ERR_MISSING_FIELDS));
            }
            item.content = content.trim().to_string();
        }
        if let Some(image) = patch.image {
            item.image = Some(image);
        }
        let item = item.clone();
        self.commit_news(news)?;
        Ok(item)
    }

    /// Unpublishes; the article stays on record.
    pub fn remove_news(&mut self, id: u64) -> Result<(), StoreError> {
        let idx = self
            .news
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| StoreError::not_found("news not found"))?;
        let mut news = self.news.clone();
        news[idx].is_published = false;
        self.commit_news(news)
    }

    pub fn get_news(&self, id: u64) -> Option<&News> {
        self.news.iter().find(|n| n.id == id)
    }

    /// Published articles, newest first.
    pub fn list_news(&self) -> Vec<News> {
        let mut out: Vec<News> = self.news.iter().filter(|n| n.is_published).cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    pub fn recent_news(&self, limit: usize) -> Vec<News> {
        self.list_news().into_iter().take(limit).collect()
    }

    // ---- reporting ----

    pub fn team_stats(&self) -> TeamStats {
        let active: Vec<&Player> = self.players.iter().filter(|p| p.is_active).collect();
        let scored: Vec<(u8, u8)> = self
            .matches
            .iter()
            .filter(|m| m.status == MatchStatus::Finished)
            .filter_map(|m| Some((m.home_score?, m.away_score?)))
            .collect();
        TeamStats {
            total_players: active.len(),
            total_matches: self
                .matches
                .iter()
                .filter(|m| m.status == MatchStatus::Finished)
                .count(),
            total_goals: active.iter().map(|p| p.stats.goals).sum(),
            total_assists: active.iter().map(|p| p.stats.assists).sum(),
            wins: scored.iter().filter(|(h, a)| h > a).count(),
            draws: scored.iter().filter(|(h, a)| h == a).count(),
            losses: scored.iter().filter(|(h, a)| h < a).count(),
        }
    }

    /// Full JSON export of players, matches and news.
    pub fn export_json(&self) -> Result<String, StoreError> {
        let snapshot = Snapshot {
            players: &self.players,
            matches: &self.matches,
            news: &self.news,
            next_match: self.next_match.as_ref(),
        };
        serde_json::to_string_pretty(&snapshot).map_err(|source| {
            StoreError::Persistence(PersistError::Serialize {
                key: "export".to_string(),
                source,
            })
        })
    }

    // ---- notifications ----

    pub fn append_notification(&mut self, mut record: Notification) -> Result<Notification, StoreError> {
        record.id = self.notifications.iter().map(|n| n.id).max().unwrap_or(0) + 1;
        let mut log = self.notifications.clone();
        log.push(record.clone());
        save_json(&self.store, NOTIFICATIONS_KEY, &log)?;
        self.notifications = log;
        Ok(record)
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    // ---- internals ----

    fn player_index(&self, id: u64) -> Result<usize, StoreError> {
        self.players
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found("player not found"))
    }

    fn commit_players(&mut self, players: Vec<Player>) -> Result<(), StoreError> {
        save_json(&self.store, PLAYERS_KEY, &players)?;
        self.players = players;
        Ok(())
    }

    // The match list is the commit point. `next_match` is derived and recomputed
    // on open, so it is written first and a stale copy is harmless.
    fn commit_matches(&mut self, matches: Vec<Match>) -> Result<(), StoreError> {
        let next_match = compute_next_match(&matches, Utc::now());
        save_json(&self.store, NEXT_MATCH_KEY, &next_match)?;
        save_json(&self.store, MATCHES_KEY, &matches)?;
        self.matches = matches;
        self.next_match = next_match;
        Ok(())
    }

    fn commit_news(&mut self, news: Vec<News>) -> Result<(), StoreError> {
        save_json(&self.store, NEWS_KEY, &news)?;
        self.news = news;
        Ok(())
    }
}

impl<S: KeyValueStore> NotificationLog for ClubDatabase<S> {
    fn append(&mut self, record: Notification) -> Result<Notification, NotifyError> {
        self.append_notification(record)
            .map_err(|err| NotifyError::Log(err.to_string()))
    }
}

// Each legacy record converts on its own; a bad one is skipped, never the list.
fn legacy_players(records: Vec<Value>) -> Vec<Player> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| {
            match serde_json::from_value::<LegacyPlayer>(record) {
                Ok(legacy) => Some(legacy.into_player()),
                Err(err) => {
                    warn!(index, error = %err, "skipping malformed legacy registration");
                    None
                }
            }
        })
        .collect()
}

/// Appends every incoming player whose id is not already present. Returns how many were added.
pub fn merge_by_id(players: &mut Vec<Player>, incoming: impl IntoIterator<Item = Player>) -> usize {
    let mut seen: HashSet<u64> = players.iter().map(|p| p.id).collect();
    let before = players.len();
    for player in incoming {
        if seen.insert(player.id) {
            players.push(player);
        }
    }
    players.len() - before
}

/// Earliest not-started match that kicks off after `now`.
pub fn compute_next_match(matches: &[Match], now: DateTime<Utc>) -> Option<Match> {
    matches
        .iter()
        .filter(|m| m.status == MatchStatus::NotStarted && m.kickoff > now)
        .min_by_key(|m| m.kickoff)
        .cloned()
}
