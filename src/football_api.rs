use std::sync::Mutex;
use std::time::Instant;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::error::FetchError;
use crate::http_cache::{ResponseCache, cache_key};
use crate::http_client::{ReqwestTransport, Transport};
use crate::mock_feed::MockDataProvider;
use crate::model::{Match, Standing, TeamInfo};
use crate::normalize::{normalize_all, normalize_standings, normalize_team};
use crate::provider::{
    ApiKeyStatus, LeagueStandings, ProviderResponse, TeamEntry, parse_provider_payload,
    parse_status_json,
};

pub const API_HOST: &str = "v3.football.api-sports.io";
pub const RECENT_LIMIT: u32 = 10;

pub const LEAGUE_IDS: &[(&str, u32)] = &[
    ("la-liga", 140),
    ("liga-mx", 262),
    ("serie-a", 135),
    ("premier", 39),
    ("bundesliga", 78),
    ("libertadores", 13),
    ("champions", 2),
];

pub fn league_id(key: &str) -> Option<u32> {
    LEAGUE_IDS.iter().find(|(k, _)| *k == key).map(|(_, id)| *id)
}

pub type Params = [(String, String)];

/// Sports-data client: response cache, provider auth, and mock fallback.
pub struct FootballApi<T: Transport = ReqwestTransport> {
    config: ApiConfig,
    transport: T,
    cache: Mutex<ResponseCache>,
    mock: MockDataProvider,
}

impl FootballApi<ReqwestTransport> {
    pub fn from_config(config: ApiConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.request_timeout)?;
        Ok(Self::new(config, transport, MockDataProvider::default()))
    }
}

impl<T: Transport> FootballApi<T> {
    pub fn new(config: ApiConfig, transport: T, mock: MockDataProvider) -> Self {
        let cache = Mutex::new(ResponseCache::new(config.cache_ttl));
        Self {
            config,
            transport,
            cache,
            mock,
        }
    }

    pub fn mock(&self) -> &MockDataProvider {
        &self.mock
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn season(&self) -> u16 {
        self.config.season
    }

    /// Cached, authenticated fixtures GET. Errors are returned as-is; see `request` for the fallback.
    pub fn try_request(&self, endpoint: &str, params: &Params) -> Result<ProviderResponse, FetchError> {
        self.try_request_as(endpoint, params)
    }

    /// `try_request` for any provider envelope. Only bodies that parse as `D`
    /// and carry no quota error are cached.
    pub fn try_request_as<D: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &Params,
    ) -> Result<ProviderResponse<D>, FetchError> {
        let key = cache_key(endpoint, params);
        if let Some(body) = self.cache_lock().get(&key, Instant::now()) {
            debug!(%key, "provider cache hit");
            return parse_provider_payload(&body);
        }

        let url = format!("{}{}", self.config.base_url, endpoint);
        let api_key = self.config.api_key.as_deref().unwrap_or_default();
        let headers = [
            ("x-rapidapi-key", api_key),
            ("x-rapidapi-host", API_HOST),
            ("content-type", "application/json"),
        ];
        let resp = self.transport.get(&url, params, &headers)?;
        if resp.status == 429 {
            return Err(FetchError::RateLimited(resp.body));
        }
        if !(200..300).contains(&resp.status) {
            return Err(FetchError::Status {
                status: resp.status,
                body: resp.body,
            });
        }

        let data = parse_provider_payload::<D>(&resp.body)?;
        if let Some(msg) = data.rate_limit_error() {
            return Err(FetchError::RateLimited(msg));
        }

        self.cache_lock().insert(key, resp.body, Instant::now());
        Ok(data)
    }

    /// Like `try_request`, but any failure is replaced by mock data for the same request.
    pub fn request(&self, endpoint: &str, params: &Params) -> ProviderResponse {
        let result = self.try_request(endpoint, params);
        self.or_mock(result, endpoint, params)
    }

    /// The explicit fallback step: `Ok` passes through, `Err` becomes the matching mock set.
    pub fn or_mock(
        &self,
        result: Result<ProviderResponse, FetchError>,
        endpoint: &str,
        params: &Params,
    ) -> ProviderResponse {
        self.or_fallback(result, endpoint, params, |line| {
            self.mock.mock_for(line, Utc::now())
        })
    }

    fn or_fallback<D>(
        &self,
        result: Result<D, FetchError>,
        endpoint: &str,
        params: &Params,
        fallback: impl FnOnce(&str) -> D,
    ) -> D {
        result.unwrap_or_else(|err| {
            let line = request_line(endpoint, params);
            warn!(request = %line, error = %err, "provider request failed, serving mock data");
            fallback(&line)
        })
    }

    pub fn live_matches(&self) -> Vec<Match> {
        let today = Utc::now().date_naive();
        let data = self.request(
            "/fixtures",
            &params(&[
                ("date", today.to_string()),
                ("live", "all".to_string()),
                ("season", self.season().to_string()),
            ]),
        );
        if !data.is_empty() {
            info!(count = data.response.len(), %today, "live matches found");
            return normalize_all(&data);
        }
        self.mock.live_fallback(Utc::now())
    }

    pub fn finished_matches(&self) -> Vec<Match> {
        let today = Utc::now().date_naive();
        let season = self.season().to_string();
        let data = self.request(
            "/fixtures",
            &params(&[
                ("date", today.to_string()),
                ("status", "FT".to_string()),
                ("season", season.clone()),
            ]),
        );
        if !data.is_empty() {
            return normalize_all(&data);
        }

        let recent = self.request(
            "/fixtures",
            &params(&[
                ("season", season),
                ("status", "FT".to_string()),
                ("last", RECENT_LIMIT.to_string()),
            ]),
        );
        if !recent.is_empty() {
            info!("no finished matches today, serving the season's most recent");
            return normalize_all(&recent);
        }
        self.mock.finished_fallback(Utc::now())
    }

    pub fn matches_by_date(&self, date: NaiveDate) -> Vec<Match> {
        let data = self.request("/fixtures", &params(&[("date", date.to_string())]));
        normalize_all(&data)
    }

    pub fn matches_by_league_key(&self, league_key: &str) -> Vec<Match> {
        let Some(league) = league_id(league_key) else {
            warn!(league_key, "unknown league key");
            return Vec::new();
        };
        let season = self.season().to_string();

        let recent = self.request(
            "/fixtures",
            &params(&[
                ("league", league.to_string()),
                ("season", season.clone()),
                ("last", RECENT_LIMIT.to_string()),
            ]),
        );
        if !recent.is_empty() {
            return normalize_all(&recent);
        }

        let today = Utc::now().date_naive();
        let todays = self.request(
            "/fixtures",
            &params(&[
                ("league", league.to_string()),
                ("date", today.to_string()),
                ("season", season),
            ]),
        );
        if !todays.is_empty() {
            return normalize_all(&todays);
        }

        info!(league_key, "no real matches found, serving simulated data");
        self.mock.simulated_league_matches(league_key, Utc::now())
    }

    /// Season fixtures for a raw provider league id.
    pub fn matches_by_league(&self, league: u32) -> Vec<Match> {
        let data = self.request(
            "/fixtures",
            &params(&[
                ("league", league.to_string()),
                ("season", self.season().to_string()),
            ]),
        );
        normalize_all(&data)
    }

    /// League table for the season. Unknown keys give an empty table.
    pub fn standings(&self, league_key: &str) -> Vec<Standing> {
        let Some(league) = league_id(league_key) else {
            warn!(league_key, "unknown league key");
            return Vec::new();
        };
        let query = params(&[
            ("league", league.to_string()),
            ("season", self.season().to_string()),
        ]);
        let result = self.try_request_as::<LeagueStandings>("/standings", &query);
        let data = self.or_fallback(result, "/standings", &query, |_| {
            self.mock.mock_standings(league_key)
        });
        normalize_standings(&data)
    }

    pub fn team_info(&self, team_id: u64) -> Option<TeamInfo> {
        let query = params(&[("id", team_id.to_string())]);
        let result = self.try_request_as::<TeamEntry>("/teams", &query);
        let data = self.or_fallback(result, "/teams", &query, |_| self.mock.mock_team(team_id));
        data.response.first().map(normalize_team)
    }

    /// Probes `/status`. Not cached.
    pub fn check_api_key(&self) -> ApiKeyStatus {
        if self.config.api_key.as_deref().is_none_or(str::is_empty) {
            return ApiKeyStatus {
                valid: false,
                message: "api key not configured".to_string(),
                requests: None,
                requests_limit: None,
            };
        }
        let url = format!("{}/status", self.config.base_url);
        let api_key = self.config.api_key.as_deref().unwrap_or_default();
        let headers = [("x-rapidapi-key", api_key), ("x-rapidapi-host", API_HOST)];
        let outcome = self
            .transport
            .get(&url, &[], &headers)
            .and_then(|resp| {
                if (200..300).contains(&resp.status) {
                    parse_status_json(&resp.body)
                } else {
                    Err(FetchError::Status {
                        status: resp.status,
                        body: resp.body,
                    })
                }
            });
        outcome.unwrap_or_else(|err| ApiKeyStatus {
            valid: false,
            message: format!("api key check failed: {err}"),
            requests: None,
            requests_limit: None,
        })
    }

    /// Explicit sweep of expired cache entries; the client never does this on its own.
    pub fn purge_expired(&self) -> usize {
        self.cache_lock().purge_expired(Instant::now())
    }

    fn cache_lock(&self) -> std::sync::MutexGuard<'_, ResponseCache> {
        self.cache.lock().expect("response cache lock poisoned")
    }
}

pub fn params(pairs: &[(&str, String)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// `endpoint?k=v&...`, the form the mock provider dispatches on.
pub fn request_line(endpoint: &str, params: &Params) -> String {
    if params.is_empty() {
        return endpoint.to_string();
    }
    let query = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{endpoint}?{query}")
}
