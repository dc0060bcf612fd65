use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::model::{Match, MatchStatus};
use crate::provider::{
    Fixture, FixtureInfo, FixtureStatus, GoalTally, Goals, LeagueInfo, LeagueStandings,
    ProviderResponse, RecordLine, StandingRow, StandingTeam, StandingsLeague, TeamDetail,
    TeamEntry, TeamRef, Teams,
};

/// Finished simulated scores are drawn from `0..MAX_GOALS`.
pub const MAX_GOALS: u8 = 4;
/// Partial scores of simulated live matches are drawn from `0..MAX_LIVE_GOALS`.
pub const MAX_LIVE_GOALS: u8 = 3;
pub const FINISHED_PER_LEAGUE: usize = 4;
pub const TODAY_PER_LEAGUE: usize = 3;
pub const LIVE_PROBABILITY: f64 = 0.5;
/// Rounds played in a simulated league table.
pub const MOCK_ROUNDS: u32 = 17;

pub const DEFAULT_LOGO: &str = "https://media.api-sports.io/football/teams/1.png";

pub const LIVE_MARKER: &str = "live=all";
pub const CHAMPIONS_MARKER: &str = "league=2";
pub const LIGA_MX_MARKER: &str = "league=262";

#[derive(Debug, Clone, Copy)]
pub struct LeagueRoster {
    pub key: &'static str,
    pub name: &'static str,
    pub teams: &'static [&'static str],
}

pub const LEAGUE_ROSTERS: &[LeagueRoster] = &[
    LeagueRoster {
        key: "la-liga",
        name: "La Liga",
        teams: &[
            "Real Madrid", "Barcelona", "Atlético Madrid", "Sevilla", "Real Sociedad",
            "Villarreal", "Real Betis", "Valencia", "Athletic Bilbao", "Osasuna",
        ],
    },
    LeagueRoster {
        key: "liga-mx",
        name: "Liga MX",
        teams: &[
            "América", "Guadalajara", "Cruz Azul", "Tigres", "Monterrey", "Pachuca", "Toluca",
            "Santos Laguna", "Pumas UNAM", "Atlas",
        ],
    },
    LeagueRoster {
        key: "serie-a",
        name: "Serie A",
        teams: &[
            "Juventus", "AC Milan", "Inter Milan", "Napoli", "Roma", "Lazio", "Atalanta",
            "Fiorentina", "Bologna", "Torino",
        ],
    },
    LeagueRoster {
        key: "premier",
        name: "Premier League",
        teams: &[
            "Manchester City", "Arsenal", "Liverpool", "Chelsea", "Manchester United",
            "Tottenham", "Newcastle", "Brighton", "West Ham", "Aston Villa",
        ],
    },
    LeagueRoster {
        key: "bundesliga",
        name: "Bundesliga",
        teams: &[
            "Bayern Munich", "Borussia Dortmund", "RB Leipzig", "Bayer Leverkusen",
            "Eintracht Frankfurt", "Union Berlin", "Freiburg", "Wolfsburg", "Mainz",
            "Borussia Mönchengladbach",
        ],
    },
    LeagueRoster {
        key: "libertadores",
        name: "Copa Libertadores",
        teams: &[
            "Flamengo", "Palmeiras", "River Plate", "Boca Juniors", "Atlético Mineiro", "Santos",
            "Grêmio", "Internacional", "São Paulo", "Fluminense",
        ],
    },
    LeagueRoster {
        key: "champions",
        name: "Champions League",
        teams: &[
            "Real Madrid", "Manchester City", "Bayern Munich", "PSG", "Barcelona", "Liverpool",
            "AC Milan", "Inter Milan", "Juventus", "Chelsea",
        ],
    },
];

pub fn roster(league_key: &str) -> Option<&'static LeagueRoster> {
    LEAGUE_ROSTERS.iter().find(|r| r.key == league_key)
}

static TEAM_LOGOS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    [
        ("Real Madrid", 541), ("Barcelona", 529), ("Atlético Madrid", 530), ("Sevilla", 536),
        ("Real Sociedad", 548), ("Villarreal", 533), ("Real Betis", 543), ("Valencia", 532),
        ("Athletic Bilbao", 531), ("Osasuna", 727),
        ("América", 1354), ("Guadalajara", 1355), ("Cruz Azul", 1356), ("Tigres", 1357),
        ("Monterrey", 1358), ("Pachuca", 1359), ("Toluca", 1360), ("Santos Laguna", 1361),
        ("Pumas UNAM", 1362), ("Atlas", 1363), ("Querétaro", 1364), ("Necaxa", 1365),
        ("Puebla", 1366), ("León", 1367), ("San Luis", 1370), ("Tijuana", 1371),
        ("Juventus", 496), ("AC Milan", 489), ("Inter Milan", 505), ("Napoli", 492),
        ("Roma", 497), ("Lazio", 487), ("Atalanta", 499), ("Fiorentina", 502),
        ("Bologna", 500), ("Torino", 503),
        ("Manchester City", 50), ("Arsenal", 42), ("Liverpool", 40), ("Chelsea", 49),
        ("Manchester United", 33), ("Tottenham", 47), ("Newcastle", 34), ("Brighton", 51),
        ("West Ham", 48), ("Aston Villa", 66),
        ("Bayern Munich", 157), ("Borussia Dortmund", 165), ("RB Leipzig", 721),
        ("Bayer Leverkusen", 168), ("Eintracht Frankfurt", 169), ("Union Berlin", 182),
        ("Freiburg", 160), ("Wolfsburg", 161), ("Mainz", 164),
        ("Borussia Mönchengladbach", 163),
        ("Flamengo", 598), ("Palmeiras", 595), ("River Plate", 435), ("Boca Juniors", 451),
        ("Atlético Mineiro", 592), ("Santos", 594), ("Grêmio", 593), ("Internacional", 596),
        ("São Paulo", 126), ("Fluminense", 124),
        ("PSG", 85),
    ]
    .into_iter()
    .collect()
});

pub fn team_logo_url(team: &str) -> String {
    match TEAM_LOGOS.get(team) {
        Some(id) => format!("https://media.api-sports.io/football/teams/{id}.png"),
        None => DEFAULT_LOGO.to_string(),
    }
}

fn provider_team_id(team: &str) -> Option<u64> {
    TEAM_LOGOS.get(team).map(|id| u64::from(*id))
}

/// Fallback datasets served whenever the provider cannot be used.
pub struct MockDataProvider {
    rng: Mutex<StdRng>,
}

impl Default for MockDataProvider {
    fn default() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }
}

impl MockDataProvider {
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Raw provider-shaped mock for a request line such as `/fixtures?live=all`.
    pub fn mock_for(&self, request: &str, now: DateTime<Utc>) -> ProviderResponse {
        let has = |marker: &str| query_tokens(request).any(|token| token == marker);
        if has(LIVE_MARKER) {
            mock_live_response(now)
        } else if has(CHAMPIONS_MARKER) {
            mock_champions_response(now)
        } else if has(LIGA_MX_MARKER) {
            mock_liga_mx_response(now)
        } else {
            ProviderResponse::default()
        }
    }

    /// Yesterday's results plus today's fixtures for a league, drawn from its roster.
    pub fn simulated_league_matches(&self, league_key: &str, now: DateTime<Utc>) -> Vec<Match> {
        let Some(league) = roster(league_key) else {
            return Vec::new();
        };
        let mut rng = self.rng.lock().expect("mock rng lock poisoned");
        let yesterday = now - ChronoDuration::days(1);
        let mut out = Vec::with_capacity(FINISHED_PER_LEAGUE + TODAY_PER_LEAGUE);

        for i in 0..FINISHED_PER_LEAGUE {
            let (home, away) = pick_pairing(league.teams, &mut *rng);
            let id = format!("{}-{}-{i}", league.key, yesterday.format("%Y%m%d"));
            let m = Match::new(id, home, away, league.name, yesterday, MatchStatus::Finished)
                .with_logos(Some(team_logo_url(home)), Some(team_logo_url(away)))
                .with_score(rng.gen_range(0..MAX_GOALS), rng.gen_range(0..MAX_GOALS));
            out.push(m);
        }

        for i in 0..TODAY_PER_LEAGUE {
            let (home, away) = pick_pairing(league.teams, &mut *rng);
            let id = format!("{}-{}-today-{i}", league.key, now.format("%Y%m%d"));
            let live = rng.gen_bool(LIVE_PROBABILITY);
            let status = if live {
                MatchStatus::Live
            } else {
                MatchStatus::NotStarted
            };
            let mut m = Match::new(id, home, away, league.name, now, status)
                .with_logos(Some(team_logo_url(home)), Some(team_logo_url(away)));
            if live {
                m = m
                    .with_score(
                        rng.gen_range(0..MAX_LIVE_GOALS),
                        rng.gen_range(0..MAX_LIVE_GOALS),
                    )
                    .with_elapsed(rng.gen_range(1..=90));
            }
            out.push(m);
        }

        out
    }

    /// A provider-shaped table for a league roster, ordered by points then goal difference.
    pub fn mock_standings(&self, league_key: &str) -> ProviderResponse<LeagueStandings> {
        let Some(league) = roster(league_key) else {
            return ProviderResponse::default();
        };
        let mut rng = self.rng.lock().expect("mock rng lock poisoned");
        let mut rows: Vec<StandingRow> = league
            .teams
            .iter()
            .map(|team| {
                let win = rng.gen_range(0..=MOCK_ROUNDS);
                let draw = rng.gen_range(0..=MOCK_ROUNDS - win);
                let lose = MOCK_ROUNDS - win - draw;
                let scored = rng.gen_range(0..=MOCK_ROUNDS * 3);
                let against = rng.gen_range(0..=MOCK_ROUNDS * 3);
                StandingRow {
                    rank: 0,
                    team: StandingTeam {
                        id: provider_team_id(team).unwrap_or_default(),
                        name: team.to_string(),
                        logo: Some(team_logo_url(team)),
                    },
                    points: (win * 3 + draw) as i32,
                    goals_diff: scored as i32 - against as i32,
                    group: None,
                    form: None,
                    all: RecordLine {
                        played: MOCK_ROUNDS,
                        win,
                        draw,
                        lose,
                        goals: GoalTally { scored, against },
                    },
                }
            })
            .collect();
        rows.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then_with(|| b.goals_diff.cmp(&a.goals_diff))
        });
        for (i, row) in rows.iter_mut().enumerate() {
            row.rank = i as u32 + 1;
        }

        ProviderResponse::from_items(vec![LeagueStandings {
            league: StandingsLeague {
                id: None,
                name: league.name.to_string(),
                season: None,
                standings: vec![rows],
            },
        }])
    }

    /// Name and crest for a team the logo table knows; empty otherwise.
    pub fn mock_team(&self, team_id: u64) -> ProviderResponse<TeamEntry> {
        let known = TEAM_LOGOS
            .iter()
            .find(|(_, id)| u64::from(**id) == team_id)
            .map(|(name, _)| *name);
        let Some(name) = known else {
            return ProviderResponse::default();
        };
        ProviderResponse::from_items(vec![TeamEntry {
            team: TeamDetail {
                id: team_id,
                name: name.to_string(),
                code: None,
                country: None,
                founded: None,
                logo: Some(team_logo_url(name)),
            },
            venue: None,
        }])
    }

    /// Shown when the live query comes back empty.
    pub fn live_fallback(&self, now: DateTime<Utc>) -> Vec<Match> {
        LIVE_FALLBACK
            .iter()
            .enumerate()
            .map(|(i, (home, away, hs, aws, minute))| {
                Match::new(
                    format!("mock-live-{}", i + 1),
                    *home,
                    *away,
                    "Liga MX Apertura 2024",
                    now,
                    MatchStatus::Live,
                )
                .with_logos(Some(team_logo_url(home)), Some(team_logo_url(away)))
                .with_score(*hs, *aws)
                .with_elapsed(*minute)
            })
            .collect()
    }

    /// Shown when neither today's nor the season's finished matches are available.
    pub fn finished_fallback(&self, now: DateTime<Utc>) -> Vec<Match> {
        FINISHED_FALLBACK
            .iter()
            .enumerate()
            .map(|(i, (home, away, hs, aws, competition))| {
                Match::new(
                    format!("mock-finished-{}", i + 1),
                    *home,
                    *away,
                    *competition,
                    now,
                    MatchStatus::Finished,
                )
                .with_logos(Some(team_logo_url(home)), Some(team_logo_url(away)))
                .with_score(*hs, *aws)
                .with_elapsed(90)
            })
            .collect()
    }
}

const LIVE_FALLBACK: &[(&str, &str, u8, u8, u16)] = &[
    ("San Luis", "América", 0, 0, 24),
    ("Tijuana", "Santos Laguna", 0, 0, 26),
    ("Pachuca", "Monterrey", 1, 1, 45),
    ("Toluca", "Pumas UNAM", 2, 1, 67),
];

const FINISHED_FALLBACK: &[(&str, &str, u8, u8, &str)] = &[
    ("Cruz Azul", "Querétaro", 2, 2, "Liga MX Apertura 2024"),
    ("Tigres", "Atlas", 2, 0, "Liga MX Apertura 2024"),
    ("Palmeiras", "River Plate", 3, 1, "Copa Libertadores 2024"),
    ("Guadalajara", "Necaxa", 1, 0, "Liga MX Apertura 2024"),
    ("Puebla", "León", 0, 1, "Liga MX Apertura 2024"),
    ("Flamengo", "São Paulo", 2, 1, "Copa Libertadores 2024"),
];

fn pick_pairing<R: Rng + ?Sized>(teams: &'static [&'static str], rng: &mut R) -> (&'static str, &'static str) {
    let picked: Vec<&'static str> = teams.choose_multiple(rng, 2).copied().collect();
    (picked[0], picked[1])
}

// Exact `key=value` tokens, so `league=262` never matches the `league=2` marker.
fn query_tokens(request: &str) -> impl Iterator<Item = &str> {
    let query = request.split_once('?').map(|(_, q)| q).unwrap_or(request);
    query.split('&').map(str::trim).filter(|t| !t.is_empty())
}

fn mock_live_response(now: DateTime<Utc>) -> ProviderResponse {
    ProviderResponse::from_items(vec![fixture(
        "1",
        now,
        "LIVE",
        Some(67),
        ("Manchester City", "Real Madrid"),
        Goals {
            home: Some(2),
            away: Some(1),
        },
        "Champions League",
    )])
}

fn mock_champions_response(now: DateTime<Utc>) -> ProviderResponse {
    ProviderResponse::from_items(vec![
        fixture(
            "1",
            now - ChronoDuration::days(2),
            "FT",
            None,
            ("Barcelona", "PSG"),
            Goals {
                home: Some(3),
                away: Some(0),
            },
            "Champions League",
        ),
        fixture(
            "2",
            now + ChronoDuration::days(3),
            "NS",
            None,
            ("Bayern Munich", "Arsenal"),
            Goals::default(),
            "Champions League",
        ),
    ])
}

fn mock_liga_mx_response(now: DateTime<Utc>) -> ProviderResponse {
    ProviderResponse::from_items(vec![
        fixture(
            "1",
            now - ChronoDuration::days(1),
            "FT",
            None,
            ("América", "Guadalajara"),
            Goals {
                home: Some(1),
                away: Some(0),
            },
            "Liga MX",
        ),
        fixture(
            "2",
            now - ChronoDuration::days(3),
            "FT",
            None,
            ("Cruz Azul", "Tigres"),
            Goals {
                home: Some(2),
                away: Some(1),
            },
            "Liga MX",
        ),
    ])
}

fn fixture(
    id: &str,
    date: DateTime<Utc>,
    short: &str,
    elapsed: Option<u16>,
    (home, away): (&str, &str),
    goals: Goals,
    league: &str,
) -> Fixture {
    Fixture {
        fixture: FixtureInfo {
            id: id.to_string(),
            date,
            status: FixtureStatus {
                short: short.to_string(),
                elapsed,
            },
        },
        teams: Teams {
            home: TeamRef {
                name: home.to_string(),
                logo: Some(team_logo_url(home)),
            },
            away: TeamRef {
                name: away.to_string(),
                logo: Some(team_logo_url(away)),
            },
        },
        goals,
        league: LeagueInfo {
            name: league.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_tokens_match_whole_pairs() {
        let tokens: Vec<_> = query_tokens("/fixtures?league=262&season=2024").collect();
        assert_eq!(tokens, vec!["league=262", "season=2024"]);
        assert!(!tokens.contains(&CHAMPIONS_MARKER));
    }

    #[test]
    fn unknown_team_gets_default_logo() {
        assert_eq!(team_logo_url("Club Deportivo"), DEFAULT_LOGO);
        assert!(team_logo_url("Arsenal").ends_with("/42.png"));
    }
}
