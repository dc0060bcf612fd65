use crate::model::{Match, Standing, TeamInfo};
use crate::provider::{Fixture, LeagueStandings, ProviderResponse, StandingRow, TeamEntry};

/// Maps one provider fixture onto the canonical match record.
///
/// The live flag is always derived from the fixture's status code, including
/// for fixtures pulled from a `live=all` query.
pub fn normalize(fixture: &Fixture) -> Match {
    let status = fixture.status();
    let mut out = Match::new(
        fixture.fixture.id.clone(),
        fixture.teams.home.name.clone(),
        fixture.teams.away.name.clone(),
        fixture.league.name.clone(),
        fixture.fixture.date,
        status,
    )
    .with_logos(
        fixture.teams.home.logo.clone(),
        fixture.teams.away.logo.clone(),
    );
    out.home_score = fixture.goals.home;
    out.away_score = fixture.goals.away;
    out.elapsed = fixture.fixture.status.elapsed;
    out
}

pub fn normalize_all(data: &ProviderResponse) -> Vec<Match> {
    data.response.iter().map(normalize).collect()
}

/// The first table of the first league in a `/standings` payload.
pub fn normalize_standings(data: &ProviderResponse<LeagueStandings>) -> Vec<Standing> {
    data.response
        .first()
        .and_then(|entry| entry.league.standings.first())
        .map(|table| table.iter().map(normalize_standing).collect())
        .unwrap_or_default()
}

fn normalize_standing(row: &StandingRow) -> Standing {
    Standing {
        rank: row.rank,
        team_id: row.team.id,
        team: row.team.name.clone(),
        team_logo: row.team.logo.clone(),
        played: row.all.played,
        won: row.all.win,
        drawn: row.all.draw,
        lost: row.all.lose,
        goals_for: row.all.goals.scored,
        goals_against: row.all.goals.against,
        goal_difference: row.goals_diff,
        points: row.points,
        form: row.form.clone(),
    }
}

pub fn normalize_team(entry: &TeamEntry) -> TeamInfo {
    let team = &entry.team;
    let venue = entry.venue.as_ref();
    TeamInfo {
        id: team.id,
        name: team.name.clone(),
        short_name: team.code.clone().unwrap_or_else(|| team.name.clone()),
        crest: team.logo.clone(),
        country: team.country.clone(),
        founded: team.founded,
        venue: venue.and_then(|v| v.name.clone()),
        city: venue.and_then(|v| v.city.clone()),
    }
}
