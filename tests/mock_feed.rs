use chrono::{TimeZone, Utc};
use fc_descansa::mock_feed::{
    FINISHED_PER_LEAGUE, LEAGUE_ROSTERS, MAX_GOALS, MockDataProvider, TODAY_PER_LEAGUE, roster,
};
use fc_descansa::model::MatchStatus;

fn noon() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 20, 12, 0, 0).unwrap()
}

#[test]
fn same_seed_gives_same_league_data() {
    let a = MockDataProvider::seeded(42).simulated_league_matches("premier", noon());
    let b = MockDataProvider::seeded(42).simulated_league_matches("premier", noon());
    assert_eq!(a, b);
}

#[test]
fn yesterday_is_finished_with_scores() {
    let matches = MockDataProvider::seeded(9).simulated_league_matches("serie-a", noon());
    assert_eq!(matches.len(), FINISHED_PER_LEAGUE + TODAY_PER_LEAGUE);

    let finished = &matches[..FINISHED_PER_LEAGUE];
    for m in finished {
        assert_eq!(m.status, MatchStatus::Finished);
        assert!(!m.is_live());
        assert!(m.home_score.is_some_and(|g| g < MAX_GOALS));
        assert!(m.away_score.is_some_and(|g| g < MAX_GOALS));
        assert!(m.id.starts_with("serie-a-20241019-"));
        assert_eq!(m.competition, "Serie A");
    }
}

#[test]
fn today_is_either_live_with_minute_or_not_started() {
    for seed in 0..20 {
        let matches = MockDataProvider::seeded(seed).simulated_league_matches("liga-mx", noon());
        for m in &matches[FINISHED_PER_LEAGUE..] {
            assert!(m.id.starts_with("liga-mx-20241020-today-"));
            match m.status {
                MatchStatus::Live => {
                    assert!(m.is_live());
                    assert!(m.elapsed.is_some_and(|e| (1..=90).contains(&e)));
                    assert!(m.home_score.is_some() && m.away_score.is_some());
                }
                MatchStatus::NotStarted => {
                    assert!(m.elapsed.is_none());
                    assert!(m.home_score.is_none());
                }
                other => panic!("unexpected status {other:?}"),
            }
        }
    }
}

#[test]
fn pairings_use_two_distinct_roster_teams() {
    let provider = MockDataProvider::seeded(5);
    for league in LEAGUE_ROSTERS {
        let teams = roster(league.key).expect("roster").teams;
        for m in provider.simulated_league_matches(league.key, noon()) {
            assert_ne!(m.home_team, m.away_team);
            assert!(teams.contains(&m.home_team.as_str()));
            assert!(teams.contains(&m.away_team.as_str()));
        }
    }
}

#[test]
fn unknown_league_simulates_nothing() {
    assert!(
        MockDataProvider::seeded(1)
            .simulated_league_matches("eredivisie", noon())
            .is_empty()
    );
}

#[test]
fn mock_for_dispatches_on_exact_query_tokens() {
    let provider = MockDataProvider::seeded(1);

    let live = provider.mock_for("/fixtures?date=2024-10-20&live=all&season=2024", noon());
    assert_eq!(live.response.len(), 1);
    assert_eq!(live.response[0].teams.home.name, "Manchester City");
    assert_eq!(live.response[0].fixture.status.elapsed, Some(67));

    let champions = provider.mock_for("/fixtures?league=2&season=2024", noon());
    assert_eq!(champions.response[0].teams.away.name, "PSG");

    let liga_mx = provider.mock_for("/fixtures?league=262&season=2024", noon());
    assert_eq!(liga_mx.response.len(), 2);
    assert_eq!(liga_mx.response[0].teams.home.name, "América");

    assert!(provider.mock_for("/fixtures?league=140", noon()).is_empty());
}

#[test]
fn fallbacks_have_fixed_shapes() {
    let provider = MockDataProvider::seeded(1);

    let live = provider.live_fallback(noon());
    assert_eq!(live.len(), 4);
    assert_eq!(live[0].id, "mock-live-1");
    assert!(live.iter().all(|m| m.is_live() && m.elapsed.is_some()));

    let finished = provider.finished_fallback(noon());
    assert_eq!(finished.len(), 6);
    assert!(finished.iter().all(|m| m.status == MatchStatus::Finished && !m.is_live()));
}
