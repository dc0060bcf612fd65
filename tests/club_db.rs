use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Duration, Utc};
use fc_descansa::club_db::{
    ClubDatabase, ERR_BAD_CREDENTIALS, ERR_EMAIL_TAKEN, ERR_INVALID_EMAIL, ERR_INVALID_PHONE,
    ERR_INVALID_POSITION, ERR_JERSEY_TAKEN, ERR_MISSING_FIELDS, LEGACY_USERS_KEY, MATCHES_KEY,
    MatchPatch, NEXT_MATCH_KEY, NewMatch, NewNews, NewPlayer, PLAYERS_KEY, PlayerFilter,
    PlayerPatch, StatsPatch,
};
use fc_descansa::error::{PersistError, StoreError};
use fc_descansa::model::{MatchStatus, Player, Position};
use fc_descansa::persist::{KeyValueStore, MemoryStore, SqliteStore, load_json};

/// Memory store whose writes can be switched off.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    fn break_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistError::Unavailable("disk full".to_string()));
        }
        self.inner.set(key, value)
    }

    fn keys(&self) -> Result<Vec<String>, PersistError> {
        self.inner.keys()
    }
}

/// Memory store that rejects writes to a single key.
struct KeyRejectingStore {
    inner: MemoryStore,
    key: &'static str,
}

impl KeyValueStore for KeyRejectingStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistError> {
        if key == self.key {
            return Err(PersistError::Unavailable(format!("{key} is read-only")));
        }
        self.inner.set(key, value)
    }

    fn keys(&self) -> Result<Vec<String>, PersistError> {
        self.inner.keys()
    }
}

fn player(name: &str, jersey: u8, email: &str) -> NewPlayer {
    NewPlayer {
        full_name: name.to_string(),
        nickname: None,
        jersey_number: Some(jersey),
        position: Some(Position::Midfielder),
        email: email.to_string(),
        whatsapp: "+525512345678".to_string(),
        password: "secreto123".to_string(),
        photo: None,
    }
}

fn fixture_match(home: &str, away: &str, kickoff: chrono::DateTime<Utc>) -> NewMatch {
    NewMatch {
        home_team: home.to_string(),
        away_team: away.to_string(),
        competition: None,
        kickoff,
        venue: Some("Campo 3".to_string()),
        status: None,
        home_score: None,
        away_score: None,
    }
}

fn validation_message(err: StoreError) -> String {
    match err {
        StoreError::Validation(msg) => msg,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn jersey_number_is_unique_among_active_players() {
    let mut db = ClubDatabase::open(MemoryStore::new()).expect("open");
    let first = db
        .add_player(player("Luis Pérez", 10, "luis@example.com"))
        .expect("first player");
    assert_eq!(first.id, 1);

    let err = db
        .add_player(player("Carlos Ruiz", 10, "carlos@example.com"))
        .expect_err("duplicate jersey");
    assert_eq!(err.status_code(), 400);
    assert_eq!(validation_message(err), ERR_JERSEY_TAKEN);
    assert_eq!(db.list_players(PlayerFilter::default()).len(), 1);
}

#[test]
fn invalid_input_never_mutates_the_roster() {
    let store = MemoryStore::new();
    let mut db = ClubDatabase::open(&store).expect("open");

    let cases = [
        (player("Ana", 7, "ana-at-example.com"), ERR_INVALID_EMAIL),
        (player("Ana", 7, "ana@example"), ERR_INVALID_EMAIL),
        (
            NewPlayer {
                whatsapp: "55-12".to_string(),
                ..player("Ana", 7, "ana@example.com")
            },
            ERR_INVALID_PHONE,
        ),
        (
            NewPlayer {
                position: None,
                ..player("Ana", 7, "ana@example.com")
            },
            ERR_MISSING_FIELDS,
        ),
        (player("   ", 7, "ana@example.com"), ERR_MISSING_FIELDS),
    ];
    for (input, expected) in cases {
        let err = db.add_player(input).expect_err("invalid player");
        assert_eq!(validation_message(err), expected);
    }

    assert!(db.list_players(PlayerFilter { include_inactive: true, ..Default::default() }).is_empty());
    assert_eq!(store.get(PLAYERS_KEY).expect("read"), None);
}

#[test]
fn email_uniqueness_ignores_case() {
    let mut db = ClubDatabase::open(MemoryStore::new()).expect("open");
    db.add_player(player("Luis", 10, "Luis@Example.com")).expect("first");

    let err = db
        .add_player(player("Otro Luis", 11, "luis@example.com  "))
        .expect_err("duplicate email");
    assert_eq!(validation_message(err), ERR_EMAIL_TAKEN);
    assert!(db.is_email_registered("LUIS@example.com", None));
}

#[test]
fn soft_deleted_player_frees_jersey_and_email() {
    let mut db = ClubDatabase::open(MemoryStore::new()).expect("open");
    let old = db.add_player(player("Veterano", 9, "nueve@example.com")).expect("add");

    db.remove_player(old.id).expect("remove");
    assert!(!db.get_player(old.id).expect("still on record").is_active);
    assert!(db.active_players().is_empty());

    let new = db
        .add_player(player("Nuevo", 9, "nueve@example.com"))
        .expect("jersey reusable");
    assert_eq!(new.id, 2);

    let err = db
        .update_player(
            old.id,
            PlayerPatch {
                is_active: Some(true),
                ..Default::default()
            },
        )
        .expect_err("reactivation collides");
    assert_eq!(validation_message(err), ERR_JERSEY_TAKEN);
}

#[test]
fn update_checks_uniqueness_against_others_only() {
    let mut db = ClubDatabase::open(MemoryStore::new()).expect("open");
    let a = db.add_player(player("A", 1, "a@example.com")).expect("a");
    db.add_player(player("B", 2, "b@example.com")).expect("b");

    let same = db
        .update_player(
            a.id,
            PlayerPatch {
                jersey_number: Some(1),
                nickname: Some("Capi".to_string()),
                ..Default::default()
            },
        )
        .expect("own number is fine");
    assert_eq!(same.nickname.as_deref(), Some("Capi"));

    let err = db
        .update_player(
            a.id,
            PlayerPatch {
                jersey_number: Some(2),
                ..Default::default()
            },
        )
        .expect_err("taken by B");
    assert_eq!(validation_message(err), ERR_JERSEY_TAKEN);
    assert_eq!(db.get_player(a.id).expect("a").jersey_number, 1);

    let missing = db
        .update_player(99, PlayerPatch::default())
        .expect_err("unknown id");
    assert!(matches!(missing, StoreError::NotFound(_)));
    assert_eq!(missing.status_code(), 404);
}

#[test]
fn failed_write_leaves_memory_untouched() {
    let store = FlakyStore::default();
    let mut db = ClubDatabase::open(&store).expect("open");
    let keeper = db.add_player(player("Portero", 1, "uno@example.com")).expect("add");

    store.break_writes();

    let err = db
        .add_player(player("Defensa", 4, "cuatro@example.com"))
        .expect_err("write fails");
    assert!(matches!(err, StoreError::Persistence(_)));
    assert_eq!(err.status_code(), 500);
    assert_eq!(db.active_players().len(), 1);

    db.update_player_stats(
        keeper.id,
        StatsPatch {
            goals: Some(3),
            ..Default::default()
        },
    )
    .expect_err("stats write fails");
    assert_eq!(db.get_player(keeper.id).expect("keeper").stats.goals, 0);

    db.add_match(fixture_match("FC Descansa", "Rayos", Utc::now() + Duration::days(2)))
        .expect_err("match write fails");
    assert!(db.list_matches().is_empty());
    assert!(db.next_match().is_none());
}

#[test]
fn legacy_registrations_are_merged_and_hashed() {
    let store = MemoryStore::new();
    store
        .set(
            PLAYERS_KEY,
            r#"[{"id":1,"fullName":"Luis Pérez","jerseyNumber":10,"position":"Delantero","email":"luis@example.com","whatsapp":"+525511111111","stats":{"goals":5,"assists":2,"matches":7,"yellowCards":0,"redCards":0}}]"#,
        )
        .expect("seed players");
    store
        .set(
            LEGACY_USERS_KEY,
            r#"[
                {"id":1,"fullName":"Luis Viejo","jerseyNumber":10,"position":"Delantero","email":"luis@example.com"},
                {"id":2,"fullName":"Marta Gómez","jerseyNumber":3,"position":"Defensa","email":"marta@example.com","whatsapp":"+525522222222","password":"clave"}
            ]"#,
        )
        .expect("seed legacy");

    let db = ClubDatabase::open(&store).expect("open");
    let players = db.list_players(PlayerFilter::default());

    assert_eq!(players.len(), 2);
    assert_eq!(players[0].full_name, "Luis Pérez");
    assert_eq!(players[0].position, Position::Forward);
    assert_eq!(players[0].stats.games_played, 7);
    assert_eq!(players[1].position, Position::Defender);

    let marta = db.authenticate("marta@example.com", "clave").expect("legacy password works");
    assert_eq!(marta.id, 2);
    assert!(!marta.password_hash.contains("clave"));
}

#[test]
fn unreadable_legacy_list_is_skipped() {
    let store = MemoryStore::new();
    store.set(LEGACY_USERS_KEY, "{not json").expect("seed");

    let db = ClubDatabase::open(&store).expect("open despite corrupt legacy data");
    assert!(db.active_players().is_empty());
}

#[test]
fn authentication_requires_active_player_and_password() {
    let mut db = ClubDatabase::open(MemoryStore::new()).expect("open");
    let p = db.add_player(player("Luis", 10, "luis@example.com")).expect("add");

    assert_eq!(db.authenticate(" LUIS@example.com", "secreto123").expect("login").id, p.id);
    let err = db.authenticate("luis@example.com", "wrong").expect_err("bad password");
    assert_eq!(validation_message(err), ERR_BAD_CREDENTIALS);

    db.remove_player(p.id).expect("remove");
    assert!(db.authenticate("luis@example.com", "secreto123").is_err());
}

#[test]
fn next_match_tracks_the_earliest_upcoming_fixture() {
    let store = MemoryStore::new();
    let mut db = ClubDatabase::open(&store).expect("open");
    let now = Utc::now();

    let later = db
        .add_match(fixture_match("FC Descansa", "Rayos", now + Duration::days(7)))
        .expect("later");
    let sooner = db
        .add_match(fixture_match("Toros", "FC Descansa", now + Duration::days(2)))
        .expect("sooner");
    db.add_match(NewMatch {
        status: Some(MatchStatus::Finished),
        home_score: Some(2),
        away_score: Some(1),
        ..fixture_match("FC Descansa", "Halcones", now - Duration::days(3))
    })
    .expect("past");

    assert_eq!(later.id, "1");
    assert_eq!(sooner.competition, "Liga Local");
    assert_eq!(db.next_match().map(|m| m.id.as_str()), Some("2"));
    assert_eq!(db.upcoming_matches(now).len(), 2);

    db.update_match(
        &sooner.id,
        MatchPatch {
            status: Some(MatchStatus::Postponed),
            ..Default::default()
        },
    )
    .expect("postpone");
    assert_eq!(db.next_match().map(|m| m.id.as_str()), Some("1"));

    db.remove_match(&later.id).expect("remove");
    assert!(db.next_match().is_none());
    assert!(matches!(db.remove_match(&later.id), Err(StoreError::NotFound(_))));

    let stored: Vec<serde_json::Value> = load_json(&store, MATCHES_KEY)
        .expect("read")
        .expect("matches saved");
    assert_eq!(stored.len(), 2);
}

#[test]
fn live_flag_follows_status_updates() {
    let mut db = ClubDatabase::open(MemoryStore::new()).expect("open");
    let m = db
        .add_match(fixture_match("FC Descansa", "Rayos", Utc::now()))
        .expect("add");
    assert!(!m.is_live());

    let live = db
        .update_match(
            &m.id,
            MatchPatch {
                status: Some(MatchStatus::Live),
                home_score: Some(1),
                away_score: Some(0),
                elapsed: Some(12),
                ..Default::default()
            },
        )
        .expect("kick off");
    assert!(live.is_live());

    let done = db
        .update_match(
            &m.id,
            MatchPatch {
                status: Some(MatchStatus::Finished),
                ..Default::default()
            },
        )
        .expect("full time");
    assert!(!done.is_live());

    let stats = db.team_stats();
    assert_eq!(stats.total_matches, 1);
    assert_eq!(stats.wins, 1);
}

#[test]
fn news_is_unpublished_not_deleted() {
    let mut db = ClubDatabase::open(MemoryStore::new()).expect("open");
    let item = db
        .add_news(NewNews {
            title: "Fichaje".to_string(),
            content: "Llega un nuevo portero".to_string(),
            ..Default::default()
        })
        .expect("add news");
    assert_eq!(item.author, "Administrador");

    db.remove_news(item.id).expect("unpublish");
    assert!(db.list_news().is_empty());
    assert!(!db.get_news(item.id).expect("kept").is_published);

    let err = db.add_news(NewNews::default()).expect_err("empty");
    assert_eq!(validation_message(err), ERR_MISSING_FIELDS);
}

#[test]
fn sqlite_store_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("club.sqlite");

    {
        let store = SqliteStore::open(&path).expect("open sqlite");
        let mut db = ClubDatabase::open(store).expect("open db");
        db.add_player(player("Luis", 10, "luis@example.com")).expect("add");
        db.add_match(fixture_match("FC Descansa", "Rayos", Utc::now() + Duration::days(1)))
            .expect("match");
    }

    let store = SqliteStore::open(&path).expect("reopen sqlite");
    let db = ClubDatabase::open(store).expect("reopen db");
    let players: Vec<Player> = db.active_players();
    assert_eq!(players.len(), 1);
    assert_eq!(players[0].email, "luis@example.com");
    assert!(db.next_match().is_some());

    let mut keys = db.store().keys().expect("keys");
    keys.sort();
    assert!(keys.contains(&PLAYERS_KEY.to_string()));
    assert!(keys.contains(&MATCHES_KEY.to_string()));
}

#[test]
fn export_contains_every_collection() {
    let mut db = ClubDatabase::open(MemoryStore::new()).expect("open");
    db.add_player(player("Luis", 10, "luis@example.com")).expect("add");

    let json: serde_json::Value =
        serde_json::from_str(&db.export_json().expect("export")).expect("valid json");
    assert_eq!(json["players"].as_array().map(Vec::len), Some(1));
    assert!(json["matches"].as_array().is_some());
    assert!(json["news"].as_array().is_some());
}

#[test]
fn failed_match_write_leaves_nothing_on_disk() {
    for rejected in [NEXT_MATCH_KEY, MATCHES_KEY] {
        let store = KeyRejectingStore {
            inner: MemoryStore::new(),
            key: rejected,
        };
        let mut db = ClubDatabase::open(&store).expect("open");

        let err = db
            .add_match(fixture_match("FC Descansa", "Rayos", Utc::now() + Duration::days(2)))
            .expect_err("write fails");
        assert!(matches!(err, StoreError::Persistence(_)), "{rejected}");
        assert!(db.list_matches().is_empty());

        assert_eq!(store.inner.get(MATCHES_KEY).expect("read"), None, "{rejected}");
        let reopened = ClubDatabase::open(&store.inner).expect("reopen");
        assert!(reopened.list_matches().is_empty());
        assert!(reopened.next_match().is_none());
    }
}

#[test]
fn unknown_positions_are_rejected() {
    let mut db = ClubDatabase::open(MemoryStore::new()).expect("open");
    let form: NewPlayer = serde_json::from_str(
        r#"{"fullName":"Ana","jerseyNumber":7,"position":"banana","email":"ana@example.com","whatsapp":"+525511111111","password":"clave"}"#,
    )
    .expect("form should parse");
    assert_eq!(form.position, Some(Position::Unassigned));

    let err = db.add_player(form).expect_err("banana is not a position");
    assert_eq!(validation_message(err), ERR_INVALID_POSITION);
    assert!(db.active_players().is_empty());

    let p = db
        .add_player(NewPlayer {
            position: Some(Position::Goalkeeper),
            ..player("Ana", 7, "ana@example.com")
        })
        .expect("valid position");
    let err = db
        .update_player(
            p.id,
            PlayerPatch {
                position: Some(Position::Unassigned),
                ..Default::default()
            },
        )
        .expect_err("cannot clear position");
    assert_eq!(validation_message(err), ERR_INVALID_POSITION);
    assert_eq!(db.get_player(p.id).expect("kept").position, Position::Goalkeeper);
}

#[test]
fn one_malformed_legacy_record_does_not_drop_the_rest() {
    let store = MemoryStore::new();
    store
        .set(
            LEGACY_USERS_KEY,
            r#"[
                {"id":1,"fullName":"Marta Gómez","jerseyNumber":3,"position":"Defensa","email":"marta@example.com"},
                {"id":"dos","fullName":"Sin Id","jerseyNumber":4,"position":"Portero","email":"sinid@example.com"},
                {"id":3,"fullName":"Número Raro","jerseyNumber":300,"position":"Portero","email":"raro@example.com"},
                {"id":4,"fullName":"Pedro Ruiz","jerseyNumber":8,"position":"Mediocampista","email":"pedro@example.com"}
            ]"#,
        )
        .expect("seed legacy");

    let db = ClubDatabase::open(&store).expect("open");
    let ids: Vec<u64> = db.active_players().iter().map(|p| p.id).collect();

    assert_eq!(ids, vec![1, 4]);
    assert_eq!(db.get_player(4).expect("pedro").position, Position::Midfielder);
}
