use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use fc_descansa::club::Club;
use fc_descansa::club_db::ClubDatabase;
use fc_descansa::config::{AppConfig, load_dotenv};
use fc_descansa::football_api::FootballApi;
use fc_descansa::notify::NotificationDispatcher;
use fc_descansa::persist::SqliteStore;

const USAGE: &str = "usage: fc_descansa <live|finished|league <key>|standings <key>|team <id>|date <YYYY-MM-DD>|players|next-match|stats|export|remind <match-id>|api-status>";

fn main() -> Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let Some(command) = args.first() else {
        bail!(USAGE);
    };

    match command.as_str() {
        "live" | "finished" | "league" | "standings" | "team" | "date" | "api-status" => {
            let api = FootballApi::from_config(config.api.clone())?;
            match command.as_str() {
                "live" => print_json(&api.live_matches()),
                "finished" => print_json(&api.finished_matches()),
                "league" => {
                    let key = args.get(1).ok_or_else(|| anyhow!(USAGE))?;
                    print_json(&api.matches_by_league_key(key))
                }
                "standings" => {
                    let key = args.get(1).ok_or_else(|| anyhow!(USAGE))?;
                    print_json(&api.standings(key))
                }
                "team" => {
                    let raw = args.get(1).ok_or_else(|| anyhow!(USAGE))?;
                    let id = raw
                        .parse::<u64>()
                        .with_context(|| format!("invalid team id {raw}"))?;
                    print_json(&api.team_info(id))
                }
                "date" => {
                    let raw = args.get(1).ok_or_else(|| anyhow!(USAGE))?;
                    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                        .with_context(|| format!("invalid date {raw}"))?;
                    print_json(&api.matches_by_date(date))
                }
                _ => print_json(&api.check_api_key()),
            }
        }
        "players" | "next-match" | "stats" | "export" | "remind" => {
            let db_path = config
                .db_path
                .clone()
                .context("unable to resolve database path")?;
            let store = SqliteStore::open(&db_path)
                .with_context(|| format!("open club db {}", db_path.display()))?;
            let db = ClubDatabase::open(store).context("load club db")?;
            match command.as_str() {
                "players" => print_json(&db.active_players()),
                "next-match" => print_json(&db.next_match()),
                "stats" => print_json(&db.team_stats()),
                "remind" => {
                    let match_id = args.get(1).ok_or_else(|| anyhow!(USAGE))?;
                    let dispatcher = NotificationDispatcher::from_config(&config)?;
                    let mut club = Club::new(db, dispatcher);
                    let deliveries = club
                        .send_reminder(match_id)
                        .with_context(|| format!("remind players of match {match_id}"))?;
                    print_json(&deliveries)
                }
                _ => {
                    println!("{}", db.export_json()?);
                    Ok(())
                }
            }
        }
        other => bail!("unknown command {other}\n{USAGE}"),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{json}");
    Ok(())
}
