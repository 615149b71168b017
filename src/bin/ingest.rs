use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use gridiron_dc::loader;
use gridiron_dc::play_store;

const DEFAULT_SEASONS: &[i32] = &[2021, 2022, 2023, 2024];

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let seasons = parse_seasons_arg().unwrap_or_else(default_seasons_from_env);
    if seasons.is_empty() {
        return Err(anyhow!("no seasons resolved for ingest"));
    }

    let db_path = parse_db_path_arg()
        .or_else(play_store::default_db_path)
        .context("unable to resolve sqlite path")?;
    let force = has_flag("--force");

    let client = loader::http_client()?;
    let mut conn = play_store::open_db(&db_path)?;
    let summary =
        play_store::ingest_seasons(&mut conn, db_path.clone(), &client, &seasons, force)?;

    println!("Play archive ingest complete");
    println!("DB: {}", summary.db_path.display());
    println!("Seasons: {:?}", summary.seasons);
    println!("Plays upserted: {}", summary.plays_upserted);

    let mut season_keys = summary.per_season.keys().copied().collect::<Vec<_>>();
    season_keys.sort_unstable();
    for season in season_keys {
        let Some(item) = summary.per_season.get(&season) else {
            continue;
        };
        println!(
            "season {}: plays={} games={} participation={} player_weeks={}",
            season,
            item.plays_upserted,
            item.games_upserted,
            item.participation_rows,
            item.player_week_rows
        );
        if !item.errors.is_empty() {
            println!("  errors: {}", item.errors.len());
            for err in item.errors.iter().take(6) {
                println!("   - {err}");
            }
        }
    }

    Ok(())
}

fn parse_db_path_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--db=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--db"
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next));
        }
    }
    std::env::var("APP_DB_PATH").ok().map(PathBuf::from)
}

fn parse_seasons_arg() -> Option<Vec<i32>> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix("--seasons=") {
            let seasons = parse_seasons(raw);
            if !seasons.is_empty() {
                return Some(seasons);
            }
        }
        if arg == "--seasons"
            && let Some(next) = args.get(idx + 1)
        {
            let seasons = parse_seasons(next);
            if !seasons.is_empty() {
                return Some(seasons);
            }
        }
    }
    None
}

fn default_seasons_from_env() -> Vec<i32> {
    match std::env::var("APP_SEASONS") {
        Ok(raw) if !raw.trim().is_empty() => parse_seasons(&raw),
        _ => DEFAULT_SEASONS.to_vec(),
    }
}

fn parse_seasons(raw: &str) -> Vec<i32> {
    let mut seasons = raw
        .split([',', ';', ' '])
        .filter_map(|part| part.trim().parse::<i32>().ok())
        .filter(|s| (1999..=2100).contains(s))
        .collect::<Vec<_>>();
    seasons.sort_unstable();
    seasons.dedup();
    seasons
}

fn has_flag(flag: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == flag)
}
