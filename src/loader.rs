use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use parquet::file::reader::FileReader;

use crate::play_store::{GameContext, ParticipationRow, PlayerWeekRow, StoredPlay};
use crate::schema::{Dataset, RowFields, open_parquet, require_columns};

const NFLVERSE_BASE: &str = "https://github.com/nflverse/nflverse-data/releases/download";
const DOWNLOAD_ATTEMPTS: u32 = 4;
const HTTP_TIMEOUT_SECS: u64 = 120;

pub fn http_client() -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent("gridiron_dc/0.1")
        .build()
        .context("build http client")
}

/// `$XDG_CACHE_HOME/gridiron_dc`, falling back to `~/.cache/gridiron_dc`.
pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME")
        && !xdg.trim().is_empty()
    {
        return Some(PathBuf::from(xdg).join("gridiron_dc"));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join("gridiron_dc"))
}

pub fn dataset_url(dataset: Dataset, season: i32) -> String {
    match dataset {
        Dataset::PlayByPlay => {
            format!("{NFLVERSE_BASE}/pbp/play_by_play_{season}.parquet")
        }
        Dataset::Participation => {
            format!("{NFLVERSE_BASE}/pbp_participation/pbp_participation_{season}.parquet")
        }
        Dataset::PlayerStats => {
            format!("{NFLVERSE_BASE}/player_stats/stats_player_week_{season}.parquet")
        }
        Dataset::Schedules => format!("{NFLVERSE_BASE}/schedules/games.parquet"),
    }
}

fn cache_path(dataset: Dataset, season: i32) -> Result<PathBuf> {
    let dir = app_cache_dir()
        .ok_or_else(|| anyhow!("cannot resolve cache dir (no XDG_CACHE_HOME or HOME)"))?
        .join("raw");
    std::fs::create_dir_all(&dir).with_context(|| format!("create cache dir {}", dir.display()))?;
    let name = if dataset.season_keyed() {
        format!("{dataset}_{season}.parquet")
    } else {
        format!("{dataset}.parquet")
    };
    Ok(dir.join(name))
}

/// Download with a bounded retry loop, writing through a tmp file so a
/// partial download never poisons the cache.
fn download_file(client: &reqwest::blocking::Client, url: &str, dest: &Path) -> Result<()> {
    let mut last_err: Option<anyhow::Error> = None;
    for attempt in 1..=DOWNLOAD_ATTEMPTS {
        match try_download(client, url, dest) {
            Ok(()) => return Ok(()),
            Err(err) => {
                last_err = Some(err);
                if attempt < DOWNLOAD_ATTEMPTS {
                    std::thread::sleep(Duration::from_millis(500 * u64::from(attempt)));
                }
            }
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow!("download failed: {url}")))
}

fn try_download(client: &reqwest::blocking::Client, url: &str, dest: &Path) -> Result<()> {
    let resp = client.get(url).send().with_context(|| format!("GET {url}"))?;
    if !resp.status().is_success() {
        return Err(anyhow!("GET {url} -> HTTP {}", resp.status()));
    }
    let bytes = resp.bytes().with_context(|| format!("read body {url}"))?;
    let tmp = dest.with_extension("parquet.tmp");
    std::fs::write(&tmp, &bytes).with_context(|| format!("write {}", tmp.display()))?;
    std::fs::rename(&tmp, dest).with_context(|| format!("rename into {}", dest.display()))?;
    Ok(())
}

/// Cache hit unless `force` is set; otherwise download and memoize.
pub fn fetch_dataset(
    client: &reqwest::blocking::Client,
    dataset: Dataset,
    season: i32,
    force: bool,
) -> Result<PathBuf> {
    let path = cache_path(dataset, season)?;
    if !force && path.is_file() {
        return Ok(path);
    }
    let url = dataset_url(dataset, season);
    download_file(client, &url, &path)
        .with_context(|| format!("fetch dataset {dataset} season {season}"))?;
    Ok(path)
}

const PBP_REQUIRED: &[&str] = &[
    "game_id",
    "play_id",
    "season",
    "week",
    "posteam",
    "defteam",
    "play_type",
    "down",
    "ydstogo",
    "yardline_100",
    "score_differential",
    "qtr",
];

pub fn load_plays(
    client: &reqwest::blocking::Client,
    season: i32,
    force: bool,
) -> Result<Vec<StoredPlay>> {
    let path = fetch_dataset(client, Dataset::PlayByPlay, season, force)?;
    let reader = open_parquet(&path)?;
    require_columns(&reader, Dataset::PlayByPlay, PBP_REQUIRED)?;

    let mut plays = Vec::new();
    let rows = reader.get_row_iter(None).context("pbp row iterator")?;
    for row in rows {
        let row = row.context("read pbp row")?;
        let fields = RowFields::new(&row);

        // Only called run/pass plays carry a predictable label. Kneels,
        // spikes, punts and penalties without a snap are filtered here.
        let play_type = match fields.str("play_type") {
            Some(t) => t,
            None => continue,
        };
        let is_pass = match play_type {
            "pass" => true,
            "run" => false,
            _ => continue,
        };

        let (Some(game_id), Some(play_id), Some(posteam), Some(defteam)) = (
            fields.str("game_id"),
            fields.i64("play_id"),
            fields.str("posteam"),
            fields.str("defteam"),
        ) else {
            continue;
        };
        let (Some(down), Some(ydstogo), Some(yardline_100), Some(score_diff), Some(qtr)) = (
            fields.i32("down"),
            fields.i32("ydstogo"),
            fields.i32("yardline_100"),
            fields.i32("score_differential"),
            fields.i32("qtr"),
        ) else {
            continue;
        };

        plays.push(StoredPlay {
            game_id: game_id.to_string(),
            play_id,
            season: fields.i32("season").unwrap_or(season),
            week: fields.i32("week").unwrap_or(0),
            posteam: posteam.to_string(),
            defteam: defteam.to_string(),
            drive: fields.i64("drive"),
            qtr,
            down,
            ydstogo,
            yardline_100,
            score_differential: score_diff,
            half_seconds_remaining: fields.f64("half_seconds_remaining"),
            game_seconds_remaining: fields.f64("game_seconds_remaining"),
            shotgun: fields.flag("shotgun").unwrap_or(false),
            no_huddle: fields.flag("no_huddle").unwrap_or(false),
            is_pass,
            epa: fields.f64("epa"),
            yards_gained: fields.f64("yards_gained"),
            first_down: fields.flag("first_down").unwrap_or(false),
        });
    }
    Ok(plays)
}

const SCHEDULE_REQUIRED: &[&str] = &["game_id", "season", "week", "home_team", "away_team"];

pub fn load_schedules(
    client: &reqwest::blocking::Client,
    season: i32,
    force: bool,
) -> Result<Vec<GameContext>> {
    let path = fetch_dataset(client, Dataset::Schedules, season, force)?;
    let reader = open_parquet(&path)?;
    require_columns(&reader, Dataset::Schedules, SCHEDULE_REQUIRED)?;

    let mut games = Vec::new();
    let rows = reader.get_row_iter(None).context("schedules row iterator")?;
    for row in rows {
        let row = row.context("read schedule row")?;
        let fields = RowFields::new(&row);
        if fields.i32("season") != Some(season) {
            continue;
        }
        let (Some(game_id), Some(week), Some(home_team), Some(away_team)) = (
            fields.str("game_id"),
            fields.i32("week"),
            fields.str("home_team"),
            fields.str("away_team"),
        ) else {
            continue;
        };
        games.push(GameContext {
            game_id: game_id.to_string(),
            season,
            week,
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            roof: fields.str("roof").map(str::to_string),
            surface: fields.str("surface").map(str::to_string),
            temp: fields.f64("temp"),
            wind: fields.f64("wind"),
            home_rest: fields.i64("home_rest"),
            away_rest: fields.i64("away_rest"),
            div_game: fields.flag("div_game"),
        });
    }
    Ok(games)
}

const PARTICIPATION_REQUIRED: &[&str] = &["nflverse_game_id", "play_id"];

pub fn load_participation(
    client: &reqwest::blocking::Client,
    season: i32,
    force: bool,
) -> Result<Vec<ParticipationRow>> {
    let path = fetch_dataset(client, Dataset::Participation, season, force)?;
    let reader = open_parquet(&path)?;
    require_columns(&reader, Dataset::Participation, PARTICIPATION_REQUIRED)?;

    let mut out = Vec::new();
    let rows = reader
        .get_row_iter(None)
        .context("participation row iterator")?;
    for row in rows {
        let row = row.context("read participation row")?;
        let fields = RowFields::new(&row);
        let (Some(game_id), Some(play_id)) =
            (fields.str("nflverse_game_id"), fields.i64("play_id"))
        else {
            continue;
        };
        out.push(ParticipationRow {
            game_id: game_id.to_string(),
            play_id,
            defenders_in_box: fields.f64("defenders_in_box"),
            pass_rushers: fields.f64("number_of_pass_rushers"),
        });
    }
    Ok(out)
}

const PLAYER_STATS_REQUIRED: &[&str] = &["season", "week", "position"];

pub fn load_player_weeks(
    client: &reqwest::blocking::Client,
    season: i32,
    force: bool,
) -> Result<Vec<PlayerWeekRow>> {
    let path = fetch_dataset(client, Dataset::PlayerStats, season, force)?;
    let reader = open_parquet(&path)?;
    require_columns(&reader, Dataset::PlayerStats, PLAYER_STATS_REQUIRED)?;

    let mut out = Vec::new();
    let rows = reader
        .get_row_iter(None)
        .context("player stats row iterator")?;
    for row in rows {
        let row = row.context("read player stats row")?;
        let fields = RowFields::new(&row);
        let (Some(week), Some(position)) = (fields.i32("week"), fields.str("position")) else {
            continue;
        };
        // Column was renamed from recent_team to team in newer releases.
        let Some(team) = fields.str("team").or_else(|| fields.str("recent_team")) else {
            return Err(anyhow!(
                "dataset player_stats season {season} has neither 'team' nor 'recent_team'"
            ));
        };
        out.push(PlayerWeekRow {
            season: fields.i32("season").unwrap_or(season),
            week,
            team: team.to_string(),
            position: position.to_string(),
            completions: fields.f64("completions").unwrap_or(0.0),
            attempts: fields.f64("attempts").unwrap_or(0.0),
            passing_yards: fields.f64("passing_yards").unwrap_or(0.0),
            passing_tds: fields.f64("passing_tds").unwrap_or(0.0),
            interceptions: fields.f64("interceptions").unwrap_or(0.0),
            carries: fields.f64("carries").unwrap_or(0.0),
            rushing_yards: fields.f64("rushing_yards").unwrap_or(0.0),
            rushing_tds: fields.f64("rushing_tds").unwrap_or(0.0),
            receptions: fields.f64("receptions").unwrap_or(0.0),
            targets: fields.f64("targets").unwrap_or(0.0),
            receiving_yards: fields.f64("receiving_yards").unwrap_or(0.0),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_season_keyed_where_expected() {
        assert!(dataset_url(Dataset::PlayByPlay, 2023).contains("play_by_play_2023.parquet"));
        assert!(dataset_url(Dataset::Participation, 2023).contains("pbp_participation_2023"));
        assert!(dataset_url(Dataset::PlayerStats, 2024).contains("stats_player_week_2024"));
        assert!(dataset_url(Dataset::Schedules, 2023).ends_with("games.parquet"));
        assert_eq!(
            dataset_url(Dataset::Schedules, 2023),
            dataset_url(Dataset::Schedules, 2024)
        );
    }
}
