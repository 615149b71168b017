use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, params};

use crate::loader;

/// One offensive run/pass play, the unit of prediction. Immutable once
/// ingested; everything downstream is derived from these rows.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPlay {
    pub game_id: String,
    pub play_id: i64,
    pub season: i32,
    pub week: i32,
    pub posteam: String,
    pub defteam: String,
    pub drive: Option<i64>,
    pub qtr: i32,
    pub down: i32,
    pub ydstogo: i32,
    pub yardline_100: i32,
    pub score_differential: i32,
    pub half_seconds_remaining: Option<f64>,
    pub game_seconds_remaining: Option<f64>,
    pub shotgun: bool,
    pub no_huddle: bool,
    pub is_pass: bool,
    pub epa: Option<f64>,
    pub yards_gained: Option<f64>,
    pub first_down: bool,
}

impl StoredPlay {
    /// Cross-game temporal precedence. Plays sharing a (season, week) are
    /// simultaneous for historical aggregation: neither sees the other.
    pub fn week_key(&self) -> (i32, i32) {
        (self.season, self.week)
    }

    /// Full within-dataset ordering used by the derivation pass.
    pub fn order_key(&self) -> (i32, i32, &str, i64) {
        (self.season, self.week, self.game_id.as_str(), self.play_id)
    }
}

/// Per-game environment joined from the schedules table.
#[derive(Debug, Clone, Default)]
pub struct GameContext {
    pub game_id: String,
    pub season: i32,
    pub week: i32,
    pub home_team: String,
    pub away_team: String,
    pub roof: Option<String>,
    pub surface: Option<String>,
    pub temp: Option<f64>,
    pub wind: Option<f64>,
    pub home_rest: Option<i64>,
    pub away_rest: Option<i64>,
    pub div_game: Option<bool>,
}

/// Pre-snap alignment counts from the participation table. Kept in a
/// separate table because coverage stops after the 2023 season.
#[derive(Debug, Clone)]
pub struct ParticipationRow {
    pub game_id: String,
    pub play_id: i64,
    pub defenders_in_box: Option<f64>,
    pub pass_rushers: Option<f64>,
}

/// One player-week stat line, aggregated to team level at derivation time.
#[derive(Debug, Clone)]
pub struct PlayerWeekRow {
    pub season: i32,
    pub week: i32,
    pub team: String,
    pub position: String,
    pub completions: f64,
    pub attempts: f64,
    pub passing_yards: f64,
    pub passing_tds: f64,
    pub interceptions: f64,
    pub carries: f64,
    pub rushing_yards: f64,
    pub rushing_tds: f64,
    pub receptions: f64,
    pub targets: f64,
    pub receiving_yards: f64,
}

#[derive(Debug, Clone)]
pub struct SeasonIngestSummary {
    pub season: i32,
    pub plays_upserted: usize,
    pub games_upserted: usize,
    pub participation_rows: usize,
    pub player_week_rows: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub db_path: PathBuf,
    pub seasons: Vec<i32>,
    pub plays_upserted: usize,
    pub per_season: HashMap<i32, SeasonIngestSummary>,
}

pub fn default_db_path() -> Option<PathBuf> {
    loader::app_cache_dir().map(|dir| dir.join("play_archive.sqlite"))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS plays (
            game_id TEXT NOT NULL,
            play_id INTEGER NOT NULL,
            season INTEGER NOT NULL,
            week INTEGER NOT NULL,
            posteam TEXT NOT NULL,
            defteam TEXT NOT NULL,
            drive INTEGER NULL,
            qtr INTEGER NOT NULL,
            down INTEGER NOT NULL,
            ydstogo INTEGER NOT NULL,
            yardline_100 INTEGER NOT NULL,
            score_differential INTEGER NOT NULL,
            half_seconds_remaining REAL NULL,
            game_seconds_remaining REAL NULL,
            shotgun INTEGER NOT NULL,
            no_huddle INTEGER NOT NULL,
            is_pass INTEGER NOT NULL,
            epa REAL NULL,
            yards_gained REAL NULL,
            first_down INTEGER NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (game_id, play_id)
        );
        CREATE INDEX IF NOT EXISTS idx_plays_season_week ON plays(season, week);
        CREATE INDEX IF NOT EXISTS idx_plays_posteam ON plays(posteam);

        CREATE TABLE IF NOT EXISTS games (
            game_id TEXT PRIMARY KEY,
            season INTEGER NOT NULL,
            week INTEGER NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            roof TEXT NULL,
            surface TEXT NULL,
            temp REAL NULL,
            wind REAL NULL,
            home_rest INTEGER NULL,
            away_rest INTEGER NULL,
            div_game INTEGER NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_games_season ON games(season);

        CREATE TABLE IF NOT EXISTS participation (
            game_id TEXT NOT NULL,
            play_id INTEGER NOT NULL,
            defenders_in_box REAL NULL,
            pass_rushers REAL NULL,
            PRIMARY KEY (game_id, play_id)
        );

        CREATE TABLE IF NOT EXISTS player_weeks (
            season INTEGER NOT NULL,
            week INTEGER NOT NULL,
            team TEXT NOT NULL,
            position TEXT NOT NULL,
            completions REAL NOT NULL,
            attempts REAL NOT NULL,
            passing_yards REAL NOT NULL,
            passing_tds REAL NOT NULL,
            interceptions REAL NOT NULL,
            carries REAL NOT NULL,
            rushing_yards REAL NOT NULL,
            rushing_tds REAL NOT NULL,
            receptions REAL NOT NULL,
            targets REAL NOT NULL,
            receiving_yards REAL NOT NULL,
            PRIMARY KEY (season, week, team, position)
        );

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            season INTEGER NOT NULL,
            plays_upserted INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Fetch-or-cache the raw tables for each season and upsert into the
/// archive. A missing play-by-play table is fatal for its season; the
/// optional tables (participation, schedules, player stats) are recorded
/// as errors and derivation fails later only if a category needs them.
pub fn ingest_seasons(
    conn: &mut Connection,
    db_path: PathBuf,
    client: &reqwest::blocking::Client,
    seasons: &[i32],
    force_fetch: bool,
) -> Result<IngestSummary> {
    if seasons.is_empty() {
        return Err(anyhow!("no seasons passed to ingest"));
    }

    let mut per_season = HashMap::new();
    let mut plays_total = 0usize;

    for &season in seasons {
        let summary = ingest_single_season(conn, client, season, force_fetch)?;
        plays_total += summary.plays_upserted;
        per_season.insert(season, summary);
    }

    Ok(IngestSummary {
        db_path,
        seasons: seasons.to_vec(),
        plays_upserted: plays_total,
        per_season,
    })
}

fn ingest_single_season(
    conn: &mut Connection,
    client: &reqwest::blocking::Client,
    season: i32,
    force_fetch: bool,
) -> Result<SeasonIngestSummary> {
    let started_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO ingest_runs(started_at, finished_at, season, plays_upserted, errors_json)
         VALUES (?1, NULL, ?2, 0, '[]')",
        params![started_at, season as i64],
    )
    .context("insert ingest run")?;
    let run_id = conn.last_insert_rowid();

    let mut errors: Vec<String> = Vec::new();

    let plays = loader::load_plays(client, season, force_fetch)
        .with_context(|| format!("load play-by-play for season {season}"))?;
    if plays.is_empty() {
        return Err(anyhow!(
            "dataset pbp season {season} returned no run/pass plays"
        ));
    }

    let tx = conn.transaction().context("begin ingest transaction")?;
    for play in &plays {
        upsert_play(&tx, play)?;
    }
    tx.commit().context("commit play upserts")?;
    let plays_upserted = plays.len();

    let mut games_upserted = 0usize;
    match loader::load_schedules(client, season, force_fetch) {
        Ok(games) => {
            let tx = conn.transaction().context("begin games transaction")?;
            for game in &games {
                upsert_game(&tx, game)?;
            }
            tx.commit().context("commit game upserts")?;
            games_upserted = games.len();
        }
        Err(err) => errors.push(format!("schedules {season}: {err:#}")),
    }

    let mut participation_rows = 0usize;
    match loader::load_participation(client, season, force_fetch) {
        Ok(rows) => {
            let tx = conn
                .transaction()
                .context("begin participation transaction")?;
            for row in &rows {
                upsert_participation(&tx, row)?;
            }
            tx.commit().context("commit participation upserts")?;
            participation_rows = rows.len();
        }
        Err(err) => errors.push(format!("participation {season}: {err:#}")),
    }

    let mut player_week_rows = 0usize;
    match loader::load_player_weeks(client, season, force_fetch) {
        Ok(rows) => {
            let tx = conn
                .transaction()
                .context("begin player stats transaction")?;
            for row in &rows {
                upsert_player_week(&tx, row)?;
            }
            tx.commit().context("commit player stat upserts")?;
            player_week_rows = rows.len();
        }
        Err(err) => errors.push(format!("player_stats {season}: {err:#}")),
    }

    let finished_at = Utc::now().to_rfc3339();
    let errors_json = serde_json::to_string(&errors).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "UPDATE ingest_runs
         SET finished_at = ?1, plays_upserted = ?2, errors_json = ?3
         WHERE run_id = ?4",
        params![finished_at, plays_upserted as i64, errors_json, run_id],
    )
    .context("update ingest run")?;

    Ok(SeasonIngestSummary {
        season,
        plays_upserted,
        games_upserted,
        participation_rows,
        player_week_rows,
        errors,
    })
}

/// All run/pass plays for the requested seasons in ascending
/// (season, week, game, play) order, the order every rolling derivation
/// depends on.
pub fn load_ordered_plays(conn: &Connection, seasons: &[i32]) -> Result<Vec<StoredPlay>> {
    let placeholders = season_placeholders(seasons);
    let sql = format!(
        "SELECT game_id, play_id, season, week, posteam, defteam, drive, qtr, down,
                ydstogo, yardline_100, score_differential, half_seconds_remaining,
                game_seconds_remaining, shotgun, no_huddle, is_pass, epa, yards_gained,
                first_down
         FROM plays
         WHERE season IN ({placeholders})
         ORDER BY season ASC, week ASC, game_id ASC, play_id ASC"
    );
    let mut stmt = conn.prepare(&sql).context("prepare load plays query")?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(seasons.iter()), |row| {
            Ok(StoredPlay {
                game_id: row.get(0)?,
                play_id: row.get(1)?,
                season: row.get(2)?,
                week: row.get(3)?,
                posteam: row.get(4)?,
                defteam: row.get(5)?,
                drive: row.get(6)?,
                qtr: row.get(7)?,
                down: row.get(8)?,
                ydstogo: row.get(9)?,
                yardline_100: row.get(10)?,
                score_differential: row.get(11)?,
                half_seconds_remaining: row.get(12)?,
                game_seconds_remaining: row.get(13)?,
                shotgun: row.get::<_, i64>(14)? != 0,
                no_huddle: row.get::<_, i64>(15)? != 0,
                is_pass: row.get::<_, i64>(16)? != 0,
                epa: row.get(17)?,
                yards_gained: row.get(18)?,
                first_down: row.get::<_, i64>(19)? != 0,
            })
        })
        .context("query plays")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode play row")?);
    }
    if out.is_empty() {
        return Err(anyhow!(
            "no plays in archive for seasons {seasons:?}; run the ingest binary first"
        ));
    }
    Ok(out)
}

pub fn load_game_contexts(conn: &Connection, seasons: &[i32]) -> Result<Vec<GameContext>> {
    let placeholders = season_placeholders(seasons);
    let sql = format!(
        "SELECT game_id, season, week, home_team, away_team, roof, surface, temp, wind,
                home_rest, away_rest, div_game
         FROM games WHERE season IN ({placeholders})"
    );
    let mut stmt = conn.prepare(&sql).context("prepare load games query")?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(seasons.iter()), |row| {
            Ok(GameContext {
                game_id: row.get(0)?,
                season: row.get(1)?,
                week: row.get(2)?,
                home_team: row.get(3)?,
                away_team: row.get(4)?,
                roof: row.get(5)?,
                surface: row.get(6)?,
                temp: row.get(7)?,
                wind: row.get(8)?,
                home_rest: row.get(9)?,
                away_rest: row.get(10)?,
                div_game: row
                    .get::<_, Option<i64>>(11)?
                    .map(|v| v != 0),
            })
        })
        .context("query games")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode game row")?);
    }
    Ok(out)
}

pub fn load_participation_rows(conn: &Connection, seasons: &[i32]) -> Result<Vec<ParticipationRow>> {
    let placeholders = season_placeholders(seasons);
    let sql = format!(
        "SELECT p.game_id, p.play_id, p.defenders_in_box, p.pass_rushers
         FROM participation p
         JOIN games g ON g.game_id = p.game_id
         WHERE g.season IN ({placeholders})"
    );
    let mut stmt = conn
        .prepare(&sql)
        .context("prepare load participation query")?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(seasons.iter()), |row| {
            Ok(ParticipationRow {
                game_id: row.get(0)?,
                play_id: row.get(1)?,
                defenders_in_box: row.get(2)?,
                pass_rushers: row.get(3)?,
            })
        })
        .context("query participation")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode participation row")?);
    }
    Ok(out)
}

pub fn load_player_week_rows(conn: &Connection, seasons: &[i32]) -> Result<Vec<PlayerWeekRow>> {
    let placeholders = season_placeholders(seasons);
    let sql = format!(
        "SELECT season, week, team, position, completions, attempts, passing_yards,
                passing_tds, interceptions, carries, rushing_yards, rushing_tds,
                receptions, targets, receiving_yards
         FROM player_weeks WHERE season IN ({placeholders})"
    );
    let mut stmt = conn
        .prepare(&sql)
        .context("prepare load player weeks query")?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(seasons.iter()), |row| {
            Ok(PlayerWeekRow {
                season: row.get(0)?,
                week: row.get(1)?,
                team: row.get(2)?,
                position: row.get(3)?,
                completions: row.get(4)?,
                attempts: row.get(5)?,
                passing_yards: row.get(6)?,
                passing_tds: row.get(7)?,
                interceptions: row.get(8)?,
                carries: row.get(9)?,
                rushing_yards: row.get(10)?,
                rushing_tds: row.get(11)?,
                receptions: row.get(12)?,
                targets: row.get(13)?,
                receiving_yards: row.get(14)?,
            })
        })
        .context("query player weeks")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode player week row")?);
    }
    Ok(out)
}

fn upsert_play(tx: &rusqlite::Transaction<'_>, p: &StoredPlay) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO plays (
            game_id, play_id, season, week, posteam, defteam, drive, qtr, down,
            ydstogo, yardline_100, score_differential, half_seconds_remaining,
            game_seconds_remaining, shotgun, no_huddle, is_pass, epa, yards_gained,
            first_down, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                  ?16, ?17, ?18, ?19, ?20, ?21)
        ON CONFLICT(game_id, play_id) DO UPDATE SET
            season = excluded.season,
            week = excluded.week,
            posteam = excluded.posteam,
            defteam = excluded.defteam,
            drive = excluded.drive,
            qtr = excluded.qtr,
            down = excluded.down,
            ydstogo = excluded.ydstogo,
            yardline_100 = excluded.yardline_100,
            score_differential = excluded.score_differential,
            half_seconds_remaining = excluded.half_seconds_remaining,
            game_seconds_remaining = excluded.game_seconds_remaining,
            shotgun = excluded.shotgun,
            no_huddle = excluded.no_huddle,
            is_pass = excluded.is_pass,
            epa = excluded.epa,
            yards_gained = excluded.yards_gained,
            first_down = excluded.first_down,
            updated_at = excluded.updated_at
        "#,
        params![
            p.game_id,
            p.play_id,
            p.season as i64,
            p.week as i64,
            p.posteam,
            p.defteam,
            p.drive,
            p.qtr as i64,
            p.down as i64,
            p.ydstogo as i64,
            p.yardline_100 as i64,
            p.score_differential as i64,
            p.half_seconds_remaining,
            p.game_seconds_remaining,
            bool_to_i64(p.shotgun),
            bool_to_i64(p.no_huddle),
            bool_to_i64(p.is_pass),
            p.epa,
            p.yards_gained,
            bool_to_i64(p.first_down),
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert play")?;
    Ok(())
}

fn upsert_game(tx: &rusqlite::Transaction<'_>, g: &GameContext) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO games (
            game_id, season, week, home_team, away_team, roof, surface, temp, wind,
            home_rest, away_rest, div_game, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        ON CONFLICT(game_id) DO UPDATE SET
            season = excluded.season,
            week = excluded.week,
            home_team = excluded.home_team,
            away_team = excluded.away_team,
            roof = excluded.roof,
            surface = excluded.surface,
            temp = excluded.temp,
            wind = excluded.wind,
            home_rest = excluded.home_rest,
            away_rest = excluded.away_rest,
            div_game = excluded.div_game,
            updated_at = excluded.updated_at
        "#,
        params![
            g.game_id,
            g.season as i64,
            g.week as i64,
            g.home_team,
            g.away_team,
            g.roof,
            g.surface,
            g.temp,
            g.wind,
            g.home_rest,
            g.away_rest,
            g.div_game.map(bool_to_i64),
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert game")?;
    Ok(())
}

fn upsert_participation(tx: &rusqlite::Transaction<'_>, r: &ParticipationRow) -> Result<()> {
    tx.execute(
        "INSERT INTO participation (game_id, play_id, defenders_in_box, pass_rushers)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(game_id, play_id) DO UPDATE SET
            defenders_in_box = excluded.defenders_in_box,
            pass_rushers = excluded.pass_rushers",
        params![r.game_id, r.play_id, r.defenders_in_box, r.pass_rushers],
    )
    .context("upsert participation row")?;
    Ok(())
}

fn upsert_player_week(tx: &rusqlite::Transaction<'_>, r: &PlayerWeekRow) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO player_weeks (
            season, week, team, position, completions, attempts, passing_yards,
            passing_tds, interceptions, carries, rushing_yards, rushing_tds,
            receptions, targets, receiving_yards
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        ON CONFLICT(season, week, team, position) DO UPDATE SET
            completions = excluded.completions,
            attempts = excluded.attempts,
            passing_yards = excluded.passing_yards,
            passing_tds = excluded.passing_tds,
            interceptions = excluded.interceptions,
            carries = excluded.carries,
            rushing_yards = excluded.rushing_yards,
            rushing_tds = excluded.rushing_tds,
            receptions = excluded.receptions,
            targets = excluded.targets,
            receiving_yards = excluded.receiving_yards
        "#,
        params![
            r.season as i64,
            r.week as i64,
            r.team,
            r.position,
            r.completions,
            r.attempts,
            r.passing_yards,
            r.passing_tds,
            r.interceptions,
            r.carries,
            r.rushing_yards,
            r.rushing_tds,
            r.receptions,
            r.targets,
            r.receiving_yards,
        ],
    )
    .context("upsert player week row")?;
    Ok(())
}

fn season_placeholders(seasons: &[i32]) -> String {
    std::iter::repeat("?")
        .take(seasons.len().max(1))
        .collect::<Vec<_>>()
        .join(", ")
}

fn bool_to_i64(v: bool) -> i64 {
    if v { 1 } else { 0 }
}
