use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use gridiron_dc::artifact::{self, FeatureArtifact};
use gridiron_dc::features::{self, CategoryFlag, FeatureConfig, FeatureInputs};
use gridiron_dc::personnel::DISABLED_REASON;
use gridiron_dc::play_store;
use gridiron_dc::synthetic::{self, SyntheticConfig};
use gridiron_dc::tendency::FallbackPolicy;
use gridiron_dc::loader;

const DEFAULT_SEASONS: &[i32] = &[2021, 2022, 2023, 2024];

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let seasons = parse_seasons_arg().unwrap_or_else(default_seasons_from_env);
    if seasons.is_empty() {
        return Err(anyhow!("no seasons resolved for feature build"));
    }

    let mut config = FeatureConfig::default();
    config.fallback = parse_fallback_arg()?;
    if has_flag("--enable-personnel") {
        config.personnel = CategoryFlag::on();
    }
    if has_flag("--disable-player-perf") {
        config.player_perf = CategoryFlag::off("disabled on the command line");
    }

    let inputs = if has_flag("--synthetic") {
        synthetic_inputs(&seasons)
    } else {
        archive_inputs(&seasons)?
    };
    let play_count = inputs.plays.len();

    let frame = features::build_feature_frame(inputs, &config)?;
    let out_path = parse_path_arg("--out")
        .or_else(|| default_artifact_path("features.json"))
        .context("unable to resolve feature artifact path")?;
    let summary_path = parse_path_arg("--summary")
        .or_else(|| default_artifact_path("features_summary.txt"))
        .context("unable to resolve summary path")?;

    let payload = FeatureArtifact::from_frame(&frame, &config);
    artifact::write_json_atomic(&out_path, &payload)?;
    artifact::write_text_atomic(&summary_path, &summary_text(&config, &frame, play_count))?;

    println!("Feature build complete");
    println!("Plays featurized: {}", frame.rows.len());
    println!("Feature columns: {}", frame.feature_names.len());
    println!("Artifact: {}", out_path.display());
    println!("Summary: {}", summary_path.display());
    if !config.personnel.enabled {
        println!("personnel: disabled ({DISABLED_REASON})");
    }

    Ok(())
}

fn archive_inputs(seasons: &[i32]) -> Result<FeatureInputs> {
    let db_path = parse_path_arg("--db")
        .or_else(play_store::default_db_path)
        .context("unable to resolve sqlite path")?;
    let conn = play_store::open_db(&db_path)?;
    Ok(FeatureInputs {
        plays: play_store::load_ordered_plays(&conn, seasons)?,
        games: play_store::load_game_contexts(&conn, seasons)?,
        participation: play_store::load_participation_rows(&conn, seasons)?,
        player_weeks: play_store::load_player_week_rows(&conn, seasons)?,
    })
}

fn synthetic_inputs(seasons: &[i32]) -> FeatureInputs {
    let config = SyntheticConfig {
        seasons: seasons.to_vec(),
        ..SyntheticConfig::default()
    };
    let plays = synthetic::generate_plays(&config);
    let games = synthetic::generate_game_contexts(&plays, config.seed);
    let player_weeks = synthetic::generate_player_weeks(&plays, config.seed);
    FeatureInputs {
        plays,
        games,
        participation: vec![],
        player_weeks,
    }
}

fn summary_text(
    config: &FeatureConfig,
    frame: &gridiron_dc::features::FeatureFrame,
    play_count: usize,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Feature build summary");
    let _ = writeln!(out, "plays: {play_count}");
    let _ = writeln!(out, "rows: {}", frame.rows.len());
    let _ = writeln!(out, "columns: {}", frame.feature_names.len());
    let _ = writeln!(out);
    let _ = writeln!(out, "categories:");
    for (name, enabled, note) in config.category_summary() {
        match note {
            Some(note) => {
                let _ = writeln!(
                    out,
                    "  {name}: {} ({note})",
                    if enabled { "on" } else { "off" }
                );
            }
            None => {
                let _ = writeln!(out, "  {name}: {}", if enabled { "on" } else { "off" });
            }
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "columns by name:");
    for (idx, name) in frame.feature_names.iter().enumerate() {
        let finite = frame
            .rows
            .iter()
            .filter(|r| r.values[idx].is_finite())
            .count();
        let _ = writeln!(out, "  {name}: {finite}/{} finite", frame.rows.len());
    }
    out
}

fn default_artifact_path(name: &str) -> Option<PathBuf> {
    loader::app_cache_dir().map(|dir| dir.join("artifacts").join(name))
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    let prefix = format!("{flag}=");
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&prefix) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next));
        }
    }
    None
}

fn parse_fallback_arg() -> Result<FallbackPolicy> {
    let Some(raw) = parse_string_arg("--fallback") else {
        return Ok(FallbackPolicy::Sentinel);
    };
    match raw.as_str() {
        "sentinel" => Ok(FallbackPolicy::Sentinel),
        "global-average" | "global_average" => Ok(FallbackPolicy::GlobalAverage),
        other => Err(anyhow!(
            "unknown fallback policy '{other}' (expected sentinel or global-average)"
        )),
    }
}

fn parse_string_arg(flag: &str) -> Option<String> {
    parse_path_arg(flag).map(|p| p.to_string_lossy().into_owned())
}

fn parse_seasons_arg() -> Option<Vec<i32>> {
    let raw = parse_string_arg("--seasons")?;
    let seasons = parse_seasons(&raw);
    if seasons.is_empty() { None } else { Some(seasons) }
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
