use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use serde::Serialize;

use gridiron_dc::artifact::{self, FeatureArtifact};
use gridiron_dc::features::{self, FeatureConfig, FeatureFrame, FeatureInputs};
use gridiron_dc::loader;
use gridiron_dc::model::boost::{BoostConfig, BoostModel};
use gridiron_dc::model::forest::{ForestConfig, ForestModel};
use gridiron_dc::model::logistic::{LogisticConfig, LogisticModel};
use gridiron_dc::model::metrics::{self, BinaryMetrics, CalibrationBin};
use gridiron_dc::model::{DesignMatrix, MissingRowPolicy, prepare_matrices};
use gridiron_dc::split::{SplitConfig, split_frame};
use gridiron_dc::synthetic::{self, SyntheticConfig};

const DEFAULT_CUTOFF_SEASON: i32 = 2024;
const DEFAULT_TRAIN_CUTOFF_WEEK: i32 = 4;
const DEFAULT_TEST_START_WEEK: i32 = 5;
const CALIBRATION_BINS: usize = 10;
const TOP_FEATURES: usize = 10;

#[derive(Serialize)]
struct ModelArtifact<M: Serialize> {
    version: u32,
    generated_at: String,
    model_kind: String,
    feature_names: Vec<String>,
    model: M,
    train_metrics: BinaryMetrics,
    test_metrics: BinaryMetrics,
    calibration: Vec<CalibrationBin>,
}

struct Evaluated {
    name: &'static str,
    train: BinaryMetrics,
    test: BinaryMetrics,
    calibration: Vec<CalibrationBin>,
    top_features: Vec<(String, f64)>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let split_config = SplitConfig {
        cutoff_season: parse_i32_arg("--cutoff-season")
            .or_else(|| env_i32("APP_CUTOFF_SEASON"))
            .unwrap_or(DEFAULT_CUTOFF_SEASON),
        train_cutoff_week: parse_i32_arg("--train-cutoff-week")
            .or_else(|| env_i32("APP_TRAIN_CUTOFF_WEEK"))
            .unwrap_or(DEFAULT_TRAIN_CUTOFF_WEEK),
        test_start_week: parse_i32_arg("--test-start-week")
            .or_else(|| env_i32("APP_TEST_START_WEEK"))
            .unwrap_or(DEFAULT_TEST_START_WEEK),
    };
    let policy = parse_missing_policy()?;

    let frame = if has_flag("--synthetic") {
        synthetic_frame(split_config.cutoff_season)?
    } else {
        let path = parse_path_arg("--features")
            .or_else(|| default_artifact_path("features.json"))
            .context("unable to resolve feature artifact path")?;
        let payload: FeatureArtifact = artifact::read_json(&path)?;
        payload.into_frame()?
    };

    let split = split_frame(&frame, &split_config)?;
    println!(
        "Split: train={} test={} dropped={}",
        split.train.len(),
        split.test.len(),
        split.dropped
    );

    let (train_m, test_m) =
        prepare_matrices(&split.train, &split.test, &frame.feature_names, policy)?;
    println!(
        "After missing-value policy: train={} test={}",
        train_m.len(),
        test_m.len()
    );

    let models_dir = parse_path_arg("--models-dir")
        .or_else(|| default_artifact_path("models"))
        .context("unable to resolve models dir")?;

    let mut evaluated = Vec::new();

    let logistic = LogisticModel::fit(&train_m, LogisticConfig::default())?;
    let eval = evaluate(
        "logistic_regression",
        &train_m,
        &test_m,
        |row| logistic.predict_proba(row),
        top_pairs(logistic.top_coefficients(&frame.feature_names, TOP_FEATURES)),
    )?;
    write_model_artifact(&models_dir, "logistic_regression", &frame, &logistic, &eval)?;
    evaluated.push(eval);

    let forest = ForestModel::fit(&train_m, ForestConfig::default())?;
    let eval = evaluate(
        "random_forest",
        &train_m,
        &test_m,
        |row| forest.predict_proba(row),
        top_pairs(forest.top_importance(&frame.feature_names, TOP_FEATURES)),
    )?;
    write_model_artifact(&models_dir, "random_forest", &frame, &forest, &eval)?;
    evaluated.push(eval);

    let boost = BoostModel::fit(&train_m, BoostConfig::default())?;
    let eval = evaluate(
        "gradient_boosting",
        &train_m,
        &test_m,
        |row| boost.predict_proba(row),
        top_pairs(boost.top_importance(&frame.feature_names, TOP_FEATURES)),
    )?;
    write_model_artifact(&models_dir, "gradient_boosting", &frame, &boost, &eval)?;
    evaluated.push(eval);

    let report = comparison_report(&split_config, policy, &train_m, &test_m, &evaluated);
    let report_path = parse_path_arg("--report")
        .or_else(|| default_artifact_path("model_comparison.txt"))
        .context("unable to resolve report path")?;
    artifact::write_text_atomic(&report_path, &report)?;

    println!();
    print!("{report}");
    println!("Report: {}", report_path.display());
    println!("Models: {}", models_dir.display());

    Ok(())
}

fn evaluate(
    name: &'static str,
    train: &DesignMatrix,
    test: &DesignMatrix,
    predict: impl Fn(&[f64]) -> f64,
    top_features: Vec<(String, f64)>,
) -> Result<Evaluated> {
    let train_probs: Vec<f64> = train.rows.iter().map(|r| predict(r)).collect();
    let test_probs: Vec<f64> = test.rows.iter().map(|r| predict(r)).collect();
    Ok(Evaluated {
        name,
        train: metrics::evaluate_probs(&train.labels, &train_probs)?,
        test: metrics::evaluate_probs(&test.labels, &test_probs)?,
        calibration: metrics::calibration_bins(&test.labels, &test_probs, CALIBRATION_BINS),
        top_features,
    })
}

fn write_model_artifact<M: Serialize>(
    models_dir: &Path,
    kind: &str,
    frame: &FeatureFrame,
    model: &M,
    eval: &Evaluated,
) -> Result<()> {
    let payload = ModelArtifact {
        version: 1,
        generated_at: Utc::now().to_rfc3339(),
        model_kind: kind.to_string(),
        feature_names: frame.feature_names.clone(),
        model,
        train_metrics: eval.train.clone(),
        test_metrics: eval.test.clone(),
        calibration: eval.calibration.clone(),
    };
    artifact::write_json_atomic(&models_dir.join(format!("{kind}.json")), &payload)
}

fn comparison_report(
    split: &SplitConfig,
    policy: MissingRowPolicy,
    train: &DesignMatrix,
    test: &DesignMatrix,
    evaluated: &[Evaluated],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Play-call model comparison");
    let _ = writeln!(
        out,
        "cutoff: season {} / train through week {} / test from week {}",
        split.cutoff_season, split.train_cutoff_week, split.test_start_week
    );
    let _ = writeln!(out, "missing-value policy: {policy:?}");
    let _ = writeln!(out, "train rows: {}  test rows: {}", train.len(), test.len());
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "{:<22} {:>8} {:>8} {:>8} {:>8} {:>8} {:>9} {:>8}",
        "model", "acc", "prec", "recall", "f1", "auc", "log_loss", "brier"
    );
    for eval in evaluated {
        let m = &eval.test;
        let _ = writeln!(
            out,
            "{:<22} {:>8.4} {:>8.4} {:>8.4} {:>8.4} {:>8.4} {:>9.4} {:>8.4}",
            eval.name, m.accuracy, m.precision, m.recall, m.f1, m.auc, m.log_loss, m.brier
        );
    }
    let _ = writeln!(out);

    for eval in evaluated {
        let _ = writeln!(out, "== {} ==", eval.name);
        let _ = writeln!(
            out,
            "train: acc={:.4} auc={:.4} log_loss={:.4}",
            eval.train.accuracy, eval.train.auc, eval.train.log_loss
        );
        let c = &eval.test.confusion;
        let _ = writeln!(
            out,
            "test confusion: tn={} fp={} fn={} tp={}",
            c.true_negative, c.false_positive, c.false_negative, c.true_positive
        );
        let _ = writeln!(out, "top features:");
        for (name, weight) in &eval.top_features {
            let _ = writeln!(out, "  {name}: {weight:.4}");
        }
        let _ = writeln!(out, "calibration (test):");
        for bin in &eval.calibration {
            if bin.samples == 0 {
                continue;
            }
            let _ = writeln!(
                out,
                "  [{:.1}, {:.1}) n={} predicted={:.3} observed={:.3}",
                bin.lo, bin.hi, bin.samples, bin.mean_predicted, bin.observed_rate
            );
        }
        let _ = writeln!(out);
    }
    out
}

fn synthetic_frame(cutoff_season: i32) -> Result<FeatureFrame> {
    let config = SyntheticConfig {
        seasons: vec![cutoff_season - 1, cutoff_season],
        weeks_per_season: 8,
        ..SyntheticConfig::default()
    };
    let plays = synthetic::generate_plays(&config);
    let games = synthetic::generate_game_contexts(&plays, config.seed);
    let player_weeks = synthetic::generate_player_weeks(&plays, config.seed);
    features::build_feature_frame(
        FeatureInputs {
            plays,
            games,
            participation: vec![],
            player_weeks,
        },
        &FeatureConfig::default(),
    )
}

fn top_pairs(pairs: Vec<(&str, f64)>) -> Vec<(String, f64)> {
    pairs
        .into_iter()
        .map(|(name, v)| (name.to_string(), v))
        .collect()
}

fn parse_missing_policy() -> Result<MissingRowPolicy> {
    let Some(raw) = parse_string_arg("--missing") else {
        return Ok(MissingRowPolicy::ImputeTrainMean);
    };
    match raw.as_str() {
        "drop" => Ok(MissingRowPolicy::DropRows),
        "impute" | "impute-train-mean" => Ok(MissingRowPolicy::ImputeTrainMean),
        other => Err(anyhow!(
            "unknown missing-value policy '{other}' (expected drop or impute)"
        )),
    }
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

fn parse_string_arg(flag: &str) -> Option<String> {
    parse_path_arg(flag).map(|p| p.to_string_lossy().into_owned())
}

fn parse_i32_arg(flag: &str) -> Option<i32> {
    parse_string_arg(flag)?.trim().parse().ok()
}

fn env_i32(key: &str) -> Option<i32> {
    std::env::var(key).ok()?.trim().parse().ok()
}

fn has_flag(flag: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == flag)
}
