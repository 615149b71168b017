//! Shape and well-formedness of the derived feature frame.

use gridiron_dc::features::{
    CategoryFlag, FeatureConfig, FeatureInputs, build_feature_frame, feature_names,
};
use gridiron_dc::model::{MissingRowPolicy, prepare_matrices};
use gridiron_dc::split::{SplitConfig, split_frame};
use gridiron_dc::synthetic::{
    SyntheticConfig, generate_game_contexts, generate_player_weeks, generate_plays,
};
use gridiron_dc::tendency::FallbackPolicy;

fn inputs(seasons: Vec<i32>) -> FeatureInputs {
    let config = SyntheticConfig {
        seasons,
        weeks_per_season: 5,
        games_per_week: 3,
        plays_per_game: 30,
        seed: 9,
    };
    let plays = generate_plays(&config);
    let games = generate_game_contexts(&plays, config.seed);
    let player_weeks = generate_player_weeks(&plays, config.seed);
    FeatureInputs {
        plays,
        games,
        participation: vec![],
        player_weeks,
    }
}

#[test]
fn tendency_rates_are_unit_interval_or_nan() {
    let config = FeatureConfig::default();
    let frame = build_feature_frame(inputs(vec![2023]), &config).unwrap();
    let rate_cols: Vec<usize> = frame
        .feature_names
        .iter()
        .enumerate()
        .filter(|(_, n)| n.starts_with("team_pass_rate_"))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(rate_cols.len(), 21);

    for row in &frame.rows {
        for &col in &rate_cols {
            let v = row.values[col];
            assert!(
                v.is_nan() || (0.0..=1.0).contains(&v),
                "rate {} = {v} out of range",
                frame.feature_names[col]
            );
        }
    }
}

#[test]
fn first_week_tendencies_are_sentinel_and_later_weeks_fill_in() {
    let config = FeatureConfig::default();
    let frame = build_feature_frame(inputs(vec![2023]), &config).unwrap();
    let overall = frame
        .feature_names
        .iter()
        .position(|n| n == "team_pass_rate_overall")
        .unwrap();

    for row in &frame.rows {
        if row.week == 1 {
            assert!(row.values[overall].is_nan());
        } else {
            assert!(row.values[overall].is_finite());
        }
    }
}

#[test]
fn new_season_week_one_starts_from_sentinel_not_prior_season_history() {
    let config = FeatureConfig::default();
    let frame = build_feature_frame(inputs(vec![2023, 2024]), &config).unwrap();
    let rate_cols: Vec<usize> = frame
        .feature_names
        .iter()
        .enumerate()
        .filter(|(_, n)| n.starts_with("team_pass_rate_"))
        .map(|(i, _)| i)
        .collect();

    let mut checked = 0usize;
    for row in frame.rows.iter().filter(|r| r.season == 2024 && r.week == 1) {
        checked += 1;
        for &col in &rate_cols {
            assert!(
                row.values[col].is_nan(),
                "{} of {}:{} read prior-season history ({})",
                frame.feature_names[col],
                row.game_id,
                row.play_id,
                row.values[col]
            );
        }
    }
    assert!(checked > 0, "corpus has no 2024 week-1 rows");
}

#[test]
fn global_average_fallback_removes_first_week_nans_after_week_one() {
    let mut config = FeatureConfig::default();
    config.fallback = FallbackPolicy::GlobalAverage;
    let frame = build_feature_frame(inputs(vec![2023]), &config).unwrap();
    let rate_cols: Vec<usize> = frame
        .feature_names
        .iter()
        .enumerate()
        .filter(|(_, n)| n.starts_with("team_pass_rate_"))
        .map(|(i, _)| i)
        .collect();

    for row in frame.rows.iter().filter(|r| r.week > 1) {
        for &col in &rate_cols {
            assert!(
                row.values[col].is_finite(),
                "{} still NaN in week {} under global-average fallback",
                frame.feature_names[col],
                row.week
            );
        }
    }
}

#[test]
fn personnel_columns_require_explicit_opt_in() {
    let default_names = feature_names(&FeatureConfig::default());
    assert!(!default_names.iter().any(|n| n == "defenders_in_box"));
    assert!(!default_names.iter().any(|n| n == "pass_rushers"));

    let mut config = FeatureConfig::default();
    config.personnel = CategoryFlag::on();
    let opted_in = feature_names(&config);
    assert!(opted_in.iter().any(|n| n == "defenders_in_box"));
    assert!(opted_in.len() > default_names.len());
}

#[test]
fn frame_feeds_the_trainer_end_to_end() {
    let config = FeatureConfig::default();
    let frame = build_feature_frame(inputs(vec![2023, 2024]), &config).unwrap();
    let split = split_frame(
        &frame,
        &SplitConfig {
            cutoff_season: 2024,
            train_cutoff_week: 2,
            test_start_week: 4,
        },
    )
    .unwrap();

    let (train, test) = prepare_matrices(
        &split.train,
        &split.test,
        &frame.feature_names,
        MissingRowPolicy::ImputeTrainMean,
    )
    .unwrap();
    assert_eq!(train.len(), split.train.len());
    assert_eq!(test.len(), split.test.len());
    for row in train.rows.iter().chain(test.rows.iter()) {
        assert!(row.iter().all(|v| v.is_finite()));
    }
}
