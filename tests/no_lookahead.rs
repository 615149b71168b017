//! Features attached to a play must be unaffected by anything that
//! happens after it: corrupting every outcome in later weeks must leave
//! earlier rows bit-identical.

use gridiron_dc::features::{FeatureConfig, FeatureInputs, build_feature_frame};
use gridiron_dc::synthetic::{SyntheticConfig, generate_game_contexts, generate_plays};
use gridiron_dc::tendency::FallbackPolicy;

const CORRUPT_AFTER_WEEK: i32 = 3;

fn inputs() -> FeatureInputs {
    let config = SyntheticConfig {
        seasons: vec![2023],
        weeks_per_season: 6,
        games_per_week: 3,
        plays_per_game: 40,
        seed: 11,
    };
    let plays = generate_plays(&config);
    let games = generate_game_contexts(&plays, config.seed);
    FeatureInputs {
        plays,
        games,
        participation: vec![],
        player_weeks: vec![],
    }
}

#[test]
fn corrupting_future_outcomes_leaves_past_features_bit_identical() {
    for fallback in [FallbackPolicy::Sentinel, FallbackPolicy::GlobalAverage] {
        let mut config = FeatureConfig::default();
        config.fallback = fallback;

        let clean = build_feature_frame(inputs(), &config).unwrap();

        let mut corrupted_inputs = inputs();
        for play in &mut corrupted_inputs.plays {
            if play.week > CORRUPT_AFTER_WEEK {
                play.is_pass = !play.is_pass;
                play.epa = Some(99.0);
                play.yards_gained = Some(-50.0);
                play.first_down = !play.first_down;
            }
        }
        let corrupted = build_feature_frame(corrupted_inputs, &config).unwrap();

        assert_eq!(clean.rows.len(), corrupted.rows.len());
        let mut compared = 0usize;
        for (a, b) in clean.rows.iter().zip(corrupted.rows.iter()) {
            assert_eq!(a.game_id, b.game_id);
            assert_eq!(a.play_id, b.play_id);
            if a.week > CORRUPT_AFTER_WEEK {
                continue;
            }
            compared += 1;
            for (i, (x, y)) in a.values.iter().zip(b.values.iter()).enumerate() {
                assert_eq!(
                    x.to_bits(),
                    y.to_bits(),
                    "feature {} of {}:{} changed under future corruption",
                    clean.feature_names[i],
                    a.game_id,
                    a.play_id
                );
            }
        }
        assert!(compared > 0, "test corpus had no rows before the corruption week");
    }
}

#[test]
fn same_week_plays_do_not_see_each_other_in_tendencies() {
    // Corrupt a whole week and check that tendency columns of that same
    // week are untouched: cross-game history only looks at prior weeks.
    let config = FeatureConfig::default();
    let clean = build_feature_frame(inputs(), &config).unwrap();

    let mut corrupted_inputs = inputs();
    for play in &mut corrupted_inputs.plays {
        if play.week == CORRUPT_AFTER_WEEK {
            play.is_pass = !play.is_pass;
        }
    }
    let corrupted = build_feature_frame(corrupted_inputs, &config).unwrap();

    let tendency_cols: Vec<usize> = clean
        .feature_names
        .iter()
        .enumerate()
        .filter(|(_, n)| n.starts_with("team_pass_rate_"))
        .map(|(i, _)| i)
        .collect();
    assert!(!tendency_cols.is_empty());

    for (a, b) in clean.rows.iter().zip(corrupted.rows.iter()) {
        if a.week != CORRUPT_AFTER_WEEK {
            continue;
        }
        for &col in &tendency_cols {
            assert_eq!(a.values[col].to_bits(), b.values[col].to_bits());
        }
    }
}

#[test]
fn derivation_is_idempotent() {
    let config = FeatureConfig::default();
    let a = build_feature_frame(inputs(), &config).unwrap();
    let b = build_feature_frame(inputs(), &config).unwrap();
    assert_eq!(a.feature_names, b.feature_names);
    for (x, y) in a.rows.iter().zip(b.rows.iter()) {
        for (vx, vy) in x.values.iter().zip(y.values.iter()) {
            assert_eq!(vx.to_bits(), vy.to_bits());
        }
    }
}
