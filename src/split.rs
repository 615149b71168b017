//! Temporal train/test partitioning by (season, week) cutoff.

use anyhow::{Result, anyhow};

use crate::features::{FeatureFrame, FeatureRow};

#[derive(Debug, Clone, Copy)]
pub struct SplitConfig {
    pub cutoff_season: i32,
    /// Last week of the cutoff season that still trains.
    pub train_cutoff_week: i32,
    /// First week of the cutoff season that tests.
    pub test_start_week: i32,
}

impl SplitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.test_start_week <= self.train_cutoff_week {
            return Err(anyhow!(
                "test_start_week ({}) must be after train_cutoff_week ({})",
                self.test_start_week,
                self.train_cutoff_week
            ));
        }
        Ok(())
    }

    pub fn is_train(&self, season: i32, week: i32) -> bool {
        season < self.cutoff_season
            || (season == self.cutoff_season && week <= self.train_cutoff_week)
    }

    pub fn is_test(&self, season: i32, week: i32) -> bool {
        season == self.cutoff_season && week >= self.test_start_week
    }
}

#[derive(Debug)]
pub struct TemporalSplit {
    pub train: Vec<FeatureRow>,
    pub test: Vec<FeatureRow>,
    /// Rows in neither partition: gap weeks of the cutoff season, and any
    /// season after the cutoff.
    pub dropped: usize,
}

/// Assignment is a pure function of (season, week); nothing is persisted.
pub fn split_frame(frame: &FeatureFrame, config: &SplitConfig) -> Result<TemporalSplit> {
    config.validate()?;

    let mut train = Vec::new();
    let mut test = Vec::new();
    let mut dropped = 0usize;

    for row in &frame.rows {
        if config.is_train(row.season, row.week) {
            train.push(row.clone());
        } else if config.is_test(row.season, row.week) {
            test.push(row.clone());
        } else {
            dropped += 1;
        }
    }

    if train.is_empty() {
        return Err(anyhow!(
            "train partition is empty for cutoff season {} week {}",
            config.cutoff_season,
            config.train_cutoff_week
        ));
    }
    if test.is_empty() {
        return Err(anyhow!(
            "test partition is empty for cutoff season {} test start week {}",
            config.cutoff_season,
            config.test_start_week
        ));
    }

    Ok(TemporalSplit {
        train,
        test,
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(season: i32, week: i32) -> FeatureRow {
        FeatureRow {
            game_id: format!("{season}_{week:02}_A_B"),
            play_id: 1,
            season,
            week,
            posteam: "A".to_string(),
            is_pass: true,
            values: vec![0.5],
        }
    }

    fn frame(rows: Vec<FeatureRow>) -> FeatureFrame {
        FeatureFrame {
            feature_names: vec!["f".to_string()],
            rows,
        }
    }

    #[test]
    fn cutoff_week_itself_trains() {
        let config = SplitConfig {
            cutoff_season: 2024,
            train_cutoff_week: 10,
            test_start_week: 12,
        };
        assert!(config.is_train(2024, 10));
        assert!(!config.is_train(2024, 11));
        assert!(!config.is_test(2024, 11));
        assert!(config.is_test(2024, 12));
    }

    #[test]
    fn gap_weeks_and_later_seasons_are_dropped() {
        let config = SplitConfig {
            cutoff_season: 2024,
            train_cutoff_week: 10,
            test_start_week: 12,
        };
        let split = split_frame(
            &frame(vec![
                row(2023, 18),
                row(2024, 10),
                row(2024, 11),
                row(2024, 12),
                row(2025, 1),
            ]),
            &config,
        )
        .unwrap();
        assert_eq!(split.train.len(), 2);
        assert_eq!(split.test.len(), 1);
        assert_eq!(split.dropped, 2);
    }

    #[test]
    fn empty_partitions_are_errors() {
        let config = SplitConfig {
            cutoff_season: 2024,
            train_cutoff_week: 10,
            test_start_week: 12,
        };
        let err = split_frame(&frame(vec![row(2024, 12)]), &config).unwrap_err();
        assert!(err.to_string().contains("train partition is empty"));

        let err = split_frame(&frame(vec![row(2023, 1)]), &config).unwrap_err();
        assert!(err.to_string().contains("test partition is empty"));
    }

    #[test]
    fn inverted_cutoffs_are_rejected() {
        let config = SplitConfig {
            cutoff_season: 2024,
            train_cutoff_week: 12,
            test_start_week: 12,
        };
        assert!(config.validate().is_err());
    }
}
