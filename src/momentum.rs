//! Drive-scoped momentum features from strictly earlier plays of the
//! same drive. The first play of a drive has no history and emits the
//! NaN sentinel for every column.

use std::collections::HashMap;

use crate::play_store::StoredPlay;

const SUCCESS_WINDOW: usize = 3;
const EXPLOSIVE_WINDOW: usize = 5;
const EXPLOSIVE_YARDS: f64 = 10.0;

#[derive(Debug, Clone, Copy)]
struct PriorPlay {
    epa: Option<f64>,
    yards: Option<f64>,
    first_down: bool,
}

#[derive(Debug, Default)]
struct DriveState {
    plays: Vec<PriorPlay>,
}

pub struct MomentumTracker {
    drives: HashMap<(String, i64), DriveState>,
}

impl MomentumTracker {
    pub fn new() -> Self {
        Self {
            drives: HashMap::new(),
        }
    }

    pub fn column_names() -> Vec<String> {
        [
            "momentum_success_rate_3",
            "momentum_avg_epa_3",
            "momentum_explosive_5",
            "drive_yards",
            "drive_play_count",
            "drive_first_downs",
            "drive_epa",
            "drive_yards_per_play",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    pub fn features_for(&self, play: &StoredPlay) -> Vec<f64> {
        let state = play
            .drive
            .and_then(|d| self.drives.get(&(play.game_id.clone(), d)));
        let Some(state) = state else {
            return vec![f64::NAN; 8];
        };
        if state.plays.is_empty() {
            return vec![f64::NAN; 8];
        }

        let last3 = tail(&state.plays, SUCCESS_WINDOW);
        let success_rate = {
            let with_epa: Vec<f64> = last3.iter().filter_map(|p| p.epa).collect();
            if with_epa.is_empty() {
                f64::NAN
            } else {
                with_epa.iter().filter(|e| **e > 0.0).count() as f64 / with_epa.len() as f64
            }
        };
        let avg_epa = {
            let with_epa: Vec<f64> = last3.iter().filter_map(|p| p.epa).collect();
            if with_epa.is_empty() {
                f64::NAN
            } else {
                with_epa.iter().sum::<f64>() / with_epa.len() as f64
            }
        };
        let explosive = tail(&state.plays, EXPLOSIVE_WINDOW)
            .iter()
            .filter(|p| matches!(p.yards, Some(y) if y >= EXPLOSIVE_YARDS))
            .count() as f64;

        let drive_yards: f64 = state.plays.iter().filter_map(|p| p.yards).sum();
        let play_count = state.plays.len() as f64;
        let first_downs = state.plays.iter().filter(|p| p.first_down).count() as f64;
        let drive_epa: f64 = state.plays.iter().filter_map(|p| p.epa).sum();
        let yards_per_play = drive_yards / play_count;

        vec![
            success_rate,
            avg_epa,
            explosive,
            drive_yards,
            play_count,
            first_downs,
            drive_epa,
            yards_per_play,
        ]
    }

    pub fn absorb(&mut self, play: &StoredPlay) {
        let Some(drive) = play.drive else {
            return;
        };
        self.drives
            .entry((play.game_id.clone(), drive))
            .or_default()
            .plays
            .push(PriorPlay {
                epa: play.epa,
                yards: play.yards_gained,
                first_down: play.first_down,
            });
    }
}

impl Default for MomentumTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn tail(plays: &[PriorPlay], n: usize) -> &[PriorPlay] {
    let start = plays.len().saturating_sub(n);
    &plays[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(play_id: i64, drive: i64, epa: f64, yards: f64, first_down: bool) -> StoredPlay {
        StoredPlay {
            game_id: "2023_01_KC_DET".to_string(),
            play_id,
            season: 2023,
            week: 1,
            posteam: "KC".to_string(),
            defteam: "DET".to_string(),
            drive: Some(drive),
            qtr: 1,
            down: 1,
            ydstogo: 10,
            yardline_100: 75,
            score_differential: 0,
            half_seconds_remaining: Some(1500.0),
            game_seconds_remaining: Some(3300.0),
            shotgun: false,
            no_huddle: false,
            is_pass: true,
            epa: Some(epa),
            yards_gained: Some(yards),
            first_down,
        }
    }

    #[test]
    fn first_play_of_drive_is_all_sentinel() {
        let tracker = MomentumTracker::new();
        let feats = tracker.features_for(&play(1, 1, 0.5, 8.0, false));
        assert_eq!(feats.len(), 8);
        assert!(feats.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rolling_windows_exclude_current_play() {
        let mut tracker = MomentumTracker::new();
        tracker.absorb(&play(1, 1, 0.5, 12.0, true));
        tracker.absorb(&play(2, 1, -0.3, 2.0, false));

        let probe = play(3, 1, 99.0, 99.0, true);
        let feats = tracker.features_for(&probe);
        // success rate over the two prior plays: one positive EPA of two
        assert!((feats[0] - 0.5).abs() < 1e-12);
        assert!((feats[1] - 0.1).abs() < 1e-12);
        assert_eq!(feats[2], 1.0); // one explosive (12 yards)
        assert_eq!(feats[3], 14.0);
        assert_eq!(feats[4], 2.0);
        assert_eq!(feats[5], 1.0);
        assert!((feats[7] - 7.0).abs() < 1e-12);
    }

    #[test]
    fn drives_do_not_bleed_into_each_other() {
        let mut tracker = MomentumTracker::new();
        tracker.absorb(&play(1, 1, 1.0, 20.0, true));
        let feats = tracker.features_for(&play(10, 2, 0.0, 0.0, false));
        assert!(feats.iter().all(|v| v.is_nan()));
    }
}
