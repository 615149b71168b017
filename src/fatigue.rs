//! Tempo and fatigue signals. Everything here derives from play ordering
//! and the game clock, never from play outcomes, so within-game lookahead
//! is structurally impossible.

use std::collections::HashMap;

use crate::play_store::StoredPlay;

const FAST_TEMPO_SECS: f64 = 20.0;
const RECENT_SNAP_WINDOW: usize = 10;

#[derive(Debug, Default)]
struct GameState {
    /// Possessing team of each prior snap, in order.
    snap_teams: Vec<String>,
    /// Clock at the previous snap.
    last_clock: Option<f64>,
    /// Offensive snaps so far per team.
    snaps: HashMap<String, u32>,
}

pub struct FatigueTracker {
    games: HashMap<String, GameState>,
}

impl FatigueTracker {
    pub fn new() -> Self {
        Self {
            games: HashMap::new(),
        }
    }

    pub fn column_names() -> Vec<String> {
        [
            "seconds_since_last_play",
            "fast_tempo",
            "offense_snap_count",
            "offense_snaps_last_10",
            "no_huddle_flag",
            "shotgun_flag",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    pub fn features_for(&self, play: &StoredPlay) -> Vec<f64> {
        let state = self.games.get(&play.game_id);

        let seconds_since = match (
            state.and_then(|s| s.last_clock),
            play.game_seconds_remaining,
        ) {
            (Some(prev), Some(now)) if prev >= now => prev - now,
            _ => f64::NAN,
        };
        let fast_tempo = if seconds_since.is_nan() {
            f64::NAN
        } else if seconds_since < FAST_TEMPO_SECS {
            1.0
        } else {
            0.0
        };

        let snap_count = state
            .and_then(|s| s.snaps.get(&play.posteam).copied())
            .unwrap_or(0) as f64;

        let recent = state
            .map(|s| {
                let start = s.snap_teams.len().saturating_sub(RECENT_SNAP_WINDOW);
                s.snap_teams[start..]
                    .iter()
                    .filter(|t| **t == play.posteam)
                    .count() as f64
            })
            .unwrap_or(0.0);

        vec![
            seconds_since,
            fast_tempo,
            snap_count,
            recent,
            if play.no_huddle { 1.0 } else { 0.0 },
            if play.shotgun { 1.0 } else { 0.0 },
        ]
    }

    pub fn absorb(&mut self, play: &StoredPlay) {
        let state = self.games.entry(play.game_id.clone()).or_default();
        state.snap_teams.push(play.posteam.clone());
        if play.game_seconds_remaining.is_some() {
            state.last_clock = play.game_seconds_remaining;
        }
        *state.snaps.entry(play.posteam.clone()).or_insert(0) += 1;
    }
}

impl Default for FatigueTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(play_id: i64, posteam: &str, clock: f64) -> StoredPlay {
        StoredPlay {
            game_id: "2023_01_KC_DET".to_string(),
            play_id,
            season: 2023,
            week: 1,
            posteam: posteam.to_string(),
            defteam: "DET".to_string(),
            drive: Some(1),
            qtr: 1,
            down: 1,
            ydstogo: 10,
            yardline_100: 50,
            score_differential: 0,
            half_seconds_remaining: Some(clock.min(1800.0)),
            game_seconds_remaining: Some(clock),
            shotgun: false,
            no_huddle: false,
            is_pass: true,
            epa: None,
            yards_gained: None,
            first_down: false,
        }
    }

    #[test]
    fn first_play_of_game_has_sentinel_clock_delta() {
        let tracker = FatigueTracker::new();
        let feats = tracker.features_for(&play(1, "KC", 3600.0));
        assert!(feats[0].is_nan());
        assert!(feats[1].is_nan());
        assert_eq!(feats[2], 0.0);
    }

    #[test]
    fn tempo_and_snap_counts_accumulate() {
        let mut tracker = FatigueTracker::new();
        tracker.absorb(&play(1, "KC", 3600.0));
        tracker.absorb(&play(2, "KC", 3585.0));

        let feats = tracker.features_for(&play(3, "KC", 3570.0));
        assert!((feats[0] - 15.0).abs() < 1e-12);
        assert_eq!(feats[1], 1.0); // under 20 seconds
        assert_eq!(feats[2], 2.0);
        assert_eq!(feats[3], 2.0);
    }

    #[test]
    fn snap_counts_are_per_offense() {
        let mut tracker = FatigueTracker::new();
        tracker.absorb(&play(1, "KC", 3600.0));
        tracker.absorb(&play(2, "DET", 3540.0));
        tracker.absorb(&play(3, "DET", 3500.0));

        let feats = tracker.features_for(&play(4, "KC", 3460.0));
        assert_eq!(feats[2], 1.0);
        assert_eq!(feats[3], 1.0);
    }
}
