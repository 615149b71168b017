//! Team pass-rate tendencies over strictly earlier weeks of the season.
//!
//! The tracker is fed week by week: the caller snapshots features for every
//! play of a week first, then absorbs that week's outcomes. Plays in the
//! same week therefore never see each other, and no play ever sees a later
//! one. Accumulators reset at season boundaries.

use std::collections::HashMap;

use crate::buckets::{DistanceBucket, FieldZone, ScoreSituation, is_two_minute};
use crate::play_store::StoredPlay;

/// What to emit when the matching bucket has no prior history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// NaN sentinel, resolved later by the trainer's missing-row policy.
    Sentinel,
    /// League-wide pass rate over prior weeks; NaN when the league itself
    /// has no history yet.
    GlobalAverage,
}

#[derive(Debug, Clone, Copy, Default)]
struct RateAccum {
    passes: u64,
    plays: u64,
}

impl RateAccum {
    fn add(&mut self, is_pass: bool) {
        self.plays += 1;
        if is_pass {
            self.passes += 1;
        }
    }

    fn rate(&self) -> Option<f64> {
        if self.plays == 0 {
            None
        } else {
            Some(self.passes as f64 / self.plays as f64)
        }
    }
}

pub struct TendencyTracker {
    policy: FallbackPolicy,
    season: Option<i32>,
    league: RateAccum,
    overall: HashMap<String, RateAccum>,
    by_down: HashMap<(String, i32), RateAccum>,
    by_distance: HashMap<(String, DistanceBucket), RateAccum>,
    by_zone: HashMap<(String, FieldZone), RateAccum>,
    by_score: HashMap<(String, ScoreSituation), RateAccum>,
    red_zone: HashMap<String, RateAccum>,
    fourth_quarter: HashMap<String, RateAccum>,
    two_minute: HashMap<String, RateAccum>,
}

impl TendencyTracker {
    pub fn new(policy: FallbackPolicy) -> Self {
        Self {
            policy,
            season: None,
            league: RateAccum::default(),
            overall: HashMap::new(),
            by_down: HashMap::new(),
            by_distance: HashMap::new(),
            by_zone: HashMap::new(),
            by_score: HashMap::new(),
            red_zone: HashMap::new(),
            fourth_quarter: HashMap::new(),
            two_minute: HashMap::new(),
        }
    }

    pub fn column_names() -> Vec<String> {
        let mut names = vec!["team_pass_rate_overall".to_string()];
        for down in 1..=4 {
            names.push(format!("team_pass_rate_down{down}"));
        }
        for bucket in DistanceBucket::ALL {
            names.push(format!("team_pass_rate_dist_{}", bucket.as_str()));
        }
        for zone in FieldZone::ALL {
            names.push(format!("team_pass_rate_zone_{}", zone.as_str()));
        }
        for score in ScoreSituation::ALL {
            names.push(format!("team_pass_rate_score_{}", score.as_str()));
        }
        names.push("team_pass_rate_red_zone".to_string());
        names.push("team_pass_rate_q4".to_string());
        names.push("team_pass_rate_two_minute".to_string());
        names
    }

    /// Snapshot the tendency columns for one play from prior-week state
    /// only. Must be called before `absorb` for the play's week.
    pub fn features_for(&self, play: &StoredPlay) -> Vec<f64> {
        let team = play.posteam.as_str();
        let mut out = Vec::with_capacity(21);

        out.push(self.resolve(self.overall.get(team)));
        for down in 1..=4 {
            out.push(self.resolve(self.by_down.get(&(team.to_string(), down))));
        }
        for bucket in DistanceBucket::ALL {
            out.push(self.resolve(self.by_distance.get(&(team.to_string(), bucket))));
        }
        for zone in FieldZone::ALL {
            out.push(self.resolve(self.by_zone.get(&(team.to_string(), zone))));
        }
        for score in ScoreSituation::ALL {
            out.push(self.resolve(self.by_score.get(&(team.to_string(), score))));
        }
        out.push(self.resolve(self.red_zone.get(team)));
        out.push(self.resolve(self.fourth_quarter.get(team)));
        out.push(self.resolve(self.two_minute.get(team)));
        out
    }

    /// Fold one play's outcome into the history. Callers group by week:
    /// every `features_for` of a week happens before any `absorb` of it.
    pub fn absorb(&mut self, play: &StoredPlay) {
        if self.season != Some(play.season) {
            self.reset_for_season(play.season);
        }
        let team = play.posteam.clone();
        let is_pass = play.is_pass;

        self.league.add(is_pass);
        self.overall.entry(team.clone()).or_default().add(is_pass);
        self.by_down
            .entry((team.clone(), play.down))
            .or_default()
            .add(is_pass);
        self.by_distance
            .entry((team.clone(), DistanceBucket::from_ydstogo(play.ydstogo)))
            .or_default()
            .add(is_pass);
        self.by_zone
            .entry((team.clone(), FieldZone::from_yardline(play.yardline_100)))
            .or_default()
            .add(is_pass);
        self.by_score
            .entry((
                team.clone(),
                ScoreSituation::from_differential(play.score_differential),
            ))
            .or_default()
            .add(is_pass);
        if play.yardline_100 <= 20 {
            self.red_zone.entry(team.clone()).or_default().add(is_pass);
        }
        if play.qtr == 4 {
            self.fourth_quarter
                .entry(team.clone())
                .or_default()
                .add(is_pass);
        }
        if is_two_minute(play) {
            self.two_minute.entry(team).or_default().add(is_pass);
        }
    }

    pub fn reset_for_season(&mut self, season: i32) {
        self.season = Some(season);
        self.league = RateAccum::default();
        self.overall.clear();
        self.by_down.clear();
        self.by_distance.clear();
        self.by_zone.clear();
        self.by_score.clear();
        self.red_zone.clear();
        self.fourth_quarter.clear();
        self.two_minute.clear();
    }

    /// League-wide pass rate over prior weeks, NaN with no history.
    pub fn league_rate(&self) -> f64 {
        self.league.rate().unwrap_or(f64::NAN)
    }

    fn resolve(&self, accum: Option<&RateAccum>) -> f64 {
        match accum.and_then(RateAccum::rate) {
            Some(rate) => rate,
            None => match self.policy {
                FallbackPolicy::Sentinel => f64::NAN,
                FallbackPolicy::GlobalAverage => self.league_rate(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(week: i32, posteam: &str, down: i32, ydstogo: i32, is_pass: bool) -> StoredPlay {
        StoredPlay {
            game_id: format!("2023_{week:02}_{posteam}_OPP"),
            play_id: 1,
            season: 2023,
            week,
            posteam: posteam.to_string(),
            defteam: "OPP".to_string(),
            drive: Some(1),
            qtr: 1,
            down,
            ydstogo,
            yardline_100: 75,
            score_differential: 0,
            half_seconds_remaining: Some(1500.0),
            game_seconds_remaining: Some(3300.0),
            shotgun: false,
            no_huddle: false,
            is_pass,
            epa: None,
            yards_gained: None,
            first_down: false,
        }
    }

    fn col(name: &str) -> usize {
        TendencyTracker::column_names()
            .iter()
            .position(|n| n == name)
            .unwrap()
    }

    #[test]
    fn third_and_long_rate_is_two_thirds() {
        let mut tracker = TendencyTracker::new(FallbackPolicy::Sentinel);
        // Week 1: two third-and-long passes and one run by the same team.
        for p in [
            play(1, "KC", 3, 9, true),
            play(1, "KC", 3, 10, true),
            play(1, "KC", 3, 12, false),
        ] {
            tracker.absorb(&p);
        }
        let probe = play(2, "KC", 3, 11, true);
        let feats = tracker.features_for(&probe);
        let rate = feats[col("team_pass_rate_dist_long")];
        assert!((rate - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn single_prior_play_gives_exact_zero_or_one() {
        let mut tracker = TendencyTracker::new(FallbackPolicy::Sentinel);
        tracker.absorb(&play(1, "SF", 1, 10, false));
        let feats = tracker.features_for(&play(2, "SF", 1, 10, true));
        assert_eq!(feats[col("team_pass_rate_overall")], 0.0);

        let mut tracker = TendencyTracker::new(FallbackPolicy::Sentinel);
        tracker.absorb(&play(1, "SF", 1, 10, true));
        let feats = tracker.features_for(&play(2, "SF", 1, 10, true));
        assert_eq!(feats[col("team_pass_rate_overall")], 1.0);
    }

    #[test]
    fn no_history_yields_nan_under_sentinel_policy() {
        let tracker = TendencyTracker::new(FallbackPolicy::Sentinel);
        let feats = tracker.features_for(&play(1, "BUF", 1, 10, true));
        assert!(feats.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn global_average_fallback_uses_league_rate() {
        let mut tracker = TendencyTracker::new(FallbackPolicy::GlobalAverage);
        tracker.absorb(&play(1, "KC", 1, 10, true));
        tracker.absorb(&play(1, "SF", 1, 10, true));
        tracker.absorb(&play(1, "SF", 1, 10, false));
        // BUF has no history; league rate over week 1 is 2/3.
        let feats = tracker.features_for(&play(2, "BUF", 1, 10, true));
        let rate = feats[col("team_pass_rate_overall")];
        assert!((rate - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn season_boundary_resets_history() {
        let mut tracker = TendencyTracker::new(FallbackPolicy::Sentinel);
        tracker.absorb(&play(17, "KC", 1, 10, true));
        let mut p = play(1, "KC", 1, 10, true);
        p.season = 2024;
        tracker.absorb(&p);
        // After absorbing the 2024 play, 2023 history is gone.
        let mut probe = play(2, "KC", 2, 5, true);
        probe.season = 2024;
        let feats = tracker.features_for(&probe);
        let overall = feats[col("team_pass_rate_overall")];
        assert_eq!(overall, 1.0);
        assert!(feats[col("team_pass_rate_down2")].is_nan());
    }

    #[test]
    fn rates_stay_in_unit_interval() {
        let mut tracker = TendencyTracker::new(FallbackPolicy::Sentinel);
        for i in 0..50 {
            tracker.absorb(&play(1, "KC", 1 + (i % 4), 1 + (i % 15), i % 3 != 0));
        }
        let feats = tracker.features_for(&play(2, "KC", 3, 8, true));
        for v in feats {
            assert!(v.is_nan() || (0.0..=1.0).contains(&v));
        }
    }
}
