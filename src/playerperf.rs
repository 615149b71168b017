//! Team-level weekly efficiency from the player-stats table.
//!
//! Aggregated to team level and joined on weeks strictly before the
//! current play's week, which is what keeps the category legal under the
//! no-lookahead rule: a week-5 play only ever sees weeks 1-4.

use std::collections::HashMap;

use crate::play_store::{PlayerWeekRow, StoredPlay};

#[derive(Debug, Clone, Copy, Default)]
struct WeekTotals {
    completions: f64,
    attempts: f64,
    passing_yards: f64,
    passing_tds: f64,
    interceptions: f64,
    carries: f64,
    rushing_yards: f64,
    rushing_tds: f64,
    receptions: f64,
    targets: f64,
    receiving_yards: f64,
}

impl WeekTotals {
    fn fold(&mut self, row: &PlayerWeekRow) {
        if row.position == "QB" {
            self.completions += row.completions;
            self.attempts += row.attempts;
            self.passing_yards += row.passing_yards;
            self.passing_tds += row.passing_tds;
            self.interceptions += row.interceptions;
        }
        self.carries += row.carries;
        self.rushing_yards += row.rushing_yards;
        self.rushing_tds += row.rushing_tds;
        self.receptions += row.receptions;
        self.targets += row.targets;
        self.receiving_yards += row.receiving_yards;
    }
}

pub struct PlayerPerfIndex {
    /// Per (season, team): week totals sorted ascending by week.
    teams: HashMap<(i32, String), Vec<(i32, WeekTotals)>>,
}

impl PlayerPerfIndex {
    pub fn new(rows: &[PlayerWeekRow]) -> Self {
        let mut by_week: HashMap<(i32, String, i32), WeekTotals> = HashMap::new();
        for row in rows {
            by_week
                .entry((row.season, row.team.clone(), row.week))
                .or_default()
                .fold(row);
        }

        let mut teams: HashMap<(i32, String), Vec<(i32, WeekTotals)>> = HashMap::new();
        for ((season, team, week), totals) in by_week {
            teams.entry((season, team)).or_default().push((week, totals));
        }
        for weeks in teams.values_mut() {
            weeks.sort_by_key(|(week, _)| *week);
        }
        Self { teams }
    }

    pub fn column_names() -> Vec<String> {
        [
            "qb_completion_pct",
            "qb_yards_per_attempt",
            "qb_td_int_ratio",
            "team_yards_per_carry",
            "team_rush_tds_per_game",
            "team_catch_rate",
            "team_yards_per_reception",
            "team_targets_per_game",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    pub fn features_for(&self, play: &StoredPlay) -> Vec<f64> {
        let weeks = self.teams.get(&(play.season, play.posteam.clone()));
        let mut total = WeekTotals::default();
        let mut games = 0u32;
        if let Some(weeks) = weeks {
            for (week, totals) in weeks {
                if *week >= play.week {
                    break;
                }
                games += 1;
                total.completions += totals.completions;
                total.attempts += totals.attempts;
                total.passing_yards += totals.passing_yards;
                total.passing_tds += totals.passing_tds;
                total.interceptions += totals.interceptions;
                total.carries += totals.carries;
                total.rushing_yards += totals.rushing_yards;
                total.rushing_tds += totals.rushing_tds;
                total.receptions += totals.receptions;
                total.targets += totals.targets;
                total.receiving_yards += totals.receiving_yards;
            }
        }
        if games == 0 {
            return vec![f64::NAN; 8];
        }

        vec![
            ratio(total.completions, total.attempts),
            ratio(total.passing_yards, total.attempts),
            // +1 in the denominator keeps a zero-interception stretch finite
            total.passing_tds / (total.interceptions + 1.0),
            ratio(total.rushing_yards, total.carries),
            total.rushing_tds / f64::from(games),
            ratio(total.receptions, total.targets),
            ratio(total.receiving_yards, total.receptions),
            total.targets / f64::from(games),
        ]
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { f64::NAN }
}
