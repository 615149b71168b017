//! Deterministic synthetic play generator for offline runs and tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::play_store::{GameContext, PlayerWeekRow, StoredPlay};

const TEAMS: [&str; 8] = ["KC", "SF", "BUF", "DET", "PHI", "BAL", "DAL", "MIA"];

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub seasons: Vec<i32>,
    pub weeks_per_season: i32,
    pub games_per_week: usize,
    pub plays_per_game: usize,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seasons: vec![2023],
            weeks_per_season: 6,
            games_per_week: 4,
            plays_per_game: 60,
            seed: 42,
        }
    }
}

/// Plays with a pass probability that actually depends on the situation,
/// so fitted models have signal to find.
pub fn generate_plays(config: &SyntheticConfig) -> Vec<StoredPlay> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut plays = Vec::new();

    for &season in &config.seasons {
        for week in 1..=config.weeks_per_season {
            for game_idx in 0..config.games_per_week {
                let home = TEAMS[(game_idx * 2) % TEAMS.len()];
                let away = TEAMS[(game_idx * 2 + 1) % TEAMS.len()];
                let game_id = format!("{season}_{week:02}_{away}_{home}");
                generate_game(&mut rng, config, &game_id, season, week, home, away, &mut plays);
            }
        }
    }
    plays
}

#[allow(clippy::too_many_arguments)]
fn generate_game(
    rng: &mut StdRng,
    config: &SyntheticConfig,
    game_id: &str,
    season: i32,
    week: i32,
    home: &str,
    away: &str,
    out: &mut Vec<StoredPlay>,
) {
    let mut clock = 3600.0f64;
    let mut score_diff = 0i32;
    let mut drive = 1i64;
    let mut plays_in_drive = 0u32;

    for play_idx in 0..config.plays_per_game {
        let offense_is_home = (drive % 2) == 0;
        let (posteam, defteam) = if offense_is_home {
            (home, away)
        } else {
            (away, home)
        };

        // Roughly real-world down frequencies, fourth downs included.
        let down = match rng.gen_range(0..20) {
            0..=8 => 1,
            9..=14 => 2,
            15..=18 => 3,
            _ => 4,
        };
        let ydstogo = match down {
            1 => 10,
            _ => rng.gen_range(1..=12),
        };
        let yardline_100 = rng.gen_range(1..=99);
        let qtr = (4.0 - clock / 900.0).ceil().max(1.0) as i32;

        // Trailing teams and long distances skew pass-heavy, short
        // yardage skews run-heavy. Teams carry a fixed bias.
        let team_bias = (posteam.len() % 3) as f64 * 0.05;
        let mut pass_prob = 0.45 + team_bias;
        if ydstogo >= 8 {
            pass_prob += 0.25;
        } else if ydstogo <= 2 {
            pass_prob -= 0.25;
        }
        if score_diff < -7 {
            pass_prob += 0.15;
        } else if score_diff > 7 {
            pass_prob -= 0.15;
        }
        let is_pass = rng.r#gen::<f64>() < pass_prob.clamp(0.05, 0.95);

        let yards = if is_pass {
            rng.gen_range(-3.0..18.0)
        } else {
            rng.gen_range(-2.0..9.0)
        };
        let epa = yards / 10.0 + rng.gen_range(-0.4..0.4);
        let first_down = yards >= ydstogo as f64;

        out.push(StoredPlay {
            game_id: game_id.to_string(),
            play_id: (play_idx as i64 + 1) * 10,
            season,
            week,
            posteam: posteam.to_string(),
            defteam: defteam.to_string(),
            drive: Some(drive),
            qtr: qtr.min(4),
            down,
            ydstogo,
            yardline_100,
            score_differential: if offense_is_home {
                score_diff
            } else {
                -score_diff
            },
            half_seconds_remaining: Some(if clock > 1800.0 {
                clock - 1800.0
            } else {
                clock
            }),
            game_seconds_remaining: Some(clock),
            shotgun: is_pass && rng.r#gen::<f64>() < 0.7,
            no_huddle: rng.r#gen::<f64>() < 0.1,
            is_pass,
            epa: Some(epa),
            yards_gained: Some(yards),
            first_down,
        });

        // Pace the clock so a game's plays span all four quarters, with
        // the occasional hurry-up snap.
        let step = 3600.0 / config.plays_per_game as f64;
        let elapsed = if rng.r#gen::<f64>() < 0.1 {
            rng.gen_range(5.0..18.0)
        } else {
            rng.gen_range(step * 0.5..step * 1.5)
        };
        clock = (clock - elapsed).max(0.0);
        plays_in_drive += 1;
        let drive_over = plays_in_drive >= 8 || (!first_down && down >= 3);
        if drive_over {
            if rng.r#gen::<f64>() < 0.3 {
                score_diff += if offense_is_home { 7 } else { -7 };
            }
            drive += 1;
            plays_in_drive = 0;
        }
    }
}

pub fn generate_game_contexts(plays: &[StoredPlay], seed: u64) -> Vec<GameContext> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut seen = std::collections::HashSet::new();
    let mut games = Vec::new();
    for play in plays {
        if !seen.insert(play.game_id.clone()) {
            continue;
        }
        let outdoors = rng.r#gen::<f64>() < 0.6;
        games.push(GameContext {
            game_id: play.game_id.clone(),
            season: play.season,
            week: play.week,
            home_team: play.defteam.clone(),
            away_team: play.posteam.clone(),
            roof: Some(if outdoors { "outdoors" } else { "dome" }.to_string()),
            surface: Some(if rng.r#gen::<f64>() < 0.5 { "grass" } else { "fieldturf" }.to_string()),
            temp: Some(rng.gen_range(20.0..85.0)),
            wind: Some(rng.gen_range(0.0..25.0)),
            home_rest: Some(7),
            away_rest: Some(7),
            div_game: Some(rng.r#gen::<f64>() < 0.25),
        });
    }
    games
}

/// One QB, RB and WR stat line per (season, week, team) seen in the plays.
pub fn generate_player_weeks(plays: &[StoredPlay], seed: u64) -> Vec<PlayerWeekRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut seen = std::collections::HashSet::new();
    let mut rows = Vec::new();
    for play in plays {
        if !seen.insert((play.season, play.week, play.posteam.clone())) {
            continue;
        }
        let attempts = rng.gen_range(25.0..45.0f64);
        let completions = attempts * rng.gen_range(0.55..0.75);
        let carries = rng.gen_range(18.0..32.0f64);
        let targets = attempts * 0.95;
        let receptions = completions;
        rows.push(PlayerWeekRow {
            season: play.season,
            week: play.week,
            team: play.posteam.clone(),
            position: "QB".to_string(),
            completions,
            attempts,
            passing_yards: completions * rng.gen_range(9.0..13.0),
            passing_tds: rng.gen_range(0.0..4.0f64).floor(),
            interceptions: rng.gen_range(0.0..2.5f64).floor(),
            carries: rng.gen_range(1.0..5.0f64),
            rushing_yards: rng.gen_range(0.0..30.0),
            rushing_tds: 0.0,
            receptions: 0.0,
            targets: 0.0,
            receiving_yards: 0.0,
        });
        rows.push(PlayerWeekRow {
            season: play.season,
            week: play.week,
            team: play.posteam.clone(),
            position: "RB".to_string(),
            completions: 0.0,
            attempts: 0.0,
            passing_yards: 0.0,
            passing_tds: 0.0,
            interceptions: 0.0,
            carries,
            rushing_yards: carries * rng.gen_range(3.2..5.2),
            rushing_tds: rng.gen_range(0.0..2.0f64).floor(),
            receptions: rng.gen_range(2.0..6.0f64),
            targets: rng.gen_range(3.0..8.0f64),
            receiving_yards: rng.gen_range(10.0..50.0),
        });
        rows.push(PlayerWeekRow {
            season: play.season,
            week: play.week,
            team: play.posteam.clone(),
            position: "WR".to_string(),
            completions: 0.0,
            attempts: 0.0,
            passing_yards: 0.0,
            passing_tds: 0.0,
            interceptions: 0.0,
            carries: 0.0,
            rushing_yards: 0.0,
            rushing_tds: 0.0,
            receptions,
            targets,
            receiving_yards: receptions * rng.gen_range(10.0..14.0),
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic_per_seed() {
        let config = SyntheticConfig::default();
        let a = generate_plays(&config);
        let b = generate_plays(&config);
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn both_labels_are_represented() {
        let plays = generate_plays(&SyntheticConfig::default());
        let passes = plays.iter().filter(|p| p.is_pass).count();
        assert!(passes > 0);
        assert!(passes < plays.len());
    }

    #[test]
    fn every_down_is_represented() {
        let plays = generate_plays(&SyntheticConfig::default());
        for down in 1..=4 {
            assert!(
                plays.iter().any(|p| p.down == down),
                "no down-{down} plays in the synthetic corpus"
            );
        }
    }

    #[test]
    fn late_game_situations_are_represented() {
        let plays = generate_plays(&SyntheticConfig::default());
        assert!(plays.iter().any(|p| p.qtr == 4));
        assert!(
            plays
                .iter()
                .any(|p| matches!(p.half_seconds_remaining, Some(s) if s <= 120.0))
        );
    }

    #[test]
    fn player_weeks_cover_every_team_week() {
        let plays = generate_plays(&SyntheticConfig::default());
        let rows = generate_player_weeks(&plays, 2);
        let team_weeks: std::collections::HashSet<_> = plays
            .iter()
            .map(|p| (p.season, p.week, p.posteam.clone()))
            .collect();
        assert_eq!(rows.len(), team_weeks.len() * 3);
        assert!(rows.iter().any(|r| r.position == "QB"));
    }

    #[test]
    fn contexts_cover_every_game() {
        let plays = generate_plays(&SyntheticConfig::default());
        let games = generate_game_contexts(&plays, 1);
        let distinct: std::collections::HashSet<_> =
            plays.iter().map(|p| p.game_id.as_str()).collect();
        assert_eq!(games.len(), distinct.len());
    }
}
