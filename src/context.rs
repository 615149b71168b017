//! Game-environment features joined from the schedules table. These are
//! fixed before kickoff, so they need no temporal bookkeeping.

use std::collections::HashMap;

use crate::play_store::{GameContext, StoredPlay};

const COLD_TEMP_F: f64 = 40.0;
const HIGH_WIND_MPH: f64 = 15.0;

pub struct ContextIndex {
    by_game: HashMap<String, GameContext>,
}

impl ContextIndex {
    pub fn new(games: Vec<GameContext>) -> Self {
        let by_game = games.into_iter().map(|g| (g.game_id.clone(), g)).collect();
        Self { by_game }
    }

    pub fn column_names() -> Vec<String> {
        [
            "is_outdoor",
            "is_dome",
            "temperature",
            "wind_speed",
            "is_cold",
            "is_high_wind",
            "is_grass",
            "is_division_game",
            "is_offense_home",
            "offense_rest_days",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    pub fn features_for(&self, play: &StoredPlay) -> Vec<f64> {
        let Some(game) = self.by_game.get(&play.game_id) else {
            return vec![f64::NAN; 10];
        };

        let (is_outdoor, is_dome) = match game.roof.as_deref() {
            Some("outdoors") | Some("open") => (1.0, 0.0),
            Some("dome") | Some("closed") => (0.0, 1.0),
            _ => (f64::NAN, f64::NAN),
        };
        let temperature = game.temp.unwrap_or(f64::NAN);
        let wind = game.wind.unwrap_or(f64::NAN);
        let is_cold = game
            .temp
            .map(|t| if t < COLD_TEMP_F { 1.0 } else { 0.0 })
            .unwrap_or(f64::NAN);
        let is_high_wind = game
            .wind
            .map(|w| if w > HIGH_WIND_MPH { 1.0 } else { 0.0 })
            .unwrap_or(f64::NAN);
        let is_grass = match game.surface.as_deref() {
            Some(s) if s.starts_with("grass") => 1.0,
            Some(_) => 0.0,
            None => f64::NAN,
        };
        let is_division = game
            .div_game
            .map(|d| if d { 1.0 } else { 0.0 })
            .unwrap_or(f64::NAN);
        let (is_home, rest) = if play.posteam == game.home_team {
            (1.0, game.home_rest)
        } else if play.posteam == game.away_team {
            (0.0, game.away_rest)
        } else {
            (f64::NAN, None)
        };
        let rest_days = rest.map(|r| r as f64).unwrap_or(f64::NAN);

        vec![
            is_outdoor,
            is_dome,
            temperature,
            wind,
            is_cold,
            is_high_wind,
            is_grass,
            is_division,
            is_home,
            rest_days,
        ]
    }
}
