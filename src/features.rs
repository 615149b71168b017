//! Feature derivation pass over the ordered play archive.
//!
//! Cross-game history (tendencies) advances one week at a time: every play
//! of a week is featurized against prior-week state before any play of
//! that week is folded in. Within-game history (momentum, fatigue)
//! advances play by play, since those only ever read strictly earlier
//! plays of the same game.

use anyhow::{Result, anyhow};

use crate::context::ContextIndex;
use crate::fatigue::FatigueTracker;
use crate::momentum::MomentumTracker;
use crate::personnel::{DISABLED_REASON, PersonnelIndex};
use crate::play_store::{GameContext, ParticipationRow, PlayerWeekRow, StoredPlay};
use crate::playerperf::PlayerPerfIndex;
use crate::situational;
use crate::tendency::{FallbackPolicy, TendencyTracker};

/// Opt-in switch for one feature category, carrying the reason when a
/// category ships disabled.
#[derive(Debug, Clone, Copy)]
pub struct CategoryFlag {
    pub enabled: bool,
    pub note: Option<&'static str>,
}

impl CategoryFlag {
    pub fn on() -> Self {
        Self {
            enabled: true,
            note: None,
        }
    }

    pub fn off(note: &'static str) -> Self {
        Self {
            enabled: false,
            note: Some(note),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FeatureConfig {
    pub fallback: FallbackPolicy,
    pub tendencies: CategoryFlag,
    pub momentum: CategoryFlag,
    pub fatigue: CategoryFlag,
    pub situational: CategoryFlag,
    pub context: CategoryFlag,
    pub personnel: CategoryFlag,
    pub player_perf: CategoryFlag,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            fallback: FallbackPolicy::Sentinel,
            tendencies: CategoryFlag::on(),
            momentum: CategoryFlag::on(),
            fatigue: CategoryFlag::on(),
            situational: CategoryFlag::on(),
            context: CategoryFlag::on(),
            personnel: CategoryFlag::off(DISABLED_REASON),
            player_perf: CategoryFlag::on(),
        }
    }
}

impl FeatureConfig {
    pub fn category_summary(&self) -> Vec<(String, bool, Option<&'static str>)> {
        vec![
            ("tendencies".to_string(), self.tendencies.enabled, self.tendencies.note),
            ("momentum".to_string(), self.momentum.enabled, self.momentum.note),
            ("fatigue".to_string(), self.fatigue.enabled, self.fatigue.note),
            ("situational".to_string(), self.situational.enabled, self.situational.note),
            ("context".to_string(), self.context.enabled, self.context.note),
            ("personnel".to_string(), self.personnel.enabled, self.personnel.note),
            ("player_perf".to_string(), self.player_perf.enabled, self.player_perf.note),
        ]
    }
}

/// One featurized play: identifiers, label, and the engineered columns in
/// the frame's column order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub game_id: String,
    pub play_id: i64,
    pub season: i32,
    pub week: i32,
    pub posteam: String,
    pub is_pass: bool,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    pub feature_names: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

pub struct FeatureInputs {
    pub plays: Vec<StoredPlay>,
    pub games: Vec<GameContext>,
    pub participation: Vec<ParticipationRow>,
    pub player_weeks: Vec<PlayerWeekRow>,
}

pub fn feature_names(config: &FeatureConfig) -> Vec<String> {
    let mut names = Vec::new();
    if config.tendencies.enabled {
        names.extend(TendencyTracker::column_names());
    }
    if config.momentum.enabled {
        names.extend(MomentumTracker::column_names());
    }
    if config.fatigue.enabled {
        names.extend(FatigueTracker::column_names());
    }
    if config.situational.enabled {
        names.extend(situational::column_names());
    }
    if config.context.enabled {
        names.extend(ContextIndex::column_names());
    }
    if config.personnel.enabled {
        names.extend(PersonnelIndex::column_names());
    }
    if config.player_perf.enabled {
        names.extend(PlayerPerfIndex::column_names());
    }
    names
}

/// Derive the full feature frame. Input order does not matter; the pass
/// sorts into ascending (season, week, game_id, play_id) and is a pure
/// function of its inputs.
pub fn build_feature_frame(mut inputs: FeatureInputs, config: &FeatureConfig) -> Result<FeatureFrame> {
    if inputs.plays.is_empty() {
        return Err(anyhow!("no plays to featurize"));
    }
    inputs.plays.sort_by(|a, b| {
        (a.season, a.week, &a.game_id, a.play_id).cmp(&(b.season, b.week, &b.game_id, b.play_id))
    });

    let names = feature_names(config);
    let mut tendency = TendencyTracker::new(config.fallback);
    let mut momentum = MomentumTracker::new();
    let mut fatigue = FatigueTracker::new();
    let context = ContextIndex::new(std::mem::take(&mut inputs.games));
    let personnel = PersonnelIndex::new(std::mem::take(&mut inputs.participation));
    let player_perf = PlayerPerfIndex::new(&inputs.player_weeks);

    let mut rows = Vec::with_capacity(inputs.plays.len());
    let mut week_start = 0usize;
    let mut current_season: Option<i32> = None;
    let plays = &inputs.plays;

    while week_start < plays.len() {
        let week_key = plays[week_start].week_key();
        // Tendencies are season-scoped: a new season starts from zero
        // history before any of its plays are featurized.
        if current_season != Some(week_key.0) {
            tendency.reset_for_season(week_key.0);
            current_season = Some(week_key.0);
        }
        let mut week_end = week_start;
        while week_end < plays.len() && plays[week_end].week_key() == week_key {
            week_end += 1;
        }

        for play in &plays[week_start..week_end] {
            let mut values = Vec::with_capacity(names.len());
            if config.tendencies.enabled {
                values.extend(tendency.features_for(play));
            }
            if config.momentum.enabled {
                values.extend(momentum.features_for(play));
            }
            if config.fatigue.enabled {
                values.extend(fatigue.features_for(play));
            }
            if config.situational.enabled {
                values.extend(situational::features_for(play));
            }
            if config.context.enabled {
                values.extend(context.features_for(play));
            }
            if config.personnel.enabled {
                values.extend(personnel.features_for(play));
            }
            if config.player_perf.enabled {
                values.extend(player_perf.features_for(play));
            }
            debug_assert_eq!(values.len(), names.len());

            rows.push(FeatureRow {
                game_id: play.game_id.clone(),
                play_id: play.play_id,
                season: play.season,
                week: play.week,
                posteam: play.posteam.clone(),
                is_pass: play.is_pass,
                values,
            });

            // Within-game trackers advance immediately: later plays of the
            // same game legitimately see this one.
            momentum.absorb(play);
            fatigue.absorb(play);
        }

        // Cross-game history only advances once the whole week is out.
        for play in &plays[week_start..week_end] {
            tendency.absorb(play);
        }
        week_start = week_end;
    }

    Ok(FeatureFrame {
        feature_names: names,
        rows,
    })
}
