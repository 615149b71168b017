//! Defensive-alignment features from the participation table.
//!
//! Disabled by default: defenders-in-box and pass-rusher counts are
//! charted after the snap, so they encode the play call they are supposed
//! to predict. The category exists behind an explicit opt-in for
//! retrospective analysis, never for the default training path.

use std::collections::HashMap;

use crate::play_store::{ParticipationRow, StoredPlay};

pub const DISABLED_REASON: &str =
    "participation alignment columns are charted post-snap and leak the play call";

const LIGHT_BOX_MAX: f64 = 6.0;
const HEAVY_BOX_MIN: f64 = 8.0;

pub struct PersonnelIndex {
    by_play: HashMap<(String, i64), ParticipationRow>,
}

impl PersonnelIndex {
    pub fn new(rows: Vec<ParticipationRow>) -> Self {
        let by_play = rows
            .into_iter()
            .map(|r| ((r.game_id.clone(), r.play_id), r))
            .collect();
        Self { by_play }
    }

    pub fn column_names() -> Vec<String> {
        [
            "defenders_in_box",
            "is_light_box",
            "is_heavy_box",
            "pass_rushers",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    pub fn features_for(&self, play: &StoredPlay) -> Vec<f64> {
        let row = self.by_play.get(&(play.game_id.clone(), play.play_id));
        let box_count = row.and_then(|r| r.defenders_in_box);
        let rushers = row.and_then(|r| r.pass_rushers);

        vec![
            box_count.unwrap_or(f64::NAN),
            box_count
                .map(|b| if b < LIGHT_BOX_MAX { 1.0 } else { 0.0 })
                .unwrap_or(f64::NAN),
            box_count
                .map(|b| if b >= HEAVY_BOX_MIN { 1.0 } else { 0.0 })
                .unwrap_or(f64::NAN),
            rushers.unwrap_or(f64::NAN),
        ]
    }
}
