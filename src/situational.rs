//! Stateless pre-snap situation flags. These read only the current play's
//! situation fields, so they carry no temporal dependency at all.

use crate::buckets::is_two_minute;
use crate::play_store::StoredPlay;

pub fn column_names() -> Vec<String> {
    [
        "is_short_yardage",
        "is_long_distance",
        "is_red_zone",
        "is_goal_line",
        "is_passing_down",
        "is_third_down",
        "is_losing",
        "is_winning",
        "is_tied",
        "is_two_minute",
        "is_fourth_quarter",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn features_for(play: &StoredPlay) -> Vec<f64> {
    let flags = [
        play.ydstogo <= 2,
        play.ydstogo >= 8,
        play.yardline_100 <= 20,
        play.yardline_100 <= 5,
        // obvious passing situations: 2nd-and-long or 3rd/4th-and-medium-plus
        (play.down == 2 && play.ydstogo >= 8) || (play.down >= 3 && play.ydstogo >= 5),
        play.down == 3,
        play.score_differential < 0,
        play.score_differential > 0,
        play.score_differential == 0,
        is_two_minute(play),
        play.qtr == 4,
    ];
    flags
        .iter()
        .map(|f| if *f { 1.0 } else { 0.0 })
        .collect()
}
