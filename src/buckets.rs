//! Situation buckets used to slice team-tendency rates.

use crate::play_store::StoredPlay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistanceBucket {
    Short,
    Medium,
    Long,
}

impl DistanceBucket {
    pub fn from_ydstogo(ydstogo: i32) -> Self {
        if ydstogo <= 3 {
            DistanceBucket::Short
        } else if ydstogo <= 7 {
            DistanceBucket::Medium
        } else {
            DistanceBucket::Long
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DistanceBucket::Short => "short",
            DistanceBucket::Medium => "medium",
            DistanceBucket::Long => "long",
        }
    }

    pub const ALL: [DistanceBucket; 3] = [
        DistanceBucket::Short,
        DistanceBucket::Medium,
        DistanceBucket::Long,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldZone {
    OwnTerritory,
    MidfieldApproach,
    OpponentTerritory,
    RedZone,
    GoalLine,
}

impl FieldZone {
    /// `yardline_100` is distance to the opponent end zone.
    pub fn from_yardline(yardline_100: i32) -> Self {
        if yardline_100 <= 10 {
            FieldZone::GoalLine
        } else if yardline_100 <= 20 {
            FieldZone::RedZone
        } else if yardline_100 <= 50 {
            FieldZone::OpponentTerritory
        } else if yardline_100 <= 80 {
            FieldZone::MidfieldApproach
        } else {
            FieldZone::OwnTerritory
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldZone::OwnTerritory => "own_territory",
            FieldZone::MidfieldApproach => "midfield",
            FieldZone::OpponentTerritory => "opp_territory",
            FieldZone::RedZone => "red_zone",
            FieldZone::GoalLine => "goal_line",
        }
    }

    pub const ALL: [FieldZone; 5] = [
        FieldZone::OwnTerritory,
        FieldZone::MidfieldApproach,
        FieldZone::OpponentTerritory,
        FieldZone::RedZone,
        FieldZone::GoalLine,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreSituation {
    TrailingBig,
    TrailingSmall,
    Tied,
    LeadingSmall,
    LeadingBig,
}

impl ScoreSituation {
    pub fn from_differential(diff: i32) -> Self {
        if diff < -7 {
            ScoreSituation::TrailingBig
        } else if diff < 0 {
            ScoreSituation::TrailingSmall
        } else if diff == 0 {
            ScoreSituation::Tied
        } else if diff <= 7 {
            ScoreSituation::LeadingSmall
        } else {
            ScoreSituation::LeadingBig
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreSituation::TrailingBig => "trailing_big",
            ScoreSituation::TrailingSmall => "trailing_small",
            ScoreSituation::Tied => "tied",
            ScoreSituation::LeadingSmall => "leading_small",
            ScoreSituation::LeadingBig => "leading_big",
        }
    }

    pub const ALL: [ScoreSituation; 5] = [
        ScoreSituation::TrailingBig,
        ScoreSituation::TrailingSmall,
        ScoreSituation::Tied,
        ScoreSituation::LeadingSmall,
        ScoreSituation::LeadingBig,
    ];
}

pub fn is_two_minute(play: &StoredPlay) -> bool {
    matches!(play.half_seconds_remaining, Some(s) if s <= 120.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_buckets_cover_boundaries() {
        assert_eq!(DistanceBucket::from_ydstogo(1), DistanceBucket::Short);
        assert_eq!(DistanceBucket::from_ydstogo(3), DistanceBucket::Short);
        assert_eq!(DistanceBucket::from_ydstogo(4), DistanceBucket::Medium);
        assert_eq!(DistanceBucket::from_ydstogo(7), DistanceBucket::Medium);
        assert_eq!(DistanceBucket::from_ydstogo(8), DistanceBucket::Long);
        assert_eq!(DistanceBucket::from_ydstogo(25), DistanceBucket::Long);
    }

    #[test]
    fn field_zones_cover_boundaries() {
        assert_eq!(FieldZone::from_yardline(1), FieldZone::GoalLine);
        assert_eq!(FieldZone::from_yardline(10), FieldZone::GoalLine);
        assert_eq!(FieldZone::from_yardline(11), FieldZone::RedZone);
        assert_eq!(FieldZone::from_yardline(20), FieldZone::RedZone);
        assert_eq!(FieldZone::from_yardline(21), FieldZone::OpponentTerritory);
        assert_eq!(FieldZone::from_yardline(50), FieldZone::OpponentTerritory);
        assert_eq!(FieldZone::from_yardline(51), FieldZone::MidfieldApproach);
        assert_eq!(FieldZone::from_yardline(80), FieldZone::MidfieldApproach);
        assert_eq!(FieldZone::from_yardline(81), FieldZone::OwnTerritory);
        assert_eq!(FieldZone::from_yardline(99), FieldZone::OwnTerritory);
    }

    #[test]
    fn score_situations_cover_boundaries() {
        assert_eq!(
            ScoreSituation::from_differential(-8),
            ScoreSituation::TrailingBig
        );
        assert_eq!(
            ScoreSituation::from_differential(-7),
            ScoreSituation::TrailingSmall
        );
        assert_eq!(
            ScoreSituation::from_differential(-1),
            ScoreSituation::TrailingSmall
        );
        assert_eq!(ScoreSituation::from_differential(0), ScoreSituation::Tied);
        assert_eq!(
            ScoreSituation::from_differential(7),
            ScoreSituation::LeadingSmall
        );
        assert_eq!(
            ScoreSituation::from_differential(8),
            ScoreSituation::LeadingBig
        );
    }
}
