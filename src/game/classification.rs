use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FullComboState {
    None,
    FullCombo,
    #[default]
    PerfectFullCombo,
}

impl FullComboState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::FullCombo => "FC",
            Self::PerfectFullCombo => "PFC",
        }
    }
}

impl FromStr for FullComboState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "fc" | "fullcombo" => Ok(Self::FullCombo),
            "pfc" | "perfectfullcombo" => Ok(Self::PerfectFullCombo),
            other => Err(format!("'{other}' is not a valid full combo state")),
        }
    }
}

impl core::fmt::Display for FullComboState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StarColor {
    Green,
    Cyan,
}

/// `full_combo` is what the play has actually earned so far; `star` is what
/// the HUD star advertises and can stay optimistic while the play is still on
/// pace for a perfect.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub full_combo: FullComboState,
    pub star: FullComboState,
    pub star_color: Option<StarColor>,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            full_combo: FullComboState::PerfectFullCombo,
            star: FullComboState::PerfectFullCombo,
            star_color: Some(StarColor::Cyan),
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct ClassifyInput {
    pub score: u64,
    pub streak: u32,
    pub max_streak: u32,
    pub max_possible_score_so_far: u64,
    pub max_possible_streak_so_far: u32,
    pub max_possible_streak: u32,
    pub s_plus_threshold: u64,
}

/// Rules are checked in order; the first match wins.
///
/// The streak rule pairs the running "so far" streak bound with the whole-track
/// bound. Both halves must fail before the combo is considered lost.
pub fn classify(input: &ClassifyInput) -> Classification {
    if input.streak < input.max_possible_streak_so_far
        && input.max_streak < input.max_possible_streak
    {
        return Classification {
            full_combo: FullComboState::None,
            star: FullComboState::None,
            star_color: None,
        };
    }
    if input.score < input.max_possible_score_so_far.saturating_sub(input.s_plus_threshold) {
        return Classification {
            full_combo: FullComboState::FullCombo,
            star: FullComboState::FullCombo,
            star_color: Some(StarColor::Green),
        };
    }
    if input.score < input.max_possible_score_so_far {
        return Classification {
            full_combo: FullComboState::FullCombo,
            star: FullComboState::PerfectFullCombo,
            star_color: Some(StarColor::Green),
        };
    }
    Classification::default()
}

#[cfg(test)]
mod tests {
    use super::{ClassifyInput, FullComboState, StarColor, classify};

    fn on_pace() -> ClassifyInput {
        ClassifyInput {
            score: 1000,
            streak: 10,
            max_streak: 10,
            max_possible_score_so_far: 1000,
            max_possible_streak_so_far: 10,
            max_possible_streak: 50,
            s_plus_threshold: 96,
        }
    }

    #[test]
    fn perfect_pace_is_cyan_pfc() {
        let c = classify(&on_pace());
        assert_eq!(c.full_combo, FullComboState::PerfectFullCombo);
        assert_eq!(c.star, FullComboState::PerfectFullCombo);
        assert_eq!(c.star_color, Some(StarColor::Cyan));
    }

    #[test]
    fn small_loss_keeps_pfc_star_but_turns_green() {
        let c = classify(&ClassifyInput { score: 904, ..on_pace() });
        assert_eq!(c.full_combo, FullComboState::FullCombo);
        assert_eq!(c.star, FullComboState::PerfectFullCombo);
        assert_eq!(c.star_color, Some(StarColor::Green));
    }

    #[test]
    fn loss_past_s_plus_margin_is_plain_fc() {
        let c = classify(&ClassifyInput { score: 903, ..on_pace() });
        assert_eq!((c.full_combo, c.star), (FullComboState::FullCombo, FullComboState::FullCombo));
    }

    #[test]
    fn dropped_streak_loses_the_combo() {
        let c = classify(&ClassifyInput { streak: 0, ..on_pace() });
        assert_eq!((c.full_combo, c.star), (FullComboState::None, FullComboState::None));
        assert_eq!(c.star_color, None);
    }

    #[test]
    fn streak_rule_needs_both_bounds_to_fail() {
        // The play already reached the whole-track streak ceiling once.
        let c = classify(&ClassifyInput {
            streak: 0,
            max_streak: 50,
            ..on_pace()
        });
        assert_ne!(c.full_combo, FullComboState::None);
    }

    #[test]
    fn full_combo_state_round_trips_through_text() {
        for s in [
            FullComboState::None,
            FullComboState::FullCombo,
            FullComboState::PerfectFullCombo,
        ] {
            assert_eq!(s.to_string().parse::<FullComboState>(), Ok(s));
        }
    }
}
