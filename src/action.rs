//! Cadence actions: the per-field decision of which reconstructed frame a
//! field contributes to, or whether it is dropped.
//!
//! `Action` is a closed enum at the core boundary. Project files have gone
//! through generations that stored either small integer codes or strings;
//! the decode adapter here accepts both, and encoding always writes the
//! canonical integer code going forward.

use std::fmt;
use std::str::FromStr;

/// Number of interlaced fields in one telecine cycle.
pub const FIELDS_PER_CYCLE: usize = 10;

/// Number of reconstructed progressive frames per cycle.
pub const FRAMES_PER_CYCLE: usize = 4;

/// Per-field cadence action.
///
/// Parity (top/bottom) follows the field's position within its cycle:
/// even index = top, odd = bottom. Only the frame slot (0..3) is
/// independently meaningful per field pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    TopFrame0,
    BottomFrame0,
    TopFrame1,
    BottomFrame1,
    TopFrame2,
    BottomFrame2,
    TopFrame3,
    BottomFrame3,
    Drop,
    /// Assigned to the lookahead field (position 10): the field completes
    /// the previous cycle's last frame instead of starting a new one.
    CompletePreviousCycle,
}

impl Action {
    /// Canonical wire code (0..=9), the encoding written on every save.
    pub fn code(self) -> u8 {
        match self {
            Action::TopFrame0 => 0,
            Action::BottomFrame0 => 1,
            Action::TopFrame1 => 2,
            Action::BottomFrame1 => 3,
            Action::TopFrame2 => 4,
            Action::BottomFrame2 => 5,
            Action::TopFrame3 => 6,
            Action::BottomFrame3 => 7,
            Action::Drop => 8,
            Action::CompletePreviousCycle => 9,
        }
    }

    /// Decode a wire code.
    pub fn from_code(code: u8) -> Option<Action> {
        Some(match code {
            0 => Action::TopFrame0,
            1 => Action::BottomFrame0,
            2 => Action::TopFrame1,
            3 => Action::BottomFrame1,
            4 => Action::TopFrame2,
            5 => Action::BottomFrame2,
            6 => Action::TopFrame3,
            7 => Action::BottomFrame3,
            8 => Action::Drop,
            9 => Action::CompletePreviousCycle,
            _ => return None,
        })
    }

    /// Frame slot (0..=3) this field contributes to, if any.
    pub fn frame_slot(self) -> Option<u8> {
        match self.code() {
            c @ 0..=7 => Some(c / 2),
            _ => None,
        }
    }

    /// Whether this action names a top field (even code among the pairs).
    pub fn is_top(self) -> bool {
        matches!(
            self,
            Action::TopFrame0 | Action::TopFrame1 | Action::TopFrame2 | Action::TopFrame3
        )
    }

    /// Candidate action for a cadence hotkey.
    ///
    /// `key` is 1..=4 (the four frame keys), `position` is the field's
    /// position within the displayed window (0..=10, where 10 is the
    /// lookahead field from the next cycle). Keys 1..=3 resolve to
    /// `frame_slot = key - 1` with parity from the position; key 4 on the
    /// lookahead position resolves to [`Action::CompletePreviousCycle`].
    pub fn candidate(key: u8, position: usize) -> Option<Action> {
        if !(1..=4).contains(&key) || position > FIELDS_PER_CYCLE {
            return None;
        }
        if key == 4 && position == FIELDS_PER_CYCLE {
            return Some(Action::CompletePreviousCycle);
        }
        let code = 2 * (key - 1) + (position % 2) as u8;
        Action::from_code(code)
    }

    /// Toggle against a candidate: pressing the same key again drops the
    /// field ("press again to undo").
    pub fn toggled(self, candidate: Action) -> Action {
        if self == candidate { Action::Drop } else { candidate }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::TopFrame0 => "top_frame_0",
            Action::BottomFrame0 => "bottom_frame_0",
            Action::TopFrame1 => "top_frame_1",
            Action::BottomFrame1 => "bottom_frame_1",
            Action::TopFrame2 => "top_frame_2",
            Action::BottomFrame2 => "bottom_frame_2",
            Action::TopFrame3 => "top_frame_3",
            Action::BottomFrame3 => "bottom_frame_3",
            Action::Drop => "drop",
            Action::CompletePreviousCycle => "complete_previous_cycle",
        };
        f.write_str(name)
    }
}

impl FromStr for Action {
    type Err = String;

    /// Accepts both legacy project encodings: a numeric code ("8") or the
    /// snake_case name ("drop").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u8>() {
            return Action::from_code(code).ok_or_else(|| format!("invalid action code: {}", code));
        }
        match s {
            "top_frame_0" => Ok(Action::TopFrame0),
            "bottom_frame_0" => Ok(Action::BottomFrame0),
            "top_frame_1" => Ok(Action::TopFrame1),
            "bottom_frame_1" => Ok(Action::BottomFrame1),
            "top_frame_2" => Ok(Action::TopFrame2),
            "bottom_frame_2" => Ok(Action::BottomFrame2),
            "top_frame_3" => Ok(Action::TopFrame3),
            "bottom_frame_3" => Ok(Action::BottomFrame3),
            "drop" => Ok(Action::Drop),
            "complete_previous_cycle" => Ok(Action::CompletePreviousCycle),
            other => Err(format!("unknown action: {}", other)),
        }
    }
}

/// The repeating 10-field action template a fresh project is tiled with:
/// 3:2 pulldown with two dropped fields per cycle.
pub const DEFAULT_ACTIONS: [Action; FIELDS_PER_CYCLE] = [
    Action::TopFrame0,
    Action::BottomFrame0,
    Action::TopFrame1,
    Action::BottomFrame1,
    Action::Drop,
    Action::BottomFrame2,
    Action::TopFrame2,
    Action::Drop,
    Action::TopFrame3,
    Action::BottomFrame3,
];

/// Matching note labels for the default template.
pub const DEFAULT_NOTES: [&str; FIELDS_PER_CYCLE] =
    ["A", "A", "B", "B", "B", "C", "C", "D", "D", "D"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for code in 0..=9u8 {
            let action = Action::from_code(code).unwrap();
            assert_eq!(action.code(), code);
        }
        assert!(Action::from_code(10).is_none());
    }

    #[test]
    fn test_parse_both_encodings() {
        assert_eq!("8".parse::<Action>().unwrap(), Action::Drop);
        assert_eq!("drop".parse::<Action>().unwrap(), Action::Drop);
        assert_eq!("top_frame_2".parse::<Action>().unwrap(), Action::TopFrame2);
        assert_eq!("5".parse::<Action>().unwrap(), Action::BottomFrame2);
        assert!("11".parse::<Action>().is_err());
        assert!("nope".parse::<Action>().is_err());
    }

    #[test]
    fn test_candidate_parity() {
        // Key 1 at even positions -> top of frame 0, odd -> bottom
        assert_eq!(Action::candidate(1, 0), Some(Action::TopFrame0));
        assert_eq!(Action::candidate(1, 1), Some(Action::BottomFrame0));
        assert_eq!(Action::candidate(2, 4), Some(Action::TopFrame1));
        assert_eq!(Action::candidate(3, 7), Some(Action::BottomFrame2));
        assert_eq!(Action::candidate(4, 8), Some(Action::TopFrame3));
        assert_eq!(Action::candidate(4, 9), Some(Action::BottomFrame3));
    }

    #[test]
    fn test_candidate_lookahead_field() {
        // Position 10 is the lookahead field: key 4 completes the previous
        // cycle, keys 1..=3 still resolve with even parity.
        assert_eq!(Action::candidate(4, 10), Some(Action::CompletePreviousCycle));
        assert_eq!(Action::candidate(1, 10), Some(Action::TopFrame0));
        assert_eq!(Action::candidate(5, 0), None);
        assert_eq!(Action::candidate(0, 0), None);
        assert_eq!(Action::candidate(1, 11), None);
    }

    #[test]
    fn test_toggle_press_again_drops() {
        let a = Action::TopFrame1;
        assert_eq!(Action::Drop.toggled(a), a);
        assert_eq!(a.toggled(a), Action::Drop);
        // Toggling Drop with the drop candidate keeps Drop
        assert_eq!(Action::Drop.toggled(Action::Drop), Action::Drop);
    }

    #[test]
    fn test_default_template_codes() {
        let codes: Vec<u8> = DEFAULT_ACTIONS.iter().map(|a| a.code()).collect();
        assert_eq!(codes, vec![0, 1, 2, 3, 8, 5, 4, 8, 6, 7]);
    }

    #[test]
    fn test_frame_slot() {
        assert_eq!(Action::TopFrame0.frame_slot(), Some(0));
        assert_eq!(Action::BottomFrame3.frame_slot(), Some(3));
        assert_eq!(Action::Drop.frame_slot(), None);
        assert_eq!(Action::CompletePreviousCycle.frame_slot(), None);
    }
}
