// Position, slot, and handedness vocabularies.
//
// All three are closed enumerations. Every boundary that consumes a code
// string (season ingestion, pick commits, config parsing) goes through the
// strict parsers here, which reject unrecognized codes with a typed error
// instead of letting them silently fail a set-membership check downstream.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A code string that does not belong to the closed vocabulary it was
/// parsed against.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized {kind} code `{code}`")]
pub struct CodeError {
    pub kind: &'static str,
    pub code: String,
}

impl CodeError {
    fn new(kind: &'static str, code: &str) -> Self {
        CodeError {
            kind,
            code: code.to_string(),
        }
    }
}

/// A player's primary position as recorded on a historical season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Catcher,
    FirstBase,
    SecondBase,
    ThirdBase,
    ShortStop,
    LeftField,
    CenterField,
    RightField,
    /// Generic outfield, common on older records that predate LF/CF/RF splits.
    OutField,
    DesignatedHitter,
    /// Generic pitcher, for records that do not distinguish role.
    Pitcher,
    StartingPitcher,
    ReliefPitcher,
    Closer,
}

impl Position {
    /// Parse a position code. Case-insensitive.
    pub fn parse(s: &str) -> Result<Self, CodeError> {
        match s.to_uppercase().as_str() {
            "C" => Ok(Position::Catcher),
            "1B" => Ok(Position::FirstBase),
            "2B" => Ok(Position::SecondBase),
            "3B" => Ok(Position::ThirdBase),
            "SS" => Ok(Position::ShortStop),
            "LF" => Ok(Position::LeftField),
            "CF" => Ok(Position::CenterField),
            "RF" => Ok(Position::RightField),
            "OF" => Ok(Position::OutField),
            "DH" => Ok(Position::DesignatedHitter),
            "P" => Ok(Position::Pitcher),
            "SP" => Ok(Position::StartingPitcher),
            "RP" => Ok(Position::ReliefPitcher),
            "CL" => Ok(Position::Closer),
            _ => Err(CodeError::new("position", s)),
        }
    }

    /// The canonical code for this position.
    pub fn code(&self) -> &'static str {
        match self {
            Position::Catcher => "C",
            Position::FirstBase => "1B",
            Position::SecondBase => "2B",
            Position::ThirdBase => "3B",
            Position::ShortStop => "SS",
            Position::LeftField => "LF",
            Position::CenterField => "CF",
            Position::RightField => "RF",
            Position::OutField => "OF",
            Position::DesignatedHitter => "DH",
            Position::Pitcher => "P",
            Position::StartingPitcher => "SP",
            Position::ReliefPitcher => "RP",
            Position::Closer => "CL",
        }
    }

    /// Whether this is a pitching position.
    pub fn is_pitcher(&self) -> bool {
        matches!(
            self,
            Position::Pitcher
                | Position::StartingPitcher
                | Position::ReliefPitcher
                | Position::Closer
        )
    }

    /// Whether this is an outfield position (generic or specific).
    pub fn is_outfield(&self) -> bool {
        matches!(
            self,
            Position::LeftField | Position::CenterField | Position::RightField | Position::OutField
        )
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A roster slot designation. Rosters are built from a fixed quota of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotPosition {
    Catcher,
    FirstBase,
    SecondBase,
    ThirdBase,
    ShortStop,
    OutField,
    DesignatedHitter,
    StartingPitcher,
    ReliefPitcher,
    Closer,
    Bench,
}

impl SlotPosition {
    /// Parse a slot code. Case-insensitive.
    pub fn parse(s: &str) -> Result<Self, CodeError> {
        match s.to_uppercase().as_str() {
            "C" => Ok(SlotPosition::Catcher),
            "1B" => Ok(SlotPosition::FirstBase),
            "2B" => Ok(SlotPosition::SecondBase),
            "3B" => Ok(SlotPosition::ThirdBase),
            "SS" => Ok(SlotPosition::ShortStop),
            "OF" => Ok(SlotPosition::OutField),
            "DH" => Ok(SlotPosition::DesignatedHitter),
            "SP" => Ok(SlotPosition::StartingPitcher),
            "RP" => Ok(SlotPosition::ReliefPitcher),
            "CL" => Ok(SlotPosition::Closer),
            "BE" | "BN" => Ok(SlotPosition::Bench),
            _ => Err(CodeError::new("slot", s)),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SlotPosition::Catcher => "C",
            SlotPosition::FirstBase => "1B",
            SlotPosition::SecondBase => "2B",
            SlotPosition::ThirdBase => "3B",
            SlotPosition::ShortStop => "SS",
            SlotPosition::OutField => "OF",
            SlotPosition::DesignatedHitter => "DH",
            SlotPosition::StartingPitcher => "SP",
            SlotPosition::ReliefPitcher => "RP",
            SlotPosition::Closer => "CL",
            SlotPosition::Bench => "BE",
        }
    }

    /// Whether this slot holds a pitcher.
    pub fn is_pitching(&self) -> bool {
        matches!(
            self,
            SlotPosition::StartingPitcher | SlotPosition::ReliefPitcher | SlotPosition::Closer
        )
    }

    /// Whether this slot holds a position player. Bench follows the
    /// position-player rules.
    pub fn is_hitting(&self) -> bool {
        !self.is_pitching()
    }

    /// Deterministic ordering index for roster slot layout. Starting
    /// positions come first, bench last. The closer slot sits ahead of the
    /// generic relief slots so a closer-eligible arm lands in the dedicated
    /// slot before spilling into general relief.
    pub fn sort_order(&self) -> u8 {
        match self {
            SlotPosition::Catcher => 0,
            SlotPosition::FirstBase => 1,
            SlotPosition::SecondBase => 2,
            SlotPosition::ThirdBase => 3,
            SlotPosition::ShortStop => 4,
            SlotPosition::OutField => 5,
            SlotPosition::DesignatedHitter => 6,
            SlotPosition::StartingPitcher => 7,
            SlotPosition::Closer => 8,
            SlotPosition::ReliefPitcher => 9,
            SlotPosition::Bench => 10,
        }
    }

    /// All slot positions in layout order.
    pub fn all() -> &'static [SlotPosition] {
        &[
            SlotPosition::Catcher,
            SlotPosition::FirstBase,
            SlotPosition::SecondBase,
            SlotPosition::ThirdBase,
            SlotPosition::ShortStop,
            SlotPosition::OutField,
            SlotPosition::DesignatedHitter,
            SlotPosition::StartingPitcher,
            SlotPosition::Closer,
            SlotPosition::ReliefPitcher,
            SlotPosition::Bench,
        ]
    }
}

impl fmt::Display for SlotPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Batting handedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
    Switch,
}

impl Handedness {
    /// Parse a handedness code. Historical data uses "B" (both) for
    /// switch-hitters; "S" is accepted as a synonym.
    pub fn parse(s: &str) -> Result<Self, CodeError> {
        match s.to_uppercase().as_str() {
            "L" => Ok(Handedness::Left),
            "R" => Ok(Handedness::Right),
            "S" | "B" => Ok(Handedness::Switch),
            _ => Err(CodeError::new("handedness", s)),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Handedness::Left => "L",
            Handedness::Right => "R",
            Handedness::Switch => "S",
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_standard_positions() {
        assert_eq!(Position::parse("C"), Ok(Position::Catcher));
        assert_eq!(Position::parse("SS"), Ok(Position::ShortStop));
        assert_eq!(Position::parse("OF"), Ok(Position::OutField));
        assert_eq!(Position::parse("SP"), Ok(Position::StartingPitcher));
        assert_eq!(Position::parse("CL"), Ok(Position::Closer));
    }

    #[test]
    fn parse_case_insensitive() {
        assert_eq!(Position::parse("ss"), Ok(Position::ShortStop));
        assert_eq!(Position::parse("cf"), Ok(Position::CenterField));
        assert_eq!(SlotPosition::parse("be"), Ok(SlotPosition::Bench));
        assert_eq!(Handedness::parse("l"), Ok(Handedness::Left));
    }

    #[test]
    fn parse_rejects_unknown_codes() {
        let err = Position::parse("4B").unwrap_err();
        assert_eq!(err.kind, "position");
        assert_eq!(err.code, "4B");
        assert!(Position::parse("").is_err());
        assert!(SlotPosition::parse("UTIL").is_err());
        assert!(Handedness::parse("X").is_err());
    }

    #[test]
    fn position_code_roundtrip() {
        let all = [
            Position::Catcher,
            Position::FirstBase,
            Position::SecondBase,
            Position::ThirdBase,
            Position::ShortStop,
            Position::LeftField,
            Position::CenterField,
            Position::RightField,
            Position::OutField,
            Position::DesignatedHitter,
            Position::Pitcher,
            Position::StartingPitcher,
            Position::ReliefPitcher,
            Position::Closer,
        ];
        for pos in all {
            assert_eq!(Position::parse(pos.code()), Ok(pos), "roundtrip {pos}");
        }
    }

    #[test]
    fn slot_code_roundtrip() {
        for &slot in SlotPosition::all() {
            assert_eq!(SlotPosition::parse(slot.code()), Ok(slot), "roundtrip {slot}");
        }
    }

    #[test]
    fn handedness_switch_synonyms() {
        assert_eq!(Handedness::parse("B"), Ok(Handedness::Switch));
        assert_eq!(Handedness::parse("S"), Ok(Handedness::Switch));
    }

    #[test]
    fn is_pitcher_covers_all_pitching_codes() {
        assert!(Position::Pitcher.is_pitcher());
        assert!(Position::StartingPitcher.is_pitcher());
        assert!(Position::ReliefPitcher.is_pitcher());
        assert!(Position::Closer.is_pitcher());
        assert!(!Position::Catcher.is_pitcher());
        assert!(!Position::DesignatedHitter.is_pitcher());
    }

    #[test]
    fn slot_categories() {
        assert!(SlotPosition::StartingPitcher.is_pitching());
        assert!(SlotPosition::Closer.is_pitching());
        assert!(SlotPosition::Bench.is_hitting());
        assert!(SlotPosition::DesignatedHitter.is_hitting());
        assert!(!SlotPosition::Catcher.is_pitching());
    }

    #[test]
    fn bench_sorts_last() {
        let mut slots = SlotPosition::all().to_vec();
        slots.sort_by_key(|s| s.sort_order());
        assert_eq!(slots.first(), Some(&SlotPosition::Catcher));
        assert_eq!(slots.last(), Some(&SlotPosition::Bench));
    }
}
