//! Camelot wheel key notation and harmonic compatibility
//!
//! The Camelot wheel maps musical keys onto 12 positions with a major/minor
//! distinction ('B' suffix = major, 'A' suffix = minor). Adjacent positions
//! are a perfect fifth apart; the same position in the opposite mode is the
//! relative major/minor. Those one-step moves are the classic "safe" mixes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Major/minor mode on the wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// 'A' suffix
    Minor,
    /// 'B' suffix
    Major,
}

/// A key in Camelot notation, e.g. "8A" (A minor) or "12B" (E major)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CamelotKey {
    number: u8,
    mode: Mode,
}

impl CamelotKey {
    /// Construct from wheel position (1..=12) and mode
    pub fn new(number: u8, mode: Mode) -> Option<Self> {
        if (1..=12).contains(&number) {
            Some(Self { number, mode })
        } else {
            None
        }
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether mixing from `self` into `other` is harmonically safe
    ///
    /// Safe moves: same key, one step around the wheel in the same mode
    /// (wrapping 12 -> 1), or the same position in the opposite mode.
    pub fn is_compatible(&self, other: &CamelotKey) -> bool {
        if self.mode == other.mode {
            let up = if self.number == 12 { 1 } else { self.number + 1 };
            let down = if self.number == 1 { 12 } else { self.number - 1 };
            other.number == self.number || other.number == up || other.number == down
        } else {
            other.number == self.number
        }
    }
}

impl FromStr for CamelotKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() < 2 {
            return Err(format!("Invalid Camelot key: {s:?}"));
        }
        let (num_part, mode_part) = s.split_at(s.len() - 1);
        let number: u8 = num_part
            .parse()
            .map_err(|_| format!("Invalid Camelot key: {s:?}"))?;
        let mode = match mode_part {
            "A" | "a" => Mode::Minor,
            "B" | "b" => Mode::Major,
            _ => return Err(format!("Invalid Camelot key: {s:?}")),
        };
        CamelotKey::new(number, mode).ok_or_else(|| format!("Invalid Camelot key: {s:?}"))
    }
}

impl fmt::Display for CamelotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self.mode {
            Mode::Minor => 'A',
            Mode::Major => 'B',
        };
        write!(f, "{}{}", self.number, letter)
    }
}

impl Serialize for CamelotKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CamelotKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> CamelotKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(key("8A").to_string(), "8A");
        assert_eq!(key("12b").to_string(), "12B");
        assert_eq!(key(" 1A ").number(), 1);
        assert!("0A".parse::<CamelotKey>().is_err());
        assert!("13B".parse::<CamelotKey>().is_err());
        assert!("8C".parse::<CamelotKey>().is_err());
        assert!("A".parse::<CamelotKey>().is_err());
    }

    #[test]
    fn test_same_key_compatible() {
        assert!(key("8A").is_compatible(&key("8A")));
    }

    #[test]
    fn test_adjacent_numbers_compatible() {
        assert!(key("8A").is_compatible(&key("7A")));
        assert!(key("8A").is_compatible(&key("9A")));
        assert!(!key("8A").is_compatible(&key("10A")));
    }

    #[test]
    fn test_wheel_wraps() {
        assert!(key("12A").is_compatible(&key("1A")));
        assert!(key("1B").is_compatible(&key("12B")));
    }

    #[test]
    fn test_relative_mode_compatible() {
        // Relative major/minor: same number, opposite letter
        assert!(key("8A").is_compatible(&key("8B")));
        // One step AND a mode change is not a one-step move
        assert!(!key("8A").is_compatible(&key("9B")));
    }

    #[test]
    fn test_serde_round_trip() {
        let k = key("11B");
        let json = serde_json::to_string(&k).unwrap();
        assert_eq!(json, "\"11B\"");
        let back: CamelotKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, k);
    }
}
