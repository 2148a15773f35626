// Scales and Keys - Scale families, key identity and quality tables
// Every chord derivation starts from a KeyInfo

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::notes::NOTE_NAMES;

/// Error parsing a key name such as "A Harmonic Minor"
#[derive(Debug, Error, PartialEq)]
pub enum KeyParseError {
    #[error("Unknown note name: {0}")]
    UnknownNote(String),

    #[error("Unknown scale: {0}")]
    UnknownScale(String),
}

/// Scale family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleKind {
    Major,
    NaturalMinor,
    HarmonicMinor,
    MelodicMinor,
}

impl ScaleKind {
    /// Semitone offsets of the seven degrees from the tonic
    pub fn intervals(&self) -> [i32; 7] {
        match self {
            ScaleKind::Major => [0, 2, 4, 5, 7, 9, 11],
            ScaleKind::NaturalMinor => [0, 2, 3, 5, 7, 8, 10],
            ScaleKind::HarmonicMinor => [0, 2, 3, 5, 7, 8, 11],
            ScaleKind::MelodicMinor => [0, 2, 3, 5, 7, 9, 11],
        }
    }

    /// Triad quality suffix per degree
    pub fn triad_suffixes(&self) -> [&'static str; 7] {
        match self {
            ScaleKind::Major => ["", "m", "m", "", "", "m", "dim"],
            ScaleKind::NaturalMinor => ["m", "dim", "", "m", "m", "", ""],
            ScaleKind::HarmonicMinor => ["m", "dim", "aug", "m", "", "", "dim"],
            ScaleKind::MelodicMinor => ["m", "m", "aug", "", "", "dim", "dim"],
        }
    }

    /// Seventh chord quality suffix per degree
    pub fn seventh_suffixes(&self) -> [&'static str; 7] {
        match self {
            ScaleKind::Major => ["M7", "m7", "m7", "M7", "7", "m7", "m7b5"],
            ScaleKind::NaturalMinor => ["m7", "m7b5", "M7", "m7", "m7", "M7", "7"],
            ScaleKind::HarmonicMinor => ["mM7", "m7b5", "M7#5", "m7", "7", "M7", "dim7"],
            ScaleKind::MelodicMinor => ["mM7", "m7", "M7#5", "7", "7", "m7b5", "m7b5"],
        }
    }

    /// Safe 9th/11th tension per degree; the three minor scales share one table
    pub fn tension_suffixes(&self) -> &'static [&'static str] {
        match self {
            ScaleKind::Major => &["M9", "m9", "m11", "M9", "9", "m9", "m7b5(11)"],
            _ => &["m9", "m7b5(11)", "M9", "m9", "m11", "M9", "9"],
        }
    }

    pub fn is_minor(&self) -> bool {
        !matches!(self, ScaleKind::Major)
    }

    /// Display name
    pub fn label(&self) -> &'static str {
        match self {
            ScaleKind::Major => "Major",
            ScaleKind::NaturalMinor => "Natural Minor",
            ScaleKind::HarmonicMinor => "Harmonic Minor",
            ScaleKind::MelodicMinor => "Melodic Minor",
        }
    }

    /// Parse a scale name; "minor" alone means natural minor
    pub fn from_string(s: &str) -> Option<Self> {
        let normalized: String = s
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        match normalized.as_str() {
            "major" | "maj" | "ionian" => Some(ScaleKind::Major),
            "minor" | "min" | "naturalminor" | "aeolian" => Some(ScaleKind::NaturalMinor),
            "harmonicminor" | "harmonic" => Some(ScaleKind::HarmonicMinor),
            "melodicminor" | "melodic" => Some(ScaleKind::MelodicMinor),
            _ => None,
        }
    }
}

/// A tonic pitch class and a scale family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    /// Tonic pitch class (0 = C)
    pub root: u8,
    pub scale: ScaleKind,
}

impl KeyInfo {
    pub fn new(root: u8, scale: ScaleKind) -> Self {
        KeyInfo {
            root: root % 12,
            scale,
        }
    }

    /// Same tonic under a different scale
    pub fn with_scale(&self, scale: ScaleKind) -> Self {
        KeyInfo::new(self.root, scale)
    }

    /// Pitch classes of the seven degrees, in degree order
    pub fn pitch_classes(&self) -> [i32; 7] {
        let mut pcs = self.scale.intervals();
        for pc in pcs.iter_mut() {
            *pc = (*pc + self.root as i32).rem_euclid(12);
        }
        pcs
    }

    /// Zero-based scale degree of a pitch, if it is in the scale
    pub fn degree_of(&self, pitch: i32) -> Option<usize> {
        let pc = pitch.rem_euclid(12);
        self.pitch_classes().iter().position(|&p| p == pc)
    }

    pub fn root_name(&self) -> &'static str {
        NOTE_NAMES[self.root as usize % 12]
    }
}

impl fmt::Display for KeyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.root_name(), self.scale.label())
    }
}

impl FromStr for KeyInfo {
    type Err = KeyParseError;

    /// Accepts "C Major", "A minor", "F# Harmonic Minor", "Bb Melodic Minor"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (note, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((note, rest)) => (note, rest.trim()),
            None => (trimmed, "Major"),
        };

        let root = parse_note_name(note).ok_or_else(|| KeyParseError::UnknownNote(note.to_string()))?;
        let scale = ScaleKind::from_string(rest)
            .ok_or_else(|| KeyParseError::UnknownScale(rest.to_string()))?;

        Ok(KeyInfo::new(root, scale))
    }
}

/// Parse a note name with an optional sharp or flat into a pitch class
pub fn parse_note_name(name: &str) -> Option<u8> {
    let mut chars = name.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let base: i32 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let mut offset = 0;
    for c in chars {
        match c {
            '#' | '♯' => offset += 1,
            'b' | '♭' => offset -= 1,
            _ => return None,
        }
    }

    Some((base + offset).rem_euclid(12) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_classes_a_harmonic_minor() {
        let key = KeyInfo::new(9, ScaleKind::HarmonicMinor);
        assert_eq!(key.pitch_classes(), [9, 11, 0, 2, 4, 5, 8]);
        assert_eq!(key.degree_of(56), Some(6));
        assert_eq!(key.degree_of(55), None);
    }

    #[test]
    fn test_parse_keys() {
        assert_eq!("C Major".parse::<KeyInfo>().unwrap(), KeyInfo::new(0, ScaleKind::Major));
        assert_eq!("A minor".parse::<KeyInfo>().unwrap(), KeyInfo::new(9, ScaleKind::NaturalMinor));
        assert_eq!(
            "F# Harmonic Minor".parse::<KeyInfo>().unwrap(),
            KeyInfo::new(6, ScaleKind::HarmonicMinor)
        );
        assert_eq!("Bb".parse::<KeyInfo>().unwrap(), KeyInfo::new(10, ScaleKind::Major));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!("H Major".parse::<KeyInfo>(), Err(KeyParseError::UnknownNote(_))));
        assert!(matches!("C Lydian".parse::<KeyInfo>(), Err(KeyParseError::UnknownScale(_))));
    }

    #[test]
    fn test_display() {
        assert_eq!(KeyInfo::new(9, ScaleKind::NaturalMinor).to_string(), "A Natural Minor");
    }

    #[test]
    fn test_tension_table_shared_by_minor_scales() {
        assert_eq!(
            ScaleKind::HarmonicMinor.tension_suffixes(),
            ScaleKind::NaturalMinor.tension_suffixes()
        );
        assert_eq!(ScaleKind::Major.tension_suffixes()[4], "9");
    }
}
