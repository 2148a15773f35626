// Chord Derivation - Diatonic triads, sevenths and tension chords per key
// Resolves scale degrees to concrete pitches and builds per-degree chord specs

use serde::{Deserialize, Serialize};
use crate::notes::pitch_class_name;
use super::scale::{KeyInfo, ScaleKind};

const DEFAULT_TRIAD: &[i32] = &[0, 4, 7];
const DEFAULT_SEVENTH: &[i32] = &[0, 4, 7, 10];
const DEFAULT_TENSION: &[i32] = &[0, 4, 7, 10, 14];

/// Tension suffix used once a degree table runs out
const FALLBACK_TENSION: &str = "9";

/// Semitone offsets for a chord quality suffix
pub fn chord_intervals(suffix: &str) -> Option<&'static [i32]> {
    let intervals: &'static [i32] = match suffix {
        // Triads
        "" => &[0, 4, 7],
        "m" => &[0, 3, 7],
        "dim" => &[0, 3, 6],
        "aug" => &[0, 4, 8],

        // Sevenths
        "M7" => &[0, 4, 7, 11],
        "m7" => &[0, 3, 7, 10],
        "7" => &[0, 4, 7, 10],
        "m7b5" => &[0, 3, 6, 10],
        "dim7" => &[0, 3, 6, 9],
        "mM7" => &[0, 3, 7, 11],
        "M7#5" => &[0, 4, 8, 11],

        // Tensions
        "M9" => &[0, 4, 7, 11, 14],
        "m9" => &[0, 3, 7, 10, 14],
        "9" => &[0, 4, 7, 10, 14],
        "7(b9)" => &[0, 4, 7, 10, 13],
        "m11" | "m7(11)" => &[0, 3, 7, 10, 17],
        "M7(11)" => &[0, 4, 7, 11, 17],
        "m7b5(11)" => &[0, 3, 6, 10, 17],
        "M7(#11)" => &[0, 4, 7, 11, 18],
        _ => return None,
    };
    Some(intervals)
}

/// Which family of chords a scale expansion produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordMode {
    /// Diatonic triads of the key's scale
    Triad,

    /// Diatonic sevenths of the key's scale
    Seventh,

    /// Sevenths with the scale pinned to harmonic minor
    HarmonicMinor,

    /// Sevenths with the scale pinned to melodic minor
    MelodicMinor,

    /// 9th and 11th chords from the safe-tension table
    Tension,
}

impl ChordMode {
    pub const ALL: [ChordMode; 5] = [
        ChordMode::Triad,
        ChordMode::Seventh,
        ChordMode::HarmonicMinor,
        ChordMode::MelodicMinor,
        ChordMode::Tension,
    ];

    /// Scale actually used for a key under this mode
    pub fn scale_for(&self, key: &KeyInfo) -> ScaleKind {
        match self {
            ChordMode::HarmonicMinor => ScaleKind::HarmonicMinor,
            ChordMode::MelodicMinor => ScaleKind::MelodicMinor,
            _ => key.scale,
        }
    }

    /// Quality suffix for a zero-based degree
    pub fn suffix(&self, scale: ScaleKind, degree: usize) -> &'static str {
        match self {
            ChordMode::Triad => scale.triad_suffixes().get(degree).copied().unwrap_or(""),
            ChordMode::Seventh | ChordMode::HarmonicMinor | ChordMode::MelodicMinor => {
                scale.seventh_suffixes().get(degree).copied().unwrap_or("7")
            }
            ChordMode::Tension => scale
                .tension_suffixes()
                .get(degree)
                .copied()
                .unwrap_or(FALLBACK_TENSION),
        }
    }

    /// Interval set used when a suffix has no entry
    pub fn default_intervals(&self) -> &'static [i32] {
        match self {
            ChordMode::Triad => DEFAULT_TRIAD,
            ChordMode::Tension => DEFAULT_TENSION,
            _ => DEFAULT_SEVENTH,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChordMode::Triad => "Triad",
            ChordMode::Seventh => "7th",
            ChordMode::HarmonicMinor => "HarmonicMinor",
            ChordMode::MelodicMinor => "MelodicMinor",
            ChordMode::Tension => "Tension",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "triad" => Some(ChordMode::Triad),
            "7th" | "seventh" => Some(ChordMode::Seventh),
            "harmonic_minor" | "harmonicminor" => Some(ChordMode::HarmonicMinor),
            "melodic_minor" | "melodicminor" => Some(ChordMode::MelodicMinor),
            "tension" => Some(ChordMode::Tension),
            _ => None,
        }
    }
}

/// Triad quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriadQuality {
    Major,
    Minor,
    Diminished,
    Augmented,
}

impl TriadQuality {
    /// Quality from a third and fifth above the root (semitones)
    pub fn from_intervals(third: i32, fifth: i32) -> Option<Self> {
        match (third, fifth) {
            (4, 7) => Some(TriadQuality::Major),
            (3, 7) => Some(TriadQuality::Minor),
            (3, 6) => Some(TriadQuality::Diminished),
            (4, 8) => Some(TriadQuality::Augmented),
            _ => None,
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "" => Some(TriadQuality::Major),
            "m" => Some(TriadQuality::Minor),
            "dim" => Some(TriadQuality::Diminished),
            "aug" => Some(TriadQuality::Augmented),
            _ => None,
        }
    }
}

/// One chord of a scale expansion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordDegreeSpec {
    /// Scale degree, 1-based
    pub degree: usize,

    /// Semitones from the key root to the chord root
    pub root_offset: i32,

    /// Root name plus quality suffix, e.g. "Dm7"
    pub name: String,

    /// Quality suffix on its own
    pub suffix: String,

    /// Semitone offsets from the chord root (3 to 5 tones)
    pub intervals: Vec<i32>,

    pub mode: ChordMode,
}

impl ChordDegreeSpec {
    /// Chord tones for a root placed one octave above `root_pitch`
    pub fn pitches(&self, root_pitch: i32) -> Vec<i32> {
        self.intervals.iter().map(|i| root_pitch + 12 + i).collect()
    }

    pub fn tone_count(&self) -> usize {
        self.intervals.len()
    }
}

/// Derives diatonic chords from a key
#[derive(Debug, Clone, Copy)]
pub struct ChordDeriver {
    key: KeyInfo,
}

impl ChordDeriver {
    pub fn new(key: KeyInfo) -> Self {
        ChordDeriver { key }
    }

    /// Deriver whose scale is pinned regardless of the key's own scale
    pub fn pinned(key: KeyInfo, scale: ScaleKind) -> Self {
        ChordDeriver {
            key: key.with_scale(scale),
        }
    }

    pub fn key(&self) -> KeyInfo {
        self.key
    }

    /// Diatonic triad one octave above `root_pitch`
    ///
    /// Algorithm:
    /// 1. Find the root's scale degree; off-scale roots get a major triad
    /// 2. Take the third and fifth pitch classes from the scale
    /// 3. Search upward from +3 (third) and +6 (fifth) for those classes
    /// 4. Keep the voicing closed and ascending
    pub fn triad(&self, root_pitch: i32) -> Vec<i32> {
        let base = root_pitch + 12;
        match self.stack(base) {
            Some((third, fifth, _)) => vec![base, third, fifth],
            None => DEFAULT_TRIAD.iter().map(|i| base + i).collect(),
        }
    }

    /// Diatonic seventh one octave above `root_pitch`
    pub fn seventh(&self, root_pitch: i32) -> Vec<i32> {
        let base = root_pitch + 12;
        match self.stack(base) {
            Some((third, fifth, seventh)) => vec![base, third, fifth, seventh],
            None => DEFAULT_SEVENTH.iter().map(|i| base + i).collect(),
        }
    }

    /// Quality of the triad built on `root_pitch`, None for off-scale roots
    pub fn triad_quality(&self, root_pitch: i32) -> Option<TriadQuality> {
        self.key.degree_of(root_pitch)?;
        let triad = self.triad(root_pitch);
        TriadQuality::from_intervals(triad[1] - triad[0], triad[2] - triad[0])
    }

    /// The seven chord specs of the key under a mode
    pub fn degree_specs(&self, mode: ChordMode) -> Vec<ChordDegreeSpec> {
        let scale = mode.scale_for(&self.key);
        scale
            .intervals()
            .iter()
            .enumerate()
            .map(|(degree, &offset)| {
                let suffix = mode.suffix(scale, degree);
                let intervals = match chord_intervals(suffix) {
                    Some(intervals) => intervals,
                    None => {
                        log::warn!("No interval set for chord quality '{}', using default", suffix);
                        mode.default_intervals()
                    }
                };
                let root_pc = self.key.root as i32 + offset;

                ChordDegreeSpec {
                    degree: degree + 1,
                    root_offset: offset,
                    name: format!("{}{}", pitch_class_name(root_pc), suffix),
                    suffix: suffix.to_string(),
                    intervals: intervals.to_vec(),
                    mode,
                }
            })
            .collect()
    }

    /// Third, fifth and seventh above `base`, or None when off-scale
    fn stack(&self, base: i32) -> Option<(i32, i32, i32)> {
        let degree = self.key.degree_of(base)?;
        let pcs = self.key.pitch_classes();

        let mut third = search_up(base + 3, pcs[(degree + 2) % 7]);
        let mut fifth = search_up(base + 6, pcs[(degree + 4) % 7]);
        if third < base {
            third += 12;
        }
        if fifth < third {
            fifth += 12;
        }
        let seventh = search_up(fifth + 2, pcs[(degree + 6) % 7]);

        Some((third, fifth, seventh))
    }
}

/// First pitch at or above `from` with pitch class `pc`
fn search_up(from: i32, pc: i32) -> i32 {
    (0..12)
        .map(|k| from + k)
        .find(|p| p.rem_euclid(12) == pc)
        .unwrap_or(from)
}
