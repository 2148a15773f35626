// Chord Type Detection - Recognize chord quality from pitch-class offsets
// Drives extended-step patterns that walk up a chord through cyclic intervals

use std::collections::BTreeSet;
use serde::{Deserialize, Serialize};

/// Chord qualities known to extended-step playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordType {
    Major,
    Minor,
    Diminished,
    Augmented,
    Major7,
    Minor7,
    Dominant7,
    HalfDiminished7,
    Diminished7,
    MinorMajor7,
    AugmentedMajor7,
    Major9,
    Minor9,
    Dominant9,
    Dominant7Flat9,
    Minor11,
    HalfDiminished11,
    Major7Eleven,
    Major7SharpEleven,
}

/// Detection order: five-note chords, then sevenths, then triads
const DETECTION_ORDER: [ChordType; 19] = [
    ChordType::Major9,
    ChordType::Minor9,
    ChordType::Dominant9,
    ChordType::Dominant7Flat9,
    ChordType::Minor11,
    ChordType::HalfDiminished11,
    ChordType::Major7Eleven,
    ChordType::Major7SharpEleven,
    ChordType::Major7,
    ChordType::Minor7,
    ChordType::Dominant7,
    ChordType::HalfDiminished7,
    ChordType::Diminished7,
    ChordType::MinorMajor7,
    ChordType::AugmentedMajor7,
    ChordType::Major,
    ChordType::Minor,
    ChordType::Diminished,
    ChordType::Augmented,
];

impl ChordType {
    /// Pitch classes relative to the root
    pub fn signature(&self) -> &'static [i32] {
        match self {
            ChordType::Major => &[0, 4, 7],
            ChordType::Minor => &[0, 3, 7],
            ChordType::Diminished => &[0, 3, 6],
            ChordType::Augmented => &[0, 4, 8],
            ChordType::Major7 => &[0, 4, 7, 11],
            ChordType::Minor7 => &[0, 3, 7, 10],
            ChordType::Dominant7 => &[0, 4, 7, 10],
            ChordType::HalfDiminished7 => &[0, 3, 6, 10],
            ChordType::Diminished7 => &[0, 3, 6, 9],
            ChordType::MinorMajor7 => &[0, 3, 7, 11],
            ChordType::AugmentedMajor7 => &[0, 4, 8, 11],
            ChordType::Major9 => &[0, 2, 4, 7, 11],
            ChordType::Minor9 => &[0, 2, 3, 7, 10],
            ChordType::Dominant9 => &[0, 2, 4, 7, 10],
            ChordType::Dominant7Flat9 => &[0, 1, 4, 7, 10],
            ChordType::Minor11 => &[0, 3, 5, 7, 10],
            ChordType::HalfDiminished11 => &[0, 3, 5, 6, 10],
            ChordType::Major7Eleven => &[0, 4, 5, 7, 11],
            ChordType::Major7SharpEleven => &[0, 4, 6, 7, 11],
        }
    }

    /// Intervals walked by successive steps; each cycle sums to an octave
    ///
    /// Ninth chords close the cycle with -2, elevenths with -5.
    pub fn step_cycle(&self) -> &'static [i32] {
        match self {
            ChordType::Major => &[4, 3, 5],
            ChordType::Minor => &[3, 4, 5],
            ChordType::Diminished => &[3, 3, 6],
            ChordType::Augmented => &[4, 4, 4],
            ChordType::Major7 => &[4, 3, 4, 1],
            ChordType::Minor7 => &[3, 4, 3, 2],
            ChordType::Dominant7 => &[4, 3, 3, 2],
            ChordType::HalfDiminished7 => &[3, 3, 4, 2],
            ChordType::Diminished7 => &[3, 3, 3, 3],
            ChordType::MinorMajor7 => &[3, 4, 4, 1],
            ChordType::AugmentedMajor7 => &[4, 4, 3, 1],
            ChordType::Major9 => &[4, 3, 4, 3, -2],
            ChordType::Minor9 => &[3, 4, 3, 4, -2],
            ChordType::Dominant9 => &[4, 3, 3, 4, -2],
            ChordType::Dominant7Flat9 => &[4, 3, 3, 3, -1],
            ChordType::Minor11 => &[3, 4, 3, 7, -5],
            ChordType::HalfDiminished11 => &[3, 3, 4, 7, -5],
            ChordType::Major7Eleven => &[4, 3, 4, 6, -5],
            ChordType::Major7SharpEleven => &[4, 3, 4, 7, -6],
        }
    }

    /// Detect the chord type of `pitches` built on `root`; major when unknown
    pub fn detect(root: i32, pitches: &[i32]) -> ChordType {
        let offsets: BTreeSet<i32> = pitches.iter().map(|p| (p - root).rem_euclid(12)).collect();

        DETECTION_ORDER
            .iter()
            .copied()
            .find(|ty| {
                let signature: BTreeSet<i32> = ty.signature().iter().copied().collect();
                signature == offsets
            })
            .unwrap_or(ChordType::Major)
    }
}

/// Pitch of extended step `step` over `root`
///
/// Step 0 is one octave above the root; each further step adds the next
/// interval of the chord type's cycle. Negative steps walk downward.
pub fn extended_pitch(root: i32, step: i32, chord_type: ChordType) -> i32 {
    let cycle = chord_type.step_cycle();
    let len = cycle.len() as i32;
    let octaves = step.div_euclid(len);
    let partial: i32 = cycle[..step.rem_euclid(len) as usize].iter().sum();

    root + 12 + octaves * 12 + partial
}
