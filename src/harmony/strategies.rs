// Chord Strategies - Named ways of turning a bass root into a chord
// Registered by name so callers can pick them from settings or presets

use crate::registry::Registry;
use super::chords::ChordDeriver;
use super::scale::KeyInfo;

/// Turns a root pitch into chord tones
pub trait ChordStrategy: Send + Sync {
    /// Chord tones for a root, placed one octave above it
    fn apply(&self, root_pitch: i32, key: &KeyInfo) -> Vec<i32>;

    /// Number of tones this strategy produces
    fn tone_count(&self) -> usize {
        3
    }
}

pub type ChordRegistry = Registry<dyn ChordStrategy>;

/// Major triad on every root
pub struct MajorTriad;

impl ChordStrategy for MajorTriad {
    fn apply(&self, root_pitch: i32, _key: &KeyInfo) -> Vec<i32> {
        let base = root_pitch + 12;
        vec![base, base + 4, base + 7]
    }
}

/// Root, fifth and the tenth above
pub struct OpenMajor;

impl ChordStrategy for OpenMajor {
    fn apply(&self, root_pitch: i32, _key: &KeyInfo) -> Vec<i32> {
        let base = root_pitch + 12;
        vec![base, base + 7, base + 16]
    }
}

/// Closed diatonic triad
pub struct Diatonic;

impl ChordStrategy for Diatonic {
    fn apply(&self, root_pitch: i32, key: &KeyInfo) -> Vec<i32> {
        ChordDeriver::new(*key).triad(root_pitch)
    }
}

/// Diatonic triad spread: root, fifth, third an octave up
pub struct OpenDiatonic;

impl ChordStrategy for OpenDiatonic {
    fn apply(&self, root_pitch: i32, key: &KeyInfo) -> Vec<i32> {
        match ChordDeriver::new(*key).triad(root_pitch).as_slice() {
            [root, third, fifth] => vec![*root, *fifth, third + 12],
            other => other.to_vec(),
        }
    }
}

/// Closed diatonic seventh
pub struct DiatonicSeventh;

impl ChordStrategy for DiatonicSeventh {
    fn apply(&self, root_pitch: i32, key: &KeyInfo) -> Vec<i32> {
        ChordDeriver::new(*key).seventh(root_pitch)
    }

    fn tone_count(&self) -> usize {
        4
    }
}

/// Registry with every built-in strategy
pub fn builtin_chords() -> ChordRegistry {
    let mut registry = ChordRegistry::new();
    registry.register("Maj", || Box::new(MajorTriad));
    registry.register("Maj_Open", || Box::new(OpenMajor));
    registry.register("Diatonic", || Box::new(Diatonic));
    registry.register("Diatonic_Open", || Box::new(OpenDiatonic));
    registry.register("Diatonic_7th", || Box::new(DiatonicSeventh));
    registry
}
