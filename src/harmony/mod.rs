// Harmony - Key, chord derivation, voice leading and the per-beat timeline
// Turns an analyzed bass line into voiced chord events

pub mod scale;
pub mod key;
pub mod chords;
pub mod strategies;
pub mod voicing;
pub mod timeline;
pub mod overrides;

pub use scale::{KeyInfo, KeyParseError, ScaleKind};
pub use key::estimate_key;
pub use chords::{ChordDegreeSpec, ChordDeriver, ChordMode, TriadQuality, chord_intervals};
pub use strategies::{ChordRegistry, ChordStrategy, builtin_chords};
pub use voicing::{VoiceLeader, best_voicing, centroid};
pub use timeline::{BeatGroup, ChordEvent, ChordSource, HarmonyTimeline, group_by_beat, merge_events, select_dominant_root};
pub use overrides::{FilenameOverrides, HarmonyOverride, OverrideHook, SourceFeatures};
