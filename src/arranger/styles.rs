// Playback Styles - Render chords into note streams
// Built-in pad, rhythm and arpeggio styles plus the Style trait they share

use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use crate::groove::{SubBeat, TempoMap};
use crate::notes::NoteEvent;
use super::sequencer::{clipped_note, for_each_step, resolve_index, scaled_velocity};

/// What a style is triggered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    /// Once per bass note inside each chord event
    BassNotes,

    /// Once per merged chord event
    MergedEvents,
}

/// Span a style renders over
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trigger {
    pub start: f64,
    pub end: f64,
    pub velocity: u8,

    /// Position of the triggering note
    pub sub_beat: SubBeat,

    /// Root of the chord being played
    pub root_pitch: i32,
}

impl Trigger {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Per-run rendering state
pub struct RenderContext<'a> {
    pub tempo: &'a TempoMap,

    /// Global velocity multiplier
    pub velocity_scale: f64,
    pub rng: &'a mut StdRng,
}

/// Renders one chord over one trigger span
pub trait Style: Send + Sync {
    fn apply(&self, chord: &[i32], trigger: &Trigger, ctx: &mut RenderContext<'_>) -> Vec<NoteEvent>;

    fn source(&self) -> TriggerSource {
        TriggerSource::BassNotes
    }

    /// Number of independent voices, None when the style adapts to any chord
    fn voice_count(&self) -> Option<usize> {
        None
    }

    /// Tag replacing "Bass" in output names and used for type filtering
    fn rename_tag(&self) -> Option<&str> {
        None
    }
}

/// Whole chord held for the full merged event
pub struct Pad;

impl Style for Pad {
    fn apply(&self, chord: &[i32], trigger: &Trigger, ctx: &mut RenderContext<'_>) -> Vec<NoteEvent> {
        let velocity = scaled_velocity(trigger.velocity, ctx.velocity_scale, 1.0);
        chord
            .iter()
            .filter_map(|&pitch| {
                clipped_note(pitch, trigger.start, trigger.duration(), trigger.end, velocity)
            })
            .collect()
    }

    fn source(&self) -> TriggerSource {
        TriggerSource::MergedEvents
    }
}

/// Block chords doubling accented bass notes
///
/// Bass notes softer than velocity 100 are not doubled. Short off-beat notes
/// (under 0.25 s) play only the two lowest chord tones.
pub struct Rhythm;

/// Bass velocity below which Rhythm stays silent
pub const RHYTHM_MIN_VELOCITY: u8 = 100;

impl Style for Rhythm {
    fn apply(&self, chord: &[i32], trigger: &Trigger, ctx: &mut RenderContext<'_>) -> Vec<NoteEvent> {
        if trigger.velocity < RHYTHM_MIN_VELOCITY {
            return Vec::new();
        }

        let mut tones = chord.to_vec();
        if trigger.duration() < 0.25 && trigger.sub_beat != SubBeat::Beat && tones.len() >= 3 {
            tones.sort_unstable();
            tones.truncate(2);
        }

        let velocity = scaled_velocity(trigger.velocity, ctx.velocity_scale, 1.0);
        tones
            .iter()
            .filter_map(|&pitch| {
                clipped_note(pitch, trigger.start, trigger.duration(), trigger.end, velocity)
            })
            .collect()
    }
}

/// Timing displacement applied to every arpeggio step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimingOffset {
    None,

    /// Uniform random lag in seconds, drawn per step
    RandomLag { min: f64, max: f64 },
}

/// Velocity shaping across the arpeggio
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VelocityCurve {
    /// Same multiplier on every step
    Flat(f64),

    /// Multiplier on one sixteenth position of each beat, 1.0 elsewhere
    Accent { position: i64, multiplier: f64 },
}

impl VelocityCurve {
    fn multiplier(&self, step_index: i64) -> f64 {
        match *self {
            VelocityCurve::Flat(multiplier) => multiplier,
            VelocityCurve::Accent { position, multiplier } => {
                if step_index.rem_euclid(4) == position {
                    multiplier
                } else {
                    1.0
                }
            }
        }
    }
}

/// Single-voice arpeggio over chord-tone indices
#[derive(Debug, Clone, PartialEq)]
pub struct ParametricArp {
    /// Chord-tone indices cycled per sixteenth step
    pub pattern: Vec<i32>,

    /// Note length as a multiple of the step
    pub gate: f64,
    pub offset: TimingOffset,
    pub velocity: VelocityCurve,
}

impl ParametricArp {
    /// Ascending root-third-fifth, legato
    pub fn up() -> Self {
        ParametricArp {
            pattern: vec![0, 1, 2],
            gate: 1.0,
            offset: TimingOffset::None,
            velocity: VelocityCurve::Flat(1.0),
        }
    }

    /// Eight-step gated figure with an accent on the third sixteenth
    pub fn trance() -> Self {
        ParametricArp {
            pattern: vec![0, 1, 2, 1, 0, 1, 2, 3],
            gate: 0.6,
            offset: TimingOffset::None,
            velocity: VelocityCurve::Accent {
                position: 2,
                multiplier: 1.2,
            },
        }
    }

    /// Soft, late and slightly detached
    pub fn lofi() -> Self {
        ParametricArp {
            pattern: vec![0, 2, 3, 1],
            gate: 0.95,
            offset: TimingOffset::RandomLag {
                min: 0.03,
                max: 0.05,
            },
            velocity: VelocityCurve::Flat(0.7),
        }
    }

    /// Overlapping tones that ring into each other
    pub fn healing() -> Self {
        ParametricArp {
            pattern: vec![0, 1, 2],
            gate: 2.0,
            offset: TimingOffset::None,
            velocity: VelocityCurve::Flat(0.8),
        }
    }
}

impl Style for ParametricArp {
    fn apply(&self, chord: &[i32], trigger: &Trigger, ctx: &mut RenderContext<'_>) -> Vec<NoteEvent> {
        let mut notes = Vec::new();
        if self.pattern.is_empty() || chord.is_empty() {
            return notes;
        }

        let pattern_len = self.pattern.len() as i64;
        let velocity_scale = ctx.velocity_scale;
        let rng = &mut *ctx.rng;

        for_each_step(trigger.start, trigger.end, ctx.tempo, |slot| {
            let index = self.pattern[slot.index.rem_euclid(pattern_len) as usize];
            let Some(pitch) = resolve_index(chord, index) else {
                return;
            };

            let lag = match self.offset {
                TimingOffset::None => 0.0,
                TimingOffset::RandomLag { min, max } => rng.random_range(min..max),
            };
            let velocity = scaled_velocity(
                trigger.velocity,
                velocity_scale,
                self.velocity.multiplier(slot.index),
            );

            if let Some(note) = clipped_note(
                pitch,
                slot.time + lag,
                slot.duration * self.gate,
                trigger.end,
                velocity,
            ) {
                notes.push(note);
            }
        });

        notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn trigger(start: f64, end: f64, velocity: u8, sub_beat: SubBeat) -> Trigger {
        Trigger {
            start,
            end,
            velocity,
            sub_beat,
            root_pitch: 36,
        }
    }

    fn render(style: &dyn Style, chord: &[i32], trigger: &Trigger) -> Vec<NoteEvent> {
        let tempo = TempoMap::constant(120.0);
        let mut rng = StdRng::seed_from_u64(7);
        let mut ctx = RenderContext {
            tempo: &tempo,
            velocity_scale: 1.0,
            rng: &mut rng,
        };
        style.apply(chord, trigger, &mut ctx)
    }

    #[test]
    fn test_pad_holds_whole_span() {
        let notes = render(&Pad, &[48, 52, 55], &trigger(0.0, 2.0, 100, SubBeat::Beat));

        assert_eq!(notes.len(), 3);
        assert!(notes.iter().all(|n| n.start == 0.0 && (n.end - 2.0).abs() < 1e-9));
        assert_eq!(Pad.source(), TriggerSource::MergedEvents);
    }

    #[test]
    fn test_rhythm_skips_soft_notes() {
        let notes = render(&Rhythm, &[48, 52, 55], &trigger(0.0, 0.5, 90, SubBeat::Beat));
        assert!(notes.is_empty());
    }

    #[test]
    fn test_rhythm_thins_short_offbeat_notes() {
        let notes = render(&Rhythm, &[52, 48, 55], &trigger(0.25, 0.4, 110, SubBeat::And));
        let pitches: Vec<u8> = notes.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![48, 52]);

        let full = render(&Rhythm, &[48, 52, 55], &trigger(0.0, 0.4, 110, SubBeat::Beat));
        assert_eq!(full.len(), 3);
    }

    #[test]
    fn test_up_arp_one_beat() {
        let notes = render(&ParametricArp::up(), &[48, 52, 55], &trigger(0.0, 0.5, 100, SubBeat::Beat));

        assert_eq!(notes.len(), 4);
        let pitches: Vec<u8> = notes.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![48, 52, 55, 48]);
        for pair in notes.windows(2) {
            assert!((pair[1].start - pair[0].start - 0.125).abs() < 1e-9);
        }
    }

    #[test]
    fn test_trance_accent_and_gate() {
        let notes = render(&ParametricArp::trance(), &[48, 52, 55], &trigger(0.0, 0.5, 100, SubBeat::Beat));

        assert_eq!(notes[2].velocity, 120);
        assert_eq!(notes[1].velocity, 100);
        assert!((notes[0].duration() - 0.075).abs() < 1e-9);
    }

    #[test]
    fn test_lofi_lags_behind_grid() {
        let notes = render(&ParametricArp::lofi(), &[48, 52, 55], &trigger(0.0, 1.0, 100, SubBeat::Beat));

        assert!(!notes.is_empty());
        for note in &notes {
            let grid_offset = note.start - (note.start / 0.125).floor() * 0.125;
            assert!(grid_offset >= 0.03 - 1e-9 && grid_offset < 0.05 + 1e-9);
            assert_eq!(note.velocity, 70);
        }
    }

    #[test]
    fn test_healing_rings_to_span_end() {
        let notes = render(&ParametricArp::healing(), &[48, 52, 55], &trigger(0.0, 0.5, 100, SubBeat::Beat));

        assert!((notes[0].duration() - 0.25).abs() < 1e-9);
        assert!((notes[3].end - 0.5).abs() < 1e-9);
    }
}
