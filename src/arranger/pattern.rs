// Style Patterns - Data-driven multi-voice step patterns
// Each voice cycles its own sequence, gate and velocity lists over the chord

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::notes::NoteEvent;
use super::chord_type::{ChordType, extended_pitch};
use super::sequencer::{STRUM_SECONDS, clipped_note, cycle_value, for_each_step, resolve_index, scaled_velocity};
use super::styles::{RenderContext, Style, Trigger};

/// One sequence cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Rest,

    /// One or more indices sounded together (strummed)
    Hit(Vec<i32>),
}

impl Step {
    /// Parse a sequence cell such as "0", "r", "0,1,2" or "0&2"
    ///
    /// Pieces are split on '&', '+', ',' and whitespace. "r", "-1", "nan"
    /// and empty cells are rests. Malformed pieces are skipped.
    pub fn parse(cell: &str) -> Step {
        let trimmed = cell.trim();
        if is_rest_token(trimmed) {
            return Step::Rest;
        }

        let mut indices = Vec::new();
        for piece in trimmed.split(|c: char| c == '&' || c == '+' || c == ',' || c.is_whitespace()) {
            if is_rest_token(piece) {
                continue;
            }
            match piece.parse::<f64>() {
                Ok(value) if value.is_finite() => indices.push(value.trunc() as i32),
                _ => log::debug!("Skipping malformed step token '{}'", piece),
            }
        }

        if indices.is_empty() {
            Step::Rest
        } else {
            Step::Hit(indices)
        }
    }
}

fn is_rest_token(token: &str) -> bool {
    let lower = token.to_lowercase();
    matches!(lower.as_str(), "" | "r" | "-1" | "nan")
}

/// How a voice turns indices into pitches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
    /// Index into the voiced chord with octave wrap
    #[default]
    ChordTone,

    /// Walk the detected chord type's interval cycle from the root
    Extended,
}

/// One voice of a pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternVoice {
    /// Voice number within the pattern
    pub index: u32,
    pub steps: Vec<Step>,

    /// Per-step gate multipliers (1.0 = full step)
    pub gates: Vec<f64>,

    /// Per-step velocity multipliers
    pub velocities: Vec<f64>,

    /// Delay of odd steps as a fraction of a step
    pub swing: f64,
    pub mode: StepMode,
}

/// A named multi-voice pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylePattern {
    pub name: String,
    pub voices: Vec<PatternVoice>,

    /// Replaces "Bass" in output names; also the type used for filtering
    pub rename_tag: Option<String>,
}

/// Playback of a StylePattern
pub struct PatternStyle {
    pattern: Arc<StylePattern>,
}

impl PatternStyle {
    pub fn new(pattern: Arc<StylePattern>) -> Self {
        PatternStyle { pattern }
    }

    pub fn pattern(&self) -> &StylePattern {
        &self.pattern
    }

    fn render_voice(
        &self,
        voice: &PatternVoice,
        chord: &[i32],
        trigger: &Trigger,
        ctx: &mut RenderContext<'_>,
        out: &mut Vec<NoteEvent>,
    ) {
        if voice.steps.is_empty() {
            log::debug!("Pattern '{}' voice {} has no steps", self.pattern.name, voice.index);
            return;
        }

        let chord_type = match voice.mode {
            StepMode::Extended => Some(ChordType::detect(trigger.root_pitch, chord)),
            StepMode::ChordTone => None,
        };
        let len = voice.steps.len() as i64;

        for_each_step(trigger.start, trigger.end, ctx.tempo, |slot| {
            let Step::Hit(indices) = &voice.steps[slot.index.rem_euclid(len) as usize] else {
                return;
            };

            let swing = if slot.index.rem_euclid(2) == 1 {
                voice.swing * slot.duration
            } else {
                0.0
            };
            let length = cycle_value(&voice.gates, slot.index) * slot.duration;
            let velocity = scaled_velocity(
                trigger.velocity,
                ctx.velocity_scale,
                cycle_value(&voice.velocities, slot.index),
            );

            for (strum, &index) in indices.iter().enumerate() {
                let pitch = match chord_type {
                    Some(ty) => Some(extended_pitch(trigger.root_pitch, index, ty)),
                    None => resolve_index(chord, index),
                };
                let Some(pitch) = pitch else {
                    continue;
                };
                let onset = slot.time + swing + strum as f64 * STRUM_SECONDS;
                if let Some(note) = clipped_note(pitch, onset, length, trigger.end, velocity) {
                    out.push(note);
                }
            }
        });
    }
}

impl Style for PatternStyle {
    fn apply(&self, chord: &[i32], trigger: &Trigger, ctx: &mut RenderContext<'_>) -> Vec<NoteEvent> {
        let mut notes = Vec::new();
        for voice in &self.pattern.voices {
            self.render_voice(voice, chord, trigger, ctx, &mut notes);
        }
        notes.sort_by(|a, b| {
            a.start
                .partial_cmp(&b.start)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        notes
    }

    fn voice_count(&self) -> Option<usize> {
        Some(self.pattern.voices.len())
    }

    fn rename_tag(&self) -> Option<&str> {
        self.pattern.rename_tag.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groove::{SubBeat, TempoMap};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn voice(cells: &[&str], gates: Vec<f64>, velocities: Vec<f64>, swing: f64, mode: StepMode) -> PatternVoice {
        PatternVoice {
            index: 0,
            steps: cells.iter().map(|c| Step::parse(c)).collect(),
            gates,
            velocities,
            swing,
            mode,
        }
    }

    fn render(pattern: StylePattern, chord: &[i32], start: f64, end: f64) -> Vec<NoteEvent> {
        let tempo = TempoMap::constant(120.0);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = RenderContext {
            tempo: &tempo,
            velocity_scale: 1.0,
            rng: &mut rng,
        };
        let trigger = Trigger {
            start,
            end,
            velocity: 100,
            sub_beat: SubBeat::Beat,
            root_pitch: 36,
        };
        PatternStyle::new(Arc::new(pattern)).apply(chord, &trigger, &mut ctx)
    }

    fn single(voice: PatternVoice) -> StylePattern {
        StylePattern {
            name: "Test".to_string(),
            voices: vec![voice],
            rename_tag: None,
        }
    }

    #[test]
    fn test_step_parsing() {
        assert_eq!(Step::parse("r"), Step::Rest);
        assert_eq!(Step::parse("-1"), Step::Rest);
        assert_eq!(Step::parse("NaN"), Step::Rest);
        assert_eq!(Step::parse(" "), Step::Rest);
        assert_eq!(Step::parse("2"), Step::Hit(vec![2]));
        assert_eq!(Step::parse("2.0"), Step::Hit(vec![2]));
        assert_eq!(Step::parse("0,1,2"), Step::Hit(vec![0, 1, 2]));
        assert_eq!(Step::parse("0&2+4"), Step::Hit(vec![0, 2, 4]));
        assert_eq!(Step::parse("0,x,2"), Step::Hit(vec![0, 2]));
        assert_eq!(Step::parse("x"), Step::Rest);
    }

    #[test]
    fn test_rests_and_octave_wrap() {
        let pattern = single(voice(&["0", "r", "3", "4"], vec![], vec![], 0.0, StepMode::ChordTone));
        let notes = render(pattern, &[48, 52, 55], 0.0, 0.5);

        let pitches: Vec<u8> = notes.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![48, 60, 64]);
    }

    #[test]
    fn test_strum_offsets() {
        let pattern = single(voice(&["0,1,2"], vec![4.0], vec![], 0.0, StepMode::ChordTone));
        let notes = render(pattern, &[48, 52, 55], 0.0, 0.125);

        assert_eq!(notes.len(), 3);
        assert!((notes[1].start - 0.005).abs() < 1e-9);
        assert!((notes[2].start - 0.010).abs() < 1e-9);
        assert!(notes.iter().all(|n| (n.end - 0.125).abs() < 1e-9));
    }

    #[test]
    fn test_swing_delays_odd_steps() {
        let pattern = single(voice(&["0"], vec![0.5], vec![], 0.2, StepMode::ChordTone));
        let notes = render(pattern, &[48, 52, 55], 0.0, 0.5);

        assert!((notes[0].start - 0.0).abs() < 1e-9);
        assert!((notes[1].start - 0.15).abs() < 1e-9);
        assert!((notes[2].start - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_gate_and_velocity_cycle() {
        let pattern = single(voice(&["0"], vec![0.5, 1.0], vec![1.2, 0.5], 0.0, StepMode::ChordTone));
        let notes = render(pattern, &[48, 52, 55], 0.0, 0.5);

        assert!((notes[0].duration() - 0.0625).abs() < 1e-9);
        assert!((notes[1].duration() - 0.125).abs() < 1e-9);
        assert_eq!(notes[0].velocity, 120);
        assert_eq!(notes[1].velocity, 50);
    }

    #[test]
    fn test_extended_steps_follow_chord_type() {
        let pattern = single(voice(&["0", "1", "2", "3"], vec![], vec![], 0.0, StepMode::Extended));
        let notes = render(pattern, &[48, 52, 55], 0.0, 0.5);

        let pitches: Vec<u8> = notes.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![48, 52, 55, 60]);
    }

    #[test]
    fn test_empty_voice_is_skipped() {
        let mut pattern = single(voice(&[], vec![], vec![], 0.0, StepMode::ChordTone));
        pattern.voices.push(voice(&["1"], vec![], vec![], 0.0, StepMode::ChordTone));
        let notes = render(pattern, &[48, 52, 55], 0.0, 0.25);

        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|n| n.pitch == 52));
    }

    #[test]
    fn test_voice_count_and_tag() {
        let mut pattern = single(voice(&["0"], vec![], vec![], 0.0, StepMode::ChordTone));
        pattern.rename_tag = Some("Piano".to_string());
        let style = PatternStyle::new(Arc::new(pattern));

        assert_eq!(style.voice_count(), Some(1));
        assert_eq!(style.rename_tag(), Some("Piano"));
    }
}
