// Harmony Timeline - Per-beat chord events built from an analyzed bass line
// Groups notes by beat, picks the dominant root and derives a voiced chord

use serde::{Deserialize, Serialize};
use crate::groove::{BeatGrid, NoteAnalysis};
use super::chords::ChordDegreeSpec;
use super::scale::KeyInfo;
use super::strategies::ChordStrategy;
use super::voicing::VoiceLeader;

/// Notes whose onsets fall in one beat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatGroup {
    pub start: f64,
    pub end: f64,
    pub notes: Vec<NoteAnalysis>,
}

/// A chord sounding over a span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordEvent {
    pub start: f64,
    pub end: f64,

    /// Voiced chord tones
    pub pitches: Vec<i32>,
    pub velocity: u8,

    /// Root the chord was built on
    pub root_pitch: i32,

    /// Bass notes covered by this event
    pub bass_notes: Vec<NoteAnalysis>,
}

/// Where chord tones come from
#[derive(Clone, Copy)]
pub enum ChordSource<'a> {
    /// A named strategy applied to the dominant root
    Strategy(&'a dyn ChordStrategy),

    /// A fixed scale degree, placed in the dominant root's octave
    Degree(&'a ChordDegreeSpec),
}

/// Group analyzed notes by beat
///
/// Beats are half-open with 1 ms tolerance. Grouping starts at the beat
/// containing the first onset and stops one second past the last release.
/// The grid is extended first so the final notes always have a beat.
pub fn group_by_beat(analyses: &[NoteAnalysis], grid: &BeatGrid) -> Vec<BeatGroup> {
    let Some(first) = analyses.first() else {
        return Vec::new();
    };
    let end_time = analyses
        .iter()
        .map(|a| a.note.end)
        .fold(f64::NEG_INFINITY, f64::max);

    let grid = grid.extended_to(end_time);
    let beats = &grid.beats;
    let first_index = grid.locate(first.note.start).index;

    let mut groups = Vec::new();
    for window in beats[first_index..].windows(2) {
        let (beat_start, beat_end) = (window[0], window[1]);
        if beat_start > end_time + 1.0 {
            break;
        }

        let notes: Vec<NoteAnalysis> = analyses
            .iter()
            .filter(|a| a.note.start >= beat_start - 0.001 && a.note.start < beat_end - 0.001)
            .cloned()
            .collect();

        if !notes.is_empty() {
            groups.push(BeatGroup {
                start: beat_start,
                end: beat_end,
                notes,
            });
        }
    }

    groups
}

/// Pick the note that defines the beat's harmony
///
/// Scoring: +1000 on the beat start (within 50 ms), +500 for an accent
/// above 1.2x the group's average velocity or -100 below 0.8x, plus the
/// note's duration. Ties go to the earliest note.
pub fn select_dominant_root(group: &BeatGroup) -> Option<&NoteAnalysis> {
    if group.notes.is_empty() {
        return None;
    }
    let avg_velocity = group.notes.iter().map(|n| n.note.velocity as f64).sum::<f64>()
        / group.notes.len() as f64;

    let mut best: Option<(&NoteAnalysis, f64)> = None;
    for analysis in &group.notes {
        let note = &analysis.note;
        let mut score = 0.0;
        if (note.start - group.start).abs() < 0.05 {
            score += 1000.0;
        }
        let velocity = note.velocity as f64;
        if velocity > avg_velocity * 1.2 {
            score += 500.0;
        } else if velocity < avg_velocity * 0.8 {
            score -= 100.0;
        }
        score += note.duration();

        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((analysis, score));
        }
    }

    best.map(|(analysis, _)| analysis)
}

/// Chord events for one chord source over a bass line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarmonyTimeline {
    pub events: Vec<ChordEvent>,
}

impl HarmonyTimeline {
    /// Build one chord event per beat group
    ///
    /// Algorithm:
    /// 1. Select the dominant root of the group
    /// 2. Derive chord tones from the source
    /// 3. Sort ascending, then voice-lead triads through `leader`
    pub fn build(
        groups: &[BeatGroup],
        source: ChordSource<'_>,
        key: &KeyInfo,
        leader: &mut VoiceLeader,
    ) -> Self {
        let mut events = Vec::with_capacity(groups.len());

        for group in groups {
            let Some(dominant) = select_dominant_root(group) else {
                continue;
            };
            let harmonic = dominant.harmonic_pitch;

            let (root_pitch, mut pitches) = match source {
                ChordSource::Strategy(strategy) => (harmonic, strategy.apply(harmonic, key)),
                ChordSource::Degree(spec) => {
                    let root = harmonic.div_euclid(12) * 12
                        + (key.root as i32 + spec.root_offset).rem_euclid(12);
                    (root, spec.pitches(root))
                }
            };

            if pitches.is_empty() {
                log::warn!("Empty chord at {:.3}s, skipping beat", group.start);
                continue;
            }
            pitches.sort_unstable();
            let pitches = leader.lead(&pitches);

            events.push(ChordEvent {
                start: group.start,
                end: group.end,
                pitches,
                velocity: dominant.note.velocity,
                root_pitch,
                bass_notes: group.notes.clone(),
            });
        }

        HarmonyTimeline { events }
    }

    /// Runs of identical chords collapsed into single events
    pub fn merged(&self) -> Vec<ChordEvent> {
        merge_events(&self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Merge consecutive events whose pitch lists are equal
///
/// The merged event keeps the first event's velocity and root, extends to the
/// last event's end and carries all bass notes. Applying it twice changes nothing.
pub fn merge_events(events: &[ChordEvent]) -> Vec<ChordEvent> {
    let mut merged: Vec<ChordEvent> = Vec::new();

    for event in events {
        match merged.last_mut() {
            Some(current) if current.pitches == event.pitches => {
                current.end = event.end;
                current.bass_notes.extend(event.bass_notes.iter().cloned());
            }
            _ => merged.push(event.clone()),
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groove::BeatGridAnalyzer;
    use crate::harmony::chords::{ChordDeriver, ChordMode};
    use crate::harmony::scale::ScaleKind;
    use crate::harmony::strategies::Diatonic;
    use crate::notes::NoteEvent;

    fn grid_120(beats: usize) -> BeatGrid {
        let beats: Vec<f64> = (0..=beats).map(|i| i as f64 * 0.5).collect();
        BeatGrid::new(beats, vec![0.0])
    }

    fn analyze(notes: &[NoteEvent], grid: &BeatGrid) -> Vec<NoteAnalysis> {
        BeatGridAnalyzer::new(grid).analyze(notes).notes
    }

    #[test]
    fn test_group_by_beat_drops_empty_beats() {
        let grid = grid_120(8);
        let notes = vec![
            NoteEvent::new(36, 0.0, 0.2, 100),
            NoteEvent::new(36, 0.25, 0.45, 100),
            NoteEvent::new(43, 1.5, 1.9, 100),
        ];
        let groups = group_by_beat(&analyze(&notes, &grid), &grid);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].notes.len(), 2);
        assert!((groups[1].start - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_group_extends_short_grid() {
        let grid = BeatGrid::new(vec![0.0, 0.5], vec![0.0]);
        let notes = vec![NoteEvent::new(36, 1.2, 1.4, 100)];
        let groups = group_by_beat(&analyze(&notes, &grid), &grid);

        assert_eq!(groups.len(), 1);
        assert!((groups[0].start - 1.0).abs() < 1e-9);
        assert!((groups[0].end - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_onset_just_before_beat_belongs_to_next() {
        let grid = grid_120(4);
        let notes = vec![
            NoteEvent::new(36, 0.0, 0.3, 100),
            NoteEvent::new(38, 0.4995, 0.8, 100),
        ];
        let groups = group_by_beat(&analyze(&notes, &grid), &grid);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].notes[0].note.pitch, 38);
    }

    #[test]
    fn test_dominant_prefers_on_beat_note() {
        let grid = grid_120(2);
        let notes = vec![
            NoteEvent::new(36, 0.0, 0.1, 100),
            NoteEvent::new(43, 0.125, 0.5, 100),
        ];
        let groups = group_by_beat(&analyze(&notes, &grid), &grid);
        let dominant = select_dominant_root(&groups[0]).unwrap();

        assert_eq!(dominant.note.pitch, 36);
    }

    #[test]
    fn test_dominant_accent_beats_length() {
        let grid = grid_120(2);
        let notes = vec![
            NoteEvent::new(36, 0.1, 0.45, 60),
            NoteEvent::new(43, 0.2, 0.3, 127),
        ];
        let groups = group_by_beat(&analyze(&notes, &grid), &grid);
        let dominant = select_dominant_root(&groups[0]).unwrap();

        assert_eq!(dominant.note.pitch, 43);
    }

    #[test]
    fn test_dominant_tie_keeps_first() {
        let grid = grid_120(2);
        let notes = vec![
            NoteEvent::new(40, 0.125, 0.25, 100),
            NoteEvent::new(45, 0.25, 0.375, 100),
        ];
        let groups = group_by_beat(&analyze(&notes, &grid), &grid);

        assert_eq!(select_dominant_root(&groups[0]).unwrap().note.pitch, 40);
    }

    #[test]
    fn test_build_with_strategy() {
        let grid = grid_120(2);
        let key = KeyInfo::new(0, ScaleKind::Major);
        let groups = group_by_beat(&analyze(&[NoteEvent::new(36, 0.0, 0.5, 100)], &grid), &grid);

        let timeline = HarmonyTimeline::build(
            &groups,
            ChordSource::Strategy(&Diatonic),
            &key,
            &mut VoiceLeader::new(),
        );

        assert_eq!(timeline.events.len(), 1);
        assert_eq!(timeline.events[0].pitches, vec![48, 52, 55]);
        assert_eq!(timeline.events[0].root_pitch, 36);
        assert_eq!(timeline.events[0].velocity, 100);
    }

    #[test]
    fn test_build_with_degree_spec() {
        let grid = grid_120(2);
        let key = KeyInfo::new(0, ScaleKind::Major);
        let specs = ChordDeriver::new(key).degree_specs(ChordMode::Seventh);
        let groups = group_by_beat(&analyze(&[NoteEvent::new(40, 0.0, 0.5, 90)], &grid), &grid);

        // Degree 2 (Dm7) placed in the bass note's octave
        let timeline = HarmonyTimeline::build(
            &groups,
            ChordSource::Degree(&specs[1]),
            &key,
            &mut VoiceLeader::new(),
        );

        assert_eq!(timeline.events[0].root_pitch, 38);
        assert_eq!(timeline.events[0].pitches, vec![50, 53, 57, 60]);
    }

    fn event(start: f64, pitches: &[i32]) -> ChordEvent {
        ChordEvent {
            start,
            end: start + 0.5,
            pitches: pitches.to_vec(),
            velocity: 100,
            root_pitch: pitches[0] - 12,
            bass_notes: Vec::new(),
        }
    }

    #[test]
    fn test_merge_runs() {
        let events = vec![
            event(0.0, &[48, 52, 55]),
            event(0.5, &[48, 52, 55]),
            event(1.0, &[47, 50, 55]),
            event(1.5, &[48, 52, 55]),
        ];
        let merged = merge_events(&events);

        assert_eq!(merged.len(), 3);
        assert!((merged[0].end - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let events = vec![
            event(0.0, &[48, 52, 55]),
            event(0.5, &[48, 52, 55]),
            event(1.0, &[50, 53, 57]),
            event(1.5, &[50, 53, 57]),
        ];
        let once = merge_events(&events);
        let twice = merge_events(&once);

        assert_eq!(once, twice);
    }
}
