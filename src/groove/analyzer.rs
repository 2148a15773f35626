// Beat Grid Analyzer - Per-note rhythmic and register classification
// Annotates a bass line with beat position, syncopation, ghost notes and harmonic pitch

use std::collections::VecDeque;
use serde::{Deserialize, Serialize};
use crate::notes::NoteEvent;
use super::grid::BeatGrid;

/// Position of an onset inside its beat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubBeat {
    /// On the beat ("1")
    Beat,

    /// First sixteenth after the beat ("e")
    E,

    /// Eighth off-beat ("&")
    And,

    /// Last sixteenth ("a")
    A,

    /// Anywhere else
    Off,
}

impl SubBeat {
    /// Counting syllable for this position
    pub fn label(&self) -> &'static str {
        match self {
            SubBeat::Beat => "1",
            SubBeat::E => "e",
            SubBeat::And => "&",
            SubBeat::A => "a",
            SubBeat::Off => "off",
        }
    }
}

/// Overall rhythmic density of the line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Groove {
    EightBeat,
    SixteenBeat,
}

impl Groove {
    pub fn label(&self) -> &'static str {
        match self {
            Groove::EightBeat => "8-beat",
            Groove::SixteenBeat => "16-beat",
        }
    }
}

/// Tolerances used by the analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Window around each sub-beat target, as a fraction of a beat
    pub sub_beat_tolerance: f64,

    /// How far past a downbeat a note must sound to count as crossing it (seconds)
    pub bar_cross_margin: f64,

    /// Notes shorter than this are always muted (seconds)
    pub mute_min_duration: f64,

    /// Short-note threshold for the velocity test (beats)
    pub mute_max_beats: f64,

    /// Velocity ratio to the average below which a short note is muted
    pub mute_velocity_ratio: f64,

    /// Window around dotted lengths (beats)
    pub dotted_tolerance: f64,

    /// Semitone distance from the window average treated as an octave jump
    pub octave_jump: i32,

    /// Number of recent harmonic pitches kept
    pub window_len: usize,

    /// Share of "e"/"a" onsets above which the groove is 16-beat
    pub sixteenth_ratio: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            sub_beat_tolerance: 0.05,
            bar_cross_margin: 0.01,
            mute_min_duration: 0.02,
            mute_max_beats: 0.25,
            mute_velocity_ratio: 0.6,
            dotted_tolerance: 0.1,
            octave_jump: 7,
            window_len: 3,
            sixteenth_ratio: 0.15,
        }
    }
}

/// A note with its derived rhythmic attributes. Built once, never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteAnalysis {
    pub note: NoteEvent,
    pub sub_beat: SubBeat,
    pub is_on_beat: bool,

    /// Sounds across a downbeat
    pub is_syncopated: bool,

    /// Ghost note
    pub is_muted: bool,
    pub is_dotted: bool,

    /// Length measured in beats of the enclosing beat
    pub duration_beats: f64,

    /// Pitch with octave jumps folded back, used for harmony
    pub harmonic_pitch: i32,
}

/// Result of analyzing one note stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineAnalysis {
    pub notes: Vec<NoteAnalysis>,
    pub groove: Groove,
}

/// Sliding window of recent harmonic pitches
///
/// A note that leaps more than `jump` semitones away from the window average
/// but keeps the pitch class of the previous note is treated as an octave
/// doubling and folded back onto the previous pitch.
#[derive(Debug, Clone)]
pub struct OctaveWindow {
    recent: VecDeque<i32>,
    capacity: usize,
    jump: i32,
}

impl OctaveWindow {
    pub fn new(capacity: usize, jump: i32) -> Self {
        OctaveWindow {
            recent: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            jump,
        }
    }

    /// Normalize a pitch and record the result
    pub fn normalize(&mut self, pitch: i32) -> i32 {
        let mut harmonic = pitch;

        if let Some(&last) = self.recent.back() {
            let sum: i32 = self.recent.iter().sum();
            let avg = sum as f64 / self.recent.len() as f64;
            if (pitch as f64 - avg).abs() > self.jump as f64
                && pitch.rem_euclid(12) == last.rem_euclid(12)
            {
                harmonic = last;
            }
        }

        self.recent.push_back(harmonic);
        while self.recent.len() > self.capacity {
            self.recent.pop_front();
        }
        harmonic
    }
}

/// Analyzer bound to one beat grid
pub struct BeatGridAnalyzer<'a> {
    grid: &'a BeatGrid,
    config: AnalyzerConfig,
}

impl<'a> BeatGridAnalyzer<'a> {
    pub fn new(grid: &'a BeatGrid) -> Self {
        BeatGridAnalyzer {
            grid,
            config: AnalyzerConfig::default(),
        }
    }

    pub fn with_config(grid: &'a BeatGrid, config: AnalyzerConfig) -> Self {
        BeatGridAnalyzer { grid, config }
    }

    /// Classify a position inside a beat (fraction in [0, 1))
    pub fn classify_sub_beat(&self, fraction: f64) -> SubBeat {
        let tol = self.config.sub_beat_tolerance;
        let f = fraction - fraction.floor();

        if f < tol || f > 1.0 - tol {
            SubBeat::Beat
        } else if (f - 0.25).abs() < tol {
            SubBeat::E
        } else if (f - 0.5).abs() < tol {
            SubBeat::And
        } else if (f - 0.75).abs() < tol {
            SubBeat::A
        } else {
            SubBeat::Off
        }
    }

    /// True when some downbeat falls strictly inside the note
    pub fn is_bar_crossing(&self, start: f64, end: f64) -> bool {
        for &downbeat in &self.grid.downbeats {
            if downbeat > end {
                break;
            }
            if start < downbeat && end > downbeat + self.config.bar_cross_margin {
                return true;
            }
        }
        false
    }

    /// Ghost-note heuristic
    pub fn is_muted(&self, note: &NoteEvent, duration_beats: f64, avg_velocity: f64) -> bool {
        if note.duration() < self.config.mute_min_duration {
            return true;
        }
        duration_beats < self.config.mute_max_beats
            && (note.velocity as f64) < avg_velocity * self.config.mute_velocity_ratio
    }

    /// Dotted eighth, dotted quarter or dotted half
    pub fn is_dotted(&self, duration_beats: f64) -> bool {
        [0.75, 1.5, 3.0]
            .iter()
            .any(|target| (duration_beats - target).abs() < self.config.dotted_tolerance)
    }

    /// Analyze a note stream
    ///
    /// Algorithm:
    /// 1. Sort notes by onset and compute the average velocity (64 when empty)
    /// 2. Locate each onset in the grid and classify its sub-beat
    /// 3. Flag bar crossings, ghost notes and dotted lengths
    /// 4. Fold octave jumps through a fresh OctaveWindow
    /// 5. Detect the groove from the onset distribution
    pub fn analyze(&self, notes: &[NoteEvent]) -> LineAnalysis {
        let mut sorted: Vec<NoteEvent> = notes.to_vec();
        sorted.sort_by(|a, b| {
            a.start
                .partial_cmp(&b.start)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let avg_velocity = average_velocity(&sorted);
        let mut window = OctaveWindow::new(self.config.window_len, self.config.octave_jump);

        let analyses: Vec<NoteAnalysis> = sorted
            .iter()
            .map(|note| {
                let position = self.grid.locate(note.start);
                let sub_beat = if position.measured {
                    self.classify_sub_beat(position.fraction)
                } else {
                    SubBeat::Beat
                };
                let duration_beats = note.duration() / position.beat_duration;

                NoteAnalysis {
                    note: *note,
                    sub_beat,
                    is_on_beat: sub_beat == SubBeat::Beat,
                    is_syncopated: self.is_bar_crossing(note.start, note.end),
                    is_muted: self.is_muted(note, duration_beats, avg_velocity),
                    is_dotted: self.is_dotted(duration_beats),
                    duration_beats,
                    harmonic_pitch: window.normalize(note.pitch as i32),
                }
            })
            .collect();

        let groove = self.detect_groove(&sorted);
        log::debug!("Analyzed {} notes, groove {}", analyses.len(), groove.label());

        LineAnalysis {
            notes: analyses,
            groove,
        }
    }

    /// 16-beat when enough onsets land on "e" or "a", else 8-beat
    pub fn detect_groove(&self, notes: &[NoteEvent]) -> Groove {
        let mut measured = 0usize;
        let mut sixteenths = 0usize;

        for note in notes {
            let position = self.grid.locate(note.start);
            if !position.measured {
                continue;
            }
            measured += 1;
            if matches!(self.classify_sub_beat(position.fraction), SubBeat::E | SubBeat::A) {
                sixteenths += 1;
            }
        }

        if measured == 0 {
            return Groove::EightBeat;
        }

        if sixteenths as f64 / measured as f64 > self.config.sixteenth_ratio {
            Groove::SixteenBeat
        } else {
            Groove::EightBeat
        }
    }
}

/// Mean velocity, 64 for an empty stream
pub fn average_velocity(notes: &[NoteEvent]) -> f64 {
    if notes.is_empty() {
        return 64.0;
    }
    notes.iter().map(|n| n.velocity as f64).sum::<f64>() / notes.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_120() -> BeatGrid {
        let beats: Vec<f64> = (0..17).map(|i| i as f64 * 0.5).collect();
        let downbeats: Vec<f64> = (0..5).map(|i| i as f64 * 2.0).collect();
        BeatGrid::new(beats, downbeats)
    }

    #[test]
    fn test_sub_beat_classification_at_120_bpm() {
        let grid = grid_120();
        let analyzer = BeatGridAnalyzer::new(&grid);

        let notes = vec![
            NoteEvent::new(36, 0.0, 0.1, 100),
            NoteEvent::new(36, 0.125, 0.2, 100),
            NoteEvent::new(36, 0.25, 0.3, 100),
            NoteEvent::new(36, 0.375, 0.45, 100),
        ];
        let analysis = analyzer.analyze(&notes);
        let labels: Vec<SubBeat> = analysis.notes.iter().map(|n| n.sub_beat).collect();

        assert_eq!(labels, vec![SubBeat::Beat, SubBeat::E, SubBeat::And, SubBeat::A]);
        assert!(analysis.notes[0].is_on_beat);
        assert!(!analysis.notes[1].is_on_beat);
    }

    #[test]
    fn test_classify_edges() {
        let grid = grid_120();
        let analyzer = BeatGridAnalyzer::new(&grid);

        assert_eq!(analyzer.classify_sub_beat(0.97), SubBeat::Beat);
        assert_eq!(analyzer.classify_sub_beat(0.04), SubBeat::Beat);
        assert_eq!(analyzer.classify_sub_beat(0.33), SubBeat::Off);
        assert_eq!(analyzer.classify_sub_beat(0.52), SubBeat::And);
    }

    #[test]
    fn test_octave_jump_normalization() {
        let mut window = OctaveWindow::new(3, 7);
        let result: Vec<i32> = [40, 40, 40, 52, 52, 40]
            .iter()
            .map(|&p| window.normalize(p))
            .collect();

        assert_eq!(result, vec![40, 40, 40, 40, 40, 40]);
    }

    #[test]
    fn test_real_leap_is_kept() {
        let mut window = OctaveWindow::new(3, 7);
        window.normalize(40);
        // Same distance but a different pitch class
        assert_eq!(window.normalize(55), 55);
    }

    #[test]
    fn test_bar_crossing() {
        let grid = grid_120();
        let analyzer = BeatGridAnalyzer::new(&grid);

        assert!(analyzer.is_bar_crossing(1.75, 2.5));
        assert!(!analyzer.is_bar_crossing(1.75, 2.005));
        assert!(!analyzer.is_bar_crossing(2.0, 2.5));
    }

    #[test]
    fn test_muted_notes() {
        let grid = grid_120();
        let analyzer = BeatGridAnalyzer::new(&grid);

        let blip = NoteEvent::new(36, 0.0, 0.01, 120);
        assert!(analyzer.is_muted(&blip, 0.02, 100.0));

        let ghost = NoteEvent::new(36, 0.0, 0.1, 40);
        assert!(analyzer.is_muted(&ghost, 0.2, 100.0));

        let accent = NoteEvent::new(36, 0.0, 0.1, 90);
        assert!(!analyzer.is_muted(&accent, 0.2, 100.0));
    }

    #[test]
    fn test_dotted_lengths() {
        let grid = grid_120();
        let analyzer = BeatGridAnalyzer::new(&grid);

        assert!(analyzer.is_dotted(0.75));
        assert!(analyzer.is_dotted(1.45));
        assert!(!analyzer.is_dotted(1.0));
    }

    #[test]
    fn test_groove_detection() {
        let grid = grid_120();
        let analyzer = BeatGridAnalyzer::new(&grid);

        let eighths: Vec<NoteEvent> = (0..8)
            .map(|i| NoteEvent::new(36, i as f64 * 0.25, i as f64 * 0.25 + 0.2, 100))
            .collect();
        assert_eq!(analyzer.detect_groove(&eighths), Groove::EightBeat);

        let sixteenths: Vec<NoteEvent> = (0..16)
            .map(|i| NoteEvent::new(36, i as f64 * 0.125, i as f64 * 0.125 + 0.1, 100))
            .collect();
        assert_eq!(analyzer.detect_groove(&sixteenths), Groove::SixteenBeat);
    }

    #[test]
    fn test_empty_input() {
        let grid = grid_120();
        let analysis = BeatGridAnalyzer::new(&grid).analyze(&[]);

        assert!(analysis.notes.is_empty());
        assert_eq!(analysis.groove, Groove::EightBeat);
        assert_eq!(average_velocity(&[]), 64.0);
    }

    #[test]
    fn test_note_past_grid_defaults_to_beat() {
        let grid = BeatGrid::new(vec![0.0, 0.5], vec![0.0]);
        let analysis = BeatGridAnalyzer::new(&grid).analyze(&[NoteEvent::new(40, 5.1, 5.3, 90)]);

        assert_eq!(analysis.notes[0].sub_beat, SubBeat::Beat);
        assert!((analysis.notes[0].duration_beats - 0.4).abs() < 1e-9);
    }
}
