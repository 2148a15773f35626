// Humanize - Small timing jitter and note shortening on rendered output
// Applied once per rendered part, after all styles have played

use rand::Rng;
use serde::{Deserialize, Serialize};
use crate::notes::NoteEvent;

/// Humanization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanizeSettings {
    /// Maximum onset displacement in seconds (uniform, both directions)
    pub timing_jitter: f64,

    /// Note length multiplier
    pub duration_scale: f64,

    /// Seed for reproducible output; entropy when None
    pub seed: Option<u64>,
}

impl Default for HumanizeSettings {
    fn default() -> Self {
        HumanizeSettings {
            timing_jitter: 0.01,
            duration_scale: 0.95,
            seed: None,
        }
    }
}

/// Jitter onsets and shorten notes in place
///
/// Onsets never move below zero; each note keeps its scaled original length.
pub fn humanize<R: Rng>(notes: &mut [NoteEvent], settings: &HumanizeSettings, rng: &mut R) {
    let jitter = settings.timing_jitter.abs();
    let scale = if settings.duration_scale > 0.0 {
        settings.duration_scale
    } else {
        1.0
    };

    for note in notes.iter_mut() {
        let length = note.duration() * scale;
        let offset = if jitter > 0.0 {
            rng.random_range(-jitter..=jitter)
        } else {
            0.0
        };
        note.start = (note.start + offset).max(0.0);
        note.end = note.start + length;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_jitter_stays_in_bounds() {
        let mut notes: Vec<NoteEvent> = (0..50)
            .map(|i| NoteEvent::new(60, 1.0 + i as f64 * 0.25, 1.2 + i as f64 * 0.25, 100))
            .collect();
        let original = notes.clone();
        let mut rng = StdRng::seed_from_u64(42);

        humanize(&mut notes, &HumanizeSettings::default(), &mut rng);

        for (before, after) in original.iter().zip(notes.iter()) {
            assert!((after.start - before.start).abs() <= 0.01 + 1e-12);
            assert!((after.duration() - before.duration() * 0.95).abs() < 1e-9);
        }
    }

    #[test]
    fn test_start_never_negative() {
        let mut notes = vec![NoteEvent::new(60, 0.0, 0.5, 100); 20];
        let mut rng = StdRng::seed_from_u64(3);

        humanize(&mut notes, &HumanizeSettings::default(), &mut rng);

        assert!(notes.iter().all(|n| n.start >= 0.0 && n.end > n.start));
    }

    #[test]
    fn test_zero_jitter_only_shortens() {
        let mut notes = vec![NoteEvent::new(60, 1.0, 2.0, 100)];
        let settings = HumanizeSettings {
            timing_jitter: 0.0,
            duration_scale: 0.5,
            seed: None,
        };
        humanize(&mut notes, &settings, &mut StdRng::seed_from_u64(0));

        assert_eq!(notes[0].start, 1.0);
        assert!((notes[0].end - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_same_seed_same_output() {
        let base = vec![NoteEvent::new(60, 1.0, 1.5, 100), NoteEvent::new(64, 2.0, 2.5, 100)];
        let mut a = base.clone();
        let mut b = base.clone();

        humanize(&mut a, &HumanizeSettings::default(), &mut StdRng::seed_from_u64(9));
        humanize(&mut b, &HumanizeSettings::default(), &mut StdRng::seed_from_u64(9));

        assert_eq!(a, b);
    }
}
