// Key Estimation - Profile correlation over a duration-weighted chroma
// Krumhansl-Kessler profiles, all 12 rotations, major and natural minor

use crate::notes::NoteEvent;
use super::scale::{KeyInfo, ScaleKind};

/// Krumhansl major key profile
pub const MAJOR_PROFILE: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl minor key profile
pub const MINOR_PROFILE: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Total sounding time per pitch class
pub fn chroma(notes: &[NoteEvent]) -> [f64; 12] {
    let mut bins = [0.0; 12];
    for note in notes {
        let duration = note.duration();
        if duration > 0.0 {
            bins[(note.pitch % 12) as usize] += duration;
        }
    }
    bins
}

/// Estimate the key of a note stream
///
/// Algorithm:
/// 1. Build a 12-bin chroma weighted by note duration
/// 2. Z-score the chroma and both profiles
/// 3. Correlate against every rotation of each profile
/// 4. Highest correlation wins; earlier candidates win ties
///
/// A stream with no sounding time is reported as C Major.
pub fn estimate_key(notes: &[NoteEvent]) -> KeyInfo {
    let bins = chroma(notes);
    let total: f64 = bins.iter().sum();
    if total <= 0.0 {
        return KeyInfo::new(0, ScaleKind::Major);
    }

    let observed = z_score(&bins);
    let profiles = [
        (ScaleKind::Major, z_score(&MAJOR_PROFILE)),
        (ScaleKind::NaturalMinor, z_score(&MINOR_PROFILE)),
    ];

    let mut best = KeyInfo::new(0, ScaleKind::Major);
    let mut best_score = f64::NEG_INFINITY;

    for root in 0..12 {
        for (scale, profile) in &profiles {
            let score = correlation_at(&observed, profile, root);
            if score > best_score {
                best_score = score;
                best = KeyInfo::new(root as u8, *scale);
            }
        }
    }

    log::debug!("Estimated key {} (r = {:.3})", best, best_score);
    best
}

/// Pearson correlation of z-scored vectors with the profile rotated to `root`
fn correlation_at(observed: &[f64; 12], profile: &[f64; 12], root: usize) -> f64 {
    let sum: f64 = (0..12)
        .map(|pc| observed[pc] * profile[(pc + 12 - root) % 12])
        .sum();
    sum / 12.0
}

fn z_score(values: &[f64; 12]) -> [f64; 12] {
    let mean = values.iter().sum::<f64>() / 12.0;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 12.0;
    let std = variance.sqrt();

    let mut out = [0.0; 12];
    if std > 0.0 {
        for (o, v) in out.iter_mut().zip(values.iter()) {
            *o = (v - mean) / std;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(pitch: u8, start: f64, length: f64) -> NoteEvent {
        NoteEvent::new(pitch, start, start + length, 100)
    }

    #[test]
    fn test_c_major_line() {
        let notes = vec![
            held(36, 0.0, 2.0),
            held(40, 2.0, 1.0),
            held(43, 3.0, 1.0),
            held(48, 4.0, 2.0),
        ];
        assert_eq!(estimate_key(&notes), KeyInfo::new(0, ScaleKind::Major));
    }

    #[test]
    fn test_a_minor_line() {
        let notes = vec![
            held(45, 0.0, 4.0),
            held(48, 4.0, 2.0),
            held(52, 6.0, 2.0),
        ];
        assert_eq!(estimate_key(&notes), KeyInfo::new(9, ScaleKind::NaturalMinor));
    }

    #[test]
    fn test_silence_is_c_major() {
        assert_eq!(estimate_key(&[]), KeyInfo::new(0, ScaleKind::Major));
    }

    #[test]
    fn test_chroma_weights_by_duration() {
        let bins = chroma(&[held(36, 0.0, 1.5), held(48, 2.0, 0.5), held(43, 3.0, 1.0)]);
        assert!((bins[0] - 2.0).abs() < 1e-9);
        assert!((bins[7] - 1.0).abs() < 1e-9);
    }
}
