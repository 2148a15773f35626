// Voice Leading - Inversion and octave choice for smooth chord motion
// Picks the triad voicing whose centroid stays closest to the previous chord

/// Mean pitch of a chord
pub fn centroid(pitches: &[i32]) -> f64 {
    if pitches.is_empty() {
        return 0.0;
    }
    pitches.iter().sum::<i32>() as f64 / pitches.len() as f64
}

/// Best voicing of a chord relative to a previous centroid
///
/// Only three-tone chords are revoiced: three inversions, each shifted by
/// -12, 0 and +12 semitones. The first candidate with the smallest centroid
/// distance wins. Without a previous centroid, or for other chord sizes, the
/// chord is returned unchanged with its own centroid.
pub fn best_voicing(chord: &[i32], previous: Option<f64>) -> (Vec<i32>, f64) {
    let own = (chord.to_vec(), centroid(chord));
    let (Some(previous), [a, b, c]) = (previous, chord) else {
        return own;
    };

    let inversions = [[*a, *b, *c], [*b, *c, a + 12], [*c, a + 12, b + 12]];

    let mut best = own;
    let mut best_distance = f64::INFINITY;

    for inversion in &inversions {
        for shift in [-12, 0, 12] {
            let candidate: Vec<i32> = inversion.iter().map(|p| p + shift).collect();
            let candidate_centroid = centroid(&candidate);
            let distance = (candidate_centroid - previous).abs();
            if distance < best_distance {
                best_distance = distance;
                best = (candidate, candidate_centroid);
            }
        }
    }

    best
}

/// Per-run voice leading state
///
/// Holds the centroid of the last voiced triad. Reset for every independent
/// timeline.
#[derive(Debug, Clone, Default)]
pub struct VoiceLeader {
    previous: Option<f64>,
}

impl VoiceLeader {
    pub fn new() -> Self {
        VoiceLeader::default()
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }

    pub fn previous_centroid(&self) -> Option<f64> {
        self.previous
    }

    /// Voice a chord; only triads are revoiced and update the state
    pub fn lead(&mut self, chord: &[i32]) -> Vec<i32> {
        if chord.len() != 3 {
            return chord.to_vec();
        }
        let (voicing, center) = best_voicing(chord, self.previous);
        self.previous = Some(center);
        voicing
    }
}
