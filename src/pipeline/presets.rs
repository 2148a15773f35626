// Presets - Named (chord strategy, style) combinations
// A preset replaces the chord and style filters of a run

/// Preset names in lookup order
pub const PRESET_NAMES: [&str; 5] = ["pop", "rock", "game", "dance", "lofi"];

/// (chord strategy, style) pairs of a preset, case-insensitive
pub fn preset_pairs(name: &str) -> Option<&'static [(&'static str, &'static str)]> {
    let pairs: &'static [(&'static str, &'static str)] = match name.trim().to_lowercase().as_str() {
        "pop" => &[("Diatonic", "Pad"), ("Diatonic", "Rhythm")],
        "rock" => &[("Diatonic", "Rhythm"), ("Maj_Open", "Rhythm")],
        "game" => &[("Diatonic_Open", "Arp_Healing"), ("Diatonic_7th", "Pad")],
        "dance" => &[("Diatonic", "Arp_Trance"), ("Diatonic_Open", "Arp")],
        "lofi" => &[("Diatonic_7th", "Arp_LoFi"), ("Diatonic_Open", "Pad")],
        _ => return None,
    };
    Some(pairs)
}
