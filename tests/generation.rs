// End-to-end generation tests
// Bass line in, rendered parts out, through the public API

use std::path::PathBuf;
use ensemble_lib::arranger::{
    ExportError, HumanizeSettings, MidiExportOptions, PatternVoice, Step, StepMode, StylePattern,
    assemble_patterns, export_part, sample_rows,
};
use ensemble_lib::groove::{BeatGrid, TempoMap};
use ensemble_lib::harmony::ChordMode;
use ensemble_lib::pipeline::{
    CancelToken, EnsembleGenerator, GeneratedPart, GenerationInput, GenerationReport, MemorySink,
    MidiFileSink, OutputSink, METADATA_FILE, read_trace_file, spawn_generation,
};
use ensemble_lib::source::{MidiContainer, SmfContainer, analysis_track};
use ensemble_lib::{GenerationSettings, NoteEvent};
use tempfile::TempDir;

fn one_bar_input(notes: Vec<NoteEvent>) -> GenerationInput {
    GenerationInput {
        name: "Groove_Bass".to_string(),
        notes,
        key_notes: Vec::new(),
        grid: BeatGrid::new(vec![0.0, 0.5, 1.0, 1.5, 2.0], vec![0.0]),
        tempo: TempoMap::constant(120.0),
        source_hash: None,
    }
}

fn settings(chord: &str, style: &str) -> GenerationSettings {
    GenerationSettings {
        key: Some("C Major".to_string()),
        chords: Some(vec![chord.to_string()]),
        styles: Some(vec![style.to_string()]),
        humanize: HumanizeSettings {
            timing_jitter: 0.0,
            duration_scale: 1.0,
            seed: Some(3),
        },
        ..Default::default()
    }
}

fn generate(generator: &EnsembleGenerator, input: &GenerationInput, settings: &GenerationSettings) -> (GenerationReport, MemorySink) {
    let mut sink = MemorySink::new();
    let report = generator.generate(input, settings, &CancelToken::new(), &mut sink);
    (report, sink)
}

#[test]
fn test_pad_plays_one_c_major_chord() {
    let input = one_bar_input(vec![NoteEvent::new(36, 0.0, 0.5, 100)]);
    let (report, sink) = generate(&EnsembleGenerator::new(), &input, &settings("Diatonic", "Pad"));

    assert_eq!(report.outputs.len(), 1);
    let part = sink.find("Diatonic", "Pad").unwrap();
    let mut pitches: Vec<u8> = part.notes.iter().map(|n| n.pitch).collect();
    pitches.sort_unstable();
    assert_eq!(pitches, vec![48, 52, 55]);
    assert!(part.notes.iter().all(|n| n.start.abs() < 1e-9 && (n.end - 0.5).abs() < 1e-9));
    assert_eq!(part.file_stem, "Groove_Bass_Diatonic_Pad");
}

#[test]
fn test_arp_plays_four_sixteenths() {
    let input = one_bar_input(vec![NoteEvent::new(36, 0.0, 0.5, 100)]);
    let (_, sink) = generate(&EnsembleGenerator::new(), &input, &settings("Diatonic", "Arp"));

    let notes = &sink.find("Diatonic", "Arp").unwrap().notes;
    assert_eq!(notes.len(), 4);
    for (i, note) in notes.iter().enumerate() {
        assert!((note.start - i as f64 * 0.125).abs() < 1e-9);
        assert!(note.start < 0.5);
    }
    let pitches: Vec<u8> = notes.iter().map(|n| n.pitch).collect();
    assert_eq!(pitches, vec![48, 52, 55, 48]);
}

#[test]
fn test_strict_validation_skips_thin_patterns() {
    let generator = EnsembleGenerator::new().with_patterns(assemble_patterns(&sample_rows()));
    let input = one_bar_input(vec![
        NoteEvent::new(36, 0.0, 0.5, 100),
        NoteEvent::new(43, 0.5, 1.0, 100),
    ]);

    let strict = GenerationSettings {
        strict_validation: true,
        ..settings("Diatonic_7th", "LoFi_01")
    };
    let (report, sink) = generate(&generator, &input, &strict);
    assert!(sink.parts.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, "chord needs 4 voices, style has 1");

    let (report, sink) = generate(&generator, &input, &settings("Diatonic_7th", "LoFi_01"));
    assert_eq!(report.outputs.len(), 1);
    let part = &sink.parts[0];
    assert_eq!(part.file_stem, "Groove_Keys_Diatonic_7th_LoFi_01");
    assert_eq!(part.category, "Keys");
    assert!(!part.notes.is_empty());
}

#[test]
fn test_strict_validation_on_seventh_expansion() {
    let generator = EnsembleGenerator::new().with_patterns(assemble_patterns(&sample_rows()));
    let input = one_bar_input(vec![NoteEvent::new(36, 0.0, 1.0, 100)]);
    let settings = GenerationSettings {
        strict_validation: true,
        expansion: vec![ChordMode::Seventh],
        styles: Some(vec!["Pad".to_string(), "Climb_Ext".to_string()]),
        ..settings("Diatonic", "Pad")
    };

    let (report, _) = generate(&generator, &input, &settings);

    // Pad adapts to any chord; the two-voice pattern cannot hold a seventh
    assert_eq!(report.outputs.len(), 7);
    assert_eq!(report.skipped.len(), 7);
    assert!(report.outputs.iter().all(|o| o.instrument == "Pad" && o.group == "7th"));
}

/// Block pattern with one voice per chord tone index
fn block_pattern(name: &str, voices: u32) -> StylePattern {
    StylePattern {
        name: name.to_string(),
        voices: (0..voices)
            .map(|index| PatternVoice {
                index,
                steps: vec![Step::Hit(vec![index as i32]), Step::Rest],
                gates: vec![1.0],
                velocities: vec![1.0],
                swing: 0.0,
                mode: StepMode::ChordTone,
            })
            .collect(),
        rename_tag: None,
    }
}

#[test]
fn test_strict_validation_three_voices_against_seventh() {
    let generator = EnsembleGenerator::new()
        .with_patterns(vec![block_pattern("Block_3", 3), block_pattern("Block_4", 4)]);
    let input = one_bar_input(vec![NoteEvent::new(36, 0.0, 0.5, 100)]);
    let strict = GenerationSettings {
        strict_validation: true,
        styles: Some(vec!["Block_3".to_string(), "Block_4".to_string()]),
        ..settings("Diatonic_7th", "Block_3")
    };

    let (report, sink) = generate(&generator, &input, &strict);

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].style, "Block_3");
    assert_eq!(report.skipped[0].reason, "chord needs 4 voices, style has 3");

    // Four voices exactly cover a four-note chord
    assert_eq!(report.outputs.len(), 1);
    let part = sink.find("Diatonic_7th", "Block_4").unwrap();
    assert_eq!(part.voice_count, 4);
    let mut pitches: Vec<u8> = part.notes.iter().map(|n| n.pitch).collect();
    pitches.sort_unstable();
    pitches.dedup();
    assert_eq!(pitches, vec![48, 52, 55, 59]);
}

/// Cancels the run after the first written part
struct CancelAfterFirst {
    cancel: CancelToken,
    written: usize,
}

impl OutputSink for CancelAfterFirst {
    fn write(&mut self, part: &GeneratedPart) -> Result<PathBuf, ExportError> {
        self.written += 1;
        self.cancel.cancel();
        Ok(PathBuf::from(part.file_name()))
    }
}

#[test]
fn test_cancellation_stops_between_parts() {
    let input = one_bar_input(vec![NoteEvent::new(36, 0.0, 0.5, 110)]);
    let cancel = CancelToken::new();
    let mut sink = CancelAfterFirst {
        cancel: cancel.clone(),
        written: 0,
    };
    let settings = GenerationSettings {
        chords: None,
        styles: None,
        ..settings("Diatonic", "Pad")
    };

    let report = EnsembleGenerator::new().generate(&input, &settings, &cancel, &mut sink);

    assert!(report.cancelled);
    assert_eq!(sink.written, 1);
    assert_eq!(report.outputs.len(), 1);
}

#[tokio::test]
async fn test_spawned_run_can_be_cancelled() {
    let input = one_bar_input(vec![NoteEvent::new(36, 0.0, 0.5, 110)]);
    let task = spawn_generation(
        EnsembleGenerator::new(),
        input,
        settings("Diatonic", "Pad"),
        Box::new(MemorySink::new()),
    );
    task.cancel.cancel();

    // Either finished before the flag was seen or stopped early
    let report = task.join().await.unwrap();
    assert!(report.cancelled || report.outputs.len() == 1);
}

#[test]
fn test_file_round_trip_through_disk() {
    let temp_dir = TempDir::new().unwrap();

    // Write a bass line as a MIDI file, then read it back as the source
    let bass = vec![
        NoteEvent::new(36, 0.0, 0.5, 100),
        NoteEvent::new(36, 0.5, 1.0, 100),
        NoteEvent::new(43, 1.0, 1.5, 100),
        NoteEvent::new(43, 1.5, 2.0, 100),
    ];
    let bytes = export_part(&bass, 120.0, "Bass", &MidiExportOptions::default()).unwrap();
    let source_path = temp_dir.path().join("Song_Bass.mid");
    std::fs::write(&source_path, &bytes).unwrap();

    let container = SmfContainer::open(&source_path).unwrap();
    assert_eq!(analysis_track(&container).unwrap().notes.len(), 4);
    assert!((container.tempo_at(0.0) - 120.0).abs() < 1e-6);

    let input = GenerationInput::from_container("Song_Bass", &container).unwrap();
    let out_dir = temp_dir.path().join("ensemble");
    let mut sink = MidiFileSink::new(out_dir.clone(), MidiExportOptions::default()).unwrap();
    let trace_path = temp_dir.path().join("trace.jsonl");
    let settings = GenerationSettings {
        trace_path: Some(trace_path.clone()),
        ..settings("Diatonic", "Pad")
    };

    let report = EnsembleGenerator::new().generate(&input, &settings, &CancelToken::new(), &mut sink);
    assert_eq!(report.outputs.len(), 1);
    assert!(report.failed.is_empty());

    let written = SmfContainer::open(&report.outputs[0].path).unwrap();
    let chord_notes = &analysis_track(&written).unwrap().notes;
    let mut first_chord: Vec<u8> = chord_notes.iter().filter(|n| n.start < 0.01).map(|n| n.pitch).collect();
    first_chord.sort_unstable();
    assert_eq!(first_chord, vec![48, 52, 55]);

    let metadata = report.write_metadata(&out_dir).unwrap();
    assert_eq!(metadata.file_name().unwrap(), METADATA_FILE);
    let loaded = GenerationReport::load(&metadata).unwrap();
    assert_eq!(loaded.outputs[0].file_name, "Song_Bass_Diatonic_Pad.mid");

    let trace = read_trace_file(&trace_path).unwrap();
    assert!(trace.len() >= 4);
    assert!(trace.iter().all(|e| e.run_id == report.run_id));
}
