// Ensemble CLI - Generate accompaniment parts for a bass line MIDI file
//
// Usage:
//   ensemble input.mid [--key K] [--chord a,b] [--style a,b] [--preset p]
//     [--output dir] [--expand triad,7th,harmonic_minor,melodic_minor,tension]
//     [--strict] [--catalog rows.json] [--config settings.json]
//     [--overrides table.json] [--seed N]

use std::path::{Path, PathBuf};
use ensemble_lib::arranger::{assemble_patterns, load_catalog, sample_rows};
use ensemble_lib::harmony::{ChordMode, FilenameOverrides};
use ensemble_lib::pipeline::{
    CancelToken, EnsembleGenerator, GenerationInput, MidiFileSink, source_digest,
};
use ensemble_lib::source::SmfContainer;
use ensemble_lib::GenerationSettings;

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(input_path) = args.get(1).filter(|s| !s.starts_with("--")).map(PathBuf::from) else {
        eprintln!("Usage: ensemble input.mid [--key K] [--chord a,b] [--style a,b] [--preset p] [--output dir]");
        eprintln!("       [--expand modes] [--strict] [--catalog rows.json] [--config settings.json]");
        eprintln!("       [--overrides table.json] [--seed N]");
        std::process::exit(2);
    };

    let mut settings = match parse_flag::<PathBuf>(&args, "--config") {
        Some(path) => match GenerationSettings::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => GenerationSettings::default(),
    };
    apply_flags(&args, &mut settings);

    println!("=== Ensemble ===");
    println!("Input: {}", input_path.display());

    // Source
    println!("[1/4] Reading {}...", input_path.display());
    let bytes = match std::fs::read(&input_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("  Error reading input: {}", e);
            std::process::exit(1);
        }
    };
    let container = match SmfContainer::parse(&bytes) {
        Ok(container) => container,
        Err(e) => {
            eprintln!("  Error parsing MIDI: {}", e);
            std::process::exit(1);
        }
    };
    let name = input_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string());
    let Some(input) = GenerationInput::from_container(name, &container) else {
        eprintln!("  No notes found in {}", input_path.display());
        std::process::exit(1);
    };
    let input = input.with_source_hash(source_digest(&bytes));
    println!("  {} notes, {:.1} BPM", input.notes.len(), input.tempo.initial_bpm());

    // Styles and overrides
    println!("[2/4] Loading styles...");
    let patterns = match &settings.catalog_path {
        Some(path) => match load_catalog(path) {
            Ok(patterns) => {
                println!("  Loaded {} catalog patterns.", patterns.len());
                patterns
            }
            Err(e) => {
                println!("  Failed to load catalog: {}. Using samples.", e);
                assemble_patterns(&sample_rows())
            }
        },
        None => {
            println!("  Using sample patterns.");
            assemble_patterns(&sample_rows())
        }
    };
    let mut generator = EnsembleGenerator::new().with_patterns(patterns);
    if let Some(path) = parse_flag::<PathBuf>(&args, "--overrides") {
        match FilenameOverrides::load(&path) {
            Ok(table) => generator = generator.with_override_hook(Box::new(table)),
            Err(e) => println!("  Failed to load overrides: {}. Continuing without.", e),
        }
    }
    println!(
        "  {} chord strategies, {} styles",
        generator.chord_names().len(),
        generator.style_names().len()
    );

    // Generation
    let output_root: PathBuf = parse_flag(&args, "--output").unwrap_or_else(|| default_output_dir(&input_path));
    let output_dir = output_root.join(&settings.output_subdir);
    println!("[3/4] Generating into {}...", output_dir.display());
    let mut sink = match MidiFileSink::new(output_dir.clone(), settings.export.clone()) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("  Error creating output directory: {}", e);
            std::process::exit(1);
        }
    };
    let report = generator.generate(&input, &settings, &CancelToken::new(), &mut sink);
    println!("  Key: {}", report.key.as_deref().unwrap_or("-"));
    println!("  Groove: {}", report.groove.as_deref().unwrap_or("-"));
    for output in &report.outputs {
        println!("  + {}", output.file_name);
    }
    for skipped in &report.skipped {
        println!("  - {} / {}: {}", skipped.chord, skipped.style, skipped.reason);
    }
    for failed in &report.failed {
        println!("  ! {}: {}", failed.file_name, failed.error);
    }

    // Metadata
    println!("[4/4] Writing metadata...");
    match report.write_metadata(&output_dir) {
        Ok(path) => println!("  Done! {} parts, metadata at {}", report.outputs.len(), path.display()),
        Err(e) => {
            eprintln!("  Error writing metadata: {}", e);
            std::process::exit(1);
        }
    }

    if !report.failed.is_empty() {
        std::process::exit(1);
    }
}

/// Command-line flags on top of the loaded settings
fn apply_flags(args: &[String], settings: &mut GenerationSettings) {
    if let Some(key) = parse_flag::<String>(args, "--key") {
        settings.key = Some(key);
    }
    if let Some(chords) = parse_flag::<String>(args, "--chord") {
        settings.chords = Some(split_list(&chords));
    }
    if let Some(styles) = parse_flag::<String>(args, "--style") {
        settings.styles = Some(split_list(&styles));
    }
    if let Some(preset) = parse_flag::<String>(args, "--preset") {
        settings.preset = Some(preset);
    }
    if let Some(modes) = parse_flag::<String>(args, "--expand") {
        settings.expansion = split_list(&modes)
            .iter()
            .filter_map(|m| {
                let mode = ChordMode::from_string(m);
                if mode.is_none() {
                    eprintln!("Unknown expansion mode '{}', ignoring.", m);
                }
                mode
            })
            .collect();
    }
    if args.iter().any(|a| a == "--strict") {
        settings.strict_validation = true;
    }
    if let Some(path) = parse_flag::<PathBuf>(args, "--catalog") {
        settings.catalog_path = Some(path);
    }
    if let Some(seed) = parse_flag::<u64>(args, "--seed") {
        settings.humanize.seed = Some(seed);
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_output_dir(input: &Path) -> PathBuf {
    input
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
