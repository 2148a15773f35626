// Ensemble Generator - Batch accompaniment generation for one bass line
// Analysis, key, per-chord timelines and per-style rendering for every combination

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use uuid::Uuid;
use crate::arranger::{
    StylePattern, StyleRegistry, RenderContext, Style, Trigger, TriggerSource,
    builtin_styles, humanize, register_patterns,
};
use crate::config::GenerationSettings;
use crate::groove::{BeatGrid, BeatGridAnalyzer, LineAnalysis, SubBeat, TempoMap};
use crate::harmony::{
    ChordDegreeSpec, ChordDeriver, ChordRegistry, ChordSource, ChordStrategy, HarmonyOverride,
    HarmonyTimeline, KeyInfo, OverrideHook, SourceFeatures, VoiceLeader, builtin_chords,
    estimate_key, group_by_beat,
};
use crate::notes::{NoteEvent, pitch_class_name};
use crate::source::{MidiContainer, analysis_track};
use super::presets::preset_pairs;
use super::report::{GenerationReport, OutputRecord};
use super::sink::OutputSink;
use super::task::CancelToken;
use super::trace::{RunTrace, Stage, TraceWriter};

/// Category of styles without a rename tag
pub const DEFAULT_CATEGORY: &str = "Default";

/// Group label for parts built from chord strategies
pub const STRATEGY_GROUP: &str = "Strategy";

/// The reference line and its timing
#[derive(Debug, Clone)]
pub struct GenerationInput {
    /// Source name without extension, e.g. "Song_Bass"
    pub name: String,

    /// Notes sorted by onset
    pub notes: Vec<NoteEvent>,

    /// Every non-percussive note of the source, for key estimation; the
    /// analyzed line is used when empty
    pub key_notes: Vec<NoteEvent>,
    pub grid: BeatGrid,
    pub tempo: TempoMap,

    /// SHA-256 of the source file
    pub source_hash: Option<String>,
}

impl GenerationInput {
    /// Input from the analysis track of a container, None when it has no notes
    pub fn from_container<C: MidiContainer + ?Sized>(name: impl Into<String>, container: &C) -> Option<Self> {
        let track = analysis_track(container)?;
        let key_notes = container
            .tracks()
            .iter()
            .filter(|t| !t.is_drum)
            .flat_map(|t| t.notes.iter().copied())
            .collect();
        Some(GenerationInput {
            name: name.into(),
            notes: track.notes.clone(),
            key_notes,
            grid: container.beat_grid().clone(),
            tempo: container.tempo_map().clone(),
            source_hash: None,
        })
    }

    pub fn with_source_hash(mut self, hash: impl Into<String>) -> Self {
        self.source_hash = Some(hash.into());
        self
    }
}

/// One rendered (chord, style) part
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedPart {
    /// Output name without extension
    pub file_stem: String,

    /// Strategy name or expansion label, e.g. "Triad_2_Dm"
    pub chord_label: String,

    /// Symbolic chord name, e.g. "Dm"
    pub chord_name: String,
    pub style: String,
    pub category: String,
    pub group: String,
    pub root: String,

    /// Voices the part was rendered for
    pub voice_count: usize,
    pub bpm: f64,
    pub bars: u32,
    pub notes: Vec<NoteEvent>,
}

impl GeneratedPart {
    pub fn file_name(&self) -> String {
        format!("{}.mid", self.file_stem)
    }
}

/// Where a task's chords come from
enum ChordPlan {
    Strategy {
        name: String,
        strategy: Box<dyn ChordStrategy>,
    },
    Degree(ChordDegreeSpec),
}

/// One chord timeline and the styles it is rendered with
struct HarmonyTask {
    plan: ChordPlan,
    styles: Vec<String>,
}

/// Names and sizes describing a task's chords
struct ChordInfo {
    label: String,
    name: String,
    group: String,
    root: String,
    tone_count: usize,
}

impl HarmonyTask {
    fn info(&self, key: &KeyInfo) -> ChordInfo {
        match &self.plan {
            ChordPlan::Strategy { name, strategy } => ChordInfo {
                label: name.clone(),
                name: name.clone(),
                group: STRATEGY_GROUP.to_string(),
                root: key.root_name().to_string(),
                tone_count: strategy.tone_count(),
            },
            ChordPlan::Degree(spec) => ChordInfo {
                label: format!("{}_{}_{}", spec.mode.label(), spec.degree, spec.name),
                name: spec.name.clone(),
                group: spec.mode.label().to_string(),
                root: pitch_class_name(key.root as i32 + spec.root_offset).to_string(),
                tone_count: spec.tone_count(),
            },
        }
    }

    fn source(&self) -> ChordSource<'_> {
        match &self.plan {
            ChordPlan::Strategy { strategy, .. } => ChordSource::Strategy(strategy.as_ref()),
            ChordPlan::Degree(spec) => ChordSource::Degree(spec),
        }
    }
}

/// Batch generator owning its chord and style registries
pub struct EnsembleGenerator {
    chords: ChordRegistry,
    styles: StyleRegistry,
    hook: Option<Box<dyn OverrideHook>>,
}

impl Default for EnsembleGenerator {
    fn default() -> Self {
        EnsembleGenerator::new()
    }
}

impl EnsembleGenerator {
    /// Generator with the built-in chord strategies and styles
    pub fn new() -> Self {
        EnsembleGenerator {
            chords: builtin_chords(),
            styles: builtin_styles(),
            hook: None,
        }
    }

    pub fn with_registries(chords: ChordRegistry, styles: StyleRegistry) -> Self {
        EnsembleGenerator {
            chords,
            styles,
            hook: None,
        }
    }

    /// Add catalog patterns as styles
    pub fn with_patterns(mut self, patterns: Vec<StylePattern>) -> Self {
        register_patterns(&mut self.styles, patterns);
        self
    }

    pub fn with_override_hook(mut self, hook: Box<dyn OverrideHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn chord_names(&self) -> Vec<String> {
        self.chords.names()
    }

    pub fn style_names(&self) -> Vec<String> {
        self.styles.names()
    }

    /// Generate every requested combination into `sink`
    ///
    /// Algorithm:
    /// 1. Analyze the line against its grid
    /// 2. Resolve the key (settings, then override hook, then estimation)
    /// 3. Resolve (chord, style) combinations (preset, filters, or everything)
    /// 4. Per chord task: build a timeline with a fresh voice leader
    /// 5. Per style: filter, validate, render, humanize and write
    ///
    /// Failures are recorded in the report; the batch always runs to the end
    /// unless cancelled.
    pub fn generate(
        &self,
        input: &GenerationInput,
        settings: &GenerationSettings,
        cancel: &CancelToken,
        sink: &mut dyn OutputSink,
    ) -> GenerationReport {
        let run_id = Uuid::new_v4();
        let mut report = GenerationReport::new(run_id, &input.name, input.source_hash.clone());
        let trace = RunTrace::new(run_id, settings.trace_path.clone().map(TraceWriter::new));

        if input.notes.is_empty() {
            log::warn!("'{}' has no notes, nothing to generate", input.name);
            trace.record(Stage::Done, 1.0, "No input notes");
            return report;
        }

        // Stage 1: analysis
        let end_time = input.notes.iter().map(|n| n.end).fold(0.0, f64::max);
        let grid = input.grid.extended_to(end_time);
        let analysis = BeatGridAnalyzer::with_config(&grid, settings.analyzer.clone()).analyze(&input.notes);
        report.groove = Some(analysis.groove.label().to_string());
        log::info!(
            "Analyzed {} notes of '{}' ({})",
            analysis.notes.len(),
            input.name,
            analysis.groove.label()
        );
        trace.record(Stage::Analysis, 0.1, format!("{} notes, {}", analysis.notes.len(), analysis.groove.label()));

        // Stage 2: key
        let features = source_features(&analysis);
        let hint = self
            .hook
            .as_ref()
            .and_then(|hook| hook.suggest(&input.name, &features));
        let key_notes = if input.key_notes.is_empty() {
            &input.notes
        } else {
            &input.key_notes
        };
        let key = resolve_key(settings, hint.as_ref(), key_notes);
        report.key = Some(key.to_string());
        log::info!("Key: {}", key);
        trace.record(Stage::Key, 0.2, key.to_string());

        // Stage 3: combinations and chord tasks
        let combinations = self.resolve_combinations(settings, hint.as_ref());
        let tasks = self.build_tasks(&combinations, settings, &key, &mut report);
        let groups = group_by_beat(&analysis.notes, &grid);
        let bars = bars_spanned(&grid, end_time);
        let bpm = input.tempo.initial_bpm();

        let mut rng = match settings.humanize.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let total = tasks.len().max(1) as f32;
        for (task_index, task) in tasks.iter().enumerate() {
            if cancel.is_cancelled() {
                return self.cancelled(report, &trace);
            }

            let info = task.info(&key);
            let timeline = HarmonyTimeline::build(&groups, task.source(), &key, &mut VoiceLeader::new());
            let progress = 0.2 + 0.8 * task_index as f32 / total;
            trace.record_with(
                Stage::Harmony,
                progress,
                format!("Timeline for {}", info.label),
                serde_json::json!({ "events": timeline.events.len() }),
            );

            if timeline.is_empty() {
                for style in &task.styles {
                    report.skip(&info.label, style, "empty harmony timeline");
                }
                continue;
            }

            for style_name in &task.styles {
                if cancel.is_cancelled() {
                    return self.cancelled(report, &trace);
                }
                let Some(style) = self.styles.create(style_name) else {
                    report.skip(&info.label, style_name, "unknown style");
                    continue;
                };

                let category = style.rename_tag().unwrap_or(DEFAULT_CATEGORY).to_string();
                if let Some(allowed) = &settings.allowed_types {
                    if !allowed.iter().any(|t| t.eq_ignore_ascii_case(&category)) {
                        report.skip(&info.label, style_name, format!("style type '{}' not allowed", category));
                        continue;
                    }
                }

                let voice_count = style.voice_count().unwrap_or(info.tone_count);
                if voice_count < info.tone_count {
                    if settings.strict_validation {
                        report.skip(
                            &info.label,
                            style_name,
                            format!("chord needs {} voices, style has {}", info.tone_count, voice_count),
                        );
                        continue;
                    }
                    log::debug!(
                        "{} has {} voices for a {}-note chord, upper tones wrap",
                        style_name,
                        voice_count,
                        info.tone_count
                    );
                }

                let mut notes = render_part(style.as_ref(), &timeline, &input.tempo, settings.velocity_scale, &mut rng);
                if notes.is_empty() {
                    report.skip(&info.label, style_name, "no notes rendered");
                    continue;
                }
                humanize(&mut notes, &settings.humanize, &mut rng);
                trace.record(Stage::Render, progress, format!("{} x {}: {} notes", info.label, style_name, notes.len()));

                let part = GeneratedPart {
                    file_stem: output_stem(&input.name, style.rename_tag(), &info.label, style_name),
                    chord_label: info.label.clone(),
                    chord_name: info.name.clone(),
                    style: style_name.clone(),
                    category,
                    group: info.group.clone(),
                    root: info.root.clone(),
                    voice_count,
                    bpm,
                    bars,
                    notes,
                };

                match sink.write(&part) {
                    Ok(path) => {
                        trace.record(Stage::Export, progress, path.display().to_string());
                        report.outputs.push(OutputRecord {
                            file_name: part.file_name(),
                            path,
                            category: part.category,
                            instrument: part.style,
                            bars,
                            chord: part.chord_label,
                            root: part.root,
                            group: part.group,
                            comment: format!("{} in {}", part.chord_name, key),
                        });
                    }
                    Err(e) => report.fail(&part.file_name(), e),
                }
            }
        }

        log::info!(
            "Generated {} parts ({} skipped, {} failed)",
            report.outputs.len(),
            report.skipped.len(),
            report.failed.len()
        );
        trace.record_with(
            Stage::Done,
            1.0,
            "Generation finished",
            serde_json::json!({
                "outputs": report.outputs.len(),
                "skipped": report.skipped.len(),
                "failed": report.failed.len(),
            }),
        );
        report
    }

    fn cancelled(&self, mut report: GenerationReport, trace: &RunTrace) -> GenerationReport {
        log::info!("Generation cancelled after {} parts", report.outputs.len());
        report.cancelled = true;
        trace.record(Stage::Done, 1.0, "Cancelled");
        report
    }

    /// (chord, style) pairs: a known preset wins, then filters, then everything
    fn resolve_combinations(
        &self,
        settings: &GenerationSettings,
        hint: Option<&HarmonyOverride>,
    ) -> Vec<(String, String)> {
        if let Some(preset) = &settings.preset {
            match preset_pairs(preset) {
                Some(pairs) => {
                    return pairs
                        .iter()
                        .map(|(chord, style)| (chord.to_string(), style.to_string()))
                        .collect();
                }
                None => log::warn!("Unknown preset '{}', falling back to filters", preset),
            }
        }

        let chords = settings
            .chords
            .clone()
            .or_else(|| hint.and_then(|h| h.chords.clone()))
            .unwrap_or_else(|| self.chords.names());
        let styles = settings
            .styles
            .clone()
            .or_else(|| hint.and_then(|h| h.styles.clone()))
            .unwrap_or_else(|| self.styles.names());

        chords
            .iter()
            .flat_map(|chord| styles.iter().map(move |style| (chord.clone(), style.clone())))
            .collect()
    }

    /// One task per chord strategy, or per degree spec when expanding
    fn build_tasks(
        &self,
        combinations: &[(String, String)],
        settings: &GenerationSettings,
        key: &KeyInfo,
        report: &mut GenerationReport,
    ) -> Vec<HarmonyTask> {
        let mut tasks = Vec::new();

        if !settings.expansion.is_empty() {
            let mut styles: Vec<String> = Vec::new();
            for (_, style) in combinations {
                if !styles.contains(style) {
                    styles.push(style.clone());
                }
            }

            let deriver = ChordDeriver::new(*key);
            for mode in &settings.expansion {
                for spec in deriver.degree_specs(*mode) {
                    tasks.push(HarmonyTask {
                        plan: ChordPlan::Degree(spec),
                        styles: styles.clone(),
                    });
                }
            }
            return tasks;
        }

        let mut chord_order: Vec<&str> = Vec::new();
        for (chord, _) in combinations {
            if !chord_order.contains(&chord.as_str()) {
                chord_order.push(chord);
            }
        }

        for chord in chord_order {
            let styles: Vec<String> = combinations
                .iter()
                .filter(|(c, _)| c == chord)
                .map(|(_, s)| s.clone())
                .collect();

            match self.chords.create(chord) {
                Some(strategy) => tasks.push(HarmonyTask {
                    plan: ChordPlan::Strategy {
                        name: chord.to_string(),
                        strategy,
                    },
                    styles,
                }),
                None => {
                    for style in &styles {
                        report.skip(chord, style, "unknown chord strategy");
                    }
                }
            }
        }

        tasks
    }
}

/// Explicit settings key, then the hook's key, then estimation
fn resolve_key(settings: &GenerationSettings, hint: Option<&HarmonyOverride>, notes: &[NoteEvent]) -> KeyInfo {
    let candidates = [
        ("settings", settings.key.as_deref()),
        ("override hook", hint.and_then(|h| h.key.as_deref())),
    ];

    for (origin, name) in candidates {
        let Some(name) = name else {
            continue;
        };
        match name.parse::<KeyInfo>() {
            Ok(key) => {
                log::debug!("Key '{}' from {}", key, origin);
                return key;
            }
            Err(e) => log::warn!("Ignoring key '{}' from {}: {}", name, origin, e),
        }
    }

    estimate_key(notes)
}

/// Summary handed to the override hook
fn source_features(analysis: &LineAnalysis) -> SourceFeatures {
    let notes = &analysis.notes;
    let count = notes.len().max(1) as f64;
    let pitches = notes.iter().map(|a| a.note.pitch as i32);
    let pitch_range = match (pitches.clone().max(), pitches.min()) {
        (Some(high), Some(low)) => high - low,
        _ => 0,
    };

    SourceFeatures {
        groove: analysis.groove,
        note_count: notes.len(),
        mean_duration_beats: notes.iter().map(|a| a.duration_beats).sum::<f64>() / count,
        mean_velocity: notes.iter().map(|a| a.note.velocity as f64).sum::<f64>() / count,
        pitch_range,
    }
}

/// Play a timeline through a style
///
/// Merged-event styles get one trigger per run of equal chords; the rest get
/// one trigger per bass note. Output is sorted by onset, then pitch.
pub fn render_part(
    style: &dyn Style,
    timeline: &HarmonyTimeline,
    tempo: &TempoMap,
    velocity_scale: f64,
    rng: &mut StdRng,
) -> Vec<NoteEvent> {
    let mut ctx = RenderContext {
        tempo,
        velocity_scale,
        rng,
    };
    let mut notes = Vec::new();

    match style.source() {
        TriggerSource::MergedEvents => {
            for event in timeline.merged() {
                let trigger = Trigger {
                    start: event.start,
                    end: event.end,
                    velocity: event.velocity,
                    sub_beat: SubBeat::Beat,
                    root_pitch: event.root_pitch,
                };
                notes.extend(style.apply(&event.pitches, &trigger, &mut ctx));
            }
        }
        TriggerSource::BassNotes => {
            for event in &timeline.events {
                for bass in &event.bass_notes {
                    let trigger = Trigger {
                        start: bass.note.start,
                        end: bass.note.end,
                        velocity: bass.note.velocity,
                        sub_beat: bass.sub_beat,
                        root_pitch: event.root_pitch,
                    };
                    notes.extend(style.apply(&event.pitches, &trigger, &mut ctx));
                }
            }
        }
    }

    notes.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.pitch.cmp(&b.pitch)));
    notes
}

/// `{source}_{chord}_{style}` with "Bass" in the source replaced by the style's tag
pub fn output_stem(source: &str, rename_tag: Option<&str>, chord_label: &str, style: &str) -> String {
    let source = match rename_tag {
        Some(tag) => source.replace("Bass", tag),
        None => source.to_string(),
    };
    let stem = format!("{}_{}_{}", source, chord_label, style);
    stem.replace('#', "s")
        .chars()
        .filter(|c| !matches!(c, '(' | ')'))
        .map(|c| if matches!(c, '/' | '\\' | ' ') { '_' } else { c })
        .collect()
}

/// Bars touched by the line, at least one
fn bars_spanned(grid: &BeatGrid, end_time: f64) -> u32 {
    let bars = grid.downbeats.iter().filter(|&&d| d < end_time).count();
    bars.max(1) as u32
}
