// Standard MIDI File Input - Read notes, tempo and beat grid using midly
// Converts tick-based events to seconds through the file's tempo map

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use thiserror::Error;
use crate::groove::{BeatGrid, DEFAULT_BPM, TempoChange, TempoMap, TimeSignature};
use crate::notes::NoteEvent;

/// MIDI channel reserved for drums (10, zero-based 9)
const DRUM_CHANNEL: u8 = 9;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse MIDI: {0}")]
    MidiError(#[from] midly::Error),

    #[error("Unsupported timing: {0}")]
    UnsupportedTiming(String),
}

/// One track of notes
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTrack {
    pub name: String,

    /// All notes are on the drum channel
    pub is_drum: bool,

    /// Notes sorted by onset
    pub notes: Vec<NoteEvent>,
}

/// Anything that can supply notes and timing
pub trait MidiContainer {
    fn tracks(&self) -> &[SourceTrack];
    fn beat_grid(&self) -> &BeatGrid;
    fn tempo_map(&self) -> &TempoMap;

    /// Last note release in seconds
    fn end_time(&self) -> f64 {
        self.tracks()
            .iter()
            .flat_map(|t| t.notes.iter())
            .map(|n| n.end)
            .fold(0.0, f64::max)
    }

    fn tempo_at(&self, time: f64) -> f64 {
        self.tempo_map().tempo_at(time)
    }
}

/// Pick the track to analyze: first melodic track with notes, else any track with notes
pub fn analysis_track<C: MidiContainer + ?Sized>(container: &C) -> Option<&SourceTrack> {
    let tracks = container.tracks();
    tracks
        .iter()
        .find(|t| !t.is_drum && !t.notes.is_empty())
        .or_else(|| tracks.iter().find(|t| !t.notes.is_empty()))
}

/// A parsed Standard MIDI File
#[derive(Debug, Clone)]
pub struct SmfContainer {
    tracks: Vec<SourceTrack>,
    grid: BeatGrid,
    tempo: TempoMap,
    time_signature: TimeSignature,
}

impl SmfContainer {
    /// Read and parse a file from disk
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let bytes = std::fs::read(path)?;
        SmfContainer::parse(&bytes)
    }

    /// Parse MIDI bytes
    ///
    /// Algorithm:
    /// 1. Collect tempo and time signature changes from every track
    /// 2. Build a tick-to-seconds converter from the tempo changes
    /// 3. Pair note-on/note-off per (channel, key), first in first out
    /// 4. Lay beats and downbeats from tick 0 past the last event
    pub fn parse(bytes: &[u8]) -> Result<Self, SourceError> {
        let smf = Smf::parse(bytes)?;
        let ppq = match smf.header.timing {
            Timing::Metrical(ppq) => ppq.as_int().max(1) as u32,
            Timing::Timecode(fps, sub) => {
                return Err(SourceError::UnsupportedTiming(format!(
                    "SMPTE {} fps / {} subframes",
                    fps.as_f32(),
                    sub
                )));
            }
        };

        let mut tempo_ticks: Vec<(u64, u32)> = Vec::new();
        let mut time_signature: Option<TimeSignature> = None;
        let mut last_tick = 0u64;

        for track in &smf.tracks {
            let mut tick = 0u64;
            for event in track {
                tick += event.delta.as_int() as u64;
                match event.kind {
                    TrackEventKind::Meta(MetaMessage::Tempo(us)) => tempo_ticks.push((tick, us.as_int())),
                    TrackEventKind::Meta(MetaMessage::TimeSignature(num, den_pow, _, _)) => {
                        if time_signature.is_none() {
                            time_signature = Some(TimeSignature::new(num, 1u8 << den_pow.min(5)));
                        }
                    }
                    _ => {}
                }
            }
            last_tick = last_tick.max(tick);
        }

        let clock = TickClock::new(ppq, tempo_ticks);
        let tracks: Vec<SourceTrack> = smf
            .tracks
            .iter()
            .enumerate()
            .map(|(i, track)| read_track(i, track, &clock))
            .collect();

        let time_signature = time_signature.unwrap_or_default();
        let beat_ticks = (ppq as u64 * 4 / time_signature.denominator.max(1) as u64).max(1);
        let beats_per_bar = time_signature.beats_per_bar().max(1) as u64;

        let mut beats = Vec::new();
        let mut downbeats = Vec::new();
        let mut beat_index = 0u64;
        loop {
            let tick = beat_index * beat_ticks;
            let time = clock.seconds(tick);
            if beat_index % beats_per_bar == 0 {
                downbeats.push(time);
            }
            beats.push(time);
            if tick > last_tick {
                break;
            }
            beat_index += 1;
        }

        let tempo = TempoMap::new(clock.tempo_changes());
        let note_count: usize = tracks.iter().map(|t| t.notes.len()).sum();
        log::info!(
            "Parsed MIDI: {} tracks, {} notes, {} beats, {:.1} BPM",
            tracks.len(),
            note_count,
            beats.len(),
            tempo.initial_bpm()
        );

        Ok(SmfContainer {
            tracks,
            grid: BeatGrid::new(beats, downbeats),
            tempo,
            time_signature,
        })
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }
}

impl MidiContainer for SmfContainer {
    fn tracks(&self) -> &[SourceTrack] {
        &self.tracks
    }

    fn beat_grid(&self) -> &BeatGrid {
        &self.grid
    }

    fn tempo_map(&self) -> &TempoMap {
        &self.tempo
    }
}

fn read_track(index: usize, track: &[midly::TrackEvent<'_>], clock: &TickClock) -> SourceTrack {
    let mut name = format!("Track {}", index + 1);
    let mut open: HashMap<(u8, u8), VecDeque<(u64, u8)>> = HashMap::new();
    let mut notes = Vec::new();
    let mut channels_seen = Vec::new();
    let mut tick = 0u64;

    for event in track {
        tick += event.delta.as_int() as u64;
        match event.kind {
            TrackEventKind::Meta(MetaMessage::TrackName(raw)) => {
                name = String::from_utf8_lossy(raw).trim().to_string();
            }
            TrackEventKind::Midi { channel, message } => {
                let channel = channel.as_int();
                match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        if !channels_seen.contains(&channel) {
                            channels_seen.push(channel);
                        }
                        open.entry((channel, key.as_int()))
                            .or_default()
                            .push_back((tick, vel.as_int()));
                    }
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        let pending = open
                            .get_mut(&(channel, key.as_int()))
                            .and_then(|queue| queue.pop_front());
                        if let Some((start_tick, velocity)) = pending {
                            let start = clock.seconds(start_tick);
                            let end = clock.seconds(tick);
                            if end > start {
                                notes.push(NoteEvent::new(key.as_int(), start, end, velocity));
                            }
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    let dangling: usize = open.values().map(|q| q.len()).sum();
    if dangling > 0 {
        log::warn!("{}: {} notes without note-off dropped", name, dangling);
    }

    notes.sort_by(|a, b| {
        a.start
            .partial_cmp(&b.start)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    SourceTrack {
        is_drum: !channels_seen.is_empty() && channels_seen.iter().all(|&c| c == DRUM_CHANNEL),
        name,
        notes,
    }
}

/// Tick to seconds conversion over a tempo map
struct TickClock {
    ppq: u32,

    /// (tick, seconds at tick, microseconds per quarter)
    segments: Vec<(u64, f64, u32)>,
}

impl TickClock {
    fn new(ppq: u32, mut changes: Vec<(u64, u32)>) -> Self {
        changes.sort_by_key(|(tick, _)| *tick);
        let default_us = (60_000_000.0 / DEFAULT_BPM) as u32;

        let mut segments = vec![(0u64, 0.0f64, default_us)];
        for (tick, us) in changes {
            if us == 0 {
                continue;
            }
            let seconds = Self::seconds_in(&segments, ppq, tick);
            match segments.last_mut() {
                Some(last) if last.0 == tick => last.2 = us,
                _ => segments.push((tick, seconds, us)),
            }
        }

        TickClock { ppq, segments }
    }

    fn seconds_in(segments: &[(u64, f64, u32)], ppq: u32, tick: u64) -> f64 {
        let (start_tick, start_seconds, us) = segments
            .iter()
            .rev()
            .find(|(t, _, _)| *t <= tick)
            .copied()
            .unwrap_or((0, 0.0, 500_000));
        start_seconds + (tick - start_tick) as f64 * us as f64 / 1_000_000.0 / ppq as f64
    }

    fn seconds(&self, tick: u64) -> f64 {
        Self::seconds_in(&self.segments, self.ppq, tick)
    }

    fn tempo_changes(&self) -> Vec<TempoChange> {
        self.segments
            .iter()
            .map(|&(_, seconds, us)| TempoChange {
                time: seconds,
                bpm: 60_000_000.0 / us as f64,
            })
            .collect()
    }
}
