// MIDI Export - Write rendered note streams as Standard MIDI Files using midly
// One meta track (tempo, time signature) plus one note track per part

use serde::{Deserialize, Serialize};
use midly::{Smf, Header, Track, TrackEvent, TrackEventKind, MetaMessage, MidiMessage, Timing};
use thiserror::Error;
use crate::notes::NoteEvent;

/// Errors that can occur while writing MIDI
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Output file is locked or read-only: {0}")]
    Locked(String),

    #[error("Invalid tempo: {0}")]
    InvalidTempo(f64),
}

/// MIDI export options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiExportOptions {
    /// Pulses per quarter note (PPQ) - typically 480 or 960
    /// Higher values = better timing resolution
    pub ppq: u16,

    /// Include tempo metadata
    pub include_tempo: bool,

    /// Include time signature metadata
    pub include_time_signature: bool,

    /// Beats per bar written to the time signature
    pub beats_per_bar: u8,

    /// Include track names
    pub track_names: bool,

    /// MIDI channel for the notes (0-15)
    pub channel: u8,
}

impl Default for MidiExportOptions {
    fn default() -> Self {
        MidiExportOptions {
            ppq: 480,
            include_tempo: true,
            include_time_signature: true,
            beats_per_bar: 4,
            track_names: true,
            channel: 0,
        }
    }
}

/// Export one part to MIDI file bytes
///
/// Note times are seconds; they are placed on ticks at `bpm`, which is also
/// written as the file tempo, so playback timing matches the input exactly.
pub fn export_part(
    notes: &[NoteEvent],
    bpm: f64,
    track_name: &str,
    options: &MidiExportOptions,
) -> Result<Vec<u8>, ExportError> {
    if !(bpm.is_finite() && bpm > 0.0) {
        return Err(ExportError::InvalidTempo(bpm));
    }

    let header = Header {
        format: midly::Format::Parallel,
        timing: Timing::Metrical(options.ppq.into()),
    };
    let ticks_per_second = calculate_ticks_per_second(bpm, options.ppq);

    // Track 0: Tempo and time signature metadata
    let mut meta_track = Track::new();
    if options.track_names {
        add_track_name(&mut meta_track, 0, "META");
    }
    if options.include_tempo {
        add_tempo(&mut meta_track, 0, bpm);
    }
    if options.include_time_signature {
        add_time_signature(&mut meta_track, 0, options.beats_per_bar);
    }
    add_end_of_track(&mut meta_track, 0);

    let note_track = create_note_track(notes, track_name, ticks_per_second, options);

    let smf = Smf {
        header,
        tracks: vec![meta_track, note_track],
    };

    let mut bytes = Vec::new();
    smf.write_std(&mut bytes)?;
    Ok(bytes)
}

/// Create the note track
fn create_note_track<'a>(
    notes: &[NoteEvent],
    track_name: &'a str,
    ticks_per_second: f64,
    options: &MidiExportOptions,
) -> Track<'a> {
    let channel = options.channel.min(15);
    let mut track = Track::new();

    if options.track_names {
        add_track_name(&mut track, 0, track_name);
    }

    // (tick, is_note_on, kind); note-offs sort before note-ons on the same tick
    let mut events: Vec<(u32, bool, TrackEventKind<'a>)> = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        let tick_on = seconds_to_ticks(note.start, ticks_per_second);
        let tick_off = seconds_to_ticks(note.end, ticks_per_second).max(tick_on + 1);
        let key = note.pitch.min(127);

        events.push((
            tick_on,
            true,
            TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOn {
                    key: key.into(),
                    vel: note.velocity.clamp(1, 127).into(),
                },
            },
        ));
        events.push((
            tick_off,
            false,
            TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOff {
                    key: key.into(),
                    vel: 0.into(),
                },
            },
        ));
    }

    events.sort_by_key(|(tick, is_on, _)| (*tick, *is_on));

    // Convert to delta times
    let mut last_tick = 0;
    for (tick, _, kind) in events {
        track.push(TrackEvent {
            delta: tick.saturating_sub(last_tick).into(),
            kind,
        });
        last_tick = tick;
    }

    add_end_of_track(&mut track, 0);
    track
}

/// Ticks per second at a tempo
fn calculate_ticks_per_second(bpm: f64, ppq: u16) -> f64 {
    ppq as f64 * bpm / 60.0
}

fn seconds_to_ticks(seconds: f64, ticks_per_second: f64) -> u32 {
    (seconds.max(0.0) * ticks_per_second).round() as u32
}

/// Add track name to track
fn add_track_name<'a>(track: &mut Track<'a>, delta: u32, name: &'a str) {
    track.push(TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
    });
}

/// Add tempo meta message
fn add_tempo(track: &mut Track<'_>, delta: u32, bpm: f64) {
    // Microseconds per quarter note, 24-bit
    let us_per_quarter = ((60_000_000.0 / bpm).round() as u32).min(0x00FF_FFFF);

    track.push(TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter.into())),
    });
}

/// Add time signature meta message (quarter-note beat)
fn add_time_signature(track: &mut Track<'_>, delta: u32, beats_per_bar: u8) {
    track.push(TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::TimeSignature(beats_per_bar.max(1), 2, 24, 8)),
    });
}

/// Add end of track message
fn add_end_of_track(track: &mut Track<'_>, delta: u32) {
    track.push(TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
}
