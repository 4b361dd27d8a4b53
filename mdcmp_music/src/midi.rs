// Standard MIDI File output.
//
// `MidiFile` is the event sink the CLI writes through. Events are buffered
// per track with absolute tick times and only turned into a delta-timed SMF
// when written, so the converter may emit them in any order. Within one
// tick the order is: tempo, note-offs, controller and pitch-wheel changes,
// note-ons. Releasing before re-striking keeps back-to-back repeats of the
// same pitch from cutting each other off.
//
// Uses the `midly` crate for MIDI writing. Output is SMF Format 1
// (multi-track) at 480 ticks per quarter note.

use crate::sink::EventSink;
use midly::{
    Format, Header, MetaMessage, MidiMessage, PitchBend, Smf, Timing, Track, TrackEvent,
    TrackEventKind,
    num::{u4, u7, u14, u15, u24, u28},
};
use std::io;
use tracing::debug;

/// Ticks per quarter note in MIDI output.
pub const TICKS_PER_QUARTER: u16 = 480;

/// Largest value a tempo meta event can carry (24 bits of µs per quarter).
const MAX_TEMPO_MICROSECONDS: u32 = 0xFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MidiEvent {
    /// Microseconds per quarter note.
    Tempo(u32),
    NoteOff { channel: u8, key: u8 },
    Controller { channel: u8, controller: u8, value: u8 },
    /// Unsigned 14-bit bend, 8192 = centre.
    PitchBend { channel: u8, bend: u16 },
    NoteOn { channel: u8, key: u8, vel: u8 },
}

impl MidiEvent {
    /// Sort rank among events that share a tick.
    fn rank(&self) -> u8 {
        match self {
            MidiEvent::Tempo(_) => 0,
            MidiEvent::NoteOff { .. } => 1,
            MidiEvent::Controller { .. } | MidiEvent::PitchBend { .. } => 2,
            MidiEvent::NoteOn { .. } => 3,
        }
    }

    fn kind(self) -> TrackEventKind<'static> {
        let midi = |channel: u8, message| TrackEventKind::Midi {
            channel: u4::new(channel & 0x0F),
            message,
        };
        match self {
            MidiEvent::Tempo(us) => TrackEventKind::Meta(MetaMessage::Tempo(u24::new(us))),
            MidiEvent::NoteOff { channel, key } => midi(
                channel,
                MidiMessage::NoteOff {
                    key: u7::new(key),
                    vel: u7::new(0),
                },
            ),
            MidiEvent::Controller {
                channel,
                controller,
                value,
            } => midi(
                channel,
                MidiMessage::Controller {
                    controller: u7::new(controller),
                    value: u7::new(value),
                },
            ),
            MidiEvent::PitchBend { channel, bend } => midi(
                channel,
                MidiMessage::PitchBend {
                    bend: PitchBend(u14::new(bend)),
                },
            ),
            MidiEvent::NoteOn { channel, key, vel } => midi(
                channel,
                MidiMessage::NoteOn {
                    key: u7::new(key),
                    vel: u7::new(vel),
                },
            ),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Timed {
    tick: u32,
    event: MidiEvent,
}

/// In-memory multi-track MIDI file.
#[derive(Debug, Clone, Default)]
pub struct MidiFile {
    tracks: Vec<Vec<Timed>>,
}

impl MidiFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracks written: one past the highest track touched, and at
    /// least one.
    pub fn track_count(&self) -> usize {
        self.tracks.len().max(1)
    }

    fn push(&mut self, track: usize, tick: u32, event: MidiEvent) {
        if self.tracks.len() <= track {
            self.tracks.resize_with(track + 1, Vec::new);
        }
        self.tracks[track].push(Timed { tick, event });
    }

    /// Build the delta-timed SMF.
    pub fn to_smf(&self) -> Smf<'static> {
        let mut smf = Smf::new(Header::new(
            Format::Parallel,
            Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
        ));
        for index in 0..self.track_count() {
            let mut events = self.tracks.get(index).cloned().unwrap_or_default();
            events.sort_by_key(|t| (t.tick, t.event.rank()));

            let mut track: Track<'static> = Vec::with_capacity(events.len() + 1);
            let mut last_tick = 0u32;
            for timed in events {
                track.push(TrackEvent {
                    delta: u28::new(timed.tick - last_tick),
                    kind: timed.event.kind(),
                });
                last_tick = timed.tick;
            }
            track.push(TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
            });
            smf.tracks.push(track);
        }
        smf
    }
}

/// Quarter-note time → ticks, rounded to the nearest tick.
fn to_tick(time: f64) -> u32 {
    (time.max(0.0) * f64::from(TICKS_PER_QUARTER)).round() as u32
}

impl EventSink for MidiFile {
    fn add_tempo(&mut self, track: usize, time: f64, bpm: u32) {
        let us = (60_000_000 / bpm.max(1)).min(MAX_TEMPO_MICROSECONDS);
        self.push(track, to_tick(time), MidiEvent::Tempo(us));
    }

    fn add_note(
        &mut self,
        track: usize,
        channel: u8,
        pitch: u8,
        time: f64,
        duration: f64,
        velocity: u8,
    ) {
        let start = to_tick(time);
        let end = to_tick(time + duration);
        if end <= start {
            debug!(track, pitch, time, "dropping zero-length note");
            return;
        }
        let key = pitch.min(127);
        let vel = velocity.min(127);
        self.push(track, start, MidiEvent::NoteOn { channel, key, vel });
        self.push(track, end, MidiEvent::NoteOff { channel, key });
    }

    fn add_controller(&mut self, track: usize, channel: u8, time: f64, controller: u8, value: u8) {
        self.push(
            track,
            to_tick(time),
            MidiEvent::Controller {
                channel,
                controller: controller.min(127),
                value: value.min(127),
            },
        );
    }

    fn add_pitch_wheel(&mut self, track: usize, channel: u8, time: f64, value: i16) {
        let bend = (i32::from(value).clamp(-8192, 8191) + 8192) as u16;
        self.push(track, to_tick(time), MidiEvent::PitchBend { channel, bend });
    }

    fn write_to(&self, out: &mut dyn io::Write) -> io::Result<()> {
        self.to_smf().write_std(out)
    }
}
