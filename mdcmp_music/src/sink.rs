// Event sinks: where decoded MDC events go.
//
// The converter emits tempo, notes, controller changes and pitch-wheel
// changes, with times and durations in quarter notes from the start of the
// piece. A sink collects them in memory and serializes everything in one
// `write_to` at the end. `MidiFile` (midi.rs) writes a Standard MIDI File;
// `EventLog` records events for inspection and tests.

use std::io;

pub trait EventSink {
    fn add_tempo(&mut self, track: usize, time: f64, bpm: u32);

    fn add_note(
        &mut self,
        track: usize,
        channel: u8,
        pitch: u8,
        time: f64,
        duration: f64,
        velocity: u8,
    );

    fn add_controller(&mut self, track: usize, channel: u8, time: f64, controller: u8, value: u8);

    /// `value` is a signed 14-bit bend, -8192..=8191, centred on 0.
    fn add_pitch_wheel(&mut self, track: usize, channel: u8, time: f64, value: i16);

    /// Serialize every collected event.
    fn write_to(&self, out: &mut dyn io::Write) -> io::Result<()>;
}

/// One recorded sink call.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Tempo {
        track: usize,
        time: f64,
        bpm: u32,
    },
    Note {
        track: usize,
        channel: u8,
        pitch: u8,
        time: f64,
        duration: f64,
        velocity: u8,
    },
    Controller {
        track: usize,
        channel: u8,
        time: f64,
        controller: u8,
        value: u8,
    },
    PitchWheel {
        track: usize,
        channel: u8,
        time: f64,
        value: i16,
    },
}

/// Records sink calls in order. `write_to` prints one event per line.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pub events: Vec<SinkEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded notes as `(track, channel, pitch, time, duration, velocity)`.
    pub fn notes(&self) -> Vec<(usize, u8, u8, f64, f64, u8)> {
        self.events
            .iter()
            .filter_map(|event| match *event {
                SinkEvent::Note {
                    track,
                    channel,
                    pitch,
                    time,
                    duration,
                    velocity,
                } => Some((track, channel, pitch, time, duration, velocity)),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for EventLog {
    fn add_tempo(&mut self, track: usize, time: f64, bpm: u32) {
        self.events.push(SinkEvent::Tempo { track, time, bpm });
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
        self.events.push(SinkEvent::Note {
            track,
            channel,
            pitch,
            time,
            duration,
            velocity,
        });
    }

    fn add_controller(&mut self, track: usize, channel: u8, time: f64, controller: u8, value: u8) {
        self.events.push(SinkEvent::Controller {
            track,
            channel,
            time,
            controller,
            value,
        });
    }

    fn add_pitch_wheel(&mut self, track: usize, channel: u8, time: f64, value: i16) {
        self.events.push(SinkEvent::PitchWheel {
            track,
            channel,
            time,
            value,
        });
    }

    fn write_to(&self, out: &mut dyn io::Write) -> io::Result<()> {
        for event in &self.events {
            writeln!(out, "{event:?}")?;
        }
        Ok(())
    }
}
