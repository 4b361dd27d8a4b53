// MDC text format constants shared by the encoder and the converter.
//
// Version 1 layout:
//
//   1
//   <reserved>|<kind>|<granularity>|<offset>|<item>;<item>;...;
//
// where each item is ten comma-separated subfields:
//
//   pitches,durations,paddings,velocities,volume,pitchwheel,modwheel,expression,sustain,pan
//
// The first four subfields are a scalar or a `!`-joined list (one entry per
// layered pitch, or a scalar shared by every pitch). The last six are
// track-beat automation scalars or the no-op marker `n`.

use crate::drums::DRUM_CHANNEL;

pub const FORMAT_VERSION: u32 = 1;
pub const KNOWN_FORMAT_VERSIONS: [u32; 1] = [FORMAT_VERSION];

/// First field of every track line. Carried but never interpreted.
pub const RESERVED_MARKER: &str = "0";

pub const FIELD_SEPARATOR: char = '|';
pub const ITEM_SEPARATOR: char = ';';
pub const SUBFIELD_SEPARATOR: char = ',';
pub const LAYER_SEPARATOR: char = '!';

/// Fields per track line and subfields per pattern item.
pub const LINE_FIELDS: usize = 5;
pub const ITEM_SUBFIELDS: usize = 10;

/// MIDI channel (0-based) for instrument lines.
pub const INSTRUMENT_CHANNEL: u8 = 0;

/// Whether a line holds fixed-pitch percussion or pitched notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Drum,
    Instrument,
}

impl TrackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackKind::Drum => "drum",
            TrackKind::Instrument => "instrument",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "drum" => Some(TrackKind::Drum),
            "instrument" => Some(TrackKind::Instrument),
            _ => None,
        }
    }

    pub fn channel(self) -> u8 {
        match self {
            TrackKind::Drum => DRUM_CHANNEL,
            TrackKind::Instrument => INSTRUMENT_CHANNEL,
        }
    }
}
