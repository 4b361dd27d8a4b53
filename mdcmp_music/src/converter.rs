// MDC text → sink events.
//
// Conversion is two-phase. `parse_mdc` reads and validates the whole
// document into a `MdcDocument` (header version, line fields, every item's
// subfields, pitch ranges, list cardinalities). Only a document that parses
// completely is handed to the sink, so a malformed file never produces
// partial output.
//
// Emission then walks each line as one output track. The line's time
// starts at its offset and advances by one beat length (per the line's
// granularity) after every item, whatever the item's note durations. Each
// item first emits its automation changes at the item time, then one note
// per pitch at `time + padding`. Velocity-0 entries are rests and emit
// nothing.
//
// The converter owns its sink and a track counter. The counter persists
// across `convert_*` calls, so several MDC files can be layered into one
// output on successive tracks.

use crate::automation::{Automation, AutomationChange};
use crate::config::ConverterConfig;
use crate::duration::{Granularity, symbol_length};
use crate::error::{MdcError, Result};
use crate::format::{
    FIELD_SEPARATOR, ITEM_SEPARATOR, ITEM_SUBFIELDS, KNOWN_FORMAT_VERSIONS, LAYER_SEPARATOR,
    LINE_FIELDS, SUBFIELD_SEPARATOR, TrackKind,
};
use crate::pitch::MAX_PITCH;
use crate::sink::EventSink;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

/// One sounding entry of a pattern item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteHit {
    pub pitch: u8,
    /// Quarter notes.
    pub duration: f64,
    /// Offset from the item's time, in quarter notes.
    pub padding: f64,
    pub velocity: u8,
}

/// One beat of a track line.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternItem {
    pub notes: Vec<NoteHit>,
    pub automation: Automation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackLine {
    pub kind: TrackKind,
    pub granularity: Granularity,
    /// Start time in quarter notes.
    pub offset: f64,
    pub items: Vec<PatternItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MdcDocument {
    pub version: u32,
    pub lines: Vec<TrackLine>,
}

/// Parse and validate a complete MDC document.
///
/// Blank lines are ignored. The first non-blank line is the version
/// header; every following non-blank line is a track line.
pub fn parse_mdc(text: &str) -> Result<MdcDocument> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let Some((_, header)) = lines.next() else {
        return Err(MdcError::MalformedHeader(String::new()));
    };
    let version: u32 = header
        .parse()
        .map_err(|_| MdcError::MalformedHeader(header.to_string()))?;
    if !KNOWN_FORMAT_VERSIONS.contains(&version) {
        return Err(MdcError::UnknownVersion(version));
    }

    let lines = lines
        .map(|(number, line)| parse_line(number, line))
        .collect::<Result<Vec<_>>>()?;
    Ok(MdcDocument { version, lines })
}

fn parse_line(number: usize, line: &str) -> Result<TrackLine> {
    let malformed = |message: String| MdcError::MalformedLine {
        line: number,
        message,
    };

    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).map(str::trim).collect();
    let [_reserved, kind, granularity, offset, pattern] = fields[..] else {
        return Err(malformed(format!(
            "expected {LINE_FIELDS} '{FIELD_SEPARATOR}'-separated fields, found {}",
            fields.len()
        )));
    };

    let kind = TrackKind::parse(kind)
        .ok_or_else(|| malformed(format!("unknown track kind '{kind}'")))?;
    let granularity = Granularity::parse(granularity)?;
    let offset: f64 = offset
        .parse()
        .ok()
        .filter(|o: &f64| o.is_finite())
        .ok_or_else(|| malformed(format!("invalid start offset '{offset}'")))?;

    let items = pattern
        .split(ITEM_SEPARATOR)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| parse_item(number, item))
        .collect::<Result<Vec<_>>>()?;

    Ok(TrackLine {
        kind,
        granularity,
        offset,
        items,
    })
}

fn parse_item(number: usize, item: &str) -> Result<PatternItem> {
    let malformed = |message: String| MdcError::MalformedItem {
        line: number,
        message,
    };

    let subfields: Vec<&str> = item.split(SUBFIELD_SEPARATOR).map(str::trim).collect();
    if subfields.len() != ITEM_SUBFIELDS {
        return Err(malformed(format!(
            "expected {ITEM_SUBFIELDS} subfields, found {} in '{item}'",
            subfields.len()
        )));
    }

    let pitches = layers(subfields[0])
        .map(|token| {
            let pitch: i64 = token
                .parse()
                .map_err(|_| malformed(format!("invalid pitch '{token}'")))?;
            u8::try_from(pitch)
                .ok()
                .filter(|&p| p <= MAX_PITCH)
                .ok_or(MdcError::PitchOutOfRange(pitch))
        })
        .collect::<Result<Vec<u8>>>()?;
    let count = pitches.len();

    let durations = layers(subfields[1])
        .map(symbol_length)
        .collect::<Result<Vec<f64>>>()?;
    let paddings = layers(subfields[2])
        .map(symbol_length)
        .collect::<Result<Vec<f64>>>()?;
    let velocities = layers(subfields[3])
        .map(|token| {
            token
                .parse::<u8>()
                .ok()
                .filter(|&v| v <= 127)
                .ok_or_else(|| malformed(format!("invalid velocity '{token}'")))
        })
        .collect::<Result<Vec<u8>>>()?;

    check_cardinality(number, "durations", count, durations.len())?;
    check_cardinality(number, "paddings", count, paddings.len())?;
    check_cardinality(number, "velocities", count, velocities.len())?;

    let automation = Automation::from_mdc_fields(&subfields[4..])
        .map_err(|err| malformed(err.to_string()))?;

    let notes = pitches
        .iter()
        .enumerate()
        .map(|(i, &pitch)| NoteHit {
            pitch,
            duration: broadcast(&durations, i),
            padding: broadcast(&paddings, i),
            velocity: broadcast(&velocities, i),
        })
        .collect();
    Ok(PatternItem { notes, automation })
}

fn layers(field: &str) -> impl Iterator<Item = &str> {
    field.split(LAYER_SEPARATOR).map(str::trim)
}

/// A list subfield is either one value shared by every pitch, or exactly
/// one value per pitch.
fn check_cardinality(line: usize, field: &'static str, expected: usize, found: usize) -> Result<()> {
    if found == 1 || found == expected {
        Ok(())
    } else {
        Err(MdcError::CardinalityMismatch {
            line,
            field,
            expected,
            found,
        })
    }
}

fn broadcast<T: Copy>(values: &[T], index: usize) -> T {
    if values.len() == 1 {
        values[0]
    } else {
        values[index]
    }
}

/// Drives an `EventSink` from MDC documents.
#[derive(Debug)]
pub struct Converter<S: EventSink> {
    sink: S,
    track: usize,
}

impl<S: EventSink> Converter<S> {
    /// Registers the tempo on track 0 at time 0, whatever the start track.
    pub fn new(config: &ConverterConfig, mut sink: S) -> Self {
        sink.add_tempo(0, 0.0, config.tempo);
        Converter {
            sink,
            track: config.start_track,
        }
    }

    /// Track index the next converted line will be written to.
    pub fn next_track(&self) -> usize {
        self.track
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Convert an MDC document, one output track per line. Returns the
    /// number of tracks written. On error the sink is left untouched.
    pub fn convert_str(&mut self, text: &str) -> Result<usize> {
        let document = parse_mdc(text)?;
        for line in &document.lines {
            self.emit_line(line);
        }
        Ok(document.lines.len())
    }

    pub fn convert_file(&mut self, path: &Path) -> Result<usize> {
        let text = std::fs::read_to_string(path)?;
        let first = self.track;
        let written = self.convert_str(&text)?;
        info!(path = %path.display(), first_track = first, tracks = written, "converted mdc");
        Ok(written)
    }

    /// Serialize the sink to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.sink.write_to(&mut out)?;
        std::io::Write::flush(&mut out)?;
        info!(path = %path.display(), tracks = self.track, "saved");
        Ok(())
    }

    fn emit_line(&mut self, line: &TrackLine) {
        let track = self.track;
        let channel = line.kind.channel();
        let step = line.granularity.beat_length();
        let mut time = line.offset;
        let mut notes = 0usize;

        for item in &line.items {
            for change in item.automation.changes() {
                match change {
                    AutomationChange::Controller { controller, value } => {
                        self.sink.add_controller(track, channel, time, controller, value);
                    }
                    AutomationChange::PitchWheel(value) => {
                        self.sink.add_pitch_wheel(track, channel, time, value);
                    }
                }
            }
            for hit in item.notes.iter().filter(|hit| hit.velocity > 0) {
                self.sink.add_note(
                    track,
                    channel,
                    hit.pitch,
                    time + hit.padding,
                    hit.duration,
                    hit.velocity,
                );
                notes += 1;
            }
            time += step;
        }

        debug!(
            track,
            kind = line.kind.as_str(),
            items = line.items.len(),
            notes,
            "converted line"
        );
        self.track += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{EventLog, SinkEvent};

    fn converter() -> Converter<EventLog> {
        Converter::new(&ConverterConfig::default(), EventLog::new())
    }

    #[test]
    fn test_parse_header_and_lines() {
        let doc = parse_mdc("1\n0|drum|e|0|42!36,e,0,50,n,n,n,n,n,n;0,e,0,0,n,n,n,n,n,n;\n").unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.lines.len(), 1);
        let line = &doc.lines[0];
        assert_eq!(line.kind, TrackKind::Drum);
        assert_eq!(line.granularity, Granularity::Eighth);
        assert_eq!(line.items.len(), 2);
        assert_eq!(line.items[0].notes.len(), 2);
        assert_eq!(line.items[0].notes[1].pitch, 36);
        assert_eq!(line.items[0].notes[1].duration, 0.5);
    }

    #[test]
    fn test_header_errors() {
        assert!(matches!(parse_mdc(""), Err(MdcError::MalformedHeader(_))));
        assert!(matches!(parse_mdc("v1\n"), Err(MdcError::MalformedHeader(_))));
        assert!(matches!(parse_mdc("2\n"), Err(MdcError::UnknownVersion(2))));
        assert_eq!(parse_mdc("\n1\n\n").unwrap().lines.len(), 0);
    }

    #[test]
    fn test_line_errors_carry_line_number() {
        let err = parse_mdc("1\n0|drum|e|0\n").unwrap_err();
        assert!(matches!(err, MdcError::MalformedLine { line: 2, .. }));
        let err = parse_mdc("1\n0|bass|e|0|\n").unwrap_err();
        assert!(matches!(err, MdcError::MalformedLine { line: 2, .. }));
        let err = parse_mdc("1\n0|drum|e|inf|\n").unwrap_err();
        assert!(matches!(err, MdcError::MalformedLine { line: 2, .. }));
        let err = parse_mdc("1\n0|drum|x|0|\n").unwrap_err();
        assert!(matches!(err, MdcError::UnknownToken { kind: "granularity", .. }));
    }

    #[test]
    fn test_item_errors() {
        let err = parse_mdc("1\n0|drum|e|0|42,e,0,50,n,n,n;\n").unwrap_err();
        assert!(matches!(err, MdcError::MalformedItem { line: 2, .. }));
        let err = parse_mdc("1\n0|drum|e|0|128,e,0,50,n,n,n,n,n,n;\n").unwrap_err();
        assert!(matches!(err, MdcError::PitchOutOfRange(128)));
        let err = parse_mdc("1\n0|drum|e|0|42,x,0,50,n,n,n,n,n,n;\n").unwrap_err();
        assert!(matches!(err, MdcError::UnknownToken { .. }));
        let err = parse_mdc("1\n0|drum|e|0|42,e,0,200,n,n,n,n,n,n;\n").unwrap_err();
        assert!(matches!(err, MdcError::MalformedItem { .. }));
        let err = parse_mdc("1\n0|drum|e|0|42,e,0,50,n,n,n,n,n,99;\n").unwrap_err();
        assert!(matches!(err, MdcError::MalformedItem { .. }));
    }

    #[test]
    fn test_cardinality_mismatch() {
        let err = parse_mdc("1\n0|instrument|e|0|48!52!55,e!q,0,50,n,n,n,n,n,n;\n").unwrap_err();
        assert!(matches!(
            err,
            MdcError::CardinalityMismatch {
                line: 2,
                field: "durations",
                expected: 3,
                found: 2
            }
        ));
        let err = parse_mdc("1\n0|instrument|e|0|48,e,0,50!60,n,n,n,n,n,n;\n").unwrap_err();
        assert!(matches!(err, MdcError::CardinalityMismatch { field: "velocities", .. }));
    }

    #[test]
    fn test_time_advances_one_beat_per_item() {
        let mut conv = converter();
        conv.convert_str("1\n0|instrument|q|2|48,h,0,60,n,n,n,n,n,n;0,q,0,0,n,n,n,n,n,n;52,q,S,70,n,n,n,n,n,n;\n")
            .unwrap();
        let notes = conv.into_sink().notes();
        assert_eq!(
            notes,
            vec![(0, 0, 48, 2.0, 2.0, 60), (0, 0, 52, 4.0 + 0.0625, 1.0, 70)]
        );
    }

    #[test]
    fn test_automation_precedes_notes_on_drum_channel() {
        let mut conv = converter();
        conv.convert_str("1\n0|drum|e|0|36,e,0,90,100,n,n,n,n,-64;\n").unwrap();
        let log = conv.into_sink();
        assert!(matches!(log.events[0], SinkEvent::Tempo { track: 0, bpm: 120, .. }));
        assert_eq!(
            log.events[1],
            SinkEvent::Controller { track: 0, channel: 9, time: 0.0, controller: 7, value: 100 }
        );
        assert_eq!(
            log.events[2],
            SinkEvent::Controller { track: 0, channel: 9, time: 0.0, controller: 10, value: 0 }
        );
        assert!(matches!(log.events[3], SinkEvent::Note { channel: 9, pitch: 36, .. }));
    }

    #[test]
    fn test_track_counter_persists_across_documents() {
        let config = ConverterConfig {
            tempo: 90,
            start_track: 2,
        };
        let mut conv = Converter::new(&config, EventLog::new());
        let doc = "1\n0|drum|e|0|36,e,0,50,n,n,n,n,n,n;\n0|instrument|e|0|48,e,0,50,n,n,n,n,n,n;\n";
        assert_eq!(conv.convert_str(doc).unwrap(), 2);
        assert_eq!(conv.convert_str(doc).unwrap(), 2);
        assert_eq!(conv.next_track(), 6);
        let tracks: Vec<usize> = conv.sink().notes().iter().map(|n| n.0).collect();
        assert_eq!(tracks, vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_tempo_sits_on_track_zero_after_start_track() {
        let config = ConverterConfig {
            tempo: 90,
            start_track: 2,
        };
        let conv = Converter::new(&config, EventLog::new());
        assert!(matches!(
            conv.sink().events[..],
            [SinkEvent::Tempo { track: 0, bpm: 90, .. }]
        ));
    }

    #[test]
    fn test_negative_start_offset_is_accepted() {
        let doc = parse_mdc("1\n0|instrument|e|-1|48,e,0,50,n,n,n,n,n,n;\n").unwrap();
        assert_eq!(doc.lines[0].offset, -1.0);
        let mut conv = converter();
        conv.convert_str("1\n0|instrument|e|-1|0,e,0,0,n,n,n,n,n,n;0,e,0,0,n,n,n,n,n,n;48,e,0,50,n,n,n,n,n,n;\n")
            .unwrap();
        assert_eq!(conv.into_sink().notes(), vec![(0, 0, 48, 0.0, 0.5, 50)]);
    }

    #[test]
    fn test_malformed_document_emits_nothing() {
        let mut conv = converter();
        let before = conv.sink().events.len();
        let doc = "1\n0|drum|e|0|36,e,0,50,n,n,n,n,n,n;\n0|drum|e|0|36,e,0,50,n,n;\n";
        assert!(conv.convert_str(doc).is_err());
        assert_eq!(conv.sink().events.len(), before);
        assert_eq!(conv.next_track(), 0);
    }

    #[test]
    fn test_velocity_zero_is_rest() {
        let mut conv = converter();
        conv.convert_str("1\n0|instrument|e|0|48!52,e,0,0!40,n,n,n,n,n,n;\n").unwrap();
        assert_eq!(conv.into_sink().notes(), vec![(0, 0, 52, 0.0, 0.5, 40)]);
    }
}
