// Grid → MDC text.
//
// Encoding walks every known track in ascending order and writes one line
// per track, covering bars 0..=last (gaps are filled first, so every track
// line has the same number of items). Each grid beat becomes one pattern
// item:
//
// - empty slot: a rest item, `0,<base symbol>,0,0,n,n,n,n,n,n`
// - otherwise every event is resolved to pitches (drum table, then chord
//   theory), each pitch gets its event's duration symbol, padding and
//   velocity, and the beat's automation is the overlay of its events'.
//
// Columns that hold one repeated value collapse to a scalar. The pitch
// column only collapses when every other column did, so a list of
// identical pitches survives as a list when the velocities differ.
//
// Randomness (velocity jitter, humanize padding) comes only from the
// caller's `MdcRng`, drawn in slot order: padding first, then velocity,
// once per event. The same grid, options and seed give identical text.

use crate::automation::Automation;
use crate::chords::ChordTheory;
use crate::config::EncodeOptions;
use crate::drums::drum_pitch;
use crate::duration::{Granularity, NO_PADDING};
use crate::error::{MdcError, Result};
use crate::format::{
    FIELD_SEPARATOR, FORMAT_VERSION, ITEM_SEPARATOR, LAYER_SEPARATOR, RESERVED_MARKER,
    SUBFIELD_SEPARATOR, TrackKind,
};
use crate::grid::{Event, Grid, IsChord};
use crate::pitch::resolve_pitches;
use mdcmp_prng::MdcRng;
use std::path::Path;
use tracing::{debug, info};

/// Padding symbols drawn from when humanizing, weighted towards no offset.
const HUMANIZE_PADDINGS: [&str; 7] = [NO_PADDING, NO_PADDING, NO_PADDING, NO_PADDING, "H", "S", "t"];

const MAX_VELOCITY: u8 = 127;

/// Render `grid` as an MDC document (header line plus one line per track).
///
/// The grid is gap-filled in place before rendering. Fails without output
/// on an unresolvable value or a duration with no symbol.
pub fn encode_grid(
    grid: &mut Grid,
    options: &EncodeOptions,
    chords: &dyn ChordTheory,
    rng: &mut MdcRng,
) -> Result<String> {
    grid.fill_gaps();
    let mut out = format!("{FORMAT_VERSION}\n");
    for track in grid.track_indices() {
        let line = encode_track(grid, track, options, chords, rng)?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Encode `grid` and write it to `path`. Nothing is written on error.
pub fn write_mdc(
    grid: &mut Grid,
    path: &Path,
    options: &EncodeOptions,
    chords: &dyn ChordTheory,
    rng: &mut MdcRng,
) -> Result<()> {
    let text = encode_grid(grid, options, chords, rng)?;
    std::fs::write(path, &text)?;
    info!(
        path = %path.display(),
        tracks = grid.track_indices().len(),
        bars = grid.bar_indices().len(),
        "wrote mdc"
    );
    Ok(())
}

/// A track is `drum` when it has at least one event and every event on it
/// is a drum name.
pub fn track_kind(grid: &Grid, track: usize) -> TrackKind {
    let mut events = grid
        .bar_indices()
        .into_iter()
        .filter_map(|bar| grid.track(bar, track))
        .flatten()
        .flatten()
        .peekable();
    if events.peek().is_none() {
        return TrackKind::Instrument;
    }
    if events.all(|e| drum_pitch(&e.value).is_some()) {
        TrackKind::Drum
    } else {
        TrackKind::Instrument
    }
}

fn encode_track(
    grid: &Grid,
    track: usize,
    options: &EncodeOptions,
    chords: &dyn ChordTheory,
    rng: &mut MdcRng,
) -> Result<String> {
    let granularity = grid.granularity();
    let kind = track_kind(grid, track);
    let mut line = format!(
        "{RESERVED_MARKER}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}",
        kind.as_str(),
        granularity.code(),
        options.base_offset,
    );
    let mut items = 0usize;
    for bar in grid.bar_indices() {
        match grid.track(bar, track) {
            Some(slots) => {
                for slot in slots {
                    if slot.is_empty() {
                        line.push_str(&rest_item(granularity));
                    } else {
                        line.push_str(&encode_beat(slot, granularity, options, chords, rng)?);
                    }
                    items += 1;
                }
            }
            None => {
                for _ in 0..grid.beats_per_bar() {
                    line.push_str(&rest_item(granularity));
                    items += 1;
                }
            }
        }
    }
    debug!(track, kind = kind.as_str(), items, "encoded track");
    Ok(line)
}

fn rest_item(granularity: Granularity) -> String {
    let automation = Automation::default()
        .to_mdc_fields()
        .join(SUBFIELD_SEPARATOR.to_string().as_str());
    format!(
        "0{SUBFIELD_SEPARATOR}{}{SUBFIELD_SEPARATOR}0{SUBFIELD_SEPARATOR}0{SUBFIELD_SEPARATOR}{automation}{ITEM_SEPARATOR}",
        granularity.base_symbol()
    )
}

fn encode_beat(
    slot: &[Event],
    granularity: Granularity,
    options: &EncodeOptions,
    chords: &dyn ChordTheory,
    rng: &mut MdcRng,
) -> Result<String> {
    let mut pitches = Vec::new();
    let mut durations = Vec::new();
    let mut paddings = Vec::new();
    let mut velocities = Vec::new();
    let mut automation = Automation::default();

    for event in slot {
        let resolved = event_pitches(event, chords)?;
        let duration = granularity.duration_symbol(event.duration)?;
        let padding = if options.humanize {
            rng.choose(&HUMANIZE_PADDINGS).copied().unwrap_or(NO_PADDING)
        } else {
            NO_PADDING
        };
        let velocity = jittered_velocity(event.velocity, options.velocity_jitter, rng);
        for pitch in resolved {
            pitches.push(pitch.to_string());
            durations.push(duration.to_string());
            paddings.push(padding.to_string());
            velocities.push(velocity.to_string());
        }
        automation.overlay(&event.automation);
    }

    let others = [
        collapse(&durations),
        collapse(&paddings),
        collapse(&velocities),
    ];
    let pitch_column = if others.iter().all(|c| !c.contains(LAYER_SEPARATOR)) {
        collapse(&pitches)
    } else {
        join_layers(&pitches)
    };

    let mut fields = vec![pitch_column];
    fields.extend(others);
    fields.extend(automation.to_mdc_fields());
    let mut item = fields.join(SUBFIELD_SEPARATOR.to_string().as_str());
    item.push(ITEM_SEPARATOR);
    Ok(item)
}

/// MIDI pitches an event sounds: a drum's fixed pitch, or the resolved
/// chord tones (only the root when `IsChord::No`).
fn event_pitches(event: &Event, chords: &dyn ChordTheory) -> Result<Vec<u8>> {
    if let Some(pitch) = drum_pitch(&event.value) {
        return Ok(vec![pitch]);
    }
    let mut pitches = resolve_pitches(&event.value, event.octave, chords)?;
    if pitches.is_empty() {
        return Err(MdcError::unknown("note", event.value.as_str()));
    }
    if event.is_chord == IsChord::No {
        pitches.truncate(1);
    }
    Ok(pitches)
}

/// Velocity plus a uniform offset in `[-jitter, jitter]`. A negative result
/// falls back to the unjittered velocity; the result never exceeds 127.
/// Velocity 0 marks a silenced layer and is never jittered.
fn jittered_velocity(velocity: u8, jitter: u8, rng: &mut MdcRng) -> u8 {
    let velocity = velocity.min(MAX_VELOCITY);
    if jitter == 0 || velocity == 0 {
        return velocity;
    }
    let spread = i32::from(jitter);
    let jittered = i32::from(velocity) + rng.range_i32_inclusive(-spread, spread);
    if jittered < 0 {
        velocity
    } else {
        jittered.min(i32::from(MAX_VELOCITY)) as u8
    }
}

/// One value if every entry is the same, otherwise the `!`-joined list.
fn collapse(values: &[String]) -> String {
    match values.first() {
        Some(first) if values.iter().all(|v| v == first) => first.clone(),
        _ => join_layers(values),
    }
}

fn join_layers(values: &[String]) -> String {
    values.join(LAYER_SEPARATOR.to_string().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chords::ShorthandChords;
    use crate::grid::Selection;

    fn encode(grid: &mut Grid) -> String {
        encode_grid(grid, &EncodeOptions::default(), &ShorthandChords, &mut MdcRng::new(0))
            .unwrap()
    }

    fn items(line: &str) -> Vec<&str> {
        let pattern = line.split('|').nth(4).unwrap();
        pattern.split(';').filter(|s| !s.is_empty()).collect()
    }

    #[test]
    fn test_drum_line_layers_and_collapses() {
        let mut grid = Grid::default();
        grid.add(&Selection::new(&[0], &[0], &[]).all_beats(), &Event::new("hat1"))
            .unwrap();
        grid.add(
            &Selection::new(&[0], &[0], &[0, 4]),
            &Event::new("kick1").with_duration(2),
        )
        .unwrap();
        let text = encode(&mut grid);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "1");
        assert!(lines[1].starts_with("0|drum|e|0|"), "{}", lines[1]);
        let items = items(lines[1]);
        assert_eq!(items.len(), 8);
        assert_eq!(items[0], "42!36,e!q,0,50,n,n,n,n,n,n");
        assert_eq!(items[4], items[0]);
        assert_eq!(items[1], "42,e,0,50,n,n,n,n,n,n");
    }

    #[test]
    fn test_chord_item() {
        let mut grid = Grid::default();
        let event = Event::new("Cmaj7").with_duration(2).with_velocity(60);
        grid.add(&Selection::new(&[0], &[0], &[0]), &event).unwrap();
        let text = encode(&mut grid);
        let line = text.lines().nth(1).unwrap();
        assert!(line.starts_with("0|instrument|e|0|"));
        let items = items(line);
        assert_eq!(items[0], "48!52!55!59,q,0,60,n,n,n,n,n,n");
        assert_eq!(items[1], "0,e,0,0,n,n,n,n,n,n");
    }

    #[test]
    fn test_root_only_when_not_chord() {
        let mut grid = Grid::default();
        let event = Event::new("Am").with_chord(IsChord::No).with_octave(3);
        grid.add(&Selection::new(&[0], &[0], &[0]), &event).unwrap();
        let text = encode(&mut grid);
        assert_eq!(items(text.lines().nth(1).unwrap())[0], "45,e,0,50,n,n,n,n,n,n");
    }

    #[test]
    fn test_identical_pitches_keep_list_when_velocities_differ() {
        let mut grid = Grid::default();
        let sel = Selection::new(&[0], &[0], &[0]);
        grid.add(&sel, &Event::new("C").with_velocity(40)).unwrap();
        grid.add(&sel, &Event::new("C").with_velocity(80)).unwrap();
        let text = encode(&mut grid);
        assert_eq!(items(text.lines().nth(1).unwrap())[0], "48!48,e,0,40!80,n,n,n,n,n,n");

        let mut grid = Grid::default();
        grid.add(&sel, &Event::new("C")).unwrap();
        grid.add(&sel, &Event::new("C")).unwrap();
        let text = encode(&mut grid);
        assert_eq!(items(text.lines().nth(1).unwrap())[0], "48,e,0,50,n,n,n,n,n,n");
    }

    #[test]
    fn test_automation_overlay_last_wins() {
        let mut grid = Grid::default();
        let sel = Selection::new(&[0], &[0], &[0]);
        let first = Event::new("C").with_automation(Automation::default().with_volume(50).with_pan(-15));
        let second = Event::new("E").with_automation(Automation::default().with_pan(15));
        grid.add(&sel, &first).unwrap();
        grid.add(&sel, &second).unwrap();
        let text = encode(&mut grid);
        assert_eq!(items(text.lines().nth(1).unwrap())[0], "48!52,e,0,50,50,n,n,n,n,15");
    }

    #[test]
    fn test_mixed_track_is_instrument_and_missing_bars_are_rests() {
        let mut grid = Grid::new(Granularity::Quarter);
        grid.add(&Selection::new(&[0], &[0], &[0]), &Event::new("kick1")).unwrap();
        grid.add(&Selection::new(&[0], &[0], &[1]), &Event::new("C")).unwrap();
        grid.add(&Selection::new(&[2], &[1], &[0]), &Event::new("snare1")).unwrap();
        let text = encode(&mut grid);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("0|instrument|q|0|"));
        assert!(lines[2].starts_with("0|drum|q|0|"));
        // Three bars of four beats on every line.
        assert_eq!(items(lines[1]).len(), 12);
        assert_eq!(items(lines[2]).len(), 12);
        assert_eq!(items(lines[2])[0], "0,q,0,0,n,n,n,n,n,n");
        assert_eq!(track_kind(&grid, 1), TrackKind::Drum);
    }

    #[test]
    fn test_empty_grid_is_header_only() {
        assert_eq!(encode(&mut Grid::default()), "1\n");
    }

    #[test]
    fn test_unmapped_duration_fails() {
        let mut grid = Grid::default();
        grid.add(&Selection::new(&[0], &[0], &[0]), &Event::new("C").with_duration(9))
            .unwrap();
        let err = encode_grid(&mut grid, &EncodeOptions::default(), &ShorthandChords, &mut MdcRng::new(0));
        assert!(matches!(err, Err(MdcError::UnmappedDuration { duration: 9, granularity: 'e' })));
    }

    #[test]
    fn test_unknown_value_fails() {
        let mut grid = Grid::default();
        grid.add(&Selection::new(&[0], &[0], &[0]), &Event::new("notadrum")).unwrap();
        let err = encode_grid(&mut grid, &EncodeOptions::default(), &ShorthandChords, &mut MdcRng::new(0));
        assert!(matches!(err, Err(MdcError::UnknownToken { .. })));
    }

    #[test]
    fn test_jitter_bounds_and_determinism() {
        let mut rng = MdcRng::new(5);
        for _ in 0..500 {
            let v = jittered_velocity(50, 10, &mut rng);
            assert!((40..=60).contains(&v));
        }
        for _ in 0..200 {
            assert!(jittered_velocity(125, 10, &mut rng) <= 127);
            let low = jittered_velocity(3, 10, &mut rng);
            assert!(low <= 13);
        }
        assert_eq!(jittered_velocity(70, 0, &mut rng), 70);
        for _ in 0..50 {
            assert_eq!(jittered_velocity(0, 10, &mut rng), 0);
        }

        let options = EncodeOptions {
            velocity_jitter: 10,
            humanize: true,
            ..EncodeOptions::default()
        };
        let build = || {
            let mut grid = Grid::default();
            grid.add(&Selection::new(&[0, 1], &[0], &[]).all_beats(), &Event::new("hat1"))
                .unwrap();
            grid
        };
        let a = encode_grid(&mut build(), &options, &ShorthandChords, &mut MdcRng::new(11)).unwrap();
        let b = encode_grid(&mut build(), &options, &ShorthandChords, &mut MdcRng::new(11)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_base_offset_in_header() {
        let mut grid = Grid::default();
        grid.add(&Selection::new(&[0], &[0], &[0]), &Event::new("C")).unwrap();
        let options = EncodeOptions {
            base_offset: 1.5,
            ..EncodeOptions::default()
        };
        let text = encode_grid(&mut grid, &options, &ShorthandChords, &mut MdcRng::new(0)).unwrap();
        assert!(text.lines().nth(1).unwrap().starts_with("0|instrument|e|1.5|"));
    }

    #[test]
    fn test_silenced_layers_stay_silent_under_jitter() {
        let mut grid = Grid::default();
        grid.add(
            &Selection::new(&[0], &[0], &[]).all_beats(),
            &Event::new("C").with_velocity(0),
        )
        .unwrap();
        let options = EncodeOptions {
            velocity_jitter: 10,
            ..EncodeOptions::default()
        };
        let text = encode_grid(&mut grid, &options, &ShorthandChords, &mut MdcRng::new(3)).unwrap();
        for item in items(text.lines().nth(1).unwrap()) {
            assert_eq!(item.split(',').nth(3), Some("0"), "{item}");
        }
    }
}
