// MDC Music Compiler: CLI entry point.
//
// Two subcommands:
//
//   mdcmp convert <in.mdc>... --out <file.mid> [--tempo BPM] [--config cfg.json]
//       Layer one or more MDC files into a single MIDI file, each file's
//       lines on the tracks after the previous file's.
//
//   mdcmp demo <out.mdc> <out.mid> [--seed N] [--tempo BPM] [--repeat N]
//       [--config cfg.json]
//       Build a four-track demo arrangement on a grid (drum kit, chord
//       progression, bass roots, a spread chord), write it as MDC, then
//       convert that file to MIDI.
//
// Log verbosity follows RUST_LOG (default `info`).

use mdcmp_music::{
    Automation, ChordSpread, Converter, Event, Grid, IsChord, MdcConfig, MdcError, MidiFile,
    MissingPolicy, Selection, ShorthandChords, SpreadOrder, write_mdc,
};
use mdcmp_prng::MdcRng;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const USAGE: &str = "usage:
  mdcmp convert <in.mdc>... --out <file.mid> [--tempo BPM] [--config cfg.json]
  mdcmp demo <out.mdc> <out.mid> [--seed N] [--tempo BPM] [--repeat N] [--config cfg.json]";

/// Flags that take a value; their values are not positional arguments.
const VALUE_FLAGS: [&str; 5] = ["--out", "--tempo", "--config", "--seed", "--repeat"];

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("convert") => run_convert(&args[1..]),
        Some("demo") => run_demo(&args[1..]),
        _ => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &[String]) -> Result<MdcConfig, MdcError> {
    let mut config = match parse_flag::<PathBuf>(args, "--config") {
        Some(path) => MdcConfig::load(&path)?,
        None => MdcConfig::default(),
    };
    if let Some(tempo) = parse_flag(args, "--tempo") {
        config.convert.tempo = tempo;
    }
    if let Some(seed) = parse_flag(args, "--seed") {
        config.seed = seed;
    }
    Ok(config)
}

fn run_convert(args: &[String]) -> Result<(), Box<dyn Error>> {
    let inputs = positional(args);
    let Some(out) = parse_flag::<PathBuf>(args, "--out") else {
        return Err(format!("convert needs --out\n{USAGE}").into());
    };
    if inputs.is_empty() {
        return Err(format!("convert needs at least one input file\n{USAGE}").into());
    }
    let config = load_config(args)?;

    let mut converter = Converter::new(&config.convert, MidiFile::new());
    for input in &inputs {
        converter.convert_file(Path::new(input))?;
    }
    converter.save(&out)?;
    println!(
        "Wrote {} ({} tracks from {} files, {} BPM)",
        out.display(),
        converter.next_track() - config.convert.start_track,
        inputs.len(),
        config.convert.tempo
    );
    Ok(())
}

fn run_demo(args: &[String]) -> Result<(), Box<dyn Error>> {
    let paths = positional(args);
    let [mdc_path, midi_path] = paths.as_slice() else {
        return Err(format!("demo needs an .mdc and a .mid output path\n{USAGE}").into());
    };
    let mut config = load_config(args)?;
    if config.encode.velocity_jitter == 0 {
        config.encode.velocity_jitter = 10;
    }
    let repeat: usize = parse_flag(args, "--repeat").unwrap_or(2);
    let mut rng = MdcRng::new(config.seed);

    let mut grid = demo_grid(repeat, &mut rng)?;
    print!("{}", grid.summary());
    write_mdc(
        &mut grid,
        Path::new(mdc_path),
        &config.encode,
        &ShorthandChords,
        &mut rng,
    )?;

    let mut converter = Converter::new(&config.convert, MidiFile::new());
    converter.convert_file(Path::new(mdc_path))?;
    converter.save(Path::new(midi_path))?;

    let stats = grid.stats();
    println!(
        "Wrote {mdc_path} and {midi_path}: {} bars, {} tracks, {} events (seed {}, {} BPM)",
        stats.bars, stats.tracks, stats.events, config.seed, config.convert.tempo
    );
    Ok(())
}

/// Drum kit on track 0, a chord progression on track 1, single-note roots
/// on track 2, and a spread chord on track 3. Four bars, doubled with a
/// hat fill, then repeated `repeat` more times.
fn demo_grid(repeat: usize, rng: &mut MdcRng) -> Result<Grid, MdcError> {
    let mut grid = Grid::default();
    let intro = [0, 1, 2, 3];

    grid.add(&Selection::new(&intro, &[0], &[]).all_beats(), &Event::new("hat1"))?;
    grid.add(&Selection::new(&intro, &[0], &[0, 5]), &Event::new("kick1"))?;
    grid.add(&Selection::new(&intro, &[0], &[2, 6]), &Event::new("snare1"))?;

    let progression = ["Amin11", "D7", "Fmaj7", "Cmaj7"];
    let roots = ["A", "D", "F", "C"];
    for (bar, (chord, root)) in progression.iter().zip(roots).enumerate() {
        let pad = Event::new(*chord)
            .with_duration(4)
            .with_automation(Automation::default().with_volume(50).with_pan(-15));
        grid.add(&Selection::new(&[bar], &[1], &[0, 4]), &pad)?;

        let bass = Event::new(root)
            .with_octave(3)
            .with_velocity(40)
            .with_chord(IsChord::No)
            .with_automation(Automation::default().with_pan(15));
        grid.add(&Selection::new(&[bar], &[2], &[2]), &bass)?;
    }

    let mut spread = ChordSpread::new("Fmaj7", 2, vec![3]);
    spread.start_beat = 4;
    spread.octave = 5;
    spread.velocity = 35;
    spread.order = SpreadOrder::Shuffled;
    grid.spread_chord(&spread, &ShorthandChords, rng)?;

    grid.fill_gaps();
    grid.copy_to_end(&intro, &[0, 1, 2, 3], 1, MissingPolicy::Fail)?;
    grid.add(&Selection::new(&[7], &[0], &[1, 3, 5, 7]), &Event::new("hatopen"))?;

    let verse: Vec<usize> = (0..8).collect();
    grid.copy_to_end(&verse, &[0, 1, 2, 3], repeat, MissingPolicy::Fail)?;
    Ok(grid)
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}

/// Arguments that are neither flags nor flag values.
fn positional(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
        } else if !arg.starts_with("--") {
            out.push(arg.clone());
        }
    }
    out
}
