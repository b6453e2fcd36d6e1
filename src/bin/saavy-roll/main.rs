//! saavy-roll - MIDI piano roll in the terminal
//!
//! Run with: cargo run -- path/to/song.mid

mod app;
mod ui;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result as EyreResult, WrapErr};

use saavy_roll::{
    io::{self, FileSource, MidiSource},
    render::{DrawingOptions, NoteSequenceDrawing, PixelBuffer},
    sequencing::DEFAULT_QPM,
};

use app::App;

#[derive(Parser, Debug)]
#[command(name = "saavy-roll", version, about = "Piano roll for MIDI files, synced to playback")]
struct Args {
    /// MIDI file path or file:// URL
    source: String,

    /// Playback tempo in quarter notes per minute
    #[arg(long, default_value_t = DEFAULT_QPM)]
    tempo: f64,

    /// Draw notes up to this index in the primer color
    #[arg(long, value_name = "COUNT")]
    primer: Option<usize>,

    /// Don't open an audio device; the roll still follows playback
    #[arg(long)]
    no_audio: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,

    /// Write the piano roll at rest to a PPM image and exit
    #[arg(long, value_name = "FILE")]
    snapshot: Option<PathBuf>,
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let options = DrawingOptions {
        primer_notes: args.primer,
        ..DrawingOptions::default()
    };

    if let Some(path) = &args.snapshot {
        return snapshot(&args.source, options, path);
    }

    let mut app = App::open(&args.source, args.tempo, options, args.no_audio)?;
    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal);
    ratatui::restore();
    result
}

/// Render `source` to a PPM file without playing it
fn snapshot(source: &str, options: DrawingOptions, path: &Path) -> EyreResult<()> {
    let bytes = FileSource.fetch(source)?;
    let sequence = io::decode(&bytes)?;
    let drawing = NoteSequenceDrawing::with_options(Arc::new(sequence), PixelBuffer::new(), options)?;

    let file = File::create(path).wrap_err_with(|| format!("creating {}", path.display()))?;
    drawing
        .surface()
        .write_ppm(BufWriter::new(file))
        .wrap_err_with(|| format!("writing {}", path.display()))?;

    let size = drawing.canvas_size();
    println!("wrote {}x{} roll to {}", size.width.ceil(), size.height.ceil(), path.display());
    Ok(())
}
