pub mod error;
pub mod io; // Fetching and decoding MIDI
pub mod playback; // Scheduling, sample playback, note-on notifications
pub mod render; // Piano roll layout and drawing surfaces
pub mod sequencing; // Notes and note sequences
pub mod session;

pub use error::VisualizerError;
pub use session::{Attribute, Visualizer, VisualizerEvent};
