// Purpose - external interfaces: fetching sources and decoding MIDI

pub mod midi;
pub mod source;

pub use midi::decode;
pub use source::{FileSource, MidiSource};
