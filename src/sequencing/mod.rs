pub mod note;
pub mod sequence;

pub use note::Note;
pub use sequence::{NoteSequence, NoteSequenceBuilder, DEFAULT_QPM};
