use std::path::Path;

use crate::error::FetchError;

/// Something that can produce the raw bytes of a MIDI file for a URL
///
/// The visualizer only ever asks for whole files; streaming is not needed
/// for the sizes piano rolls deal with.
pub trait MidiSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Reads local files, given either a plain path or a `file://` URL
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl FileSource {
    /// Resolve a URL to a local path, rejecting non-file schemes
    pub fn resolve(url: &str) -> Result<&Path, FetchError> {
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(Path::new(path));
        }

        match url.split_once("://") {
            Some((scheme, _)) => Err(FetchError::UnsupportedScheme(scheme.to_string())),
            None => Ok(Path::new(url)),
        }
    }
}

impl MidiSource for FileSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let path = Self::resolve(url)?;
        let bytes = std::fs::read(path).map_err(|source| FetchError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("fetched {} bytes from {}", bytes.len(), path.display());
        Ok(bytes)
    }
}

/// Allow closures to act as sources (handy for embedding and tests)
impl<F> MidiSource for F
where
    F: Fn(&str) -> Result<Vec<u8>, FetchError>,
{
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self(url)
    }
}
