//! Scoped staging of uploaded audio
//!
//! Uploaded audio is written to a named temporary file so each pass can read
//! it from disk. The file is removed when [`StagedAudio`] is closed or
//! dropped, which covers early returns and panics alike.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};
use tracing::debug;

const STAGED_PREFIX: &str = "pronounce-upload-";
const DEFAULT_SUFFIX: &str = ".wav";
const MAX_SUFFIX_LEN: usize = 8;

/// Creates staged audio files in a fixed directory
#[derive(Debug, Clone, Default)]
pub struct AudioStager {
    /// `None` uses the system temp directory
    dir: Option<PathBuf>,
}

impl AudioStager {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// Write `audio` to a new temporary file
    ///
    /// The suffix follows the upload name's extension so the speech client
    /// can pick a content type; `.wav` when there is none.
    pub fn stage(&self, audio: &[u8], file_name: Option<&str>) -> io::Result<StagedAudio> {
        let suffix = staging_suffix(file_name);
        let mut builder = Builder::new();
        builder.prefix(STAGED_PREFIX).suffix(&suffix);

        let mut file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(audio)?;
        file.flush()?;

        debug!(
            path = %file.path().display(),
            bytes = audio.len(),
            "Staged uploaded audio"
        );

        Ok(StagedAudio { file })
    }
}

/// Staged audio file, deleted on close or drop
#[derive(Debug)]
pub struct StagedAudio {
    file: NamedTempFile,
}

impl StagedAudio {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the file now, reporting failure instead of ignoring it
    pub fn close(self) -> io::Result<()> {
        let path = self.file.path().to_path_buf();
        self.file.close()?;
        debug!(path = %path.display(), "Removed staged audio");
        Ok(())
    }
}

/// Lower-cased `.ext` of the upload name, `.wav` if missing or unusable
pub fn staging_suffix(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_SUFFIX_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_else(|| DEFAULT_SUFFIX.to_string())
}
