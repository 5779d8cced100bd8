//! Saving the current summary and narration to disk.
//!
//! Mirrors the "download" buttons: the text goes to `summary.txt` (UTF-8) and
//! the audio to `summary.mp3`.

use crate::media::AudioClip;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const SUMMARY_FILE: &str = "summary.txt";
pub const AUDIO_FILE: &str = "summary.mp3";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("nothing to save: {0}")]
    Nothing(&'static str),
}

/// Write the summary text to `dir/summary.txt`
pub fn save_summary(dir: &Path, summary: &str) -> Result<PathBuf, ExportError> {
    write_file(dir.join(SUMMARY_FILE), summary.as_bytes())
}

/// Write the decoded narration to `dir/summary.mp3`
pub fn save_audio(dir: &Path, clip: &AudioClip) -> Result<PathBuf, ExportError> {
    if clip.is_empty() {
        return Err(ExportError::Nothing("audio clip is empty"));
    }
    write_file(dir.join(AUDIO_FILE), clip.bytes())
}

fn write_file(path: PathBuf, contents: &[u8]) -> Result<PathBuf, ExportError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ExportError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(&path, contents).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), bytes = contents.len(), "saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::AUDIO_MIME;

    #[test]
    fn summary_is_written_as_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_summary(dir.path(), "Résumé — ünïcode").unwrap();
        assert_eq!(path.file_name().unwrap(), SUMMARY_FILE);
        assert_eq!(std::fs::read_to_string(path).unwrap(), "Résumé — ünïcode");
    }

    #[test]
    fn audio_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let clip = AudioClip::from_base64("SGVsbG8=", AUDIO_MIME).unwrap();
        let path = save_audio(&dir.path().join("out"), &clip).unwrap();
        assert_eq!(path.file_name().unwrap(), AUDIO_FILE);
        assert_eq!(std::fs::read(path).unwrap(), b"Hello");
    }

    #[test]
    fn empty_audio_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let clip = AudioClip::new(Vec::new(), AUDIO_MIME);
        assert!(matches!(
            save_audio(dir.path(), &clip),
            Err(ExportError::Nothing(_))
        ));
    }
}
