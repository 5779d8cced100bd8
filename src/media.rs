//! Audio payload decoding.
//!
//! The backend ships narration as one base64 string. It is decoded chunk by
//! chunk into an [`AudioClip`], and an [`AudioHandle`] materialises the clip as
//! a temporary `.mp3` file that players and downloads can both use.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// MIME type of narration returned by the backend
pub const AUDIO_MIME: &str = "audio/mpeg";

/// Input characters decoded per step
pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Standard alphabet, trailing `=` optional
const AUDIO_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("invalid base64 audio near offset {offset}: {source}")]
    Decode {
        offset: usize,
        #[source]
        source: base64::DecodeError,
    },
    #[error("padding before end of audio payload at offset {0}")]
    EarlyPadding(usize),
    #[error("failed to create audio file: {0}")]
    Io(#[from] std::io::Error),
}

/// Decode `encoded` in chunks of roughly `chunk_size` characters.
///
/// The chunk size is rounded down to a multiple of four (minimum four) so each
/// chunk is a whole number of base64 quanta. ASCII whitespace is ignored and
/// the final quantum may be padded or not.
pub fn decode_base64_chunked(encoded: &str, chunk_size: usize) -> Result<Vec<u8>, MediaError> {
    let cleaned: Vec<u8> = encoded
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let step = (chunk_size.max(4) / 4) * 4;
    let chunk_count = cleaned.len().div_ceil(step);

    let mut out = Vec::with_capacity(cleaned.len() / 4 * 3);
    for (i, piece) in cleaned.chunks(step).enumerate() {
        let offset = i * step;
        // padding is only valid in the final quantum
        if i + 1 < chunk_count && piece.contains(&b'=') {
            return Err(MediaError::EarlyPadding(offset));
        }
        AUDIO_ENGINE
            .decode_vec(piece, &mut out)
            .map_err(|source| MediaError::Decode { offset, source })?;
    }
    Ok(out)
}

/// Decoded audio bytes with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    bytes: Vec<u8>,
    mime: String,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    /// Decode a base64 payload using [`DEFAULT_CHUNK_SIZE`]
    pub fn from_base64(encoded: &str, mime: impl Into<String>) -> Result<Self, MediaError> {
        let bytes = decode_base64_chunked(encoded, DEFAULT_CHUNK_SIZE)?;
        Ok(Self::new(bytes, mime))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Playable handle: the clip written to a temporary file.
///
/// The file is deleted once the handle and every [`AudioLease`] taken from it
/// are gone. Replacing or dropping the handle releases its share.
#[derive(Debug)]
pub struct AudioHandle {
    clip: AudioClip,
    file: Arc<NamedTempFile>,
}

/// Shared claim on an [`AudioHandle`]'s file, held by a running player.
#[derive(Debug, Clone)]
pub struct AudioLease {
    file: Arc<NamedTempFile>,
}

impl AudioLease {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl AudioHandle {
    pub fn create(clip: AudioClip) -> Result<Self, MediaError> {
        let mut file = tempfile::Builder::new()
            .prefix("tomecast-")
            .suffix(".mp3")
            .tempfile()?;
        std::io::Write::write_all(&mut file, clip.bytes())?;
        std::io::Write::flush(&mut file)?;
        debug!(path = %file.path().display(), bytes = clip.len(), "audio handle created");
        Ok(Self {
            clip,
            file: Arc::new(file),
        })
    }

    /// Keep the file alive past this handle, e.g. while a player reads it
    pub fn lease(&self) -> AudioLease {
        AudioLease {
            file: Arc::clone(&self.file),
        }
    }

    /// Path that can be handed to an audio player
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn clip(&self) -> &AudioClip {
        &self.clip
    }
}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        debug!(path = %self.file.path().display(), "audio handle released");
    }
}
