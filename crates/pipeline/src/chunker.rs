// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frame-based audio chunking.
//!
//! Uploads are capped at five minutes of audio per request. WAV input is
//! split along frame boundaries into a scoped temporary directory that is
//! deleted with the [`ChunkSet`] on every exit path. Short files (and
//! non-WAV media such as migrated FLAC recordings, which the vendors
//! accept directly) pass through untouched.

use crate::pipeline::PipelineError;
use hound::{WavReader, WavWriter};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Maximum chunk length in seconds.
const MAX_CHUNK_SECS: u64 = 300;

/// The files to upload, in order. Holds the scratch directory alive for
/// split output; dropping the set deletes it.
pub struct ChunkSet {
    paths: Vec<PathBuf>,
    _scratch: Option<TempDir>,
}

impl ChunkSet {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Split `audio` into ≤ 5-minute chunks along frame boundaries.
pub fn chunk_audio(audio: &Path) -> Result<ChunkSet, PipelineError> {
    let is_wav = audio
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);
    if !is_wav {
        return Ok(ChunkSet { paths: vec![audio.to_path_buf()], _scratch: None });
    }

    let mut reader =
        WavReader::open(audio).map_err(|e| PipelineError::Chunking(e.to_string()))?;
    let spec = reader.spec();
    let total_frames = reader.duration() as u64;
    let frames_per_chunk = MAX_CHUNK_SECS * spec.sample_rate as u64;

    if total_frames <= frames_per_chunk {
        return Ok(ChunkSet { paths: vec![audio.to_path_buf()], _scratch: None });
    }

    let scratch =
        TempDir::with_prefix("quedo-chunks-").map_err(|e| PipelineError::Chunking(e.to_string()))?;
    let samples_per_chunk = (frames_per_chunk * spec.channels as u64) as usize;

    let mut paths = Vec::new();
    let mut writer: Option<WavWriter<_>> = None;
    let mut written_in_chunk = 0usize;

    for sample in reader.samples::<i16>() {
        let sample = sample.map_err(|e| PipelineError::Chunking(e.to_string()))?;
        if writer.is_none() {
            let path = scratch.path().join(format!("chunk-{:03}.wav", paths.len()));
            paths.push(path.clone());
            writer = Some(
                WavWriter::create(&path, spec)
                    .map_err(|e| PipelineError::Chunking(e.to_string()))?,
            );
            written_in_chunk = 0;
        }
        if let Some(w) = writer.as_mut() {
            w.write_sample(sample).map_err(|e| PipelineError::Chunking(e.to_string()))?;
        }
        written_in_chunk += 1;
        if written_in_chunk == samples_per_chunk {
            if let Some(w) = writer.take() {
                w.finalize().map_err(|e| PipelineError::Chunking(e.to_string()))?;
            }
        }
    }
    if let Some(w) = writer.take() {
        w.finalize().map_err(|e| PipelineError::Chunking(e.to_string()))?;
    }

    debug!(chunks = paths.len(), total_frames, "audio split for upload");
    Ok(ChunkSet { paths, _scratch: Some(scratch) })
}

#[cfg(test)]
#[path = "chunker_tests.rs"]
mod tests;
