// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAV writer: 16-bit little-endian integer samples at the device-native
//! rate and channel count. Writes happen synchronously on the device
//! callback thread, so the lock is only ever contended at finalize.

use crate::engine::CaptureError;
use crate::input::StreamSpec;
use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub struct WavSink {
    path: PathBuf,
    writer: Mutex<Option<WavWriter<BufWriter<File>>>>,
}

impl WavSink {
    pub fn create(path: &Path, spec: StreamSpec) -> Result<Self, CaptureError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CaptureError::WriterFailed(e.to_string()))?;
        }
        let wav_spec = WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(path, wav_spec)
            .map_err(|e| CaptureError::WriterFailed(e.to_string()))?;
        Ok(Self { path: path.to_path_buf(), writer: Mutex::new(Some(writer)) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append samples. Errors are returned so the sink can record a
    /// pending writer failure; the audio callback itself never panics.
    pub fn write(&self, samples: &[i16]) -> Result<(), CaptureError> {
        let mut guard = self.writer.lock();
        let Some(writer) = guard.as_mut() else {
            return Err(CaptureError::WriterFailed("writer already finalized".into()));
        };
        for sample in samples {
            writer
                .write_sample(*sample)
                .map_err(|e| CaptureError::WriterFailed(e.to_string()))?;
        }
        Ok(())
    }

    /// Flush headers and close the file. Idempotent.
    pub fn finalize(&self) -> Result<(), CaptureError> {
        let writer = self.writer.lock().take();
        match writer {
            Some(writer) => {
                writer.finalize().map_err(|e| CaptureError::WriterFailed(e.to_string()))
            }
            None => Ok(()),
        }
    }
}
