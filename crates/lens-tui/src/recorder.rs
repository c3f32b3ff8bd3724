//! Microphone capture via cpal.
//!
//! One `Recorder` per recording session. The session owns the input stream
//! exclusively; the visualizer taps the same sample buffer through
//! [`Recorder::drain_new`] rather than opening a second consumer. Dropping
//! the stream releases the device.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;
use tracing::{debug, warn};

/// MIME type for the payload produced by [`Recording::to_wav_bytes`].
pub const RECORDING_MIME: &str = "audio/wav";

#[derive(Debug, Error)]
pub enum RecorderError {
    /// No usable input device — covers both "no hardware" and the desktop
    /// permission layer refusing access.
    #[error("Microphone access denied (no input device available).")]
    NoDevice,
    #[error("unsupported input sample format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to query input device: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to open input stream: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("failed to start input stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}

pub struct Recorder {
    stream: cpal::Stream,
    buffer: Arc<Mutex<Vec<f32>>>,
    sample_rate: u32,
    channels: u16,
    started: Instant,
    /// How far `drain_new` has consumed the buffer.
    drained: usize,
}

impl Recorder {
    /// Open the default input device and start buffering interleaved f32
    /// samples. The buffer is created fresh here, so chunks from a previous
    /// session can never leak into a new one.
    pub fn start() -> Result<Self, RecorderError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(RecorderError::NoDevice)?;
        let supported = device.default_input_config()?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();

        let buffer = Arc::new(Mutex::new(Vec::<f32>::new()));
        let err_fn = |e: cpal::StreamError| warn!("[recorder] stream error: {}", e);
        let config: cpal::StreamConfig = supported.config();

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => {
                let buf = buffer.clone();
                device.build_input_stream(
                    &config,
                    move |data: &[f32], _| {
                        lock(&buf).extend_from_slice(data);
                    },
                    err_fn,
                    None,
                )?
            }
            cpal::SampleFormat::I16 => {
                let buf = buffer.clone();
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _| {
                        lock(&buf).extend(data.iter().map(|&s| s as f32 / 32768.0));
                    },
                    err_fn,
                    None,
                )?
            }
            cpal::SampleFormat::U16 => {
                let buf = buffer.clone();
                device.build_input_stream(
                    &config,
                    move |data: &[u16], _| {
                        lock(&buf).extend(data.iter().map(|&s| (s as f32 - 32768.0) / 32768.0));
                    },
                    err_fn,
                    None,
                )?
            }
            other => return Err(RecorderError::UnsupportedFormat(format!("{other:?}"))),
        };

        stream.play()?;
        debug!("[recorder] capturing at {} Hz, {} ch", sample_rate, channels);

        Ok(Self {
            stream,
            buffer,
            sample_rate,
            channels,
            started: Instant::now(),
            drained: 0,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Samples appended since the previous drain. Feeds the visualizer from
    /// the live stream without disturbing the recording buffer.
    pub fn drain_new(&mut self) -> Vec<f32> {
        let buf = lock(&self.buffer);
        let new = buf[self.drained.min(buf.len())..].to_vec();
        self.drained = buf.len();
        new
    }

    /// Stop capture and hand back the session's full buffer. Consumes the
    /// recorder; the device is released as the stream drops.
    pub fn stop(self) -> Recording {
        drop(self.stream);
        let samples = Arc::try_unwrap(self.buffer)
            .map(|m| m.into_inner().unwrap_or_else(PoisonError::into_inner))
            .unwrap_or_else(|arc| lock(&arc).clone());
        debug!(
            "[recorder] stopped with {} samples ({:.1}s)",
            samples.len(),
            samples.len() as f64 / (self.sample_rate as f64 * self.channels.max(1) as f64)
        );
        Recording {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

fn lock<'a>(buffer: &'a Arc<Mutex<Vec<f32>>>) -> std::sync::MutexGuard<'a, Vec<f32>> {
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A finished capture: interleaved samples plus the format needed to
/// assemble a transportable container.
pub struct Recording {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Recording {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Assemble a mono 16-bit PCM WAV at the capture rate. Multi-channel
    /// input is averaged down to mono.
    pub fn to_wav_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            let step = self.channels.max(1) as usize;
            for frame in self.samples.chunks(step) {
                let mono: f32 = frame.iter().sum::<f32>() / frame.len() as f32;
                writer.write_sample((mono.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_bytes_parse_back() {
        let recording = Recording {
            samples: vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25],
            sample_rate: 44_100,
            channels: 1,
        };
        let bytes = recording.to_wav_bytes().unwrap();
        let reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 6);
    }

    #[test]
    fn test_stereo_downmixes_to_mono() {
        // L = 1.0, R = -1.0 cancels; L = R = 0.5 stays put.
        let recording = Recording {
            samples: vec![1.0, -1.0, 0.5, 0.5],
            sample_rate: 48_000,
            channels: 2,
        };
        let bytes = recording.to_wav_bytes().unwrap();
        let mut reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
        let frames: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], 0);
        assert!((frames[1] as f32 / i16::MAX as f32 - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_clipping_is_clamped() {
        let recording = Recording {
            samples: vec![2.0, -2.0],
            sample_rate: 8_000,
            channels: 1,
        };
        let bytes = recording.to_wav_bytes().unwrap();
        let mut reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
        let frames: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(frames[0], i16::MAX);
        assert_eq!(frames[1], -i16::MAX);
    }
}
