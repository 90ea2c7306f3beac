// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Immutable PCM buffers shared between the sample store and the output sink.

use std::time::Duration;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Input block size for the sinc resampler.
const INPUT_BLOCK_SIZE: usize = 1024;

/// Error types for sample rate conversion.
#[derive(Debug, thiserror::Error)]
pub enum ResampleError {
    #[error("Unable to resample from {0}Hz to {1}Hz")]
    Unsupported(u32, u32),

    #[error("Resampling failed: {0}")]
    Process(#[from] rubato::ResampleError),
}

/// Decoded or synthesized audio, stored planar (one Vec per channel).
///
/// The frame length is fixed when the buffer is created. There is no API that
/// changes it afterwards, so a buffer can be shared freely behind an Arc.
#[derive(Clone, PartialEq)]
pub struct PcmBuffer {
    /// Planar sample storage.
    planes: Vec<Vec<f32>>,
    /// Number of frames in every plane.
    frame_count: usize,
    /// Sample rate of the audio data.
    sample_rate: u32,
}

impl PcmBuffer {
    /// Creates a buffer from planar samples. All planes are truncated to the
    /// length of the shortest one.
    pub fn from_planar(planes: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        let frame_count = planes.iter().map(|p| p.len()).min().unwrap_or(0);
        let planes = planes
            .into_iter()
            .map(|mut plane| {
                plane.truncate(frame_count);
                plane
            })
            .collect();
        Self {
            planes,
            frame_count,
            sample_rate,
        }
    }

    /// Creates a buffer from interleaved samples. Trailing samples that do not
    /// make up a full frame are dropped.
    pub fn from_interleaved(samples: &[f32], channel_count: u16, sample_rate: u32) -> Self {
        let channels = channel_count as usize;
        if channels == 0 {
            return Self::from_planar(Vec::new(), sample_rate);
        }

        let frames = samples.len() / channels;
        let mut planes = vec![Vec::with_capacity(frames); channels];
        for frame in samples.chunks_exact(channels) {
            for (plane, sample) in planes.iter_mut().zip(frame) {
                plane.push(*sample);
            }
        }
        Self::from_planar(planes, sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> u16 {
        self.planes.len() as u16
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count == 0 || self.planes.is_empty()
    }

    /// Returns the samples of a single channel.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.planes.get(index).map(|p| p.as_slice())
    }

    /// Returns the playback duration of the buffer.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count as f64 / self.sample_rate as f64)
    }

    /// Returns a copy of the buffer converted to another sample rate with a
    /// band-limited sinc resampler. The result has exactly
    /// `ceil(frames * target_rate / sample_rate)` frames.
    pub fn resample(&self, target_rate: u32) -> Result<PcmBuffer, ResampleError> {
        if self.sample_rate == target_rate {
            return Ok(self.clone());
        }
        if self.sample_rate == 0 || target_rate == 0 {
            return Err(ResampleError::Unsupported(self.sample_rate, target_rate));
        }
        if self.is_empty() {
            return Ok(PcmBuffer::from_planar(self.planes.clone(), target_rate));
        }

        let ratio = target_rate as f64 / self.sample_rate as f64;
        let expected_frames = (self.frame_count as f64 * ratio).ceil() as usize;
        let channels = self.planes.len();

        let sinc_params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            oversampling_factor: 128,
            interpolation: SincInterpolationType::Linear,
            window: WindowFunction::BlackmanHarris2,
        };
        let mut resampler =
            SincFixedIn::<f32>::new(ratio, 1.0, sinc_params, INPUT_BLOCK_SIZE, channels)
                .map_err(|_e| ResampleError::Unsupported(self.sample_rate, target_rate))?;

        // The resampler output lags the input by a fixed number of frames.
        let delay = resampler.output_delay();
        let wanted = delay + expected_frames;
        let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(wanted); channels];

        let mut position = 0;
        while self.frame_count - position >= resampler.input_frames_next() {
            let needed = resampler.input_frames_next();
            let chunk: Vec<&[f32]> = self
                .planes
                .iter()
                .map(|plane| &plane[position..position + needed])
                .collect();
            append_planar(&mut output, resampler.process(chunk.as_slice(), None)?);
            position += needed;
        }

        if position < self.frame_count {
            let rest: Vec<&[f32]> = self.planes.iter().map(|plane| &plane[position..]).collect();
            append_planar(
                &mut output,
                resampler.process_partial(Some(rest.as_slice()), None)?,
            );
        }

        // Flush what is still held inside the filter.
        while output[0].len() < wanted {
            let flushed = resampler.process_partial(None::<&[Vec<f32>]>, None)?;
            if flushed.first().map_or(true, |plane| plane.is_empty()) {
                break;
            }
            append_planar(&mut output, flushed);
        }

        for plane in output.iter_mut() {
            plane.drain(..delay.min(plane.len()));
            plane.resize(expected_frames, 0.0);
        }

        Ok(PcmBuffer::from_planar(output, target_rate))
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.frame_count * self.planes.len() * std::mem::size_of::<f32>()
    }
}

fn append_planar(output: &mut [Vec<f32>], block: Vec<Vec<f32>>) {
    for (plane, samples) in output.iter_mut().zip(block) {
        plane.extend_from_slice(&samples);
    }
}

impl std::fmt::Debug for PcmBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcmBuffer")
            .field("channels", &self.planes.len())
            .field("frames", &self.frame_count)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_interleaved() {
        let buffer = PcmBuffer::from_interleaved(&[0.1, -0.1, 0.2, -0.2, 0.3], 2, 44100);

        assert_eq!(buffer.channel_count(), 2);
        // The dangling fifth sample is dropped.
        assert_eq!(buffer.frame_count(), 2);
        assert_eq!(buffer.channel(0), Some(&[0.1, 0.2][..]));
        assert_eq!(buffer.channel(1), Some(&[-0.1, -0.2][..]));
        assert_eq!(buffer.channel(2), None);
    }

    #[test]
    fn test_uneven_planes_truncate() {
        let buffer = PcmBuffer::from_planar(vec![vec![0.0; 10], vec![0.0; 7]], 48000);
        assert_eq!(buffer.frame_count(), 7);
        assert_eq!(buffer.channel(0).map(|c| c.len()), Some(7));
    }

    fn sine(frequency: f32, sample_rate: u32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn test_resample_length() {
        let buffer = PcmBuffer::from_planar(vec![sine(440.0, 44100, 4410)], 44100);

        let result = buffer.resample(48000).unwrap();

        let expected_len = (4410.0_f64 * 48000.0 / 44100.0).ceil() as usize;
        assert_eq!(result.frame_count(), expected_len);
        assert_eq!(result.sample_rate(), 48000);
        // Same duration, give or take a frame.
        let drift = result.duration().as_secs_f64() - buffer.duration().as_secs_f64();
        assert!(drift.abs() < 1.0 / 48000.0);
    }

    #[test]
    fn test_resample_keeps_channels_apart() {
        let buffer = PcmBuffer::from_planar(vec![vec![0.5; 4096], vec![-0.5; 4096]], 22050);

        let result = buffer.resample(44100).unwrap();

        assert_eq!(result.channel_count(), 2);
        assert_eq!(result.frame_count(), 8192);
        // Away from the edges the levels come through unchanged.
        let left = &result.channel(0).unwrap()[1024..7168];
        let right = &result.channel(1).unwrap()[1024..7168];
        assert!(left.iter().all(|s| (s - 0.5).abs() < 0.01));
        assert!(right.iter().all(|s| (s + 0.5).abs() < 0.01));
    }

    #[test]
    fn test_resample_keeps_audible_tone() {
        let buffer = PcmBuffer::from_planar(vec![sine(1000.0, 48000, 48000)], 48000);

        let result = buffer.resample(44100).unwrap();

        assert_eq!(result.frame_count(), 44100);
        let samples = result.channel(0).unwrap();
        let level = rms(&samples[4410..39690]);
        assert!((level - std::f32::consts::FRAC_1_SQRT_2).abs() < 0.02, "rms {}", level);
    }

    #[test]
    fn test_resample_filters_content_above_new_nyquist() {
        // 15kHz is above the 11025Hz Nyquist frequency of the target rate and
        // must not fold back into the audible band.
        let buffer = PcmBuffer::from_planar(vec![sine(15000.0, 48000, 48000)], 48000);
        assert!(rms(buffer.channel(0).unwrap()) > 0.7);

        let result = buffer.resample(22050).unwrap();

        let samples = result.channel(0).unwrap();
        assert!(rms(&samples[2205..19845]) < 0.01);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let buffer = PcmBuffer::from_planar(vec![vec![0.1, 0.2, 0.3]], 44100);
        assert_eq!(buffer.resample(44100).unwrap(), buffer);
    }

    #[test]
    fn test_resample_rejects_zero_rate() {
        let buffer = PcmBuffer::from_planar(vec![vec![0.1, 0.2, 0.3]], 0);
        assert!(matches!(
            buffer.resample(44100),
            Err(ResampleError::Unsupported(0, 44100))
        ));
    }

    #[test]
    fn test_duration() {
        let buffer = PcmBuffer::from_planar(vec![vec![0.0; 88200]; 2], 44100);
        assert_eq!(buffer.duration(), Duration::from_secs(2));
        assert_eq!(buffer.memory_size(), 88200 * 2 * 4);
        assert!(!buffer.is_empty());
        assert!(PcmBuffer::from_interleaved(&[], 2, 44100).is_empty());
    }
}
