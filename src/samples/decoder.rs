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

//! Whole-file decoding of authored sound assets (MP3, WAV, FLAC, ...).

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::debug;

use super::buffer::PcmBuffer;

/// Error types for decoding an asset file.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audio file error: {0}")]
    Symphonia(#[from] SymphoniaError),

    #[error("No audio track found")]
    NoTrack,

    #[error("Sample rate not specified")]
    UnknownSampleRate,

    #[error("File contains no audio frames")]
    Empty,
}

/// Decodes the first audio track of a file into memory.
pub fn decode_file(path: &Path) -> Result<PcmBuffer, DecodeError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::UnknownSampleRate)?;

    let decoder_opts: DecoderOptions = Default::default();
    let mut decoder = get_codecs().make(&track.codec_params, &decoder_opts)?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut channel_count = 0usize;
    while let Some((samples, channels)) =
        read_and_decode_next_packet(format_reader.as_mut(), decoder.as_mut(), track_id)?
    {
        channel_count = channels;
        interleaved.extend_from_slice(&samples);
    }

    if channel_count == 0 || interleaved.is_empty() {
        return Err(DecodeError::Empty);
    }

    debug!(
        path = ?path,
        channels = channel_count,
        sample_rate,
        samples = interleaved.len(),
        "Decoded asset"
    );

    Ok(PcmBuffer::from_interleaved(
        &interleaved,
        channel_count as u16,
        sample_rate,
    ))
}

/// Reads the next packet. Returns `Ok(None)` at end of stream.
fn read_next_packet(format_reader: &mut dyn FormatReader) -> Result<Option<Packet>, DecodeError> {
    match format_reader.next_packet() {
        Ok(packet) => Ok(Some(packet)),
        Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Ok(None)
        }
        // Some decoders return DecodeError at EOF instead of IoError
        Err(SymphoniaError::DecodeError(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Reads and decodes packets until one for the given track yields samples.
fn read_and_decode_next_packet(
    format_reader: &mut dyn FormatReader,
    decoder: &mut dyn Decoder,
    track_id: u32,
) -> Result<Option<(Vec<f32>, usize)>, DecodeError> {
    loop {
        let packet = match read_next_packet(format_reader) {
            Ok(Some(packet)) => packet,
            Ok(None) => return Ok(None),
            Err(DecodeError::Symphonia(SymphoniaError::ResetRequired)) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e),
        };
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                decoder.decode(&packet)?
            }
            Err(e) => return Err(e.into()),
        };
        let (samples, channels) = decode_buffer_to_f32(decoded);
        if channels > 0 && !samples.is_empty() {
            return Ok(Some((samples, channels)));
        }
    }
}

/// Converts a decoded buffer to interleaved f32 samples and its channel count.
fn decode_buffer_to_f32(decoded: AudioBufferRef) -> (Vec<f32>, usize) {
    match decoded {
        AudioBufferRef::F32(buf) => interleave(&buf, |s| s),
        AudioBufferRef::F64(buf) => interleave(&buf, |s| s as f32),
        AudioBufferRef::S8(buf) => interleave(&buf, |s| s as f32 / (1i64 << 7) as f32),
        AudioBufferRef::S16(buf) => interleave(&buf, |s| s as f32 / (1i64 << 15) as f32),
        AudioBufferRef::S24(buf) => interleave(&buf, |s| s.inner() as f32 / (1i64 << 23) as f32),
        AudioBufferRef::S32(buf) => interleave(&buf, |s| s as f32 / (1i64 << 31) as f32),
        AudioBufferRef::U8(buf) => interleave(&buf, |s| (s as f32 / u8::MAX as f32) * 2.0 - 1.0),
        AudioBufferRef::U16(buf) => {
            interleave(&buf, |s| (s as f32 / u16::MAX as f32) * 2.0 - 1.0)
        }
        AudioBufferRef::U24(buf) => {
            let max = ((1u32 << 24) - 1) as f32;
            interleave(&buf, |s| (s.inner() as f32 / max) * 2.0 - 1.0)
        }
        AudioBufferRef::U32(buf) => {
            interleave(&buf, |s| (s as f32 / u32::MAX as f32) * 2.0 - 1.0)
        }
    }
}

fn interleave<T, F>(buf: &AudioBuffer<T>, convert: F) -> (Vec<f32>, usize)
where
    T: symphonia::core::sample::Sample,
    F: Fn(T) -> f32,
{
    let frames = buf.frames();
    let channels = buf.spec().channels.count();
    let planes = buf.planes();
    let mut samples = Vec::with_capacity(frames * channels);
    for frame_idx in 0..frames {
        for plane in planes.planes().iter().take(channels) {
            samples.push(convert(plane[frame_idx]));
        }
    }
    (samples, channels)
}
