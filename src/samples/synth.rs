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

//! Fallback tone generation for sounds without an authored asset.
//!
//! Tones are plain sine waves shaped by a linear attack/sustain/release
//! envelope. The output only depends on the sound name, so the same name
//! always produces the same buffer.

use std::f32::consts::PI;
use std::time::Duration;

use super::buffer::PcmBuffer;

/// Sample rate of synthesized tones.
pub const SYNTH_SAMPLE_RATE: u32 = 44100;

/// Channel count of synthesized tones.
pub const SYNTH_CHANNELS: u16 = 2;

/// Overall amplitude applied on top of the envelope so mixed tones don't clip.
const AMPLITUDE: f32 = 0.5;

/// Frequency used when no table entry matches.
pub const DEFAULT_FREQUENCY: f32 = 440.0;

/// End of the attack ramp, as a fraction of the tone length.
const ATTACK_END: f32 = 0.1;

/// Start of the release ramp, as a fraction of the tone length.
const RELEASE_START: f32 = 0.8;

/// Names containing one of these labels get the longer chord duration.
const CHORD_LABELS: [&str; 6] = ["happy", "sad", "excited", "calm", "mysterious", "tense"];

const CHORD_DURATION: Duration = Duration::from_secs(2);
const NOTE_DURATION: Duration = Duration::from_secs(1);

/// Substring to frequency table. Checked in order and the first match wins,
/// so the order here decides which tone an ambiguous name maps to.
const FREQUENCY_TABLE: [(&str, f32); 21] = [
    // High range
    ("c5", 523.25),
    ("d5", 587.33),
    ("e5", 659.25),
    ("g5", 783.99),
    ("a5", 880.00),
    // Mid range
    ("c4", 261.63),
    ("d4", 293.66),
    ("e4", 329.63),
    ("g4", 392.00),
    ("a4", 440.00),
    // Low range
    ("c3", 130.81),
    ("d3", 146.83),
    ("e3", 164.81),
    ("g3", 196.00),
    ("a3", 220.00),
    // Chords, one representative pitch each
    ("happy", 261.63),
    ("sad", 246.94),
    ("excited", 293.66),
    ("calm", 220.00),
    ("mysterious", 207.65),
    ("tense", 277.18),
];

/// Returns true if the name refers to one of the mood chords.
pub fn is_chord_name(name: &str) -> bool {
    CHORD_LABELS.iter().any(|label| name.contains(label))
}

/// Returns how long the synthesized tone for `name` lasts.
pub fn duration_for(name: &str) -> Duration {
    if is_chord_name(name) {
        CHORD_DURATION
    } else {
        NOTE_DURATION
    }
}

/// Returns the tone frequency for `name` in Hz.
pub fn frequency_for(name: &str) -> f32 {
    FREQUENCY_TABLE
        .iter()
        .find(|(pattern, _)| name.contains(pattern))
        .map(|(_, frequency)| *frequency)
        .unwrap_or(DEFAULT_FREQUENCY)
}

/// Envelope gain at a normalized position in [0, 1).
pub fn envelope(position: f32) -> f32 {
    if position < ATTACK_END {
        position / ATTACK_END
    } else if position > RELEASE_START {
        (1.0 - position) / (1.0 - RELEASE_START)
    } else {
        1.0
    }
}

/// Builds the fallback tone for `name`.
pub fn synthesize(name: &str) -> PcmBuffer {
    let frame_count = (duration_for(name).as_secs_f64() * SYNTH_SAMPLE_RATE as f64) as usize;
    let frequency = frequency_for(name);
    let sample_rate = SYNTH_SAMPLE_RATE as f32;

    let mono: Vec<f32> = (0..frame_count)
        .map(|frame| {
            let value = (2.0 * PI * frequency * frame as f32 / sample_rate).sin();
            let position = frame as f32 / frame_count as f32;
            value * envelope(position) * AMPLITUDE
        })
        .collect();

    PcmBuffer::from_planar(vec![mono; SYNTH_CHANNELS as usize], SYNTH_SAMPLE_RATE)
}
