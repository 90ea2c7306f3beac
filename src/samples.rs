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

//! Named sound playback.
//!
//! This module provides:
//! - PCM buffers loaded from authored assets or synthesized as a fallback
//! - The sample store mapping sound names to buffers and playback channels
//! - The dispatcher that retriggers a sound on its channel

mod buffer;
mod decoder;
mod dispatcher;
mod loader;
mod store;
pub mod synth;

pub use buffer::{PcmBuffer, ResampleError};
pub use decoder::{decode_file, DecodeError};
pub use dispatcher::{Dispatch, Dispatcher};
pub use loader::{AssetLoader, LoadError};
pub use store::{AssetStatus, SampleStore, SoundAsset};
