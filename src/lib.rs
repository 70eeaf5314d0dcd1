// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Image source backends for a viewer.
//!
//! Every backend wraps one external decoder and exposes it as a [`Source`]:
//! open from a path or from memory, then pull frames with
//! [`Source::load_first_frame`] and [`Source::load_next_frame`]. All frames
//! come out as [`Bitmap`]s in [`PixelFormat::Abgr`].

pub mod backend;
pub mod bitmap;
pub mod codecs;
pub mod image;
pub mod io;
pub mod source;
pub mod utils;

mod internal_utils;

pub use crate::backend::*;
pub use crate::bitmap::Bitmap;
pub use crate::image::Image;
pub use crate::source::*;

/// Largest number of pixels a decoded bitmap may hold.
pub const DEFAULT_IMAGE_SIZE_LIMIT: u32 = 16384 * 16384;
/// Largest width or height a decoded bitmap may have.
pub const DEFAULT_IMAGE_DIMENSION_LIMIT: u32 = 32768;

#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub enum PixelFormat {
    /// Packed 32-bit ABGR: bytes are R, G, B, A in memory.
    #[default]
    Abgr,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Abgr => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImvError {
    /// The input is readable but is not something this backend decodes.
    #[error("unsupported input")]
    Unsupported,
    /// The input could not be accessed at all. Other backends will not fare better.
    #[error("bad path: {0}")]
    BadPath(String),
    #[error("decode failed: {0}")]
    DecodeFailed(String),
    #[error("out of memory")]
    OutOfMemory,
    #[error("not implemented")]
    NotImplemented,
}

impl ImvError {
    /// Returns true if the caller should go on probing other backends.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ImvError::Unsupported)
    }
}

pub type ImvResult<T> = Result<T, ImvError>;
