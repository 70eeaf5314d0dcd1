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

use crate::bitmap::Bitmap;
use crate::image::Image;
use crate::*;

/// A decoded frame and the number of milliseconds it stays on screen.
pub type DecodedFrame = (Bitmap, u32);

/// Private decoding state of one backend.
///
/// Implementations own their native decoder and their input bytes. Teardown must be
/// implemented using Drop.
pub trait FrameDecoder {
    /// Decodes the first (or only) frame.
    fn first_frame(&mut self) -> ImvResult<DecodedFrame>;
    /// Decodes the frame after the last one returned, wrapping around after the last frame.
    fn next_frame(&mut self) -> ImvResult<DecodedFrame>;
}

/// Result of a frame load. `image` is `None` if the frame could not be decoded, in which case
/// `frametime` is 0. The source stays usable either way.
#[derive(Debug, Default)]
pub struct LoadedFrame {
    pub image: Option<Image>,
    pub frametime: u32,
}

impl LoadedFrame {
    pub fn is_ok(&self) -> bool {
        self.image.is_some()
    }

    fn from_result(backend: &str, operation: &str, result: ImvResult<DecodedFrame>) -> Self {
        match result {
            Ok((bitmap, frametime)) => LoadedFrame {
                image: Some(Image::from_bitmap(bitmap)),
                frametime,
            },
            Err(err) => {
                log::error!("{backend}: {operation} failed: {err}");
                LoadedFrame::default()
            }
        }
    }
}

/// A backend-independent handle over one opened image stream.
///
/// The lifetime is the one of the caller buffer for sources opened from borrowed memory, and
/// `'static` otherwise.
pub struct Source<'a> {
    backend: &'static str,
    decoder: Option<Box<dyn FrameDecoder + 'a>>,
}

impl<'a> Source<'a> {
    pub fn create(backend: &'static str, decoder: Box<dyn FrameDecoder + 'a>) -> Self {
        Self {
            backend,
            decoder: Some(decoder),
        }
    }

    /// Name of the backend that accepted the input.
    pub fn backend_name(&self) -> &'static str {
        self.backend
    }

    pub fn is_released(&self) -> bool {
        self.decoder.is_none()
    }

    // A released source has no decoder. Loading from it is a no-op.
    fn decoder(&mut self, operation: &str) -> Option<&mut (dyn FrameDecoder + 'a)> {
        if self.decoder.is_none() {
            log::debug!("{}: {operation} on a released source", self.backend);
        }
        self.decoder.as_deref_mut()
    }

    pub fn load_first_frame(&mut self) -> LoadedFrame {
        let backend = self.backend;
        match self.decoder("load_first_frame") {
            Some(decoder) => {
                LoadedFrame::from_result(backend, "load_first_frame", decoder.first_frame())
            }
            None => LoadedFrame::default(),
        }
    }

    pub fn load_next_frame(&mut self) -> LoadedFrame {
        let backend = self.backend;
        match self.decoder("load_next_frame") {
            Some(decoder) => {
                LoadedFrame::from_result(backend, "load_next_frame", decoder.next_frame())
            }
            None => LoadedFrame::default(),
        }
    }

    /// Tears down the decoder and releases the input. Calling it again does nothing.
    pub fn release(&mut self) {
        if self.decoder.take().is_some() {
            log::debug!("{}: source released", self.backend);
        }
    }
}

impl std::fmt::Debug for Source<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("backend", &self.backend)
            .field("released", &self.is_released())
            .finish()
    }
}
