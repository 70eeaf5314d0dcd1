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

use crate::internal_utils::*;
use crate::*;

/// A decoded frame in the common pixel format.
///
/// `data` always holds exactly `width * height * 4` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Bitmap {
    /// Allocates a zero-filled bitmap.
    pub fn allocate(width: u32, height: u32) -> ImvResult<Self> {
        let format = PixelFormat::Abgr;
        let size = buffer_size(width, height, format.bytes_per_pixel())?;
        Ok(Self {
            width,
            height,
            format,
            data: try_alloc_zeroed(size)?,
        })
    }

    /// Wraps an existing buffer. Fails if its length does not match the dimensions.
    pub fn from_vec(width: u32, height: u32, data: Vec<u8>) -> ImvResult<Self> {
        let format = PixelFormat::Abgr;
        let size = buffer_size(width, height, format.bytes_per_pixel())?;
        if data.len() != size {
            return ImvError::decode_failed(format!(
                "bitmap buffer has {} bytes, expected {size} for {width}x{height}",
                data.len()
            ));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Copies `pixels` into a newly allocated bitmap.
    pub fn copy_from_slice(width: u32, height: u32, pixels: &[u8]) -> ImvResult<Self> {
        let mut bitmap = Self::allocate(width, height)?;
        if pixels.len() != bitmap.data.len() {
            return ImvError::decode_failed(format!(
                "pixel buffer has {} bytes, expected {}",
                pixels.len(),
                bitmap.data.len()
            ));
        }
        bitmap.data.copy_from_slice(pixels);
        Ok(bitmap)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate() {
        let bitmap = Bitmap::allocate(3, 5).unwrap();
        assert_eq!(bitmap.width(), 3);
        assert_eq!(bitmap.height(), 5);
        assert_eq!(bitmap.format(), PixelFormat::Abgr);
        assert_eq!(bitmap.row_bytes(), 12);
        assert_eq!(bitmap.data().len(), 60);
        assert!(bitmap.data().iter().all(|x| *x == 0));
    }

    #[test]
    fn empty_dimensions_are_refused() {
        assert!(Bitmap::allocate(0, 5).is_err());
        assert!(Bitmap::allocate(5, 0).is_err());
    }

    #[test]
    fn from_vec_checks_length() {
        assert!(Bitmap::from_vec(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            Bitmap::from_vec(2, 2, vec![0; 15]),
            Err(ImvError::DecodeFailed(_))
        ));
        assert!(Bitmap::copy_from_slice(1, 1, &[1, 2, 3]).is_err());
        let bitmap = Bitmap::copy_from_slice(1, 1, &[1, 2, 3, 4]).unwrap();
        assert_eq!(bitmap.into_data(), vec![1, 2, 3, 4]);
    }
}
