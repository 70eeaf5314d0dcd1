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

use crate::*;

// Not all helpers are used by all feature combinations.
pub(crate) fn usize_from_u32(value: u32) -> ImvResult<usize> {
    usize::try_from(value).or(Err(ImvError::OutOfMemory))
}

pub(crate) fn usize_from_u64(value: u64) -> ImvResult<usize> {
    usize::try_from(value).or(Err(ImvError::OutOfMemory))
}

pub(crate) fn check_limits(width: u32, height: u32, size_limit: u32, dimension_limit: u32) -> bool {
    if height == 0 || width == 0 {
        return false;
    }
    if width > size_limit / height {
        return false;
    }
    if dimension_limit != 0 && (width > dimension_limit || height > dimension_limit) {
        return false;
    }
    true
}

/// Returns the size in bytes of a `width` x `height` buffer with `bytes_per_pixel` bytes per
/// pixel, or an error if it does not fit the limits or the address space.
pub(crate) fn buffer_size(width: u32, height: u32, bytes_per_pixel: usize) -> ImvResult<usize> {
    if !check_limits(
        width,
        height,
        DEFAULT_IMAGE_SIZE_LIMIT,
        DEFAULT_IMAGE_DIMENSION_LIMIT,
    ) {
        return ImvError::out_of_memory();
    }
    usize_from_u32(width)?
        .checked_mul(usize_from_u32(height)?)
        .and_then(|pixels| pixels.checked_mul(bytes_per_pixel))
        .ok_or(ImvError::OutOfMemory)
}

/// Allocates a zeroed buffer without aborting the process when memory is short.
pub(crate) fn try_alloc_zeroed(size: usize) -> ImvResult<Vec<u8>> {
    let mut buffer: Vec<u8> = Vec::new();
    buffer
        .try_reserve_exact(size)
        .map_err(ImvError::map_out_of_memory)?;
    buffer.resize(size, 0);
    Ok(buffer)
}
