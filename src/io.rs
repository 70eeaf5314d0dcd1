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

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Bytes a backend decodes from, tagged with who is responsible for releasing them.
///
/// The tag is fixed when the input is created. Dropping the last clone releases the bytes the
/// way the tag says: unmap, free or nothing.
#[derive(Debug, Clone)]
pub enum Input<'a> {
    /// A read-only mapping of a file opened by the backend.
    Mapped(Arc<MappedFile>),
    /// A caller buffer. The caller keeps it alive for as long as the source exists.
    Borrowed(&'a [u8]),
    /// A buffer handed over to the backend.
    Owned(Arc<[u8]>),
}

impl<'a> Input<'a> {
    pub fn map_file(path: &Path) -> ImvResult<Input<'static>> {
        Ok(Input::Mapped(Arc::new(MappedFile::open(path)?)))
    }

    pub fn borrowed(data: &'a [u8]) -> Self {
        Input::Borrowed(data)
    }

    pub fn owned(data: Vec<u8>) -> Input<'static> {
        Input::Owned(data.into())
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Input::Mapped(mapped) => mapped.bytes(),
            Input::Borrowed(data) => data,
            Input::Owned(data) => data,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Input::Mapped(_))
    }
}

impl AsRef<[u8]> for Input<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes()
    }
}

/// A private, read-only memory mapping of a whole file.
///
/// The file must not be truncated while the mapping is alive.
#[derive(Debug)]
pub struct MappedFile {
    #[cfg(unix)]
    ptr: *mut libc::c_void,
    #[cfg(unix)]
    len: usize,
    // Platforms without mmap read the file into memory instead.
    #[cfg(not(unix))]
    data: Vec<u8>,
}

// # Safety: The mapping is read-only and private, so sharing it across threads is no different
// from sharing a &[u8].
unsafe impl Send for MappedFile {}
unsafe impl Sync for MappedFile {}

impl MappedFile {
    #[cfg(unix)]
    pub fn open(path: &Path) -> ImvResult<Self> {
        use std::os::unix::io::AsRawFd;

        let file = File::open(path).map_err(ImvError::map_bad_path)?;
        let len = file.metadata().map_err(ImvError::map_bad_path)?.len();
        let len = usize_from_u64(len).or(Err(ImvError::BadPath("file too large".into())))?;
        if len == 0 {
            // mmap() refuses empty mappings.
            return ImvError::bad_path("unable to map an empty file");
        }
        // # Safety: Calling a C function with a valid file descriptor. The mapping stays valid
        // after the descriptor is closed when `file` goes out of scope.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ,
                libc::MAP_PRIVATE,
                file.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED || ptr.is_null() {
            return ImvError::bad_path(std::io::Error::last_os_error());
        }
        Ok(Self { ptr, len })
    }

    #[cfg(not(unix))]
    pub fn open(path: &Path) -> ImvResult<Self> {
        let data = std::fs::read(path).map_err(ImvError::map_bad_path)?;
        if data.is_empty() {
            return ImvError::bad_path("unable to map an empty file");
        }
        Ok(Self { data })
    }

    #[cfg(unix)]
    pub fn bytes(&self) -> &[u8] {
        // # Safety: ptr points to a live PROT_READ mapping of exactly len bytes, which is only
        // unmapped in drop().
        unsafe { std::slice::from_raw_parts(self.ptr as *const u8, self.len) }
    }

    #[cfg(not(unix))]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(unix)]
impl Drop for MappedFile {
    fn drop(&mut self) {
        // # Safety: ptr and len describe a mapping created in open() that has not been unmapped.
        unsafe {
            libc::munmap(self.ptr, self.len);
        }
    }
}
