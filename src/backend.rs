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

use crate::io::Input;
use crate::source::Source;
use crate::*;

use std::path::Path;

pub type OpenPathFn = fn(&Path) -> ImvResult<Source<'static>>;
pub type OpenInputFn = for<'a> fn(Input<'a>) -> ImvResult<Source<'a>>;

/// Static description of one decoding backend and its two entry points.
///
/// Both entry points return `Err(ImvError::Unsupported)` when the input is not handled by this
/// backend and `Err(ImvError::BadPath(_))` when the input could not be read at all.
pub struct Backend {
    pub name: &'static str,
    pub description: &'static str,
    pub website: &'static str,
    pub license: &'static str,
    pub(crate) open_path: OpenPathFn,
    pub(crate) open_input: OpenInputFn,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("website", &self.website)
            .field("license", &self.license)
            .finish()
    }
}

impl Backend {
    pub fn open_path<P: AsRef<Path>>(&self, path: P) -> ImvResult<Source<'static>> {
        let path = path.as_ref();
        log::debug!("{}: open_path({})", self.name, path.display());
        (self.open_path)(path)
    }

    /// Opens a caller buffer. The buffer is not copied and must outlive the source.
    pub fn open_memory<'a>(&self, data: &'a [u8]) -> ImvResult<Source<'a>> {
        log::debug!("{}: open_memory({} bytes)", self.name, data.len());
        (self.open_input)(Input::borrowed(data))
    }

    /// Opens a buffer, taking ownership of it. It is freed when the source is released.
    pub fn open_owned(&self, data: Vec<u8>) -> ImvResult<Source<'static>> {
        log::debug!("{}: open_owned({} bytes)", self.name, data.len());
        (self.open_input)(Input::owned(data))
    }
}

/// All compiled-in backends, in probing order.
pub fn default_backends() -> Vec<&'static Backend> {
    #[allow(unused_mut)]
    let mut backends: Vec<&'static Backend> = Vec::new();
    #[cfg(feature = "gif")]
    backends.push(&crate::codecs::gif::BACKEND);
    #[cfg(feature = "png")]
    backends.push(&crate::codecs::png::BACKEND);
    #[cfg(feature = "jpegxl")]
    backends.push(&crate::codecs::jpegxl::BACKEND);
    #[cfg(feature = "image")]
    backends.push(&crate::codecs::generic::BACKEND);
    backends
}

pub fn find_backend(name: &str) -> Option<&'static Backend> {
    default_backends().into_iter().find(|x| x.name == name)
}

fn probe<'a, F>(backends: &[&'static Backend], mut open: F) -> ImvResult<Source<'a>>
where
    F: FnMut(&'static Backend) -> ImvResult<Source<'a>>,
{
    for backend in backends.iter().copied() {
        match open(backend) {
            Ok(source) => return Ok(source),
            Err(ImvError::Unsupported) => continue,
            Err(err) => {
                log::debug!("{}: stopping probe: {err}", backend.name);
                return Err(err);
            }
        }
    }
    ImvError::unsupported()
}

/// Tries each backend in order until one accepts the file. An I/O failure stops the search.
pub fn open_path_with<P: AsRef<Path>>(
    backends: &[&'static Backend],
    path: P,
) -> ImvResult<Source<'static>> {
    let path = path.as_ref();
    probe(backends, |backend| backend.open_path(path))
}

/// Tries each backend in order until one accepts the buffer.
pub fn open_memory_with<'a>(
    backends: &[&'static Backend],
    data: &'a [u8],
) -> ImvResult<Source<'a>> {
    probe(backends, |backend| backend.open_memory(data))
}
