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

//! One adapter per decoding engine. Each adapter exposes a `BACKEND` descriptor and keeps its
//! engine state behind [`crate::source::FrameDecoder`].

#[cfg(feature = "gif")]
pub mod gif;

#[cfg(feature = "png")]
pub mod png;

#[cfg(feature = "jpegxl")]
pub mod jpegxl;

#[cfg(feature = "image")]
pub mod generic;
