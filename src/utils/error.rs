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

// To be used instead of direct ImvError enum variants in order to debug
// unexpected Err propagations as early as possible in the call stack.
#[allow(dead_code)]
impl ImvError {
    fn on_error() {
        // Use std::intrinsics::breakpoint() or manually add a breakpoint here.
        // Alternatively, uncomment the following to print the stack trace.
        // println!("{}", std::backtrace::Backtrace::force_capture());
    }

    pub(crate) fn unsupported<T>() -> ImvResult<T> {
        ImvError::on_error();
        Err(ImvError::Unsupported)
    }
    pub(crate) fn out_of_memory<T>() -> ImvResult<T> {
        ImvError::on_error();
        Err(ImvError::OutOfMemory)
    }
    pub(crate) fn not_implemented<T>() -> ImvResult<T> {
        ImvError::on_error();
        Err(ImvError::NotImplemented)
    }

    pub(crate) fn bad_path<T, O>(object: O) -> ImvResult<T>
    where
        O: std::fmt::Display,
    {
        ImvError::on_error();
        Err(ImvError::BadPath(object.to_string()))
    }
    pub(crate) fn decode_failed<T, O>(object: O) -> ImvResult<T>
    where
        O: std::fmt::Display,
    {
        ImvError::on_error();
        Err(ImvError::DecodeFailed(object.to_string()))
    }

    pub(crate) fn map_bad_path<O>(object: O) -> ImvError
    where
        O: std::fmt::Display,
    {
        ImvError::on_error();
        ImvError::BadPath(object.to_string())
    }
    pub(crate) fn map_decode_failed<O>(object: O) -> ImvError
    where
        O: std::fmt::Display,
    {
        ImvError::on_error();
        ImvError::DecodeFailed(object.to_string())
    }
    pub(crate) fn map_out_of_memory<E>(_: E) -> ImvError {
        ImvError::on_error();
        ImvError::OutOfMemory
    }
}
